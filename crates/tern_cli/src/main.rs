use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    tern_cli::run().await
}
