mod cmd;
mod ctx;
mod error;
mod render;

use std::{
    fmt,
    io::{self, Write as _},
    process::ExitCode,
};

use camino::Utf8PathBuf;
use clap::{ArgAction, Parser};
use cmd::Commands;
use ctx::Ctx;
use error::Result;
use tracing::{debug, trace};

/// Chat with a streaming bot backend, one turn at a time.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten, next_help_heading = "Global Options")]
    globals: Globals,

    #[command(subcommand, next_help_heading = "Options")]
    command: Commands,
}

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct Globals {
    /// Path to a configuration file.
    ///
    /// Defaults to `tern.toml` in the working directory, if it exists.
    #[arg(short, long, value_name = "PATH", global = true)]
    config: Option<Utf8PathBuf>,

    /// Identity of the conversation.
    ///
    /// Overrides the configured sender id. A new identity is generated if
    /// neither is set.
    #[arg(long, global = true)]
    sender_id: Option<String>,

    /// Print the process log (echoes, traces, stream errors and finalize
    /// reasons) to stderr.
    #[arg(short = 'p', long, global = true)]
    process_log: bool,

    /// Increase verbosity of logging.
    ///
    /// Can be specified multiple times to increase verbosity.
    ///
    /// Defaults to printing "error" messages. For each increase in verbosity,
    /// the log level is set to "warn", "info", "debug", and "trace"
    /// respectively.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Suppress all logging, including errors.
    #[arg(short, long, global = true)]
    quiet: bool,
}

impl fmt::Display for Cli {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entry(&"config", &self.globals.config)
            .entry(&"sender_id", &self.globals.sender_id)
            .entry(&"process_log", &self.globals.process_log)
            .entry(&"verbose", &self.globals.verbose)
            .entry(&"quiet", &self.globals.quiet)
            .finish()
    }
}

pub async fn run() -> ExitCode {
    let cli = Cli::parse();

    configure_logging(cli.globals.verbose, cli.globals.quiet);
    trace!(command = cli.command.name(), arguments = %cli, "Starting CLI run.");

    match run_inner(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            debug!(?error, "Command failed.");
            drop(writeln!(io::stderr(), "{error}"));
            ExitCode::FAILURE
        }
    }
}

async fn run_inner(cli: Cli) -> Result<()> {
    let config = tern_config::load(cli.globals.config.as_deref())?;
    let ctx = Ctx::new(cli.globals, config);

    cli.command.run(&ctx).await
}

fn configure_logging(verbose: u8, quiet: bool) {
    use tracing::level_filters::LevelFilter;
    use tracing_subscriber::fmt;

    let mut level = match verbose {
        0 => LevelFilter::ERROR,
        1 => LevelFilter::WARN,
        2 => LevelFilter::INFO,
        3 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    if quiet {
        level = LevelFilter::OFF;
    }

    let mut filter = vec!["off".to_owned()];
    for krate in ["cli", "config", "stream", "turn"] {
        filter.push(format!("tern_{krate}={level}"));
    }

    let format = fmt::format().with_target(false).compact();

    if level < LevelFilter::DEBUG {
        tracing_subscriber::fmt()
            .event_format(format)
            .without_time()
            .with_ansi(true)
            .with_target(false)
            .with_writer(io::stderr)
            .with_env_filter(filter.join(","))
            .init();
    } else {
        tracing_subscriber::fmt()
            .event_format(format)
            .with_ansi(true)
            .with_target(false)
            .with_writer(io::stderr)
            .with_env_filter(filter.join(","))
            .init();
    }
}
