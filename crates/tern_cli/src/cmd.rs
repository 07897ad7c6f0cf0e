mod chat;
mod config;
mod send;

use crate::{Ctx, Result};

#[derive(Debug, clap::Subcommand)]
pub(crate) enum Commands {
    /// Chat interactively, one turn per line read from stdin.
    Chat(chat::Chat),

    /// Send a single message and print the reply.
    #[command(visible_alias = "s")]
    Send(send::SendMessage),

    /// Show the resolved configuration.
    #[command(visible_alias = "cfg")]
    Config(config::Config),
}

impl Commands {
    pub(crate) async fn run(self, ctx: &Ctx) -> Result<()> {
        match self {
            Commands::Chat(args) => args.run(ctx).await,
            Commands::Send(args) => args.run(ctx).await,
            Commands::Config(args) => args.run(ctx),
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        match self {
            Commands::Chat(_) => "chat",
            Commands::Send(_) => "send",
            Commands::Config(_) => "config",
        }
    }
}
