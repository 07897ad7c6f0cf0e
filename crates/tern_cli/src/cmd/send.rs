use std::io::{self, Write};

use tern_turn::{Content, Conversation, Role};
use tracing::debug;

use crate::{
    Ctx, Result,
    error::Error,
    render::{Renderer, follow},
};

#[derive(Debug, clap::Args)]
pub(crate) struct SendMessage {
    /// The message to send.
    #[arg(required = true)]
    text: Vec<String>,
}

impl SendMessage {
    pub(crate) async fn run(self, ctx: &Ctx) -> Result<()> {
        let (handle, mut notices) = ctx.coordinator()?;
        let mut renderer = Renderer::new(io::stdout(), io::stderr(), ctx.globals.process_log);

        let turn = handle.send(self.text.join(" ")).await?;
        let reason = follow(&mut notices, &turn, &mut renderer).await?;
        debug!(%turn, %reason, "Turn finished.");

        handle.close().await?;

        if reason.commits() {
            Ok(())
        } else {
            Err(Error::TurnFailed(reason))
        }
    }
}

/// Write every message of the conversation, prefixed by its role.
pub(super) fn write_transcript(out: &mut impl Write, conversation: &Conversation) -> io::Result<()> {
    for message in conversation.messages() {
        let role = match message.role {
            Role::User => "user",
            Role::Assistant => "assistant",
        };

        match &message.content {
            Content::Text(text) => writeln!(out, "{role}: {text}")?,
            Content::Image(url) => writeln!(out, "{role}: [image] {url}")?,
        }
    }

    Ok(())
}
