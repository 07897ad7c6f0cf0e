use std::io;

use tokio::io::{AsyncBufReadExt as _, BufReader};
use tracing::{debug, warn};

use crate::{
    Ctx, Result,
    render::{Renderer, follow},
};

#[derive(Debug, clap::Args)]
pub(crate) struct Chat {
    /// Print the conversation when the session ends.
    #[arg(long)]
    transcript: bool,
}

impl Chat {
    pub(crate) async fn run(self, ctx: &Ctx) -> Result<()> {
        let (handle, mut notices) = ctx.coordinator()?;
        let mut renderer = Renderer::new(io::stdout(), io::stderr(), ctx.globals.process_log);
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        while let Some(line) = lines.next_line().await? {
            let text = line.trim();
            if text.is_empty() {
                continue;
            }

            let turn = handle.send(text).await?;
            let reason = follow(&mut notices, &turn, &mut renderer).await?;
            if !reason.commits() {
                warn!(%turn, %reason, "Turn ended without a reply.");
            }
        }

        debug!("Input closed, ending chat.");
        handle.close().await?;

        if self.transcript {
            let conversation = handle.conversation().await?;
            let mut out = io::stdout().lock();
            super::send::write_transcript(&mut out, &conversation)?;
        }

        Ok(())
    }
}
