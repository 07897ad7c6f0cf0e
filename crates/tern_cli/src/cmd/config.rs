use std::io::{self, Write as _};

use serde_json::json;

use crate::{Ctx, Result};

#[derive(Debug, clap::Args)]
pub(crate) struct Config {
    /// Print compact JSON.
    #[arg(long)]
    compact: bool,
}

impl Config {
    pub(crate) fn run(self, ctx: &Ctx) -> Result<()> {
        let mut value = serde_json::to_value(&ctx.config)?;
        value["sender_id"] = json!(ctx.sender_id);
        value["endpoints"]["stream_url"] = json!(ctx.config.endpoints.stream_url()?.as_str());
        value["endpoints"]["webhook_url"] = json!(ctx.config.endpoints.webhook_url()?.as_str());

        let output = if self.compact {
            serde_json::to_string(&value)?
        } else {
            serde_json::to_string_pretty(&value)?
        };

        writeln!(io::stdout().lock(), "{output}")?;
        Ok(())
    }
}
