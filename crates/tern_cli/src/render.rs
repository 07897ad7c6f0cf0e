use std::io::{self, Write};

use tern_turn::{Content, FinalizeReason, Message, Notice, TurnId};
use tokio::sync::mpsc;

use crate::error::{Error, Result};

/// Writes the notices of a turn to the terminal.
///
/// The reply goes to `out` as it streams in. Process log lines go to `log`,
/// if enabled; fatal errors always do.
pub(crate) struct Renderer<O, L> {
    out: O,
    log: L,
    process_log: bool,

    /// Text printed for the current turn so far.
    streamed: String,
}

impl<O: Write, L: Write> Renderer<O, L> {
    pub(crate) fn new(out: O, log: L, process_log: bool) -> Self {
        Self {
            out,
            log,
            process_log,
            streamed: String::new(),
        }
    }

    /// Render a single notice. Returns the reason once the turn is over.
    pub(crate) fn render(&mut self, notice: &Notice) -> io::Result<Option<FinalizeReason>> {
        if let Some(line) = notice.process_line() {
            let fatal = matches!(notice, Notice::Error { error, .. } if error.is_fatal());
            if self.process_log || fatal {
                writeln!(self.log, "{line}")?;
            }
        }

        match notice {
            Notice::Token { text, .. } => {
                self.streamed.push_str(text);
                write!(self.out, "{text}")?;
                self.out.flush()?;
            }
            Notice::Published { message, .. } => {
                self.end_stream()?;
                self.message(message)?;
            }
            Notice::Committed { message, .. } => {
                let streamed = std::mem::take(&mut self.streamed);
                if message.text() == Some(streamed.trim()) {
                    writeln!(self.out)?;
                } else {
                    if !streamed.is_empty() {
                        writeln!(self.out)?;
                    }
                    self.message(message)?;
                }
            }
            Notice::Finalized { reason, .. } => {
                self.end_stream()?;
                return Ok(Some(*reason));
            }
            _ => {}
        }

        Ok(None)
    }

    fn message(&mut self, message: &Message) -> io::Result<()> {
        match &message.content {
            Content::Text(text) => writeln!(self.out, "{text}"),
            Content::Image(url) => writeln!(self.out, "[image] {url}"),
        }
    }

    /// Terminate a line of partial text that was never committed.
    fn end_stream(&mut self) -> io::Result<()> {
        if std::mem::take(&mut self.streamed).is_empty() {
            return Ok(());
        }

        writeln!(self.out)
    }
}

/// Render notices until `turn` is finalized.
pub(crate) async fn follow<O: Write, L: Write>(
    notices: &mut mpsc::UnboundedReceiver<Notice>,
    turn: &TurnId,
    renderer: &mut Renderer<O, L>,
) -> Result<FinalizeReason> {
    while let Some(notice) = notices.recv().await {
        if notice.turn() != Some(turn) {
            continue;
        }

        if let Some(reason) = renderer.render(&notice)? {
            return Ok(reason);
        }
    }

    Err(Error::Turn(tern_turn::Error::Shutdown))
}

#[cfg(test)]
#[path = "render_tests.rs"]
mod tests;
