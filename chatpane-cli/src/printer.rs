//! Terminal rendering of view events.
//!
//! The controller talks to a [`ChannelView`](chatpane_core::ChannelView);
//! this task sits on the other end, prints streamed text as it grows and
//! mirrors every event into a [`Transcript`] for the optional HTML export.

use std::io::Write;

use chatpane_core::{Transcript, ViewEvent};
use tokio::sync::mpsc;

/// Prints replies to a writer as view events arrive.
pub struct Printer<W: Write> {
    out: W,
    transcript: Transcript,
    /// Bytes of the live buffer already written.
    printed: usize,
    /// Whether the current reply was streamed (and is thus on screen).
    streamed: bool,
}

impl<W: Write> Printer<W> {
    /// Create a printer writing to `out`.
    pub fn new(out: W) -> Self {
        Self {
            out,
            transcript: Transcript::new(),
            printed: 0,
            streamed: false,
        }
    }

    /// Handle one event.
    pub fn handle(&mut self, event: ViewEvent) -> std::io::Result<()> {
        match &event {
            ViewEvent::BeginBotMessage => {
                self.printed = 0;
                self.streamed = true;
            }
            ViewEvent::LiveText(text) => {
                if let Some(delta) = text.get(self.printed..) {
                    write!(self.out, "{}", delta)?;
                    self.out.flush()?;
                    self.printed = text.len();
                }
            }
            ViewEvent::LiveAppend(tail) => {
                write!(self.out, "{}", tail)?;
                self.out.flush()?;
                self.printed += tail.len();
            }
            ViewEvent::FinishBotMessage(message) => {
                if !self.streamed {
                    write!(self.out, "{}", message.text())?;
                }
                writeln!(self.out)?;
                self.streamed = false;
            }
            ViewEvent::BotMessage(message) => {
                if self.streamed {
                    writeln!(self.out)?;
                    self.streamed = false;
                }
                writeln!(self.out, "{}", message.text())?;
            }
            _ => {}
        }
        self.transcript.apply(event);
        Ok(())
    }

    /// Drain `rx` until every sender is gone, then return the transcript.
    pub async fn run(mut self, mut rx: mpsc::UnboundedReceiver<ViewEvent>) -> Transcript {
        while let Some(event) = rx.recv().await {
            if let Err(e) = self.handle(event) {
                tracing::warn!("failed to write to terminal: {}", e);
            }
        }
        self.transcript
    }
}
