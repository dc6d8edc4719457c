//! Interactive REPL mode for the Chatpane CLI.
//!
//! Reads one message per line and runs it through the controller. Lines
//! starting with `/` are commands. Ctrl+C leaves the REPL, both at the prompt
//! and while a reply is in flight.

use std::future::Future;
use std::io::{self, BufRead};

use anyhow::{Context, Result};
use chatpane_core::{ChatController, ChatView, Mode};
use tokio::sync::mpsc;

/// A parsed REPL line.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ReplInput<'a> {
    /// Leave the REPL.
    Quit,
    /// Switch the response mode.
    SetMode(Mode),
    /// Unknown `/command`.
    Unknown(&'a str),
    /// A message to send.
    Message(&'a str),
}

/// Why the REPL stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReplExit {
    /// `/quit` or `/exit`.
    Quit,
    /// Stdin closed.
    EndOfInput,
    /// Ctrl+C.
    Interrupted,
}

/// Parse one input line.
pub(crate) fn parse_line(line: &str) -> ReplInput<'_> {
    match line.trim() {
        "/quit" | "/exit" => ReplInput::Quit,
        "/long" => ReplInput::SetMode(Mode::Long),
        "/short" => ReplInput::SetMode(Mode::Short),
        command if command.starts_with('/') => ReplInput::Unknown(command),
        message => ReplInput::Message(message),
    }
}

/// Read stdin lines on a dedicated thread.
///
/// A thread parked in a blocking read does not keep the runtime from
/// shutting down, unlike a pending `tokio::io::stdin` read.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<io::Result<String>> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Run the REPL until `/quit`, end of input, or Ctrl+C.
pub async fn run_repl<V: ChatView>(controller: &mut ChatController<V>) -> Result<()> {
    eprintln!("chatpane - type a message, /long or /short to switch mode, /quit to exit");
    let exit = drive(controller, spawn_stdin_reader(), tokio::signal::ctrl_c).await?;
    tracing::debug!(?exit, "repl: stopped");
    Ok(())
}

/// The REPL loop over a line source and an interrupt signal.
///
/// `interrupt` is called afresh for every wait, so each prompt and each
/// in-flight exchange can be cut short.
pub(crate) async fn drive<V, F, Fut>(
    controller: &mut ChatController<V>,
    mut lines: mpsc::UnboundedReceiver<io::Result<String>>,
    mut interrupt: F,
) -> Result<ReplExit>
where
    V: ChatView,
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    loop {
        eprint!("[{}] > ", controller.mode().as_str());

        let line = tokio::select! {
            line = lines.recv() => line,
            _ = interrupt() => {
                eprintln!();
                return Ok(ReplExit::Interrupted);
            }
        };
        let Some(line) = line else {
            return Ok(ReplExit::EndOfInput);
        };
        let line = line.context("Failed to read input")?;

        match parse_line(&line) {
            ReplInput::Quit => return Ok(ReplExit::Quit),
            ReplInput::SetMode(mode) => {
                controller.set_mode(mode);
                eprintln!("mode: {}", mode.as_str());
            }
            ReplInput::Unknown(command) => eprintln!("unknown command: {}", command),
            ReplInput::Message(message) => {
                tokio::select! {
                    _ = controller.submit(message) => {}
                    _ = interrupt() => {
                        eprintln!("\n[Interrupted]");
                        return Ok(ReplExit::Interrupted);
                    }
                }
            }
        }
    }
}
