//! Chatpane CLI - terminal front end for a streaming chat service.

mod printer;
mod repl;

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::prelude::*;

use chatpane_core::config::Rotation;
use chatpane_core::{
    ChannelView, ChatController, Config, Endpoints, HttpChatApi, Mode, SubmitOutcome,
};
use printer::Printer;

/// Chatpane - chat with a streaming assistant from the terminal
#[derive(Parser)]
#[command(name = "chatpane")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Message to send (reads from stdin if not provided)
    message: Option<String>,

    /// Enter interactive REPL mode
    #[arg(short, long)]
    repl: bool,

    /// Ask for long, detailed replies
    #[arg(short, long)]
    long: bool,

    /// Path to a custom config file (overrides default search locations)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Override the service base URL from config
    #[arg(long)]
    api_url: Option<String>,

    /// Write the conversation as an HTML page on exit
    #[arg(long, value_name = "PATH")]
    html: Option<PathBuf>,
}

/// Default tracing directives enabling info-level logs for this crate and chatpane-core.
const DEFAULT_DIRECTIVES: &[&str] = &["chatpane_cli=info", "chatpane_core=info"];

fn default_env_filter() -> Result<tracing_subscriber::EnvFilter> {
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    for directive in DEFAULT_DIRECTIVES {
        filter = filter.add_directive(directive.parse()?);
    }
    Ok(filter)
}

/// Initialize the tracing subscriber.
///
/// Logs always go to stderr so replies on stdout stay clean. With a
/// `[logging]` section a rolling file layer is added; the returned guard
/// must be held until exit.
fn init_tracing(config: &Config) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(ref lc) = config.logging else {
        tracing_subscriber::fmt()
            .with_env_filter(default_env_filter()?)
            .with_writer(io::stderr)
            .init();
        return Ok(None);
    };

    if let Err(e) = std::fs::create_dir_all(&lc.directory) {
        eprintln!(
            "Warning: Failed to create log directory '{}': {}. Falling back to stderr-only.",
            lc.directory, e
        );
        tracing_subscriber::fmt()
            .with_env_filter(default_env_filter()?)
            .with_writer(io::stderr)
            .init();
        return Ok(None);
    }

    let rotation = match lc.rotation {
        Rotation::Daily => tracing_appender::rolling::Rotation::DAILY,
        Rotation::Hourly => tracing_appender::rolling::Rotation::HOURLY,
        Rotation::Never => tracing_appender::rolling::Rotation::NEVER,
    };

    let file_appender = tracing_appender::rolling::RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix("chatpane")
        .filename_suffix("log")
        .max_log_files(lc.max_files)
        .build(&lc.directory)
        .context("Failed to create rolling file appender")?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(default_env_filter()?)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
        .init();

    Ok(Some(guard))
}

/// Apply command-line overrides on top of the loaded config.
fn apply_overrides(config: &mut Config, args: &Args) {
    if args.long {
        config.mode = Mode::Long;
    }
    if let Some(ref url) = args.api_url {
        config.api.base_url = Some(url.clone());
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref()).context("Failed to load config")?;
    apply_overrides(&mut config, &args);

    let _guard = init_tracing(&config)?;

    let endpoints = Endpoints::from_config(&config.api);
    if endpoints.is_local() {
        tracing::info!("Using local chat service at {}", endpoints.stream);
    } else {
        tracing::info!("Using chat service at {}", endpoints.stream);
    }

    // One-shot input is resolved before anything is spawned.
    let message = if args.repl {
        None
    } else {
        match get_message(&args) {
            Ok(msg) => Some(msg),
            Err(_) => {
                Args::parse_from(["chatpane", "--help"]);
                return Ok(ExitCode::SUCCESS);
            }
        }
    };

    let (view, events) = ChannelView::new();
    let printer = tokio::spawn(Printer::new(io::stdout()).run(events));

    let mut controller =
        ChatController::from_config(&config, Box::new(HttpChatApi::new(endpoints)), view);

    let code = match message {
        None => {
            repl::run_repl(&mut controller).await?;
            ExitCode::SUCCESS
        }
        Some(message) => match controller.submit(&message).await {
            SubmitOutcome::Failed => ExitCode::FAILURE,
            SubmitOutcome::Ignored => {
                eprintln!("Nothing to send");
                ExitCode::FAILURE
            }
            SubmitOutcome::Streamed | SubmitOutcome::FellBack => ExitCode::SUCCESS,
        },
    };

    // Dropping the view closes the channel and lets the printer finish.
    drop(controller);
    let transcript = printer.await.context("Printer task failed")?;

    if let Some(path) = args.html {
        std::fs::write(&path, transcript.to_html_page("Chatpane"))
            .with_context(|| format!("Failed to write transcript to {}", path.display()))?;
        tracing::info!("Transcript written to {}", path.display());
    }

    Ok(code)
}

/// Retrieves the message from arguments or stdin.
///
/// Priority: positional argument > stdin > error (if TTY)
fn get_message(args: &Args) -> io::Result<String> {
    if let Some(msg) = &args.message {
        return Ok(msg.clone());
    }

    if io::stdin().is_terminal() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "No message provided",
        ));
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    Ok(buffer.trim_end().to_string())
}
