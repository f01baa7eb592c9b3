use crate::model::{ConsoleConfig, ConsoleEvent, ServeConfig};
use crate::orchestrator::{self, UiCommand};
use crate::page::{Page, LOG_MESSAGES_ID};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::Level;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "agent-console",
    version,
    about = "Console and backend for a pair of chatting autonomous agents"
)]
pub struct Cli {
    /// Log at debug level
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Write logs to this file instead of stderr (the TUI only logs when this is set)
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the agent backend
    Serve(ServeArgs),
    /// Poll a backend and drive its agents
    Watch(WatchArgs),
}

#[derive(Debug, Args, Clone)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:5000")]
    pub bind: SocketAddr,

    /// How often each agent runs its behaviors
    #[arg(long, default_value = "2s")]
    pub behavior_period: humantime::Duration,

    /// Pause after starting the agents before reporting them as running
    #[arg(long, default_value = "1s")]
    pub startup_grace: humantime::Duration,
}

#[derive(Debug, Args, Clone)]
pub struct WatchArgs {
    /// Base URL of the agent backend
    #[arg(long, default_value = "http://127.0.0.1:5000")]
    pub base_url: String,

    /// Interval between log and button-state polls
    #[arg(long, default_value = "5s")]
    pub poll_interval: humantime::Duration,

    /// Per-request timeout
    #[arg(long, default_value = "10s")]
    pub request_timeout: humantime::Duration,

    /// Print the log to stdout instead of opening the TUI
    #[arg(long)]
    pub text: bool,
}

/// Build a `ConsoleConfig` from CLI arguments.
pub fn build_console_config(args: &WatchArgs) -> ConsoleConfig {
    ConsoleConfig {
        base_url: args.base_url.clone(),
        poll_interval: Duration::from(args.poll_interval),
        request_timeout: Duration::from(args.request_timeout),
        user_agent: format!("agent-console/{}", env!("CARGO_PKG_VERSION")),
    }
}

/// Build a `ServeConfig` from CLI arguments.
pub fn build_serve_config(args: &ServeArgs) -> ServeConfig {
    ServeConfig {
        bind: args.bind,
        behavior_period: Duration::from(args.behavior_period),
        startup_grace: Duration::from(args.startup_grace),
    }
}

/// Whether this invocation takes over the terminal.
fn uses_tui(cli: &Cli) -> bool {
    matches!(&cli.command, Command::Watch(w) if !w.text) && cfg!(feature = "tui")
}

/// Install the tracing subscriber. The TUI owns the terminal, so without a log
/// file it runs with no subscriber at all.
fn init_tracing(cli: &Cli) -> Result<()> {
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    if let Some(path) = cli.log_file.as_deref() {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("open log file {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .init();
    } else if !uses_tui(cli) {
        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

pub async fn run(cli: Cli) -> Result<()> {
    init_tracing(&cli)?;

    match cli.command {
        Command::Serve(args) => crate::server::serve(build_serve_config(&args)).await,
        Command::Watch(args) => {
            let cfg = build_console_config(&args);
            if !args.text {
                #[cfg(feature = "tui")]
                {
                    return crate::tui::run(cfg).await;
                }
                #[cfg(not(feature = "tui"))]
                {
                    // Fallback when built without TUI support.
                    return run_text(cfg).await;
                }
            }
            run_text(cfg).await
        }
    }
}

/// Poll without a terminal UI: print the log container whenever it changes.
async fn run_text(cfg: ConsoleConfig) -> Result<()> {
    let (out_tx, out_handle) = spawn_output_writer();
    let (evt_tx, mut evt_rx) = mpsc::unbounded_channel::<ConsoleEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    let controller =
        tokio::spawn(async move { orchestrator::run_controller(&cfg, evt_tx, cmd_rx).await });

    let mut page = Page::default();
    let mut shown = page.log_messages.lines();

    loop {
        tokio::select! {
            ev = evt_rx.recv() => {
                let Some(ev) = ev else { break };
                if let ConsoleEvent::Info(info) = &ev {
                    let _ = out_tx.send(OutputLine::Stderr(info.to_message()));
                }
                page.apply(ev);
                for line in render_changes(&page, &mut shown) {
                    let _ = out_tx.send(OutputLine::Stdout(line));
                }
            }
            _ = tokio::signal::ctrl_c() => {
                let _ = cmd_tx.send(UiCommand::Quit);
                break;
            }
        }
    }

    drop(cmd_tx);
    controller
        .await
        .context("controller task failed")??;
    drop(out_tx);
    let _ = out_handle.await;
    Ok(())
}

/// Lines to print when the rendered log differs from what was last shown.
fn render_changes(page: &Page, shown: &mut Vec<String>) -> Vec<String> {
    let lines = page.log_messages.lines();
    if lines == *shown {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(lines.len() + 1);
    out.push(format!("== {LOG_MESSAGES_ID} ({} lines) ==", lines.len()));
    out.extend(lines.iter().cloned());
    *shown = lines;
    out
}
