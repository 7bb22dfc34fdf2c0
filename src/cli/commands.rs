use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use super::demo::demo_router;
use crate::error::ResponseDispatchError;
use crate::message::{handle_message, Message, MessageRouter, Responder};
use crate::router::RouteSource;

/// Command-line interface for chainroute
#[derive(Parser, Debug)]
#[command(name = "chainroute-replay")]
#[command(about = "Replay request messages through a chainroute router", long_about = None)]
pub struct Cli {
    /// Log level: trace/debug/info/warn/error
    #[arg(long, global = true, env = "CHAINROUTE_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Log format: json/pretty
    #[arg(long, global = true, env = "CHAINROUTE_LOG_FORMAT")]
    pub log_format: Option<String>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Dispatch newline-delimited JSON messages and print one line per response
    Replay {
        /// File to read messages from (default: stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// Print the routing table of the demo router
    Routes,
}

/// One output line of the replay command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayLine {
    pub id: String,
    pub ok: bool,
    pub payload: Value,
}

/// Counters reported when a replay finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Messages handed to the router
    pub dispatched: usize,
    /// Messages without a method or url
    pub unroutable: usize,
    /// Lines that were not valid messages
    pub malformed: usize,
    /// Dispatch tasks that died
    pub failed: usize,
}

/// Responder that forwards every response to a channel.
#[derive(Debug, Clone)]
pub struct ChannelResponder {
    tx: mpsc::UnboundedSender<ReplayLine>,
}

impl ChannelResponder {
    #[must_use]
    pub fn new(tx: mpsc::UnboundedSender<ReplayLine>) -> Self {
        Self { tx }
    }

    fn emit(&self, id: &str, ok: bool, payload: Value) -> Result<(), ResponseDispatchError> {
        self.tx
            .send(ReplayLine {
                id: id.to_string(),
                ok,
                payload,
            })
            .map_err(|_| ResponseDispatchError::new("output channel closed"))
    }
}

impl Responder for ChannelResponder {
    fn respond(&self, id: &str, payload: Value) -> Result<(), ResponseDispatchError> {
        self.emit(id, true, payload)
    }

    fn respond_with_error(&self, id: &str, payload: Value) -> Result<(), ResponseDispatchError> {
        self.emit(id, false, payload)
    }
}

/// Execute a parsed command.
///
/// # Errors
///
/// Input that cannot be opened or read, output that cannot be written, or a
/// demo router that fails to build.
pub async fn run_cli(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Replay { input } => {
            let router = Arc::new(demo_router().context("Failed to build demo router")?);
            let reader = open_input(input.as_deref()).await?;

            let (tx, rx) = mpsc::unbounded_channel();
            let writer = tokio::spawn(write_lines(rx));
            let summary = replay(router, reader, ChannelResponder::new(tx)).await?;
            writer.await.context("Output writer task failed")??;

            info!(
                dispatched = summary.dispatched,
                unroutable = summary.unroutable,
                malformed = summary.malformed,
                failed = summary.failed,
                "Replay finished"
            );
        }
        Commands::Routes => {
            let router = demo_router().context("Failed to build demo router")?;
            for line in route_table(&router) {
                println!("{line}");
            }
        }
    }
    Ok(())
}

/// Open `path`, or stdin when absent.
///
/// # Errors
///
/// The file cannot be opened.
pub async fn open_input(path: Option<&Path>) -> Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    match path {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open input file {}", path.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(BufReader::new(tokio::io::stdin()))),
    }
}

/// Dispatch every message read from `reader` concurrently and wait for all of
/// them to finish.
///
/// Blank lines are skipped; lines that are not valid messages are logged and
/// counted. Messages the router does not take (no method or url) get an error
/// response from the responder directly.
///
/// # Errors
///
/// Reading from `reader` fails.
pub async fn replay<R, P>(
    router: Arc<MessageRouter>,
    reader: R,
    responder: P,
) -> Result<ReplaySummary>
where
    R: AsyncBufRead + Unpin,
    P: Responder + 'static,
{
    let responder: Arc<dyn Responder> = Arc::new(responder);
    let mut summary = ReplaySummary::default();
    let mut tasks = JoinSet::new();
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let message: Message = match serde_json::from_str(line) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "Skipping malformed message");
                summary.malformed += 1;
                continue;
            }
        };

        summary.dispatched += 1;
        let router = Arc::clone(&router);
        let responder = Arc::clone(&responder);
        tasks.spawn(async move {
            let id = message.id.clone();
            let routed = handle_message(&router, Arc::clone(&responder), message).await;
            if !routed {
                let payload = json!({ "message": "message has no method or url" });
                if let Err(e) = responder.respond_with_error(&id, payload) {
                    warn!(id = %id, error = %e, "Failed to reject unroutable message");
                }
            }
            routed
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(true) => {}
            Ok(false) => summary.unroutable += 1,
            Err(e) => {
                error!(error = %e, "Dispatch task failed");
                summary.failed += 1;
            }
        }
    }

    Ok(summary)
}

async fn write_lines(mut rx: mpsc::UnboundedReceiver<ReplayLine>) -> Result<()> {
    let mut out = tokio::io::stdout();
    while let Some(line) = rx.recv().await {
        let mut bytes = serde_json::to_vec(&line).context("Failed to encode output line")?;
        bytes.push(b'\n');
        out.write_all(&bytes)
            .await
            .context("Failed to write output")?;
    }
    out.flush().await.context("Failed to flush output")?;
    Ok(())
}

/// Human-readable routing table: literal routes sorted by path, then pattern
/// routes in match order.
#[must_use]
pub fn route_table(router: &MessageRouter) -> Vec<String> {
    let mut literal: Vec<String> = router
        .routes()
        .map(|(path, chain)| format!("[route] /{path} {:?}", chain.handled_methods()))
        .collect();
    literal.sort();

    let patterns = router
        .pattern_routes()
        .enumerate()
        .map(|(priority, (pattern, chain))| {
            format!(
                "[pattern #{priority}] /{pattern} {:?}",
                chain.handled_methods()
            )
        });

    literal.into_iter().chain(patterns).collect()
}
