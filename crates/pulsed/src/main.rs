//! pulsed — the PulseGrid daemon.
//!
//! Assembles the decision loop:
//! - Scorer + decay loop
//! - Rules engine
//! - Activation spine + proof signal manager
//! - Optional redb state mirror
//!
//! Client events are read as newline-delimited JSON and every outbound
//! event is printed as a JSON line.
//!
//! # Usage
//!
//! ```text
//! pulsed run --config pulse.toml --data-dir /var/lib/pulsegrid --events session.jsonl
//! pulsed config > pulse.toml
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

use pulse_core::PulseConfig;
use pulsed::{ClientEnvelope, Orchestrator, Outbound, SimulatedWorkloads};
use pulsegrid_state::StateStore;

#[derive(Parser)]
#[command(name = "pulsed", about = "PulseGrid content-streaming orchestrator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the decision loop over a stream of client events.
    Run {
        /// Path to pulse.toml. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Data directory for the state mirror. No mirror when omitted.
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Newline-delimited JSON client events. Reads stdin when omitted.
        #[arg(long)]
        events: Option<PathBuf>,
    },
    /// Print the default configuration as TOML.
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pulsed=debug,pulsegrid=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            config,
            data_dir,
            events,
        } => run(config, data_dir, events).await,
        Command::Config => {
            print!("{}", PulseConfig::default().to_toml_string()?);
            Ok(())
        }
    }
}

async fn run(
    config_path: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    events: Option<PathBuf>,
) -> anyhow::Result<()> {
    info!("PulseGrid daemon starting");

    let config = match config_path {
        Some(ref path) => {
            let config = PulseConfig::from_file(path)?;
            info!(path = ?path, "configuration loaded");
            config
        }
        None => PulseConfig::default(),
    };

    // ── State mirror ───────────────────────────────────────────

    let store = match data_dir {
        Some(dir) => {
            std::fs::create_dir_all(&dir)?;
            let db_path = dir.join("pulse.redb");
            let store = StateStore::open(&db_path)?;
            info!(path = ?db_path, "state mirror opened");
            Some(store)
        }
        None => None,
    };

    let orchestrator = Arc::new(Orchestrator::new(
        config,
        Arc::new(SimulatedWorkloads::new()),
        store,
    ));

    // ── Background tasks ───────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let printer = tokio::spawn(print_outbound(
        orchestrator.hub().subscribe(),
        shutdown_rx.clone(),
    ));

    let decay_orchestrator = orchestrator.clone();
    let decay_shutdown = shutdown_rx.clone();
    let decay_handle = tokio::spawn(async move {
        decay_orchestrator.run_decay(decay_shutdown).await;
    });

    orchestrator.initial_warm();

    // ── Event loop ─────────────────────────────────────────────

    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match events {
        Some(ref path) => {
            info!(path = ?path, "replaying client events");
            Box::new(BufReader::new(tokio::fs::File::open(path).await?))
        }
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };
    let mut lines = reader.lines();
    let mut line_no = 0u64;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!(lines = line_no, "end of client events");
                    break;
                };
                line_no += 1;
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<ClientEnvelope>(line) {
                    Ok(envelope) => orchestrator.handle(&envelope.session_id, envelope.event),
                    Err(e) => warn!(line = line_no, error = %e, "malformed client event skipped"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
        }
    }

    let _ = shutdown_tx.send(true);
    let _ = decay_handle.await;
    let _ = printer.await;

    info!(decisions = orchestrator.decisions(0).len(), "PulseGrid daemon stopped");
    Ok(())
}

/// Print every outbound event as a JSON line until shutdown, then drain
/// whatever is still queued.
async fn print_outbound(
    mut rx: broadcast::Receiver<Outbound>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Ok(outbound) => print_line(&outbound),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "output fell behind, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return,
            },
            _ = shutdown.changed() => break,
        }
    }

    while let Ok(outbound) = rx.try_recv() {
        print_line(&outbound);
    }
}

fn print_line(outbound: &Outbound) {
    match serde_json::to_string(outbound) {
        Ok(json) => println!("{json}"),
        Err(e) => warn!(
            kind = outbound.event.kind(),
            error = %e,
            "outbound event not serializable"
        ),
    }
}
