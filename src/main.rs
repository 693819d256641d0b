//! anchor: drive persona sessions from the command line
//!
//! Usage:
//!   anchor --workspace ./persona --session alice send "a loud noise outside"
//!   anchor --workspace ./persona --session alice tick --deltas '{"Instability": 0.1}'
//!   anchor --workspace ./persona --session alice state
//!
//! The workspace holds `anchor.toml`, `seeds/`, `drift_lexicons/`,
//! `memory_clusters/` and the `sessions/` snapshot store. Replies are JSON on
//! stdout; logs go to stderr.

use anchor_core::SessionKey;
use anchor_engine::{Anchor, Deltas, EngineConfig, SnapshotRecord};
use anchor_service::{AnchorService, FileStore, InMemoryStore, SessionStore};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "anchor", about = "Bounded persona state engine")]
struct Cli {
    /// Workspace root (config, seeds, lexicons, clusters, sessions)
    #[arg(long, default_value = ".")]
    workspace: String,

    /// Path to config file (TOML). Default: <workspace>/anchor.toml
    #[arg(long)]
    config: Option<String>,

    /// Session id; also the seed alias used when the session is new
    #[arg(long, default_value = "default")]
    session: String,

    /// Keep sessions in memory only (nothing survives the process)
    #[arg(long)]
    ephemeral: bool,

    /// Dump default config as TOML and exit.
    #[arg(long)]
    dump_config: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Parse free text into cues and run one tick
    Send {
        text: String,
        /// Attach the full diagnostic snapshot to the reply
        #[arg(long)]
        full_state: bool,
    },
    /// Run one tick with explicit deltas
    Tick {
        /// JSON object of dimension deltas, e.g. '{"Fear": 0.1}'
        #[arg(long)]
        deltas: Option<String>,
        /// Negative valence (lowers trust)
        #[arg(long)]
        negative: bool,
    },
    /// Print the full diagnostic snapshot
    State,
    /// Replace the memory orbit from a JSON node list
    LoadMemory { path: PathBuf },
    /// Print the stored snapshot record
    Export,
    /// Overwrite the stored session from a snapshot file
    Import { path: PathBuf },
    /// Forget the session
    Reset,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.dump_config {
        println!("{}", EngineConfig::default().to_toml());
        return Ok(());
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "anchor=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let Some(command) = cli.command else {
        anyhow::bail!("no command given (try --help)");
    };

    let workspace = expand_tilde(&cli.workspace);
    let config_path = cli
        .config
        .map(|p| expand_tilde(&p))
        .unwrap_or_else(|| workspace.join("anchor.toml"));
    let config = EngineConfig::load(&config_path).rooted_at(&workspace);
    tracing::debug!("Workspace {}, session {}", workspace.display(), cli.session);

    let store: Arc<dyn SessionStore> = if cli.ephemeral {
        Arc::new(InMemoryStore::new(config.store.ttl_secs))
    } else {
        Arc::new(FileStore::from_config(&config.store))
    };
    let service = AnchorService::new(Arc::new(Anchor::new(config)), store);
    let key = SessionKey::new(cli.session);

    let output = match command {
        Command::Send { text, full_state } => {
            serde_json::to_value(service.send_input(&key, &text, full_state).await?)?
        }
        Command::Tick { deltas, negative } => {
            let deltas = deltas
                .map(|raw| serde_json::from_str::<Deltas>(&raw))
                .transpose()
                .map_err(|e| anyhow::anyhow!("invalid --deltas: {}", e))?;
            serde_json::to_value(service.run_tick(&key, deltas, !negative).await?)?
        }
        Command::State => serde_json::to_value(service.full_state(&key).await?)?,
        Command::LoadMemory { path } => {
            let count = service.load_memory(&key, &path).await?;
            serde_json::json!({ "session_id": key.as_str(), "loaded": count })
        }
        Command::Export => serde_json::to_value(service.export(&key).await?)?,
        Command::Import { path } => {
            let record = SnapshotRecord::from_json(&std::fs::read_to_string(&path)?)?;
            service.import(&key, record).await?;
            serde_json::json!({ "session_id": key.as_str(), "imported": true })
        }
        Command::Reset => {
            let removed = service.reset(&key).await?;
            serde_json::json!({ "session_id": key.as_str(), "removed": removed })
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(stripped);
        }
    }
    PathBuf::from(path)
}
