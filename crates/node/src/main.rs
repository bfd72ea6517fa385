// node/src/main.rs
use clap::{Parser, Subcommand};
use ledger_core::{ChainStore, MineOutcome, TxKind};
use node::{Node, NodeConfig};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "ledger-node")]
#[command(about = "Proof-of-work ledger anchoring an agent world", version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "./config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the node and its HTTP API
    Start {
        /// Override data directory
        #[arg(long)]
        data_dir: Option<String>,
    },

    /// Initialize a data directory with a default config and genesis chain
    Init {
        /// Data directory
        #[arg(long, default_value = "./data")]
        data_dir: String,
    },

    /// Show chain info
    Info,

    /// Audit the stored chain
    Validate,

    /// Record a transaction and mine it into a block.
    /// Pending transactions live in memory, so they are mined right away.
    Submit {
        /// ADD, MERGE, EXPORT, CLEAR or IMPORT
        #[arg(short, long)]
        kind: TxKind,

        /// JSON object payload
        #[arg(short, long, default_value = "{}")]
        payload: String,

        #[arg(long)]
        max_iters: Option<u64>,

        #[arg(long)]
        difficulty: Option<u32>,
    },

    /// Mine one block over the stored world state
    Mine {
        #[arg(long)]
        max_iters: Option<u64>,

        #[arg(long)]
        difficulty: Option<u32>,

        /// Mine even when nothing is pending
        #[arg(long)]
        allow_empty: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "node={lvl},rpc={lvl},ledger_core={lvl},agent_world={lvl},hyper=warn",
                    lvl = log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Start { data_dir } => {
            start_node(&cli.config, data_dir).await?;
        }
        Commands::Init { data_dir } => {
            init_node(&data_dir)?;
        }
        Commands::Info => {
            show_info(&cli.config)?;
        }
        Commands::Validate => {
            validate_chain(&cli.config)?;
        }
        Commands::Submit {
            kind,
            payload,
            max_iters,
            difficulty,
        } => {
            let node = Node::new(NodeConfig::load_or_default(&cli.config)?)?;
            let payload: serde_json::Value = serde_json::from_str(&payload)?;
            let id = node.submit(kind, &payload)?;
            tracing::info!("Submitted {} transaction {}", kind, id);
            report_outcome(&node.mine(max_iters, difficulty)?);
        }
        Commands::Mine {
            max_iters,
            difficulty,
            allow_empty,
        } => {
            let mut config = NodeConfig::load_or_default(&cli.config)?;
            config.ledger.allow_empty_blocks |= allow_empty;
            let node = Node::new(config)?;
            report_outcome(&node.mine(max_iters, difficulty)?);
        }
    }

    Ok(())
}

async fn start_node(config_path: &str, data_dir_override: Option<String>) -> anyhow::Result<()> {
    tracing::info!("Loading configuration from {}", config_path);
    let mut config = NodeConfig::load_or_default(config_path)?;

    if let Some(data_dir) = data_dir_override {
        config.data_dir = data_dir;
    }

    tracing::info!("Starting node with data directory: {}", config.data_dir);

    let node = Arc::new(Node::new(config)?);
    node.start(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
        }
        tracing::info!("Received shutdown signal");
    })
    .await?;

    tracing::info!("Node stopped gracefully");
    Ok(())
}

fn init_node(data_dir: &str) -> anyhow::Result<()> {
    tracing::info!("Initializing node at {}", data_dir);

    std::fs::create_dir_all(data_dir)?;

    let config = NodeConfig {
        data_dir: data_dir.to_string(),
        ..Default::default()
    };

    tracing::info!("Creating genesis chain");
    let chain = ChainStore::new(config.chain_path())
        .load_or_genesis(config.ledger.difficulty, config.ledger.target_scheme)?;
    tracing::info!("Chain at height {}, tip {}", chain.height(), chain.tip().hash);

    let config_path = Path::new(data_dir).join("config.toml");
    config.to_file(&config_path)?;

    tracing::info!("Node initialized successfully at {}", data_dir);
    tracing::info!("Edit {} to configure your node", config_path.display());

    Ok(())
}

fn show_info(config_path: &str) -> anyhow::Result<()> {
    let config = NodeConfig::load_or_default(config_path)?;
    let info = ChainStore::new(config.chain_path()).read_snapshot()?.info()?;
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

fn validate_chain(config_path: &str) -> anyhow::Result<()> {
    let config = NodeConfig::load_or_default(config_path)?;
    let snapshot = ChainStore::new(config.chain_path()).read_snapshot()?;
    let violations = snapshot.audit()?;

    if violations.is_empty() {
        tracing::info!("Chain is valid ({} blocks)", snapshot.blocks.len());
        return Ok(());
    }

    for violation in &violations {
        tracing::error!("{}", violation);
    }
    anyhow::bail!("chain has {} violation(s)", violations.len())
}

fn report_outcome(outcome: &MineOutcome) {
    match outcome {
        MineOutcome::Mined(block) => {
            tracing::info!(
                "Mined block #{} nonce={} hash={} ({} txs)",
                block.index,
                block.nonce,
                block.hash,
                block.tx_count()
            );
        }
        MineOutcome::Exhausted { attempts } => {
            tracing::warn!("No block found after {} attempts", attempts);
        }
        MineOutcome::NothingPending => {
            tracing::warn!("Nothing pending; pass --allow-empty to mine an empty block");
        }
    }
}
