//! FOMODEX daemon: runs the node and HTTP API, and offers operator commands
//! for admin accounts and governance payments.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use uuid::Uuid;

use fomo_governance::{GovernanceError, ProposalDraft, ResumeOutcome};
use fomo_ledger::{Ledger, RemoteSigner, RpcLedger};
use fomo_node::{init_logging, FomoNode, LogFormat, NodeConfig};
use fomo_rpc::{AppState, RpcServer};
use fomo_types::{ProposalCategory, ProposalId, Timestamp, VoteChoice, WalletAddress};

#[derive(Parser)]
#[command(name = "fomo-daemon", about = "FOMODEX governance and registry node")]
struct Cli {
    /// Path to a TOML configuration file. File settings are the base;
    /// flags and env vars override them.
    #[arg(long, env = "FOMO_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory for the LMDB store.
    #[arg(long, env = "FOMO_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Ledger JSON-RPC endpoint.
    #[arg(long, env = "FOMO_LEDGER_URL")]
    ledger_url: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "FOMO_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "FOMO_LOG_FORMAT")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the node and serve the HTTP API until SIGINT/SIGTERM.
    Run {
        #[arg(long, env = "FOMO_BIND_ADDRESS")]
        bind_address: Option<String>,

        #[arg(long, env = "FOMO_RPC_PORT")]
        rpc_port: Option<u16>,

        /// Disable the Prometheus endpoint.
        #[arg(long, env = "FOMO_DISABLE_METRICS")]
        disable_metrics: bool,
    },
    /// Configuration helpers.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Admin account management.
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Governance actions paid from a wallet through the configured signer.
    Governance {
        #[command(subcommand)]
        action: GovernanceAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the default configuration as TOML.
    Default,
    /// Print the effective configuration after file, flag and env overrides.
    Show,
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create or replace an admin account. The password is read from
    /// FOMO_ADMIN_PASSWORD.
    AddUser {
        username: String,
        #[arg(long, env = "FOMO_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[derive(Subcommand)]
enum GovernanceAction {
    /// Burn and reward, then record a vote.
    Vote {
        #[arg(long, env = "FOMO_WALLET")]
        wallet: String,
        #[arg(long)]
        proposal: String,
        /// "for" or "against".
        #[arg(long)]
        choice: String,
    },
    /// Burn the creation cost, then record a proposal.
    Propose {
        #[arg(long, env = "FOMO_WALLET")]
        wallet: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long, default_value = "other")]
        category: String,
        /// YYYY-MM-DD
        #[arg(long)]
        start: NaiveDate,
        /// YYYY-MM-DD
        #[arg(long)]
        end: NaiveDate,
        #[arg(long, default_value = "anonymous")]
        author: String,
    },
    /// Drive a journaled payment forward. Pass the paying wallet when the
    /// reward transfer still has to be made.
    Resume {
        payment_id: Uuid,
        #[arg(long, env = "FOMO_WALLET")]
        wallet: Option<String>,
    },
    /// List payments that are not settled.
    Unsettled,
}

fn load_config(cli: &Cli) -> anyhow::Result<NodeConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let path = path.to_string_lossy();
            NodeConfig::from_toml_file(&path).with_context(|| format!("loading config {path}"))?
        }
        None => NodeConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(url) = &cli.ledger_url {
        config.ledger_url = url.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.log_format = format.clone();
    }
    if let Command::Run {
        bind_address,
        rpc_port,
        disable_metrics,
    } = &cli.command
    {
        if let Some(addr) = bind_address {
            config.bind_address = addr.clone();
        }
        if let Some(port) = rpc_port {
            config.rpc_port = *port;
        }
        if *disable_metrics {
            config.enable_metrics = false;
        }
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let format: LogFormat = config.log_format.parse()?;
    init_logging(format, &config.log_level)?;

    match cli.command {
        Command::Run { .. } => run(config).await,
        Command::Config { action } => {
            let out = match action {
                ConfigAction::Default => NodeConfig::default().to_toml_string()?,
                ConfigAction::Show => config.to_toml_string()?,
            };
            println!("{out}");
            Ok(())
        }
        Command::Admin {
            action: AdminAction::AddUser { username, password },
        } => {
            let node = FomoNode::open(config)?;
            let cred = node.auth.add_user(&username, &password, Timestamp::now())?;
            println!("admin {} stored", cred.username);
            Ok(())
        }
        Command::Governance { action } => governance(config, action).await,
    }
}

async fn run(config: NodeConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = config
        .listen_address()
        .parse()
        .with_context(|| format!("invalid listen address {}", config.listen_address()))?;
    tracing::info!(
        data_dir = %config.data_dir.display(),
        ledger = %config.ledger_url,
        %addr,
        metrics = config.enable_metrics,
        "starting FOMODEX daemon"
    );

    let mut node = FomoNode::open(config)?;
    node.start()?;

    let state = Arc::new(AppState::from_node(&node)?);
    let server = RpcServer::new(addr);
    let shutdown_rx = node.subscribe_shutdown();
    let serve = tokio::spawn(async move { server.serve(state, shutdown_rx).await });

    node.wait_for_signal().await;
    match serve.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "HTTP API failed"),
        Err(e) => tracing::error!(error = %e, "HTTP API task panicked"),
    }
    node.stop().await;
    tracing::info!("FOMODEX daemon exited cleanly");
    Ok(())
}

/// Open the store with a ledger that signs for `wallet` through the
/// configured signer bridge.
fn node_for_wallet(config: NodeConfig, wallet: &WalletAddress) -> anyhow::Result<FomoNode> {
    let signer_url = config
        .signer_url
        .clone()
        .ok_or_else(|| anyhow!("signer_url must be set to pay from a wallet"))?;
    let signer = RemoteSigner::new(signer_url, wallet.clone())?;
    let ledger: Arc<dyn Ledger> =
        Arc::new(RpcLedger::new(config.ledger_config())?.with_signer(Arc::new(signer)));
    Ok(FomoNode::with_ledger(config, ledger)?)
}

/// Print the banner text for a governance failure and exit non-zero.
fn report(e: GovernanceError) -> anyhow::Error {
    eprintln!("{}", e.user_message());
    anyhow::Error::new(e)
}

async fn governance(config: NodeConfig, action: GovernanceAction) -> anyhow::Result<()> {
    let now = Timestamp::now();
    match action {
        GovernanceAction::Vote {
            wallet,
            proposal,
            choice,
        } => {
            let wallet: WalletAddress = wallet.parse()?;
            let proposal: ProposalId = proposal.parse()?;
            let choice: VoteChoice = choice.parse()?;
            let node = node_for_wallet(config, &wallet)?;
            let session = node.governance.wallet_session(wallet).await.map_err(report)?;
            let recorded = node
                .governance
                .handle_vote(Some(&session), &proposal, choice, now)
                .await
                .map_err(report)?;
            println!("{}", serde_json::to_string_pretty(&recorded.proposal)?);
            println!("votes today: {}", recorded.votes_today);
        }
        GovernanceAction::Propose {
            wallet,
            title,
            description,
            category,
            start,
            end,
            author,
        } => {
            let wallet: WalletAddress = wallet.parse()?;
            let category: ProposalCategory = category.parse()?;
            let node = node_for_wallet(config, &wallet)?;
            let session = node.governance.wallet_session(wallet).await.map_err(report)?;
            let draft = ProposalDraft {
                title,
                description,
                category,
                start_date: start,
                end_date: end,
                author,
            };
            let proposal = node
                .governance
                .handle_create_proposal(Some(&session), draft, now)
                .await
                .map_err(report)?;
            println!("{}", serde_json::to_string_pretty(&proposal)?);
        }
        GovernanceAction::Resume { payment_id, wallet } => {
            let node = match wallet {
                Some(w) => node_for_wallet(config, &w.parse::<WalletAddress>()?)?,
                None => FomoNode::open(config)?,
            };
            match node.governance.resume_payment(&payment_id, now).await.map_err(report)? {
                ResumeOutcome::VoteRecorded(v) => {
                    println!("vote recorded on {}", v.proposal.id)
                }
                ResumeOutcome::ProposalRecorded(p) => println!("proposal {} recorded", p.id),
                ResumeOutcome::Settled(state) => println!("payment already settled: {state}"),
                ResumeOutcome::Unresolved(state) => {
                    bail!("payment {payment_id} still needs an operator: {state}")
                }
            }
        }
        GovernanceAction::Unsettled => {
            let node = FomoNode::open(config)?;
            let unsettled = node.governance.unsettled_payments()?;
            println!("{}", serde_json::to_string_pretty(&unsettled)?);
        }
    }
    Ok(())
}
