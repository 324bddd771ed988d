//! nanomock: drives a test network's nodes over RPC to build its ledger.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::{Args, Parser};
use nanomock_blockgen::{
    create_node_wallets, write_block_file, AccountOpener, AccountTreeGenerator, BlockBuilder, BlockResult,
    BuildOptions, Bootstrapper, ChangeGenerator, ForkGenerator, ForkRequest, LocalSigner, NetworkConfig,
    TreeRequest, WeightMode,
};
use nanomock_crypto::{AccountKey, KeySpec};
use nanomock_rpc::{LedgerRpc, NodeRpc};
use nanomock_types::{Account, Amount, Seed};
use nanomock_utils::{format_elapsed, init_logging, LogFormat};

#[derive(Parser)]
#[command(name = "nanomock", about = "Ledger setup and block generation for local test networks")]
struct Cli {
    /// Path to the network TOML file. Defaults apply when omitted.
    #[arg(long, env = "NANOMOCK_CONFIG")]
    config: Option<PathBuf>,

    /// Node RPC endpoint. Overrides the config file.
    #[arg(long, env = "NANOMOCK_RPC_URL")]
    rpc_url: Option<String>,

    /// HTTP basic auth user for the RPC endpoint.
    #[arg(long, env = "NANOMOCK_RPC_USER")]
    rpc_user: Option<String>,

    #[arg(long, env = "NANOMOCK_RPC_PASSWORD", requires = "rpc_user")]
    rpc_password: Option<String>,

    /// Sign blocks and solve work locally instead of calling block_create.
    #[arg(long, env = "NANOMOCK_LOCAL_SIGN")]
    local_sign: bool,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, default_value = "info", env = "NANOMOCK_LOG_LEVEL")]
    log_level: String,

    /// Log format: "human" or "json".
    #[arg(long, default_value = "human", env = "NANOMOCK_LOG_FORMAT")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

/// An account given either by private key or by seed and index.
#[derive(Args)]
struct KeyArgs {
    /// Private key, 64 hex digits.
    #[arg(long, conflicts_with = "seed")]
    key: Option<String>,

    /// Seed, 64 hex digits.
    #[arg(long)]
    seed: Option<String>,

    #[arg(long, default_value_t = 0)]
    index: u32,
}

impl KeyArgs {
    fn key_spec(&self) -> anyhow::Result<KeySpec> {
        match (&self.key, &self.seed) {
            (Some(key), _) => Ok(KeySpec::Private(key.clone())),
            (None, Some(seed)) => Ok(KeySpec::Seed {
                seed: seed.clone(),
                index: self.index,
            }),
            (None, None) => anyhow::bail!("either --key or --seed is required"),
        }
    }

    fn derive(&self) -> anyhow::Result<AccountKey> {
        Ok(self.key_spec()?.derive()?)
    }
}

#[derive(clap::Subcommand)]
enum Command {
    /// Create node wallets and publish the initial blocks.
    #[command(alias = "bootstrap")]
    Init {
        /// Fund representatives without opening their accounts.
        #[arg(long)]
        send_only: bool,

        /// Skip wallet creation.
        #[arg(long)]
        no_wallets: bool,
    },

    /// Create a wallet on every node holding its representative account.
    Wallets,

    /// Open a tree of accounts funded from one source account.
    Split {
        #[command(flatten)]
        source: KeyArgs,

        /// Seed of the opened accounts.
        #[arg(long)]
        dest_seed: Seed,

        #[arg(long, default_value_t = 2)]
        split_count: u32,

        #[arg(long, default_value_t = 1000)]
        accounts: u32,

        /// Raw balance every opened account keeps.
        #[arg(long, default_value = "1000000000000000000000000000000")]
        min_balance: Amount,

        #[arg(long)]
        representative: Option<Account>,

        /// Publish every block as it is built.
        #[arg(long)]
        broadcast: bool,

        /// Write the blocks to this file.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Build forked sub-chains for conflict-resolution tests. Never published.
    Forks {
        #[arg(long)]
        source_seed: Seed,

        #[arg(long, default_value_t = 0)]
        source_index: u32,

        #[arg(long)]
        dest_seed: Seed,

        #[arg(long, default_value = "1")]
        amount: Amount,

        #[arg(long)]
        peers: u32,

        #[arg(long, default_value_t = 1)]
        forks_per_peer: u32,

        #[arg(long, default_value_t = 5)]
        depth: u32,

        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Send to an account and open it.
    Open {
        #[command(flatten)]
        source: KeyArgs,

        #[arg(long)]
        dest_seed: Seed,

        #[arg(long, default_value_t = 0)]
        dest_index: u32,

        #[arg(long)]
        amount: Amount,

        #[arg(long)]
        representative: Option<Account>,

        #[arg(long)]
        broadcast: bool,
    },

    /// Change an account's representative. A random one is used when omitted.
    Change {
        #[command(flatten)]
        account: KeyArgs,

        #[arg(long)]
        representative: Option<Account>,

        #[arg(long)]
        broadcast: bool,
    },
}

struct App {
    config: NetworkConfig,
    rpc_url: String,
    auth: Option<(String, String)>,
    local_sign: bool,
}

impl App {
    fn rpc(&self, url: &str) -> anyhow::Result<Arc<dyn LedgerRpc>> {
        let mut rpc = NodeRpc::new(url)?;
        if let Some((user, password)) = &self.auth {
            rpc = rpc.with_basic_auth(user, password);
        }
        Ok(Arc::new(rpc))
    }

    fn builder(&self) -> anyhow::Result<BlockBuilder> {
        let rpc = self.rpc(&self.rpc_url)?;
        let mut builder = BlockBuilder::new(rpc.clone()).with_policy(self.config.broadcast_policy());
        if self.local_sign {
            builder = builder.with_signer(Arc::new(LocalSigner::new(rpc)));
        }
        Ok(builder)
    }
}

fn report(results: &[BlockResult]) -> anyhow::Result<()> {
    for result in results {
        println!("{}", result.summary());
    }
    let failed = results.iter().filter(|r| !r.success).count();
    if failed > 0 {
        anyhow::bail!("{failed} of {} blocks failed", results.len());
    }
    Ok(())
}

fn save(out: Option<PathBuf>, runs: &[Vec<BlockResult>]) -> anyhow::Result<()> {
    if let Some(path) = out {
        write_block_file(&path, runs).with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(())
}

async fn create_wallets(app: &App) -> anyhow::Result<()> {
    let mut nodes = Vec::new();
    for node in app.config.nodes() {
        let rpc = app.rpc(app.config.node_rpc_url(&node))?;
        nodes.push((node, rpc));
    }
    let mut failed = 0;
    for wallet in create_node_wallets(nodes).await {
        if let Err(e) = wallet {
            tracing::error!("wallet creation failed: {e}");
            failed += 1;
        }
    }
    if failed > 0 {
        anyhow::bail!("{failed} node wallets could not be created");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format, &cli.log_level)?;

    let config = match &cli.config {
        Some(path) => {
            let path = path.to_string_lossy();
            let config = NetworkConfig::from_toml_file(&path)?;
            tracing::info!("loaded network config from {path}");
            config
        }
        None => NetworkConfig::default(),
    };
    config.validate()?;

    let app = App {
        rpc_url: cli.rpc_url.unwrap_or_else(|| config.rpc_url.clone()),
        auth: cli.rpc_user.map(|user| (user, cli.rpc_password.unwrap_or_default())),
        local_sign: cli.local_sign,
        config,
    };
    let started = Instant::now();

    match cli.command {
        Command::Init { send_only, no_wallets } => {
            if !no_wallets {
                create_wallets(&app).await?;
            }
            let mode = if send_only { WeightMode::SendOnly } else { WeightMode::SendAndOpen };
            let outcome = Bootstrapper::new(app.builder()?, app.config.clone())
                .with_mode(mode)
                .run()
                .await?;
            let warnings = outcome.log.warnings().count();
            if warnings > 0 {
                tracing::warn!("bootstrap finished with {warnings} warnings");
            }
            let unpublished = outcome.blocks.iter().filter(|b| !b.published).count();
            if unpublished > 0 {
                anyhow::bail!("{unpublished} initial blocks were not published");
            }
        }
        Command::Wallets => create_wallets(&app).await?,
        Command::Split {
            source,
            dest_seed,
            split_count,
            accounts,
            min_balance,
            representative,
            broadcast,
            out,
        } => {
            let request = TreeRequest {
                source: source.derive()?,
                destination_seed: dest_seed,
                split_count,
                accounts,
                min_balance,
                representative,
            };
            let blocks = AccountTreeGenerator::new(app.builder()?, broadcast)
                .generate(&request)
                .await?;
            report(&blocks)?;
            save(out, &[blocks])?;
        }
        Command::Forks {
            source_seed,
            source_index,
            dest_seed,
            amount,
            peers,
            forks_per_peer,
            depth,
            out,
        } => {
            let request = ForkRequest {
                source_seed,
                source_index,
                dest_seed,
                amount,
                peer_count: peers,
                forks_per_peer,
                max_depth: depth,
            };
            let chain = ForkGenerator::new(app.builder()?).make_deep_forks(&request).await?;
            let runs = vec![vec![chain.gap], chain.forks];
            report(&runs.concat())?;
            save(out, &runs)?;
        }
        Command::Open {
            source,
            dest_seed,
            dest_index,
            amount,
            representative,
            broadcast,
        } => {
            let destination = AccountKey::from_seed(&dest_seed, dest_index);
            let blocks = AccountOpener::new(app.builder()?)
                .open(
                    &source.derive()?,
                    &destination,
                    amount,
                    representative,
                    BuildOptions::in_memory(broadcast),
                )
                .await;
            report(&blocks)?;
        }
        Command::Change {
            account,
            representative,
            broadcast,
        } => {
            let changes = ChangeGenerator::new(app.builder()?, broadcast);
            let result = changes.change_spec(&account.key_spec()?, representative).await?;
            report(&[result])?;
        }
    }

    tracing::info!("done in {}", format_elapsed(started.elapsed()));
    Ok(())
}
