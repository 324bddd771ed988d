//! Initial blocks of a fresh test network.
//!
//! [`Bootstrapper::run`] publishes, in this order:
//!
//! 1. `epoch_count` epoch upgrades from the genesis account, logging the
//!    active difficulty before the first and after each one;
//! 2. a 1 raw send to the canary account and the canary's open;
//! 3. the configured burn send, unless it exceeds the genesis balance;
//! 4. the vote-weight distribution: every node with a weight or a balance is
//!    funded from genesis, capped at what genesis has left, and (by default)
//!    opened with itself as representative.
//!
//! Every step is also recorded in the returned [`BootstrapLog`]. Once blocks
//! have been published, a failing step is logged as a warning and the run
//! still returns what reached the node.

use std::sync::Arc;

use futures_util::future::join_all;
use nanomock_crypto::{AccountKey, KeySpec};
use nanomock_rpc::LedgerRpc;
use nanomock_types::{epoch_link, Account, Amount};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::amount_math::percent;
use crate::builder::{BlockBuilder, BuildOptions};
use crate::config::{NetworkConfig, NodeConfig};
use crate::draft::BlockIntent;
use crate::error::BlockgenError;
use crate::opener::AccountOpener;
use crate::result::BlockResult;

/// How representatives receive their vote weight.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WeightMode {
    /// Send from genesis, then open the representative's account.
    #[default]
    SendAndOpen,
    /// Send only; the amount stays receivable.
    SendOnly,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Warning,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
}

/// Ordered record of what a bootstrap did.
#[derive(Clone, Debug, Default, Serialize)]
pub struct BootstrapLog {
    entries: Vec<LogEntry>,
}

impl BootstrapLog {
    pub fn info(&mut self, message: String) {
        info!("{message}");
        self.entries.push(LogEntry {
            level: LogLevel::Info,
            message,
        });
    }

    pub fn warn(&mut self, message: String) {
        warn!("{message}");
        self.entries.push(LogEntry {
            level: LogLevel::Warning,
            message,
        });
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn warnings(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|entry| entry.level == LogLevel::Warning)
            .map(|entry| entry.message.as_str())
    }
}

#[derive(Debug)]
pub struct BootstrapOutcome {
    /// Every block built, in publish order.
    pub blocks: Vec<BlockResult>,
    pub log: BootstrapLog,
}

/// A representative funded by the weight distribution.
struct Allocation {
    key: AccountKey,
    balance: Amount,
}

fn hash_text(result: &BlockResult) -> String {
    match (&result.hash, &result.error) {
        (Some(hash), _) if result.success => hash.to_string(),
        (_, Some(error)) => format!("FAILED ({error})"),
        _ => "FAILED".to_string(),
    }
}

pub struct Bootstrapper {
    builder: BlockBuilder,
    config: NetworkConfig,
    mode: WeightMode,
}

impl Bootstrapper {
    pub fn new(builder: BlockBuilder, config: NetworkConfig) -> Self {
        Self {
            builder,
            config,
            mode: WeightMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: WeightMode) -> Self {
        self.mode = mode;
        self
    }

    /// Errors only on a config that fails validation, before anything is published.
    pub async fn run(&self) -> Result<BootstrapOutcome, BlockgenError> {
        self.config.validate()?;
        let genesis = self.config.genesis()?;
        let canary = self.config.canary()?;
        let mut outcome = BootstrapOutcome {
            blocks: Vec::new(),
            log: BootstrapLog::default(),
        };

        self.publish_epochs(&genesis, &mut outcome).await;
        self.publish_canary(&genesis, &canary, &mut outcome).await;
        if let Err(e) = self.send_to_burn(&genesis, &mut outcome).await {
            outcome.log.warn(format!("burn send skipped: {e}"));
        }
        match self.allocate_weights(&genesis, &mut outcome.log).await {
            Ok(allocations) => self.send_vote_weight(&genesis, allocations, &mut outcome).await,
            Err(e) => outcome.log.warn(format!("vote weight distribution skipped: {e}")),
        }

        Ok(outcome)
    }

    async fn log_active_difficulty(&self, log: &mut BootstrapLog) {
        match self.builder.rpc().active_difficulty().await {
            Ok(difficulty) => log.info(format!(
                "current_diff : [{}]  current_receive_diff: [{}]",
                difficulty.network_current, difficulty.network_receive_current
            )),
            Err(e) => log.warn(format!("active difficulty unavailable: {e}")),
        }
    }

    async fn publish_epochs(&self, genesis: &AccountKey, outcome: &mut BootstrapOutcome) {
        self.log_active_difficulty(&mut outcome.log).await;
        for epoch in 1..=self.config.epoch_count {
            let result = self
                .builder
                .build(
                    genesis,
                    BlockIntent::Epoch {
                        link: epoch_link(epoch),
                    },
                    BuildOptions::published(),
                )
                .await;
            outcome
                .log
                .info(format!("EPOCH {epoch} sent by genesis : HASH {}", hash_text(&result)));
            outcome.blocks.push(result);
            self.log_active_difficulty(&mut outcome.log).await;
        }
    }

    async fn publish_canary(&self, genesis: &AccountKey, canary: &AccountKey, outcome: &mut BootstrapOutcome) {
        let opener = AccountOpener::new(self.builder.clone());
        let pair = opener
            .open(
                genesis,
                canary,
                Amount::raw(1),
                Some(genesis.account),
                BuildOptions::published(),
            )
            .await;
        outcome.log.info(format!(
            "SEND FINAL VOTES CANARY BLOCK FROM {} To {} : HASH {}",
            genesis.account,
            canary.account,
            hash_text(&pair[0])
        ));
        outcome.log.info(format!(
            "OPENED CANARY ACCOUNT {} : HASH {}",
            canary.account,
            hash_text(&pair[1])
        ));
        outcome.blocks.extend(pair);
    }

    async fn send_to_burn(&self, genesis: &AccountKey, outcome: &mut BootstrapOutcome) -> Result<(), BlockgenError> {
        let Some(burn_amount) = self.config.burn_amount else {
            debug!("burn_amount is not set, skipping burn");
            return Ok(());
        };
        let balance = self.builder.balance(&genesis.account, false).await?;
        if burn_amount > balance {
            outcome
                .log
                .warn("[burn_amount] exceeds genesis balance. exit send_to_burn()".to_string());
            return Ok(());
        }

        let result = self
            .builder
            .build(
                genesis,
                BlockIntent::Send {
                    destination: Account::BURN,
                    amount: burn_amount,
                },
                BuildOptions::published(),
            )
            .await;
        outcome.log.info(sent_line(&result, genesis.account, Account::BURN));
        outcome.blocks.push(result);
        Ok(())
    }

    /// Turn weights into balances, capped at what genesis has left.
    async fn allocate_weights(
        &self,
        genesis: &AccountKey,
        log: &mut BootstrapLog,
    ) -> Result<Vec<Allocation>, BlockgenError> {
        let genesis_balance = self.builder.balance(&genesis.account, false).await?;
        let mut remaining = genesis_balance;
        let mut allocations = Vec::new();

        for node in self.config.nodes() {
            let requested = match requested_balance(&node, genesis_balance) {
                Ok(Some(requested)) => requested,
                Ok(None) => continue,
                Err(e) => {
                    log.warn(format!("Node [{}] is not funded: {e}", node.name));
                    continue;
                }
            };
            let key = match node.account_key() {
                Ok(key) => key,
                Err(e) => {
                    log.warn(format!("Node [{}] is not funded: {e}", node.name));
                    continue;
                }
            };
            if key.account == genesis.account {
                continue;
            }
            if remaining.is_zero() {
                log.warn(format!(
                    "No Genesis funds remaining! Account [{}] will not be opened!",
                    key.account
                ));
                continue;
            }
            if remaining < requested {
                log.warn(format!(
                    "Genesis remaining balance is too small! Send {remaining} instead of {requested}."
                ));
            }
            let balance = requested.min(remaining);
            remaining = remaining.saturating_sub(balance);
            allocations.push(Allocation { key, balance });
        }
        Ok(allocations)
    }

    /// Sends leave genesis one after another; opens touch disjoint accounts and run together.
    async fn send_vote_weight(&self, genesis: &AccountKey, allocations: Vec<Allocation>, outcome: &mut BootstrapOutcome) {
        let mut funded = Vec::new();
        for allocation in allocations {
            let send = self
                .builder
                .build(
                    genesis,
                    BlockIntent::Send {
                        destination: allocation.key.account,
                        amount: allocation.balance,
                    },
                    BuildOptions::published(),
                )
                .await;
            outcome.log.info(sent_line(&send, genesis.account, allocation.key.account));
            if let (true, Some(hash)) = (send.success, send.hash) {
                funded.push((allocation, hash));
            }
            outcome.blocks.push(send);
        }

        if self.mode == WeightMode::SendOnly {
            return;
        }

        let opens = join_all(funded.iter().map(|(allocation, hash)| {
            self.builder.build(
                &allocation.key,
                BlockIntent::Open {
                    source: *hash,
                    amount: allocation.balance,
                    representative: Some(allocation.key.account),
                },
                BuildOptions::published(),
            )
        }))
        .await;

        for open in opens {
            outcome.log.info(format!(
                "OPENED PR ACCOUNT {} : HASH {}",
                open.account(),
                hash_text(&open)
            ));
            outcome.blocks.push(open);
        }
    }
}

fn sent_line(result: &BlockResult, from: Account, to: Account) -> String {
    format!(
        "SENT {:>40} FROM {} To {} : HASH {}",
        result.amount_raw.to_string(),
        from,
        to,
        hash_text(result)
    )
}

/// A node's requested balance. Nodes with neither a weight nor a balance are not funded.
fn requested_balance(node: &NodeConfig, genesis_balance: Amount) -> Result<Option<Amount>, BlockgenError> {
    match (&node.vote_weight_percent, node.balance) {
        (Some(weight), _) => Ok(Some(percent(genesis_balance, weight)?)),
        (None, Some(balance)) => Ok(Some(balance)),
        (None, None) => Ok(None),
    }
}

/// A wallet created on a node for its representative account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeWallet {
    pub node: String,
    pub wallet: String,
    pub account: Account,
}

/// Create `node`'s wallet holding its representative account.
///
/// A seed becomes the wallet seed; a private key is added to a fresh wallet.
pub async fn create_node_wallet(
    rpc: &dyn LedgerRpc,
    node: &str,
    spec: &KeySpec,
) -> Result<NodeWallet, BlockgenError> {
    let key = spec.derive()?;
    let (wallet, account) = match (&key.seed, spec) {
        (Some(seed), KeySpec::Seed { .. }) => {
            let wallet = rpc.wallet_create(Some(seed)).await?;
            (wallet, key.account)
        }
        _ => {
            let wallet = rpc.wallet_create(None).await?;
            let account = rpc.wallet_add(&wallet, &key.private).await?;
            (wallet, account)
        }
    };
    info!("WALLET {wallet} CREATED FOR {node} WITH ACCOUNT {account}");
    Ok(NodeWallet {
        node: node.to_string(),
        wallet,
        account,
    })
}

/// Create every node's wallet concurrently, each through its own RPC endpoint.
pub async fn create_node_wallets(
    nodes: Vec<(NodeConfig, Arc<dyn LedgerRpc>)>,
) -> Vec<Result<NodeWallet, BlockgenError>> {
    join_all(nodes.iter().map(|(node, rpc)| async move {
        let spec = node.key_spec()?;
        create_node_wallet(rpc.as_ref(), &node.name, &spec).await
    }))
    .await
}
