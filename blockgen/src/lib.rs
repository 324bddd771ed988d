//! Block construction and synthetic ledger-graph generation.
//!
//! The [`BlockBuilder`] turns a [`BlockIntent`] for one account into a signed
//! state block, resolving the chain head from the shared [`FrontierCache`] or
//! from the node, and optionally publishes it. The generators layered on top
//! of it produce account trees ([`AccountTreeGenerator`]), deliberate forks
//! ([`ForkGenerator`]) and the initial blocks of a fresh test network
//! ([`Bootstrapper`]). Runs can be persisted with [`write_block_file`].

pub mod account_tree;
pub mod amount_math;
pub mod block_file;
pub mod bootstrap;
pub mod builder;
pub mod change;
pub mod config;
pub mod draft;
pub mod error;
pub mod fork;
pub mod frontier_cache;
pub mod opener;
pub mod result;
pub mod signer;

pub use account_tree::{accounts_for_depth, splitting_depth, AccountTreeGenerator, TreeRequest};
pub use amount_math::{multiply, percent, AmountError, DecimalFactor, MAX_DIGITS};
pub use block_file::{read_block_file, write_block_file, BlockFile};
pub use bootstrap::{
    create_node_wallet, create_node_wallets, BootstrapLog, BootstrapOutcome, Bootstrapper, LogEntry,
    LogLevel, NodeWallet, WeightMode,
};
pub use builder::{BlockBuilder, BuildOptions};
pub use change::ChangeGenerator;
pub use config::{BroadcastPolicy, NetworkConfig, NodeConfig, Representatives, GENESIS_NODE_NAME};
pub use draft::{BlockDraft, BlockIntent, ChainState};
pub use error::BlockgenError;
pub use fork::{ForkChain, ForkGenerator, ForkRequest};
pub use frontier_cache::{FrontierCache, FrontierEntry};
pub use opener::AccountOpener;
pub use result::{AccountData, BlockResult};
pub use signer::{BlockSigner, LocalSigner, RpcSigner};
