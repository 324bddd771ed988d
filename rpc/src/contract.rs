//! The ledger RPC contract and its request/response shapes.

use async_trait::async_trait;
use nanomock_types::{Account, Amount, BlockHash, JsonBlock, Link, PrivateKey, Seed};
use nanomock_work::Difficulty;
use serde::{Deserialize, Serialize};

use crate::RpcError;

/// Chain head of an opened account, as reported by `account_info`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub frontier: BlockHash,
    pub balance: Amount,
    pub representative: Account,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub balance: Amount,
    #[serde(default, alias = "pending")]
    pub receivable: Amount,
}

/// Field values for a `block_create` call. The node signs with `key`.
pub struct BlockCreateRequest<'a> {
    pub key: &'a PrivateKey,
    pub previous: BlockHash,
    pub representative: Account,
    pub balance: Amount,
    pub link: Link,
}

/// A block the node has constructed and signed, not yet published.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct CreatedBlock {
    pub hash: BlockHash,
    #[serde(default)]
    pub difficulty: Option<String>,
    pub block: JsonBlock,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActiveDifficulty {
    pub network_current: Difficulty,
    pub network_receive_current: Difficulty,
    pub network_minimum: Difficulty,
}

/// Everything the block tooling needs from a ledger node.
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// `None` when the account has no chain yet.
    async fn account_info(&self, account: &Account) -> Result<Option<AccountInfo>, RpcError>;

    async fn account_balance(&self, account: &Account) -> Result<AccountBalance, RpcError>;

    async fn block_create(&self, request: &BlockCreateRequest<'_>) -> Result<CreatedBlock, RpcError>;

    /// Submit a signed block; returns the hash the node accepted.
    async fn process(&self, block: &JsonBlock) -> Result<BlockHash, RpcError>;

    async fn active_difficulty(&self) -> Result<ActiveDifficulty, RpcError>;

    /// Create a node wallet, optionally restored from `seed`. Returns the wallet id.
    async fn wallet_create(&self, seed: Option<&Seed>) -> Result<String, RpcError>;

    /// Add a private key to a node wallet. Returns the account it controls.
    async fn wallet_add(&self, wallet: &str, key: &PrivateKey) -> Result<Account, RpcError>;
}
