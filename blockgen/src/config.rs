//! Test-network description: genesis material, epochs, burn and the
//! representative nodes with their vote weights.
//!
//! Loaded from TOML:
//!
//! ```toml
//! epoch_count = 2
//! burn_amount = "1000000000000000000000000000000"
//!
//! [[representatives.nodes]]
//! name = "pr1"
//! seed = "..."
//! vote_weight_percent = "33.3333"
//! ```

use std::time::Duration;

use nanomock_crypto::{AccountKey, KeySpec};
use nanomock_types::Amount;
use serde::{Deserialize, Serialize};

use crate::amount_math::DecimalFactor;
use crate::error::BlockgenError;

pub const GENESIS_NODE_NAME: &str = "genesis";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Private key of the genesis account, 64 hex digits.
    #[serde(default = "default_genesis_key")]
    pub genesis_key: String,

    /// Private key of the canary account.
    #[serde(default = "default_canary_key")]
    pub canary_key: String,

    /// Number of epoch upgrades published by the genesis account.
    #[serde(default = "default_epoch_count")]
    pub epoch_count: u32,

    /// Raw amount sent from genesis to the burn address, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub burn_amount: Option<Amount>,

    /// RPC endpoint used when a node does not name its own.
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    #[serde(default = "default_broadcast_deadline_ms")]
    pub broadcast_deadline_ms: u64,

    #[serde(default = "default_broadcast_retry_ms")]
    pub broadcast_retry_ms: u64,

    #[serde(default)]
    pub representatives: Representatives,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Representatives {
    #[serde(default)]
    pub nodes: Vec<NodeConfig>,
}

/// One ledger node of the test network.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    pub name: String,

    /// Private key of the node's representative account.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// Wallet seed; the representative account is index 0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<String>,

    /// Share of the genesis balance delegated to this node, in percent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote_weight_percent: Option<DecimalFactor>,

    /// Fixed raw balance. Ignored when `vote_weight_percent` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<Amount>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpc_url: Option<String>,
}

/// How long a publish keeps retrying before the block is reported unpublished.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BroadcastPolicy {
    pub deadline: Duration,
    pub retry_interval: Duration,
}

impl Default for BroadcastPolicy {
    fn default() -> Self {
        Self {
            deadline: Duration::from_millis(default_broadcast_deadline_ms()),
            retry_interval: Duration::from_millis(default_broadcast_retry_ms()),
        }
    }
}

// Serde default helpers

fn default_genesis_key() -> String {
    "12C91837C846F875F56F67CD83040A832CFC0F131AF3DFF9E502C0D43F5D2D15".to_string()
}

fn default_canary_key() -> String {
    "FB4E458CB13508353C5B2574B82F1D1D61367F61E88707F773F068FF90050BEE".to_string()
}

fn default_epoch_count() -> u32 {
    2
}

fn default_rpc_url() -> String {
    "http://127.0.0.1:45000".to_string()
}

fn default_broadcast_deadline_ms() -> u64 {
    2_000
}

fn default_broadcast_retry_ms() -> u64 {
    500
}

impl NodeConfig {
    /// The representative account's key material. `key` wins over `seed`.
    pub fn key_spec(&self) -> Result<KeySpec, BlockgenError> {
        match (&self.key, &self.seed) {
            (Some(key), _) => Ok(KeySpec::Private(key.clone())),
            (None, Some(seed)) => Ok(KeySpec::Seed {
                seed: seed.clone(),
                index: 0,
            }),
            (None, None) => Err(BlockgenError::InvalidAccountSpec(format!(
                "node {} has neither key nor seed",
                self.name
            ))),
        }
    }

    pub fn account_key(&self) -> Result<AccountKey, BlockgenError> {
        Ok(self.key_spec()?.derive()?)
    }
}

impl NetworkConfig {
    pub fn from_toml_file(path: &str) -> Result<Self, BlockgenError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| BlockgenError::Config(format!("{path}: {e}")))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, BlockgenError> {
        toml::from_str(s).map_err(|e| BlockgenError::Config(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String, BlockgenError> {
        toml::to_string_pretty(self).map_err(|e| BlockgenError::Config(e.to_string()))
    }

    pub fn genesis(&self) -> Result<AccountKey, BlockgenError> {
        Ok(AccountKey::from_private_hex(&self.genesis_key)?)
    }

    pub fn canary(&self) -> Result<AccountKey, BlockgenError> {
        Ok(AccountKey::from_private_hex(&self.canary_key)?)
    }

    pub fn broadcast_policy(&self) -> BroadcastPolicy {
        BroadcastPolicy {
            deadline: Duration::from_millis(self.broadcast_deadline_ms),
            retry_interval: Duration::from_millis(self.broadcast_retry_ms),
        }
    }

    /// Configured nodes, with the genesis node added when it is not listed.
    pub fn nodes(&self) -> Vec<NodeConfig> {
        let mut nodes = self.representatives.nodes.clone();
        if !nodes.iter().any(|node| node.name == GENESIS_NODE_NAME) {
            nodes.insert(
                0,
                NodeConfig {
                    name: GENESIS_NODE_NAME.to_string(),
                    key: Some(self.genesis_key.clone()),
                    seed: None,
                    vote_weight_percent: None,
                    balance: None,
                    rpc_url: None,
                },
            );
        }
        nodes
    }

    pub fn node_rpc_url<'a>(&'a self, node: &'a NodeConfig) -> &'a str {
        node.rpc_url.as_deref().unwrap_or(&self.rpc_url)
    }

    /// Fail early on key material that does not parse and on weights above 100%.
    pub fn validate(&self) -> Result<(), BlockgenError> {
        self.genesis()?;
        self.canary()?;
        for node in &self.representatives.nodes {
            node.account_key()?;
            if let Some(weight) = &node.vote_weight_percent {
                if weight.exceeds(100) {
                    return Err(BlockgenError::Config(format!(
                        "vote_weight_percent of {} is {weight}, above 100",
                        node.name
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            genesis_key: default_genesis_key(),
            canary_key: default_canary_key(),
            epoch_count: default_epoch_count(),
            burn_amount: None,
            rpc_url: default_rpc_url(),
            broadcast_deadline_ms: default_broadcast_deadline_ms(),
            broadcast_retry_ms: default_broadcast_retry_ms(),
            representatives: Representatives::default(),
        }
    }
}
