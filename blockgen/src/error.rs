use nanomock_crypto::KeyError;
use nanomock_rpc::RpcError;
use nanomock_types::Amount;
use nanomock_work::WorkError;
use thiserror::Error;

use crate::amount_math::AmountError;

#[derive(Debug, Error)]
pub enum BlockgenError {
    #[error("invalid account spec: {0}")]
    InvalidAccountSpec(String),

    #[error("ledger rpc: {0}")]
    LedgerRpc(#[from] RpcError),

    #[error("insufficient balance: need {needed} raw, have {available} raw")]
    InsufficientBalance { needed: Amount, available: Amount },

    #[error("amount arithmetic: {0}")]
    Amount(#[from] AmountError),

    #[error("proof of work: {0}")]
    Work(#[from] WorkError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("block file: {0}")]
    BlockFile(String),

    #[error("{failed} of {total} blocks failed")]
    FailedBlocks { failed: usize, total: usize },

    #[error("config: {0}")]
    Config(String),
}

impl From<KeyError> for BlockgenError {
    fn from(e: KeyError) -> Self {
        Self::InvalidAccountSpec(e.to_string())
    }
}
