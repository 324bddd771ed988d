//! Signing strategies for drafted blocks.
//!
//! [`RpcSigner`] asks the node to construct and sign the block with
//! `block_create`. [`LocalSigner`] hashes and signs in-process and solves
//! proof-of-work against the network minimum reported by `active_difficulty`.
//! Both produce the same block for the same draft and key, apart from `work`.

use std::sync::Arc;

use async_trait::async_trait;
use nanomock_crypto::{sign_state_block, AccountKey, StateBlockFields};
use nanomock_rpc::{BlockCreateRequest, CreatedBlock, LedgerRpc};
use nanomock_types::WorkNonce;
use nanomock_work::{WorkError, WorkGenerator};
use tracing::trace;

use crate::draft::BlockDraft;
use crate::error::BlockgenError;

#[async_trait]
pub trait BlockSigner: Send + Sync {
    /// Produce the signed block for `draft`, including valid work.
    async fn create_block(&self, key: &AccountKey, draft: &BlockDraft) -> Result<CreatedBlock, BlockgenError>;

    /// Sign `draft` with a given work nonce.
    fn sign(&self, key: &AccountKey, draft: &BlockDraft, work: WorkNonce) -> CreatedBlock {
        let (hash, block) = sign_state_block(&fields(draft), key, work, None);
        CreatedBlock {
            hash,
            difficulty: None,
            block,
        }
    }
}

fn fields(draft: &BlockDraft) -> StateBlockFields {
    StateBlockFields {
        account: draft.account,
        previous: draft.previous,
        representative: draft.representative,
        balance: draft.balance,
        link: draft.link,
    }
}

/// Delegates construction to the node's `block_create`.
pub struct RpcSigner {
    rpc: Arc<dyn LedgerRpc>,
}

impl RpcSigner {
    pub fn new(rpc: Arc<dyn LedgerRpc>) -> Self {
        Self { rpc }
    }
}

#[async_trait]
impl BlockSigner for RpcSigner {
    async fn create_block(&self, key: &AccountKey, draft: &BlockDraft) -> Result<CreatedBlock, BlockgenError> {
        let request = BlockCreateRequest {
            key: &key.private,
            previous: draft.previous,
            representative: draft.representative,
            balance: draft.balance,
            link: draft.link,
        };
        Ok(self.rpc.block_create(&request).await?)
    }
}

/// Signs locally; only `active_difficulty` touches the node.
pub struct LocalSigner {
    rpc: Arc<dyn LedgerRpc>,
    generator: WorkGenerator,
}

impl LocalSigner {
    pub fn new(rpc: Arc<dyn LedgerRpc>) -> Self {
        Self {
            rpc,
            generator: WorkGenerator::new(),
        }
    }

    pub fn with_generator(mut self, generator: WorkGenerator) -> Self {
        self.generator = generator;
        self
    }
}

#[async_trait]
impl BlockSigner for LocalSigner {
    async fn create_block(&self, key: &AccountKey, draft: &BlockDraft) -> Result<CreatedBlock, BlockgenError> {
        let minimum = self.rpc.active_difficulty().await?.network_minimum;
        let root = fields(draft).work_root();
        let generator = self.generator.clone();

        let work = tokio::task::spawn_blocking(move || generator.generate(&root, minimum.0))
            .await
            .map_err(|_| WorkError::Cancelled)??;
        trace!(account = %draft.account, work = ?work, "solved work locally");

        let mut created = self.sign(key, draft, work);
        created.difficulty = Some(minimum.to_string());
        Ok(created)
    }
}
