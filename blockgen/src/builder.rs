//! The block builder: intent in, signed (and optionally published) block out.
//!
//! A build runs these steps while holding the account's cache lock:
//!
//! 1. Resolve the chain head, from the [`FrontierCache`] when allowed and
//!    present, otherwise from `account_info`. An unknown account has no chain,
//!    which turns a receive into an open.
//! 2. Draft the block fields for the intent.
//! 3. Sign through the configured [`BlockSigner`].
//! 4. Record the new head in the cache when asked to.
//! 5. Publish when asked to, retrying `process` until the broadcast deadline.
//!
//! Failures never escape as errors: they come back as a [`BlockResult`] with
//! `success == false` so generators can decide whether to go on.

use std::sync::Arc;

use nanomock_crypto::{AccountKey, KeySpec};
use nanomock_rpc::{LedgerRpc, RpcError};
use nanomock_types::{Account, Amount, BlockHash, JsonBlock};
use tokio::time::{sleep, timeout};
use tracing::{debug, error, warn};

use crate::config::BroadcastPolicy;
use crate::draft::{BlockIntent, ChainState};
use crate::error::BlockgenError;
use crate::frontier_cache::{FrontierCache, FrontierEntry};
use crate::result::{AccountData, BlockResult};
use crate::signer::{BlockSigner, RpcSigner};

/// Where a build reads its chain head from, where it records the result and
/// whether it publishes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuildOptions {
    pub read_cache: bool,
    pub write_cache: bool,
    pub broadcast: bool,
}

impl BuildOptions {
    /// Published blocks go through the node; unpublished ones chain through the cache.
    pub fn in_memory(broadcast: bool) -> Self {
        Self {
            read_cache: !broadcast,
            write_cache: !broadcast,
            broadcast,
        }
    }

    pub fn cached() -> Self {
        Self::in_memory(false)
    }

    pub fn published() -> Self {
        Self::in_memory(true)
    }
}

#[derive(Clone)]
pub struct BlockBuilder {
    rpc: Arc<dyn LedgerRpc>,
    signer: Arc<dyn BlockSigner>,
    cache: Arc<FrontierCache>,
    policy: BroadcastPolicy,
}

impl BlockBuilder {
    /// A builder that lets the node sign, with a fresh cache.
    pub fn new(rpc: Arc<dyn LedgerRpc>) -> Self {
        Self {
            signer: Arc::new(RpcSigner::new(rpc.clone())),
            rpc,
            cache: Arc::new(FrontierCache::new()),
            policy: BroadcastPolicy::default(),
        }
    }

    pub fn with_signer(mut self, signer: Arc<dyn BlockSigner>) -> Self {
        self.signer = signer;
        self
    }

    /// Share a cache with other builders.
    pub fn with_cache(mut self, cache: Arc<FrontierCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_policy(mut self, policy: BroadcastPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn cache(&self) -> &Arc<FrontierCache> {
        &self.cache
    }

    pub fn rpc(&self) -> &Arc<dyn LedgerRpc> {
        &self.rpc
    }

    /// Build the next block of `key`'s chain.
    pub async fn build(&self, key: &AccountKey, intent: BlockIntent, options: BuildOptions) -> BlockResult {
        let guard = self.cache.lock_account(&key.account).await;
        let result = match self.try_build(key, &intent, options).await {
            Ok(result) => result,
            Err(e) => {
                warn!(account = %key.account, subtype = %intent.subtype(), error = %e, "block build failed");
                BlockResult::failed(intent.subtype(), AccountData::for_block(key, intent.subtype()), intent.amount(), e)
            }
        };
        drop(guard);
        self.cache.release_account(&key.account).await;
        result
    }

    /// Derive the key first. Bad key material is an error, not a failed result.
    ///
    /// A key requested by seed and index keeps that origin on its result.
    pub async fn build_spec(
        &self,
        spec: &KeySpec,
        intent: BlockIntent,
        options: BuildOptions,
    ) -> Result<BlockResult, BlockgenError> {
        let key = spec.derive()?;
        let mut result = self.build(&key, intent, options).await;
        if matches!(spec, KeySpec::Seed { .. }) {
            result.account_data = AccountData::with_origin(&key);
        }
        Ok(result)
    }

    /// Balance of `account`: the cached one when allowed and present, else the node's.
    pub async fn balance(&self, account: &Account, read_cache: bool) -> Result<Amount, BlockgenError> {
        if read_cache {
            if let Some(entry) = self.cache.get(account).await {
                return Ok(entry.balance);
            }
        }
        Ok(self.rpc.account_balance(account).await?.balance)
    }

    async fn chain_state(&self, account: &Account, read_cache: bool) -> Result<Option<ChainState>, BlockgenError> {
        if read_cache {
            if let Some(entry) = self.cache.get(account).await {
                return Ok(Some(entry.into()));
            }
        }
        Ok(self.rpc.account_info(account).await?.map(ChainState::from))
    }

    async fn try_build(
        &self,
        key: &AccountKey,
        intent: &BlockIntent,
        options: BuildOptions,
    ) -> Result<BlockResult, BlockgenError> {
        let chain = self.chain_state(&key.account, options.read_cache).await?;
        let draft = intent.draft(key.account, chain.as_ref())?;

        let mut created = self.signer.create_block(key, &draft).await?;
        created.block.subtype = Some(draft.subtype);

        if options.write_cache {
            self.cache
                .put(
                    key.account,
                    FrontierEntry {
                        frontier: created.hash,
                        balance: draft.balance,
                        representative: draft.representative,
                    },
                )
                .await;
        }

        let published = options.broadcast && self.publish(&created.block, created.hash).await;
        debug!(
            account = %key.account,
            subtype = %draft.subtype,
            hash = %created.hash,
            published,
            "built block"
        );

        Ok(BlockResult {
            success: true,
            published,
            subtype: draft.subtype,
            hash: Some(created.hash),
            balance_raw: Some(draft.balance),
            amount_raw: draft.amount,
            block: Some(created.block),
            account_data: AccountData::for_block(key, draft.subtype),
            error: None,
        })
    }

    /// Submit `block` until the node accepts it or the deadline passes.
    ///
    /// The deadline bounds the whole exchange, including a `process` call the
    /// node never answers.
    async fn publish(&self, block: &JsonBlock, hash: BlockHash) -> bool {
        let mut attempts = 0u32;
        let mut last_error: Option<RpcError> = None;
        let submit = async {
            loop {
                attempts += 1;
                match self.rpc.process(block).await {
                    Ok(accepted) => {
                        if accepted != hash {
                            warn!(expected = %hash, %accepted, "node accepted block under a different hash");
                        }
                        return true;
                    }
                    Err(RpcError::Node(message)) if message == "Old block" => return true,
                    Err(e) => {
                        debug!(%hash, attempts, error = %e, "publish attempt failed, retrying");
                        last_error = Some(e);
                    }
                }
                sleep(self.policy.retry_interval).await;
            }
        };

        let outcome = timeout(self.policy.deadline, submit).await;
        match outcome {
            Ok(published) => published,
            Err(_) => {
                let error = last_error.map_or_else(|| "no answer from node".to_string(), |e| e.to_string());
                error!(%hash, attempts, %error, "block not published before deadline");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use nanomock_nullables::{NullLedgerRpc, RpcCall};
    use nanomock_types::{BlockSubtype, Seed};

    fn genesis() -> AccountKey {
        AccountKey::from_seed(&Seed::new([0x01; 32]), 0)
    }

    fn fast_policy() -> BroadcastPolicy {
        BroadcastPolicy {
            deadline: Duration::from_millis(200),
            retry_interval: Duration::from_millis(10),
        }
    }

    fn setup(balance: u128) -> (Arc<NullLedgerRpc>, BlockBuilder) {
        let rpc = Arc::new(NullLedgerRpc::new().with_opened_account(genesis().account, Amount::raw(balance)));
        let builder = BlockBuilder::new(rpc.clone()).with_policy(fast_policy());
        (rpc, builder)
    }

    fn send(to: &AccountKey, amount: u128) -> BlockIntent {
        BlockIntent::Send {
            destination: to.account,
            amount: Amount::raw(amount),
        }
    }

    #[tokio::test]
    async fn cached_builds_chain_without_the_node() {
        let (rpc, builder) = setup(1_000);
        let dest = AccountKey::from_seed(&Seed::new([0x02; 32]), 0);

        let first = builder.build(&genesis(), send(&dest, 10), BuildOptions::cached()).await;
        let second = builder.build(&genesis(), send(&dest, 10), BuildOptions::cached()).await;

        assert!(first.success && second.success);
        assert_eq!(second.block.as_ref().unwrap().previous, first.hash.unwrap());
        assert_eq!(second.balance_raw, Some(Amount::raw(980)));
        assert_eq!(rpc.count_calls(|c| matches!(c, RpcCall::AccountInfo(_))), 1);
        assert_eq!(rpc.count_calls(|c| matches!(c, RpcCall::Process(_))), 0);
        assert_eq!(builder.cache().lock_count().await, 0);
    }

    #[tokio::test]
    async fn unknown_account_receive_becomes_open() {
        let (_rpc, builder) = setup(1_000);
        let dest = AccountKey::from_seed(&Seed::new([0x02; 32]), 0);
        let sent = builder.build(&genesis(), send(&dest, 10), BuildOptions::published()).await;
        assert!(sent.published);

        let intent = BlockIntent::Receive {
            source: sent.hash.unwrap(),
            amount: Amount::raw(10),
            representative: None,
        };
        let opened = builder.build(&dest, intent, BuildOptions::published()).await;
        assert_eq!(opened.subtype, BlockSubtype::Open);
        assert!(opened.block.as_ref().unwrap().previous.is_zero());
        assert!(opened.published);
    }

    #[tokio::test]
    async fn overdraw_fails_before_any_signing() {
        let (rpc, builder) = setup(5);
        let dest = AccountKey::from_seed(&Seed::new([0x02; 32]), 0);

        let result = builder.build(&genesis(), send(&dest, 6), BuildOptions::cached()).await;
        assert!(!result.success);
        assert!(result.hash.is_none());
        assert!(result.error.unwrap().contains("insufficient balance"));
        assert_eq!(rpc.count_calls(|c| matches!(c, RpcCall::BlockCreate { .. })), 0);
    }

    #[tokio::test]
    async fn rpc_failure_is_a_failed_result() {
        let (rpc, builder) = setup(5);
        rpc.fail_account_info(true);
        let result = builder
            .build(&genesis(), BlockIntent::Change { representative: Account::BURN }, BuildOptions::published())
            .await;
        assert!(!result.success);
        assert_eq!(result.amount_raw, Amount::ZERO);
        assert!(result.error.is_some());
    }

    #[tokio::test]
    async fn publish_retries_until_accepted() {
        let (rpc, builder) = setup(100);
        rpc.reject_next_process(2);
        let dest = AccountKey::from_seed(&Seed::new([0x02; 32]), 0);

        let result = builder.build(&genesis(), send(&dest, 1), BuildOptions::published()).await;
        assert!(result.published);
        assert_eq!(rpc.count_calls(|c| matches!(c, RpcCall::Process(_))), 3);
    }

    #[tokio::test]
    async fn publish_gives_up_after_deadline() {
        let (rpc, builder) = setup(100);
        rpc.reject_next_process(usize::MAX);
        let dest = AccountKey::from_seed(&Seed::new([0x02; 32]), 0);

        let result = builder.build(&genesis(), send(&dest, 1), BuildOptions::published()).await;
        assert!(result.success);
        assert!(!result.published);
        assert!(rpc.processed().is_empty());
    }

    #[tokio::test]
    async fn unanswered_process_is_bounded_by_deadline() {
        let (rpc, builder) = setup(100);
        rpc.hang_process(true);

        let started = std::time::Instant::now();
        let result = tokio::time::timeout(
            Duration::from_secs(2),
            builder.build(&genesis(), BlockIntent::Change { representative: Account::BURN }, BuildOptions::published()),
        )
        .await
        .expect("build must return once the broadcast deadline passes");

        assert!(result.success);
        assert!(!result.published);
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(rpc.count_calls(|c| matches!(c, RpcCall::Process(_))), 1);
        assert!(rpc.processed().is_empty());
    }

    #[tokio::test]
    async fn seed_origin_is_kept_for_opens_and_seed_requests_only() {
        let (_rpc, builder) = setup(1_000);
        let dest = AccountKey::from_seed(&Seed::new([0x02; 32]), 3);

        let sent = builder.build(&genesis(), send(&dest, 10), BuildOptions::published()).await;
        assert_eq!(sent.account_data, AccountData::new(genesis().account));

        let intent = BlockIntent::Open {
            source: sent.hash.unwrap(),
            amount: Amount::raw(10),
            representative: None,
        };
        let opened = builder.build(&dest, intent, BuildOptions::published()).await;
        assert_eq!(opened.account_data.source_index, Some(3));
        assert_eq!(opened.account_data.source_seed, Some("02".repeat(32)));

        let spec = KeySpec::Seed {
            seed: "01".repeat(32),
            index: 0,
        };
        let changed = builder
            .build_spec(&spec, BlockIntent::Change { representative: Account::BURN }, BuildOptions::published())
            .await
            .unwrap();
        assert!(changed.success);
        assert_eq!(changed.account_data.source_seed, Some("01".repeat(32)));
    }

    #[tokio::test]
    async fn invalid_key_spec_is_an_error() {
        let (_rpc, builder) = setup(100);
        let err = builder
            .build_spec(
                &KeySpec::Private("not hex".into()),
                BlockIntent::Change { representative: Account::BURN },
                BuildOptions::cached(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BlockgenError::InvalidAccountSpec(_)));
    }
}
