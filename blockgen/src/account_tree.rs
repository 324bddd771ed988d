//! Account trees: one funded account fans out into many opened accounts.
//!
//! With split count `S` and `N` requested accounts the tree has the smallest
//! depth `D` with `S + S^2 + ... + S^D >= N`. Every account opened at level
//! `d` (1-based) is sent `(S^(D-d+1) - S + 1) * min_balance`, enough to fund
//! its own `S` children and still keep `min_balance` once every level below
//! it has split.
//!
//! Accounts are opened depth first at consecutive indices of the destination
//! seed, so the result reads send, open, send, open, ... in creation order.

use futures_util::future::{BoxFuture, FutureExt};
use nanomock_crypto::AccountKey;
use nanomock_types::{Account, Amount, Seed};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::amount_math::{multiply, AmountError, DecimalFactor};
use crate::builder::{BlockBuilder, BuildOptions};
use crate::error::BlockgenError;
use crate::opener::AccountOpener;
use crate::result::BlockResult;

/// Smallest `D >= 1` with `S + S^2 + ... + S^D >= accounts`.
pub fn splitting_depth(accounts: u128, split_count: u32) -> u32 {
    let split = split_count as u128;
    let mut total = 0u128;
    let mut depth = 0u32;
    loop {
        depth += 1;
        total = total.saturating_add(split.saturating_pow(depth));
        if total >= accounts || depth >= 127 {
            return depth;
        }
    }
}

/// `S + S^2 + ... + S^D`: how many accounts a tree of that shape can hold.
pub fn accounts_for_depth(split_count: u32, depth: u32) -> u128 {
    (1..=depth).fold(0u128, |total, level| {
        total.saturating_add((split_count as u128).saturating_pow(level))
    })
}

/// Amount forwarded to each account opened at `level` (1-based).
fn forward_amount(split_count: u32, depth: u32, level: u32, min_balance: Amount) -> Result<Amount, AmountError> {
    let split = split_count as u128;
    let factor = split
        .checked_pow(depth - level + 1)
        .and_then(|power| power.checked_sub(split))
        .and_then(|difference| difference.checked_add(1))
        .ok_or(AmountError::Overflow)?;
    multiply(min_balance, &DecimalFactor::integer(factor))
}

pub struct TreeRequest {
    /// Funded account at the root of the tree.
    pub source: AccountKey,
    /// Seed whose consecutive indices become the opened accounts.
    pub destination_seed: Seed,
    pub split_count: u32,
    pub accounts: u32,
    /// Balance every opened account keeps once the tree is complete.
    pub min_balance: Amount,
    /// Representative of every opened account. Defaults to the source's.
    pub representative: Option<Account>,
}

struct TreePlan {
    depth: u32,
    /// Indexed by level, `amounts[0]` unused.
    amounts: Vec<Amount>,
    representative: Account,
}

pub struct AccountTreeGenerator {
    opener: AccountOpener,
    options: BuildOptions,
    running: Mutex<()>,
}

impl AccountTreeGenerator {
    pub fn new(builder: BlockBuilder, broadcast: bool) -> Self {
        Self {
            opener: AccountOpener::new(builder),
            options: BuildOptions::in_memory(broadcast),
            running: Mutex::new(()),
        }
    }

    /// Accounts opened so far by the generation in progress.
    pub fn open_counter(&self) -> u32 {
        self.opener.counter()
    }

    /// Open `request.accounts` accounts. Runs one generation at a time.
    ///
    /// Fails before building anything when the request is malformed or the
    /// source cannot fund every account with `min_balance`.
    pub async fn generate(&self, request: &TreeRequest) -> Result<Vec<BlockResult>, BlockgenError> {
        let _running = self.running.lock().await;
        self.opener.reset();

        let plan = self.plan(request).await?;
        let blocks = self.split(request.source.clone(), request, &plan, 1).await;

        let opened = self.opener.counter();
        self.opener.reset();
        info!(
            opened,
            blocks = blocks.len(),
            failed = blocks.iter().filter(|b| !b.success).count(),
            "account tree complete"
        );
        Ok(blocks)
    }

    async fn plan(&self, request: &TreeRequest) -> Result<TreePlan, BlockgenError> {
        if request.split_count == 0 {
            return Err(BlockgenError::InvalidRequest("split count must be at least 1".into()));
        }
        let depth = splitting_depth(request.accounts as u128, request.split_count);
        info!(
            "creating {} of {} possible accounts for splitting depth {} and split count {}",
            request.accounts,
            accounts_for_depth(request.split_count, depth),
            depth,
            request.split_count
        );

        let needed = multiply(request.min_balance, &DecimalFactor::integer(request.accounts as u128))?;
        let available = self
            .opener
            .builder()
            .balance(&request.source.account, self.options.read_cache)
            .await?;
        if available < needed {
            return Err(BlockgenError::InsufficientBalance { needed, available });
        }

        let mut amounts = vec![Amount::ZERO];
        for level in 1..=depth {
            amounts.push(forward_amount(request.split_count, depth, level, request.min_balance)?);
        }

        let representative = match request.representative {
            Some(representative) => representative,
            None => self
                .opener
                .builder()
                .rpc()
                .account_info(&request.source.account)
                .await?
                .map(|info| info.representative)
                .ok_or_else(|| {
                    BlockgenError::InvalidRequest(format!(
                        "source {} is not opened",
                        request.source.account
                    ))
                })?,
        };

        Ok(TreePlan {
            depth,
            amounts,
            representative,
        })
    }

    fn split<'a>(
        &'a self,
        source: AccountKey,
        request: &'a TreeRequest,
        plan: &'a TreePlan,
        level: u32,
    ) -> BoxFuture<'a, Vec<BlockResult>> {
        async move {
            if level > plan.depth {
                return Vec::new();
            }
            let mut blocks = Vec::new();
            for _ in 0..request.split_count {
                let pair = self
                    .opener
                    .open_next(
                        &source,
                        &request.destination_seed,
                        plan.amounts[level as usize],
                        Some(plan.representative),
                        request.accounts,
                        self.options,
                    )
                    .await;
                if pair.is_empty() {
                    break;
                }

                let opened = pair.iter().all(|b| b.success);
                let child = pair[1].account_data.source_index;
                blocks.extend(pair);
                match (opened, child) {
                    (true, Some(index)) => {
                        let child = AccountKey::from_seed(&request.destination_seed, index);
                        blocks.extend(self.split(child, request, plan, level + 1).await);
                    }
                    _ => debug!(level, "not descending below failed open"),
                }
            }
            blocks
        }
        .boxed()
    }
}
