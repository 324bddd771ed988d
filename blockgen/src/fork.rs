//! Deliberate forks: several sends built on the same `previous`.
//!
//! The source first sends to itself. That "gap" send is recorded in the cache
//! but never received, and never reaches the node. Each fork send then reads
//! the cached head without recording its own result, so every send of a level
//! claims the same `previous`. Each send is paired with a receive (an open)
//! at its destination, and the first destination of a level funds the next.
//!
//! Destination indices of level `d` (0-based) start at `P*F*(d+1) + d + 1`
//! for `P` peers and `F` forks per peer, so levels never share accounts.

use futures_util::future::{BoxFuture, FutureExt};
use nanomock_crypto::AccountKey;
use nanomock_types::{Amount, BlockSubtype, Seed};
use tracing::{debug, info};

use crate::builder::{BlockBuilder, BuildOptions};
use crate::draft::BlockIntent;
use crate::error::BlockgenError;
use crate::result::{AccountData, BlockResult};

pub struct ForkRequest {
    pub source_seed: Seed,
    pub source_index: u32,
    pub dest_seed: Seed,
    /// Raw amount of every send.
    pub amount: Amount,
    pub peer_count: u32,
    pub forks_per_peer: u32,
    pub max_depth: u32,
}

impl ForkRequest {
    fn forks_per_level(&self) -> u32 {
        self.peer_count * self.forks_per_peer
    }

    /// First destination index of `level`.
    pub fn level_start(&self, level: u32) -> u32 {
        self.forks_per_level() * (level + 1) + level + 1
    }
}

/// The unreceived root send and the send/receive pairs, in build order.
#[derive(Debug)]
pub struct ForkChain {
    pub gap: BlockResult,
    pub forks: Vec<BlockResult>,
}

impl ForkChain {
    pub fn all_blocks(&self) -> impl Iterator<Item = &BlockResult> {
        std::iter::once(&self.gap).chain(self.forks.iter())
    }
}

pub struct ForkGenerator {
    builder: BlockBuilder,
}

/// Fork blocks are kept local: cache reads, nothing published.
const FORK_SEND: BuildOptions = BuildOptions {
    read_cache: true,
    write_cache: false,
    broadcast: false,
};

const FORK_RECEIVE: BuildOptions = BuildOptions {
    read_cache: false,
    write_cache: true,
    broadcast: false,
};

const GAP_SEND: BuildOptions = BuildOptions {
    read_cache: false,
    write_cache: true,
    broadcast: false,
};

impl ForkGenerator {
    pub fn new(builder: BlockBuilder) -> Self {
        Self { builder }
    }

    pub async fn make_deep_forks(&self, request: &ForkRequest) -> Result<ForkChain, BlockgenError> {
        if request.forks_per_level() == 0 {
            return Err(BlockgenError::InvalidRequest(
                "peer count and forks per peer must be at least 1".into(),
            ));
        }
        let source = AccountKey::from_seed(&request.source_seed, request.source_index);

        let needed = request
            .amount
            .checked_add(request.amount)
            .ok_or_else(|| BlockgenError::InvalidRequest(format!("fork amount {} too large", request.amount)))?;
        let available = self.builder.balance(&source.account, false).await?;
        if available < needed {
            return Err(BlockgenError::InsufficientBalance { needed, available });
        }

        let gap = self
            .builder
            .build(
                &source,
                BlockIntent::Send {
                    destination: source.account,
                    amount: request.amount,
                },
                GAP_SEND,
            )
            .await;
        if !gap.success {
            return Ok(ForkChain { gap, forks: Vec::new() });
        }

        let forks = self.fork_level(source, request, 0).await;
        info!(
            depth = request.max_depth,
            pairs = forks.len() / 2,
            failed = forks.iter().filter(|b| !b.success).count(),
            "forks generated"
        );
        Ok(ForkChain { gap, forks })
    }

    fn fork_level<'a>(
        &'a self,
        funding: AccountKey,
        request: &'a ForkRequest,
        level: u32,
    ) -> BoxFuture<'a, Vec<BlockResult>> {
        async move {
            if level >= request.max_depth {
                return Vec::new();
            }
            let start = request.level_start(level);
            let mut blocks = Vec::with_capacity(2 * request.forks_per_level() as usize);
            let mut next_funding = None;

            for i in 0..request.forks_per_level() {
                let destination = AccountKey::from_seed(&request.dest_seed, start + i);
                let send = self
                    .builder
                    .build(
                        &funding,
                        BlockIntent::Send {
                            destination: destination.account,
                            amount: request.amount,
                        },
                        FORK_SEND,
                    )
                    .await;
                let receive = match send.hash.filter(|_| send.success) {
                    Some(source_hash) => {
                        self.builder
                            .build(
                                &destination,
                                BlockIntent::Receive {
                                    source: source_hash,
                                    amount: request.amount,
                                    representative: Some(destination.account),
                                },
                                FORK_RECEIVE,
                            )
                            .await
                    }
                    None => BlockResult::failed(
                        BlockSubtype::Open,
                        AccountData::with_origin(&destination),
                        request.amount,
                        format!("fork send from {} failed", funding.account),
                    ),
                };
                if i == 0 && receive.success {
                    next_funding = Some(destination);
                }
                blocks.push(send);
                blocks.push(receive);
            }

            match next_funding {
                Some(next) => blocks.extend(self.fork_level(next, request, level + 1).await),
                None if level + 1 < request.max_depth => {
                    debug!(level, "first fork of level failed, stopping descent")
                }
                None => {}
            }
            blocks
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(peers: u32, forks: u32) -> ForkRequest {
        ForkRequest {
            source_seed: Seed::new([1; 32]),
            source_index: 0,
            dest_seed: Seed::new([2; 32]),
            amount: Amount::raw(1),
            peer_count: peers,
            forks_per_peer: forks,
            max_depth: 3,
        }
    }

    #[test]
    fn level_ranges_do_not_overlap() {
        let request = request(4, 2);
        for level in 0..5 {
            let end = request.level_start(level) + request.forks_per_level();
            assert!(end <= request.level_start(level + 1));
        }
        assert_eq!(request.level_start(0), 9);
        assert_eq!(request.level_start(1), 18);
    }
}
