//! Send-then-open pairs that bring a new account onto the ledger.

use std::sync::atomic::{AtomicU32, Ordering};

use nanomock_crypto::AccountKey;
use nanomock_types::{Account, Amount, BlockSubtype, Seed};

use crate::builder::{BlockBuilder, BuildOptions};
use crate::draft::BlockIntent;
use crate::result::{AccountData, BlockResult};

/// Opens accounts funded from a source account.
///
/// Keeps a running count of accounts opened through [`open_next`], which
/// both picks the next destination index and stops opening once a target is
/// reached.
///
/// [`open_next`]: AccountOpener::open_next
pub struct AccountOpener {
    builder: BlockBuilder,
    counter: AtomicU32,
}

impl AccountOpener {
    pub fn new(builder: BlockBuilder) -> Self {
        Self {
            builder,
            counter: AtomicU32::new(0),
        }
    }

    pub fn builder(&self) -> &BlockBuilder {
        &self.builder
    }

    /// Send `amount` from `source` to `destination` and open it. Returns `[send, open]`.
    ///
    /// When the send fails the open is reported failed without contacting the node.
    pub async fn open(
        &self,
        source: &AccountKey,
        destination: &AccountKey,
        amount: Amount,
        representative: Option<Account>,
        options: BuildOptions,
    ) -> Vec<BlockResult> {
        let send = self
            .builder
            .build(
                source,
                BlockIntent::Send {
                    destination: destination.account,
                    amount,
                },
                options,
            )
            .await;

        let open = match (send.success, send.hash) {
            (true, Some(source_hash)) => {
                self.builder
                    .build(
                        destination,
                        BlockIntent::Open {
                            source: source_hash,
                            amount,
                            representative,
                        },
                        options,
                    )
                    .await
            }
            _ => BlockResult::failed(
                BlockSubtype::Open,
                AccountData::with_origin(destination),
                amount,
                format!("funding send from {} failed", source.account),
            ),
        };
        vec![send, open]
    }

    /// Open the account at the next counted index of `destination_seed`.
    ///
    /// Returns nothing once `target` accounts have been opened.
    pub async fn open_next(
        &self,
        source: &AccountKey,
        destination_seed: &Seed,
        amount: Amount,
        representative: Option<Account>,
        target: u32,
        options: BuildOptions,
    ) -> Vec<BlockResult> {
        let index = self.counter.load(Ordering::SeqCst);
        if index >= target {
            return Vec::new();
        }
        self.counter.store(index + 1, Ordering::SeqCst);
        let destination = AccountKey::from_seed(destination_seed, index);
        self.open(source, &destination, amount, representative, options).await
    }

    pub fn counter(&self) -> u32 {
        self.counter.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.counter.store(0, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use nanomock_nullables::{NullLedgerRpc, RpcCall};

    fn source() -> AccountKey {
        AccountKey::from_seed(&Seed::new([0x0A; 32]), 0)
    }

    fn opener(balance: u128) -> (Arc<NullLedgerRpc>, AccountOpener) {
        let rpc = Arc::new(NullLedgerRpc::new().with_opened_account(source().account, Amount::raw(balance)));
        (rpc.clone(), AccountOpener::new(BlockBuilder::new(rpc)))
    }

    #[tokio::test]
    async fn open_produces_send_then_open() {
        let (rpc, opener) = opener(100);
        let dest = AccountKey::from_seed(&Seed::new([0x0B; 32]), 7);

        let results = opener
            .open(&source(), &dest, Amount::raw(40), Some(source().account), BuildOptions::published())
            .await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].subtype, BlockSubtype::Send);
        assert_eq!(results[1].subtype, BlockSubtype::Open);
        assert_eq!(results[1].account_data.source_index, Some(7));
        let opened = rpc.account(&dest.account).unwrap();
        assert_eq!(opened.balance, Amount::raw(40));
        assert_eq!(opened.representative, source().account);
    }

    #[tokio::test]
    async fn failed_send_skips_the_open() {
        let (rpc, opener) = opener(10);
        let dest = AccountKey::from_seed(&Seed::new([0x0B; 32]), 0);

        let results = opener
            .open(&source(), &dest, Amount::raw(40), None, BuildOptions::cached())
            .await;

        assert!(results.iter().all(|r| !r.success));
        assert_eq!(rpc.count_calls(|c| matches!(c, RpcCall::BlockCreate { .. })), 0);
    }

    #[tokio::test]
    async fn counted_opens_stop_at_target() {
        let (_rpc, opener) = opener(100);
        let seed = Seed::new([0x0C; 32]);

        for expected_index in 0..2 {
            let results = opener
                .open_next(&source(), &seed, Amount::raw(1), None, 2, BuildOptions::cached())
                .await;
            assert_eq!(results[1].account_data.source_index, Some(expected_index));
        }
        let results = opener
            .open_next(&source(), &seed, Amount::raw(1), None, 2, BuildOptions::cached())
            .await;
        assert!(results.is_empty());
        assert_eq!(opener.counter(), 2);

        opener.reset();
        assert_eq!(opener.counter(), 0);
    }
}
