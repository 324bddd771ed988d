//! Nullable ledger node: an in-memory ledger behind the RPC contract.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use nanomock_crypto::{blake2b_256, hash_state_block, sign_state_block, verify_signature};
use nanomock_crypto::{AccountKey, StateBlockFields};
use nanomock_rpc::{
    AccountBalance, AccountInfo, ActiveDifficulty, BlockCreateRequest, CreatedBlock, LedgerRpc,
    RpcError,
};
use nanomock_types::{Account, Amount, BlockHash, JsonBlock, PrivateKey, Seed, WorkNonce};
use nanomock_work::{validate_block_work, Difficulty};
use tracing::debug;

/// One recorded call into the nullable node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RpcCall {
    AccountInfo(Account),
    AccountBalance(Account),
    BlockCreate { account: Account, previous: BlockHash },
    Process(BlockHash),
    ActiveDifficulty,
    WalletCreate { seeded: bool },
    WalletAdd { wallet: String, account: Account },
}

#[derive(Default)]
struct LedgerState {
    accounts: HashMap<Account, AccountInfo>,
    blocks: HashMap<BlockHash, JsonBlock>,
    /// Every hash that has been an account frontier.
    history: HashSet<BlockHash>,
    /// Published sends not yet received: send hash -> (destination, amount).
    receivable: HashMap<BlockHash, (Account, Amount)>,
    processed: Vec<JsonBlock>,
    calls: Vec<RpcCall>,
    wallets: HashMap<String, Vec<Account>>,
    rejects_remaining: usize,
    fail_account_info: bool,
    fail_account_balance: bool,
    hang_process: bool,
}

/// A deterministic ledger node for tests.
///
/// `process` enforces chain linkage (`previous` must be the frontier),
/// signatures, balance deltas and redeemable links, and answers with the
/// same error strings a node uses (`"Fork"`, `"Gap previous block"`, ...).
pub struct NullLedgerRpc {
    state: Mutex<LedgerState>,
    difficulty: Mutex<ActiveDifficulty>,
}

impl NullLedgerRpc {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LedgerState::default()),
            difficulty: Mutex::new(ActiveDifficulty {
                network_current: Difficulty(0),
                network_receive_current: Difficulty(0),
                network_minimum: Difficulty(0),
            }),
        }
    }

    /// Start with `account` already opened holding `balance`, representing itself.
    pub fn with_opened_account(self, account: Account, balance: Amount) -> Self {
        self.open_account(account, balance);
        self
    }

    /// Seed an opened account directly, bypassing block validation.
    pub fn open_account(&self, account: Account, balance: Amount) {
        let frontier = BlockHash::new(blake2b_256(account.public_key().as_bytes()));
        let mut state = self.state.lock().unwrap();
        state.history.insert(frontier);
        state.accounts.insert(
            account,
            AccountInfo {
                frontier,
                balance,
                representative: account,
            },
        );
    }

    /// Difficulty reported by `active_difficulty` and enforced by `process`.
    pub fn set_minimum_difficulty(&self, minimum: u64) {
        let mut difficulty = self.difficulty.lock().unwrap();
        difficulty.network_minimum = Difficulty(minimum);
        difficulty.network_current = Difficulty(minimum);
        difficulty.network_receive_current = Difficulty(minimum);
    }

    /// Refuse the next `count` `process` calls.
    pub fn reject_next_process(&self, count: usize) {
        self.state.lock().unwrap().rejects_remaining = count;
    }

    /// Make every `account_info` call fail with a node error.
    pub fn fail_account_info(&self, fail: bool) {
        self.state.lock().unwrap().fail_account_info = fail;
    }

    /// Make every `account_balance` call fail with a node error.
    pub fn fail_account_balance(&self, fail: bool) {
        self.state.lock().unwrap().fail_account_balance = fail;
    }

    /// Make `process` record the call and then never answer.
    pub fn hang_process(&self, hang: bool) {
        self.state.lock().unwrap().hang_process = hang;
    }

    pub fn account(&self, account: &Account) -> Option<AccountInfo> {
        self.state.lock().unwrap().accounts.get(account).cloned()
    }

    pub fn calls(&self) -> Vec<RpcCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Number of recorded calls matching `predicate`.
    pub fn count_calls(&self, predicate: impl Fn(&RpcCall) -> bool) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|call| predicate(call))
            .count()
    }

    /// Blocks accepted by `process`, in order.
    pub fn processed(&self) -> Vec<JsonBlock> {
        self.state.lock().unwrap().processed.clone()
    }

    pub fn wallet_accounts(&self, wallet: &str) -> Vec<Account> {
        self.state
            .lock()
            .unwrap()
            .wallets
            .get(wallet)
            .cloned()
            .unwrap_or_default()
    }

    fn record(&self, call: RpcCall) {
        self.state.lock().unwrap().calls.push(call);
    }
}

impl Default for NullLedgerRpc {
    fn default() -> Self {
        Self::new()
    }
}

fn node_error(message: &str) -> RpcError {
    RpcError::Node(message.to_string())
}

impl LedgerState {
    fn apply(&mut self, hash: BlockHash, block: &JsonBlock) -> Result<(), RpcError> {
        if self.blocks.contains_key(&hash) {
            return Err(node_error("Old block"));
        }

        let current = self.accounts.get(&block.account).cloned();
        let redeem = match &current {
            None => {
                if !block.previous.is_zero() {
                    return Err(node_error("Gap previous block"));
                }
                Some(block.balance)
            }
            Some(info) => {
                if block.previous != info.frontier {
                    return Err(if block.previous.is_zero() || self.history.contains(&block.previous) {
                        node_error("Fork")
                    } else {
                        node_error("Gap previous block")
                    });
                }
                if block.balance > info.balance {
                    Some(Amount::raw(block.balance.number() - info.balance.number()))
                } else {
                    if block.balance < info.balance {
                        let sent = Amount::raw(info.balance.number() - block.balance.number());
                        self.receivable.insert(hash, (block.link.as_account(), sent));
                    }
                    None
                }
            }
        };

        if let Some(amount) = redeem {
            let source = BlockHash::new(*block.link.as_bytes());
            match self.receivable.get(&source) {
                None => return Err(node_error("Gap source block")),
                Some((destination, _)) if *destination != block.account => {
                    return Err(node_error("Unreceivable"))
                }
                Some((_, pending)) if *pending != amount => {
                    return Err(node_error("Balance and amount delta do not match"))
                }
                Some(_) => {
                    self.receivable.remove(&source);
                }
            }
        }

        self.accounts.insert(
            block.account,
            AccountInfo {
                frontier: hash,
                balance: block.balance,
                representative: block.representative,
            },
        );
        self.blocks.insert(hash, block.clone());
        self.history.insert(hash);
        self.processed.push(block.clone());
        Ok(())
    }
}

#[async_trait]
impl LedgerRpc for NullLedgerRpc {
    async fn account_info(&self, account: &Account) -> Result<Option<AccountInfo>, RpcError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RpcCall::AccountInfo(*account));
        if state.fail_account_info {
            return Err(node_error("Unable to query account"));
        }
        Ok(state.accounts.get(account).cloned())
    }

    async fn account_balance(&self, account: &Account) -> Result<AccountBalance, RpcError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RpcCall::AccountBalance(*account));
        if state.fail_account_balance {
            return Err(node_error("Unable to query balance"));
        }
        let balance = state
            .accounts
            .get(account)
            .map(|info| info.balance)
            .unwrap_or_default();
        let receivable = state
            .receivable
            .values()
            .filter(|(destination, _)| destination == account)
            .fold(0u128, |sum, (_, amount)| sum.saturating_add(amount.number()));
        Ok(AccountBalance {
            balance,
            receivable: Amount::raw(receivable),
        })
    }

    async fn block_create(&self, request: &BlockCreateRequest<'_>) -> Result<CreatedBlock, RpcError> {
        let key = AccountKey::from_private(PrivateKey(request.key.0));
        self.record(RpcCall::BlockCreate {
            account: key.account,
            previous: request.previous,
        });
        let fields = StateBlockFields {
            account: key.account,
            previous: request.previous,
            representative: request.representative,
            balance: request.balance,
            link: request.link,
        };
        let (hash, block) = sign_state_block(&fields, &key, WorkNonce(0), None);
        Ok(CreatedBlock {
            hash,
            difficulty: None,
            block,
        })
    }

    async fn process(&self, block: &JsonBlock) -> Result<BlockHash, RpcError> {
        let fields = StateBlockFields {
            account: block.account,
            previous: block.previous,
            representative: block.representative,
            balance: block.balance,
            link: block.link,
        };
        let hash = hash_state_block(&fields);
        let minimum = self.difficulty.lock().unwrap().network_minimum.0;

        let hang = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(RpcCall::Process(hash));
            state.hang_process
        };
        if hang {
            std::future::pending::<()>().await;
        }

        let mut state = self.state.lock().unwrap();
        if state.rejects_remaining > 0 {
            state.rejects_remaining -= 1;
            return Err(node_error("Gap previous block"));
        }
        if !verify_signature(hash.as_bytes(), &block.signature, block.account.public_key()) {
            return Err(node_error("Bad signature"));
        }
        if validate_block_work(block, minimum).is_err() {
            return Err(node_error("Block work is less than threshold"));
        }
        state.apply(hash, block)?;
        debug!(%hash, account = %block.account, "null ledger accepted block");
        Ok(hash)
    }

    async fn active_difficulty(&self) -> Result<ActiveDifficulty, RpcError> {
        self.record(RpcCall::ActiveDifficulty);
        Ok(*self.difficulty.lock().unwrap())
    }

    async fn wallet_create(&self, seed: Option<&Seed>) -> Result<String, RpcError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RpcCall::WalletCreate {
            seeded: seed.is_some(),
        });
        let wallet = format!("{:064X}", state.wallets.len() + 1);
        let accounts = seed
            .map(|seed| vec![AccountKey::from_seed(seed, 0).account])
            .unwrap_or_default();
        state.wallets.insert(wallet.clone(), accounts);
        Ok(wallet)
    }

    async fn wallet_add(&self, wallet: &str, key: &PrivateKey) -> Result<Account, RpcError> {
        let account = AccountKey::from_private(PrivateKey(key.0)).account;
        let mut state = self.state.lock().unwrap();
        state.calls.push(RpcCall::WalletAdd {
            wallet: wallet.to_string(),
            account,
        });
        let accounts = state
            .wallets
            .get_mut(wallet)
            .ok_or_else(|| node_error("Wallet not found"))?;
        if !accounts.contains(&account) {
            accounts.push(account);
        }
        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nanomock_types::Link;

    fn key(index: u32) -> AccountKey {
        AccountKey::from_seed(&Seed::new([3; 32]), index)
    }

    async fn create(
        ledger: &NullLedgerRpc,
        key: &AccountKey,
        previous: BlockHash,
        balance: u128,
        link: Link,
    ) -> CreatedBlock {
        let request = BlockCreateRequest {
            key: &key.private,
            previous,
            representative: key.account,
            balance: Amount::raw(balance),
            link,
        };
        ledger.block_create(&request).await.unwrap()
    }

    #[tokio::test]
    async fn send_then_open_is_accepted() {
        let genesis = key(0);
        let dest = key(1);
        let ledger = NullLedgerRpc::new().with_opened_account(genesis.account, Amount::raw(100));
        let frontier = ledger.account(&genesis.account).unwrap().frontier;

        let send = create(&ledger, &genesis, frontier, 60, Link::from(&dest.account)).await;
        assert_eq!(ledger.process(&send.block).await.unwrap(), send.hash);
        assert_eq!(
            ledger.account_balance(&dest.account).await.unwrap().receivable,
            Amount::raw(40)
        );

        let open = create(&ledger, &dest, BlockHash::ZERO, 40, Link::from(send.hash)).await;
        assert_eq!(ledger.process(&open.block).await.unwrap(), open.hash);
        assert_eq!(ledger.account(&dest.account).unwrap().balance, Amount::raw(40));
        assert_eq!(ledger.processed().len(), 2);
    }

    #[tokio::test]
    async fn stale_previous_is_a_fork() {
        let genesis = key(0);
        let ledger = NullLedgerRpc::new().with_opened_account(genesis.account, Amount::raw(100));
        let frontier = ledger.account(&genesis.account).unwrap().frontier;

        let first = create(&ledger, &genesis, frontier, 90, Link::from(&key(1).account)).await;
        let second = create(&ledger, &genesis, frontier, 80, Link::from(&key(2).account)).await;
        ledger.process(&first.block).await.unwrap();
        assert_eq!(
            ledger.process(&second.block).await.unwrap_err(),
            RpcError::Node("Fork".into())
        );
        assert_eq!(
            ledger.process(&first.block).await.unwrap_err(),
            RpcError::Node("Old block".into())
        );
    }

    #[tokio::test]
    async fn open_without_pending_send_is_a_gap() {
        let dest = key(5);
        let ledger = NullLedgerRpc::new();
        let open = create(&ledger, &dest, BlockHash::ZERO, 1, Link::new([9; 32])).await;
        assert_eq!(
            ledger.process(&open.block).await.unwrap_err(),
            RpcError::Node("Gap source block".into())
        );
    }

    #[tokio::test]
    async fn unknown_account_reads_as_none() {
        let ledger = NullLedgerRpc::new();
        assert_eq!(ledger.account_info(&key(1).account).await.unwrap(), None);
        ledger.fail_account_info(true);
        assert!(ledger.account_info(&key(1).account).await.is_err());
        assert_eq!(ledger.count_calls(|c| matches!(c, RpcCall::AccountInfo(_))), 2);
    }

    #[tokio::test]
    async fn rejected_process_calls_are_recorded() {
        let genesis = key(0);
        let ledger = NullLedgerRpc::new().with_opened_account(genesis.account, Amount::raw(10));
        let frontier = ledger.account(&genesis.account).unwrap().frontier;
        let send = create(&ledger, &genesis, frontier, 5, Link::from(&key(1).account)).await;

        ledger.reject_next_process(2);
        assert!(ledger.process(&send.block).await.is_err());
        assert!(ledger.process(&send.block).await.is_err());
        assert!(ledger.process(&send.block).await.is_ok());
        assert_eq!(ledger.count_calls(|c| matches!(c, RpcCall::Process(_))), 3);
    }

    #[tokio::test]
    async fn wallet_add_requires_existing_wallet() {
        let ledger = NullLedgerRpc::new();
        assert!(ledger.wallet_add("missing", &key(0).private).await.is_err());
        let wallet = ledger.wallet_create(None).await.unwrap();
        let account = ledger.wallet_add(&wallet, &key(0).private).await.unwrap();
        assert_eq!(account, key(0).account);
        assert_eq!(ledger.wallet_accounts(&wallet), vec![account]);
    }

    #[tokio::test]
    async fn insufficient_work_is_rejected() {
        let genesis = key(0);
        let ledger = NullLedgerRpc::new().with_opened_account(genesis.account, Amount::raw(10));
        ledger.set_minimum_difficulty(u64::MAX);
        let frontier = ledger.account(&genesis.account).unwrap().frontier;
        let send = create(&ledger, &genesis, frontier, 5, Link::from(&key(1).account)).await;
        assert_eq!(
            ledger.process(&send.block).await.unwrap_err(),
            RpcError::Node("Block work is less than threshold".into())
        );
    }
}
