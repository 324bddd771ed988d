//! Field values of the next block on an account chain.
//!
//! Each [`BlockIntent`] variant carries only what its subtype needs, and each
//! has one function computing the unsigned fields from the chain head:
//!
//! | subtype | previous | balance | link |
//! |---------|----------|---------|------|
//! | open    | zero     | amount  | send hash redeemed |
//! | receive | frontier | balance + amount | send hash redeemed |
//! | send    | frontier | balance - amount | destination key |
//! | change  | frontier | balance | zero |
//! | epoch   | frontier | balance | epoch link |

use nanomock_rpc::AccountInfo;
use nanomock_types::{Account, Amount, BlockHash, BlockSubtype, Link};

use crate::error::BlockgenError;
use crate::frontier_cache::FrontierEntry;

/// What the caller wants appended to an account chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockIntent {
    /// First block of an account. Becomes a `receive` if the account turns
    /// out to be opened already.
    Open {
        source: BlockHash,
        amount: Amount,
        representative: Option<Account>,
    },
    /// Redeem `source`. Becomes an `open` when the account has no chain.
    Receive {
        source: BlockHash,
        amount: Amount,
        representative: Option<Account>,
    },
    Send {
        destination: Account,
        amount: Amount,
    },
    Change {
        representative: Account,
    },
    Epoch {
        link: Link,
    },
}

/// The chain head a draft extends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainState {
    pub frontier: BlockHash,
    pub balance: Amount,
    pub representative: Account,
}

impl From<FrontierEntry> for ChainState {
    fn from(entry: FrontierEntry) -> Self {
        Self {
            frontier: entry.frontier,
            balance: entry.balance,
            representative: entry.representative,
        }
    }
}

impl From<AccountInfo> for ChainState {
    fn from(info: AccountInfo) -> Self {
        Self {
            frontier: info.frontier,
            balance: info.balance,
            representative: info.representative,
        }
    }
}

/// Unsigned block fields, ready for signing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockDraft {
    pub subtype: BlockSubtype,
    pub account: Account,
    pub representative: Account,
    pub previous: BlockHash,
    pub balance: Amount,
    pub link: Link,
    pub amount: Amount,
}

impl BlockIntent {
    pub fn subtype(&self) -> BlockSubtype {
        match self {
            Self::Open { .. } => BlockSubtype::Open,
            Self::Receive { .. } => BlockSubtype::Receive,
            Self::Send { .. } => BlockSubtype::Send,
            Self::Change { .. } => BlockSubtype::Change,
            Self::Epoch { .. } => BlockSubtype::Epoch,
        }
    }

    /// Raw amount moved by the block.
    pub fn amount(&self) -> Amount {
        match self {
            Self::Open { amount, .. } | Self::Receive { amount, .. } | Self::Send { amount, .. } => *amount,
            Self::Change { .. } | Self::Epoch { .. } => Amount::ZERO,
        }
    }

    /// Compute the draft for `account` given its chain head (`None` when unopened).
    pub fn draft(&self, account: Account, chain: Option<&ChainState>) -> Result<BlockDraft, BlockgenError> {
        match (self, chain) {
            (
                Self::Open { source, amount, representative }
                | Self::Receive { source, amount, representative },
                None,
            ) => Ok(open(account, *source, *amount, *representative)),
            (
                Self::Open { source, amount, representative }
                | Self::Receive { source, amount, representative },
                Some(chain),
            ) => receive(account, chain, *source, *amount, *representative),
            (Self::Send { destination, amount }, Some(chain)) => {
                send(account, chain, destination, *amount)
            }
            (Self::Change { representative }, Some(chain)) => {
                Ok(change(account, chain, *representative))
            }
            (Self::Epoch { link }, Some(chain)) => Ok(epoch(account, chain, *link)),
            (intent, None) => Err(BlockgenError::InvalidRequest(format!(
                "cannot build {} block: account {account} is not opened",
                intent.subtype()
            ))),
        }
    }
}

pub fn open(account: Account, source: BlockHash, amount: Amount, representative: Option<Account>) -> BlockDraft {
    BlockDraft {
        subtype: BlockSubtype::Open,
        account,
        representative: representative.unwrap_or(account),
        previous: BlockHash::ZERO,
        balance: amount,
        link: Link::from(source),
        amount,
    }
}

pub fn receive(
    account: Account,
    chain: &ChainState,
    source: BlockHash,
    amount: Amount,
    representative: Option<Account>,
) -> Result<BlockDraft, BlockgenError> {
    let balance = chain.balance.checked_add(amount).ok_or_else(|| {
        BlockgenError::InvalidRequest(format!(
            "receiving {amount} raw would overflow balance {} of {account}",
            chain.balance
        ))
    })?;
    Ok(BlockDraft {
        subtype: BlockSubtype::Receive,
        account,
        representative: representative.unwrap_or(chain.representative),
        previous: chain.frontier,
        balance,
        link: Link::from(source),
        amount,
    })
}

/// Fails, rather than wrapping, when the balance cannot cover `amount`.
pub fn send(
    account: Account,
    chain: &ChainState,
    destination: &Account,
    amount: Amount,
) -> Result<BlockDraft, BlockgenError> {
    let balance = chain
        .balance
        .checked_sub(amount)
        .ok_or(BlockgenError::InsufficientBalance {
            needed: amount,
            available: chain.balance,
        })?;
    Ok(BlockDraft {
        subtype: BlockSubtype::Send,
        account,
        representative: chain.representative,
        previous: chain.frontier,
        balance,
        link: Link::from(destination),
        amount,
    })
}

pub fn change(account: Account, chain: &ChainState, representative: Account) -> BlockDraft {
    BlockDraft {
        subtype: BlockSubtype::Change,
        account,
        representative,
        previous: chain.frontier,
        balance: chain.balance,
        link: Link::ZERO,
        amount: Amount::ZERO,
    }
}

pub fn epoch(account: Account, chain: &ChainState, link: Link) -> BlockDraft {
    BlockDraft {
        subtype: BlockSubtype::Epoch,
        account,
        representative: chain.representative,
        previous: chain.frontier,
        balance: chain.balance,
        link,
        amount: Amount::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nanomock_types::{epoch_link, PublicKey};

    fn account(byte: u8) -> Account {
        Account::from(PublicKey([byte; 32]))
    }

    fn chain(balance: u128) -> ChainState {
        ChainState {
            frontier: BlockHash::new([0xAA; 32]),
            balance: Amount::raw(balance),
            representative: account(9),
        }
    }

    #[test]
    fn unopened_receive_becomes_open() {
        let intent = BlockIntent::Receive {
            source: BlockHash::new([1; 32]),
            amount: Amount::raw(50),
            representative: Some(account(3)),
        };
        let draft = intent.draft(account(1), None).unwrap();
        assert_eq!(draft.subtype, BlockSubtype::Open);
        assert!(draft.previous.is_zero());
        assert_eq!(draft.balance, Amount::raw(50));
        assert_eq!(draft.link, Link::new([1; 32]));
        assert_eq!(draft.representative, account(3));
    }

    #[test]
    fn open_on_opened_account_becomes_receive() {
        let intent = BlockIntent::Open {
            source: BlockHash::new([1; 32]),
            amount: Amount::raw(5),
            representative: None,
        };
        let draft = intent.draft(account(1), Some(&chain(10))).unwrap();
        assert_eq!(draft.subtype, BlockSubtype::Receive);
        assert_eq!(draft.balance, Amount::raw(15));
    }

    #[test]
    fn receive_adds_to_balance() {
        let intent = BlockIntent::Receive {
            source: BlockHash::new([1; 32]),
            amount: Amount::raw(50),
            representative: None,
        };
        let draft = intent.draft(account(1), Some(&chain(100))).unwrap();
        assert_eq!(draft.subtype, BlockSubtype::Receive);
        assert_eq!(draft.previous, BlockHash::new([0xAA; 32]));
        assert_eq!(draft.balance, Amount::raw(150));
        assert_eq!(draft.representative, account(9));
    }

    #[test]
    fn send_links_destination_and_debits() {
        let intent = BlockIntent::Send {
            destination: account(2),
            amount: Amount::raw(40),
        };
        let draft = intent.draft(account(1), Some(&chain(100))).unwrap();
        assert_eq!(draft.balance, Amount::raw(60));
        assert_eq!(draft.link.as_account(), account(2));
        assert_eq!(draft.amount, Amount::raw(40));
    }

    #[test]
    fn overdrawn_send_is_refused() {
        let intent = BlockIntent::Send {
            destination: account(2),
            amount: Amount::raw(101),
        };
        assert!(matches!(
            intent.draft(account(1), Some(&chain(100))),
            Err(BlockgenError::InsufficientBalance { .. })
        ));
    }

    #[test]
    fn change_keeps_balance_and_zero_link() {
        let draft = BlockIntent::Change { representative: account(4) }
            .draft(account(1), Some(&chain(100)))
            .unwrap();
        assert_eq!(draft.balance, Amount::raw(100));
        assert_eq!(draft.amount, Amount::ZERO);
        assert!(draft.link.is_zero());
        assert_eq!(draft.representative, account(4));
    }

    #[test]
    fn epoch_keeps_balance() {
        let draft = BlockIntent::Epoch { link: epoch_link(2) }
            .draft(account(1), Some(&chain(100)))
            .unwrap();
        assert_eq!(draft.subtype, BlockSubtype::Epoch);
        assert_eq!(draft.balance, Amount::raw(100));
        assert_eq!(draft.link, epoch_link(2));
    }

    #[test]
    fn chain_extension_needs_an_opened_account() {
        for intent in [
            BlockIntent::Send { destination: account(2), amount: Amount::raw(1) },
            BlockIntent::Change { representative: account(2) },
            BlockIntent::Epoch { link: epoch_link(1) },
        ] {
            assert!(matches!(
                intent.draft(account(1), None),
                Err(BlockgenError::InvalidRequest(_))
            ));
        }
    }
}
