use nanomock_crypto::AccountKey;
use nanomock_types::{Account, Amount, BlockHash, BlockSubtype, JsonBlock};
use serde::Serialize;

/// The account a block was built for and, for opens, how its key was derived.
///
/// Never carries the private key. The seed origin is only recorded for the
/// accounts a run opens, so funding accounts never leak their seed into a
/// block file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AccountData {
    pub account: Account,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_seed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_index: Option<u32>,
}

impl AccountData {
    pub fn new(account: Account) -> Self {
        Self {
            account,
            source_seed: None,
            source_index: None,
        }
    }

    /// Record the seed and index `key` was derived from, when it has them.
    pub fn with_origin(key: &AccountKey) -> Self {
        Self {
            account: key.account,
            source_seed: key.seed.as_ref().map(|seed| seed.encode_hex()),
            source_index: key.index,
        }
    }

    /// Origin for opens, the bare account otherwise.
    pub fn for_block(key: &AccountKey, subtype: BlockSubtype) -> Self {
        match subtype {
            BlockSubtype::Open => Self::with_origin(key),
            _ => Self::new(key.account),
        }
    }
}

/// Outcome of building, and optionally publishing, one block.
#[derive(Clone, Debug, Serialize)]
pub struct BlockResult {
    pub success: bool,
    /// The node accepted the block. Always false when no broadcast was asked for.
    pub published: bool,
    pub subtype: BlockSubtype,
    pub hash: Option<BlockHash>,
    /// Resulting account balance.
    pub balance_raw: Option<Amount>,
    pub amount_raw: Amount,
    pub block: Option<JsonBlock>,
    pub account_data: AccountData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BlockResult {
    pub fn failed(
        subtype: BlockSubtype,
        account_data: AccountData,
        amount_raw: Amount,
        error: impl ToString,
    ) -> Self {
        Self {
            success: false,
            published: false,
            subtype,
            hash: None,
            balance_raw: None,
            amount_raw,
            block: None,
            account_data,
            error: Some(error.to_string()),
        }
    }

    pub fn account(&self) -> Account {
        self.account_data.account
    }

    /// One-line record for logs.
    pub fn summary(&self) -> String {
        match (&self.hash, &self.error) {
            (Some(hash), _) if self.success => {
                format!("{} {} : HASH {}", self.subtype, self.account(), hash)
            }
            (_, Some(error)) => format!("{} {} FAILED: {}", self.subtype, self.account(), error),
            _ => format!("{} {} FAILED", self.subtype, self.account()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nanomock_types::Seed;

    #[test]
    fn account_data_records_seed_origin() {
        let key = AccountKey::from_seed(&Seed::new([0x11; 32]), 4);
        let data = AccountData::with_origin(&key);
        assert_eq!(data.account, key.account);
        assert_eq!(data.source_seed.as_deref(), Some("11".repeat(32).as_str()));
        assert_eq!(data.source_index, Some(4));

        let json = serde_json::to_value(&data).unwrap();
        assert!(json.get("private").is_none());
    }

    #[test]
    fn only_opens_carry_the_seed_origin() {
        let key = AccountKey::from_seed(&Seed::new([0x11; 32]), 4);
        assert_eq!(AccountData::for_block(&key, BlockSubtype::Open).source_index, Some(4));
        for subtype in [BlockSubtype::Send, BlockSubtype::Receive, BlockSubtype::Change, BlockSubtype::Epoch] {
            let data = AccountData::for_block(&key, subtype);
            assert_eq!(data, AccountData::new(key.account));
            let json = serde_json::to_value(&data).unwrap();
            assert!(json.get("source_seed").is_none());
        }
    }

    #[test]
    fn failed_result_has_no_hash() {
        let key = AccountKey::from_private(nanomock_types::PrivateKey([7; 32]));
        let result = BlockResult::failed(BlockSubtype::Send, AccountData::new(key.account), Amount::raw(5), "Fork");
        assert!(!result.success);
        assert!(result.hash.is_none());
        assert!(result.summary().ends_with("FAILED: Fork"));
    }
}
