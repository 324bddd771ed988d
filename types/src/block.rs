//! Block hashes, links and the JSON state-block format.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::account::Account;
use crate::amount::Amount;
use crate::error::{decode_hex_array, TypesError};
use crate::keys::{PublicKey, Signature};

/// A 32-byte block hash identifying a block in an account's chain.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct BlockHash([u8; 32]);

impl BlockHash {
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn decode_hex(s: &str) -> Result<Self, TypesError> {
        decode_hex_array("block hash", s).map(Self)
    }
}

impl fmt::Debug for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockHash({}\u{2026})", hex::encode_upper(&self.0[..4]))
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_upper(self.0))
    }
}

impl FromStr for BlockHash {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode_hex(s)
    }
}

impl Serialize for BlockHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for BlockHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        BlockHash::decode_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// The 32-byte link field of a state block.
///
/// - send: destination public key
/// - open / receive: hash of the send block being redeemed
/// - change: zero
/// - epoch: an epoch identifier, see [`epoch_link`]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Link([u8; 32]);

impl Link {
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Interpret the link as a destination account (meaningful for sends).
    pub fn as_account(&self) -> Account {
        Account::from(PublicKey(self.0))
    }

    pub fn decode_hex(s: &str) -> Result<Self, TypesError> {
        decode_hex_array("link", s).map(Self)
    }
}

impl From<BlockHash> for Link {
    fn from(hash: BlockHash) -> Self {
        Self(*hash.as_bytes())
    }
}

impl From<&Account> for Link {
    fn from(account: &Account) -> Self {
        Self(*account.public_key().as_bytes())
    }
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Link({}\u{2026})", hex::encode_upper(&self.0[..4]))
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_upper(self.0))
    }
}

impl Serialize for Link {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Link {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Link::decode_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Link identifying epoch upgrade `n`: ASCII `"epoch v{n} block"`, right padded with zeroes.
pub fn epoch_link(epoch: u32) -> Link {
    let message = format!("epoch v{epoch} block");
    let mut bytes = [0u8; 32];
    let len = message.len().min(32);
    bytes[..len].copy_from_slice(&message.as_bytes()[..len]);
    Link(bytes)
}

/// The semantic kind of a state block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockSubtype {
    Open,
    Receive,
    Send,
    Change,
    Epoch,
}

impl BlockSubtype {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Receive => "receive",
            Self::Send => "send",
            Self::Change => "change",
            Self::Epoch => "epoch",
        }
    }
}

impl fmt::Display for BlockSubtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockSubtype {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "receive" => Ok(Self::Receive),
            "send" => Ok(Self::Send),
            "change" => Ok(Self::Change),
            "epoch" => Ok(Self::Epoch),
            other => Err(TypesError::UnknownSubtype(other.to_string())),
        }
    }
}

/// Proof-of-work nonce, 16 lower-case hex digits on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct WorkNonce(pub u64);

impl Serialize for WorkNonce {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{:016x}", self.0))
    }
}

impl<'de> Deserialize<'de> for WorkNonce {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        u64::from_str_radix(s.trim(), 16)
            .map(WorkNonce)
            .map_err(|_| serde::de::Error::custom(format!("invalid work value {s:?}")))
    }
}

/// A signed state block in the JSON form used by the node RPC (`json_block: true`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub account: Account,
    pub previous: BlockHash,
    pub representative: Account,
    pub balance: Amount,
    pub link: Link,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_as_account: Option<Account>,
    pub signature: Signature,
    pub work: WorkNonce,
    /// Local annotation; the node ignores unknown fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<BlockSubtype>,
}

impl JsonBlock {
    pub const STATE: &'static str = "state";
}
