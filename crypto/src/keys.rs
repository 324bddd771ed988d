//! Key derivation and the `AccountKey` bundle.

use blake2::{Blake2b512, Digest};
use ed25519_dalek::hazmat::ExpandedSecretKey;
use ed25519_dalek::VerifyingKey;
use nanomock_types::{Account, PrivateKey, PublicKey, Seed};
use thiserror::Error;

use crate::hash::blake2b_256_multi;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("invalid seed: {0}")]
    InvalidSeed(String),
}

/// Derive the private key at `index` of a wallet seed: `Blake2b-256(seed || index_be32)`.
pub fn deterministic_private_key(seed: &Seed, index: u32) -> PrivateKey {
    PrivateKey(blake2b_256_multi(&[seed.as_bytes(), &index.to_be_bytes()]))
}

/// Expand a private key into the signing scalar (Ed25519 with Blake2b-512 in place of SHA-512).
pub(crate) fn expand(private: &PrivateKey) -> ExpandedSecretKey {
    let digest = Blake2b512::digest(private.0);
    let mut bytes = [0u8; 64];
    bytes.copy_from_slice(&digest);
    ExpandedSecretKey::from_bytes(&bytes)
}

/// Derive the public key from a private key.
pub fn public_from_private(private: &PrivateKey) -> PublicKey {
    let verifying_key = VerifyingKey::from(&expand(private));
    PublicKey(verifying_key.to_bytes())
}

/// Where an account's key material comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeySpec {
    /// A raw private key, 64 hex digits.
    Private(String),
    /// A wallet seed (64 hex digits) and the index of the account within it.
    Seed { seed: String, index: u32 },
}

impl KeySpec {
    pub fn derive(&self) -> Result<AccountKey, KeyError> {
        match self {
            Self::Private(hex) => AccountKey::from_private_hex(hex),
            Self::Seed { seed, index } => AccountKey::from_seed_hex(seed, *index),
        }
    }
}

/// A fully derived account identity. Immutable once derived.
pub struct AccountKey {
    pub private: PrivateKey,
    pub public: PublicKey,
    pub account: Account,
    /// Seed and index, when the key was derived from a seed.
    pub seed: Option<Seed>,
    pub index: Option<u32>,
}

impl AccountKey {
    pub fn from_private(private: PrivateKey) -> Self {
        let public = public_from_private(&private);
        Self {
            private,
            public,
            account: Account::from(public),
            seed: None,
            index: None,
        }
    }

    pub fn from_private_hex(hex: &str) -> Result<Self, KeyError> {
        let private =
            PrivateKey::decode_hex(hex).map_err(|e| KeyError::InvalidPrivateKey(e.to_string()))?;
        Ok(Self::from_private(private))
    }

    pub fn from_seed(seed: &Seed, index: u32) -> Self {
        let mut key = Self::from_private(deterministic_private_key(seed, index));
        key.seed = Some(seed.clone());
        key.index = Some(index);
        key
    }

    pub fn from_seed_hex(seed_hex: &str, index: u32) -> Result<Self, KeyError> {
        let seed = Seed::decode_hex(seed_hex).map_err(|e| KeyError::InvalidSeed(e.to_string()))?;
        Ok(Self::from_seed(&seed, index))
    }
}

impl Clone for AccountKey {
    fn clone(&self) -> Self {
        Self {
            private: PrivateKey(self.private.0),
            public: self.public,
            account: self.account,
            seed: self.seed.clone(),
            index: self.index,
        }
    }
}

impl std::fmt::Debug for AccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountKey")
            .field("account", &self.account)
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ZERO_SEED: &str = "0000000000000000000000000000000000000000000000000000000000000000";

    #[test]
    fn zero_seed_index_zero_matches_reference_vector() {
        let key = AccountKey::from_seed_hex(ZERO_SEED, 0).unwrap();
        assert_eq!(
            key.private.encode_hex(),
            "9F0E444C69F77A49BD0BE89DB92C38FE713E0963165CCA12FAF5712D7657120F"
        );
        assert_eq!(
            key.public.encode_hex(),
            "C008B814A7D269A1FA3C6528B19201A24D797912DB9996FF02A1FF356E45552B"
        );
        assert_eq!(
            key.account.encode(),
            "nano_3i1aq1cchnmbn9x5rsbap8b15akfh7wj7pwskuzi7ahz8oq6cobd99d4r3b7"
        );
    }

    #[test]
    fn seed_and_private_derivations_agree() {
        let from_seed = AccountKey::from_seed_hex(ZERO_SEED, 7).unwrap();
        let from_private = AccountKey::from_private_hex(&from_seed.private.encode_hex()).unwrap();
        assert_eq!(from_seed.account, from_private.account);
        assert_eq!(from_seed.index, Some(7));
        assert_eq!(from_private.index, None);
    }

    #[test]
    fn indices_produce_distinct_accounts() {
        let a = AccountKey::from_seed_hex(ZERO_SEED, 1).unwrap();
        let b = AccountKey::from_seed_hex(ZERO_SEED, 2).unwrap();
        assert_ne!(a.account, b.account);
    }

    #[test]
    fn malformed_key_material_rejected() {
        assert!(matches!(
            KeySpec::Private("not hex".into()).derive(),
            Err(KeyError::InvalidPrivateKey(_))
        ));
        assert!(matches!(
            KeySpec::Seed { seed: "00".into(), index: 0 }.derive(),
            Err(KeyError::InvalidSeed(_))
        ));
    }

    #[test]
    fn clone_keeps_identity() {
        let key = AccountKey::from_seed_hex(ZERO_SEED, 3).unwrap();
        let copy = key.clone();
        assert_eq!(copy.private.0, key.private.0);
        assert_eq!(copy.account, key.account);
        assert_eq!(copy.seed, key.seed);
    }
}
