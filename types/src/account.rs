//! Account addresses.
//!
//! Address format: `nano_` + base32(4 zero bits ++ public_key, 52 chars) + base32(checksum, 8 chars)
//!
//! Checksum: Blake2b-40(public_key), byte-reversed.
//! Base32 alphabet: `13456789abcdefghijkmnopqrstuwxyz` (avoids ambiguous chars).
//! The legacy `xrb_` prefix is accepted when decoding.

use blake2::digest::consts::U5;
use blake2::{Blake2b, Digest};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::TypesError;
use crate::keys::PublicKey;

const BASE32_ALPHABET: &[u8; 32] = b"13456789abcdefghijkmnopqrstuwxyz";

/// Reverse lookup table: ASCII byte → 5-bit value (0xFF = invalid).
const BASE32_DECODE: [u8; 128] = {
    let mut table = [0xFFu8; 128];
    let alpha = BASE32_ALPHABET;
    let mut i = 0;
    while i < 32 {
        table[alpha[i] as usize] = i as u8;
        i += 1;
    }
    table
};

const PREFIX: &str = "nano_";
const LEGACY_PREFIX: &str = "xrb_";
/// 256 key bits plus 4 leading pad bits → 52 characters.
const PUBKEY_CHARS: usize = 52;
const CHECKSUM_CHARS: usize = 8;
const PUBKEY_PAD_BITS: usize = 4;

/// A ledger account, identified by its public key.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Account(PublicKey);

impl Account {
    /// The burn account: public key of all zeroes. Funds sent here are unspendable.
    pub const BURN: Self = Self(PublicKey::ZERO);

    pub fn from_public_key(key: PublicKey) -> Self {
        Self(key)
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.0
    }

    /// Encode as a `nano_` address.
    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(PREFIX.len() + PUBKEY_CHARS + CHECKSUM_CHARS);
        out.push_str(PREFIX);
        out.push_str(&encode_base32(self.0.as_bytes(), PUBKEY_PAD_BITS));
        out.push_str(&encode_base32(&checksum(self.0.as_bytes()), 0));
        out
    }

    /// Decode a `nano_` (or `xrb_`) address, verifying its checksum.
    pub fn decode(address: &str) -> Result<Self, TypesError> {
        let invalid = || TypesError::InvalidAccount(address.to_string());
        let encoded = address
            .strip_prefix(PREFIX)
            .or_else(|| address.strip_prefix(LEGACY_PREFIX))
            .ok_or_else(invalid)?;
        if encoded.len() != PUBKEY_CHARS + CHECKSUM_CHARS || !encoded.is_ascii() {
            return Err(invalid());
        }

        let (key_part, checksum_part) = encoded.split_at(PUBKEY_CHARS);
        let key: [u8; 32] = decode_base32(key_part, PUBKEY_PAD_BITS).ok_or_else(invalid)?;
        let check: [u8; 5] = decode_base32(checksum_part, 0).ok_or_else(invalid)?;
        if check != checksum(&key) {
            return Err(invalid());
        }
        Ok(Self(PublicKey(key)))
    }
}

impl From<PublicKey> for Account {
    fn from(key: PublicKey) -> Self {
        Self(key)
    }
}

impl FromStr for Account {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Account({})", self.encode())
    }
}

impl Serialize for Account {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for Account {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Account::decode(&s).map_err(serde::de::Error::custom)
    }
}

fn checksum(key: &[u8; 32]) -> [u8; 5] {
    let mut hasher = Blake2b::<U5>::new();
    hasher.update(key);
    let digest = hasher.finalize();
    let mut out = [0u8; 5];
    out.copy_from_slice(&digest);
    out.reverse();
    out
}

/// Encode bytes as base32, treating the input as if `pad_bits` zero bits preceded it.
fn encode_base32(bytes: &[u8], pad_bits: usize) -> String {
    let total_bits = pad_bits + bytes.len() * 8;
    let mut result = String::with_capacity(total_bits.div_ceil(5));

    let mut buffer: u64 = 0;
    let mut bits_in_buffer = pad_bits;

    for &byte in bytes {
        buffer = (buffer << 8) | byte as u64;
        bits_in_buffer += 8;
        while bits_in_buffer >= 5 {
            bits_in_buffer -= 5;
            let idx = ((buffer >> bits_in_buffer) & 0x1F) as usize;
            result.push(BASE32_ALPHABET[idx] as char);
        }
    }
    if bits_in_buffer > 0 {
        let idx = ((buffer << (5 - bits_in_buffer)) & 0x1F) as usize;
        result.push(BASE32_ALPHABET[idx] as char);
    }

    result
}

/// Decode base32 into exactly `N` bytes, dropping `pad_bits` leading bits
/// (which must be zero). Returns `None` on invalid characters or wrong length.
fn decode_base32<const N: usize>(s: &str, pad_bits: usize) -> Option<[u8; N]> {
    let mut buffer: u64 = 0;
    let mut bits_in_buffer = 0usize;
    let mut skip = pad_bits;
    let mut result = [0u8; N];
    let mut pos = 0;

    for c in s.bytes() {
        let val = *BASE32_DECODE.get(c as usize)?;
        if val == 0xFF {
            return None;
        }
        buffer = (buffer << 5) | val as u64;
        bits_in_buffer += 5;

        if skip > 0 && bits_in_buffer >= skip {
            bits_in_buffer -= skip;
            if (buffer >> bits_in_buffer) & ((1 << skip) - 1) != 0 {
                return None;
            }
            skip = 0;
        }
        while skip == 0 && bits_in_buffer >= 8 {
            bits_in_buffer -= 8;
            if pos == N {
                return None;
            }
            result[pos] = (buffer >> bits_in_buffer) as u8;
            pos += 1;
        }
    }

    if pos != N || bits_in_buffer != 0 {
        return None;
    }
    Some(result)
}
