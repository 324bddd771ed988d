//! Parse errors for the fundamental types.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypesError {
    #[error("invalid hex for {what}: {value:?}")]
    InvalidHex { what: &'static str, value: String },

    #[error("invalid account address: {0}")]
    InvalidAccount(String),

    #[error("invalid raw amount: {0}")]
    InvalidAmount(String),

    #[error("unknown block subtype: {0}")]
    UnknownSubtype(String),
}

/// Decode exactly `N` bytes from a hex string (either case).
pub(crate) fn decode_hex_array<const N: usize>(
    what: &'static str,
    value: &str,
) -> Result<[u8; N], TypesError> {
    let mut out = [0u8; N];
    hex::decode_to_slice(value.trim(), &mut out).map_err(|_| TypesError::InvalidHex {
        what,
        value: value.to_string(),
    })?;
    Ok(out)
}
