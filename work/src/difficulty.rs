//! Difficulty thresholds as reported by a node (`"fffffff800000000"`).
//!
//! Nodes report difficulties as 16 hex digits. The multiplier of a difficulty
//! relative to a base is `(2^64 - base) / (2^64 - difficulty)`.

use std::fmt;
use std::str::FromStr;

use crate::WorkError;

/// A 64-bit work threshold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Difficulty(pub u64);

impl Difficulty {
    /// How many times harder this threshold is than `base`.
    pub fn multiplier(&self, base: Difficulty) -> f64 {
        let headroom = |d: u64| (u64::MAX - d) as f64 + 1.0;
        headroom(base.0) / headroom(self.0)
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_difficulty(self.0))
    }
}

impl FromStr for Difficulty {
    type Err = WorkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_difficulty(s).map(Difficulty)
    }
}

/// Parse a difficulty in the node's hex form. Leading `0x` is tolerated.
pub fn parse_difficulty(s: &str) -> Result<u64, WorkError> {
    let trimmed = s.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    if digits.is_empty() || digits.len() > 16 {
        return Err(WorkError::InvalidDifficulty(s.to_string()));
    }
    u64::from_str_radix(digits, 16).map_err(|_| WorkError::InvalidDifficulty(s.to_string()))
}

pub fn format_difficulty(difficulty: u64) -> String {
    hex::encode(difficulty.to_be_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_node_thresholds() {
        assert_eq!(parse_difficulty("fffffff800000000").unwrap(), 0xfffffff800000000);
        assert_eq!(parse_difficulty("FFFFFE0000000000").unwrap(), 0xfffffe0000000000);
        assert_eq!(parse_difficulty("0x10").unwrap(), 16);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_difficulty("").is_err());
        assert!(parse_difficulty("xyz").is_err());
        assert!(parse_difficulty("1ffffffffffffffff").is_err());
    }

    #[test]
    fn formats_as_sixteen_lower_hex_digits() {
        assert_eq!(format_difficulty(0xfffffff800000000), "fffffff800000000");
        assert_eq!(Difficulty(1).to_string(), "0000000000000001");
    }

    #[test]
    fn multiplier_of_send_over_receive_threshold() {
        let send = Difficulty(0xfffffff800000000);
        let receive = Difficulty(0xfffffe0000000000);
        assert!((send.multiplier(receive) - 64.0).abs() < 1e-9);
        assert!((receive.multiplier(receive) - 1.0).abs() < 1e-9);
    }
}
