//! RPC error types.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RpcError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("node returned HTTP {0}")]
    Status(u16),

    #[error("node error: {0}")]
    Node(String),

    #[error("invalid {action} response: {detail}")]
    InvalidResponse { action: String, detail: String },
}

impl RpcError {
    pub(crate) fn invalid(action: &str, detail: impl ToString) -> Self {
        Self::InvalidResponse {
            action: action.to_string(),
            detail: detail.to_string(),
        }
    }

    /// The node's answer for an account with no blocks.
    pub fn is_account_not_found(&self) -> bool {
        matches!(self, Self::Node(msg) if msg.eq_ignore_ascii_case("account not found"))
    }
}
