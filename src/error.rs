//! Error types for bridge operations
//!
//! Low-level failures from the contract-call layer are carried as [`CallError`]
//! and re-wrapped into the semantic [`BridgeError`] kind of the operation that
//! hit them, keeping the original as the source.

use alloy::primitives::{Address, U256};
use alloy::transports::TransportError;
use thiserror::Error;

use crate::types::MessageStatus;

/// EIP-1193 provider error code for a request the user rejected.
pub const USER_REJECTED_CODE: i64 = 4001;

/// JSON-RPC error code nodes return for a reverted `eth_call`.
pub const EXECUTION_REVERTED_CODE: i64 = 3;

/// Message fragments that identify a rejected signature when the transport
/// gives no structured code. Matched case-insensitively.
const USER_REJECTED_PATTERNS: &[&str] = &["denied transaction signature", "user rejected"];

/// Failure of a single read, estimate, simulate or write round trip.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct CallError {
    /// JSON-RPC / EIP-1193 error code, when the transport reports one
    pub code: Option<i64>,
    pub message: String,
}

impl CallError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(code: i64, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }

    /// Whether the wallet owner refused to sign.
    ///
    /// The structured code is checked first; the substring match on the
    /// message is a heuristic for transports that only report text.
    pub fn is_user_rejection(&self) -> bool {
        if self.code == Some(USER_REJECTED_CODE) {
            return true;
        }
        let lower = self.message.to_lowercase();
        USER_REJECTED_PATTERNS.iter().any(|p| lower.contains(p))
    }
}

impl CallError {
    /// Whether the contract reverted, as opposed to the call not reaching it.
    pub fn is_revert(&self) -> bool {
        self.code == Some(EXECUTION_REVERTED_CODE) || self.message.to_lowercase().contains("revert")
    }
}

impl From<TransportError> for CallError {
    fn from(err: TransportError) -> Self {
        match err.as_error_resp() {
            Some(payload) => CallError::with_code(payload.code, payload.message.to_string()),
            None => CallError::new(err.to_string()),
        }
    }
}

impl From<alloy::sol_types::Error> for CallError {
    fn from(err: alloy::sol_types::Error) -> Self {
        CallError::new(format!("failed to decode return data: {}", err))
    }
}

#[derive(Error, Debug)]
pub enum BridgeError {
    // ========================================================================
    // Preconditions
    // ========================================================================
    #[error("Wallet is not connected")]
    WalletNotConnected,

    #[error("Wallet must be connected to chain {expected}, currently on {actual}")]
    WrongChain { expected: u64, actual: u64 },

    #[error("No bridge contracts configured from chain {src_chain_id} to chain {dest_chain_id}")]
    MissingContracts { src_chain_id: u64, dest_chain_id: u64 },

    #[error("Bridge is paused")]
    BridgePaused,

    // ========================================================================
    // Token state
    // ========================================================================
    #[error("No canonical info found for token {token}")]
    NoCanonicalInfoFound { token: Address },

    #[error("Token {token} is not approved for token id {token_id}")]
    NotApproved { token: Address, token_id: U256 },

    #[error("No approval required for token {token}")]
    NoApprovalRequired { token: Address },

    #[error("Allowance of token {token} is below {required}")]
    InsufficientAllowance { token: Address, required: U256 },

    // ========================================================================
    // Message state
    // ========================================================================
    #[error("Message cannot be processed: {reason} (status {status:?})")]
    MessageStatus {
        status: MessageStatus,
        reason: &'static str,
    },

    #[error("Account {account} does not own this message")]
    WrongOwner { account: Address },

    // ========================================================================
    // Wrapped call failures
    // ========================================================================
    #[error("User rejected the transaction")]
    UserRejected(#[source] CallError),

    #[error("Failed to approve token: {0}")]
    ApproveFailed(#[source] CallError),

    #[error("Failed to send token: {0}")]
    SendFailed(#[source] CallError),

    #[error("Failed to process message: {0}")]
    ProcessMessageFailed(#[source] CallError),

    #[error("Contract call failed: {0}")]
    Call(#[from] CallError),

    #[error("Not implemented: {0}")]
    NotImplemented(&'static str),
}

impl BridgeError {
    /// Wrap a call failure into `kind`, unless it is a user rejection.
    pub fn wrap(err: CallError, kind: fn(CallError) -> BridgeError) -> Self {
        if err.is_user_rejection() {
            BridgeError::UserRejected(err)
        } else {
            kind(err)
        }
    }

    pub fn is_user_rejection(&self) -> bool {
        matches!(self, BridgeError::UserRejected(_))
    }
}

pub type Result<T, E = BridgeError> = std::result::Result<T, E>;
