//! Relay error taxonomy and retry classification

use alloy::primitives::B256;
use bridge_core::BridgeError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    /// Network or RPC failure; retried with backoff
    #[error("Transient submission failure: {0}")]
    TransientSubmissionFailure(String),

    /// Source event that could not be decoded; logged and skipped
    #[error("Unknown event shape: {0}")]
    UnknownEventShape(String),

    /// The destination state machine rejected the transition
    #[error("Rejected by destination: {0}")]
    Rejected(#[from] BridgeError),

    /// Destination contract reverted for a reason other than replay
    #[error("Reverted by destination contract: {0}")]
    Reverted(String),

    #[error("Attestation incomplete: {got} of {required} signatures")]
    AttestationIncomplete { got: usize, required: usize },

    #[error("Signer error: {0}")]
    Signer(String),

    #[error("Relay cancelled before submission")]
    Cancelled,

    /// Broadcast mint not yet included; awaited again, never resubmitted
    #[error("Mint {0} still pending")]
    ConfirmationPending(B256),
}

/// Classifies errors for retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Temporary failure - should retry (RPC timeout, network issues)
    Transient,
    /// Destination already applied this transition (nonce replay)
    AlreadyProcessed,
    /// Permanent failure - do not retry (bad signatures, insufficient funds)
    Permanent,
    /// Unknown error - may retry with backoff
    Unknown,
}

impl RelayError {
    pub fn class(&self) -> ErrorClass {
        match self {
            RelayError::TransientSubmissionFailure(_) => ErrorClass::Transient,
            RelayError::Rejected(e) if e.is_replay() => ErrorClass::AlreadyProcessed,
            RelayError::Rejected(_) | RelayError::Reverted(_) => ErrorClass::Permanent,
            RelayError::UnknownEventShape(_) | RelayError::Cancelled => ErrorClass::Permanent,
            // A validator may come back within the retry window
            RelayError::AttestationIncomplete { .. } => ErrorClass::Transient,
            RelayError::ConfirmationPending(_) => ErrorClass::Transient,
            RelayError::Signer(message) => classify_error(message),
        }
    }

    /// Short label used for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::TransientSubmissionFailure(_) => "transient",
            RelayError::UnknownEventShape(_) => "unknown_event_shape",
            RelayError::Rejected(_) => "rejected",
            RelayError::Reverted(_) => "reverted",
            RelayError::AttestationIncomplete { .. } => "attestation_incomplete",
            RelayError::Signer(_) => "signer",
            RelayError::Cancelled => "cancelled",
            RelayError::ConfirmationPending(_) => "confirmation_pending",
        }
    }
}

/// Classify a raw RPC or HTTP error message for retry decisions
pub fn classify_error(error: &str) -> ErrorClass {
    let error_lower = error.to_lowercase();

    if error_lower.contains("nonce already used") {
        return ErrorClass::AlreadyProcessed;
    }

    // Transient errors
    if error_lower.contains("timeout")
        || error_lower.contains("timed out")
        || error_lower.contains("connection")
        || error_lower.contains("network")
        || error_lower.contains("rate limit")
        || error_lower.contains("too many requests")
        || error_lower.contains("503")
        || error_lower.contains("502")
        || error_lower.contains("temporarily unavailable")
        || error_lower.contains("nonce too low")
        || error_lower.contains("underpriced")
    {
        return ErrorClass::Transient;
    }

    // Permanent errors
    if error_lower.contains("reverted")
        || error_lower.contains("execution reverted")
        || error_lower.contains("insufficient signatures")
        || error_lower.contains("invalid signature")
        || error_lower.contains("insufficient eth balance")
        || error_lower.contains("insufficient funds")
        || error_lower.contains("out of gas")
        || error_lower.contains("invalid parameters")
    {
        return ErrorClass::Permanent;
    }

    ErrorClass::Unknown
}
