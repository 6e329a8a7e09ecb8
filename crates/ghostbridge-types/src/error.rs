//! Error types for the GhostBridge protocol.
//!
//! All errors use the `GB_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Transfer / state-machine errors
//! - 2xx: Proof gate errors
//! - 3xx: Quorum errors
//! - 4xx: Custody errors
//! - 5xx: Authorization / validator registry errors
//! - 6xx: Relay / transport errors
//! - 7xx: Wire codec errors
//! - 9xx: General / internal errors

use thiserror::Error;

use crate::{Address, GhostId, GhostState, LedgerId, Stage};

/// Central error enum for all GhostBridge operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    // =================================================================
    // Transfer Errors (1xx)
    // =================================================================
    /// No live record exists for this ghost id.
    #[error("GB_ERR_100: Ghost not found: {0}")]
    GhostNotFound(GhostId),

    /// A live record already exists for this ghost id.
    #[error("GB_ERR_101: Ghost already exists: {0}")]
    GhostExists(GhostId),

    /// The id was settled or reclaimed earlier and can never be reused.
    #[error("GB_ERR_102: Ghost already retired: {0}")]
    GhostRetired(GhostId),

    /// The operation is not admissible from the record's current state.
    #[error("GB_ERR_103: Cannot {action} ghost {ghost} in state {state}")]
    InvalidState {
        ghost: GhostId,
        action: &'static str,
        state: GhostState,
    },

    /// `GHOST_TIMEOUT` has elapsed since creation.
    #[error("GB_ERR_104: Ghost expired: {0}")]
    GhostExpired(GhostId),

    /// `ATOMIC_WINDOW` has elapsed since the burn.
    #[error("GB_ERR_105: Atomic window elapsed for ghost {0}")]
    AtomicWindowElapsed(GhostId),

    /// The transfer request itself is malformed (zero amount, no destination).
    #[error("GB_ERR_106: Invalid transfer: {reason}")]
    InvalidTransfer { reason: String },

    /// The operation is forbidden on mirrored (remote) records.
    #[error("GB_ERR_107: Operation not allowed on remote ghost {0}")]
    RemoteGhost(GhostId),

    /// The reclaim deadline has not been reached yet.
    #[error("GB_ERR_108: Timeout not reached for ghost {0}")]
    TimeoutNotReached(GhostId),

    /// A mirror instruction targeted a different ledger.
    #[error("GB_ERR_109: Wrong destination ledger: this is {expected}, instruction targets {actual}")]
    WrongDestinationLedger { expected: LedgerId, actual: LedgerId },

    /// Neither completion nor timeout allows settling this record yet.
    #[error("GB_ERR_110: Ghost {0} is not settleable")]
    NotSettleable(GhostId),

    // =================================================================
    // Proof Gate Errors (2xx)
    // =================================================================
    /// The proof oracle does not report the reference(s) as verified.
    #[error("GB_ERR_200: Proof unverified for ghost {ghost} at stage {stage}")]
    ProofUnverified { ghost: GhostId, stage: Stage },

    /// A different payload is already bound for this (ghost, stage).
    #[error("GB_ERR_201: Stage {stage} already bound for ghost {ghost}")]
    StageAlreadyBound { ghost: GhostId, stage: Stage },

    /// Nothing has been bound for this (ghost, stage).
    #[error("GB_ERR_202: No proof bound for ghost {ghost} at stage {stage}")]
    ProofNotBound { ghost: GhostId, stage: Stage },

    /// The supplied payload does not match the bound one.
    #[error("GB_ERR_203: Proof payload mismatch for ghost {ghost} at stage {stage}")]
    ProofMismatch { ghost: GhostId, stage: Stage },

    // =================================================================
    // Quorum Errors (3xx)
    // =================================================================
    /// This validator already voted on this (ghost, step).
    #[error("GB_ERR_300: Validator {validator} already voted on {step} for ghost {ghost}")]
    AlreadyVoted {
        ghost: GhostId,
        step: Stage,
        validator: Address,
    },

    /// The vote's payload does not hash-match the canonical payload.
    #[error("GB_ERR_301: Payload disagreement on {step} for ghost {ghost}")]
    PayloadMismatch { ghost: GhostId, step: Stage },

    /// Quorum threshold must be at least one.
    #[error("GB_ERR_302: Invalid quorum threshold: {0}")]
    InvalidThreshold(usize),

    // =================================================================
    // Custody Errors (4xx)
    // =================================================================
    /// Holder balance too small for the escrow.
    #[error("GB_ERR_400: Insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: u64, available: u64 },

    /// Escrow pool too small for the release or destroy.
    #[error("GB_ERR_401: Insufficient escrow: need {needed}, have {available}")]
    InsufficientEscrow { needed: u64, available: u64 },

    /// The token custody collaborator refused the operation.
    #[error("GB_ERR_402: Custody operation failed: {reason}")]
    CustodyFailed { reason: String },

    /// Supply conservation invariant violated. Critical safety alert.
    #[error("GB_ERR_403: Supply invariant violation: {reason}")]
    SupplyInvariantViolation { reason: String },

    /// Arithmetic overflow on a token amount.
    #[error("GB_ERR_404: Amount overflow")]
    AmountOverflow,

    // =================================================================
    // Authorization Errors (5xx)
    // =================================================================
    /// The caller is not an eligible validator.
    #[error("GB_ERR_500: Unauthorized: {0} is not an eligible validator")]
    Unauthorized(Address),

    /// The caller is not the registry admin.
    #[error("GB_ERR_501: Unauthorized admin: {0}")]
    UnauthorizedAdmin(Address),

    /// Enabling another validator would exceed the configured cap.
    #[error("GB_ERR_502: Validator limit reached ({max})")]
    ValidatorLimit { max: usize },

    // =================================================================
    // Relay Errors (6xx)
    // =================================================================
    /// The proof oracle could not produce or check a proof right now.
    #[error("GB_ERR_600: Proof oracle unavailable: {reason}")]
    ProofOracleUnavailable { reason: String },

    /// Every bounded attempt to obtain a verified proof failed.
    #[error("GB_ERR_601: Proof retries exhausted after {attempts} attempts")]
    ProofRetriesExhausted { attempts: u32 },

    /// A ledger RPC failed.
    #[error("GB_ERR_602: Ledger {ledger} unavailable: {reason}")]
    LedgerUnavailable { ledger: LedgerId, reason: String },

    /// A write was not confirmed in time.
    #[error("GB_ERR_603: Confirmation timeout during {action} for ghost {ghost}")]
    ConfirmationTimeout { ghost: GhostId, action: &'static str },

    // =================================================================
    // Codec Errors (7xx)
    // =================================================================
    /// Wrong byte length for a fixed-layout instruction.
    #[error("GB_ERR_700: Malformed instruction: expected {expected} bytes, got {actual}")]
    MalformedInstruction { expected: usize, actual: usize },

    /// Leading discriminant byte names no known operation.
    #[error("GB_ERR_701: Unknown instruction discriminant: {0:#04x}")]
    UnknownDiscriminant(u8),

    /// A step payload could not be decoded.
    #[error("GB_ERR_702: Malformed payload: {reason}")]
    MalformedPayload { reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("GB_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("GB_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid config file, missing fields, etc.).
    #[error("GB_ERR_902: Configuration error: {0}")]
    Configuration(String),

    /// I/O error (disk, network).
    #[error("GB_ERR_903: I/O error: {0}")]
    Io(String),
}

/// How an error should be treated by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Wrong state, expired deadline, unauthorized caller. Surfaced, never retried.
    Precondition,
    /// Oracle said no, or payload differs from the bound one. Retry with a fresh proof.
    ProofRejected,
    /// A validator disagreed with the canonical payload. Surfaced to operators.
    QuorumDisagreement,
    /// RPC / network / oracle flakiness. Retried on the next scan.
    Transient,
}

impl BridgeError {
    /// Numeric error code (the `NNN` in `GB_ERR_NNN`).
    #[must_use]
    pub fn code(&self) -> u16 {
        match self {
            Self::GhostNotFound(_) => 100,
            Self::GhostExists(_) => 101,
            Self::GhostRetired(_) => 102,
            Self::InvalidState { .. } => 103,
            Self::GhostExpired(_) => 104,
            Self::AtomicWindowElapsed(_) => 105,
            Self::InvalidTransfer { .. } => 106,
            Self::RemoteGhost(_) => 107,
            Self::TimeoutNotReached(_) => 108,
            Self::WrongDestinationLedger { .. } => 109,
            Self::NotSettleable(_) => 110,
            Self::ProofUnverified { .. } => 200,
            Self::StageAlreadyBound { .. } => 201,
            Self::ProofNotBound { .. } => 202,
            Self::ProofMismatch { .. } => 203,
            Self::AlreadyVoted { .. } => 300,
            Self::PayloadMismatch { .. } => 301,
            Self::InvalidThreshold(_) => 302,
            Self::InsufficientBalance { .. } => 400,
            Self::InsufficientEscrow { .. } => 401,
            Self::CustodyFailed { .. } => 402,
            Self::SupplyInvariantViolation { .. } => 403,
            Self::AmountOverflow => 404,
            Self::Unauthorized(_) => 500,
            Self::UnauthorizedAdmin(_) => 501,
            Self::ValidatorLimit { .. } => 502,
            Self::ProofOracleUnavailable { .. } => 600,
            Self::ProofRetriesExhausted { .. } => 601,
            Self::LedgerUnavailable { .. } => 602,
            Self::ConfirmationTimeout { .. } => 603,
            Self::MalformedInstruction { .. } => 700,
            Self::UnknownDiscriminant(_) => 701,
            Self::MalformedPayload { .. } => 702,
            Self::Internal(_) => 900,
            Self::Serialization(_) => 901,
            Self::Configuration(_) => 902,
            Self::Io(_) => 903,
        }
    }

    /// Classify this error for retry / escalation decisions.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self.code() {
            200..=299 => ErrorClass::ProofRejected,
            301 => ErrorClass::QuorumDisagreement,
            600..=699 | 903 => ErrorClass::Transient,
            _ => ErrorClass::Precondition,
        }
    }

    /// Whether a fresh attempt could succeed without operator action.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.class(),
            ErrorClass::ProofRejected | ErrorClass::Transient
        )
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, BridgeError>;

impl From<std::io::Error> for BridgeError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_contains_prefix() {
        let err = BridgeError::GhostNotFound(GhostId([7u8; 32]));
        let msg = format!("{err}");
        assert!(msg.starts_with("GB_ERR_100"), "Got: {msg}");
    }

    #[test]
    fn invalid_state_display() {
        let err = BridgeError::InvalidState {
            ghost: GhostId([1u8; 32]),
            action: "burn",
            state: GhostState::Created,
        };
        let msg = format!("{err}");
        assert!(msg.contains("GB_ERR_103"));
        assert!(msg.contains("burn"));
        assert!(msg.contains("CREATED"));
    }

    #[test]
    fn code_matches_display_prefix() {
        let errors = vec![
            BridgeError::AtomicWindowElapsed(GhostId([0u8; 32])),
            BridgeError::ValidatorLimit { max: 3 },
            BridgeError::UnknownDiscriminant(9),
            BridgeError::Configuration("bad".into()),
            BridgeError::AmountOverflow,
        ];
        for err in errors {
            let msg = format!("{err}");
            assert!(
                msg.starts_with(&format!("GB_ERR_{}", err.code())),
                "code {} does not match message {msg}",
                err.code()
            );
        }
    }

    #[test]
    fn classification_follows_taxonomy() {
        let ghost = GhostId([3u8; 32]);
        assert_eq!(
            BridgeError::GhostExpired(ghost).class(),
            ErrorClass::Precondition
        );
        assert_eq!(
            BridgeError::ProofUnverified {
                ghost,
                stage: Stage::Lock
            }
            .class(),
            ErrorClass::ProofRejected
        );
        assert_eq!(
            BridgeError::PayloadMismatch {
                ghost,
                step: Stage::Burn
            }
            .class(),
            ErrorClass::QuorumDisagreement
        );
        assert_eq!(
            BridgeError::ProofOracleUnavailable {
                reason: "down".into()
            }
            .class(),
            ErrorClass::Transient
        );
    }

    #[test]
    fn retryable_only_for_proof_and_transient() {
        let ghost = GhostId([3u8; 32]);
        assert!(!BridgeError::Unauthorized(Address([1u8; 32])).is_retryable());
        assert!(
            !BridgeError::PayloadMismatch {
                ghost,
                step: Stage::Mint
            }
            .is_retryable()
        );
        assert!(
            BridgeError::LedgerUnavailable {
                ledger: LedgerId(1),
                reason: "rpc".into()
            }
            .is_retryable()
        );
    }
}
