//! Ledger notifications.
//!
//! Every state change on a ledger appends one [`LedgerEvent`]. The stream is
//! append-only and sequence-numbered, so observers (the relayer, auditors)
//! can resume from a cursor without missing or double-reading entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Address, GhostId, LedgerId, Stage};

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// Escrow taken, record created.
    GhostCreated { amount: u64, dest_ledger: LedgerId },
    /// Lock-stage proof admitted.
    GhostLocked,
    /// Escrow destroyed.
    GhostBurned,
    /// Burned record materialized from the origin ledger.
    GhostMirrored { source_ledger: LedgerId },
    /// Destination supply created.
    MintCompleted { recipient: Address, amount: u64 },
    /// Origin learned the destination completed.
    RemoteAckConfirmed,
    /// Record closed and deleted.
    GhostSettled,
    /// Escrow returned and record deleted.
    GhostReclaimed { amount: u64 },
    /// A proof payload was bound at the gate.
    ProofBound { stage: Stage },
    /// A validator vote was counted.
    VoteRecorded { step: Stage, approvals: usize },
    /// Quorum reached and the step ran.
    StepExecuted { step: Stage },
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GhostCreated { .. } => write!(f, "GHOST_CREATED"),
            Self::GhostLocked => write!(f, "GHOST_LOCKED"),
            Self::GhostBurned => write!(f, "GHOST_BURNED"),
            Self::GhostMirrored { .. } => write!(f, "GHOST_MIRRORED"),
            Self::MintCompleted { .. } => write!(f, "MINT_COMPLETED"),
            Self::RemoteAckConfirmed => write!(f, "REMOTE_ACK_CONFIRMED"),
            Self::GhostSettled => write!(f, "GHOST_SETTLED"),
            Self::GhostReclaimed { .. } => write!(f, "GHOST_RECLAIMED"),
            Self::ProofBound { .. } => write!(f, "PROOF_BOUND"),
            Self::VoteRecorded { .. } => write!(f, "VOTE_RECORDED"),
            Self::StepExecuted { .. } => write!(f, "STEP_EXECUTED"),
        }
    }
}

/// One entry in a ledger's notification stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEvent {
    /// Position in the ledger's stream, starting at 0.
    pub seq: u64,
    /// The ledger that emitted this event.
    pub ledger: LedgerId,
    /// The transfer it concerns.
    pub ghost: GhostId,
    pub kind: EventKind,
    /// Ledger time of the change.
    pub at: DateTime<Utc>,
}

impl LedgerEvent {
    /// Whether a relayer should react to this event by reconciling the ghost.
    #[must_use]
    pub fn is_actionable(&self) -> bool {
        matches!(
            self.kind,
            EventKind::GhostCreated { .. }
                | EventKind::GhostLocked
                | EventKind::GhostBurned
                | EventKind::RemoteAckConfirmed
        )
    }
}
