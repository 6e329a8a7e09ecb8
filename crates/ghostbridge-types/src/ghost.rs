//! # Ghost: one cross-ledger transfer attempt
//!
//! ## State Machine
//!
//! ```text
//!   ┌─────────┐ lock  ┌────────┐ burn  ┌────────┐ mint  ┌────────┐ settle
//!   │ CREATED ├──────▶│ LOCKED ├──────▶│ BURNED ├──────▶│ MINTED ├───────▶ (deleted)
//!   └────┬────┘       └───┬────┘       └───▲────┘       └────────┘
//!        │ reclaim        │ reclaim        │ mirror (destination ledger)
//!        ▼ (timeout)      ▼ (timeout)
//!     (deleted)        (deleted)
//! ```
//!
//! Transitions are **monotonic**: the state only moves forward through the
//! enum order, and each edge has exactly one sanctioned operation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{Address, DestinationAddress, GhostId, LedgerId, ProofRef, TokenId};

/// Lifecycle state of a transfer record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GhostState {
    /// No record (never created, or deleted).
    None,
    /// Source funds escrowed by the initiator.
    Created,
    /// Source deposit proven; escrow held pending burn.
    Locked,
    /// Escrow destroyed on the origin, or mirrored on the destination.
    Burned,
    /// Destination supply created for the recipient.
    Minted,
    /// Closed out. Records are deleted on settle, so this is only observed
    /// in notifications.
    Settled,
}

impl GhostState {
    /// Can a record move from this state to `target` through a sanctioned edge?
    ///
    /// `None → Burned` is the mirror entry point on the destination ledger.
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::None, Self::Created | Self::Burned)
                | (Self::Created, Self::Locked)
                | (Self::Locked, Self::Burned)
                | (Self::Burned, Self::Minted | Self::Settled)
                | (Self::Minted, Self::Settled)
        )
    }
}

impl std::fmt::Display for GhostState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "NONE"),
            Self::Created => write!(f, "CREATED"),
            Self::Locked => write!(f, "LOCKED"),
            Self::Burned => write!(f, "BURNED"),
            Self::Minted => write!(f, "MINTED"),
            Self::Settled => write!(f, "SETTLED"),
        }
    }
}

/// Parameters of a new transfer, as supplied by the initiator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitiateRequest {
    pub source_token: TokenId,
    pub dest_token: TokenId,
    pub dest_ledger: LedgerId,
    /// Opaque destination account in the destination ledger's format.
    pub dest_address: DestinationAddress,
    /// Same-format recipient for same-ledger-family delivery.
    pub local_destination: Option<Address>,
    pub amount: u64,
    /// Hash binding a hidden amount for later reveal.
    pub amount_commitment: Option<[u8; 32]>,
}

impl InitiateRequest {
    /// Account a destination ledger can mint to: `local_destination`, else
    /// the leading 32 bytes of `dest_address`.
    #[must_use]
    pub fn recipient(&self) -> Option<Address> {
        self.local_destination.or_else(|| self.dest_address.leading_address())
    }

    /// Deterministic ghost id for this request.
    ///
    /// Any observer replaying the same public inputs and nonce derives the
    /// same id; the ledger's monotonically increasing nonce rules out
    /// collisions between otherwise identical requests.
    #[must_use]
    pub fn ghost_id(&self, source_ledger: LedgerId, initiator: &Address, nonce: u64) -> GhostId {
        let mut hasher = Sha256::new();
        hasher.update(b"ghostbridge:ghost_id:v1:");
        hasher.update(source_ledger.0.to_le_bytes());
        hasher.update(initiator.0);
        hasher.update(self.source_token.0);
        hasher.update(self.dest_token.0);
        hasher.update(self.dest_ledger.0.to_le_bytes());
        hasher.update((self.dest_address.as_bytes().len() as u64).to_le_bytes());
        hasher.update(self.dest_address.as_bytes());
        hasher.update(self.amount.to_le_bytes());
        hasher.update(nonce.to_le_bytes());
        let mut id = [0u8; 32];
        id.copy_from_slice(&hasher.finalize());
        GhostId(id)
    }
}

/// Evidence of a burn on the origin ledger, materialized on the destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorRequest {
    pub ghost_id: GhostId,
    pub source_token: TokenId,
    pub dest_token: TokenId,
    pub source_ledger: LedgerId,
    pub dest_ledger: LedgerId,
    pub dest_address: Option<DestinationAddress>,
    pub amount: u64,
    pub burn_proof: ProofRef,
    /// Origin-side burn time, when the submitter knows it.
    pub burned_at_on_origin: Option<DateTime<Utc>>,
}

/// The transfer record ("Ghost").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ghost {
    pub id: GhostId,
    /// Initiator on the origin ledger. Zeroed on mirrored records.
    pub initiator: Address,
    pub source_token: TokenId,
    pub dest_token: TokenId,
    pub source_ledger: LedgerId,
    pub dest_ledger: LedgerId,
    pub dest_address: Option<DestinationAddress>,
    pub local_destination: Option<Address>,
    pub amount: u64,
    pub amount_commitment: Option<[u8; 32]>,
    pub state: GhostState,
    /// Instantiated by mirroring a transfer observed on the other ledger.
    pub is_remote: bool,
    /// The origin side has learned that the destination side completed.
    pub remote_ack: bool,
    pub created_at: DateTime<Utc>,
    pub locked_at: Option<DateTime<Utc>>,
    pub burned_at: Option<DateTime<Utc>>,
    pub minted_at: Option<DateTime<Utc>>,
    /// Hash of the accepted lock-stage payload.
    pub lock_proof: Option<ProofRef>,
    /// Hash of the accepted burn-stage payload (or the origin's, if mirrored).
    pub burn_proof: Option<ProofRef>,
    /// Hash of the accepted mint-stage payload.
    pub mint_proof: Option<ProofRef>,
    /// Account that received the created supply.
    pub minted_to: Option<Address>,
}

impl Ghost {
    /// Whether the record is still on the proof-gated part of its path.
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        matches!(self.state, GhostState::Created | GhostState::Locked)
    }

    /// Account a destination ledger can mint to, if one can be derived
    /// from the record alone.
    #[must_use]
    pub fn resolvable_recipient(&self) -> Option<Address> {
        self.local_destination
            .or_else(|| self.dest_address.as_ref().and_then(DestinationAddress::leading_address))
    }

    /// Preferred mint recipient: the explicit same-family destination when
    /// present, otherwise `fallback`.
    #[must_use]
    pub fn mint_recipient(&self, fallback: Address) -> Address {
        self.local_destination.unwrap_or(fallback)
    }
}

/// Why an id left the live set. Retired ids never come back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Retirement {
    /// Closed out by `settle`. `minted` records whether supply was created.
    Settled { minted: bool },
    /// Escrow returned to the initiator by `reclaim`.
    Reclaimed,
}
