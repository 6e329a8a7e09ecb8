//! Proof stages, quorum steps, and their byte payloads.
//!
//! Each proof-gated transition has one [`Stage`]. Quorum voting happens per
//! step, and steps map 1:1 onto stages, so the same enum serves both.
//!
//! Payload layouts (all fixed-width, no framing):
//!
//! | Stage | Gate payload                     | Step payload                          |
//! |-------|----------------------------------|---------------------------------------|
//! | Lock  | source-deposit ref (32)          | gate payload                          |
//! | Burn  | destination-transfer ref (32)    | gate payload                          |
//! | Mint  | source ref (32) ‖ dest ref (32)  | gate payload ‖ recipient address (32) |

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{Address, BridgeError, ProofRef, Result};

/// A proof-gated checkpoint in a transfer's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stage {
    Lock,
    Burn,
    Mint,
}

/// A quorum-voted action. Corresponds 1:1 to a [`Stage`].
pub type Step = Stage;

impl Stage {
    pub const ALL: [Self; 3] = [Self::Lock, Self::Burn, Self::Mint];

    /// Width of the gate payload for this stage.
    #[must_use]
    pub fn proof_len(self) -> usize {
        match self {
            Self::Lock | Self::Burn => 32,
            Self::Mint => 64,
        }
    }

    /// Width of the quorum step payload for this stage.
    #[must_use]
    pub fn step_len(self) -> usize {
        match self {
            Self::Lock | Self::Burn => 32,
            Self::Mint => 96,
        }
    }

    /// Proof family a single-proof stage requires. `Mint` binds a pair.
    #[must_use]
    pub fn proof_kind(self) -> Option<ProofKind> {
        match self {
            Self::Lock => Some(ProofKind::SourceDeposit),
            Self::Burn => Some(ProofKind::DestinationTransfer),
            Self::Mint => None,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lock => write!(f, "LOCK"),
            Self::Burn => write!(f, "BURN"),
            Self::Mint => write!(f, "MINT"),
        }
    }
}

/// The two structurally different proof families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProofKind {
    /// Authenticates the deposit into escrow on the source ledger.
    SourceDeposit,
    /// Authenticates the transfer toward the destination ledger.
    DestinationTransfer,
}

impl std::fmt::Display for ProofKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SourceDeposit => write!(f, "SOURCE_DEPOSIT"),
            Self::DestinationTransfer => write!(f, "DESTINATION_TRANSFER"),
        }
    }
}

// ---------------------------------------------------------------------------
// StageProof: what the proof gate binds
// ---------------------------------------------------------------------------

/// Decoded gate payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StageProof {
    /// Lock / Burn: one oracle reference.
    Single(ProofRef),
    /// Mint: both halves, bound together.
    Pair {
        source_deposit: ProofRef,
        destination_transfer: ProofRef,
    },
}

impl StageProof {
    /// Encode to the fixed-width gate payload.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Single(r) => r.0.to_vec(),
            Self::Pair {
                source_deposit,
                destination_transfer,
            } => {
                let mut out = Vec::with_capacity(64);
                out.extend_from_slice(&source_deposit.0);
                out.extend_from_slice(&destination_transfer.0);
                out
            }
        }
    }

    /// Decode a gate payload for `stage`.
    ///
    /// # Errors
    /// `MalformedPayload` on a length mismatch.
    pub fn decode(stage: Stage, bytes: &[u8]) -> Result<Self> {
        if bytes.len() != stage.proof_len() {
            return Err(BridgeError::MalformedPayload {
                reason: format!(
                    "{stage} proof must be {} bytes, got {}",
                    stage.proof_len(),
                    bytes.len()
                ),
            });
        }
        Ok(match stage {
            Stage::Lock | Stage::Burn => Self::Single(ProofRef(read32(bytes, 0))),
            Stage::Mint => Self::Pair {
                source_deposit: ProofRef(read32(bytes, 0)),
                destination_transfer: ProofRef(read32(bytes, 32)),
            },
        })
    }

    /// Every oracle reference this proof depends on.
    #[must_use]
    pub fn references(&self) -> Vec<ProofRef> {
        match self {
            Self::Single(r) => vec![*r],
            Self::Pair {
                source_deposit,
                destination_transfer,
            } => vec![*source_deposit, *destination_transfer],
        }
    }
}

// ---------------------------------------------------------------------------
// StepPayload: what validators vote on
// ---------------------------------------------------------------------------

/// Decoded quorum step payload: the gate payload, plus the recipient for `Mint`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StepPayload {
    pub proof: StageProof,
    pub recipient: Option<Address>,
}

impl StepPayload {
    #[must_use]
    pub fn lock(source_deposit: ProofRef) -> Self {
        Self {
            proof: StageProof::Single(source_deposit),
            recipient: None,
        }
    }

    #[must_use]
    pub fn burn(destination_transfer: ProofRef) -> Self {
        Self {
            proof: StageProof::Single(destination_transfer),
            recipient: None,
        }
    }

    #[must_use]
    pub fn mint(source_deposit: ProofRef, destination_transfer: ProofRef, recipient: Address) -> Self {
        Self {
            proof: StageProof::Pair {
                source_deposit,
                destination_transfer,
            },
            recipient: Some(recipient),
        }
    }

    /// Encode to the fixed-width step payload.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = self.proof.encode();
        if let Some(recipient) = &self.recipient {
            out.extend_from_slice(&recipient.0);
        }
        out
    }

    /// Decode a step payload for `step`.
    ///
    /// # Errors
    /// `MalformedPayload` on a length mismatch.
    pub fn decode(step: Step, bytes: &[u8]) -> Result<Self> {
        if bytes.len() != step.step_len() {
            return Err(BridgeError::MalformedPayload {
                reason: format!(
                    "{step} step payload must be {} bytes, got {}",
                    step.step_len(),
                    bytes.len()
                ),
            });
        }
        let proof_len = step.proof_len();
        let proof = StageProof::decode(step, &bytes[..proof_len])?;
        let recipient = match step {
            Stage::Mint => Some(Address(read32(bytes, proof_len))),
            Stage::Lock | Stage::Burn => None,
        };
        Ok(Self { proof, recipient })
    }
}

/// Domain-separated hash of an accepted payload. This, never the raw
/// payload, is what the ledger stores as stage evidence.
#[must_use]
pub fn payload_hash(payload: &[u8]) -> ProofRef {
    let mut hasher = Sha256::new();
    hasher.update(b"ghostbridge:payload:v1:");
    hasher.update((payload.len() as u64).to_le_bytes());
    hasher.update(payload);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    ProofRef(out)
}

fn read32(bytes: &[u8], offset: usize) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes[offset..offset + 32]);
    out
}
