//! Cross-ledger mirror sequence.
//!
//! For a non-remote, unacknowledged Burned transfer on the origin:
//!
//! ```text
//!   origin (Burned)            target
//!        │  mirror(ix) ─────────▶ Burned (remote)
//!        │                        bind Lock / Burn / Mint  (target oracle)
//!        │                        approve Mint ──▶ Minted
//!        │                        settle ──▶ retired
//!        │◀── confirm_remote_ack  (only after the mint is observed)
//! ```
//!
//! Every step re-reads the target first, so running the sequence again
//! after any partial failure converges on the same end state.

use std::time::Duration;

use ghostbridge_types::{
    BridgeError, Ghost, GhostId, GhostState, MirrorInstruction, ProofKind, Result, Retirement,
    Stage, StageProof, StepPayload,
};
use sha2::{Digest, Sha256};

use crate::{
    client::LedgerClient,
    oracle::{ProofGenerator, obtain_verified},
    retry::RetryPolicy,
};

/// Deterministic destination-side slot for a transfer.
///
/// Repeated attempts target the same slot, so "does the slot exist" decides
/// whether a create step runs.
#[must_use]
pub fn mirror_slot(id: &GhostId) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"ghostbridge:mirror_slot:v1:");
    hasher.update(id.0);
    let mut slot = [0u8; 32];
    slot.copy_from_slice(&hasher.finalize());
    slot
}

/// Where one run of the sequence stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorOutcome {
    /// Target minted and the origin is acknowledged.
    Acknowledged,
    /// Our Mint vote is in; other validators have not reached threshold.
    AwaitingQuorum,
    /// The target record was closed without minting. The origin is left
    /// unacknowledged.
    TargetClosed,
}

pub(crate) struct MirrorSequence<'a> {
    pub origin: &'a dyn LedgerClient,
    pub target: &'a dyn LedgerClient,
    pub target_oracle: &'a dyn ProofGenerator,
    pub retry: &'a RetryPolicy,
    pub mint_timeout: Duration,
}

impl MirrorSequence<'_> {
    pub(crate) async fn run(&self, ghost: &Ghost) -> Result<MirrorOutcome> {
        let id = ghost.id;
        tracing::debug!(
            ghost = %id,
            slot = %hex::encode(mirror_slot(&id)),
            target = %self.target.ledger_id(),
            "mirror sequence"
        );

        let record = match self.target.ghost(&id).await? {
            Some(record) => record,
            None => match self.target.retirement(&id).await? {
                Some(Retirement::Settled { minted: true }) => {
                    return self.acknowledge(id).await;
                }
                Some(retired) => {
                    tracing::warn!(ghost = %id, ?retired, "target closed without mint; origin left unacknowledged");
                    return Ok(MirrorOutcome::TargetClosed);
                }
                None => self.create(ghost).await?,
            },
        };

        if record.state == GhostState::Burned {
            self.mint(&record, ghost).await?;
        }

        match self.target.ghost(&id).await? {
            // Target first: an acked origin settles without revisiting it.
            Some(r) if r.state == GhostState::Minted => {
                self.target.settle(id).await?;
                tracing::info!(ghost = %id, target = %self.target.ledger_id(), "target record settled");
                self.acknowledge(id).await
            }
            Some(_) => Ok(MirrorOutcome::AwaitingQuorum),
            None => match self.target.retirement(&id).await? {
                Some(Retirement::Settled { minted: true }) => self.acknowledge(id).await,
                _ => Ok(MirrorOutcome::TargetClosed),
            },
        }
    }

    /// Mirror the origin record onto the target and read it back.
    async fn create(&self, ghost: &Ghost) -> Result<Ghost> {
        let burn_proof = ghost.burn_proof.ok_or_else(|| {
            BridgeError::Internal(format!("burned ghost {} has no burn proof", ghost.id))
        })?;
        let instruction = MirrorInstruction {
            ghost_id: ghost.id,
            source_ledger: ghost.source_ledger,
            amount: ghost.amount,
            burn_proof,
            source_token: ghost.source_token,
            dest_token: ghost.dest_token,
        };
        match self.target.submit_mirror(&instruction.encode()).await {
            Ok(_) => {
                tracing::info!(ghost = %ghost.id, target = %self.target.ledger_id(), "mirrored");
            }
            // Another validator got there first.
            Err(BridgeError::GhostExists(_)) => {}
            Err(err) => return Err(err),
        }
        self.target
            .ghost(&ghost.id)
            .await?
            .ok_or(BridgeError::GhostNotFound(ghost.id))
    }

    /// Bind both proofs plus the Mint pair on the target, then vote Mint.
    async fn mint(&self, record: &Ghost, origin: &Ghost) -> Result<()> {
        let id = record.id;
        let recipient = origin.resolvable_recipient().ok_or_else(|| BridgeError::InvalidTransfer {
                reason: format!("ghost {id} has no resolvable recipient"),
            })?;

        let source_deposit =
            obtain_verified(self.target_oracle, self.retry, ProofKind::SourceDeposit, record).await?;
        let destination_transfer =
            obtain_verified(self.target_oracle, self.retry, ProofKind::DestinationTransfer, record)
                .await?;

        self.target
            .bind_proof(id, Stage::Lock, &StageProof::Single(source_deposit).encode())
            .await?;
        self.target
            .bind_proof(id, Stage::Burn, &StageProof::Single(destination_transfer).encode())
            .await?;
        let step = StepPayload::mint(source_deposit, destination_transfer, recipient);
        self.target
            .bind_proof(id, Stage::Mint, &step.proof.encode())
            .await?;

        if let Some(ballot) = self.target.ballot(&id, Stage::Mint).await? {
            if ballot.voters.contains(&self.target.validator()) {
                return Ok(());
            }
        }

        let vote = tokio::time::timeout(
            self.mint_timeout,
            self.target.approve_step(id, Stage::Mint, &step.encode()),
        )
        .await
        .map_err(|_| BridgeError::ConfirmationTimeout {
            ghost: id,
            action: "mint",
        })?;
        match vote {
            Ok(outcome) => {
                tracing::info!(
                    ghost = %id,
                    approvals = outcome.approvals,
                    executed = outcome.executed,
                    "mint vote recorded"
                );
                Ok(())
            }
            Err(BridgeError::AlreadyVoted { .. }) => Ok(()),
            Err(err) => Err(err),
        }
    }

    async fn acknowledge(&self, id: GhostId) -> Result<MirrorOutcome> {
        self.origin.confirm_remote_ack(id).await?;
        tracing::info!(ghost = %id, origin = %self.origin.ledger_id(), "remote ack confirmed");
        Ok(MirrorOutcome::Acknowledged)
    }
}
