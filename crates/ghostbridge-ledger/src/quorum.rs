//! Quorum approval: threshold-gated execution of lifecycle steps.
//!
//! One [`Ballot`] per (ghost, step) while voting is open:
//!
//! 1. Only eligible validators vote, each at most once per ballot.
//! 2. The first vote fixes the canonical payload; later votes must
//!    hash-match it or are rejected outright.
//! 3. The vote that reaches the threshold runs the ledger transition with
//!    the canonical payload. On success the ballot is deleted, so its
//!    absence means "already decided". On failure that vote is not
//!    counted and the voter may retry.
//!
//! The threshold is read at evaluation time only.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use ghostbridge_types::{
    Address, BridgeError, EventKind, GhostId, GhostState, ProofRef, QuorumConfig, Result, Stage,
    StepPayload, TokenCustody, ValidatorCapability, payload_hash,
};
use serde::Serialize;

use crate::ghost_ledger::GhostLedger;

/// Open vote on one (ghost, step).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ballot {
    pub approvals: usize,
    /// Canonical payload: the first one submitted.
    pub payload: Vec<u8>,
    pub payload_hash: ProofRef,
    pub executed: bool,
    pub voters: HashSet<Address>,
}

impl Ballot {
    fn open(payload: &[u8]) -> Self {
        Self {
            approvals: 0,
            payload: payload.to_vec(),
            payload_hash: payload_hash(payload),
            executed: false,
            voters: HashSet::new(),
        }
    }
}

/// Result of one accepted vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteOutcome {
    /// Approvals counted so far, including this one.
    pub approvals: usize,
    /// Whether this vote triggered execution of the step.
    pub executed: bool,
}

/// Collects validator votes and triggers ledger transitions.
pub struct QuorumApproval {
    threshold: usize,
    validators: Arc<dyn ValidatorCapability>,
    ballots: HashMap<(GhostId, Stage), Ballot>,
}

impl QuorumApproval {
    /// # Errors
    /// Whatever [`QuorumConfig::validate`] rejects.
    pub fn new(config: &QuorumConfig, validators: Arc<dyn ValidatorCapability>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            threshold: config.threshold,
            validators,
            ballots: HashMap::new(),
        })
    }

    /// Cast `caller`'s vote to execute `step` on `id` with `payload`.
    ///
    /// # Errors
    /// - `Unauthorized` if `caller` is not an eligible validator
    /// - `MalformedPayload` if `payload` does not decode for `step`
    /// - `GhostNotFound` / `InvalidState` if the record is not in the
    ///   state `step` starts from
    /// - `AlreadyVoted` on a repeat vote
    /// - `PayloadMismatch` if `payload` differs from the canonical one
    /// - any error from the triggered transition (the vote is then not counted)
    pub fn approve_step<C: TokenCustody>(
        &mut self,
        ledger: &mut GhostLedger<C>,
        caller: &Address,
        id: GhostId,
        step: Stage,
        payload: &[u8],
    ) -> Result<VoteOutcome> {
        if !self.validators.is_eligible(caller) {
            tracing::warn!(caller = %caller, ghost = %id, step = %step, "vote by non-validator");
            return Err(BridgeError::Unauthorized(*caller));
        }
        StepPayload::decode(step, payload)?;

        let state = ledger.state(&id);
        if state == GhostState::None {
            return Err(BridgeError::GhostNotFound(id));
        }
        if state != starting_state(step) {
            return Err(BridgeError::InvalidState {
                ghost: id,
                action: "approve",
                state,
            });
        }

        let key = (id, step);
        let ballot = self
            .ballots
            .entry(key)
            .or_insert_with(|| Ballot::open(payload));
        if ballot.voters.contains(caller) {
            return Err(BridgeError::AlreadyVoted {
                ghost: id,
                step,
                validator: *caller,
            });
        }
        if ballot.payload_hash != payload_hash(payload) {
            tracing::warn!(ghost = %id, step = %step, validator = %caller, "payload disagreement");
            return Err(BridgeError::PayloadMismatch { ghost: id, step });
        }

        let approvals = ballot.approvals + 1;
        let reaches = approvals >= self.threshold && !ballot.executed;

        if reaches {
            let canonical = ballot.payload.clone();
            // The vote is announced ahead of the transition it authorizes.
            let mark = ledger.events().next_seq();
            ledger.emit(id, EventKind::VoteRecorded { step, approvals });
            if let Err(err) = ledger.execute(id, step, &canonical) {
                tracing::warn!(ghost = %id, step = %step, error = %err, "step execution failed, vote not counted");
                ledger.retract_events(mark);
                if ballot.approvals == 0 {
                    self.ballots.remove(&key);
                }
                return Err(err);
            }
            ballot.voters.insert(*caller);
            ballot.approvals = approvals;
            ballot.executed = true;
            self.ballots.remove(&key);
            ledger.emit(id, EventKind::StepExecuted { step });
            tracing::info!(ghost = %id, step = %step, approvals, "step executed");
        } else {
            ballot.voters.insert(*caller);
            ballot.approvals = approvals;
            ledger.emit(id, EventKind::VoteRecorded { step, approvals });
            tracing::debug!(ghost = %id, step = %step, approvals, threshold = self.threshold, "vote recorded");
        }

        Ok(VoteOutcome {
            approvals,
            executed: reaches,
        })
    }

    /// Open ballot for (`id`, `step`), if voting is in progress.
    #[must_use]
    pub fn ballot(&self, id: &GhostId, step: Stage) -> Option<&Ballot> {
        self.ballots.get(&(*id, step))
    }

    /// Number of open ballots.
    #[must_use]
    pub fn open_ballots(&self) -> usize {
        self.ballots.len()
    }

    #[must_use]
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Change the threshold. Open ballots are evaluated against the new
    /// value on their next vote.
    ///
    /// # Errors
    /// `InvalidThreshold` if `threshold` is zero.
    pub fn set_threshold(&mut self, threshold: usize) -> Result<()> {
        if threshold == 0 {
            return Err(BridgeError::InvalidThreshold(threshold));
        }
        tracing::info!(old = self.threshold, new = threshold, "quorum threshold changed");
        self.threshold = threshold;
        Ok(())
    }

    /// Drop ballots left behind for a retired ghost.
    pub fn discard(&mut self, id: &GhostId) {
        for step in Stage::ALL {
            self.ballots.remove(&(*id, step));
        }
    }
}

/// State a record must be in for `step` to run.
fn starting_state(step: Stage) -> GhostState {
    match step {
        Stage::Lock => GhostState::Created,
        Stage::Burn => GhostState::Locked,
        Stage::Mint => GhostState::Burned,
    }
}
