//! Proof gate: hard gate for stage proofs.
//!
//! Every proof-gated transition passes through [`ProofGate::admit`]. The
//! gate remembers only the *hash* of each accepted payload, keyed by
//! (ghost, stage), and consults the proof oracle again on every
//! admission, so its answer is re-derived rather than cached.
//!
//! ## Rules
//!
//! - **Fail-closed**: unknown caller, unverified reference, or a payload
//!   that does not match the bound one is rejected
//! - **Bind once**: a stage is bound at most once per ghost; an identical
//!   re-bind is accepted as a replay
//! - **Mint ties both halves**: the Mint payload `a‖b` is admissible only
//!   while Lock is bound to `a`, Burn to `b`, and the oracle still reports
//!   both as verified

use std::{collections::HashMap, sync::Arc};

use ghostbridge_types::{
    Address, BridgeError, GhostId, ProofRef, ProofVerifier, Result, Stage, StageProof,
    ValidatorCapability, payload_hash,
};

/// Binds and validates stage proofs per transfer.
pub struct ProofGate {
    verifier: Arc<dyn ProofVerifier>,
    validators: Arc<dyn ValidatorCapability>,
    /// Payload hash of each accepted (ghost, stage) binding.
    bound: HashMap<(GhostId, Stage), ProofRef>,
}

impl ProofGate {
    #[must_use]
    pub fn new(verifier: Arc<dyn ProofVerifier>, validators: Arc<dyn ValidatorCapability>) -> Self {
        Self {
            verifier,
            validators,
            bound: HashMap::new(),
        }
    }

    /// Bind `payload` as the proof for (`ghost`, `stage`).
    ///
    /// For Lock/Burn the oracle's verify routine is run once if the
    /// reference is not already verified. For Mint both references must
    /// already read as verified.
    ///
    /// Returns the stored payload hash.
    ///
    /// # Errors
    /// - `Unauthorized` if `caller` is not an eligible validator
    /// - `MalformedPayload` if `payload` has the wrong width for `stage`
    /// - `StageAlreadyBound` if a different payload is already bound
    /// - `ProofUnverified` if the oracle does not vouch for the reference(s)
    pub fn bind_proof(
        &mut self,
        caller: &Address,
        ghost: GhostId,
        stage: Stage,
        payload: &[u8],
    ) -> Result<ProofRef> {
        if !self.validators.is_eligible(caller) {
            tracing::warn!(
                caller = %caller,
                ghost = %ghost,
                stage = %stage,
                "bind_proof by non-validator"
            );
            return Err(BridgeError::Unauthorized(*caller));
        }

        let proof = StageProof::decode(stage, payload)?;
        let hash = payload_hash(payload);

        if let Some(existing) = self.bound.get(&(ghost, stage)) {
            if *existing == hash {
                tracing::debug!(ghost = %ghost, stage = %stage, "identical re-bind accepted");
                return Ok(hash);
            }
            tracing::warn!(ghost = %ghost, stage = %stage, "conflicting re-bind rejected");
            return Err(BridgeError::StageAlreadyBound { ghost, stage });
        }

        let accepted = match proof {
            StageProof::Single(reference) => {
                self.verifier.is_verified(&reference) || self.verifier.verify(&reference)
            }
            StageProof::Pair { .. } => self.all_verified(&proof),
        };
        if !accepted {
            tracing::warn!(ghost = %ghost, stage = %stage, "oracle did not verify proof");
            return Err(BridgeError::ProofUnverified { ghost, stage });
        }

        self.bound.insert((ghost, stage), hash);
        tracing::debug!(ghost = %ghost, stage = %stage, hash = %hash, "proof bound");
        Ok(hash)
    }

    /// Admit `payload` for a transition. Returns the bound payload hash,
    /// which the ledger records as stage evidence.
    ///
    /// # Errors
    /// - `MalformedPayload` on a width mismatch
    /// - `ProofNotBound` if nothing is bound for (`ghost`, `stage`)
    /// - `ProofMismatch` if a different payload is bound
    /// - `ProofUnverified` if the oracle no longer vouches for a reference,
    ///   or (for Mint) the Lock/Burn bindings do not back the pair
    pub fn admit(&self, ghost: GhostId, stage: Stage, payload: &[u8]) -> Result<ProofRef> {
        let proof = StageProof::decode(stage, payload)?;
        let hash = self.check_bound(ghost, stage, payload)?;

        if !self.all_verified(&proof) {
            return Err(BridgeError::ProofUnverified { ghost, stage });
        }

        if let StageProof::Pair {
            source_deposit,
            destination_transfer,
        } = proof
        {
            let halves = [
                (Stage::Lock, source_deposit),
                (Stage::Burn, destination_transfer),
            ];
            for (half, reference) in halves {
                if let Err(err) = self.check_bound(ghost, half, &reference.0) {
                    tracing::warn!(
                        ghost = %ghost,
                        half = %half,
                        error = %err,
                        "mint pair not backed by bound stage"
                    );
                    return Err(BridgeError::ProofUnverified { ghost, stage: half });
                }
            }
        }

        Ok(hash)
    }

    /// `true` iff `payload` is the bound proof for (`ghost`, `stage`) and
    /// the oracle still reports its reference(s) as verified.
    #[must_use]
    pub fn verify_stage_proof(&self, ghost: GhostId, stage: Stage, payload: &[u8]) -> bool {
        self.admit(ghost, stage, payload).is_ok()
    }

    /// Stored payload hash for (`ghost`, `stage`), if bound.
    #[must_use]
    pub fn bound(&self, ghost: &GhostId, stage: Stage) -> Option<ProofRef> {
        self.bound.get(&(*ghost, stage)).copied()
    }

    /// Drop every binding for a retired ghost.
    pub fn forget(&mut self, ghost: &GhostId) {
        for stage in Stage::ALL {
            self.bound.remove(&(*ghost, stage));
        }
    }

    /// Number of (ghost, stage) bindings held.
    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.bound.len()
    }

    #[must_use]
    pub fn validators(&self) -> &Arc<dyn ValidatorCapability> {
        &self.validators
    }

    fn check_bound(&self, ghost: GhostId, stage: Stage, payload: &[u8]) -> Result<ProofRef> {
        let stored = self
            .bound
            .get(&(ghost, stage))
            .ok_or(BridgeError::ProofNotBound { ghost, stage })?;
        let hash = payload_hash(payload);
        if *stored != hash {
            return Err(BridgeError::ProofMismatch { ghost, stage });
        }
        Ok(hash)
    }

    fn all_verified(&self, proof: &StageProof) -> bool {
        proof
            .references()
            .iter()
            .all(|r| self.verifier.is_verified(r))
    }
}
