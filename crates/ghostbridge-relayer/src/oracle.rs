//! Proof oracle seam.
//!
//! The relayer requests proofs through [`ProofGenerator`]; the ledger's gate
//! checks them through [`ProofVerifier`]. Each ledger has its own oracle
//! instance and the two never share proof state.

use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};

use async_trait::async_trait;
use ghostbridge_types::{
    BridgeError, Ghost, ProofKind, ProofRef, ProofVerifier, Result, Stage,
};
use sha2::{Digest, Sha256};

use crate::retry::RetryPolicy;

/// Off-ledger proof generation and verification.
#[async_trait]
pub trait ProofGenerator: Send + Sync {
    /// Request a proof of `kind` about `ghost`.
    async fn generate(&self, kind: ProofKind, ghost: &Ghost) -> Result<ProofRef>;

    /// Run verification for a previously generated reference.
    async fn verify(&self, reference: &ProofRef) -> Result<bool>;
}

/// Request a proof and verify it, retrying per `policy`.
///
/// A failed verification counts as a failed attempt, not a fatal error.
pub async fn obtain_verified(
    oracle: &dyn ProofGenerator,
    policy: &RetryPolicy,
    kind: ProofKind,
    ghost: &Ghost,
) -> Result<ProofRef> {
    policy
        .run("obtain_proof", move |attempt| async move {
            let reference = oracle.generate(kind, ghost).await?;
            if oracle.verify(&reference).await? {
                tracing::debug!(ghost = %ghost.id, kind = %kind, attempt, "proof verified");
                Ok(reference)
            } else {
                Err(BridgeError::ProofUnverified {
                    ghost: ghost.id,
                    stage: stage_of(kind),
                })
            }
        })
        .await
}

fn stage_of(kind: ProofKind) -> Stage {
    match kind {
        ProofKind::SourceDeposit => Stage::Lock,
        ProofKind::DestinationTransfer => Stage::Burn,
    }
}

// ---------------------------------------------------------------------------
// In-memory oracle
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct OracleState {
    /// Issued references and whether they have been verified.
    issued: HashMap<ProofRef, bool>,
    outage: bool,
    /// Upcoming `verify` calls that report "not verified".
    failing_verifies: u32,
    requests: u64,
}

/// Deterministic in-process oracle.
///
/// References are content-addressed by (oracle label, kind, transfer), so
/// repeated or concurrent requests for the same fact yield the same
/// reference. Supports simulated outages and flaky verification.
#[derive(Debug)]
pub struct InMemoryProofOracle {
    label: String,
    state: Mutex<OracleState>,
}

impl InMemoryProofOracle {
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            state: Mutex::new(OracleState::default()),
        }
    }

    /// While set, `generate` and `verify` fail as unavailable.
    pub fn set_outage(&self, down: bool) {
        self.lock().outage = down;
    }

    /// The next `n` verify calls report "not verified".
    pub fn fail_next_verifies(&self, n: u32) {
        self.lock().failing_verifies = n;
    }

    /// Total `generate` calls that reached the oracle.
    #[must_use]
    pub fn requests(&self) -> u64 {
        self.lock().requests
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    fn reference_for(&self, kind: ProofKind, ghost: &Ghost) -> ProofRef {
        let mut hasher = Sha256::new();
        hasher.update(b"ghostbridge:proof:v1:");
        hasher.update((self.label.len() as u64).to_le_bytes());
        hasher.update(self.label.as_bytes());
        hasher.update([match kind {
            ProofKind::SourceDeposit => 0u8,
            ProofKind::DestinationTransfer => 1u8,
        }]);
        hasher.update(ghost.id.0);
        hasher.update(ghost.source_ledger.0.to_le_bytes());
        hasher.update(ghost.amount.to_le_bytes());
        let mut out = [0u8; 32];
        out.copy_from_slice(&hasher.finalize());
        ProofRef(out)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, OracleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn unavailable(&self) -> BridgeError {
        BridgeError::ProofOracleUnavailable {
            reason: format!("{} oracle outage", self.label),
        }
    }
}

#[async_trait]
impl ProofGenerator for InMemoryProofOracle {
    async fn generate(&self, kind: ProofKind, ghost: &Ghost) -> Result<ProofRef> {
        let reference = self.reference_for(kind, ghost);
        let mut state = self.lock();
        if state.outage {
            return Err(self.unavailable());
        }
        state.requests += 1;
        state.issued.entry(reference).or_insert(false);
        Ok(reference)
    }

    async fn verify(&self, reference: &ProofRef) -> Result<bool> {
        let mut state = self.lock();
        if state.outage {
            return Err(self.unavailable());
        }
        if state.failing_verifies > 0 {
            state.failing_verifies -= 1;
            return Ok(false);
        }
        Ok(state.issued.get_mut(reference).is_some_and(|verified| {
            *verified = true;
            true
        }))
    }
}

impl ProofVerifier for InMemoryProofOracle {
    fn is_verified(&self, reference: &ProofRef) -> bool {
        self.lock().issued.get(reference).copied().unwrap_or(false)
    }

    fn verify(&self, reference: &ProofRef) -> bool {
        let mut state = self.lock();
        if state.outage {
            return false;
        }
        state.issued.get_mut(reference).is_some_and(|verified| {
            *verified = true;
            true
        })
    }
}
