//! Shared fixtures for unit tests.

use std::{
    collections::HashSet,
    sync::{Arc, Mutex, PoisonError},
};

use ghostbridge_gate::ValidatorRegistry;
use ghostbridge_types::{
    Address, DestinationAddress, GhostId, InitiateRequest, LedgerConfig, LedgerId, ManualClock,
    ProofRef, ProofVerifier, QuorumConfig, Stage, StageProof, StepPayload, TokenId,
};

use crate::{custody::InMemoryCustody, ghost_ledger::GhostLedger, quorum::QuorumApproval};

pub(crate) const SRC: TokenId = TokenId([0x51; 32]);
pub(crate) const DST: TokenId = TokenId([0xD5; 32]);
pub(crate) const ORIGIN: LedgerId = LedgerId(1);
pub(crate) const DEST: LedgerId = LedgerId(2);
pub(crate) const START: i64 = 1_700_000_000;

/// Verifier that vouches for an explicit set of references.
#[derive(Default)]
pub(crate) struct AllowList(Mutex<HashSet<ProofRef>>);

impl AllowList {
    pub(crate) fn allow(&self, r: ProofRef) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).insert(r);
    }

    pub(crate) fn revoke(&self, r: &ProofRef) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).remove(r);
    }
}

impl ProofVerifier for AllowList {
    fn is_verified(&self, reference: &ProofRef) -> bool {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(reference)
    }

    fn verify(&self, reference: &ProofRef) -> bool {
        self.is_verified(reference)
    }
}

/// Deterministic per-ghost proof reference.
pub(crate) fn proof_for(id: GhostId, tag: u8) -> ProofRef {
    let mut bytes = id.0;
    bytes[0] ^= tag;
    bytes[31] = tag;
    ProofRef(bytes)
}

pub(crate) struct Harness {
    pub ledger: GhostLedger,
    pub quorum: QuorumApproval,
    pub clock: Arc<ManualClock>,
    pub oracle: Arc<AllowList>,
    pub validators: Vec<Address>,
    pub user: Address,
}

impl Harness {
    pub(crate) fn new(ledger_id: LedgerId, threshold: usize, validator_count: usize) -> Self {
        let admin = Address::random();
        let registry = Arc::new(ValidatorRegistry::new(admin, 16));
        let validators: Vec<Address> = (0..validator_count).map(|_| Address::random()).collect();
        for v in &validators {
            registry.set_validator(&admin, *v, true).unwrap();
        }
        let clock = Arc::new(ManualClock::at_unix(START));
        let oracle = Arc::new(AllowList::default());
        let quorum = QuorumApproval::new(
            &QuorumConfig {
                threshold,
                max_validators: 16,
            },
            registry.clone(),
        )
        .unwrap();
        let mut ledger = GhostLedger::new(
            LedgerConfig::for_ledger(ledger_id),
            clock.clone(),
            registry,
            oracle.clone(),
            InMemoryCustody::new(),
        );
        let user = Address::random();
        ledger.custody_mut().fund(user, &SRC, 1_000).unwrap();
        Self {
            ledger,
            quorum,
            clock,
            oracle,
            validators,
            user,
        }
    }

    pub(crate) fn request(amount: u64) -> InitiateRequest {
        InitiateRequest {
            source_token: SRC,
            dest_token: DST,
            dest_ledger: DEST,
            dest_address: DestinationAddress::new(vec![0xAA; 32]).unwrap(),
            local_destination: None,
            amount,
            amount_commitment: None,
        }
    }

    pub(crate) fn initiate(&mut self, amount: u64) -> GhostId {
        self.ledger
            .initiate(self.user, Self::request(amount))
            .unwrap()
    }

    /// Bind a verified single-proof stage.
    pub(crate) fn bind_single(&mut self, id: GhostId, stage: Stage, r: ProofRef) {
        self.oracle.allow(r);
        self.ledger
            .bind_proof(&self.validators[0], id, stage, &StageProof::Single(r).encode())
            .unwrap();
    }

    /// Every validator votes until one vote executes.
    pub(crate) fn vote_all(&mut self, id: GhostId, step: Stage, payload: &[u8]) {
        for v in self.validators.clone() {
            let outcome = self
                .quorum
                .approve_step(&mut self.ledger, &v, id, step, payload)
                .unwrap();
            if outcome.executed {
                return;
            }
        }
        panic!("{step} never reached threshold");
    }

    pub(crate) fn lock(&mut self, id: GhostId) -> ProofRef {
        let a = proof_for(id, 1);
        self.bind_single(id, Stage::Lock, a);
        self.vote_all(id, Stage::Lock, &StepPayload::lock(a).encode());
        a
    }

    pub(crate) fn burn(&mut self, id: GhostId) -> ProofRef {
        let b = proof_for(id, 2);
        self.bind_single(id, Stage::Burn, b);
        self.vote_all(id, Stage::Burn, &StepPayload::burn(b).encode());
        b
    }

    /// Bind Mint for the pair and return the step payload.
    pub(crate) fn prepare_mint(
        &mut self,
        id: GhostId,
        a: ProofRef,
        b: ProofRef,
        recipient: Address,
    ) -> Vec<u8> {
        let payload = StepPayload::mint(a, b, recipient);
        self.ledger
            .bind_proof(&self.validators[0], id, Stage::Mint, &payload.proof.encode())
            .unwrap();
        payload.encode()
    }
}
