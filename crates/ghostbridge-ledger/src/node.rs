//! One ledger's complete bridge surface.
//!
//! `BridgeNode` composes the [`GhostLedger`], its [`QuorumApproval`] and a
//! broadcast fan-out of the ledger's notifications. After every operation
//! the events appended since the last publish are sent to subscribers in
//! sequence order.

use std::sync::Arc;

use ghostbridge_types::{
    Address, Clock, Ghost, GhostId, GhostState, InitiateRequest, LedgerConfig,
    LedgerEvent, LedgerId, MirrorInstruction, MirrorRequest, ProofRef, ProofVerifier,
    QuorumConfig, Result, Retirement, Stage, TokenId, ValidatorCapability, constants,
};
use tokio::sync::broadcast;

use crate::{
    custody::InMemoryCustody,
    ghost_ledger::GhostLedger,
    quorum::{Ballot, QuorumApproval, VoteOutcome},
};

pub struct BridgeNode {
    ledger: GhostLedger<InMemoryCustody>,
    quorum: QuorumApproval,
    events_tx: broadcast::Sender<LedgerEvent>,
    /// Next event sequence not yet broadcast.
    published: u64,
}

impl BridgeNode {
    /// # Errors
    /// `Configuration` / `InvalidThreshold` on invalid configuration.
    pub fn new(
        config: LedgerConfig,
        quorum: &QuorumConfig,
        clock: Arc<dyn Clock>,
        validators: Arc<dyn ValidatorCapability>,
        verifier: Arc<dyn ProofVerifier>,
    ) -> Result<Self> {
        config.validate()?;
        let quorum = QuorumApproval::new(quorum, Arc::clone(&validators))?;
        let ledger = GhostLedger::new(config, clock, validators, verifier, InMemoryCustody::new());
        let (events_tx, _) = broadcast::channel(constants::EVENT_CHANNEL_CAPACITY);
        tracing::info!(ledger = %ledger.ledger_id(), threshold = quorum.threshold(), "bridge node started");
        Ok(Self {
            ledger,
            quorum,
            events_tx,
            published: 0,
        })
    }

    /// Receive every notification appended from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.events_tx.subscribe()
    }

    /// Credit `holder` with `amount` of `token` from outside the bridge.
    ///
    /// # Errors
    /// `AmountOverflow`.
    pub fn fund(&mut self, holder: Address, token: &TokenId, amount: u64) -> Result<()> {
        self.ledger.custody_mut().fund(holder, token, amount)
    }

    pub fn initiate(&mut self, initiator: Address, req: InitiateRequest) -> Result<GhostId> {
        let out = self.ledger.initiate(initiator, req);
        self.publish();
        out
    }

    pub fn mirror(&mut self, caller: &Address, req: MirrorRequest) -> Result<GhostId> {
        let out = self.ledger.mirror(caller, req);
        self.publish();
        out
    }

    /// Decode and run a wire-format mirror instruction addressed to this ledger.
    ///
    /// # Errors
    /// Codec errors, then whatever [`GhostLedger::mirror`] rejects.
    pub fn submit_instruction(&mut self, caller: &Address, bytes: &[u8]) -> Result<GhostId> {
        let instruction = MirrorInstruction::decode(bytes)?;
        self.mirror(caller, instruction.into_request(self.ledger_id()))
    }

    pub fn bind_proof(
        &mut self,
        caller: &Address,
        id: GhostId,
        stage: Stage,
        payload: &[u8],
    ) -> Result<ProofRef> {
        let out = self.ledger.bind_proof(caller, id, stage, payload);
        self.publish();
        out
    }

    pub fn approve_step(
        &mut self,
        caller: &Address,
        id: GhostId,
        step: Stage,
        payload: &[u8],
    ) -> Result<VoteOutcome> {
        let out = self
            .quorum
            .approve_step(&mut self.ledger, caller, id, step, payload);
        self.publish();
        out
    }

    pub fn confirm_remote_ack(&mut self, caller: &Address, id: GhostId) -> Result<()> {
        let out = self.ledger.confirm_remote_ack(caller, id);
        self.publish();
        out
    }

    pub fn settle(&mut self, caller: &Address, id: GhostId) -> Result<Retirement> {
        let out = self.ledger.settle(caller, id);
        if out.is_ok() {
            self.quorum.discard(&id);
        }
        self.publish();
        out
    }

    pub fn reclaim(&mut self, id: GhostId) -> Result<()> {
        let out = self.ledger.reclaim(id);
        if out.is_ok() {
            self.quorum.discard(&id);
        }
        self.publish();
        out
    }

    /// # Errors
    /// `InvalidThreshold` if zero.
    pub fn set_threshold(&mut self, threshold: usize) -> Result<()> {
        self.quorum.set_threshold(threshold)
    }

    // -----------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------

    #[must_use]
    pub fn ghost(&self, id: &GhostId) -> Option<&Ghost> {
        self.ledger.ghost(id)
    }

    #[must_use]
    pub fn state(&self, id: &GhostId) -> GhostState {
        self.ledger.state(id)
    }

    #[must_use]
    pub fn retirement(&self, id: &GhostId) -> Option<Retirement> {
        self.ledger.retirement(id)
    }

    #[must_use]
    pub fn ballot(&self, id: &GhostId, step: Stage) -> Option<&Ballot> {
        self.quorum.ballot(id, step)
    }

    #[must_use]
    pub fn is_validator(&self, address: &Address) -> bool {
        self.ledger.validators().is_eligible(address)
    }

    #[must_use]
    pub fn recent_ghost_ids(&self, limit: usize) -> Vec<GhostId> {
        self.ledger.recent_ghost_ids(limit)
    }

    #[must_use]
    pub fn ledger_id(&self) -> LedgerId {
        self.ledger.ledger_id()
    }

    #[must_use]
    pub fn ledger(&self) -> &GhostLedger<InMemoryCustody> {
        &self.ledger
    }

    #[must_use]
    pub fn quorum(&self) -> &QuorumApproval {
        &self.quorum
    }

    #[must_use]
    pub fn balance(&self, holder: &Address, token: &TokenId) -> u64 {
        self.ledger.custody().balance(holder, token)
    }

    /// # Errors
    /// `SupplyInvariantViolation` on any token whose flows do not balance.
    pub fn verify_supply(&self) -> Result<()> {
        self.ledger.custody().verify_all().inspect_err(|err| {
            tracing::error!(ledger = %self.ledger_id(), error = %err, "supply conservation violated");
        })
    }

    fn publish(&mut self) {
        for event in self.ledger.events().since(self.published) {
            // No subscribers is not an error; the log keeps the history.
            let _ = self.events_tx.send(event.clone());
        }
        self.published = self.ledger.events().next_seq();
    }
}

impl std::fmt::Debug for BridgeNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeNode")
            .field("ledger", &self.ledger_id())
            .field("live", &self.ledger.live_count())
            .field("open_ballots", &self.quorum.open_ballots())
            .field("published", &self.published)
            .finish()
    }
}
