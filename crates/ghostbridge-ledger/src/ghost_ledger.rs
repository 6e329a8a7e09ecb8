//! GhostLedger: owner of transfer records on one ledger.
//!
//! The ledger is the only code path that touches token custody. Its three
//! proof-gated transitions (`lock`, `burn`, `mint`) are crate-private so
//! that [`QuorumApproval`](crate::QuorumApproval) is the only way to reach
//! them; individual validators never call them directly.
//!
//! Every operation checks the exact state it requires before doing
//! anything, so two racing callers see exactly one success.
//!
//! ## Deadlines
//!
//! - `GHOST_TIMEOUT` from creation: lock, burn and mint require
//!   `now ≤ created_at + GHOST_TIMEOUT`; reclaim requires `now >` it.
//! - `ATOMIC_WINDOW` from burn: mint requires `now ≤ burned_at + ATOMIC_WINDOW`;
//!   settle-on-timeout requires `now >` it.

use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
};

use chrono::{DateTime, Duration, Utc};
use ghostbridge_gate::ProofGate;
use ghostbridge_types::{
    Address, BridgeError, Clock, EventKind, Ghost, GhostId, GhostState, InitiateRequest,
    LedgerConfig, LedgerId, MirrorRequest, ProofRef, ProofVerifier, Result, Retirement, Stage,
    StepPayload, TokenCustody, ValidatorCapability,
};

use crate::{custody::InMemoryCustody, event_log::EventLog};

/// Transfer state machine for one ledger.
pub struct GhostLedger<C: TokenCustody = InMemoryCustody> {
    config: LedgerConfig,
    clock: Arc<dyn Clock>,
    validators: Arc<dyn ValidatorCapability>,
    gate: ProofGate,
    custody: C,
    /// Live records.
    ghosts: HashMap<GhostId, Ghost>,
    /// Settled or reclaimed ids. Never reused.
    retired: HashMap<GhostId, Retirement>,
    /// Most recently created or mirrored ids, oldest at the front.
    recent: VecDeque<GhostId>,
    /// Next id-derivation nonce.
    nonce: u64,
    events: EventLog,
}

impl<C: TokenCustody> GhostLedger<C> {
    #[must_use]
    pub fn new(
        config: LedgerConfig,
        clock: Arc<dyn Clock>,
        validators: Arc<dyn ValidatorCapability>,
        verifier: Arc<dyn ProofVerifier>,
        custody: C,
    ) -> Self {
        let events = EventLog::new(config.ledger_id);
        Self {
            gate: ProofGate::new(verifier, Arc::clone(&validators)),
            config,
            clock,
            validators,
            custody,
            ghosts: HashMap::new(),
            retired: HashMap::new(),
            recent: VecDeque::new(),
            nonce: 0,
            events,
        }
    }

    // -----------------------------------------------------------------
    // Public operations
    // -----------------------------------------------------------------

    /// Escrow `req.amount` of the source token from `initiator` and open a
    /// new transfer in `Created`.
    ///
    /// # Errors
    /// - `InvalidTransfer` on a zero amount, or when another ledger is the
    ///   destination and no mint recipient can be derived
    /// - `GhostExists` / `GhostRetired` if the derived id is taken
    /// - any custody error, surfaced unchanged
    pub fn initiate(&mut self, initiator: Address, req: InitiateRequest) -> Result<GhostId> {
        if req.amount == 0 {
            return Err(BridgeError::InvalidTransfer {
                reason: "amount must be > 0".to_string(),
            });
        }
        if req.dest_ledger != self.ledger_id() && req.recipient().is_none() {
            return Err(BridgeError::InvalidTransfer {
                reason: format!(
                    "destination address is {} bytes and no local destination is set",
                    req.dest_address.as_bytes().len()
                ),
            });
        }

        let id = req.ghost_id(self.ledger_id(), &initiator, self.nonce);
        self.ensure_unused(id)?;

        self.custody.escrow(&req.source_token, &initiator, req.amount)?;
        self.nonce += 1;

        let now = self.clock.now();
        let ghost = Ghost {
            id,
            initiator,
            source_token: req.source_token,
            dest_token: req.dest_token,
            source_ledger: self.ledger_id(),
            dest_ledger: req.dest_ledger,
            dest_address: Some(req.dest_address),
            local_destination: req.local_destination,
            amount: req.amount,
            amount_commitment: req.amount_commitment,
            state: GhostState::Created,
            is_remote: false,
            remote_ack: false,
            created_at: now,
            locked_at: None,
            burned_at: None,
            minted_at: None,
            lock_proof: None,
            burn_proof: None,
            mint_proof: None,
            minted_to: None,
        };
        self.insert(ghost);
        self.emit(
            id,
            EventKind::GhostCreated {
                amount: req.amount,
                dest_ledger: req.dest_ledger,
            },
        );
        tracing::info!(ghost = %id, initiator = %initiator, amount = req.amount, dest = %req.dest_ledger, "ghost created");
        Ok(id)
    }

    /// Materialize a transfer already burned on its origin ledger.
    ///
    /// The record enters directly in `Burned` with `is_remote = true`. Its
    /// burn time is the origin's burn time when supplied, never later than
    /// local now.
    ///
    /// # Errors
    /// - `Unauthorized` if `caller` is not an eligible validator
    /// - `WrongDestinationLedger` if the request targets another ledger
    /// - `InvalidTransfer` on a zero amount
    /// - `GhostExists` / `GhostRetired` if the id is taken
    pub fn mirror(&mut self, caller: &Address, req: MirrorRequest) -> Result<GhostId> {
        self.ensure_validator(caller)?;
        if req.dest_ledger != self.ledger_id() {
            return Err(BridgeError::WrongDestinationLedger {
                expected: self.ledger_id(),
                actual: req.dest_ledger,
            });
        }
        if req.amount == 0 {
            return Err(BridgeError::InvalidTransfer {
                reason: "amount must be > 0".to_string(),
            });
        }
        self.ensure_unused(req.ghost_id)?;

        let now = self.clock.now();
        let burned_at = req.burned_at_on_origin.map_or(now, |t| t.min(now));
        let id = req.ghost_id;
        let ghost = Ghost {
            id,
            initiator: Address::default(),
            source_token: req.source_token,
            dest_token: req.dest_token,
            source_ledger: req.source_ledger,
            dest_ledger: req.dest_ledger,
            dest_address: req.dest_address,
            local_destination: None,
            amount: req.amount,
            amount_commitment: None,
            state: GhostState::Burned,
            is_remote: true,
            remote_ack: false,
            created_at: now,
            locked_at: None,
            burned_at: Some(burned_at),
            minted_at: None,
            lock_proof: None,
            burn_proof: Some(req.burn_proof),
            mint_proof: None,
            minted_to: None,
        };
        self.insert(ghost);
        self.emit(
            id,
            EventKind::GhostMirrored {
                source_ledger: req.source_ledger,
            },
        );
        tracing::info!(ghost = %id, source = %req.source_ledger, amount = req.amount, "ghost mirrored");
        Ok(id)
    }

    /// Bind a stage proof at the gate for a live record.
    ///
    /// # Errors
    /// `GhostNotFound` for unknown ids, otherwise whatever the gate rejects with.
    pub fn bind_proof(
        &mut self,
        caller: &Address,
        id: GhostId,
        stage: Stage,
        payload: &[u8],
    ) -> Result<ProofRef> {
        if !self.ghosts.contains_key(&id) {
            return Err(BridgeError::GhostNotFound(id));
        }
        let already = self.gate.bound(&id, stage).is_some();
        let hash = self.gate.bind_proof(caller, id, stage, payload)?;
        if !already {
            self.emit(id, EventKind::ProofBound { stage });
        }
        Ok(hash)
    }

    /// Record that the destination side of this transfer completed.
    ///
    /// Idempotent once set.
    ///
    /// # Errors
    /// - `Unauthorized`, `GhostNotFound`
    /// - `RemoteGhost` on mirrored records
    /// - `InvalidState` unless `Burned`
    pub fn confirm_remote_ack(&mut self, caller: &Address, id: GhostId) -> Result<()> {
        self.ensure_validator(caller)?;
        let ghost = self.ghosts.get_mut(&id).ok_or(BridgeError::GhostNotFound(id))?;
        if ghost.is_remote {
            return Err(BridgeError::RemoteGhost(id));
        }
        if ghost.state != GhostState::Burned {
            return Err(BridgeError::InvalidState {
                ghost: id,
                action: "acknowledge",
                state: ghost.state,
            });
        }
        if ghost.remote_ack {
            return Ok(());
        }
        ghost.remote_ack = true;
        self.emit(id, EventKind::RemoteAckConfirmed);
        tracing::info!(ghost = %id, "remote ack confirmed");
        Ok(())
    }

    /// Close out and delete a record.
    ///
    /// Allowed when `Minted`, when `Burned` and acknowledged, or when
    /// `Burned` and the atomic window has elapsed.
    ///
    /// # Errors
    /// - `Unauthorized`, `GhostNotFound`
    /// - `NotSettleable` otherwise
    pub fn settle(&mut self, caller: &Address, id: GhostId) -> Result<Retirement> {
        self.ensure_validator(caller)?;
        let ghost = self.ghosts.get(&id).ok_or(BridgeError::GhostNotFound(id))?;
        let now = self.clock.now();

        let minted = ghost.state == GhostState::Minted;
        let acked = ghost.state == GhostState::Burned && ghost.remote_ack;
        let timed_out = ghost.state == GhostState::Burned
            && ghost
                .burned_at
                .is_some_and(|t| now > deadline(t, self.config.atomic_window()));

        if !(minted || acked || timed_out) {
            return Err(BridgeError::NotSettleable(id));
        }
        if timed_out && !acked {
            tracing::warn!(ghost = %id, remote = ghost.is_remote, "settling unacknowledged burn after atomic window");
        }

        let retirement = Retirement::Settled { minted };
        self.retire(id, retirement);
        self.emit(id, EventKind::GhostSettled);
        tracing::info!(ghost = %id, minted, "ghost settled");
        Ok(retirement)
    }

    /// Return escrow to the initiator of a stalled local transfer.
    ///
    /// Any caller may trigger this once the timeout has passed.
    ///
    /// # Errors
    /// - `GhostNotFound`
    /// - `RemoteGhost` on mirrored records, regardless of elapsed time
    /// - `InvalidState` unless `Created` or `Locked`
    /// - `TimeoutNotReached` while `now ≤ created_at + GHOST_TIMEOUT`
    pub fn reclaim(&mut self, id: GhostId) -> Result<()> {
        let ghost = self.ghosts.get(&id).ok_or(BridgeError::GhostNotFound(id))?;
        if ghost.is_remote {
            return Err(BridgeError::RemoteGhost(id));
        }
        if !ghost.is_in_flight() {
            return Err(BridgeError::InvalidState {
                ghost: id,
                action: "reclaim",
                state: ghost.state,
            });
        }
        if self.clock.now() <= deadline(ghost.created_at, self.config.ghost_timeout()) {
            return Err(BridgeError::TimeoutNotReached(id));
        }

        let (token, initiator, amount) = (ghost.source_token, ghost.initiator, ghost.amount);
        self.custody.release(&token, &initiator, amount)?;

        self.retire(id, Retirement::Reclaimed);
        self.emit(id, EventKind::GhostReclaimed { amount });
        tracing::info!(ghost = %id, initiator = %initiator, amount, "ghost reclaimed");
        Ok(())
    }

    // -----------------------------------------------------------------
    // Quorum-only transitions
    // -----------------------------------------------------------------

    /// `Created → Locked`.
    pub(crate) fn lock(&mut self, id: GhostId, payload: &[u8]) -> Result<()> {
        let now = self.clock.now();
        let ghost = self.live_in(id, GhostState::Created, "lock")?;
        self.ensure_not_expired(ghost, now)?;
        let proof = self.gate.admit(id, Stage::Lock, payload)?;

        let ghost = self.ghost_mut(id)?;
        ghost.state = GhostState::Locked;
        ghost.locked_at = Some(now);
        ghost.lock_proof = Some(proof);
        self.emit(id, EventKind::GhostLocked);
        tracing::info!(ghost = %id, "ghost locked");
        Ok(())
    }

    /// `Locked → Burned`. Escrow moves to the sink in the same step.
    pub(crate) fn burn(&mut self, id: GhostId, payload: &[u8]) -> Result<()> {
        let now = self.clock.now();
        let ghost = self.live_in(id, GhostState::Locked, "burn")?;
        self.ensure_not_expired(ghost, now)?;
        let (token, amount) = (ghost.source_token, ghost.amount);
        let proof = self.gate.admit(id, Stage::Burn, payload)?;

        self.custody.destroy(&token, amount)?;

        let ghost = self.ghost_mut(id)?;
        ghost.state = GhostState::Burned;
        ghost.remote_ack = false;
        ghost.burned_at = Some(now);
        ghost.burn_proof = Some(proof);
        self.emit(id, EventKind::GhostBurned);
        tracing::info!(ghost = %id, amount, "ghost burned");
        Ok(())
    }

    /// `Burned → Minted`. `payload` is the full Mint step payload
    /// (proof pair ‖ recipient).
    pub(crate) fn mint(&mut self, id: GhostId, payload: &[u8]) -> Result<()> {
        let step = StepPayload::decode(Stage::Mint, payload)?;
        let now = self.clock.now();
        let ghost = self.live_in(id, GhostState::Burned, "mint")?;
        self.ensure_not_expired(ghost, now)?;
        let burned_at = ghost.burned_at.unwrap_or(ghost.created_at);
        if now > deadline(burned_at, self.config.atomic_window()) {
            tracing::warn!(ghost = %id, burned_at = %burned_at, "mint outside atomic window");
            return Err(BridgeError::AtomicWindowElapsed(id));
        }
        let fallback = step.recipient.ok_or_else(|| BridgeError::MalformedPayload {
            reason: "mint payload carries no recipient".to_string(),
        })?;
        let recipient = ghost.mint_recipient(fallback);
        let (token, amount) = (ghost.dest_token, ghost.amount);
        let proof = self.gate.admit(id, Stage::Mint, &step.proof.encode())?;

        self.custody.create_supply(&token, &recipient, amount)?;

        let ghost = self.ghost_mut(id)?;
        ghost.state = GhostState::Minted;
        ghost.minted_at = Some(now);
        ghost.mint_proof = Some(proof);
        ghost.minted_to = Some(recipient);
        self.emit(id, EventKind::MintCompleted { recipient, amount });
        tracing::info!(ghost = %id, recipient = %recipient, amount, "mint completed");
        Ok(())
    }

    /// Run the transition for `step`.
    pub(crate) fn execute(&mut self, id: GhostId, step: Stage, payload: &[u8]) -> Result<()> {
        match step {
            Stage::Lock => self.lock(id, payload),
            Stage::Burn => self.burn(id, payload),
            Stage::Mint => self.mint(id, payload),
        }
    }

    pub(crate) fn emit(&mut self, id: GhostId, kind: EventKind) {
        let now = self.clock.now();
        self.events.append(id, kind, now);
    }

    /// Drop unpublished events from sequence `from` on.
    pub(crate) fn retract_events(&mut self, from: u64) {
        self.events.truncate(from);
    }

    // -----------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------

    #[must_use]
    pub fn ghost(&self, id: &GhostId) -> Option<&Ghost> {
        self.ghosts.get(id)
    }

    /// Current state; `None` for unknown and deleted ids alike.
    #[must_use]
    pub fn state(&self, id: &GhostId) -> GhostState {
        self.ghosts.get(id).map_or(GhostState::None, |g| g.state)
    }

    #[must_use]
    pub fn retirement(&self, id: &GhostId) -> Option<Retirement> {
        self.retired.get(id).copied()
    }

    /// Up to `limit` most recent ids, newest first.
    #[must_use]
    pub fn recent_ghost_ids(&self, limit: usize) -> Vec<GhostId> {
        self.recent.iter().rev().take(limit).copied().collect()
    }

    #[must_use]
    pub fn live_count(&self) -> usize {
        self.ghosts.len()
    }

    #[must_use]
    pub fn ledger_id(&self) -> LedgerId {
        self.config.ledger_id
    }

    #[must_use]
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    #[must_use]
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    #[must_use]
    pub fn gate(&self) -> &ProofGate {
        &self.gate
    }

    #[must_use]
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    #[must_use]
    pub fn custody(&self) -> &C {
        &self.custody
    }

    /// Direct custody access for funding accounts from outside the bridge.
    pub fn custody_mut(&mut self) -> &mut C {
        &mut self.custody
    }

    #[must_use]
    pub fn validators(&self) -> &Arc<dyn ValidatorCapability> {
        &self.validators
    }

    // -----------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------

    fn ensure_validator(&self, caller: &Address) -> Result<()> {
        if self.validators.is_eligible(caller) {
            Ok(())
        } else {
            tracing::warn!(caller = %caller, ledger = %self.ledger_id(), "privileged call by non-validator");
            Err(BridgeError::Unauthorized(*caller))
        }
    }

    fn ensure_unused(&self, id: GhostId) -> Result<()> {
        if self.ghosts.contains_key(&id) {
            return Err(BridgeError::GhostExists(id));
        }
        if self.retired.contains_key(&id) {
            return Err(BridgeError::GhostRetired(id));
        }
        Ok(())
    }

    fn ensure_not_expired(&self, ghost: &Ghost, now: DateTime<Utc>) -> Result<()> {
        if now > deadline(ghost.created_at, self.config.ghost_timeout()) {
            return Err(BridgeError::GhostExpired(ghost.id));
        }
        Ok(())
    }

    /// The live record, if it is exactly in `required`.
    fn live_in(&self, id: GhostId, required: GhostState, action: &'static str) -> Result<&Ghost> {
        let ghost = self.ghosts.get(&id).ok_or(BridgeError::GhostNotFound(id))?;
        if ghost.state != required {
            return Err(BridgeError::InvalidState {
                ghost: id,
                action,
                state: ghost.state,
            });
        }
        Ok(ghost)
    }

    fn ghost_mut(&mut self, id: GhostId) -> Result<&mut Ghost> {
        self.ghosts.get_mut(&id).ok_or(BridgeError::GhostNotFound(id))
    }

    fn insert(&mut self, ghost: Ghost) {
        if self.recent.len() >= self.config.recent_window {
            self.recent.pop_front();
        }
        self.recent.push_back(ghost.id);
        self.ghosts.insert(ghost.id, ghost);
    }

    fn retire(&mut self, id: GhostId, retirement: Retirement) {
        self.ghosts.remove(&id);
        self.retired.insert(id, retirement);
        self.gate.forget(&id);
    }
}

/// `start + window`, saturating at the far future.
fn deadline(start: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    start
        .checked_add_signed(window)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
