//! Relay orchestrator: drives origin transfers to Settled.
//!
//! Notifications and the periodic sweep both funnel into [`RelayOrchestrator::reconcile`],
//! which always starts by re-reading the origin record. Progress lives on the
//! ledgers, never in this process: a crashed or restarted relayer picks up
//! from whatever state the ledgers hold.
//!
//! ```text
//!   origin events ──┐                     (no mint recipient → stop, reclaimable)
//!                   ├──▶ reconcile(id) ──▶ Created  → bind + vote Lock
//!   sweep (interval)┘        │            Locked   → bind + vote Burn
//!                            │            Burned   → mirror sequence → ack
//!                            │            Burned+ack → settle origin
//!                        semaphore (max concurrent pipelines)
//! ```

use std::{
    collections::HashSet,
    sync::{Arc, Mutex as StdMutex, PoisonError},
    time::Duration,
};

use ghostbridge_types::{
    Address, BridgeError, ErrorClass, Ghost, GhostId, GhostState, Result, Retirement, Stage,
    StageProof, StepPayload,
};
use tokio::{
    sync::{Mutex, Semaphore, broadcast::error::RecvError, watch},
    time::MissedTickBehavior,
};

use crate::{
    client::LedgerClient,
    config::RelayerConfig,
    mirror::{MirrorOutcome, MirrorSequence},
    oracle::{ProofGenerator, obtain_verified},
    processed::ProcessedSet,
    retry::RetryPolicy,
};

/// Upper bound on state advances in one reconcile: lock, burn, mirror, settle.
const MAX_PASSES: usize = 5;

/// One ledger as seen by the relayer, with that ledger's own proof oracle.
#[derive(Clone)]
pub struct Endpoint {
    pub ledger: Arc<dyn LedgerClient>,
    pub oracle: Arc<dyn ProofGenerator>,
}

/// Where a reconcile left a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Finished earlier by this relayer.
    AlreadyProcessed,
    /// Another reconcile for the same id is running.
    InFlight,
    /// The origin has no record and no tombstone for this id.
    Unknown,
    /// The origin record is retired.
    Retired(Retirement),
    /// Our vote for `step` is in; waiting on other validators.
    AwaitingQuorum(Stage),
    /// Nothing for this relayer to do: remote record, destination outside
    /// the target ledger, or a local mint left for direct settlement.
    AwaitingSettlement,
    /// Bound for the target but no mint recipient can be derived. Left
    /// before burn so the initiator can reclaim.
    Unroutable,
    /// The target closed its record without minting.
    TargetClosed,
    /// Settled on both ledgers by this call.
    Completed,
}

pub struct RelayOrchestrator {
    origin: Endpoint,
    target: Endpoint,
    retry: RetryPolicy,
    processed: Mutex<ProcessedSet>,
    in_flight: StdMutex<HashSet<GhostId>>,
    permits: Semaphore,
    scan_window: usize,
    scan_interval: Duration,
    mint_timeout: Duration,
}

impl RelayOrchestrator {
    /// # Errors
    /// `Configuration` if the config is invalid or the endpoints' ledger ids
    /// disagree with it.
    pub fn new(config: &RelayerConfig, origin: Endpoint, target: Endpoint) -> Result<Self> {
        config.validate()?;
        if origin.ledger.ledger_id() != config.origin_ledger {
            return Err(BridgeError::Configuration(format!(
                "origin endpoint is ledger {}, config says {}",
                origin.ledger.ledger_id(),
                config.origin_ledger
            )));
        }
        if target.ledger.ledger_id() != config.target_ledger {
            return Err(BridgeError::Configuration(format!(
                "target endpoint is ledger {}, config says {}",
                target.ledger.ledger_id(),
                config.target_ledger
            )));
        }
        Ok(Self {
            origin,
            target,
            retry: RetryPolicy::from_config(&config.proof_retry),
            processed: Mutex::new(ProcessedSet::new(config.processed_cache_size)),
            in_flight: StdMutex::new(HashSet::new()),
            permits: Semaphore::new(config.max_concurrent_pipelines),
            scan_window: config.scan_window,
            scan_interval: config.scan_interval(),
            mint_timeout: config.mint_confirm_timeout(),
        })
    }

    /// Replace the proof retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Validator address used on the origin ledger.
    #[must_use]
    pub fn validator(&self) -> Address {
        self.origin.ledger.validator()
    }

    pub async fn is_processed(&self, id: &GhostId) -> bool {
        self.processed.lock().await.contains(id)
    }

    /// Advance one transfer as far as this relayer can take it.
    ///
    /// Safe to call redundantly and concurrently for the same id.
    pub async fn reconcile(&self, id: GhostId) -> Result<Progress> {
        if self.processed.lock().await.contains(&id) {
            return Ok(Progress::AlreadyProcessed);
        }
        let Some(_claim) = InFlight::claim(&self.in_flight, id) else {
            return Ok(Progress::InFlight);
        };
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| BridgeError::Internal("pipeline semaphore closed".to_string()))?;

        for _ in 0..MAX_PASSES {
            let Some(ghost) = self.origin.ledger.ghost(&id).await? else {
                return match self.origin.ledger.retirement(&id).await? {
                    Some(retired) => {
                        self.mark_processed(id).await;
                        Ok(Progress::Retired(retired))
                    }
                    None => Ok(Progress::Unknown),
                };
            };
            if ghost.is_remote {
                return Ok(Progress::AwaitingSettlement);
            }
            if ghost.is_in_flight()
                && ghost.dest_ledger == self.target.ledger.ledger_id()
                && ghost.resolvable_recipient().is_none()
            {
                tracing::warn!(ghost = %id, state = %ghost.state, "no mint recipient; not advancing");
                self.mark_processed(id).await;
                return Ok(Progress::Unroutable);
            }

            match ghost.state {
                GhostState::Created => {
                    if !self.advance(&ghost, Stage::Lock).await? {
                        return Ok(Progress::AwaitingQuorum(Stage::Lock));
                    }
                }
                GhostState::Locked => {
                    if !self.advance(&ghost, Stage::Burn).await? {
                        return Ok(Progress::AwaitingQuorum(Stage::Burn));
                    }
                }
                GhostState::Burned if ghost.remote_ack => {
                    self.origin.ledger.settle(id).await?;
                    tracing::info!(ghost = %id, origin = %self.origin.ledger.ledger_id(), "transfer settled");
                    self.mark_processed(id).await;
                    return Ok(Progress::Completed);
                }
                GhostState::Burned if ghost.dest_ledger == self.target.ledger.ledger_id() => {
                    match self.mirror_sequence().run(&ghost).await? {
                        MirrorOutcome::Acknowledged => {}
                        MirrorOutcome::AwaitingQuorum => {
                            return Ok(Progress::AwaitingQuorum(Stage::Mint));
                        }
                        MirrorOutcome::TargetClosed => return Ok(Progress::TargetClosed),
                    }
                }
                _ => return Ok(Progress::AwaitingSettlement),
            }
        }
        Err(BridgeError::Internal(format!(
            "ghost {id} still advancing after {MAX_PASSES} passes"
        )))
    }

    /// Obtain, bind and vote the single proof for `stage` on the origin.
    /// Returns whether the step is now past (executed by us or by someone else).
    async fn advance(&self, ghost: &Ghost, stage: Stage) -> Result<bool> {
        let kind = stage
            .proof_kind()
            .ok_or_else(|| BridgeError::Internal(format!("{stage} has no single proof kind")))?;
        let reference = obtain_verified(&*self.origin.oracle, &self.retry, kind, ghost).await?;
        self.origin
            .ledger
            .bind_proof(ghost.id, stage, &StageProof::Single(reference).encode())
            .await?;

        if let Some(ballot) = self.origin.ledger.ballot(&ghost.id, stage).await? {
            if ballot.voters.contains(&self.validator()) {
                return Ok(false);
            }
        }

        let payload = match stage {
            Stage::Lock => StepPayload::lock(reference),
            _ => StepPayload::burn(reference),
        };
        match self
            .origin
            .ledger
            .approve_step(ghost.id, stage, &payload.encode())
            .await
        {
            Ok(outcome) => {
                tracing::info!(
                    ghost = %ghost.id,
                    step = %stage,
                    approvals = outcome.approvals,
                    executed = outcome.executed,
                    "vote submitted"
                );
                Ok(outcome.executed)
            }
            Err(BridgeError::AlreadyVoted { .. }) => Ok(false),
            // Another validator's vote already moved the record on.
            Err(BridgeError::InvalidState { .. }) => Ok(true),
            Err(err) => Err(err),
        }
    }

    fn mirror_sequence(&self) -> MirrorSequence<'_> {
        MirrorSequence {
            origin: &*self.origin.ledger,
            target: &*self.target.ledger,
            target_oracle: &*self.target.oracle,
            retry: &self.retry,
            mint_timeout: self.mint_timeout,
        }
    }

    async fn mark_processed(&self, id: GhostId) {
        self.processed.lock().await.insert(id);
    }

    /// Watch origin notifications and sweep recent history until `shutdown`
    /// flips to `true`.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut events = self.origin.ledger.subscribe().await;
        let mut sweep = tokio::time::interval(self.scan_interval);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(
            validator = %self.validator(),
            origin = %self.origin.ledger.ledger_id(),
            target = %self.target.ledger.ledger_id(),
            "relay orchestrator running"
        );

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                received = events.recv() => match received {
                    Ok(event) => {
                        if event.is_actionable() {
                            self.spawn_reconcile(event.ghost);
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "notification stream lagged; sweeping");
                        self.sweep().await;
                    }
                    Err(RecvError::Closed) => {
                        tracing::warn!("origin notification stream closed");
                        break;
                    }
                },
                _ = sweep.tick() => self.sweep().await,
            }
        }
        tracing::info!("relay orchestrator stopped");
    }

    /// Reconcile every recent origin id not yet processed.
    pub async fn sweep(self: &Arc<Self>) {
        let ids = match self.origin.ledger.recent_ghost_ids(self.scan_window).await {
            Ok(ids) => ids,
            Err(err) => {
                tracing::warn!(error = %err, "sweep failed to list recent transfers");
                return;
            }
        };
        let pending: Vec<GhostId> = {
            let processed = self.processed.lock().await;
            ids.into_iter().filter(|id| !processed.contains(id)).collect()
        };
        tracing::debug!(pending = pending.len(), "sweep");
        for id in pending {
            self.spawn_reconcile(id);
        }
    }

    fn spawn_reconcile(self: &Arc<Self>, id: GhostId) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            match this.reconcile(id).await {
                Ok(progress) => tracing::debug!(ghost = %id, ?progress, "reconciled"),
                Err(err) => report(id, &err),
            }
        });
    }
}

/// Log a failed reconcile according to who needs to act on it.
fn report(id: GhostId, err: &BridgeError) {
    match err.class() {
        ErrorClass::Transient | ErrorClass::ProofRejected => {
            tracing::warn!(ghost = %id, code = err.code(), error = %err, "reconcile failed; retrying on next scan");
        }
        ErrorClass::Precondition => {
            tracing::warn!(ghost = %id, code = err.code(), error = %err, "reconcile rejected by ledger");
        }
        ErrorClass::QuorumDisagreement => {
            tracing::error!(ghost = %id, code = err.code(), error = %err, "validator payload disagreement");
        }
    }
}

/// Claim on one id in the in-flight set, released on drop.
struct InFlight<'a> {
    set: &'a StdMutex<HashSet<GhostId>>,
    id: GhostId,
}

impl<'a> InFlight<'a> {
    fn claim(set: &'a StdMutex<HashSet<GhostId>>, id: GhostId) -> Option<Self> {
        let fresh = set.lock().unwrap_or_else(PoisonError::into_inner).insert(id);
        fresh.then_some(Self { set, id })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

impl std::fmt::Debug for RelayOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayOrchestrator")
            .field("origin", &self.origin.ledger.ledger_id())
            .field("target", &self.target.ledger.ledger_id())
            .field("validator", &self.validator())
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}
