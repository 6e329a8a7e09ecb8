//! Ledger access seam for the relayer.
//!
//! The orchestrator only talks to ledgers through [`LedgerClient`], acting as
//! one validator. [`LocalLedger`] adapts an in-process [`BridgeNode`]; an RPC
//! client for a remote ledger would implement the same trait.

use std::sync::Arc;

use async_trait::async_trait;
use ghostbridge_ledger::{Ballot, BridgeNode, VoteOutcome};
use ghostbridge_types::{
    Address, Ghost, GhostId, LedgerEvent, LedgerId, ProofRef, Result, Retirement, Stage,
};
use tokio::sync::{Mutex, broadcast};

#[async_trait]
pub trait LedgerClient: Send + Sync {
    fn ledger_id(&self) -> LedgerId;

    /// The validator address this client acts as.
    fn validator(&self) -> Address;

    async fn ghost(&self, id: &GhostId) -> Result<Option<Ghost>>;

    async fn retirement(&self, id: &GhostId) -> Result<Option<Retirement>>;

    async fn ballot(&self, id: &GhostId, step: Stage) -> Result<Option<Ballot>>;

    /// Newest first.
    async fn recent_ghost_ids(&self, limit: usize) -> Result<Vec<GhostId>>;

    async fn bind_proof(&self, id: GhostId, stage: Stage, payload: &[u8]) -> Result<ProofRef>;

    async fn approve_step(&self, id: GhostId, step: Stage, payload: &[u8]) -> Result<VoteOutcome>;

    /// Submit a wire-encoded mirror instruction.
    async fn submit_mirror(&self, instruction: &[u8]) -> Result<GhostId>;

    async fn confirm_remote_ack(&self, id: GhostId) -> Result<()>;

    async fn settle(&self, id: GhostId) -> Result<Retirement>;

    async fn subscribe(&self) -> broadcast::Receiver<LedgerEvent>;
}

/// A shared in-process [`BridgeNode`], driven as `validator`.
#[derive(Clone)]
pub struct LocalLedger {
    node: Arc<Mutex<BridgeNode>>,
    ledger_id: LedgerId,
    validator: Address,
}

impl LocalLedger {
    pub async fn attach(node: Arc<Mutex<BridgeNode>>, validator: Address) -> Self {
        let ledger_id = node.lock().await.ledger_id();
        Self {
            node,
            ledger_id,
            validator,
        }
    }

    #[must_use]
    pub fn node(&self) -> Arc<Mutex<BridgeNode>> {
        Arc::clone(&self.node)
    }
}

#[async_trait]
impl LedgerClient for LocalLedger {
    fn ledger_id(&self) -> LedgerId {
        self.ledger_id
    }

    fn validator(&self) -> Address {
        self.validator
    }

    async fn ghost(&self, id: &GhostId) -> Result<Option<Ghost>> {
        Ok(self.node.lock().await.ghost(id).cloned())
    }

    async fn retirement(&self, id: &GhostId) -> Result<Option<Retirement>> {
        Ok(self.node.lock().await.retirement(id))
    }

    async fn ballot(&self, id: &GhostId, step: Stage) -> Result<Option<Ballot>> {
        Ok(self.node.lock().await.ballot(id, step).cloned())
    }

    async fn recent_ghost_ids(&self, limit: usize) -> Result<Vec<GhostId>> {
        Ok(self.node.lock().await.recent_ghost_ids(limit))
    }

    async fn bind_proof(&self, id: GhostId, stage: Stage, payload: &[u8]) -> Result<ProofRef> {
        self.node
            .lock()
            .await
            .bind_proof(&self.validator, id, stage, payload)
    }

    async fn approve_step(&self, id: GhostId, step: Stage, payload: &[u8]) -> Result<VoteOutcome> {
        self.node
            .lock()
            .await
            .approve_step(&self.validator, id, step, payload)
    }

    async fn submit_mirror(&self, instruction: &[u8]) -> Result<GhostId> {
        self.node
            .lock()
            .await
            .submit_instruction(&self.validator, instruction)
    }

    async fn confirm_remote_ack(&self, id: GhostId) -> Result<()> {
        self.node.lock().await.confirm_remote_ack(&self.validator, id)
    }

    async fn settle(&self, id: GhostId) -> Result<Retirement> {
        self.node.lock().await.settle(&self.validator, id)
    }

    async fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.node.lock().await.subscribe()
    }
}

impl std::fmt::Debug for LocalLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalLedger")
            .field("ledger", &self.ledger_id)
            .field("validator", &self.validator)
            .finish_non_exhaustive()
    }
}
