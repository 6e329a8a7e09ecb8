//! Two in-process ledgers wired for local runs.
//!
//! Each ledger gets its own [`InMemoryProofOracle`]; both share one
//! validator registry and clock.

use std::sync::Arc;

use ghostbridge_gate::ValidatorRegistry;
use ghostbridge_ledger::BridgeNode;
use ghostbridge_types::{Address, Clock, LedgerConfig, QuorumConfig, Result};
use tokio::sync::Mutex;

use crate::{
    client::LocalLedger,
    config::RelayerConfig,
    oracle::InMemoryProofOracle,
    orchestrator::{Endpoint, RelayOrchestrator},
};

pub struct Devnet {
    pub origin: Arc<Mutex<BridgeNode>>,
    pub target: Arc<Mutex<BridgeNode>>,
    pub origin_oracle: Arc<InMemoryProofOracle>,
    pub target_oracle: Arc<InMemoryProofOracle>,
    pub registry: Arc<ValidatorRegistry>,
    admin: Address,
}

impl Devnet {
    /// Build both ledgers with default deadlines.
    pub fn new(
        config: &RelayerConfig,
        quorum: &QuorumConfig,
        admin: Address,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        quorum.validate()?;
        let registry = Arc::new(ValidatorRegistry::from_config(admin, quorum));
        let origin_oracle = Arc::new(InMemoryProofOracle::new("origin"));
        let target_oracle = Arc::new(InMemoryProofOracle::new("target"));

        let origin = BridgeNode::new(
            LedgerConfig::for_ledger(config.origin_ledger),
            quorum,
            Arc::clone(&clock),
            registry.clone(),
            origin_oracle.clone(),
        )?;
        let target = BridgeNode::new(
            LedgerConfig::for_ledger(config.target_ledger),
            quorum,
            clock,
            registry.clone(),
            target_oracle.clone(),
        )?;

        Ok(Self {
            origin: Arc::new(Mutex::new(origin)),
            target: Arc::new(Mutex::new(target)),
            origin_oracle,
            target_oracle,
            registry,
            admin,
        })
    }

    /// Enable `validator` on both ledgers (they share the registry).
    pub fn enable_validator(&self, validator: Address) -> Result<()> {
        self.registry.set_validator(&self.admin, validator, true)
    }

    /// Origin and target endpoints acting as `validator`.
    pub async fn endpoints(&self, validator: Address) -> (Endpoint, Endpoint) {
        let origin = LocalLedger::attach(Arc::clone(&self.origin), validator).await;
        let target = LocalLedger::attach(Arc::clone(&self.target), validator).await;
        (
            Endpoint {
                ledger: Arc::new(origin),
                oracle: self.origin_oracle.clone(),
            },
            Endpoint {
                ledger: Arc::new(target),
                oracle: self.target_oracle.clone(),
            },
        )
    }

    /// Orchestrator voting as `validator`, which must already be enabled.
    pub async fn orchestrator(
        &self,
        config: &RelayerConfig,
        validator: Address,
    ) -> Result<RelayOrchestrator> {
        let (origin, target) = self.endpoints(validator).await;
        RelayOrchestrator::new(config, origin, target)
    }
}

impl std::fmt::Debug for Devnet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Devnet")
            .field("validators", &self.registry.len())
            .finish_non_exhaustive()
    }
}
