//! # ghostbridge-relayer
//!
//! **Off-chain plane**: the only component that watches both ledgers. It
//! drives each origin transfer from Created to Settled and recovers from
//! partial failure by re-reading ledger state.
//!
//! ## Architecture
//!
//! ```text
//!   origin BridgeNode ──LedgerClient──┐                 ┌──LedgerClient── target BridgeNode
//!   origin oracle ────ProofGenerator──┤                 ├──ProofGenerator── target oracle
//!                                     ▼                 ▼
//!                               RelayOrchestrator ──▶ MirrorSequence
//!                                 │  reconcile(id)     (mirror, mint, ack)
//!                                 │  RetryPolicy around the oracles
//!                                 └─ ProcessedSet (local de-dup only)
//! ```
//!
//! Ledgers are reached only through [`LedgerClient`]; [`LocalLedger`] adapts
//! an in-process node. Proofs come from [`ProofGenerator`].

pub mod client;
pub mod config;
pub mod devnet;
pub mod identity;
pub mod mirror;
pub mod oracle;
pub mod orchestrator;
pub mod processed;
pub mod retry;
pub mod telemetry;

pub use client::{LedgerClient, LocalLedger};
pub use config::{Backoff, RelayerConfig, RetryConfig};
pub use devnet::Devnet;
pub use identity::RelayerIdentity;
pub use mirror::{MirrorOutcome, mirror_slot};
pub use oracle::{InMemoryProofOracle, ProofGenerator, obtain_verified};
pub use orchestrator::{Endpoint, Progress, RelayOrchestrator};
pub use processed::ProcessedSet;
pub use retry::RetryPolicy;
pub use telemetry::init_tracing;
