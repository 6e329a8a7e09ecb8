//! # ghostbridge-gate
//!
//! **Admission Plane**: decides who may act and which proofs are admissible.
//!
//! ## Architecture
//!
//! 1. **ValidatorRegistry**: admin-managed, capped validator set. Implements
//!    [`ValidatorCapability`](ghostbridge_types::ValidatorCapability), which
//!    is all the rest of the system ever sees of it.
//! 2. **ProofGate**: binds one proof payload per (ghost, stage) after
//!    consulting the proof oracle, and re-derives admissibility on demand.
//!
//! ## Stage Flow
//!
//! ```text
//! validator → ProofGate.bind_proof(Lock, a)   ── oracle: a verified? ──▶ bound
//! validator → ProofGate.bind_proof(Burn, b)   ── oracle: b verified? ──▶ bound
//! validator → ProofGate.bind_proof(Mint, a‖b) ── oracle: a, b verified? ▶ bound
//! ledger    → ProofGate.admit(Mint, a‖b)      ── Lock=a, Burn=b, still verified
//! ```

pub mod proof_gate;
pub mod validator_registry;

pub use proof_gate::ProofGate;
pub use validator_registry::ValidatorRegistry;
