//! # ghostbridge-types
//!
//! Shared types, errors, and configuration for the **GhostBridge**
//! cross-ledger transfer protocol.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`GhostId`], [`Address`], [`TokenId`], [`LedgerId`], [`ProofRef`], [`DestinationAddress`]
//! - **Transfer model**: [`Ghost`], [`GhostState`], [`Retirement`]
//! - **Proof / vote model**: [`Stage`], [`ProofKind`], [`StepPayload`]
//! - **Notifications**: [`LedgerEvent`], [`EventKind`]
//! - **Collaborators**: [`ValidatorCapability`], [`ProofVerifier`], [`TokenCustody`], [`Clock`]
//! - **Wire format**: [`MirrorInstruction`]
//! - **Configuration**: [`LedgerConfig`], [`QuorumConfig`]
//! - **Errors**: [`BridgeError`] with `GB_ERR_` prefix codes
//! - **Constants**: protocol deadlines and limits

pub mod capability;
pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod ghost;
pub mod ids;
pub mod step;
pub mod wire;

// Re-export all primary types at crate root for ergonomic imports:
//   use ghostbridge_types::{Ghost, GhostState, Stage, BridgeError, ...};

pub use capability::*;
pub use clock::*;
pub use config::*;
pub use error::*;
pub use event::*;
pub use ghost::*;
pub use ids::*;
pub use step::*;
pub use wire::*;

// Constants are accessed via `ghostbridge_types::constants::FOO`
// (not re-exported to avoid name collisions).
