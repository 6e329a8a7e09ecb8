//! # ghostbridge-ledger
//!
//! **State Plane**: the transfer state machine of one ledger and the
//! quorum engine that drives it.
//!
//! ## Architecture
//!
//! 1. **GhostLedger**: sole owner of transfer records and of token custody
//! 2. **QuorumApproval**: the only caller of the ledger's proof-gated
//!    transitions (`lock`, `burn`, `mint`)
//! 3. **InMemoryCustody**: balances, escrow pool, burn sink, with
//!    supply conservation checked by **SupplyConservation**
//! 4. **EventLog**: append-only, sequence-numbered notifications
//! 5. **BridgeNode**: the above composed into one ledger's full surface,
//!    with broadcast fan-out of notifications
//!
//! ## Transfer Flow
//!
//! ```text
//! initiate ─▶ CREATED ─quorum(Lock)─▶ LOCKED ─quorum(Burn)─▶ BURNED ─▶ settle (after ack)
//!                                                            │
//! (destination ledger)              mirror ─▶ BURNED ─quorum(Mint)─▶ MINTED ─▶ settle
//! ```

pub mod custody;
pub mod event_log;
pub mod ghost_ledger;
pub mod node;
pub mod quorum;
pub mod supply_conservation;

#[cfg(test)]
pub(crate) mod test_support;

pub use custody::InMemoryCustody;
pub use event_log::EventLog;
pub use ghost_ledger::GhostLedger;
pub use node::BridgeNode;
pub use quorum::{Ballot, QuorumApproval, VoteOutcome};
pub use supply_conservation::SupplyConservation;
