//! Collaborator interfaces consumed, not implemented, by the protocol core.
//!
//! The state machine and quorum engine depend only on these traits, never
//! on a concrete registry, custody program, or proof backend.

use crate::{Address, ProofRef, Result, TokenId};

/// "Is this address an eligible validator?"
///
/// Backed by an external stake / slashing registry in production.
pub trait ValidatorCapability: Send + Sync {
    fn is_eligible(&self, address: &Address) -> bool;
}

/// Synchronous view of a proof oracle, as seen from inside a ledger.
pub trait ProofVerifier: Send + Sync {
    /// Has this reference already been verified?
    fn is_verified(&self, reference: &ProofRef) -> bool;

    /// Run verification once. Returns the post-verification status.
    fn verify(&self, reference: &ProofRef) -> bool;
}

/// Token custody on one ledger: escrow, release, destroy, create supply.
///
/// Only the ghost ledger calls this.
pub trait TokenCustody: Send {
    /// Move `amount` of `token` from `from` into custody escrow.
    fn escrow(&mut self, token: &TokenId, from: &Address, amount: u64) -> Result<()>;

    /// Return `amount` of escrowed `token` to `to`.
    fn release(&mut self, token: &TokenId, to: &Address, amount: u64) -> Result<()>;

    /// Move `amount` of escrowed `token` to the non-spendable sink.
    fn destroy(&mut self, token: &TokenId, amount: u64) -> Result<()>;

    /// Create `amount` of new `token` supply for `to`.
    fn create_supply(&mut self, token: &TokenId, to: &Address, amount: u64) -> Result<()>;
}

impl<T: ValidatorCapability + ?Sized> ValidatorCapability for std::sync::Arc<T> {
    fn is_eligible(&self, address: &Address) -> bool {
        (**self).is_eligible(address)
    }
}

impl<T: ProofVerifier + ?Sized> ProofVerifier for std::sync::Arc<T> {
    fn is_verified(&self, reference: &ProofRef) -> bool {
        (**self).is_verified(reference)
    }

    fn verify(&self, reference: &ProofRef) -> bool {
        (**self).verify(reference)
    }
}
