//! Validator registry: the admin-managed allow-list behind
//! [`ValidatorCapability`].
//!
//! One admin key may enable or disable validators, up to a fixed cap.
//! Everything else (ledger, gate, quorum) holds the registry only as
//! `Arc<dyn ValidatorCapability>`, so a stake-backed registry can replace
//! it without touching the state machine.

use std::sync::{PoisonError, RwLock};

use ghostbridge_types::{Address, BridgeError, QuorumConfig, Result, ValidatorCapability};

/// Admin-managed validator allow-list.
#[derive(Debug)]
pub struct ValidatorRegistry {
    admin: Address,
    max_validators: usize,
    /// Enabled validators in insertion order.
    validators: RwLock<Vec<Address>>,
}

impl ValidatorRegistry {
    /// Create an empty registry controlled by `admin`.
    #[must_use]
    pub fn new(admin: Address, max_validators: usize) -> Self {
        Self {
            admin,
            max_validators,
            validators: RwLock::new(Vec::new()),
        }
    }

    /// Registry sized from a quorum configuration.
    #[must_use]
    pub fn from_config(admin: Address, config: &QuorumConfig) -> Self {
        Self::new(admin, config.max_validators)
    }

    /// Enable or disable `validator`.
    ///
    /// Enabling an already-enabled validator and disabling an unknown one
    /// are both no-ops.
    ///
    /// # Errors
    /// - `UnauthorizedAdmin` if `caller` is not the admin
    /// - `ValidatorLimit` if enabling would exceed the cap
    pub fn set_validator(&self, caller: &Address, validator: Address, enabled: bool) -> Result<()> {
        if !self.is_admin(caller) {
            tracing::warn!(caller = %caller, "set_validator by non-admin");
            return Err(BridgeError::UnauthorizedAdmin(*caller));
        }

        let mut validators = self
            .validators
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        if enabled {
            if validators.contains(&validator) {
                return Ok(());
            }
            if validators.len() >= self.max_validators {
                return Err(BridgeError::ValidatorLimit {
                    max: self.max_validators,
                });
            }
            validators.push(validator);
            tracing::info!(validator = %validator, count = validators.len(), "validator enabled");
        } else if let Some(pos) = validators.iter().position(|v| *v == validator) {
            validators.remove(pos);
            tracing::info!(validator = %validator, count = validators.len(), "validator disabled");
        }
        Ok(())
    }

    #[must_use]
    pub fn is_admin(&self, address: &Address) -> bool {
        self.admin == *address
    }

    /// Snapshot of the enabled validators.
    #[must_use]
    pub fn validators(&self) -> Vec<Address> {
        self.validators
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.validators
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn max_validators(&self) -> usize {
        self.max_validators
    }
}

impl ValidatorCapability for ValidatorRegistry {
    fn is_eligible(&self, address: &Address) -> bool {
        self.validators
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(address)
    }
}
