//! Supply conservation invariant checker.
//!
//! Per token, on one ledger:
//! ```text
//! Σ(balances) + escrow == funded + created − destroyed
//! ```
//!
//! `funded` is supply that entered from outside the bridge, `created` is
//! supply minted for inbound transfers, `destroyed` is escrow moved to the
//! sink by a burn. A mismatch means custody lost or invented value.

use std::collections::{HashMap, HashSet};

use ghostbridge_types::{BridgeError, Result, TokenId};

/// Tracks per-token supply flows and validates conservation.
#[derive(Debug, Default)]
pub struct SupplyConservation {
    funded: HashMap<TokenId, u128>,
    created: HashMap<TokenId, u128>,
    destroyed: HashMap<TokenId, u128>,
}

impl SupplyConservation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record supply arriving from outside the bridge.
    pub fn record_funding(&mut self, token: &TokenId, amount: u64) {
        *self.funded.entry(*token).or_insert(0) += u128::from(amount);
    }

    /// Record supply created by a mint.
    pub fn record_created(&mut self, token: &TokenId, amount: u64) {
        *self.created.entry(*token).or_insert(0) += u128::from(amount);
    }

    /// Record escrow moved to the sink by a burn.
    pub fn record_destroyed(&mut self, token: &TokenId, amount: u64) {
        *self.destroyed.entry(*token).or_insert(0) += u128::from(amount);
    }

    /// Expected spendable-plus-escrowed supply for `token`.
    ///
    /// Signed so that a destroyed total larger than what ever entered
    /// shows up as a violation rather than wrapping.
    #[must_use]
    pub fn expected_supply(&self, token: &TokenId) -> i128 {
        let inflow = self.total_funded(token) + self.total_created(token);
        to_signed(inflow) - to_signed(self.total_destroyed(token))
    }

    /// Check `actual` (Σ balances + escrow) against the expected supply.
    ///
    /// # Errors
    /// Returns [`BridgeError::SupplyInvariantViolation`] if they differ.
    pub fn verify(&self, token: &TokenId, actual: u128) -> Result<()> {
        let expected = self.expected_supply(token);
        if to_signed(actual) != expected {
            return Err(BridgeError::SupplyInvariantViolation {
                reason: format!(
                    "{token}: actual supply {actual} != expected {expected} \
                     (funded={}, created={}, destroyed={})",
                    self.total_funded(token),
                    self.total_created(token),
                    self.total_destroyed(token),
                ),
            });
        }
        Ok(())
    }

    /// Every token with recorded flows.
    #[must_use]
    pub fn tracked_tokens(&self) -> Vec<TokenId> {
        let mut tokens: HashSet<TokenId> = self.funded.keys().copied().collect();
        tokens.extend(self.created.keys().copied());
        tokens.extend(self.destroyed.keys().copied());
        let mut out: Vec<TokenId> = tokens.into_iter().collect();
        out.sort();
        out
    }

    #[must_use]
    pub fn total_funded(&self, token: &TokenId) -> u128 {
        self.funded.get(token).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn total_created(&self, token: &TokenId) -> u128 {
        self.created.get(token).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn total_destroyed(&self, token: &TokenId) -> u128 {
        self.destroyed.get(token).copied().unwrap_or(0)
    }
}

/// Totals are sums of `u64`s, far below `i128::MAX` in practice.
fn to_signed(v: u128) -> i128 {
    i128::try_from(v).unwrap_or(i128::MAX)
}
