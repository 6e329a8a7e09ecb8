//! In-memory token custody for one ledger.
//!
//! Tracks per-(holder, token) balances, a per-token escrow pool, and a
//! per-token sink that burned escrow moves into and never leaves. All
//! mutations are atomic: either the full operation succeeds or nothing
//! changes.

use std::collections::HashMap;

use ghostbridge_types::{Address, BridgeError, Result, TokenCustody, TokenId};

use crate::supply_conservation::SupplyConservation;

/// Custody backed by plain maps, with supply-conservation bookkeeping.
#[derive(Debug, Default)]
pub struct InMemoryCustody {
    balances: HashMap<(Address, TokenId), u64>,
    escrow: HashMap<TokenId, u64>,
    /// Non-spendable burn destination.
    sink: HashMap<TokenId, u64>,
    supply: SupplyConservation,
}

impl InMemoryCustody {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `holder` with supply from outside the bridge.
    ///
    /// # Errors
    /// `AmountOverflow` if the balance would overflow.
    pub fn fund(&mut self, holder: Address, token: &TokenId, amount: u64) -> Result<()> {
        let entry = self.balances.entry((holder, *token)).or_insert(0);
        *entry = entry.checked_add(amount).ok_or(BridgeError::AmountOverflow)?;
        self.supply.record_funding(token, amount);
        Ok(())
    }

    #[must_use]
    pub fn balance(&self, holder: &Address, token: &TokenId) -> u64 {
        self.balances.get(&(*holder, *token)).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn escrowed(&self, token: &TokenId) -> u64 {
        self.escrow.get(token).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn destroyed(&self, token: &TokenId) -> u64 {
        self.sink.get(token).copied().unwrap_or(0)
    }

    /// Verify supply conservation for `token`.
    ///
    /// # Errors
    /// `SupplyInvariantViolation` if balances plus escrow disagree with
    /// recorded flows.
    pub fn verify_supply(&self, token: &TokenId) -> Result<()> {
        let held: u128 = self
            .balances
            .iter()
            .filter(|((_, t), _)| t == token)
            .map(|(_, amount)| u128::from(*amount))
            .sum();
        self.supply
            .verify(token, held + u128::from(self.escrowed(token)))
    }

    /// Verify conservation for every token ever touched.
    ///
    /// # Errors
    /// The first violation found.
    pub fn verify_all(&self) -> Result<()> {
        for token in self.supply.tracked_tokens() {
            self.verify_supply(&token)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn supply(&self) -> &SupplyConservation {
        &self.supply
    }

    fn take_escrow(&mut self, token: &TokenId, amount: u64) -> Result<()> {
        let pool = self.escrow.get_mut(token).ok_or(BridgeError::InsufficientEscrow {
            needed: amount,
            available: 0,
        })?;
        if *pool < amount {
            return Err(BridgeError::InsufficientEscrow {
                needed: amount,
                available: *pool,
            });
        }
        *pool -= amount;
        Ok(())
    }
}

impl TokenCustody for InMemoryCustody {
    fn escrow(&mut self, token: &TokenId, from: &Address, amount: u64) -> Result<()> {
        let balance = self
            .balances
            .get_mut(&(*from, *token))
            .ok_or(BridgeError::InsufficientBalance {
                needed: amount,
                available: 0,
            })?;
        if *balance < amount {
            return Err(BridgeError::InsufficientBalance {
                needed: amount,
                available: *balance,
            });
        }
        let pool = self.escrow.entry(*token).or_insert(0);
        let new_pool = pool.checked_add(amount).ok_or(BridgeError::AmountOverflow)?;
        *balance -= amount;
        *pool = new_pool;
        Ok(())
    }

    fn release(&mut self, token: &TokenId, to: &Address, amount: u64) -> Result<()> {
        let current = self.balance(to, token);
        let credited = current.checked_add(amount).ok_or(BridgeError::AmountOverflow)?;
        self.take_escrow(token, amount)?;
        self.balances.insert((*to, *token), credited);
        Ok(())
    }

    fn destroy(&mut self, token: &TokenId, amount: u64) -> Result<()> {
        let sunk = self
            .destroyed(token)
            .checked_add(amount)
            .ok_or(BridgeError::AmountOverflow)?;
        self.take_escrow(token, amount)?;
        self.sink.insert(*token, sunk);
        self.supply.record_destroyed(token, amount);
        Ok(())
    }

    fn create_supply(&mut self, token: &TokenId, to: &Address, amount: u64) -> Result<()> {
        let current = self.balance(to, token);
        let credited = current.checked_add(amount).ok_or(BridgeError::AmountOverflow)?;
        self.balances.insert((*to, *token), credited);
        self.supply.record_created(token, amount);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: TokenId = TokenId([1u8; 32]);

    fn funded(amount: u64) -> (InMemoryCustody, Address) {
        let mut custody = InMemoryCustody::new();
        let holder = Address::random();
        custody.fund(holder, &TOKEN, amount).unwrap();
        (custody, holder)
    }

    #[test]
    fn escrow_moves_balance_into_pool() {
        let (mut c, holder) = funded(1_000);
        c.escrow(&TOKEN, &holder, 400).unwrap();
        assert_eq!(c.balance(&holder, &TOKEN), 600);
        assert_eq!(c.escrowed(&TOKEN), 400);
        c.verify_supply(&TOKEN).unwrap();
    }

    #[test]
    fn escrow_insufficient_balance_changes_nothing() {
        let (mut c, holder) = funded(10);
        let err = c.escrow(&TOKEN, &holder, 11).unwrap_err();
        assert_eq!(
            err,
            BridgeError::InsufficientBalance {
                needed: 11,
                available: 10
            }
        );
        assert_eq!(c.balance(&holder, &TOKEN), 10);
        assert_eq!(c.escrowed(&TOKEN), 0);
    }

    #[test]
    fn release_returns_escrow() {
        let (mut c, holder) = funded(100);
        c.escrow(&TOKEN, &holder, 100).unwrap();
        c.release(&TOKEN, &holder, 100).unwrap();
        assert_eq!(c.balance(&holder, &TOKEN), 100);
        assert_eq!(c.escrowed(&TOKEN), 0);
        c.verify_supply(&TOKEN).unwrap();
    }

    #[test]
    fn destroy_moves_escrow_to_sink() {
        let (mut c, holder) = funded(100);
        c.escrow(&TOKEN, &holder, 100).unwrap();
        c.destroy(&TOKEN, 100).unwrap();
        assert_eq!(c.escrowed(&TOKEN), 0);
        assert_eq!(c.destroyed(&TOKEN), 100);
        c.verify_supply(&TOKEN).unwrap();
    }

    #[test]
    fn destroy_beyond_escrow_rejected() {
        let (mut c, holder) = funded(100);
        c.escrow(&TOKEN, &holder, 50).unwrap();
        let err = c.destroy(&TOKEN, 51).unwrap_err();
        assert!(matches!(err, BridgeError::InsufficientEscrow { .. }));
        assert_eq!(c.destroyed(&TOKEN), 0);
    }

    #[test]
    fn create_supply_is_conserved() {
        let mut c = InMemoryCustody::new();
        let to = Address::random();
        c.create_supply(&TOKEN, &to, 100).unwrap();
        assert_eq!(c.balance(&to, &TOKEN), 100);
        c.verify_all().unwrap();
    }
}
