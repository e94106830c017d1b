//! Locked native collateral of one bridge instance
//!
//! `locked` only grows through deposits and only shrinks through
//! `reserve_withdrawal`, which checks and decrements under one lock. Reserved
//! funds are then either paid out (`disburse`) or handed back (`refund`) if a
//! later step of the same transition fails.

use alloy::primitives::{Address, U256};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::error::BridgeError;
use crate::types::Amount;

#[derive(Debug, Default)]
struct LedgerState {
    locked: U256,
    /// Native amounts paid out per recipient
    disbursed: HashMap<Address, U256>,
}

#[derive(Debug, Default)]
pub struct BridgeLedger {
    state: Mutex<LedgerState>,
}

/// Funds taken out of the locked balance but not yet paid out
#[derive(Debug, PartialEq, Eq)]
#[must_use = "reserved funds must be disbursed or refunded"]
pub struct Withdrawal {
    amount: Amount,
}

impl Withdrawal {
    pub fn amount(&self) -> Amount {
        self.amount
    }
}

impl BridgeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, LedgerState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn locked_balance(&self) -> U256 {
        self.state().locked
    }

    /// Total native amount paid out to `recipient`
    pub fn disbursed_to(&self, recipient: &Address) -> U256 {
        self.state()
            .disbursed
            .get(recipient)
            .copied()
            .unwrap_or_default()
    }

    /// Lock `amount` of collateral
    pub fn deposit(&self, amount: Amount) -> Result<U256, BridgeError> {
        let mut state = self.state();
        state.locked = state
            .locked
            .checked_add(amount)
            .ok_or(BridgeError::BalanceOverflow)?;
        Ok(state.locked)
    }

    /// Check and decrement the locked balance in one step.
    pub fn reserve_withdrawal(&self, amount: Amount) -> Result<Withdrawal, BridgeError> {
        let mut state = self.state();
        if amount > state.locked {
            return Err(BridgeError::InsufficientBalance {
                requested: amount,
                available: state.locked,
            });
        }
        state.locked -= amount;
        Ok(Withdrawal { amount })
    }

    /// Pay reserved funds out to `recipient`
    pub fn disburse(&self, withdrawal: Withdrawal, recipient: Address) {
        let mut state = self.state();
        let paid = state.disbursed.entry(recipient).or_default();
        *paid = paid.saturating_add(withdrawal.amount);
    }

    /// Return reserved funds to the locked balance
    pub fn refund(&self, withdrawal: Withdrawal) {
        let mut state = self.state();
        // Cannot overflow: the amount was subtracted from `locked` earlier
        state.locked = state.locked.saturating_add(withdrawal.amount);
    }
}
