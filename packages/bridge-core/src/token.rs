//! Token capability used by the burn and mint transitions
//!
//! The bridge only needs `mint`, `burn`, `transfer` and `balance_of`. The
//! reference [`MintableToken`] keeps balances in memory and restricts minting
//! and burning to a single admin, which deployments hand over to the bridge
//! instance through [`MintableToken::update_admin`].

use alloy::primitives::{Address, U256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::TokenError;
use crate::types::Amount;

/// Fungible token operations the bridge is authorized to perform
pub trait TokenCapability: Send + Sync {
    fn mint(&self, to: Address, amount: Amount) -> Result<(), TokenError>;

    fn burn(&self, from: Address, amount: Amount) -> Result<(), TokenError>;

    fn transfer(&self, from: Address, to: Address, amount: Amount) -> Result<(), TokenError>;

    fn balance_of(&self, holder: &Address) -> Amount;
}

#[derive(Debug, Default)]
struct TokenState {
    admin: Address,
    balances: HashMap<Address, U256>,
    total_supply: U256,
}

/// In-memory admin-gated fungible token
#[derive(Debug)]
pub struct MintableToken {
    name: String,
    symbol: String,
    state: Mutex<TokenState>,
}

impl MintableToken {
    pub fn new(name: impl Into<String>, symbol: impl Into<String>, admin: Address) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            state: Mutex::new(TokenState {
                admin,
                ..Default::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, TokenState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn admin(&self) -> Address {
        self.state().admin
    }

    pub fn total_supply(&self) -> U256 {
        self.state().total_supply
    }

    pub fn balance_of(&self, holder: &Address) -> U256 {
        self.state()
            .balances
            .get(holder)
            .copied()
            .unwrap_or_default()
    }

    /// Hand the admin role to `new_admin`; only the current admin may do this
    pub fn update_admin(&self, caller: Address, new_admin: Address) -> Result<(), TokenError> {
        let mut state = self.state();
        if caller != state.admin {
            return Err(TokenError::NotAdmin { caller });
        }
        tracing::info!(old = %state.admin, new = %new_admin, symbol = %self.symbol, "Token admin updated");
        state.admin = new_admin;
        Ok(())
    }

    pub fn mint_from(&self, caller: Address, to: Address, amount: Amount) -> Result<(), TokenError> {
        let mut state = self.state();
        if caller != state.admin {
            return Err(TokenError::NotAdmin { caller });
        }
        let supply = state
            .total_supply
            .checked_add(amount)
            .ok_or(TokenError::SupplyOverflow)?;
        state.total_supply = supply;
        let balance = state.balances.entry(to).or_default();
        // Bounded by total_supply
        *balance += amount;
        Ok(())
    }

    pub fn burn_from(&self, caller: Address, from: Address, amount: Amount) -> Result<(), TokenError> {
        let mut state = self.state();
        if caller != state.admin {
            return Err(TokenError::NotAdmin { caller });
        }
        let balance = state.balances.get(&from).copied().unwrap_or_default();
        if balance < amount {
            return Err(TokenError::InsufficientBalance {
                holder: from,
                balance,
                requested: amount,
            });
        }
        state.balances.insert(from, balance - amount);
        state.total_supply -= amount;
        Ok(())
    }

    /// Holder-initiated transfer
    pub fn transfer(&self, from: Address, to: Address, amount: Amount) -> Result<(), TokenError> {
        let mut state = self.state();
        let balance = state.balances.get(&from).copied().unwrap_or_default();
        if balance < amount {
            return Err(TokenError::InsufficientBalance {
                holder: from,
                balance,
                requested: amount,
            });
        }
        state.balances.insert(from, balance - amount);
        *state.balances.entry(to).or_default() += amount;
        Ok(())
    }
}

/// A [`MintableToken`] operated by a fixed caller, normally the bridge address
#[derive(Debug, Clone)]
pub struct AuthorizedToken {
    token: Arc<MintableToken>,
    operator: Address,
}

impl AuthorizedToken {
    pub fn new(token: Arc<MintableToken>, operator: Address) -> Self {
        Self { token, operator }
    }

    pub fn token(&self) -> &Arc<MintableToken> {
        &self.token
    }

    pub fn operator(&self) -> Address {
        self.operator
    }
}

impl TokenCapability for AuthorizedToken {
    fn mint(&self, to: Address, amount: Amount) -> Result<(), TokenError> {
        self.token.mint_from(self.operator, to, amount)
    }

    fn burn(&self, from: Address, amount: Amount) -> Result<(), TokenError> {
        self.token.burn_from(self.operator, from, amount)
    }

    fn transfer(&self, from: Address, to: Address, amount: Amount) -> Result<(), TokenError> {
        self.token.transfer(from, to, amount)
    }

    fn balance_of(&self, holder: &Address) -> Amount {
        self.token.balance_of(holder)
    }
}
