//! # Payment Token
//!
//! The fungible balance ledger registrations are paid in. The controller
//! only sees it through [`PaymentLedger`]: balances, allowances, `transfer`
//! and allowance-gated `transfer_from`.
//!
//! An allowance of `u128::MAX` is treated as unlimited and never decremented.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use fns_protocol::Address;

use crate::context::CallContext;
use crate::events::Event;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("insufficient balance: have {balance}, need {amount}")]
    InsufficientBalance { balance: u128, amount: u128 },

    #[error("insufficient allowance: approved {allowance}, need {amount}")]
    InsufficientAllowance { allowance: u128, amount: u128 },

    #[error("token supply overflow")]
    Overflow,
}

pub trait PaymentLedger {
    fn address(&self) -> Address;
    fn balance_of(&self, who: &Address) -> u128;
    fn allowance(&self, owner: &Address, spender: &Address) -> u128;
    fn transfer(
        &mut self,
        ctx: &mut CallContext<'_>,
        to: Address,
        amount: u128,
    ) -> Result<(), TokenError>;
    fn transfer_from(
        &mut self,
        ctx: &mut CallContext<'_>,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), TokenError>;
    fn approve(&mut self, ctx: &mut CallContext<'_>, spender: Address, amount: u128);
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentToken {
    address: Address,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    total_supply: u128,
    balances: HashMap<Address, u128>,
    allowances: HashMap<Address, HashMap<Address, u128>>,
}

impl PaymentToken {
    pub fn new(name: &str, symbol: &str, decimals: u8) -> Self {
        Self {
            address: Address::derive("payment-token"),
            name: name.to_string(),
            symbol: symbol.to_string(),
            decimals,
            total_supply: 0,
            balances: HashMap::new(),
            allowances: HashMap::new(),
        }
    }

    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    /// Creates `amount` for `to`. Used for genesis balances.
    pub fn mint(
        &mut self,
        ctx: &mut CallContext<'_>,
        to: Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        let supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        let balance = self
            .balance_of(&to)
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        self.total_supply = supply;
        self.balances.insert(to, balance);
        ctx.emit(Event::TokenTransfer {
            from: Address::ZERO,
            to,
            amount,
        });
        Ok(())
    }

    fn move_balance(
        &mut self,
        ctx: &mut CallContext<'_>,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        let balance = self.balance_of(&from);
        if balance < amount {
            return Err(TokenError::InsufficientBalance { balance, amount });
        }
        if from != to {
            let credited = self
                .balance_of(&to)
                .checked_add(amount)
                .ok_or(TokenError::Overflow)?;
            self.balances.insert(from, balance - amount);
            self.balances.insert(to, credited);
        }
        ctx.emit(Event::TokenTransfer { from, to, amount });
        Ok(())
    }
}

impl PaymentLedger for PaymentToken {
    fn address(&self) -> Address {
        self.address
    }

    fn balance_of(&self, who: &Address) -> u128 {
        self.balances.get(who).copied().unwrap_or(0)
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> u128 {
        self.allowances
            .get(owner)
            .and_then(|m| m.get(spender))
            .copied()
            .unwrap_or(0)
    }

    fn transfer(
        &mut self,
        ctx: &mut CallContext<'_>,
        to: Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        let from = ctx.caller;
        self.move_balance(ctx, from, to, amount)
    }

    fn transfer_from(
        &mut self,
        ctx: &mut CallContext<'_>,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        let spender = ctx.caller;
        let allowance = self.allowance(&from, &spender);
        if spender != from && allowance < amount {
            return Err(TokenError::InsufficientAllowance { allowance, amount });
        }
        self.move_balance(ctx, from, to, amount)?;
        if spender != from && allowance != u128::MAX {
            self.allowances
                .entry(from)
                .or_default()
                .insert(spender, allowance - amount);
        }
        Ok(())
    }

    fn approve(&mut self, ctx: &mut CallContext<'_>, spender: Address, amount: u128) {
        let owner = ctx.caller;
        self.allowances
            .entry(owner)
            .or_default()
            .insert(spender, amount);
        ctx.emit(Event::TokenApproval {
            owner,
            spender,
            amount,
        });
    }
}
