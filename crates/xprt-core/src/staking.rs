use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::types::{AccAddress, Balance, ConsAddress, Height, Timestamp, ValAddress};

// ── BondStatus ───────────────────────────────────────────────────────────────

/// Bonding status of a validator, or the source pool of delegated tokens.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum BondStatus {
    /// Not in the active set and not waiting out an unbonding period.
    Unbonded,
    /// Left the active set; tokens are still slashable until unbonding ends.
    Unbonding,
    /// In the active set; tokens contribute to voting power.
    Bonded,
}

impl BondStatus {
    pub fn is_bonded(&self) -> bool {
        matches!(self, BondStatus::Bonded)
    }
}

// ── Validator ────────────────────────────────────────────────────────────────

/// A validator as stored by the staking module.
///
/// Shares are whole units. With no slashing history the exchange rate is
/// 1 share : 1 token; after a slash `tokens < delegator_shares` and new
/// delegations receive proportionally more shares.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Validator {
    pub operator_address: ValAddress,
    pub consensus_address: ConsAddress,
    /// Bonded tokens backing all delegations (uxprt).
    pub tokens: Balance,
    /// Total shares issued to delegators.
    pub delegator_shares: Balance,
    pub status: BondStatus,
    pub jailed: bool,
    #[serde(default)]
    pub unbonding_height: Height,
    #[serde(default)]
    pub unbonding_time: Timestamp,
}

impl Validator {
    pub fn new(operator_address: ValAddress, consensus_address: ConsAddress) -> Self {
        Self {
            operator_address,
            consensus_address,
            tokens: 0,
            delegator_shares: 0,
            status: BondStatus::Unbonded,
            jailed: false,
            unbonding_height: 0,
            unbonding_time: 0,
        }
    }

    /// A validator that has lost all tokens but still has shares outstanding
    /// cannot price new shares.
    pub fn invalid_ex_rate(&self) -> bool {
        self.tokens == 0 && self.delegator_shares > 0
    }

    /// Shares issued for `amount` tokens at the current exchange rate.
    pub fn shares_from_tokens(&self, amount: Balance) -> Result<Balance, LedgerError> {
        if self.delegator_shares == 0 {
            return Ok(amount);
        }
        if self.tokens == 0 {
            return Err(LedgerError::InvalidExchangeRate(self.operator_address.to_string()));
        }
        amount
            .checked_mul(self.delegator_shares)
            .map(|v| v / self.tokens)
            .ok_or(LedgerError::Overflow("share issuance"))
    }

    /// Tokens currently represented by `shares`.
    pub fn tokens_from_shares(&self, shares: Balance) -> Balance {
        if self.delegator_shares == 0 {
            return 0;
        }
        shares
            .checked_mul(self.tokens)
            .map(|v| v / self.delegator_shares)
            .unwrap_or(Balance::MAX)
    }

    /// Add tokens from a delegation; returns the shares issued for them.
    pub fn add_tokens_from_del(&mut self, amount: Balance) -> Result<Balance, LedgerError> {
        let issued = self.shares_from_tokens(amount)?;
        self.tokens = self
            .tokens
            .checked_add(amount)
            .ok_or(LedgerError::Overflow("validator tokens"))?;
        self.delegator_shares = self
            .delegator_shares
            .checked_add(issued)
            .ok_or(LedgerError::Overflow("validator shares"))?;
        Ok(issued)
    }
}

// ── Delegation ───────────────────────────────────────────────────────────────

/// Shares a delegator holds in one validator.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Delegation {
    pub delegator_address: AccAddress,
    pub validator_address: ValAddress,
    pub shares: Balance,
}

impl Delegation {
    pub fn new(delegator_address: AccAddress, validator_address: ValAddress) -> Self {
        Self {
            delegator_address,
            validator_address,
            shares: 0,
        }
    }
}
