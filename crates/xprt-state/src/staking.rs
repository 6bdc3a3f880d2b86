use tracing::debug;

use xprt_core::coin::{Coin, Coins};
use xprt_core::constants::{BOND_DENOM, BONDED_POOL_NAME, NOT_BONDED_POOL_NAME};
use xprt_core::error::LedgerError;
use xprt_core::staking::{BondStatus, Delegation, Validator};
use xprt_core::types::{AccAddress, Balance, ValAddress};

use crate::bank::BankKeeper;
use crate::db::Tree;
use crate::keys;
use crate::ledger::Ledger;

/// Validators, delegations and the bonded / not-bonded token pools.
pub trait StakingKeeper {
    fn get_validator(&self, addr: &ValAddress) -> Result<Option<Validator>, LedgerError>;

    fn set_validator(&mut self, validator: &Validator) -> Result<(), LedgerError>;

    fn get_all_validators(&self) -> Result<Vec<Validator>, LedgerError>;

    fn get_delegation(
        &self,
        delegator: &AccAddress,
        validator: &ValAddress,
    ) -> Result<Option<Delegation>, LedgerError>;

    fn set_delegation(&mut self, delegation: &Delegation) -> Result<(), LedgerError>;

    fn get_validator_delegations(&self, validator: &ValAddress) -> Result<Vec<Delegation>, LedgerError>;

    fn get_delegator_delegations(&self, delegator: &AccAddress) -> Result<Vec<Delegation>, LedgerError>;

    /// Delegate `amount` bond-denom tokens from `delegator` to `validator`.
    ///
    /// With `subtract_account` the tokens are debited from the delegator's
    /// account and `token_src` must not be `Bonded`. Without it the tokens
    /// already sit in the pool matching `token_src` and are only moved if the
    /// validator's status calls for the other pool.
    ///
    /// The validator is re-read from state, so repeated delegations in one
    /// block accumulate. Returns the shares issued.
    fn delegate(
        &mut self,
        delegator: &AccAddress,
        amount: Balance,
        token_src: BondStatus,
        validator: &ValAddress,
        subtract_account: bool,
    ) -> Result<Balance, LedgerError>;
}

/// Pool holding the tokens of validators with status `status`.
pub fn pool_for(status: BondStatus) -> &'static str {
    if status.is_bonded() {
        BONDED_POOL_NAME
    } else {
        NOT_BONDED_POOL_NAME
    }
}

impl StakingKeeper for Ledger<'_> {
    fn get_validator(&self, addr: &ValAddress) -> Result<Option<Validator>, LedgerError> {
        self.get(Tree::Validators, &keys::validator_key(addr))
    }

    fn set_validator(&mut self, validator: &Validator) -> Result<(), LedgerError> {
        self.put(
            Tree::Validators,
            keys::validator_key(&validator.operator_address),
            validator,
        )
    }

    fn get_all_validators(&self) -> Result<Vec<Validator>, LedgerError> {
        Ok(self
            .scan_prefix::<Validator>(Tree::Validators, &[])?
            .into_iter()
            .map(|(_, v)| v)
            .collect())
    }

    fn get_delegation(
        &self,
        delegator: &AccAddress,
        validator: &ValAddress,
    ) -> Result<Option<Delegation>, LedgerError> {
        self.get(Tree::Delegations, &keys::delegation_key(delegator, validator))
    }

    fn set_delegation(&mut self, delegation: &Delegation) -> Result<(), LedgerError> {
        self.put(
            Tree::Delegations,
            keys::delegation_key(&delegation.delegator_address, &delegation.validator_address),
            delegation,
        )
    }

    fn get_validator_delegations(&self, validator: &ValAddress) -> Result<Vec<Delegation>, LedgerError> {
        Ok(self
            .scan_prefix::<Delegation>(Tree::Delegations, &[])?
            .into_iter()
            .map(|(_, d)| d)
            .filter(|d| &d.validator_address == validator)
            .collect())
    }

    fn get_delegator_delegations(&self, delegator: &AccAddress) -> Result<Vec<Delegation>, LedgerError> {
        Ok(self
            .scan_prefix::<Delegation>(Tree::Delegations, &keys::delegations_prefix(delegator))?
            .into_iter()
            .map(|(_, d)| d)
            .collect())
    }

    fn delegate(
        &mut self,
        delegator: &AccAddress,
        amount: Balance,
        token_src: BondStatus,
        validator: &ValAddress,
        subtract_account: bool,
    ) -> Result<Balance, LedgerError> {
        let mut val = self
            .get_validator(validator)?
            .ok_or_else(|| LedgerError::ValidatorNotFound(validator.to_string()))?;
        if val.invalid_ex_rate() {
            return Err(LedgerError::InvalidExchangeRate(validator.to_string()));
        }

        let mut delegation = self
            .get_delegation(delegator, validator)?
            .unwrap_or_else(|| Delegation::new(delegator.clone(), validator.clone()));

        if subtract_account && token_src.is_bonded() {
            return Err(LedgerError::Other(
                "delegation token source cannot be bonded when debiting an account".into(),
            ));
        }
        // zero moves no coins and issues zero shares
        let coins = Coins::single(Coin::new(amount, BOND_DENOM))?;
        if !coins.is_empty() {
            if subtract_account {
                self.delegate_coins_from_account_to_module(delegator, pool_for(val.status), &coins)?;
            } else {
                let (from, to) = (pool_for(token_src), pool_for(val.status));
                if from != to {
                    self.send_coins_from_module_to_module(from, to, &coins)?;
                }
            }
        }

        let issued = val.add_tokens_from_del(amount)?;
        delegation.shares = delegation
            .shares
            .checked_add(issued)
            .ok_or(LedgerError::Overflow("delegation shares"))?;
        self.set_validator(&val)?;
        self.set_delegation(&delegation)?;

        debug!(
            delegator = %delegator,
            validator = %validator,
            amount,
            shares = issued,
            "delegated"
        );
        Ok(issued)
    }
}
