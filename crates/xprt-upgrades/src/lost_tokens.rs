use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use xprt_core::coin::{parse_amount, Coin, Coins};
use xprt_core::constants::{BOND_DENOM, MINT_MODULE_NAME};
use xprt_core::context::BlockContext;
use xprt_core::error::LedgerError;
use xprt_core::staking::BondStatus;
use xprt_core::types::{AccAddress, Balance, ValAddress};
use xprt_state::{BankKeeper, MintKeeper, StakingKeeper};

use crate::error::UpgradeError;

/// Tokens a delegator lost and is owed, in base units of the bond denom.
///
/// Both fields stay raw strings until the record is processed; a malformed
/// record fails the upgrade when it is reached, not when the list is loaded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LostTokenRecord {
    pub address: String,
    pub amount: String,
}

impl LostTokenRecord {
    pub fn new(address: impl Into<String>, amount: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            amount: amount.into(),
        }
    }
}

/// Parse a JSON array of `{"address": …, "amount": …}` objects.
pub fn parse_records(json: &str) -> Result<Vec<LostTokenRecord>, UpgradeError> {
    Ok(serde_json::from_str(json)?)
}

pub fn load_records(path: &Path) -> Result<Vec<LostTokenRecord>, UpgradeError> {
    let json = std::fs::read_to_string(path).map_err(|source| UpgradeError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    parse_records(&json)
}

/// Mint each record's amount, hand it to the delegator and delegate it all
/// to `validator_address` from the unbonded pool.
///
/// Records are processed in order. A failure stops processing; whatever
/// earlier records changed stays staged, so the caller decides whether to
/// commit. Running this twice mints twice. Returns the total minted.
pub fn mint_lost_tokens<K>(
    ctx: &BlockContext,
    keepers: &mut K,
    validator_address: &ValAddress,
    records: &[LostTokenRecord],
) -> Result<Balance, UpgradeError>
where
    K: BankKeeper + StakingKeeper + MintKeeper + ?Sized,
{
    if keepers.get_validator(validator_address)?.is_none() {
        return Err(UpgradeError::ValidatorNotFound(validator_address.to_string()));
    }

    let mut total: Balance = 0;
    for record in records {
        let amount = parse_amount(&record.amount).map_err(|source| UpgradeError::InvalidAmount {
            address: record.address.clone(),
            amount: record.amount.clone(),
            source,
        })?;

        let mint_err = |source| UpgradeError::Mint {
            address: record.address.clone(),
            amount: record.amount.clone(),
            source,
        };
        let coins = Coins::single(Coin::new(amount, BOND_DENOM)).map_err(mint_err)?;
        MintKeeper::mint_coins(keepers, &coins).map_err(mint_err)?;

        let delegator = AccAddress::from_bech32(&record.address).map_err(|source| {
            UpgradeError::InvalidDelegatorAddress {
                address: record.address.clone(),
                source,
            }
        })?;

        debug!(
            chain_id = %ctx.chain_id,
            delegator = %delegator,
            module = MINT_MODULE_NAME,
            coins = %coins,
            "sending minted coins"
        );
        keepers
            .send_coins_from_module_to_account(MINT_MODULE_NAME, &delegator, &coins)
            .map_err(|source| UpgradeError::Send {
                address: record.address.clone(),
                amount: record.amount.clone(),
                source,
            })?;

        let shares = keepers
            .delegate(&delegator, amount, BondStatus::Unbonded, validator_address, true)
            .map_err(|source| UpgradeError::Delegate {
                address: record.address.clone(),
                amount: record.amount.clone(),
                validator: validator_address.to_string(),
                source,
            })?;
        debug!(delegator = %delegator, amount, shares, "lost tokens restored");

        total = total
            .checked_add(amount)
            .ok_or(LedgerError::Overflow("restored total"))?;
    }

    info!(
        validator = %validator_address,
        records = records.len(),
        minted = total,
        "lost tokens minted and delegated"
    );
    Ok(total)
}
