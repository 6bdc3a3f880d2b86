//! xprt-genesis
//!
//! Builds a ledger's initial state from a [`GenesisState`] document, writing
//! through a [`Ledger`] and committing once every invariant holds:
//!
//! 1. Liquid balances: credited to accounts, supply grows with them
//! 2. Validators: stored with their signing info (tombstone/jail state)
//! 3. Delegations: tokens placed in the bonded / not-bonded pool, shares
//!    issued to the delegator
//!
//! Afterwards the supply of every denom equals the sum of all balances, and
//! each pool holds exactly the tokens of the validators it backs.

pub mod params;

pub use params::{GenesisBalance, GenesisDelegation, GenesisState, GenesisValidator};

use std::collections::BTreeMap;

use xprt_core::coin::{Coin, Coins};
use xprt_core::constants::{BONDED_POOL_NAME, BOND_DENOM, DOUBLE_SIGN_JAIL_END_TIME, NOT_BONDED_POOL_NAME};
use xprt_core::error::LedgerError;
use xprt_core::slashing::ValidatorSigningInfo;
use xprt_core::staking::Validator;
use xprt_core::types::Balance;
use xprt_state::{module_address, pool_for, BankKeeper, Ledger, SlashingKeeper, StakingKeeper, StateDb};
use tracing::info;

/// Meta keys written at genesis.
pub const META_CHAIN_ID: &str = "chain_id";
pub const META_GENESIS_TIME: &str = "genesis_time";

/// What genesis created.
#[derive(Clone, Debug, PartialEq)]
pub struct GenesisSummary {
    pub accounts: usize,
    pub validators: usize,
    pub delegations: usize,
    pub supply: Coins,
}

/// Apply `genesis` to an empty `StateDb`.
///
/// Genesis may only be applied once: a database holding any entry is
/// rejected with [`LedgerError::GenesisAlreadyApplied`].
pub fn apply_genesis(db: &StateDb, genesis: &GenesisState) -> Result<GenesisSummary, LedgerError> {
    if !db.is_empty() {
        return Err(LedgerError::GenesisAlreadyApplied);
    }
    info!(chain_id = %genesis.chain_id, "applying genesis state");

    let mut ledger = Ledger::new(db);
    ledger.put_meta(META_CHAIN_ID, genesis.chain_id.as_bytes().to_vec());
    ledger.put_meta(META_GENESIS_TIME, genesis.genesis_time.to_be_bytes().to_vec());

    // ── 1. Liquid balances ───────────────────────────────────────────────────
    for balance in &genesis.balances {
        ledger.init_genesis_balance(&balance.address, &balance.coins)?;
    }
    info!(accounts = genesis.balances.len(), "genesis: balances credited");

    // ── 2. Validators + signing info ─────────────────────────────────────────
    for gv in &genesis.validators {
        let mut validator = Validator::new(gv.operator_address.clone(), gv.consensus_address.clone());
        validator.status = gv.status;
        validator.jailed = gv.jailed || gv.tombstoned;
        ledger.set_validator(&validator)?;

        let mut info = ValidatorSigningInfo::new(gv.consensus_address.clone(), 0);
        info.tombstoned = gv.tombstoned;
        info.jailed_until = match (gv.jailed_until, gv.tombstoned) {
            (Some(t), _) => t,
            (None, true) => DOUBLE_SIGN_JAIL_END_TIME,
            (None, false) => 0,
        };
        ledger.set_validator_signing_info(&gv.consensus_address, &info)?;
    }
    info!(validators = genesis.validators.len(), "genesis: validators created");

    // ── 3. Delegations ───────────────────────────────────────────────────────
    for gd in &genesis.delegations {
        let validator = ledger
            .get_validator(&gd.validator_address)?
            .ok_or_else(|| LedgerError::ValidatorNotFound(gd.validator_address.to_string()))?;
        let pool = module_address(pool_for(validator.status))?;
        ledger.init_genesis_balance(&pool, &Coins::single(Coin::new(gd.amount, BOND_DENOM))?)?;
        ledger.delegate(
            &gd.delegator_address,
            gd.amount,
            validator.status,
            &gd.validator_address,
            false,
        )?;
    }
    info!(delegations = genesis.delegations.len(), "genesis: delegations bonded");

    // ── Verify ───────────────────────────────────────────────────────────────
    let supply = verify_genesis_supply(&ledger, genesis)?;
    verify_genesis_pools(&ledger)?;

    ledger.commit()?;
    info!(supply = %supply, "genesis state committed to disk");

    Ok(GenesisSummary {
        accounts: genesis.balances.len(),
        validators: genesis.validators.len(),
        delegations: genesis.delegations.len(),
        supply,
    })
}

/// Supply of every denom must equal the document's balances plus delegations.
fn verify_genesis_supply(ledger: &Ledger<'_>, genesis: &GenesisState) -> Result<Coins, LedgerError> {
    let mut expected: BTreeMap<String, Balance> = BTreeMap::new();
    for balance in &genesis.balances {
        for coin in balance.coins.iter() {
            let entry = expected.entry(coin.denom).or_insert(0);
            *entry = entry
                .checked_add(coin.amount)
                .ok_or(LedgerError::Overflow("genesis supply"))?;
        }
    }
    let delegated = genesis
        .delegations
        .iter()
        .try_fold(0u128, |acc, d| acc.checked_add(d.amount))
        .ok_or(LedgerError::Overflow("genesis delegations"))?;
    if delegated > 0 {
        let entry = expected.entry(BOND_DENOM.to_string()).or_insert(0);
        *entry = entry
            .checked_add(delegated)
            .ok_or(LedgerError::Overflow("genesis supply"))?;
    }

    let mut supply = Vec::with_capacity(expected.len());
    for (denom, expected_amount) in expected {
        let got = ledger.get_supply(&denom)?.amount;
        if got != expected_amount {
            return Err(LedgerError::GenesisSupplyMismatch {
                denom,
                expected: expected_amount,
                got,
            });
        }
        supply.push(Coin::new(got, denom));
    }
    let supply = Coins::from_coins(supply)?;
    info!(supply = %supply, "genesis supply verified");
    Ok(supply)
}

/// Each pool must hold exactly the tokens of the validators it backs.
fn verify_genesis_pools(ledger: &Ledger<'_>) -> Result<(), LedgerError> {
    let mut bonded: Balance = 0;
    let mut not_bonded: Balance = 0;
    for v in ledger.get_all_validators()? {
        let slot = if v.status.is_bonded() { &mut bonded } else { &mut not_bonded };
        *slot = slot
            .checked_add(v.tokens)
            .ok_or(LedgerError::Overflow("pool tokens"))?;
    }
    for (pool, expected) in [(BONDED_POOL_NAME, bonded), (NOT_BONDED_POOL_NAME, not_bonded)] {
        let got = ledger.get_balance(&module_address(pool)?, BOND_DENOM)?.amount;
        if got != expected {
            return Err(LedgerError::GenesisPoolMismatch {
                pool: pool.to_string(),
                expected,
                got,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use xprt_core::staking::BondStatus;
    use xprt_core::types::{AccAddress, ConsAddress, ValAddress};

    fn temp_db(name: &str) -> StateDb {
        let dir = std::env::temp_dir().join(format!("xprt_genesis_test_{}", name));
        let _ = std::fs::remove_dir_all(&dir);
        StateDb::open(&dir).expect("open temp db")
    }

    fn acc(b: u8) -> AccAddress {
        AccAddress::from_bytes(vec![b; 20]).unwrap()
    }

    fn test_genesis() -> GenesisState {
        GenesisState {
            chain_id: "core-1".into(),
            genesis_time: 1_600_000_000,
            balances: vec![
                GenesisBalance {
                    address: acc(1),
                    coins: Coins::single(Coin::new(1_000, BOND_DENOM)).unwrap(),
                },
                GenesisBalance {
                    address: acc(2),
                    coins: Coins::from_coins(vec![Coin::new(5, BOND_DENOM), Coin::new(9, "uatom")]).unwrap(),
                },
            ],
            validators: vec![
                GenesisValidator {
                    operator_address: ValAddress::from_bytes(vec![0xA1; 20]).unwrap(),
                    consensus_address: ConsAddress::from_bytes(vec![0xC1; 20]).unwrap(),
                    status: BondStatus::Bonded,
                    jailed: false,
                    tombstoned: false,
                    jailed_until: None,
                },
                GenesisValidator {
                    operator_address: ValAddress::from_bytes(vec![0xA2; 20]).unwrap(),
                    consensus_address: ConsAddress::from_bytes(vec![0xC2; 20]).unwrap(),
                    status: BondStatus::Unbonding,
                    jailed: true,
                    tombstoned: true,
                    jailed_until: None,
                },
            ],
            delegations: vec![
                GenesisDelegation {
                    delegator_address: acc(1),
                    validator_address: ValAddress::from_bytes(vec![0xA1; 20]).unwrap(),
                    amount: 400,
                },
                GenesisDelegation {
                    delegator_address: acc(3),
                    validator_address: ValAddress::from_bytes(vec![0xA2; 20]).unwrap(),
                    amount: 250,
                },
            ],
        }
    }

    #[test]
    fn genesis_supply_and_pools_are_exact() {
        let db = temp_db("exact");
        let summary = apply_genesis(&db, &test_genesis()).expect("genesis must succeed");

        assert_eq!(summary.supply.amount_of(BOND_DENOM), 1_000 + 5 + 400 + 250);
        assert_eq!(summary.supply.amount_of("uatom"), 9);

        let ledger = Ledger::new(&db);
        let bonded = module_address(BONDED_POOL_NAME).unwrap();
        let not_bonded = module_address(NOT_BONDED_POOL_NAME).unwrap();
        assert_eq!(ledger.get_balance(&bonded, BOND_DENOM).unwrap().amount, 400);
        assert_eq!(ledger.get_balance(&not_bonded, BOND_DENOM).unwrap().amount, 250);

        let d = ledger
            .get_delegation(&acc(3), &ValAddress::from_bytes(vec![0xA2; 20]).unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(d.shares, 250);
    }

    #[test]
    fn tombstoned_validator_gets_double_sign_jail() {
        let db = temp_db("tombstoned");
        apply_genesis(&db, &test_genesis()).unwrap();

        let ledger = Ledger::new(&db);
        let cons = ConsAddress::from_bytes(vec![0xC2; 20]).unwrap();
        let info = ledger.get_validator_signing_info(&cons).unwrap().unwrap();
        assert!(info.tombstoned);
        assert_eq!(info.jailed_until, DOUBLE_SIGN_JAIL_END_TIME);

        let v = ledger
            .get_validator(&ValAddress::from_bytes(vec![0xA2; 20]).unwrap())
            .unwrap()
            .unwrap();
        assert!(v.jailed);
    }

    #[test]
    fn genesis_applies_only_once() {
        let db = temp_db("once");
        apply_genesis(&db, &test_genesis()).unwrap();
        let err = apply_genesis(&db, &test_genesis()).unwrap_err();
        assert!(matches!(err, LedgerError::GenesisAlreadyApplied));
    }

    #[test]
    fn delegation_to_unknown_validator_rejected() {
        let db = temp_db("unknown_validator");
        let mut genesis = test_genesis();
        genesis.delegations[0].validator_address = ValAddress::from_bytes(vec![0xEE; 20]).unwrap();

        let err = apply_genesis(&db, &genesis).unwrap_err();
        assert!(matches!(err, LedgerError::ValidatorNotFound(_)));
        assert!(db.is_empty(), "failed genesis must not leave partial state");
    }

    #[test]
    fn genesis_json_roundtrip() {
        let json = serde_json::to_string(&test_genesis()).unwrap();
        let parsed: GenesisState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.delegations[1].amount, 250);
        assert_eq!(parsed.validators[1].status, BondStatus::Unbonding);
    }
}
