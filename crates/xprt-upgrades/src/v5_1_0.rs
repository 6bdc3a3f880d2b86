//! v5.1.0: un-tombstone the COS validator and restore its delegators' lost
//! tokens.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use xprt_core::context::BlockContext;
use xprt_core::types::{Balance, ConsAddress, ValAddress};
use xprt_state::Keepers;

use crate::error::UpgradeError;
use crate::lost_tokens::{mint_lost_tokens, LostTokenRecord};
use crate::tombstone::revert_tombstone;

pub const UPGRADE_NAME: &str = "v5.1.0";

const COS_VALIDATOR_ADDRESS: &str = "persistencevaloper1chn6uy6h4zeh5mktapw4cy77getes7fp9hp5pw";
const COS_CONSENSUS_ADDRESS: &str = "persistencevalcons1a6ga9tuh38nxm56ut0we3t8a8n22cdpdkhh5c8";

/// The validator the patch applies to. Addresses stay bech32 strings so a
/// bad value surfaces as an upgrade error, not a config parse error.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CosPatchParams {
    pub validator_address: String,
    pub consensus_address: String,
}

impl CosPatchParams {
    /// The COS validator on Persistence mainnet.
    pub fn mainnet() -> Self {
        Self {
            validator_address: COS_VALIDATOR_ADDRESS.to_string(),
            consensus_address: COS_CONSENSUS_ADDRESS.to_string(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, UpgradeError> {
        let json = std::fs::read_to_string(path).map_err(|source| UpgradeError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&json)?)
    }
}

impl Default for CosPatchParams {
    fn default() -> Self {
        Self::mainnet()
    }
}

/// Outcome of a successful run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UpgradeSummary {
    pub name: &'static str,
    pub height: u64,
    pub records: usize,
    pub minted: Balance,
}

/// Revert the tombstone, then mint and delegate the lost tokens.
///
/// On error the keepers may hold partial writes; they must not be committed.
pub fn apply_upgrade<K>(
    ctx: &BlockContext,
    keepers: &mut K,
    params: &CosPatchParams,
    records: &[LostTokenRecord],
) -> Result<UpgradeSummary, UpgradeError>
where
    K: Keepers + ?Sized,
{
    let validator = ValAddress::from_bech32(&params.validator_address).map_err(|source| {
        UpgradeError::InvalidValidatorAddress {
            address: params.validator_address.clone(),
            source,
        }
    })?;
    let consensus = ConsAddress::from_bech32(&params.consensus_address).map_err(|source| {
        UpgradeError::InvalidConsensusAddress {
            address: params.consensus_address.clone(),
            source,
        }
    })?;

    info!(
        upgrade = UPGRADE_NAME,
        chain_id = %ctx.chain_id,
        height = ctx.height,
        time = %ctx.time_rfc3339(),
        validator = %validator,
        records = records.len(),
        "running upgrade"
    );

    revert_tombstone(ctx, keepers, &consensus)?;
    let minted = mint_lost_tokens(ctx, keepers, &validator, records)?;

    info!(upgrade = UPGRADE_NAME, minted, "upgrade complete");
    Ok(UpgradeSummary {
        name: UPGRADE_NAME,
        height: ctx.height,
        records: records.len(),
        minted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use xprt_core::constants::BOND_DENOM;
    use xprt_core::slashing::ValidatorSigningInfo;
    use xprt_core::staking::Validator;
    use xprt_core::types::AccAddress;
    use xprt_state::{BankKeeper, Ledger, SlashingKeeper, StakingKeeper, StateDb};

    fn temp_db(name: &str) -> StateDb {
        let dir = std::env::temp_dir().join(format!("xprt_v5_1_0_test_{}", name));
        let _ = std::fs::remove_dir_all(&dir);
        StateDb::open(&dir).expect("open temp db")
    }

    fn ctx() -> BlockContext {
        BlockContext::new("core-1", 11_000_000, 1_680_000_000)
    }

    /// A committed ledger holding a jailed, tombstoned COS validator.
    fn seed_cos(db: &StateDb) -> CosPatchParams {
        let params = CosPatchParams::mainnet();
        let valoper = ValAddress::from_bech32(&params.validator_address).unwrap();
        let valcons = ConsAddress::from_bech32(&params.consensus_address).unwrap();

        let mut ledger = Ledger::new(db);
        let mut v = Validator::new(valoper, valcons.clone());
        v.jailed = true;
        ledger.set_validator(&v).unwrap();
        ledger
            .set_validator_signing_info(&valcons, &ValidatorSigningInfo::new(valcons.clone(), 1))
            .unwrap();
        ledger.tombstone(&valcons).unwrap();
        ledger.commit().unwrap();
        params
    }

    #[test]
    fn upgrade_untombstones_and_restores_delegation() {
        let db = temp_db("end_to_end");
        let params = seed_cos(&db);
        let delegator = AccAddress::from_bytes(vec![7u8; 20]).unwrap();
        let records = vec![LostTokenRecord::new(delegator.to_bech32(), "1000000")];

        let mut ledger = Ledger::new(&db);
        let summary = apply_upgrade(&ctx(), &mut ledger, &params, &records).unwrap();
        assert_eq!(summary.minted, 1_000_000);
        assert_eq!(summary.records, 1);
        ledger.commit().unwrap();

        let ledger = Ledger::new(&db);
        let valoper = ValAddress::from_bech32(&params.validator_address).unwrap();
        let valcons = ConsAddress::from_bech32(&params.consensus_address).unwrap();
        let info = ledger.get_validator_signing_info(&valcons).unwrap().unwrap();
        assert!(!info.tombstoned);
        assert_eq!(info.jailed_until, ctx().time);
        assert_eq!(
            ledger.get_delegation(&delegator, &valoper).unwrap().unwrap().shares,
            1_000_000
        );
        assert_eq!(ledger.get_supply(BOND_DENOM).unwrap().amount, 1_000_000);
        assert!(ledger.get_validator(&valoper).unwrap().unwrap().jailed);
    }

    #[test]
    fn rerun_fails_at_tombstone_check() {
        let db = temp_db("rerun");
        let params = seed_cos(&db);
        let records = vec![LostTokenRecord::new(
            AccAddress::from_bytes(vec![7u8; 20]).unwrap().to_bech32(),
            "5",
        )];

        let mut ledger = Ledger::new(&db);
        apply_upgrade(&ctx(), &mut ledger, &params, &records).unwrap();
        ledger.commit().unwrap();

        let mut ledger = Ledger::new(&db);
        let err = apply_upgrade(&ctx(), &mut ledger, &params, &records).unwrap_err();
        assert!(matches!(err, UpgradeError::NotTombstoned(_)));
        assert_eq!(ledger.get_supply(BOND_DENOM).unwrap().amount, 5);
    }

    #[test]
    fn failed_upgrade_leaves_db_untouched() {
        let db = temp_db("rollback");
        let params = seed_cos(&db);
        let good = AccAddress::from_bytes(vec![7u8; 20]).unwrap();
        let records = vec![
            LostTokenRecord::new(good.to_bech32(), "10"),
            LostTokenRecord::new(good.to_bech32(), "ten"),
        ];

        {
            let mut ledger = Ledger::new(&db);
            let err = apply_upgrade(&ctx(), &mut ledger, &params, &records).unwrap_err();
            assert!(matches!(err, UpgradeError::InvalidAmount { .. }));
        }

        let ledger = Ledger::new(&db);
        let valcons = ConsAddress::from_bech32(&params.consensus_address).unwrap();
        assert!(ledger.is_tombstoned(&valcons).unwrap());
        assert_eq!(ledger.get_supply(BOND_DENOM).unwrap().amount, 0);
    }

    #[test]
    fn bad_params_are_rejected() {
        let db = temp_db("bad_params");
        let mut ledger = Ledger::new(&db);

        let mut params = CosPatchParams::mainnet();
        params.validator_address = "persistencevaloper1bogus".into();
        let err = apply_upgrade(&ctx(), &mut ledger, &params, &[]).unwrap_err();
        assert!(matches!(err, UpgradeError::InvalidValidatorAddress { .. }));

        let mut params = CosPatchParams::mainnet();
        params.consensus_address = params.validator_address.clone();
        let err = apply_upgrade(&ctx(), &mut ledger, &params, &[]).unwrap_err();
        assert!(matches!(err, UpgradeError::InvalidConsensusAddress { .. }));
        assert_eq!(ledger.pending_writes(), 0);
    }

    #[test]
    fn params_json_defaults_to_mainnet() {
        let json = serde_json::to_string(&CosPatchParams::default()).unwrap();
        assert!(json.contains(COS_VALIDATOR_ADDRESS));
        let parsed: CosPatchParams = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, CosPatchParams::mainnet());
    }
}
