use serde::{Deserialize, Serialize};

use xprt_core::coin::{amount_string, Coins};
use xprt_core::staking::BondStatus;
use xprt_core::types::{AccAddress, Balance, ConsAddress, Timestamp, ValAddress};

/// The founding document of a ledger: balances, validators and delegations.
///
/// In production this is exported from the running chain; in tests it is
/// assembled by hand.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenesisState {
    pub chain_id: String,
    /// Genesis time (Unix seconds, UTC).
    pub genesis_time: Timestamp,
    #[serde(default)]
    pub balances: Vec<GenesisBalance>,
    #[serde(default)]
    pub validators: Vec<GenesisValidator>,
    #[serde(default)]
    pub delegations: Vec<GenesisDelegation>,
}

/// Liquid coins held by one account.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenesisBalance {
    pub address: AccAddress,
    pub coins: Coins,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenesisValidator {
    pub operator_address: ValAddress,
    pub consensus_address: ConsAddress,
    pub status: BondStatus,
    #[serde(default)]
    pub jailed: bool,
    /// A tombstoned validator is always jailed; without an explicit
    /// `jailed_until` it gets the double-sign jail end time.
    #[serde(default)]
    pub tombstoned: bool,
    #[serde(default)]
    pub jailed_until: Option<Timestamp>,
}

/// Bond-denom tokens already delegated at genesis; they sit in the pool
/// matching the validator's status.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenesisDelegation {
    pub delegator_address: AccAddress,
    pub validator_address: ValAddress,
    #[serde(with = "amount_string")]
    pub amount: Balance,
}
