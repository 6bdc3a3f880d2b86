//! ─── Persistence ledger constants ───────────────────────────────────────────
//!
//! Base unit:    uxprt  (1 XPRT = 1,000,000 uxprt)
//! Ticker:       XPRT

// ── Denomination ─────────────────────────────────────────────────────────────

/// Staking and minting denomination.
pub const BOND_DENOM: &str = "uxprt";

// ── Bech32 prefixes ──────────────────────────────────────────────────────────

pub const ACCOUNT_ADDRESS_PREFIX: &str = "persistence";
pub const VALIDATOR_ADDRESS_PREFIX: &str = "persistencevaloper";
pub const CONSENSUS_ADDRESS_PREFIX: &str = "persistencevalcons";

// ── Module accounts ──────────────────────────────────────────────────────────

/// The mint module: source of all newly created coins.
pub const MINT_MODULE_NAME: &str = "mint";

/// Holds tokens delegated to bonded validators.
pub const BONDED_POOL_NAME: &str = "bonded_tokens_pool";

/// Holds tokens delegated to unbonding/unbonded validators.
pub const NOT_BONDED_POOL_NAME: &str = "not_bonded_tokens_pool";

/// Permissions a module account can hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModulePermission {
    Minter,
    Staking,
}

/// Registered module accounts and their permissions.
pub const MODULE_ACCOUNT_PERMISSIONS: &[(&str, &[ModulePermission])] = &[
    (MINT_MODULE_NAME, &[ModulePermission::Minter]),
    (BONDED_POOL_NAME, &[ModulePermission::Staking]),
    (NOT_BONDED_POOL_NAME, &[ModulePermission::Staking]),
];

/// Returns the permissions of a registered module, or `None` if unknown.
pub fn module_permissions(name: &str) -> Option<&'static [ModulePermission]> {
    MODULE_ACCOUNT_PERMISSIONS
        .iter()
        .find(|(module, _)| *module == name)
        .map(|(_, perms)| *perms)
}

// ── Slashing ─────────────────────────────────────────────────────────────────

/// Jail end time assigned on double-sign evidence: 9999-12-31 23:59:59 UTC.
pub const DOUBLE_SIGN_JAIL_END_TIME: i64 = 253_402_300_799;

