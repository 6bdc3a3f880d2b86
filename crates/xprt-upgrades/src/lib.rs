//! xprt-upgrades
//!
//! Named state migrations run once at a fixed height. Each upgrade works on a
//! [`Ledger`] it does not own: it stages writes and returns, and the caller
//! commits the ledger only if the upgrade returned `Ok`.

pub mod error;
pub mod lost_tokens;
pub mod tombstone;
pub mod v5_1_0;

pub use error::UpgradeError;
pub use lost_tokens::{load_records, mint_lost_tokens, parse_records, LostTokenRecord};
pub use tombstone::revert_tombstone;
pub use v5_1_0::{CosPatchParams, UpgradeSummary};

use xprt_core::context::BlockContext;
use xprt_state::Ledger;

/// Entry point of a registered upgrade.
pub type UpgradeHandler = fn(
    &BlockContext,
    &mut Ledger<'_>,
    &CosPatchParams,
    &[LostTokenRecord],
) -> Result<UpgradeSummary, UpgradeError>;

fn v5_1_0_handler(
    ctx: &BlockContext,
    ledger: &mut Ledger<'_>,
    params: &CosPatchParams,
    records: &[LostTokenRecord],
) -> Result<UpgradeSummary, UpgradeError> {
    v5_1_0::apply_upgrade(ctx, ledger, params, records)
}

const UPGRADES: &[(&str, UpgradeHandler)] = &[(v5_1_0::UPGRADE_NAME, v5_1_0_handler)];

/// Handler registered under `name`, if any.
pub fn lookup(name: &str) -> Option<UpgradeHandler> {
    UPGRADES
        .iter()
        .find(|(registered, _)| *registered == name)
        .map(|(_, handler)| *handler)
}

/// Names of all registered upgrades.
pub fn known_upgrades() -> impl Iterator<Item = &'static str> {
    UPGRADES.iter().map(|(name, _)| *name)
}
