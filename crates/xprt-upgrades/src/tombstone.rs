use tracing::info;

use xprt_core::context::BlockContext;
use xprt_core::types::ConsAddress;
use xprt_state::SlashingKeeper;

use crate::error::UpgradeError;

/// Clear the tombstone on `consensus_address` and jail it until the current
/// block time, so the operator has to unjail manually.
///
/// Fails without touching state if the validator has no signing info or is
/// not tombstoned.
pub fn revert_tombstone<S>(
    ctx: &BlockContext,
    slashing: &mut S,
    consensus_address: &ConsAddress,
) -> Result<(), UpgradeError>
where
    S: SlashingKeeper + ?Sized,
{
    let mut info = slashing
        .get_validator_signing_info(consensus_address)?
        .ok_or_else(|| UpgradeError::MissingSigningInfo(consensus_address.to_string()))?;
    if !info.tombstoned {
        return Err(UpgradeError::NotTombstoned(consensus_address.to_string()));
    }

    info.tombstoned = false;
    slashing.set_validator_signing_info(consensus_address, &info)?;
    slashing.jail_until(consensus_address, ctx.time)?;

    info!(
        validator = %consensus_address,
        jailed_until = %ctx.time_rfc3339(),
        "tombstone reverted"
    );
    Ok(())
}
