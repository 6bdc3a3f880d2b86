use tracing::debug;

use xprt_core::constants::DOUBLE_SIGN_JAIL_END_TIME;
use xprt_core::error::LedgerError;
use xprt_core::slashing::ValidatorSigningInfo;
use xprt_core::types::{ConsAddress, Timestamp};

use crate::db::Tree;
use crate::keys;
use crate::ledger::Ledger;

/// Signing-info records: liveness, jail time and the tombstone flag.
pub trait SlashingKeeper {
    fn get_validator_signing_info(
        &self,
        addr: &ConsAddress,
    ) -> Result<Option<ValidatorSigningInfo>, LedgerError>;

    fn set_validator_signing_info(
        &mut self,
        addr: &ConsAddress,
        info: &ValidatorSigningInfo,
    ) -> Result<(), LedgerError>;

    /// Set the time before which the validator may not unjail itself.
    fn jail_until(&mut self, addr: &ConsAddress, until: Timestamp) -> Result<(), LedgerError>;

    fn is_tombstoned(&self, addr: &ConsAddress) -> Result<bool, LedgerError>;

    /// Permanently bar the validator from signing (double-sign evidence).
    fn tombstone(&mut self, addr: &ConsAddress) -> Result<(), LedgerError>;
}

impl Ledger<'_> {
    fn require_signing_info(&self, addr: &ConsAddress) -> Result<ValidatorSigningInfo, LedgerError> {
        self.get_validator_signing_info(addr)?
            .ok_or_else(|| LedgerError::SigningInfoNotFound(addr.to_string()))
    }
}

impl SlashingKeeper for Ledger<'_> {
    fn get_validator_signing_info(
        &self,
        addr: &ConsAddress,
    ) -> Result<Option<ValidatorSigningInfo>, LedgerError> {
        self.get(Tree::SigningInfos, &keys::signing_info_key(addr))
    }

    fn set_validator_signing_info(
        &mut self,
        addr: &ConsAddress,
        info: &ValidatorSigningInfo,
    ) -> Result<(), LedgerError> {
        self.put(Tree::SigningInfos, keys::signing_info_key(addr), info)
    }

    fn jail_until(&mut self, addr: &ConsAddress, until: Timestamp) -> Result<(), LedgerError> {
        let mut info = self.require_signing_info(addr)?;
        info.jailed_until = until;
        self.set_validator_signing_info(addr, &info)?;
        debug!(validator = %addr, jailed_until = until, "jail time set");
        Ok(())
    }

    fn is_tombstoned(&self, addr: &ConsAddress) -> Result<bool, LedgerError> {
        Ok(self
            .get_validator_signing_info(addr)?
            .map(|info| info.tombstoned)
            .unwrap_or(false))
    }

    fn tombstone(&mut self, addr: &ConsAddress) -> Result<(), LedgerError> {
        let mut info = self.require_signing_info(addr)?;
        if info.tombstoned {
            return Err(LedgerError::Other(format!("validator {addr} is already tombstoned")));
        }
        info.tombstoned = true;
        info.jailed_until = DOUBLE_SIGN_JAIL_END_TIME;
        self.set_validator_signing_info(addr, &info)?;
        debug!(validator = %addr, "validator tombstoned");
        Ok(())
    }
}
