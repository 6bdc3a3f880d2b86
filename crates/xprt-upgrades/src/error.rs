use std::path::PathBuf;

use thiserror::Error;
use xprt_core::error::LedgerError;

/// Why an upgrade handler stopped. Every variant is fatal for the upgrade;
/// the caller must discard the ledger it was running on.
#[derive(Debug, Error)]
pub enum UpgradeError {
    // ── Malformed input ──────────────────────────────────────────────────────
    #[error("validator address is not valid bech32: {address}")]
    InvalidValidatorAddress {
        address: String,
        #[source]
        source: LedgerError,
    },

    #[error("consensus address is not valid bech32: {address}")]
    InvalidConsensusAddress {
        address: String,
        #[source]
        source: LedgerError,
    },

    #[error("invalid lost-token records")]
    InvalidRecords(#[from] serde_json::Error),

    #[error("cannot read {path}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error parsing mint of {amount}uxprt to {address}")]
    InvalidAmount {
        address: String,
        amount: String,
        #[source]
        source: LedgerError,
    },

    #[error("delegator address {address} is not a valid account address")]
    InvalidDelegatorAddress {
        address: String,
        #[source]
        source: LedgerError,
    },

    // ── Missing ledger state ─────────────────────────────────────────────────
    #[error("validator {0} has no signing info")]
    MissingSigningInfo(String),

    #[error("cannot untombstone validator {0}: it is not tombstoned")]
    NotTombstoned(String),

    #[error("validator {0} not found")]
    ValidatorNotFound(String),

    // ── Ledger operation failures ────────────────────────────────────────────
    #[error("error minting {amount}uxprt for {address}")]
    Mint {
        address: String,
        amount: String,
        #[source]
        source: LedgerError,
    },

    #[error("error sending minted {amount}uxprt to {address}")]
    Send {
        address: String,
        amount: String,
        #[source]
        source: LedgerError,
    },

    #[error("error delegating minted {amount}uxprt from {address} to {validator}")]
    Delegate {
        address: String,
        amount: String,
        validator: String,
        #[source]
        source: LedgerError,
    },

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
