use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    // ── Address errors ───────────────────────────────────────────────────────
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid bech32 prefix: expected {expected}, got {got}")]
    InvalidAddressPrefix { expected: String, got: String },

    // ── Bank errors ──────────────────────────────────────────────────────────
    #[error("insufficient funds: {address} has {have}{denom}, need {need}{denom}")]
    InsufficientFunds {
        address: String,
        denom: String,
        need: u128,
        have: u128,
    },

    #[error("invalid coins: {0}")]
    InvalidCoins(String),

    #[error("{0} is a module account and cannot receive funds")]
    BlockedRecipient(String),

    #[error("arithmetic overflow: {0}")]
    Overflow(&'static str),

    #[error("module account {0} does not exist")]
    ModuleAccountMissing(String),

    #[error("module account {module} does not have permission to {action}")]
    MissingPermission { module: String, action: &'static str },

    // ── Staking errors ───────────────────────────────────────────────────────
    #[error("validator does not exist: {0}")]
    ValidatorNotFound(String),

    #[error("validator {0} has no tokens but outstanding shares; delegation exchange rate invalid")]
    InvalidExchangeRate(String),

    // ── Slashing errors ──────────────────────────────────────────────────────
    #[error("no signing info found for {0}")]
    SigningInfoNotFound(String),

    // ── Serialization / storage ──────────────────────────────────────────────
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage error: {0}")]
    Storage(String),

    // ── Genesis ──────────────────────────────────────────────────────────────
    #[error("genesis already applied to this database")]
    GenesisAlreadyApplied,

    #[error("genesis supply mismatch for {denom}: expected {expected}, got {got}")]
    GenesisSupplyMismatch {
        denom: String,
        expected: u128,
        got: u128,
    },

    #[error("genesis pool mismatch for {pool}: expected {expected}, got {got}")]
    GenesisPoolMismatch {
        pool: String,
        expected: u128,
        got: u128,
    },

    #[error("{0}")]
    Other(String),
}
