pub mod coin;
pub mod constants;
pub mod context;
pub mod error;
pub mod slashing;
pub mod staking;
pub mod types;

pub use coin::*;
pub use constants::*;
pub use context::BlockContext;
pub use error::LedgerError;
pub use slashing::ValidatorSigningInfo;
pub use staking::*;
pub use types::*;
