pub mod bank;
pub mod db;
pub mod keys;
pub mod ledger;
pub mod mint;
pub mod slashing;
pub mod staking;

pub use bank::{module_address, BankKeeper};
pub use db::{StateDb, Tree};
pub use ledger::Ledger;
pub use mint::MintKeeper;
pub use slashing::SlashingKeeper;
pub use staking::{pool_for, StakingKeeper};

/// Everything a state transition touching all four modules needs.
pub trait Keepers: BankKeeper + StakingKeeper + SlashingKeeper + MintKeeper {}

impl<T: BankKeeper + StakingKeeper + SlashingKeeper + MintKeeper> Keepers for T {}
