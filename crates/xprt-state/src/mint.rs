use xprt_core::coin::Coins;
use xprt_core::constants::MINT_MODULE_NAME;
use xprt_core::error::LedgerError;

use crate::bank::BankKeeper;
use crate::ledger::Ledger;

/// The mint module's view of the bank: new coins always land in the `mint`
/// module account.
pub trait MintKeeper {
    fn mint_coins(&mut self, amount: &Coins) -> Result<(), LedgerError>;
}

impl MintKeeper for Ledger<'_> {
    fn mint_coins(&mut self, amount: &Coins) -> Result<(), LedgerError> {
        BankKeeper::mint_coins(self, MINT_MODULE_NAME, amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::module_address;
    use crate::db::StateDb;
    use xprt_core::coin::Coin;
    use xprt_core::constants::BOND_DENOM;

    #[test]
    fn mint_keeper_credits_mint_module() {
        let dir = std::env::temp_dir().join("xprt_mint_test_credit");
        let _ = std::fs::remove_dir_all(&dir);
        let db = StateDb::open(&dir).unwrap();
        let mut ledger = Ledger::new(&db);

        let coins = Coins::single(Coin::new(250, BOND_DENOM)).unwrap();
        MintKeeper::mint_coins(&mut ledger, &coins).unwrap();

        let mint_addr = module_address(MINT_MODULE_NAME).unwrap();
        assert_eq!(ledger.get_balance(&mint_addr, BOND_DENOM).unwrap().amount, 250);
        assert_eq!(ledger.get_supply(BOND_DENOM).unwrap().amount, 250);
    }
}
