use tracing::debug;

use xprt_core::coin::{Coin, Coins};
use xprt_core::constants::{module_permissions, ModulePermission, MODULE_ACCOUNT_PERMISSIONS};
use xprt_core::error::LedgerError;
use xprt_core::types::{AccAddress, Balance};

use crate::db::Tree;
use crate::keys;
use crate::ledger::Ledger;

/// Balances, supply and module-account transfers.
pub trait BankKeeper {
    fn get_balance(&self, addr: &AccAddress, denom: &str) -> Result<Coin, LedgerError>;

    fn get_all_balances(&self, addr: &AccAddress) -> Result<Coins, LedgerError>;

    fn get_supply(&self, denom: &str) -> Result<Coin, LedgerError>;

    fn send_coins(
        &mut self,
        from: &AccAddress,
        to: &AccAddress,
        amount: &Coins,
    ) -> Result<(), LedgerError>;

    /// Create `amount` in module account `module`. The module must hold the
    /// minter permission. Total supply grows by `amount`.
    fn mint_coins(&mut self, module: &str, amount: &Coins) -> Result<(), LedgerError>;

    /// Pay `amount` out of module account `module`. Module accounts are not
    /// valid recipients.
    fn send_coins_from_module_to_account(
        &mut self,
        module: &str,
        to: &AccAddress,
        amount: &Coins,
    ) -> Result<(), LedgerError>;

    fn send_coins_from_module_to_module(
        &mut self,
        from_module: &str,
        to_module: &str,
        amount: &Coins,
    ) -> Result<(), LedgerError>;

    /// Move delegated coins from a user account into a staking pool. The
    /// receiving module must hold the staking permission.
    fn delegate_coins_from_account_to_module(
        &mut self,
        from: &AccAddress,
        module: &str,
        amount: &Coins,
    ) -> Result<(), LedgerError>;
}

/// Address of a registered module account.
pub fn module_address(module: &str) -> Result<AccAddress, LedgerError> {
    module_permissions(module)
        .map(|_| AccAddress::for_module(module))
        .ok_or_else(|| LedgerError::ModuleAccountMissing(module.to_string()))
}

/// True when `addr` belongs to a registered module account.
fn is_module_address(addr: &AccAddress) -> bool {
    MODULE_ACCOUNT_PERMISSIONS
        .iter()
        .any(|(name, _)| AccAddress::for_module(name) == *addr)
}

fn require_permission(
    module: &str,
    permission: ModulePermission,
    action: &'static str,
) -> Result<(), LedgerError> {
    let perms = module_permissions(module)
        .ok_or_else(|| LedgerError::ModuleAccountMissing(module.to_string()))?;
    if perms.contains(&permission) {
        Ok(())
    } else {
        Err(LedgerError::MissingPermission {
            module: module.to_string(),
            action,
        })
    }
}

impl Ledger<'_> {
    fn balance_of(&self, addr: &AccAddress, denom: &str) -> Result<Balance, LedgerError> {
        Ok(self
            .get::<Balance>(Tree::Balances, &keys::balance_key(addr, denom))?
            .unwrap_or(0))
    }

    fn set_balance(&mut self, addr: &AccAddress, denom: &str, amount: Balance) -> Result<(), LedgerError> {
        let key = keys::balance_key(addr, denom);
        if amount == 0 {
            self.delete(Tree::Balances, key);
            Ok(())
        } else {
            self.put(Tree::Balances, key, &amount)
        }
    }

    pub(crate) fn add_coins(&mut self, addr: &AccAddress, amount: &Coins) -> Result<(), LedgerError> {
        for coin in amount.iter() {
            let current = self.balance_of(addr, &coin.denom)?;
            let updated = current
                .checked_add(coin.amount)
                .ok_or(LedgerError::Overflow("account balance"))?;
            self.set_balance(addr, &coin.denom, updated)?;
        }
        Ok(())
    }

    fn sub_coins(&mut self, addr: &AccAddress, amount: &Coins) -> Result<(), LedgerError> {
        for coin in amount.iter() {
            let have = self.balance_of(addr, &coin.denom)?;
            if have < coin.amount {
                return Err(LedgerError::InsufficientFunds {
                    address: addr.to_string(),
                    denom: coin.denom.clone(),
                    need: coin.amount,
                    have,
                });
            }
            self.set_balance(addr, &coin.denom, have - coin.amount)?;
        }
        Ok(())
    }

    pub(crate) fn add_supply(&mut self, amount: &Coins) -> Result<(), LedgerError> {
        for coin in amount.iter() {
            let key = keys::supply_key(&coin.denom);
            let current = self.get::<Balance>(Tree::Supply, &key)?.unwrap_or(0);
            let updated = current
                .checked_add(coin.amount)
                .ok_or(LedgerError::Overflow("total supply"))?;
            self.put(Tree::Supply, key, &updated)?;
        }
        Ok(())
    }
}

impl Ledger<'_> {
    /// Credit a genesis allocation: balance and supply grow together.
    pub fn init_genesis_balance(&mut self, addr: &AccAddress, amount: &Coins) -> Result<(), LedgerError> {
        self.add_coins(addr, amount)?;
        self.add_supply(amount)
    }
}

impl BankKeeper for Ledger<'_> {
    fn get_balance(&self, addr: &AccAddress, denom: &str) -> Result<Coin, LedgerError> {
        Ok(Coin::new(self.balance_of(addr, denom)?, denom))
    }

    fn get_all_balances(&self, addr: &AccAddress) -> Result<Coins, LedgerError> {
        let mut coins = Vec::new();
        for (key, amount) in self.scan_prefix::<Balance>(Tree::Balances, &keys::balances_prefix(addr))? {
            coins.push(Coin::new(amount, keys::denom_from_balance_key(&key)?));
        }
        Coins::from_coins(coins)
    }

    fn get_supply(&self, denom: &str) -> Result<Coin, LedgerError> {
        let amount = self
            .get::<Balance>(Tree::Supply, &keys::supply_key(denom))?
            .unwrap_or(0);
        Ok(Coin::new(amount, denom))
    }

    fn send_coins(
        &mut self,
        from: &AccAddress,
        to: &AccAddress,
        amount: &Coins,
    ) -> Result<(), LedgerError> {
        self.sub_coins(from, amount)?;
        self.add_coins(to, amount)?;
        debug!(from = %from, to = %to, amount = %amount, "coins sent");
        Ok(())
    }

    fn mint_coins(&mut self, module: &str, amount: &Coins) -> Result<(), LedgerError> {
        require_permission(module, ModulePermission::Minter, "mint tokens")?;
        if amount.is_empty() {
            return Ok(());
        }
        let addr = AccAddress::for_module(module);
        self.add_coins(&addr, amount)?;
        self.add_supply(amount)?;
        debug!(module, amount = %amount, "coins minted");
        Ok(())
    }

    fn send_coins_from_module_to_account(
        &mut self,
        module: &str,
        to: &AccAddress,
        amount: &Coins,
    ) -> Result<(), LedgerError> {
        let from = module_address(module)?;
        if is_module_address(to) {
            return Err(LedgerError::BlockedRecipient(to.to_string()));
        }
        self.send_coins(&from, to, amount)
    }

    fn send_coins_from_module_to_module(
        &mut self,
        from_module: &str,
        to_module: &str,
        amount: &Coins,
    ) -> Result<(), LedgerError> {
        let from = module_address(from_module)?;
        let to = module_address(to_module)?;
        self.send_coins(&from, &to, amount)
    }

    fn delegate_coins_from_account_to_module(
        &mut self,
        from: &AccAddress,
        module: &str,
        amount: &Coins,
    ) -> Result<(), LedgerError> {
        require_permission(module, ModulePermission::Staking, "delegate tokens")?;
        if amount.is_empty() {
            return Err(LedgerError::InvalidCoins("nothing to delegate".into()));
        }
        let to = AccAddress::for_module(module);
        self.send_coins(from, &to, amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::StateDb;
    use xprt_core::constants::{BOND_DENOM, MINT_MODULE_NAME, NOT_BONDED_POOL_NAME};

    fn temp_db(name: &str) -> StateDb {
        let dir = std::env::temp_dir().join(format!("xprt_bank_test_{}", name));
        let _ = std::fs::remove_dir_all(&dir);
        StateDb::open(&dir).expect("open temp db")
    }

    fn uxprt(amount: Balance) -> Coins {
        Coins::single(Coin::new(amount, BOND_DENOM)).unwrap()
    }

    fn addr(b: u8) -> AccAddress {
        AccAddress::from_bytes(vec![b; 20]).unwrap()
    }

    #[test]
    fn mint_increases_module_balance_and_supply() {
        let db = temp_db("mint");
        let mut ledger = Ledger::new(&db);
        ledger.mint_coins(MINT_MODULE_NAME, &uxprt(500)).unwrap();

        let mint_addr = module_address(MINT_MODULE_NAME).unwrap();
        assert_eq!(ledger.get_balance(&mint_addr, BOND_DENOM).unwrap().amount, 500);
        assert_eq!(ledger.get_supply(BOND_DENOM).unwrap().amount, 500);
    }

    #[test]
    fn mint_requires_minter_permission() {
        let db = temp_db("mint_perm");
        let mut ledger = Ledger::new(&db);
        let err = ledger.mint_coins(NOT_BONDED_POOL_NAME, &uxprt(1)).unwrap_err();
        assert!(matches!(err, LedgerError::MissingPermission { .. }));

        let err = ledger.mint_coins("distribution", &uxprt(1)).unwrap_err();
        assert!(matches!(err, LedgerError::ModuleAccountMissing(_)));
    }

    #[test]
    fn send_from_module_to_account() {
        let db = temp_db("send_module");
        let mut ledger = Ledger::new(&db);
        let alice = addr(1);
        ledger.mint_coins(MINT_MODULE_NAME, &uxprt(100)).unwrap();
        ledger
            .send_coins_from_module_to_account(MINT_MODULE_NAME, &alice, &uxprt(60))
            .unwrap();

        assert_eq!(ledger.get_balance(&alice, BOND_DENOM).unwrap().amount, 60);
        let mint_addr = module_address(MINT_MODULE_NAME).unwrap();
        assert_eq!(ledger.get_balance(&mint_addr, BOND_DENOM).unwrap().amount, 40);
        assert_eq!(ledger.get_supply(BOND_DENOM).unwrap().amount, 100);
    }

    #[test]
    fn module_accounts_cannot_receive_from_module() {
        let db = temp_db("send_blocked");
        let mut ledger = Ledger::new(&db);
        ledger.mint_coins(MINT_MODULE_NAME, &uxprt(100)).unwrap();
        let pool = module_address(NOT_BONDED_POOL_NAME).unwrap();
        assert!(is_module_address(&pool));
        assert!(!is_module_address(&addr(1)));

        let err = ledger
            .send_coins_from_module_to_account(MINT_MODULE_NAME, &pool, &uxprt(10))
            .unwrap_err();
        assert!(matches!(err, LedgerError::BlockedRecipient(_)));
        assert_eq!(ledger.get_balance(&pool, BOND_DENOM).unwrap().amount, 0);
        let mint_addr = module_address(MINT_MODULE_NAME).unwrap();
        assert_eq!(ledger.get_balance(&mint_addr, BOND_DENOM).unwrap().amount, 100);
    }

    #[test]
    fn send_more_than_balance_fails() {
        let db = temp_db("send_insufficient");
        let mut ledger = Ledger::new(&db);
        let err = ledger.send_coins(&addr(1), &addr(2), &uxprt(1)).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { need: 1, have: 0, .. }));
    }

    #[test]
    fn delegate_to_pool_requires_staking_permission() {
        let db = temp_db("delegate_perm");
        let mut ledger = Ledger::new(&db);
        let alice = addr(1);
        ledger.add_coins(&alice, &uxprt(10)).unwrap();

        let err = ledger
            .delegate_coins_from_account_to_module(&alice, MINT_MODULE_NAME, &uxprt(10))
            .unwrap_err();
        assert!(matches!(err, LedgerError::MissingPermission { .. }));

        ledger
            .delegate_coins_from_account_to_module(&alice, NOT_BONDED_POOL_NAME, &uxprt(10))
            .unwrap();
        assert!(ledger.get_all_balances(&alice).unwrap().is_empty());
    }

    #[test]
    fn all_balances_lists_every_denom() {
        let db = temp_db("all_balances");
        let mut ledger = Ledger::new(&db);
        let alice = addr(1);
        let coins = Coins::from_coins(vec![Coin::new(3, BOND_DENOM), Coin::new(4, "uatom")]).unwrap();
        ledger.add_coins(&alice, &coins).unwrap();
        ledger.add_coins(&addr(2), &uxprt(99)).unwrap();

        assert_eq!(ledger.get_all_balances(&alice).unwrap(), coins);
    }
}
