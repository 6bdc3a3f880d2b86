use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::Transactional;
use std::path::Path;
use xprt_core::error::LedgerError;
use xprt_core::types::Height;

use crate::keys;

/// Named trees of the state database.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tree {
    Balances,
    Supply,
    Validators,
    Delegations,
    SigningInfos,
    Meta,
}

impl Tree {
    pub const ALL: [Tree; 6] = [
        Tree::Balances,
        Tree::Supply,
        Tree::Validators,
        Tree::Delegations,
        Tree::SigningInfos,
        Tree::Meta,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Tree::Balances => "balances",
            Tree::Supply => "supply",
            Tree::Validators => "validators",
            Tree::Delegations => "delegations",
            Tree::SigningInfos => "signing_infos",
            Tree::Meta => "meta",
        }
    }
}

/// One staged write: tree, key, and the new value (`None` = delete).
pub type Write<'a> = (Tree, &'a [u8], Option<&'a [u8]>);

/// Persistent state database backed by sled (pure-Rust, no C dependencies).
///
/// Named trees (analogous to column families):
///   balances     : len‖AccAddress ‖ denom     → bincode(u128)
///   supply       : denom                      → bincode(u128)
///   validators   : len‖ValAddress             → bincode(Validator)
///   delegations  : len‖AccAddress ‖ len‖ValAddress → bincode(Delegation)
///   signing_infos: len‖ConsAddress            → bincode(ValidatorSigningInfo)
///   meta         : utf8 key bytes             → raw bytes
///
/// Typed access goes through [`crate::Ledger`]; this layer only moves bytes.
pub struct StateDb {
    db: sled::Db,
    balances: sled::Tree,
    supply: sled::Tree,
    validators: sled::Tree,
    delegations: sled::Tree,
    signing_infos: sled::Tree,
    meta: sled::Tree,
}

impl StateDb {
    /// Open or create the state database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LedgerError> {
        let db = sled::open(path).map_err(storage)?;
        let balances      = db.open_tree(Tree::Balances.name()).map_err(storage)?;
        let supply        = db.open_tree(Tree::Supply.name()).map_err(storage)?;
        let validators    = db.open_tree(Tree::Validators.name()).map_err(storage)?;
        let delegations   = db.open_tree(Tree::Delegations.name()).map_err(storage)?;
        let signing_infos = db.open_tree(Tree::SigningInfos.name()).map_err(storage)?;
        let meta          = db.open_tree(Tree::Meta.name()).map_err(storage)?;
        Ok(Self { db, balances, supply, validators, delegations, signing_infos, meta })
    }

    fn tree(&self, tree: Tree) -> &sled::Tree {
        match tree {
            Tree::Balances => &self.balances,
            Tree::Supply => &self.supply,
            Tree::Validators => &self.validators,
            Tree::Delegations => &self.delegations,
            Tree::SigningInfos => &self.signing_infos,
            Tree::Meta => &self.meta,
        }
    }

    // ── Raw access ───────────────────────────────────────────────────────────

    pub fn get_raw(&self, tree: Tree, key: &[u8]) -> Result<Option<Vec<u8>>, LedgerError> {
        self.tree(tree)
            .get(key)
            .map(|v| v.map(|iv| iv.to_vec()))
            .map_err(storage)
    }

    /// All entries of `tree` whose key starts with `prefix`, in key order.
    pub fn scan_prefix_raw(
        &self,
        tree: Tree,
        prefix: &[u8],
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, LedgerError> {
        let mut out = Vec::new();
        for item in self.tree(tree).scan_prefix(prefix) {
            let (key, value) = item.map_err(storage)?;
            out.push((key.to_vec(), value.to_vec()));
        }
        Ok(out)
    }

    /// Apply writes (`None` = delete) across every tree in one sled
    /// transaction: either all of them land or none do.
    ///
    /// Empty keys are never produced by the key layout and abort the write.
    pub fn write_all(&self, writes: &[Write<'_>]) -> Result<(), LedgerError> {
        let trees = (
            &self.balances,
            &self.supply,
            &self.validators,
            &self.delegations,
            &self.signing_infos,
            &self.meta,
        );
        trees
            .transaction(|(balances, supply, validators, delegations, signing_infos, meta)| {
                for (tree, key, value) in writes {
                    if key.is_empty() {
                        return Err(ConflictableTransactionError::Abort(LedgerError::Storage(
                            format!("empty key in {} tree", tree.name()),
                        )));
                    }
                    let target = match tree {
                        Tree::Balances => balances,
                        Tree::Supply => supply,
                        Tree::Validators => validators,
                        Tree::Delegations => delegations,
                        Tree::SigningInfos => signing_infos,
                        Tree::Meta => meta,
                    };
                    match value {
                        Some(v) => {
                            target.insert(*key, *v)?;
                        }
                        None => {
                            target.remove(*key)?;
                        }
                    }
                }
                Ok(())
            })
            .map_err(|e| match e {
                TransactionError::Abort(e) => e,
                TransactionError::Storage(e) => storage(e),
            })
    }

    /// True when no tree holds any entry (fresh database).
    pub fn is_empty(&self) -> bool {
        Tree::ALL.iter().all(|t| self.tree(*t).is_empty())
    }

    // ── Meta ──────────────────────────────────────────────────────────────────

    pub fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        self.get_raw(Tree::Meta, key.as_bytes())
    }

    /// Height at which upgrade `name` was applied, if it has been.
    pub fn upgrade_done_height(&self, name: &str) -> Result<Option<Height>, LedgerError> {
        match self.get_meta(&keys::upgrade_done_key(name))? {
            Some(bytes) => keys::decode_height(&bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<(), LedgerError> {
        self.db.flush().map_err(storage)?;
        Ok(())
    }
}

fn storage(e: sled::Error) -> LedgerError {
    LedgerError::Storage(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_db(name: &str) -> StateDb {
        let dir = std::env::temp_dir().join(format!("xprt_db_test_{}", name));
        let _ = std::fs::remove_dir_all(&dir);
        StateDb::open(&dir).expect("open temp db")
    }

    #[test]
    fn fresh_db_is_empty() {
        let db = temp_db("fresh");
        assert!(db.is_empty());
        db.write_all(&[(Tree::Meta, &b"chain_id"[..], Some(&b"core-1"[..]))]).unwrap();
        assert!(!db.is_empty());
        assert_eq!(db.get_meta("chain_id").unwrap(), Some(b"core-1".to_vec()));
    }

    #[test]
    fn write_all_inserts_and_deletes() {
        let db = temp_db("batch");
        db.write_all(&[
            (Tree::Supply, &b"uxprt"[..], Some(&b"1"[..])),
            (Tree::Supply, &b"uatom"[..], Some(&b"2"[..])),
        ])
        .unwrap();
        db.write_all(&[(Tree::Supply, &b"uatom"[..], None)]).unwrap();

        assert_eq!(db.get_raw(Tree::Supply, b"uxprt").unwrap(), Some(b"1".to_vec()));
        assert_eq!(db.get_raw(Tree::Supply, b"uatom").unwrap(), None);
    }

    #[test]
    fn prefix_scan_is_key_ordered() {
        let db = temp_db("scan");
        db.write_all(&[
            (Tree::Meta, &b"a/2"[..], Some(&b""[..])),
            (Tree::Meta, &b"a/1"[..], Some(&b""[..])),
            (Tree::Meta, &b"b/1"[..], Some(&b""[..])),
        ])
        .unwrap();
        let keys: Vec<_> = db
            .scan_prefix_raw(Tree::Meta, b"a/")
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec![b"a/1".to_vec(), b"a/2".to_vec()]);
    }

    #[test]
    fn aborted_write_leaves_every_tree_untouched() {
        let db = temp_db("abort");
        let err = db
            .write_all(&[
                (Tree::Balances, &b"acct"[..], Some(&b"1"[..])),
                (Tree::Supply, &b"uxprt"[..], Some(&b"1"[..])),
                (Tree::SigningInfos, &b"cons"[..], Some(&b"0"[..])),
                (Tree::Meta, &b""[..], Some(&b"x"[..])),
            ])
            .unwrap_err();
        assert!(matches!(err, LedgerError::Storage(_)));
        assert!(db.is_empty());
    }
}
