use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

use xprt_core::error::LedgerError;
use xprt_core::types::Height;

use crate::db::{StateDb, Tree, Write};
use crate::keys;

/// Staged writes keyed by (tree, key). `None` marks a deletion.
type Staged = BTreeMap<(Tree, Vec<u8>), Option<Vec<u8>>>;

/// A cached view over [`StateDb`].
///
/// Every keeper write is staged in memory; reads see staged values first.
/// Nothing reaches the database until [`Ledger::commit`]. Dropping a ledger
/// without committing discards everything it staged, which is how a failed
/// state transition leaves no trace.
pub struct Ledger<'a> {
    db: &'a StateDb,
    staged: Staged,
}

impl<'a> Ledger<'a> {
    pub fn new(db: &'a StateDb) -> Self {
        Self {
            db,
            staged: BTreeMap::new(),
        }
    }

    /// Number of staged key writes (including deletions).
    pub fn pending_writes(&self) -> usize {
        self.staged.len()
    }

    // ── Typed access ─────────────────────────────────────────────────────────

    pub(crate) fn get<T: DeserializeOwned>(
        &self,
        tree: Tree,
        key: &[u8],
    ) -> Result<Option<T>, LedgerError> {
        let raw = match self.staged.get(&(tree, key.to_vec())) {
            Some(staged) => staged.clone(),
            None => self.db.get_raw(tree, key)?,
        };
        raw.map(|bytes| decode(&bytes)).transpose()
    }

    pub(crate) fn put<T: Serialize>(
        &mut self,
        tree: Tree,
        key: Vec<u8>,
        value: &T,
    ) -> Result<(), LedgerError> {
        let bytes = bincode::serialize(value)
            .map_err(|e| LedgerError::Serialization(e.to_string()))?;
        self.staged.insert((tree, key), Some(bytes));
        Ok(())
    }

    pub(crate) fn delete(&mut self, tree: Tree, key: Vec<u8>) {
        self.staged.insert((tree, key), None);
    }

    /// All live entries under `prefix`, merging staged writes over the DB.
    pub(crate) fn scan_prefix<T: DeserializeOwned>(
        &self,
        tree: Tree,
        prefix: &[u8],
    ) -> Result<Vec<(Vec<u8>, T)>, LedgerError> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.db.scan_prefix_raw(tree, prefix)?.into_iter().collect();

        let start = (tree, prefix.to_vec());
        for ((t, key), value) in self.staged.range(start..) {
            if *t != tree || !key.starts_with(prefix) {
                break;
            }
            match value {
                Some(bytes) => {
                    merged.insert(key.clone(), bytes.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }

        merged
            .into_iter()
            .map(|(key, bytes)| decode(&bytes).map(|value| (key, value)))
            .collect()
    }

    /// Stage a raw meta entry.
    pub fn put_meta(&mut self, key: &str, value: Vec<u8>) {
        self.staged.insert((Tree::Meta, key.as_bytes().to_vec()), Some(value));
    }

    // ── Upgrade bookkeeping ───────────────────────────────────────────────────

    /// Stage the done-marker for upgrade `name`.
    pub fn set_upgrade_done(&mut self, name: &str, height: Height) {
        self.staged.insert(
            (Tree::Meta, keys::upgrade_done_key(name).into_bytes()),
            Some(keys::encode_height(height).to_vec()),
        );
    }

    /// Height at which upgrade `name` was applied, seeing staged writes.
    pub fn upgrade_done_height(&self, name: &str) -> Result<Option<Height>, LedgerError> {
        let key = keys::upgrade_done_key(name).into_bytes();
        match self.staged.get(&(Tree::Meta, key)) {
            Some(Some(bytes)) => keys::decode_height(bytes).map(Some),
            Some(None) => Ok(None),
            None => self.db.upgrade_done_height(name),
        }
    }

    // ── Commit ────────────────────────────────────────────────────────────────

    /// Write every staged entry to the database in one transaction, then
    /// flush. Either every tree is updated or none is. Returns the number of
    /// keys written.
    pub fn commit(self) -> Result<usize, LedgerError> {
        let writes: Vec<Write<'_>> = self
            .staged
            .iter()
            .map(|((tree, key), value)| (*tree, key.as_slice(), value.as_deref()))
            .collect();
        for tree in Tree::ALL {
            let keys = writes.iter().filter(|(t, _, _)| *t == tree).count();
            if keys > 0 {
                debug!(tree = tree.name(), keys, "committing staged writes");
            }
        }
        self.db.write_all(&writes)?;
        self.db.flush()?;
        info!(keys = writes.len(), "ledger committed");
        Ok(writes.len())
    }
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, LedgerError> {
    bincode::deserialize(bytes).map_err(|e| LedgerError::Serialization(e.to_string()))
}
