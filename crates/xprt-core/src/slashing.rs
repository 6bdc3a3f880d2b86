use serde::{Deserialize, Serialize};

use crate::types::{ConsAddress, Height, Timestamp};

/// Liveness and punishment record kept by the slashing module for one
/// consensus key.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ValidatorSigningInfo {
    pub address: ConsAddress,
    /// Height at which the validator first became bonded.
    pub start_height: Height,
    /// Index into the missed-blocks bit array.
    pub index_offset: u64,
    /// The validator may not unjail itself before this time.
    pub jailed_until: Timestamp,
    /// Permanently barred from the active set (double-sign).
    pub tombstoned: bool,
    pub missed_blocks_counter: u64,
}

impl ValidatorSigningInfo {
    pub fn new(address: ConsAddress, start_height: Height) -> Self {
        Self {
            address,
            start_height,
            index_offset: 0,
            jailed_until: 0,
            tombstoned: false,
            missed_blocks_counter: 0,
        }
    }
}
