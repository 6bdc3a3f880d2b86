//! Store key layout. Addresses are length-prefixed so that one address can
//! never be a byte prefix of another inside a composite key.

use xprt_core::error::LedgerError;
use xprt_core::types::{AccAddress, ConsAddress, Height, ValAddress};

fn length_prefixed(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() + 1);
    // Address payloads are capped at 255 bytes on construction.
    out.push(bytes.len() as u8);
    out.extend_from_slice(bytes);
    out
}

/// Prefix of every balance held by `addr`.
pub fn balances_prefix(addr: &AccAddress) -> Vec<u8> {
    length_prefixed(addr.as_bytes())
}

pub fn balance_key(addr: &AccAddress, denom: &str) -> Vec<u8> {
    let mut key = balances_prefix(addr);
    key.extend_from_slice(denom.as_bytes());
    key
}

/// Denom part of a balance key.
pub fn denom_from_balance_key(key: &[u8]) -> Result<String, LedgerError> {
    let addr_len = *key.first().ok_or_else(|| corrupt("empty balance key"))? as usize;
    let denom = key
        .get(1 + addr_len..)
        .ok_or_else(|| corrupt("truncated balance key"))?;
    String::from_utf8(denom.to_vec()).map_err(|_| corrupt("non-utf8 denom in balance key"))
}

pub fn supply_key(denom: &str) -> Vec<u8> {
    denom.as_bytes().to_vec()
}

pub fn validator_key(addr: &ValAddress) -> Vec<u8> {
    length_prefixed(addr.as_bytes())
}

/// Prefix of every delegation made by `delegator`.
pub fn delegations_prefix(delegator: &AccAddress) -> Vec<u8> {
    length_prefixed(delegator.as_bytes())
}

pub fn delegation_key(delegator: &AccAddress, validator: &ValAddress) -> Vec<u8> {
    let mut key = delegations_prefix(delegator);
    key.extend_from_slice(&length_prefixed(validator.as_bytes()));
    key
}

pub fn signing_info_key(addr: &ConsAddress) -> Vec<u8> {
    length_prefixed(addr.as_bytes())
}

/// Meta key recording the height an upgrade was applied at.
pub fn upgrade_done_key(name: &str) -> String {
    format!("upgrade/done/{name}")
}

pub fn encode_height(height: Height) -> [u8; 8] {
    height.to_be_bytes()
}

pub fn decode_height(bytes: &[u8]) -> Result<Height, LedgerError> {
    let arr: [u8; 8] = bytes
        .try_into()
        .map_err(|_| corrupt("height must be 8 bytes"))?;
    Ok(Height::from_be_bytes(arr))
}

fn corrupt(msg: &str) -> LedgerError {
    LedgerError::Storage(format!("corrupt key: {msg}"))
}
