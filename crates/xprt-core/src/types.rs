use bech32::primitives::decode::CheckedHrpstring;
use bech32::{Bech32, Hrp};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::constants::{ACCOUNT_ADDRESS_PREFIX, CONSENSUS_ADDRESS_PREFIX, VALIDATOR_ADDRESS_PREFIX};
use crate::error::LedgerError;

/// Amount in base units (uxprt).
///
/// Cosmos amounts are unbounded integers. Here they are capped at 128 bits:
/// a record or genesis amount of 2^128 or more fails with
/// [`LedgerError::Overflow`] and aborts the whole upgrade or genesis rather
/// than being truncated.
pub type Balance = u128;

/// Unix timestamp (seconds, UTC).
pub type Timestamp = i64;

/// Block height.
pub type Height = u64;

/// Length of a module account address (SHA-256 truncated, as the SDK does).
pub const MODULE_ADDRESS_LEN: usize = 20;

/// Longest address payload accepted by the SDK's address verifier.
pub const MAX_ADDRESS_LEN: usize = 255;

// ── Bech32 helpers ───────────────────────────────────────────────────────────

fn decode_bech32(s: &str, expected_hrp: &str) -> Result<Vec<u8>, LedgerError> {
    if s.trim().is_empty() {
        return Err(LedgerError::InvalidAddress("empty address string".into()));
    }
    // plain bech32 checksum only; bech32m strings are not addresses
    let checked = CheckedHrpstring::new::<Bech32>(s)
        .map_err(|e| LedgerError::InvalidAddress(format!("{s}: {e}")))?;
    let hrp = checked.hrp();
    let data: Vec<u8> = checked.byte_iter().collect();
    if hrp.to_lowercase() != expected_hrp {
        return Err(LedgerError::InvalidAddressPrefix {
            expected: expected_hrp.to_string(),
            got: hrp.to_lowercase(),
        });
    }
    verify_address_len(&data)?;
    Ok(data)
}

fn encode_bech32(hrp: &str, data: &[u8]) -> String {
    // Both the HRP constants and the payload lengths are validated at
    // construction, so encoding only fails on programmer error.
    match Hrp::parse(hrp) {
        Ok(hrp) => bech32::encode::<Bech32>(hrp, data).unwrap_or_else(|_| hex::encode(data)),
        Err(_) => hex::encode(data),
    }
}

fn verify_address_len(data: &[u8]) -> Result<(), LedgerError> {
    if data.is_empty() {
        return Err(LedgerError::InvalidAddress("address payload is empty".into()));
    }
    if data.len() > MAX_ADDRESS_LEN {
        return Err(LedgerError::InvalidAddress(format!(
            "address payload too long: {} bytes (max {MAX_ADDRESS_LEN})",
            data.len()
        )));
    }
    Ok(())
}

// ── Address types ────────────────────────────────────────────────────────────

/// Declares a raw-bytes address type with bech32 text encoding under `$hrp`.
///
/// The text form is what appears in JSON, so serde goes through bech32 too.
macro_rules! bech32_address {
    ($(#[$meta:meta])* $name:ident, $hrp:expr) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(Vec<u8>);

        impl $name {
            pub const PREFIX: &'static str = $hrp;

            pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self, LedgerError> {
                let bytes = bytes.into();
                verify_address_len(&bytes)?;
                Ok(Self(bytes))
            }

            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }

            pub fn from_bech32(s: &str) -> Result<Self, LedgerError> {
                decode_bech32(s, $hrp).map(Self)
            }

            pub fn to_bech32(&self) -> String {
                encode_bech32($hrp, &self.0)
            }
        }

        impl FromStr for $name {
            type Err = LedgerError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_bech32(s)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.to_bech32())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_bech32())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_bech32())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::from_bech32(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

bech32_address!(
    /// Account address (`persistence1…`).
    AccAddress,
    ACCOUNT_ADDRESS_PREFIX
);

bech32_address!(
    /// Validator operator address (`persistencevaloper1…`).
    ValAddress,
    VALIDATOR_ADDRESS_PREFIX
);

bech32_address!(
    /// Validator consensus address (`persistencevalcons1…`).
    ConsAddress,
    CONSENSUS_ADDRESS_PREFIX
);

impl AccAddress {
    /// Address of the module account named `name`: SHA-256(name)[..20].
    pub fn for_module(name: &str) -> Self {
        let digest = Sha256::digest(name.as_bytes());
        Self(digest[..MODULE_ADDRESS_LEN].to_vec())
    }
}
