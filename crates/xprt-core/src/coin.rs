use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::LedgerError;
use crate::types::Balance;

// ── Coin ─────────────────────────────────────────────────────────────────────

/// A single denomination amount, e.g. `1000000uxprt`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    /// Serialized as a decimal string, the way Cosmos JSON carries amounts.
    #[serde(with = "amount_string")]
    pub amount: Balance,
}

impl Coin {
    pub fn new(amount: Balance, denom: impl Into<String>) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// Parse a base-unit amount: plain decimal digits, no sign, no separators.
pub fn parse_amount(s: &str) -> Result<Balance, LedgerError> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(LedgerError::InvalidCoins(format!("not a non-negative integer: {s:?}")));
    }
    s.parse::<Balance>()
        .map_err(|_| LedgerError::Overflow("amount exceeds 128 bits"))
}

// ── Coins ────────────────────────────────────────────────────────────────────

/// A set of coins: sorted by denom, one entry per denom, no zero amounts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Coin>", into = "Vec<Coin>")]
pub struct Coins(BTreeMap<String, Balance>);

impl Coins {
    /// Build a validated set. Duplicate denoms are rejected rather than merged.
    pub fn from_coins(coins: Vec<Coin>) -> Result<Self, LedgerError> {
        let mut map = BTreeMap::new();
        for coin in coins {
            validate_denom(&coin.denom)?;
            if coin.is_zero() {
                continue;
            }
            if map.insert(coin.denom.clone(), coin.amount).is_some() {
                return Err(LedgerError::InvalidCoins(format!("duplicate denom {}", coin.denom)));
            }
        }
        Ok(Self(map))
    }

    pub fn single(coin: Coin) -> Result<Self, LedgerError> {
        Self::from_coins(vec![coin])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn amount_of(&self, denom: &str) -> Balance {
        self.0.get(denom).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = Coin> + '_ {
        self.0
            .iter()
            .map(|(denom, amount)| Coin::new(*amount, denom.clone()))
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|c| c.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}

impl TryFrom<Vec<Coin>> for Coins {
    type Error = LedgerError;

    fn try_from(coins: Vec<Coin>) -> Result<Self, Self::Error> {
        Self::from_coins(coins)
    }
}

impl From<Coins> for Vec<Coin> {
    fn from(coins: Coins) -> Self {
        coins.iter().collect()
    }
}

/// Denoms: 3–128 chars, leading ASCII letter, then `[a-zA-Z0-9/:._-]`.
pub fn validate_denom(denom: &str) -> Result<(), LedgerError> {
    let valid_len = (3..=128).contains(&denom.len());
    let mut chars = denom.chars();
    let leading = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    let rest = chars.all(|c| c.is_ascii_alphanumeric() || "/:._-".contains(c));
    if valid_len && leading && rest {
        Ok(())
    } else {
        Err(LedgerError::InvalidCoins(format!("invalid denom: {denom:?}")))
    }
}

/// Serde adapter: `Balance` as a decimal string.
pub mod amount_string {
    use serde::{de, Deserialize, Deserializer, Serializer};

    use crate::types::Balance;

    pub fn serialize<S: Serializer>(amount: &Balance, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&amount.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Balance, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_amount(&s).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::BOND_DENOM;

    #[test]
    fn parse_amount_accepts_digits_only() {
        assert_eq!(parse_amount("1000000").unwrap(), 1_000_000);
        assert_eq!(parse_amount("0").unwrap(), 0);
        assert!(parse_amount("").is_err());
        assert!(parse_amount("-5").is_err());
        assert!(parse_amount("1e6").is_err());
        assert!(parse_amount(" 10").is_err());
        assert!(parse_amount("1_000").is_err());
    }

    #[test]
    fn parse_amount_overflow_reported() {
        let too_big = "1".repeat(40);
        assert!(matches!(parse_amount(&too_big), Err(LedgerError::Overflow(_))));
        // 2^128 is the first value out of range
        let max = u128::MAX.to_string();
        assert_eq!(parse_amount(&max).unwrap(), u128::MAX);
        assert!(matches!(
            parse_amount("340282366920938463463374607431768211456"),
            Err(LedgerError::Overflow(_))
        ));
    }

    #[test]
    fn coins_sorted_and_zero_free() {
        let coins = Coins::from_coins(vec![
            Coin::new(5, BOND_DENOM),
            Coin::new(0, "uatom"),
            Coin::new(2, "ibc/ABCDEF"),
        ])
        .unwrap();
        assert_eq!(coins.to_string(), "2ibc/ABCDEF,5uxprt");
        assert_eq!(coins.amount_of("uatom"), 0);
    }

    #[test]
    fn duplicate_denoms_rejected() {
        let err = Coins::from_coins(vec![Coin::new(1, BOND_DENOM), Coin::new(2, BOND_DENOM)]);
        assert!(err.is_err());
    }

    #[test]
    fn invalid_denom_rejected() {
        assert!(validate_denom("1abc").is_err());
        assert!(validate_denom("ab").is_err());
        assert!(validate_denom("uxprt").is_ok());
    }

    #[test]
    fn coin_json_uses_string_amount() {
        let json = serde_json::to_string(&Coin::new(42, BOND_DENOM)).unwrap();
        assert_eq!(json, r#"{"denom":"uxprt","amount":"42"}"#);
    }
}
