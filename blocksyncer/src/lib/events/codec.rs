// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! Field encodings of typed events.
//!
//! Attribute values are proto-JSON: 64 bit integers and big integers arrive
//! as strings, bytes as base64, enums by name, timestamps as RFC 3339. The
//! adapters below accept those forms (and plain JSON numbers where it makes
//! sense) and produce the representation stored in the database.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use num_bigint::{BigInt, BigUint};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use serde_with::{DeserializeAs, DisplayFromStr, PickFirst, Same};

/// Integers given either as a JSON number or as a decimal string.
pub type Num = PickFirst<(Same, DisplayFromStr)>;

/// Declare an enum of the chain, decoded from its full proto name, its name
/// without `prefix`, or its number. It is stored by its short name.
macro_rules! chain_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident : $prefix:literal {
            $(
                $(#[$vmeta:meta])*
                $variant:ident = $num:literal => $short:literal
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
        $vis enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Name stored in the database.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $short ),+
                }
            }

            pub fn number(&self) -> i64 {
                match self {
                    $( $name::$variant => $num ),+
                }
            }

            pub fn from_number(n: i64) -> Option<Self> {
                match n {
                    $( $num => Some($name::$variant), )+
                    _ => None,
                }
            }

            pub fn from_name(name: &str) -> Option<Self> {
                let short = name.strip_prefix($prefix).unwrap_or(name);
                match short {
                    $( $short => Some($name::$variant), )+
                    _ => None,
                }
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let raw = <serde_json::Value as serde::Deserialize>::deserialize(
                    deserializer,
                )?;
                let parsed = match &raw {
                    serde_json::Value::String(s) => match s.parse::<i64>() {
                        Ok(n) => $name::from_number(n),
                        Err(_) => $name::from_name(s),
                    },
                    serde_json::Value::Number(n) => {
                        n.as_i64().and_then($name::from_number)
                    }
                    _ => None,
                };
                parsed.ok_or_else(|| {
                    serde::de::Error::custom(format!(
                        "invalid {} {raw}",
                        stringify!($name)
                    ))
                })
            }
        }
    };
}

pub(crate) use chain_enum;

fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(D::Error::custom(format!("expected a string, got {other}"))),
    }
}

/// Render a uint256, given in decimal or `0x` hex, as 32 byte big-endian
/// `0x` hex.
pub fn uint256_to_hex(raw: &str) -> Result<String, String> {
    let bytes = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(digits) => BigUint::parse_bytes(digits.as_bytes(), 16),
        None => BigUint::parse_bytes(raw.as_bytes(), 10),
    }
    .ok_or_else(|| format!("{raw:?} is not an unsigned integer"))?
    .to_bytes_be();
    if bytes.len() > 32 {
        return Err(format!("{raw} does not fit in 256 bits"));
    }
    let mut padded = [0u8; 32];
    padded[32 - bytes.len()..].copy_from_slice(&bytes);
    Ok(format!("0x{}", hex::encode(padded)))
}

/// Lowercase `0x` hex of a 20 byte address. The empty string stays empty.
pub fn normalize_address(raw: &str) -> Result<String, String> {
    if raw.is_empty() {
        return Ok(String::new());
    }
    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .unwrap_or(raw);
    if digits.len() > 40 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("{raw:?} is not an address"));
    }
    Ok(format!("0x{:0>40}", digits.to_ascii_lowercase()))
}

/// Canonical text of a signed integer or a decimal fraction.
pub fn normalize_decimal(raw: &str) -> Result<String, String> {
    if raw.is_empty() {
        return Ok("0".into());
    }
    match raw.split_once('.') {
        None => BigInt::parse_bytes(raw.as_bytes(), 10)
            .map(|n| n.to_string())
            .ok_or_else(|| format!("{raw:?} is not an integer")),
        Some((int, frac)) => {
            let int = int.strip_prefix('-').unwrap_or(int);
            let digits = |s: &str| {
                !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
            };
            if digits(int) && digits(frac) {
                Ok(raw.to_owned())
            } else {
                Err(format!("{raw:?} is not a decimal"))
            }
        }
    }
}

/// Unix seconds of an RFC 3339 timestamp.
pub fn rfc3339_seconds(raw: &str) -> Result<i64, String> {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|t| t.timestamp())
        .map_err(|e| format!("{raw:?} is not a timestamp: {e}"))
}

/// uint256 identifier rendered as 32 byte hex.
pub struct Uint256Hex;

impl<'de> DeserializeAs<'de, String> for Uint256Hex {
    fn deserialize_as<D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        uint256_to_hex(&text(d)?).map_err(D::Error::custom)
    }
}

pub struct AddressHex;

impl<'de> DeserializeAs<'de, String> for AddressHex {
    fn deserialize_as<D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        normalize_address(&text(d)?).map_err(D::Error::custom)
    }
}

/// Big integer or decimal kept as text.
pub struct DecimalText;

impl<'de> DeserializeAs<'de, String> for DecimalText {
    fn deserialize_as<D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        normalize_decimal(&text(d)?).map_err(D::Error::custom)
    }
}

/// RFC 3339 timestamp as unix seconds.
pub struct Timestamp;

impl<'de> DeserializeAs<'de, i64> for Timestamp {
    fn deserialize_as<D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        rfc3339_seconds(&text(d)?).map_err(D::Error::custom)
    }
}

pub struct Base64Bytes;

impl<'de> DeserializeAs<'de, Vec<u8>> for Base64Bytes {
    fn deserialize_as<D: Deserializer<'de>>(
        d: D,
    ) -> Result<Vec<u8>, D::Error> {
        STANDARD.decode(text(d)?).map_err(D::Error::custom)
    }
}

/// A coin amount; only the amount is stored.
#[serde_with::serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Coin {
    pub denom: String,
    #[serde_as(as = "DecimalText")]
    pub amount: String,
}

/// Wrapper of optional scalars (`google.protobuf.UInt64Value`).
#[serde_with::serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UInt64Value {
    #[serde_as(as = "Num")]
    pub value: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uint256_to_hex() {
        assert_eq!(
            uint256_to_hex("1").unwrap(),
            "0x0000000000000000000000000000000000000000000000000000000000000001"
        );
        assert_eq!(
            uint256_to_hex("0x0A").unwrap(),
            uint256_to_hex("10").unwrap()
        );
        assert_eq!(uint256_to_hex("0").unwrap(), bsdb::value::ZERO_HASH);
        assert!(uint256_to_hex("-1").is_err());
        assert!(uint256_to_hex(&format!("0x1{}", "0".repeat(64))).is_err());
    }

    #[test]
    fn test_normalize_address() {
        assert_eq!(
            normalize_address("0xAbCd").unwrap(),
            "0x000000000000000000000000000000000000abcd"
        );
        assert_eq!(normalize_address("").unwrap(), "");
        assert!(normalize_address("0xzz").is_err());
        assert!(normalize_address(&format!("0x{}", "1".repeat(41))).is_err());
    }

    #[test]
    fn test_normalize_decimal() {
        assert_eq!(normalize_decimal("007").unwrap(), "7");
        assert_eq!(normalize_decimal("-12").unwrap(), "-12");
        assert_eq!(
            normalize_decimal("340282366920938463463374607431768211456")
                .unwrap(),
            "340282366920938463463374607431768211456"
        );
        assert_eq!(normalize_decimal("0.087").unwrap(), "0.087");
        assert_eq!(normalize_decimal("").unwrap(), "0");
        assert!(normalize_decimal("1e9").is_err());
        assert!(normalize_decimal("1.").is_err());
    }

    chain_enum! {
        enum Colour : "COLOUR_" {
            #[default]
            Unspecified = 0 => "UNSPECIFIED",
            Red = 1 => "RED",
        }
    }

    #[test]
    fn test_chain_enum_accepts_names_and_numbers() {
        let parse = |v: Value| serde_json::from_value::<Colour>(v);
        assert_eq!(parse(Value::from("COLOUR_RED")).unwrap(), Colour::Red);
        assert_eq!(parse(Value::from("RED")).unwrap(), Colour::Red);
        assert_eq!(parse(Value::from(1)).unwrap(), Colour::Red);
        assert_eq!(parse(Value::from("1")).unwrap(), Colour::Red);
        assert!(parse(Value::from("BLUE")).is_err());
        assert!(parse(Value::from(7)).is_err());
        assert_eq!(Colour::default().as_str(), "UNSPECIFIED");
        assert_eq!(Colour::Red.number(), 1);
    }
}
