//! Field types and typed values.
//!
//! Type bytes follow the BSON element tags so schemas stay readable by
//! tools that already speak them.

use std::fmt;

use crate::common::{Error, Result};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Double = 0x01,
    String = 0x02,
    Binary = 0x05,
    Bool = 0x08,
    Int64 = 0x12,
}

impl FieldType {
    pub fn from_u8(byte: u8) -> Result<Self> {
        match byte {
            0x01 => Ok(FieldType::Double),
            0x02 => Ok(FieldType::String),
            0x05 => Ok(FieldType::Binary),
            0x08 => Ok(FieldType::Bool),
            0x12 => Ok(FieldType::Int64),
            other => Err(Error::Corrupted(format!("unknown field type {:#04x}", other))),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::Double => "double",
            FieldType::String => "string",
            FieldType::Binary => "binary",
            FieldType::Bool => "bool",
            FieldType::Int64 => "int64",
        };
        f.write_str(name)
    }
}

/// A typed value as seen by expressions and modifiers.
///
/// Tuples store values as bytes; [`Value::to_bytes`] and
/// [`Value::from_bytes`] convert between the two. Integers and doubles use
/// an order-preserving big-endian encoding so index keys sort numerically.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int64(i64),
    Double(f64),
    String(String),
    Binary(Vec<u8>),
}

impl Value {
    pub fn field_type(&self) -> Option<FieldType> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(FieldType::Bool),
            Value::Int64(_) => Some(FieldType::Int64),
            Value::Double(_) => Some(FieldType::Double),
            Value::String(_) => Some(FieldType::String),
            Value::Binary(_) => Some(FieldType::Binary),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int64(_) => "int64",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Binary(_) => "binary",
        }
    }

    /// Tuple element encoding of this value.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Value::Null => Vec::new(),
            Value::Bool(b) => vec![*b as u8],
            Value::Int64(v) => ((*v as u64) ^ (1 << 63)).to_be_bytes().to_vec(),
            Value::Double(v) => {
                let bits = v.to_bits();
                let ordered = if bits >> 63 == 1 { !bits } else { bits | (1 << 63) };
                ordered.to_be_bytes().to_vec()
            }
            Value::String(s) => s.as_bytes().to_vec(),
            Value::Binary(b) => b.clone(),
        }
    }

    /// Decode a tuple element of type `field_type`.
    pub fn from_bytes(field_type: FieldType, bytes: &[u8]) -> Result<Self> {
        match field_type {
            FieldType::String => String::from_utf8(bytes.to_vec())
                .map(Value::String)
                .map_err(|e| Error::Corrupted(format!("string field is not utf-8: {}", e))),
            FieldType::Binary => Ok(Value::Binary(bytes.to_vec())),
            FieldType::Bool => match bytes {
                [0] => Ok(Value::Bool(false)),
                [1] => Ok(Value::Bool(true)),
                _ => Err(Error::Corrupted(format!("bool field of {} bytes", bytes.len()))),
            },
            FieldType::Int64 => {
                let raw = fixed8(bytes)?;
                Ok(Value::Int64((raw ^ (1 << 63)) as i64))
            }
            FieldType::Double => {
                let ordered = fixed8(bytes)?;
                let bits = if ordered >> 63 == 1 {
                    ordered & !(1 << 63)
                } else {
                    !ordered
                };
                Ok(Value::Double(f64::from_bits(bits)))
            }
        }
    }
}

fn fixed8(bytes: &[u8]) -> Result<u64> {
    let buf: [u8; 8] = bytes
        .try_into()
        .map_err(|_| Error::Corrupted(format!("expected 8-byte field, got {}", bytes.len())))?;
    Ok(u64::from_be_bytes(buf))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Binary(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int64(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_field_type_bytes() {
        for ty in [
            FieldType::Double,
            FieldType::String,
            FieldType::Binary,
            FieldType::Bool,
            FieldType::Int64,
        ] {
            assert_eq!(FieldType::from_u8(ty as u8).unwrap(), ty);
        }
        assert!(FieldType::from_u8(0x7F).is_err());
    }

    #[test]
    fn test_string_roundtrip() {
        let value = Value::from("allow");
        assert_eq!(value.to_bytes(), b"allow");
        assert_eq!(Value::from_bytes(FieldType::String, b"allow").unwrap(), value);
    }

    #[test]
    fn test_bool_decoding() {
        assert_eq!(Value::from_bytes(FieldType::Bool, &[1]).unwrap(), Value::Bool(true));
        assert!(Value::from_bytes(FieldType::Bool, &[2]).is_err());
    }

    #[test]
    fn test_int_encoding_sorts_numerically() {
        let encoded: Vec<_> = [-5i64, -1, 0, 1, 300]
            .iter()
            .map(|&v| Value::Int64(v).to_bytes())
            .collect();
        assert!(encoded.windows(2).all(|w| w[0] < w[1]));
    }

    proptest! {
        #[test]
        fn prop_int_roundtrip(v in any::<i64>()) {
            let bytes = Value::Int64(v).to_bytes();
            prop_assert_eq!(Value::from_bytes(FieldType::Int64, &bytes).unwrap(), Value::Int64(v));
        }

        #[test]
        fn prop_double_order(a in -1e12f64..1e12, b in -1e12f64..1e12) {
            let (ea, eb) = (Value::Double(a).to_bytes(), Value::Double(b).to_bytes());
            prop_assert_eq!(a.partial_cmp(&b), Some(ea.cmp(&eb)));
            prop_assert_eq!(Value::from_bytes(FieldType::Double, &ea).unwrap(), Value::Double(a));
        }
    }
}
