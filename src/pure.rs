use std::str::FromStr;

use serde_json::Value;

use crate::address::Address;
use crate::error::Error;
use crate::signature::{OpenMoveTypeSignatureBody, PrimitiveType};

/// The subset of Move types whose values can be supplied as raw JSON and
/// BCS-encoded client side. Everything else must arrive as an object input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PureSchema {
    Bool,
    U8,
    U16,
    U32,
    U64,
    U128,
    U256,
    Address,
    /// `0x1::string::String` / `0x1::ascii::String`
    String,
    /// `0x2::object::ID`
    Id,
    Vector(Box<PureSchema>),
    Option(Box<PureSchema>),
}

impl PureSchema {
    /// Classify a signature body as pure-encodable, if it is.
    pub fn from_signature_body(body: &OpenMoveTypeSignatureBody) -> Option<Self> {
        Some(match body {
            OpenMoveTypeSignatureBody::Primitive(primitive) => match primitive {
                PrimitiveType::Bool => PureSchema::Bool,
                PrimitiveType::U8 => PureSchema::U8,
                PrimitiveType::U16 => PureSchema::U16,
                PrimitiveType::U32 => PureSchema::U32,
                PrimitiveType::U64 => PureSchema::U64,
                PrimitiveType::U128 => PureSchema::U128,
                PrimitiveType::U256 => PureSchema::U256,
                PrimitiveType::Address => PureSchema::Address,
            },
            OpenMoveTypeSignatureBody::Vector { vector } => {
                PureSchema::Vector(Box::new(Self::from_signature_body(vector)?))
            }
            OpenMoveTypeSignatureBody::Datatype { datatype } => {
                let path = (
                    datatype.package,
                    datatype.module.as_str(),
                    datatype.type_name.as_str(),
                );
                match path {
                    (Address::ONE, "string", "String") | (Address::ONE, "ascii", "String") => {
                        PureSchema::String
                    }
                    (Address::TWO, "object", "ID") => PureSchema::Id,
                    (Address::ONE, "option", "Option") => {
                        let inner = datatype.type_parameters.first()?;
                        PureSchema::Option(Box::new(Self::from_signature_body(inner)?))
                    }
                    _ => return None,
                }
            }
            OpenMoveTypeSignatureBody::TypeParameter { .. } => return None,
        })
    }

    /// BCS-encode a raw JSON value under this schema.
    pub fn serialize_value(&self, value: &Value) -> Result<Vec<u8>, Error> {
        let mut out = Vec::new();
        self.encode(value, &mut out)?;
        Ok(out)
    }

    fn encode(&self, value: &Value, out: &mut Vec<u8>) -> Result<(), Error> {
        match self {
            PureSchema::Bool => {
                let v = value
                    .as_bool()
                    .ok_or_else(|| mismatch("bool", value))?;
                out.push(v as u8);
            }
            PureSchema::U8 => out.push(parse_uint(value, u8::MAX as u128)? as u8),
            PureSchema::U16 => {
                out.extend_from_slice(&(parse_uint(value, u16::MAX as u128)? as u16).to_le_bytes())
            }
            PureSchema::U32 => {
                out.extend_from_slice(&(parse_uint(value, u32::MAX as u128)? as u32).to_le_bytes())
            }
            PureSchema::U64 => {
                out.extend_from_slice(&(parse_uint(value, u64::MAX as u128)? as u64).to_le_bytes())
            }
            PureSchema::U128 => {
                out.extend_from_slice(&parse_uint(value, u128::MAX)?.to_le_bytes())
            }
            PureSchema::U256 => out.extend_from_slice(&parse_u256(value)?),
            PureSchema::Address | PureSchema::Id => {
                let text = value
                    .as_str()
                    .ok_or_else(|| mismatch("address string", value))?;
                let address = Address::from_str(text)?;
                out.extend_from_slice(address.as_bytes());
            }
            PureSchema::String => {
                let text = value
                    .as_str()
                    .ok_or_else(|| mismatch("string", value))?;
                write_uleb128(text.len() as u64, out);
                out.extend_from_slice(text.as_bytes());
            }
            PureSchema::Vector(inner) => {
                let items = value
                    .as_array()
                    .ok_or_else(|| mismatch("array", value))?;
                write_uleb128(items.len() as u64, out);
                for item in items {
                    inner.encode(item, out)?;
                }
            }
            PureSchema::Option(inner) => match value {
                Value::Null => out.push(0),
                some => {
                    out.push(1);
                    inner.encode(some, out)?;
                }
            },
        }
        Ok(())
    }
}

fn mismatch(expected: &str, value: &Value) -> Error {
    Error::validation("pure", format!("expected {expected}, got {value}"))
}

/// Accept JSON numbers and decimal strings for integer schemas.
fn parse_uint(value: &Value, max: u128) -> Result<u128, Error> {
    let parsed = match value {
        Value::Number(n) => n
            .as_u64()
            .map(u128::from)
            .ok_or_else(|| mismatch("unsigned integer", value))?,
        Value::String(s) => s
            .parse::<u128>()
            .map_err(|_| mismatch("unsigned integer", value))?,
        _ => return Err(mismatch("unsigned integer", value)),
    };
    if parsed > max {
        return Err(Error::validation(
            "pure",
            format!("{parsed} does not fit the target integer width"),
        ));
    }
    Ok(parsed)
}

/// Decimal text (or a JSON number) into 32 little-endian bytes.
fn parse_u256(value: &Value) -> Result<[u8; 32], Error> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        _ => return Err(mismatch("unsigned integer", value)),
    };
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(mismatch("unsigned integer", value));
    }
    let mut bytes = [0u8; 32];
    for digit in text.bytes() {
        let mut carry = (digit - b'0') as u32;
        for byte in bytes.iter_mut() {
            let v = *byte as u32 * 10 + carry;
            *byte = (v & 0xff) as u8;
            carry = v >> 8;
        }
        if carry != 0 {
            return Err(Error::validation("pure", "value does not fit in u256"));
        }
    }
    Ok(bytes)
}

pub(crate) fn write_uleb128(mut value: u64, out: &mut Vec<u8>) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if value == 0 {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn u64_accepts_numbers_and_strings() {
        let schema = PureSchema::U64;
        assert_eq!(
            schema.serialize_value(&json!(42)).unwrap(),
            bcs::to_bytes(&42u64).unwrap()
        );
        assert_eq!(
            schema.serialize_value(&json!("42")).unwrap(),
            bcs::to_bytes(&42u64).unwrap()
        );
        assert!(schema.serialize_value(&json!(true)).is_err());
    }

    #[test]
    fn integer_width_is_enforced() {
        assert!(PureSchema::U8.serialize_value(&json!(256)).is_err());
        assert!(PureSchema::U16.serialize_value(&json!(65536)).is_err());
    }

    #[test]
    fn address_matches_bcs_of_fixed_bytes() {
        let addr: Address = "0xbb".parse().unwrap();
        assert_eq!(
            PureSchema::Address
                .serialize_value(&json!(addr.to_string()))
                .unwrap(),
            bcs::to_bytes(&addr).unwrap()
        );
    }

    #[test]
    fn strings_and_vectors_are_length_prefixed() {
        assert_eq!(
            PureSchema::String.serialize_value(&json!("hi")).unwrap(),
            bcs::to_bytes(&"hi".to_string()).unwrap()
        );
        assert_eq!(
            PureSchema::Vector(Box::new(PureSchema::U8))
                .serialize_value(&json!([1, 2, 3]))
                .unwrap(),
            bcs::to_bytes(&vec![1u8, 2, 3]).unwrap()
        );
    }

    #[test]
    fn option_encoding() {
        let schema = PureSchema::Option(Box::new(PureSchema::U64));
        assert_eq!(
            schema.serialize_value(&json!(null)).unwrap(),
            bcs::to_bytes(&Option::<u64>::None).unwrap()
        );
        assert_eq!(
            schema.serialize_value(&json!(7)).unwrap(),
            bcs::to_bytes(&Some(7u64)).unwrap()
        );
    }

    #[test]
    fn u128_and_u256_from_decimal_strings() {
        let big = u128::from(u64::MAX) + 1;
        assert_eq!(
            PureSchema::U128
                .serialize_value(&json!(big.to_string()))
                .unwrap(),
            bcs::to_bytes(&big).unwrap()
        );

        let mut expected = [0u8; 32];
        expected[..16].copy_from_slice(&u128::MAX.to_le_bytes());
        assert_eq!(
            PureSchema::U256
                .serialize_value(&json!(u128::MAX.to_string()))
                .unwrap(),
            expected
        );
    }

    #[test]
    fn classification_covers_strings_ids_and_options() {
        use crate::signature::{DatatypeSignature, OpenMoveTypeSignatureBody as Body};

        let string_body = Body::Datatype {
            datatype: DatatypeSignature {
                package: Address::ONE,
                module: "string".into(),
                type_name: "String".into(),
                type_parameters: vec![],
            },
        };
        assert_eq!(
            PureSchema::from_signature_body(&string_body),
            Some(PureSchema::String)
        );

        let opt_u64 = Body::Datatype {
            datatype: DatatypeSignature {
                package: Address::ONE,
                module: "option".into(),
                type_name: "Option".into(),
                type_parameters: vec![Body::Primitive(PrimitiveType::U64)],
            },
        };
        assert_eq!(
            PureSchema::from_signature_body(&opt_u64),
            Some(PureSchema::Option(Box::new(PureSchema::U64)))
        );

        let coin = Body::Datatype {
            datatype: DatatypeSignature {
                package: Address::TWO,
                module: "coin".into(),
                type_name: "Coin".into(),
                type_parameters: vec![],
            },
        };
        assert_eq!(PureSchema::from_signature_body(&coin), None);
    }
}
