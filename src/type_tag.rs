use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::address::Address;
use crate::error::Error;

/// A Move identifier: module and function names, struct names.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identifier(String);

impl Identifier {
    pub fn new(s: impl Into<String>) -> Result<Self, Error> {
        let s = s.into();
        if is_valid_identifier(&s) {
            Ok(Self(s))
        } else {
            Err(Error::InvalidIdentifier(s))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_valid_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl FromStr for Identifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier({})", self.0)
    }
}

impl Serialize for Identifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Identifier::new(s).map_err(serde::de::Error::custom)
    }
}

/// A fully qualified Move struct type, e.g. `0x2::coin::Coin<0x2::sui::SUI>`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StructTag {
    pub address: Address,
    pub module: Identifier,
    pub name: Identifier,
    pub type_params: Vec<TypeTag>,
}

impl fmt::Display for StructTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}::{}", self.address, self.module, self.name)?;
        if let Some((first, rest)) = self.type_params.split_first() {
            write!(f, "<{first}")?;
            for param in rest {
                write!(f, ", {param}")?;
            }
            write!(f, ">")?;
        }
        Ok(())
    }
}

impl FromStr for StructTag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match TypeTag::from_str(s)? {
            TypeTag::Struct(tag) => Ok(*tag),
            _ => Err(Error::InvalidTypeTag(s.to_owned())),
        }
    }
}

/// A Move type tag. The variant order is the canonical wire order.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Bool,
    U8,
    U64,
    U128,
    Address,
    Signer,
    Vector(Box<TypeTag>),
    Struct(Box<StructTag>),
    U16,
    U32,
    U256,
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeTag::Bool => f.write_str("bool"),
            TypeTag::U8 => f.write_str("u8"),
            TypeTag::U16 => f.write_str("u16"),
            TypeTag::U32 => f.write_str("u32"),
            TypeTag::U64 => f.write_str("u64"),
            TypeTag::U128 => f.write_str("u128"),
            TypeTag::U256 => f.write_str("u256"),
            TypeTag::Address => f.write_str("address"),
            TypeTag::Signer => f.write_str("signer"),
            TypeTag::Vector(inner) => write!(f, "vector<{inner}>"),
            TypeTag::Struct(tag) => tag.fmt(f),
        }
    }
}

impl FromStr for TypeTag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_type_tag(s.trim()).ok_or_else(|| Error::InvalidTypeTag(s.to_owned()))
    }
}

fn parse_type_tag(s: &str) -> Option<TypeTag> {
    Some(match s {
        "bool" => TypeTag::Bool,
        "u8" => TypeTag::U8,
        "u16" => TypeTag::U16,
        "u32" => TypeTag::U32,
        "u64" => TypeTag::U64,
        "u128" => TypeTag::U128,
        "u256" => TypeTag::U256,
        "address" => TypeTag::Address,
        "signer" => TypeTag::Signer,
        _ => {
            if let Some(inner) = s.strip_prefix("vector<").and_then(|s| s.strip_suffix('>')) {
                TypeTag::Vector(Box::new(parse_type_tag(inner.trim())?))
            } else {
                TypeTag::Struct(Box::new(parse_struct_tag(s)?))
            }
        }
    })
}

fn parse_struct_tag(s: &str) -> Option<StructTag> {
    let (head, params) = match s.split_once('<') {
        Some((head, rest)) => {
            let inner = rest.strip_suffix('>')?;
            (head, split_type_params(inner)?)
        }
        None => (s, Vec::new()),
    };

    let mut parts = head.split("::");
    let address = parts.next()?.trim().parse().ok()?;
    let module = parts.next()?.trim().parse().ok()?;
    let name = parts.next()?.trim().parse().ok()?;
    if parts.next().is_some() {
        return None;
    }

    Some(StructTag {
        address,
        module,
        name,
        type_params: params,
    })
}

/// Split `A, B<C, D>, E` at top-level commas only.
fn split_type_params(s: &str) -> Option<Vec<TypeTag>> {
    let mut params = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.checked_sub(1)?,
            ',' if depth == 0 => {
                params.push(parse_type_tag(s[start..i].trim())?);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return None;
    }
    let tail = s[start..].trim();
    if !tail.is_empty() {
        params.push(parse_type_tag(tail)?);
    }
    Some(params)
}

// The binary form needs the canonical variant indices, the readable form is
// the display string. A private mirror enum supplies the derived binary
// encoding.

#[derive(Serialize, Deserialize)]
enum BinaryTypeTag {
    Bool,
    U8,
    U64,
    U128,
    Address,
    Signer,
    Vector(Box<BinaryTypeTag>),
    Struct(Box<BinaryStructTag>),
    U16,
    U32,
    U256,
}

#[derive(Serialize, Deserialize)]
struct BinaryStructTag {
    address: Address,
    module: Identifier,
    name: Identifier,
    type_params: Vec<BinaryTypeTag>,
}

impl From<&TypeTag> for BinaryTypeTag {
    fn from(tag: &TypeTag) -> Self {
        match tag {
            TypeTag::Bool => BinaryTypeTag::Bool,
            TypeTag::U8 => BinaryTypeTag::U8,
            TypeTag::U16 => BinaryTypeTag::U16,
            TypeTag::U32 => BinaryTypeTag::U32,
            TypeTag::U64 => BinaryTypeTag::U64,
            TypeTag::U128 => BinaryTypeTag::U128,
            TypeTag::U256 => BinaryTypeTag::U256,
            TypeTag::Address => BinaryTypeTag::Address,
            TypeTag::Signer => BinaryTypeTag::Signer,
            TypeTag::Vector(inner) => BinaryTypeTag::Vector(Box::new(inner.as_ref().into())),
            TypeTag::Struct(tag) => BinaryTypeTag::Struct(Box::new(BinaryStructTag {
                address: tag.address,
                module: tag.module.clone(),
                name: tag.name.clone(),
                type_params: tag.type_params.iter().map(Into::into).collect(),
            })),
        }
    }
}

impl From<BinaryTypeTag> for TypeTag {
    fn from(tag: BinaryTypeTag) -> Self {
        match tag {
            BinaryTypeTag::Bool => TypeTag::Bool,
            BinaryTypeTag::U8 => TypeTag::U8,
            BinaryTypeTag::U16 => TypeTag::U16,
            BinaryTypeTag::U32 => TypeTag::U32,
            BinaryTypeTag::U64 => TypeTag::U64,
            BinaryTypeTag::U128 => TypeTag::U128,
            BinaryTypeTag::U256 => TypeTag::U256,
            BinaryTypeTag::Address => TypeTag::Address,
            BinaryTypeTag::Signer => TypeTag::Signer,
            BinaryTypeTag::Vector(inner) => TypeTag::Vector(Box::new((*inner).into())),
            BinaryTypeTag::Struct(tag) => TypeTag::Struct(Box::new(StructTag {
                address: tag.address,
                module: tag.module,
                name: tag.name,
                type_params: tag.type_params.into_iter().map(Into::into).collect(),
            })),
        }
    }
}

impl Serialize for TypeTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.collect_str(self)
        } else {
            BinaryTypeTag::from(self).serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for TypeTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            s.parse().map_err(serde::de::Error::custom)
        } else {
            BinaryTypeTag::deserialize(deserializer).map(Into::into)
        }
    }
}

impl Serialize for StructTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.collect_str(self)
        } else {
            BinaryTypeTag::from(&TypeTag::Struct(Box::new(self.clone()))).serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for StructTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = TypeTag::deserialize(deserializer)?;
        match tag {
            TypeTag::Struct(tag) => Ok(*tag),
            other => Err(serde::de::Error::custom(format!(
                "expected a struct type, got {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_primitives() {
        assert_eq!("u64".parse::<TypeTag>().unwrap(), TypeTag::U64);
        assert_eq!("bool".parse::<TypeTag>().unwrap(), TypeTag::Bool);
        assert_eq!("address".parse::<TypeTag>().unwrap(), TypeTag::Address);
    }

    #[test]
    fn parses_nested_vectors() {
        let tag: TypeTag = "vector<vector<u8>>".parse().unwrap();
        assert_eq!(
            tag,
            TypeTag::Vector(Box::new(TypeTag::Vector(Box::new(TypeTag::U8))))
        );
    }

    #[test]
    fn struct_tag_round_trips_through_display() {
        let text = "0x0000000000000000000000000000000000000000000000000000000000000002\
                    ::coin::Coin<0x0000000000000000000000000000000000000000000000000000000000000002::sui::SUI>";
        let tag: TypeTag = text.parse().unwrap();
        assert_eq!(tag.to_string().parse::<TypeTag>().unwrap(), tag);
    }

    #[test]
    fn generic_params_split_at_top_level_only() {
        let tag: StructTag = "0x1::pair::Pair<0x2::coin::Coin<0x2::sui::SUI>, u64>"
            .parse()
            .unwrap();
        assert_eq!(tag.type_params.len(), 2);
        assert_eq!(tag.type_params[1], TypeTag::U64);
    }

    #[test]
    fn rejects_malformed_tags() {
        assert!("vector<".parse::<TypeTag>().is_err());
        assert!("0x2::coin".parse::<TypeTag>().is_err());
        assert!("0x2::coin::Coin<".parse::<TypeTag>().is_err());
    }

    #[test]
    fn binary_indices_follow_canonical_order() {
        assert_eq!(bcs::to_bytes(&TypeTag::Bool).unwrap(), vec![0]);
        assert_eq!(bcs::to_bytes(&TypeTag::U64).unwrap(), vec![2]);
        assert_eq!(bcs::to_bytes(&TypeTag::U16).unwrap(), vec![8]);
        assert_eq!(bcs::to_bytes(&TypeTag::U256).unwrap(), vec![10]);
        let vec_u8 = TypeTag::Vector(Box::new(TypeTag::U8));
        assert_eq!(bcs::to_bytes(&vec_u8).unwrap(), vec![6, 1]);
        assert_eq!(bcs::from_bytes::<TypeTag>(&[6, 1]).unwrap(), vec_u8);
    }
}
