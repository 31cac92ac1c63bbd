use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::client::NormalizedType;

/// Reference kind of a Move function parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefKind {
    #[serde(rename = "&")]
    Immutable,
    #[serde(rename = "&mut")]
    Mutable,
}

/// A Move function parameter signature with generics left open, as collected
/// while matching raw inputs against normalized function signatures.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OpenMoveTypeSignature {
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<RefKind>,
    pub body: OpenMoveTypeSignatureBody,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    Address,
    Bool,
    U8,
    U16,
    U32,
    U64,
    U128,
    U256,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OpenMoveTypeSignatureBody {
    Primitive(PrimitiveType),
    Vector {
        vector: Box<OpenMoveTypeSignatureBody>,
    },
    Datatype {
        datatype: DatatypeSignature,
    },
    TypeParameter {
        #[serde(rename = "typeParameter")]
        type_parameter: u16,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DatatypeSignature {
    pub package: Address,
    pub module: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(
        rename = "typeParameters",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub type_parameters: Vec<OpenMoveTypeSignatureBody>,
}

impl OpenMoveTypeSignature {
    /// Peel reference wrappers off a normalized parameter type.
    pub fn from_normalized(ty: &NormalizedType) -> Self {
        match ty {
            NormalizedType::Reference(inner) => OpenMoveTypeSignature {
                reference: Some(RefKind::Immutable),
                body: OpenMoveTypeSignatureBody::from_normalized(inner),
            },
            NormalizedType::MutableReference(inner) => OpenMoveTypeSignature {
                reference: Some(RefKind::Mutable),
                body: OpenMoveTypeSignatureBody::from_normalized(inner),
            },
            other => OpenMoveTypeSignature {
                reference: None,
                body: OpenMoveTypeSignatureBody::from_normalized(other),
            },
        }
    }

    pub fn is_by_value(&self) -> bool {
        self.reference.is_none()
    }

    pub fn is_mutable_ref(&self) -> bool {
        self.reference == Some(RefKind::Mutable)
    }

    /// Whether this parameter is typed `0x2::transfer::Receiving<_>`.
    pub fn is_receiving(&self) -> bool {
        matches!(
            &self.body,
            OpenMoveTypeSignatureBody::Datatype { datatype }
                if datatype.package == Address::TWO
                    && datatype.module == "transfer"
                    && datatype.type_name == "Receiving"
        )
    }
}

impl OpenMoveTypeSignatureBody {
    pub fn from_normalized(ty: &NormalizedType) -> Self {
        match ty {
            NormalizedType::Bool => Self::Primitive(PrimitiveType::Bool),
            NormalizedType::U8 => Self::Primitive(PrimitiveType::U8),
            NormalizedType::U16 => Self::Primitive(PrimitiveType::U16),
            NormalizedType::U32 => Self::Primitive(PrimitiveType::U32),
            NormalizedType::U64 => Self::Primitive(PrimitiveType::U64),
            NormalizedType::U128 => Self::Primitive(PrimitiveType::U128),
            NormalizedType::U256 => Self::Primitive(PrimitiveType::U256),
            NormalizedType::Address | NormalizedType::Signer => {
                Self::Primitive(PrimitiveType::Address)
            }
            NormalizedType::Vector(inner) => Self::Vector {
                vector: Box::new(Self::from_normalized(inner)),
            },
            NormalizedType::Struct(datatype) => Self::Datatype {
                datatype: DatatypeSignature {
                    package: datatype.address,
                    module: datatype.module.clone(),
                    type_name: datatype.name.clone(),
                    type_parameters: datatype
                        .type_arguments
                        .iter()
                        .map(Self::from_normalized)
                        .collect(),
                },
            },
            NormalizedType::TypeParameter(index) => Self::TypeParameter {
                type_parameter: *index,
            },
            NormalizedType::Reference(inner) | NormalizedType::MutableReference(inner) => {
                Self::from_normalized(inner)
            }
        }
    }
}

/// The trailing `&mut TxContext` / `&TxContext` parameter that callers never
/// supply explicitly.
pub(crate) fn is_tx_context(ty: &NormalizedType) -> bool {
    let inner = match ty {
        NormalizedType::Reference(inner) | NormalizedType::MutableReference(inner) => inner,
        other => other,
    };
    matches!(
        inner,
        NormalizedType::Struct(datatype)
            if datatype.address == Address::TWO
                && datatype.module == "tx_context"
                && datatype.name == "TxContext"
    )
}
