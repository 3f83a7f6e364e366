use std::fmt;

use crate::error::DecodeError;

/// The closed set of value and type categories.
///
/// Every value has exactly one kind; its discriminant is the tag byte that
/// prefixes the value on the wire. `Cycle` and `Union` only ever appear
/// inside type descriptions, never as the kind of a runtime value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Kind {
    Bool = 0,
    Number = 1,
    String = 2,
    Blob = 3,
    Value = 4,
    List = 5,
    Map = 6,
    Ref = 7,
    Set = 8,
    Struct = 9,
    Type = 10,
    Cycle = 11,
    Union = 12,
}

impl Kind {
    /// Every kind, in tag order.
    pub const ALL: [Kind; 13] = [
        Kind::Bool,
        Kind::Number,
        Kind::String,
        Kind::Blob,
        Kind::Value,
        Kind::List,
        Kind::Map,
        Kind::Ref,
        Kind::Set,
        Kind::Struct,
        Kind::Type,
        Kind::Cycle,
        Kind::Union,
    ];

    /// The wire tag.
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Parse a wire tag.
    pub fn from_u8(tag: u8) -> Result<Self, DecodeError> {
        Self::ALL
            .get(tag as usize)
            .copied()
            .ok_or(DecodeError::UnknownKind { tag })
    }

    /// Human-readable name, as used by type descriptions.
    pub fn name(self) -> &'static str {
        match self {
            Kind::Bool => "Bool",
            Kind::Number => "Number",
            Kind::String => "String",
            Kind::Blob => "Blob",
            Kind::Value => "Value",
            Kind::List => "List",
            Kind::Map => "Map",
            Kind::Ref => "Ref",
            Kind::Set => "Set",
            Kind::Struct => "Struct",
            Kind::Type => "Type",
            Kind::Cycle => "Cycle",
            Kind::Union => "Union",
        }
    }

    /// Kinds whose types carry no payload.
    pub fn is_primitive(self) -> bool {
        matches!(
            self,
            Kind::Bool | Kind::Number | Kind::String | Kind::Blob | Kind::Value | Kind::Type
        )
    }

    /// Kinds whose values are totally ordered by content rather than by hash.
    pub fn is_ordered(self) -> bool {
        matches!(self, Kind::Number | Kind::String | Kind::Ref)
    }

    /// Collections addressed by position rather than by key.
    pub fn is_positional(self) -> bool {
        matches!(self, Kind::List | Kind::Blob)
    }

    /// Number of element types a collection type of this kind carries.
    pub fn elem_arity(self) -> usize {
        match self {
            Kind::List | Kind::Set | Kind::Ref => 1,
            Kind::Map => 2,
            _ => 0,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
