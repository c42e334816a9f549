//! # Type Codes
//!
//! This module provides the canonical `TypeCode` enum: the one-byte tag used
//! in the binary encoding to indicate the formatting of succeeding bytes.
//!
//! ## Design Principles
//!
//! 1. **Closed, append-only**: the discriminant values are a wire contract
//!    and are never renumbered
//! 2. **Storage-efficient**: `#[repr(u8)]` for a single-byte discriminant
//! 3. **Capability-driven**: read/write paths dispatch on capability
//!    predicates (`is_fixed`, `is_scope`, ...) instead of downcasting
//! 4. **No global state**: the byte->type registry is the enum itself
//!
//! ## Code Space
//!
//! | Range | Category |
//! |-------|----------|
//! | 1-3 | null and booleans (value lives in the code byte) |
//! | 5-14 | integers, fixed and varint |
//! | 15-24 | floats, decimal, timestamps, uuid, strings, blobs, object id |
//! | 30-53 | scopes; odd value = immutable variant of the preceding even one |
//! | 68-69 | schema-rooted (UDT) scopes |
//! | 70 | end-of-scope marker |
//!
//! ## Storage Classes
//!
//! Fixed-width primitives store at compiled offsets in the fixed region;
//! `Utf8`, `Binary`, `VarInt` and `VarUInt` may store length-prefixed in the
//! variable region; every non-scope type may also store sparse. Scope types
//! are sparse-only.

use crate::error::{Result, RowError};

/// One-byte wire tag for every value and scope kind in the format.
///
/// The discriminants are the binary encoding and are append-only.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCode {
    Null = 1,
    BooleanFalse = 2,
    Boolean = 3,

    Int8 = 5,
    Int16 = 6,
    Int32 = 7,
    Int64 = 8,
    UInt8 = 9,
    UInt16 = 10,
    UInt32 = 11,
    UInt64 = 12,
    VarInt = 13,
    VarUInt = 14,

    Float32 = 15,
    Float64 = 16,
    Decimal = 17,

    DateTime = 18,
    Guid = 19,

    Utf8 = 20,
    Binary = 21,

    Float128 = 22,
    UnixDateTime = 23,
    ObjectId = 24,

    ObjectScope = 30,
    ImmutableObjectScope = 31,
    ArrayScope = 32,
    ImmutableArrayScope = 33,
    TypedArrayScope = 34,
    ImmutableTypedArrayScope = 35,
    TupleScope = 36,
    ImmutableTupleScope = 37,
    TypedTupleScope = 38,
    ImmutableTypedTupleScope = 39,
    MapScope = 40,
    ImmutableMapScope = 41,
    TypedMapScope = 42,
    ImmutableTypedMapScope = 43,
    SetScope = 44,
    ImmutableSetScope = 45,
    TypedSetScope = 46,
    ImmutableTypedSetScope = 47,
    NullableScope = 48,
    ImmutableNullableScope = 49,
    TaggedScope = 50,
    ImmutableTaggedScope = 51,
    Tagged2Scope = 52,
    ImmutableTagged2Scope = 53,

    Schema = 68,
    ImmutableSchema = 69,

    EndScope = 70,
}

impl TypeCode {
    /// Returns the intrinsic byte size of a fixed-width type, or `None` for
    /// variable-length and scope types.
    ///
    /// `Boolean` and `Null` report a size for sparse storage; in the fixed
    /// region their value lives in the bitmask and occupies no field bytes.
    pub fn fixed_size(self) -> Option<usize> {
        match self {
            TypeCode::Null => Some(0),
            TypeCode::Boolean | TypeCode::BooleanFalse => Some(0),
            TypeCode::Int8 | TypeCode::UInt8 => Some(1),
            TypeCode::Int16 | TypeCode::UInt16 => Some(2),
            TypeCode::Int32 | TypeCode::UInt32 | TypeCode::Float32 => Some(4),
            TypeCode::Int64
            | TypeCode::UInt64
            | TypeCode::Float64
            | TypeCode::DateTime
            | TypeCode::UnixDateTime => Some(8),
            TypeCode::ObjectId => Some(12),
            TypeCode::Guid | TypeCode::Decimal | TypeCode::Float128 => Some(16),
            _ => None,
        }
    }

    /// True if the type has an intrinsic fixed width.
    pub fn is_fixed(self) -> bool {
        self.fixed_size().is_some()
    }

    /// True for the 7-bit variable-length integer types.
    pub fn is_varint(self) -> bool {
        matches!(self, TypeCode::VarInt | TypeCode::VarUInt)
    }

    /// True for the boolean codes (the value is the code byte itself).
    pub fn is_boolean(self) -> bool {
        matches!(self, TypeCode::Boolean | TypeCode::BooleanFalse)
    }

    /// True for the null code.
    pub fn is_null(self) -> bool {
        self == TypeCode::Null
    }

    /// True if the type may be declared as a variable-region column.
    pub fn allow_variable(self) -> bool {
        matches!(
            self,
            TypeCode::Utf8 | TypeCode::Binary | TypeCode::VarInt | TypeCode::VarUInt
        )
    }

    /// True for every scope code, including schema-rooted scopes.
    pub fn is_scope(self) -> bool {
        let value = self as u8;
        (30..=53).contains(&value) || self.is_udt()
    }

    /// True for schema-rooted (UDT) scopes.
    pub fn is_udt(self) -> bool {
        matches!(self, TypeCode::Schema | TypeCode::ImmutableSchema)
    }

    /// True for scopes whose children are addressed by position.
    pub fn is_indexed_scope(self) -> bool {
        matches!(
            self.canonical(),
            TypeCode::ArrayScope
                | TypeCode::TypedArrayScope
                | TypeCode::TupleScope
                | TypeCode::TypedTupleScope
                | TypeCode::TypedMapScope
                | TypeCode::TypedSetScope
                | TypeCode::NullableScope
                | TypeCode::TaggedScope
                | TypeCode::Tagged2Scope
        )
    }

    /// True for scopes that prefix a varuint element count.
    pub fn is_sized_scope(self) -> bool {
        matches!(
            self.canonical(),
            TypeCode::TypedArrayScope | TypeCode::TypedMapScope | TypeCode::TypedSetScope
        )
    }

    /// True for scopes whose arity is fixed by their type arguments.
    pub fn is_fixed_arity(self) -> bool {
        matches!(
            self.canonical(),
            TypeCode::TypedTupleScope
                | TypeCode::NullableScope
                | TypeCode::TaggedScope
                | TypeCode::Tagged2Scope
        )
    }

    /// True for scopes that enforce uniqueness over their children.
    pub fn is_unique_scope(self) -> bool {
        matches!(
            self.canonical(),
            TypeCode::TypedMapScope | TypeCode::TypedSetScope
        )
    }

    /// True for scopes whose element types come from type arguments.
    pub fn is_typed_scope(self) -> bool {
        matches!(
            self.canonical(),
            TypeCode::TypedArrayScope
                | TypeCode::TypedTupleScope
                | TypeCode::TypedMapScope
                | TypeCode::TypedSetScope
                | TypeCode::NullableScope
                | TypeCode::TaggedScope
                | TypeCode::Tagged2Scope
        ) || self.is_udt()
    }

    /// True for the immutable variant of a scope code.
    pub fn is_immutable(self) -> bool {
        self.is_scope() && (self as u8) & 1 == 1
    }

    /// Canonical (mutable) form of a scope code; identity for non-scopes.
    ///
    /// Scope codes pair mutable/immutable on even/odd adjacent values, so
    /// canonicalization clears the low bit.
    pub fn canonical(self) -> TypeCode {
        if self.is_scope() && self.is_immutable() {
            // Immutable codes sit one above their mutable pairing.
            TypeCode::try_from((self as u8) - 1).unwrap_or(self)
        } else {
            self
        }
    }

    /// Immutable variant of a scope code; identity for non-scopes.
    pub fn immutable(self) -> TypeCode {
        if self.is_scope() && !self.is_immutable() {
            TypeCode::try_from((self as u8) + 1).unwrap_or(self)
        } else {
            self
        }
    }

    /// True when a sparse value of this type can never elide its code byte,
    /// because the value itself is carried in the code (`Null`, `Boolean`,
    /// `BooleanFalse`).
    pub fn always_requires_type_code(self) -> bool {
        matches!(
            self,
            TypeCode::Null | TypeCode::Boolean | TypeCode::BooleanFalse
        )
    }

    /// Number of type arguments this scope code carries on the wire.
    ///
    /// `TypedTupleScope` is variadic (varuint count prefix); `Schema` carries
    /// a schema id instead of type arguments.
    pub fn type_arg_arity(self) -> Option<usize> {
        match self.canonical() {
            TypeCode::TypedArrayScope
            | TypeCode::TypedSetScope
            | TypeCode::NullableScope
            | TypeCode::TaggedScope => Some(1),
            TypeCode::TypedMapScope | TypeCode::Tagged2Scope => Some(2),
            _ => None,
        }
    }

    /// Wire name of the type, matching the original format's vocabulary.
    pub fn name(self) -> &'static str {
        match self {
            TypeCode::Null => "null",
            TypeCode::BooleanFalse => "bool_false",
            TypeCode::Boolean => "bool",
            TypeCode::Int8 => "int8",
            TypeCode::Int16 => "int16",
            TypeCode::Int32 => "int32",
            TypeCode::Int64 => "int64",
            TypeCode::UInt8 => "uint8",
            TypeCode::UInt16 => "uint16",
            TypeCode::UInt32 => "uint32",
            TypeCode::UInt64 => "uint64",
            TypeCode::VarInt => "varint",
            TypeCode::VarUInt => "varuint",
            TypeCode::Float32 => "float32",
            TypeCode::Float64 => "float64",
            TypeCode::Decimal => "decimal",
            TypeCode::DateTime => "datetime",
            TypeCode::Guid => "guid",
            TypeCode::Utf8 => "utf8",
            TypeCode::Binary => "binary",
            TypeCode::Float128 => "float128",
            TypeCode::UnixDateTime => "unixdatetime",
            TypeCode::ObjectId => "objectid",
            TypeCode::ObjectScope => "object",
            TypeCode::ImmutableObjectScope => "im_object",
            TypeCode::ArrayScope => "array",
            TypeCode::ImmutableArrayScope => "im_array",
            TypeCode::TypedArrayScope => "array_t",
            TypeCode::ImmutableTypedArrayScope => "im_array_t",
            TypeCode::TupleScope => "tuple",
            TypeCode::ImmutableTupleScope => "im_tuple",
            TypeCode::TypedTupleScope => "tuple_t",
            TypeCode::ImmutableTypedTupleScope => "im_tuple_t",
            TypeCode::MapScope => "map",
            TypeCode::ImmutableMapScope => "im_map",
            TypeCode::TypedMapScope => "map_t",
            TypeCode::ImmutableTypedMapScope => "im_map_t",
            TypeCode::SetScope => "set",
            TypeCode::ImmutableSetScope => "im_set",
            TypeCode::TypedSetScope => "set_t",
            TypeCode::ImmutableTypedSetScope => "im_set_t",
            TypeCode::NullableScope => "nullable",
            TypeCode::ImmutableNullableScope => "im_nullable",
            TypeCode::TaggedScope => "tagged",
            TypeCode::ImmutableTaggedScope => "im_tagged",
            TypeCode::Tagged2Scope => "tagged2",
            TypeCode::ImmutableTagged2Scope => "im_tagged2",
            TypeCode::Schema => "udt",
            TypeCode::ImmutableSchema => "im_udt",
            TypeCode::EndScope => "end_scope",
        }
    }

    /// Decodes a code byte, rejecting unknown values.
    pub fn decode(value: u8) -> Result<TypeCode> {
        TypeCode::try_from(value)
    }
}

impl std::fmt::Display for TypeCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for TypeCode {
    type Error = RowError;

    fn try_from(value: u8) -> Result<Self> {
        let code = match value {
            1 => TypeCode::Null,
            2 => TypeCode::BooleanFalse,
            3 => TypeCode::Boolean,
            5 => TypeCode::Int8,
            6 => TypeCode::Int16,
            7 => TypeCode::Int32,
            8 => TypeCode::Int64,
            9 => TypeCode::UInt8,
            10 => TypeCode::UInt16,
            11 => TypeCode::UInt32,
            12 => TypeCode::UInt64,
            13 => TypeCode::VarInt,
            14 => TypeCode::VarUInt,
            15 => TypeCode::Float32,
            16 => TypeCode::Float64,
            17 => TypeCode::Decimal,
            18 => TypeCode::DateTime,
            19 => TypeCode::Guid,
            20 => TypeCode::Utf8,
            21 => TypeCode::Binary,
            22 => TypeCode::Float128,
            23 => TypeCode::UnixDateTime,
            24 => TypeCode::ObjectId,
            30 => TypeCode::ObjectScope,
            31 => TypeCode::ImmutableObjectScope,
            32 => TypeCode::ArrayScope,
            33 => TypeCode::ImmutableArrayScope,
            34 => TypeCode::TypedArrayScope,
            35 => TypeCode::ImmutableTypedArrayScope,
            36 => TypeCode::TupleScope,
            37 => TypeCode::ImmutableTupleScope,
            38 => TypeCode::TypedTupleScope,
            39 => TypeCode::ImmutableTypedTupleScope,
            40 => TypeCode::MapScope,
            41 => TypeCode::ImmutableMapScope,
            42 => TypeCode::TypedMapScope,
            43 => TypeCode::ImmutableTypedMapScope,
            44 => TypeCode::SetScope,
            45 => TypeCode::ImmutableSetScope,
            46 => TypeCode::TypedSetScope,
            47 => TypeCode::ImmutableTypedSetScope,
            48 => TypeCode::NullableScope,
            49 => TypeCode::ImmutableNullableScope,
            50 => TypeCode::TaggedScope,
            51 => TypeCode::ImmutableTaggedScope,
            52 => TypeCode::Tagged2Scope,
            53 => TypeCode::ImmutableTagged2Scope,
            68 => TypeCode::Schema,
            69 => TypeCode::ImmutableSchema,
            70 => TypeCode::EndScope,
            _ => {
                return Err(RowError::InvalidRow(format!(
                    "invalid type code: {}",
                    value
                )))
            }
        };
        Ok(code)
    }
}
