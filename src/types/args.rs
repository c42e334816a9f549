//! # Type Arguments
//!
//! Generic nesting is described by `TypeArgument` trees: a type code plus,
//! recursively, its own arguments, or, for user-defined-type references, a
//! schema identifier instead of an argument list. Argument lists are value
//! types with structural equality and hashing, so they can key caches and be
//! compared across independently compiled layouts.
//!
//! ## Wire Codec
//!
//! Scope values carry their type arguments in the sparse encoding:
//!
//! | Scope | Encoded arguments |
//! |-------|-------------------|
//! | `array_t`, `set_t`, `nullable`, `tagged` | 1 nested argument |
//! | `map_t`, `tagged2` | 2 nested arguments |
//! | `tuple_t` | varuint count, then that many arguments |
//! | `udt` | 4-byte little-endian schema id |
//! | anything else | nothing |
//!
//! Each nested argument is its code byte followed by its own arguments,
//! applied recursively, e.g. "array of (tagged (uint8, udt#42))".

use smallvec::SmallVec;

use crate::encoding::varint::{decode_varuint, encode_varuint, varuint_len};
use crate::error::{Result, RowError};
use crate::types::code::TypeCode;

/// Identifier of a schema within a namespace.
///
/// Encoded as 4 little-endian bytes wherever it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaId(i32);

impl SchemaId {
    /// Number of encoded bytes.
    pub const BYTES: usize = 4;

    /// The invalid (zero) schema id.
    pub const INVALID: SchemaId = SchemaId(0);

    pub const fn new(id: i32) -> Self {
        SchemaId(id)
    }

    pub fn value(self) -> i32 {
        self.0
    }

    pub fn to_le_bytes(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }

    pub fn from_le_bytes(bytes: [u8; 4]) -> Self {
        SchemaId(i32::from_le_bytes(bytes))
    }
}

impl std::fmt::Display for SchemaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A type plus, recursively, its generic parameters.
///
/// For `Schema` (UDT) references the schema id replaces the argument list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeArgument {
    code: TypeCode,
    args: TypeArgumentList,
    schema_id: Option<SchemaId>,
}

impl TypeArgument {
    /// A non-generic argument: just a type code.
    pub fn new(code: TypeCode) -> Self {
        TypeArgument {
            code,
            args: TypeArgumentList::new(),
            schema_id: None,
        }
    }

    /// A scope argument with nested type arguments.
    pub fn with_args(code: TypeCode, args: TypeArgumentList) -> Self {
        TypeArgument {
            code,
            args,
            schema_id: None,
        }
    }

    /// A user-defined-type reference.
    pub fn udt(schema_id: SchemaId) -> Self {
        TypeArgument::with_schema(TypeCode::Schema, schema_id)
    }

    /// A user-defined-type reference with an explicit (possibly immutable)
    /// scope code.
    pub fn with_schema(code: TypeCode, schema_id: SchemaId) -> Self {
        TypeArgument {
            code,
            args: TypeArgumentList::new(),
            schema_id: Some(schema_id),
        }
    }

    pub fn code(&self) -> TypeCode {
        self.code
    }

    pub fn args(&self) -> &TypeArgumentList {
        &self.args
    }

    pub fn schema_id(&self) -> Option<SchemaId> {
        self.schema_id
    }

    /// Encoded byte length of this argument, including its code byte.
    pub fn encoded_len(&self) -> usize {
        1 + match self.code.canonical() {
            TypeCode::Schema => SchemaId::BYTES,
            TypeCode::TypedTupleScope => {
                varuint_len(self.args.len() as u64)
                    + self.args.iter().map(TypeArgument::encoded_len).sum::<usize>()
            }
            code if code.type_arg_arity().is_some() => {
                self.args.iter().map(TypeArgument::encoded_len).sum::<usize>()
            }
            _ => 0,
        }
    }

    /// Appends the wire encoding of this argument to `out`.
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.code as u8);
        self.encode_body(out);
    }

    /// Appends everything after the code byte.
    pub fn encode_body(&self, out: &mut Vec<u8>) {
        match self.code.canonical() {
            TypeCode::Schema => {
                let id = self.schema_id.unwrap_or(SchemaId::INVALID);
                out.extend_from_slice(&id.to_le_bytes());
            }
            TypeCode::TypedTupleScope => {
                let mut buf = [0u8; crate::encoding::varint::MAX_VARINT_BYTES];
                let n = encode_varuint(self.args.len() as u64, &mut buf);
                out.extend_from_slice(&buf[..n]);
                for arg in self.args.iter() {
                    arg.encode(out);
                }
            }
            code if code.type_arg_arity().is_some() => {
                for arg in self.args.iter() {
                    arg.encode(out);
                }
            }
            _ => {}
        }
    }

    /// Decodes one argument from the front of `buf`, returning it and the
    /// number of bytes consumed.
    pub fn decode(buf: &[u8]) -> Result<(TypeArgument, usize)> {
        if buf.is_empty() {
            return Err(RowError::InsufficientBuffer { need: 1 });
        }
        let code = TypeCode::decode(buf[0])?;
        let (arg, body_len) = TypeArgument::decode_body(code, &buf[1..])?;
        Ok((arg, 1 + body_len))
    }

    /// Decodes everything after an already-read code byte.
    pub fn decode_body(code: TypeCode, buf: &[u8]) -> Result<(TypeArgument, usize)> {
        match code.canonical() {
            TypeCode::Schema => {
                if buf.len() < SchemaId::BYTES {
                    return Err(RowError::InsufficientBuffer {
                        need: SchemaId::BYTES,
                    });
                }
                let id = SchemaId::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
                Ok((
                    TypeArgument {
                        code,
                        args: TypeArgumentList::new(),
                        schema_id: Some(id),
                    },
                    SchemaId::BYTES,
                ))
            }
            TypeCode::TypedTupleScope => {
                let (count, mut consumed) = decode_varuint(buf)?;
                let mut args = TypeArgumentList::new();
                for _ in 0..count {
                    let (arg, len) = TypeArgument::decode(&buf[consumed..])?;
                    args.push(arg);
                    consumed += len;
                }
                Ok((TypeArgument { code, args, schema_id: None }, consumed))
            }
            canonical => {
                let arity = canonical.type_arg_arity().unwrap_or(0);
                let mut args = TypeArgumentList::new();
                let mut consumed = 0;
                for _ in 0..arity {
                    let (arg, len) = TypeArgument::decode(&buf[consumed..])?;
                    args.push(arg);
                    consumed += len;
                }
                Ok((TypeArgument { code, args, schema_id: None }, consumed))
            }
        }
    }
}

impl std::fmt::Display for TypeArgument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(id) = self.schema_id {
            return write!(f, "udt{}", id);
        }
        if self.args.is_empty() {
            return f.write_str(self.code.name());
        }
        write!(f, "{}<", self.code.name())?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", arg)?;
        }
        f.write_str(">")
    }
}

/// An ordered list of type arguments with inline storage for the common
/// 0-2 entry case. Entries are boxed so that a `TypeArgument` can carry a
/// `TypeArgumentList` without making the type infinitely sized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TypeArgumentList(SmallVec<[Box<TypeArgument>; 2]>);

impl TypeArgumentList {
    pub fn new() -> Self {
        TypeArgumentList(SmallVec::new())
    }

    pub fn single(arg: TypeArgument) -> Self {
        let mut list = SmallVec::new();
        list.push(Box::new(arg));
        TypeArgumentList(list)
    }

    pub fn pair(first: TypeArgument, second: TypeArgument) -> Self {
        let mut list = SmallVec::new();
        list.push(Box::new(first));
        list.push(Box::new(second));
        TypeArgumentList(list)
    }

    pub fn push(&mut self, arg: TypeArgument) {
        self.0.push(Box::new(arg));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TypeArgument> {
        self.0.get(index).map(Box::as_ref)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeArgument> {
        self.0.iter().map(Box::as_ref)
    }
}

impl FromIterator<TypeArgument> for TypeArgumentList {
    fn from_iter<I: IntoIterator<Item = TypeArgument>>(iter: I) -> Self {
        TypeArgumentList(iter.into_iter().map(Box::new).collect())
    }
}

impl From<Vec<TypeArgument>> for TypeArgumentList {
    fn from(args: Vec<TypeArgument>) -> Self {
        args.into_iter().collect()
    }
}
