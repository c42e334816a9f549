//! # Type System
//!
//! The closed type-code enumeration, generic type arguments, and the
//! fixed-width value types that have no native Rust representation.
//!
//! ## Module Structure
//!
//! - `code`: `TypeCode`, the one-byte wire tag and its capability set
//! - `args`: `SchemaId`, `TypeArgument`, `TypeArgumentList` and their codec
//! - `value`: `Decimal`, `Float128`, `ObjectId` fixed-width values

pub mod args;
pub mod code;
pub mod value;

pub use args::{SchemaId, TypeArgument, TypeArgumentList};
pub use code::TypeCode;
pub use value::{Decimal, Float128, ObjectId};
