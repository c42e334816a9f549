//! # Encoding Module
//!
//! This module provides the byte-level encoding primitives shared by every
//! region of a FlexRow buffer:
//!
//! - **Varint encoding**: 7-bit continuation variable-length integers, used
//!   for variable-field length prefixes, sparse path lengths, scope element
//!   counts, and the `VarInt`/`VarUInt` value types

pub mod varint;

pub use varint::{
    decode_varint, decode_varuint, encode_varint, encode_varuint, varint_len, varuint_len,
};
