//! # Variable-Length Integer Encoding
//!
//! This module provides the 7-bit continuation varint codec used throughout
//! the row format: variable-field length prefixes, sparse path lengths, scope
//! element counts, and the `VarInt`/`VarUInt` value types all share it. The
//! encoding is a wire contract and must be reproduced bit-for-bit.
//!
//! ## Encoding Format
//!
//! Values are emitted little-endian in base-128 groups of 7 bits. The high
//! bit of each byte is the continuation flag: `1` means more bytes follow,
//! `0` terminates the run. A `u64` therefore occupies at most 10 bytes.
//!
//! | Value Range | Bytes |
//! |-------------|-------|
//! | 0 - 127 | 1 |
//! | 128 - 16383 | 2 |
//! | 16384 - 2097151 | 3 |
//! | 2^28 - 2^35-1 | 5 |
//! | 2^63 - u64::MAX | 10 |
//!
//! Signed values zigzag first (`0 -> 0, -1 -> 1, 1 -> 2, -2 -> 3, ...`) so
//! small magnitudes of either sign stay short.
//!
//! ## Boundary Values
//!
//! Key boundary values for testing: 0, 127, 128, 16383, 16384, 2097151,
//! 2097152, u32::MAX, u64::MAX.
//!
//! ## Zero-Copy Design
//!
//! All functions operate on byte slices directly:
//! - `encode_varuint` writes to a mutable slice, returns bytes written
//! - `decode_varuint` reads from a slice, returns (value, bytes_read)
//! - `varuint_len` computes length without any I/O
//!
//! No heap allocations are performed by any function in this module.
//!
//! ## Error Handling
//!
//! `decode_varuint` returns `RowError::InsufficientBuffer` when the run is
//! truncated (the continuation bit of the last available byte is set) and
//! `RowError::InvalidRow` when a run exceeds 10 bytes.

use crate::error::{Result, RowError};

/// Largest encoded size of a `u64`.
pub const MAX_VARINT_BYTES: usize = 10;

/// Returns the encoded byte length of `value` without encoding it.
pub fn varuint_len(value: u64) -> usize {
    let mut value = value;
    let mut len = 1;
    while value >= 0x80 {
        value >>= 7;
        len += 1;
    }
    len
}

/// Returns the encoded byte length of a signed value.
pub fn varint_len(value: i64) -> usize {
    varuint_len(zigzag_encode(value))
}

/// Encodes `value` into `buf`, returning the number of bytes written.
///
/// `buf` must have at least `varuint_len(value)` bytes available.
pub fn encode_varuint(value: u64, buf: &mut [u8]) -> usize {
    let mut value = value;
    let mut i = 0;
    while value >= 0x80 {
        buf[i] = (value as u8) | 0x80;
        value >>= 7;
        i += 1;
    }
    buf[i] = value as u8;
    i + 1
}

/// Encodes a signed value via zigzag, returning the number of bytes written.
pub fn encode_varint(value: i64, buf: &mut [u8]) -> usize {
    encode_varuint(zigzag_encode(value), buf)
}

/// Decodes a varuint from the front of `buf`, returning (value, bytes_read).
pub fn decode_varuint(buf: &[u8]) -> Result<(u64, usize)> {
    let mut value: u64 = 0;
    let mut shift = 0;
    for (i, &byte) in buf.iter().enumerate() {
        if i >= MAX_VARINT_BYTES {
            return Err(RowError::InvalidRow("varint run exceeds 10 bytes".into()));
        }
        if i == MAX_VARINT_BYTES - 1 && byte > 0x01 {
            return Err(RowError::InvalidRow("varint overflows u64".into()));
        }
        value |= u64::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
        shift += 7;
    }
    Err(RowError::InsufficientBuffer {
        need: buf.len() + 1,
    })
}

/// Decodes a zigzag-encoded signed value, returning (value, bytes_read).
pub fn decode_varint(buf: &[u8]) -> Result<(i64, usize)> {
    let (raw, len) = decode_varuint(buf)?;
    Ok((zigzag_decode(raw), len))
}

/// Maps a signed value onto the unsigned line: 0, -1, 1, -2, 2, ...
pub fn zigzag_encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

/// Inverse of [`zigzag_encode`].
pub fn zigzag_decode(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}
