//! Row header: a format version byte followed by the root schema id.

use crate::error::{Result, RowError};
use crate::types::SchemaId;

/// Format version 1, the only version currently defined.
///
/// The high bit is deliberately set so a row can never be confused with
/// printable text.
pub const VERSION_V1: u8 = 0x81;

/// The five-byte header at the front of every row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowHeader {
    version: u8,
    schema_id: SchemaId,
}

impl RowHeader {
    /// Encoded size: version byte plus 4-byte little-endian schema id.
    pub const BYTES: usize = 1 + SchemaId::BYTES;

    pub fn new(version: u8, schema_id: SchemaId) -> Self {
        RowHeader { version, schema_id }
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn schema_id(&self) -> SchemaId {
        self.schema_id
    }

    pub fn encode(&self) -> [u8; Self::BYTES] {
        let mut out = [0u8; Self::BYTES];
        out[0] = self.version;
        out[1..].copy_from_slice(&self.schema_id.to_le_bytes());
        out
    }

    /// Decodes and validates the header at the front of `buf`.
    pub fn decode(buf: &[u8]) -> Result<RowHeader> {
        if buf.len() < Self::BYTES {
            return Err(RowError::InsufficientBuffer { need: Self::BYTES });
        }
        let version = buf[0];
        if version != VERSION_V1 {
            return Err(RowError::InvalidRow(format!(
                "unknown row version {version:#04x}"
            )));
        }
        Ok(RowHeader {
            version,
            schema_id: SchemaId::from_le_bytes([buf[1], buf[2], buf[3], buf[4]]),
        })
    }
}
