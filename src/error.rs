//! # Error Taxonomy
//!
//! Every per-field operation in FlexRow returns a typed result rather than an
//! opaque failure. Callers composing multi-field writes check each result and
//! delete partially written scopes on first failure; partial writes are never
//! left behind as valid-looking rows.
//!
//! ## Result Kinds
//!
//! | Kind | Meaning | Recoverable |
//! |------|---------|-------------|
//! | `NotFound` | field absent | yes, caller-visible |
//! | `Exists` | insert target already present | yes |
//! | `TypeMismatch` | encoded type code disagrees with request | fatal to the operation, not the buffer |
//! | `InsufficientPermissions` | write through an immutable scope | fatal to the operation |
//! | `TooBig` | value exceeds a schema-declared capacity | fatal to the operation |
//! | `InsufficientBuffer` | streaming parser needs more bytes | yes, resupply data |
//! | `InvalidRow` | header/CRC/version/encoding violation | fatal to the row or record |
//! | `SchemaNotFound` | resolver has no layout for a schema id | fatal to the operation |
//! | `InvalidSchema` | contradictory layout declaration | fatal at compile time |
//! | `Unsupported` | operation/type combination not defined | fatal to the operation |

use thiserror::Error;

use crate::types::SchemaId;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, RowError>;

/// Result kinds for all row, layout, and streaming operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    /// The requested field is not present in the row.
    #[error("field not found")]
    NotFound,

    /// An insert-only write found the field already present.
    #[error("field already exists")]
    Exists,

    /// The encoded type code disagrees with the requested type.
    #[error("type mismatch: expected {expected}, found {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// A mutation was attempted through an immutable scope.
    #[error("insufficient permissions: scope is immutable")]
    InsufficientPermissions,

    /// The value exceeds a schema-declared fixed capacity.
    #[error("value of {actual} bytes exceeds declared capacity of {capacity} bytes")]
    TooBig { capacity: usize, actual: usize },

    /// The streaming parser needs more bytes before it can make progress.
    #[error("insufficient buffer: need at least {need} bytes")]
    InsufficientBuffer { need: usize },

    /// A header, CRC, version, or encoding violation.
    #[error("invalid row: {0}")]
    InvalidRow(String),

    /// No layout is registered for the schema id.
    #[error("schema {0:?} not found")]
    SchemaNotFound(SchemaId),

    /// The layout compiler caught a contradictory declaration.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// The operation/type combination is not defined by the format.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
}

impl RowError {
    /// Builds a `TypeMismatch` from two type-code names.
    pub fn type_mismatch(expected: &'static str, actual: &'static str) -> Self {
        RowError::TypeMismatch { expected, actual }
    }

    /// True for kinds a caller can recover from by retrying differently.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            RowError::NotFound | RowError::Exists | RowError::InsufficientBuffer { .. }
        )
    }
}
