//! # Compiled Columns
//!
//! A `LayoutColumn` is the compiled form of one schema field: where it lives
//! (fixed, variable, or sparse), its type, and the bits and offsets computed
//! for it. Columns are immutable once their layout is built.

use crate::layout::bit::LayoutBit;
use crate::types::{TypeArgumentList, TypeCode};

/// Which region of the row a column's value lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKind {
    /// Fixed region: value bytes at a compiled offset, presence via null bit.
    Fixed,
    /// Variable region: length-prefixed payload, presence via existence bit.
    Variable,
    /// Sparse region: self-describing entry addressed by path.
    Sparse,
}

/// One compiled schema field.
#[derive(Debug, Clone)]
pub struct LayoutColumn {
    pub(crate) path: String,
    pub(crate) code: TypeCode,
    pub(crate) type_args: TypeArgumentList,
    pub(crate) storage: StorageKind,
    pub(crate) index: usize,
    pub(crate) offset: usize,
    pub(crate) null_bit: LayoutBit,
    pub(crate) bool_bit: LayoutBit,
    pub(crate) length: usize,
}

impl LayoutColumn {
    /// Full dotted path of the field within its schema.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn code(&self) -> TypeCode {
        self.code
    }

    pub fn type_args(&self) -> &TypeArgumentList {
        &self.type_args
    }

    pub fn storage(&self) -> StorageKind {
        self.storage
    }

    /// Ordinal of the column within the whole layout.
    ///
    /// Fixed columns come first, then variable, then sparse.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Byte offset within the fixed region, or position among variable
    /// columns. Meaningless for sparse columns.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn null_bit(&self) -> LayoutBit {
        self.null_bit
    }

    /// Value bit for boolean columns, [`LayoutBit::INVALID`] otherwise.
    pub fn bool_bit(&self) -> LayoutBit {
        self.bool_bit
    }

    /// Declared length. For variable columns 0 means unbounded; for fixed
    /// Utf8/Binary columns it is the exact payload size.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Size in bytes the column occupies in the fixed region.
    pub fn size(&self) -> usize {
        self.code.fixed_size().unwrap_or(self.length)
    }

    pub fn is_nullable(&self) -> bool {
        !self.null_bit.is_invalid()
    }
}
