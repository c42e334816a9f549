//! # Row Cursors
//!
//! A `RowCursor` is a lightweight position inside one scope of a row. It is a
//! value type: cloning it forks the position, and every mutating buffer
//! operation repairs the cursor it was handed while invalidating any other
//! clones pointing past the edit.
//!
//! ## Lifecycle
//!
//! A freshly created cursor is unpositioned. `move_next` positions it on
//! successive cells until the scope is exhausted; `find` positions it on a
//! named field or at its insertion point. Writes through an unpositioned or
//! insertion-point cursor insert; writes through a positioned cursor replace.

use std::sync::Arc;

use crate::layout::Layout;
use crate::types::{SchemaId, TypeArgument, TypeArgumentList, TypeCode};

/// Conflict policy for sparse writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteOptions {
    /// Insert or replace.
    #[default]
    Upsert,
    /// Replace only; the field must already exist.
    Update,
    /// Insert only; the field must not exist.
    Insert,
    /// Insert at the cursor's index, shifting later elements. Only valid in
    /// sized scopes.
    InsertAt,
}

/// A position within one scope of a row.
#[derive(Debug, Clone)]
pub struct RowCursor {
    /// Code of the scope this cursor iterates.
    pub(crate) scope_code: TypeCode,
    /// The scope's type arguments.
    pub(crate) scope_args: TypeArgumentList,
    /// Layout for schema-rooted scopes (the root and UDT scopes).
    pub(crate) layout: Option<Arc<Layout>>,
    /// Offset of the scope body: the bitmask for schema-rooted scopes, the
    /// count varuint for sized scopes, the presence byte for nullable
    /// scopes, the first slot otherwise.
    pub(crate) start: usize,
    /// Offset of the current cell's metadata (its code byte or, when the
    /// code is implicit, its value), or the insertion point.
    pub(crate) meta_offset: usize,
    /// Offset of the current cell's value.
    pub(crate) value_offset: usize,
    /// Index of the current cell within the scope.
    pub(crate) index: usize,
    /// Element count for sized scopes; presence (0/1) for nullable scopes.
    pub(crate) count: usize,
    /// Whether the cursor is positioned on an existing cell.
    pub(crate) exists: bool,
    /// Whether writes through this cursor are forbidden.
    pub(crate) immutable: bool,
    /// Whether the containing scope enforces uniqueness (typed set/map).
    pub(crate) unique_scope: bool,
    /// Type code of the current cell.
    pub(crate) cell_code: TypeCode,
    /// Type arguments of the current cell (scope cells only).
    pub(crate) cell_args: TypeArgumentList,
    /// Schema id of the current cell (UDT cells only).
    pub(crate) cell_schema: Option<SchemaId>,
    /// Path of the current cell, or the pending path after a missed `find`.
    pub(crate) cell_path: Option<String>,
}

impl RowCursor {
    pub fn scope_code(&self) -> TypeCode {
        self.scope_code
    }

    pub fn scope_args(&self) -> &TypeArgumentList {
        &self.scope_args
    }

    /// Layout of the enclosing schema, for schema-rooted scopes.
    pub fn layout(&self) -> Option<&Arc<Layout>> {
        self.layout.as_ref()
    }

    /// Whether the cursor currently points at an existing cell.
    pub fn exists(&self) -> bool {
        self.exists
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Element count of a sized scope.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_immutable(&self) -> bool {
        self.immutable
    }

    /// Type code of the cell the cursor is positioned on.
    pub fn cell_code(&self) -> TypeCode {
        self.cell_code
    }

    pub fn cell_args(&self) -> &TypeArgumentList {
        &self.cell_args
    }

    /// Path of the current cell, for path-tagged scopes.
    pub fn cell_path(&self) -> Option<&str> {
        self.cell_path.as_deref()
    }

    pub(crate) fn scoped(
        scope_code: TypeCode,
        scope_args: TypeArgumentList,
        layout: Option<Arc<Layout>>,
        start: usize,
        body: usize,
        immutable: bool,
    ) -> Self {
        RowCursor {
            scope_code,
            scope_args,
            layout,
            start,
            meta_offset: body,
            value_offset: body,
            index: 0,
            count: 0,
            exists: false,
            immutable,
            unique_scope: scope_code.is_unique_scope(),
            cell_code: TypeCode::Null,
            cell_args: TypeArgumentList::new(),
            cell_schema: None,
            cell_path: None,
        }
    }

    /// The current cell's full type, as a type argument tree.
    pub(crate) fn cell_type(&self) -> TypeArgument {
        match self.cell_schema {
            Some(id) => TypeArgument::with_schema(self.cell_code, id),
            None => TypeArgument::with_args(self.cell_code, self.cell_args.clone()),
        }
    }

    /// Shifts every offset past `at` by `delta` after a buffer edit.
    pub(crate) fn adjust(&mut self, at: usize, delta: isize) {
        for offset in [
            &mut self.start,
            &mut self.meta_offset,
            &mut self.value_offset,
        ] {
            if *offset > at {
                *offset = offset.checked_add_signed(delta).unwrap_or(*offset);
            }
        }
    }
}
