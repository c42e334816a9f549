//! # Layout Builder
//!
//! Compiles field declarations into a [`Layout`]. Declarations are validated
//! as they are added; `build` only performs the final offset arithmetic and
//! never fails. Compilation is deterministic: the same declarations in the
//! same order always produce byte-identical layouts.

use crate::error::{Result, RowError};
use crate::layout::bit::{BitAllocator, LayoutBit};
use crate::layout::column::{LayoutColumn, StorageKind};
use crate::layout::Layout;
use crate::types::{SchemaId, TypeArgumentList, TypeCode};

/// Incrementally compiles a schema's fields into a [`Layout`].
#[derive(Debug)]
pub struct LayoutBuilder {
    name: String,
    schema_id: SchemaId,
    bits: BitAllocator,
    fixed: Vec<LayoutColumn>,
    variable: Vec<LayoutColumn>,
    sparse: Vec<LayoutColumn>,
    fixed_cursor: usize,
    scope_stack: Vec<String>,
}

impl LayoutBuilder {
    pub fn new(name: impl Into<String>, schema_id: SchemaId) -> Self {
        LayoutBuilder {
            name: name.into(),
            schema_id,
            bits: BitAllocator::new(),
            fixed: Vec::new(),
            variable: Vec::new(),
            sparse: Vec::new(),
            fixed_cursor: 0,
            scope_stack: Vec::new(),
        }
    }

    /// Declares a field stored in the fixed region.
    ///
    /// `length` is required for Utf8/Binary fixed fields and ignored for
    /// types with an intrinsic size. Null fields occupy a single bit;
    /// booleans occupy one value bit plus, when nullable, a null bit.
    pub fn add_fixed_column(
        &mut self,
        path: &str,
        code: TypeCode,
        nullable: bool,
        length: usize,
    ) -> Result<&mut Self> {
        if code.is_varint() {
            return Err(RowError::InvalidSchema(format!(
                "field '{path}': {code} cannot be stored in the fixed region"
            )));
        }
        if code.fixed_size().is_none() && !(code.allow_variable() && length > 0) {
            return Err(RowError::InvalidSchema(format!(
                "field '{path}': {code} requires a declared length to be fixed"
            )));
        }
        let path = self.qualify(path)?;

        let column = match code {
            TypeCode::Null => LayoutColumn {
                path,
                code,
                type_args: TypeArgumentList::new(),
                storage: StorageKind::Fixed,
                index: self.fixed.len(),
                offset: 0,
                null_bit: LayoutBit::INVALID,
                bool_bit: self.bits.allocate(),
                length: 0,
            },
            TypeCode::Boolean => {
                let null_bit = if nullable {
                    self.bits.allocate()
                } else {
                    LayoutBit::INVALID
                };
                LayoutColumn {
                    path,
                    code,
                    type_args: TypeArgumentList::new(),
                    storage: StorageKind::Fixed,
                    index: self.fixed.len(),
                    offset: 0,
                    null_bit,
                    bool_bit: self.bits.allocate(),
                    length: 0,
                }
            }
            _ => {
                let null_bit = if nullable {
                    self.bits.allocate()
                } else {
                    LayoutBit::INVALID
                };
                let size = code.fixed_size().unwrap_or(length);
                let offset = self.fixed_cursor;
                self.fixed_cursor += size;
                LayoutColumn {
                    path,
                    code,
                    type_args: TypeArgumentList::new(),
                    storage: StorageKind::Fixed,
                    index: self.fixed.len(),
                    offset,
                    null_bit,
                    bool_bit: LayoutBit::INVALID,
                    length: if code.fixed_size().is_some() { 0 } else { length },
                }
            }
        };
        self.fixed.push(column);
        Ok(self)
    }

    /// Declares a field stored in the variable region.
    ///
    /// `length`, when nonzero, caps the payload size accepted by writes.
    pub fn add_variable_column(
        &mut self,
        path: &str,
        code: TypeCode,
        length: usize,
    ) -> Result<&mut Self> {
        if !code.allow_variable() {
            return Err(RowError::InvalidSchema(format!(
                "field '{path}': {code} cannot be stored in the variable region"
            )));
        }
        let path = self.qualify(path)?;
        let ordinal = self.variable.len();
        self.variable.push(LayoutColumn {
            path,
            code,
            type_args: TypeArgumentList::new(),
            storage: StorageKind::Variable,
            index: ordinal,
            offset: ordinal,
            null_bit: self.bits.allocate(),
            bool_bit: LayoutBit::INVALID,
            length,
        });
        Ok(self)
    }

    /// Declares a field stored in the sparse region.
    pub fn add_sparse_column(&mut self, path: &str, code: TypeCode) -> Result<&mut Self> {
        let path = self.qualify(path)?;
        self.push_sparse(path, code, TypeArgumentList::new());
        Ok(self)
    }

    /// Declares a typed scope field (typed array/set/map/tuple, nullable,
    /// tagged, or UDT reference) stored in the sparse region.
    pub fn add_typed_scope(
        &mut self,
        path: &str,
        code: TypeCode,
        type_args: TypeArgumentList,
    ) -> Result<&mut Self> {
        if !code.is_scope() {
            return Err(RowError::InvalidSchema(format!(
                "field '{path}': {code} is not a scope type"
            )));
        }
        let path = self.qualify(path)?;
        self.push_sparse(path, code, type_args);
        Ok(self)
    }

    /// Opens an object scope; subsequent declarations are nested under it
    /// with dotted paths until [`Self::end_object_scope`].
    pub fn add_object_scope(&mut self, path: &str) -> Result<&mut Self> {
        let full = self.qualify(path)?;
        self.push_sparse(full.clone(), TypeCode::ObjectScope, TypeArgumentList::new());
        self.scope_stack.push(full);
        Ok(self)
    }

    /// Closes the innermost open object scope.
    pub fn end_object_scope(&mut self) -> Result<&mut Self> {
        if self.scope_stack.pop().is_none() {
            return Err(RowError::InvalidSchema(
                "end_object_scope without a matching add_object_scope".into(),
            ));
        }
        Ok(self)
    }

    /// Finishes compilation, producing the layout and resetting the builder.
    pub fn build(&mut self) -> Layout {
        let bitmask_bytes = self.bits.bytes_needed();
        let fixed_count = self.fixed.len();
        let variable_count = self.variable.len();

        let mut columns = Vec::with_capacity(fixed_count + variable_count + self.sparse.len());
        for mut col in self.fixed.drain(..) {
            col.offset += bitmask_bytes;
            columns.push(col);
        }
        for mut col in self.variable.drain(..) {
            col.index += fixed_count;
            columns.push(col);
        }
        for mut col in self.sparse.drain(..) {
            col.index += fixed_count + variable_count;
            columns.push(col);
        }

        let layout = Layout::assemble(
            std::mem::take(&mut self.name),
            self.schema_id,
            bitmask_bytes,
            self.fixed_cursor,
            fixed_count,
            variable_count,
            columns,
        );

        self.bits = BitAllocator::new();
        self.fixed_cursor = 0;
        self.scope_stack.clear();
        layout
    }

    fn push_sparse(&mut self, path: String, code: TypeCode, type_args: TypeArgumentList) {
        self.sparse.push(LayoutColumn {
            path,
            code,
            type_args,
            storage: StorageKind::Sparse,
            index: self.sparse.len(),
            offset: 0,
            null_bit: LayoutBit::INVALID,
            bool_bit: LayoutBit::INVALID,
            length: 0,
        });
    }

    fn qualify(&self, path: &str) -> Result<String> {
        let full = match self.scope_stack.last() {
            Some(parent) => format!("{parent}.{path}"),
            None => path.to_string(),
        };
        let taken = self
            .fixed
            .iter()
            .chain(self.variable.iter())
            .chain(self.sparse.iter())
            .any(|c| c.path == full);
        if taken {
            return Err(RowError::InvalidSchema(format!(
                "duplicate field path '{full}'"
            )));
        }
        Ok(full)
    }
}
