//! # Sparse Region
//!
//! Sparse cells are self-describing: `[type code][path][type args][value]`,
//! where the code byte is elided inside typed scopes whose element type fully
//! determines it, and the path appears only in path-tagged scopes (the root,
//! UDT scopes, and object scopes). Null and boolean values carry no value
//! bytes at all; the code byte is the value.
//!
//! All sparse operations are cursor-driven. A structural edit shifts the
//! bytes after the edit point, repairs the cursor that performed it, and
//! invalidates any other cursor positioned past that point.

use crate::encoding::varint::{encode_varint, encode_varuint, varuint_len, MAX_VARINT_BYTES};
use crate::error::{Result, RowError};
use crate::row::buffer::RowBuffer;
use crate::row::cursor::{RowCursor, WriteOptions};
use crate::types::{Decimal, Float128, ObjectId, TypeArgument, TypeArgumentList, TypeCode};

/// Decoded metadata of one sparse cell.
struct CellHead {
    ty: TypeArgument,
    path: Option<String>,
    value_offset: usize,
}

/// Declared type of the element at `index` inside a typed scope, or `None`
/// when the scope is untyped and every cell carries an explicit code.
fn element_arg(
    scope_code: TypeCode,
    scope_args: &TypeArgumentList,
    index: usize,
) -> Option<TypeArgument> {
    match scope_code.canonical() {
        TypeCode::TypedArrayScope | TypeCode::TypedSetScope | TypeCode::NullableScope => {
            scope_args.get(0).cloned()
        }
        TypeCode::TypedMapScope => Some(TypeArgument::with_args(
            TypeCode::TypedTupleScope,
            scope_args.clone(),
        )),
        TypeCode::TypedTupleScope => scope_args.get(index).cloned(),
        TypeCode::TaggedScope | TypeCode::Tagged2Scope => {
            if index == 0 {
                Some(TypeArgument::new(TypeCode::UInt8))
            } else {
                scope_args.get(index - 1).cloned()
            }
        }
        _ => None,
    }
}

/// Whether two codes name the same sparse value type. The boolean codes
/// collapse into one family: the value lives in the code byte.
fn code_matches(expected: TypeCode, actual: TypeCode) -> bool {
    if expected.is_boolean() && actual.is_boolean() {
        return true;
    }
    expected.canonical() == actual.canonical()
}

macro_rules! sparse_accessors {
    ($read:ident, $write:ident, $t:ty, $code:ident, $read_at:ident) => {
        pub fn $read(&self, cursor: &RowCursor) -> Result<$t> {
            let at = self.prepare_sparse_read(cursor, TypeCode::$code)?;
            self.$read_at(at)
        }

        pub fn $write(
            &mut self,
            cursor: &mut RowCursor,
            value: $t,
            options: WriteOptions,
        ) -> Result<()> {
            self.write_sparse_cell(
                cursor,
                &TypeArgument::new(TypeCode::$code),
                &value.to_le_bytes(),
                options,
            )
        }
    };
}

impl RowBuffer {
    // ---------------------------------------------------------------------
    // Iteration
    // ---------------------------------------------------------------------

    /// Advances the cursor to the next cell of its scope. Returns `false`
    /// once the scope is exhausted, leaving the cursor at the insertion
    /// point.
    pub fn move_next(&self, cursor: &mut RowCursor) -> Result<bool> {
        if cursor.exists {
            let ty = cursor.cell_type();
            let len = self.value_len(&ty, cursor.value_offset)?;
            cursor.meta_offset = cursor.value_offset + len;
            cursor.value_offset = cursor.meta_offset;
            cursor.index += 1;
            cursor.exists = false;
            cursor.cell_path = None;
        }
        self.position(cursor)
    }

    /// Positions an object or schema scope cursor on the field named `path`,
    /// or at its insertion point when absent (with the path pending for a
    /// subsequent write). Returns whether the field was found.
    pub fn find(&self, cursor: &mut RowCursor, path: &str) -> Result<bool> {
        let canon = cursor.scope_code.canonical();
        if cursor.layout.is_none() && canon != TypeCode::ObjectScope {
            return Err(RowError::type_mismatch(
                "path-tagged scope",
                cursor.scope_code.name(),
            ));
        }
        let body = self.scope_body_offset(cursor)?;
        cursor.meta_offset = body;
        cursor.value_offset = body;
        cursor.index = 0;
        cursor.exists = false;
        cursor.cell_path = None;
        while self.move_next(cursor)? {
            if cursor.cell_path.as_deref() == Some(path) {
                return Ok(true);
            }
        }
        cursor.cell_path = Some(path.to_string());
        Ok(false)
    }

    /// Folds the extent of a fully written child scope back into its parent,
    /// advancing the parent past the scope cell without decoding it again.
    pub fn skip(&self, parent: &mut RowCursor, child: &RowCursor) -> Result<()> {
        if parent.exists {
            if child.start != parent.value_offset {
                return Err(RowError::InvalidRow(
                    "child cursor does not belong to the scope being skipped".into(),
                ));
            }
            let ty = parent.cell_type();
            let len = self.value_len(&ty, parent.value_offset)?;
            parent.meta_offset = parent.value_offset + len;
            parent.value_offset = parent.meta_offset;
            parent.index += 1;
            parent.exists = false;
            parent.cell_path = None;
        }
        Ok(())
    }

    /// Total encoded size of the cell the cursor is positioned on, metadata
    /// included.
    pub fn sparse_cell_size(&self, cursor: &RowCursor) -> Result<usize> {
        if !cursor.exists {
            return Err(RowError::NotFound);
        }
        let ty = cursor.cell_type();
        let len = self.value_len(&ty, cursor.value_offset)?;
        Ok(cursor.value_offset + len - cursor.meta_offset)
    }

    fn position(&self, cursor: &mut RowCursor) -> Result<bool> {
        let canon = cursor.scope_code.canonical();
        if cursor.layout.is_none() {
            let limit = match canon {
                TypeCode::TypedArrayScope
                | TypeCode::TypedSetScope
                | TypeCode::TypedMapScope
                | TypeCode::NullableScope => Some(cursor.count),
                TypeCode::TypedTupleScope => Some(cursor.scope_args.len()),
                TypeCode::TaggedScope | TypeCode::Tagged2Scope => {
                    Some(cursor.scope_args.len() + 1)
                }
                _ => None,
            };
            if let Some(limit) = limit {
                if cursor.index >= limit {
                    return Ok(false);
                }
                // Delimited by count or arity, never by an end marker.
                let elem = element_arg(cursor.scope_code, &cursor.scope_args, cursor.index);
                return match self.read_cell_head(cursor.meta_offset, elem.as_ref(), false)? {
                    None => Err(RowError::InvalidRow(
                        "unexpected end-of-scope marker in counted scope".into(),
                    )),
                    Some(head) => {
                        self.apply_head(cursor, head);
                        Ok(true)
                    }
                };
            }
        }
        // Root, UDT, and untyped scopes end at the buffer or an end marker.
        if cursor.meta_offset >= self.data.len() {
            return Ok(false);
        }
        let path_tagged = cursor.layout.is_some() || canon == TypeCode::ObjectScope;
        match self.read_cell_head(cursor.meta_offset, None, path_tagged)? {
            None => Ok(false),
            Some(head) => {
                self.apply_head(cursor, head);
                Ok(true)
            }
        }
    }

    fn apply_head(&self, cursor: &mut RowCursor, head: CellHead) {
        cursor.cell_code = head.ty.code();
        cursor.cell_args = head.ty.args().clone();
        cursor.cell_schema = head.ty.schema_id();
        cursor.cell_path = head.path;
        cursor.value_offset = head.value_offset;
        cursor.exists = true;
    }

    /// Offset of the first cell of the cursor's scope.
    fn scope_body_offset(&self, cursor: &RowCursor) -> Result<usize> {
        if let Some(layout) = &cursor.layout {
            return self.sparse_region_start(layout, cursor.start);
        }
        Ok(match cursor.scope_code.canonical() {
            code if code.is_sized_scope() => cursor.start + varuint_len(cursor.count as u64),
            TypeCode::NullableScope => cursor.start + 1,
            _ => cursor.start,
        })
    }

    /// Decodes one cell's metadata at `pos`. Returns `None` at an end-scope
    /// marker.
    fn read_cell_head(
        &self,
        pos: usize,
        elem: Option<&TypeArgument>,
        path_tagged: bool,
    ) -> Result<Option<CellHead>> {
        if let Some(arg) = elem {
            if !arg.code().always_requires_type_code() {
                return Ok(Some(CellHead {
                    ty: arg.clone(),
                    path: None,
                    value_offset: pos,
                }));
            }
        }
        let mut p = pos;
        let code = TypeCode::decode(self.read_u8_at(p)?)?;
        p += 1;
        if code == TypeCode::EndScope {
            return Ok(None);
        }
        let path = if path_tagged {
            let (len, prefix) = self.read_varuint_at(p)?;
            let bytes = self.bytes_at(p + prefix, len as usize)?;
            let s = std::str::from_utf8(bytes)
                .map_err(|_| RowError::InvalidRow("sparse path is not valid UTF-8".into()))?
                .to_string();
            p += prefix + len as usize;
            Some(s)
        } else {
            None
        };
        let ty = if code.is_scope() {
            let tail = self
                .data
                .get(p..)
                .ok_or(RowError::InsufficientBuffer { need: p })?;
            let (arg, consumed) = TypeArgument::decode_body(code, tail)?;
            p += consumed;
            arg
        } else {
            TypeArgument::new(code)
        };
        Ok(Some(CellHead {
            ty,
            path,
            value_offset: p,
        }))
    }

    /// Byte length of a sparse value of type `t` starting at `at`.
    fn value_len(&self, t: &TypeArgument, at: usize) -> Result<usize> {
        let code = t.code();
        if code.always_requires_type_code() {
            return Ok(0);
        }
        if let Some(n) = code.fixed_size() {
            return Ok(n);
        }
        match code {
            TypeCode::VarInt => Ok(self.read_varint_at(at)?.1),
            TypeCode::VarUInt => Ok(self.read_varuint_at(at)?.1),
            TypeCode::Utf8 | TypeCode::Binary => {
                let (len, prefix) = self.read_varuint_at(at)?;
                Ok(prefix + len as usize)
            }
            code if code.is_scope() => self.scope_body_len(t, at),
            _ => Err(RowError::InvalidRow(format!(
                "type {code} cannot appear as a sparse value"
            ))),
        }
    }

    /// Skips the cell at `pos` (metadata and value), returning the offset
    /// just past it. End-scope markers are invalid here.
    fn skip_cell(&self, pos: usize, elem: Option<&TypeArgument>, path_tagged: bool) -> Result<usize> {
        match self.read_cell_head(pos, elem, path_tagged)? {
            None => Err(RowError::InvalidRow(
                "unexpected end-of-scope marker in counted scope".into(),
            )),
            Some(head) => Ok(head.value_offset + self.value_len(&head.ty, head.value_offset)?),
        }
    }

    /// Byte length of a scope body starting at `start`, end marker included
    /// where the scope carries one.
    fn scope_body_len(&self, t: &TypeArgument, start: usize) -> Result<usize> {
        let mut pos = start;
        match t.code().canonical() {
            TypeCode::ObjectScope => loop {
                match self.read_cell_head(pos, None, true)? {
                    None => return Ok(pos + 1 - start),
                    Some(head) => {
                        pos = head.value_offset + self.value_len(&head.ty, head.value_offset)?;
                    }
                }
            },
            TypeCode::ArrayScope
            | TypeCode::TupleScope
            | TypeCode::MapScope
            | TypeCode::SetScope => loop {
                match self.read_cell_head(pos, None, false)? {
                    None => return Ok(pos + 1 - start),
                    Some(head) => {
                        pos = head.value_offset + self.value_len(&head.ty, head.value_offset)?;
                    }
                }
            },
            TypeCode::TypedArrayScope | TypeCode::TypedSetScope | TypeCode::TypedMapScope => {
                let (count, prefix) = self.read_varuint_at(pos)?;
                pos += prefix;
                let elem = element_arg(t.code(), t.args(), 0);
                for _ in 0..count {
                    pos = self.skip_cell(pos, elem.as_ref(), false)?;
                }
                Ok(pos - start)
            }
            TypeCode::TypedTupleScope => {
                for i in 0..t.args().len() {
                    pos = self.skip_cell(pos, t.args().get(i), false)?;
                }
                Ok(pos - start)
            }
            TypeCode::NullableScope => {
                let presence = self.read_u8_at(pos)?;
                pos += 1;
                if presence != 0 {
                    let elem = element_arg(t.code(), t.args(), 0);
                    pos = self.skip_cell(pos, elem.as_ref(), false)?;
                }
                Ok(pos - start)
            }
            TypeCode::TaggedScope | TypeCode::Tagged2Scope => {
                for i in 0..t.args().len() + 1 {
                    let elem = element_arg(t.code(), t.args(), i);
                    pos = self.skip_cell(pos, elem.as_ref(), false)?;
                }
                Ok(pos - start)
            }
            TypeCode::Schema => {
                let id = t
                    .schema_id()
                    .ok_or_else(|| RowError::InvalidRow("udt scope without a schema id".into()))?;
                let layout = self.resolver().resolve(id)?;
                pos = self.sparse_region_start(&layout, pos)?;
                loop {
                    match self.read_cell_head(pos, None, true)? {
                        None => return Ok(pos + 1 - start),
                        Some(head) => {
                            pos = head.value_offset + self.value_len(&head.ty, head.value_offset)?;
                        }
                    }
                }
            }
            code => Err(RowError::InvalidRow(format!("{code} is not a scope"))),
        }
    }

    // ---------------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------------

    fn prepare_sparse_read(&self, cursor: &RowCursor, expected: TypeCode) -> Result<usize> {
        if !cursor.exists {
            return Err(RowError::NotFound);
        }
        if !code_matches(expected, cursor.cell_code) {
            return Err(RowError::type_mismatch(
                expected.name(),
                cursor.cell_code.name(),
            ));
        }
        Ok(cursor.value_offset)
    }

    sparse_accessors!(read_sparse_i8, write_sparse_i8, i8, Int8, read_i8_at);
    sparse_accessors!(read_sparse_i16, write_sparse_i16, i16, Int16, read_i16_at);
    sparse_accessors!(read_sparse_i32, write_sparse_i32, i32, Int32, read_i32_at);
    sparse_accessors!(read_sparse_i64, write_sparse_i64, i64, Int64, read_i64_at);
    sparse_accessors!(read_sparse_u8, write_sparse_u8, u8, UInt8, read_u8_at);
    sparse_accessors!(read_sparse_u16, write_sparse_u16, u16, UInt16, read_u16_at);
    sparse_accessors!(read_sparse_u32, write_sparse_u32, u32, UInt32, read_u32_at);
    sparse_accessors!(read_sparse_u64, write_sparse_u64, u64, UInt64, read_u64_at);
    sparse_accessors!(read_sparse_f32, write_sparse_f32, f32, Float32, read_f32_at);
    sparse_accessors!(read_sparse_f64, write_sparse_f64, f64, Float64, read_f64_at);
    sparse_accessors!(
        read_sparse_datetime,
        write_sparse_datetime,
        u64,
        DateTime,
        read_u64_at
    );
    sparse_accessors!(
        read_sparse_unix_datetime,
        write_sparse_unix_datetime,
        i64,
        UnixDateTime,
        read_i64_at
    );

    pub fn read_sparse_bool(&self, cursor: &RowCursor) -> Result<bool> {
        self.prepare_sparse_read(cursor, TypeCode::Boolean)?;
        Ok(cursor.cell_code == TypeCode::Boolean)
    }

    pub fn read_sparse_null(&self, cursor: &RowCursor) -> Result<()> {
        self.prepare_sparse_read(cursor, TypeCode::Null)?;
        Ok(())
    }

    pub fn read_sparse_varint(&self, cursor: &RowCursor) -> Result<i64> {
        let at = self.prepare_sparse_read(cursor, TypeCode::VarInt)?;
        Ok(self.read_varint_at(at)?.0)
    }

    pub fn read_sparse_varuint(&self, cursor: &RowCursor) -> Result<u64> {
        let at = self.prepare_sparse_read(cursor, TypeCode::VarUInt)?;
        Ok(self.read_varuint_at(at)?.0)
    }

    pub fn read_sparse_utf8(&self, cursor: &RowCursor) -> Result<&str> {
        let at = self.prepare_sparse_read(cursor, TypeCode::Utf8)?;
        let (len, prefix) = self.read_varuint_at(at)?;
        let bytes = self.bytes_at(at + prefix, len as usize)?;
        std::str::from_utf8(bytes)
            .map_err(|_| RowError::InvalidRow("sparse utf8 value is not valid UTF-8".into()))
    }

    pub fn read_sparse_binary(&self, cursor: &RowCursor) -> Result<&[u8]> {
        let at = self.prepare_sparse_read(cursor, TypeCode::Binary)?;
        let (len, prefix) = self.read_varuint_at(at)?;
        self.bytes_at(at + prefix, len as usize)
    }

    pub fn read_sparse_guid(&self, cursor: &RowCursor) -> Result<[u8; 16]> {
        let at = self.prepare_sparse_read(cursor, TypeCode::Guid)?;
        Ok(self.bytes_at(at, 16)?.try_into().unwrap())
    }

    pub fn read_sparse_decimal(&self, cursor: &RowCursor) -> Result<Decimal> {
        let at = self.prepare_sparse_read(cursor, TypeCode::Decimal)?;
        Decimal::from_le_bytes(self.bytes_at(at, Decimal::BYTES)?.try_into().unwrap())
    }

    pub fn read_sparse_float128(&self, cursor: &RowCursor) -> Result<Float128> {
        let at = self.prepare_sparse_read(cursor, TypeCode::Float128)?;
        Ok(Float128::from_le_bytes(
            self.bytes_at(at, Float128::BYTES)?.try_into().unwrap(),
        ))
    }

    pub fn read_sparse_object_id(&self, cursor: &RowCursor) -> Result<ObjectId> {
        let at = self.prepare_sparse_read(cursor, TypeCode::ObjectId)?;
        Ok(ObjectId::new(
            self.bytes_at(at, ObjectId::BYTES)?.try_into().unwrap(),
        ))
    }

    /// Enters the scope cell the cursor is positioned on, yielding a child
    /// cursor over its body. Children inherit immutability from immutable
    /// scope codes, from their ancestors, and from unique-scope parents.
    pub fn read_scope(&self, cursor: &RowCursor) -> Result<RowCursor> {
        if !cursor.exists {
            return Err(RowError::NotFound);
        }
        if !cursor.cell_code.is_scope() {
            return Err(RowError::type_mismatch("scope", cursor.cell_code.name()));
        }
        let immutable =
            cursor.immutable || cursor.cell_code.is_immutable() || cursor.unique_scope;
        self.scope_cursor(&cursor.cell_type(), cursor.value_offset, immutable)
    }

    fn scope_cursor(
        &self,
        t: &TypeArgument,
        body_start: usize,
        immutable: bool,
    ) -> Result<RowCursor> {
        let code = t.code();
        if code.is_udt() {
            let id = t
                .schema_id()
                .ok_or_else(|| RowError::InvalidRow("udt scope without a schema id".into()))?;
            let layout = self.resolver().resolve(id)?;
            let body = self.sparse_region_start(&layout, body_start)?;
            return Ok(RowCursor::scoped(
                code,
                TypeArgumentList::new(),
                Some(layout),
                body_start,
                body,
                immutable,
            ));
        }
        if code.is_sized_scope() {
            let (count, prefix) = self.read_varuint_at(body_start)?;
            let mut cursor = RowCursor::scoped(
                code,
                t.args().clone(),
                None,
                body_start,
                body_start + prefix,
                immutable,
            );
            cursor.count = count as usize;
            return Ok(cursor);
        }
        if code.canonical() == TypeCode::NullableScope {
            let presence = self.read_u8_at(body_start)?;
            let mut cursor = RowCursor::scoped(
                code,
                t.args().clone(),
                None,
                body_start,
                body_start + 1,
                immutable,
            );
            cursor.count = usize::from(presence != 0);
            return Ok(cursor);
        }
        Ok(RowCursor::scoped(
            code,
            t.args().clone(),
            None,
            body_start,
            body_start,
            immutable,
        ))
    }

    // ---------------------------------------------------------------------
    // Writes
    // ---------------------------------------------------------------------

    pub fn write_sparse_bool(
        &mut self,
        cursor: &mut RowCursor,
        value: bool,
        options: WriteOptions,
    ) -> Result<()> {
        let code = if value {
            TypeCode::Boolean
        } else {
            TypeCode::BooleanFalse
        };
        self.write_sparse_cell(cursor, &TypeArgument::new(code), &[], options)
    }

    pub fn write_sparse_null(&mut self, cursor: &mut RowCursor, options: WriteOptions) -> Result<()> {
        self.write_sparse_cell(cursor, &TypeArgument::new(TypeCode::Null), &[], options)
    }

    pub fn write_sparse_varint(
        &mut self,
        cursor: &mut RowCursor,
        value: i64,
        options: WriteOptions,
    ) -> Result<()> {
        let mut buf = [0u8; MAX_VARINT_BYTES];
        let n = encode_varint(value, &mut buf);
        self.write_sparse_cell(cursor, &TypeArgument::new(TypeCode::VarInt), &buf[..n], options)
    }

    pub fn write_sparse_varuint(
        &mut self,
        cursor: &mut RowCursor,
        value: u64,
        options: WriteOptions,
    ) -> Result<()> {
        let mut buf = [0u8; MAX_VARINT_BYTES];
        let n = encode_varuint(value, &mut buf);
        self.write_sparse_cell(cursor, &TypeArgument::new(TypeCode::VarUInt), &buf[..n], options)
    }

    pub fn write_sparse_utf8(
        &mut self,
        cursor: &mut RowCursor,
        value: &str,
        options: WriteOptions,
    ) -> Result<()> {
        self.write_sparse_blob(cursor, TypeCode::Utf8, value.as_bytes(), options)
    }

    pub fn write_sparse_binary(
        &mut self,
        cursor: &mut RowCursor,
        value: &[u8],
        options: WriteOptions,
    ) -> Result<()> {
        self.write_sparse_blob(cursor, TypeCode::Binary, value, options)
    }

    fn write_sparse_blob(
        &mut self,
        cursor: &mut RowCursor,
        code: TypeCode,
        payload: &[u8],
        options: WriteOptions,
    ) -> Result<()> {
        let mut encoded = Vec::with_capacity(MAX_VARINT_BYTES + payload.len());
        let mut prefix = [0u8; MAX_VARINT_BYTES];
        let n = encode_varuint(payload.len() as u64, &mut prefix);
        encoded.extend_from_slice(&prefix[..n]);
        encoded.extend_from_slice(payload);
        self.write_sparse_cell(cursor, &TypeArgument::new(code), &encoded, options)
    }

    pub fn write_sparse_guid(
        &mut self,
        cursor: &mut RowCursor,
        value: &[u8; 16],
        options: WriteOptions,
    ) -> Result<()> {
        self.write_sparse_cell(cursor, &TypeArgument::new(TypeCode::Guid), value, options)
    }

    pub fn write_sparse_decimal(
        &mut self,
        cursor: &mut RowCursor,
        value: Decimal,
        options: WriteOptions,
    ) -> Result<()> {
        self.write_sparse_cell(
            cursor,
            &TypeArgument::new(TypeCode::Decimal),
            &value.to_le_bytes(),
            options,
        )
    }

    pub fn write_sparse_float128(
        &mut self,
        cursor: &mut RowCursor,
        value: Float128,
        options: WriteOptions,
    ) -> Result<()> {
        self.write_sparse_cell(
            cursor,
            &TypeArgument::new(TypeCode::Float128),
            &value.to_le_bytes(),
            options,
        )
    }

    pub fn write_sparse_object_id(
        &mut self,
        cursor: &mut RowCursor,
        value: ObjectId,
        options: WriteOptions,
    ) -> Result<()> {
        self.write_sparse_cell(
            cursor,
            &TypeArgument::new(TypeCode::ObjectId),
            value.as_bytes(),
            options,
        )
    }

    /// Writes a new scope cell with a default-initialized body and returns a
    /// child cursor positioned to fill it.
    pub fn write_scope(
        &mut self,
        cursor: &mut RowCursor,
        t: &TypeArgument,
        options: WriteOptions,
    ) -> Result<RowCursor> {
        if !t.code().is_scope() {
            return Err(RowError::type_mismatch("scope", t.code().name()));
        }
        let mut body = Vec::new();
        self.default_scope_body(t, &mut body)?;
        self.write_sparse_cell(cursor, t, &body, options)?;
        self.scope_cursor(t, cursor.value_offset, false)
    }

    /// Writes a nullable scope. When `has_value` the caller must write the
    /// inner value through the returned cursor immediately.
    pub fn write_nullable_scope(
        &mut self,
        cursor: &mut RowCursor,
        t: &TypeArgument,
        options: WriteOptions,
        has_value: bool,
    ) -> Result<RowCursor> {
        if t.code().canonical() != TypeCode::NullableScope {
            return Err(RowError::type_mismatch("nullable", t.code().name()));
        }
        self.write_sparse_cell(cursor, t, &[u8::from(has_value)], options)?;
        self.scope_cursor(t, cursor.value_offset, false)
    }

    /// Writes a tagged scope with the given tag value in slot 0 and default
    /// values in the remaining slots. The returned cursor iterates from the
    /// tag slot.
    pub fn write_tagged_scope(
        &mut self,
        cursor: &mut RowCursor,
        t: &TypeArgument,
        tag: u8,
        options: WriteOptions,
    ) -> Result<RowCursor> {
        if !matches!(
            t.code().canonical(),
            TypeCode::TaggedScope | TypeCode::Tagged2Scope
        ) {
            return Err(RowError::type_mismatch("tagged", t.code().name()));
        }
        let mut body = vec![tag];
        for arg in t.args().iter() {
            self.default_slot(arg, &mut body)?;
        }
        self.write_sparse_cell(cursor, t, &body, options)?;
        self.scope_cursor(t, cursor.value_offset, false)
    }

    /// Removes the cell the cursor is positioned on, leaving the cursor at
    /// the resulting insertion point. Sized scopes have their count
    /// decremented; fixed-arity slots cannot be deleted.
    pub fn delete_sparse(&mut self, cursor: &mut RowCursor) -> Result<()> {
        if cursor.immutable {
            return Err(RowError::InsufficientPermissions);
        }
        if !cursor.exists {
            return Err(RowError::NotFound);
        }
        let canon = cursor.scope_code.canonical();
        if cursor.layout.is_none() && canon.is_fixed_arity() {
            return Err(RowError::Unsupported(
                "fixed-arity scope slots cannot be deleted",
            ));
        }
        let ty = cursor.cell_type();
        let vlen = self.value_len(&ty, cursor.value_offset)?;
        let span = cursor.value_offset + vlen - cursor.meta_offset;
        self.shift(cursor.meta_offset + span, -(span as isize));
        cursor.exists = false;
        cursor.cell_path = None;
        cursor.value_offset = cursor.meta_offset;

        if cursor.layout.is_none() && canon.is_sized_scope() {
            let new_count = cursor.count - 1;
            let old_w = varuint_len(cursor.count as u64);
            let new_w = varuint_len(new_count as u64);
            let mut buf = [0u8; MAX_VARINT_BYTES];
            let n = encode_varuint(new_count as u64, &mut buf);
            self.put_at(cursor.start, &buf[..n]);
            if new_w < old_w {
                let diff = old_w - new_w;
                self.shift(cursor.start + old_w, -(diff as isize));
                cursor.meta_offset -= diff;
                cursor.value_offset -= diff;
            }
            cursor.count = new_count;
        }
        Ok(())
    }

    fn write_sparse_cell(
        &mut self,
        cursor: &mut RowCursor,
        t: &TypeArgument,
        value: &[u8],
        options: WriteOptions,
    ) -> Result<()> {
        if cursor.immutable {
            return Err(RowError::InsufficientPermissions);
        }
        let canon = cursor.scope_code.canonical();
        let sized = cursor.layout.is_none() && canon.is_sized_scope();
        if cursor.unique_scope && options != WriteOptions::InsertAt {
            return Err(RowError::Unsupported(
                "unique scopes only accept InsertAt writes",
            ));
        }
        if options == WriteOptions::InsertAt && !sized {
            return Err(RowError::Unsupported("InsertAt requires a sized scope"));
        }
        match options {
            WriteOptions::Insert if cursor.exists => return Err(RowError::Exists),
            WriteOptions::Update if !cursor.exists => return Err(RowError::NotFound),
            _ => {}
        }
        let elem = element_arg(cursor.scope_code, &cursor.scope_args, cursor.index);
        if let Some(e) = &elem {
            if !code_matches(e.code(), t.code()) {
                return Err(RowError::type_mismatch(e.code().name(), t.code().name()));
            }
        }
        if cursor.layout.is_none() && !cursor.exists {
            let arity = match canon {
                TypeCode::TypedTupleScope => Some(cursor.scope_args.len()),
                TypeCode::TaggedScope | TypeCode::Tagged2Scope => {
                    Some(cursor.scope_args.len() + 1)
                }
                TypeCode::NullableScope => Some(1),
                _ => None,
            };
            if let Some(n) = arity {
                if cursor.index >= n {
                    return Err(RowError::Unsupported(
                        "write past the end of a fixed-arity scope",
                    ));
                }
            }
        }

        let replacing = cursor.exists && options != WriteOptions::InsertAt;
        if !replacing && sized {
            let new_count = cursor.count + 1;
            let old_w = varuint_len(cursor.count as u64);
            let new_w = varuint_len(new_count as u64);
            if new_w != old_w {
                let diff = new_w - old_w;
                self.shift(cursor.start + old_w, diff as isize);
                cursor.meta_offset += diff;
                cursor.value_offset += diff;
            }
            let mut buf = [0u8; MAX_VARINT_BYTES];
            let n = encode_varuint(new_count as u64, &mut buf);
            self.put_at(cursor.start, &buf[..n]);
            cursor.count = new_count;
        }

        let old_len = if replacing {
            let current = cursor.cell_type();
            let vlen = self.value_len(&current, cursor.value_offset)?;
            cursor.value_offset + vlen - cursor.meta_offset
        } else {
            0
        };

        let explicit = elem.is_none() || t.code().always_requires_type_code();
        let path_tagged = cursor.layout.is_some() || canon == TypeCode::ObjectScope;
        let mut encoded: Vec<u8> = Vec::with_capacity(old_len.max(value.len()) + 16);
        if explicit {
            encoded.push(t.code() as u8);
        }
        if path_tagged {
            let path = cursor.cell_path.as_deref().ok_or_else(|| {
                RowError::InvalidRow("sparse write without a path; position with find first".into())
            })?;
            let mut prefix = [0u8; MAX_VARINT_BYTES];
            let n = encode_varuint(path.len() as u64, &mut prefix);
            encoded.extend_from_slice(&prefix[..n]);
            encoded.extend_from_slice(path.as_bytes());
        }
        if explicit && t.code().is_scope() {
            t.encode_body(&mut encoded);
        }
        let value_rel = encoded.len();
        encoded.extend_from_slice(value);

        let delta = encoded.len() as isize - old_len as isize;
        self.shift(cursor.meta_offset + old_len, delta);
        self.put_at(cursor.meta_offset, &encoded);

        if !replacing && cursor.layout.is_none() && canon == TypeCode::NullableScope {
            // An inserted value is only reachable once the presence byte
            // agrees with it.
            self.put_at(cursor.start, &[1]);
            cursor.count = 1;
        }

        cursor.value_offset = cursor.meta_offset + value_rel;
        cursor.exists = true;
        cursor.cell_code = t.code();
        cursor.cell_args = t.args().clone();
        cursor.cell_schema = t.schema_id();
        Ok(())
    }

    /// Default body bytes for a freshly written scope.
    fn default_scope_body(&self, t: &TypeArgument, out: &mut Vec<u8>) -> Result<()> {
        match t.code().canonical() {
            TypeCode::ObjectScope
            | TypeCode::ArrayScope
            | TypeCode::TupleScope
            | TypeCode::MapScope
            | TypeCode::SetScope => {
                out.push(TypeCode::EndScope as u8);
            }
            TypeCode::TypedArrayScope | TypeCode::TypedSetScope | TypeCode::TypedMapScope => {
                out.push(0);
            }
            TypeCode::TypedTupleScope => {
                for arg in t.args().iter() {
                    self.default_slot(arg, out)?;
                }
            }
            TypeCode::NullableScope => out.push(0),
            TypeCode::TaggedScope | TypeCode::Tagged2Scope => {
                out.push(0);
                for arg in t.args().iter() {
                    self.default_slot(arg, out)?;
                }
            }
            TypeCode::Schema => {
                let id = t
                    .schema_id()
                    .ok_or_else(|| RowError::InvalidRow("udt scope without a schema id".into()))?;
                let layout = self.resolver().resolve(id)?;
                out.resize(out.len() + layout.size(), 0);
                out.push(TypeCode::EndScope as u8);
            }
            code => return Err(RowError::type_mismatch("scope", code.name())),
        }
        Ok(())
    }

    /// Default encoding of one typed slot: zeroed fixed values, empty
    /// variable values, empty nested scopes.
    fn default_slot(&self, arg: &TypeArgument, out: &mut Vec<u8>) -> Result<()> {
        let code = arg.code();
        if code.always_requires_type_code() {
            out.push(if code.is_boolean() {
                TypeCode::BooleanFalse as u8
            } else {
                code as u8
            });
            return Ok(());
        }
        if let Some(n) = code.fixed_size() {
            out.resize(out.len() + n, 0);
            return Ok(());
        }
        match code {
            TypeCode::VarInt | TypeCode::VarUInt | TypeCode::Utf8 | TypeCode::Binary => {
                out.push(0);
                Ok(())
            }
            code if code.is_scope() => self.default_scope_body(arg, out),
            code => Err(RowError::InvalidRow(format!(
                "type {code} has no default encoding"
            ))),
        }
    }

    // ---------------------------------------------------------------------
    // Unique scopes
    // ---------------------------------------------------------------------

    /// Moves the field under `src` into the unique scope under `dst`,
    /// keeping elements sorted by their encoded key. The source field is
    /// deleted whether or not the move succeeds.
    pub fn typed_collection_move_field(
        &mut self,
        dst: &mut RowCursor,
        src: &mut RowCursor,
        options: WriteOptions,
    ) -> Result<()> {
        if !dst.unique_scope {
            return Err(RowError::Unsupported(
                "destination is not a unique scope",
            ));
        }
        if dst.immutable {
            return Err(RowError::InsufficientPermissions);
        }
        if !src.exists {
            return Err(RowError::NotFound);
        }
        let elem = element_arg(dst.scope_code, &dst.scope_args, 0).ok_or(
            RowError::Unsupported("destination scope has no element type"),
        )?;
        if !code_matches(elem.code(), src.cell_code) {
            return Err(RowError::type_mismatch(
                elem.code().name(),
                src.cell_code.name(),
            ));
        }
        let is_map = dst.scope_code.canonical() == TypeCode::TypedMapScope;

        // Extract the element as it will be encoded inside the scope, and
        // its key prefix, before the probe is deleted out from under us.
        let explicit = elem.code().always_requires_type_code();
        let vlen = self.value_len(&src.cell_type(), src.value_offset)?;
        let mut element = Vec::with_capacity(1 + vlen);
        if explicit {
            element.push(src.cell_code as u8);
        }
        element.extend_from_slice(&self.data[src.value_offset..src.value_offset + vlen]);
        let key = if is_map {
            let key_arg = dst.scope_args.get(0).ok_or(RowError::Unsupported(
                "map scope has no key type",
            ))?;
            let key_end = self.skip_cell(src.value_offset, Some(key_arg), false)?;
            self.data[src.value_offset..key_end].to_vec()
        } else {
            element.clone()
        };

        let probe_at = src.meta_offset;
        let before = self.data.len() as isize;
        self.delete_sparse(src)?;
        dst.adjust(probe_at, self.data.len() as isize - before);

        // Locate the sorted position inside the destination scope.
        let key_arg = dst.scope_args.get(0).cloned();
        let mut pos = dst.start + varuint_len(dst.count as u64);
        let mut found: Option<(usize, usize)> = None;
        let mut insert_at = None;
        for _ in 0..dst.count {
            let end = self.skip_cell(pos, Some(&elem), false)?;
            let key_len = if is_map {
                let key_arg = key_arg.as_ref().ok_or(RowError::Unsupported(
                    "map scope has no key type",
                ))?;
                self.skip_cell(pos, Some(key_arg), false)? - pos
            } else {
                end - pos
            };
            match self.data[pos..pos + key_len].cmp(key.as_slice()) {
                std::cmp::Ordering::Equal => {
                    found = Some((pos, end));
                    break;
                }
                std::cmp::Ordering::Greater => {
                    insert_at = Some(pos);
                    break;
                }
                std::cmp::Ordering::Less => pos = end,
            }
        }

        if let Some((start, end)) = found {
            if matches!(options, WriteOptions::Insert | WriteOptions::InsertAt) {
                return Err(RowError::Exists);
            }
            let delta = element.len() as isize - (end - start) as isize;
            self.shift(end, delta);
            self.put_at(start, &element);
        } else {
            if options == WriteOptions::Update {
                return Err(RowError::NotFound);
            }
            let mut at = insert_at.unwrap_or(pos);
            let new_count = dst.count + 1;
            let old_w = varuint_len(dst.count as u64);
            let new_w = varuint_len(new_count as u64);
            if new_w != old_w {
                self.shift(dst.start + old_w, (new_w - old_w) as isize);
                at += new_w - old_w;
            }
            let mut buf = [0u8; MAX_VARINT_BYTES];
            let n = encode_varuint(new_count as u64, &mut buf);
            self.put_at(dst.start, &buf[..n]);
            self.shift(at, element.len() as isize);
            self.put_at(at, &element);
            dst.count = new_count;
        }

        dst.index = 0;
        dst.exists = false;
        dst.meta_offset = dst.start + varuint_len(dst.count as u64);
        dst.value_offset = dst.meta_offset;
        Ok(())
    }

    /// Re-sorts a unique scope's elements by encoded key after batch
    /// `InsertAt` writes, collapsing duplicate keys down to their first
    /// occurrence.
    pub fn unique_index_rebuild(&mut self, scope: &mut RowCursor) -> Result<()> {
        if !scope.unique_scope {
            return Err(RowError::Unsupported("not a unique scope"));
        }
        if scope.immutable {
            return Err(RowError::InsufficientPermissions);
        }
        let elem = element_arg(scope.scope_code, &scope.scope_args, 0).ok_or(
            RowError::Unsupported("scope has no element type"),
        )?;
        let is_map = scope.scope_code.canonical() == TypeCode::TypedMapScope;
        let key_arg = scope.scope_args.get(0).cloned();

        let old_w = varuint_len(scope.count as u64);
        let body = scope.start + old_w;
        let mut pos = body;
        let mut elements: Vec<(Vec<u8>, Vec<u8>)> = Vec::with_capacity(scope.count);
        for _ in 0..scope.count {
            let end = self.skip_cell(pos, Some(&elem), false)?;
            let key_len = if is_map {
                let key_arg = key_arg.as_ref().ok_or(RowError::Unsupported(
                    "map scope has no key type",
                ))?;
                self.skip_cell(pos, Some(key_arg), false)? - pos
            } else {
                end - pos
            };
            elements.push((
                self.data[pos..pos + key_len].to_vec(),
                self.data[pos..end].to_vec(),
            ));
            pos = end;
        }
        let old_total = pos - scope.start;

        elements.sort_by(|a, b| a.0.cmp(&b.0));
        elements.dedup_by(|a, b| a.0 == b.0);

        let new_count = elements.len();
        let new_w = varuint_len(new_count as u64);
        let mut rebuilt = Vec::with_capacity(old_total);
        let mut buf = [0u8; MAX_VARINT_BYTES];
        let n = encode_varuint(new_count as u64, &mut buf);
        rebuilt.extend_from_slice(&buf[..n]);
        debug_assert_eq!(n, new_w);
        for (_, cell) in &elements {
            rebuilt.extend_from_slice(cell);
        }

        let delta = rebuilt.len() as isize - old_total as isize;
        self.shift(scope.start + old_total, delta);
        self.put_at(scope.start, &rebuilt);

        scope.count = new_count;
        scope.index = 0;
        scope.exists = false;
        scope.meta_offset = scope.start + new_w;
        scope.value_offset = scope.meta_offset;
        Ok(())
    }
}
