//! # Row Buffer
//!
//! `RowBuffer` owns the bytes of one row and implements every read and write
//! against them. All multi-byte values are little-endian. The buffer is the
//! single mutation point: edits that change the row's length go through
//! [`RowBuffer::shift`], which moves the tail and lets the caller repair the
//! cursor that performed the edit.

use std::sync::Arc;

use crate::encoding::varint::{
    decode_varint, decode_varuint, encode_varint, encode_varuint, MAX_VARINT_BYTES,
};
use crate::error::{Result, RowError};
use crate::layout::{Layout, LayoutBit, LayoutColumn, LayoutResolver, StorageKind};
use crate::row::cursor::RowCursor;
use crate::row::header::{RowHeader, VERSION_V1};
use crate::types::{Decimal, Float128, ObjectId, SchemaId, TypeArgumentList, TypeCode};

/// A mutable, growable row.
pub struct RowBuffer {
    pub(crate) data: Vec<u8>,
    resolver: Arc<dyn LayoutResolver>,
    layout: Option<Arc<Layout>>,
}

macro_rules! le_at {
    ($read:ident, $write:ident, $t:ty) => {
        pub(crate) fn $read(&self, offset: usize) -> Result<$t> {
            let bytes = self.bytes_at(offset, std::mem::size_of::<$t>())?;
            Ok(<$t>::from_le_bytes(bytes.try_into().unwrap()))
        }

        pub(crate) fn $write(&mut self, offset: usize, value: $t) {
            self.put_at(offset, &value.to_le_bytes());
        }
    };
}

macro_rules! fixed_accessors {
    ($read:ident, $write:ident, $t:ty, $code:ident, $read_at:ident, $write_at:ident) => {
        pub fn $read(&self, scope: &RowCursor, column: &LayoutColumn) -> Result<$t> {
            self.check_fixed(scope, column, TypeCode::$code)?;
            if !self.read_bit(scope.start, column.null_bit()) {
                return Err(RowError::NotFound);
            }
            self.$read_at(scope.start + column.offset())
        }

        pub fn $write(
            &mut self,
            scope: &RowCursor,
            column: &LayoutColumn,
            value: $t,
        ) -> Result<()> {
            self.check_fixed_write(scope, column, TypeCode::$code)?;
            self.$write_at(scope.start + column.offset(), value);
            self.set_bit(scope.start, column.null_bit());
            Ok(())
        }
    };
}

impl RowBuffer {
    /// Creates an empty buffer with the given initial capacity.
    pub fn new(capacity: usize, resolver: Arc<dyn LayoutResolver>) -> Self {
        RowBuffer {
            data: Vec::with_capacity(capacity),
            resolver,
            layout: None,
        }
    }

    /// Initializes the buffer as an empty row of the given layout: header
    /// followed by a zeroed fixed region.
    pub fn init_layout(&mut self, layout: &Arc<Layout>) {
        self.data.clear();
        let header = RowHeader::new(VERSION_V1, layout.schema_id());
        self.data.extend_from_slice(&header.encode());
        self.data.resize(RowHeader::BYTES + layout.size(), 0);
        self.layout = Some(layout.clone());
    }

    /// Wraps an existing encoded row, validating its header and resolving
    /// its root layout.
    pub fn attach(bytes: Vec<u8>, resolver: Arc<dyn LayoutResolver>) -> Result<Self> {
        let header = RowHeader::decode(&bytes)?;
        let layout = resolver.resolve(header.schema_id())?;
        if bytes.len() < RowHeader::BYTES + layout.size() {
            return Err(RowError::InvalidRow(format!(
                "row shorter than the fixed region of schema {}",
                header.schema_id()
            )));
        }
        Ok(RowBuffer {
            data: bytes,
            resolver,
            layout: Some(layout),
        })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    pub fn header(&self) -> Result<RowHeader> {
        RowHeader::decode(&self.data)
    }

    pub(crate) fn resolver(&self) -> &Arc<dyn LayoutResolver> {
        &self.resolver
    }

    /// A cursor over the root scope of the row.
    pub fn root_cursor(&self) -> Result<RowCursor> {
        let layout = self
            .layout
            .clone()
            .ok_or_else(|| RowError::InvalidRow("row is not initialized".into()))?;
        let start = RowHeader::BYTES;
        let sparse = self.sparse_region_start(&layout, start)?;
        Ok(RowCursor::scoped(
            TypeCode::Schema,
            TypeArgumentList::new(),
            Some(layout),
            start,
            sparse,
            false,
        ))
    }

    // ---------------------------------------------------------------------
    // Byte-level primitives
    // ---------------------------------------------------------------------

    pub(crate) fn bytes_at(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let end = offset
            .checked_add(len)
            .ok_or(RowError::InsufficientBuffer { need: usize::MAX })?;
        self.data
            .get(offset..end)
            .ok_or(RowError::InsufficientBuffer { need: end })
    }

    pub(crate) fn put_at(&mut self, offset: usize, bytes: &[u8]) {
        debug_assert!(offset + bytes.len() <= self.data.len());
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    le_at!(read_u8_at, write_u8_at, u8);
    le_at!(read_u16_at, write_u16_at, u16);
    le_at!(read_u32_at, write_u32_at, u32);
    le_at!(read_u64_at, write_u64_at, u64);
    le_at!(read_i8_at, write_i8_at, i8);
    le_at!(read_i16_at, write_i16_at, i16);
    le_at!(read_i32_at, write_i32_at, i32);
    le_at!(read_i64_at, write_i64_at, i64);
    le_at!(read_f32_at, write_f32_at, f32);
    le_at!(read_f64_at, write_f64_at, f64);

    pub(crate) fn read_varuint_at(&self, offset: usize) -> Result<(u64, usize)> {
        let tail = self
            .data
            .get(offset..)
            .ok_or(RowError::InsufficientBuffer { need: offset })?;
        decode_varuint(tail)
    }

    pub(crate) fn read_varint_at(&self, offset: usize) -> Result<(i64, usize)> {
        let tail = self
            .data
            .get(offset..)
            .ok_or(RowError::InsufficientBuffer { need: offset })?;
        decode_varint(tail)
    }

    /// Grows or shrinks the row at `at` by `delta` bytes, moving everything
    /// from `at` onward. Grown bytes are uninitialized from the caller's
    /// point of view and must be overwritten.
    pub(crate) fn shift(&mut self, at: usize, delta: isize) {
        if delta > 0 {
            let grow = delta as usize;
            let old_len = self.data.len();
            self.data.resize(old_len + grow, 0);
            self.data.copy_within(at..old_len, at + grow);
        } else if delta < 0 {
            let shrink = (-delta) as usize;
            debug_assert!(shrink <= at && at <= self.data.len());
            self.data.copy_within(at.., at - shrink);
            self.data.truncate(self.data.len() - shrink);
        }
    }

    // ---------------------------------------------------------------------
    // Presence bits
    // ---------------------------------------------------------------------

    /// Reads a presence bit. An unallocated bit reads as set: non-nullable
    /// columns are always present.
    pub(crate) fn read_bit(&self, base: usize, bit: LayoutBit) -> bool {
        if bit.is_invalid() {
            return true;
        }
        self.data[bit.offset(base)] & (1 << bit.bit()) != 0
    }

    pub(crate) fn set_bit(&mut self, base: usize, bit: LayoutBit) {
        if !bit.is_invalid() {
            self.data[bit.offset(base)] |= 1 << bit.bit();
        }
    }

    pub(crate) fn unset_bit(&mut self, base: usize, bit: LayoutBit) {
        if !bit.is_invalid() {
            self.data[bit.offset(base)] &= !(1 << bit.bit());
        }
    }

    // ---------------------------------------------------------------------
    // Fixed column access
    // ---------------------------------------------------------------------

    fn check_fixed(&self, scope: &RowCursor, column: &LayoutColumn, code: TypeCode) -> Result<()> {
        if scope.layout.is_none() {
            return Err(RowError::type_mismatch("schema scope", scope.scope_code.name()));
        }
        if column.storage() != StorageKind::Fixed {
            return Err(RowError::type_mismatch("fixed column", column.code().name()));
        }
        if column.code() != code {
            return Err(RowError::type_mismatch(code.name(), column.code().name()));
        }
        Ok(())
    }

    fn check_fixed_write(
        &self,
        scope: &RowCursor,
        column: &LayoutColumn,
        code: TypeCode,
    ) -> Result<()> {
        self.check_fixed(scope, column, code)?;
        if scope.immutable {
            return Err(RowError::InsufficientPermissions);
        }
        Ok(())
    }

    fixed_accessors!(read_i8, write_i8, i8, Int8, read_i8_at, write_i8_at);
    fixed_accessors!(read_i16, write_i16, i16, Int16, read_i16_at, write_i16_at);
    fixed_accessors!(read_i32, write_i32, i32, Int32, read_i32_at, write_i32_at);
    fixed_accessors!(read_i64, write_i64, i64, Int64, read_i64_at, write_i64_at);
    fixed_accessors!(read_u8, write_u8, u8, UInt8, read_u8_at, write_u8_at);
    fixed_accessors!(read_u16, write_u16, u16, UInt16, read_u16_at, write_u16_at);
    fixed_accessors!(read_u32, write_u32, u32, UInt32, read_u32_at, write_u32_at);
    fixed_accessors!(read_u64, write_u64, u64, UInt64, read_u64_at, write_u64_at);
    fixed_accessors!(read_f32, write_f32, f32, Float32, read_f32_at, write_f32_at);
    fixed_accessors!(read_f64, write_f64, f64, Float64, read_f64_at, write_f64_at);
    fixed_accessors!(
        read_datetime,
        write_datetime,
        u64,
        DateTime,
        read_u64_at,
        write_u64_at
    );
    fixed_accessors!(
        read_unix_datetime,
        write_unix_datetime,
        i64,
        UnixDateTime,
        read_i64_at,
        write_i64_at
    );

    pub fn read_bool(&self, scope: &RowCursor, column: &LayoutColumn) -> Result<bool> {
        self.check_fixed(scope, column, TypeCode::Boolean)?;
        if !self.read_bit(scope.start, column.null_bit()) {
            return Err(RowError::NotFound);
        }
        Ok(self.read_bit(scope.start, column.bool_bit()))
    }

    pub fn write_bool(&mut self, scope: &RowCursor, column: &LayoutColumn, value: bool) -> Result<()> {
        self.check_fixed_write(scope, column, TypeCode::Boolean)?;
        if value {
            self.set_bit(scope.start, column.bool_bit());
        } else {
            self.unset_bit(scope.start, column.bool_bit());
        }
        self.set_bit(scope.start, column.null_bit());
        Ok(())
    }

    /// Reads a fixed null column: `Ok(())` when the null value is present.
    pub fn read_null(&self, scope: &RowCursor, column: &LayoutColumn) -> Result<()> {
        self.check_fixed(scope, column, TypeCode::Null)?;
        if !self.read_bit(scope.start, column.bool_bit()) {
            return Err(RowError::NotFound);
        }
        Ok(())
    }

    pub fn write_null(&mut self, scope: &RowCursor, column: &LayoutColumn) -> Result<()> {
        self.check_fixed_write(scope, column, TypeCode::Null)?;
        self.set_bit(scope.start, column.bool_bit());
        Ok(())
    }

    pub fn read_guid(&self, scope: &RowCursor, column: &LayoutColumn) -> Result<[u8; 16]> {
        self.check_fixed(scope, column, TypeCode::Guid)?;
        if !self.read_bit(scope.start, column.null_bit()) {
            return Err(RowError::NotFound);
        }
        let bytes = self.bytes_at(scope.start + column.offset(), 16)?;
        Ok(bytes.try_into().unwrap())
    }

    pub fn write_guid(
        &mut self,
        scope: &RowCursor,
        column: &LayoutColumn,
        value: &[u8; 16],
    ) -> Result<()> {
        self.check_fixed_write(scope, column, TypeCode::Guid)?;
        self.put_at(scope.start + column.offset(), value);
        self.set_bit(scope.start, column.null_bit());
        Ok(())
    }

    pub fn read_decimal(&self, scope: &RowCursor, column: &LayoutColumn) -> Result<Decimal> {
        self.check_fixed(scope, column, TypeCode::Decimal)?;
        if !self.read_bit(scope.start, column.null_bit()) {
            return Err(RowError::NotFound);
        }
        let bytes = self.bytes_at(scope.start + column.offset(), Decimal::BYTES)?;
        Decimal::from_le_bytes(bytes.try_into().unwrap())
    }

    pub fn write_decimal(
        &mut self,
        scope: &RowCursor,
        column: &LayoutColumn,
        value: Decimal,
    ) -> Result<()> {
        self.check_fixed_write(scope, column, TypeCode::Decimal)?;
        self.put_at(scope.start + column.offset(), &value.to_le_bytes());
        self.set_bit(scope.start, column.null_bit());
        Ok(())
    }

    pub fn read_float128(&self, scope: &RowCursor, column: &LayoutColumn) -> Result<Float128> {
        self.check_fixed(scope, column, TypeCode::Float128)?;
        if !self.read_bit(scope.start, column.null_bit()) {
            return Err(RowError::NotFound);
        }
        let bytes = self.bytes_at(scope.start + column.offset(), Float128::BYTES)?;
        Ok(Float128::from_le_bytes(bytes.try_into().unwrap()))
    }

    pub fn write_float128(
        &mut self,
        scope: &RowCursor,
        column: &LayoutColumn,
        value: Float128,
    ) -> Result<()> {
        self.check_fixed_write(scope, column, TypeCode::Float128)?;
        self.put_at(scope.start + column.offset(), &value.to_le_bytes());
        self.set_bit(scope.start, column.null_bit());
        Ok(())
    }

    pub fn read_object_id(&self, scope: &RowCursor, column: &LayoutColumn) -> Result<ObjectId> {
        self.check_fixed(scope, column, TypeCode::ObjectId)?;
        if !self.read_bit(scope.start, column.null_bit()) {
            return Err(RowError::NotFound);
        }
        let bytes = self.bytes_at(scope.start + column.offset(), ObjectId::BYTES)?;
        Ok(ObjectId::new(bytes.try_into().unwrap()))
    }

    pub fn write_object_id(
        &mut self,
        scope: &RowCursor,
        column: &LayoutColumn,
        value: ObjectId,
    ) -> Result<()> {
        self.check_fixed_write(scope, column, TypeCode::ObjectId)?;
        self.put_at(scope.start + column.offset(), value.as_bytes());
        self.set_bit(scope.start, column.null_bit());
        Ok(())
    }

    /// Reads a fixed-length Utf8 column. The payload always occupies exactly
    /// the declared length.
    pub fn read_fixed_utf8(&self, scope: &RowCursor, column: &LayoutColumn) -> Result<&str> {
        self.check_fixed(scope, column, TypeCode::Utf8)?;
        if !self.read_bit(scope.start, column.null_bit()) {
            return Err(RowError::NotFound);
        }
        let bytes = self.bytes_at(scope.start + column.offset(), column.length())?;
        std::str::from_utf8(bytes)
            .map_err(|_| RowError::InvalidRow("fixed utf8 column is not valid UTF-8".into()))
    }

    pub fn write_fixed_utf8(
        &mut self,
        scope: &RowCursor,
        column: &LayoutColumn,
        value: &str,
    ) -> Result<()> {
        self.check_fixed_write(scope, column, TypeCode::Utf8)?;
        if value.len() != column.length() {
            return Err(RowError::TooBig {
                capacity: column.length(),
                actual: value.len(),
            });
        }
        self.put_at(scope.start + column.offset(), value.as_bytes());
        self.set_bit(scope.start, column.null_bit());
        Ok(())
    }

    pub fn read_fixed_binary(&self, scope: &RowCursor, column: &LayoutColumn) -> Result<&[u8]> {
        self.check_fixed(scope, column, TypeCode::Binary)?;
        if !self.read_bit(scope.start, column.null_bit()) {
            return Err(RowError::NotFound);
        }
        self.bytes_at(scope.start + column.offset(), column.length())
    }

    pub fn write_fixed_binary(
        &mut self,
        scope: &RowCursor,
        column: &LayoutColumn,
        value: &[u8],
    ) -> Result<()> {
        self.check_fixed_write(scope, column, TypeCode::Binary)?;
        if value.len() != column.length() {
            return Err(RowError::TooBig {
                capacity: column.length(),
                actual: value.len(),
            });
        }
        self.put_at(scope.start + column.offset(), value);
        self.set_bit(scope.start, column.null_bit());
        Ok(())
    }

    /// Clears a fixed column's presence. The value bytes are retained but
    /// unreachable. Non-nullable columns cannot be deleted.
    pub fn delete_fixed(&mut self, scope: &RowCursor, column: &LayoutColumn) -> Result<()> {
        if scope.layout.is_none() {
            return Err(RowError::type_mismatch("schema scope", scope.scope_code.name()));
        }
        if column.storage() != StorageKind::Fixed {
            return Err(RowError::type_mismatch("fixed column", column.code().name()));
        }
        if scope.immutable {
            return Err(RowError::InsufficientPermissions);
        }
        if column.code() == TypeCode::Null {
            self.unset_bit(scope.start, column.bool_bit());
            return Ok(());
        }
        if !column.is_nullable() {
            return Err(RowError::type_mismatch("nullable column", "non-nullable column"));
        }
        self.unset_bit(scope.start, column.null_bit());
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Variable column access
    // ---------------------------------------------------------------------

    fn check_variable(
        &self,
        scope: &RowCursor,
        column: &LayoutColumn,
        code: TypeCode,
    ) -> Result<Arc<Layout>> {
        let layout = scope
            .layout
            .clone()
            .ok_or_else(|| RowError::type_mismatch("schema scope", scope.scope_code.name()))?;
        if column.storage() != StorageKind::Variable {
            return Err(RowError::type_mismatch("variable column", column.code().name()));
        }
        if column.code() != code {
            return Err(RowError::type_mismatch(code.name(), column.code().name()));
        }
        Ok(layout)
    }

    /// Size in bytes one variable value occupies, including any length
    /// prefix.
    fn variable_size_at(&self, code: TypeCode, offset: usize) -> Result<usize> {
        match code {
            TypeCode::VarInt | TypeCode::VarUInt => {
                let (_, consumed) = self.read_varuint_at(offset)?;
                Ok(consumed)
            }
            _ => {
                let (len, consumed) = self.read_varuint_at(offset)?;
                Ok(consumed + len as usize)
            }
        }
    }

    /// Offset of a variable column's value: the end of the fixed region plus
    /// the sizes of every present variable column declared before it.
    fn variable_value_offset(
        &self,
        layout: &Layout,
        scope_start: usize,
        ordinal: usize,
    ) -> Result<usize> {
        let mut pos = scope_start + layout.size();
        let vars = &layout.columns()[layout.fixed_count()..layout.fixed_count() + layout.variable_count()];
        for col in vars {
            if col.offset() >= ordinal {
                break;
            }
            if self.read_bit(scope_start, col.null_bit()) {
                pos += self.variable_size_at(col.code(), pos)?;
            }
        }
        Ok(pos)
    }

    /// Offset of the first sparse entry of a schema-rooted scope.
    pub(crate) fn sparse_region_start(&self, layout: &Layout, scope_start: usize) -> Result<usize> {
        self.variable_value_offset(layout, scope_start, usize::MAX)
    }

    pub fn read_variable_utf8(&self, scope: &RowCursor, column: &LayoutColumn) -> Result<&str> {
        let layout = self.check_variable(scope, column, TypeCode::Utf8)?;
        if !self.read_bit(scope.start, column.null_bit()) {
            return Err(RowError::NotFound);
        }
        let pos = self.variable_value_offset(&layout, scope.start, column.offset())?;
        let (len, consumed) = self.read_varuint_at(pos)?;
        let bytes = self.bytes_at(pos + consumed, len as usize)?;
        std::str::from_utf8(bytes)
            .map_err(|_| RowError::InvalidRow("variable utf8 column is not valid UTF-8".into()))
    }

    pub fn read_variable_binary(&self, scope: &RowCursor, column: &LayoutColumn) -> Result<&[u8]> {
        let layout = self.check_variable(scope, column, TypeCode::Binary)?;
        if !self.read_bit(scope.start, column.null_bit()) {
            return Err(RowError::NotFound);
        }
        let pos = self.variable_value_offset(&layout, scope.start, column.offset())?;
        let (len, consumed) = self.read_varuint_at(pos)?;
        self.bytes_at(pos + consumed, len as usize)
    }

    pub fn read_variable_varint(&self, scope: &RowCursor, column: &LayoutColumn) -> Result<i64> {
        let layout = self.check_variable(scope, column, TypeCode::VarInt)?;
        if !self.read_bit(scope.start, column.null_bit()) {
            return Err(RowError::NotFound);
        }
        let pos = self.variable_value_offset(&layout, scope.start, column.offset())?;
        Ok(self.read_varint_at(pos)?.0)
    }

    pub fn read_variable_varuint(&self, scope: &RowCursor, column: &LayoutColumn) -> Result<u64> {
        let layout = self.check_variable(scope, column, TypeCode::VarUInt)?;
        if !self.read_bit(scope.start, column.null_bit()) {
            return Err(RowError::NotFound);
        }
        let pos = self.variable_value_offset(&layout, scope.start, column.offset())?;
        Ok(self.read_varuint_at(pos)?.0)
    }

    pub fn write_variable_utf8(
        &mut self,
        scope: &mut RowCursor,
        column: &LayoutColumn,
        value: &str,
    ) -> Result<()> {
        self.check_variable(scope, column, TypeCode::Utf8)?;
        self.write_variable_payload(scope, column, value.as_bytes())
    }

    pub fn write_variable_binary(
        &mut self,
        scope: &mut RowCursor,
        column: &LayoutColumn,
        value: &[u8],
    ) -> Result<()> {
        self.check_variable(scope, column, TypeCode::Binary)?;
        self.write_variable_payload(scope, column, value)
    }

    pub fn write_variable_varint(
        &mut self,
        scope: &mut RowCursor,
        column: &LayoutColumn,
        value: i64,
    ) -> Result<()> {
        self.check_variable(scope, column, TypeCode::VarInt)?;
        let mut buf = [0u8; MAX_VARINT_BYTES];
        let n = encode_varint(value, &mut buf);
        self.write_variable_raw(scope, column, &buf[..n])
    }

    pub fn write_variable_varuint(
        &mut self,
        scope: &mut RowCursor,
        column: &LayoutColumn,
        value: u64,
    ) -> Result<()> {
        self.check_variable(scope, column, TypeCode::VarUInt)?;
        let mut buf = [0u8; MAX_VARINT_BYTES];
        let n = encode_varuint(value, &mut buf);
        self.write_variable_raw(scope, column, &buf[..n])
    }

    /// Writes a length-prefixed variable payload.
    fn write_variable_payload(
        &mut self,
        scope: &mut RowCursor,
        column: &LayoutColumn,
        payload: &[u8],
    ) -> Result<()> {
        if column.length() > 0 && payload.len() > column.length() {
            return Err(RowError::TooBig {
                capacity: column.length(),
                actual: payload.len(),
            });
        }
        let mut prefix = [0u8; MAX_VARINT_BYTES];
        let prefix_len = encode_varuint(payload.len() as u64, &mut prefix);

        let mut encoded = Vec::with_capacity(prefix_len + payload.len());
        encoded.extend_from_slice(&prefix[..prefix_len]);
        encoded.extend_from_slice(payload);
        self.write_variable_raw(scope, column, &encoded)
    }

    /// Replaces (or inserts) a variable column's full encoding and repairs
    /// the calling cursor for the resulting shift.
    fn write_variable_raw(
        &mut self,
        scope: &mut RowCursor,
        column: &LayoutColumn,
        encoded: &[u8],
    ) -> Result<()> {
        if scope.immutable {
            return Err(RowError::InsufficientPermissions);
        }
        let layout = scope
            .layout
            .clone()
            .ok_or_else(|| RowError::type_mismatch("schema scope", scope.scope_code.name()))?;
        let exists = self.read_bit(scope.start, column.null_bit());
        let pos = self.variable_value_offset(&layout, scope.start, column.offset())?;
        let old_size = if exists {
            self.variable_size_at(column.code(), pos)?
        } else {
            0
        };

        let delta = encoded.len() as isize - old_size as isize;
        self.shift(pos + old_size, delta);
        self.put_at(pos, encoded);
        self.set_bit(scope.start, column.null_bit());
        scope.adjust(pos, delta);
        Ok(())
    }

    /// Removes a variable column's value, shrinking the row. Deleting an
    /// absent value is a no-op.
    pub fn delete_variable(&mut self, scope: &mut RowCursor, column: &LayoutColumn) -> Result<()> {
        let layout = self.check_variable(scope, column, column.code())?;
        if scope.immutable {
            return Err(RowError::InsufficientPermissions);
        }
        if !self.read_bit(scope.start, column.null_bit()) {
            return Ok(());
        }
        let pos = self.variable_value_offset(&layout, scope.start, column.offset())?;
        let size = self.variable_size_at(column.code(), pos)?;
        self.shift(pos + size, -(size as isize));
        self.unset_bit(scope.start, column.null_bit());
        scope.adjust(pos, -(size as isize));
        Ok(())
    }

    pub(crate) fn read_schema_id_at(&self, offset: usize) -> Result<SchemaId> {
        let bytes = self.bytes_at(offset, SchemaId::BYTES)?;
        Ok(SchemaId::from_le_bytes(bytes.try_into().unwrap()))
    }
}

impl std::fmt::Debug for RowBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowBuffer")
            .field("len", &self.data.len())
            .field(
                "schema",
                &self.layout.as_ref().map(|l| l.schema_id()),
            )
            .finish()
    }
}
