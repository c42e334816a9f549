//! # RecordIO Framing
//!
//! The stream container interleaves system rows with opaque payloads:
//!
//! ```text
//! [segment row] [record row][body] [record row][body] ... [segment row] ...
//! ```
//!
//! Both framing rows use reserved schema ids near the top of the positive
//! `i32` range so they can never collide with user schemas:
//!
//! | Row | Schema id | Fixed columns | Variable columns |
//! |-----|-----------|---------------|------------------|
//! | Segment | 2147473648 | `length: i32` | `comment: utf8`, `sdl: utf8` |
//! | Record | 2147473649 | `length: u32`, `crc32: u32` | none |
//!
//! A segment's `length` is the byte size of the segment row itself. A
//! record's `length` is the byte size of the body that follows its row, and
//! `crc32` is the CRC-32/ISO-HDLC digest of those body bytes.

use std::sync::{Arc, OnceLock};

use crc::{Crc, CRC_32_ISO_HDLC};

use crate::error::{Result, RowError};
use crate::layout::{Layout, LayoutBuilder, LayoutColumn, SimpleResolver};
use crate::row::{RowBuffer, RowHeader};
use crate::types::{SchemaId, TypeCode};

/// Schema id of the segment framing row.
pub const SEGMENT_SCHEMA_ID: SchemaId = SchemaId::new(2_147_473_648);

/// Schema id of the record framing row.
pub const RECORD_SCHEMA_ID: SchemaId = SchemaId::new(2_147_473_649);

pub(crate) const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

pub(crate) fn segment_layout() -> &'static Arc<Layout> {
    static LAYOUT: OnceLock<Arc<Layout>> = OnceLock::new();
    LAYOUT.get_or_init(|| {
        let mut builder = LayoutBuilder::new("segment", SEGMENT_SCHEMA_ID);
        builder
            .add_fixed_column("length", TypeCode::Int32, false, 0)
            .and_then(|b| b.add_variable_column("comment", TypeCode::Utf8, 0))
            .and_then(|b| b.add_variable_column("sdl", TypeCode::Utf8, 0))
            .expect("segment layout is well-formed");
        Arc::new(builder.build())
    })
}

pub(crate) fn record_layout() -> &'static Arc<Layout> {
    static LAYOUT: OnceLock<Arc<Layout>> = OnceLock::new();
    LAYOUT.get_or_init(|| {
        let mut builder = LayoutBuilder::new("record", RECORD_SCHEMA_ID);
        builder
            .add_fixed_column("length", TypeCode::UInt32, false, 0)
            .and_then(|b| b.add_fixed_column("crc32", TypeCode::UInt32, false, 0))
            .expect("record layout is well-formed");
        Arc::new(builder.build())
    })
}

fn system_column(layout: &Layout, path: &str) -> LayoutColumn {
    layout
        .column(path)
        .expect("system layout column is declared")
        .clone()
}

/// Resolver holding exactly the two framing layouts.
pub fn system_resolver() -> Arc<SimpleResolver> {
    static RESOLVER: OnceLock<Arc<SimpleResolver>> = OnceLock::new();
    RESOLVER
        .get_or_init(|| {
            Arc::new(SimpleResolver::new(vec![
                segment_layout().clone(),
                record_layout().clone(),
            ]))
        })
        .clone()
}

/// A stream segment marker with optional metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Segment {
    /// Byte size of the encoded segment row, `comment` and `sdl` included.
    pub length: i32,
    pub comment: Option<String>,
    pub sdl: Option<String>,
}

/// A record frame: the size and digest of the body that follows it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Record {
    pub length: u32,
    pub crc32: u32,
}

/// Encodes a segment row. `segment.length` is ignored on input; the encoded
/// row carries its own final byte count.
pub fn format_segment(segment: &Segment) -> Result<Vec<u8>> {
    let layout = segment_layout();
    let mut row = RowBuffer::new(RowHeader::BYTES + layout.size() + 16, system_resolver());
    row.init_layout(layout);
    let root = row.root_cursor()?;

    let comment_col = system_column(layout, "comment");
    let sdl_col = system_column(layout, "sdl");
    let mut cursor = root.clone();
    if let Some(comment) = &segment.comment {
        row.write_variable_utf8(&mut cursor, &comment_col, comment)?;
    }
    if let Some(sdl) = &segment.sdl {
        row.write_variable_utf8(&mut cursor, &sdl_col, sdl)?;
    }

    // The length column covers the variable region, so it can only be
    // patched in once the row has settled.
    let total = row.len();
    if total > i32::MAX as usize {
        return Err(RowError::TooBig {
            capacity: i32::MAX as usize,
            actual: total,
        });
    }
    let length_col = system_column(layout, "length");
    row.write_i32(&root, &length_col, total as i32)?;
    Ok(row.into_vec())
}

/// Encodes a record frame: the record row followed by the body bytes.
pub fn format_record(body: &[u8]) -> Result<Vec<u8>> {
    if body.len() > u32::MAX as usize {
        return Err(RowError::TooBig {
            capacity: u32::MAX as usize,
            actual: body.len(),
        });
    }
    let layout = record_layout();
    let mut row = RowBuffer::new(RowHeader::BYTES + layout.size() + body.len(), system_resolver());
    row.init_layout(layout);
    let root = row.root_cursor()?;
    row.write_u32(&root, &system_column(layout, "length"), body.len() as u32)?;
    row.write_u32(&root, &system_column(layout, "crc32"), CRC32.checksum(body))?;

    let mut frame = row.into_vec();
    frame.extend_from_slice(body);
    Ok(frame)
}

/// Decodes a complete segment row.
pub(crate) fn decode_segment(bytes: &[u8]) -> Result<Segment> {
    let layout = segment_layout();
    let row = RowBuffer::attach(bytes.to_vec(), system_resolver())?;
    if row.header()?.schema_id() != SEGMENT_SCHEMA_ID {
        return Err(RowError::InvalidRow("expected a segment row".into()));
    }
    let root = row.root_cursor()?;
    let length = row.read_i32(&root, &system_column(layout, "length"))?;
    let comment = read_optional_utf8(&row, &system_column(layout, "comment"))?;
    let sdl = read_optional_utf8(&row, &system_column(layout, "sdl"))?;
    Ok(Segment {
        length,
        comment,
        sdl,
    })
}

/// Decodes a record row (header plus fixed region).
pub(crate) fn decode_record(bytes: &[u8]) -> Result<Record> {
    let layout = record_layout();
    let row = RowBuffer::attach(bytes.to_vec(), system_resolver())?;
    if row.header()?.schema_id() != RECORD_SCHEMA_ID {
        return Err(RowError::InvalidRow("expected a record row".into()));
    }
    let root = row.root_cursor()?;
    Ok(Record {
        length: row.read_u32(&root, &system_column(layout, "length"))?,
        crc32: row.read_u32(&root, &system_column(layout, "crc32"))?,
    })
}

fn read_optional_utf8(row: &RowBuffer, column: &LayoutColumn) -> Result<Option<String>> {
    let root = row.root_cursor()?;
    match row.read_variable_utf8(&root, column) {
        Ok(value) => Ok(Some(value.to_string())),
        Err(RowError::NotFound) => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_length_covers_the_whole_row() {
        let bytes = format_segment(&Segment {
            length: 0,
            comment: Some("hello".into()),
            sdl: None,
        })
        .unwrap();
        let segment = decode_segment(&bytes).unwrap();
        assert_eq!(segment.length as usize, bytes.len());
        assert_eq!(segment.comment.as_deref(), Some("hello"));
        assert_eq!(segment.sdl, None);
    }

    #[test]
    fn empty_segment_is_header_plus_fixed_region() {
        let bytes = format_segment(&Segment::default()).unwrap();
        assert_eq!(bytes.len(), RowHeader::BYTES + segment_layout().size());
        let segment = decode_segment(&bytes).unwrap();
        assert_eq!(segment.length as usize, bytes.len());
    }

    #[test]
    fn record_frame_carries_length_and_digest() {
        let body = b"payload bytes";
        let frame = format_record(body).unwrap();
        let row_len = RowHeader::BYTES + record_layout().size();
        assert_eq!(frame.len(), row_len + body.len());
        assert_eq!(&frame[row_len..], body);

        let record = decode_record(&frame[..row_len]).unwrap();
        assert_eq!(record.length as usize, body.len());
        assert_eq!(record.crc32, CRC32.checksum(body));
    }

    #[test]
    fn framing_schema_ids_stay_out_of_user_range() {
        assert!(SEGMENT_SCHEMA_ID.value() > i32::MAX - 20_000);
        assert_ne!(SEGMENT_SCHEMA_ID, RECORD_SCHEMA_ID);
    }
}
