//! # RecordIO Streaming Container
//!
//! Frames opaque payloads (typically encoded rows) into a recoverable byte
//! stream. A stream is a segment row followed by record frames; each record
//! frame is a small system row carrying the body length and CRC-32 digest,
//! followed by the body itself. See [`format`] for the framing rows and
//! [`parser`] for the resumable reader.

mod format;
mod parser;

pub use format::{
    format_record, format_segment, system_resolver, Record, Segment, RECORD_SCHEMA_ID,
    SEGMENT_SCHEMA_ID,
};
pub use parser::{ParseStep, Production, RecordIoParser};
