//! # Resumable Stream Parser
//!
//! `RecordIoParser` consumes a RecordIO byte stream incrementally. Callers
//! feed whatever bytes they have; the parser reports how many it consumed and
//! how many more it needs, so a stream can be parsed from arbitrarily sized
//! chunks without ever copying it into one contiguous buffer.
//!
//! ## States
//!
//! | State | Waiting for | Next |
//! |-------|-------------|------|
//! | `Start` | nothing | `NeedSegmentLength` |
//! | `NeedSegmentLength` | segment header + fixed region | `NeedSegment` |
//! | `NeedSegment` | the full segment row | `NeedHeader` |
//! | `NeedHeader` | the next row header | `NeedRecord` or `NeedSegmentLength` |
//! | `NeedRecord` | record header + fixed region | `NeedRow` |
//! | `NeedRow` | `record.length` body bytes | `NeedHeader` |
//! | `Error` | terminal | terminal |
//!
//! Each successful `process` call emits at most one production. Corruption
//! (bad version, unknown schema id, CRC mismatch) is terminal: the parser
//! stays in `Error` and every further call fails.

use crate::error::{Result, RowError};
use crate::row::RowHeader;

use super::format::{
    decode_record, decode_segment, record_layout, segment_layout, Record, Segment, CRC32,
    RECORD_SCHEMA_ID, SEGMENT_SCHEMA_ID,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParserState {
    Start,
    NeedSegmentLength,
    NeedSegment,
    NeedHeader,
    NeedRecord,
    NeedRow,
    Error,
}

/// What one `process` call produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Production<'a> {
    /// Not enough bytes yet; consult `ParseStep::need`.
    None,
    /// A complete segment row.
    Segment(&'a [u8]),
    /// A record body whose CRC matched.
    Record(&'a [u8]),
}

/// Outcome of one `process` call.
///
/// `consumed` bytes are done with and must not be resupplied; the remainder
/// of the buffer must be the prefix of the next call. `need` is the minimum
/// number of unconsumed bytes required for the next step to complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseStep<'a> {
    pub production: Production<'a>,
    pub consumed: usize,
    pub need: usize,
}

/// Incremental parser for a RecordIO stream.
#[derive(Debug)]
pub struct RecordIoParser {
    state: ParserState,
    segment_length: usize,
    segment: Option<Segment>,
    record: Option<Record>,
}

impl RecordIoParser {
    pub fn new() -> Self {
        RecordIoParser {
            state: ParserState::Start,
            segment_length: 0,
            segment: None,
            record: None,
        }
    }

    /// True once at least one segment row has been parsed.
    pub fn have_segment(&self) -> bool {
        self.segment.is_some()
    }

    /// The most recently parsed segment.
    pub fn segment(&self) -> Option<&Segment> {
        self.segment.as_ref()
    }

    /// The record frame whose body is pending or was most recently produced.
    pub fn record(&self) -> Option<Record> {
        self.record
    }

    /// Advances the parser over as much of `buffer` as possible, stopping
    /// after one production or when more bytes are required.
    pub fn process<'a>(&mut self, buffer: &'a [u8]) -> Result<ParseStep<'a>> {
        let mut consumed = 0;
        loop {
            let rest = &buffer[consumed..];
            match self.state {
                ParserState::Error => {
                    return Err(RowError::InvalidRow(
                        "parser halted on an earlier stream corruption".into(),
                    ));
                }
                ParserState::Start => {
                    self.state = ParserState::NeedSegmentLength;
                }
                ParserState::NeedSegmentLength => {
                    let min = RowHeader::BYTES + segment_layout().size();
                    if rest.len() < min {
                        return Ok(self.starve(consumed, min));
                    }
                    // Peek the length out of the truncated row; the full row
                    // is required (and validated) by the next state.
                    self.segment_length = match read_segment_length(&rest[..min]) {
                        Ok(length) => length,
                        Err(e) => return Err(self.fail(e)),
                    };
                    self.state = ParserState::NeedSegment;
                }
                ParserState::NeedSegment => {
                    let need = self.segment_length;
                    if rest.len() < need {
                        return Ok(self.starve(consumed, need));
                    }
                    let row = &rest[..need];
                    self.segment = match decode_segment(row) {
                        Ok(segment) => Some(segment),
                        Err(e) => return Err(self.fail(e)),
                    };
                    self.state = ParserState::NeedHeader;
                    return Ok(ParseStep {
                        production: Production::Segment(row),
                        consumed: consumed + need,
                        need: 0,
                    });
                }
                ParserState::NeedHeader => {
                    if rest.len() < RowHeader::BYTES {
                        return Ok(self.starve(consumed, RowHeader::BYTES));
                    }
                    let header = match RowHeader::decode(rest) {
                        Ok(header) => header,
                        Err(e) => return Err(self.fail(e)),
                    };
                    self.state = match header.schema_id() {
                        id if id == RECORD_SCHEMA_ID => ParserState::NeedRecord,
                        id if id == SEGMENT_SCHEMA_ID => ParserState::NeedSegmentLength,
                        id => {
                            return Err(self.fail(RowError::InvalidRow(format!(
                                "schema {id} is not a stream framing row"
                            ))));
                        }
                    };
                }
                ParserState::NeedRecord => {
                    let min = RowHeader::BYTES + record_layout().size();
                    if rest.len() < min {
                        return Ok(self.starve(consumed, min));
                    }
                    self.record = match decode_record(&rest[..min]) {
                        Ok(record) => Some(record),
                        Err(e) => return Err(self.fail(e)),
                    };
                    consumed += min;
                    self.state = ParserState::NeedRow;
                }
                ParserState::NeedRow => {
                    let Some(record) = self.record else {
                        return Err(self.fail(RowError::InvalidRow(
                            "record body expected without a record frame".into(),
                        )));
                    };
                    let need = record.length as usize;
                    if rest.len() < need {
                        return Ok(self.starve(consumed, need));
                    }
                    let body = &rest[..need];
                    if CRC32.checksum(body) != record.crc32 {
                        return Err(self.fail(RowError::InvalidRow(format!(
                            "record body failed its CRC check ({} bytes)",
                            need
                        ))));
                    }
                    self.state = ParserState::NeedHeader;
                    return Ok(ParseStep {
                        production: Production::Record(body),
                        consumed: consumed + need,
                        need: 0,
                    });
                }
            }
        }
    }

    fn starve<'a>(&self, consumed: usize, need: usize) -> ParseStep<'a> {
        ParseStep {
            production: Production::None,
            consumed,
            need,
        }
    }

    fn fail(&mut self, e: RowError) -> RowError {
        self.state = ParserState::Error;
        e
    }
}

impl Default for RecordIoParser {
    fn default() -> Self {
        RecordIoParser::new()
    }
}

/// Reads the `length` column out of a truncated segment row spanning exactly
/// the header and fixed region.
///
/// The segment's variable columns may extend past the supplied prefix, so the
/// row cannot be attached as a buffer; the length is read straight from its
/// fixed-region slot instead.
fn read_segment_length(bytes: &[u8]) -> Result<usize> {
    let header = RowHeader::decode(bytes)?;
    if header.schema_id() != SEGMENT_SCHEMA_ID {
        return Err(RowError::InvalidRow("expected a segment row".into()));
    }
    let column = segment_layout()
        .column("length")
        .expect("system layout column is declared");
    let at = RowHeader::BYTES + column.offset();
    let raw = bytes
        .get(at..at + 4)
        .ok_or(RowError::InsufficientBuffer { need: at + 4 })?;
    let length = i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
    if length < 0 || (length as usize) < bytes.len() {
        return Err(RowError::InvalidRow(format!(
            "segment length {length} is shorter than its own fixed region"
        )));
    }
    Ok(length as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recordio::format::{format_record, format_segment};

    fn stream(bodies: &[&[u8]]) -> Vec<u8> {
        let mut out = format_segment(&Segment {
            length: 0,
            comment: Some("unit".into()),
            sdl: None,
        })
        .unwrap();
        for body in bodies {
            out.extend_from_slice(&format_record(body).unwrap());
        }
        out
    }

    #[test]
    fn parses_a_segment_then_records_in_order() {
        let bytes = stream(&[b"one", b"two"]);
        let mut parser = RecordIoParser::new();
        let mut at = 0;

        let step = parser.process(&bytes[at..]).unwrap();
        assert!(matches!(step.production, Production::Segment(_)));
        at += step.consumed;
        assert!(parser.have_segment());
        assert_eq!(parser.segment().unwrap().comment.as_deref(), Some("unit"));

        let step = parser.process(&bytes[at..]).unwrap();
        assert_eq!(step.production, Production::Record(b"one".as_slice()));
        at += step.consumed;

        let step = parser.process(&bytes[at..]).unwrap();
        assert_eq!(step.production, Production::Record(b"two".as_slice()));
        at += step.consumed;
        assert_eq!(at, bytes.len());

        let step = parser.process(&bytes[at..]).unwrap();
        assert_eq!(step.production, Production::None);
        assert_eq!(step.need, RowHeader::BYTES);
    }

    #[test]
    fn segment_length_is_read_from_a_truncated_prefix() {
        // The segment carries a comment, so its variable region extends past
        // the fixed-region prefix the length is peeked from.
        let bytes = stream(&[]);
        let min = RowHeader::BYTES + segment_layout().size();
        assert!(bytes.len() > min);

        let mut parser = RecordIoParser::new();
        let step = parser.process(&bytes[..min]).unwrap();
        assert_eq!(step.production, Production::None);
        assert_eq!(step.consumed, 0);
        assert_eq!(step.need, bytes.len());
    }

    #[test]
    fn starved_parser_reports_consumed_and_need() {
        let bytes = stream(&[b"payload"]);
        let mut parser = RecordIoParser::new();

        // Nothing at all: the segment fixed region is the first requirement.
        let step = parser.process(&[]).unwrap();
        assert_eq!(step.production, Production::None);
        assert_eq!(step.consumed, 0);
        assert_eq!(step.need, RowHeader::BYTES + segment_layout().size());

        // The whole stream at once still yields one production per call.
        let step = parser.process(&bytes).unwrap();
        assert!(matches!(step.production, Production::Segment(_)));
        let rest = &bytes[step.consumed..];
        let step = parser.process(rest).unwrap();
        assert_eq!(step.production, Production::Record(b"payload".as_slice()));
    }

    #[test]
    fn corrupt_version_byte_is_terminal() {
        let mut bytes = stream(&[]);
        bytes[0] = 0x01;
        let mut parser = RecordIoParser::new();
        assert!(parser.process(&bytes).is_err());
        assert!(parser.process(&bytes).is_err());
    }

    #[test]
    fn crc_mismatch_is_terminal() {
        let mut bytes = stream(&[b"body"]);
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        let mut parser = RecordIoParser::new();
        let step = parser.process(&bytes).unwrap();
        let rest = &bytes[step.consumed..];
        assert!(matches!(
            parser.process(rest),
            Err(RowError::InvalidRow(_))
        ));
    }

    #[test]
    fn a_second_segment_returns_to_segment_parsing() {
        let mut bytes = stream(&[b"a"]);
        bytes.extend_from_slice(&stream(&[b"b"]));
        let mut parser = RecordIoParser::new();
        let mut at = 0;
        let mut productions = Vec::new();
        loop {
            let step = parser.process(&bytes[at..]).unwrap();
            at += step.consumed;
            match step.production {
                Production::None => break,
                Production::Segment(_) => productions.push("segment"),
                Production::Record(_) => productions.push("record"),
            }
        }
        assert_eq!(productions, ["segment", "record", "segment", "record"]);
    }
}
