//! # Row Engine
//!
//! The mutable row buffer and its cursor abstraction. A row is one flat byte
//! buffer holding a header, a schema-compiled fixed region, a variable
//! region, and a self-describing sparse region; every operation reads or
//! rewrites that buffer in place.

mod buffer;
mod cursor;
mod header;
mod sparse;

#[cfg(test)]
mod tests;

pub use buffer::RowBuffer;
pub use cursor::{RowCursor, WriteOptions};
pub use header::{RowHeader, VERSION_V1};
