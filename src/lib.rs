//! # FlexRow - Schema-Driven Binary Row Format
//!
//! FlexRow is a compact, self-describing binary row format in which a fixed
//! schema ("layout") and ad-hoc ("sparse") fields coexist in one flat byte
//! buffer. Rows are addressed through a cursor abstraction and framed into a
//! recoverable stream format (RecordIO) for persistence or transport.
//!
//! ## Row Binary Layout
//!
//! ```text
//! +----------+------------------------+---------------------+------------------+
//! | Header   | Fixed Region           | Variable Region     | Sparse Region    |
//! | (5 bytes)| bitmask + fixed fields | len-prefixed fields | self-describing  |
//! +----------+------------------------+---------------------+------------------+
//! ```
//!
//! | Region | Contents |
//! |--------|----------|
//! | **Header** | 1-byte format version + 4-byte little-endian root schema id |
//! | **Fixed** | `ceil(bits/8)` bitmask bytes (null/bool bits, LSB-first), then each fixed field at its compiled offset |
//! | **Variable** | per present field: 7-bit varuint length prefix + payload |
//! | **Sparse** | `[type code][path][type args][value]` entries; scopes nest recursively |
//!
//! ## Architecture
//!
//! Leaf-to-root dependency order:
//!
//! - [`encoding`]: 7-bit continuation varint codec
//! - [`types`]: the closed type-code enumeration and generic type arguments
//! - [`layout`]: the layout compiler, compiled layouts, and layout resolvers
//! - [`row`]: the mutable row buffer engine and the cursor zipper
//! - [`recordio`]: the streaming container format and its resumable parser
//!
//! ## Concurrency
//!
//! The core is synchronous and single-writer-per-buffer. Compiled layouts and
//! type codes are immutable and freely shared across threads; the
//! namespace-caching resolver is the only internally synchronized component.
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use flexrow::layout::{LayoutBuilder, SimpleResolver};
//! use flexrow::types::{SchemaId, TypeCode};
//! use flexrow::row::RowBuffer;
//!
//! let mut builder = LayoutBuilder::new("point", SchemaId::new(1));
//! builder.add_fixed_column("x", TypeCode::Int32, true, 0).unwrap();
//! builder.add_variable_column("label", TypeCode::Utf8, 0).unwrap();
//! let layout = Arc::new(builder.build());
//!
//! let resolver = Arc::new(SimpleResolver::new(vec![layout.clone()]));
//! let mut row = RowBuffer::new(64, resolver);
//! row.init_layout(&layout);
//!
//! let root = row.root_cursor().unwrap();
//! let x = layout.column("x").unwrap().clone();
//! let label = layout.column("label").unwrap().clone();
//! row.write_i32(&root, &x, 5).unwrap();
//! row.write_variable_utf8(&mut root.clone(), &label, "hi").unwrap();
//! assert_eq!(row.read_i32(&root, &x).unwrap(), 5);
//! assert_eq!(row.read_variable_utf8(&root, &label).unwrap(), "hi");
//! ```

pub mod encoding;
pub mod error;
pub mod layout;
pub mod recordio;
pub mod row;
pub mod types;

pub use error::{Result, RowError};
pub use layout::{Layout, LayoutBuilder, LayoutResolver, NamespaceResolver, SimpleResolver};
pub use recordio::{Production, RecordIoParser};
pub use row::{RowBuffer, RowCursor, WriteOptions};
pub use types::{SchemaId, TypeArgument, TypeArgumentList, TypeCode};
