//! # Layout Compilation
//!
//! Schemas compile into `Layout`s: immutable physical plans that fix the
//! offset and presence bit of every fixed and variable column. Compilation is
//! deterministic, so independently compiled copies of the same schema agree
//! on every offset and rows written by one are readable through the other.
//!
//! ## Row Regions
//!
//! | Region | Contents |
//! |--------|----------|
//! | header | version byte, 4-byte LE schema id |
//! | fixed | presence bitmask, then fixed fields at compiled offsets |
//! | variable | length-prefixed payloads in declaration order |
//! | sparse | self-describing entries to the end of the row |

mod bit;
mod builder;
mod column;
mod resolver;
mod schema;

pub use bit::LayoutBit;
pub use builder::LayoutBuilder;
pub use column::{LayoutColumn, StorageKind};
pub use resolver::{LayoutResolver, NamespaceResolver, SimpleResolver};
pub use schema::{FieldDef, SchemaDef};

use hashbrown::HashMap;

use crate::types::SchemaId;

/// The compiled physical plan of one schema.
///
/// Immutable and `Send + Sync`; shared between buffers via `Arc`.
#[derive(Debug)]
pub struct Layout {
    name: String,
    schema_id: SchemaId,
    bitmask_bytes: usize,
    size: usize,
    fixed_count: usize,
    variable_count: usize,
    columns: Vec<LayoutColumn>,
    path_index: HashMap<String, usize>,
}

impl Layout {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema_id(&self) -> SchemaId {
        self.schema_id
    }

    /// Bytes occupied by the presence bitmask at the start of the fixed
    /// region.
    pub fn bitmask_bytes(&self) -> usize {
        self.bitmask_bytes
    }

    /// Total fixed-region size: bitmask plus all fixed column bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn fixed_count(&self) -> usize {
        self.fixed_count
    }

    pub fn variable_count(&self) -> usize {
        self.variable_count
    }

    /// All columns, ordered fixed, then variable, then sparse.
    pub fn columns(&self) -> &[LayoutColumn] {
        &self.columns
    }

    /// Looks up a column by its full dotted path.
    pub fn column(&self, path: &str) -> Option<&LayoutColumn> {
        self.path_index.get(path).map(|&i| &self.columns[i])
    }

    pub(crate) fn assemble(
        name: String,
        schema_id: SchemaId,
        bitmask_bytes: usize,
        fixed_bytes: usize,
        fixed_count: usize,
        variable_count: usize,
        columns: Vec<LayoutColumn>,
    ) -> Self {
        let path_index = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.path.clone(), i))
            .collect();
        Layout {
            name,
            schema_id,
            bitmask_bytes,
            size: bitmask_bytes + fixed_bytes,
            fixed_count,
            variable_count,
            columns,
            path_index,
        }
    }
}
