//! Declarative schema descriptions consumed by the namespace resolver.
//!
//! A `SchemaDef` is the pre-compilation form of a schema: an ordered list of
//! field declarations that `compile` feeds through [`LayoutBuilder`].

use crate::error::Result;
use crate::layout::{Layout, LayoutBuilder, StorageKind};
use crate::types::{SchemaId, TypeArgumentList, TypeCode};

/// One declared field of a schema.
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub path: String,
    pub code: TypeCode,
    pub storage: StorageKind,
    pub nullable: bool,
    pub length: usize,
    pub type_args: TypeArgumentList,
}

impl FieldDef {
    pub fn fixed(path: impl Into<String>, code: TypeCode, nullable: bool) -> Self {
        FieldDef {
            path: path.into(),
            code,
            storage: StorageKind::Fixed,
            nullable,
            length: 0,
            type_args: TypeArgumentList::new(),
        }
    }

    pub fn fixed_sized(
        path: impl Into<String>,
        code: TypeCode,
        nullable: bool,
        length: usize,
    ) -> Self {
        FieldDef {
            length,
            ..FieldDef::fixed(path, code, nullable)
        }
    }

    pub fn variable(path: impl Into<String>, code: TypeCode) -> Self {
        FieldDef {
            path: path.into(),
            code,
            storage: StorageKind::Variable,
            nullable: true,
            length: 0,
            type_args: TypeArgumentList::new(),
        }
    }

    pub fn sparse(path: impl Into<String>, code: TypeCode) -> Self {
        FieldDef {
            path: path.into(),
            code,
            storage: StorageKind::Sparse,
            nullable: true,
            length: 0,
            type_args: TypeArgumentList::new(),
        }
    }

    pub fn scope(path: impl Into<String>, code: TypeCode, type_args: TypeArgumentList) -> Self {
        FieldDef {
            type_args,
            ..FieldDef::sparse(path, code)
        }
    }
}

/// An ordered, named set of field declarations.
#[derive(Debug, Clone)]
pub struct SchemaDef {
    pub name: String,
    pub schema_id: SchemaId,
    pub fields: Vec<FieldDef>,
}

impl SchemaDef {
    pub fn new(name: impl Into<String>, schema_id: SchemaId, fields: Vec<FieldDef>) -> Self {
        SchemaDef {
            name: name.into(),
            schema_id,
            fields,
        }
    }

    /// Compiles the declarations into a physical layout.
    pub fn compile(&self) -> Result<Layout> {
        let mut builder = LayoutBuilder::new(self.name.clone(), self.schema_id);
        for field in &self.fields {
            match field.storage {
                StorageKind::Fixed => {
                    builder.add_fixed_column(&field.path, field.code, field.nullable, field.length)?;
                }
                StorageKind::Variable => {
                    builder.add_variable_column(&field.path, field.code, field.length)?;
                }
                StorageKind::Sparse => {
                    if field.code.is_scope() {
                        builder.add_typed_scope(&field.path, field.code, field.type_args.clone())?;
                    } else {
                        builder.add_sparse_column(&field.path, field.code)?;
                    }
                }
            }
        }
        Ok(builder.build())
    }
}
