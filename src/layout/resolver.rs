//! # Layout Resolution
//!
//! Rows carry schema ids, not layouts. A resolver maps ids back to compiled
//! layouts when a row is attached or a nested UDT scope is entered.

use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::error::{Result, RowError};
use crate::layout::{Layout, SchemaDef};
use crate::types::SchemaId;

/// Maps schema ids to compiled layouts.
pub trait LayoutResolver: Send + Sync {
    fn resolve(&self, schema_id: SchemaId) -> Result<Arc<Layout>>;
}

/// A fixed, pre-compiled set of layouts.
#[derive(Debug, Default)]
pub struct SimpleResolver {
    layouts: HashMap<SchemaId, Arc<Layout>>,
}

impl SimpleResolver {
    pub fn new(layouts: Vec<Arc<Layout>>) -> Self {
        SimpleResolver {
            layouts: layouts.into_iter().map(|l| (l.schema_id(), l)).collect(),
        }
    }

    pub fn insert(&mut self, layout: Arc<Layout>) {
        self.layouts.insert(layout.schema_id(), layout);
    }
}

impl LayoutResolver for SimpleResolver {
    fn resolve(&self, schema_id: SchemaId) -> Result<Arc<Layout>> {
        self.layouts
            .get(&schema_id)
            .cloned()
            .ok_or(RowError::SchemaNotFound(schema_id))
    }
}

/// Resolves layouts from schema definitions, compiling lazily on first use.
///
/// Compiled layouts are cached under a read-write lock; concurrent first
/// resolves of the same id race harmlessly and a single winner lands in the
/// cache. An optional parent resolver is consulted for ids the namespace
/// does not define.
pub struct NamespaceResolver {
    schemas: HashMap<SchemaId, SchemaDef>,
    cache: RwLock<HashMap<SchemaId, Arc<Layout>>>,
    parent: Option<Arc<dyn LayoutResolver>>,
}

impl NamespaceResolver {
    pub fn new(schemas: Vec<SchemaDef>) -> Self {
        NamespaceResolver {
            schemas: schemas.into_iter().map(|s| (s.schema_id, s)).collect(),
            cache: RwLock::new(HashMap::new()),
            parent: None,
        }
    }

    /// Chains a fallback resolver consulted when this namespace has no
    /// definition for the requested id.
    pub fn with_parent(mut self, parent: Arc<dyn LayoutResolver>) -> Self {
        self.parent = Some(parent);
        self
    }
}

impl LayoutResolver for NamespaceResolver {
    fn resolve(&self, schema_id: SchemaId) -> Result<Arc<Layout>> {
        if let Some(layout) = self.cache.read().get(&schema_id) {
            return Ok(layout.clone());
        }

        let Some(def) = self.schemas.get(&schema_id) else {
            return match &self.parent {
                Some(parent) => parent.resolve(schema_id),
                None => Err(RowError::SchemaNotFound(schema_id)),
            };
        };

        let compiled = Arc::new(def.compile()?);
        let mut cache = self.cache.write();
        // Another thread may have compiled the same schema while we did;
        // keep whichever copy landed first.
        Ok(cache.entry(schema_id).or_insert(compiled).clone())
    }
}

impl std::fmt::Debug for NamespaceResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamespaceResolver")
            .field("schemas", &self.schemas.len())
            .field("cached", &self.cache.read().len())
            .field("chained", &self.parent.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::FieldDef;
    use crate::types::TypeCode;

    fn point_def(id: i32) -> SchemaDef {
        SchemaDef::new(
            format!("point{id}"),
            SchemaId::new(id),
            vec![FieldDef::fixed("x", TypeCode::Int32, true)],
        )
    }

    #[test]
    fn simple_resolver_reports_missing_schemas() {
        let resolver = SimpleResolver::default();
        assert!(matches!(
            resolver.resolve(SchemaId::new(9)),
            Err(RowError::SchemaNotFound(id)) if id == SchemaId::new(9)
        ));
    }

    #[test]
    fn namespace_resolver_compiles_once_and_caches() {
        let resolver = NamespaceResolver::new(vec![point_def(1)]);
        let a = resolver.resolve(SchemaId::new(1)).unwrap();
        let b = resolver.resolve(SchemaId::new(1)).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn namespace_resolver_falls_back_to_parent() {
        let parent = Arc::new(NamespaceResolver::new(vec![point_def(2)]));
        let child = NamespaceResolver::new(vec![point_def(1)]).with_parent(parent);
        assert!(child.resolve(SchemaId::new(2)).is_ok());
        assert!(child.resolve(SchemaId::new(3)).is_err());
    }

    #[test]
    fn resolvers_are_shareable_across_threads() {
        let resolver = Arc::new(NamespaceResolver::new(vec![point_def(1)]));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let resolver = resolver.clone();
                std::thread::spawn(move || resolver.resolve(SchemaId::new(1)).unwrap())
            })
            .collect();
        let layouts: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for layout in &layouts[1..] {
            assert!(Arc::ptr_eq(&layouts[0], layout));
        }
    }
}
