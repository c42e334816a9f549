//! End-to-end round trips through the public API: compile a layout, fill a
//! row through every region, detach the bytes, and read them back through an
//! independently compiled layout.

use std::sync::Arc;

use flexrow::layout::{FieldDef, Layout, LayoutBuilder, NamespaceResolver, SchemaDef};
use flexrow::row::RowBuffer;
use flexrow::types::{SchemaId, TypeArgument, TypeArgumentList, TypeCode};
use flexrow::{LayoutResolver, SimpleResolver, WriteOptions};

fn person_schema() -> SchemaDef {
    SchemaDef::new(
        "person".to_string(),
        SchemaId::new(7),
        vec![
            FieldDef::fixed("age", TypeCode::Int32, true),
            FieldDef::fixed("active", TypeCode::Boolean, true),
            FieldDef::fixed("score", TypeCode::Float64, true),
            FieldDef::variable("name", TypeCode::Utf8),
            FieldDef::variable("blob", TypeCode::Binary),
        ],
    )
}

#[test]
fn a_row_survives_detach_and_reattach_across_compilations() {
    let layout = Arc::new(person_schema().compile().unwrap());
    let resolver = Arc::new(SimpleResolver::new(vec![layout.clone()]));
    let mut row = RowBuffer::new(128, resolver);
    row.init_layout(&layout);

    let age = layout.column("age").unwrap().clone();
    let active = layout.column("active").unwrap().clone();
    let score = layout.column("score").unwrap().clone();
    let name = layout.column("name").unwrap().clone();
    let blob = layout.column("blob").unwrap().clone();

    let root = row.root_cursor().unwrap();
    row.write_i32(&root, &age, 41).unwrap();
    row.write_bool(&root, &active, true).unwrap();
    row.write_f64(&root, &score, 0.25).unwrap();
    let mut cursor = root.clone();
    row.write_variable_utf8(&mut cursor, &name, "Ada").unwrap();
    row.write_variable_binary(&mut cursor, &blob, &[0xDE, 0xAD]).unwrap();
    let mut cursor = row.root_cursor().unwrap();
    row.find(&mut cursor, "note").unwrap();
    row.write_sparse_utf8(&mut cursor, "ad hoc", WriteOptions::Insert).unwrap();

    // A second compilation of the same schema must agree on every offset.
    let recompiled = Arc::new(person_schema().compile().unwrap());
    let resolver = Arc::new(SimpleResolver::new(vec![recompiled.clone()]));
    let bytes = row.into_vec();
    let row = RowBuffer::attach(bytes, resolver).unwrap();

    let root = row.root_cursor().unwrap();
    assert_eq!(row.read_i32(&root, &age).unwrap(), 41);
    assert!(row.read_bool(&root, &active).unwrap());
    assert_eq!(row.read_f64(&root, &score).unwrap(), 0.25);
    assert_eq!(row.read_variable_utf8(&root, &name).unwrap(), "Ada");
    assert_eq!(row.read_variable_binary(&root, &blob).unwrap(), &[0xDE, 0xAD]);
    let mut cursor = row.root_cursor().unwrap();
    assert!(row.find(&mut cursor, "note").unwrap());
    assert_eq!(row.read_sparse_utf8(&cursor).unwrap(), "ad hoc");
}

#[test]
fn namespace_resolver_serves_nested_udt_rows() {
    let address = SchemaDef::new(
        "address".to_string(),
        SchemaId::new(2),
        vec![
            FieldDef::fixed("zip", TypeCode::Int32, true),
            FieldDef::variable("city", TypeCode::Utf8),
        ],
    );
    let order = SchemaDef::new(
        "order".to_string(),
        SchemaId::new(1),
        vec![FieldDef::fixed("id", TypeCode::Int64, true)],
    );
    let resolver = Arc::new(NamespaceResolver::new(vec![address, order]));
    let order_layout = resolver.resolve(SchemaId::new(1)).unwrap();
    let address_layout = resolver.resolve(SchemaId::new(2)).unwrap();

    let mut row = RowBuffer::new(128, resolver.clone());
    row.init_layout(&order_layout);
    let id = order_layout.column("id").unwrap().clone();
    let zip = address_layout.column("zip").unwrap().clone();
    let city = address_layout.column("city").unwrap().clone();

    let root = row.root_cursor().unwrap();
    row.write_i64(&root, &id, 900_100).unwrap();
    let mut cursor = root.clone();
    row.find(&mut cursor, "shipping").unwrap();
    let child = row
        .write_scope(
            &mut cursor,
            &TypeArgument::udt(SchemaId::new(2)),
            WriteOptions::Insert,
        )
        .unwrap();
    row.write_i32(&child, &zip, 10117).unwrap();
    row.write_variable_utf8(&mut child.clone(), &city, "Berlin").unwrap();

    let bytes = row.into_vec();
    let row = RowBuffer::attach(bytes, resolver).unwrap();
    let root = row.root_cursor().unwrap();
    assert_eq!(row.read_i64(&root, &id).unwrap(), 900_100);
    let mut cursor = row.root_cursor().unwrap();
    assert!(row.find(&mut cursor, "shipping").unwrap());
    let child = row.read_scope(&cursor).unwrap();
    assert_eq!(row.read_i32(&child, &zip).unwrap(), 10117);
    assert_eq!(row.read_variable_utf8(&child, &city).unwrap(), "Berlin");
}

#[test]
fn typed_map_round_trips_sorted_pairs() {
    let layout = Arc::new(
        SchemaDef::new("bag".to_string(), SchemaId::new(3), vec![]).compile().unwrap(),
    );
    let resolver = Arc::new(SimpleResolver::new(vec![layout.clone()]));
    let mut row = RowBuffer::new(128, resolver);
    row.init_layout(&layout);

    let map_args = TypeArgumentList::pair(
        TypeArgument::new(TypeCode::Utf8),
        TypeArgument::new(TypeCode::Int32),
    );
    let map_t = TypeArgument::with_args(TypeCode::TypedMapScope, map_args.clone());
    let pair_t = TypeArgument::with_args(TypeCode::TypedTupleScope, map_args);

    let mut root = row.root_cursor().unwrap();
    row.find(&mut root, "m").unwrap();
    let mut map = row.write_scope(&mut root, &map_t, WriteOptions::Insert).unwrap();
    for (key, value) in [("beta", 2), ("alpha", 1)] {
        let mut pair = row.write_scope(&mut map, &pair_t, WriteOptions::InsertAt).unwrap();
        row.move_next(&mut pair).unwrap();
        row.write_sparse_utf8(&mut pair, key, WriteOptions::Upsert).unwrap();
        row.move_next(&mut pair).unwrap();
        row.write_sparse_i32(&mut pair, value, WriteOptions::Upsert).unwrap();
        row.move_next(&mut map).unwrap();
    }
    row.unique_index_rebuild(&mut map).unwrap();

    let mut root = row.root_cursor().unwrap();
    assert!(row.find(&mut root, "m").unwrap());
    let mut map = row.read_scope(&root).unwrap();
    let mut pairs = Vec::new();
    while row.move_next(&mut map).unwrap() {
        let mut pair = row.read_scope(&map).unwrap();
        assert!(row.move_next(&mut pair).unwrap());
        let key = row.read_sparse_utf8(&pair).unwrap().to_string();
        assert!(row.move_next(&mut pair).unwrap());
        let value = row.read_sparse_i32(&pair).unwrap();
        pairs.push((key, value));
    }
    assert_eq!(pairs, [("alpha".to_string(), 1), ("beta".to_string(), 2)]);
}

#[test]
fn layouts_shared_across_threads_read_the_same_bytes() {
    let layout: Arc<Layout> = Arc::new(person_schema().compile().unwrap());
    let resolver = Arc::new(SimpleResolver::new(vec![layout.clone()]));
    let mut row = RowBuffer::new(64, resolver.clone());
    row.init_layout(&layout);
    let age = layout.column("age").unwrap().clone();
    let root = row.root_cursor().unwrap();
    row.write_i32(&root, &age, 30).unwrap();
    let bytes = Arc::new(row.into_vec());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let bytes = bytes.clone();
            let resolver = resolver.clone();
            let age = age.clone();
            std::thread::spawn(move || {
                let row = RowBuffer::attach(bytes.as_ref().clone(), resolver).unwrap();
                let root = row.root_cursor().unwrap();
                row.read_i32(&root, &age).unwrap()
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), 30);
    }
}

#[test]
fn builder_and_schema_def_compile_identically() {
    let from_def = person_schema().compile().unwrap();

    let mut builder = LayoutBuilder::new("person", SchemaId::new(7));
    builder.add_fixed_column("age", TypeCode::Int32, true, 0).unwrap();
    builder.add_fixed_column("active", TypeCode::Boolean, true, 0).unwrap();
    builder.add_fixed_column("score", TypeCode::Float64, true, 0).unwrap();
    builder.add_variable_column("name", TypeCode::Utf8, 0).unwrap();
    builder.add_variable_column("blob", TypeCode::Binary, 0).unwrap();
    let from_builder = builder.build();

    assert_eq!(from_def.size(), from_builder.size());
    for column in from_def.columns() {
        let twin = from_builder.column(column.path()).unwrap();
        assert_eq!(column.offset(), twin.offset());
        assert_eq!(column.storage(), twin.storage());
    }
}
