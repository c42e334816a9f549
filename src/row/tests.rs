//! Cross-region row tests: fixed, variable, and sparse access through one
//! buffer, including scope nesting, unique collections, and UDT rows.

use std::sync::Arc;

use crate::error::RowError;
use crate::layout::{Layout, LayoutBuilder, SimpleResolver};
use crate::row::{RowBuffer, WriteOptions};
use crate::types::{SchemaId, TypeArgument, TypeArgumentList, TypeCode};

fn simple_layout() -> (Arc<Layout>, Arc<SimpleResolver>) {
    let mut builder = LayoutBuilder::new("test", SchemaId::new(1));
    builder.add_fixed_column("a", TypeCode::Int32, true, 0).unwrap();
    builder.add_variable_column("b", TypeCode::Utf8, 0).unwrap();
    let layout = Arc::new(builder.build());
    let resolver = Arc::new(SimpleResolver::new(vec![layout.clone()]));
    (layout, resolver)
}

fn new_row() -> (RowBuffer, Arc<Layout>) {
    let (layout, resolver) = simple_layout();
    let mut row = RowBuffer::new(64, resolver);
    row.init_layout(&layout);
    (row, layout)
}

#[test]
fn fixed_and_variable_fields_produce_exact_bytes() {
    let (mut row, layout) = new_row();
    let root = row.root_cursor().unwrap();
    let a = layout.column("a").unwrap().clone();
    let b = layout.column("b").unwrap().clone();

    row.write_i32(&root, &a, 5).unwrap();
    row.write_variable_utf8(&mut root.clone(), &b, "hi").unwrap();

    // header | bitmask (null bit + existence bit) | a | varuint len | "hi"
    assert_eq!(
        row.as_slice(),
        &[0x81, 1, 0, 0, 0, 0b0000_0011, 5, 0, 0, 0, 2, b'h', b'i']
    );
}

#[test]
fn unset_fixed_field_reads_not_found() {
    let (mut row, layout) = new_row();
    let root = row.root_cursor().unwrap();
    let a = layout.column("a").unwrap().clone();

    assert!(matches!(row.read_i32(&root, &a), Err(RowError::NotFound)));
    row.write_i32(&root, &a, -9).unwrap();
    assert_eq!(row.read_i32(&root, &a).unwrap(), -9);
    row.delete_fixed(&root, &a).unwrap();
    assert!(matches!(row.read_i32(&root, &a), Err(RowError::NotFound)));
}

#[test]
fn fixed_access_checks_the_column_type() {
    let (mut row, layout) = new_row();
    let root = row.root_cursor().unwrap();
    let a = layout.column("a").unwrap().clone();
    row.write_i32(&root, &a, 1).unwrap();
    assert!(matches!(
        row.read_i64(&root, &a),
        Err(RowError::TypeMismatch { .. })
    ));
}

#[test]
fn variable_rewrite_shifts_the_tail_and_repairs_the_cursor() {
    let (mut row, layout) = new_row();
    let b = layout.column("b").unwrap().clone();

    // A sparse field after the variable region, then grow the variable field
    // under it.
    let mut root = row.root_cursor().unwrap();
    assert!(!row.find(&mut root, "x").unwrap());
    row.write_sparse_i32(&mut root, 42, WriteOptions::Upsert).unwrap();

    let mut scope = row.root_cursor().unwrap();
    row.write_variable_utf8(&mut scope, &b, "a considerably longer value")
        .unwrap();
    row.write_variable_utf8(&mut scope, &b, "tiny").unwrap();

    assert_eq!(row.read_variable_utf8(&scope, &b).unwrap(), "tiny");
    let mut root = row.root_cursor().unwrap();
    assert!(row.find(&mut root, "x").unwrap());
    assert_eq!(row.read_sparse_i32(&root).unwrap(), 42);
}

#[test]
fn deleting_a_variable_field_shrinks_by_payload_plus_prefix() {
    let (mut row, layout) = new_row();
    let b = layout.column("b").unwrap().clone();
    let mut root = row.root_cursor().unwrap();

    let before = row.len();
    row.write_variable_utf8(&mut root, &b, "hi").unwrap();
    assert_eq!(row.len(), before + 3);
    row.delete_variable(&mut root, &b).unwrap();
    assert_eq!(row.len(), before);
    assert!(matches!(
        row.read_variable_utf8(&root, &b),
        Err(RowError::NotFound)
    ));
}

#[test]
fn sparse_write_options_enforce_existence() {
    let (mut row, _) = new_row();
    let mut root = row.root_cursor().unwrap();

    assert!(!row.find(&mut root, "k").unwrap());
    assert!(matches!(
        row.write_sparse_i32(&mut root, 1, WriteOptions::Update),
        Err(RowError::NotFound)
    ));
    row.write_sparse_i32(&mut root, 1, WriteOptions::Insert).unwrap();
    assert!(matches!(
        row.write_sparse_i32(&mut root, 2, WriteOptions::Insert),
        Err(RowError::Exists)
    ));
    row.write_sparse_i32(&mut root, 3, WriteOptions::Upsert).unwrap();
    assert_eq!(row.read_sparse_i32(&root).unwrap(), 3);
}

#[test]
fn sparse_fields_iterate_in_insertion_order() {
    let (mut row, _) = new_row();
    for path in ["b", "a", "c"] {
        let mut root = row.root_cursor().unwrap();
        assert!(!row.find(&mut root, path).unwrap());
        row.write_sparse_utf8(&mut root, path, WriteOptions::Insert).unwrap();
    }

    let mut cursor = row.root_cursor().unwrap();
    let mut seen = Vec::new();
    while row.move_next(&mut cursor).unwrap() {
        seen.push(cursor.cell_path().unwrap().to_string());
    }
    assert_eq!(seen, ["b", "a", "c"]);
}

#[test]
fn sparse_replacement_changes_type_in_place() {
    let (mut row, _) = new_row();
    let mut root = row.root_cursor().unwrap();
    row.find(&mut root, "k").unwrap();
    row.write_sparse_i64(&mut root, 1 << 40, WriteOptions::Upsert).unwrap();
    row.write_sparse_utf8(&mut root, "now a string", WriteOptions::Upsert)
        .unwrap();

    let mut root = row.root_cursor().unwrap();
    assert!(row.find(&mut root, "k").unwrap());
    assert_eq!(root.cell_code(), TypeCode::Utf8);
    assert_eq!(row.read_sparse_utf8(&root).unwrap(), "now a string");
}

#[test]
fn deleted_sparse_field_disappears_and_shrinks_the_row() {
    let (mut row, _) = new_row();
    for path in ["a", "b"] {
        let mut root = row.root_cursor().unwrap();
        row.find(&mut root, path).unwrap();
        row.write_sparse_i32(&mut root, 7, WriteOptions::Insert).unwrap();
    }
    let full = row.len();

    let mut root = row.root_cursor().unwrap();
    assert!(row.find(&mut root, "a").unwrap());
    row.delete_sparse(&mut root).unwrap();
    assert!(row.len() < full);

    let mut cursor = row.root_cursor().unwrap();
    let mut seen = Vec::new();
    while row.move_next(&mut cursor).unwrap() {
        seen.push(cursor.cell_path().unwrap().to_string());
    }
    assert_eq!(seen, ["b"]);
}

#[test]
fn object_scopes_nest_path_tagged_fields() {
    let (mut row, _) = new_row();
    let mut root = row.root_cursor().unwrap();
    row.find(&mut root, "obj").unwrap();
    let mut obj = row
        .write_scope(
            &mut root,
            &TypeArgument::new(TypeCode::ObjectScope),
            WriteOptions::Insert,
        )
        .unwrap();
    row.find(&mut obj, "inner").unwrap();
    row.write_sparse_utf8(&mut obj, "deep", WriteOptions::Insert).unwrap();

    let mut root = row.root_cursor().unwrap();
    assert!(row.find(&mut root, "obj").unwrap());
    let mut obj = row.read_scope(&root).unwrap();
    assert!(row.find(&mut obj, "inner").unwrap());
    assert_eq!(row.read_sparse_utf8(&obj).unwrap(), "deep");
}

#[test]
fn typed_array_elides_element_codes() {
    let (mut row, _) = new_row();
    let mut root = row.root_cursor().unwrap();
    row.find(&mut root, "a").unwrap();
    let t = TypeArgument::with_args(
        TypeCode::TypedArrayScope,
        TypeArgumentList::single(TypeArgument::new(TypeCode::Int32)),
    );
    let mut arr = row.write_scope(&mut root, &t, WriteOptions::Insert).unwrap();
    for v in [10, 20, 30] {
        row.write_sparse_i32(&mut arr, v, WriteOptions::Upsert).unwrap();
        row.move_next(&mut arr).unwrap();
    }

    let mut root = row.root_cursor().unwrap();
    assert!(row.find(&mut root, "a").unwrap());
    // code + path(1+1) + element type arg + count + 3 implicit 4-byte values
    assert_eq!(row.sparse_cell_size(&root).unwrap(), 1 + 2 + 1 + 1 + 12);

    let mut arr = row.read_scope(&root).unwrap();
    assert_eq!(arr.count(), 3);
    let mut values = Vec::new();
    while row.move_next(&mut arr).unwrap() {
        values.push(row.read_sparse_i32(&arr).unwrap());
    }
    assert_eq!(values, [10, 20, 30]);
}

#[test]
fn untyped_array_carries_per_element_codes() {
    let (mut row, _) = new_row();
    let mut root = row.root_cursor().unwrap();
    row.find(&mut root, "a").unwrap();
    let mut arr = row
        .write_scope(
            &mut root,
            &TypeArgument::new(TypeCode::ArrayScope),
            WriteOptions::Insert,
        )
        .unwrap();
    row.write_sparse_i32(&mut arr, 1, WriteOptions::Upsert).unwrap();
    row.move_next(&mut arr).unwrap();
    row.write_sparse_utf8(&mut arr, "two", WriteOptions::Upsert).unwrap();

    let mut root = row.root_cursor().unwrap();
    assert!(row.find(&mut root, "a").unwrap());
    let mut arr = row.read_scope(&root).unwrap();
    assert!(row.move_next(&mut arr).unwrap());
    assert_eq!(row.read_sparse_i32(&arr).unwrap(), 1);
    assert!(row.move_next(&mut arr).unwrap());
    assert_eq!(row.read_sparse_utf8(&arr).unwrap(), "two");
    assert!(!row.move_next(&mut arr).unwrap());
}

#[test]
fn nullable_scope_tracks_presence() {
    let (mut row, _) = new_row();
    let t = TypeArgument::with_args(
        TypeCode::NullableScope,
        TypeArgumentList::single(TypeArgument::new(TypeCode::Int32)),
    );

    let mut root = row.root_cursor().unwrap();
    row.find(&mut root, "some").unwrap();
    let mut inner = row
        .write_nullable_scope(&mut root, &t, WriteOptions::Insert, true)
        .unwrap();
    row.write_sparse_i32(&mut inner, 11, WriteOptions::Upsert).unwrap();

    let mut root = row.root_cursor().unwrap();
    row.find(&mut root, "none").unwrap();
    row.write_nullable_scope(&mut root, &t, WriteOptions::Insert, false)
        .unwrap();

    let mut root = row.root_cursor().unwrap();
    assert!(row.find(&mut root, "some").unwrap());
    let mut inner = row.read_scope(&root).unwrap();
    assert!(row.move_next(&mut inner).unwrap());
    assert_eq!(row.read_sparse_i32(&inner).unwrap(), 11);

    let mut root = row.root_cursor().unwrap();
    assert!(row.find(&mut root, "none").unwrap());
    let mut inner = row.read_scope(&root).unwrap();
    assert!(!row.move_next(&mut inner).unwrap());
    assert!(matches!(row.read_sparse_i32(&inner), Err(RowError::NotFound)));
}

#[test]
fn late_write_into_an_empty_nullable_makes_it_present() {
    let (mut row, _) = new_row();
    let t = TypeArgument::with_args(
        TypeCode::NullableScope,
        TypeArgumentList::single(TypeArgument::new(TypeCode::Int32)),
    );

    let mut root = row.root_cursor().unwrap();
    row.find(&mut root, "late").unwrap();
    let mut inner = row
        .write_nullable_scope(&mut root, &t, WriteOptions::Insert, false)
        .unwrap();
    row.write_sparse_i32(&mut inner, 7, WriteOptions::Upsert).unwrap();

    let mut root = row.root_cursor().unwrap();
    assert!(row.find(&mut root, "late").unwrap());
    let mut inner = row.read_scope(&root).unwrap();
    assert!(row.move_next(&mut inner).unwrap());
    assert_eq!(row.read_sparse_i32(&inner).unwrap(), 7);
}

#[test]
fn tagged_scope_stores_the_tag_in_slot_zero() {
    let (mut row, _) = new_row();
    let t = TypeArgument::with_args(
        TypeCode::TaggedScope,
        TypeArgumentList::single(TypeArgument::new(TypeCode::Int32)),
    );

    let mut root = row.root_cursor().unwrap();
    row.find(&mut root, "t").unwrap();
    let mut scope = row
        .write_tagged_scope(&mut root, &t, 3, WriteOptions::Insert)
        .unwrap();
    assert!(row.move_next(&mut scope).unwrap());
    assert_eq!(row.read_sparse_u8(&scope).unwrap(), 3);
    assert!(row.move_next(&mut scope).unwrap());
    row.write_sparse_i32(&mut scope, 42, WriteOptions::Upsert).unwrap();

    let mut root = row.root_cursor().unwrap();
    assert!(row.find(&mut root, "t").unwrap());
    let mut scope = row.read_scope(&root).unwrap();
    assert!(row.move_next(&mut scope).unwrap());
    assert_eq!(row.read_sparse_u8(&scope).unwrap(), 3);
    assert!(row.move_next(&mut scope).unwrap());
    assert_eq!(row.read_sparse_i32(&scope).unwrap(), 42);
    assert!(!row.move_next(&mut scope).unwrap());
}

#[test]
fn typed_set_sorts_and_dedups_on_rebuild() {
    let (mut row, _) = new_row();
    let t = TypeArgument::with_args(
        TypeCode::TypedSetScope,
        TypeArgumentList::single(TypeArgument::new(TypeCode::Int32)),
    );
    let mut root = row.root_cursor().unwrap();
    row.find(&mut root, "s").unwrap();
    let mut set = row.write_scope(&mut root, &t, WriteOptions::Insert).unwrap();
    for v in [3, 1, 2, 1] {
        row.write_sparse_i32(&mut set, v, WriteOptions::InsertAt).unwrap();
        row.move_next(&mut set).unwrap();
    }
    assert_eq!(set.count(), 4);
    row.unique_index_rebuild(&mut set).unwrap();
    assert_eq!(set.count(), 3);

    let mut values = Vec::new();
    while row.move_next(&mut set).unwrap() {
        values.push(row.read_sparse_i32(&set).unwrap());
    }
    assert_eq!(values, [1, 2, 3]);
}

#[test]
fn unique_scopes_reject_plain_upserts() {
    let (mut row, _) = new_row();
    let t = TypeArgument::with_args(
        TypeCode::TypedSetScope,
        TypeArgumentList::single(TypeArgument::new(TypeCode::Int32)),
    );
    let mut root = row.root_cursor().unwrap();
    row.find(&mut root, "s").unwrap();
    let mut set = row.write_scope(&mut root, &t, WriteOptions::Insert).unwrap();
    assert!(matches!(
        row.write_sparse_i32(&mut set, 1, WriteOptions::Upsert),
        Err(RowError::Unsupported(_))
    ));
}

#[test]
fn move_field_into_set_consumes_the_probe() {
    let (mut row, _) = new_row();
    let t = TypeArgument::with_args(
        TypeCode::TypedSetScope,
        TypeArgumentList::single(TypeArgument::new(TypeCode::Int32)),
    );
    let mut root = row.root_cursor().unwrap();
    row.find(&mut root, "s").unwrap();
    let mut set = row.write_scope(&mut root, &t, WriteOptions::Insert).unwrap();

    let mut probe = row.root_cursor().unwrap();
    row.find(&mut probe, "tmp").unwrap();
    row.write_sparse_i32(&mut probe, 5, WriteOptions::Insert).unwrap();
    row.typed_collection_move_field(&mut set, &mut probe, WriteOptions::Insert)
        .unwrap();
    assert_eq!(set.count(), 1);

    let mut check = row.root_cursor().unwrap();
    assert!(!row.find(&mut check, "tmp").unwrap());

    // Moving an equal element under Insert reports Exists and still deletes
    // the probe.
    let mut probe = row.root_cursor().unwrap();
    row.find(&mut probe, "tmp").unwrap();
    row.write_sparse_i32(&mut probe, 5, WriteOptions::Insert).unwrap();
    assert!(matches!(
        row.typed_collection_move_field(&mut set, &mut probe, WriteOptions::Insert),
        Err(RowError::Exists)
    ));
    let mut check = row.root_cursor().unwrap();
    assert!(!row.find(&mut check, "tmp").unwrap());
    assert_eq!(set.count(), 1);
}

#[test]
fn immutable_scopes_allow_reads_but_not_writes() {
    let (mut row, _) = new_row();
    let mut root = row.root_cursor().unwrap();
    row.find(&mut root, "cfg").unwrap();
    let mut obj = row
        .write_scope(
            &mut root,
            &TypeArgument::new(TypeCode::ImmutableObjectScope),
            WriteOptions::Insert,
        )
        .unwrap();
    row.find(&mut obj, "k").unwrap();
    row.write_sparse_i32(&mut obj, 9, WriteOptions::Insert).unwrap();

    let mut root = row.root_cursor().unwrap();
    assert!(row.find(&mut root, "cfg").unwrap());
    let mut obj = row.read_scope(&root).unwrap();
    assert!(row.find(&mut obj, "k").unwrap());
    assert_eq!(row.read_sparse_i32(&obj).unwrap(), 9);
    assert!(matches!(
        row.write_sparse_i32(&mut obj, 10, WriteOptions::Upsert),
        Err(RowError::InsufficientPermissions)
    ));
    assert!(matches!(
        row.delete_sparse(&mut obj),
        Err(RowError::InsufficientPermissions)
    ));
}

#[test]
fn udt_scope_nests_a_schema_rooted_row() {
    let mut builder = LayoutBuilder::new("outer", SchemaId::new(1));
    builder.add_fixed_column("id", TypeCode::Int32, true, 0).unwrap();
    let outer = Arc::new(builder.build());

    let mut builder = LayoutBuilder::new("inner", SchemaId::new(2));
    builder.add_fixed_column("n", TypeCode::Int32, true, 0).unwrap();
    let inner = Arc::new(builder.build());

    let resolver = Arc::new(SimpleResolver::new(vec![outer.clone(), inner.clone()]));
    let mut row = RowBuffer::new(64, resolver);
    row.init_layout(&outer);

    let n = inner.column("n").unwrap().clone();
    let mut root = row.root_cursor().unwrap();
    row.find(&mut root, "child").unwrap();
    let child = row
        .write_scope(
            &mut root,
            &TypeArgument::udt(SchemaId::new(2)),
            WriteOptions::Insert,
        )
        .unwrap();
    row.write_i32(&child, &n, 7).unwrap();

    let mut inner_cursor = child;
    row.find(&mut inner_cursor, "extra").unwrap();
    row.write_sparse_utf8(&mut inner_cursor, "x", WriteOptions::Insert).unwrap();

    let mut root = row.root_cursor().unwrap();
    assert!(row.find(&mut root, "child").unwrap());
    let mut child = row.read_scope(&root).unwrap();
    assert_eq!(row.read_i32(&child, &n).unwrap(), 7);
    assert!(row.find(&mut child, "extra").unwrap());
    assert_eq!(row.read_sparse_utf8(&child).unwrap(), "x");
}

#[test]
fn skip_advances_the_parent_past_a_child_scope() {
    let (mut row, _) = new_row();
    let mut root = row.root_cursor().unwrap();
    row.find(&mut root, "obj").unwrap();
    let mut obj = row
        .write_scope(&mut root, &TypeArgument::new(TypeCode::ObjectScope), WriteOptions::Insert)
        .unwrap();
    row.find(&mut obj, "inner").unwrap();
    row.write_sparse_i32(&mut obj, 1, WriteOptions::Insert).unwrap();

    let mut root = row.root_cursor().unwrap();
    row.find(&mut root, "after").unwrap();
    row.write_sparse_i32(&mut root, 2, WriteOptions::Insert).unwrap();

    let mut parent = row.root_cursor().unwrap();
    assert!(row.move_next(&mut parent).unwrap());
    assert_eq!(parent.cell_path(), Some("obj"));
    let child = row.read_scope(&parent).unwrap();
    row.skip(&mut parent, &child).unwrap();
    assert!(row.move_next(&mut parent).unwrap());
    assert_eq!(parent.cell_path(), Some("after"));
    assert_eq!(row.read_sparse_i32(&parent).unwrap(), 2);
}

#[test]
fn skip_rejects_a_child_from_a_different_scope() {
    let (mut row, _) = new_row();
    let mut root = row.root_cursor().unwrap();
    row.find(&mut root, "first").unwrap();
    let first = row
        .write_scope(&mut root, &TypeArgument::new(TypeCode::ObjectScope), WriteOptions::Insert)
        .unwrap();

    let mut root = row.root_cursor().unwrap();
    row.find(&mut root, "second").unwrap();
    row.write_scope(&mut root, &TypeArgument::new(TypeCode::ObjectScope), WriteOptions::Insert)
        .unwrap();

    let mut parent = row.root_cursor().unwrap();
    assert!(row.find(&mut parent, "second").unwrap());
    assert!(matches!(
        row.skip(&mut parent, &first),
        Err(RowError::InvalidRow(_))
    ));
}

#[test]
fn rows_roundtrip_through_attach() {
    let (mut row, layout) = new_row();
    let resolver = Arc::new(SimpleResolver::new(vec![layout.clone()]));
    let root = row.root_cursor().unwrap();
    let a = layout.column("a").unwrap().clone();
    row.write_i32(&root, &a, 123).unwrap();
    let mut root = row.root_cursor().unwrap();
    row.find(&mut root, "s").unwrap();
    row.write_sparse_utf8(&mut root, "kept", WriteOptions::Insert).unwrap();

    let bytes = row.into_vec();
    let reattached = RowBuffer::attach(bytes, resolver).unwrap();
    let root = reattached.root_cursor().unwrap();
    assert_eq!(reattached.read_i32(&root, &a).unwrap(), 123);
    let mut root = reattached.root_cursor().unwrap();
    assert!(reattached.find(&mut root, "s").unwrap());
    assert_eq!(reattached.read_sparse_utf8(&root).unwrap(), "kept");
}

#[test]
fn attach_rejects_foreign_versions_and_unknown_schemas() {
    let (row, layout) = new_row();
    let resolver = Arc::new(SimpleResolver::new(vec![layout]));
    let mut bytes = row.into_vec();
    bytes[0] = 0x01;
    assert!(matches!(
        RowBuffer::attach(bytes, resolver.clone()),
        Err(RowError::InvalidRow(_))
    ));

    let (row, _) = new_row();
    let empty = Arc::new(SimpleResolver::default());
    assert!(matches!(
        RowBuffer::attach(row.into_vec(), empty),
        Err(RowError::SchemaNotFound(_))
    ));
}
