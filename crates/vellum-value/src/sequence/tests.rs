use std::collections::HashSet;

use proptest::prelude::*;

use super::*;
use crate::list::List;
use crate::set::Set;
use crate::store::{ValueStore, ValueStoreConfig};
use crate::structs::Struct;

fn store_with(chunker: ChunkerConfig) -> ValueStore {
    ValueStore::in_memory_with(&ValueStoreConfig {
        chunker,
        ..Default::default()
    })
}

fn fixed(items: usize) -> ValueStore {
    store_with(ChunkerConfig::Fixed { items })
}

fn rolling() -> ValueStore {
    store_with(ChunkerConfig::Rolling {
        window: 8,
        pattern_bits: 2,
        max_items: 64,
    })
}

fn numbers(range: std::ops::Range<i32>) -> Vec<Value> {
    range.map(Value::from).collect()
}

/// Check every tuple against the subtree it points at and return the
/// number of leaf items below `node`.
fn check_subtree<T: SequenceItem>(store: &ValueStore, node: &Arc<SeqNode<T>>) -> u64 {
    let mut prev = 0;
    for tuple in node.tuples() {
        let child: Arc<SeqNode<T>> = load_child(store, node.kind(), &tuple.child).unwrap();
        assert!(child.width() > 0);
        assert_eq!(check_subtree(store, &child), tuple.cumulative - prev);
        if !node.kind().is_positional() {
            assert_eq!(child.last_key(), Some(tuple.key.clone()));
        }
        prev = tuple.cumulative;
    }
    match node.node() {
        Node::Leaf(items) => items.len() as u64,
        Node::Meta(_) => prev,
    }
}

fn check_tree<T: SequenceItem>(store: &ValueStore, seq: &Sequence<T>) {
    if seq.is_meta() {
        assert!(seq.root().width() >= 2, "root meta node with a single tuple");
    }
    assert_eq!(check_subtree(store, seq.root()), seq.len());
}

fn child_hashes<T: SequenceItem>(store: &ValueStore, node: &Arc<SeqNode<T>>, out: &mut HashSet<Hash>) {
    for tuple in node.tuples() {
        if out.insert(tuple.child.target()) {
            let child: Arc<SeqNode<T>> = load_child(store, node.kind(), &tuple.child).unwrap();
            child_hashes(store, &child, out);
        }
    }
}

fn levels<T: SequenceItem>(store: &ValueStore, seq: &Sequence<T>) -> usize {
    Cursor::at_index(store, seq.root(), 0).unwrap().depth()
}

// -----------------------------------------------------------------------------
// Shape
// -----------------------------------------------------------------------------

#[test]
fn same_contents_in_either_shape() {
    let values = numbers(4..8);
    let flat_store = ValueStore::in_memory();
    let flat = List::new(&flat_store, values.clone()).unwrap();
    assert!(!flat.sequence().is_meta());

    let chunked_store = fixed(2);
    let chunked = List::new(&chunked_store, values.clone()).unwrap();
    let root = chunked.sequence().root();
    assert!(root.is_meta());
    let cumulative: Vec<u64> = root.tuples().iter().map(|t| t.cumulative).collect();
    assert_eq!(cumulative, [2, 4]);
    let keys: Vec<Value> = root.tuples().iter().map(|t| t.key.clone()).collect();
    assert_eq!(keys, [Value::from(2), Value::from(4)]);

    assert_eq!(flat.len(), chunked.len());
    assert_eq!(flat.to_vec(&flat_store).unwrap(), values);
    assert_eq!(chunked.to_vec(&chunked_store).unwrap(), values);
    assert_eq!(flat.type_of(), chunked.type_of());
    assert_ne!(flat.hash(), chunked.hash());
}

#[test]
fn tree_height_grows_logarithmically() {
    let store = fixed(4);
    let sizes_and_levels = [(4, 1), (16, 2), (64, 3), (256, 4), (257, 5)];
    for (size, expected) in sizes_and_levels {
        let list = List::new(&store, numbers(0..size)).unwrap();
        assert_eq!(levels(&store, list.sequence()), expected, "size {size}");
        check_tree(&store, list.sequence());
    }
}

#[test]
fn sorted_tuples_carry_last_key() {
    let store = fixed(3);
    let set = Set::new(&store, numbers(0..30)).unwrap();
    let root = set.sequence().root();
    assert!(root.is_meta());
    assert_eq!(root.tuples().last().unwrap().key, Value::from(29));
    check_tree(&store, set.sequence());
}

#[test]
fn meta_header_covers_children() {
    let store = fixed(2);
    let list = List::new(
        &store,
        vec![Value::from(1), Value::from(2), Value::from("a"), Value::from("b")],
    )
    .unwrap();
    assert_eq!(
        list.sequence().header(),
        [Type::make_union([Type::number(), Type::string()])]
    );
}

// -----------------------------------------------------------------------------
// Encoding
// -----------------------------------------------------------------------------

#[test]
fn chunked_collections_roundtrip() {
    let store = fixed(2);
    let list = Value::List(List::new(&store, numbers(0..9)).unwrap());
    let set = Value::Set(Set::new(&store, numbers(0..9)).unwrap());
    for value in [list, set] {
        let decoded = Value::decode(&value.encode()).unwrap();
        assert_eq!(decoded.hash(), value.hash());
        assert_eq!(decoded.type_of(), value.type_of());
    }
}

#[test]
fn recursive_struct_values_roundtrip() {
    let store = fixed(2);
    let a = Type::make_struct(
        "A",
        [
            ("v", Type::number()),
            ("children", Type::make_list(Type::make_cycle(0))),
        ],
    )
    .unwrap();
    let leaf = |v: i32| {
        Struct::new(
            a.clone(),
            [("v", Value::from(v)), ("children", Value::List(List::empty()))],
        )
        .unwrap()
    };
    let children = List::new(&store, (0..5).map(|i| Value::Struct(leaf(i))).collect()).unwrap();
    assert_eq!(children.type_of(), Type::make_list(a.clone()));
    let root = Struct::new(
        a.clone(),
        [("v", Value::from(100)), ("children", Value::List(children))],
    )
    .unwrap();
    let value = Value::Struct(root);

    let decoded = Value::decode(&value.encode()).unwrap();
    assert_eq!(decoded, value);
    let decoded = decoded.as_struct().unwrap().clone();
    assert_eq!(decoded.type_of(), &a);
    assert_eq!(
        decoded.type_of().field_type("children"),
        Some(Type::make_list(a.clone()))
    );
    let kids = decoded.get("children").unwrap().as_list().unwrap().to_vec(&store).unwrap();
    assert_eq!(kids.len(), 5);
    assert_eq!(kids[3].as_struct().unwrap().get("v"), Some(&Value::from(3)));
}

fn encode_with(build: impl FnOnce(&mut Writer)) -> vellum_store::Chunk {
    let mut w = Writer::new();
    build(&mut w);
    vellum_store::Chunk::new(w.into_bytes())
}

#[test]
fn unsorted_set_leaf_rejected() {
    let chunk = encode_with(|w| {
        w.write_u8(Kind::Set.tag());
        codec::write_type(w, &Type::number());
        w.write_bool(false);
        w.write_u64(2);
        w.write_f64(2.0);
        w.write_f64(1.0);
    });
    assert_eq!(
        Value::decode(&chunk).unwrap_err(),
        DecodeError::NonCanonicalOrder {
            context: "sequence items"
        }
    );
}

#[test]
fn duplicate_set_items_rejected() {
    let chunk = encode_with(|w| {
        w.write_u8(Kind::Set.tag());
        codec::write_type(w, &Type::number());
        w.write_bool(false);
        w.write_u64(2);
        w.write_f64(0.0);
        w.write_f64(-0.0);
    });
    assert!(matches!(
        Value::decode(&chunk),
        Err(DecodeError::NonCanonicalOrder { .. })
    ));
}

#[test]
fn wrong_element_header_rejected() {
    let chunk = encode_with(|w| {
        w.write_u8(Kind::List.tag());
        codec::write_type(w, &Type::make_union([Type::number(), Type::string()]));
        w.write_bool(false);
        w.write_u64(1);
        codec::write_value(w, &Value::from(1));
    });
    assert_eq!(
        Value::decode(&chunk).unwrap_err(),
        DecodeError::MalformedSequence {
            context: "element type header"
        }
    );
}

#[test]
fn empty_meta_node_rejected() {
    let chunk = encode_with(|w| {
        w.write_u8(Kind::List.tag());
        codec::write_type(w, &Type::make_union(Vec::new()));
        w.write_bool(true);
        w.write_u64(0);
    });
    assert_eq!(
        Value::decode(&chunk).unwrap_err(),
        DecodeError::MalformedSequence {
            context: "empty meta node"
        }
    );
}

#[test]
fn meta_child_of_wrong_kind_rejected() {
    let child = Ref::from_value(&Value::from("not a list"));
    let chunk = encode_with(|w| {
        w.write_u8(Kind::List.tag());
        codec::write_type(w, &Type::make_union(Vec::new()));
        w.write_bool(true);
        w.write_u64(1);
        w.write_u8(Kind::Ref.tag());
        codec::write_ref(w, &child);
        codec::write_value(w, &Value::from(1));
        w.write_u64(1);
    });
    assert_eq!(
        Value::decode(&chunk).unwrap_err(),
        DecodeError::MalformedSequence {
            context: "child of a different kind"
        }
    );
}

#[test]
fn missing_child_surfaces_on_access() {
    let writer = fixed(2);
    let list = List::new(&writer, numbers(0..8)).unwrap();
    let other = ValueStore::in_memory();
    assert!(matches!(
        list.get(&other, 5),
        Err(ValueError::MissingChunk(_))
    ));
}

// -----------------------------------------------------------------------------
// Edits
// -----------------------------------------------------------------------------

#[test]
fn single_edit_rewrites_one_path() {
    let store = fixed(16);
    let list = List::new(&store, numbers(0..2000)).unwrap();
    let edited = list.set(&store, 1000, Value::from("changed")).unwrap();

    let mut before = HashSet::new();
    child_hashes(&store, list.sequence().root(), &mut before);
    let mut after = HashSet::new();
    child_hashes(&store, edited.sequence().root(), &mut after);

    let fresh: Vec<&Hash> = after.difference(&before).collect();
    assert_eq!(levels(&store, list.sequence()), 3);
    assert_eq!(fresh.len(), 2);
    check_tree(&store, edited.sequence());
}

#[test]
fn insert_resynchronises_with_rolling_boundaries() {
    let store = rolling();
    let values = numbers(0..3000);
    let list = List::new(&store, values.clone()).unwrap();
    let edited = list.insert(&store, 1234, Value::from("inserted")).unwrap();

    let mut before = HashSet::new();
    child_hashes(&store, list.sequence().root(), &mut before);
    let mut after = HashSet::new();
    child_hashes(&store, edited.sequence().root(), &mut after);
    let fresh = after.difference(&before).count();
    assert!(fresh < 4 * levels(&store, list.sequence()), "{fresh} new chunks");

    let mut expected = values;
    expected.insert(1234, Value::from("inserted"));
    assert_eq!(edited.hash(), List::new(&store, expected).unwrap().hash());
}

#[test]
fn edits_at_both_ends() {
    let store = fixed(3);
    let list = List::new(&store, numbers(0..100)).unwrap();
    let mut expected = numbers(0..100);

    let list = list.insert(&store, 0, Value::from(-1)).unwrap();
    expected.insert(0, Value::from(-1));
    let list = list.append(&store, Value::from(100)).unwrap();
    expected.push(Value::from(100));
    let list = list.remove(&store, 0).unwrap();
    expected.remove(0);
    let list = list.remove(&store, list.len() - 1).unwrap();
    expected.pop();

    assert_eq!(list.hash(), List::new(&store, expected).unwrap().hash());
    check_tree(&store, list.sequence());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn aggregate_counts_match_leaves(len in 0usize..400, items in 1usize..6) {
        let store = fixed(items);
        let values: Vec<Value> = (0..len as i32).map(Value::from).collect();
        let list = List::new(&store, values.clone()).unwrap();
        check_tree(&store, list.sequence());
        prop_assert_eq!(list.len(), len as u64);
        prop_assert_eq!(list.to_vec(&store).unwrap(), values);
    }

    #[test]
    fn splice_equals_fresh_build(
        values in proptest::collection::vec(0i32..1000, 0..300),
        at in any::<prop::sample::Index>(),
        remove in 0usize..40,
        inserts in proptest::collection::vec(0i32..1000, 0..40),
    ) {
        let store = rolling();
        let values: Vec<Value> = values.into_iter().map(Value::from).collect();
        let inserts: Vec<Value> = inserts.into_iter().map(Value::from).collect();
        let index = at.index(values.len() + 1);
        let remove = remove.min(values.len() - index);

        let list = List::new(&store, values.clone()).unwrap();
        let edited = list
            .splice(&store, index as u64, remove as u64, inserts.clone())
            .unwrap();

        let mut expected = values;
        expected.splice(index..index + remove, inserts);
        check_tree(&store, edited.sequence());
        prop_assert_eq!(edited.to_vec(&store).unwrap(), expected.clone());
        prop_assert_eq!(edited.hash(), List::new(&store, expected).unwrap().hash());
    }

    #[test]
    fn set_edits_equal_fresh_build(
        values in proptest::collection::btree_set(0i32..500, 0..200),
        extra in 0i32..500,
    ) {
        let store = rolling();
        let mut all: Vec<Value> = values.iter().copied().map(Value::from).collect();
        let set = Set::new(&store, all.clone()).unwrap();

        let with = set.insert(&store, Value::from(extra)).unwrap();
        all.push(Value::from(extra));
        check_tree(&store, with.sequence());
        prop_assert_eq!(with.hash(), Set::new(&store, all.clone()).unwrap().hash());

        let without = with.remove(&store, &Value::from(extra)).unwrap();
        all.retain(|v| *v != Value::from(extra));
        prop_assert_eq!(without.hash(), Set::new(&store, all).unwrap().hash());
    }
}
