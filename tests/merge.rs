// Map merge: added keys, recursive reconciliation, and conflicts.
use deep_equal_collections::{
    deep_eq_via_partial_eq, DeepEqualMap, DeepEqualSet, MergeConflict, MergeValue,
};
use serde::Serialize;
use serde_json::json;

#[derive(Clone, Debug, PartialEq, Serialize)]
struct Person {
    name: String,
    age: u32,
}
deep_eq_via_partial_eq!(Person);

fn object() -> Person {
    Person {
        name: "Leandro".to_string(),
        age: 29,
    }
}

fn other_object() -> Person {
    Person {
        name: "John".to_string(),
        age: 35,
    }
}

#[test]
fn merge_with_different_keys() {
    let mut map = DeepEqualMap::from([(object(), "second value wins")]);
    let other = DeepEqualMap::from([(other_object(), "different value")]);
    map.merge(&other).unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(map.get(&object()), Some(&"second value wins"));
    assert_eq!(map.get(&other_object()), Some(&"different value"));
    assert_eq!(other.len(), 1);
}

// Test: equivalent keys whose values are sets get the union.
// Verifies: the stored value is replaced, not mutated in place.
#[test]
fn merge_with_mergeable_values() {
    let stored: DeepEqualSet<i32> = [1].into();
    let mut map = DeepEqualMap::from([(object(), stored.clone())]);
    let other = DeepEqualMap::from([(object(), DeepEqualSet::from([2]))]);
    map.merge(&other).unwrap();

    assert_eq!(map.len(), 1);
    assert_eq!(
        map.get(&object()),
        Some(&DeepEqualSet::from([1, 2]))
    );
    assert_eq!(stored.len(), 1);
}

#[test]
fn merge_with_non_mergeable_values() {
    let mut map = DeepEqualMap::from([(object(), 1)]);
    let other = DeepEqualMap::from([(object(), 2)]);
    let err = map.merge(&other).unwrap_err();
    assert_eq!(
        err.to_string(),
        r#"Merge conflict: Key: {"name":"Leandro","age":29} This Value: 1 Other Value: 2"#
    );
    assert_eq!(err.key, json!({"name": "Leandro", "age": 29}));
    assert_eq!(map.get(&object()), Some(&1));
}

// Test: a conflict midway keeps everything merged before it.
#[test]
fn conflict_keeps_earlier_progress() {
    let mut map = DeepEqualMap::from([(object(), 1)]);
    let mut other = DeepEqualMap::new();
    other
        .set(other_object(), 5)
        .set(object(), 2)
        .set(
            Person {
                name: "Ana".to_string(),
                age: 40,
            },
            7,
        );
    assert!(map.merge(&other).is_err());
    assert_eq!(map.len(), 2);
    assert_eq!(map.get(&other_object()), Some(&5));
    assert_eq!(map.get(&object()), Some(&1));
}

// Test: maps of maps merge recursively; a nested conflict surfaces as is.
#[test]
fn nested_maps_merge_recursively() {
    type Inner = DeepEqualMap<String, i32>;
    let mut outer: DeepEqualMap<Person, Inner> =
        DeepEqualMap::from([(object(), Inner::from([("a".to_string(), 1)]))]);
    let other = DeepEqualMap::from([(object(), Inner::from([("b".to_string(), 2)]))]);
    outer.merge(&other).unwrap();
    let inner = outer.get(&object()).expect("present");
    assert_eq!(inner.len(), 2);
    assert_eq!(inner.get("b"), Some(&2));

    let clash = DeepEqualMap::from([(object(), Inner::from([("a".to_string(), 9)]))]);
    let err = outer.merge(&clash).unwrap_err();
    assert_eq!(err.key, json!("a"));
    assert_eq!(err.this_value, json!(1));
    assert_eq!(err.other_value, json!(9));
    assert_eq!(outer.get(&object()).and_then(|m| m.get("a")), Some(&1));
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
enum Field {
    Count(u32),
    Tags(DeepEqualSet<String>),
}

impl MergeValue for Field {
    fn merge_copy(&self, other: &Self) -> Option<Result<Self, MergeConflict>> {
        match (self, other) {
            (Field::Tags(a), Field::Tags(b)) => {
                let mut merged = a.clone();
                merged.merge(b);
                Some(Ok(Field::Tags(merged)))
            }
            _ => None,
        }
    }
}

// Test: a host value type decides per variant whether it is mergeable.
#[test]
fn mixed_value_enum() {
    let mut map: DeepEqualMap<String, Field> = DeepEqualMap::new();
    map.set("tags".into(), Field::Tags(["x".to_string()].into()))
        .set("count".into(), Field::Count(1));

    let other = DeepEqualMap::from([(
        "tags".to_string(),
        Field::Tags(["y".to_string()].into()),
    )]);
    map.merge(&other).unwrap();
    match map.get("tags") {
        Some(Field::Tags(t)) => assert_eq!(t.len(), 2),
        v => panic!("unexpected value: {v:?}"),
    }

    let other = DeepEqualMap::from([("count".to_string(), Field::Count(2))]);
    let err = map.merge(&other).unwrap_err();
    assert_eq!(
        err.to_string(),
        r#"Merge conflict: Key: "count" This Value: 1 Other Value: 2"#
    );
}

#[test]
fn optional_values_fill_gaps() {
    let mut map = DeepEqualMap::from([("a".to_string(), None), ("b".to_string(), Some(1))]);
    let other = DeepEqualMap::from([("a".to_string(), Some(3)), ("b".to_string(), None)]);
    map.merge(&other).unwrap();
    assert_eq!(map.get("a"), Some(&Some(3)));
    assert_eq!(map.get("b"), Some(&Some(1)));
}

#[test]
fn merge_chains() {
    let mut map: DeepEqualMap<i32, i32> = DeepEqualMap::new();
    map.merge(&DeepEqualMap::from([(1, 1)]))
        .unwrap()
        .set(2, 2)
        .merge(&DeepEqualMap::from([(3, 3)]))
        .unwrap();
    assert_eq!(map.len(), 3);
}

#[derive(Clone, Debug, PartialEq)]
struct Point {
    x: i32,
    y: i32,
}
deep_eq_via_partial_eq!(Point);

// Test: keys without serde support still merge through merge_with.
// Verifies: set values union; plain values report Debug snapshots.
#[test]
fn merge_with_unserializable_keys() {
    let origin = Point { x: 0, y: 0 };
    let mut map = DeepEqualMap::from([(origin.clone(), DeepEqualSet::from([1i32]))]);
    let other = DeepEqualMap::from([
        (origin.clone(), DeepEqualSet::from([2])),
        (Point { x: 1, y: 0 }, DeepEqualSet::from([3])),
    ]);
    map.merge_with(&other, MergeConflict::from_debug).unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(map.get(&origin), Some(&DeepEqualSet::from([1, 2])));

    let mut plain = DeepEqualMap::from([(origin.clone(), 1i32)]);
    let err = plain
        .merge_with(&DeepEqualMap::from([(origin, 2)]), MergeConflict::from_debug)
        .unwrap_err();
    assert_eq!(err.key, json!("Point { x: 0, y: 0 }"));
    assert_eq!(err.this_value, json!("1"));
    assert_eq!(err.other_value, json!("2"));
}
