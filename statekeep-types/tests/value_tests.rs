use proptest::prelude::*;
use statekeep_types::{Tree, Value};

// ── Classification ────────────────────────────────────────────────

#[test]
fn unknown_and_null_are_not_present() {
    assert!(!Value::Unknown.is_present());
    assert!(!Value::Unknown.is_known());
    assert!(!Value::Null.is_present());
    assert!(Value::Null.is_known());
}

#[test]
fn empty_values() {
    assert!(Value::from("").is_empty());
    assert!(Value::List(vec![]).is_empty());
    assert!(Value::Map(Tree::new()).is_empty());
    assert!(!Value::from(false).is_empty());
    assert!(!Value::from(0_i64).is_empty());
}

#[test]
fn non_finite_float_becomes_null() {
    assert_eq!(Value::from(f64::NAN), Value::Null);
    assert_eq!(Value::from(2.5_f64).as_f64(), Some(2.5));
}

#[test]
fn accessors_reject_other_kinds() {
    let v = Value::from("text");
    assert_eq!(v.as_str(), Some("text"));
    assert_eq!(v.as_bool(), None);
    assert_eq!(v.as_i64(), None);
    assert!(v.as_list().is_none());
    assert!(v.as_map().is_none());
    assert_eq!(v.kind_name(), "string");
}

#[test]
fn unknown_inside_list_is_dropped_from_json() {
    let v = Value::List(vec![Value::from(1_i64), Value::Unknown, Value::from(2_i64)]);
    assert_eq!(v.to_json(), Some(serde_json::json!([1, 2])));
    assert_eq!(Value::Unknown.to_json(), None);
}

// ── JSON properties ───────────────────────────────────────────────

fn json_strategy() -> impl Strategy<Value = serde_json::Value> {
    let leaf = prop_oneof![
        Just(serde_json::Value::Null),
        any::<bool>().prop_map(serde_json::Value::Bool),
        any::<i64>().prop_map(|n| serde_json::Value::Number(n.into())),
        "[a-z0-9 ]{0,12}".prop_map(serde_json::Value::String),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(serde_json::Value::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                .prop_map(|m| serde_json::Value::Object(m.into_iter().collect())),
        ]
    })
}

proptest! {
    /// JSON → Value → JSON is lossless for every JSON document.
    #[test]
    fn json_conversion_is_lossless(json in json_strategy()) {
        let value = Value::from(json.clone());
        prop_assert_eq!(value.to_json(), Some(json));
    }
}
