//! Tuple construction, typed access, and equality through the public API

use std::collections::BTreeSet;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use proptest::prelude::*;
use streamdef::config::ConversionConfig;
use streamdef::tuple::{
    ConversionService, DefaultConversionService, Tuple, TupleBuilder, TupleError, Value,
};

fn hash_of(tuple: &Tuple) -> u64 {
    let mut hasher = DefaultHasher::new();
    tuple.hash(&mut hasher);
    hasher.finish()
}

#[test]
fn typed_access_over_string_fields() {
    let t = TupleBuilder::default()
        .put("a", " 42 ")
        .put("b", "true")
        .put("c", "x")
        .build()
        .unwrap();

    assert_eq!(t.int("a").unwrap(), 42);
    assert!(t.bool("b").unwrap());
    assert_eq!(t.char("c").unwrap(), 'x');
    assert_eq!(t.string("a").unwrap(), "42");
}

#[test]
fn generic_accessor_matches_named_accessors() {
    let t = TupleBuilder::default()
        .put("n", "17")
        .put("when", "01/02/2013")
        .build()
        .unwrap();
    assert_eq!(t.get::<i64>("n").unwrap(), t.long("n").unwrap());
    assert_eq!(t.get::<String>(0).unwrap(), "17");

    let dated = TupleBuilder::with_config(&ConversionConfig {
        date_pattern: "%d/%m/%Y".to_string(),
    })
    .put("when", "01/02/2013")
    .build()
    .unwrap();
    assert_eq!(dated.date("when").unwrap().to_string(), "2013-02-01 00:00:00 UTC");
    assert!(t.date("when").is_err());
}

#[test]
fn unknown_fields_are_reported_with_known_names() {
    let t = TupleBuilder::default().put("a", 1).build().unwrap();
    match t.string("b").unwrap_err() {
        TupleError::UnknownField { name, known } => {
            assert_eq!(name, "b");
            assert_eq!(known, vec!["a".to_string()]);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn tuples_are_shareable_across_threads() {
    let t = TupleBuilder::default().put("k", "v").build().unwrap();
    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| assert_eq!(t.string("k").unwrap(), "v"));
        }
    });
}

fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::from),
        any::<i32>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        any::<f64>().prop_map(Value::from),
        "[ a-zA-Z0-9]{0,10}".prop_map(Value::from),
    ]
}

fn fields_strategy() -> impl Strategy<Value = (Vec<String>, Vec<Value>)> {
    // dotted names are plain field names, not nested paths
    let name = "[a-z_]{1,6}(\\.[a-z_]{1,4}){0,2}";
    prop::collection::btree_set(name, 0..8).prop_flat_map(|names: BTreeSet<String>| {
        let names: Vec<String> = names.into_iter().collect();
        let len = names.len();
        (Just(names), prop::collection::vec(value_strategy(), len))
    })
}

fn conversion() -> Arc<dyn ConversionService> {
    Arc::new(DefaultConversionService::default())
}

proptest! {
    #[test]
    fn fields_read_back_by_index_and_name((names, values) in fields_strategy()) {
        let t = Tuple::new(names.clone(), values.clone(), conversion()).unwrap();
        prop_assert_eq!(t.field_names(), names.as_slice());
        prop_assert_eq!(t.size(), names.len());
        for (i, name) in names.iter().enumerate() {
            prop_assert_eq!(t.value(i).unwrap(), &values[i]);
            prop_assert_eq!(t.value(name).unwrap(), &values[i]);
            prop_assert_eq!(t.index_of(name).unwrap(), i);
        }
    }

    #[test]
    fn string_access_is_trimmed(text in "[ \t]{0,3}[a-z0-9 ]{0,8}[ \t]{0,3}") {
        let t = TupleBuilder::default().put("s", text).build().unwrap();
        let read = t.string("s").unwrap();
        prop_assert_eq!(read.trim(), read.as_str());
    }

    #[test]
    fn equality_and_hash_ignore_identity((names, values) in fields_strategy()) {
        let a = Tuple::new(names.clone(), values.clone(), conversion()).unwrap();
        let b = Tuple::new(names, values, conversion()).unwrap();
        prop_assert_ne!(a.id(), b.id());
        prop_assert_eq!(&a, &b);
        prop_assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn map_round_trip((names, values) in fields_strategy()) {
        let t = Tuple::new(names, values, conversion()).unwrap();
        let back = Tuple::from_map(t.to_map(), conversion()).unwrap();
        prop_assert_eq!(back, t);
    }

    #[test]
    fn projecting_every_field_round_trips((names, values) in fields_strategy()) {
        prop_assume!(!names.is_empty());
        let t = Tuple::new(names.clone(), values, conversion()).unwrap();
        let selected = t.select(&format!("{{{}}}", names.join(", "))).unwrap();
        prop_assert_eq!(selected, t);
    }
}
