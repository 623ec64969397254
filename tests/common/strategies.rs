//! Proptest strategies for filter inputs

use proptest::prelude::*;
use serde_json::Value;

pub fn filter_name_strategy() -> impl Strategy<Value = String> {
    "[a-z_]{1,16}"
}

pub fn filter_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<i64>().prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
        "[a-zA-Z0-9 ]{0,24}".prop_map(Value::from),
    ]
}

/// Distinct field names with arbitrary (possibly null) values
pub fn filter_fields_strategy() -> impl Strategy<Value = Vec<(String, Value)>> {
    prop::collection::btree_map(filter_name_strategy(), filter_value_strategy(), 0..8)
        .prop_map(|fields| fields.into_iter().collect())
}

pub fn principal_id_strategy() -> impl Strategy<Value = i64> {
    1i64..100_000
}
