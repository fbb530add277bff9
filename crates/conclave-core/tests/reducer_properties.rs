//! Property tests: reducers must be order-independent, since a fan-out
//! superstep's results are merged in whatever order the node tasks finish.

use conclave_core::state::{AppendReducer, Reducer, SumReducer};
use proptest::prelude::*;
use serde_json::{json, Value};

fn apply_in_order(reducer: &dyn Reducer, updates: &[Value]) -> Value {
    let mut current = Value::Null;
    for update in updates {
        current = reducer.reduce(&current, update).unwrap();
    }
    current
}

proptest! {
    #[test]
    fn append_reducer_is_shuffle_invariant(mut items in prop::collection::vec(0i64..1000, 1..20)) {
        let updates: Vec<Value> = items.iter().map(|n| json!(n)).collect();
        let forward = apply_in_order(&AppendReducer, &updates);

        items.reverse();
        let reversed_updates: Vec<Value> = items.iter().map(|n| json!(n)).collect();
        let backward = apply_in_order(&AppendReducer, &reversed_updates);

        let mut forward_sorted: Vec<i64> = forward.as_array().unwrap().iter().map(|v| v.as_i64().unwrap()).collect();
        let mut backward_sorted: Vec<i64> = backward.as_array().unwrap().iter().map(|v| v.as_i64().unwrap()).collect();
        forward_sorted.sort();
        backward_sorted.sort();
        prop_assert_eq!(forward_sorted, backward_sorted);
    }

    #[test]
    fn sum_reducer_is_order_invariant(values in prop::collection::vec(-1000i64..1000, 1..20)) {
        let updates: Vec<Value> = values.iter().map(|n| json!(n)).collect();
        let forward_total = apply_in_order(&SumReducer, &updates).as_i64().unwrap();

        let mut reversed = values.clone();
        reversed.reverse();
        let reversed_updates: Vec<Value> = reversed.iter().map(|n| json!(n)).collect();
        let backward_total = apply_in_order(&SumReducer, &reversed_updates).as_i64().unwrap();

        prop_assert_eq!(forward_total, backward_total);
        prop_assert_eq!(forward_total, values.iter().sum::<i64>());
    }
}
