//! Typed-by-convention state with per-field reducers.
//!
//! Graph state is a `serde_json::Map` rather than a Rust struct: nodes read
//! and write named fields, and a [`StateSchema`] says how concurrent writes
//! to the same field during one superstep combine. This is what lets the
//! executor fan a superstep's node outputs back into a single state without
//! the graph definition caring what shape any individual field has.

use crate::error::{GraphError, Result};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

/// Combines a field's current value with a new update from a node.
///
/// Implementations must be associative and, ideally, commutative: the
/// executor applies a superstep's updates to a field in the order node
/// outputs arrive, which is not guaranteed to be deterministic across runs.
pub trait Reducer: Send + Sync + fmt::Debug {
    fn reduce(&self, current: &Value, update: &Value) -> Result<Value>;

    fn name(&self) -> &str;
}

/// Replaces the field outright. The default for fields with no reducer
/// configured, and the right choice for anything that represents "the
/// current value" rather than "things accumulated so far".
#[derive(Debug, Default)]
pub struct OverwriteReducer;

impl Reducer for OverwriteReducer {
    fn reduce(&self, _current: &Value, update: &Value) -> Result<Value> {
        Ok(update.clone())
    }

    fn name(&self) -> &str {
        "overwrite"
    }
}

/// Concatenates arrays. `update` may itself be an array (appends all
/// elements) or a scalar (appends the one element). Used for fields like
/// `proposals` and `critiques` where every fan-out worker contributes
/// independently to a running collection.
#[derive(Debug, Default)]
pub struct AppendReducer;

impl Reducer for AppendReducer {
    fn reduce(&self, current: &Value, update: &Value) -> Result<Value> {
        let mut items = match current {
            Value::Null => Vec::new(),
            Value::Array(items) => items.clone(),
            other => return Err(GraphError::state("append", format!("expected array, got {other}"))),
        };
        match update {
            Value::Array(new_items) => items.extend(new_items.iter().cloned()),
            other => items.push(other.clone()),
        }
        Ok(Value::Array(items))
    }

    fn name(&self) -> &str {
        "append"
    }
}

/// Shallow-merges JSON objects, with `update`'s keys winning on conflict.
/// Used for fields like `metadata` that different nodes contribute
/// independent keys to.
#[derive(Debug, Default)]
pub struct MergeReducer;

impl Reducer for MergeReducer {
    fn reduce(&self, current: &Value, update: &Value) -> Result<Value> {
        let mut merged = match current {
            Value::Null => Map::new(),
            Value::Object(map) => map.clone(),
            other => return Err(GraphError::state("merge", format!("expected object, got {other}"))),
        };
        match update {
            Value::Object(update_map) => {
                for (k, v) in update_map {
                    merged.insert(k.clone(), v.clone());
                }
            }
            other => return Err(GraphError::state("merge", format!("expected object, got {other}"))),
        }
        Ok(Value::Object(merged))
    }

    fn name(&self) -> &str {
        "merge"
    }
}

/// Numeric accumulator. Used for counters like `total_cost_usd` that every
/// worker in a fan-out increments independently.
#[derive(Debug, Default)]
pub struct SumReducer;

impl Reducer for SumReducer {
    fn reduce(&self, current: &Value, update: &Value) -> Result<Value> {
        let current = current.as_f64().unwrap_or(0.0);
        let update = update
            .as_f64()
            .ok_or_else(|| GraphError::state("sum", format!("expected number, got {update}")))?;
        let total = current + update;
        if total.fract() == 0.0 && current.fract() == 0.0 && update.fract() == 0.0 {
            Ok(Value::from(total as i64))
        } else {
            Ok(Value::from(total))
        }
    }

    fn name(&self) -> &str {
        "sum"
    }
}

/// Maps field names to the reducer that governs concurrent writes to them.
pub struct StateSchema {
    fields: HashMap<String, Box<dyn Reducer>>,
    default_reducer: Box<dyn Reducer>,
}

impl fmt::Debug for StateSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateSchema")
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .field("default_reducer", &self.default_reducer.name())
            .finish()
    }
}

impl Default for StateSchema {
    fn default() -> Self {
        Self {
            fields: HashMap::new(),
            default_reducer: Box::new(OverwriteReducer),
        }
    }
}

impl StateSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_reducer(mut self, reducer: impl Reducer + 'static) -> Self {
        self.default_reducer = Box::new(reducer);
        self
    }

    pub fn add_field(mut self, name: impl Into<String>, reducer: impl Reducer + 'static) -> Self {
        self.fields.insert(name.into(), Box::new(reducer));
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    fn reducer_for(&self, field: &str) -> &dyn Reducer {
        self.fields
            .get(field)
            .map(|b| b.as_ref())
            .unwrap_or(self.default_reducer.as_ref())
    }

    /// Applies a node's proposed update object onto `state`, field by field,
    /// using each field's configured reducer. Fields absent from `update`
    /// are left untouched.
    pub fn apply(&self, state: &Value, update: &Value) -> Result<Value> {
        let current_map = match state {
            Value::Null => Map::new(),
            Value::Object(map) => map.clone(),
            other => return Err(GraphError::state("state", format!("state must be an object, got {other}"))),
        };
        let update_map = match update {
            Value::Object(map) => map,
            other => return Err(GraphError::state("state", format!("update must be an object, got {other}"))),
        };

        let mut next = current_map;
        for (field, field_update) in update_map {
            let current_value = next.get(field).cloned().unwrap_or(Value::Null);
            let reduced = self.reducer_for(field).reduce(&current_value, field_update)?;
            next.insert(field.clone(), reduced);
        }
        Ok(Value::Object(next))
    }

    /// Checks that every required field is present in `state`, bailing with
    /// a [`GraphError::State`] naming the first one missing.
    pub fn validate(&self, state: &Value, required: &[&str]) -> Result<()> {
        let map = match state {
            Value::Object(map) => map,
            other => return Err(GraphError::state("state", format!("state must be an object, got {other}"))),
        };
        for field in required {
            if !map.contains_key(*field) {
                return Err(GraphError::state(*field, "required field missing from state"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn overwrite_replaces() {
        let r = OverwriteReducer;
        assert_eq!(r.reduce(&json!("old"), &json!("new")).unwrap(), json!("new"));
    }

    #[test]
    fn append_concatenates_arrays_and_scalars() {
        let r = AppendReducer;
        let current = json!(["a"]);
        assert_eq!(r.reduce(&current, &json!(["b", "c"])).unwrap(), json!(["a", "b", "c"]));
        assert_eq!(r.reduce(&current, &json!("b")).unwrap(), json!(["a", "b"]));
        assert_eq!(r.reduce(&Value::Null, &json!("a")).unwrap(), json!(["a"]));
    }

    #[test]
    fn merge_lets_update_win_on_conflict() {
        let r = MergeReducer;
        let current = json!({"a": 1, "b": 2});
        let update = json!({"b": 20, "c": 3});
        assert_eq!(r.reduce(&current, &update).unwrap(), json!({"a": 1, "b": 20, "c": 3}));
    }

    #[test]
    fn sum_accumulates() {
        let r = SumReducer;
        assert_eq!(r.reduce(&json!(1), &json!(2)).unwrap(), json!(3));
        assert_eq!(r.reduce(&json!(1.5), &json!(2.5)).unwrap(), json!(4.0));
        assert_eq!(r.reduce(&Value::Null, &json!(5)).unwrap(), json!(5));
    }

    #[test]
    fn schema_applies_per_field_reducers() {
        let schema = StateSchema::new()
            .add_field("proposals", AppendReducer)
            .add_field("total_cost_usd", SumReducer);

        let state = json!({"proposals": ["p1"], "total_cost_usd": 1.0, "status": "running"});
        let update = json!({"proposals": ["p2"], "total_cost_usd": 0.5, "status": "scoring"});

        let next = schema.apply(&state, &update).unwrap();
        assert_eq!(next["proposals"], json!(["p1", "p2"]));
        assert_eq!(next["total_cost_usd"], json!(1.5));
        assert_eq!(next["status"], json!("scoring"));
    }

    #[test]
    fn validate_reports_missing_field() {
        let schema = StateSchema::new();
        let state = json!({"a": 1});
        assert!(schema.validate(&state, &["a"]).is_ok());
        let err = schema.validate(&state, &["b"]).unwrap_err();
        assert!(matches!(err, GraphError::State { .. }));
    }
}
