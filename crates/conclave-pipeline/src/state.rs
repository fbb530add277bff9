//! Wires the domain model onto [`conclave_core::StateSchema`] and provides
//! the read/patch helpers nodes use instead of hand-rolling JSON pointer
//! paths everywhere.
//!
//! State layout (spec §4.1):
//! - Overwrite fields: `design` (the `DesignRecord`), `current_round`,
//!   `winner_code`, `winner_id`, `winner_model`, `previous_artifact_path`,
//!   `learner_data`, `terminal_reason`, plus internal bookkeeping counters
//!   tracking how much of each append field has been drained into `design`.
//! - Append fields: `events`, `critiques`, `version_history`,
//!   `score_history`, `proposal_results`, `fidelity_results`,
//!   `accumulated_feedback`.
//! - Transient: Send overlays (`worker_model`, `worker_target`) — set only
//!   in a fan-out message's argument, never merged into the shared state.

use crate::config::PipelineConfig;
use crate::model::{DesignRecord, FidelityScore, PipelineEvent, Proposal};
use conclave_core::{AppendReducer, OverwriteReducer, StateSchema};
use serde_json::{json, Value};

pub const FIELD_DESIGN: &str = "design";
pub const FIELD_CURRENT_ROUND: &str = "current_round";
pub const FIELD_WINNER_CODE: &str = "winner_code";
pub const FIELD_WINNER_ID: &str = "winner_id";
pub const FIELD_WINNER_MODEL: &str = "winner_model";
pub const FIELD_PREVIOUS_ARTIFACT_PATH: &str = "previous_artifact_path";
pub const FIELD_LEARNER_DATA: &str = "learner_data";
pub const FIELD_TERMINAL_REASON: &str = "terminal_reason";
pub const FIELD_CONFIG: &str = "config";

pub const FIELD_EVENTS: &str = "events";
pub const FIELD_CRITIQUES: &str = "critiques";
pub const FIELD_VERSION_HISTORY: &str = "version_history";
pub const FIELD_SCORE_HISTORY: &str = "score_history";
pub const FIELD_PROPOSAL_RESULTS: &str = "proposal_results";
pub const FIELD_FIDELITY_RESULTS: &str = "fidelity_results";
pub const FIELD_ACCUMULATED_FEEDBACK: &str = "accumulated_feedback";

pub const FIELD_PROPOSALS_CONSUMED: &str = "proposals_consumed";
pub const FIELD_CRITIQUES_CONSUMED: &str = "critiques_consumed";
pub const FIELD_FIDELITY_CONSUMED: &str = "fidelity_consumed";

pub fn schema() -> StateSchema {
    StateSchema::new()
        .with_default_reducer(OverwriteReducer)
        .add_field(FIELD_EVENTS, AppendReducer)
        .add_field(FIELD_CRITIQUES, AppendReducer)
        .add_field(FIELD_VERSION_HISTORY, AppendReducer)
        .add_field(FIELD_SCORE_HISTORY, AppendReducer)
        .add_field(FIELD_PROPOSAL_RESULTS, AppendReducer)
        .add_field(FIELD_FIDELITY_RESULTS, AppendReducer)
        .add_field(FIELD_ACCUMULATED_FEEDBACK, AppendReducer)
}

pub fn initial_state(design: DesignRecord, config: &PipelineConfig) -> Value {
    json!({
        FIELD_DESIGN: design,
        FIELD_CURRENT_ROUND: 0,
        FIELD_CONFIG: config,
        FIELD_WINNER_CODE: Value::Null,
        FIELD_WINNER_ID: Value::Null,
        FIELD_WINNER_MODEL: Value::Null,
        FIELD_PREVIOUS_ARTIFACT_PATH: Value::Null,
        FIELD_LEARNER_DATA: Value::Null,
        FIELD_TERMINAL_REASON: Value::Null,
        FIELD_EVENTS: [],
        FIELD_CRITIQUES: [],
        FIELD_VERSION_HISTORY: [],
        FIELD_SCORE_HISTORY: [],
        FIELD_PROPOSAL_RESULTS: [],
        FIELD_FIDELITY_RESULTS: [],
        FIELD_ACCUMULATED_FEEDBACK: [],
        FIELD_PROPOSALS_CONSUMED: 0,
        FIELD_CRITIQUES_CONSUMED: 0,
        FIELD_FIDELITY_CONSUMED: 0,
    })
}

pub fn read_design(state: &Value) -> DesignRecord {
    serde_json::from_value(state[FIELD_DESIGN].clone()).expect("state.design is always a valid DesignRecord")
}

pub fn read_config(state: &Value) -> PipelineConfig {
    serde_json::from_value(state[FIELD_CONFIG].clone()).expect("state.config is always a valid PipelineConfig")
}

pub fn read_current_round(state: &Value) -> u32 {
    state[FIELD_CURRENT_ROUND].as_u64().unwrap_or(0) as u32
}

pub fn read_usize_field(state: &Value, field: &str) -> usize {
    state[field].as_u64().unwrap_or(0) as usize
}

pub fn read_proposal_results(state: &Value) -> Vec<Proposal> {
    serde_json::from_value(state[FIELD_PROPOSAL_RESULTS].clone()).unwrap_or_default()
}

pub fn read_critiques(state: &Value) -> Vec<crate::model::Critique> {
    serde_json::from_value(state[FIELD_CRITIQUES].clone()).unwrap_or_default()
}

pub fn read_fidelity_results(state: &Value) -> Vec<FidelityScore> {
    serde_json::from_value(state[FIELD_FIDELITY_RESULTS].clone()).unwrap_or_default()
}

pub fn read_accumulated_feedback(state: &Value) -> Vec<String> {
    serde_json::from_value(state[FIELD_ACCUMULATED_FEEDBACK].clone()).unwrap_or_default()
}

pub fn read_winner_code(state: &Value) -> Option<String> {
    state[FIELD_WINNER_CODE].as_str().map(str::to_string)
}

pub fn read_events(state: &Value) -> Vec<PipelineEvent> {
    serde_json::from_value(state[FIELD_EVENTS].clone()).unwrap_or_default()
}

/// Builds a one-field delta setting `design` (plus bumping `updated_at`).
pub fn design_delta(mut design: DesignRecord) -> Value {
    design.touch();
    json!({ FIELD_DESIGN: design })
}

pub fn event(tag: &str, data: Value) -> Value {
    serde_json::to_value(vec![PipelineEvent::new(tag, data)]).expect("PipelineEvent always serializes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DesignStatus;

    #[test]
    fn initial_state_round_trips_the_design_record() {
        let design = DesignRecord::new("a bracket");
        let config = PipelineConfig::minimal_for_test(vec!["worker-a"]);
        let state = initial_state(design.clone(), &config);
        let read_back = read_design(&state);
        assert_eq!(read_back.id, design.id);
        assert_eq!(read_back.status, DesignStatus::Draft);
    }

    #[test]
    fn schema_applies_append_fields_across_a_merge() {
        let design = DesignRecord::new("a bracket");
        let config = PipelineConfig::minimal_for_test(vec!["worker-a"]);
        let state = initial_state(design, &config);
        let schema = schema();

        let update = json!({ FIELD_EVENTS: [{"tag": "round:started", "data": {}}] });
        let next = schema.apply(&state, &update).unwrap();
        assert_eq!(next[FIELD_EVENTS].as_array().unwrap().len(), 1);
    }
}
