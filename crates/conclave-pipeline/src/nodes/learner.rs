//! Learner node (§4.13): asks the LLM what patterns this design's history
//! suggests for future runs. Never fails the pipeline — an LLM error or an
//! unparseable reply just leaves `learner_data` null and moves on.

use crate::state::{self, FIELD_EVENTS, FIELD_LEARNER_DATA};
use async_trait::async_trait;
use conclave_collab::{LlmAdapter, Message};
use conclave_core::NodeExecutor;
use serde_json::{json, Value};
use std::sync::Arc;

pub struct LearnerNode {
    pub llm: Arc<dyn LlmAdapter>,
}

#[async_trait]
impl NodeExecutor for LearnerNode {
    async fn execute(&self, state: &Value) -> anyhow::Result<Value> {
        let design = state::read_design(state);

        let system = "Summarize, in one short JSON object, what made this design succeed so future \
                       rounds can reuse the pattern. Use keys `pattern` and `notes`.";
        let prompt = format!(
            "Prompt: {}\nRounds run: {}\nFinal code length: {}",
            design.prompt,
            design.rounds.len(),
            design.final_code.as_deref().unwrap_or_default().len()
        );

        let mut events = vec![json!({"tag": "learning:running", "data": {}})];

        let learner_data = match self.llm.complete(system, &[Message::user(prompt)]).await {
            Ok(response) => {
                events.push(json!({"tag": "learning:completed", "data": {}}));
                crate::parsing::extract_json_object(&response.content).unwrap_or_else(|| json!({"raw": response.content}))
            }
            Err(e) => {
                tracing::warn!(design_id = %design.id, error = %e, "learner call failed, continuing without learner_data");
                events.push(json!({"tag": "learning:failed", "data": {}}));
                Value::Null
            }
        };

        Ok(json!({
            FIELD_LEARNER_DATA: learner_data,
            FIELD_EVENTS: events,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::model::DesignRecord;
    use conclave_collab::MockLlmAdapter;

    #[tokio::test]
    async fn captures_the_parsed_reply() {
        let node = LearnerNode { llm: Arc::new(MockLlmAdapter::new([r#"{"pattern": "thin-wall hollow box", "notes": "works well"}"#])) };
        let design = DesignRecord::new("a bracket");
        let config = PipelineConfig::minimal_for_test(vec!["worker-a"]);
        let state = state::initial_state(design, &config);
        let delta = node.execute(&state).await.unwrap();
        assert_eq!(delta[FIELD_LEARNER_DATA]["pattern"], json!("thin-wall hollow box"));
        let tags: Vec<&str> = delta[FIELD_EVENTS].as_array().unwrap().iter().map(|e| e["tag"].as_str().unwrap()).collect();
        assert_eq!(tags, vec!["learning:running", "learning:completed"]);
    }

    #[tokio::test]
    async fn llm_failure_is_non_fatal() {
        let node = LearnerNode { llm: Arc::new(MockLlmAdapter::unavailable()) };
        let design = DesignRecord::new("a bracket");
        let config = PipelineConfig::minimal_for_test(vec!["worker-a"]);
        let state = state::initial_state(design, &config);
        let delta = node.execute(&state).await.unwrap();
        assert!(delta[FIELD_LEARNER_DATA].is_null());
        let tags: Vec<&str> = delta[FIELD_EVENTS].as_array().unwrap().iter().map(|e| e["tag"].as_str().unwrap()).collect();
        assert_eq!(tags, vec!["learning:running", "learning:failed"]);
    }
}
