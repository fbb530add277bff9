//! [`PipelineConfig`]: the single configuration record a run is started
//! with (spec §6). `serde`-deserializable from TOML so `conclave-cli` can
//! load it straight off disk.

use serde::{Deserialize, Serialize};

fn default_fidelity_threshold() -> f64 {
    95.0
}

fn default_max_rounds() -> u32 {
    3
}

const HARD_MAX_ROUNDS: u32 = 10;

fn default_true() -> bool {
    true
}

fn default_llm_timeout_secs() -> u64 {
    120
}

fn default_fanout_deadline_secs() -> u64 {
    600
}

fn default_max_concurrency() -> usize {
    8
}

fn default_tool_loop_turns() -> u32 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalAgent {
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub supervisor_model: String,
    pub judge_model: String,
    pub merger_model: String,
    pub proposal_agents: Vec<ProposalAgent>,

    #[serde(default = "default_fidelity_threshold")]
    pub fidelity_threshold: f64,

    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,

    #[serde(default = "default_true")]
    pub debate_enabled: bool,

    #[serde(default)]
    pub human_approval_required: bool,

    /// Ambient: per-LLM-call timeout (§5, default 120s).
    #[serde(default = "default_llm_timeout_secs")]
    pub llm_timeout_secs: u64,

    /// Ambient: outer deadline for a fan-out stage (§5, default 10 min).
    #[serde(default = "default_fanout_deadline_secs")]
    pub fanout_deadline_secs: u64,

    /// Ambient: worker-pool bound (§2, §5).
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Ambient: proposal worker's tool-loop turn cap (§9, hard cap 10).
    #[serde(default = "default_tool_loop_turns")]
    pub tool_loop_turns: u32,
}

impl PipelineConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        let config: Self = toml::from_str(raw)?;
        Ok(config.clamped())
    }

    fn clamped(mut self) -> Self {
        if self.max_rounds == 0 {
            self.max_rounds = 1;
        }
        if self.max_rounds > HARD_MAX_ROUNDS {
            self.max_rounds = HARD_MAX_ROUNDS;
        }
        if self.tool_loop_turns == 0 {
            self.tool_loop_turns = 1;
        }
        self
    }

    #[cfg(test)]
    pub fn minimal_for_test(proposal_agents: Vec<&str>) -> Self {
        Self {
            supervisor_model: "supervisor".into(),
            judge_model: "judge".into(),
            merger_model: "merger".into(),
            proposal_agents: proposal_agents.into_iter().map(|m| ProposalAgent { model: m.into() }).collect(),
            fidelity_threshold: default_fidelity_threshold(),
            max_rounds: default_max_rounds(),
            debate_enabled: true,
            human_approval_required: false,
            llm_timeout_secs: default_llm_timeout_secs(),
            fanout_deadline_secs: default_fanout_deadline_secs(),
            max_concurrency: default_max_concurrency(),
            tool_loop_turns: default_tool_loop_turns(),
        }
    }
}
