//! The persisted domain model (spec §3): `DesignRecord` and everything it
//! owns. Every type here derives `Serialize, Deserialize, Clone, Debug` and
//! is tolerant of unknown fields on read so old design files keep loading
//! under newer binaries.

use crate::ids::{DesignId, ProposalId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

fn now() -> chrono::DateTime<chrono::Utc> {
    chrono::Utc::now()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DesignStatus {
    Draft,
    Supervising,
    Proposing,
    Debating,
    Evaluating,
    Judging,
    Merging,
    AwaitingApproval,
    Learning,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Pending,
    Generating,
    Completed,
    Failed,
    Selected,
    Rejected,
}

/// A name→value expectation from the supervisor's structured spec, e.g.
/// `side_length_mm -> 50.0`.
pub type CriticalDimensions = HashMap<String, f64>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Constraints {
    #[serde(default)]
    pub key_constraints: Vec<String>,
    #[serde(default)]
    pub critical_dimensions: CriticalDimensions,
    #[serde(default)]
    pub manufacturing_notes: Vec<String>,
    /// Unknown/forward-compatible keys (§9: carry unknowns in a side
    /// channel rather than dropping them).
    #[serde(default, flatten)]
    pub extras: HashMap<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Evaluation artifact produced by the sandbox/analyzer/renderer
/// collaborators for one proposal (spec §3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SandboxEval {
    pub execution_success: bool,
    #[serde(default)]
    pub execution_error: Option<String>,
    #[serde(default)]
    pub artifact_path: Option<String>,
    #[serde(default)]
    pub image_paths: Vec<String>,
    #[serde(default)]
    pub is_watertight: bool,
    #[serde(default)]
    pub volume_cm3: f64,
    #[serde(default)]
    pub surface_area_cm2: f64,
    #[serde(default)]
    pub bounding_box_cm: (f64, f64, f64),
    #[serde(default)]
    pub center_of_mass_cm: (f64, f64, f64),
    #[serde(default)]
    pub dfm_issues: Vec<String>,
    #[serde(default)]
    pub dfm_report: HashMap<String, Value>,
    #[serde(default)]
    pub risk_level: Option<RiskLevel>,
    #[serde(default)]
    pub risk_score: Option<f64>,
    #[serde(default)]
    pub build_volume_violation: bool,
    /// Deltas vs. the prior round's winner artifact, when one exists.
    #[serde(default)]
    pub geometric_diff: Option<HashMap<String, Value>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Critique {
    pub critic_model: String,
    pub target_proposal_id: ProposalId,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub suggested_fixes: Vec<String>,
    #[serde(default)]
    pub fidelity_concerns: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FidelityScore {
    pub proposal_id: ProposalId,
    pub algorithmic_score: f64,
    pub llm_score: f64,
    pub blended_score: f64,
    pub text_similarity: f64,
    pub geometric_accuracy: f64,
    pub manufacturing_viability: f64,
    pub reasoning: String,
    pub passed: bool,
}

impl FidelityScore {
    pub fn blend(algorithmic_score: f64, llm_score: f64) -> f64 {
        (0.60 * algorithmic_score + 0.40 * llm_score).clamp(0.0, 100.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub model: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub reasoning: String,
    pub status: ProposalStatus,
    #[serde(default)]
    pub critiques_received: Vec<Critique>,
    #[serde(default)]
    pub sandbox_eval: Option<SandboxEval>,
    #[serde(default)]
    pub fidelity: Option<FidelityScore>,
    #[serde(default = "now")]
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Proposal {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            id: ProposalId::new(),
            model: model.into(),
            code: String::new(),
            reasoning: String::new(),
            status: ProposalStatus::Pending,
            critiques_received: Vec::new(),
            sandbox_eval: None,
            fidelity: None,
            created_at: now(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.status == ProposalStatus::Completed && !self.code.is_empty()
    }
}

/// One summary entry in `version_history`, appended by the merger (§4.10).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionSummary {
    pub round: u32,
    pub proposal_count: usize,
    pub passing_count: usize,
    pub winner_id: Option<ProposalId>,
    pub scores: Vec<(ProposalId, String, f64)>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Round {
    pub round_number: u32,
    #[serde(default)]
    pub proposals: Vec<Proposal>,
    #[serde(default)]
    pub winner_id: Option<ProposalId>,
    #[serde(default)]
    pub merged_code: Option<String>,
    #[serde(default)]
    pub human_approved: Option<bool>,
}

/// One entry in `score_history`: a per-round snapshot of every attached
/// fidelity score, independent of `version_history`'s merger-facing
/// summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreSnapshot {
    pub round: u32,
    pub scores: Vec<FidelityScore>,
}

/// One tagged domain event (spec §6's event table). Appended into
/// `DesignRecord`-adjacent state under the `events` field via
/// [`conclave_core::AppendReducer`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineEvent {
    pub tag: String,
    #[serde(default)]
    pub data: Value,
}

impl PipelineEvent {
    pub fn new(tag: impl Into<String>, data: Value) -> Self {
        Self { tag: tag.into(), data }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesignRecord {
    pub id: DesignId,
    pub prompt: String,
    #[serde(default)]
    pub specification: String,
    #[serde(default)]
    pub constraints: Constraints,
    pub status: DesignStatus,
    #[serde(default)]
    pub rounds: Vec<Round>,
    #[serde(default)]
    pub final_code: Option<String>,
    #[serde(default)]
    pub final_artifact_path: Option<String>,
    #[serde(default)]
    pub version_history: Vec<VersionSummary>,
    #[serde(default)]
    pub score_history: Vec<ScoreSnapshot>,
    #[serde(default = "now")]
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(default = "now")]
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl DesignRecord {
    pub fn new(prompt: impl Into<String>) -> Self {
        let ts = now();
        Self {
            id: DesignId::new(),
            prompt: prompt.into(),
            specification: String::new(),
            constraints: Constraints::default(),
            status: DesignStatus::Draft,
            rounds: Vec::new(),
            final_code: None,
            final_artifact_path: None,
            version_history: Vec::new(),
            score_history: Vec::new(),
            created_at: ts,
            updated_at: ts,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = now();
    }
}
