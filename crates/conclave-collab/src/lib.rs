//! Port traits for everything the pipeline delegates to outside the
//! process: LLM providers, build sandboxes, mesh/FEA analyzers, and the
//! design vault. Every trait here has a mock or null implementation
//! suitable for tests and offline demos — wiring in real collaborators is
//! left to the CLI binary or a future integration crate.

pub mod analyzer;
pub mod error;
pub mod llm;
pub mod sandbox;
pub mod vault;

pub use analyzer::{Analyzer, AnalyzerReport, MockAnalyzer, RiskLevel};
pub use error::{CollabError, Result};
pub use llm::{
    LlmAdapter, LlmResponse, Message, MockLlmAdapter, MockToolCallingLlmAdapter, Role, ToolCall,
    ToolCallingLlmAdapter, ToolCallingReply, Usage,
};
pub use sandbox::{MockSandbox, Sandbox, SandboxOutcome};
pub use vault::{NullVaultIndexer, VaultIndexer};
