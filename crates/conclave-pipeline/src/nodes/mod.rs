//! One module per pipeline node family, in control-flow order. Graph wiring
//! (which node follows which, and how fan-out `Send` lists are built) lives
//! in [`crate::graph_def`] — these modules only implement `NodeExecutor`.

pub mod approval;
pub mod collect;
pub mod debate;
pub mod fidelity;
pub mod finalize;
pub mod learner;
pub mod merge;
pub mod round;
pub mod sandbox;
pub mod supervisor;
pub mod vault;

pub use approval::HumanApprovalNode;
pub use collect::CollectProposalsNode;
pub use debate::{CollectCritiquesNode, CritiqueWorkerNode};
pub use fidelity::{CollectFidelityNode, FidelityWorkerNode};
pub use finalize::{FinalizeFailedNode, FinalizeSuccessNode};
pub use learner::LearnerNode;
pub use merge::MergerNode;
pub use round::PrepareRoundNode;
pub use sandbox::SandboxEvaluatorNode;
pub use supervisor::SupervisorNode;
pub use vault::VaultIndexNode;

pub mod proposal;
pub use proposal::ProposalWorkerNode;
