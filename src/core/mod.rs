//! 核心编排层：错误、运行状态、Planner、排序、反思、主控循环与构建器

pub mod builder;
pub mod error;
pub mod events;
pub mod orchestrator;
pub mod planner;
pub mod ranker;
pub mod reflection;
pub mod state;

pub use builder::{create_llm_from_config, MatchBuilder};
pub use error::MatchError;
pub use events::MatchEvent;
pub use orchestrator::{MatchOrchestrator, MatchRun, MatchSettings};
pub use planner::{derive_phase, next_action, Phase, MAX_ITERATIONS};
pub use ranker::rank_candidates;
pub use reflection::{reflect, ReflectionOutcome, DEFAULT_THRESHOLD};
pub use state::{Action, CandidateProfile, RunState};
