//! Planner：确定性的状态转移
//!
//! 每轮从 RunState 推导当前阶段，不做 I/O、不执行阶段，只选出下一步。
//! 迭代上限独立于其他谓词，保证任何路径都会在 max_iterations 内结束。

use crate::core::state::{Action, RunState};

/// 单次运行默认的阶段执行上限
pub const MAX_ITERATIONS: u32 = 8;

/// 由 RunState 推导出的阶段（不单独存储）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NeedRetrieve,
    NeedScore,
    NeedRank,
    NeedReflect,
    Done,
}

impl Phase {
    pub fn action(self) -> Action {
        match self {
            Phase::NeedRetrieve => Action::Retrieve,
            Phase::NeedScore => Action::Score,
            Phase::NeedRank => Action::Rank,
            Phase::NeedReflect => Action::Reflect,
            Phase::Done => Action::Finish,
        }
    }
}

/// 推导当前阶段；各分支互斥且穷尽
///
/// 检索 / 评分用轮次标志而不是集合是否为空来判断，零候选的轮次因此也只走一遍
/// Retrieve -> Score -> Rank，而不是反复重新评分空集合。
pub fn derive_phase(state: &RunState, max_iterations: u32) -> Phase {
    if state.iteration >= max_iterations {
        Phase::Done
    } else if !state.retrieved {
        Phase::NeedRetrieve
    } else if !state.scored {
        Phase::NeedScore
    } else if !state.rank_complete {
        Phase::NeedRank
    } else if !state.reflection_done {
        Phase::NeedReflect
    } else {
        Phase::Done
    }
}

/// 选出下一步动作
pub fn next_action(state: &RunState, max_iterations: u32) -> Action {
    derive_phase(state, max_iterations).action()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::CandidateProfile;

    fn state() -> RunState {
        RunState::new("Find best candidates", "Rust, Docker")
    }

    #[test]
    fn test_fresh_state_needs_retrieve() {
        assert_eq!(next_action(&state(), MAX_ITERATIONS), Action::Retrieve);
    }

    #[test]
    fn test_ceiling_overrides_everything() {
        let mut s = state();
        s.iteration = MAX_ITERATIONS;
        assert_eq!(derive_phase(&s, MAX_ITERATIONS), Phase::Done);
    }

    #[test]
    fn test_phase_progression() {
        let mut s = state();
        s.begin_epoch(vec![CandidateProfile::new("E1", "docker")]);
        assert_eq!(next_action(&s, MAX_ITERATIONS), Action::Score);

        s.record_scores(Vec::new());
        assert_eq!(next_action(&s, MAX_ITERATIONS), Action::Rank);

        s.rank_complete = true;
        assert_eq!(next_action(&s, MAX_ITERATIONS), Action::Reflect);

        s.reflection_done = true;
        assert_eq!(next_action(&s, MAX_ITERATIONS), Action::Finish);
    }

    #[test]
    fn test_empty_retrieval_still_advances() {
        let mut s = state();
        s.begin_epoch(Vec::new());
        assert_eq!(next_action(&s, MAX_ITERATIONS), Action::Score);
        s.record_scores(Vec::new());
        assert_eq!(next_action(&s, MAX_ITERATIONS), Action::Rank);
    }

    #[test]
    fn test_retry_reset_goes_back_to_retrieve() {
        let mut s = state();
        s.begin_epoch(vec![CandidateProfile::new("E1", "docker")]);
        s.record_scores(Vec::new());
        s.rank_complete = true;
        s.reflection_done = true;
        s.reset_epoch_for_retry();
        assert_eq!(next_action(&s, MAX_ITERATIONS), Action::Retrieve);
    }
}
