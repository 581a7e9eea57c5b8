//! 反思策略：检查排序首位，决定接受结果还是强制再走一次 检索 -> 评分 -> 排序
//!
//! 规则按顺序求值；reflection_done 整次运行最多从 false 翻到 true 一次，因此最多重试一次。

use crate::core::state::{Action, RunState};

/// 默认接受阈值（调整分）
pub const DEFAULT_THRESHOLD: f64 = 0.7;

/// 反思结论
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReflectionOutcome {
    /// 已达上限，不修改 reflection_done
    IterationCeiling,
    /// 没有可评估的结果
    NoResults,
    /// 首位低于阈值且还有重试机会
    Retry { top_score: f64 },
    /// 达到阈值，或重试已用完
    Accept { top_score: f64 },
}

impl ReflectionOutcome {
    /// 反思发出的动作：Retrieve（重试）或 Finish
    pub fn action(&self) -> Action {
        match self {
            ReflectionOutcome::Retry { .. } => Action::Retrieve,
            _ => Action::Finish,
        }
    }
}

/// 对排序后的状态执行反思，并据结论修改状态
pub fn reflect(state: &mut RunState, threshold: f64, max_iterations: u32) -> ReflectionOutcome {
    if state.iteration >= max_iterations {
        state.next_action = Some(Action::Finish);
        return ReflectionOutcome::IterationCeiling;
    }

    let Some(top_score) = state.top_score() else {
        state.next_action = Some(Action::Finish);
        return ReflectionOutcome::NoResults;
    };

    let outcome = if !state.reflection_done && top_score < threshold {
        state.reflection_done = true;
        state.reset_epoch_for_retry();
        ReflectionOutcome::Retry { top_score }
    } else {
        state.reflection_done = true;
        ReflectionOutcome::Accept { top_score }
    };
    state.next_action = Some(outcome.action());
    state.advance();
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::planner::MAX_ITERATIONS;
    use crate::core::state::CandidateProfile;
    use crate::matching::{Assessment, ScoredCandidate};

    fn ranked_state(top: f64) -> RunState {
        let mut state = RunState::new("goal", "req");
        state.begin_epoch(vec![CandidateProfile::new("E1", "profile")]);
        let mut assessment = Assessment::failed();
        assessment.adjusted_score = top;
        state.record_scores(vec![ScoredCandidate {
            candidate_id: "E1".into(),
            profile_text: "profile".into(),
            assessment,
        }]);
        state.rank_complete = true;
        state.iteration = 3;
        state
    }

    #[test]
    fn test_high_score_finishes() {
        let mut state = ranked_state(0.81);
        let outcome = reflect(&mut state, DEFAULT_THRESHOLD, MAX_ITERATIONS);
        assert_eq!(outcome, ReflectionOutcome::Accept { top_score: 0.81 });
        assert_eq!(outcome.action(), Action::Finish);
        assert!(state.reflection_done);
        assert_eq!(state.iteration, 4);
        assert_eq!(state.scored_candidates.len(), 1);
    }

    #[test]
    fn test_low_score_retries_once() {
        let mut state = ranked_state(0.5);
        let outcome = reflect(&mut state, DEFAULT_THRESHOLD, MAX_ITERATIONS);
        assert_eq!(outcome.action(), Action::Retrieve);
        assert!(state.reflection_done);
        assert!(!state.rank_complete);
        assert!(state.scored_candidates.is_empty());
        assert_eq!(state.next_action, Some(Action::Retrieve));
    }

    #[test]
    fn test_second_low_score_accepts() {
        let mut state = ranked_state(0.2);
        state.reflection_done = true;
        let outcome = reflect(&mut state, DEFAULT_THRESHOLD, MAX_ITERATIONS);
        assert_eq!(outcome, ReflectionOutcome::Accept { top_score: 0.2 });
        assert_eq!(state.scored_candidates.len(), 1);
    }

    #[test]
    fn test_empty_results_finish() {
        let mut state = RunState::new("goal", "req");
        state.begin_epoch(Vec::new());
        state.record_scores(Vec::new());
        state.rank_complete = true;
        let outcome = reflect(&mut state, DEFAULT_THRESHOLD, MAX_ITERATIONS);
        assert_eq!(outcome, ReflectionOutcome::NoResults);
        assert_eq!(outcome.action(), Action::Finish);
    }

    #[test]
    fn test_ceiling_leaves_flag_untouched() {
        let mut state = ranked_state(0.1);
        state.iteration = MAX_ITERATIONS;
        let outcome = reflect(&mut state, DEFAULT_THRESHOLD, MAX_ITERATIONS);
        assert_eq!(outcome, ReflectionOutcome::IterationCeiling);
        assert!(!state.reflection_done);
        assert_eq!(state.iteration, MAX_ITERATIONS);
    }
}
