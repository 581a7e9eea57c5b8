//! 排序：按调整分降序的稳定排序
//!
//! 同分候选人保持评分阶段（即检索相关度）的相对顺序。

use crate::matching::ScoredCandidate;

/// 原地按 adjusted_score 降序排序；`sort_by` 为稳定排序
pub fn rank_candidates(scored: &mut [ScoredCandidate]) {
    scored.sort_by(|a, b| {
        b.assessment
            .adjusted_score
            .total_cmp(&a.assessment.adjusted_score)
    });
}
