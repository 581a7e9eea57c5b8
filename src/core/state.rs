//! 运行状态：单次匹配运行独占的 RunState
//!
//! RunState 在运行开始时创建（集合为空、标志为 false），以 `&mut` 独占方式穿过每个阶段，
//! Planner 选出 Finish 后被消费为最终结果。跨运行的状态只存在于反馈台账中。

use serde::{Deserialize, Serialize};

use crate::matching::ScoredCandidate;

/// 检索得到的候选人：(candidateId, profileText)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub id: String,
    pub text: String,
}

impl CandidateProfile {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// 阶段标识：Planner 每轮选出其中之一
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Retrieve,
    Score,
    Rank,
    Reflect,
    Finish,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Retrieve => "retrieve",
            Action::Score => "score",
            Action::Rank => "rank",
            Action::Reflect => "reflect",
            Action::Finish => "finish",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单次运行的完整状态
#[derive(Debug, Clone)]
pub struct RunState {
    /// 运行目标（原样携带）
    pub goal: String,
    pub requirement_text: String,
    /// 最近一次检索的结果，按相关度排序
    pub candidates: Vec<CandidateProfile>,
    /// 与 candidates 按 id 一一对应；重新检索时清空
    pub scored_candidates: Vec<ScoredCandidate>,
    /// 当前检索轮次内检索是否已执行
    pub retrieved: bool,
    /// 当前检索轮次内评分是否已执行
    pub scored: bool,
    /// 自上次评分后是否已排序
    pub rank_complete: bool,
    /// 重试决策是否已做出（整次运行最多翻转一次）
    pub reflection_done: bool,
    /// 每执行一个阶段加一，只增不减
    pub iteration: u32,
    /// 最近一次 Planner 选出的动作
    pub next_action: Option<Action>,
}

impl RunState {
    pub fn new(goal: impl Into<String>, requirement_text: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            requirement_text: requirement_text.into(),
            candidates: Vec::new(),
            scored_candidates: Vec::new(),
            retrieved: false,
            scored: false,
            rank_complete: false,
            reflection_done: false,
            iteration: 0,
            next_action: None,
        }
    }

    /// 检索结果替换 candidates，并开启新的检索轮次：旧评分一律作废
    pub fn begin_epoch(&mut self, candidates: Vec<CandidateProfile>) {
        self.candidates = candidates;
        self.scored_candidates.clear();
        self.retrieved = true;
        self.scored = false;
        self.rank_complete = false;
    }

    /// 写入评分结果（与 candidates 同序）
    pub fn record_scores(&mut self, scored: Vec<ScoredCandidate>) {
        self.scored_candidates = scored;
        self.scored = true;
        self.rank_complete = false;
    }

    /// 反思决定重试：重置轮次标志，使下一轮 Planner 选出 Retrieve
    pub fn reset_epoch_for_retry(&mut self) {
        self.scored_candidates.clear();
        self.retrieved = false;
        self.scored = false;
        self.rank_complete = false;
    }

    pub fn advance(&mut self) {
        self.iteration = self.iteration.saturating_add(1);
    }

    /// 排序后首位的调整分
    pub fn top_score(&self) -> Option<f64> {
        self.scored_candidates
            .first()
            .map(|c| c.assessment.adjusted_score)
    }

    /// 消费状态，取出当前排序结果
    pub fn into_results(self) -> Vec<ScoredCandidate> {
        self.scored_candidates
    }
}
