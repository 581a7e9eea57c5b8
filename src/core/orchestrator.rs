//! 匹配编排器：主控循环
//!
//! Planner 每轮从 RunState 选出下一步 -> 执行该阶段 -> 回到 Planner，直到 Finish。
//! 唯一的回边是 Reflect -> Retrieve，整次运行最多一次；迭代上限保证一定终止。
//! 检索服务、评估服务和反馈台账都通过构造参数注入，没有全局单例。

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::Instrument;

use crate::config::MatchingSection;
use crate::core::events::MatchEvent;
use crate::core::planner::{self, MAX_ITERATIONS};
use crate::core::ranker::rank_candidates;
use crate::core::reflection::{reflect, ReflectionOutcome, DEFAULT_THRESHOLD};
use crate::core::state::{Action, RunState};
use crate::core::MatchError;
use crate::matching::{MatchScorer, ScoredCandidate};
use crate::retrieval::CandidateRetriever;

/// 主循环参数
#[derive(Debug, Clone, PartialEq)]
pub struct MatchSettings {
    pub goal: String,
    pub max_iterations: u32,
    pub threshold: f64,
    pub top_k: usize,
    /// 反思重试时的检索宽度
    pub retry_top_k: usize,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            goal: "Find best candidates".to_string(),
            max_iterations: MAX_ITERATIONS,
            threshold: DEFAULT_THRESHOLD,
            top_k: 5,
            retry_top_k: 3,
        }
    }
}

impl From<&MatchingSection> for MatchSettings {
    fn from(section: &MatchingSection) -> Self {
        Self {
            goal: section.goal.clone(),
            max_iterations: section.max_iterations,
            threshold: section.threshold,
            top_k: section.top_k,
            retry_top_k: section.retry_top_k,
        }
    }
}

/// 一次运行的结果与轨迹
#[derive(Debug, Clone)]
pub struct MatchRun {
    pub run_id: String,
    /// 排序后的候选人（达到迭代上限时可能未排序或为空）
    pub results: Vec<ScoredCandidate>,
    /// 实际执行的阶段数
    pub iterations: u32,
    /// 是否触发过反思重试
    pub retried: bool,
    /// 按执行顺序记录的阶段
    pub stages: Vec<Action>,
}

/// 匹配编排器：持有检索服务与评分器，可被多个运行并发共享（每个运行独占自己的 RunState）
pub struct MatchOrchestrator {
    retriever: Arc<dyn CandidateRetriever>,
    scorer: MatchScorer,
    settings: MatchSettings,
    event_tx: Option<mpsc::UnboundedSender<MatchEvent>>,
}

impl MatchOrchestrator {
    pub fn new(
        retriever: Arc<dyn CandidateRetriever>,
        scorer: MatchScorer,
        settings: MatchSettings,
    ) -> Self {
        Self {
            retriever,
            scorer,
            settings,
            event_tx: None,
        }
    }

    /// 设置事件推送通道
    pub fn with_events(mut self, tx: mpsc::UnboundedSender<MatchEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    fn send_event(&self, ev: MatchEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(ev);
        }
    }

    /// 对外唯一入口：返回排序后的候选人，或运行失败
    pub async fn run_matching(
        &self,
        requirement_text: &str,
    ) -> Result<Vec<ScoredCandidate>, MatchError> {
        Ok(self.run(requirement_text).await?.results)
    }

    /// 执行一次完整运行，附带轨迹
    pub async fn run(&self, requirement_text: &str) -> Result<MatchRun, MatchError> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let span = tracing::info_span!("match_run", run_id = %run_id);
        async move {
            let mut state = RunState::new(self.settings.goal.clone(), requirement_text);
            let (stages, retried) = self.drive(&mut state).await?;

            let iterations = state.iteration;
            let results = state.into_results();
            tracing::info!(iterations, results = results.len(), retried, "match run finished");
            self.send_event(MatchEvent::Finished {
                iteration: iterations,
                results: results.len(),
            });

            Ok(MatchRun {
                run_id,
                results,
                iterations,
                retried,
                stages,
            })
        }
        .instrument(span)
        .await
    }

    /// 主循环；返回 (执行过的阶段, 是否重试过)
    async fn drive(&self, state: &mut RunState) -> Result<(Vec<Action>, bool), MatchError> {
        let max_iterations = self.settings.max_iterations;
        let mut stages = Vec::new();
        let mut retried = false;

        loop {
            let action = planner::next_action(state, max_iterations);
            state.next_action = Some(action);
            tracing::debug!(iteration = state.iteration, %action, "planner decided");
            self.send_event(MatchEvent::Planned {
                iteration: state.iteration,
                action,
            });

            if action != Action::Finish {
                stages.push(action);
            }

            match action {
                Action::Retrieve => self.retrieve_stage(state).await?,
                Action::Score => self.score_stage(state).await?,
                Action::Rank => self.rank_stage(state),
                Action::Reflect => {
                    let outcome = self.reflect_stage(state);
                    if matches!(outcome, ReflectionOutcome::Retry { .. }) {
                        retried = true;
                    }
                    if outcome.action() == Action::Finish {
                        break;
                    }
                }
                Action::Finish => {
                    if state.iteration >= max_iterations {
                        tracing::warn!(max_iterations, "iteration ceiling reached, returning current ranking");
                    }
                    break;
                }
            }
        }
        Ok((stages, retried))
    }

    /// 检索：替换 candidates、清空旧评分；重试轮次用 retry_top_k
    async fn retrieve_stage(&self, state: &mut RunState) -> Result<(), MatchError> {
        let top_k = if state.reflection_done {
            self.settings.retry_top_k
        } else {
            self.settings.top_k
        };
        let candidates = self
            .retriever
            .search(&state.requirement_text, top_k)
            .await?;
        tracing::info!(count = candidates.len(), top_k, "candidates retrieved");
        self.send_event(MatchEvent::Retrieved {
            count: candidates.len(),
            top_k,
        });

        state.begin_epoch(candidates);
        state.advance();
        Ok(())
    }

    async fn score_stage(&self, state: &mut RunState) -> Result<(), MatchError> {
        let report = self
            .scorer
            .score_all(&state.requirement_text, &state.candidates)
            .await?;
        tracing::info!(
            count = report.scored.len(),
            fallbacks = report.fallbacks,
            "candidates scored"
        );
        self.send_event(MatchEvent::Scored {
            count: report.scored.len(),
            fallbacks: report.fallbacks,
        });

        state.record_scores(report.scored);
        state.advance();
        Ok(())
    }

    fn rank_stage(&self, state: &mut RunState) {
        rank_candidates(&mut state.scored_candidates);
        state.rank_complete = true;
        state.advance();

        let top_score = state.top_score();
        tracing::info!(?top_score, "candidates ranked");
        self.send_event(MatchEvent::Ranked { top_score });
    }

    fn reflect_stage(&self, state: &mut RunState) -> ReflectionOutcome {
        let top_score = state.top_score();
        let outcome = reflect(state, self.settings.threshold, self.settings.max_iterations);
        let retry = matches!(outcome, ReflectionOutcome::Retry { .. });
        tracing::info!(?top_score, threshold = self.settings.threshold, retry, "reflection decided");
        self.send_event(MatchEvent::Reflected { top_score, retry });
        outcome
    }
}
