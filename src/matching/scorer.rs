//! 评分阶段：对每个候选人调用评估服务，并乘上历史录用率
//!
//! 评估请求并发发出（上限 concurrency），按候选人原顺序收回，编排层看到的是一次原子、有序的阶段完成。
//! 单个回复无法解析或分数被策略拒绝时记为失败评估，不影响其他候选人；评估服务不可用则整个阶段失败。

use std::sync::Arc;

use futures_util::{stream, StreamExt, TryStreamExt};

use crate::config::ScorePolicy;
use crate::core::{CandidateProfile, MatchError};
use crate::feedback::AcceptanceEstimator;
use crate::matching::assessment::{Assessment, AssessmentOutcome, ScoredCandidate};
use crate::matching::assessor::Assessor;

/// 评分阶段的汇总
#[derive(Debug, Clone, Default)]
pub struct ScoringReport {
    pub scored: Vec<ScoredCandidate>,
    /// 降级为失败评估的候选人数
    pub fallbacks: usize,
}

/// 评分器：评估服务 + 录用率估计 + 分数策略
pub struct MatchScorer {
    assessor: Arc<dyn Assessor>,
    estimator: AcceptanceEstimator,
    policy: ScorePolicy,
    concurrency: usize,
}

impl MatchScorer {
    pub fn new(assessor: Arc<dyn Assessor>, estimator: AcceptanceEstimator) -> Self {
        Self {
            assessor,
            estimator,
            policy: ScorePolicy::default(),
            concurrency: 4,
        }
    }

    pub fn with_policy(mut self, policy: ScorePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// 对全部候选人评分，输出顺序与输入一致
    pub async fn score_all(
        &self,
        requirement_text: &str,
        candidates: &[CandidateProfile],
    ) -> Result<ScoringReport, MatchError> {
        let rates = self.acceptance_rates(candidates).await;
        let results: Vec<(ScoredCandidate, bool)> = stream::iter(candidates.iter().zip(rates))
            .map(|(candidate, acceptance)| self.score_one(requirement_text, candidate, acceptance))
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        let fallbacks = results.iter().filter(|(_, fell_back)| *fell_back).count();
        Ok(ScoringReport {
            scored: results.into_iter().map(|(s, _)| s).collect(),
            fallbacks,
        })
    }

    /// 每个阶段查一次台账；台账读取是同步 IO，放到阻塞线程池
    async fn acceptance_rates(&self, candidates: &[CandidateProfile]) -> Vec<f64> {
        if candidates.is_empty() {
            return Vec::new();
        }
        let estimator = self.estimator.clone();
        let ids: Vec<String> = candidates.iter().map(|c| c.id.clone()).collect();
        let count = ids.len();
        match tokio::task::spawn_blocking(move || {
            ids.iter()
                .map(|id| estimator.acceptance_rate(id))
                .collect::<Vec<f64>>()
        })
        .await
        {
            Ok(rates) => rates,
            Err(e) => {
                tracing::warn!(error = %e, "acceptance lookup aborted, using prior");
                vec![self.estimator.neutral_prior(); count]
            }
        }
    }

    /// 单个候选人；返回 (结果, 是否降级)
    async fn score_one(
        &self,
        requirement_text: &str,
        candidate: &CandidateProfile,
        acceptance: f64,
    ) -> Result<(ScoredCandidate, bool), MatchError> {
        let outcome = self.assessor.assess(requirement_text, &candidate.text).await?;
        let (mut assessment, fell_back) = self.resolve(&candidate.id, outcome);

        assessment.adjusted_score = assessment.match_score * acceptance;
        tracing::debug!(
            candidate_id = %candidate.id,
            match_score = assessment.match_score,
            acceptance,
            adjusted_score = assessment.adjusted_score,
            "candidate scored"
        );

        Ok((
            ScoredCandidate {
                candidate_id: candidate.id.clone(),
                profile_text: candidate.text.clone(),
                assessment,
            },
            fell_back,
        ))
    }

    fn resolve(&self, candidate_id: &str, outcome: AssessmentOutcome) -> (Assessment, bool) {
        match outcome {
            AssessmentOutcome::Assessed(mut a) => match self.policy.apply(a.match_score) {
                Some(score) => {
                    a.match_score = score;
                    (a, false)
                }
                None => {
                    tracing::warn!(candidate_id, raw_score = a.match_score, "match score out of range");
                    (Assessment::failed_with("Score out of range"), true)
                }
            },
            AssessmentOutcome::Unparseable(reason) => {
                tracing::warn!(candidate_id, %reason, "assessment unparseable, using failed record");
                (Assessment::failed(), true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::{FeedbackLedger, FeedbackRecord, InMemoryFeedbackLedger};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 按档案文本返回预置回复
    struct TableAssessor {
        replies: HashMap<String, Result<AssessmentOutcome, String>>,
        calls: AtomicUsize,
    }

    impl TableAssessor {
        fn new(entries: Vec<(&str, Result<AssessmentOutcome, String>)>) -> Self {
            Self {
                replies: entries
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v))
                    .collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Assessor for TableAssessor {
        async fn assess(
            &self,
            _requirement_text: &str,
            profile_text: &str,
        ) -> Result<AssessmentOutcome, MatchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.replies.get(profile_text) {
                Some(Ok(o)) => Ok(o.clone()),
                Some(Err(e)) => Err(MatchError::Assessment(e.clone())),
                None => Ok(AssessmentOutcome::Unparseable("unknown".into())),
            }
        }
    }

    fn assessed(score: f64) -> Result<AssessmentOutcome, String> {
        let mut a = Assessment::failed_with("");
        a.match_score = score;
        a.recommendation = "Recommended".into();
        Ok(AssessmentOutcome::Assessed(a))
    }

    fn candidates(ids: &[&str]) -> Vec<CandidateProfile> {
        ids.iter()
            .map(|id| CandidateProfile::new(*id, format!("profile-{}", id)))
            .collect()
    }

    #[tokio::test]
    async fn test_adjusted_scores_use_prior() {
        let assessor = TableAssessor::new(vec![
            ("profile-A", assessed(0.9)),
            ("profile-B", assessed(0.5)),
            ("profile-C", assessed(0.2)),
        ]);
        let scorer = MatchScorer::new(Arc::new(assessor), AcceptanceEstimator::without_ledger())
            .with_concurrency(2);

        let report = scorer.score_all("req", &candidates(&["A", "B", "C"])).await.unwrap();
        let adjusted: Vec<f64> = report.scored.iter().map(|s| s.assessment.adjusted_score).collect();
        for (got, want) in adjusted.iter().zip([0.81, 0.45, 0.18]) {
            assert!((got - want).abs() < 1e-9, "{} != {}", got, want);
        }
        let ids: Vec<_> = report.scored.iter().map(|s| s.candidate_id.as_str()).collect();
        assert_eq!(ids, ["A", "B", "C"]);
        assert_eq!(report.fallbacks, 0);
    }

    #[tokio::test]
    async fn test_unparseable_becomes_failed_record() {
        let assessor = TableAssessor::new(vec![
            ("profile-A", Ok(AssessmentOutcome::Unparseable("garbage".into()))),
            ("profile-B", assessed(0.6)),
        ]);
        let scorer = MatchScorer::new(Arc::new(assessor), AcceptanceEstimator::without_ledger());

        let report = scorer.score_all("req", &candidates(&["A", "B"])).await.unwrap();
        let a = &report.scored[0].assessment;
        assert_eq!(a.match_score, 0.0);
        assert_eq!(a.recommendation, "Not Recommended");
        assert_eq!(a.adjusted_score, 0.0);
        assert_eq!(report.fallbacks, 1);
        assert!((report.scored[1].assessment.adjusted_score - 0.54).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_score_policy_clamp_and_reject() {
        let table = || {
            TableAssessor::new(vec![("profile-A", assessed(1.5))])
        };
        let clamp = MatchScorer::new(Arc::new(table()), AcceptanceEstimator::without_ledger());
        let report = clamp.score_all("req", &candidates(&["A"])).await.unwrap();
        assert_eq!(report.scored[0].assessment.match_score, 1.0);

        let reject = MatchScorer::new(Arc::new(table()), AcceptanceEstimator::without_ledger())
            .with_policy(ScorePolicy::Reject);
        let report = reject.score_all("req", &candidates(&["A"])).await.unwrap();
        assert!(report.scored[0].assessment.is_failed());
        assert_eq!(report.fallbacks, 1);
    }

    #[tokio::test]
    async fn test_acceptance_history_applied() {
        let ledger = InMemoryFeedbackLedger::with_records(vec![FeedbackRecord::new("A", "Accepted")]);
        let assessor = TableAssessor::new(vec![("profile-A", assessed(0.9))]);
        let scorer = MatchScorer::new(Arc::new(assessor), AcceptanceEstimator::new(Arc::new(ledger)));

        let report = scorer.score_all("req", &candidates(&["A"])).await.unwrap();
        assert!((report.scored[0].assessment.adjusted_score - 0.6).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_service_failure_fails_stage() {
        let assessor = TableAssessor::new(vec![
            ("profile-A", assessed(0.9)),
            ("profile-B", Err("503".into())),
        ]);
        let scorer = MatchScorer::new(Arc::new(assessor), AcceptanceEstimator::without_ledger());
        let err = scorer.score_all("req", &candidates(&["A", "B"])).await.unwrap_err();
        assert!(matches!(err, MatchError::Assessment(_)));
    }

    #[tokio::test]
    async fn test_empty_candidates_no_calls() {
        let assessor = Arc::new(TableAssessor::new(vec![]));
        let scorer = MatchScorer::new(assessor.clone(), AcceptanceEstimator::without_ledger());
        let report = scorer.score_all("req", &[]).await.unwrap();
        assert!(report.scored.is_empty());
        assert_eq!(assessor.calls.load(Ordering::SeqCst), 0);
    }

    /// 统计台账读取次数
    struct CountingLedger {
        inner: InMemoryFeedbackLedger,
        reads: AtomicUsize,
    }

    impl FeedbackLedger for CountingLedger {
        fn records_for(&self, candidate_id: &str) -> Result<Vec<FeedbackRecord>, MatchError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.records_for(candidate_id)
        }

        fn append(&self, record: FeedbackRecord) -> Result<(), MatchError> {
            self.inner.append(record)
        }
    }

    #[tokio::test]
    async fn test_ledger_read_once_per_candidate() {
        let ledger = Arc::new(CountingLedger {
            inner: InMemoryFeedbackLedger::with_records(vec![FeedbackRecord::new("B", "rejected")]),
            reads: AtomicUsize::new(0),
        });
        let assessor = TableAssessor::new(vec![
            ("profile-A", assessed(0.5)),
            ("profile-B", assessed(0.5)),
            ("profile-C", assessed(0.5)),
        ]);
        let scorer = MatchScorer::new(Arc::new(assessor), AcceptanceEstimator::new(ledger.clone()))
            .with_concurrency(3);

        let report = scorer.score_all("req", &candidates(&["A", "B", "C"])).await.unwrap();
        assert_eq!(ledger.reads.load(Ordering::SeqCst), 3);
        // B: (0+1)/(1+2)
        assert!((report.scored[1].assessment.adjusted_score - 0.5 / 3.0).abs() < 1e-9);
        assert!((report.scored[0].assessment.adjusted_score - 0.45).abs() < 1e-9);
    }
}
