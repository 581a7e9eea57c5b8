//! 录用率估计
//!
//! 没有台账、台账为空或该候选人没有记录时返回中性先验 0.9（新人默认可信）；
//! 否则返回拉普拉斯平滑 (accepted + 1) / (total + 2)，结果严格落在 (0,1) 内。

use std::sync::Arc;

use crate::feedback::ledger::FeedbackLedger;

/// 无记录时的中性先验
pub const NEUTRAL_PRIOR: f64 = 0.9;

/// 某候选人的反馈计数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeedbackStats {
    pub accepted: usize,
    pub total: usize,
}

/// 拉普拉斯平滑录用率；total 为 0 时返回 prior
pub fn smoothed_acceptance(stats: FeedbackStats, prior: f64) -> f64 {
    if stats.total == 0 {
        return prior;
    }
    (stats.accepted as f64 + 1.0) / (stats.total as f64 + 2.0)
}

/// 录用率估计器：只读台账，不影响运行状态
#[derive(Clone)]
pub struct AcceptanceEstimator {
    ledger: Option<Arc<dyn FeedbackLedger>>,
    neutral_prior: f64,
}

impl Default for AcceptanceEstimator {
    fn default() -> Self {
        Self::without_ledger()
    }
}

impl AcceptanceEstimator {
    pub fn new(ledger: Arc<dyn FeedbackLedger>) -> Self {
        Self {
            ledger: Some(ledger),
            neutral_prior: NEUTRAL_PRIOR,
        }
    }

    /// 没有反馈来源：所有候选人都取中性先验
    pub fn without_ledger() -> Self {
        Self {
            ledger: None,
            neutral_prior: NEUTRAL_PRIOR,
        }
    }

    pub fn with_neutral_prior(mut self, prior: f64) -> Self {
        self.neutral_prior = prior;
        self
    }

    pub fn neutral_prior(&self) -> f64 {
        self.neutral_prior
    }

    /// 读取计数；台账不可用时返回 None
    pub fn stats(&self, candidate_id: &str) -> Option<FeedbackStats> {
        let ledger = self.ledger.as_ref()?;
        match ledger.records_for(candidate_id) {
            Ok(records) => Some(FeedbackStats {
                accepted: records.iter().filter(|r| r.is_accepted()).count(),
                total: records.len(),
            }),
            Err(e) => {
                tracing::debug!(candidate_id, error = %e, "feedback ledger unavailable, using prior");
                None
            }
        }
    }

    /// 平滑后的历史录用率
    pub fn acceptance_rate(&self, candidate_id: &str) -> f64 {
        let stats = self.stats(candidate_id).unwrap_or_default();
        smoothed_acceptance(stats, self.neutral_prior)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MatchError;
    use crate::feedback::ledger::{FeedbackRecord, InMemoryFeedbackLedger};

    struct BrokenLedger;

    impl FeedbackLedger for BrokenLedger {
        fn records_for(&self, _candidate_id: &str) -> Result<Vec<FeedbackRecord>, MatchError> {
            Err(MatchError::Ledger("disk gone".into()))
        }

        fn append(&self, _record: FeedbackRecord) -> Result<(), MatchError> {
            Err(MatchError::Ledger("disk gone".into()))
        }
    }

    #[test]
    fn test_smoothing_formula_bounds() {
        for total in 1..=20usize {
            for accepted in 0..=total {
                let rate = smoothed_acceptance(FeedbackStats { accepted, total }, NEUTRAL_PRIOR);
                let expected = (accepted as f64 + 1.0) / (total as f64 + 2.0);
                assert!((rate - expected).abs() < 1e-12);
                assert!(rate > 0.0 && rate < 1.0);
            }
        }
        assert_eq!(smoothed_acceptance(FeedbackStats::default(), NEUTRAL_PRIOR), 0.9);
    }

    #[test]
    fn test_single_accepted_record_is_two_thirds() {
        let ledger = InMemoryFeedbackLedger::with_records(vec![FeedbackRecord::new("E1", "Accepted")]);
        let estimator = AcceptanceEstimator::new(Arc::new(ledger));
        assert!((estimator.acceptance_rate("E1") - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_neutral_prior_cases() {
        assert_eq!(AcceptanceEstimator::without_ledger().acceptance_rate("E1"), 0.9);

        let empty = AcceptanceEstimator::new(Arc::new(InMemoryFeedbackLedger::new()));
        assert_eq!(empty.acceptance_rate("E1"), 0.9);

        let other = InMemoryFeedbackLedger::with_records(vec![FeedbackRecord::new("E2", "rejected")]);
        assert_eq!(AcceptanceEstimator::new(Arc::new(other)).acceptance_rate("E1"), 0.9);

        let broken = AcceptanceEstimator::new(Arc::new(BrokenLedger));
        assert_eq!(broken.acceptance_rate("E1"), 0.9);
    }

    #[test]
    fn test_rejections_lower_rate() {
        let ledger = InMemoryFeedbackLedger::with_records(vec![
            FeedbackRecord::new("E1", "rejected"),
            FeedbackRecord::new("E1", "REJECTED"),
            FeedbackRecord::new("E1", "accepted"),
        ]);
        let estimator = AcceptanceEstimator::new(Arc::new(ledger));
        assert_eq!(
            estimator.stats("E1"),
            Some(FeedbackStats { accepted: 1, total: 3 })
        );
        assert!((estimator.acceptance_rate("E1") - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_custom_prior() {
        let estimator = AcceptanceEstimator::without_ledger().with_neutral_prior(0.5);
        assert_eq!(estimator.acceptance_rate("anyone"), 0.5);
    }
}
