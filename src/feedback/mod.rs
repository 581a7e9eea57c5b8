//! 反馈层：历史录用反馈台账与录用率估计
//!
//! - **ledger**: 台账 trait 与实现（内存 / SQLite），只追加
//! - **estimator**: 基于台账的平滑录用率（拉普拉斯平滑 + 中性先验）

pub mod estimator;
pub mod ledger;

pub use estimator::{smoothed_acceptance, AcceptanceEstimator, FeedbackStats, NEUTRAL_PRIOR};
pub use ledger::{FeedbackLedger, FeedbackRecord, InMemoryFeedbackLedger, SqliteFeedbackLedger};
