//! 匹配运行错误类型
//!
//! 单个候选人的评估解析失败不在这里：评分阶段就地降级为零分记录。
//! 这里只有会让整次运行失败（检索 / 评估服务不可用、超时）或显式写台账、建索引失败的错误。

use thiserror::Error;

/// 匹配运行过程中可能出现的错误
#[derive(Error, Debug)]
pub enum MatchError {
    /// 检索服务调用失败（区别于成功返回零条结果）
    #[error("Retrieval failed: {0}")]
    Retrieval(String),

    /// 评估服务不可用（网络、鉴权、限流等）
    #[error("Assessment service failed: {0}")]
    Assessment(String),

    #[error("{stage} timed out after {secs}s")]
    Timeout { stage: &'static str, secs: u64 },

    #[error("Feedback ledger error: {0}")]
    Ledger(String),

    #[error("Profile index error: {0}")]
    Index(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl MatchError {
    /// 是否属于外部服务失败（对当前运行致命）
    pub fn is_service_failure(&self) -> bool {
        matches!(
            self,
            MatchError::Retrieval(_) | MatchError::Assessment(_) | MatchError::Timeout { .. }
        )
    }
}

impl From<rusqlite::Error> for MatchError {
    fn from(e: rusqlite::Error) -> Self {
        MatchError::Ledger(e.to_string())
    }
}

impl From<config::ConfigError> for MatchError {
    fn from(e: config::ConfigError) -> Self {
        MatchError::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_failure_classification() {
        assert!(MatchError::Retrieval("down".into()).is_service_failure());
        assert!(MatchError::Timeout { stage: "score", secs: 60 }.is_service_failure());
        assert!(!MatchError::Ledger("locked".into()).is_service_failure());
    }

    #[test]
    fn test_timeout_display() {
        let e = MatchError::Timeout { stage: "score", secs: 5 };
        assert_eq!(e.to_string(), "score timed out after 5s");
    }
}
