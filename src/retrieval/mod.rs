//! 检索层：按需求文本召回最相关的候选人档案
//!
//! 编排层只依赖 `CandidateRetriever`；`InMemoryProfileStore` 是默认实现，
//! `ProfileIndex` 负责把档案库落盘与恢复。

pub mod persistence;
pub mod store;

use async_trait::async_trait;

use crate::core::{CandidateProfile, MatchError};

pub use persistence::ProfileIndex;
pub use store::{IndexedProfile, InMemoryProfileStore};

/// 检索服务 trait：返回至多 top_k 条，按相关度降序；可用不同 top_k 反复查询
#[async_trait]
pub trait CandidateRetriever: Send + Sync {
    async fn search(
        &self,
        query_text: &str,
        top_k: usize,
    ) -> Result<Vec<CandidateProfile>, MatchError>;
}
