//! Talent Match - Rust 人才匹配智能体
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 运行状态、Planner、排序、反思、主控循环与构建器
//! - **feedback**: 历史录用反馈台账与平滑录用率
//! - **ingest**: 档案目录导入
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）及嵌入
//! - **matching**: 评估服务、评估解析、评分阶段、技能抽取
//! - **observability**: 日志初始化
//! - **retrieval**: 候选人检索（内存档案库 + JSON 索引）

pub mod config;
pub mod core;
pub mod feedback;
pub mod ingest;
pub mod llm;
pub mod matching;
pub mod observability;
pub mod retrieval;

pub use crate::core::{MatchBuilder, MatchError, MatchOrchestrator};
