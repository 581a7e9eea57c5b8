//! 匹配过程事件：用于流式展示规划、检索、评分、排序与反思进度

use serde::Serialize;

use crate::core::state::Action;

/// 单步过程事件（可序列化为 JSON 供前端展示）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MatchEvent {
    /// Planner 选出下一步
    Planned { iteration: u32, action: Action },
    /// 检索完成
    Retrieved { count: usize, top_k: usize },
    /// 评分完成；fallbacks 为降级为失败评估的人数
    Scored { count: usize, fallbacks: usize },
    /// 排序完成
    Ranked { top_score: Option<f64> },
    /// 反思结论
    Reflected { top_score: Option<f64>, retry: bool },
    /// 运行结束
    Finished { iteration: u32, results: usize },
}
