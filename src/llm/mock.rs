//! Mock LLM 客户端（用于测试与离线演示，无需 API）
//!
//! 按顺序返回预置回复；队列耗尽后返回默认回复。默认回复是一份中性评估 JSON，
//! 便于本地跑通 检索 -> 评分 -> 排序 -> 反思 流程。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{LlmClient, Message, Role};

const DEFAULT_REPLY: &str = r#"{"match_score": 0.5, "strengths": [], "missing_skills": [], "transferable_skills_reasoning": "Mock assessment", "final_recommendation": "Consider"}"#;

/// Mock 客户端：脚本化回复 + 记录收到的最后一条 User 消息
#[derive(Debug, Default)]
pub struct MockLlmClient {
    replies: Mutex<VecDeque<Result<String, String>>>,
    last_user: Mutex<Option<String>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置一组回复（按调用顺序消费）
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mock = Self::default();
        if let Ok(mut q) = mock.replies.lock() {
            q.extend(replies.into_iter().map(|r| Ok(r.into())));
        }
        mock
    }

    /// 追加一次服务失败
    pub fn push_failure(&self, reason: impl Into<String>) {
        if let Ok(mut q) = self.replies.lock() {
            q.push_back(Err(reason.into()));
        }
    }

    pub fn last_user_message(&self) -> Option<String> {
        self.last_user.lock().ok().and_then(|m| m.clone())
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| matches!(m.role, Role::User))
            .map(|m| m.content.clone());
        if let Ok(mut slot) = self.last_user.lock() {
            *slot = last_user;
        }

        let next = self.replies.lock().ok().and_then(|mut q| q.pop_front());
        next.unwrap_or_else(|| Ok(DEFAULT_REPLY.to_string()))
    }
}
