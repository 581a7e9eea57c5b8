//! 评估服务：对 (需求文本, 档案文本) 给出结构化匹配评估
//!
//! `Assessor` 是编排层唯一依赖的评估接口；默认实现 `LlmAssessor` 通过 LlmClient 调用模型，
//! 要求其只返回 JSON。服务不可用 / 超时返回 Err（对运行致命），回复无法解析返回 Unparseable。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::core::MatchError;
use crate::llm::{LlmClient, Message};
use crate::matching::assessment::{parse_assessment, AssessmentOutcome};

const SYSTEM_PROMPT: &str = "You are an AI Talent Matching Agent. You compare project requirements \
with one employee profile and answer with a single strict JSON object, nothing else.";

/// 评估提示词模板：{project} 与 {profile} 会被替换
pub const DEFAULT_ASSESSMENT_PROMPT: &str = r#"PROJECT REQUIREMENTS:
{project}

EMPLOYEE PROFILE:
{profile}

Instructions:
- Calculate match score between 0.0 and 1.0
- Identify strengths
- Identify missing skills
- Consider transferable skills
- Provide recommendation

Return STRICT JSON:

{
  "match_score": 0.0,
  "strengths": [],
  "missing_skills": [],
  "transferable_skills_reasoning": "",
  "final_recommendation": ""
}"#;

/// 评估服务 trait
#[async_trait]
pub trait Assessor: Send + Sync {
    async fn assess(
        &self,
        requirement_text: &str,
        profile_text: &str,
    ) -> Result<AssessmentOutcome, MatchError>;
}

/// 基于 LLM 的评估服务
pub struct LlmAssessor {
    llm: Arc<dyn LlmClient>,
    prompt_template: String,
    timeout_secs: u64,
}

impl LlmAssessor {
    pub fn new(llm: Arc<dyn LlmClient>, timeout_secs: u64) -> Self {
        Self {
            llm,
            prompt_template: DEFAULT_ASSESSMENT_PROMPT.to_string(),
            timeout_secs,
        }
    }

    /// 使用自定义提示词模板（需包含 {project} 与 {profile}）
    pub fn with_prompt_template(mut self, template: impl Into<String>) -> Self {
        self.prompt_template = template.into();
        self
    }

    /// 从 config/prompts/assessment.md 加载模板（不存在时保持默认）
    pub fn with_prompt_from_file(self) -> Self {
        let template = [
            "config/prompts/assessment.md",
            "../config/prompts/assessment.md",
        ]
        .into_iter()
        .find_map(|p| std::fs::read_to_string(p).ok());
        match template {
            Some(t) => self.with_prompt_template(t),
            None => self,
        }
    }

    /// 单遍替换占位符；插入的文本不会再被当作模板扫描
    fn build_prompt(&self, requirement_text: &str, profile_text: &str) -> String {
        let mut out = String::with_capacity(
            self.prompt_template.len() + requirement_text.len() + profile_text.len(),
        );
        let mut rest = self.prompt_template.as_str();
        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let tail = &rest[start..];
            if let Some(after) = tail.strip_prefix("{project}") {
                out.push_str(requirement_text.trim());
                rest = after;
            } else if let Some(after) = tail.strip_prefix("{profile}") {
                out.push_str(profile_text.trim());
                rest = after;
            } else {
                out.push('{');
                rest = &tail[1..];
            }
        }
        out.push_str(rest);
        out
    }
}

#[async_trait]
impl Assessor for LlmAssessor {
    async fn assess(
        &self,
        requirement_text: &str,
        profile_text: &str,
    ) -> Result<AssessmentOutcome, MatchError> {
        let messages = vec![
            Message::system(SYSTEM_PROMPT),
            Message::user(self.build_prompt(requirement_text, profile_text)),
        ];

        let reply = tokio::time::timeout(
            Duration::from_secs(self.timeout_secs),
            self.llm.complete(&messages),
        )
        .await
        .map_err(|_| MatchError::Timeout {
            stage: "assessment",
            secs: self.timeout_secs,
        })?
        .map_err(MatchError::Assessment)?;

        Ok(parse_assessment(&reply))
    }
}
