//! 结构化技能抽取：建索引时为档案附加 primary / secondary skills、tools、年限
//!
//! 只用于元数据，不参与打分；LLM 失败或回复无法解析时返回空记录，建索引不中断。

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::llm::{LlmClient, Message};
use crate::matching::assessment::extract_json_block;

const SKILL_PROMPT: &str = r#"Extract structured skill data from this resume or job description.

Return JSON:
{
  "primary_skills": [],
  "secondary_skills": [],
  "tools": [],
  "experience_years": {}
}

TEXT:
"#;

/// 结构化技能
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructuredSkills {
    pub primary_skills: Vec<String>,
    pub secondary_skills: Vec<String>,
    pub tools: Vec<String>,
    /// 技能 -> 年限（模型可能给数字或 "4+ years" 之类文本，原样保留）
    pub experience_years: BTreeMap<String, serde_json::Value>,
}

impl StructuredSkills {
    pub fn is_empty(&self) -> bool {
        self.primary_skills.is_empty()
            && self.secondary_skills.is_empty()
            && self.tools.is_empty()
            && self.experience_years.is_empty()
    }

    /// 全部技能名（小写去重，保持出现顺序）
    pub fn all_skills(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.primary_skills
            .iter()
            .chain(&self.secondary_skills)
            .chain(&self.tools)
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty() && seen.insert(s.clone()))
            .collect()
    }
}

/// 解析抽取结果；失败返回空记录
pub fn parse_skills(output: &str) -> StructuredSkills {
    extract_json_block(output)
        .and_then(|json| serde_json::from_str(json).ok())
        .unwrap_or_default()
}

/// 技能抽取器
pub struct SkillExtractor {
    llm: Arc<dyn LlmClient>,
    timeout_secs: u64,
}

impl SkillExtractor {
    pub fn new(llm: Arc<dyn LlmClient>, timeout_secs: u64) -> Self {
        Self { llm, timeout_secs }
    }

    pub async fn extract(&self, text: &str) -> StructuredSkills {
        let messages = vec![Message::user(format!("{}{}", SKILL_PROMPT, text.trim()))];
        let started = std::time::Instant::now();
        let reply = tokio::time::timeout(
            Duration::from_secs(self.timeout_secs),
            self.llm.complete(&messages),
        )
        .await;
        tracing::debug!(elapsed_ms = started.elapsed().as_millis() as u64, "skill extraction finished");

        match reply {
            Ok(Ok(output)) => parse_skills(&output),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "skill extraction failed");
                StructuredSkills::default()
            }
            Err(_) => {
                tracing::warn!(secs = self.timeout_secs, "skill extraction timed out");
                StructuredSkills::default()
            }
        }
    }
}
