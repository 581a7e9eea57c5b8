//! 评估结果：结构化评估、失败降级记录与分数策略
//!
//! 评估服务回复的解析沿用「先找 ```json 代码块，否则取第一个 `{` 到最后一个 `}`」的做法；
//! 解析不出来时不报错，由评分阶段记为零分的失败评估。

use serde::{Deserialize, Deserializer, Serialize};

use crate::config::ScorePolicy;

/// 解析失败时的推荐结论
pub const NOT_RECOMMENDED: &str = "Not Recommended";
/// 解析失败时的迁移技能说明
pub const PARSING_FAILED: &str = "Parsing failed";

/// 单个候选人的评估结果；adjusted_score 在评分时计算一次，之后不再重算
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub match_score: f64,
    pub strengths: Vec<String>,
    pub missing_skills: Vec<String>,
    pub transferable_reasoning: String,
    pub recommendation: String,
    pub adjusted_score: f64,
}

impl Assessment {
    /// 默认失败评估：0 分、空列表、Not Recommended
    pub fn failed() -> Self {
        Self::failed_with(PARSING_FAILED)
    }

    pub fn failed_with(reason: impl Into<String>) -> Self {
        Self {
            match_score: 0.0,
            strengths: Vec::new(),
            missing_skills: Vec::new(),
            transferable_reasoning: reason.into(),
            recommendation: NOT_RECOMMENDED.to_string(),
            adjusted_score: 0.0,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.match_score == 0.0 && self.recommendation == NOT_RECOMMENDED
    }
}

/// 评分后的候选人
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub candidate_id: String,
    pub profile_text: String,
    pub assessment: Assessment,
}

/// 评估服务的返回：解析成功，或回复无法解析（可恢复，按候选人处理）
#[derive(Debug, Clone, PartialEq)]
pub enum AssessmentOutcome {
    Assessed(Assessment),
    Unparseable(String),
}

/// 评估服务回复的 JSON 形态（键名与提示词约定一致，兼容几种常见别名）
#[derive(Debug, Deserialize)]
struct RawAssessment {
    #[serde(default, deserialize_with = "de_score")]
    match_score: f64,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default, alias = "gaps")]
    missing_skills: Vec<String>,
    #[serde(default, alias = "transferable_reasoning")]
    transferable_skills_reasoning: String,
    #[serde(default, alias = "recommendation")]
    final_recommendation: String,
}

/// 分数既接受数字也接受数字字符串（"0.8"）
fn de_score<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| serde::de::Error::custom("match_score is not a float")),
        serde_json::Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| serde::de::Error::custom(format!("match_score: {}", e))),
        serde_json::Value::Null => Ok(0.0),
        other => Err(serde::de::Error::custom(format!(
            "match_score has unexpected type: {}",
            other
        ))),
    }
}

/// 从 LLM 文本中提取 JSON 对象片段（```json 代码块优先）
pub fn extract_json_block(output: &str) -> Option<&str> {
    let trimmed = output.trim();
    if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        let inner = rest.find("```").map(|end| &rest[..end]).unwrap_or(rest);
        return extract_braced(inner);
    }
    extract_braced(trimmed)
}

fn extract_braced(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// 解析评估服务回复；adjusted_score 留给评分阶段填写
pub fn parse_assessment(output: &str) -> AssessmentOutcome {
    let Some(json) = extract_json_block(output) else {
        return AssessmentOutcome::Unparseable("no JSON object in response".to_string());
    };
    match serde_json::from_str::<RawAssessment>(json) {
        Ok(raw) => AssessmentOutcome::Assessed(Assessment {
            match_score: raw.match_score,
            strengths: raw.strengths,
            missing_skills: raw.missing_skills,
            transferable_reasoning: raw.transferable_skills_reasoning,
            recommendation: raw.final_recommendation,
            adjusted_score: 0.0,
        }),
        Err(e) => AssessmentOutcome::Unparseable(e.to_string()),
    }
}

impl ScorePolicy {
    /// 对原始分数应用策略；None 表示该评估应按失败处理。非有限值一律失败。
    pub fn apply(&self, score: f64) -> Option<f64> {
        if !score.is_finite() {
            return None;
        }
        match self {
            ScorePolicy::Clamp => Some(score.clamp(0.0, 1.0)),
            ScorePolicy::Reject => (0.0..=1.0).contains(&score).then_some(score),
        }
    }
}
