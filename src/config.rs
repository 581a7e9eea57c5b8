//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `TALENT__*` 覆盖（双下划线表示嵌套，如 `TALENT__MATCHING__THRESHOLD=0.6`）。

use std::path::PathBuf;

use serde::Deserialize;

use crate::core::MatchError;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmSection,
    pub embedding: EmbeddingSection,
    pub matching: MatchingSection,
    pub feedback: FeedbackSection,
    pub index: IndexSection,
}

/// [llm] 段：后端选择与超时
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// 后端：deepseek / openai / mock；优先级由 API Key 与 provider 共同决定
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
    #[serde(default)]
    pub timeouts: LlmTimeoutsSection,
}

fn default_provider() -> String {
    "deepseek".to_string()
}

fn default_model() -> String {
    "deepseek-chat".to_string()
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmTimeoutsSection {
    /// 单次评估 / 技能抽取请求超时（秒）
    #[serde(default = "default_request_timeout")]
    pub request: u64,
}

fn default_request_timeout() -> u64 {
    60
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self {
            request: default_request_timeout(),
        }
    }
}

/// [embedding] 段：是否用嵌入向量检索（否则关键词重叠）
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingSection {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_embedding_model")]
    pub model: String,
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

impl Default for EmbeddingSection {
    fn default() -> Self {
        Self {
            enabled: false,
            model: default_embedding_model(),
        }
    }
}

/// 评估分数越界时的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScorePolicy {
    /// 夹到 [0,1]
    #[default]
    Clamp,
    /// 视为评估失败（0 分，Not Recommended）
    Reject,
}

/// [matching] 段：主循环参数
#[derive(Debug, Clone, Deserialize)]
pub struct MatchingSection {
    #[serde(default = "default_goal")]
    pub goal: String,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// 反思重试时的检索宽度
    #[serde(default = "default_retry_top_k")]
    pub retry_top_k: usize,
    /// 评分阶段同时在途的评估请求数
    #[serde(default = "default_scoring_concurrency")]
    pub scoring_concurrency: usize,
    #[serde(default)]
    pub score_policy: ScorePolicy,
}

fn default_goal() -> String {
    "Find best candidates".to_string()
}

fn default_max_iterations() -> u32 {
    8
}

fn default_threshold() -> f64 {
    0.7
}

fn default_top_k() -> usize {
    5
}

fn default_retry_top_k() -> usize {
    3
}

fn default_scoring_concurrency() -> usize {
    4
}

impl Default for MatchingSection {
    fn default() -> Self {
        Self {
            goal: default_goal(),
            max_iterations: default_max_iterations(),
            threshold: default_threshold(),
            top_k: default_top_k(),
            retry_top_k: default_retry_top_k(),
            scoring_concurrency: default_scoring_concurrency(),
            score_policy: ScorePolicy::default(),
        }
    }
}

/// [feedback] 段：历史反馈台账
#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackSection {
    #[serde(default = "default_ledger_path")]
    pub ledger_path: PathBuf,
    /// 无台账 / 无记录时的中性先验
    #[serde(default = "default_neutral_prior")]
    pub neutral_prior: f64,
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from("data/feedback.db")
}

fn default_neutral_prior() -> f64 {
    0.9
}

impl Default for FeedbackSection {
    fn default() -> Self {
        Self {
            ledger_path: default_ledger_path(),
            neutral_prior: default_neutral_prior(),
        }
    }
}

/// [index] 段：档案目录与本地索引文件
#[derive(Debug, Clone, Deserialize)]
pub struct IndexSection {
    pub profiles_dir: Option<PathBuf>,
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,
    /// 建索引时是否调用 LLM 抽取结构化技能
    #[serde(default = "default_extract_skills")]
    pub extract_skills: bool,
}

fn default_index_path() -> PathBuf {
    PathBuf::from("data/profiles.json")
}

fn default_extract_skills() -> bool {
    true
}

impl Default for IndexSection {
    fn default() -> Self {
        Self {
            profiles_dir: None,
            index_path: default_index_path(),
            extract_skills: default_extract_skills(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 TALENT__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 TALENT__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, MatchError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("TALENT")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    Ok(c.try_deserialize()?)
}
