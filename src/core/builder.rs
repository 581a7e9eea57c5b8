//! 匹配运行时构建器：统一的初始化逻辑
//!
//! 从 AppConfig 组装 LLM、评估服务、反馈台账、档案库与编排器；
//! CLI 与测试共用同一条装配路径，测试可用 with_llm / with_ledger 注入替身。

use std::sync::Arc;

use crate::config::AppConfig;
use crate::core::orchestrator::{MatchOrchestrator, MatchSettings};
use crate::core::MatchError;
use crate::feedback::{AcceptanceEstimator, FeedbackLedger, SqliteFeedbackLedger};
use crate::ingest::load_profiles;
use crate::llm::{create_embedder_from_config, LlmClient, MockLlmClient, OpenAiClient};
use crate::matching::{LlmAssessor, MatchScorer, SkillExtractor};
use crate::retrieval::{CandidateRetriever, InMemoryProfileStore, ProfileIndex};

/// 根据配置与环境变量选择 LLM 后端
///
/// 有 DEEPSEEK_API_KEY（或 provider=deepseek 且仅有 OPENAI_API_KEY）时走 DeepSeek；
/// 有 OPENAI_API_KEY 且 provider 为 openai 时走 OpenAI 兼容端点；否则使用 Mock。
pub fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    let provider = cfg.llm.provider.to_lowercase();
    if provider == "mock" {
        tracing::info!("Using Mock LLM (configured)");
        return Arc::new(MockLlmClient::new());
    }

    let use_deepseek = std::env::var("DEEPSEEK_API_KEY").is_ok()
        || (provider == "deepseek" && std::env::var("OPENAI_API_KEY").is_ok());
    let use_openai = std::env::var("OPENAI_API_KEY").is_ok() && provider != "deepseek";

    if use_deepseek {
        let client = OpenAiClient::deepseek(&cfg.llm.model);
        tracing::info!("Using DeepSeek LLM ({})", client.model());
        Arc::new(client)
    } else if use_openai {
        let client = OpenAiClient::new(
            cfg.llm.base_url.as_deref(),
            &cfg.llm.model,
            std::env::var("OPENAI_API_KEY").ok().as_deref(),
        );
        tracing::info!("Using OpenAI LLM ({})", client.model());
        Arc::new(client)
    } else {
        tracing::warn!("No API key set or provider unknown, using Mock LLM");
        Arc::new(MockLlmClient::new())
    }
}

/// 匹配运行时构建器
pub struct MatchBuilder {
    config: AppConfig,
    llm: Option<Arc<dyn LlmClient>>,
    ledger: Option<Arc<dyn FeedbackLedger>>,
}

impl MatchBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            llm: None,
            ledger: None,
        }
    }

    /// 指定 LLM（不指定则按配置创建）
    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// 指定反馈台账（不指定则用配置里的 SQLite 文件）
    pub fn with_ledger(mut self, ledger: Arc<dyn FeedbackLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn llm(&self) -> Arc<dyn LlmClient> {
        self.llm
            .clone()
            .unwrap_or_else(|| create_llm_from_config(&self.config))
    }

    /// 录用率估计器
    pub fn build_estimator(&self) -> AcceptanceEstimator {
        let ledger = self.ledger.clone().unwrap_or_else(|| {
            Arc::new(SqliteFeedbackLedger::new(&self.config.feedback.ledger_path))
        });
        AcceptanceEstimator::new(ledger).with_neutral_prior(self.config.feedback.neutral_prior)
    }

    /// 评分器：LLM 评估 × 录用率，按配置设定越界策略与并发度
    pub fn build_scorer(&self, llm: Arc<dyn LlmClient>) -> MatchScorer {
        let assessor = LlmAssessor::new(llm, self.config.llm.timeouts.request).with_prompt_from_file();
        MatchScorer::new(Arc::new(assessor), self.build_estimator())
            .with_policy(self.config.matching.score_policy)
            .with_concurrency(self.config.matching.scoring_concurrency)
    }

    /// 空档案库；启用嵌入且有 Key 时按向量检索
    pub fn build_store(&self) -> InMemoryProfileStore {
        let store = InMemoryProfileStore::new();
        match create_embedder_from_config(
            self.config.embedding.enabled,
            self.config.llm.base_url.as_deref(),
            &self.config.embedding.model,
        ) {
            Some(embedder) => store.with_embedder(embedder),
            None => store,
        }
    }

    /// 建立档案库：先恢复索引文件并补齐缺失向量，再导入档案目录（新档案抽取技能、编码），有变化时回写索引
    pub async fn index_profiles(
        &self,
        store: &InMemoryProfileStore,
        llm: Arc<dyn LlmClient>,
    ) -> Result<usize, MatchError> {
        let index = ProfileIndex::new(&self.config.index.index_path);
        let restored = index.load_into(store)?;
        tracing::info!(restored, path = %index.path().display(), "profile index loaded");

        let embedded = if store.uses_embeddings() {
            store.embed_missing().await?
        } else {
            0
        };
        if embedded > 0 {
            tracing::info!(embedded, "restored profiles embedded");
        }

        let mut added = 0usize;
        if let Some(dir) = &self.config.index.profiles_dir {
            let known = store.snapshot();
            let extractor = SkillExtractor::new(llm, self.config.llm.timeouts.request);
            for mut profile in load_profiles(dir)? {
                let unchanged = known
                    .iter()
                    .any(|k| k.id == profile.id && k.text == profile.text);
                if unchanged {
                    continue;
                }
                if self.config.index.extract_skills {
                    profile.skills = extractor.extract(&profile.text).await;
                }
                store.upsert(profile).await?;
                added += 1;
            }
        }

        if added + embedded > 0 {
            index.save(&store.snapshot())?;
        }
        tracing::info!(added, total = store.len(), "profiles indexed");
        Ok(store.len())
    }

    /// 组装编排器
    pub fn build(&self, retriever: Arc<dyn CandidateRetriever>) -> MatchOrchestrator {
        let scorer = self.build_scorer(self.llm());
        MatchOrchestrator::new(retriever, scorer, MatchSettings::from(&self.config.matching))
    }
}
