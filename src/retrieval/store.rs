//! 内存档案库：有嵌入提供方时按余弦相似度检索，否则按关键词重叠检索
//!
//! 同分时保持写入顺序。写入为 upsert：同 id 覆盖旧档案。

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::{CandidateProfile, MatchError};
use crate::llm::{cosine_similarity, EmbeddingProvider};
use crate::matching::StructuredSkills;
use crate::retrieval::CandidateRetriever;

/// 已索引的档案
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedProfile {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub skills: StructuredSkills,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
}

impl IndexedProfile {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            skills: StructuredSkills::default(),
            embedding: Vec::new(),
        }
    }

    pub fn with_skills(mut self, skills: StructuredSkills) -> Self {
        self.skills = skills;
        self
    }
}

/// 将文本切分为小写词集合，用于关键词重叠打分
fn tokenize_lower(s: &str) -> HashSet<String> {
    s.split(|c: char| !(c.is_alphanumeric() || c == '+' || c == '#'))
        .map(|w| w.to_lowercase())
        .filter(|w| w.chars().count() > 1)
        .collect()
}

struct Entry {
    profile: IndexedProfile,
    tokens: HashSet<String>,
}

impl Entry {
    fn new(profile: IndexedProfile) -> Self {
        let mut tokens = tokenize_lower(&profile.text);
        tokens.extend(profile.skills.all_skills());
        Self { profile, tokens }
    }
}

/// 内存档案库
#[derive(Clone, Default)]
pub struct InMemoryProfileStore {
    entries: Arc<RwLock<Vec<Entry>>>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn uses_embeddings(&self) -> bool {
        self.embedder.is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 写入档案（同 id 覆盖）；有嵌入提供方且档案尚无向量时先编码
    pub async fn upsert(&self, mut profile: IndexedProfile) -> Result<(), MatchError> {
        if let Some(embedder) = &self.embedder {
            if profile.embedding.is_empty() {
                profile.embedding = embedder
                    .embed(&profile.text)
                    .await
                    .map_err(|e| MatchError::Index(format!("embed {}: {}", profile.id, e)))?;
            }
        }
        self.insert_indexed(profile)
    }

    /// 直接写入已编码好的档案（从索引文件恢复时使用）
    pub fn insert_indexed(&self, profile: IndexedProfile) -> Result<(), MatchError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| MatchError::Index(e.to_string()))?;
        let entry = Entry::new(profile);
        match entries.iter_mut().find(|e| e.profile.id == entry.profile.id) {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }
        Ok(())
    }

    /// 为尚无向量的档案补齐向量（例如关闭嵌入时写出的索引被重新加载）；返回补齐数量
    pub async fn embed_missing(&self) -> Result<usize, MatchError> {
        let Some(embedder) = &self.embedder else {
            return Ok(0);
        };
        let pending: Vec<IndexedProfile> = self
            .snapshot()
            .into_iter()
            .filter(|p| p.embedding.is_empty())
            .collect();
        let count = pending.len();
        for mut profile in pending {
            profile.embedding = embedder
                .embed(&profile.text)
                .await
                .map_err(|e| MatchError::Index(format!("embed {}: {}", profile.id, e)))?;
            self.insert_indexed(profile)?;
        }
        Ok(count)
    }

    /// 当前全部档案（写入顺序）
    pub fn snapshot(&self) -> Vec<IndexedProfile> {
        self.entries
            .read()
            .map(|entries| entries.iter().map(|e| e.profile.clone()).collect())
            .unwrap_or_default()
    }

    fn rank(
        &self,
        query_text: &str,
        query_embedding: Option<&[f32]>,
        top_k: usize,
    ) -> Result<Vec<CandidateProfile>, MatchError> {
        let entries = self
            .entries
            .read()
            .map_err(|e| MatchError::Retrieval(e.to_string()))?;
        let query_tokens = tokenize_lower(query_text);

        let mut scored: Vec<(f32, &Entry)> = entries
            .iter()
            .map(|e| {
                // 向量模式下只比较余弦相似度，缺向量的档案排在最后
                let score = match query_embedding {
                    Some(_) if e.profile.embedding.is_empty() => f32::MIN,
                    Some(q) => cosine_similarity(q, &e.profile.embedding),
                    None => query_tokens.intersection(&e.tokens).count() as f32,
                };
                (score, e)
            })
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(_, e)| CandidateProfile::new(e.profile.id.clone(), e.profile.text.clone()))
            .collect())
    }
}

#[async_trait]
impl CandidateRetriever for InMemoryProfileStore {
    async fn search(
        &self,
        query_text: &str,
        top_k: usize,
    ) -> Result<Vec<CandidateProfile>, MatchError> {
        if top_k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }
        let query_embedding = match &self.embedder {
            Some(embedder) => Some(
                embedder
                    .embed(query_text)
                    .await
                    .map_err(MatchError::Retrieval)?,
            ),
            None => None,
        };
        self.rank(query_text, query_embedding.as_deref(), top_k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 按关键字出现与否生成 3 维向量：[docker, jenkins, sales]
    struct KeywordEmbedder;

    #[async_trait]
    impl EmbeddingProvider for KeywordEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, String> {
            let t = text.to_lowercase();
            Ok(["docker", "jenkins", "sales"]
                .iter()
                .map(|k| if t.contains(k) { 1.0 } else { 0.0 })
                .collect())
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, String> {
            Err("quota exceeded".into())
        }
    }

    async fn seeded(store: &InMemoryProfileStore) {
        store.upsert(IndexedProfile::new("E1", "Sales manager, CRM")).await.unwrap();
        store.upsert(IndexedProfile::new("E2", "DevOps: Docker, Jenkins, Git")).await.unwrap();
        store.upsert(IndexedProfile::new("E3", "Docker containers")).await.unwrap();
    }

    fn ids(found: &[CandidateProfile]) -> Vec<&str> {
        found.iter().map(|c| c.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_keyword_search_orders_by_overlap() {
        let store = InMemoryProfileStore::new();
        seeded(&store).await;
        let found = store.search("Jenkins pipelines with Docker", 2).await.unwrap();
        assert_eq!(ids(&found), ["E2", "E3"]);
    }

    #[tokio::test]
    async fn test_top_k_bounds_and_ties_keep_insertion_order() {
        let store = InMemoryProfileStore::new();
        seeded(&store).await;
        let found = store.search("unrelated words", 5).await.unwrap();
        assert_eq!(ids(&found), ["E1", "E2", "E3"]);
        assert!(store.search("docker", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_store_returns_nothing() {
        let store = InMemoryProfileStore::new();
        assert!(store.search("docker", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_replaces_same_id() {
        let store = InMemoryProfileStore::new();
        store.upsert(IndexedProfile::new("E1", "old text")).await.unwrap();
        store.upsert(IndexedProfile::new("E1", "new text")).await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.snapshot()[0].text, "new text");
    }

    #[tokio::test]
    async fn test_embedding_search() {
        let store = InMemoryProfileStore::new().with_embedder(Arc::new(KeywordEmbedder));
        seeded(&store).await;
        assert_eq!(store.snapshot()[1].embedding, vec![1.0, 1.0, 0.0]);
        let found = store.search("need jenkins", 1).await.unwrap();
        assert_eq!(ids(&found), ["E2"]);
    }

    #[tokio::test]
    async fn test_query_embedding_failure_is_retrieval_error() {
        let store = InMemoryProfileStore::new();
        seeded(&store).await;
        let store = store.with_embedder(Arc::new(FailingEmbedder));
        let err = store.search("docker", 3).await.unwrap_err();
        assert!(matches!(err, MatchError::Retrieval(_)));
    }

    #[tokio::test]
    async fn test_skills_participate_in_keyword_match() {
        let store = InMemoryProfileStore::new();
        let skills = StructuredSkills {
            tools: vec!["Kubernetes".into()],
            ..Default::default()
        };
        store.upsert(IndexedProfile::new("E1", "Platform engineer")).await.unwrap();
        store
            .upsert(IndexedProfile::new("E2", "Infra engineer").with_skills(skills))
            .await
            .unwrap();
        let found = store.search("kubernetes", 1).await.unwrap();
        assert_eq!(ids(&found), ["E2"]);
    }

    #[tokio::test]
    async fn test_profile_without_vector_never_outranks_embedded() {
        let store = InMemoryProfileStore::new().with_embedder(Arc::new(KeywordEmbedder));
        store
            .insert_indexed(IndexedProfile::new("OLD", "sales docker jenkins"))
            .unwrap();
        store.upsert(IndexedProfile::new("NEW", "docker jenkins")).await.unwrap();

        let found = store.search("docker jenkins", 2).await.unwrap();
        assert_eq!(ids(&found), ["NEW", "OLD"]);
    }

    #[tokio::test]
    async fn test_embed_missing_fills_restored_profiles() {
        let store = InMemoryProfileStore::new().with_embedder(Arc::new(KeywordEmbedder));
        store
            .insert_indexed(IndexedProfile::new("OLD", "sales docker jenkins"))
            .unwrap();
        store.upsert(IndexedProfile::new("NEW", "docker jenkins")).await.unwrap();

        assert_eq!(store.embed_missing().await.unwrap(), 1);
        assert!(store.snapshot().iter().all(|p| !p.embedding.is_empty()));
        assert_eq!(store.embed_missing().await.unwrap(), 0);

        // 补齐后按余弦排序：NEW 1.0，OLD 约 0.82
        let found = store.search("docker jenkins", 2).await.unwrap();
        assert_eq!(ids(&found), ["NEW", "OLD"]);
    }

    #[tokio::test]
    async fn test_embed_missing_without_embedder_is_noop() {
        let store = InMemoryProfileStore::new();
        store.insert_indexed(IndexedProfile::new("E1", "docker")).unwrap();
        assert_eq!(store.embed_missing().await.unwrap(), 0);
        assert!(!store.uses_embeddings());
    }
}
