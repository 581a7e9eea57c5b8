//! LLM 层：客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）及嵌入

pub mod embedding;
pub mod message;
pub mod mock;
pub mod openai;
pub mod traits;

pub use embedding::{
    cosine_similarity, create_embedder_from_config, EmbeddingProvider, OpenAiEmbedder,
};
pub use message::{Message, Role};
pub use mock::MockLlmClient;
pub use openai::{OpenAiClient, TokenUsage, DEEPSEEK_BASE_URL, DEEPSEEK_CHAT};
pub use traits::LlmClient;
