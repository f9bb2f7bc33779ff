use crate::models::AiReply;

/// Trait for text-generation backends (Gemini, test stubs, ...).
/// Implementations never fail: transport and parse problems come back as `AiReply::Error`.
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> AiReply;
}
