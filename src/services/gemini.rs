use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::TextGenerator;
use crate::models::AiReply;

const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<TextPart>,
}

#[derive(Debug, Serialize)]
struct TextPart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ReplyPart>,
}

#[derive(Debug, Deserialize)]
struct ReplyPart {
    text: Option<String>,
}

/// Google Gemini `generateContent` client.
pub struct GeminiService {
    api_key: Option<String>,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiService {
    pub fn new(
        api_key: Option<String>,
        model: String,
        base_url: String,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    /// One round-trip; `Ok(None)` when the reply carries no candidate text.
    async fn request_text(&self, api_key: &str, prompt: &str) -> Result<Option<String>> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![TextPart {
                    text: prompt.to_string(),
                }],
            }],
        };

        log::info!("🤖 Sending request to Gemini with model: {}", self.model);
        log::debug!("📤 Prompt size: {} bytes", prompt.len());

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        log::debug!("📥 Gemini response status: {}", status);

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            log::error!("❌ Gemini API error ({}): {}", status, error_text);
            anyhow::bail!("Gemini API error ({}): {}", status, error_text);
        }

        let reply: GenerateResponse = response.json().await?;
        let text = reply
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts.into_iter().next())
            .and_then(|part| part.text);

        Ok(text)
    }
}

#[async_trait::async_trait]
impl TextGenerator for GeminiService {
    async fn generate(&self, prompt: &str) -> AiReply {
        let Some(api_key) = self.api_key.as_deref() else {
            log::warn!("⚠️ Gemini API key not configured");
            return AiReply::Error("Gemini API key not found".to_string());
        };

        match self.request_text(api_key, prompt).await {
            Ok(Some(text)) => {
                log::debug!("💬 Gemini response content: {}", text);
                extract_reply(&text)
            }
            Ok(None) => {
                log::warn!("⚠️ Gemini returned no candidate text");
                AiReply::Error("No valid response from AI".to_string())
            }
            Err(e) => {
                log::error!("❌ Gemini request failed: {}", e);
                AiReply::Error(format!("Failed to fetch response: {}", e))
            }
        }
    }
}

/// Classify raw model text: a ```json fenced block becomes structured data,
/// anything else stays plain text.
pub fn extract_reply(raw: &str) -> AiReply {
    let Some(body) = fenced_json(raw) else {
        return AiReply::Text(raw.to_string());
    };

    match serde_json::from_str(body) {
        Ok(value) => AiReply::Suggestions(value),
        Err(e) => {
            log::warn!("⚠️ Could not parse fenced JSON from AI response: {}", e);
            AiReply::Error("Failed to parse AI response JSON".to_string())
        }
    }
}

fn fenced_json(raw: &str) -> Option<&str> {
    let start = raw.find(JSON_FENCE)? + JSON_FENCE.len();
    let rest = &raw[start..];
    let end = rest.find(FENCE).unwrap_or(rest.len());
    Some(rest[..end].trim())
}
