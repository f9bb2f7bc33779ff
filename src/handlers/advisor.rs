use axum::http::StatusCode;
use std::sync::Arc;

use crate::error::{ApiError, NutritionError};
use crate::models::{AiReply, BreedSuggestion, NutritionPlan};
use crate::services::nutrition::{nutrition_prompt, parse_nutrition_response};
use crate::services::TextGenerator;

const MAX_SUGGESTIONS: usize = 5;
const NO_RESPONSE_FALLBACK: &str = "No response from AI";
const BULLET: &str = "• ";

/// AI-backed advice: crossbreeding suggestions, Q&A and nutrition plans.
pub struct AdvisorHandler {
    ai: Arc<dyn TextGenerator>,
}

impl AdvisorHandler {
    pub fn new(ai: Arc<dyn TextGenerator>) -> Self {
        Self { ai }
    }

    pub async fn suggest_breeds(&self, breed: Option<&str>) -> Result<Vec<BreedSuggestion>, ApiError> {
        let breed = non_blank(breed)
            .ok_or_else(|| ApiError::BadRequest("No breed provided".to_string()))?;

        log::info!("🧬 Crossbreeding suggestions requested for {}", breed);

        match self.ai.generate(&crossbreed_prompt(breed)).await {
            AiReply::Suggestions(value) => {
                let mut suggestions: Vec<BreedSuggestion> = serde_json::from_value(value)
                    .map_err(|e| {
                        log::warn!("⚠️ Suggestions JSON has unexpected shape: {}", e);
                        ApiError::Internal("Invalid response format from AI".to_string())
                    })?;

                if suggestions.is_empty() {
                    return Err(ApiError::Internal("No valid suggestions found".to_string()));
                }

                suggestions.truncate(MAX_SUGGESTIONS);
                Ok(suggestions)
            }
            AiReply::Text(_) => Err(ApiError::Internal(
                "Invalid response format from AI".to_string(),
            )),
            AiReply::Error(e) => Err(ApiError::Upstream(format!("AI service error: {}", e))),
        }
    }

    pub async fn ask(&self, query: Option<&str>) -> Result<Vec<String>, ApiError> {
        let query = non_blank(query)
            .ok_or_else(|| ApiError::BadRequest("Query cannot be empty".to_string()))?;

        log::info!("💬 Question received: {}", query);

        let reply = self.ai.generate(&question_prompt(query)).await;
        let text = match reply.text() {
            Some(text) => text,
            None => {
                log::warn!("⚠️ No text in AI reply, answering with fallback: {:?}", reply);
                NO_RESPONSE_FALLBACK
            }
        };

        Ok(bullet_points(text))
    }

    pub async fn nutrition_plan(&self, breed: Option<&str>) -> Result<NutritionPlan, NutritionError> {
        let breed = non_blank(breed).ok_or_else(|| {
            NutritionError::new(StatusCode::BAD_REQUEST, "Breed not provided", None)
        })?;

        log::info!("🌾 Nutrition plan requested for {}", breed);

        match self.ai.generate(&nutrition_prompt(breed)).await {
            AiReply::Text(text) => Ok(parse_nutrition_response(&text)),
            AiReply::Error(e) => Err(NutritionError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "AI service error",
                Some(e),
            )),
            other => Err(NutritionError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "No text response from AI",
                Some(format!("{:?}", other)),
            )),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn crossbreed_prompt(breed: &str) -> String {
    format!(
        "Suggest the top {} best cattle breeds to cross with {} for strong offspring.\n\
         Reply with a ```json fenced code block containing a list in the format:\n\
         [\n  {{\"breed\": \"<breed_name>\", \"benefit\": \"<reason>\"}},\n  ...\n]",
        MAX_SUGGESTIONS, breed
    )
}

fn question_prompt(query: &str) -> String {
    format!("Provide a precise, short answer as a cattle expert:\n{}", query)
}

/// One bullet per non-blank line.
pub fn bullet_points(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| format!("{}{}", BULLET, line))
        .collect()
}
