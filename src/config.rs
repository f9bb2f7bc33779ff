use std::env;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-pro-latest";
const DEFAULT_GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_api_url: String,
    pub llm_timeout: Duration,
    pub model_path: String,
    pub limits: UploadLimits,
}

/// Upload and inference limits for `/predict`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UploadLimits {
    pub max_upload_bytes: usize,
    pub max_image_edge: u32,
    pub confidence_threshold: f32,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_upload_bytes: 2 * 1024 * 1024,
            max_image_edge: 640,
            confidence_threshold: 0.5,
        }
    }
}

impl Config {
    /// Read configuration from the process environment (after `dotenv()`).
    pub fn from_env() -> Self {
        let defaults = UploadLimits::default();

        let gemini_api_key = env::var("GEMINI_API_KEY")
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());

        if gemini_api_key.is_none() {
            log::warn!("⚠️ GEMINI_API_KEY not set, AI-backed routes will return errors");
        }

        Self {
            port: parse_var("PORT", 8080),
            gemini_api_key,
            gemini_model: env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string()),
            gemini_api_url: env::var("GEMINI_API_URL")
                .unwrap_or_else(|_| DEFAULT_GEMINI_API_URL.to_string()),
            llm_timeout: Duration::from_secs(parse_var("LLM_TIMEOUT_SECS", 30)),
            model_path: env::var("MODEL_PATH").unwrap_or_else(|_| "best.onnx".to_string()),
            limits: UploadLimits {
                max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", defaults.max_upload_bytes),
                max_image_edge: parse_var("MAX_IMAGE_EDGE", defaults.max_image_edge),
                confidence_threshold: parse_var(
                    "CONFIDENCE_THRESHOLD",
                    defaults.confidence_threshold,
                ),
            },
        }
    }
}

fn parse_var<T>(name: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display + Copy,
{
    match env::var(name) {
        Ok(raw) => parse_or_default(name, &raw, default),
        Err(_) => default,
    }
}

fn parse_or_default<T>(name: &str, raw: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display + Copy,
{
    raw.trim().parse().unwrap_or_else(|_| {
        log::warn!("⚠️ Invalid value for {}: '{}', using default {}", name, raw, default);
        default
    })
}
