use image::{imageops::FilterType, DynamicImage};
use serde::Serialize;
use std::sync::Arc;

use crate::config::UploadLimits;
use crate::error::ApiError;
use crate::models::DetectionResult;
use crate::services::Detector;

const ALLOWED_EXTENSIONS: [&str; 3] = [".png", ".jpg", ".jpeg"];
const SUCCESS_MESSAGE: &str = "✅ Prediction successful! Ensure a clear image for better accuracy.";
const NO_MATCH_MESSAGE: &str = "⚠️ Could not confidently identify the breed. Try a clearer image.";

#[derive(Debug, Serialize, PartialEq)]
#[serde(untagged)]
pub enum PredictResponse {
    Detected(DetectionResult),
    NoMatch { message: String },
}

/// Validates uploads and runs the breed detector.
pub struct DetectionHandler {
    detector: Option<Arc<dyn Detector>>,
    limits: UploadLimits,
}

impl DetectionHandler {
    pub fn new(detector: Option<Arc<dyn Detector>>, limits: UploadLimits) -> Self {
        Self { detector, limits }
    }

    pub fn limits(&self) -> UploadLimits {
        self.limits
    }

    pub fn is_loaded(&self) -> bool {
        self.detector.is_some()
    }

    pub fn device(&self) -> &str {
        self.detector
            .as_deref()
            .map(|detector| detector.device())
            .unwrap_or("none")
    }

    fn loaded_detector(&self) -> Result<Arc<dyn Detector>, ApiError> {
        self.detector
            .clone()
            .ok_or_else(|| ApiError::Internal("Model not loaded".to_string()))
    }

    pub fn ensure_loaded(&self) -> Result<(), ApiError> {
        self.loaded_detector().map(|_| ())
    }

    pub fn check_filename(&self, filename: Option<&str>) -> Result<(), ApiError> {
        let filename = filename.unwrap_or("").to_ascii_lowercase();
        if filename.is_empty() || !ALLOWED_EXTENSIONS.iter().any(|ext| filename.ends_with(ext)) {
            return Err(ApiError::BadRequest(
                "Invalid file format. Only PNG, JPG, JPEG allowed.".to_string(),
            ));
        }
        Ok(())
    }

    pub fn check_size(&self, size: usize) -> Result<(), ApiError> {
        if size > self.limits.max_upload_bytes {
            return Err(self.too_large());
        }
        Ok(())
    }

    pub fn too_large(&self) -> ApiError {
        ApiError::PayloadTooLarge(format!(
            "File too large. Maximum size is {}.",
            size_label(self.limits.max_upload_bytes)
        ))
    }

    /// Full `/predict` pipeline for one uploaded file.
    pub async fn predict(
        &self,
        filename: Option<&str>,
        data: Vec<u8>,
    ) -> Result<PredictResponse, ApiError> {
        let detector = self.loaded_detector()?;
        self.check_filename(filename)?;
        self.check_size(data.len())?;

        log::info!("📸 Running breed detection on {:?} ({} bytes)", filename, data.len());

        let limits = self.limits;
        let detections = tokio::task::spawn_blocking(move || {
            let image = image::load_from_memory(&data)
                .map_err(|e| ApiError::BadRequest(format!("Could not decode image: {}", e)))?;
            let image = downscale(image, limits.max_image_edge);

            detector
                .detect(&image, limits.confidence_threshold)
                .map_err(|e| ApiError::Internal(format!("Prediction failed: {}", e)))
        })
        .await
        .map_err(|e| ApiError::Internal(format!("Prediction failed: {}", e)))??;

        // First box only, not necessarily the most confident one.
        let Some(first) = detections.first() else {
            log::info!("🤷 No detection above threshold {}", limits.confidence_threshold);
            return Ok(PredictResponse::NoMatch {
                message: NO_MATCH_MESSAGE.to_string(),
            });
        };

        let result = DetectionResult::from_detection(first, SUCCESS_MESSAGE);
        log::info!("✅ Detected {} ({:.2})", result.breed, result.confidence);
        Ok(PredictResponse::Detected(result))
    }
}

/// Shrink so neither edge exceeds `max_edge`, keeping the aspect ratio.
pub fn downscale(image: DynamicImage, max_edge: u32) -> DynamicImage {
    if image.width() > max_edge || image.height() > max_edge {
        image.resize(max_edge, max_edge, FilterType::Lanczos3)
    } else {
        image
    }
}

/// Byte count in the largest unit that keeps it at or above one.
fn size_label(bytes: usize) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = 1024.0 * 1024.0;

    let bytes = bytes as f64;
    let round2 = |value: f64| (value * 100.0).round() / 100.0;

    if bytes >= MB {
        format!("{} MB", round2(bytes / MB))
    } else if bytes >= KB {
        format!("{} KB", round2(bytes / KB))
    } else {
        format!("{} bytes", bytes)
    }
}
