use anyhow::{Context, Result};
use image::{imageops::FilterType, DynamicImage, GenericImageView};
use std::sync::Mutex;
use tract_onnx::prelude::*;

use crate::models::Detection;

const INPUT_SIZE: u32 = 640;
const IOU_THRESHOLD: f32 = 0.45;
const PAD_VALUE: f32 = 114.0 / 255.0;

/// Trait for object detectors (ONNX runtime, test stubs, ...)
pub trait Detector: Send + Sync {
    /// Detections scoring at least `threshold`, best first.
    fn detect(&self, image: &DynamicImage, threshold: f32) -> Result<Vec<Detection>>;

    fn device(&self) -> &str;
}

type YoloPlan = SimplePlan<TypedFact, Box<dyn TypedOp>, TypedModel>;

/// YOLO-style detector exported to ONNX, run on CPU with tract.
pub struct OnnxDetector {
    // One inference at a time.
    plan: Mutex<YoloPlan>,
}

impl OnnxDetector {
    pub fn load(model_path: &str) -> Result<Self> {
        log::info!("📦 Loading detector weights from {}", model_path);

        let size = INPUT_SIZE as usize;
        let plan = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to read ONNX model {}", model_path))?
            .with_input_fact(0, f32::fact([1, 3, size, size]).into())?
            .into_optimized()?
            .into_runnable()?;

        Ok(Self {
            plan: Mutex::new(plan),
        })
    }
}

impl Detector for OnnxDetector {
    fn detect(&self, image: &DynamicImage, threshold: f32) -> Result<Vec<Detection>> {
        let letterbox = Letterbox::fit(image.dimensions(), INPUT_SIZE);
        let input = letterbox.tensor(image);

        let outputs = {
            let plan = self
                .plan
                .lock()
                .map_err(|_| anyhow::anyhow!("detector lock poisoned"))?;
            plan.run(tvec!(input.into()))?
        };

        let output = outputs[0]
            .to_array_view::<f32>()?
            .into_dimensionality::<tract_ndarray::Ix3>()
            .context("unexpected detector output shape")?;

        let (attributes, anchors) = (output.shape()[1], output.shape()[2]);
        if attributes < 5 {
            anyhow::bail!("detector output has {} attributes per anchor", attributes);
        }

        let mut candidates = Vec::new();
        for anchor in 0..anchors {
            let (class_id, confidence) = (4..attributes)
                .map(|row| (row - 4, output[[0, row, anchor]]))
                .fold((0, f32::MIN), |best, current| {
                    if current.1 > best.1 {
                        current
                    } else {
                        best
                    }
                });

            if confidence < threshold {
                continue;
            }

            let (x, y) = letterbox.unmap_point(output[[0, 0, anchor]], output[[0, 1, anchor]]);
            candidates.push(Detection {
                class_id,
                confidence,
                x,
                y,
                width: output[[0, 2, anchor]] / letterbox.scale,
                height: output[[0, 3, anchor]] / letterbox.scale,
            });
        }

        log::debug!("🔍 {} candidate boxes above threshold {}", candidates.len(), threshold);
        Ok(non_max_suppression(candidates, IOU_THRESHOLD))
    }

    fn device(&self) -> &str {
        "cpu"
    }
}

/// Aspect-preserving fit of an image into the square model input.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Letterbox {
    scale: f32,
    width: u32,
    height: u32,
    pad_x: u32,
    pad_y: u32,
    size: u32,
}

impl Letterbox {
    fn fit((width, height): (u32, u32), size: u32) -> Self {
        let scale = (size as f32 / width.max(1) as f32).min(size as f32 / height.max(1) as f32);
        let scaled_width = ((width as f32 * scale).round() as u32).clamp(1, size);
        let scaled_height = ((height as f32 * scale).round() as u32).clamp(1, size);

        Self {
            scale,
            width: scaled_width,
            height: scaled_height,
            pad_x: (size - scaled_width) / 2,
            pad_y: (size - scaled_height) / 2,
            size,
        }
    }

    fn tensor(&self, image: &DynamicImage) -> Tensor {
        let resized = image
            .resize_exact(self.width, self.height, FilterType::Triangle)
            .to_rgb8();
        let size = self.size as usize;

        tract_ndarray::Array4::from_shape_fn((1, 3, size, size), |(_, channel, y, x)| {
            let (x, y) = (x as u32, y as u32);
            let inside = x >= self.pad_x
                && x < self.pad_x + self.width
                && y >= self.pad_y
                && y < self.pad_y + self.height;

            if inside {
                resized.get_pixel(x - self.pad_x, y - self.pad_y)[channel] as f32 / 255.0
            } else {
                PAD_VALUE
            }
        })
        .into()
    }

    fn unmap_point(&self, x: f32, y: f32) -> (f32, f32) {
        (
            (x - self.pad_x as f32) / self.scale,
            (y - self.pad_y as f32) / self.scale,
        )
    }
}

fn iou(a: &Detection, b: &Detection) -> f32 {
    let left = (a.x - a.width / 2.0).max(b.x - b.width / 2.0);
    let right = (a.x + a.width / 2.0).min(b.x + b.width / 2.0);
    let top = (a.y - a.height / 2.0).max(b.y - b.height / 2.0);
    let bottom = (a.y + a.height / 2.0).min(b.y + b.height / 2.0);

    let intersection = (right - left).max(0.0) * (bottom - top).max(0.0);
    let union = a.width * a.height + b.width * b.height - intersection;

    if union <= 0.0 {
        0.0
    } else {
        intersection / union
    }
}

/// Greedy NMS; output is sorted by confidence, best first.
fn non_max_suppression(mut candidates: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<Detection> = Vec::new();
    for candidate in candidates {
        if kept.iter().all(|k| iou(k, &candidate) <= iou_threshold) {
            kept.push(candidate);
        }
    }
    kept
}
