pub mod ai_service;
pub mod detector; // Breed detector (ONNX)
pub mod gemini; // Google Gemini text generation
pub mod nutrition;

pub use ai_service::TextGenerator;
pub use detector::{Detector, OnnxDetector};
pub use gemini::GeminiService;
