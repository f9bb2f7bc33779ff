pub mod advisor;
pub mod detection;

pub use advisor::AdvisorHandler;
pub use detection::{DetectionHandler, PredictResponse};
