pub mod builder;
mod classifier;
mod error;
mod head;
mod preprocess;
mod utils;

pub use builder::ClassifierBuilder;
pub use classifier::Classifier;
pub use error::ClassifierError;
pub use head::ClassificationHead;
pub use preprocess::{decode_image, ImageTransform};

use image::DynamicImage;
use serde::Serialize;

/// Outcome of a single forward pass: the winning class index and its softmax
/// probability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    pub class_index: usize,
    pub confidence: f32,
}

/// The inference seam the HTTP layer depends on. Implementations must be
/// side-effect-free and safe for concurrent invocation.
pub trait Predictor: Send + Sync {
    fn predict(&self, image: &DynamicImage) -> Result<Prediction, ClassifierError>;
    fn num_classes(&self) -> usize;
}

/// Information about the current state and configuration of a classifier
#[derive(Debug, Clone, Serialize)]
pub struct ClassifierInfo {
    /// Name of the pretrained backbone
    pub backbone: String,
    /// Path to the fine-tuned head checkpoint
    pub checkpoint_path: String,
    /// Number of classes the classifier scores
    pub num_classes: usize,
    /// Width of the embedding vectors the backbone produces
    pub embedding_size: usize,
}
