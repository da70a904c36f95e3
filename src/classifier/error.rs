use ort::Error as OrtError;
use std::fmt;

/// Failures across the image classification pipeline, from artifact loading
/// through a single forward pass.
#[derive(Debug)]
pub enum ClassifierError {
    /// The supplied bytes are not a supported image format
    DecodeError(String),
    /// A decoded image failed a sanity check before inference
    ValidationError(String),
    /// The backbone and checkpoint could not be assembled into a classifier
    BuildError(String),
    /// The checkpoint head and the backbone disagree on embedding width
    ShapeMismatch { head: usize, backbone: usize },
    /// The ONNX session failed to load or run
    ModelError(String),
    /// The forward pass ran but produced no usable class scores
    PredictionError(String),
}

impl fmt::Display for ClassifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DecodeError(msg) => write!(f, "Decode error: {}", msg),
            Self::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            Self::BuildError(msg) => write!(f, "Build error: {}", msg),
            Self::ShapeMismatch { head, backbone } => write!(
                f,
                "Shape mismatch: classification head expects {}-wide embeddings but the backbone produces {}",
                head, backbone
            ),
            Self::ModelError(msg) => write!(f, "Model error: {}", msg),
            Self::PredictionError(msg) => write!(f, "Prediction error: {}", msg),
        }
    }
}

impl std::error::Error for ClassifierError {}

impl From<OrtError> for ClassifierError {
    fn from(err: OrtError) -> Self {
        ClassifierError::ModelError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_mismatch_names_both_widths() {
        let message = ClassifierError::ShapeMismatch {
            head: 1536,
            backbone: 768,
        }
        .to_string();
        assert!(message.contains("1536"));
        assert!(message.contains("768"));
    }
}
