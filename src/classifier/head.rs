use std::path::Path;

use ndarray::{Array1, Array2};
use safetensors::{Dtype, SafeTensors};

use super::error::ClassifierError;

pub(crate) const WEIGHT_TENSOR: &str = "classifier.weight";
pub(crate) const BIAS_TENSOR: &str = "classifier.bias";

/// The fine-tuned linear classification head layered on top of the backbone:
/// `logits = weight · embedding + bias`.
///
/// Loaded from a safetensors checkpoint holding `classifier.weight` with
/// shape `[classes, embedding]` and `classifier.bias` with shape `[classes]`,
/// both f32.
#[derive(Debug, Clone)]
pub struct ClassificationHead {
    weight: Array2<f32>,
    bias: Array1<f32>,
}

impl ClassificationHead {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ClassifierError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            ClassifierError::BuildError(format!("Failed to read checkpoint {}: {}", path.display(), e))
        })?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ClassifierError> {
        let tensors = SafeTensors::deserialize(bytes)
            .map_err(|e| ClassifierError::BuildError(format!("Invalid checkpoint: {}", e)))?;

        let (weight_shape, weight_data) = extract_f32(&tensors, WEIGHT_TENSOR)?;
        let (bias_shape, bias_data) = extract_f32(&tensors, BIAS_TENSOR)?;

        if weight_shape.len() != 2 {
            return Err(ClassifierError::BuildError(format!(
                "Tensor '{}' must be 2-dimensional, found shape {:?}",
                WEIGHT_TENSOR, weight_shape
            )));
        }
        if bias_shape.len() != 1 {
            return Err(ClassifierError::BuildError(format!(
                "Tensor '{}' must be 1-dimensional, found shape {:?}",
                BIAS_TENSOR, bias_shape
            )));
        }
        if bias_shape[0] != weight_shape[0] {
            return Err(ClassifierError::BuildError(format!(
                "Bias covers {} classes but weight matrix covers {}",
                bias_shape[0], weight_shape[0]
            )));
        }

        let weight = Array2::from_shape_vec((weight_shape[0], weight_shape[1]), weight_data)
            .map_err(|e| ClassifierError::BuildError(format!("Malformed weight tensor: {}", e)))?;
        let bias = Array1::from_vec(bias_data);

        Ok(Self { weight, bias })
    }

    /// Number of classes the head scores, i.e. the service's output dimensionality.
    pub fn num_classes(&self) -> usize {
        self.weight.nrows()
    }

    /// Embedding width the head expects from the backbone.
    pub fn input_size(&self) -> usize {
        self.weight.ncols()
    }

    /// Rejects a head whose input width does not match the backbone's output.
    pub(crate) fn validate_input_size(&self, embedding_size: usize) -> Result<(), ClassifierError> {
        if self.input_size() != embedding_size {
            return Err(ClassifierError::ShapeMismatch {
                head: self.input_size(),
                backbone: embedding_size,
            });
        }
        Ok(())
    }

    pub fn forward(&self, embedding: &Array1<f32>) -> Array1<f32> {
        self.weight.dot(embedding) + &self.bias
    }
}

fn extract_f32(
    tensors: &SafeTensors,
    name: &str,
) -> Result<(Vec<usize>, Vec<f32>), ClassifierError> {
    let view = tensors.tensor(name).map_err(|e| {
        ClassifierError::BuildError(format!("Checkpoint missing tensor '{}': {}", name, e))
    })?;
    if view.dtype() != Dtype::F32 {
        return Err(ClassifierError::BuildError(format!(
            "Tensor '{}' must be f32, found {:?}",
            name,
            view.dtype()
        )));
    }
    let data = view
        .data()
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();
    Ok((view.shape().to_vec(), data))
}
