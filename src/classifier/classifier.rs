use std::collections::HashMap;
use std::sync::Arc;

use image::DynamicImage;
use ndarray::{s, Array1};
use ort::session::Session;
use ort::value::Tensor;

use super::error::ClassifierError;
use super::head::ClassificationHead;
use super::preprocess::{decode_image, ImageTransform};
use super::utils::{argmax, softmax};
use super::{ClassifierInfo, Prediction, Predictor};
use crate::models::BackboneCharacteristics;

/// Input tensor name used by the backbone's ONNX export.
const INPUT_NAME: &str = "pixel_values";

/// A thread-safe image classifier: a pretrained ONNX backbone producing
/// per-image embeddings, plus a fine-tuned linear head scoring them.
///
/// # Thread Safety
///
/// This type is automatically `Send + Sync` because all of its fields are
/// thread-safe: `String`, `ImageTransform` and `BackboneCharacteristics` are
/// plain data, and the `Session` and `ClassificationHead` are wrapped in
/// `Arc`. Inference never mutates the session, so concurrent `predict` calls
/// need no locking.
///
/// ```rust,no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use dermascan::{Classifier, BuiltinBackbone};
/// use std::sync::Arc;
/// use std::thread;
///
/// let classifier = Arc::new(Classifier::builder()
///     .with_backbone(BuiltinBackbone::Dinov2Base)?
///     .with_checkpoint("data/classifier_head.safetensors")?
///     .build()?);
///
/// let classifier_clone = Arc::clone(&classifier);
/// thread::spawn(move || {
///     let bytes = std::fs::read("lesion.jpg").unwrap();
///     classifier_clone.predict_bytes(&bytes).unwrap();
/// });
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Classifier {
    pub backbone_name: String,
    pub backbone_path: String,
    pub checkpoint_path: String,
    pub session: Arc<Session>,
    pub head: Arc<ClassificationHead>,
    pub transform: ImageTransform,
    pub characteristics: BackboneCharacteristics,
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<Classifier>();
    }
};

impl Classifier {
    /// Creates a new ClassifierBuilder for fluent construction
    pub fn builder() -> super::builder::ClassifierBuilder {
        super::builder::ClassifierBuilder::new()
    }

    /// Returns information about the classifier's current state
    pub fn info(&self) -> ClassifierInfo {
        ClassifierInfo {
            backbone: self.backbone_name.clone(),
            checkpoint_path: self.checkpoint_path.clone(),
            num_classes: self.head.num_classes(),
            embedding_size: self.characteristics.embedding_size,
        }
    }

    pub fn num_classes(&self) -> usize {
        self.head.num_classes()
    }

    /// Classifies a decoded 3-channel image of arbitrary pixel dimensions.
    ///
    /// Runs the preprocessing transform, a single forward pass through the
    /// backbone, the classification head, and a softmax over the logits.
    /// Returns the winning class index together with its softmax probability.
    pub fn predict(&self, image: &DynamicImage) -> Result<Prediction, ClassifierError> {
        let embedding = self.embed_image(image)?;
        let logits = self.head.forward(&embedding);
        let probabilities = softmax(&logits);
        let (class_index, confidence) = argmax(&probabilities).ok_or_else(|| {
            ClassifierError::PredictionError("Model produced no class scores".into())
        })?;
        Ok(Prediction {
            class_index,
            confidence,
        })
    }

    /// Decodes raw uploaded bytes (forcing 3-channel color) and classifies them.
    pub fn predict_bytes(&self, bytes: &[u8]) -> Result<Prediction, ClassifierError> {
        let image = decode_image(bytes)?;
        self.predict(&image)
    }

    fn embed_image(&self, image: &DynamicImage) -> Result<Array1<f32>, ClassifierError> {
        let pixels = self.transform.apply(image)?;
        let input_dyn = pixels.into_dyn();
        let input_values = input_dyn.as_standard_layout();

        let mut input_tensors = HashMap::new();
        input_tensors.insert(
            INPUT_NAME,
            Tensor::from_array(&input_values).map_err(|e| {
                ClassifierError::ModelError(format!("Failed to create input tensor: {}", e))
            })?,
        );

        let outputs = self
            .session
            .run(input_tensors)
            .map_err(|e| ClassifierError::ModelError(format!("Failed to run backbone: {}", e)))?;
        let output_tensor = outputs[0].try_extract_tensor::<f32>().map_err(|e| {
            ClassifierError::ModelError(format!("Failed to extract output tensor: {}", e))
        })?;

        if output_tensor.ndim() != 3 {
            return Err(ClassifierError::ModelError(format!(
                "Backbone output must be [batch, tokens, embedding], found {} dimensions",
                output_tensor.ndim()
            )));
        }
        let width = output_tensor.shape()[2];
        if width != self.head.input_size() {
            return Err(ClassifierError::ShapeMismatch {
                head: self.head.input_size(),
                backbone: width,
            });
        }

        // The first token is the CLS embedding, used as the image's feature vector.
        let mut embedding = Array1::zeros(width);
        let cls = output_tensor.slice(s![0, 0, ..]);
        embedding.assign(&Array1::from_iter(cls.iter().cloned()));

        Ok(embedding)
    }
}

impl Predictor for Classifier {
    fn predict(&self, image: &DynamicImage) -> Result<Prediction, ClassifierError> {
        Classifier::predict(self, image)
    }

    fn num_classes(&self) -> usize {
        Classifier::num_classes(self)
    }
}
