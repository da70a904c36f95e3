use std::path::Path;
use std::sync::Arc;

use log::{error, info};
use ort::session::Session;

use super::classifier::Classifier;
use super::error::ClassifierError;
use super::head::ClassificationHead;
use super::preprocess::ImageTransform;
use crate::models::{BackboneCharacteristics, BuiltinBackbone};
use crate::runtime::{create_session_builder, RuntimeConfig};
use crate::ModelManager;

/// A builder for constructing a Classifier with a fluent interface.
///
/// A classifier needs two artifacts: a pretrained backbone (the ONNX feature
/// extractor, resolved through the [`ModelManager`] cache) and a fine-tuned
/// classification-head checkpoint. `build` refuses any combination whose
/// weight shapes do not line up.
#[derive(Default, Debug)]
pub struct ClassifierBuilder {
    backbone_name: Option<String>,
    backbone_path: Option<String>,
    checkpoint_path: Option<String>,
    session: Option<Session>,
    head: Option<ClassificationHead>,
    characteristics: Option<BackboneCharacteristics>,
    runtime_config: RuntimeConfig,
}

impl ClassifierBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the runtime configuration for ONNX model execution
    pub fn with_runtime_config(mut self, config: RuntimeConfig) -> Self {
        self.runtime_config = config;
        self
    }

    /// Sets the pretrained backbone using a built-in catalog entry.
    ///
    /// # Errors
    /// * The backbone is already set
    /// * The backbone is not downloaded (see [`ModelManager::download_backbone`])
    /// * The ONNX graph failed to load or has an invalid structure
    pub fn with_backbone(mut self, backbone: BuiltinBackbone) -> Result<Self, ClassifierError> {
        if self.backbone_path.is_some() {
            return Err(ClassifierError::BuildError(
                "Backbone already set".to_string(),
            ));
        }

        let manager = ModelManager::new_default().map_err(|e| {
            ClassifierError::BuildError(format!("Failed to create model manager: {}", e))
        })?;

        if !manager.is_backbone_downloaded(backbone) {
            return Err(ClassifierError::BuildError(format!(
                "Backbone '{:?}' is not downloaded. Please download it first using ModelManager::download_backbone()",
                backbone
            )));
        }

        let model_path = manager.backbone_path(backbone);
        let session = create_session_builder(&self.runtime_config)?
            .commit_from_file(&model_path)?;
        Self::validate_backbone(&session)?;
        info!("Backbone graph loaded and validated");

        self.backbone_name = Some(backbone.info().name);
        self.backbone_path = Some(model_path.to_string_lossy().to_string());
        self.characteristics = Some(backbone.characteristics());
        self.session = Some(session);
        Ok(self)
    }

    /// Sets a custom backbone from an explicit ONNX file, for offline use or
    /// backbones outside the built-in catalog. The caller supplies the
    /// preprocessing characteristics the graph was trained with.
    pub fn with_backbone_file(
        mut self,
        model_path: &str,
        characteristics: BackboneCharacteristics,
    ) -> Result<Self, ClassifierError> {
        if model_path.is_empty() {
            return Err(ClassifierError::BuildError(
                "Backbone path cannot be empty".to_string(),
            ));
        }
        if self.backbone_path.is_some() {
            return Err(ClassifierError::BuildError(
                "Backbone already set".to_string(),
            ));
        }
        if !Path::new(model_path).exists() {
            return Err(ClassifierError::BuildError(format!(
                "Backbone file not found: {}",
                model_path
            )));
        }

        let session = create_session_builder(&self.runtime_config)?
            .commit_from_file(model_path)?;
        Self::validate_backbone(&session)?;
        info!("Backbone graph loaded and validated");

        self.backbone_name = Some(
            Path::new(model_path)
                .file_stem()
                .map(|stem| stem.to_string_lossy().to_string())
                .unwrap_or_else(|| "custom".to_string()),
        );
        self.backbone_path = Some(model_path.to_string());
        self.characteristics = Some(characteristics);
        self.session = Some(session);
        Ok(self)
    }

    /// Loads the fine-tuned classification head from a safetensors checkpoint.
    ///
    /// # Errors
    /// * The checkpoint is already set
    /// * The file does not exist or is not a valid checkpoint
    /// * The contained tensors have the wrong dtype or inconsistent shapes
    pub fn with_checkpoint(mut self, checkpoint_path: &str) -> Result<Self, ClassifierError> {
        if checkpoint_path.is_empty() {
            return Err(ClassifierError::BuildError(
                "Checkpoint path cannot be empty".to_string(),
            ));
        }
        if self.checkpoint_path.is_some() {
            return Err(ClassifierError::BuildError(
                "Checkpoint already set".to_string(),
            ));
        }
        if !Path::new(checkpoint_path).exists() {
            return Err(ClassifierError::BuildError(format!(
                "Checkpoint file not found: {}",
                checkpoint_path
            )));
        }

        let head = ClassificationHead::from_file(checkpoint_path).map_err(|e| {
            error!("Failed to load classification head: {}", e);
            e
        })?;
        info!(
            "Classification head loaded: {} classes over {}-wide embeddings",
            head.num_classes(),
            head.input_size()
        );

        self.checkpoint_path = Some(checkpoint_path.to_string());
        self.head = Some(head);
        Ok(self)
    }

    /// Builds and returns the final Classifier instance
    ///
    /// # Errors
    /// * No backbone was set
    /// * No checkpoint was set
    /// * The head's input width does not match the backbone's embedding size
    pub fn build(mut self) -> Result<Classifier, ClassifierError> {
        let session = self
            .session
            .take()
            .ok_or_else(|| ClassifierError::BuildError("Backbone must be set".to_string()))?;
        let head = self
            .head
            .take()
            .ok_or_else(|| ClassifierError::BuildError("Checkpoint must be set".to_string()))?;
        let characteristics = self
            .characteristics
            .take()
            .ok_or_else(|| ClassifierError::BuildError("Backbone characteristics not set".to_string()))?;
        let backbone_name = self.backbone_name.take().unwrap_or_else(|| "custom".to_string());

        head.validate_input_size(characteristics.embedding_size)?;

        Ok(Classifier {
            backbone_name,
            backbone_path: self.backbone_path.take().unwrap_or_default(),
            checkpoint_path: self.checkpoint_path.take().unwrap_or_default(),
            session: Arc::new(session),
            head: Arc::new(head),
            transform: ImageTransform::from_characteristics(&characteristics),
            characteristics,
        })
    }

    /// Validates that the graph has the expected input/output structure
    fn validate_backbone(session: &Session) -> Result<(), ClassifierError> {
        let inputs = &session.inputs;
        if inputs.is_empty() {
            return Err(ClassifierError::ModelError(
                "Backbone must have at least 1 input (pixel values), found 0".to_string(),
            ));
        }

        let outputs = &session.outputs;
        if outputs.is_empty() {
            return Err(ClassifierError::ModelError(
                "Backbone must have at least 1 output for embeddings".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use safetensors::tensor::TensorView;
    use safetensors::Dtype;
    use std::io::Write;
    use std::path::PathBuf;

    fn write_checkpoint(name: &str, classes: usize, embedding: usize) -> PathBuf {
        let weight: Vec<f32> = vec![0.5; classes * embedding];
        let bias: Vec<f32> = vec![0.0; classes];
        let weight_data: Vec<u8> = weight.iter().flat_map(|v| v.to_le_bytes()).collect();
        let bias_data: Vec<u8> = bias.iter().flat_map(|v| v.to_le_bytes()).collect();
        let tensors = vec![
            (
                "classifier.weight",
                TensorView::new(Dtype::F32, vec![classes, embedding], &weight_data).unwrap(),
            ),
            (
                "classifier.bias",
                TensorView::new(Dtype::F32, vec![classes], &bias_data).unwrap(),
            ),
        ];
        let bytes = safetensors::serialize(tensors, &None).unwrap();

        let path = std::env::temp_dir().join(format!(
            "dermascan-ckpt-{}-{}.safetensors",
            std::process::id(),
            name
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(&bytes).unwrap();
        path
    }

    #[test]
    fn test_missing_checkpoint_file() {
        let result = ClassifierBuilder::new().with_checkpoint("/nonexistent/head.safetensors");
        assert!(matches!(result, Err(ClassifierError::BuildError(_))));
    }

    #[test]
    fn test_empty_checkpoint_path() {
        let result = ClassifierBuilder::new().with_checkpoint("");
        assert!(matches!(result, Err(ClassifierError::BuildError(_))));
    }

    #[test]
    fn test_checkpoint_already_set() {
        let path = write_checkpoint("twice", 4, 8);
        let builder = ClassifierBuilder::new()
            .with_checkpoint(path.to_str().unwrap())
            .unwrap();
        let result = builder.with_checkpoint(path.to_str().unwrap());
        assert!(matches!(result, Err(ClassifierError::BuildError(_))));
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_build_requires_backbone() {
        let path = write_checkpoint("no-backbone", 4, 8);
        let builder = ClassifierBuilder::new()
            .with_checkpoint(path.to_str().unwrap())
            .unwrap();
        let result = builder.build();
        assert!(matches!(result, Err(ClassifierError::BuildError(_))));
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_missing_backbone_file() {
        let characteristics = BuiltinBackbone::Dinov2Base.characteristics();
        let result =
            ClassifierBuilder::new().with_backbone_file("/nonexistent/model.onnx", characteristics);
        assert!(matches!(result, Err(ClassifierError::BuildError(_))));
    }
}
