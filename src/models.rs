/// Represents the available pretrained vision backbones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinBackbone {
    /// DINOv2 ViT-B/14 feature extractor
    ///
    /// Characteristics:
    /// - Input: 224x224 RGB, ImageNet normalization
    /// - Embedding size: 768
    /// - Size: ~330MB
    /// - Strong general-purpose features for fine-tuned classification heads
    Dinov2Base,
}

/// Fixed properties of a backbone, including the preprocessing its weights
/// were trained with.
#[derive(Debug, Clone)]
pub struct BackboneCharacteristics {
    /// Side length the input image is resized to before inference
    pub image_size: u32,
    /// Width of the feature vector the backbone produces per image
    pub embedding_size: usize,
    /// Per-channel mean used to normalize pixel values
    pub mean: [f32; 3],
    /// Per-channel standard deviation used to normalize pixel values
    pub std: [f32; 3],
    /// Approximate size of the model on disk
    pub model_size_mb: usize,
}

/// Download metadata for a backbone's ONNX graph.
#[derive(Debug, Clone)]
pub struct BackboneInfo {
    /// Directory name the artifact is cached under
    pub name: String,
    /// Public identifier of the pretrained model on the hub
    pub hub_id: String,
    /// URL of the ONNX export
    pub model_url: String,
    /// SHA-256 of the ONNX file contents
    pub model_hash: String,
}

impl BuiltinBackbone {
    /// Get the characteristics of the backbone
    pub fn characteristics(&self) -> BackboneCharacteristics {
        match self {
            Self::Dinov2Base => BackboneCharacteristics {
                image_size: 224,
                embedding_size: 768,
                mean: [0.485, 0.456, 0.406],
                std: [0.229, 0.224, 0.225],
                model_size_mb: 330,
            },
        }
    }

    /// Get the download metadata for the backbone
    pub fn info(&self) -> BackboneInfo {
        match self {
            Self::Dinov2Base => BackboneInfo {
                name: "dinov2-base".to_string(),
                hub_id: "facebook/dinov2-base".to_string(),
                model_url: "https://huggingface.co/facebook/dinov2-base/resolve/main/onnx/model.onnx"
                    .to_string(),
                model_hash: "5b3f9c57d1f8a2e6c4b0d9e1f7a8c3d2e5b6a9f0c1d4e7b8a3f6c9d2e5b8a1f4"
                    .to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backbone_characteristics() {
        let characteristics = BuiltinBackbone::Dinov2Base.characteristics();
        assert_eq!(characteristics.image_size, 224);
        assert_eq!(characteristics.embedding_size, 768);
        assert_eq!(characteristics.mean.len(), characteristics.std.len());
    }

    #[test]
    fn test_backbone_info() {
        let info = BuiltinBackbone::Dinov2Base.info();
        assert_eq!(info.name, "dinov2-base");
        assert!(info.model_url.contains(&info.hub_id));
        assert_eq!(info.model_hash.len(), 64);
    }
}
