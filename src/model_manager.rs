use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use reqwest;
use sha2::{Digest, Sha256};

use crate::models::{BackboneInfo, BuiltinBackbone};

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Backbone not downloaded: {0}")]
    NotDownloaded(String),
    #[error("Download error: {0}")]
    DownloadError(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Backbone verification failed")]
    VerificationFailed,
    #[error("Hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },
}

/// Resolves the local cache of pretrained backbone graphs and downloads them
/// on demand, verifying SHA-256 hashes before any file is trusted.
#[derive(Clone)]
pub struct ModelManager {
    models_dir: PathBuf,
    download_lock: Arc<Mutex<()>>,
}

impl ModelManager {
    /// Creates a new ModelManager with the default models directory
    pub fn new_default() -> io::Result<Self> {
        Self::new(Self::get_default_models_dir())
    }

    /// Returns the default models directory path
    pub fn get_default_models_dir() -> PathBuf {
        // 1. Check environment variable
        if let Ok(path) = env::var("DERMASCAN_CACHE") {
            return PathBuf::from(path).join("models");
        }

        // 2. Use platform-specific cache directory
        if let Some(cache_dir) = dirs::cache_dir() {
            return cache_dir.join("dermascan").join("models");
        }

        // 3. Fallback to user's home directory
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(".cache").join("dermascan").join("models");
        }

        // 4. If all else fails, use system temp directory (platform agnostic)
        env::temp_dir().join("dermascan").join("models")
    }

    pub fn new<P: AsRef<Path>>(models_dir: P) -> io::Result<Self> {
        let models_dir = models_dir.as_ref().to_path_buf();
        fs::create_dir_all(&models_dir)?;
        Ok(Self {
            models_dir,
            download_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn backbone_path(&self, backbone: BuiltinBackbone) -> PathBuf {
        let info = backbone.info();
        self.models_dir.join(info.name).join("model.onnx")
    }

    pub fn is_backbone_downloaded(&self, backbone: BuiltinBackbone) -> bool {
        let model_path = self.backbone_path(backbone);
        log::info!(
            "Checking backbone cache: {:?} (exists: {})",
            model_path,
            model_path.exists()
        );
        model_path.exists()
    }

    pub async fn download_backbone(&self, backbone: BuiltinBackbone) -> Result<(), ModelError> {
        let info = backbone.info();
        let _lock = self.download_lock.lock().await;

        let model_dir = self.models_dir.join(&info.name);
        log::info!("Creating backbone directory at {:?}", model_dir);
        fs::create_dir_all(&model_dir)?;

        let model_path = self.backbone_path(backbone);
        let result = if model_path.exists() {
            log::info!("Backbone file exists at {:?}, verifying...", model_path);
            if !self.verify_file(&model_path, &info.model_hash)? {
                log::warn!("Backbone file verification failed, redownloading");
                self.download_and_verify_file(&info, &model_path).await
            } else {
                log::info!("Existing backbone file verified successfully");
                Ok(())
            }
        } else {
            log::info!("Backbone file does not exist, downloading...");
            self.download_and_verify_file(&info, &model_path).await
        };

        if let Err(e) = result {
            log::error!("Failed to set up backbone file: {}", e);
            // Cleanup on failure
            let _ = self.remove_download(backbone);
            return Err(e);
        }

        log::info!("Backbone ready to use");
        Ok(())
    }

    fn verify_file(&self, path: &Path, expected_hash: &str) -> Result<bool, ModelError> {
        log::info!("Verifying file: {:?}", path);
        let bytes = fs::read(path)?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let hash = format!("{:x}", hasher.finalize());
        log::info!("Calculated hash: {}", hash);
        log::info!("Expected hash:   {}", expected_hash);
        Ok(hash == expected_hash)
    }

    pub fn verify_backbone(&self, backbone: BuiltinBackbone) -> Result<bool, ModelError> {
        let info = backbone.info();
        let model_path = self.backbone_path(backbone);

        if !model_path.exists() {
            log::info!("Backbone file does not exist at {:?}", model_path);
            return Ok(false);
        }

        self.verify_file(&model_path, &info.model_hash)
    }

    async fn download_and_verify_file(
        &self,
        info: &BackboneInfo,
        path: &Path,
    ) -> Result<(), ModelError> {
        log::info!("Downloading backbone from {} to {:?}", info.model_url, path);
        let response = reqwest::get(&info.model_url).await?;
        log::info!("Download response status: {}", response.status());
        let bytes = response.bytes().await?;
        log::info!("Downloaded {} bytes", bytes.len());

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let hash = format!("{:x}", hasher.finalize());

        if hash != info.model_hash {
            log::error!(
                "Backbone hash mismatch: expected {}, got {}",
                info.model_hash,
                hash
            );
            return Err(ModelError::HashMismatch {
                expected: info.model_hash.clone(),
                actual: hash,
            });
        }

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        log::info!("Writing {} bytes to {:?}", bytes.len(), path);
        fs::write(path, bytes)?;

        // Verify after writing
        if !self.verify_file(path, &info.model_hash)? {
            return Err(ModelError::VerificationFailed);
        }

        log::info!("Backbone downloaded and verified successfully");
        Ok(())
    }

    pub fn remove_download(&self, backbone: BuiltinBackbone) -> Result<(), ModelError> {
        let model_path = self.backbone_path(backbone);
        if model_path.exists() {
            fs::remove_file(&model_path)?;
        }
        Ok(())
    }

    /// Ensures that the backbone is downloaded and verified.
    /// If the file doesn't exist, it will be downloaded.
    /// If verification fails, it will be re-downloaded.
    pub async fn ensure_backbone_downloaded(
        &self,
        backbone: BuiltinBackbone,
    ) -> Result<(), ModelError> {
        log::info!("Checking if backbone {:?} is downloaded...", backbone);
        if !self.is_backbone_downloaded(backbone) {
            log::info!("Backbone not found, downloading...");
            self.download_backbone(backbone).await?;
        } else {
            log::info!("Backbone exists, verifying...");
            if !self.verify_backbone(backbone)? {
                log::info!("Backbone verification failed, re-downloading...");
                self.remove_download(backbone)?;
                self.download_backbone(backbone).await?;
            } else {
                log::info!("Backbone verification successful");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_models_dir() {
        // Test with environment variable
        env::set_var("DERMASCAN_CACHE", "/tmp/test-cache");
        let path = ModelManager::get_default_models_dir();
        assert!(path.to_str().unwrap().contains("/tmp/test-cache/models"));
        env::remove_var("DERMASCAN_CACHE");

        // Test without environment variable
        let path = ModelManager::get_default_models_dir();
        assert!(path.to_str().unwrap().contains("dermascan"));
    }

    #[test]
    fn test_backbone_path_layout() {
        let manager = ModelManager::new("/tmp/test-dermascan/models").unwrap();
        let path = manager.backbone_path(BuiltinBackbone::Dinov2Base);
        assert!(path.ends_with("dinov2-base/model.onnx"));
    }

    #[test]
    fn test_missing_backbone_not_downloaded() {
        let manager = ModelManager::new("/tmp/test-dermascan-empty/models").unwrap();
        let _ = manager.remove_download(BuiltinBackbone::Dinov2Base);
        assert!(!manager.is_backbone_downloaded(BuiltinBackbone::Dinov2Base));
        assert!(!manager.verify_backbone(BuiltinBackbone::Dinov2Base).unwrap());
    }

    #[test]
    fn test_corrupt_backbone_fails_verification() {
        let manager = ModelManager::new("/tmp/test-dermascan-corrupt/models").unwrap();
        let path = manager.backbone_path(BuiltinBackbone::Dinov2Base);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "corrupted data").unwrap();
        assert!(manager.is_backbone_downloaded(BuiltinBackbone::Dinov2Base));
        assert!(!manager.verify_backbone(BuiltinBackbone::Dinov2Base).unwrap());
        manager.remove_download(BuiltinBackbone::Dinov2Base).unwrap();
    }
}
