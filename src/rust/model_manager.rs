use std::path::{Path, PathBuf};
use std::fs;
use std::io;
use std::sync::Arc;
use std::env;
use tokio::sync::Mutex;
use sha2::{Sha256, Digest};

use crate::models::{BuiltinModel, ModelInfo};

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Model not downloaded: {0}")]
    NotDownloaded(String),
    #[error("Download error: {0}")]
    DownloadError(#[from] reqwest::Error),
    #[error("Download of {file_type} file failed with HTTP status {status}")]
    HttpStatus {
        file_type: String,
        status: reqwest::StatusCode,
    },
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Model verification failed")]
    VerificationFailed,
    #[error("Hash mismatch: expected {expected}, got {actual} for {file_type} file")]
    HashMismatch {
        file_type: String,
        expected: String,
        actual: String,
    },
}

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
        if let Ok(path) = env::var("PLASTIC_ID_CACHE") {
            return PathBuf::from(path).join("models");
        }

        if let Some(cache_dir) = dirs::cache_dir() {
            return cache_dir.join("plastic-id").join("models");
        }

        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(".cache").join("plastic-id").join("models");
        }

        env::temp_dir().join("plastic-id").join("models")
    }

    pub fn new<P: AsRef<Path>>(models_dir: P) -> io::Result<Self> {
        let models_dir = models_dir.as_ref().to_path_buf();
        fs::create_dir_all(&models_dir)?;
        Ok(Self {
            models_dir,
            download_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    pub fn get_model_path(&self, model_name: &str) -> PathBuf {
        self.models_dir.join(model_name).join("model.onnx")
    }

    pub fn get_labels_path(&self, model_name: &str) -> PathBuf {
        self.models_dir.join(model_name).join("labels.txt")
    }

    pub fn is_model_downloaded(&self, model_name: &str) -> bool {
        let model_path = self.get_model_path(model_name);
        let labels_path = self.get_labels_path(model_name);
        log::debug!("Model path: {:?} (exists: {})", model_path, model_path.exists());
        log::debug!("Labels path: {:?} (exists: {})", labels_path, labels_path.exists());
        model_path.exists() && labels_path.exists()
    }

    pub async fn download_model(&self, info: &ModelInfo) -> Result<(), ModelError> {
        let _lock = self.download_lock.lock().await;

        let model_dir = self.models_dir.join(&info.name);
        log::info!("Creating model directory at {:?}", model_dir);
        fs::create_dir_all(&model_dir)?;

        let model_path = self.get_model_path(&info.name);
        let model_result = self
            .fetch_if_needed(&info.model_url, &model_path, info.model_hash.as_deref(), "model")
            .await;

        let labels_path = self.get_labels_path(&info.name);
        let labels_result = match &model_result {
            Ok(()) => {
                self.fetch_if_needed(&info.labels_url, &labels_path, info.labels_hash.as_deref(), "labels")
                    .await
            }
            Err(_) => Ok(()),
        };

        match (model_result, labels_result) {
            (Ok(()), Ok(())) => {
                log::info!("Model '{}' and labels ready to use", info.name);
                Ok(())
            }
            (Err(e), _) => {
                log::error!("Failed to set up model file: {}", e);
                self.discard_partial_download(&info.name);
                Err(e)
            }
            (_, Err(e)) => {
                log::error!("Failed to set up labels file: {}", e);
                self.discard_partial_download(&info.name);
                Err(e)
            }
        }
    }

    async fn fetch_if_needed(
        &self,
        url: &str,
        path: &Path,
        expected_hash: Option<&str>,
        file_type: &str,
    ) -> Result<(), ModelError> {
        if path.exists() {
            if self.verify_file(path, expected_hash)? {
                log::info!("Existing {} file verified at {:?}", file_type, path);
                return Ok(());
            }
            log::warn!("{} file verification failed, redownloading", file_type);
        }
        self.download_and_verify_file(url, path, expected_hash, file_type).await
    }

    fn verify_file(&self, path: &Path, expected_hash: Option<&str>) -> Result<bool, ModelError> {
        let bytes = fs::read(path)?;
        if bytes.is_empty() {
            return Ok(false);
        }
        match expected_hash {
            Some(expected) => {
                let hash = sha256_hex(&bytes);
                log::debug!("Calculated hash {} for {:?}, expected {}", hash, path, expected);
                Ok(hash == expected)
            }
            None => {
                log::debug!("No pinned checksum for {:?}, accepting {} bytes", path, bytes.len());
                Ok(true)
            }
        }
    }

    pub fn verify_model(&self, info: &ModelInfo) -> Result<bool, ModelError> {
        let model_path = self.get_model_path(&info.name);
        let labels_path = self.get_labels_path(&info.name);

        if !model_path.exists() || !labels_path.exists() {
            log::info!("Model files for '{}' are missing", info.name);
            return Ok(false);
        }

        let model_ok = self.verify_file(&model_path, info.model_hash.as_deref())?;
        let labels_ok = self.verify_file(&labels_path, info.labels_hash.as_deref())?;
        log::info!("Verification of '{}': model {}, labels {}", info.name, model_ok, labels_ok);

        Ok(model_ok && labels_ok)
    }

    async fn download_and_verify_file(
        &self,
        url: &str,
        path: &Path,
        expected_hash: Option<&str>,
        file_type: &str,
    ) -> Result<(), ModelError> {
        log::info!("Downloading {} file from {} to {:?}", file_type, url, path);
        let response = reqwest::get(url).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ModelError::HttpStatus {
                file_type: file_type.to_string(),
                status,
            });
        }
        let bytes = response.bytes().await?;
        log::info!("Downloaded {} bytes", bytes.len());

        if let Some(expected) = expected_hash {
            let hash = sha256_hex(&bytes);
            if hash != expected {
                log::error!("{} hash mismatch: expected {}, got {}", file_type, expected, hash);
                return Err(ModelError::HashMismatch {
                    file_type: file_type.to_string(),
                    expected: expected.to_string(),
                    actual: hash,
                });
            }
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, &bytes)?;

        if !self.verify_file(path, expected_hash)? {
            return Err(ModelError::VerificationFailed);
        }

        log::info!("{} file downloaded and verified successfully", file_type);
        Ok(())
    }

    fn discard_partial_download(&self, model_name: &str) {
        if let Err(e) = self.remove_download(model_name) {
            log::warn!("Could not clean up partial download of '{}': {}", model_name, e);
        }
    }

    pub fn remove_download(&self, model_name: &str) -> Result<(), ModelError> {
        let model_path = self.get_model_path(model_name);
        let labels_path = self.get_labels_path(model_name);

        if model_path.exists() {
            fs::remove_file(&model_path)?;
        }
        if labels_path.exists() {
            fs::remove_file(&labels_path)?;
        }
        Ok(())
    }

    /// Ensures that a model is downloaded and verified.
    /// If the model doesn't exist, it will be downloaded.
    /// If verification fails, it will be re-downloaded.
    pub async fn ensure_model_downloaded(&self, model: BuiltinModel) -> Result<(PathBuf, PathBuf), ModelError> {
        let info = model.get_model_info();
        if !self.is_model_downloaded(&info.name) {
            log::info!("Model {:?} not found, downloading...", model);
            self.download_model(&info).await?;
        } else if !self.verify_model(&info)? {
            log::info!("Model {:?} verification failed, re-downloading...", model);
            self.remove_download(&info.name)?;
            self.download_model(&info).await?;
        }

        if !self.is_model_downloaded(&info.name) {
            return Err(ModelError::NotDownloaded(info.name));
        }
        Ok((self.get_model_path(&info.name), self.get_labels_path(&info.name)))
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
