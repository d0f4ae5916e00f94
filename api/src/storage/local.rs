use std::{io::ErrorKind, path::PathBuf};

use async_trait::async_trait;
use axum::body::Bytes;
use tokio::{fs, io::AsyncWriteExt};

use super::{ImageStorage, StorageError, ensure_image, object_key};

/// Stores images on the local file system; they are served back under
/// `<public_base>/uploads/<key>`.
pub struct LocalStorage {
    base_path: PathBuf,
    public_base: String,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>, site_url: &str) -> Self {
        Self {
            base_path: base_path.into(),
            public_base: format!("{}/uploads", site_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl ImageStorage for LocalStorage {
    async fn put(
        &self,
        file_name: Option<&str>,
        content_type: Option<&str>,
        data: Bytes,
    ) -> Result<String, StorageError> {
        let content_type = ensure_image(content_type)?;
        let key = object_key(file_name, content_type);

        fs::create_dir_all(&self.base_path).await?;

        let full_path = self.base_path.join(&key);
        let mut file = fs::File::create(&full_path).await?;
        file.write_all(&data).await?;
        file.flush().await?;

        tracing::debug!(path = ?full_path, size = data.len(), "stored uploaded image");

        Ok(format!("{}/{key}", self.public_base))
    }

    async fn remove(&self, location: &str) -> Result<bool, StorageError> {
        let Some(key) = location
            .strip_prefix(&self.public_base)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|key| !key.is_empty() && !key.contains(['/', '\\']) && *key != "..")
        else {
            return Ok(false);
        };

        let full_path = self.base_path.join(key);
        match fs::remove_file(&full_path).await {
            Ok(()) => {
                tracing::debug!(path = ?full_path, "removed uploaded image");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
