mod local;

pub use local::LocalStorage;

use async_trait::async_trait;
use axum::body::Bytes;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Unsupported content type `{0}`, expected an image")]
    UnsupportedContentType(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Where uploaded cover images end up. Returns the public location of the
/// stored object.
#[async_trait]
pub trait ImageStorage: Send + Sync {
    async fn put(
        &self,
        file_name: Option<&str>,
        content_type: Option<&str>,
        data: Bytes,
    ) -> Result<String, StorageError>;

    /// Removes an object previously returned by `put`. Locations this storage
    /// does not own, and objects already gone, are left alone and yield
    /// `false`.
    async fn remove(&self, location: &str) -> Result<bool, StorageError>;
}

/// Builds a collision-free object key, keeping the extension of the
/// uploaded file name when it has one.
pub fn object_key(file_name: Option<&str>, content_type: &str) -> String {
    let extension = file_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .or_else(|| {
            content_type
                .strip_prefix("image/")
                .map(|sub| sub.split('+').next().unwrap_or(sub).to_owned())
        });

    match extension {
        Some(ext) => format!("{}.{ext}", uuid::Uuid::new_v4()),
        None => uuid::Uuid::new_v4().to_string(),
    }
}

pub fn ensure_image(content_type: Option<&str>) -> Result<&str, StorageError> {
    match content_type {
        Some(ct) if ct.starts_with("image/") => Ok(ct),
        other => Err(StorageError::UnsupportedContentType(
            other.unwrap_or("unknown").to_owned(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_keeps_file_extension() {
        let key = object_key(Some("Cover.PNG"), "image/png");
        assert!(key.ends_with(".png"));
        assert_eq!(key.len(), 36 + 4);
    }

    #[test]
    fn key_falls_back_to_content_type() {
        assert!(object_key(Some("cover"), "image/svg+xml").ends_with(".svg"));
        assert!(object_key(None, "image/webp").ends_with(".webp"));
    }

    #[test]
    fn only_images_are_accepted() {
        assert!(ensure_image(Some("image/jpeg")).is_ok());
        assert!(matches!(
            ensure_image(Some("application/pdf")),
            Err(StorageError::UnsupportedContentType(ct)) if ct == "application/pdf"
        ));
        assert!(ensure_image(None).is_err());
    }
}
