use crate::config::StorageSettings;
use crate::utils::{http, AppError, AppResult};

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
const ALLOWED_IMAGE_TYPES: [(&str, &str); 3] = [
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/webp", "webp"),
];

/// File extension for an accepted image content type.
pub fn image_extension(content_type: &str) -> AppResult<&'static str> {
    let mime = content_type.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    ALLOWED_IMAGE_TYPES
        .iter()
        .find(|(allowed, _)| *allowed == mime)
        .map(|(_, ext)| *ext)
        .ok_or_else(|| {
            AppError::InvalidRequest(format!(
                "Unsupported image type '{}'. Use PNG, JPEG or WebP",
                content_type
            ))
        })
}

/// Object storage over plain HTTP: `PUT {endpoint}/{bucket}/{key}` with a bearer token.
pub struct ObjectStorage {
    settings: Option<StorageSettings>,
}

impl ObjectStorage {
    pub fn new(settings: Option<StorageSettings>) -> Self {
        Self { settings }
    }

    /// Uploads the object and returns its public URL.
    pub async fn put_object(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> AppResult<String> {
        let settings = self
            .settings
            .as_ref()
            .ok_or_else(|| AppError::ConfigError("Object storage is not configured".to_string()))?;

        let url = format!(
            "{}/{}/{}",
            settings.endpoint.trim_end_matches('/'),
            settings.bucket,
            key
        );

        log::info!("☁️  Uploading {} bytes to {}", bytes.len(), url);

        let response = http::client()
            .put(&url)
            .bearer_auth(&settings.token)
            .header("Content-Type", content_type)
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::ExternalError(format!(
                "Object storage upload failed: {}",
                response.status()
            )));
        }

        Ok(format!("{}/{}", settings.public_url.trim_end_matches('/'), key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_extension() {
        assert_eq!(image_extension("image/png").unwrap(), "png");
        assert_eq!(image_extension("IMAGE/JPEG").unwrap(), "jpg");
        assert_eq!(image_extension("image/webp; charset=binary").unwrap(), "webp");
        assert!(image_extension("image/gif").is_err());
        assert!(image_extension("").is_err());
    }

    #[tokio::test]
    async fn test_unconfigured_storage() {
        let storage = ObjectStorage::new(None);
        let err = storage.put_object("k.png", vec![1, 2, 3], "image/png").await.unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }
}
