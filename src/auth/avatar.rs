// Avatar payload decoding and storage

use std::path::{Component, Path, PathBuf};

use axum::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::auth::error::AuthError;

/// Largest accepted avatar, after base64 decoding
pub const MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;

/// Request body limit for avatar uploads: base64 of the largest image plus
/// room for a `data:` prefix and the JSON envelope
pub const MAX_AVATAR_REQUEST_BYTES: usize = (MAX_AVATAR_BYTES + 2) / 3 * 4 + 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Webp,
}

impl ImageFormat {
    /// Identify an image by its leading signature bytes
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        const PNG: &[u8] = b"\x89PNG\r\n\x1a\n";

        if bytes.starts_with(PNG) {
            Some(ImageFormat::Png)
        } else if bytes.len() > 3 && bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageFormat::Jpeg)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(ImageFormat::Gif)
        } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(ImageFormat::Webp)
        } else {
            None
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Gif => "gif",
            ImageFormat::Webp => "webp",
        }
    }
}

/// A decoded, recognised avatar image
#[derive(Debug, Clone)]
pub struct AvatarImage {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
}

impl AvatarImage {
    /// Decode a base64 payload, optionally wrapped as a `data:` URL
    pub fn decode(payload: &str) -> Result<Self, AuthError> {
        let payload = payload.trim();
        if payload.is_empty() {
            return Err(AuthError::InvalidImage("image payload is empty".to_string()));
        }

        let encoded = match payload.strip_prefix("data:") {
            Some(rest) => rest
                .split_once(";base64,")
                .map(|(_, data)| data)
                .ok_or_else(|| AuthError::InvalidImage("data URL must be base64 encoded".to_string()))?,
            None => payload,
        };

        let bytes = STANDARD
            .decode(encoded)
            .map_err(|_| AuthError::InvalidImage("image is not valid base64".to_string()))?;

        if bytes.is_empty() {
            return Err(AuthError::InvalidImage("image payload is empty".to_string()));
        }
        if bytes.len() > MAX_AVATAR_BYTES {
            return Err(AuthError::InvalidImage(format!(
                "image exceeds {} bytes",
                MAX_AVATAR_BYTES
            )));
        }

        let format = ImageFormat::sniff(&bytes).ok_or_else(|| {
            AuthError::InvalidImage("expected a PNG, JPEG, GIF or WebP image".to_string())
        })?;

        Ok(Self { bytes, format })
    }

    /// Content-addressed storage key under the owner's prefix
    pub fn storage_key(&self, user_id: Uuid) -> String {
        let digest = Sha256::digest(&self.bytes);
        let hex = format!("{:x}", digest);
        format!("avatars/{}/{}.{}", user_id, &hex[..16], self.format.extension())
    }
}

/// Object storage for avatar images, addressed by key
#[async_trait]
pub trait AvatarStorage: Send + Sync {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), AuthError>;

    async fn remove(&self, key: &str) -> Result<(), AuthError>;
}

/// Stores avatars as files below a root directory
pub struct LocalAvatarStorage {
    root: PathBuf,
}

impl LocalAvatarStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, AuthError> {
        let relative = Path::new(key);
        if !relative.components().all(|c| matches!(c, Component::Normal(_))) {
            return Err(AuthError::StorageError(format!("refusing storage key {}", key)));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl AvatarStorage for LocalAvatarStorage {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), AuthError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AuthError::StorageError(e.to_string()))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| AuthError::StorageError(e.to_string()))
    }

    async fn remove(&self, key: &str) -> Result<(), AuthError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AuthError::StorageError(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR";

    #[test]
    fn test_sniff_known_formats() {
        assert_eq!(ImageFormat::sniff(PNG_BYTES), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::sniff(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00]), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::sniff(b"GIF89a\x01\x00"), Some(ImageFormat::Gif));
        assert_eq!(ImageFormat::sniff(b"RIFF\x10\x00\x00\x00WEBPVP8 "), Some(ImageFormat::Webp));
        assert_eq!(ImageFormat::sniff(b"%PDF-1.7"), None);
        assert_eq!(ImageFormat::sniff(b""), None);
    }

    #[test]
    fn test_decode_plain_and_data_url() {
        let encoded = STANDARD.encode(PNG_BYTES);

        let plain = AvatarImage::decode(&encoded).unwrap();
        assert_eq!(plain.format, ImageFormat::Png);
        assert_eq!(plain.bytes, PNG_BYTES);

        let data_url = AvatarImage::decode(&format!("data:image/png;base64,{}", encoded)).unwrap();
        assert_eq!(data_url.bytes, PNG_BYTES);
    }

    #[test]
    fn test_decode_rejects_bad_payloads() {
        assert!(matches!(AvatarImage::decode(""), Err(AuthError::InvalidImage(_))));
        assert!(matches!(AvatarImage::decode("!!not base64!!"), Err(AuthError::InvalidImage(_))));
        assert!(matches!(
            AvatarImage::decode(&STANDARD.encode(b"plain text, not an image")),
            Err(AuthError::InvalidImage(_))
        ));
        assert!(matches!(
            AvatarImage::decode("data:image/png,rawbytes"),
            Err(AuthError::InvalidImage(_))
        ));
    }

    fn png_of_len(len: usize) -> Vec<u8> {
        let mut bytes = PNG_BYTES.to_vec();
        bytes.resize(len, 0);
        bytes
    }

    #[test]
    fn test_decode_size_limit() {
        let at_limit = AvatarImage::decode(&STANDARD.encode(png_of_len(MAX_AVATAR_BYTES))).unwrap();
        assert_eq!(at_limit.bytes.len(), MAX_AVATAR_BYTES);

        assert!(matches!(
            AvatarImage::decode(&STANDARD.encode(png_of_len(MAX_AVATAR_BYTES + 1))),
            Err(AuthError::InvalidImage(_))
        ));
    }

    #[test]
    fn test_request_limit_fits_largest_data_url() {
        let encoded = STANDARD.encode(png_of_len(MAX_AVATAR_BYTES));
        let body = serde_json::json!({ "image": format!("data:image/png;base64,{}", encoded) }).to_string();
        assert!(body.len() <= MAX_AVATAR_REQUEST_BYTES);
    }

    #[test]
    fn test_storage_key_is_content_addressed() {
        let user_id = Uuid::new_v4();
        let image = AvatarImage::decode(&STANDARD.encode(PNG_BYTES)).unwrap();
        let key = image.storage_key(user_id);

        assert!(key.starts_with(&format!("avatars/{}/", user_id)));
        assert!(key.ends_with(".png"));
        assert_eq!(key, image.storage_key(user_id));
    }

    #[test]
    fn test_local_storage_refuses_escaping_keys() {
        let storage = LocalAvatarStorage::new("/tmp/avatars");
        assert!(storage.path_for("../etc/passwd").is_err());
        assert!(storage.path_for("/etc/passwd").is_err());
        assert!(storage.path_for("avatars/a/b.png").is_ok());
    }

    #[tokio::test]
    async fn test_local_storage_put_and_remove() {
        let root = std::env::temp_dir().join(format!("avatar-test-{}", Uuid::new_v4()));
        let storage = LocalAvatarStorage::new(&root);

        storage.put("avatars/u/one.png", PNG_BYTES).await.unwrap();
        assert_eq!(tokio::fs::read(root.join("avatars/u/one.png")).await.unwrap(), PNG_BYTES);

        storage.remove("avatars/u/one.png").await.unwrap();
        assert!(!root.join("avatars/u/one.png").exists());
        // Removing twice is fine
        storage.remove("avatars/u/one.png").await.unwrap();

        let _ = tokio::fs::remove_dir_all(&root).await;
    }
}
