//! File attachment storage.
//!
//! Order logic never touches the filesystem directly: uploads go through
//! the [`FileStore`] capability, which turns bytes into an opaque reference
//! string (`uploads/<name>`) persisted on the order record. The local-disk
//! implementation below can be swapped for an object store without touching
//! the handlers.

use async_trait::async_trait;
use axum::extract::Multipart;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use crate::error::ApiError;

/// MIME types accepted for uploads: common images, PDF, Word, Excel, CSV.
pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/webp",
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "text/csv",
];

fn ensure_allowed_mime(content_type: &str) -> Result<(), ApiError> {
    if ALLOWED_MIME_TYPES.contains(&content_type) {
        Ok(())
    } else {
        Err(ApiError::Validation(format!(
            "Unsupported file type \"{content_type}\": only images, PDF, Word, Excel, and CSV are allowed"
        )))
    }
}

#[async_trait]
pub trait FileStore: Send + Sync {
    /// Persist one uploaded file, returning the reference string stored on
    /// the owning record.
    async fn store(&self, original_filename: &str, data: &[u8]) -> Result<String, ApiError>;

    /// Read a stored file back by its reference.
    async fn load(&self, reference: &str) -> Result<Vec<u8>, ApiError>;
}

/// Turn a stored reference into a retrievable URL.
pub fn url_for(public_base_url: &str, reference: &str) -> String {
    format!("{}/{}", public_base_url.trim_end_matches('/'), reference)
}

#[derive(Debug, Clone)]
pub struct LocalDiskStore {
    base_dir: PathBuf,
    max_bytes: usize,
}

impl LocalDiskStore {
    /// Create the store, making the upload directory if missing.
    pub fn new(base_dir: PathBuf, max_bytes: usize) -> Result<Self, ApiError> {
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir, max_bytes })
    }

    /// Reject references that would escape the upload directory.
    fn safe_path(&self, file_name: &str) -> Result<PathBuf, ApiError> {
        let name = Path::new(file_name);
        for component in name.components() {
            match component {
                std::path::Component::Normal(_) => {}
                _ => {
                    return Err(ApiError::Validation(
                        "Invalid file reference".to_string(),
                    ))
                }
            }
        }
        Ok(self.base_dir.join(name))
    }
}

#[async_trait]
impl FileStore for LocalDiskStore {
    async fn store(&self, original_filename: &str, data: &[u8]) -> Result<String, ApiError> {
        if data.len() > self.max_bytes {
            return Err(ApiError::Validation(format!(
                "File too large: {} bytes (max {})",
                data.len(),
                self.max_bytes
            )));
        }

        // Unique name, original extension preserved.
        let ext = Path::new(original_filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{e}"))
            .unwrap_or_default();
        let name = format!("{}{}", Uuid::new_v4(), ext);

        let path = self.safe_path(&name)?;
        fs::write(&path, data).await?;

        debug!(name = %name, size = data.len(), "Stored upload");
        Ok(format!("uploads/{name}"))
    }

    async fn load(&self, reference: &str) -> Result<Vec<u8>, ApiError> {
        let name = reference.strip_prefix("uploads/").unwrap_or(reference);
        let path = self.safe_path(name)?;
        if !path.exists() {
            return Err(ApiError::NotFound("File not found".to_string()));
        }
        Ok(fs::read(&path).await?)
    }
}

/// A parsed multipart form: text fields collected into a JSON object (so
/// typed input structs can deserialize from it) and uploaded files stored
/// through the [`FileStore`], keyed by field name in request order.
#[derive(Debug, Default)]
pub struct FormPayload {
    pub fields: serde_json::Map<String, serde_json::Value>,
    pub files: HashMap<String, Vec<String>>,
}

impl FormPayload {
    /// First stored reference for a named file slot.
    pub fn file(&self, field: &str) -> Option<&str> {
        self.files.get(field)?.first().map(String::as_str)
    }

    /// Stored reference at a position in a repeated file slot
    /// (`productImages` is index-aligned with the products list).
    pub fn file_at(&self, field: &str, index: usize) -> Option<&str> {
        self.files.get(field)?.get(index).map(String::as_str)
    }
}

/// Drain a multipart request. File parts are MIME-checked and written to the
/// store immediately; a rejected part fails the whole request.
pub async fn collect_multipart(
    multipart: &mut Multipart,
    store: &dyn FileStore,
) -> Result<FormPayload, ApiError> {
    let mut payload = FormPayload::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Multipart error: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if let Some(filename) = field.file_name().map(|f| f.to_string()) {
            let content_type = field.content_type().unwrap_or_default().to_string();
            ensure_allowed_mime(&content_type)?;

            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::Validation(format!("Failed to read file field: {e}")))?;
            let reference = store.store(&filename, &data).await?;
            payload.files.entry(name).or_default().push(reference);
        } else {
            let text = field
                .text()
                .await
                .map_err(|e| ApiError::Validation(format!("Failed to read form field: {e}")))?;
            payload
                .fields
                .insert(name, serde_json::Value::String(text));
        }
    }

    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(max: usize) -> (tempfile::TempDir, LocalDiskStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LocalDiskStore::new(dir.path().to_path_buf(), max).expect("store");
        (dir, store)
    }

    #[tokio::test]
    async fn store_and_load_round_trip() {
        let (_dir, store) = temp_store(1024);
        let reference = store.store("techpack.pdf", b"pdf bytes").await.unwrap();
        assert!(reference.starts_with("uploads/"));
        assert!(reference.ends_with(".pdf"));

        let data = store.load(&reference).await.unwrap();
        assert_eq!(data, b"pdf bytes");
    }

    #[tokio::test]
    async fn oversized_upload_rejected() {
        let (_dir, store) = temp_store(4);
        let err = store.store("big.png", b"way too big").await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn traversal_reference_rejected() {
        let (_dir, store) = temp_store(1024);
        let err = store.load("uploads/../../etc/passwd").await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn mime_whitelist() {
        assert!(ensure_allowed_mime("image/png").is_ok());
        assert!(ensure_allowed_mime("text/csv").is_ok());
        assert!(ensure_allowed_mime("application/zip").is_err());
        assert!(ensure_allowed_mime("video/mp4").is_err());
    }

    #[test]
    fn url_join() {
        assert_eq!(
            url_for("http://localhost:8080/", "uploads/a.png"),
            "http://localhost:8080/uploads/a.png"
        );
    }
}
