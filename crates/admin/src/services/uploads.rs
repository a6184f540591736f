//! Uploaded files: type sniffing, size limits and storage.
//!
//! Images land in `STORAGE_DIR/images/` and are served publicly by the
//! storefront under `/media/images/`. Score PDFs land in
//! `STORAGE_DIR/scores/` and are only reachable through a paid download
//! link.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use partitur_core::storage::{IMAGES_DIR, SCORES_DIR};

use crate::config::UploadConfig;


/// Where the storefront serves `images/`.
const PUBLIC_IMAGES_PATH: &str = "/media/images";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("no file in field `file`")]
    MissingFile,

    #[error("file exceeds the {limit} byte limit")]
    TooLarge { limit: usize },

    #[error("unsupported file type, expected {expected}")]
    UnsupportedType { expected: &'static str },

    #[error("malformed upload: {0}")]
    Malformed(String),

    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),
}

/// File formats recognised by their leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Png,
    Jpeg,
    Webp,
    Pdf,
}

impl FileKind {
    /// Identify a file from its first bytes. The declared content type and
    /// file name are ignored.
    #[must_use]
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(Self::Png)
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Self::Jpeg)
        } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(Self::Webp)
        } else if bytes.starts_with(b"%PDF-") {
            Some(Self::Pdf)
        } else {
            None
        }
    }

    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Webp => "webp",
            Self::Pdf => "pdf",
        }
    }

    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
            Self::Pdf => "application/pdf",
        }
    }

    const fn is_image(self) -> bool {
        matches!(self, Self::Png | Self::Jpeg | Self::Webp)
    }
}

/// What an upload endpoint accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Logo,
    Image,
    Score,
}

impl UploadKind {
    /// Largest accepted file for this kind.
    #[must_use]
    pub const fn max_bytes(self, config: &UploadConfig) -> usize {
        match self {
            Self::Logo | Self::Image => config.max_image_bytes,
            Self::Score => config.max_pdf_bytes,
        }
    }

    const fn expected(self) -> &'static str {
        match self {
            Self::Logo | Self::Image => "PNG, JPEG or WebP",
            Self::Score => "PDF",
        }
    }

    const fn accepts(self, kind: FileKind) -> bool {
        match self {
            Self::Logo | Self::Image => kind.is_image(),
            Self::Score => matches!(kind, FileKind::Pdf),
        }
    }

    fn relative_path(self, kind: FileKind, id: Uuid) -> String {
        let ext = kind.extension();
        match self {
            Self::Logo => format!("{IMAGES_DIR}/logo-{id}.{ext}"),
            Self::Image => format!("{IMAGES_DIR}/{id}.{ext}"),
            Self::Score => format!("{SCORES_DIR}/{id}.{ext}"),
        }
    }
}

/// A file written to storage.
#[derive(Debug, Clone, Serialize)]
pub struct StoredFile {
    /// Relative to the storage root.
    pub path: String,
    /// Public URL; `None` for scores.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub content_type: &'static str,
    pub size: usize,
}

/// Validates and writes uploads under the storage root.
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
    public_base_url: String,
    limits: UploadConfig,
}

impl UploadStore {
    #[must_use]
    pub fn new(config: &UploadConfig, public_base_url: &str) -> Self {
        Self {
            root: config.storage_dir.clone(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            limits: config.clone(),
        }
    }

    #[must_use]
    pub const fn limits(&self) -> &UploadConfig {
        &self.limits
    }

    /// Check size and type of an upload.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::MissingFile` for an empty body,
    /// `UploadError::TooLarge` above the limit and
    /// `UploadError::UnsupportedType` when the bytes are not what `kind`
    /// accepts.
    pub fn validate(&self, kind: UploadKind, bytes: &[u8]) -> Result<FileKind, UploadError> {
        if bytes.is_empty() {
            return Err(UploadError::MissingFile);
        }
        let limit = kind.max_bytes(&self.limits);
        if bytes.len() > limit {
            return Err(UploadError::TooLarge { limit });
        }
        FileKind::sniff(bytes)
            .filter(|&file| kind.accepts(file))
            .ok_or(UploadError::UnsupportedType {
                expected: kind.expected(),
            })
    }

    /// Validate and write an upload under a fresh name.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Self::validate`] and `UploadError::Io` if
    /// the file cannot be written.
    pub async fn store(&self, kind: UploadKind, bytes: &[u8]) -> Result<StoredFile, UploadError> {
        let file = self.validate(kind, bytes)?;
        let path = kind.relative_path(file, Uuid::new_v4());
        let full_path = self.root.join(&path);

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full_path, bytes).await?;

        tracing::info!(path = %path, size = bytes.len(), "Stored upload");

        let url = match kind {
            UploadKind::Logo | UploadKind::Image => Some(self.public_url(&path)),
            UploadKind::Score => None,
        };

        Ok(StoredFile {
            path,
            url,
            content_type: file.content_type(),
            size: bytes.len(),
        })
    }

    fn public_url(&self, path: &str) -> String {
        let file = path
            .strip_prefix(IMAGES_DIR)
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(path);
        format!("{}{PUBLIC_IMAGES_PATH}/{file}", self.public_base_url)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    const PDF: &[u8] = b"%PDF-1.7\n%\xe2\xe3\xcf\xd3\n";

    fn store(name: &str) -> UploadStore {
        let config = UploadConfig {
            storage_dir: std::env::temp_dir().join(format!("partitur-upload-{name}-{}", Uuid::new_v4())),
            max_image_bytes: 64,
            max_pdf_bytes: 128,
        };
        UploadStore::new(&config, "https://partitur.id/")
    }

    #[test]
    fn test_sniff() {
        assert_eq!(FileKind::sniff(PNG), Some(FileKind::Png));
        assert_eq!(FileKind::sniff(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(FileKind::Jpeg));
        assert_eq!(FileKind::sniff(b"RIFF\x10\0\0\0WEBPVP8 "), Some(FileKind::Webp));
        assert_eq!(FileKind::sniff(PDF), Some(FileKind::Pdf));
        assert_eq!(FileKind::sniff(b"GIF89a"), None);
        assert_eq!(FileKind::sniff(b"RIFF"), None);
    }

    #[test]
    fn test_validate_type_and_size() {
        let store = store("validate");

        assert_eq!(store.validate(UploadKind::Image, PNG).unwrap(), FileKind::Png);
        assert!(matches!(
            store.validate(UploadKind::Image, PDF),
            Err(UploadError::UnsupportedType { .. })
        ));
        assert!(matches!(
            store.validate(UploadKind::Score, PNG),
            Err(UploadError::UnsupportedType { .. })
        ));
        assert!(matches!(
            store.validate(UploadKind::Logo, &[]),
            Err(UploadError::MissingFile)
        ));

        let mut big = PNG.to_vec();
        big.resize(65, 0);
        assert!(matches!(
            store.validate(UploadKind::Image, &big),
            Err(UploadError::TooLarge { limit: 64 })
        ));

        // The PDF limit is larger than the image limit.
        let mut pdf = PDF.to_vec();
        pdf.resize(100, b' ');
        assert!(store.validate(UploadKind::Score, &pdf).is_ok());
    }

    #[tokio::test]
    async fn test_store_logo_and_score() {
        let store = store("store");

        let logo = store.store(UploadKind::Logo, PNG).await.unwrap();
        assert!(logo.path.starts_with("images/logo-"));
        assert!(logo.path.ends_with(".png"));
        let url = logo.url.unwrap();
        assert!(url.starts_with("https://partitur.id/media/images/logo-"));
        assert!(store.root.join(&logo.path).exists());

        let score = store.store(UploadKind::Score, PDF).await.unwrap();
        assert!(score.path.starts_with("scores/"));
        assert!(score.path.ends_with(".pdf"));
        assert_eq!(score.url, None);
        assert_eq!(score.content_type, "application/pdf");

        tokio::fs::remove_dir_all(&store.root).await.unwrap();
    }
}
