//! Selected media files, the upload allow-list and related naming rules.

use std::{fmt, path::Path, sync::Arc, sync::LazyLock};

use anyhow::{Context, Result};
use regex::Regex;
use shared::domain::MediaKind;

use crate::error::ValidationError;

pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "video/mp4",
    "video/avi",
    "video/mov",
    "video/wmv",
    "audio/mp3",
    "audio/wav",
    "audio/m4a",
];

static ALLOWED_EXTENSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.(mp4|avi|mov|wmv|mp3|wav|m4a)$").expect("static extension pattern")
});

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static email pattern"));

/// A user-selected clip. Cloning shares the bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub name: String,
    pub mime_type: Option<String>,
    pub data: Arc<[u8]>,
}

impl fmt::Debug for MediaFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaFile")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.data.len())
            .finish()
    }
}

impl MediaFile {
    pub fn new(name: impl Into<String>, mime_type: Option<&str>, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.map(str::to_string),
            data: data.into(),
        }
    }

    pub async fn from_path(path: &Path) -> Result<Self> {
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read media file '{}'", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("'{}' has no file name", path.display()))?;
        let mime_type = mime_guess::from_path(path)
            .first()
            .map(|mime| mime.essence_str().to_string());
        Ok(Self::new(name, mime_type.as_deref(), data))
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Video only when the MIME type says so, mirroring how the player decides what to mount.
    pub fn kind(&self) -> MediaKind {
        match self.mime_type.as_deref() {
            Some(mime) if mime.starts_with("video/") => MediaKind::Video,
            Some(mime) if mime.starts_with("audio/") => MediaKind::Audio,
            _ => match extension(&self.name).as_deref() {
                Some("mp4" | "avi" | "mov" | "wmv") => MediaKind::Video,
                _ => MediaKind::Audio,
            },
        }
    }

    pub fn extension(&self) -> Option<String> {
        extension(&self.name)
    }
}

fn extension(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
}

/// MIME type OR extension must be on the allow-list; either one is enough.
pub fn validate_media(file: &MediaFile) -> Result<(), ValidationError> {
    let mime_allowed = file
        .mime_type
        .as_deref()
        .is_some_and(|mime| ALLOWED_MIME_TYPES.contains(&mime));
    if mime_allowed || ALLOWED_EXTENSION.is_match(&file.name) {
        Ok(())
    } else {
        Err(ValidationError::UnsupportedMedia {
            file_name: file.name.clone(),
        })
    }
}

pub fn is_valid_email(address: &str) -> bool {
    EMAIL_PATTERN.is_match(address)
}

/// `<stem>_<target label>.<ext>`, the stem being everything before the first dot.
pub fn download_file_name(original_name: &str, target_label: &str, kind: MediaKind) -> String {
    let stem = original_name.split('.').next().unwrap_or_default();
    format!("{stem}_{target_label}.{}", kind.result_extension())
}
