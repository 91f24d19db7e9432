use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::Path;

/// Media kind enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Document,
}

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "tif", "tiff", "png", "bmp", "gif", "psd"];
const VIDEO_EXTENSIONS: &[&str] = &["mov", "mkv", "mp4", "avi", "mpg", "mpeg", "3pg", "vob"];
const AUDIO_EXTENSIONS: &[&str] = &["aif", "aiff", "wav", "mp3", "m4a", "aac"];
const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "doc", "docx", "txt", "ai", "epub"];

impl MediaKind {
    /// Guesses the kind from a filename extension (case-insensitive).
    ///
    /// The API does not report a kind for media files, so this is only a first
    /// estimate until a preview reports the real one.
    pub fn from_filename(filename: &str) -> Option<MediaKind> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())?
            .to_lowercase();
        let extension = extension.as_str();

        if IMAGE_EXTENSIONS.contains(&extension) {
            Some(MediaKind::Image)
        } else if VIDEO_EXTENSIONS.contains(&extension) {
            Some(MediaKind::Video)
        } else if AUDIO_EXTENSIONS.contains(&extension) {
            Some(MediaKind::Audio)
        } else if DOCUMENT_EXTENSIONS.contains(&extension) {
            Some(MediaKind::Document)
        } else {
            tracing::debug!(filename, "Unrecognized file extension");
            None
        }
    }

    /// Parses the kind reported by the API (`"image"`, `"video"`, ...).
    pub fn parse(value: &str) -> Option<MediaKind> {
        match value.to_lowercase().as_str() {
            "image" => Some(MediaKind::Image),
            "video" => Some(MediaKind::Video),
            "audio" => Some(MediaKind::Audio),
            "document" => Some(MediaKind::Document),
            _ => None,
        }
    }

    /// File suffix used when caching a downloaded data stream.
    pub fn cache_suffix(&self) -> &'static str {
        match self {
            MediaKind::Image | MediaKind::Document => ".jpg",
            MediaKind::Video => ".mp4",
            MediaKind::Audio => ".mp3",
        }
    }
}

impl Display for MediaKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
            MediaKind::Audio => write!(f, "audio"),
            MediaKind::Document => write!(f, "document"),
        }
    }
}

/// Screen orientation that fits a medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Landscape,
    Square,
    Portrait,
}

impl Orientation {
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        if width > height {
            Orientation::Landscape
        } else if height > width {
            Orientation::Portrait
        } else {
            Orientation::Square
        }
    }
}
