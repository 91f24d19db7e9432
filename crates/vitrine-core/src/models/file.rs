use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};

use super::media::MediaKind;
use super::{lenient_timestamp, Entity};
use crate::error::{ClientError, ClientResult};
use crate::hypermedia::{relation_keys, Envelope};

/// Thumbnail tag selected when no video preview exists.
pub const DEFAULT_PREVIEW_SIZE: &str = "x_large";

const VIDEO_CONTENT_TYPE: &str = "video/mp4";

#[derive(Debug, Deserialize)]
struct PreviewDocument {
    id: String,
    #[serde(default)]
    media_type: Option<String>,
    #[serde(default)]
    content_type: Option<String>,
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    thumbnail: Option<String>,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    media_file_id: Option<String>,
}

/// A rendition of a media file (thumbnail size or transcoded video).
#[derive(Debug, Clone, PartialEq)]
pub struct Preview {
    pub id: String,
    pub kind: Option<MediaKind>,
    pub content_type: Option<String>,
    pub filename: Option<String>,
    /// Size tag: maximum, x_large, large, medium, small_125, small.
    pub thumbnail: Option<String>,
    /// Reported by the API and unreliable; replaced once the file is measured.
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub media_file_id: Option<String>,
    /// Path of the data stream, relative to the server.
    pub data_stream: Option<String>,
}

impl Preview {
    pub fn from_json(json: &JsonValue) -> ClientResult<Self> {
        let doc =
            PreviewDocument::deserialize(json).map_err(|e| ClientError::malformed(Self::KIND, e))?;
        Ok(Preview {
            id: doc.id,
            kind: doc.media_type.as_deref().and_then(MediaKind::parse),
            content_type: doc.content_type,
            filename: doc.filename,
            thumbnail: doc.thumbnail,
            width: doc.width,
            height: doc.height,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
            media_file_id: doc.media_file_id,
            data_stream: Envelope::new(json)
                .relation(relation_keys::DATA_STREAM)
                .map(|l| l.href),
        })
    }

    pub fn width_height(&self) -> Option<(u32, u32)> {
        self.width.zip(self.height)
    }

    /// Overwrites the reported size with one measured from the downloaded file.
    pub fn set_size(&mut self, width: u32, height: u32) {
        self.width = Some(width);
        self.height = Some(height);
    }

    pub fn is_video(&self) -> bool {
        self.content_type.as_deref() == Some(VIDEO_CONTENT_TYPE)
    }
}

impl Entity for Preview {
    const KIND: &'static str = "preview";

    fn id(&self) -> &str {
        &self.id
    }

    fn parse(&mut self, json: &JsonValue) -> ClientResult<()> {
        *self = Preview::from_json(json)?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct PreviewRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct MediaFileDocument {
    id: String,
    filename: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    media_entry_id: Option<String>,
    #[serde(default)]
    previews: Vec<PreviewRef>,
}

/// File metadata of a media entry.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaFileMeta {
    pub id: String,
    pub filename: String,
    pub size: u64,
    pub media_entry_id: Option<String>,
    /// Guessed from the extension, corrected by the first preview's kind.
    pub kind: Option<MediaKind>,
    pub data_stream: Option<String>,
    /// Preview ids announced by the file document, in document order.
    pub preview_ids: Vec<String>,
    pub previews: Vec<Preview>,
}

impl MediaFileMeta {
    pub fn from_json(json: &JsonValue) -> ClientResult<Self> {
        let doc = MediaFileDocument::deserialize(json)
            .map_err(|e| ClientError::malformed(Self::KIND, e))?;
        Ok(MediaFileMeta {
            kind: MediaKind::from_filename(&doc.filename),
            id: doc.id,
            filename: doc.filename,
            size: doc.size,
            media_entry_id: doc.media_entry_id,
            data_stream: Envelope::new(json)
                .relation(relation_keys::DATA_STREAM)
                .map(|l| l.href),
            preview_ids: doc.previews.into_iter().map(|p| p.id).collect(),
            previews: Vec::new(),
        })
    }

    /// Attaches a preview. An unknown or image guess is replaced by the
    /// preview's kind, so a video with a still-image extension is fixed up.
    pub fn add_preview(&mut self, preview: Preview) {
        if matches!(self.kind, None | Some(MediaKind::Image)) && preview.kind.is_some() {
            self.kind = preview.kind;
        }
        self.previews.push(preview);
    }

    /// First video preview, else the first preview tagged `size`.
    pub fn preview(&self, size: &str) -> Option<&Preview> {
        self.previews
            .iter()
            .find(|p| p.is_video())
            .or_else(|| {
                self.previews
                    .iter()
                    .find(|p| p.thumbnail.as_deref() == Some(size))
            })
    }

    pub fn preview_mut(&mut self, size: &str) -> Option<&mut Preview> {
        let index = self
            .previews
            .iter()
            .position(|p| p.is_video())
            .or_else(|| {
                self.previews
                    .iter()
                    .position(|p| p.thumbnail.as_deref() == Some(size))
            })?;
        self.previews.get_mut(index)
    }

    /// The preview used for playback.
    pub fn default_preview(&self) -> Option<&Preview> {
        self.preview(DEFAULT_PREVIEW_SIZE)
    }

    /// A file is playable when it has a preview to play: a video, or an
    /// image in the default size.
    pub fn is_playable(&self) -> bool {
        self.default_preview().is_some()
    }
}

impl Entity for MediaFileMeta {
    const KIND: &'static str = "media-file";

    fn id(&self) -> &str {
        &self.id
    }

    fn parse(&mut self, json: &JsonValue) -> ClientResult<()> {
        *self = MediaFileMeta::from_json(json)?;
        Ok(())
    }
}

/// A data stream downloaded to local disk.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedMedia {
    pub path: PathBuf,
    pub byte_len: u64,
    /// Measured dimensions; only images are measured.
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl CachedMedia {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn width_height(&self) -> Option<(u32, u32)> {
        self.width.zip(self.height)
    }

    /// Removes the file from disk.
    pub fn delete(&self) -> std::io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}
