use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::time::Duration;

use super::file::{CachedMedia, MediaFileMeta};
use super::media::{MediaKind, Orientation};
use super::meta_datum::{MetaData, MetaDataHolder};
use super::{lenient_timestamp, Entity};
use crate::config::PlaybackMode;
use crate::error::{ClientError, ClientResult};

#[derive(Debug, Deserialize)]
struct MediaEntryDocument {
    id: String,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    is_published: bool,
    #[serde(default)]
    responsible_user_id: Option<String>,
}

/// A media entry: one playable item with its file and meta data.
///
/// An entry without a resolvable media file is invalid; the client never
/// hands such an entry out.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaEntry {
    pub id: String,
    pub uuid: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub is_published: bool,
    pub responsible_user_id: Option<String>,
    pub file_data: Option<MediaFileMeta>,
    /// Local copy of the data stream, populated when media is preloaded.
    pub file: Option<CachedMedia>,
    /// Nominal playback time, drawn at construction.
    pub duration: Duration,
    meta_data: MetaData,
}

impl MediaEntry {
    pub fn new(id: impl Into<String>, mode: PlaybackMode) -> Self {
        let seconds = rand::rng().random_range(mode.duration_range());
        Self {
            id: id.into(),
            uuid: None,
            created_at: None,
            is_published: false,
            responsible_user_id: None,
            file_data: None,
            file: None,
            duration: Duration::from_secs(u64::from(seconds)),
            meta_data: MetaData::default(),
        }
    }

    pub fn set_file_data(&mut self, file_data: MediaFileMeta) {
        self.file_data = Some(file_data);
    }

    /// Attaches a downloaded file, correcting the selected preview's size with
    /// the measured one.
    pub fn set_file(&mut self, file: CachedMedia) {
        if let (Some((width, height)), Some(file_data)) =
            (file.width_height(), self.file_data.as_mut())
        {
            if let Some(preview) = file_data.preview_mut(super::file::DEFAULT_PREVIEW_SIZE) {
                preview.set_size(width, height);
            }
        }
        self.file = Some(file);
    }

    pub fn kind(&self) -> Option<MediaKind> {
        self.file_data.as_ref().and_then(|f| f.kind)
    }

    pub fn is_image(&self) -> bool {
        self.kind() == Some(MediaKind::Image)
    }

    pub fn is_video(&self) -> bool {
        self.kind() == Some(MediaKind::Video)
    }

    pub fn is_audio(&self) -> bool {
        self.kind() == Some(MediaKind::Audio)
    }

    pub fn is_document(&self) -> bool {
        self.kind() == Some(MediaKind::Document)
    }

    /// Measured size of the cached file, else the size reported for the preview.
    pub fn width_height(&self) -> Option<(u32, u32)> {
        self.file
            .as_ref()
            .and_then(CachedMedia::width_height)
            .or_else(|| {
                self.file_data
                    .as_ref()
                    .and_then(MediaFileMeta::default_preview)
                    .and_then(|p| p.width_height())
            })
    }

    pub fn orientation(&self) -> Option<Orientation> {
        self.width_height()
            .map(|(w, h)| Orientation::from_dimensions(w, h))
    }

    /// Data-stream path of the preview used for playback.
    pub fn file_url(&self) -> Option<&str> {
        self.file_data
            .as_ref()
            .and_then(MediaFileMeta::default_preview)
            .and_then(|p| p.data_stream.as_deref())
    }
}

impl Entity for MediaEntry {
    const KIND: &'static str = "media-entry";

    fn id(&self) -> &str {
        &self.id
    }

    fn parse(&mut self, json: &JsonValue) -> ClientResult<()> {
        let doc = MediaEntryDocument::deserialize(json)
            .map_err(|e| ClientError::malformed(Self::KIND, e))?;
        self.uuid = Some(doc.id);
        self.created_at = doc.created_at;
        self.is_published = doc.is_published;
        self.responsible_user_id = doc.responsible_user_id;
        Ok(())
    }
}

impl MetaDataHolder for MediaEntry {
    fn meta_data(&self) -> &MetaData {
        &self.meta_data
    }

    fn meta_data_mut(&mut self) -> &mut MetaData {
        &mut self.meta_data
    }
}

impl Display for MediaEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "MediaEntry {}", self.id)
    }
}
