use serde::Serialize;
use vitrine_core::constants::meta_keys;
use vitrine_core::models::DEFAULT_SEPARATOR;
use vitrine_core::{Collection, MediaEntry, MetaDataHolder, PlayerConfig};

/// Printable view of a resolved media entry.
#[derive(Debug, Serialize)]
pub struct EntrySummary {
    pub id: String,
    pub kind: Option<String>,
    pub title: String,
    pub authors: String,
    pub duration_secs: u64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub file_url: Option<String>,
    pub cached_file: Option<String>,
    pub caption: String,
}

impl EntrySummary {
    /// Summary captioned with the configured white list.
    pub fn new(entry: &MediaEntry, config: &PlayerConfig) -> Self {
        Self::with_caption(entry, entry.serialize_white_listed(config, Some(" ")))
    }

    /// Summary captioned with `caption_keys` instead of the white list.
    pub fn with_keys<S: AsRef<str>>(entry: &MediaEntry, caption_keys: &[S]) -> Self {
        let caption = entry.serialize_meta_data(caption_keys, DEFAULT_SEPARATOR, Some(" "));
        Self::with_caption(entry, caption)
    }

    fn with_caption(entry: &MediaEntry, caption: String) -> Self {
        let (width, height) = entry.width_height().unzip();
        Self {
            id: entry.id.clone(),
            kind: entry.kind().map(|k| k.to_string()),
            title: entry.get_meta_datum(meta_keys::TITLE),
            authors: entry.get_meta_datum(meta_keys::AUTHORS),
            duration_secs: entry.duration.as_secs(),
            width,
            height,
            file_url: entry.file_url().map(str::to_string),
            cached_file: entry
                .file
                .as_ref()
                .map(|f| f.path().display().to_string()),
            caption,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CollectionSummary {
    pub id: String,
    pub title: String,
    pub entries: Vec<EntrySummary>,
}

impl CollectionSummary {
    pub fn new(collection: &Collection, config: &PlayerConfig) -> Self {
        Self {
            id: collection.id.clone(),
            title: collection.get_meta_datum(meta_keys::TITLE),
            entries: collection
                .media_entries
                .iter()
                .map(|e| EntrySummary::new(e, config))
                .collect(),
        }
    }
}

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
