//! Playlists built from a listing query.

use rand::seq::{IndexedRandom, SliceRandom};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use vitrine_core::constants::meta_keys;
use vitrine_core::{ClientError, ClientResult, MediaEntry, MetaDataHolder, MetaItem};

use crate::api::ResolveOptions;
use crate::query::MediaEntryQuery;
use crate::ApiClient;

const DEFAULT_LIMIT: usize = 20;

/// List-valued meta keys whose items can seed a follow-up program.
const FOLLOW_UP_KEYS: [&str; 5] = [
    meta_keys::KEYWORDS,
    meta_keys::AUTHORS,
    meta_keys::PROJECT_TYPE,
    meta_keys::PORTRAYED_OBJECT_MATERIALS,
    meta_keys::CONTENT_TYPE,
];

#[derive(Debug, Deserialize)]
struct ProgramDocument {
    name: String,
    #[serde(default)]
    parameters: Option<MediaEntryQuery>,
    #[serde(default)]
    meta_data: Option<Vec<String>>,
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    limit_selection: Option<usize>,
}

/// A named selection of media entries played in order.
///
/// `limit` entries are played out of `limit_selection` fetched; when the
/// selection is larger the playlist is shuffled first. A `limit` of zero keeps
/// every entry.
#[derive(Debug, Clone)]
pub struct Program {
    pub name: String,
    pub query: MediaEntryQuery,
    /// Meta keys requested for each entry; the configured white list when `None`.
    pub meta_keys: Option<Vec<String>>,
    pub limit: usize,
    pub limit_selection: usize,
    playlist: Vec<Arc<MediaEntry>>,
    index: usize,
}

impl Program {
    pub fn new(name: impl Into<String>, query: MediaEntryQuery) -> Self {
        Self {
            name: name.into(),
            query,
            meta_keys: None,
            limit: DEFAULT_LIMIT,
            limit_selection: DEFAULT_LIMIT,
            playlist: Vec::new(),
            index: 0,
        }
    }

    /// Reads `{ "name", "parameters", "meta_data", "limit", "limit_selection" }`.
    pub fn from_json(json: &JsonValue) -> ClientResult<Self> {
        let doc = ProgramDocument::deserialize(json)
            .map_err(|e| ClientError::malformed("program", e))?;
        let limit = doc.limit.unwrap_or(DEFAULT_LIMIT);
        Ok(Self {
            meta_keys: doc.meta_data,
            limit,
            limit_selection: doc.limit_selection.unwrap_or(limit),
            ..Self::new(doc.name, doc.parameters.unwrap_or_default())
        })
    }

    pub fn start_url(&self) -> String {
        self.query.url()
    }

    pub fn web_url(&self) -> String {
        self.query.web_url()
    }

    /// Fetches the selection and builds the playlist from its images and
    /// videos. Returns the playlist length.
    pub async fn load(&mut self, client: &ApiClient, preload_media: bool) -> ClientResult<usize> {
        self.playlist.clear();
        self.index = 0;

        let start_url = self.start_url();
        if start_url.is_empty() {
            tracing::warn!(program = %self.name, "Program has no query, nothing to load");
            return Ok(0);
        }

        let options = ResolveOptions {
            meta_data_white_list: self.meta_keys.clone(),
            preload_media,
        };
        let fetch_limit = self.limit.max(self.limit_selection);
        let entries = client
            .get_media_entries(&start_url, Some(fetch_limit), &options)
            .await?;

        let mut playlist: Vec<_> = entries
            .into_iter()
            .filter(|e| e.is_image() || e.is_video())
            .collect();
        if self.limit_selection > self.limit {
            playlist.shuffle(&mut rand::rng());
        }
        if self.limit > 0 {
            playlist.truncate(self.limit);
        }

        tracing::info!(program = %self.name, entries = playlist.len(), "Program loaded");
        self.playlist = playlist;
        Ok(self.playlist.len())
    }

    pub fn playlist(&self) -> &[Arc<MediaEntry>] {
        &self.playlist
    }

    /// Entry at the current position and its index, moving on when `advance`.
    pub fn next(&mut self, advance: bool) -> Option<(Arc<MediaEntry>, usize)> {
        let index = self.index;
        let entry = self.playlist.get(index).cloned()?;
        if advance {
            self.index += 1;
        }
        Some((entry, index))
    }

    /// Entries not yet played.
    pub fn remaining(&self) -> usize {
        self.playlist.len().saturating_sub(self.index)
    }

    pub fn is_valid(&self) -> bool {
        self.remaining() > 0
    }

    /// A program around a person or keyword picked at random from the last
    /// entry of this one; `None` when that entry links to none.
    pub fn follow_up(&self) -> Option<Program> {
        let last = self.playlist.last()?;
        let hooks: Vec<&MetaItem> = FOLLOW_UP_KEYS
            .iter()
            .filter_map(|key| last.meta_datum(key))
            .flat_map(|datum| datum.items())
            .collect();
        let hook = hooks.choose(&mut rand::rng())?;

        let (name, query) = match hook {
            MetaItem::Keyword(keyword) => {
                let meta_key_id = keyword.meta_key_id.as_deref().unwrap_or(meta_keys::KEYWORDS);
                let name = match meta_key_id {
                    meta_keys::KEYWORDS => format!("Schlagwort {}", keyword),
                    meta_keys::PROJECT_TYPE => format!("Typ {}", keyword),
                    meta_keys::ACADEMIC_YEAR => format!("Studienabschnitt {}", keyword),
                    meta_keys::CONTENT_TYPE => format!("Disziplin {}", keyword),
                    meta_keys::PORTRAYED_OBJECT_MATERIALS => {
                        format!("Material/Format/Sprache {}", keyword)
                    }
                    other => {
                        tracing::debug!(meta_key_id = %other, "Unrecognized follow-up meta key");
                        keyword.to_string()
                    }
                };
                (name, MediaEntryQuery::with_keyword(meta_key_id, &keyword.id))
            }
            MetaItem::Person(person) => (
                format!("Person {}", person),
                MediaEntryQuery::with_person(&person.id),
            ),
        };

        Some(Program {
            meta_keys: self.meta_keys.clone(),
            limit: self.limit,
            limit_selection: self.limit_selection,
            ..Program::new(name, query)
        })
    }
}
