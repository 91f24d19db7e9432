use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::Arc;

use super::entry::MediaEntry;
use super::meta_datum::{MetaData, MetaDataHolder};
use super::{lenient_timestamp, Entity};
use crate::error::{ClientError, ClientResult};

#[derive(Debug, Deserialize)]
struct CollectionDocument {
    #[serde(default, deserialize_with = "lenient_timestamp")]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    creator_id: Option<String>,
    #[serde(default)]
    responsible_user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    pub id: String,
    pub created_at: Option<DateTime<Utc>>,
    pub creator_id: Option<String>,
    pub responsible_user_id: Option<String>,
    pub media_entries: Vec<Arc<MediaEntry>>,
    /// Ids of nested collections; not resolved.
    pub sub_collections: Vec<String>,
    meta_data: MetaData,
}

impl Collection {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_at: None,
            creator_id: None,
            responsible_user_id: None,
            media_entries: Vec::new(),
            sub_collections: Vec::new(),
            meta_data: MetaData::default(),
        }
    }

    pub fn add_media_entry(&mut self, entry: Arc<MediaEntry>) {
        self.media_entries.push(entry);
    }

    pub fn set_media_entries(&mut self, entries: Vec<Arc<MediaEntry>>) {
        self.media_entries = entries;
    }

    pub fn len(&self) -> usize {
        self.media_entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.media_entries.is_empty()
    }

    /// Sorts entries by the display values of `keys`, compared in order.
    ///
    /// Missing values sort as empty strings. The sort is stable.
    pub fn sort_on<S: AsRef<str>>(&mut self, keys: &[S]) {
        self.media_entries.sort_by_cached_key(|entry| {
            keys.iter()
                .map(|k| entry.get_meta_datum(k.as_ref()))
                .collect::<Vec<_>>()
        });
    }
}

impl Entity for Collection {
    const KIND: &'static str = "collection";

    fn id(&self) -> &str {
        &self.id
    }

    fn parse(&mut self, json: &JsonValue) -> ClientResult<()> {
        let doc = CollectionDocument::deserialize(json)
            .map_err(|e| ClientError::malformed(Self::KIND, e))?;
        self.created_at = doc.created_at;
        self.creator_id = doc.creator_id;
        self.responsible_user_id = doc.responsible_user_id;
        self.media_entries.clear();
        self.sub_collections.clear();
        Ok(())
    }
}

impl MetaDataHolder for Collection {
    fn meta_data(&self) -> &MetaData {
        &self.meta_data
    }

    fn meta_data_mut(&mut self) -> &mut MetaData {
        &mut self.meta_data
    }
}

impl Display for Collection {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "Collection {}", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlaybackMode;
    use crate::models::meta_datum::MetaDatum;
    use serde_json::json;

    fn titled(id: &str, title: Option<&str>) -> Arc<MediaEntry> {
        let mut entry = MediaEntry::new(id, PlaybackMode::Development);
        if let Some(title) = title {
            entry.set_meta_datum(
                MetaDatum::from_json(&json!({
                    "id": format!("md-{id}"),
                    "meta_key_id": "madek_core:title",
                    "value": title
                }))
                .unwrap(),
            );
        }
        Arc::new(entry)
    }

    #[test]
    fn parse_resets_entries() {
        let doc = json!({
            "id": "c1",
            "created_at": "2016-01-01T00:00:00Z",
            "creator_id": "u1",
            "responsible_user_id": "u2"
        });
        let mut collection = Collection::new("c1");
        collection.add_media_entry(titled("e1", None));
        collection.parse(&doc).unwrap();
        assert!(collection.is_empty());
        assert_eq!(collection.creator_id.as_deref(), Some("u1"));

        let once = collection.clone();
        collection.parse(&doc).unwrap();
        assert_eq!(collection, once);
    }

    #[test]
    fn sort_on_title_with_missing_values_first() {
        let mut collection = Collection::new("c1");
        collection.set_media_entries(vec![
            titled("e1", Some("Zebra")),
            titled("e2", None),
            titled("e3", Some("Affe")),
        ]);
        collection.sort_on(&["madek_core:title"]);
        let ids: Vec<_> = collection.media_entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["e2", "e3", "e1"]);
    }
}
