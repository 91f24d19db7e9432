//! Domain entities resolved from the API.
//!
//! Every entity carries a server-assigned id and updates itself in place from
//! a fresh document through [`Entity::parse`].

pub mod collection;
pub mod entry;
pub mod file;
pub mod media;
pub mod meta_datum;
pub mod person;

pub use collection::Collection;
pub use entry::MediaEntry;
pub use file::{CachedMedia, MediaFileMeta, Preview, DEFAULT_PREVIEW_SIZE};
pub use media::{MediaKind, Orientation};
pub use meta_datum::{
    MetaData, MetaDataHolder, MetaDatum, MetaItem, MetaValue, DEFAULT_SEPARATOR, LIST_DELIMITER,
};
pub use person::{Keyword, Person};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;

use crate::error::ClientResult;

/// An entity identified by a server-assigned id.
pub trait Entity {
    /// Resource kind used in logs and error messages.
    const KIND: &'static str;

    fn id(&self) -> &str;

    /// Overwrites scalar fields and resets list fields from `json`.
    ///
    /// Parsing the same document twice leaves the same state as parsing it once.
    fn parse(&mut self, json: &JsonValue) -> ClientResult<()>;
}

/// Accepts RFC 3339 timestamps and reads anything else as absent.
pub(crate) fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(JsonValue::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc)))
}
