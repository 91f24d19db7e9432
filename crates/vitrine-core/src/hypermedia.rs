//! Navigation of the hypermedia envelope (`_json-roa`) carried by every document.
//!
//! A resource document looks like
//!
//! ```json
//! { "id": "...", "_json-roa": {
//!     "relations": { "meta-data": { "href": "/api/...{?meta_keys}", "name": "Meta-Data" } },
//!     "collection": {
//!       "relations": { "<id>": { "href": "/api/media-entries/<id>", "name": "Media-Entry" } },
//!       "next": { "href": "/api/media-entries/?page=1" } } } }
//! ```
//!
//! Relation order follows the document, so listings keep their discovery order.

use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::constants::ROA_KEY;

/// Member relation names used by listings.
pub mod relation_names {
    pub const MEDIA_ENTRY: &str = "Media-Entry";
    pub const PERSON: &str = "Person";
    pub const KEYWORD: &str = "Keyword";
}

/// Relation keys of single resources.
pub mod relation_keys {
    pub const META_DATA: &str = "meta-data";
    pub const MEDIA_FILE: &str = "media-file";
    pub const MEDIA_ENTRIES: &str = "media-entries";
    pub const DATA_STREAM: &str = "data-stream";
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Link {
    pub href: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl Link {
    /// The href with any URI-template expression (`{?meta_keys}`) removed.
    pub fn path(&self) -> &str {
        strip_template(&self.href)
    }

    pub fn is_named(&self, name: &str) -> bool {
        self.name.as_deref() == Some(name)
    }
}

/// A relation together with the key it is listed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub key: String,
    pub link: Link,
}

/// Read-only view over the envelope of one document.
#[derive(Debug, Clone, Copy)]
pub struct Envelope<'a> {
    roa: Option<&'a JsonValue>,
}

impl<'a> Envelope<'a> {
    pub fn new(document: &'a JsonValue) -> Self {
        Self {
            roa: document.get(ROA_KEY),
        }
    }

    pub fn relation(&self, key: &str) -> Option<Link> {
        self.roa
            .and_then(|r| r.get("relations"))
            .and_then(|r| r.get(key))
            .and_then(|l| Link::deserialize(l).ok())
    }

    /// Member relations of a listing, in document order.
    pub fn members(&self) -> Vec<Relation> {
        parse_relations(
            self.roa
                .and_then(|r| r.get("collection"))
                .and_then(|c| c.get("relations")),
        )
    }

    /// Member relations tagged with `name`, in document order.
    pub fn members_named(&self, name: &str) -> Vec<Relation> {
        self.members()
            .into_iter()
            .filter(|r| r.link.is_named(name))
            .collect()
    }

    /// Member relation listed under `key`.
    pub fn member(&self, key: &str) -> Option<Link> {
        self.roa
            .and_then(|r| r.get("collection"))
            .and_then(|c| c.get("relations"))
            .and_then(|r| r.get(key))
            .and_then(|l| Link::deserialize(l).ok())
    }

    /// Whether the document is a listing (carries a collection section).
    pub fn is_listing(&self) -> bool {
        self.roa
            .and_then(|r| r.get("collection"))
            .and_then(|c| c.get("relations"))
            .is_some()
    }

    /// Link to the next page; `None` on the last page.
    pub fn next_page(&self) -> Option<Link> {
        self.roa
            .and_then(|r| r.get("collection"))
            .and_then(|c| c.get("next"))
            .and_then(|l| Link::deserialize(l).ok())
    }
}

fn parse_relations(section: Option<&JsonValue>) -> Vec<Relation> {
    let Some(map) = section.and_then(JsonValue::as_object) else {
        return Vec::new();
    };
    map.iter()
        .filter_map(|(key, value)| match Link::deserialize(value) {
            Ok(link) => Some(Relation {
                key: key.clone(),
                link,
            }),
            Err(e) => {
                tracing::debug!(relation = %key, error = %e, "Skipping malformed relation");
                None
            }
        })
        .collect()
}

/// Cuts a URI-template expression off an href.
pub fn strip_template(href: &str) -> &str {
    href.split('{').next().unwrap_or(href)
}
