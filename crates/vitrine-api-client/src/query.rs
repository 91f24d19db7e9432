//! Query-string construction for media-entry listings.
//!
//! The API parses JSON-valued parameters strictly: they must be compact JSON
//! with double quotes and lowercase booleans, percent-encoded as one value.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::fmt;

use crate::resource::ResourceKind;

/// Characters left unescaped in query values.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, QUERY_VALUE).to_string()
}

/// Percent-encoded compact JSON of `value`.
pub fn encode_json(value: &JsonValue) -> String {
    encode_component(&value.to_string())
}

/// `meta_keys=<encoded JSON array>` restricting the meta data returned.
pub fn meta_keys_param<S: AsRef<str>>(keys: &[S]) -> String {
    let keys: Vec<&str> = keys.iter().map(AsRef::as_ref).collect();
    format!("meta_keys={}", encode_json(&json!(keys)))
}

/// Appends `param` to `path`, picking `?` or `&` as needed.
pub fn append_param(path: &str, param: &str) -> String {
    let separator = if path.contains('?') { '&' } else { '?' };
    format!("{}{}{}", path, separator, param)
}

fn render(params: &[(&str, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Parameters of a media-entry listing request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaEntryQuery {
    pub order: Option<String>,
    pub public_get_metadata_and_previews: bool,
    pub public_get_full_size: bool,
    pub me_get_metadata_and_previews: bool,
    pub me_get_full_size: bool,
    /// Server-side filter, e.g. `{"meta_data":[{"key":"madek_core:keywords","value":"<id>"}]}`.
    pub filter_by: Option<JsonValue>,
    pub collection_id: Option<String>,
}

impl Default for MediaEntryQuery {
    fn default() -> Self {
        Self {
            order: Some("desc".to_string()),
            public_get_metadata_and_previews: true,
            public_get_full_size: false,
            me_get_metadata_and_previews: false,
            me_get_full_size: false,
            filter_by: None,
            collection_id: None,
        }
    }
}

impl MediaEntryQuery {
    /// Entries carrying `keyword_id` under `meta_key_id`.
    pub fn with_keyword(meta_key_id: &str, keyword_id: &str) -> Self {
        Self {
            filter_by: Some(json!({ "meta_data": [{ "key": meta_key_id, "value": keyword_id }] })),
            ..Self::default()
        }
    }

    /// Entries naming `person_id` in any people-valued meta key.
    pub fn with_person(person_id: &str) -> Self {
        Self {
            filter_by: Some(json!({
                "meta_data": [{ "key": "any", "value": person_id, "type": "MetaDatum::People" }]
            })),
            ..Self::default()
        }
    }

    pub fn in_collection(mut self, collection_id: impl Into<String>) -> Self {
        self.collection_id = Some(collection_id.into());
        self
    }

    /// Set parameters in wire order; unset flags and empty values are left out.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(order) = self.order.as_deref().filter(|o| !o.is_empty()) {
            params.push(("order", order.to_string()));
        }
        let flags = [
            ("public_get_metadata_and_previews", self.public_get_metadata_and_previews),
            ("public_get_full_size", self.public_get_full_size),
            ("me_get_metadata_and_previews", self.me_get_metadata_and_previews),
            ("me_get_full_size", self.me_get_full_size),
        ];
        params.extend(
            flags
                .into_iter()
                .filter(|(_, set)| *set)
                .map(|(name, _)| (name, "true".to_string())),
        );
        if let Some(filter) = &self.filter_by {
            params.push(("filter_by", filter.to_string()));
        }
        if let Some(id) = self.collection_id.as_deref().filter(|id| !id.is_empty()) {
            params.push(("collection_id", id.to_string()));
        }
        params
    }

    /// API path of the listing; empty when no parameter is set.
    pub fn url(&self) -> String {
        let params = self.params();
        if params.is_empty() {
            return String::new();
        }
        format!("{}?{}", ResourceKind::MediaEntry.prefix(), render(&params))
    }

    /// Link to the same selection in the web application.
    pub fn web_url(&self) -> String {
        let filter = self
            .filter_by
            .as_ref()
            .map(JsonValue::to_string)
            .unwrap_or_default();
        let params = [
            ("list[filter]", filter),
            ("list[show_filter]", "true".to_string()),
            ("list[page]", "1".to_string()),
            ("list[per_page]", "12".to_string()),
            ("list[order]", "created_at DESC".to_string()),
            ("list[layout]", "grid".to_string()),
        ];
        format!("/entries?{}", render(&params))
    }
}

impl fmt::Display for MediaEntryQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url())
    }
}
