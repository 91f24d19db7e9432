//! Shared fixtures: an in-memory API server and document builders.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{json, Value as JsonValue};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use vitrine_api_client::{ApiClient, HttpTransport, TransportResponse};
use vitrine_core::{PlaybackMode, PlayerConfig, RequestFailure, Retries};

pub const SERVER: &str = "http://madek.test";

/// Answers GETs from a route table. A URL without an exact route falls back
/// to the route of its path without query; unknown URLs get a 404.
#[derive(Default)]
pub struct StubTransport {
    routes: Mutex<HashMap<String, TransportResponse>>,
    calls: Mutex<Vec<String>>,
}

impl StubTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn route(&self, path: &str, status: u16, body: impl Into<Bytes>) {
        self.routes
            .lock()
            .unwrap()
            .insert(format!("{SERVER}{path}"), TransportResponse::new(status, body));
    }

    pub fn json(&self, path: &str, document: JsonValue) {
        self.route(path, 200, document.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Requests whose URL starts with `SERVER` + `path`.
    pub fn calls_to(&self, path: &str) -> usize {
        let prefix = format!("{SERVER}{path}");
        self.calls().iter().filter(|c| c.starts_with(&prefix)).count()
    }
}

#[async_trait]
impl HttpTransport for StubTransport {
    async fn get(&self, url: &str) -> Result<TransportResponse, RequestFailure> {
        self.calls.lock().unwrap().push(url.to_string());
        let routes = self.routes.lock().unwrap();
        let without_query = url.split('?').next().unwrap_or(url);
        Ok(routes
            .get(url)
            .or_else(|| routes.get(without_query))
            .cloned()
            .unwrap_or_else(|| {
                TransportResponse::new(404, r#"{"errors":[{"detail":"Not found"}]}"#)
            }))
    }
}

pub fn config() -> PlayerConfig {
    let mut config = PlayerConfig::new(SERVER, "user", "pass");
    config.playback_mode = PlaybackMode::Development;
    config.retry.retries = Retries::Times(0);
    config
}

/// Client with an open session over `transport`.
pub fn client(transport: Arc<StubTransport>) -> ApiClient {
    let client = ApiClient::from_config(config());
    client.start_session_with(transport);
    client
}

pub fn relation(href: &str, name: &str) -> JsonValue {
    json!({ "href": href, "name": name })
}

/// A listing page of media entries.
pub fn listing(entry_ids: &[&str], next: Option<&str>) -> JsonValue {
    let relations: serde_json::Map<String, JsonValue> = entry_ids
        .iter()
        .map(|id| {
            (
                id.to_string(),
                relation(&format!("/api/media-entries/{id}"), "Media-Entry"),
            )
        })
        .collect();
    let mut collection = json!({ "relations": relations });
    if let Some(next) = next {
        collection["next"] = json!({ "href": next });
    }
    json!({ "_json-roa": { "collection": collection } })
}

pub fn entry(id: &str, meta_data: bool, media_file: bool) -> JsonValue {
    let mut relations = serde_json::Map::new();
    if meta_data {
        relations.insert(
            "meta-data".into(),
            relation(&format!("/api/media-entries/{id}/meta-data/{{?meta_keys}}"), "Meta-Data"),
        );
    }
    if media_file {
        relations.insert(
            "media-file".into(),
            relation(&format!("/api/media-files/f-{id}"), "Media-File"),
        );
    }
    json!({
        "id": id,
        "created_at": "2017-05-01T12:00:00Z",
        "is_published": true,
        "responsible_user_id": "u1",
        "_json-roa": { "relations": relations }
    })
}

/// Meta-data document of `owner_field` (`media_entry_id` or `collection_id`).
pub fn meta_data(owner_field: &str, owner_id: &str, datum_ids: &[&str]) -> JsonValue {
    let relations: serde_json::Map<String, JsonValue> = datum_ids
        .iter()
        .map(|id| (id.to_string(), relation(&format!("/api/meta-data/{id}"), "Meta-Datum")))
        .collect();
    let mut document = json!({ "_json-roa": { "collection": { "relations": relations } } });
    document[owner_field] = json!(owner_id);
    document
}

pub fn text_datum(id: &str, meta_key_id: &str, value: &str) -> JsonValue {
    json!({
        "id": id,
        "meta_key_id": meta_key_id,
        "type": "MetaDatum::Text",
        "value": value
    })
}

/// A list-valued meta datum linking to `(kind name, id)` items.
pub fn list_datum(id: &str, meta_key_id: &str, items: &[(&str, &str)]) -> JsonValue {
    let relations: serde_json::Map<String, JsonValue> = items
        .iter()
        .map(|(name, item_id)| {
            let prefix = if *name == "Person" { "people" } else { "keywords" };
            (
                item_id.to_string(),
                relation(&format!("/api/{prefix}/{item_id}"), name),
            )
        })
        .collect();
    let value: Vec<JsonValue> = items.iter().map(|(_, id)| json!({ "id": id })).collect();
    json!({
        "id": id,
        "meta_key_id": meta_key_id,
        "type": "MetaDatum::Keywords",
        "value": value,
        "_json-roa": { "collection": { "relations": relations } }
    })
}

pub fn media_file(id: &str, entry_id: &str, filename: &str, preview_ids: &[&str]) -> JsonValue {
    let relations: serde_json::Map<String, JsonValue> = preview_ids
        .iter()
        .map(|p| (p.to_string(), relation(&format!("/api/previews/{p}"), "Preview")))
        .collect();
    let previews: Vec<JsonValue> = preview_ids.iter().map(|p| json!({ "id": p })).collect();
    json!({
        "id": id,
        "filename": filename,
        "size": 2048,
        "media_entry_id": entry_id,
        "previews": previews,
        "_json-roa": {
            "relations": {
                "data-stream": { "href": format!("/api/media-files/{id}/data-stream") }
            },
            "collection": { "relations": relations }
        }
    })
}

pub fn preview(id: &str, file_id: &str, width: u32, height: u32) -> JsonValue {
    json!({
        "id": id,
        "media_type": "image",
        "content_type": "image/jpeg",
        "filename": format!("{id}.jpg"),
        "thumbnail": "x_large",
        "width": width,
        "height": height,
        "media_file_id": file_id,
        "_json-roa": { "relations": {
            "data-stream": { "href": format!("/api/previews/{id}/data-stream") }
        } }
    })
}

/// Routes a playable image entry `id` with a title and one x_large preview.
pub fn mount_entry(stub: &StubTransport, id: &str) {
    let file_id = format!("f-{id}");
    let preview_id = format!("p-{id}");
    let title_id = format!("md-title-{id}");

    stub.json(&format!("/api/media-entries/{id}"), entry(id, true, true));
    stub.json(
        &format!("/api/media-entries/{id}/meta-data/"),
        meta_data("media_entry_id", id, &[&title_id]),
    );
    stub.json(
        &format!("/api/meta-data/{title_id}"),
        text_datum(&title_id, "madek_core:title", &format!("Titel {id}")),
    );
    stub.json(
        &format!("/api/media-files/{file_id}"),
        media_file(&file_id, id, &format!("{id}.jpg"), &[&preview_id]),
    );
    stub.json(
        &format!("/api/previews/{preview_id}"),
        preview(&preview_id, &file_id, 1024, 768),
    );
}
