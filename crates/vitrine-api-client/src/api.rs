//! Entity resolution over the hypermedia API.
//!
//! Every operation fetches one document, publishes the entity it describes to
//! the registry and fans out over the relations it needs. Unavailable or
//! malformed resources resolve to `None`; only session errors are returned.

use serde_json::Value as JsonValue;
use std::sync::Arc;
use tokio::task::JoinSet;
use vitrine_core::hypermedia::{relation_keys, relation_names, Envelope};
use vitrine_core::{
    widen_white_list, ClientResult, Collection, Entity, EntityCache, Keyword, MediaEntry,
    MediaFileMeta, MetaDataHolder, MetaDatum, MetaItem, MetaValue, Person, Preview,
};

use crate::query::{append_param, meta_keys_param};
use crate::resource::{ResourceKind, ResourceRef};
use crate::{absent, ApiClient};

/// Query parameter asking the listing to include meta data and previews.
const INLINE_METADATA_PARAM: &str = "me_get_metadata_and_previews=true";

/// How media entries are resolved.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Meta keys to request; the configured white list when `None`. Always
    /// widened by the minimum keys.
    pub meta_data_white_list: Option<Vec<String>>,
    /// Download the playback preview of each entry.
    pub preload_media: bool,
}

type Resolved<T> = (usize, ClientResult<Option<T>>);

impl ApiClient {
    /// Resolves a collection with its meta data and media entries.
    pub async fn load_collection(&self, id: &str) -> ClientResult<Option<Arc<Collection>>> {
        let target = ResourceRef::complete(ResourceKind::Collection, id);
        let Some(json) = self.fetch_optional(&target.path).await? else {
            return Ok(None);
        };
        let collection_id = document_id(&json).unwrap_or(&target.id).to_string();
        let published = self.registry.collections.upsert(
            &collection_id,
            || Collection::new(&collection_id),
            |c| c.parse(&json),
        );
        if absent(published)?.is_none() {
            return Ok(None);
        }

        let envelope = Envelope::new(&json);
        if let Some(link) = envelope.relation(relation_keys::META_DATA) {
            if let Some(meta_data) = self.fetch_optional(link.path()).await? {
                self.handle_meta_data(&meta_data).await?;
            }
        }

        if let Some(link) = envelope.relation(relation_keys::MEDIA_ENTRIES) {
            let path = append_param(link.path(), INLINE_METADATA_PARAM);
            let entries = self
                .get_media_entries(&path, None, &ResolveOptions::default())
                .await?;
            tracing::debug!(
                collection_id = %collection_id,
                entries = entries.len(),
                "Collection entries resolved"
            );
            self.registry
                .collections
                .update(&collection_id, |c| c.set_media_entries(entries));
        }

        // TODO: resolve sub-collections and filter sets once the player shows them
        Ok(self.registry.collections.find(&collection_id))
    }

    /// Walks the pages of a media-entry listing and resolves each entry.
    ///
    /// At most `limit` entries are launched (the configured maximum when
    /// `None` or zero); the next page is only requested while under it. The
    /// entries that resolved are returned in discovery order. A page that
    /// cannot be fetched or is not a listing ends the walk.
    pub async fn get_media_entries(
        &self,
        path: &str,
        limit: Option<usize>,
        options: &ResolveOptions,
    ) -> ClientResult<Vec<Arc<MediaEntry>>> {
        let limit = limit
            .filter(|l| *l > 0)
            .unwrap_or(self.config.max_media_entries);
        let mut tasks = JoinSet::new();
        let mut launched = 0usize;
        let mut next_page = Some(path.to_string());

        while let Some(page) = next_page.take() {
            let Some(json) = self.fetch_optional(&page).await? else {
                tracing::warn!(page = %page, launched, "Listing page unavailable, stopping");
                break;
            };
            let envelope = Envelope::new(&json);
            if !envelope.is_listing() {
                tracing::warn!(page = %page, launched, "Listing page without members, stopping");
                break;
            }
            for relation in envelope.members_named(relation_names::MEDIA_ENTRY) {
                if launched >= limit {
                    break;
                }
                let client = self.clone();
                let options = options.clone();
                let index = launched;
                tasks.spawn(async move {
                    (index, client.get_media_entry(&relation.link.href, &options).await)
                });
                launched += 1;
            }
            if launched < limit {
                next_page = envelope.next_page().map(|link| link.href);
            }
        }

        let entries = in_discovery_order(gather(tasks).await?);
        tracing::debug!(path = %path, launched, resolved = entries.len(), "Listing resolved");
        Ok(entries)
    }

    /// Resolves a media entry with its meta data and media file.
    ///
    /// An entry without a media file, or whose file has no playable preview,
    /// is invalid and resolves to `None`.
    pub async fn get_media_entry(
        &self,
        path_or_id: &str,
        options: &ResolveOptions,
    ) -> ClientResult<Option<Arc<MediaEntry>>> {
        let target = ResourceRef::complete(ResourceKind::MediaEntry, path_or_id);
        let Some(json) = self.fetch_optional(&target.path).await? else {
            return Ok(None);
        };
        let entry_id = document_id(&json).unwrap_or(&target.id).to_string();
        let mode = self.config.playback_mode;
        let published = self.registry.media_entries.upsert(
            &entry_id,
            || MediaEntry::new(&entry_id, mode),
            |e| e.parse(&json),
        );
        if absent(published)?.is_none() {
            return Ok(None);
        }

        let envelope = Envelope::new(&json);
        if let Some(link) = envelope.relation(relation_keys::META_DATA) {
            let white_list = widen_white_list(
                options
                    .meta_data_white_list
                    .as_deref()
                    .unwrap_or(self.config.meta_data_white_list.as_slice()),
            );
            let path = append_param(link.path(), &meta_keys_param(&white_list));
            if let Some(meta_data) = self.fetch_optional(&path).await? {
                self.handle_meta_data(&meta_data).await?;
            }
        }

        let file = match envelope.relation(relation_keys::MEDIA_FILE) {
            Some(link) => self.get_media_file(&link.href).await?,
            None => None,
        };
        let Some(file) = file else {
            tracing::warn!(entry_id = %entry_id, "No playable media file, discarding media entry");
            return Ok(None);
        };

        let entry = self
            .registry
            .media_entries
            .update(&entry_id, |e| e.set_file_data(file));
        if options.preload_media {
            return self.preload_media(&entry_id).await;
        }
        Ok(entry)
    }

    /// Resolves every meta datum listed in a meta-data document and attaches
    /// them to the owning collection or media entry. Returns how many were
    /// attached.
    pub async fn handle_meta_data(&self, json: &JsonValue) -> ClientResult<usize> {
        let owner = if let Some(id) = json.get("collection_id").and_then(JsonValue::as_str) {
            MetaDataOwner::Collection(id.to_string())
        } else if let Some(id) = json.get("media_entry_id").and_then(JsonValue::as_str) {
            MetaDataOwner::MediaEntry(id.to_string())
        } else {
            tracing::debug!("Meta data without owner, skipping");
            return Ok(0);
        };
        if !owner.is_known(self) {
            tracing::debug!(owner = ?owner, "Meta data owner not resolved, skipping");
            return Ok(0);
        }

        let mut tasks = JoinSet::new();
        for (index, relation) in Envelope::new(json).members().into_iter().enumerate() {
            let client = self.clone();
            tasks.spawn(async move { (index, client.get_meta_datum(&relation.link.href).await) });
        }
        let data = gather(tasks).await?;
        let count = data.len();

        match &owner {
            MetaDataOwner::Collection(id) => {
                self.registry.collections.update(id, |c| {
                    data.into_iter().for_each(|(_, datum)| c.set_meta_datum(datum))
                });
            }
            MetaDataOwner::MediaEntry(id) => {
                self.registry.media_entries.update(id, |e| {
                    data.into_iter().for_each(|(_, datum)| e.set_meta_datum(datum))
                });
            }
        }
        Ok(count)
    }

    /// Resolves one meta datum. List values are populated with the people or
    /// keywords they link to, in the order their requests complete.
    pub async fn get_meta_datum(&self, path: &str) -> ClientResult<Option<MetaDatum>> {
        let Some(json) = self.fetch_optional(path).await? else {
            return Ok(None);
        };
        let Some(mut datum) = absent(MetaDatum::from_json(&json))? else {
            return Ok(None);
        };

        match datum.value() {
            Some(MetaValue::Text(_)) => return Ok(Some(datum)),
            Some(MetaValue::List(_)) => {}
            None => return Ok(None),
        }

        let mut tasks = JoinSet::new();
        for relation in Envelope::new(&json).members() {
            let kind = if relation.link.is_named(relation_names::PERSON) {
                ResourceKind::Person
            } else if relation.link.is_named(relation_names::KEYWORD) {
                ResourceKind::Keyword
            } else {
                tracing::debug!(relation = %relation.key, "Skipping unknown meta datum item");
                continue;
            };
            let client = self.clone();
            tasks.spawn(async move { client.meta_item(kind, &relation.link.href).await });
        }
        let mut failure = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(Some(item))) => {
                    datum.add_value(item);
                }
                Ok(Ok(None)) => {}
                Ok(Err(e)) => {
                    failure.get_or_insert(e);
                }
                Err(e) => tracing::error!(error = %e, "Meta datum item task failed"),
            }
        }
        match failure {
            Some(e) => Err(e),
            None => Ok(Some(datum)),
        }
    }

    /// Fetches a person unless already resolved.
    ///
    /// Returns `None` both when the person is already cached (no update
    /// needed, no request made) and when it cannot be resolved.
    pub async fn get_person(&self, path_or_id: &str) -> ClientResult<Option<Arc<Person>>> {
        self.fetch_once(
            ResourceKind::Person,
            path_or_id,
            &self.registry.people,
            Person::from_json,
        )
        .await
    }

    /// Fetches a keyword unless already resolved. Same contract as
    /// [`get_person`](Self::get_person).
    pub async fn get_keyword(&self, path_or_id: &str) -> ClientResult<Option<Arc<Keyword>>> {
        self.fetch_once(
            ResourceKind::Keyword,
            path_or_id,
            &self.registry.keywords,
            Keyword::from_json,
        )
        .await
    }

    /// Resolves a media file with all its previews; a file without a playable
    /// preview resolves to `None`.
    pub async fn get_media_file(&self, path: &str) -> ClientResult<Option<MediaFileMeta>> {
        let Some(json) = self.fetch_optional(path).await? else {
            return Ok(None);
        };
        let Some(mut file) = absent(MediaFileMeta::from_json(&json))? else {
            return Ok(None);
        };

        let envelope = Envelope::new(&json);
        let mut tasks = JoinSet::new();
        for (index, preview_id) in file.preview_ids.iter().enumerate() {
            let Some(link) = envelope.member(preview_id) else {
                tracing::debug!(
                    media_file_id = %file.id,
                    preview_id = %preview_id,
                    "Preview without relation"
                );
                continue;
            };
            let client = self.clone();
            tasks.spawn(async move { (index, client.get_preview(&link.href).await) });
        }
        for preview in in_discovery_order(gather(tasks).await?) {
            file.add_preview(preview);
        }

        if !file.is_playable() {
            tracing::warn!(media_file_id = %file.id, "Media file without playable preview");
            return Ok(None);
        }
        Ok(Some(file))
    }

    pub async fn get_preview(&self, path: &str) -> ClientResult<Option<Preview>> {
        let Some(json) = self.fetch_optional(path).await? else {
            return Ok(None);
        };
        absent(Preview::from_json(&json))
    }

    /// List item of a meta datum. Items already resolved come from the cache
    /// so an entity shared by several meta data shows up in each.
    async fn meta_item(&self, kind: ResourceKind, href: &str) -> ClientResult<Option<MetaItem>> {
        let id = ResourceRef::complete(kind, href).id;
        match kind {
            ResourceKind::Person => {
                if let Some(person) = self.registry.people.find(&id) {
                    return Ok(Some(MetaItem::Person(person)));
                }
                Ok(self.get_person(href).await?.map(MetaItem::Person))
            }
            _ => {
                if let Some(keyword) = self.registry.keywords.find(&id) {
                    return Ok(Some(MetaItem::Keyword(keyword)));
                }
                Ok(self.get_keyword(href).await?.map(MetaItem::Keyword))
            }
        }
    }

    async fn fetch_once<T>(
        &self,
        kind: ResourceKind,
        path_or_id: &str,
        cache: &EntityCache<T>,
        parse: fn(&JsonValue) -> ClientResult<T>,
    ) -> ClientResult<Option<Arc<T>>>
    where
        T: Entity + Clone,
    {
        let target = ResourceRef::complete(kind, path_or_id);
        if cache.contains(&target.id) {
            tracing::trace!(kind = %kind, id = %target.id, "Already resolved");
            return Ok(None);
        }
        let Some(json) = self.fetch_optional(&target.path).await? else {
            return Ok(None);
        };
        Ok(absent(parse(&json))?.map(|entity| cache.insert_if_absent(entity)))
    }
}

#[derive(Debug)]
enum MetaDataOwner {
    Collection(String),
    MediaEntry(String),
}

impl MetaDataOwner {
    fn is_known(&self, client: &ApiClient) -> bool {
        match self {
            MetaDataOwner::Collection(id) => client.registry.collections.contains(id),
            MetaDataOwner::MediaEntry(id) => client.registry.media_entries.contains(id),
        }
    }
}

fn document_id(json: &JsonValue) -> Option<&str> {
    json.get("id").and_then(JsonValue::as_str)
}

/// Awaits every task. Unavailable results are dropped; the first session
/// error is returned once all tasks have finished.
async fn gather<T: Send + 'static>(
    mut tasks: JoinSet<Resolved<T>>,
) -> ClientResult<Vec<(usize, T)>> {
    let mut resolved = Vec::with_capacity(tasks.len());
    let mut failure = None;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, Ok(Some(value)))) => resolved.push((index, value)),
            Ok((_, Ok(None))) => {}
            Ok((_, Err(e))) => {
                failure.get_or_insert(e);
            }
            Err(e) => tracing::error!(error = %e, "Resolution task failed"),
        }
    }
    match failure {
        Some(e) => Err(e),
        None => Ok(resolved),
    }
}

fn in_discovery_order<T>(mut resolved: Vec<(usize, T)>) -> Vec<T> {
    resolved.sort_by_key(|(index, _)| *index);
    resolved.into_iter().map(|(_, value)| value).collect()
}
