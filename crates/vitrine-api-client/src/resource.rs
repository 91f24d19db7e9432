//! Addressing of the four top-level resource kinds.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    MediaEntry,
    Collection,
    Person,
    Keyword,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::MediaEntry,
        ResourceKind::Collection,
        ResourceKind::Person,
        ResourceKind::Keyword,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::MediaEntry => "media-entry",
            ResourceKind::Collection => "collection",
            ResourceKind::Person => "person",
            ResourceKind::Keyword => "keyword",
        }
    }

    pub fn parse(kind: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == kind)
    }

    /// Path prefix shared by every resource of this kind.
    pub fn prefix(&self) -> &'static str {
        match self {
            ResourceKind::MediaEntry => "/api/media-entries/",
            ResourceKind::Collection => "/api/collections/",
            ResourceKind::Person => "/api/people/",
            ResourceKind::Keyword => "/api/keywords/",
        }
    }

    pub fn path(&self, id: &str) -> String {
        format!("{}{}", self.prefix(), id)
    }

    /// Kind whose prefix appears in `path`.
    pub fn of_path(path: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| path.contains(k.prefix()))
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resource known by both its path and its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    pub path: String,
    pub id: String,
    pub kind: Option<ResourceKind>,
}

impl ResourceRef {
    pub fn from_id(kind: ResourceKind, id: &str) -> Self {
        Self {
            path: kind.path(id),
            id: id.to_string(),
            kind: Some(kind),
        }
    }

    pub fn from_path(path: &str) -> Self {
        Self {
            path: path.to_string(),
            id: path_to_id(path).to_string(),
            kind: ResourceKind::of_path(path),
        }
    }

    /// Accepts either an API path (starting with `/` or a full URL) or a bare
    /// id of `kind`.
    pub fn complete(kind: ResourceKind, path_or_id: &str) -> Self {
        if path_or_id.starts_with('/') || path_or_id.contains("://") {
            Self::from_path(path_or_id)
        } else {
            Self::from_id(kind, path_or_id)
        }
    }
}

/// Path for `id` of the kind named `kind`; `None` for an unknown kind.
pub fn id_to_path(id: &str, kind: &str) -> Option<String> {
    ResourceKind::parse(kind).map(|k| k.path(id))
}

/// Last path segment, without query string or trailing slash.
pub fn path_to_id(path: &str) -> &str {
    let path = path.split(['?', '{']).next().unwrap_or(path);
    path.trim_end_matches('/').rsplit('/').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_and_path_round_trip() {
        let r = ResourceRef::complete(ResourceKind::Person, "p-42");
        assert_eq!(r.path, "/api/people/p-42");

        let back = ResourceRef::complete(ResourceKind::Person, &r.path);
        assert_eq!(back.id, "p-42");
        assert_eq!(back.kind, Some(ResourceKind::Person));
    }

    #[test]
    fn path_to_id_ignores_query_and_slash() {
        assert_eq!(path_to_id("/api/media-entries/e1?meta_keys=x"), "e1");
        assert_eq!(path_to_id("/api/collections/c1/"), "c1");
        assert_eq!(path_to_id("/api/keywords/k1"), "k1");
        assert_eq!(path_to_id("k1"), "k1");
    }

    #[test]
    fn unknown_kind_has_no_path() {
        assert_eq!(id_to_path("x", "filter-set"), None);
        assert_eq!(
            id_to_path("c1", "collection").as_deref(),
            Some("/api/collections/c1")
        );
    }

    #[test]
    fn kind_is_recognized_in_full_urls() {
        let r = ResourceRef::from_path("https://medienarchiv.zhdk.ch/api/media-entries/e9");
        assert_eq!(r.kind, Some(ResourceKind::MediaEntry));
        assert_eq!(r.id, "e9");
        assert_eq!(ResourceRef::from_path("/api/previews/p1").kind, None);
    }
}
