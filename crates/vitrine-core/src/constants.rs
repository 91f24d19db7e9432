//! Wire constants of the hypermedia API and well-known meta keys.

/// Reserved key carrying the hypermedia envelope in every document.
pub const ROA_KEY: &str = "_json-roa";

/// Value sent as both `Accept` and `Content-Type`.
pub const ROA_MEDIA_TYPE: &str = "application/json-roa+json";

/// Meta keys that are always requested, whatever the caller's white list.
pub const META_DATA_MINIMUM: [&str; 3] = [
    meta_keys::AUTHORS,
    meta_keys::TITLE,
    meta_keys::COPYRIGHT_NOTICE,
];

/// Maximum characters of a single serialized meta value.
pub const META_VALUE_BUDGET: usize = 500;

/// Well-known meta keys.
pub mod meta_keys {
    pub const TITLE: &str = "madek_core:title";
    pub const AUTHORS: &str = "madek_core:authors";
    pub const KEYWORDS: &str = "madek_core:keywords";
    pub const DESCRIPTION: &str = "madek_core:description";
    pub const COPYRIGHT_NOTICE: &str = "madek_core:copyright_notice";
    pub const PROJECT_TYPE: &str = "zhdk_bereich:project_type";
    pub const ACADEMIC_YEAR: &str = "zhdk_bereich:academic_year";
    pub const CONTENT_TYPE: &str = "media_content:type";
    pub const PORTRAYED_OBJECT_MATERIALS: &str = "media_content:portrayed_object_materials";
}
