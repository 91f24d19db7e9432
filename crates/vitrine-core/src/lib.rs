//! Vitrine Core Library
//!
//! Entity model, identity caches, error types and configuration shared by the
//! API client and the player binary.

pub mod cache;
pub mod config;
pub mod constants;
pub mod error;
pub mod hypermedia;
pub mod models;
pub mod text;

// Re-export commonly used types
pub use cache::{EntityCache, Registry};
pub use config::{widen_white_list, PlaybackMode, PlayerConfig, Retries, RetryPolicy};
pub use error::{ClientError, ClientResult, LogLevel, RequestFailure};
pub use hypermedia::{Envelope, Link, Relation};
pub use models::{
    CachedMedia, Collection, Entity, Keyword, MediaEntry, MediaFileMeta, MediaKind, MetaData,
    MetaDataHolder, MetaDatum, MetaItem, MetaValue, Orientation, Person, Preview,
};
