/// External metadata provider abstraction
///
/// The provider is a best-effort oracle consulted only when the local
/// catalog misses: a keyed lookup for one exact title and a loose
/// free-text search for candidate titles.
use crate::{error::AppResult, models::NewMovie};

pub mod omdb;

/// Trait for external movie-metadata providers.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Fetch full metadata for an exact title.
    ///
    /// Returns `Ok(None)` when the provider has no match for that title;
    /// transport and upstream failures are errors.
    async fn fetch_by_title(&self, title: &str) -> AppResult<Option<NewMovie>>;

    /// Search for candidate titles matching a free-text query.
    ///
    /// Malformed entries in the provider response are skipped, not errors.
    async fn search_titles(&self, query: &str) -> AppResult<Vec<String>>;

    /// Provider name for logging and debugging.
    fn name(&self) -> &'static str;
}
