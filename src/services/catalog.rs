use std::sync::Arc;

use crate::{
    db::movies::MovieStore,
    error::{AppError, AppResult},
    models::Movie,
    services::providers::MetadataProvider,
};

/// Minimum local hit count below which `search` consults the provider.
const SEARCH_SUPPLEMENT_THRESHOLD: usize = 10;

/// Minimum local hit count below which `suggest` consults the provider.
const SUGGEST_SUPPLEMENT_THRESHOLD: usize = 5;

/// Maximum external fetch attempts per supplemented query.
const EXTERNAL_FAN_OUT: usize = 5;

/// Narrow resolution seam consumed by the watchlist engine: one title string
/// in, one canonical catalog record out.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MovieResolver: Send + Sync {
    async fn resolve(&self, title: &str) -> AppResult<Movie>;
}

/// Catalog service: hybrid local search supplemented from the external
/// provider, and the get-or-create `resolve` primitive.
///
/// This is the only component that inserts catalog records, and it inserts
/// at most one record per unique external id.
pub struct CatalogService {
    store: Arc<dyn MovieStore>,
    provider: Arc<dyn MetadataProvider>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn MovieStore>, provider: Arc<dyn MetadataProvider>) -> Self {
        Self { store, provider }
    }

    /// The full catalog, for the listing endpoint.
    pub async fn list_all(&self) -> AppResult<Vec<Movie>> {
        self.store.list_all().await
    }

    /// Hybrid-ranked search, supplemented with external candidates when the
    /// local catalog returns fewer than 10 hits.
    ///
    /// Local results come first, then newly ingested external records in
    /// provider order; the merged set is not re-ranked.
    pub async fn search(&self, query: &str) -> AppResult<Vec<Movie>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let local = self.store.search(query).await?;
        if local.len() >= SEARCH_SUPPLEMENT_THRESHOLD {
            return Ok(local);
        }

        let candidates = match self.provider.search_titles(query).await {
            Ok(titles) => titles,
            Err(e) => {
                // Supplementation is best-effort; a dead provider degrades
                // to local results instead of failing the search.
                tracing::warn!(query = %query, error = %e, "External candidate search failed");
                return Ok(local);
            }
        };

        let local_titles = self.store.list_titles().await?;
        let mut merged = local;
        let mut attempts = 0;

        for title in candidates {
            if attempts >= EXTERNAL_FAN_OUT {
                break;
            }
            if local_titles.iter().any(|t| t == &title) {
                continue;
            }

            attempts += 1;
            match self.fetch_and_ingest(&title).await {
                Ok(movie) => merged.push(movie),
                Err(e) => {
                    tracing::warn!(title = %title, error = %e, "Candidate ingest failed, skipping")
                }
            }
        }

        Ok(merged)
    }

    /// Prefix-based title suggestions, supplemented externally when fewer
    /// than 5 local titles match.
    ///
    /// Emits local titles first, then provider candidates in provider order,
    /// deduplicated by exact string equality. Ingestion of unknown
    /// candidates is a cache-warming side effect.
    pub async fn suggest(&self, query: &str) -> AppResult<Vec<String>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let local_titles = self.store.suggest_titles(query).await?;
        if local_titles.len() >= SUGGEST_SUPPLEMENT_THRESHOLD {
            return Ok(local_titles);
        }

        let candidates = match self.provider.search_titles(query).await {
            Ok(titles) => titles,
            Err(e) => {
                tracing::warn!(query = %query, error = %e, "External candidate search failed");
                return Ok(local_titles);
            }
        };

        let known_titles = self.store.list_titles().await?;
        let mut attempts = 0;

        for title in &candidates {
            if attempts >= EXTERNAL_FAN_OUT {
                break;
            }
            if known_titles.iter().any(|t| t == title) {
                continue;
            }

            attempts += 1;
            if let Err(e) = self.fetch_and_ingest(title).await {
                tracing::warn!(title = %title, error = %e, "Candidate ingest failed, skipping");
            }
        }

        let mut merged = local_titles;
        for title in candidates {
            if !merged.contains(&title) {
                merged.push(title);
            }
        }

        Ok(merged)
    }

    /// Fetches a single title from the provider and inserts it, deduplicated
    /// by external id.
    ///
    /// Two concurrent resolutions of the same unknown title can both pass
    /// the pre-insert check; the store's uniqueness constraint is the
    /// backstop, and the losing insert re-fetches the winning record.
    async fn fetch_and_ingest(&self, title: &str) -> AppResult<Movie> {
        let new_movie = self
            .provider
            .fetch_by_title(title)
            .await?
            .ok_or(AppError::MovieNotFound)?;

        if let Some(existing) = self.store.find_by_external_id(&new_movie.external_id).await? {
            return Ok(existing);
        }

        match self.store.insert(&new_movie).await {
            Ok(movie) => {
                tracing::info!(
                    title = %movie.title,
                    external_id = %new_movie.external_id,
                    "Catalog record ingested"
                );
                Ok(movie)
            }
            Err(AppError::CatalogConflict) => {
                // Lost the insert race; the winning record is authoritative.
                tracing::debug!(external_id = %new_movie.external_id, "Insert race lost, re-fetching");
                self.store
                    .find_by_external_id(&new_movie.external_id)
                    .await?
                    .ok_or_else(|| {
                        AppError::Internal(format!(
                            "Record with external id {} vanished after conflict",
                            new_movie.external_id
                        ))
                    })
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait::async_trait]
impl MovieResolver for CatalogService {
    /// Get-or-create: case-insensitive local title match, falling back to a
    /// provider fetch-and-ingest. `MovieNotFound` when neither side knows
    /// the title.
    async fn resolve(&self, title: &str) -> AppResult<Movie> {
        let title = title.trim();

        if let Some(movie) = self.store.find_by_title_ci(title).await? {
            return Ok(movie);
        }

        self.fetch_and_ingest(title).await
    }
}
