/// OMDb API provider
///
/// One endpoint, two query shapes: `t=` fetches full metadata for an exact
/// title, `s=` returns a loose page of candidate matches. Title searches are
/// cached in Redis; cache failures are logged and swallowed so a Redis
/// outage only costs API quota, never a request.
use reqwest::Client as HttpClient;

use crate::{
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{NewMovie, OmdbMovie},
    services::providers::MetadataProvider,
};

const SEARCH_CACHE_TTL: u64 = 3600; // 1 hour

#[derive(Clone)]
pub struct OmdbProvider {
    http_client: HttpClient,
    cache: Cache,
    api_key: String,
    api_url: String,
}

impl OmdbProvider {
    /// Creates a provider over a shared HTTP client. The client carries the
    /// request timeout, so a hung upstream call is bounded per request.
    pub fn new(http_client: HttpClient, cache: Cache, api_key: String, api_url: String) -> Self {
        Self {
            http_client,
            cache,
            api_key,
            api_url,
        }
    }

    async fn get(&self, param: &str, value: &str) -> AppResult<reqwest::Response> {
        let response = self
            .http_client
            .get(&self.api_url)
            .query(&[("apikey", self.api_key.as_str()), (param, value)])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "OMDb API returned status {}: {}",
                status, body
            )));
        }

        Ok(response)
    }
}

#[async_trait::async_trait]
impl MetadataProvider for OmdbProvider {
    async fn fetch_by_title(&self, title: &str) -> AppResult<Option<NewMovie>> {
        let response = self.get("t", title).await?;
        let movie: OmdbMovie = response.json().await?;

        let new_movie = movie.into_new_movie();

        tracing::debug!(
            title = %title,
            found = new_movie.is_some(),
            provider = self.name(),
            "Title fetch completed"
        );

        Ok(new_movie)
    }

    async fn search_titles(&self, query: &str) -> AppResult<Vec<String>> {
        let key = CacheKey::TitleSearch(query.to_string());

        match self.cache.get::<Vec<String>>(&key).await {
            Ok(Some(titles)) => {
                tracing::debug!(query = %query, "Title search cache hit");
                return Ok(titles);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Cache read failed, falling through to API"),
        }

        let response = self.get("s", query).await?;
        let body: serde_json::Value = response.json().await?;

        // OMDb omits "Search" entirely on no-match; entries without a
        // usable Title are skipped.
        let titles: Vec<String> = body["Search"]
            .as_array()
            .map(|results| {
                results
                    .iter()
                    .filter_map(|entry| entry["Title"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        if let Err(e) = self.cache.set(&key, &titles, SEARCH_CACHE_TTL).await {
            tracing::warn!(error = %e, "Cache write failed");
        }

        tracing::info!(
            query = %query,
            results = titles.len(),
            provider = self.name(),
            "Title search completed"
        );

        Ok(titles)
    }

    fn name(&self) -> &'static str {
        "omdb"
    }
}
