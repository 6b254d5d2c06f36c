use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc, Mutex,
    },
};

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::json;
use uuid::Uuid;

use cinelog_api::{
    db::{movies::MovieStore, user_movies::UserMovieStore},
    error::{AppError, AppResult},
    middleware::request_id::request_id_middleware,
    models::{Movie, NewMovie, NewUserMovie, UserMovie, UserMovieWithMovie, WatchStatus},
    routes::{create_router, AppState},
    services::{
        catalog::{CatalogService, MovieResolver},
        providers::MetadataProvider,
        watchlist::WatchlistService,
    },
};

// ---------------------------------------------------------------------------
// In-memory fakes implementing the store and provider contracts
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FakeMovieStore {
    movies: Mutex<Vec<Movie>>,
    next_id: AtomicI64,
}

impl FakeMovieStore {
    fn get(&self, id: i64) -> Option<Movie> {
        self.movies.lock().unwrap().iter().find(|m| m.id == id).cloned()
    }
}

#[async_trait::async_trait]
impl MovieStore for FakeMovieStore {
    async fn find_by_title_ci(&self, title: &str) -> AppResult<Option<Movie>> {
        Ok(self
            .movies
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.title.eq_ignore_ascii_case(title))
            .cloned())
    }

    async fn find_by_external_id(&self, external_id: &str) -> AppResult<Option<Movie>> {
        Ok(self
            .movies
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.external_id.as_deref() == Some(external_id))
            .cloned())
    }

    async fn search(&self, query: &str) -> AppResult<Vec<Movie>> {
        let q = query.to_lowercase();
        let mut hits: Vec<Movie> = self
            .movies
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.title.to_lowercase().contains(&q))
            .cloned()
            .collect();
        hits.sort_by_key(|m| m.id);
        Ok(hits)
    }

    async fn suggest_titles(&self, prefix: &str) -> AppResult<Vec<String>> {
        let p = prefix.to_lowercase();
        let mut titles: Vec<String> = self
            .movies
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.title.to_lowercase().starts_with(&p))
            .map(|m| m.title.clone())
            .collect();
        titles.sort();
        Ok(titles)
    }

    async fn list_titles(&self) -> AppResult<Vec<String>> {
        Ok(self.movies.lock().unwrap().iter().map(|m| m.title.clone()).collect())
    }

    async fn list_all(&self) -> AppResult<Vec<Movie>> {
        Ok(self.movies.lock().unwrap().clone())
    }

    async fn insert(&self, movie: &NewMovie) -> AppResult<Movie> {
        let mut movies = self.movies.lock().unwrap();
        if movies
            .iter()
            .any(|m| m.external_id.as_deref() == Some(movie.external_id.as_str()))
        {
            return Err(AppError::CatalogConflict);
        }

        let stored = Movie {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            external_id: Some(movie.external_id.clone()),
            title: movie.title.clone(),
            year: movie.year,
            poster_url: movie.poster_url.clone(),
            genre: movie.genre.clone(),
            media_type: movie.media_type.clone(),
            overview: movie.overview.clone(),
            runtime: movie.runtime.clone(),
            external_rating: movie.external_rating,
        };
        movies.push(stored.clone());
        Ok(stored)
    }
}

struct FakeUserMovieStore {
    links: Mutex<Vec<UserMovie>>,
    next_id: AtomicI64,
    movies: Arc<FakeMovieStore>,
}

impl FakeUserMovieStore {
    fn new(movies: Arc<FakeMovieStore>) -> Self {
        Self {
            links: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(0),
            movies,
        }
    }
}

#[async_trait::async_trait]
impl UserMovieStore for FakeUserMovieStore {
    async fn find_by_user_and_movie(
        &self,
        user_id: Uuid,
        movie_id: i64,
    ) -> AppResult<Option<UserMovie>> {
        Ok(self
            .links
            .lock()
            .unwrap()
            .iter()
            .find(|l| l.user_id == user_id && l.movie_id == movie_id)
            .cloned())
    }

    async fn find_first_by_user_and_title(
        &self,
        user_id: Uuid,
        title: &str,
    ) -> AppResult<Option<UserMovie>> {
        let t = title.to_lowercase();
        let links = self.links.lock().unwrap();
        let mut matches: Vec<&UserMovie> = links
            .iter()
            .filter(|l| {
                l.user_id == user_id
                    && self
                        .movies
                        .get(l.movie_id)
                        .map(|m| m.title.to_lowercase().contains(&t))
                        .unwrap_or(false)
            })
            .collect();
        matches.sort_by_key(|l| l.id);
        Ok(matches.first().map(|l| (*l).clone()))
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        status: Option<WatchStatus>,
        favorite: Option<bool>,
    ) -> AppResult<Vec<UserMovieWithMovie>> {
        let links = self.links.lock().unwrap();
        let mut rows: Vec<UserMovieWithMovie> = links
            .iter()
            .filter(|l| l.user_id == user_id)
            .filter(|l| status.map(|s| l.status == Some(s)).unwrap_or(true))
            .filter(|l| favorite.map(|f| l.is_favorite == f).unwrap_or(true))
            .map(|l| UserMovieWithMovie {
                id: l.id,
                status: l.status,
                is_favorite: l.is_favorite,
                user_rating: l.user_rating,
                added_at: l.added_at,
                movie: self.movies.get(l.movie_id).expect("link references a movie"),
            })
            .collect();
        rows.sort_by_key(|r| r.id);
        Ok(rows)
    }

    async fn insert(&self, link: &NewUserMovie) -> AppResult<UserMovie> {
        let stored = UserMovie {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            user_id: link.user_id,
            movie_id: link.movie_id,
            status: link.status,
            is_favorite: link.is_favorite,
            user_rating: link.user_rating,
            added_at: link.added_at,
        };
        self.links.lock().unwrap().push(stored.clone());
        Ok(stored)
    }

    async fn update(&self, link: &UserMovie) -> AppResult<()> {
        let mut links = self.links.lock().unwrap();
        if let Some(existing) = links.iter_mut().find(|l| l.id == link.id) {
            *existing = link.clone();
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        self.links.lock().unwrap().retain(|l| l.id != id);
        Ok(())
    }
}

#[derive(Default)]
struct FakeProvider {
    titles_by_query: HashMap<String, Vec<String>>,
    movies_by_title: HashMap<String, NewMovie>,
}

impl FakeProvider {
    fn with_movie(mut self, title: &str, external_id: &str) -> Self {
        self.movies_by_title.insert(
            title.to_string(),
            NewMovie {
                external_id: external_id.to_string(),
                title: title.to_string(),
                year: Some(1999),
                poster_url: None,
                genre: Some("Action, Sci-Fi".to_string()),
                media_type: Some("movie".to_string()),
                overview: None,
                runtime: None,
                external_rating: Some(8.7),
            },
        );
        self
    }

    fn with_search(mut self, query: &str, titles: &[&str]) -> Self {
        self.titles_by_query
            .insert(query.to_string(), titles.iter().map(|t| t.to_string()).collect());
        self
    }
}

#[async_trait::async_trait]
impl MetadataProvider for FakeProvider {
    async fn fetch_by_title(&self, title: &str) -> AppResult<Option<NewMovie>> {
        Ok(self.movies_by_title.get(title).cloned())
    }

    async fn search_titles(&self, query: &str) -> AppResult<Vec<String>> {
        Ok(self.titles_by_query.get(query).cloned().unwrap_or_default())
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

// ---------------------------------------------------------------------------
// Test server wiring
// ---------------------------------------------------------------------------

fn create_test_server(provider: FakeProvider) -> TestServer {
    let movie_store = Arc::new(FakeMovieStore::default());
    let user_movie_store = Arc::new(FakeUserMovieStore::new(movie_store.clone()));

    let catalog = Arc::new(CatalogService::new(movie_store, Arc::new(provider)));
    let resolver: Arc<dyn MovieResolver> = catalog.clone();
    let watchlist = Arc::new(WatchlistService::new(resolver, user_movie_store));

    let state = Arc::new(AppState { catalog, watchlist });
    let app = create_router(state).layer(axum::middleware::from_fn(request_id_middleware));
    TestServer::new(app).unwrap()
}

fn user_header() -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("x-user-id"),
        HeaderValue::from_str(&Uuid::from_u128(42).to_string()).unwrap(),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server(FakeProvider::default());
    let response = server.get("/health").await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_request_id_echoed_on_response() {
    let server = create_test_server(FakeProvider::default());
    let response = server.get("/health").await;
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_user_movies_require_identity() {
    let server = create_test_server(FakeProvider::default());

    let response = server.get("/api/v1/user-movies").await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let (name, _) = user_header();
    let response = server
        .get("/api/v1/user-movies")
        .add_header(name, HeaderValue::from_static("not-a-uuid"))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_search_supplements_from_provider_and_ingests() {
    let provider = FakeProvider::default()
        .with_search("Matrix", &["The Matrix", "The Matrix Reloaded"])
        .with_movie("The Matrix", "tt0133093")
        .with_movie("The Matrix Reloaded", "tt0234215");
    let server = create_test_server(provider);

    let response = server.get("/api/v1/movies/search").add_query_param("q", "Matrix").await;
    response.assert_status_ok();
    let results: Vec<serde_json::Value> = response.json();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["title"], "The Matrix");
    assert_eq!(results[1]["title"], "The Matrix Reloaded");

    // Both candidates were ingested into the catalog.
    let response = server.get("/api/v1/movies").await;
    response.assert_status_ok();
    let catalog: Vec<serde_json::Value> = response.json();
    assert_eq!(catalog.len(), 2);
}

#[tokio::test]
async fn test_search_blank_query_returns_empty() {
    let server = create_test_server(FakeProvider::default());
    let response = server.get("/api/v1/movies/search").add_query_param("q", "   ").await;
    response.assert_status_ok();
    let results: Vec<serde_json::Value> = response.json();
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_suggest_merges_local_and_provider_titles() {
    let provider = FakeProvider::default()
        .with_search("The", &["The Matrix", "The Terminator"])
        .with_search("The Matrix", &["The Matrix"])
        .with_movie("The Matrix", "tt0133093")
        .with_movie("The Terminator", "tt0088247");
    let server = create_test_server(provider);

    // Warm the catalog with one of the two titles.
    let response = server.get("/api/v1/movies/search").add_query_param("q", "The Matrix").await;
    response.assert_status_ok();

    let response = server
        .get("/api/v1/movies/search/suggest")
        .add_query_param("q", "The")
        .await;
    response.assert_status_ok();
    let suggestions: Vec<String> = response.json();
    // Local title first, provider candidates after, no duplicates.
    assert_eq!(suggestions, vec!["The Matrix", "The Terminator"]);
}

#[tokio::test]
async fn test_status_lifecycle() {
    let provider = FakeProvider::default().with_movie("Inception", "tt1375666");
    let server = create_test_server(provider);
    let (name, value) = user_header();

    // First status set creates the link.
    let response = server
        .patch("/api/v1/user-movies/status")
        .add_header(name.clone(), value.clone())
        .json(&json!({ "title": "Inception", "status": "COMPLETED" }))
        .await;
    response.assert_status_ok();

    let response = server
        .get("/api/v1/user-movies")
        .add_header(name.clone(), value.clone())
        .await;
    response.assert_status_ok();
    let listed: Vec<serde_json::Value> = response.json();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["status"], "COMPLETED");
    assert_eq!(listed[0]["is_favorite"], false);
    assert_eq!(listed[0]["movie"]["title"], "Inception");

    // Re-setting the same status is rejected.
    let response = server
        .patch("/api/v1/user-movies/status")
        .add_header(name.clone(), value.clone())
        .json(&json!({ "title": "Inception", "status": "COMPLETED" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    // Clearing the status removes the link entirely.
    let response = server
        .patch("/api/v1/user-movies/status")
        .add_header(name.clone(), value.clone())
        .json(&json!({ "title": "Inception", "status": null }))
        .await;
    response.assert_status_ok();

    let response = server
        .get("/api/v1/user-movies")
        .add_header(name.clone(), value.clone())
        .await;
    let listed: Vec<serde_json::Value> = response.json();
    assert!(listed.is_empty());

    // Rating a movie that is no longer on any list fails.
    let response = server
        .patch("/api/v1/user-movies/user-rate")
        .add_header(name.clone(), value.clone())
        .json(&json!({ "title": "Inception", "rate": 8.0 }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    // Clearing again also fails: nothing left to remove.
    let response = server
        .patch("/api/v1/user-movies/status")
        .add_header(name, value)
        .json(&json!({ "title": "Inception", "status": null }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_favorite_lifecycle() {
    let provider = FakeProvider::default().with_movie("Dune", "tt1160419");
    let server = create_test_server(provider);
    let (name, value) = user_header();

    // Favoriting twice is idempotent.
    for _ in 0..2 {
        let response = server
            .patch("/api/v1/user-movies/favorite")
            .add_header(name.clone(), value.clone())
            .json(&json!({ "title": "Dune", "favorite": true }))
            .await;
        response.assert_status_ok();
    }

    let response = server
        .get("/api/v1/user-movies")
        .add_header(name.clone(), value.clone())
        .await;
    let listed: Vec<serde_json::Value> = response.json();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["is_favorite"], true);
    assert_eq!(listed[0]["status"], serde_json::Value::Null);

    // A rating needs a status, favorite alone is not enough.
    let response = server
        .patch("/api/v1/user-movies/user-rate")
        .add_header(name.clone(), value.clone())
        .json(&json!({ "title": "Dune", "rate": 9.0 }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    // Unfavoriting the status-less link deletes it.
    let response = server
        .patch("/api/v1/user-movies/favorite")
        .add_header(name.clone(), value.clone())
        .json(&json!({ "title": "Dune", "favorite": false }))
        .await;
    response.assert_status_ok();

    let response = server
        .get("/api/v1/user-movies")
        .add_header(name.clone(), value.clone())
        .await;
    let listed: Vec<serde_json::Value> = response.json();
    assert!(listed.is_empty());

    // Unfavoriting with no link left fails.
    let response = server
        .patch("/api/v1/user-movies/favorite")
        .add_header(name, value)
        .json(&json!({ "title": "Dune", "favorite": false }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unfavorite_keeps_status_and_rating_flow() {
    let provider = FakeProvider::default().with_movie("Inception", "tt1375666");
    let server = create_test_server(provider);
    let (name, value) = user_header();

    server
        .patch("/api/v1/user-movies/status")
        .add_header(name.clone(), value.clone())
        .json(&json!({ "title": "Inception", "status": "WATCHING" }))
        .await
        .assert_status_ok();
    server
        .patch("/api/v1/user-movies/favorite")
        .add_header(name.clone(), value.clone())
        .json(&json!({ "title": "Inception", "favorite": true }))
        .await
        .assert_status_ok();
    server
        .patch("/api/v1/user-movies/user-rate")
        .add_header(name.clone(), value.clone())
        .json(&json!({ "title": "Inception", "rate": 8.5 }))
        .await
        .assert_status_ok();

    // Unfavoriting keeps the status and rating.
    server
        .patch("/api/v1/user-movies/favorite")
        .add_header(name.clone(), value.clone())
        .json(&json!({ "title": "Inception", "favorite": false }))
        .await
        .assert_status_ok();

    let response = server
        .get("/api/v1/user-movies")
        .add_header(name, value)
        .await;
    let listed: Vec<serde_json::Value> = response.json();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["status"], "WATCHING");
    assert_eq!(listed[0]["is_favorite"], false);
    assert_eq!(listed[0]["user_rating"], 8.5);
}

#[tokio::test]
async fn test_rating_bounds() {
    let provider = FakeProvider::default().with_movie("Inception", "tt1375666");
    let server = create_test_server(provider);
    let (name, value) = user_header();

    server
        .patch("/api/v1/user-movies/status")
        .add_header(name.clone(), value.clone())
        .json(&json!({ "title": "Inception", "status": "COMPLETED" }))
        .await
        .assert_status_ok();

    for rate in [-0.01, 10.01] {
        let response = server
            .patch("/api/v1/user-movies/user-rate")
            .add_header(name.clone(), value.clone())
            .json(&json!({ "title": "Inception", "rate": rate }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    for rate in [0.0, 10.0] {
        let response = server
            .patch("/api/v1/user-movies/user-rate")
            .add_header(name.clone(), value.clone())
            .json(&json!({ "title": "Inception", "rate": rate }))
            .await;
        response.assert_status_ok();
    }
}

#[tokio::test]
async fn test_filtered_listing() {
    let provider = FakeProvider::default()
        .with_movie("Inception", "tt1375666")
        .with_movie("Dune", "tt1160419");
    let server = create_test_server(provider);
    let (name, value) = user_header();

    server
        .patch("/api/v1/user-movies/status")
        .add_header(name.clone(), value.clone())
        .json(&json!({ "title": "Inception", "status": "COMPLETED" }))
        .await
        .assert_status_ok();
    server
        .patch("/api/v1/user-movies/status")
        .add_header(name.clone(), value.clone())
        .json(&json!({ "title": "Dune", "status": "WATCHING" }))
        .await
        .assert_status_ok();
    server
        .patch("/api/v1/user-movies/favorite")
        .add_header(name.clone(), value.clone())
        .json(&json!({ "title": "Dune", "favorite": true }))
        .await
        .assert_status_ok();

    let response = server
        .get("/api/v1/user-movies")
        .add_header(name.clone(), value.clone())
        .add_query_param("favorite", "true")
        .await;
    let listed: Vec<serde_json::Value> = response.json();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["movie"]["title"], "Dune");

    let response = server
        .get("/api/v1/user-movies")
        .add_header(name.clone(), value.clone())
        .add_query_param("status", "COMPLETED")
        .await;
    let listed: Vec<serde_json::Value> = response.json();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["movie"]["title"], "Inception");

    let response = server
        .get("/api/v1/user-movies")
        .add_header(name.clone(), value.clone())
        .add_query_param("status", "WATCHING")
        .add_query_param("favorite", "false")
        .await;
    let listed: Vec<serde_json::Value> = response.json();
    assert!(listed.is_empty());

    let response = server.get("/api/v1/user-movies").add_header(name, value).await;
    let listed: Vec<serde_json::Value> = response.json();
    assert_eq!(listed.len(), 2);
}

#[tokio::test]
async fn test_unknown_title_maps_to_404() {
    let server = create_test_server(FakeProvider::default());
    let (name, value) = user_header();

    let response = server
        .patch("/api/v1/user-movies/status")
        .add_header(name, value)
        .json(&json!({ "title": "No Such Movie", "status": "COMPLETED" }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_blank_title_rejected_at_boundary() {
    let server = create_test_server(FakeProvider::default());
    let (name, value) = user_header();

    let response = server
        .patch("/api/v1/user-movies/status")
        .add_header(name, value)
        .json(&json!({ "title": "   ", "status": "COMPLETED" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}
