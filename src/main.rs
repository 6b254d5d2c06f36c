use std::{sync::Arc, time::Duration};

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use cinelog_api::{
    config::Config,
    db::{self, movies::PgMovieStore, user_movies::PgUserMovieStore},
    middleware::request_id::{make_span_with_request_id, request_id_middleware},
    routes::{create_router, AppState},
    services::{
        catalog::{CatalogService, MovieResolver},
        providers::omdb::OmdbProvider,
        watchlist::WatchlistService,
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,cinelog_api=debug,sqlx=warn".to_string()),
        )
        .init();

    let config = Config::from_env()?;
    tracing::info!(host = %config.host, port = config.port, "Starting cinelog-api");

    let pool = db::create_pool(&config.database_url).await?;
    sqlx::migrate!().run(&pool).await?;

    let redis_client = db::create_redis_client(&config.redis_url)?;
    let cache = db::Cache::new(redis_client);

    let http_client = reqwest::Client::builder()
        .user_agent(concat!("cinelog-api/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .build()?;

    let provider = Arc::new(OmdbProvider::new(
        http_client,
        cache,
        config.omdb_api_key.clone(),
        config.omdb_api_url.clone(),
    ));

    let movie_store = Arc::new(PgMovieStore::new(pool.clone()));
    let user_movie_store = Arc::new(PgUserMovieStore::new(pool));

    let catalog = Arc::new(CatalogService::new(movie_store, provider));
    let resolver: Arc<dyn MovieResolver> = catalog.clone();
    let watchlist = Arc::new(WatchlistService::new(resolver, user_movie_store));

    let state = Arc::new(AppState { catalog, watchlist });

    // Layer order: request id first so the trace span can pick it up.
    let app = create_router(state).layer(
        ServiceBuilder::new()
            .layer(axum::middleware::from_fn(request_id_middleware))
            .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
            .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any)),
    );

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Listening");
    axum::serve(listener, app).await?;

    Ok(())
}
