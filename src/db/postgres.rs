use sqlx::{postgres::PgPoolOptions, PgPool};

/// Creates the PostgreSQL connection pool shared by both stores.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}
