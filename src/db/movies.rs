use sqlx::PgPool;

use crate::{
    error::{AppError, AppResult},
    models::{Movie, NewMovie},
};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, external_id, title, year, poster_url, genre, \
                       media_type, overview, runtime, external_rating";

/// Page size of the hybrid search query.
const SEARCH_LIMIT: i64 = 20;

/// Persistence contract for catalog records.
///
/// Uniqueness of non-null `external_id` is enforced by the store
/// (`uq_movies_external_id`); `insert` surfaces a violation as
/// [`AppError::CatalogConflict`] so the resolver can recover.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MovieStore: Send + Sync {
    /// Case-insensitive exact title lookup.
    async fn find_by_title_ci(&self, title: &str) -> AppResult<Option<Movie>>;

    /// Lookup by the external provider id.
    async fn find_by_external_id(&self, external_id: &str) -> AppResult<Option<Movie>>;

    /// Hybrid-ranked search: exact/prefix boosts plus the greater of trigram
    /// similarity and full-text rank, descending, ties broken by id.
    async fn search(&self, query: &str) -> AppResult<Vec<Movie>>;

    /// Title-prefix lookup, alphabetical.
    async fn suggest_titles(&self, prefix: &str) -> AppResult<Vec<String>>;

    /// All titles currently in the catalog.
    async fn list_titles(&self) -> AppResult<Vec<String>>;

    /// The full catalog.
    async fn list_all(&self) -> AppResult<Vec<Movie>>;

    /// Inserts a record, returning the stored row.
    async fn insert(&self, movie: &NewMovie) -> AppResult<Movie>;
}

/// PostgreSQL-backed catalog store.
pub struct PgMovieStore {
    pool: PgPool,
}

impl PgMovieStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl MovieStore for PgMovieStore {
    async fn find_by_title_ci(&self, title: &str) -> AppResult<Option<Movie>> {
        let query = format!("SELECT {COLUMNS} FROM movies WHERE LOWER(title) = LOWER($1)");
        let movie = sqlx::query_as::<_, Movie>(&query)
            .bind(title)
            .fetch_optional(&self.pool)
            .await?;
        Ok(movie)
    }

    async fn find_by_external_id(&self, external_id: &str) -> AppResult<Option<Movie>> {
        let query = format!("SELECT {COLUMNS} FROM movies WHERE external_id = $1");
        let movie = sqlx::query_as::<_, Movie>(&query)
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(movie)
    }

    async fn search(&self, query: &str) -> AppResult<Vec<Movie>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM movies
             WHERE
                 title ILIKE $1 || '%'
                 OR similarity(title, $1) > 0.3
                 OR search_vector @@ websearch_to_tsquery('english', $1)
             ORDER BY (
                 CASE
                     WHEN title ILIKE $1 THEN 3.0
                     WHEN title ILIKE $1 || '%' THEN 2.0
                     ELSE 0.0
                 END
                 +
                 GREATEST(
                     similarity(title, $1),
                     ts_rank_cd(search_vector, websearch_to_tsquery('english', $1))
                 )
             ) DESC, id
             LIMIT {SEARCH_LIMIT}"
        );
        let movies = sqlx::query_as::<_, Movie>(&sql)
            .bind(query)
            .fetch_all(&self.pool)
            .await?;
        Ok(movies)
    }

    async fn suggest_titles(&self, prefix: &str) -> AppResult<Vec<String>> {
        let titles = sqlx::query_scalar::<_, String>(
            "SELECT title FROM movies WHERE title ILIKE $1 || '%' ORDER BY title",
        )
        .bind(prefix)
        .fetch_all(&self.pool)
        .await?;
        Ok(titles)
    }

    async fn list_titles(&self) -> AppResult<Vec<String>> {
        let titles = sqlx::query_scalar::<_, String>("SELECT title FROM movies")
            .fetch_all(&self.pool)
            .await?;
        Ok(titles)
    }

    async fn list_all(&self) -> AppResult<Vec<Movie>> {
        let query = format!("SELECT {COLUMNS} FROM movies ORDER BY id");
        let movies = sqlx::query_as::<_, Movie>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(movies)
    }

    async fn insert(&self, movie: &NewMovie) -> AppResult<Movie> {
        let query = format!(
            "INSERT INTO movies
                 (external_id, title, year, poster_url, genre, media_type,
                  overview, runtime, external_rating)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Movie>(&query)
            .bind(&movie.external_id)
            .bind(&movie.title)
            .bind(movie.year)
            .bind(&movie.poster_url)
            .bind(&movie.genre)
            .bind(&movie.media_type)
            .bind(&movie.overview)
            .bind(&movie.runtime)
            .bind(movie.external_rating)
            .fetch_one(&self.pool)
            .await
            .map_err(classify_insert_error)
    }
}

/// Maps a unique-violation on the external-id constraint to
/// `CatalogConflict`; everything else stays a database error.
fn classify_insert_error(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505")
            && db_err.constraint() == Some("uq_movies_external_id")
        {
            return AppError::CatalogConflict;
        }
    }
    AppError::Database(err)
}
