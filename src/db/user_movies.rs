use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{Movie, NewUserMovie, UserMovie, UserMovieWithMovie, WatchStatus},
};

/// Column list shared across single-table queries.
const COLUMNS: &str = "id, user_id, movie_id, status, is_favorite, user_rating, added_at";

/// Column list for the link-plus-movie join; movie columns are aliased with
/// an `m_` prefix so the flat row can be split back into two values.
const JOINED_COLUMNS: &str =
    "um.id, um.user_id, um.movie_id, um.status, um.is_favorite, um.user_rating, um.added_at, \
     m.id AS m_id, m.external_id AS m_external_id, m.title AS m_title, m.year AS m_year, \
     m.poster_url AS m_poster_url, m.genre AS m_genre, m.media_type AS m_media_type, \
     m.overview AS m_overview, m.runtime AS m_runtime, m.external_rating AS m_external_rating";

/// Persistence contract for user-movie links.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait UserMovieStore: Send + Sync {
    /// Lookup by the natural key (user, movie).
    async fn find_by_user_and_movie(
        &self,
        user_id: Uuid,
        movie_id: i64,
    ) -> AppResult<Option<UserMovie>>;

    /// Case-insensitive title-contains lookup, first match by link id.
    async fn find_first_by_user_and_title(
        &self,
        user_id: Uuid,
        title: &str,
    ) -> AppResult<Option<UserMovie>>;

    /// Filtered listing for one user, catalog metadata attached. `None`
    /// filters are unconstrained; present filters combine with AND.
    async fn list_for_user(
        &self,
        user_id: Uuid,
        status: Option<WatchStatus>,
        favorite: Option<bool>,
    ) -> AppResult<Vec<UserMovieWithMovie>>;

    async fn insert(&self, link: &NewUserMovie) -> AppResult<UserMovie>;

    /// Updates status, favorite flag and rating in place.
    async fn update(&self, link: &UserMovie) -> AppResult<()>;

    async fn delete(&self, id: i64) -> AppResult<()>;
}

/// Flat row produced by the join query, split into link + movie afterwards.
#[derive(sqlx::FromRow)]
struct JoinedRow {
    id: i64,
    #[allow(dead_code)]
    user_id: Uuid,
    #[allow(dead_code)]
    movie_id: i64,
    status: Option<WatchStatus>,
    is_favorite: bool,
    user_rating: Option<f64>,
    added_at: NaiveDate,
    m_id: i64,
    m_external_id: Option<String>,
    m_title: String,
    m_year: Option<i32>,
    m_poster_url: Option<String>,
    m_genre: Option<String>,
    m_media_type: Option<String>,
    m_overview: Option<String>,
    m_runtime: Option<String>,
    m_external_rating: Option<f64>,
}

impl From<JoinedRow> for UserMovieWithMovie {
    fn from(row: JoinedRow) -> Self {
        UserMovieWithMovie {
            id: row.id,
            status: row.status,
            is_favorite: row.is_favorite,
            user_rating: row.user_rating,
            added_at: row.added_at,
            movie: Movie {
                id: row.m_id,
                external_id: row.m_external_id,
                title: row.m_title,
                year: row.m_year,
                poster_url: row.m_poster_url,
                genre: row.m_genre,
                media_type: row.m_media_type,
                overview: row.m_overview,
                runtime: row.m_runtime,
                external_rating: row.m_external_rating,
            },
        }
    }
}

/// PostgreSQL-backed link store.
pub struct PgUserMovieStore {
    pool: PgPool,
}

impl PgUserMovieStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl UserMovieStore for PgUserMovieStore {
    async fn find_by_user_and_movie(
        &self,
        user_id: Uuid,
        movie_id: i64,
    ) -> AppResult<Option<UserMovie>> {
        let query =
            format!("SELECT {COLUMNS} FROM user_movies WHERE user_id = $1 AND movie_id = $2");
        let link = sqlx::query_as::<_, UserMovie>(&query)
            .bind(user_id)
            .bind(movie_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(link)
    }

    async fn find_first_by_user_and_title(
        &self,
        user_id: Uuid,
        title: &str,
    ) -> AppResult<Option<UserMovie>> {
        let query = format!(
            "SELECT {COLUMNS_PREFIXED} FROM user_movies um
             JOIN movies m ON m.id = um.movie_id
             WHERE um.user_id = $1 AND LOWER(m.title) LIKE LOWER('%' || $2 || '%')
             ORDER BY um.id
             LIMIT 1",
            COLUMNS_PREFIXED = "um.id, um.user_id, um.movie_id, um.status, \
                                um.is_favorite, um.user_rating, um.added_at"
        );
        let link = sqlx::query_as::<_, UserMovie>(&query)
            .bind(user_id)
            .bind(title)
            .fetch_optional(&self.pool)
            .await?;
        Ok(link)
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        status: Option<WatchStatus>,
        favorite: Option<bool>,
    ) -> AppResult<Vec<UserMovieWithMovie>> {
        let base = format!(
            "SELECT {JOINED_COLUMNS} FROM user_movies um
             JOIN movies m ON m.id = um.movie_id
             WHERE um.user_id = $1"
        );

        // Four query shapes, one per filter combination.
        let rows: Vec<JoinedRow> = match (status, favorite) {
            (None, None) => {
                let query = format!("{base} ORDER BY um.id");
                sqlx::query_as(&query).bind(user_id).fetch_all(&self.pool).await?
            }
            (Some(s), None) => {
                let query = format!("{base} AND um.status = $2 ORDER BY um.id");
                sqlx::query_as(&query)
                    .bind(user_id)
                    .bind(s)
                    .fetch_all(&self.pool)
                    .await?
            }
            (None, Some(f)) => {
                let query = format!("{base} AND um.is_favorite = $2 ORDER BY um.id");
                sqlx::query_as(&query)
                    .bind(user_id)
                    .bind(f)
                    .fetch_all(&self.pool)
                    .await?
            }
            (Some(s), Some(f)) => {
                let query =
                    format!("{base} AND um.status = $2 AND um.is_favorite = $3 ORDER BY um.id");
                sqlx::query_as(&query)
                    .bind(user_id)
                    .bind(s)
                    .bind(f)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(rows.into_iter().map(UserMovieWithMovie::from).collect())
    }

    async fn insert(&self, link: &NewUserMovie) -> AppResult<UserMovie> {
        let query = format!(
            "INSERT INTO user_movies
                 (user_id, movie_id, status, is_favorite, user_rating, added_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        let stored = sqlx::query_as::<_, UserMovie>(&query)
            .bind(link.user_id)
            .bind(link.movie_id)
            .bind(link.status)
            .bind(link.is_favorite)
            .bind(link.user_rating)
            .bind(link.added_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(stored)
    }

    async fn update(&self, link: &UserMovie) -> AppResult<()> {
        sqlx::query(
            "UPDATE user_movies SET status = $2, is_favorite = $3, user_rating = $4 WHERE id = $1",
        )
        .bind(link.id)
        .bind(link.status)
        .bind(link.is_favorite)
        .bind(link.user_rating)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        sqlx::query("DELETE FROM user_movies WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
