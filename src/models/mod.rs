use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use uuid::Uuid;

/// Watch status of a movie on a user's lists.
///
/// A link may also carry no status at all (`Option<WatchStatus>::None`),
/// meaning the movie is favorited but on no list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "watch_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WatchStatus {
    PlanToWatch,
    Watching,
    Completed,
    Dropped,
}

impl Display for WatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WatchStatus::PlanToWatch => "PLAN_TO_WATCH",
            WatchStatus::Watching => "WATCHING",
            WatchStatus::Completed => "COMPLETED",
            WatchStatus::Dropped => "DROPPED",
        };
        write!(f, "{}", s)
    }
}

/// Canonical catalog record for one movie or show.
///
/// Created only by the resolver and never mutated afterwards; `external_id`
/// is the dedup key (unique when present).
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Movie {
    pub id: i64,
    pub external_id: Option<String>,
    pub title: String,
    pub year: Option<i32>,
    pub poster_url: Option<String>,
    pub genre: Option<String>,
    pub media_type: Option<String>,
    pub overview: Option<String>,
    pub runtime: Option<String>,
    pub external_rating: Option<f64>,
}

/// Insertable form of a catalog record, produced from a provider response.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMovie {
    pub external_id: String,
    pub title: String,
    pub year: Option<i32>,
    pub poster_url: Option<String>,
    pub genre: Option<String>,
    pub media_type: Option<String>,
    pub overview: Option<String>,
    pub runtime: Option<String>,
    pub external_rating: Option<f64>,
}

/// One user's relationship to one catalog record.
///
/// At most one link exists per (user_id, movie_id) pair. A link with no
/// status and `is_favorite = false` is logically non-existent and is deleted
/// instead of being persisted in that state.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct UserMovie {
    pub id: i64,
    pub user_id: Uuid,
    pub movie_id: i64,
    pub status: Option<WatchStatus>,
    pub is_favorite: bool,
    pub user_rating: Option<f64>,
    pub added_at: NaiveDate,
}

/// Insertable form of a user-movie link.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUserMovie {
    pub user_id: Uuid,
    pub movie_id: i64,
    pub status: Option<WatchStatus>,
    pub is_favorite: bool,
    pub user_rating: Option<f64>,
    pub added_at: NaiveDate,
}

/// A link joined with its catalog record, fully materialized for listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserMovieWithMovie {
    pub id: i64,
    pub status: Option<WatchStatus>,
    pub is_favorite: bool,
    pub user_rating: Option<f64>,
    pub added_at: NaiveDate,
    pub movie: Movie,
}

/// Authenticated caller identity, extracted once per request at the boundary
/// and threaded explicitly into the watchlist engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    pub user_id: Uuid,
}

// ============================================================================
// OMDb API Types
// ============================================================================

/// Raw OMDb by-title response.
///
/// OMDb returns `200 OK` with `"Response": "False"` when the title is
/// unknown; the absence of `imdbID` is the reliable not-found signal.
#[derive(Debug, Clone, Deserialize)]
pub struct OmdbMovie {
    #[serde(rename = "imdbID")]
    pub imdb_id: Option<String>,
    #[serde(rename = "Title")]
    pub title: Option<String>,
    #[serde(rename = "Year")]
    pub year: Option<String>,
    #[serde(rename = "Runtime")]
    pub runtime: Option<String>,
    #[serde(rename = "Genre")]
    pub genre: Option<String>,
    #[serde(rename = "Plot")]
    pub plot: Option<String>,
    #[serde(rename = "Poster")]
    pub poster: Option<String>,
    #[serde(rename = "imdbRating")]
    pub imdb_rating: Option<String>,
    #[serde(rename = "Type")]
    pub media_type: Option<String>,
}

impl OmdbMovie {
    /// Converts the wire response into an insertable record.
    ///
    /// Returns `None` when `imdbID` is absent (the not-found signal). Year is
    /// derived from the first four characters of the year string when
    /// parseable ("2010–2013" becomes 2010); the rating is a best-effort
    /// float parse. Both fall back to `None` silently, never to an error.
    pub fn into_new_movie(self) -> Option<NewMovie> {
        let external_id = self.imdb_id?;

        let year = self
            .year
            .as_deref()
            .and_then(|y| y.get(0..4))
            .and_then(|y| y.parse::<i32>().ok());

        let external_rating = self
            .imdb_rating
            .as_deref()
            .and_then(|r| r.parse::<f64>().ok());

        Some(NewMovie {
            external_id,
            title: self.title.unwrap_or_default(),
            year,
            poster_url: self.poster,
            genre: self.genre,
            media_type: self.media_type,
            overview: self.plot,
            runtime: self.runtime,
            external_rating,
        })
    }
}
