use std::sync::Arc;

use chrono::Utc;

use crate::{
    db::user_movies::UserMovieStore,
    error::{AppError, AppResult},
    models::{CurrentUser, NewUserMovie, UserMovieWithMovie, WatchStatus},
    services::catalog::MovieResolver,
};

const MIN_RATE: f64 = 0.0;
const MAX_RATE: f64 = 10.0;

/// State machine over `(status, is_favorite)` per (user, movie) pair.
///
/// Every mutation first resolves the canonical catalog record, so operating
/// on a title the catalog has never seen lazily ingests it. A link whose
/// status and favorite flag are both cleared is deleted, never persisted
/// empty.
pub struct WatchlistService {
    resolver: Arc<dyn MovieResolver>,
    store: Arc<dyn UserMovieStore>,
}

impl WatchlistService {
    pub fn new(resolver: Arc<dyn MovieResolver>, store: Arc<dyn UserMovieStore>) -> Self {
        Self { resolver, store }
    }

    /// Filtered listing of the user's movies with catalog metadata attached.
    pub async fn get_user_movies(
        &self,
        user: &CurrentUser,
        status: Option<WatchStatus>,
        favorite: Option<bool>,
    ) -> AppResult<Vec<UserMovieWithMovie>> {
        self.store.list_for_user(user.user_id, status, favorite).await
    }

    /// Moves a movie between lists, or off all lists when `new_status` is
    /// `None` (which also drops the favorite flag and any rating).
    ///
    /// Setting the status a link already has is rejected with
    /// `NoOpStatusChange`.
    pub async fn update_status(
        &self,
        user: &CurrentUser,
        title: &str,
        new_status: Option<WatchStatus>,
    ) -> AppResult<()> {
        let movie = self.resolver.resolve(title).await?;
        let link = self
            .store
            .find_by_user_and_movie(user.user_id, movie.id)
            .await?;

        let Some(status) = new_status else {
            let Some(link) = link else {
                return Err(AppError::NotInAnyList(
                    "You already don't have this movie in any list.".to_string(),
                ));
            };

            tracing::debug!(user_id = %user.user_id, movie_id = movie.id, "Removing movie from all lists");
            return self.store.delete(link.id).await;
        };

        if let Some(link) = &link {
            if link.status == Some(status) {
                return Err(AppError::NoOpStatusChange(format!(
                    "Movie status already {}",
                    status
                )));
            }
        }

        match link {
            Some(mut link) => {
                link.status = Some(status);
                self.store.update(&link).await?;
            }
            None => {
                self.store
                    .insert(&NewUserMovie {
                        user_id: user.user_id,
                        movie_id: movie.id,
                        status: Some(status),
                        is_favorite: false,
                        user_rating: None,
                        added_at: Utc::now().date_naive(),
                    })
                    .await?;
            }
        }

        tracing::debug!(user_id = %user.user_id, movie_id = movie.id, status = %status, "Movie status updated");
        Ok(())
    }

    /// Sets or clears the favorite flag.
    ///
    /// Favoriting creates a status-less link when none exists and is
    /// idempotent on an already-favorite link. Unfavoriting a link with no
    /// status deletes it; with a status, only the flag is cleared.
    pub async fn update_favorite(
        &self,
        user: &CurrentUser,
        title: &str,
        is_favorite: bool,
    ) -> AppResult<()> {
        let movie = self.resolver.resolve(title).await?;
        let link = self
            .store
            .find_by_user_and_movie(user.user_id, movie.id)
            .await?;

        if !is_favorite {
            let Some(mut link) = link else {
                return Err(AppError::NotInAnyList(
                    "You already don't have this movie in favorites.".to_string(),
                ));
            };

            if link.status.is_none() {
                // Logically empty once the flag drops.
                return self.store.delete(link.id).await;
            }

            link.is_favorite = false;
            return self.store.update(&link).await;
        }

        match link {
            Some(mut link) => {
                link.is_favorite = true;
                self.store.update(&link).await?;
            }
            None => {
                self.store
                    .insert(&NewUserMovie {
                        user_id: user.user_id,
                        movie_id: movie.id,
                        status: None,
                        is_favorite: true,
                        user_rating: None,
                        added_at: Utc::now().date_naive(),
                    })
                    .await?;
            }
        }

        Ok(())
    }

    /// Sets the user's personal rating on an existing link.
    ///
    /// The link must exist and carry a status; the rate must lie in
    /// [0.0, 10.0]. Never creates a link.
    pub async fn update_rate(&self, user: &CurrentUser, title: &str, rate: f64) -> AppResult<()> {
        self.resolver.resolve(title).await?;

        let mut link = self
            .store
            .find_first_by_user_and_title(user.user_id, title.trim())
            .await?
            .ok_or_else(|| {
                AppError::NotInAnyList("You don't have this movie in any list.".to_string())
            })?;

        if link.status.is_none() {
            return Err(AppError::NotRateable(
                "Cannot rate movie that doesn't belong to any list".to_string(),
            ));
        }

        if !(MIN_RATE..=MAX_RATE).contains(&rate) {
            return Err(AppError::InvalidRating(
                "Rate must be at most 10.0 and cannot be negative.".to_string(),
            ));
        }

        link.user_rating = Some(rate);
        self.store.update(&link).await
    }
}
