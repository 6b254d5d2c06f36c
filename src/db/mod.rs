pub mod cache;
pub mod movies;
pub mod postgres;
pub mod user_movies;

pub use cache::create_redis_client;
pub use cache::Cache;
pub use cache::CacheKey;
pub use postgres::create_pool;
