pub mod catalog;
pub mod providers;
pub mod watchlist;
