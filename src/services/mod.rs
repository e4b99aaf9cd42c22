// Services module - metadata lookup and enrichment

pub mod format;
pub mod hype;
pub mod mood;
pub mod normalize;
pub mod poster_cache;
pub mod resolver;
pub mod sources;

// Metadata providers
pub mod metadata;
pub mod omdb;
pub mod tmdb;

#[cfg(test)]
pub(crate) mod testing;
