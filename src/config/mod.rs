/// Listening addresses, store location and restart timing from the environment
pub mod app;

/// Seed product list from config.toml
pub mod products;

pub use app::AppConfig;
