//! Centralized path functions for all app storage locations.

use std::path::PathBuf;

/// App data root: `~/Library/Application Support/trailhead/` (macOS) or
/// `~/.local/share/trailhead/` (Linux).
pub fn app_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("trailhead"))
}

/// SQLite analytics database file: `<app_data_dir>/traffic.db`.
pub fn db_path() -> Option<PathBuf> {
    app_data_dir().map(|d| d.join("traffic.db"))
}

/// Blog post store: `<app_data_dir>/blog_posts.json`.
pub fn blog_path() -> Option<PathBuf> {
    app_data_dir().map(|d| d.join("blog_posts.json"))
}

/// Fitness provider cache file: `<app_data_dir>/fitness_cache.json`.
pub fn fitness_cache_path() -> Option<PathBuf> {
    app_data_dir().map(|d| d.join("fitness_cache.json"))
}
