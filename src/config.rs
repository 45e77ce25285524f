use std::path::PathBuf;
use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "Similia";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// How long a loaded knowledge base stays fresh before the cache reloads it.
pub const CACHE_TTL: Duration = Duration::from_secs(30 * 60);

/// Maximum number of knowledge bases resident in the cache at once.
/// Overflow evicts the oldest-inserted entry (FIFO, not LRU).
pub const CACHE_MAX_ENTRIES: usize = 10;

/// Default number of remedy suggestions returned by the facade.
pub const DEFAULT_MAX_RESULTS: usize = 10;

/// Minimum symptom-text length accepted by the normalizer (chars, after trim).
pub const MIN_SYMPTOM_LEN: usize = 3;

/// Get the application data directory
/// ~/Similia/ on all platforms (user-visible, per design requirement)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("Similia")
}

/// Get the directory holding knowledge-base JSON files.
pub fn knowledge_dir() -> PathBuf {
    app_data_dir().join("knowledge")
}

/// Default tracing filter when RUST_LOG is unset.
pub fn default_log_filter() -> String {
    format!("{}=info", env!("CARGO_PKG_NAME"))
}
