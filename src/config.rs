// Runtime configuration - defaults overridable from QUOTEDECK_* env vars.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::catalog::FilterOptions;
use crate::reconciler::ConflictPolicy;
use crate::scheduler::DEFAULT_SYNC_INTERVAL;

pub const DEFAULT_REMOTE_URL: &str = "https://jsonplaceholder.typicode.com/posts";
pub const DEFAULT_FETCH_LIMIT: usize = 5;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Location of the SQLite store.
    pub db_path: PathBuf,
    /// Base URL of the remote quote source/sink.
    pub remote_url: String,
    /// Snapshot size requested from the remote source.
    pub fetch_limit: usize,
    /// Spacing between scheduled sync cycles.
    pub sync_interval: Duration,
    pub filter: FilterOptions,
    pub conflict_policy: ConflictPolicy,
    /// Push local-only quotes back to the remote sink after a merge.
    pub push_after_merge: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        let db_path = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("quotedeck")
            .join("quotes.db");

        AppConfig {
            db_path,
            remote_url: DEFAULT_REMOTE_URL.to_string(),
            fetch_limit: DEFAULT_FETCH_LIMIT,
            sync_interval: DEFAULT_SYNC_INTERVAL,
            filter: FilterOptions::default(),
            conflict_policy: ConflictPolicy::RemoteWins,
            push_after_merge: true,
        }
    }
}

impl AppConfig {
    /// Defaults with environment overrides applied. Unparseable values
    /// fall back to the default rather than failing startup.
    pub fn from_env() -> Self {
        let mut config = AppConfig::default();

        if let Ok(path) = env::var("QUOTEDECK_DB") {
            config.db_path = PathBuf::from(path);
        }
        if let Ok(url) = env::var("QUOTEDECK_REMOTE_URL") {
            config.remote_url = url;
        }
        if let Ok(raw) = env::var("QUOTEDECK_FETCH_LIMIT") {
            if let Ok(limit) = raw.parse() {
                config.fetch_limit = limit;
            }
        }
        if let Ok(raw) = env::var("QUOTEDECK_SYNC_INTERVAL") {
            if let Ok(secs) = raw.parse::<u64>() {
                config.sync_interval = Duration::from_secs(secs);
            }
        }
        if let Ok(raw) = env::var("QUOTEDECK_CASE_INSENSITIVE_FILTER") {
            config.filter.case_insensitive = parse_flag(&raw);
        }
        if let Ok(raw) = env::var("QUOTEDECK_CONFLICT_POLICY") {
            match raw.parse() {
                Ok(policy) => config.conflict_policy = policy,
                Err(error) => tracing::warn!("{error}, keeping {}", config.conflict_policy.name()),
            }
        }
        if let Ok(raw) = env::var("QUOTEDECK_PUSH") {
            config.push_after_merge = parse_flag(&raw);
        }

        config
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.remote_url, DEFAULT_REMOTE_URL);
        assert_eq!(config.fetch_limit, 5);
        assert_eq!(config.sync_interval, Duration::from_secs(60));
        assert!(!config.filter.case_insensitive);
        assert_eq!(config.conflict_policy, ConflictPolicy::RemoteWins);
        assert!(config.push_after_merge);
        assert!(config.db_path.ends_with("quotedeck/quotes.db"));
    }

    #[test]
    fn test_parse_flag_variants() {
        assert!(parse_flag("1"));
        assert!(parse_flag("TRUE"));
        assert!(parse_flag(" yes "));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("off"));
        assert!(!parse_flag("garbage"));
    }
}
