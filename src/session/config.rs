use std::time::Duration;

/// Configuration for room sessions
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Upper bound on the best-effort presence release during teardown
    pub release_timeout: Duration,
    /// Number of words in generated display names
    pub name_words: u8,
}

impl SessionConfig {
    pub fn new() -> Self {
        let release_timeout_ms = std::env::var("ROOMFEED_RELEASE_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(2000);

        let name_words = std::env::var("ROOMFEED_NAME_WORDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|words: &u8| *words > 0)
            .unwrap_or(2);

        Self {
            release_timeout: Duration::from_millis(release_timeout_ms),
            name_words,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}
