use std::time::Duration;

/// Default lifetime of cached project-access answers.
pub const DEFAULT_ACCESS_CACHE_TTL: Duration = Duration::from_secs(300);

/// Tunables for one batch session.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// How long project-access answers are reused before the cache is dropped.
    pub access_cache_ttl: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            access_cache_ttl: DEFAULT_ACCESS_CACHE_TTL,
        }
    }
}

impl PipelineConfig {
    pub fn with_access_cache_ttl(ttl: Duration) -> Self {
        Self {
            access_cache_ttl: ttl,
        }
    }
}
