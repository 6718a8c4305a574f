use crate::config::ServerConfig;
use dashmap::DashMap;
use retrieval::{ProfileIntentBuilder, RetrievalSession};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Rate limit tracking: API key -> (count, window_start)
    pub rate_limiter: Arc<DashMap<String, (u32, Instant)>>,

    /// Retrieval session shared by all requests
    pub session: Arc<RetrievalSession>,

    /// Turns job profiles into search intents
    pub profiles: Arc<ProfileIntentBuilder>,
}

impl ServerState {
    pub fn new(
        config: ServerConfig,
        session: Arc<RetrievalSession>,
        profiles: Arc<ProfileIntentBuilder>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            rate_limiter: Arc::new(DashMap::new()),
            session,
            profiles,
        }
    }

    /// Check if API key is valid
    pub fn is_valid_api_key(&self, key: &str) -> bool {
        self.config.api_keys.contains(key)
    }

    /// Check rate limit for API key
    pub fn check_rate_limit(&self, key: &str) -> bool {
        let now = Instant::now();
        let window = Duration::from_secs(60);
        let limit = self.config.rate_limit_per_minute;

        let mut entry = self.rate_limiter.entry(key.to_string()).or_insert((0, now));
        let (count, window_start) = entry.value_mut();

        // Reset if window has passed
        if now.duration_since(*window_start) > window {
            *count = 0;
            *window_start = now;
        }

        if *count >= limit {
            return false;
        }

        *count += 1;
        true
    }
}
