use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Sliding window in-memory rate limiter (pod local).
#[derive(Clone)]
pub struct InMemoryRateLimiter {
    store: Arc<DashMap<String, VecDeque<Instant>>>,
    pub enabled: bool,
}

impl InMemoryRateLimiter {
    pub fn new(enabled: bool) -> Self {
        Self {
            store: Arc::new(DashMap::new()),
            enabled,
        }
    }

    /// Returns true if allowed, false if limited.
    pub fn check(&self, key: &str, limit: usize, window: Duration) -> bool {
        if !self.enabled {
            return true;
        }
        let now = Instant::now();
        let mut entry = self.store.entry(key.to_string()).or_default();
        while let Some(front) = entry.front() {
            if now.duration_since(*front) >= window {
                entry.pop_front();
            } else {
                break;
            }
        }
        if entry.len() < limit {
            entry.push_back(now);
            true
        } else {
            false
        }
    }
}

/// Per-action limits derived from env. Writes are limited per user id, not
/// per IP, since every write already carries a verified identity.
#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    pub thread_limit: usize,
    pub thread_window: Duration,
    pub comment_limit: usize,
    pub comment_window: Duration,
    pub like_limit: usize,
    pub like_window: Duration,
}

impl RateLimitConfig {
    pub fn from_env() -> Self {
        fn usize_env(name: &str, default: usize) -> usize {
            std::env::var(name)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        }
        fn dur_env(name: &str, default: u64) -> Duration {
            Duration::from_secs(
                std::env::var(name)
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(default),
            )
        }
        Self {
            thread_limit: usize_env("FORUMD_RL_THREAD_LIMIT", 5),
            thread_window: dur_env("FORUMD_RL_THREAD_WINDOW", 300),
            comment_limit: usize_env("FORUMD_RL_COMMENT_LIMIT", 20),
            comment_window: dur_env("FORUMD_RL_COMMENT_WINDOW", 60),
            like_limit: usize_env("FORUMD_RL_LIKE_LIMIT", 60),
            like_window: dur_env("FORUMD_RL_LIKE_WINDOW", 60),
        }
    }
}

/// High level guard used by handlers. Comments and replies share a budget.
#[derive(Clone)]
pub struct RateLimiterFacade {
    pub limiter: InMemoryRateLimiter,
    pub cfg: RateLimitConfig,
}

impl RateLimiterFacade {
    pub fn new(limiter: InMemoryRateLimiter, cfg: RateLimitConfig) -> Self {
        Self { limiter, cfg }
    }

    pub fn allow_thread(&self, user: &str) -> bool {
        self.limiter
            .check(&format!("thread:{user}"), self.cfg.thread_limit, self.cfg.thread_window)
    }

    pub fn allow_comment(&self, user: &str) -> bool {
        self.limiter.check(
            &format!("comment:{user}"),
            self.cfg.comment_limit,
            self.cfg.comment_window,
        )
    }

    pub fn allow_like(&self, user: &str) -> bool {
        self.limiter
            .check(&format!("like:{user}"), self.cfg.like_limit, self.cfg.like_window)
    }
}
