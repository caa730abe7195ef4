//! Fixed-window admission control.
//!
//! Each key owns one window `[start, start + window)`. The first request of a
//! window opens it; requests beyond `max_requests` are denied until the window
//! elapses. Denials never touch the stored window.

use chrono::Utc;
use config::RateLimitConfig;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use kit_core::RateLimitInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    pub allowed: bool,
    pub info: RateLimitInfo
}

#[derive(Debug, Clone, Copy)]
struct WindowState {
    count: u32,
    reset_at_ms: i64
}

pub struct RateLimiter {
    windows: DashMap<String, WindowState>,
    max_requests: u32,
    window_ms: i64
}

impl RateLimiter {
    pub fn new(max_requests: u32, window_ms: u64) -> Self {
        Self {
            windows: DashMap::new(),
            max_requests,
            window_ms: i64::try_from(window_ms).unwrap_or(i64::MAX)
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests, config.window_ms)
    }

    pub fn limit(&self) -> u32 {
        self.max_requests
    }

    pub fn admit(&self, key: &str) -> Admission {
        self.admit_at(key, now_ms())
    }

    /// Admission against an explicit clock reading in epoch milliseconds.
    ///
    /// The entry lock is held for the whole decision, so concurrent callers
    /// on one key are serialised.
    pub fn admit_at(&self, key: &str, now_ms: i64) -> Admission {
        match self.windows.entry(key.to_string()) {
            Entry::Vacant(vacant) => {
                let state = vacant.insert(self.open_window(now_ms));
                self.allowed(state.count, state.reset_at_ms)
            }
            Entry::Occupied(mut occupied) => {
                let state = occupied.get_mut();
                if now_ms >= state.reset_at_ms {
                    *state = self.open_window(now_ms);
                    self.allowed(state.count, state.reset_at_ms)
                } else if state.count >= self.max_requests {
                    Admission {
                        allowed: false,
                        info: RateLimitInfo {
                            limit: self.max_requests,
                            remaining: 0,
                            reset_at_ms: state.reset_at_ms
                        }
                    }
                } else {
                    state.count += 1;
                    self.allowed(state.count, state.reset_at_ms)
                }
            }
        }
    }

    /// Current position of `key` without consuming an admission.
    pub fn snapshot(&self, key: &str) -> RateLimitInfo {
        self.snapshot_at(key, now_ms())
    }

    pub fn snapshot_at(&self, key: &str, now_ms: i64) -> RateLimitInfo {
        match self.windows.get(key) {
            Some(state) if now_ms < state.reset_at_ms => RateLimitInfo {
                limit: self.max_requests,
                remaining: self.max_requests.saturating_sub(state.count),
                reset_at_ms: state.reset_at_ms
            },
            _ => RateLimitInfo {
                limit: self.max_requests,
                remaining: self.max_requests,
                reset_at_ms: now_ms.saturating_add(self.window_ms)
            }
        }
    }

    /// Drops every window that has elapsed. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(now_ms())
    }

    pub fn sweep_at(&self, now_ms: i64) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, state| now_ms < state.reset_at_ms);
        before.saturating_sub(self.windows.len())
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    fn open_window(&self, now_ms: i64) -> WindowState {
        WindowState {
            count: 1,
            reset_at_ms: now_ms.saturating_add(self.window_ms)
        }
    }

    fn allowed(&self, count: u32, reset_at_ms: i64) -> Admission {
        Admission {
            allowed: true,
            info: RateLimitInfo {
                limit: self.max_requests,
                remaining: self.max_requests.saturating_sub(count),
                reset_at_ms
            }
        }
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}
