use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, interval};
use tracing::{debug, info};

use crate::rate_limit::RateLimiter;

/// Periodically drops elapsed rate-limit windows.
pub struct RateLimitSweeper {
    limiter: Arc<RateLimiter>,
    interval: Duration
}

impl RateLimitSweeper {
    pub fn new(limiter: Arc<RateLimiter>, interval: Duration) -> Self {
        Self { limiter, interval }
    }

    /// Spawns the sweep loop. Abort the returned handle to stop it.
    pub fn start(&self) -> JoinHandle<()> {
        let mut interval = interval(self.interval);
        let limiter = self.limiter.clone();

        tokio::spawn(async move {
            loop {
                interval.tick().await;

                let removed = limiter.sweep();
                if removed > 0 {
                    info!("Swept {} expired rate limit windows", removed);
                } else {
                    debug!(active = limiter.len(), "No expired rate limit windows");
                }
            }
        })
    }
}
