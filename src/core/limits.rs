//! Bounds for a generation job.
//!
//! The provider gives no progress figure and no upper bound on rendering
//! time, so polling is capped by:
//! - A maximum number of poll queries
//! - A wall-clock deadline measured from submission
//! - A maximum reference image size

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;

/// Polling and payload limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationLimits {
    /// Wait between poll queries in seconds (default: 5)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,

    /// Wall-clock bound for a job in seconds (default: 600 = 10 min)
    #[serde(default = "default_max_wait")]
    pub max_wait_seconds: u64,

    /// Maximum poll queries per job (default: 120)
    #[serde(default = "default_max_polls")]
    pub max_polls: u32,

    /// Maximum reference image size in bytes (default: 20MB)
    #[serde(default = "default_max_reference_bytes")]
    pub max_reference_bytes: u64,
}

fn default_poll_interval() -> u64 {
    5
}
fn default_max_wait() -> u64 {
    600
}
fn default_max_polls() -> u32 {
    120
}
fn default_max_reference_bytes() -> u64 {
    20 * 1024 * 1024
}

impl Default for GenerationLimits {
    fn default() -> Self {
        Self {
            poll_interval_seconds: default_poll_interval(),
            max_wait_seconds: default_max_wait(),
            max_polls: default_max_polls(),
            max_reference_bytes: default_max_reference_bytes(),
        }
    }
}

impl GenerationLimits {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_seconds)
    }

    /// Validate reference image size
    pub fn validate_reference(&self, bytes: &[u8]) -> Result<(), LimitViolation> {
        let size = bytes.len() as u64;
        if size > self.max_reference_bytes {
            return Err(LimitViolation::ReferenceTooLarge {
                actual: size,
                limit: self.max_reference_bytes,
            });
        }
        Ok(())
    }

    /// Check whether another poll may be issued
    pub fn check(&self, tracker: &PollTracker) -> Result<(), LimitViolation> {
        if tracker.polls >= self.max_polls {
            return Err(LimitViolation::MaxPolls {
                actual: tracker.polls,
                limit: self.max_polls,
            });
        }

        let elapsed = tracker.elapsed();
        if elapsed >= self.max_wait() {
            return Err(LimitViolation::Deadline {
                elapsed_seconds: elapsed.as_secs(),
                limit_seconds: self.max_wait_seconds,
            });
        }

        Ok(())
    }
}

/// Tracks polling progress of one job
#[derive(Debug, Clone)]
pub struct PollTracker {
    /// Poll queries issued
    pub polls: u32,

    /// When the job was submitted
    pub started_at: Instant,
}

impl Default for PollTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PollTracker {
    pub fn new() -> Self {
        Self {
            polls: 0,
            started_at: Instant::now(),
        }
    }

    pub fn record_poll(&mut self) {
        self.polls += 1;
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// Limit violations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LimitViolation {
    #[error("Maximum polls exceeded: {actual} >= {limit}")]
    MaxPolls { actual: u32, limit: u32 },

    #[error("Generation deadline exceeded: {elapsed_seconds}s >= {limit_seconds}s")]
    Deadline {
        elapsed_seconds: u64,
        limit_seconds: u64,
    },

    #[error("Reference image too large: {actual} > {limit} bytes")]
    ReferenceTooLarge { actual: u64, limit: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let limits = GenerationLimits::default();
        assert_eq!(limits.poll_interval(), Duration::from_secs(5));
        assert_eq!(limits.max_wait_seconds, 600);
        assert_eq!(limits.max_polls, 120);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let limits: GenerationLimits = serde_yaml::from_str("max_polls: 3").unwrap();
        assert_eq!(limits.max_polls, 3);
        assert_eq!(limits.poll_interval_seconds, 5);
    }

    #[test]
    fn test_reference_size() {
        let limits = GenerationLimits {
            max_reference_bytes: 4,
            ..Default::default()
        };
        assert!(limits.validate_reference(&[0; 4]).is_ok());
        assert!(matches!(
            limits.validate_reference(&[0; 5]),
            Err(LimitViolation::ReferenceTooLarge { .. })
        ));
    }

    #[tokio::test]
    async fn test_poll_counting() {
        let limits = GenerationLimits {
            max_polls: 2,
            ..Default::default()
        };
        let mut tracker = PollTracker::new();
        assert!(limits.check(&tracker).is_ok());

        tracker.record_poll();
        assert!(limits.check(&tracker).is_ok());

        tracker.record_poll();
        assert!(matches!(
            limits.check(&tracker),
            Err(LimitViolation::MaxPolls { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline() {
        let limits = GenerationLimits {
            max_wait_seconds: 10,
            ..Default::default()
        };
        let tracker = PollTracker::new();

        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(matches!(
            limits.check(&tracker),
            Err(LimitViolation::Deadline { .. })
        ));
    }
}
