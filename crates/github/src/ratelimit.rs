//! Rate-limit monitoring.
//!
//! Every GitHub response carries `x-ratelimit-*` headers describing the quota
//! of the resource bucket (`core`, `graphql`, ...) the request was charged
//! to. The [`RateLimitMonitor`] keeps the latest record per resource and
//! raises a global critical flag as soon as any bucket has used more than
//! half of its quota.
//!
//! Monitoring never fails a request: responses without the full header set
//! are ignored.
//!
//! # Examples
//!
//! ```
//! use ghtt_github::{RateLimitMonitor, ResponseHeaders};
//!
//! let monitor = RateLimitMonitor::new();
//! let headers = ResponseHeaders::from_pairs([
//!     ("x-ratelimit-resource", "core"),
//!     ("x-ratelimit-used", "4000"),
//!     ("x-ratelimit-limit", "5000"),
//!     ("x-ratelimit-remaining", "1000"),
//!     ("x-ratelimit-reset", "1714550400"),
//! ]);
//!
//! assert!(monitor.record(&headers));
//! assert!(monitor.is_critical());
//! assert_eq!(monitor.get("core").unwrap().remaining, 1000);
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::transport::ResponseHeaders;

/// Header naming the resource bucket a request was charged to.
pub const RESOURCE_HEADER: &str = "x-ratelimit-resource";
/// Header holding the number of requests used in the current window.
pub const USED_HEADER: &str = "x-ratelimit-used";
/// Header holding the window's request quota.
pub const LIMIT_HEADER: &str = "x-ratelimit-limit";
/// Header holding the number of requests left in the current window.
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";
/// Header holding the window reset time, in epoch seconds.
pub const RESET_HEADER: &str = "x-ratelimit-reset";

/// A bucket is critical when less than this share of its quota remains.
pub const CRITICAL_RATIO: f64 = 0.5;

/// Quota usage of one rate-limit resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitRecord {
    /// Resource bucket name (e.g. `core`).
    pub resource: String,
    /// Requests used in the current window.
    pub used: u64,
    /// Request quota of the window.
    pub limit: u64,
    /// Requests left in the current window.
    pub remaining: u64,
    /// When the window resets.
    pub reset_at: DateTime<Utc>,
}

impl RateLimitRecord {
    /// Builds a record from response headers.
    ///
    /// Returns `None` unless all five rate-limit headers are present and
    /// well-formed.
    #[must_use]
    pub fn from_headers(headers: &ResponseHeaders) -> Option<Self> {
        let resource = headers.get(RESOURCE_HEADER)?;
        let number = |name: &str| headers.get(name)?.trim().parse::<u64>().ok();
        let reset_secs = headers.get(RESET_HEADER)?.trim().parse::<i64>().ok()?;

        Some(Self {
            resource: resource.to_string(),
            used: number(USED_HEADER)?,
            limit: number(LIMIT_HEADER)?,
            remaining: number(REMAINING_HEADER)?,
            reset_at: DateTime::from_timestamp(reset_secs, 0)?,
        })
    }

    /// Returns the share of the quota still available, or `None` for a
    /// zero quota.
    #[must_use]
    pub fn ratio(&self) -> Option<f64> {
        (self.limit > 0).then(|| self.remaining as f64 / self.limit as f64)
    }

    /// Returns whether less than [`CRITICAL_RATIO`] of the quota remains.
    #[must_use]
    pub fn is_critical(&self) -> bool {
        self.ratio().is_some_and(|ratio| ratio < CRITICAL_RATIO)
    }

    /// Returns the time left until the window resets.
    #[must_use]
    pub fn reset_after(&self, now: DateTime<Utc>) -> Duration {
        (self.reset_at - now).to_std().unwrap_or(Duration::ZERO)
    }
}

/// The monitor's observable state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimitSnapshot {
    /// Latest record per resource.
    pub records: BTreeMap<String, RateLimitRecord>,
    /// Whether any resource is critical.
    pub critical: bool,
}

/// Process-wide rate-limit state, shared by every client.
///
/// Cloning the monitor yields another handle on the same state. Consumers
/// can poll [`snapshot`](Self::snapshot) or [`subscribe`](Self::subscribe)
/// to be notified of every change.
#[derive(Debug, Clone)]
pub struct RateLimitMonitor {
    sender: Arc<watch::Sender<RateLimitSnapshot>>,
}

impl Default for RateLimitMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimitMonitor {
    /// Creates a monitor with no records.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = watch::channel(RateLimitSnapshot::default());
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Records the rate-limit headers of a response.
    ///
    /// The record for the response's resource is replaced, not merged, and
    /// the critical flag is recomputed over all resources. Returns `false`
    /// when the headers were incomplete and nothing changed.
    pub fn record(&self, headers: &ResponseHeaders) -> bool {
        let Some(record) = RateLimitRecord::from_headers(headers) else {
            return false;
        };

        debug!(
            resource = %record.resource,
            remaining = record.remaining,
            limit = record.limit,
            "rate limit updated"
        );

        let became_critical = record.is_critical();
        let resource = record.resource.clone();
        self.sender.send_modify(|snapshot| {
            snapshot.records.insert(record.resource.clone(), record);
            snapshot.critical = snapshot.records.values().any(RateLimitRecord::is_critical);
        });

        if became_critical {
            warn!(resource = %resource, "rate limit below critical threshold");
        }
        true
    }

    /// Returns whether any resource is below the critical threshold.
    #[must_use]
    pub fn is_critical(&self) -> bool {
        self.sender.borrow().critical
    }

    /// Returns the latest record for a resource.
    #[must_use]
    pub fn get(&self, resource: &str) -> Option<RateLimitRecord> {
        self.sender.borrow().records.get(resource).cloned()
    }

    /// Returns a copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> RateLimitSnapshot {
        self.sender.borrow().clone()
    }

    /// Returns a receiver notified on every recorded response.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<RateLimitSnapshot> {
        self.sender.subscribe()
    }
}
