//! Per-identifier fixed-window rate limiting.
//!
//! Each identifier owns one counter and one reset instant. The first request
//! after the window elapses starts a new window with a count of one, so a
//! burst straddling a boundary can see up to twice the limit.
//!
//! The table is bounded: [`RateLimiter::sweep`] drops elapsed windows (run it
//! periodically with [`RateLimiter::start_sweeper`]). A new identifier arriving
//! at `max_tracked` sweeps inline only when some window is known to have
//! elapsed; otherwise it evicts the earliest-resetting of a small sample, so
//! admission cost stays flat however full the table is.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::auth::request::CredentialSource;

pub const DEFAULT_MAX_TRACKED: usize = 100_000;

/// Entries inspected when evicting at capacity.
const EVICTION_SAMPLE: usize = 8;

/// Stand-in reset for windows too long to represent.
const FAR_FUTURE: Duration = Duration::from_secs(30 * 365 * 24 * 60 * 60);

/// Identifier shared by every caller without forwarding headers.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Caller-supplied limit for one endpoint class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_requests: u32,
    pub window: Duration,
}

impl RateLimitPolicy {
    pub const fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct RateLimitEntry {
    count: u32,
    reset_at: Instant,
}

impl RateLimitEntry {
    fn fresh(now: Instant, window: Duration) -> Self {
        let reset_at = now
            .checked_add(window)
            .or_else(|| now.checked_add(FAR_FUTURE))
            .unwrap_or(now);

        Self { count: 1, reset_at }
    }
}

#[derive(Debug)]
pub struct RateLimiter {
    entries: DashMap<String, RateLimitEntry>,
    max_tracked: usize,
    origin: Instant,
    /// Lower bound on every tracked `reset_at`, as nanoseconds since `origin`.
    earliest_reset: AtomicU64,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_TRACKED)
    }

    pub fn with_capacity(max_tracked: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_tracked: max_tracked.max(1),
            origin: Instant::now(),
            earliest_reset: AtomicU64::new(u64::MAX),
        }
    }

    /// Record a request from `identifier` and decide whether to admit it.
    ///
    /// The `max_requests`-th request inside a window is admitted, the next one
    /// is not. The read-modify-write happens under the identifier's shard
    /// lock, so concurrent callers never lose an increment.
    pub fn check(&self, identifier: &str, max_requests: u32, window: Duration) -> bool {
        let now = Instant::now();

        if !self.entries.contains_key(identifier) && self.entries.len() >= self.max_tracked {
            self.make_room(now);
        }

        match self.entries.entry(identifier.to_string()) {
            Entry::Vacant(vacant) => {
                let entry = RateLimitEntry::fresh(now, window);
                self.note_reset(entry.reset_at);
                vacant.insert(entry);
                true
            }
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                if now > entry.reset_at {
                    *entry = RateLimitEntry::fresh(now, window);
                    self.note_reset(entry.reset_at);
                    return true;
                }
                entry.count = entry.count.saturating_add(1);
                entry.count <= max_requests
            }
        }
    }

    pub fn check_policy(&self, identifier: &str, policy: RateLimitPolicy) -> bool {
        self.check(identifier, policy.max_requests, policy.window)
    }

    /// Drop every entry whose window has elapsed. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        let mut earliest = u64::MAX;
        self.entries.retain(|_, entry| {
            let keep = entry.reset_at >= now;
            if keep {
                earliest = earliest.min(self.nanos_since_origin(entry.reset_at));
            }
            keep
        });
        self.earliest_reset.store(earliest, Ordering::Relaxed);
        before.saturating_sub(self.entries.len())
    }

    pub fn tracked_identifiers(&self) -> usize {
        self.entries.len()
    }

    pub fn max_tracked(&self) -> usize {
        self.max_tracked
    }

    /// Spawn a tokio task that sweeps the table every `interval`.
    pub fn start_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let removed = limiter.sweep();
                if removed > 0 {
                    debug!(
                        removed,
                        tracked = limiter.tracked_identifiers(),
                        "rate limiter sweep"
                    );
                }
            }
        })
    }

    fn make_room(&self, now: Instant) {
        let earliest = self.earliest_reset.load(Ordering::Relaxed);
        if earliest < self.nanos_since_origin(now) {
            self.sweep();
            if self.entries.len() < self.max_tracked {
                return;
            }
        }

        let victim = self
            .entries
            .iter()
            .take(EVICTION_SAMPLE)
            .min_by_key(|entry| entry.reset_at)
            .map(|entry| entry.key().clone());

        if let Some(key) = victim {
            self.entries.remove(&key);
        }
    }

    fn note_reset(&self, reset_at: Instant) {
        self.earliest_reset
            .fetch_min(self.nanos_since_origin(reset_at), Ordering::Relaxed);
    }

    fn nanos_since_origin(&self, at: Instant) -> u64 {
        u64::try_from(at.saturating_duration_since(self.origin).as_nanos()).unwrap_or(u64::MAX)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

/// Derive the rate-limit key for a request: first `x-forwarded-for` hop,
/// then `x-real-ip`, then [`UNKNOWN_CLIENT`].
pub fn client_identifier(source: &impl CredentialSource) -> String {
    let forwarded = source
        .header("x-forwarded-for")
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|hop| !hop.is_empty());

    if let Some(hop) = forwarded {
        return hop.to_string();
    }

    source
        .header("x-real-ip")
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::auth::request::RequestParts;

    const MINUTE: Duration = Duration::from_secs(60);

    #[test]
    fn admits_up_to_the_limit() {
        let limiter = RateLimiter::new();

        assert!(limiter.check("10.0.0.1", 2, MINUTE));
        assert!(limiter.check("10.0.0.1", 2, MINUTE));
        assert!(!limiter.check("10.0.0.1", 2, MINUTE));
        assert!(!limiter.check("10.0.0.1", 2, MINUTE));
    }

    #[test]
    fn window_resets_after_it_elapses() {
        let limiter = RateLimiter::new();
        let window = Duration::from_millis(1);

        assert!(limiter.check("10.0.0.2", 1, window));
        thread::sleep(Duration::from_millis(5));
        assert!(limiter.check("10.0.0.2", 1, window));
    }

    #[test]
    fn exhausted_identifier_recovers_in_the_next_window() {
        let limiter = RateLimiter::new();
        let window = Duration::from_millis(200);

        assert!(limiter.check("10.0.0.3", 1, window));
        assert!(!limiter.check("10.0.0.3", 1, window));

        thread::sleep(Duration::from_millis(250));
        assert!(limiter.check("10.0.0.3", 1, window));
        assert!(!limiter.check("10.0.0.3", 1, window));
    }

    #[test]
    fn identifiers_are_isolated() {
        let limiter = RateLimiter::new();

        assert!(limiter.check("a", 1, MINUTE));
        assert!(!limiter.check("a", 1, MINUTE));

        assert!(limiter.check("b", 1, MINUTE));
        assert!(!limiter.check("b", 1, MINUTE));
    }

    #[test]
    fn policy_shortcut_matches_check() {
        let limiter = RateLimiter::new();
        let policy = RateLimitPolicy::new(1, MINUTE);

        assert!(limiter.check_policy("c", policy));
        assert!(!limiter.check_policy("c", policy));
    }

    #[test]
    fn sweep_drops_elapsed_windows() {
        let limiter = RateLimiter::new();
        limiter.check("short-1", 5, Duration::from_millis(1));
        limiter.check("short-2", 5, Duration::from_millis(1));
        limiter.check("long", 5, MINUTE);
        assert_eq!(limiter.tracked_identifiers(), 3);

        thread::sleep(Duration::from_millis(5));

        assert_eq!(limiter.sweep(), 2);
        assert_eq!(limiter.tracked_identifiers(), 1);
    }

    #[test]
    fn capacity_evicts_instead_of_growing() {
        let limiter = RateLimiter::with_capacity(2);
        limiter.check("first", 5, Duration::from_secs(1));
        limiter.check("second", 5, MINUTE);
        limiter.check("third", 5, MINUTE);

        assert_eq!(limiter.tracked_identifiers(), 2);
        // "first" had the earliest reset and was evicted; "second" keeps its count.
        assert!(limiter.check("second", 2, MINUTE));
        assert!(!limiter.check("second", 2, MINUTE));
    }

    #[test]
    fn capacity_sweeps_inline_once_a_window_has_elapsed() {
        let limiter = RateLimiter::with_capacity(3);
        limiter.check("brief-1", 5, Duration::from_millis(1));
        limiter.check("brief-2", 5, Duration::from_millis(1));
        limiter.check("steady", 5, MINUTE);

        thread::sleep(Duration::from_millis(5));
        assert!(limiter.check("newcomer", 5, MINUTE));

        // Both elapsed windows went; the live one was kept.
        assert_eq!(limiter.tracked_identifiers(), 2);
        assert!(limiter.check("steady", 2, MINUTE));
        assert!(!limiter.check("steady", 2, MINUTE));
    }

    #[test]
    fn new_identifiers_at_capacity_stay_cheap() {
        let capacity = 50_000;
        let limiter = RateLimiter::with_capacity(capacity);
        for i in 0..capacity {
            limiter.check(&format!("resident-{i}"), 5, MINUTE);
        }
        assert_eq!(limiter.tracked_identifiers(), capacity);

        let started = Instant::now();
        for i in 0..1_000 {
            assert!(limiter.check(&format!("rotating-{i}"), 5, MINUTE));
        }
        let elapsed = started.elapsed();

        assert_eq!(limiter.tracked_identifiers(), capacity);
        assert!(
            elapsed < Duration::from_secs(1),
            "1000 admissions at capacity took {elapsed:?}"
        );
    }

    #[test]
    fn extreme_window_does_not_overflow() {
        let limiter = RateLimiter::new();
        assert!(limiter.check("forever", 1, Duration::MAX));
        assert!(!limiter.check("forever", 1, Duration::MAX));
        assert_eq!(limiter.sweep(), 0);
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        let limiter = Arc::new(RateLimiter::new());
        let admitted: usize = (0..8)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                thread::spawn(move || {
                    (0..50)
                        .filter(|_| limiter.check("shared", 100, MINUTE))
                        .count()
                })
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|h| h.join().unwrap())
            .sum();

        assert_eq!(admitted, 100);
    }

    #[tokio::test]
    async fn sweeper_task_runs() {
        let limiter = Arc::new(RateLimiter::new());
        limiter.check("ephemeral", 5, Duration::from_millis(1));

        let handle = limiter.start_sweeper(Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(60)).await;
        handle.abort();

        assert_eq!(limiter.tracked_identifiers(), 0);
    }

    #[test]
    fn client_identifier_prefers_first_forwarded_hop() {
        let parts = RequestParts::new()
            .with_header("x-forwarded-for", " 203.0.113.9 , 10.0.0.1")
            .with_header("x-real-ip", "10.0.0.1");
        assert_eq!(client_identifier(&parts), "203.0.113.9");
    }

    #[test]
    fn client_identifier_falls_back_to_real_ip_then_unknown() {
        let parts = RequestParts::new().with_header("x-real-ip", "198.51.100.4");
        assert_eq!(client_identifier(&parts), "198.51.100.4");

        let parts = RequestParts::new().with_header("x-forwarded-for", "");
        assert_eq!(client_identifier(&parts), UNKNOWN_CLIENT);

        assert_eq!(client_identifier(&RequestParts::new()), UNKNOWN_CLIENT);
    }
}
