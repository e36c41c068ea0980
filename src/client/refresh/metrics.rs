// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for refresh cycles.
#[derive(Debug, Default)]
pub struct RefreshMetrics {
	cycles: AtomicU64,
	followers: AtomicU64,
	success: AtomicU64,
	failure: AtomicU64,
	abandoned: AtomicU64,
}
impl RefreshMetrics {
	/// Returns the number of refresh cycles started (one per elected leader).
	pub fn cycles(&self) -> u64 {
		self.cycles.load(Ordering::Relaxed)
	}

	/// Returns the number of callers that joined an in-flight cycle instead of starting one.
	pub fn followers(&self) -> u64 {
		self.followers.load(Ordering::Relaxed)
	}

	/// Returns the number of cycles that released a token.
	pub fn successes(&self) -> u64 {
		self.success.load(Ordering::Relaxed)
	}

	/// Returns the number of cycles that released no token.
	pub fn failures(&self) -> u64 {
		self.failure.load(Ordering::Relaxed)
	}

	/// Returns the number of cycles whose leader was dropped before settling.
	pub fn abandoned(&self) -> u64 {
		self.abandoned.load(Ordering::Relaxed)
	}

	pub(crate) fn record_cycle(&self) {
		self.cycles.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_follower(&self) {
		self.followers.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_success(&self) {
		self.success.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failure.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_abandoned(&self) {
		self.abandoned.fetch_add(1, Ordering::Relaxed);
	}
}
