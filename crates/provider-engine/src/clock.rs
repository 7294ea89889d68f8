use std::{
	fmt,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use tokio::time::Instant;
use tracing::warn;

/// Source of the current time, in milliseconds since the Unix epoch.
pub trait Clock: fmt::Debug + Send + Sync + 'static {
	fn now_ms(&self) -> u64;
}

/// Wall clock anchored once at construction and advanced by tokio's monotonic clock.
///
/// Under a paused tokio runtime (`start_paused` tests) the time only moves when tokio's clock
/// does, so invite countdowns and scheduled work stay in lockstep.
#[derive(Debug)]
pub struct TokioClock {
	anchor_ms: u64,
	anchor: Instant,
}

impl TokioClock {
	#[must_use]
	pub fn new() -> Self {
		let anchor_ms = SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.map_or_else(
				|e| {
					warn!(?e, "System clock is set before the Unix epoch;");
					0
				},
				|elapsed| saturating_millis(elapsed.as_millis()),
			);

		Self {
			anchor_ms,
			anchor: Instant::now(),
		}
	}
}

impl Default for TokioClock {
	fn default() -> Self {
		Self::new()
	}
}

impl Clock for TokioClock {
	fn now_ms(&self) -> u64 {
		self.anchor_ms
			.saturating_add(saturating_millis(self.anchor.elapsed().as_millis()))
	}
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock(AtomicU64);

impl ManualClock {
	#[must_use]
	pub const fn new(now_ms: u64) -> Self {
		Self(AtomicU64::new(now_ms))
	}

	pub fn set(&self, now_ms: u64) {
		self.0.store(now_ms, Ordering::Release);
	}

	pub fn advance(&self, by_ms: u64) {
		self.0.fetch_add(by_ms, Ordering::AcqRel);
	}
}

impl Clock for ManualClock {
	fn now_ms(&self) -> u64 {
		self.0.load(Ordering::Acquire)
	}
}

fn saturating_millis(millis: u128) -> u64 {
	u64::try_from(millis).unwrap_or(u64::MAX)
}
