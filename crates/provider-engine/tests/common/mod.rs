#![allow(dead_code)]

use cw_provider_engine::{ActiveJob, EngineConfig, Invite, ManualClock, ProviderEngine};

use std::sync::{
	atomic::{AtomicUsize, Ordering},
	Arc,
};

pub const SEED: u64 = 0x5EED;

pub fn config() -> EngineConfig {
	EngineConfig {
		seed: Some(SEED),
		..Default::default()
	}
}

/// Engine on a clock starting at zero that only moves when told to.
pub fn manual_engine(config: EngineConfig) -> (ProviderEngine, Arc<ManualClock>) {
	let clock = Arc::new(ManualClock::new(0));
	let engine = ProviderEngine::with_clock(config, Arc::clone(&clock) as _).unwrap();

	(engine, clock)
}

/// Counts how many notifications a subscriber received.
#[derive(Debug, Clone, Default)]
pub struct Counter(Arc<AtomicUsize>);

impl Counter {
	pub fn get(&self) -> usize {
		self.0.load(Ordering::Acquire)
	}

	pub fn reset(&self) {
		self.0.store(0, Ordering::Release);
	}

	pub fn on_invites(&self) -> impl Fn(&[Invite]) + Send + Sync + 'static {
		let count = Arc::clone(&self.0);
		move |_| {
			count.fetch_add(1, Ordering::AcqRel);
		}
	}

	pub fn on_active_job(&self) -> impl Fn(&Option<ActiveJob>) + Send + Sync + 'static {
		let count = Arc::clone(&self.0);
		move |_| {
			count.fetch_add(1, Ordering::AcqRel);
		}
	}
}
