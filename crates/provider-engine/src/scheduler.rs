use std::{sync::Weak, time::Duration};

use cw_actors::{Actor, Stopper};
use futures_concurrency::future::Race;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tracing::trace;

use super::engine::{upgrade, Inner};

enum StreamMessage {
	Tick,
	Stop,
}

/// Produces invites at random intervals while the engine wants them.
pub(crate) struct InviteGenerator {
	engine: Weak<Inner>,
	epoch: u64,
}

impl InviteGenerator {
	pub const fn new(engine: Weak<Inner>, epoch: u64) -> Self {
		Self { engine, epoch }
	}
}

impl Actor for InviteGenerator {
	const IDENTIFIER: &'static str = "invite_generator";

	async fn run(self, stop: Stopper) {
		loop {
			let Some(delay) = upgrade(&self.engine).map(|engine| engine.next_generation_delay())
			else {
				break;
			};

			trace!(epoch = self.epoch, ?delay, "Next invite scheduled;");

			match (
				async {
					sleep(delay).await;
					StreamMessage::Tick
				},
				async {
					(&stop).await;
					StreamMessage::Stop
				},
			)
				.race()
				.await
			{
				StreamMessage::Tick => {
					let Some(engine) = upgrade(&self.engine) else {
						break;
					};

					engine.generate_scheduled(self.epoch);
				}

				StreamMessage::Stop => break,
			}
		}
	}
}

/// Removes expired invites on a fixed period.
pub(crate) struct ExpirySweeper {
	engine: Weak<Inner>,
	period: Duration,
}

impl ExpirySweeper {
	pub const fn new(engine: Weak<Inner>, period: Duration) -> Self {
		Self { engine, period }
	}
}

impl Actor for ExpirySweeper {
	const IDENTIFIER: &'static str = "expiry_sweeper";

	async fn run(self, stop: Stopper) {
		let mut ticker = interval_at(Instant::now() + self.period, self.period);
		ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

		loop {
			match (
				async {
					ticker.tick().await;
					StreamMessage::Tick
				},
				async {
					(&stop).await;
					StreamMessage::Stop
				},
			)
				.race()
				.await
			{
				StreamMessage::Tick => {
					let Some(engine) = upgrade(&self.engine) else {
						break;
					};

					engine.sweep_expired();
				}

				StreamMessage::Stop => break,
			}
		}
	}
}
