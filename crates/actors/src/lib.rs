//! Long running background loops owned by a single handle.
//!
//! An [`Actor`] is spawned on a tokio runtime through [`ActorHandle::spawn`] and keeps running
//! until it returns on its own, its [`Stopper`] fires or the handle is stopped or dropped.
//! Stopping is synchronous so it can be done while holding a lock: the stop signal is sent and
//! the underlying task is aborted, so no timer outlives its handle.

#![warn(
	clippy::all,
	clippy::pedantic,
	clippy::correctness,
	clippy::perf,
	clippy::style,
	clippy::suspicious,
	clippy::complexity,
	clippy::nursery,
	clippy::unwrap_used,
	unused_qualifications,
	rust_2018_idioms,
	trivial_casts,
	trivial_numeric_casts,
	unused_allocation,
	clippy::unnecessary_cast,
	clippy::cast_lossless,
	clippy::cast_possible_truncation,
	clippy::cast_possible_wrap,
	clippy::cast_precision_loss,
	clippy::cast_sign_loss,
	clippy::dbg_macro,
	clippy::deprecated_cfg_attr,
	clippy::separated_literal_suffix,
	deprecated
)]
#![forbid(deprecated_in_future)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

use std::{
	fmt,
	future::{Future, IntoFuture},
	panic::AssertUnwindSafe,
	pin::Pin,
	sync::{
		atomic::{AtomicBool, Ordering},
		Arc,
	},
	task::{Context, Poll},
};

use async_channel as chan;
use futures::FutureExt;
use tokio::{runtime::Handle, task::JoinHandle};
use tracing::{error, trace, warn};

pub trait Actor: Send + 'static {
	const IDENTIFIER: &'static str;

	fn run(self, stop: Stopper) -> impl Future<Output = ()> + Send;
}

/// Owner of a running actor. Dropping it stops the actor.
pub struct ActorHandle {
	identifier: &'static str,
	maybe_handle: Option<JoinHandle<()>>,
	is_running: Arc<AtomicBool>,
	stop_tx: chan::Sender<()>,
}

impl ActorHandle {
	pub fn spawn<A: Actor>(runtime: &Handle, actor: A) -> Self {
		let (stop_tx, stop_rx) = chan::bounded(1);
		let is_running = Arc::new(AtomicBool::new(true));

		let handle = runtime.spawn({
			let is_running = Arc::clone(&is_running);

			async move {
				trace!(actor = A::IDENTIFIER, "Actor starting");

				if AssertUnwindSafe(actor.run(Stopper(stop_rx)))
					.catch_unwind()
					.await
					.is_err()
				{
					error!(actor = A::IDENTIFIER, "Actor unexpectedly panicked");
				}

				is_running.store(false, Ordering::Release);

				trace!(actor = A::IDENTIFIER, "Actor finished");
			}
		});

		Self {
			identifier: A::IDENTIFIER,
			maybe_handle: Some(handle),
			is_running,
			stop_tx,
		}
	}

	#[must_use]
	pub const fn identifier(&self) -> &'static str {
		self.identifier
	}

	#[must_use]
	pub fn is_running(&self) -> bool {
		self.is_running.load(Ordering::Acquire)
			&& self
				.maybe_handle
				.as_ref()
				.is_some_and(|handle| !handle.is_finished())
	}

	/// Signals the actor to stop and aborts its task, without waiting for it.
	pub fn stop(mut self) {
		self.stop_inner();
	}

	fn stop_inner(&mut self) {
		if let Some(handle) = self.maybe_handle.take() {
			if self.stop_tx.try_send(()).is_err() && !handle.is_finished() {
				warn!(
					actor = self.identifier,
					"Failed to send stop signal to actor, will abort it"
				);
			}

			// The stop signal only reaches the actor at its next await point, aborting makes
			// sure a pending sleep or tick is released right away
			handle.abort();
			self.is_running.store(false, Ordering::Release);

			trace!(actor = self.identifier, "Actor stopped");
		}
	}
}

impl Drop for ActorHandle {
	fn drop(&mut self) {
		self.stop_inner();
	}
}

impl fmt::Debug for ActorHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ActorHandle")
			.field("identifier", &self.identifier)
			.field("is_running", &self.is_running())
			.finish_non_exhaustive()
	}
}

pub struct Stopper(chan::Receiver<()>);

impl Stopper {
	#[must_use]
	pub fn check_stop(&self) -> bool {
		self.0.try_recv().is_ok()
	}
}

pin_project_lite::pin_project! {
	pub struct StopActorFuture<'recv> {
		#[pin]
		fut: chan::Recv<'recv, ()>,
	}
}

impl Future for StopActorFuture<'_> {
	type Output = ();

	fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		let this = self.project();

		match this.fut.poll(cx) {
			Poll::Ready(res) => {
				if res.is_err() {
					trace!("Stop channel closed, will stop actor");
				}
				Poll::Ready(())
			}
			Poll::Pending => Poll::Pending,
		}
	}
}

impl<'recv> IntoFuture for &'recv Stopper {
	type Output = ();
	type IntoFuture = StopActorFuture<'recv>;

	fn into_future(self) -> Self::IntoFuture {
		Self::IntoFuture { fut: self.0.recv() }
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	use std::{
		sync::atomic::{AtomicUsize, Ordering},
		time::Duration,
	};

	use tokio::time::sleep;
	use tracing_test::traced_test;

	struct Counter {
		ticks: Arc<AtomicUsize>,
	}

	impl Actor for Counter {
		const IDENTIFIER: &'static str = "counter";

		async fn run(self, stop: Stopper) {
			loop {
				tokio::select! {
					() = sleep(Duration::from_secs(1)) => {
						self.ticks.fetch_add(1, Ordering::Relaxed);
					}
					() = (&stop).into_future() => break,
				}
			}
		}
	}

	struct Panicking;

	impl Actor for Panicking {
		const IDENTIFIER: &'static str = "panicking";

		async fn run(self, _stop: Stopper) {
			panic!("boom");
		}
	}

	#[tokio::test(start_paused = true)]
	#[traced_test]
	async fn stop_halts_ticks() {
		let ticks = Arc::new(AtomicUsize::new(0));
		let handle = ActorHandle::spawn(
			&Handle::current(),
			Counter {
				ticks: Arc::clone(&ticks),
			},
		);

		sleep(Duration::from_millis(3500)).await;
		assert_eq!(ticks.load(Ordering::Relaxed), 3);
		assert!(handle.is_running());

		handle.stop();

		sleep(Duration::from_secs(5)).await;
		assert_eq!(ticks.load(Ordering::Relaxed), 3);
	}

	#[tokio::test(start_paused = true)]
	#[traced_test]
	async fn drop_stops_actor() {
		let ticks = Arc::new(AtomicUsize::new(0));
		let handle = ActorHandle::spawn(
			&Handle::current(),
			Counter {
				ticks: Arc::clone(&ticks),
			},
		);

		sleep(Duration::from_millis(1500)).await;
		drop(handle);

		sleep(Duration::from_secs(5)).await;
		assert_eq!(ticks.load(Ordering::Relaxed), 1);
	}

	#[tokio::test]
	#[traced_test]
	async fn panicking_actor_is_contained() {
		let handle = ActorHandle::spawn(&Handle::current(), Panicking);

		sleep(Duration::from_millis(50)).await;

		assert!(!handle.is_running());
		assert!(logs_contain("Actor unexpectedly panicked"));
	}
}
