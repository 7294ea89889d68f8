use std::{
	fmt,
	panic::{self, AssertUnwindSafe},
	sync::Arc,
};

use parking_lot::Mutex;
use tracing::{error, trace};

use super::{invite::Invite, job::ActiveJob, ledger::EarningsEntry};

pub type SubscriptionId = u64;

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Ordered list of observers for one kind of change.
pub(crate) struct Registry<T: ?Sized> {
	channel: &'static str,
	inner: Mutex<RegistryInner<T>>,
}

struct RegistryInner<T: ?Sized> {
	next_id: SubscriptionId,
	callbacks: Vec<(SubscriptionId, Callback<T>)>,
}

impl<T: ?Sized> Registry<T> {
	pub fn new(channel: &'static str) -> Self {
		Self {
			channel,
			inner: Mutex::new(RegistryInner {
				next_id: 0,
				callbacks: Vec::new(),
			}),
		}
	}

	pub fn add(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> SubscriptionId {
		let callback: Callback<T> = Arc::new(callback);
		let mut inner = self.inner.lock();

		let id = inner.next_id;
		inner.next_id += 1;
		inner.callbacks.push((id, callback));

		trace!(channel = self.channel, %id, "Subscribed;");

		id
	}

	/// Returns whether the subscription was still registered.
	pub fn remove(&self, id: SubscriptionId) -> bool {
		let mut inner = self.inner.lock();

		let before = inner.callbacks.len();
		inner.callbacks.retain(|(other, _)| *other != id);
		let removed = inner.callbacks.len() != before;

		if removed {
			trace!(channel = self.channel, %id, "Unsubscribed;");
		}

		removed
	}

	pub fn len(&self) -> usize {
		self.inner.lock().callbacks.len()
	}

	/// Calls every subscriber in registration order.
	///
	/// Iterates over a snapshot, so subscribers may (un)subscribe from inside their callback. A
	/// panicking subscriber is logged and skipped, the remaining ones are still notified.
	pub fn notify(&self, payload: &T) {
		let snapshot = self
			.inner
			.lock()
			.callbacks
			.iter()
			.map(|(id, callback)| (*id, Arc::clone(callback)))
			.collect::<Vec<_>>();

		for (id, callback) in snapshot {
			if panic::catch_unwind(AssertUnwindSafe(|| callback(payload))).is_err() {
				error!(
					channel = self.channel,
					%id,
					"Subscriber panicked while handling a notification;"
				);
			}
		}
	}
}

/// One registry per observable part of the engine state.
pub(crate) struct Hub {
	pub invites: Registry<[Invite]>,
	pub active_job: Registry<Option<ActiveJob>>,
	pub earnings: Registry<[EarningsEntry]>,
}

impl Default for Hub {
	fn default() -> Self {
		Self {
			invites: Registry::new("invites"),
			active_job: Registry::new("active_job"),
			earnings: Registry::new("earnings"),
		}
	}
}

/// Handle returned by the `subscribe_*` methods.
///
/// Dropping it unsubscribes, keep it around for as long as notifications are wanted.
#[must_use = "dropping a subscription unsubscribes right away"]
pub struct Subscription {
	id: SubscriptionId,
	maybe_unsubscribe: Option<Box<dyn FnOnce(SubscriptionId) + Send + Sync>>,
}

impl Subscription {
	pub(crate) fn new(
		id: SubscriptionId,
		unsubscribe: impl FnOnce(SubscriptionId) + Send + Sync + 'static,
	) -> Self {
		Self {
			id,
			maybe_unsubscribe: Some(Box::new(unsubscribe)),
		}
	}

	#[must_use]
	pub const fn id(&self) -> SubscriptionId {
		self.id
	}

	pub fn unsubscribe(mut self) {
		self.unsubscribe_inner();
	}

	fn unsubscribe_inner(&mut self) {
		if let Some(unsubscribe) = self.maybe_unsubscribe.take() {
			unsubscribe(self.id);
		}
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		self.unsubscribe_inner();
	}
}

impl fmt::Debug for Subscription {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Subscription")
			.field("id", &self.id)
			.field("active", &self.maybe_unsubscribe.is_some())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	use std::sync::{
		atomic::{AtomicUsize, Ordering},
		OnceLock,
	};

	use tracing_test::traced_test;

	#[test]
	fn notifies_in_registration_order() {
		let registry = Registry::<u32>::new("test");
		let seen = Arc::new(Mutex::new(Vec::new()));

		for name in ["first", "second", "third"] {
			let seen = Arc::clone(&seen);
			registry.add(move |value: &u32| seen.lock().push((name, *value)));
		}

		registry.notify(&7);

		assert_eq!(
			*seen.lock(),
			vec![("first", 7), ("second", 7), ("third", 7)]
		);
	}

	#[test]
	#[traced_test]
	fn panicking_subscriber_does_not_block_the_rest() {
		let registry = Registry::<u32>::new("test");
		let calls = Arc::new(AtomicUsize::new(0));

		registry.add(|_: &u32| panic!("bad subscriber"));
		registry.add({
			let calls = Arc::clone(&calls);
			move |_: &u32| {
				calls.fetch_add(1, Ordering::Relaxed);
			}
		});

		registry.notify(&1);
		registry.notify(&2);

		assert_eq!(calls.load(Ordering::Relaxed), 2);
		assert!(logs_contain("Subscriber panicked"));
	}

	#[test]
	fn subscriber_may_unsubscribe_during_fan_out() {
		let registry = Arc::new(Registry::<u32>::new("test"));
		let calls = Arc::new(AtomicUsize::new(0));
		let own_id = Arc::new(OnceLock::<SubscriptionId>::new());

		let stays = registry.add(|_: &u32| {});

		let leaves = registry.add({
			let registry = Arc::downgrade(&registry);
			let calls = Arc::clone(&calls);
			let own_id = Arc::clone(&own_id);
			move |_: &u32| {
				calls.fetch_add(1, Ordering::Relaxed);
				if let (Some(registry), Some(id)) = (registry.upgrade(), own_id.get()) {
					assert!(registry.remove(*id));
				}
			}
		});
		own_id.set(leaves).unwrap();
		assert_ne!(stays, leaves);

		registry.notify(&1);
		registry.notify(&2);

		assert_eq!(calls.load(Ordering::Relaxed), 1);
		assert_eq!(registry.len(), 1);
		assert!(registry.remove(stays));
	}

	#[test]
	fn subscription_unsubscribes_once() {
		let calls = Arc::new(AtomicUsize::new(0));

		let subscription = Subscription::new(3, {
			let calls = Arc::clone(&calls);
			move |id| {
				assert_eq!(id, 3);
				calls.fetch_add(1, Ordering::Relaxed);
			}
		});

		subscription.unsubscribe();
		assert_eq!(calls.load(Ordering::Relaxed), 1);

		drop(Subscription::new(4, {
			let calls = Arc::clone(&calls);
			move |_| {
				calls.fetch_add(1, Ordering::Relaxed);
			}
		}));
		assert_eq!(calls.load(Ordering::Relaxed), 2);
	}
}
