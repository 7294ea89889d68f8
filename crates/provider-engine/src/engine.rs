use std::{
	cell::RefCell,
	collections::VecDeque,
	sync::{Arc, Weak},
	time::Duration,
};

use cw_actors::ActorHandle;
use parking_lot::ReentrantMutex;
use rand::{rngs::StdRng, Rng, SeedableRng};
use tokio::runtime::Handle;
use tracing::{debug, info, instrument, trace, warn};

use super::{
	clock::{Clock, TokioClock},
	config::EngineConfig,
	error::{ConfigError, Error},
	hub::{Hub, Subscription},
	invite::{random_id, Invite, InviteId},
	job::{ActiveJob, JobId, JobStatus, TransitionPolicy},
	ledger::{Completion, EarningsEntry, EarningsSummary, Ledger},
	profile::{ProfileUpdate, ProviderProfile},
	scheduler::{ExpirySweeper, InviteGenerator},
};

/// The provider side of the marketplace: presence, incoming invites, the active job and the
/// earnings ledger, all behind a single serialization point.
///
/// Every operation takes the engine lock for its whole duration, notifications included, so
/// subscribers observe mutations in one total order. The lock is re-entrant, a subscriber may call
/// back into the engine from its callback. Notifications raised by such a nested call are queued
/// and delivered once the current fan-out is over, so every subscriber sees changes in the order
/// they were made and its last view matches the engine state.
///
/// Cloning is cheap and yields a handle to the same engine.
#[derive(Clone)]
pub struct ProviderEngine {
	pub(crate) inner: Arc<Inner>,
}

pub(crate) struct Inner {
	config: EngineConfig,
	policy: TransitionPolicy,
	clock: Arc<dyn Clock>,
	maybe_runtime: Option<Handle>,
	hub: Hub,
	state: ReentrantMutex<RefCell<State>>,
}

struct State {
	profile: ProviderProfile,
	invites: Vec<Invite>,
	active_job: Option<ActiveJob>,
	ledger: Ledger,
	rng: StdRng,
	generator: Option<ActorHandle>,
	/// Bumped on every generator start, so a stopped generator that already woke up can't
	/// produce an invite on behalf of its successor.
	generator_epoch: u64,
	sweeper: Option<ActorHandle>,
	outbox: VecDeque<Notification>,
	delivering: bool,
}

/// A change waiting to be fanned out to one channel.
enum Notification {
	Invites(Vec<Invite>),
	ActiveJob(Option<ActiveJob>),
	Earnings(Vec<EarningsEntry>),
}

impl ProviderEngine {
	/// Creates an engine driven by the wall clock.
	///
	/// When called from within a tokio runtime, invite generation and expiry sweeps are scheduled
	/// on it. Otherwise they must be driven through [`Self::generate_invite`] and
	/// [`Self::sweep_expired`].
	pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
		Self::with_clock(config, Arc::new(TokioClock::new()))
	}

	pub fn with_clock(config: EngineConfig, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
		config.validate()?;

		let mut rng = config
			.seed
			.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);

		let profile = ProviderProfile {
			id: random_id(&mut rng),
			name: config.provider.name.clone(),
			phone: config.provider.phone.clone(),
			is_online: false,
		};

		let maybe_runtime = Handle::try_current().ok();
		if maybe_runtime.is_none() {
			debug!(
				"No tokio runtime available, invite generation and expiry sweeps \
				must be driven manually"
			);
		}

		let policy = if config.strict_transitions {
			TransitionPolicy::Strict
		} else {
			TransitionPolicy::Permissive
		};

		Ok(Self {
			inner: Arc::new(Inner {
				config,
				policy,
				clock,
				maybe_runtime,
				hub: Hub::default(),
				state: ReentrantMutex::new(RefCell::new(State {
					profile,
					invites: Vec::new(),
					active_job: None,
					ledger: Ledger::default(),
					rng,
					generator: None,
					generator_epoch: 0,
					sweeper: None,
					outbox: VecDeque::new(),
					delivering: false,
				})),
			}),
		})
	}

	#[must_use]
	pub fn config(&self) -> &EngineConfig {
		&self.inner.config
	}

	#[must_use]
	pub fn now_ms(&self) -> u64 {
		self.inner.clock.now_ms()
	}

	#[must_use]
	pub fn profile(&self) -> ProviderProfile {
		self.inner.state.lock().borrow().profile.clone()
	}

	#[instrument(skip(self))]
	pub fn update_profile(&self, update: ProfileUpdate) -> ProviderProfile {
		let guard = self.inner.state.lock();
		let mut state = guard.borrow_mut();

		state.profile.apply(update);
		debug!("Provider profile updated");

		state.profile.clone()
	}

	/// Going online starts the expiry sweeper and, if someone is watching invites and no job is
	/// in progress, the invite generator. Going offline stops both; outstanding invites are kept
	/// but can't be accepted once expired.
	#[instrument(skip(self))]
	pub fn set_online(&self, online: bool) -> ProviderProfile {
		let guard = self.inner.state.lock();
		let mut state = guard.borrow_mut();

		if state.profile.is_online != online {
			state.profile.is_online = online;
			info!(online, "Provider presence changed;");

			self.inner.reconcile_timers(&mut state);
		}

		state.profile.clone()
	}

	pub fn subscribe_invites(
		&self,
		callback: impl Fn(&[Invite]) + Send + Sync + 'static,
	) -> Subscription {
		let guard = self.inner.state.lock();

		let id = self.inner.hub.invites.add(callback);
		self.inner.reconcile_timers(&mut guard.borrow_mut());

		Subscription::new(id, {
			let inner = Arc::downgrade(&self.inner);
			move |id| {
				if let Some(inner) = inner.upgrade() {
					inner.unsubscribe_invites(id);
				}
			}
		})
	}

	pub fn subscribe_active_job(
		&self,
		callback: impl Fn(&Option<ActiveJob>) + Send + Sync + 'static,
	) -> Subscription {
		let _guard = self.inner.state.lock();

		let id = self.inner.hub.active_job.add(callback);

		Subscription::new(id, {
			let inner = Arc::downgrade(&self.inner);
			move |id| {
				if let Some(inner) = inner.upgrade() {
					let _guard = inner.state.lock();
					inner.hub.active_job.remove(id);
				}
			}
		})
	}

	pub fn subscribe_earnings(
		&self,
		callback: impl Fn(&[EarningsEntry]) + Send + Sync + 'static,
	) -> Subscription {
		let _guard = self.inner.state.lock();

		let id = self.inner.hub.earnings.add(callback);

		Subscription::new(id, {
			let inner = Arc::downgrade(&self.inner);
			move |id| {
				if let Some(inner) = inner.upgrade() {
					let _guard = inner.state.lock();
					inner.hub.earnings.remove(id);
				}
			}
		})
	}

	/// Outstanding invites, oldest first.
	#[must_use]
	pub fn invites(&self) -> Vec<Invite> {
		self.inner.state.lock().borrow().invites.clone()
	}

	#[must_use]
	pub fn active_job(&self) -> Option<ActiveJob> {
		self.inner.state.lock().borrow().active_job.clone()
	}

	/// Whether the invite generator is currently scheduled.
	#[must_use]
	pub fn is_generating(&self) -> bool {
		self.inner
			.state
			.lock()
			.borrow()
			.generator
			.as_ref()
			.is_some_and(ActorHandle::is_running)
	}

	/// Whether the expiry sweeper is currently scheduled.
	#[must_use]
	pub fn is_sweeping(&self) -> bool {
		self.inner
			.state
			.lock()
			.borrow()
			.sweeper
			.as_ref()
			.is_some_and(ActorHandle::is_running)
	}

	/// Attempts to produce a new invite now.
	///
	/// Silently skipped (returning `None`) unless the provider is online, someone is watching
	/// invites, no job is in progress and the invite queue is below its cap.
	pub fn generate_invite(&self) -> Option<Invite> {
		let guard = self.inner.state.lock();

		let (invite, invites) = {
			let mut state = guard.borrow_mut();

			if !self.inner.can_generate(&state) {
				trace!("Invite generation preconditions not met, skipping");
				return None;
			}

			if state.invites.len() >= self.inner.config.max_pending_invites {
				trace!(
					pending = state.invites.len(),
					"Invite queue is full, skipping generation"
				);
				return None;
			}

			let now = self.inner.clock.now_ms();
			let invite = Invite::generate(&self.inner.config, &mut state.rng, now)?;

			debug!(
				invite_id = %invite.id,
				customer = %invite.customer_name,
				price = invite.price,
				ttl_ms = invite.ttl_ms,
				"New invite;"
			);

			state.invites.push(invite.clone());

			(invite, state.invites.clone())
		};

		self.inner.publish([Notification::Invites(invites)]);

		Some(invite)
	}

	/// Drops every expired invite, returning how many were removed.
	///
	/// Invite observers are notified when something was removed, or when invites remain so their
	/// countdowns keep ticking.
	pub fn sweep_expired(&self) -> usize {
		let guard = self.inner.state.lock();

		let (removed, maybe_invites) = {
			let mut state = guard.borrow_mut();
			let now = self.inner.clock.now_ms();

			let before = state.invites.len();
			state.invites.retain(|invite| !invite.is_expired(now));
			let removed = before - state.invites.len();

			debug_assert!(
				state.invites.iter().all(|invite| invite.remaining_ms(now) > 0),
				"expired invite survived a sweep"
			);

			let maybe_invites =
				(removed > 0 || !state.invites.is_empty()).then(|| state.invites.clone());

			(removed, maybe_invites)
		};

		if removed > 0 {
			debug!(removed, "Swept expired invites;");
		}

		if let Some(invites) = maybe_invites {
			self.inner.publish([Notification::Invites(invites)]);
		}

		removed
	}

	/// Removes an invite, returning whether it was still outstanding. Observers are only notified
	/// if it was.
	#[instrument(skip(self))]
	pub fn decline_invite(&self, invite_id: InviteId) -> bool {
		let guard = self.inner.state.lock();

		let invites = {
			let mut state = guard.borrow_mut();

			let Some(idx) = state
				.invites
				.iter()
				.position(|invite| invite.id == invite_id)
			else {
				trace!("Declined invite is no longer outstanding");
				return false;
			};

			state.invites.remove(idx);
			debug!("Invite declined");

			state.invites.clone()
		};

		self.inner.publish([Notification::Invites(invites)]);

		true
	}

	/// Turns an outstanding invite into the active job.
	///
	/// Every other outstanding invite is revoked and invite generation stops until the job is
	/// completed. Nothing changes when the invite can't be accepted.
	#[instrument(skip(self))]
	pub fn accept_invite(&self, invite_id: InviteId) -> Result<ActiveJob, Error> {
		let guard = self.inner.state.lock();

		let (job, invites) = {
			let mut state = guard.borrow_mut();

			if let Some(job) = &state.active_job {
				warn!(active_job_id = %job.id, "Can't accept an invite while a job is in progress;");
				return Err(Error::JobInProgress(job.id));
			}

			let now = self.inner.clock.now_ms();

			let Some(invite) = state.invites.iter().find(|invite| invite.id == invite_id) else {
				warn!("Accepted invite is not outstanding");
				return Err(Error::InviteNotFound(invite_id));
			};

			if invite.is_expired(now) {
				warn!("Accepted invite already expired");
				return Err(Error::InviteExpired(invite_id));
			}

			let job = ActiveJob::from_invite(
				invite,
				self.inner
					.config
					.exact_address_of(&invite.customer_name, &invite.approx_address),
				now,
			);

			let revoked = state.invites.len() - 1;
			state.invites.clear();
			state.active_job = Some(job.clone());

			self.inner.reconcile_timers(&mut state);

			info!(job_id = %job.id, price = job.price, revoked, "Invite accepted;");

			(job, state.invites.clone())
		};

		self.inner.publish([
			Notification::Invites(invites),
			Notification::ActiveJob(Some(job.clone())),
		]);

		Ok(job)
	}

	#[instrument(skip(self))]
	pub fn update_job_status(&self, job_id: JobId, status: JobStatus) -> Result<ActiveJob, Error> {
		let guard = self.inner.state.lock();

		let job = {
			let mut state = guard.borrow_mut();

			let Some(job) = state.active_job.as_mut().filter(|job| job.id == job_id) else {
				warn!("Status update for a job that isn't active");
				return Err(Error::JobNotFound(job_id));
			};

			let from = job.status;
			job.transition(status, self.inner.policy)
				.inspect_err(|e| warn!(%e, "Rejected status update;"))?;

			debug!(%from, to = %status, "Job status updated;");

			job.clone()
		};

		self.inner.publish([Notification::ActiveJob(Some(job.clone()))]);

		Ok(job)
	}

	/// Records the active job into the earnings ledger and frees the job slot, resuming invite
	/// generation if the provider is still online and someone watches invites.
	#[instrument(skip(self, completion))]
	pub fn complete_job(
		&self,
		job_id: JobId,
		completion: Completion,
	) -> Result<EarningsEntry, Error> {
		let guard = self.inner.state.lock();

		let (entry, earnings) = {
			let mut state = guard.borrow_mut();

			let job = match state.active_job.take() {
				Some(job) if job.id == job_id => job,
				other => {
					state.active_job = other;
					warn!("Completion for a job that isn't active");
					return Err(Error::JobNotFound(job_id));
				}
			};

			let now = self.inner.clock.now_ms();
			let entry_id = random_id(&mut state.rng);
			let entry = state.ledger.record(entry_id, job, completion, now).clone();

			self.inner.reconcile_timers(&mut state);

			info!(
				price = entry.price,
				cash_received = entry.cash_received,
				"Job completed;"
			);

			(entry, state.ledger.sorted())
		};

		self.inner.publish([
			Notification::ActiveJob(None),
			Notification::Earnings(earnings),
		]);

		Ok(entry)
	}

	/// Every completed job, latest first.
	#[must_use]
	pub fn earnings(&self) -> Vec<EarningsEntry> {
		self.inner.state.lock().borrow().ledger.sorted()
	}

	/// Sum of the prices of jobs whose cash was received.
	#[must_use]
	pub fn total_earnings(&self) -> u64 {
		self.inner.state.lock().borrow().ledger.total()
	}

	#[must_use]
	pub fn earnings_summary(&self) -> EarningsSummary {
		self.inner.state.lock().borrow().ledger.summary()
	}

	/// Scheduled generation only goes through if it comes from the current generator.
	pub(crate) fn generate_scheduled(&self, epoch: u64) {
		let guard = self.inner.state.lock();

		if guard.borrow().generator_epoch != epoch {
			trace!(epoch, "Stale invite generator woke up, ignoring");
			return;
		}

		self.generate_invite();
	}

	pub(crate) fn next_generation_delay(&self) -> Duration {
		let range = self.inner.config.generation_interval_ms.clone();

		Duration::from_millis(self.inner.state.lock().borrow_mut().rng.gen_range(range))
	}
}

impl Inner {
	fn can_generate(&self, state: &State) -> bool {
		state.profile.is_online && state.active_job.is_none() && self.hub.invites.len() > 0
	}

	/// Starts or stops the scheduled work so it matches the current state.
	fn reconcile_timers(self: &Arc<Self>, state: &mut State) {
		let online = state.profile.is_online;

		if online {
			if !state.sweeper.as_ref().is_some_and(ActorHandle::is_running) {
				if let Some(runtime) = &self.maybe_runtime {
					state.sweeper = Some(ActorHandle::spawn(
						runtime,
						ExpirySweeper::new(
							Arc::downgrade(self),
							Duration::from_millis(self.config.sweep_interval_ms),
						),
					));
					debug!("Expiry sweeper started");
				}
			}
		} else if let Some(sweeper) = state.sweeper.take() {
			sweeper.stop();
			debug!("Expiry sweeper stopped");
		}

		if self.can_generate(state) {
			if !state.generator.as_ref().is_some_and(ActorHandle::is_running) {
				state.generator_epoch += 1;

				if let Some(runtime) = &self.maybe_runtime {
					state.generator = Some(ActorHandle::spawn(
						runtime,
						InviteGenerator::new(Arc::downgrade(self), state.generator_epoch),
					));
					debug!(epoch = state.generator_epoch, "Invite generator started;");
				}
			}
		} else if let Some(generator) = state.generator.take() {
			generator.stop();
			debug!("Invite generator stopped");
		}
	}

	/// Queues notifications and, unless a fan-out is already in progress further up the stack,
	/// delivers everything queued in order.
	fn publish(&self, notifications: impl IntoIterator<Item = Notification>) {
		let guard = self.state.lock();

		{
			let mut state = guard.borrow_mut();
			state.outbox.extend(notifications);

			if state.delivering {
				trace!(
					queued = state.outbox.len(),
					"Nested notification deferred to the current fan-out;"
				);
				return;
			}

			state.delivering = true;
		}

		loop {
			// Popped in its own statement, the state must not stay borrowed while subscribers run
			let maybe_next = guard.borrow_mut().outbox.pop_front();
			let Some(notification) = maybe_next else {
				break;
			};

			match notification {
				Notification::Invites(invites) => self.hub.invites.notify(&invites),
				Notification::ActiveJob(job) => self.hub.active_job.notify(&job),
				Notification::Earnings(earnings) => self.hub.earnings.notify(&earnings),
			}
		}

		guard.borrow_mut().delivering = false;
	}

	fn unsubscribe_invites(self: &Arc<Self>, id: u64) {
		let guard = self.state.lock();

		if self.hub.invites.remove(id) {
			self.reconcile_timers(&mut guard.borrow_mut());
		}
	}
}

/// Weak handle held by scheduled work, so it never keeps an engine alive.
pub(crate) fn upgrade(inner: &Weak<Inner>) -> Option<ProviderEngine> {
	inner.upgrade().map(|inner| ProviderEngine { inner })
}
