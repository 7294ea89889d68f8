use std::{collections::HashSet, num::NonZeroUsize, time::Duration};

use anyhow::{Context, Result};
use async_channel as chan;
use cw_provider_engine::{Completion, Invite, InviteId, JobStatus, ProviderEngine};
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// How the simulated provider behaves during a shift.
#[derive(Debug, Clone)]
pub struct ShiftPlan {
	/// Jobs to complete before going offline.
	pub jobs: usize,
	/// Decline every n-th offer instead of accepting it.
	pub decline_every: Option<NonZeroUsize>,
	/// Time spent on each job status.
	pub step: Duration,
}

/// Goes online and works jobs until the plan is fulfilled, returning how many were completed.
pub async fn run(engine: &ProviderEngine, plan: &ShiftPlan) -> Result<usize> {
	let (invites_tx, invites_rx) = chan::unbounded::<Vec<Invite>>();

	let _invites = engine.subscribe_invites(move |invites| {
		if !invites.is_empty() && invites_tx.try_send(invites.to_vec()).is_err() {
			warn!("Shift is over, dropping invite update");
		}
	});

	let _jobs = engine.subscribe_active_job(|job| match job {
		Some(job) => info!(job_id = %job.id, status = %job.status, "Active job update;"),
		None => debug!("Job slot is free"),
	});

	let _earnings = engine.subscribe_earnings(|entries| {
		debug!(jobs = entries.len(), "Earnings updated;");
	});

	engine.set_online(true);

	let mut completed = 0;
	let mut offers = 0;
	let mut considered = HashSet::<InviteId>::new();

	while completed < plan.jobs {
		let invites = invites_rx
			.recv()
			.await
			.context("Invite updates stopped unexpectedly")?;

		let now = engine.now_ms();
		let mut maybe_accepted = None;

		for invite in invites {
			if invite.is_expired(now) || !considered.insert(invite.id) {
				continue;
			}

			offers += 1;

			if plan.decline_every.is_some_and(|n| offers % n.get() == 0) {
				info!(invite_id = %invite.id, price = invite.price, "Declining offer;");
				engine.decline_invite(invite.id);
				continue;
			}

			match engine.accept_invite(invite.id) {
				Ok(job) => {
					maybe_accepted = Some(job);
					break;
				}
				Err(e) if e.is_unavailable() => {
					warn!(%e, "Offer no longer available;");
				}
				Err(e) => return Err(e.into()),
			}
		}

		let Some(job) = maybe_accepted else {
			continue;
		};

		for status in [JobStatus::Enroute, JobStatus::Working, JobStatus::Complete] {
			sleep(plan.step).await;
			engine.update_job_status(job.id, status)?;
		}

		let entry = engine.complete_job(
			job.id,
			Completion::cash()
				.with_rating(5)
				.with_chips(["on time"]),
		)?;

		completed += 1;
		info!(
			completed,
			price = entry.price,
			total = engine.total_earnings(),
			"Job done;"
		);

		// updates queued while working only mention revoked invites
		while invites_rx.try_recv().is_ok() {}
	}

	engine.set_online(false);

	Ok(completed)
}
