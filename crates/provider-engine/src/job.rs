use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{error::Error, invite::Invite};

pub type JobId = Uuid;

/// Where an accepted job stands. Jobs move linearly through
/// `Assigned -> Enroute -> Working -> Complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
	Assigned,
	Enroute,
	Working,
	Complete,
}

impl JobStatus {
	pub const ALL: [Self; 4] = [Self::Assigned, Self::Enroute, Self::Working, Self::Complete];

	#[must_use]
	pub const fn next(self) -> Option<Self> {
		match self {
			Self::Assigned => Some(Self::Enroute),
			Self::Enroute => Some(Self::Working),
			Self::Working => Some(Self::Complete),
			Self::Complete => None,
		}
	}

	#[must_use]
	pub const fn is_terminal(self) -> bool {
		matches!(self, Self::Complete)
	}
}

impl fmt::Display for JobStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Assigned => "assigned",
			Self::Enroute => "enroute",
			Self::Working => "working",
			Self::Complete => "complete",
		})
	}
}

/// How [`ActiveJob::transition`] treats status updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionPolicy {
	/// Any status may be set, including going backwards or skipping steps.
	#[default]
	Permissive,
	/// Only the immediate successor of the current status is accepted.
	Strict,
}

/// The single job a provider is working on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveJob {
	pub id: JobId,
	pub customer_name: String,
	pub exact_address: String,
	pub price: u32,
	pub status: JobStatus,
	/// Milliseconds since the Unix epoch.
	pub started_at: u64,
}

impl ActiveJob {
	pub(crate) fn from_invite(invite: &Invite, exact_address: &str, now_ms: u64) -> Self {
		Self {
			id: invite.job_id,
			customer_name: invite.customer_name.clone(),
			exact_address: exact_address.to_string(),
			price: invite.price,
			status: JobStatus::Assigned,
			started_at: now_ms,
		}
	}

	pub(crate) fn transition(&mut self, to: JobStatus, policy: TransitionPolicy) -> Result<(), Error> {
		if policy == TransitionPolicy::Strict && self.status.next() != Some(to) {
			return Err(Error::InvalidTransition {
				job_id: self.id,
				from: self.status,
				to,
			});
		}

		self.status = to;

		Ok(())
	}
}
