use thiserror::Error;

use super::{
	invite::InviteId,
	job::{JobId, JobStatus},
};

/// Rejections of engine operations. None of these are fatal, the engine state is left untouched
/// whenever one is returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
	#[error("another job is already in progress <id='{0}'>")]
	JobInProgress(JobId),
	#[error("invite not found <id='{0}'>")]
	InviteNotFound(InviteId),
	#[error("invite expired <id='{0}'>")]
	InviteExpired(InviteId),
	#[error("no active job <id='{0}'>")]
	JobNotFound(JobId),
	#[error("invalid status transition for job <id='{job_id}'>: {from} -> {to}")]
	InvalidTransition {
		job_id: JobId,
		from: JobStatus,
		to: JobStatus,
	},
}

impl Error {
	/// Whether this is one of the reasons an invite can't be accepted, which the presentation
	/// layer shows as "invitation no longer available".
	#[must_use]
	pub const fn is_unavailable(&self) -> bool {
		matches!(
			self,
			Self::JobInProgress(_) | Self::InviteNotFound(_) | Self::InviteExpired(_)
		)
	}
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
	#[error("empty range for `{0}`")]
	EmptyRange(&'static str),
	#[error("`{0}` must be greater than zero")]
	Zero(&'static str),
	#[error("customer pool is empty")]
	EmptyCustomerPool,
}
