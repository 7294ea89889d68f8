use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{config::EngineConfig, job::JobId};

pub type InviteId = Uuid;

/// A time limited job offer. The customer's exact address is only disclosed once accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invite {
	pub id: InviteId,
	/// The job that will be created if this invite gets accepted.
	pub job_id: JobId,
	pub customer_name: String,
	pub approx_address: String,
	pub eta_minutes: u32,
	pub price: u32,
	pub rating: f32,
	pub ttl_ms: u64,
	/// Milliseconds since the Unix epoch.
	pub created_at: u64,
}

impl Invite {
	/// Synthesizes a new invite created at `now_ms`, or `None` if the customer pool is empty.
	pub(crate) fn generate(config: &EngineConfig, rng: &mut impl Rng, now_ms: u64) -> Option<Self> {
		let customer = config.customers.choose(rng)?;

		let ttl_ms = rng.gen_range(config.invite_ttl_ms.clone());
		debug_assert!(ttl_ms > 0, "invites must be created with a positive ttl");

		Some(Self {
			id: random_id(rng),
			job_id: random_id(rng),
			customer_name: customer.name.clone(),
			approx_address: customer.approx_address.clone(),
			eta_minutes: rng.gen_range(config.eta_minutes.clone()),
			price: rng.gen_range(config.price.clone()),
			rating: customer.rating,
			ttl_ms,
			created_at: now_ms,
		})
	}

	/// Time left before this invite expires, floored at zero.
	#[must_use]
	pub const fn remaining_ms(&self, now_ms: u64) -> u64 {
		self.ttl_ms
			.saturating_sub(now_ms.saturating_sub(self.created_at))
	}

	#[must_use]
	pub const fn is_expired(&self, now_ms: u64) -> bool {
		self.remaining_ms(now_ms) == 0
	}
}

/// Whole seconds left on an invite's countdown.
///
/// Rounded up, so the countdown only shows zero once the invite can no longer be accepted.
#[must_use]
pub const fn remaining_seconds(invite: &Invite, now_ms: u64) -> u64 {
	invite.remaining_ms(now_ms).div_ceil(1_000)
}

pub(crate) fn random_id(rng: &mut impl Rng) -> Uuid {
	uuid::Builder::from_random_bytes(rng.gen()).into_uuid()
}
