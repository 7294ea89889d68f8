use std::{cmp::Reverse, collections::BTreeSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::job::{ActiveJob, JobId};

pub type EntryId = Uuid;

/// What the provider reports when finishing a job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
	pub cash_received: bool,
	pub rating: Option<u8>,
	#[serde(default)]
	pub chips: BTreeSet<String>,
}

impl Completion {
	#[must_use]
	pub fn cash() -> Self {
		Self {
			cash_received: true,
			..Default::default()
		}
	}

	#[must_use]
	pub const fn with_rating(mut self, rating: u8) -> Self {
		self.rating = Some(rating);
		self
	}

	#[must_use]
	pub fn with_chips<I, S>(mut self, chips: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.chips.extend(chips.into_iter().map(Into::into));
		self
	}
}

/// A finished job. Entries are never changed once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarningsEntry {
	pub id: EntryId,
	pub job_id: JobId,
	pub customer_name: String,
	pub price: u32,
	pub rating: Option<u8>,
	pub chips: BTreeSet<String>,
	/// Milliseconds since the Unix epoch.
	pub completed_at: u64,
	pub cash_received: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarningsSummary {
	pub jobs: usize,
	pub cash_jobs: usize,
	pub total: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Ledger {
	entries: Vec<EarningsEntry>,
}

impl Ledger {
	pub fn record(
		&mut self,
		id: EntryId,
		job: ActiveJob,
		completion: Completion,
		completed_at: u64,
	) -> &EarningsEntry {
		let Completion {
			cash_received,
			rating,
			chips,
		} = completion;

		self.entries.push(EarningsEntry {
			id,
			job_id: job.id,
			customer_name: job.customer_name,
			price: job.price,
			rating,
			chips,
			completed_at,
			cash_received,
		});

		&self.entries[self.entries.len() - 1]
	}

	/// Latest completions first; entries completed at the same instant keep the latest recorded
	/// one first.
	pub fn sorted(&self) -> Vec<EarningsEntry> {
		let mut entries = self.entries.iter().rev().cloned().collect::<Vec<_>>();
		entries.sort_by_key(|entry| Reverse(entry.completed_at));
		entries
	}

	pub fn total(&self) -> u64 {
		self.entries
			.iter()
			.filter(|entry| entry.cash_received)
			.map(|entry| u64::from(entry.price))
			.sum()
	}

	pub fn summary(&self) -> EarningsSummary {
		EarningsSummary {
			jobs: self.entries.len(),
			cash_jobs: self
				.entries
				.iter()
				.filter(|entry| entry.cash_received)
				.count(),
			total: self.total(),
		}
	}
}
