use anyhow::Result;
use cw_provider_engine::{EarningsEntry, EarningsSummary, ProviderEngine, ProviderProfile};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Report {
	pub profile: ProviderProfile,
	pub summary: EarningsSummary,
	pub earnings: Vec<EarningsEntry>,
}

impl Report {
	pub fn collect(engine: &ProviderEngine) -> Self {
		Self {
			profile: engine.profile(),
			summary: engine.earnings_summary(),
			earnings: engine.earnings(),
		}
	}

	pub fn print_human(&self) {
		let name: &str = if self.profile.name.is_empty() {
			"Provider"
		} else {
			&self.profile.name
		};

		println!(
			"{name}: {} jobs, {} paid in cash, total {}",
			self.summary.jobs, self.summary.cash_jobs, self.summary.total
		);

		for entry in &self.earnings {
			println!(
				"- {} {:<20} {:>5} {}",
				entry.completed_at,
				entry.customer_name,
				entry.price,
				if entry.cash_received { "cash" } else { "unpaid" }
			);
		}
	}

	pub fn print_json(&self) -> Result<()> {
		println!("{}", serde_json::to_string_pretty(self)?);
		Ok(())
	}
}
