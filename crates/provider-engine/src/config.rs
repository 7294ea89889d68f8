use std::ops::{Range, RangeInclusive};

use serde::{Deserialize, Serialize};

use super::error::ConfigError;

pub const DEFAULT_MAX_PENDING_INVITES: usize = 3;
pub const DEFAULT_SWEEP_INTERVAL_MS: u64 = 1_000;

/// Someone that may request a wash. Invites only disclose the approximate address, the exact one
/// is looked up by customer name once an invite is accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
	pub name: String,
	pub approx_address: String,
	pub exact_address: String,
	pub rating: f32,
}

impl Customer {
	fn new(name: &str, approx_address: &str, exact_address: &str, rating: f32) -> Self {
		Self {
			name: name.to_string(),
			approx_address: approx_address.to_string(),
			exact_address: exact_address.to_string(),
			rating,
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSeed {
	pub name: String,
	pub phone: String,
}

/// Simulation parameters for a [`ProviderEngine`](crate::ProviderEngine).
///
/// Every field falls back to its default when missing from a serialized config, so partial JSON
/// files only need to name what they override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
	/// Delay between invite generation attempts, drawn uniformly.
	pub generation_interval_ms: Range<u64>,
	pub invite_ttl_ms: Range<u64>,
	pub price: RangeInclusive<u32>,
	pub eta_minutes: RangeInclusive<u32>,
	/// Outstanding invites above which generation attempts are skipped.
	pub max_pending_invites: usize,
	pub sweep_interval_ms: u64,
	/// Only accept forward, single step status transitions.
	pub strict_transitions: bool,
	/// Seed for the random source, entropy is used when absent.
	pub seed: Option<u64>,
	pub provider: ProviderSeed,
	pub customers: Vec<Customer>,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			generation_interval_ms: 6_000..9_000,
			invite_ttl_ms: 60_000..90_000,
			price: 50..=250,
			eta_minutes: 5..=25,
			max_pending_invites: DEFAULT_MAX_PENDING_INVITES,
			sweep_interval_ms: DEFAULT_SWEEP_INTERVAL_MS,
			strict_transitions: false,
			seed: None,
			provider: ProviderSeed::default(),
			customers: default_customers(),
		}
	}
}

impl EngineConfig {
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.generation_interval_ms.is_empty() {
			return Err(ConfigError::EmptyRange("generation_interval_ms"));
		}

		if self.invite_ttl_ms.is_empty() {
			return Err(ConfigError::EmptyRange("invite_ttl_ms"));
		}

		if self.invite_ttl_ms.start == 0 {
			return Err(ConfigError::Zero("invite_ttl_ms.start"));
		}

		if self.price.is_empty() {
			return Err(ConfigError::EmptyRange("price"));
		}

		if self.eta_minutes.is_empty() {
			return Err(ConfigError::EmptyRange("eta_minutes"));
		}

		if self.max_pending_invites == 0 {
			return Err(ConfigError::Zero("max_pending_invites"));
		}

		if self.sweep_interval_ms == 0 {
			return Err(ConfigError::Zero("sweep_interval_ms"));
		}

		if self.customers.is_empty() {
			return Err(ConfigError::EmptyCustomerPool);
		}

		Ok(())
	}

	/// Exact address for a customer, falling back to the approximate one when the customer isn't
	/// part of the pool.
	#[must_use]
	pub fn exact_address_of<'a>(&'a self, customer_name: &str, approx_address: &'a str) -> &'a str {
		self.customers
			.iter()
			.find(|customer| customer.name == customer_name)
			.map_or(approx_address, |customer| customer.exact_address.as_str())
	}
}

fn default_customers() -> Vec<Customer> {
	vec![
		Customer::new(
			"Alex Johnson",
			"Near Maple Ave & 3rd St",
			"1420 Maple Ave, Apt 3B",
			4.8,
		),
		Customer::new(
			"Sarah Chen",
			"Downtown, close to Union Square",
			"88 Union Square, Garage Level 2",
			4.9,
		),
		Customer::new(
			"Marcus Williams",
			"Riverside Park area",
			"512 Riverside Dr",
			4.6,
		),
		Customer::new(
			"Priya Patel",
			"Oak Hill, by the community center",
			"27 Oak Hill Ct",
			5.0,
		),
		Customer::new(
			"Diego Ramirez",
			"Harbor District, near the marina",
			"300 Harbor Blvd, Lot C",
			4.7,
		),
	]
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_are_valid() {
		assert_eq!(EngineConfig::default().validate(), Ok(()));
	}

	#[test]
	fn rejects_degenerate_parameters() {
		let config = EngineConfig {
			invite_ttl_ms: 0..10,
			..Default::default()
		};
		assert_eq!(
			config.validate(),
			Err(ConfigError::Zero("invite_ttl_ms.start"))
		);

		#[allow(clippy::reversed_empty_ranges)]
		let config = EngineConfig {
			price: 10..=5,
			..Default::default()
		};
		assert_eq!(config.validate(), Err(ConfigError::EmptyRange("price")));

		let config = EngineConfig {
			max_pending_invites: 0,
			..Default::default()
		};
		assert_eq!(
			config.validate(),
			Err(ConfigError::Zero("max_pending_invites"))
		);

		let config = EngineConfig {
			customers: vec![],
			..Default::default()
		};
		assert_eq!(config.validate(), Err(ConfigError::EmptyCustomerPool));
	}

	#[test]
	fn partial_json_keeps_defaults() {
		let config = serde_json::from_str::<EngineConfig>(
			r#"{ "strict_transitions": true, "price": { "start": 10, "end": 20 } }"#,
		)
		.unwrap();

		assert!(config.strict_transitions);
		assert_eq!(config.price, 10..=20);
		assert_eq!(config.generation_interval_ms, 6_000..9_000);
		assert_eq!(config.customers.len(), 5);
	}

	#[test]
	fn exact_address_falls_back_to_approx() {
		let config = EngineConfig::default();

		assert_eq!(
			config.exact_address_of("Sarah Chen", "somewhere"),
			"88 Union Square, Garage Level 2"
		);
		assert_eq!(config.exact_address_of("Nobody", "somewhere"), "somewhere");
	}
}
