//! Simulation config loading

use std::{ops::Range, path::Path};

use anyhow::{Context, Result};
use cw_provider_engine::EngineConfig;
use tracing::debug;

/// Loads the engine config from a JSON file, missing fields keep their defaults.
pub fn load(path: Option<&Path>) -> Result<EngineConfig> {
	let Some(path) = path else {
		debug!("No config file given, using defaults");
		return Ok(EngineConfig::default());
	};

	let json = std::fs::read_to_string(path)
		.with_context(|| format!("Failed to read config file '{}'", path.display()))?;

	let config = serde_json::from_str::<EngineConfig>(&json)
		.with_context(|| format!("Failed to parse config file '{}'", path.display()))?;

	debug!(path = %path.display(), "Loaded config file;");

	Ok(config)
}

/// Speeds the simulation up by dividing every time parameter by `factor`.
pub fn scale(mut config: EngineConfig, factor: u64) -> EngineConfig {
	if factor <= 1 {
		return config;
	}

	config.generation_interval_ms = scale_range(&config.generation_interval_ms, factor);
	config.invite_ttl_ms = scale_range(&config.invite_ttl_ms, factor);
	config.sweep_interval_ms = (config.sweep_interval_ms / factor).max(1);

	config
}

fn scale_range(range: &Range<u64>, factor: u64) -> Range<u64> {
	let start = (range.start / factor).max(1);
	let end = (range.end / factor).max(start + 1);

	start..end
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn scaling_keeps_ranges_usable() {
		let config = scale(EngineConfig::default(), 10);

		assert_eq!(config.generation_interval_ms, 600..900);
		assert_eq!(config.invite_ttl_ms, 6_000..9_000);
		assert_eq!(config.sweep_interval_ms, 100);
		assert_eq!(config.validate(), Ok(()));

		let config = scale(EngineConfig::default(), 1_000_000);
		assert_eq!(config.generation_interval_ms, 1..2);
		assert_eq!(config.sweep_interval_ms, 1);
		assert_eq!(config.validate(), Ok(()));
	}

	#[test]
	fn no_file_means_defaults() {
		assert_eq!(load(None).unwrap(), EngineConfig::default());
	}
}
