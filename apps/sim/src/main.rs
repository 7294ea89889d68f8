use std::{num::NonZeroUsize, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use cw_provider_engine::{ProfileUpdate, ProviderEngine};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod report;
mod shift;

use report::Report;
use shift::ShiftPlan;

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
	Human,
	Json,
}

#[derive(Parser, Debug)]
#[command(name = "cw-sim", about = "Simulates a car wash provider shift")]
struct Cli {
	/// JSON file with engine parameters, missing fields keep their defaults
	#[arg(long, env = "CW_SIM_CONFIG")]
	config: Option<PathBuf>,

	/// Seed for the random source, makes invites reproducible
	#[arg(long)]
	seed: Option<u64>,

	/// Reject skipped or backward job status transitions
	#[arg(long, default_value_t = false)]
	strict: bool,

	/// Jobs to complete before going offline
	#[arg(long, default_value_t = 3)]
	jobs: usize,

	/// Divide every interval and ttl by this factor
	#[arg(long, default_value_t = 10)]
	speed: u64,

	/// Decline every n-th offer
	#[arg(long)]
	decline_every: Option<NonZeroUsize>,

	/// Milliseconds spent on each job status, before speed up
	#[arg(long, default_value_t = 2_000)]
	step_ms: u64,

	/// Provider display name
	#[arg(long)]
	name: Option<String>,

	/// Output format
	#[arg(long, value_enum, default_value = "human")]
	format: OutputFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
		)
		.with_writer(std::io::stderr)
		.init();

	let cli = Cli::parse();

	let mut engine_config = config::load(cli.config.as_deref())?;
	if cli.seed.is_some() {
		engine_config.seed = cli.seed;
	}
	engine_config.strict_transitions |= cli.strict;
	let engine_config = config::scale(engine_config, cli.speed);

	let engine = ProviderEngine::new(engine_config).context("Invalid engine config")?;

	if let Some(name) = cli.name {
		engine.update_profile(ProfileUpdate {
			name: Some(name),
			..Default::default()
		});
	}

	let plan = ShiftPlan {
		jobs: cli.jobs,
		decline_every: cli.decline_every,
		step: Duration::from_millis(cli.step_ms / cli.speed.max(1)),
	};

	info!(?plan, "Starting shift;");

	tokio::select! {
		res = shift::run(&engine, &plan) => {
			let completed = res?;
			info!(completed, "Shift finished;");
		}
		res = tokio::signal::ctrl_c() => {
			res.context("Failed to listen for ctrl-c")?;
			warn!("Interrupted, ending shift early");
			engine.set_online(false);
		}
	}

	let report = Report::collect(&engine);

	match cli.format {
		OutputFormat::Human => report.print_human(),
		OutputFormat::Json => report.print_json()?,
	}

	Ok(())
}
