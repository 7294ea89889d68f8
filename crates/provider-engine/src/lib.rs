//!
//! # Provider Engine
//!
//! Invite and job lifecycle of a car wash provider. While the provider is online and someone
//! watches incoming invites, time limited job offers are generated on a randomized schedule and
//! swept once expired. Accepting one turns it into the single active job, which then walks through
//! its statuses until completion records it into the earnings ledger.
//!
//! Every change is pushed synchronously to the subscribers of the matching channel, in
//! subscription order.
//!
//! ## Basic example
//!
//! ```
//! use cw_provider_engine::{Completion, EngineConfig, JobStatus, ProviderEngine};
//!
//! // Outside of a tokio runtime nothing is scheduled, work is driven by hand
//! let engine = ProviderEngine::new(EngineConfig::default()).unwrap();
//!
//! let _invites = engine.subscribe_invites(|invites| println!("{} pending", invites.len()));
//! engine.set_online(true);
//!
//! let invite = engine.generate_invite().unwrap();
//! let job = engine.accept_invite(invite.id).unwrap();
//! assert_eq!(job.status, JobStatus::Assigned);
//! assert!(engine.invites().is_empty());
//!
//! engine.update_job_status(job.id, JobStatus::Enroute).unwrap();
//! engine.complete_job(job.id, Completion::cash()).unwrap();
//!
//! assert_eq!(engine.total_earnings(), u64::from(invite.price));
//! ```

#![warn(
	clippy::all,
	clippy::pedantic,
	clippy::correctness,
	clippy::perf,
	clippy::style,
	clippy::suspicious,
	clippy::complexity,
	clippy::nursery,
	clippy::unwrap_used,
	unused_qualifications,
	rust_2018_idioms,
	trivial_casts,
	trivial_numeric_casts,
	unused_allocation,
	clippy::unnecessary_cast,
	clippy::cast_lossless,
	clippy::cast_possible_truncation,
	clippy::cast_possible_wrap,
	clippy::cast_precision_loss,
	clippy::cast_sign_loss,
	clippy::dbg_macro,
	clippy::deprecated_cfg_attr,
	clippy::separated_literal_suffix,
	deprecated
)]
#![forbid(deprecated_in_future)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

mod clock;
mod config;
mod engine;
mod error;
mod hub;
mod invite;
mod job;
mod ledger;
mod profile;
mod scheduler;

pub use clock::{Clock, ManualClock, TokioClock};
pub use config::{
	Customer, EngineConfig, ProviderSeed, DEFAULT_MAX_PENDING_INVITES, DEFAULT_SWEEP_INTERVAL_MS,
};
pub use engine::ProviderEngine;
pub use error::{ConfigError, Error};
pub use hub::{Subscription, SubscriptionId};
pub use invite::{remaining_seconds, Invite, InviteId};
pub use job::{ActiveJob, JobId, JobStatus, TransitionPolicy};
pub use ledger::{Completion, EarningsEntry, EarningsSummary, EntryId};
pub use profile::{ProfileUpdate, ProviderId, ProviderProfile};
