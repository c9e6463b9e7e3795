//! infergate-scheduling: multi-profile request scheduling.
//!
//! A [`Scheduler`] routes one inference request to one pod. It owns a
//! [`ProfileHandler`] and a set of named [`SchedulerProfile`]s. Each profile
//! is a filter, score and pick pipeline built from plugins.
//!
//! # Architecture
//!
//! ```text
//! Scheduler::schedule(cancel, request, pods)
//!   loop
//!     handler.pick()            → wave of profiles (empty ends the loop)
//!     profile.run() × wave      → concurrent; errors and panics become None
//!   handler.process_results()   → SchedulingResult
//! ```
//!
//! Configuration files are turned into live plugins through a
//! [`PluginRegistry`]; see [`SchedulerConfig::from_file_config`].

pub mod config;
pub mod cycle_state;
pub mod error;
pub mod framework;
pub mod handlers;
pub mod plugins;
pub mod profile;
pub mod registry;
pub mod result;
pub mod scheduler;

pub use config::SchedulerConfig;
pub use cycle_state::{CycleState, CycleStateError};
pub use error::{ConfigError, ConfigResult, PluginError, SchedulerError, SchedulerResult};
pub use framework::{Filter, Picker, Plugin, ProfileHandler, ProfileMap, ScoredPod, Scorer};
pub use handlers::{FallbackProfileHandler, HighestScoreHandler, SingleProfileHandler};
pub use profile::{SchedulerProfile, WeightedScorer};
pub use registry::{PluginInstance, PluginRegistry};
pub use result::{ProfileRunResult, ProfileRunResults, SchedulingResult};
pub use scheduler::Scheduler;
