//! Scheduling error types.

use std::time::Duration;

use thiserror::Error;

use crate::cycle_state::CycleStateError;

/// Errors that end a schedule call.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("failed to run any scheduler profile for request {request_id}")]
    NoProfilesRun { request_id: String },

    #[error("no eligible pod for request {request_id}")]
    NoEligiblePod { request_id: String },

    #[error("failed to run scheduler profile '{profile}'")]
    ProfileFailed { profile: String },

    #[error("every scheduler profile failed for request {request_id}")]
    AllProfilesFailed { request_id: String },

    #[error("profile handler error: {0}")]
    Handler(String),

    #[error("scheduling cancelled for request {request_id}")]
    Cancelled { request_id: String },

    #[error("scheduling deadline of {timeout:?} exceeded for request {request_id}")]
    DeadlineExceeded { request_id: String, timeout: Duration },
}

impl SchedulerError {
    /// True for the two cancellation kinds.
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            SchedulerError::Cancelled { .. } | SchedulerError::DeadlineExceeded { .. }
        )
    }
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// A filter, scorer or picker failed while running a profile.
///
/// The orchestrator isolates these: the profile is recorded as failed and
/// scheduling continues.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("plugin {plugin} failed: {message}")]
    Failed { plugin: String, message: String },

    #[error("cycle state error: {0}")]
    CycleState(#[from] CycleStateError),

    #[error("profile panicked: {0}")]
    Panicked(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PluginError {
    pub fn failed(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        PluginError::Failed {
            plugin: plugin.into(),
            message: message.into(),
        }
    }
}

/// Errors raised while assembling a scheduler from configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown plugin type: {0}")]
    UnknownPluginType(String),

    #[error("unknown handler type: {0}")]
    UnknownHandlerType(String),

    #[error("duplicate plugin name: {0}")]
    DuplicatePlugin(String),

    #[error("duplicate profile name: {0}")]
    DuplicateProfile(String),

    #[error("profile '{profile}' references unknown plugin '{plugin}'")]
    UnknownPlugin { profile: String, plugin: String },

    #[error("plugin '{plugin}' is not a {expected}")]
    WrongPluginKind {
        plugin: String,
        expected: &'static str,
    },

    #[error("invalid parameters for plugin '{plugin}': {reason}")]
    InvalidParameters { plugin: String, reason: String },

    #[error("invalid weight {weight} for scorer '{plugin}'")]
    InvalidWeight { plugin: String, weight: f64 },

    #[error("handler '{handler}' cannot be used with this profile set: {reason}")]
    HandlerProfileMismatch { handler: String, reason: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;
