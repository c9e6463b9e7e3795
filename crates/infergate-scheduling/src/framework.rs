//! Plugin contracts.
//!
//! A profile is assembled from three kinds of stage plugins:
//!
//! - [`Filter`] narrows the candidate set
//! - [`Scorer`] rates each surviving pod in `[0.0, 1.0]`
//! - [`Picker`] chooses one pod from the weighted totals
//!
//! A [`ProfileHandler`] sits above the profiles and decides which of them
//! run in each round and how their results become one decision.
//!
//! Filters, scorers and handlers are async so that implementations may
//! consult external indexes; the scheduler abandons them on cancellation.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use infergate_core::{LlmRequest, Pod, PodName, TypedName};

use crate::cycle_state::CycleState;
use crate::error::{PluginError, SchedulerResult};
use crate::profile::SchedulerProfile;
use crate::result::{ProfileRunResults, SchedulingResult};

/// Profiles by name. Ordered so that waves run and record deterministically.
pub type ProfileMap = BTreeMap<String, Arc<SchedulerProfile>>;

/// Common identity of every plugin.
pub trait Plugin: Send + Sync {
    fn typed_name(&self) -> &TypedName;
}

#[async_trait]
pub trait Filter: Plugin {
    /// Return the subset of `pods` that may serve `request`.
    async fn filter<'p>(
        &self,
        cycle_state: &CycleState,
        request: &LlmRequest,
        pods: Vec<&'p Pod>,
    ) -> Result<Vec<&'p Pod>, PluginError>;
}

#[async_trait]
pub trait Scorer: Plugin {
    /// Score each pod. Values outside `[0.0, 1.0]` are clamped by the
    /// profile; pods left out of the map score zero.
    async fn score(
        &self,
        cycle_state: &CycleState,
        request: &LlmRequest,
        pods: &[&Pod],
    ) -> Result<BTreeMap<PodName, f64>, PluginError>;
}

/// A pod with its weighted total score.
#[derive(Debug, Clone, Copy)]
pub struct ScoredPod<'p> {
    pub pod: &'p Pod,
    pub score: f64,
}

pub trait Picker: Plugin {
    /// Choose at most one pod. Must break ties deterministically.
    fn pick<'p>(
        &self,
        cycle_state: &CycleState,
        request: &LlmRequest,
        scored_pods: &[ScoredPod<'p>],
    ) -> Result<Option<&'p Pod>, PluginError>;
}

#[async_trait]
pub trait ProfileHandler: Plugin {
    /// Select the next wave of profiles given everything run so far.
    ///
    /// Must be a deterministic function of its inputs. An empty map ends
    /// the round loop.
    async fn pick(
        &self,
        cycle_state: &CycleState,
        request: &LlmRequest,
        profiles: &ProfileMap,
        results: &ProfileRunResults,
    ) -> ProfileMap;

    /// Turn the accumulated profile results into the final decision.
    async fn process_results(
        &self,
        cycle_state: &CycleState,
        request: &LlmRequest,
        results: ProfileRunResults,
    ) -> SchedulerResult<SchedulingResult>;
}
