//! Built-in profile handlers.
//!
//! - [`SingleProfileHandler`] runs the one configured profile once
//! - [`FallbackProfileHandler`] walks an ordered list of profiles until one
//!   finds a pod
//! - [`HighestScoreHandler`] runs every profile in one wave and keeps the
//!   best-scored target across them

use async_trait::async_trait;
use tracing::debug;

use infergate_core::{LlmRequest, TypedName};

use crate::cycle_state::CycleState;
use crate::error::{SchedulerError, SchedulerResult};
use crate::framework::{Plugin, ProfileHandler, ProfileMap};
use crate::result::{ProfileRunResults, SchedulingResult};

/// Handler for configurations with exactly one profile.
pub struct SingleProfileHandler {
    typed_name: TypedName,
}

impl SingleProfileHandler {
    pub const TYPE: &'static str = "single";

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            typed_name: TypedName::new(Self::TYPE, name),
        }
    }
}

impl Plugin for SingleProfileHandler {
    fn typed_name(&self) -> &TypedName {
        &self.typed_name
    }
}

#[async_trait]
impl ProfileHandler for SingleProfileHandler {
    async fn pick(
        &self,
        _cycle_state: &CycleState,
        _request: &LlmRequest,
        profiles: &ProfileMap,
        results: &ProfileRunResults,
    ) -> ProfileMap {
        // The profile runs in the first round; anything recorded means done.
        if !results.is_empty() {
            return ProfileMap::new();
        }
        profiles.clone()
    }

    async fn process_results(
        &self,
        _cycle_state: &CycleState,
        request: &LlmRequest,
        results: ProfileRunResults,
    ) -> SchedulerResult<SchedulingResult> {
        if results.len() != 1 {
            return Err(SchedulerError::Handler(format!(
                "single profile handler expects exactly one profile result, got {}",
                results.len()
            )));
        }

        let (name, result) = results
            .iter()
            .next()
            .map(|(name, result)| (name.clone(), result.clone()))
            .ok_or_else(|| SchedulerError::Handler("no profile results".to_string()))?;

        match result {
            None => Err(SchedulerError::ProfileFailed { profile: name }),
            Some(r) if r.target_pod.is_none() => Err(SchedulerError::NoEligiblePod {
                request_id: request.request_id.clone(),
            }),
            Some(_) => Ok(SchedulingResult::from_primary(&name, results)),
        }
    }
}

/// Runs profiles one at a time in a fixed order until one selects a pod.
///
/// A profile that failed or found nothing moves the handler on to the next
/// name. The decision comes from the first profile in order that selected a
/// pod.
pub struct FallbackProfileHandler {
    typed_name: TypedName,
    order: Vec<String>,
}

impl FallbackProfileHandler {
    pub const TYPE: &'static str = "fallback";

    pub fn new(name: impl Into<String>, order: Vec<String>) -> Self {
        Self {
            typed_name: TypedName::new(Self::TYPE, name),
            order,
        }
    }

    pub fn order(&self) -> &[String] {
        &self.order
    }
}

impl Plugin for FallbackProfileHandler {
    fn typed_name(&self) -> &TypedName {
        &self.typed_name
    }
}

#[async_trait]
impl ProfileHandler for FallbackProfileHandler {
    async fn pick(
        &self,
        _cycle_state: &CycleState,
        _request: &LlmRequest,
        profiles: &ProfileMap,
        results: &ProfileRunResults,
    ) -> ProfileMap {
        for name in &self.order {
            match results.get(name) {
                Some(Some(result)) if result.target_pod.is_some() => break,
                Some(_) => continue,
                None => {
                    let Some(profile) = profiles.get(name) else {
                        debug!(profile = %name, "fallback profile not configured, skipping");
                        continue;
                    };
                    let mut next = ProfileMap::new();
                    next.insert(name.clone(), profile.clone());
                    return next;
                }
            }
        }
        ProfileMap::new()
    }

    async fn process_results(
        &self,
        _cycle_state: &CycleState,
        request: &LlmRequest,
        results: ProfileRunResults,
    ) -> SchedulerResult<SchedulingResult> {
        let primary = self.order.iter().find(|name| {
            results
                .get(*name)
                .and_then(|r| r.as_ref())
                .is_some_and(|r| r.target_pod.is_some())
        });

        match primary {
            Some(name) => Ok(SchedulingResult::from_primary(name, results)),
            None if results.values().all(Option::is_none) => Err(SchedulerError::AllProfilesFailed {
                request_id: request.request_id.clone(),
            }),
            None => Err(SchedulerError::NoEligiblePod {
                request_id: request.request_id.clone(),
            }),
        }
    }
}

/// Runs every profile in one wave and keeps the target with the highest
/// score. Ties go to the lowest profile name.
pub struct HighestScoreHandler {
    typed_name: TypedName,
}

impl HighestScoreHandler {
    pub const TYPE: &'static str = "highest-score";

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            typed_name: TypedName::new(Self::TYPE, name),
        }
    }
}

impl Plugin for HighestScoreHandler {
    fn typed_name(&self) -> &TypedName {
        &self.typed_name
    }
}

#[async_trait]
impl ProfileHandler for HighestScoreHandler {
    async fn pick(
        &self,
        _cycle_state: &CycleState,
        _request: &LlmRequest,
        profiles: &ProfileMap,
        results: &ProfileRunResults,
    ) -> ProfileMap {
        if !results.is_empty() {
            return ProfileMap::new();
        }
        profiles.clone()
    }

    async fn process_results(
        &self,
        _cycle_state: &CycleState,
        request: &LlmRequest,
        results: ProfileRunResults,
    ) -> SchedulerResult<SchedulingResult> {
        let mut best: Option<(&String, f64)> = None;
        for (name, result) in &results {
            let Some(score) = result.as_ref().and_then(|r| r.target_score()) else {
                continue;
            };
            // Strictly greater keeps the first (lowest) name on ties.
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((name, score));
            }
        }

        match best {
            Some((name, _)) => {
                let name = name.clone();
                Ok(SchedulingResult::from_primary(&name, results))
            }
            None if results.values().all(Option::is_none) => Err(SchedulerError::AllProfilesFailed {
                request_id: request.request_id.clone(),
            }),
            None => Err(SchedulerError::NoEligiblePod {
                request_id: request.request_id.clone(),
            }),
        }
    }
}
