//! Request scheduler: the profile round loop.
//!
//! Each call owns a fresh [`CycleState`] and results collection. The handler
//! picks a wave of profiles, the wave runs concurrently, results are recorded
//! in profile-name order, and the loop repeats until the handler picks
//! nothing. The handler then turns the collected results into one decision.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, field, info_span, warn};

use infergate_core::{LlmRequest, Pod};
use infergate_metrics::{
    PROCESS_RESULTS_EXTENSION_POINT, PROFILE_PICKER_EXTENSION_POINT, PROFILE_RUN_EXTENSION_POINT,
    SchedulerMetrics,
};

use crate::config::SchedulerConfig;
use crate::cycle_state::CycleState;
use crate::error::{PluginError, SchedulerError, SchedulerResult};
use crate::framework::{Plugin, ProfileHandler, ProfileMap};
use crate::profile::SchedulerProfile;
use crate::result::{ProfileRunResult, ProfileRunResults, SchedulingResult};

/// Plugin type label for per-profile run latency.
const PROFILE_PLUGIN_TYPE: &str = "profile";

/// Routes requests to pods using a configured handler and its profiles.
///
/// Holds only immutable configuration and a shared metrics sink, so one
/// instance can serve any number of concurrent calls behind an `Arc`.
pub struct Scheduler {
    handler: Arc<dyn ProfileHandler>,
    profiles: ProfileMap,
    metrics: Arc<SchedulerMetrics>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self::with_metrics(config, Arc::new(SchedulerMetrics::new()))
    }

    /// Build a scheduler that records into an existing metrics sink.
    pub fn with_metrics(config: SchedulerConfig, metrics: Arc<SchedulerMetrics>) -> Self {
        Self {
            handler: config.handler().clone(),
            profiles: config.profiles().clone(),
            metrics,
        }
    }

    pub fn metrics(&self) -> &Arc<SchedulerMetrics> {
        &self.metrics
    }

    pub fn handler(&self) -> &Arc<dyn ProfileHandler> {
        &self.handler
    }

    pub fn profiles(&self) -> &ProfileMap {
        &self.profiles
    }

    /// Choose a pod for `request` from `candidate_pods`.
    ///
    /// Profile failures are isolated and recorded as `None`; only handler
    /// decisions, an empty first pick and cancellation end the call with an
    /// error.
    pub async fn schedule(
        &self,
        cancel: &CancellationToken,
        request: &LlmRequest,
        candidate_pods: &[Pod],
    ) -> SchedulerResult<SchedulingResult> {
        let span = info_span!(
            "scheduler.schedule",
            request_id = %request.request_id,
            candidate_pods = candidate_pods.len(),
            result = field::Empty,
            target_pod.name = field::Empty,
            target_pod.namespace = field::Empty,
        );

        let start = Instant::now();
        let outcome = self
            .run_cycle(cancel, request, candidate_pods)
            .instrument(span.clone())
            .await;
        self.metrics.record_e2e_latency(start.elapsed()).await;

        if let Some(label) = result_label(&outcome) {
            span.record("result", label);
        }
        match &outcome {
            Ok(result) => {
                if let Some(pod) = &result.target_pod {
                    span.record("target_pod.name", pod.name());
                    span.record("target_pod.namespace", pod.namespace());
                }
                self.metrics.record_outcome(true);
            }
            Err(err) => {
                if err.is_cancellation() {
                    debug!(parent: &span, error = %err, "scheduling abandoned");
                } else {
                    warn!(parent: &span, error = %err, "scheduling failed");
                }
                self.metrics.record_outcome(false);
            }
        }

        outcome
    }

    /// Like [`schedule`](Self::schedule), bounded by `timeout`.
    ///
    /// Expiry cancels the call and is reported as
    /// [`SchedulerError::DeadlineExceeded`].
    pub async fn schedule_with_timeout(
        &self,
        request: &LlmRequest,
        candidate_pods: &[Pod],
        timeout: Duration,
    ) -> SchedulerResult<SchedulingResult> {
        let cancel = CancellationToken::new();
        let timer = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                tokio::time::sleep(timeout).await;
                cancel.cancel();
            }
        });

        let outcome = self.schedule(&cancel, request, candidate_pods).await;
        timer.abort();

        match outcome {
            Err(SchedulerError::Cancelled { request_id }) => {
                Err(SchedulerError::DeadlineExceeded { request_id, timeout })
            }
            other => other,
        }
    }

    async fn run_cycle(
        &self,
        cancel: &CancellationToken,
        request: &LlmRequest,
        candidate_pods: &[Pod],
    ) -> SchedulerResult<SchedulingResult> {
        let cycle_state = CycleState::new();
        let mut results = ProfileRunResults::new();
        let handler_name = self.handler.typed_name();
        let mut round = 0usize;

        loop {
            let start = Instant::now();
            let selected = cancellable(
                cancel,
                request,
                self.handler
                    .pick(&cycle_state, request, &self.profiles, &results),
            )
            .await?;
            self.metrics
                .record_plugin_latency(
                    PROFILE_PICKER_EXTENSION_POINT,
                    &handler_name.plugin_type,
                    &handler_name.name,
                    start.elapsed(),
                )
                .await;

            if selected.is_empty() {
                break;
            }
            round += 1;
            debug!(
                round,
                profiles = ?selected.keys().collect::<Vec<_>>(),
                "running profile wave"
            );

            let wave = join_all(selected.iter().map(|(name, profile)| {
                self.run_profile(name, profile, request, &cycle_state, candidate_pods)
            }));
            let outcomes = cancellable(cancel, request, wave).await?;

            for (name, outcome) in selected.keys().zip(outcomes) {
                if results.insert(name.clone(), outcome).is_some() {
                    debug!(profile = %name, round, "profile re-run replaced earlier result");
                }
            }
        }

        if results.is_empty() {
            return Err(SchedulerError::NoProfilesRun {
                request_id: request.request_id.clone(),
            });
        }

        let start = Instant::now();
        let outcome = cancellable(
            cancel,
            request,
            self.handler.process_results(&cycle_state, request, results),
        )
        .await?;
        self.metrics
            .record_plugin_latency(
                PROCESS_RESULTS_EXTENSION_POINT,
                &handler_name.plugin_type,
                &handler_name.name,
                start.elapsed(),
            )
            .await;

        outcome
    }

    /// Run one profile, turning an error or panic into `None`.
    async fn run_profile(
        &self,
        name: &str,
        profile: &SchedulerProfile,
        request: &LlmRequest,
        cycle_state: &CycleState,
        candidate_pods: &[Pod],
    ) -> Option<ProfileRunResult> {
        let start = Instant::now();
        let outcome = AssertUnwindSafe(profile.run(request, cycle_state, candidate_pods))
            .catch_unwind()
            .await;
        self.metrics
            .record_plugin_latency(
                PROFILE_RUN_EXTENSION_POINT,
                PROFILE_PLUGIN_TYPE,
                name,
                start.elapsed(),
            )
            .await;

        let err = match outcome {
            Ok(Ok(result)) => return Some(result),
            Ok(Err(err)) => err,
            Err(payload) => PluginError::Panicked(panic_message(&*payload)),
        };
        warn!(profile = %name, error = %err, "profile run failed");
        None
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("handler", &self.handler.typed_name().to_string())
            .field("profiles", &self.profiles.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Race `fut` against cancellation, preferring cancellation when both are
/// ready.
async fn cancellable<T>(
    cancel: &CancellationToken,
    request: &LlmRequest,
    fut: impl Future<Output = T>,
) -> SchedulerResult<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(SchedulerError::Cancelled {
            request_id: request.request_id.clone(),
        }),
        out = fut => Ok(out),
    }
}

/// Value of the span's `result` field. A decision without a target pod
/// leaves the field unset.
fn result_label(outcome: &SchedulerResult<SchedulingResult>) -> Option<&'static str> {
    match outcome {
        Ok(result) if result.target_pod.is_some() => Some("scheduled"),
        Ok(_) => None,
        Err(_) => Some("failed"),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
