//! Max-score picker.

use infergate_core::{LlmRequest, Pod, TypedName};

use crate::cycle_state::CycleState;
use crate::error::PluginError;
use crate::framework::{Picker, Plugin, ScoredPod};

/// Picks the highest-scored pod. Ties go to the lowest pod name so that the
/// same inputs always yield the same pod.
pub struct MaxScorePicker {
    typed_name: TypedName,
}

impl MaxScorePicker {
    pub const TYPE: &'static str = "max-score";

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            typed_name: TypedName::new(Self::TYPE, name),
        }
    }
}

impl Plugin for MaxScorePicker {
    fn typed_name(&self) -> &TypedName {
        &self.typed_name
    }
}

impl Picker for MaxScorePicker {
    fn pick<'p>(
        &self,
        _cycle_state: &CycleState,
        _request: &LlmRequest,
        scored_pods: &[ScoredPod<'p>],
    ) -> Result<Option<&'p Pod>, PluginError> {
        let best = scored_pods.iter().max_by(|a, b| {
            a.score
                .total_cmp(&b.score)
                .then_with(|| b.pod.name.cmp(&a.pod.name))
        });
        Ok(best.map(|s| s.pod))
    }
}
