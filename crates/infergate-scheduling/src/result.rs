//! Profile and scheduling outcomes.

use std::collections::BTreeMap;

use serde::{Serialize, Serializer};

use infergate_core::{Pod, PodName};

/// Outcome of one successful profile run.
///
/// `target_pod` is `None` when the profile ran but found nothing eligible.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ProfileRunResult {
    pub target_pod: Option<Pod>,
    /// Weighted total score per surviving pod.
    #[serde(serialize_with = "serialize_scores")]
    pub scores: BTreeMap<PodName, f64>,
}

impl ProfileRunResult {
    /// A run that ended with no eligible pod.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Score of the selected pod, if any.
    pub fn target_score(&self) -> Option<f64> {
        let pod = self.target_pod.as_ref()?;
        self.scores.get(&pod.name).copied()
    }
}

/// Pod names are not strings, so JSON output keys them as `namespace/name`.
fn serialize_scores<S: Serializer>(
    scores: &BTreeMap<PodName, f64>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_map(scores.iter().map(|(pod, score)| (pod.to_string(), score)))
}

/// Results of every profile run so far in one schedule call, keyed by
/// profile name. `None` marks a profile that failed to run.
pub type ProfileRunResults = BTreeMap<String, Option<ProfileRunResult>>;

/// The final routing decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchedulingResult {
    pub target_pod: Option<Pod>,
    /// The profile whose result supplied `target_pod`.
    pub primary_profile: Option<String>,
    pub profile_results: ProfileRunResults,
}

impl SchedulingResult {
    /// Build a result whose target is the selected pod of `primary_profile`.
    pub fn from_primary(primary_profile: &str, profile_results: ProfileRunResults) -> Self {
        let target_pod = profile_results
            .get(primary_profile)
            .and_then(|r| r.as_ref())
            .and_then(|r| r.target_pod.clone());
        Self {
            target_pod,
            primary_profile: Some(primary_profile.to_string()),
            profile_results,
        }
    }
}
