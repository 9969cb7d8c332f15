//! Confidence-Weighted fusion.
//!
//! Each confidence is mapped to one of sixteen variance tiers; a reading's
//! weight is its inverse variance normalised over all readings of the
//! channel:
//!
//! ```text
//! wᵢ = (1 / varᵢ) / Σⱼ (1 / varⱼ)
//! ```
//!
//! Quaternions are brought into the hemisphere of the first reading before
//! the component-wise weighted sum.  The sum is not renormalised.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use embody_scene::Scene;
use embody_types::{Arguments, Quaternion, Vec3};

use crate::fuser::{Blend, Candidate, Fuser, fuse_scene, time_delta};

/// Mean squared error per confidence tier, from tier 0 (confidence 0) to
/// tier 15 (confidence 1).
pub const VARIANCE: [f64; 16] = [
    3333.33, 1644.65, 811.47, 400.37, 197.54, 97.47, 48.09, 23.73, 11.71, 5.78, 2.85, 1.41, 0.69,
    0.34, 0.17, 0.08,
];

/// Variance tier of a confidence.  Out-of-range values clamp to the end
/// tiers.
pub fn variance(confidence: f64) -> f64 {
    let tier = if confidence < 0.0 {
        0
    } else if confidence > 1.0 {
        VARIANCE.len() - 1
    } else {
        (confidence * (VARIANCE.len() - 1) as f64).floor() as usize
    };
    VARIANCE[tier]
}

/// Normalised inverse-variance weights, in candidate order.
fn weights<T>(candidates: &[Candidate<T>]) -> Vec<f64> {
    let inverse: Vec<f64> = candidates.iter().map(|c| 1.0 / variance(c.confidence)).collect();
    let total: f64 = inverse.iter().sum();
    inverse.into_iter().map(|i| i / total).collect()
}

fn mean_confidence<T>(candidates: &[Candidate<T>]) -> f64 {
    candidates.iter().map(|c| c.confidence).sum::<f64>() / candidates.len() as f64
}

/// Inverse-variance weighted mean of all readings.
#[derive(Debug, Clone)]
pub struct ConfidenceWeightedFuser {
    return_to_default: TimeDelta,
}

impl ConfidenceWeightedFuser {
    pub const NAME: &'static str = "confidence_weighted";

    pub fn new(return_to_default: Duration) -> Self {
        Self {
            return_to_default: time_delta(return_to_default),
        }
    }

    /// Construct from configuration.  The fuser takes no arguments.
    pub fn from_args(return_to_default: Duration, args: &Arguments) -> Self {
        args.warn_unknown(Self::NAME, &[]);
        Self::new(return_to_default)
    }
}

impl Blend for ConfidenceWeightedFuser {
    fn blend_positions(&self, candidates: &[Candidate<Vec3>]) -> Option<Candidate<Vec3>> {
        if candidates.is_empty() {
            return None;
        }
        let value = candidates
            .iter()
            .zip(weights(candidates))
            .fold(Vec3::zero(), |acc, (c, w)| acc + c.value.scale(w));
        Some(Candidate {
            value,
            confidence: mean_confidence(candidates),
        })
    }

    fn blend_orientations(
        &self,
        candidates: &[Candidate<Quaternion>],
    ) -> Option<Candidate<Quaternion>> {
        let reference = candidates.first()?.value;
        let value = candidates
            .iter()
            .zip(weights(candidates))
            .fold(Quaternion::new(0.0, 0.0, 0.0, 0.0), |acc, (c, w)| {
                let q = if c.value.dot(reference) < 0.0 {
                    -c.value
                } else {
                    c.value
                };
                acc.sum(q.scale(w))
            });
        Some(Candidate {
            value,
            confidence: mean_confidence(candidates),
        })
    }
}

impl Fuser for ConfidenceWeightedFuser {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn fuse(&mut self, scene: &mut Scene, now: DateTime<Utc>) {
        fuse_scene(&*self, scene, now, self.return_to_default);
    }
}
