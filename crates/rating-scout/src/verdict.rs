//! Turn a scan result into a pass/fail/skip outcome.

use crate::scanner::{NotFoundReason, QualificationResult};
use serde::Serialize;

/// Final outcome of a rating check.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Passed { rating: f64, threshold: f64 },
    Failed { message: String },
    /// The environment prevented the check from running at all.
    Skipped { reason: String },
}

impl Outcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, Outcome::Passed { .. })
    }

    /// Process exit code: 0 pass, 1 fail, 77 skip.
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Passed { .. } => 0,
            Outcome::Failed { .. } => 1,
            Outcome::Skipped { .. } => 77,
        }
    }
}

/// Assert that the second qualifying rating exists and meets `threshold`.
///
/// An empty candidate list means the results page offered nothing to check,
/// which is reported as a skip rather than a failure.
pub fn evaluate(result: &QualificationResult, threshold: f64) -> Outcome {
    match result {
        QualificationResult::Found { rating, .. } if rating.meets(threshold) => Outcome::Passed {
            rating: rating.value(),
            threshold,
        },
        QualificationResult::Found { rating, .. } => Outcome::Failed {
            message: format!("second product has rating {rating}, below {threshold}"),
        },
        QualificationResult::NotFound {
            reason: NotFoundReason::NoCandidates,
            ..
        } => Outcome::Skipped {
            reason: "no product links found on the results page".into(),
        },
        QualificationResult::NotFound {
            reason: NotFoundReason::Exhausted,
            qualifying,
            visits,
        } => {
            let seen: Vec<String> = qualifying.iter().map(|r| r.to_string()).collect();
            Outcome::Failed {
                message: format!(
                    "no second product with a visible rating >= {threshold} after visiting {} product page(s); qualifying ratings seen: [{}]",
                    visits.len(),
                    seen.join(", ")
                ),
            }
        }
    }
}
