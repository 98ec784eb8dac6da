//! Batch statistics over search outcomes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::binomial::binomial_standard_error;
use crate::outcome::SearchOutcome;

/// A measured value with its propagated standard error.
///
/// `error` is `None` when there are too few samples to estimate it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    pub value: f64,
    pub error: Option<f64>,
}

impl Estimate {
    /// Scale value and error to a percentage.
    pub fn as_percentage(&self) -> Estimate {
        Estimate {
            value: self.value * 100.0,
            error: self.error.map(|e| e * 100.0),
        }
    }
}

/// Statistics for one batch of outcomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchStatistics {
    /// Number of outcomes in the batch
    pub total: usize,
    /// Outcomes with `found`
    pub found: usize,
    /// Outcomes with `failed`
    pub failed: usize,
    /// Proportion of found outcomes (undefined for an empty batch)
    pub found_rate: Option<Estimate>,
    /// Mean descents from the root among found outcomes
    pub path_length: Option<Estimate>,
    /// Expansion steps across the batch
    pub expansion_steps: usize,
    /// Mean candidates offered per expansion step
    pub branching_factor: Option<Estimate>,
    /// Later occurrences of an already-seen keyword
    pub stability_tests: usize,
    /// Proportion of later occurrences agreeing with the first
    pub stability: Option<Estimate>,
}

/// Compute all statistics for a batch.
pub fn compute_statistics(outcomes: &[SearchOutcome]) -> BatchStatistics {
    let total = outcomes.len();
    let found = outcomes.iter().filter(|o| o.found).count();
    let failed = outcomes.iter().filter(|o| o.failed).count();

    let found_rate = proportion(found, total);

    let path_lengths: Vec<f64> = outcomes
        .iter()
        .filter(|o| o.found)
        .map(|o| o.path_length() as f64)
        .collect();
    let path_length = mean_with_error(&path_lengths);

    let branching: Vec<f64> = outcomes
        .iter()
        .flat_map(|o| o.steps.iter().map(|step| step.len() as f64))
        .collect();
    let branching_factor = mean_with_error(&branching);

    let (stability_tests, stable) = stability_counts(outcomes);
    let stability = proportion(stable, stability_tests);

    BatchStatistics {
        total,
        found,
        failed,
        found_rate,
        path_length,
        expansion_steps: branching.len(),
        branching_factor,
        stability_tests,
        stability,
    }
}

/// `successes / trials` with its exact binomial error.
fn proportion(successes: usize, trials: usize) -> Option<Estimate> {
    if trials == 0 {
        return None;
    }
    Some(Estimate {
        value: successes as f64 / trials as f64,
        error: binomial_standard_error(successes, trials),
    })
}

/// Sample mean and its standard error `sqrt(s² / m)`.
///
/// The mean needs one sample; the error needs two.
fn mean_with_error(values: &[f64]) -> Option<Estimate> {
    if values.is_empty() {
        return None;
    }

    let m = values.len() as f64;
    let mean = values.iter().sum::<f64>() / m;

    let error = if values.len() < 2 {
        None
    } else {
        let squared: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
        let sample_variance = squared / (m - 1.0);
        Some((sample_variance / m).sqrt())
    };

    Some(Estimate { value: mean, error })
}

/// Count repeat occurrences and how many agree with the first-seen `found`.
fn stability_counts(outcomes: &[SearchOutcome]) -> (usize, usize) {
    let mut first_seen: HashMap<&str, bool> = HashMap::new();
    let mut tests = 0;
    let mut stable = 0;

    for outcome in outcomes {
        match first_seen.get(outcome.keyword.as_str()) {
            Some(&first) => {
                tests += 1;
                if first == outcome.found {
                    stable += 1;
                }
            }
            None => {
                first_seen.insert(&outcome.keyword, outcome.found);
            }
        }
    }

    (tests, stable)
}
