//! Exact binomial error of an observed proportion.

/// Standard error of the proportion `successes / trials`, computed as
///
/// `sqrt(Σ_{k=1..n} (k - s)² · C(n,k) · p^k · (1-p)^(n-k)) / n` with `p = s / n`.
///
/// The sum runs over the full binomial distribution rather than using the
/// normal approximation. Terms are evaluated in log space so large batches
/// neither overflow `C(n,k)` nor underflow `p^k`.
///
/// Returns `None` when there are no trials.
pub fn binomial_standard_error(successes: usize, trials: usize) -> Option<f64> {
    if trials == 0 {
        return None;
    }

    let n = trials as f64;
    let s = successes as f64;
    let p = s / n;
    let ln_p = p.ln();
    let ln_q = (1.0 - p).ln();

    let mut ln_choose = 0.0_f64;
    let mut variance = 0.0_f64;

    for k in 1..=trials {
        // ln C(n,k) = ln C(n,k-1) + ln((n-k+1)/k)
        ln_choose += ((trials - k + 1) as f64).ln() - (k as f64).ln();

        let ln_mass = ln_choose + x_ln_y(k, ln_p) + x_ln_y(trials - k, ln_q);
        let deviation = k as f64 - s;
        variance += deviation * deviation * ln_mass.exp();
    }

    Some(variance.sqrt() / n)
}

/// `x · ln(y)` with the convention `0 · ln(0) = 0`.
fn x_ln_y(x: usize, ln_y: f64) -> f64 {
    if x == 0 {
        0.0
    } else {
        x as f64 * ln_y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_no_trials_is_undefined() {
        assert_eq!(binomial_standard_error(0, 0), None);
    }

    #[test]
    fn test_zero_successes_has_zero_error() {
        assert_eq!(binomial_standard_error(0, 25), Some(0.0));
    }

    #[test]
    fn test_all_successes_has_zero_error() {
        let error = binomial_standard_error(12, 12).unwrap();
        assert!(approx(error, 0.0));
    }

    #[test]
    fn test_small_exact_values() {
        // n=2, s=1: only k=2 contributes (2-1)^2 * 1/4
        assert!(approx(binomial_standard_error(1, 2).unwrap(), 0.25));

        // n=4, s=2: (1 * 4 + 0 * 6 + 1 * 4 + 4 * 1) / 16 = 0.75
        assert!(approx(
            binomial_standard_error(2, 4).unwrap(),
            0.75_f64.sqrt() / 4.0
        ));
    }

    #[test]
    fn test_large_batch_is_finite() {
        let error = binomial_standard_error(700, 2000).unwrap();
        assert!(error.is_finite());
        // Close to the normal approximation sqrt(p(1-p)/n) for large n
        let normal = (0.35_f64 * 0.65 / 2000.0).sqrt();
        assert!((error - normal).abs() < 1e-3);
    }
}
