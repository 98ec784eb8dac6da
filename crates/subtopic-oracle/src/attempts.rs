//! Seed schedule for retried oracle calls.

use rand::Rng;
use subtopic_types::SearchConfig;

/// Upper bound (exclusive) for randomly drawn seeds.
const RANDOM_SEED_RANGE: u64 = 1_000_000;

/// How many attempts an oracle operation gets and which seed each one uses.
///
/// Every attempt of one operation uses a distinct seed so a retry is not a
/// replay of the answer that just failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptPolicy {
    max_attempts: u32,
    base_seed: u64,
    random_seeds: bool,
}

impl AttemptPolicy {
    /// Sequential seeds `base_seed, base_seed + 1, ...`.
    pub fn sequential(max_attempts: u32, base_seed: u64) -> Self {
        Self {
            max_attempts,
            base_seed,
            random_seeds: false,
        }
    }

    /// Independently drawn seeds.
    pub fn random(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_seed: 0,
            random_seeds: true,
        }
    }

    /// Build from the search configuration.
    pub fn from_config(config: &SearchConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_seed: config.base_seed,
            random_seeds: config.random_seeds,
        }
    }

    /// Attempt budget.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Seeds for one operation, one per attempt.
    ///
    /// Random seeds are drawn up front so no RNG handle is held across
    /// `.await` points in the retry loops.
    pub fn seeds(&self) -> std::vec::IntoIter<u64> {
        let seeds: Vec<u64> = if self.random_seeds {
            let mut rng = rand::rng();
            (0..self.max_attempts)
                .map(|_| rng.random_range(0..RANDOM_SEED_RANGE))
                .collect()
        } else {
            (0..self.max_attempts)
                .map(|i| self.base_seed.wrapping_add(u64::from(i)))
                .collect()
        };
        seeds.into_iter()
    }
}

impl Default for AttemptPolicy {
    fn default() -> Self {
        Self::from_config(&SearchConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_seeds() {
        let policy = AttemptPolicy::sequential(3, 40);
        assert_eq!(policy.seeds().collect::<Vec<_>>(), vec![40, 41, 42]);
    }

    #[test]
    fn test_random_seeds_count_and_range() {
        let policy = AttemptPolicy::random(10);
        let seeds: Vec<_> = policy.seeds().collect();
        assert_eq!(seeds.len(), 10);
        assert!(seeds.iter().all(|s| *s < RANDOM_SEED_RANGE));
    }

    #[test]
    fn test_default_budget() {
        let policy = AttemptPolicy::default();
        assert_eq!(policy.max_attempts(), 10);
        assert_eq!(policy.seeds().next(), Some(0));
    }

    #[test]
    fn test_wrapping_base_seed() {
        let policy = AttemptPolicy::sequential(2, u64::MAX);
        assert_eq!(policy.seeds().collect::<Vec<_>>(), vec![u64::MAX, 0]);
    }
}
