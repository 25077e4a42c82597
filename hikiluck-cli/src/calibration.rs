//! Monte-Carlo calibration of the hit-frequency estimator.
//!
//! Sessions are simulated at the baseline probability, so a well-calibrated
//! estimator should report rarity above 95 for roughly 5% of them (two-sided
//! tails at |z| > 1.96).

use hikiluck_core::evaluate_hit_luck;
use num_traits::cast::cast;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PROBABILITY: f64 = 1.0 / 250.0;
pub const NOMINAL_EXCEED_RATE: f64 = 0.05;
const RARITY_THRESHOLD: f64 = 95.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationPlan {
    pub probability: f64,
    pub spins: u32,
    pub iterations: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    pub seed: u64,
    pub iterations: usize,
    pub spins: u32,
    pub probability: f64,
    pub exceed_95_rate: f64,
    pub mean_z: f64,
    pub std_z: f64,
}

impl CalibrationRecord {
    /// Distance from the nominal 5% exceedance rate.
    #[must_use]
    pub fn exceed_error(&self) -> f64 {
        self.exceed_95_rate - NOMINAL_EXCEED_RATE
    }
}

/// Run `plan.iterations` simulated sessions for one seed.
#[must_use]
pub fn calibrate_seed(plan: &CalibrationPlan, seed: u64) -> CalibrationRecord {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let spin_count = f64::from(plan.spins);
    let mut exceeded = 0_usize;
    let mut zs = Vec::with_capacity(plan.iterations);

    for _ in 0..plan.iterations {
        let mut hits = 0_u32;
        for _ in 0..plan.spins {
            if rng.gen_bool(plan.probability) {
                hits += 1;
            }
        }
        let result = evaluate_hit_luck(plan.probability, spin_count, f64::from(hits));
        if result.rarity_percent > RARITY_THRESHOLD {
            exceeded += 1;
        }
        if let Some(z) = result.z_score {
            zs.push(z);
        }
    }

    let (mean_z, std_z) = mean_and_std(&zs);
    let record = CalibrationRecord {
        seed,
        iterations: plan.iterations,
        spins: plan.spins,
        probability: plan.probability,
        exceed_95_rate: fraction(exceeded, plan.iterations),
        mean_z,
        std_z,
    };
    log::debug!(
        "calibration seed {seed}: exceed {:.3} mean z {:.3} std z {:.3}",
        record.exceed_95_rate,
        record.mean_z,
        record.std_z
    );
    record
}

pub fn run_calibration(plan: &CalibrationPlan, seeds: &[u64]) -> Vec<CalibrationRecord> {
    seeds
        .iter()
        .map(|&seed| calibrate_seed(plan, seed))
        .collect()
}

fn fraction(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let count: f64 = cast(count).unwrap_or(0.0);
    let total: f64 = cast(total).unwrap_or(1.0);
    count / total
}

fn mean_and_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n: f64 = cast(values.len()).unwrap_or(1.0);
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(iterations: usize) -> CalibrationPlan {
        CalibrationPlan {
            probability: 0.01,
            spins: 2_000,
            iterations,
        }
    }

    #[test]
    fn same_seed_reproduces_record() {
        let first = calibrate_seed(&plan(50), 7);
        let second = calibrate_seed(&plan(50), 7);
        assert_eq!(first, second);
    }

    #[test]
    fn exceedance_rate_is_near_nominal() {
        let record = calibrate_seed(&plan(2_000), 1337);
        // Discreteness makes the estimator somewhat conservative; allow slack.
        assert!(
            record.exceed_95_rate < 0.12,
            "exceed {}",
            record.exceed_95_rate
        );
        assert!(record.mean_z.abs() < 0.2, "mean z {}", record.mean_z);
        assert!((record.std_z - 1.0).abs() < 0.15, "std z {}", record.std_z);
    }

    #[test]
    fn zero_iterations_yield_zeroes() {
        let record = calibrate_seed(&plan(0), 1);
        assert_eq!(record.exceed_95_rate, 0.0);
        assert_eq!(record.mean_z, 0.0);
        assert_eq!(record.std_z, 0.0);
        assert!((record.exceed_error() + NOMINAL_EXCEED_RATE).abs() < f64::EPSILON);
    }

    #[test]
    fn run_calibration_covers_each_seed() {
        let records = run_calibration(&plan(5), &[1, 2, 3]);
        let seeds: Vec<u64> = records.iter().map(|r| r.seed).collect();
        assert_eq!(seeds, [1, 2, 3]);
    }
}
