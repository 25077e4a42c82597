//! Luck metric estimators.
//!
//! Three independent, side-effect-free estimators turn an observation and a
//! baseline into a z-score and a 0–100 rarity percentile:
//!
//! - payout luck: observed payout ratio against the machine's payout rate,
//! - hit luck: first-hit count against the binomial expectation,
//! - hit value luck: mean coins per hit against the baseline mean.
//!
//! Insufficient input never errors; it yields [`LuckResult::neutral`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{
    CDF_B1, CDF_B2, CDF_B3, CDF_B4, CDF_B5, CDF_C, CDF_P, DEFAULT_BET_PER_SPIN, EV_SPIN_WINDOW,
    EXACT_EQUAL_EPSILON, PAYOUT_FLAT_EPSILON_PP, RARITY_MAX, SIGMA_FLOOR,
};
use crate::numbers::{finite, floor_count, positive};

/// Qualitative sign of a deviation from baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    #[default]
    Flat,
}

impl Direction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Flat => "flat",
        }
    }

    /// Classify `delta`, treating anything within `epsilon` of zero as flat.
    #[must_use]
    pub fn classify(delta: f64, epsilon: f64) -> Self {
        if delta.abs() < epsilon {
            Self::Flat
        } else if delta > 0.0 {
            Self::Up
        } else {
            Self::Down
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single estimator evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LuckResult {
    pub direction: Direction,
    /// Two-sided rarity in `[0, 100]`; 0 is utterly typical.
    pub rarity_percent: f64,
    pub delta_from_baseline: f64,
    /// Coin deviation per 1000 spins (payout luck only, 0 otherwise).
    pub ev_per_1000_spins: f64,
    pub sigma_used: f64,
    pub observed_value: Option<f64>,
    pub z_score: Option<f64>,
}

impl LuckResult {
    /// The "not enough data" result: flat, zero rarity, nothing observed.
    #[must_use]
    pub const fn neutral(sigma_used: f64) -> Self {
        Self {
            direction: Direction::Flat,
            rarity_percent: 0.0,
            delta_from_baseline: 0.0,
            ev_per_1000_spins: 0.0,
            sigma_used,
            observed_value: None,
            z_score: None,
        }
    }

    #[must_use]
    pub const fn is_neutral(&self) -> bool {
        self.observed_value.is_none() && self.z_score.is_none()
    }
}

/// Standard normal CDF via the Abramowitz–Stegun 26.2.17 polynomial.
#[must_use]
pub fn normal_cdf(z: f64) -> f64 {
    let a = z.abs();
    let t = 1.0 / (1.0 + a * CDF_P);
    let density = CDF_C * (-z * (z / 2.0)).exp();
    let poly = ((((CDF_B5 * t + CDF_B4) * t + CDF_B3) * t + CDF_B2) * t + CDF_B1) * t;
    let upper = 1.0 - density * poly;
    if z < 0.0 { 1.0 - upper } else { upper }
}

/// Map a z-score to a two-sided rarity percentile in `[0, 100]`.
#[must_use]
pub fn rarity_percent(z: f64) -> f64 {
    let tail = 1.0 - normal_cdf(z.abs());
    let two_sided = 2.0 * tail;
    ((1.0 - two_sided) * RARITY_MAX).clamp(0.0, RARITY_MAX)
}

/// Arguments for [`evaluate_payout_luck`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PayoutLuckArgs {
    /// Baseline payout as a ratio (1.10 = 110%).
    pub baseline_ratio: f64,
    pub spin_count: Option<f64>,
    /// Coins wagered per spin; `None` means 3.
    pub bet_per_spin: Option<f64>,
    pub coin_delta: Option<f64>,
    pub coin_in: Option<f64>,
    pub coin_out: Option<f64>,
    pub sigma_per_spin: f64,
}

impl PayoutLuckArgs {
    #[must_use]
    pub const fn new(baseline_ratio: f64, sigma_per_spin: f64) -> Self {
        Self {
            baseline_ratio,
            spin_count: None,
            bet_per_spin: None,
            coin_delta: None,
            coin_in: None,
            coin_out: None,
            sigma_per_spin,
        }
    }

    #[must_use]
    pub const fn with_spins(mut self, spin_count: f64, coin_delta: f64) -> Self {
        self.spin_count = Some(spin_count);
        self.coin_delta = Some(coin_delta);
        self
    }

    #[must_use]
    pub const fn with_coin_flow(mut self, coin_in: f64, coin_out: f64) -> Self {
        self.coin_in = Some(coin_in);
        self.coin_out = Some(coin_out);
        self
    }
}

/// Observed payout ratio and coin deviation from the first usable input pair.
struct PayoutObservation {
    ratio: f64,
    deviation_coins: f64,
}

fn observe_payout(args: &PayoutLuckArgs) -> Option<PayoutObservation> {
    let bet = args.bet_per_spin.unwrap_or(DEFAULT_BET_PER_SPIN);
    if let (Some(coin_in), Some(coin_out)) = (positive(args.coin_in), positive(args.coin_out)) {
        let expected_out = coin_in * args.baseline_ratio;
        return Some(PayoutObservation {
            ratio: coin_out / coin_in,
            deviation_coins: coin_out - expected_out,
        });
    }
    let spins = positive(args.spin_count)?;
    let delta = finite(args.coin_delta)?;
    let coins_in = positive(Some(bet * spins))?;
    let expected_delta = coins_in * (args.baseline_ratio - 1.0);
    Some(PayoutObservation {
        ratio: (coins_in + delta) / coins_in,
        deviation_coins: delta - expected_delta,
    })
}

/// Overall payout luck: how unusual the session's payout ratio is.
#[must_use]
pub fn evaluate_payout_luck(args: &PayoutLuckArgs) -> LuckResult {
    if positive(Some(args.baseline_ratio)).is_none() {
        return LuckResult::neutral(args.sigma_per_spin);
    }
    let Some(observed) = observe_payout(args).filter(|o| o.ratio.is_finite()) else {
        return LuckResult::neutral(args.sigma_per_spin);
    };

    let delta_pp = (observed.ratio - args.baseline_ratio) * 100.0;
    let spins = positive(args.spin_count);
    let z_score = match (spins, positive(Some(args.sigma_per_spin))) {
        (Some(n), Some(sigma)) => Some(observed.deviation_coins / (sigma * n.sqrt())),
        _ => None,
    };
    let ev_per_1000_spins = spins.map_or(0.0, |n| observed.deviation_coins / (n / EV_SPIN_WINDOW));

    LuckResult {
        direction: Direction::classify(delta_pp, PAYOUT_FLAT_EPSILON_PP),
        rarity_percent: z_score.map_or(0.0, rarity_percent),
        delta_from_baseline: delta_pp,
        ev_per_1000_spins,
        sigma_used: args.sigma_per_spin,
        observed_value: Some(observed.ratio),
        z_score,
    }
}

/// Hit-frequency luck: observed hit count against `spin_count * p`.
#[must_use]
pub fn evaluate_hit_luck(baseline_probability: f64, spin_count: f64, hit_count: f64) -> LuckResult {
    let (Some(p), Some(n)) = (positive(Some(baseline_probability)), positive(Some(spin_count)))
    else {
        return LuckResult::neutral(0.0);
    };
    let hits = floor_count(hit_count);

    let observed_rate = hits / n;
    let mu = n * p;
    let sigma = (n * p * (1.0 - p)).sqrt();
    let sigma = if sigma.is_finite() && sigma > 0.0 {
        sigma
    } else {
        SIGMA_FLOOR
    };
    let z = (hits - mu) / sigma;

    LuckResult {
        direction: Direction::classify(observed_rate - p, EXACT_EQUAL_EPSILON),
        rarity_percent: rarity_percent(z),
        delta_from_baseline: (observed_rate - p) * 100.0,
        ev_per_1000_spins: 0.0,
        sigma_used: sigma,
        observed_value: Some(observed_rate),
        z_score: Some(z),
    }
}

/// Per-hit value luck: observed mean yield against the baseline mean.
#[must_use]
pub fn evaluate_hit_value_luck(
    baseline_average_yield: f64,
    observed_average_yield: f64,
    hit_count: f64,
    sigma_per_hit: f64,
) -> LuckResult {
    let hits = floor_count(hit_count);
    let (Some(base), Some(observed)) = (
        positive(Some(baseline_average_yield)),
        finite(Some(observed_average_yield)),
    ) else {
        return LuckResult::neutral(0.0);
    };
    if hits < 1.0 {
        return LuckResult::neutral(0.0);
    }

    let standard_error = sigma_per_hit / hits.sqrt();
    let standard_error = if standard_error.is_finite() && standard_error > 0.0 {
        standard_error
    } else {
        SIGMA_FLOOR
    };
    let z = (observed - base) / standard_error;

    LuckResult {
        direction: Direction::classify(observed - base, EXACT_EQUAL_EPSILON),
        rarity_percent: rarity_percent(z),
        delta_from_baseline: observed - base,
        ev_per_1000_spins: 0.0,
        sigma_used: sigma_per_hit,
        observed_value: Some(observed),
        z_score: Some(z),
    }
}
