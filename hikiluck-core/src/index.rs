//! Combined luck index and ratio-scheme metric helpers.

use std::fmt;

use num_traits::cast::cast;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_RATIO_CAP, ERF_A1, ERF_A2, ERF_A3, ERF_A4, ERF_A5, ERF_P, LOG_RATIO_FLOOR,
    LOG_RATIO_SCALE, NEUTRAL_INDEX_SCORE, TIER_BLESSED_MIN, TIER_LEGENDARY_MIN, TIER_TYPICAL_MIN,
    TIER_UPSWING_MIN,
};
use crate::indicator::IndicatorRow;
use crate::numbers::round_percent;
use crate::settings::{Scheme, ScoringSettings};

/// Error function via Abramowitz–Stegun 7.1.26.
#[must_use]
pub fn erf(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + ERF_P * x);
    let poly = ((((ERF_A5 * t + ERF_A4) * t + ERF_A3) * t + ERF_A2) * t + ERF_A1) * t;
    sign * (1.0 - poly * (-x * x).exp())
}

/// Map a z-score to a 0–100 score (z = 0 → 50).
#[must_use]
pub fn z_to_score(z: f64) -> u8 {
    let cdf = 0.5 * (1.0 + erf(z / std::f64::consts::SQRT_2));
    round_percent(cdf * 100.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZSummary {
    pub label: String,
    pub z: f64,
}

/// Score of the mean z; no summaries at all is neutral.
#[must_use]
pub fn combine_z(summaries: &[ZSummary]) -> u8 {
    let usable: Vec<f64> = summaries
        .iter()
        .map(|s| s.z)
        .filter(|z| z.is_finite())
        .collect();
    if usable.is_empty() {
        return NEUTRAL_INDEX_SCORE;
    }
    let count = cast::<usize, f64>(usable.len()).unwrap_or(1.0);
    let mean = usable.iter().sum::<f64>() / count;
    z_to_score(mean)
}

/// Five-step badge for a combined score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LuckTier {
    Downswing,
    Typical,
    Upswing,
    Blessed,
    Legendary,
}

impl LuckTier {
    #[must_use]
    pub const fn from_score(score: u8) -> Self {
        if score >= TIER_LEGENDARY_MIN {
            Self::Legendary
        } else if score >= TIER_BLESSED_MIN {
            Self::Blessed
        } else if score >= TIER_UPSWING_MIN {
            Self::Upswing
        } else if score >= TIER_TYPICAL_MIN {
            Self::Typical
        } else {
            Self::Downswing
        }
    }

    /// Tier number, 1 (downswing) to 5 (legendary).
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Downswing => 1,
            Self::Typical => 2,
            Self::Upswing => 3,
            Self::Blessed => 4,
            Self::Legendary => 5,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Downswing => "downswing",
            Self::Typical => "typical",
            Self::Upswing => "upswing",
            Self::Blessed => "blessed",
            Self::Legendary => "legendary",
        }
    }
}

impl fmt::Display for LuckTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `v / b` clamped to `[1/cap, cap]`; 1 when the inputs are unusable.
#[must_use]
pub fn safe_ratio(value: f64, baseline: f64, cap: f64) -> f64 {
    if !value.is_finite() || !baseline.is_finite() || baseline <= 0.0 {
        return 1.0;
    }
    let cap = if cap.is_finite() && cap >= 1.0 {
        cap
    } else {
        DEFAULT_RATIO_CAP
    };
    (value / baseline).clamp(1.0 / cap, cap)
}

/// Log-ratio mapped onto a z-like scale.
#[must_use]
pub fn log_ratio_z(ratio: f64, scale: f64) -> f64 {
    ratio.max(LOG_RATIO_FLOOR).ln() / scale
}

/// Ratio and z-like score for a raw value against its baseline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricScore {
    pub ratio: f64,
    pub z: f64,
}

#[must_use]
pub fn evaluate_metric(value: f64, baseline: f64, cap: f64) -> MetricScore {
    let ratio = safe_ratio(value, baseline, cap);
    MetricScore {
        ratio,
        z: log_ratio_z(ratio, LOG_RATIO_SCALE),
    }
}

/// Beta-binomial posterior mean `(x + α0) / max(1, n + α0 + β0)`.
///
/// Returns 0 for non-finite input or a negative trial count.
#[must_use]
pub fn shrink_binomial(successes: f64, trials: f64, alpha0: f64, beta0: f64) -> f64 {
    if !successes.is_finite() || !trials.is_finite() || trials < 0.0 {
        return 0.0;
    }
    (successes + alpha0) / (trials + alpha0 + beta0).max(1.0)
}

/// Combined score of a set of indicators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LuckIndex {
    pub score: u8,
    pub tier: LuckTier,
    pub contributors: Vec<ZSummary>,
}

impl LuckIndex {
    #[must_use]
    pub fn from_summaries(contributors: Vec<ZSummary>) -> Self {
        let score = combine_z(&contributors);
        Self {
            score,
            tier: LuckTier::from_score(score),
            contributors,
        }
    }

    /// Combine every indicator that carries a standardized `z`.
    #[must_use]
    pub fn from_indicators(rows: &[IndicatorRow]) -> Self {
        Self::from_summaries(
            rows.iter()
                .filter_map(|row| {
                    row.z.map(|z| ZSummary {
                        label: row.label.clone(),
                        z,
                    })
                })
                .collect(),
        )
    }

    /// Combine indicators under the configured scheme.
    ///
    /// The z scheme uses standardized scores only. The ratio scheme also
    /// maps every relative score through [`evaluate_metric`], keeping a
    /// standardized `z` where one exists.
    #[must_use]
    pub fn with_settings(rows: &[IndicatorRow], settings: &ScoringSettings) -> Self {
        match settings.scheme {
            Scheme::Z => Self::from_indicators(rows),
            Scheme::Ratio => Self::from_summaries(
                rows.iter()
                    .filter_map(|row| {
                        let z = match row.z {
                            Some(z) => z,
                            None => evaluate_metric(1.0 + row.score?, 1.0, settings.ratio_cap).z,
                        };
                        Some(ZSummary {
                            label: row.label.clone(),
                            z,
                        })
                    })
                    .collect(),
            ),
        }
    }
}
