//! Centralized tuning constants for hikiluck scoring.
//!
//! These values define the deterministic math for the scoring core.
//! Keeping them together ensures that indicator behaviour can only be
//! adjusted via code changes reviewed in version control, rather than
//! through machine JSON assets.

// Sigma resolution ---------------------------------------------------------
pub(crate) const SIGMA_PRESET_A: f64 = 20.0;
pub(crate) const SIGMA_PRESET_STANDARD: f64 = 30.0;
pub(crate) const SIGMA_PRESET_ROUGH: f64 = 45.0;
pub(crate) const SPIN_SIGMA_FALLBACK: f64 = 30.0;
pub(crate) const SPIN_SIGMA_SCALE_FACTOR: f64 = 10.0;
pub(crate) const HIT_SIGMA_FALLBACK: f64 = 120.0;
pub(crate) const HIT_SIGMA_SCALE_FACTOR: f64 = 40.0;

// Normal CDF (Abramowitz & Stegun 26.2.17) ---------------------------------
pub(crate) const CDF_B1: f64 = 0.319_381_530;
pub(crate) const CDF_B2: f64 = -0.356_563_782;
pub(crate) const CDF_B3: f64 = 1.781_477_937;
pub(crate) const CDF_B4: f64 = -1.821_255_978;
pub(crate) const CDF_B5: f64 = 1.330_274_429;
pub(crate) const CDF_P: f64 = 0.231_641_9;
pub(crate) const CDF_C: f64 = 0.398_942_3;

// Error function (Abramowitz & Stegun 7.1.26) ------------------------------
pub(crate) const ERF_A1: f64 = 0.254_829_592;
pub(crate) const ERF_A2: f64 = -0.284_496_736;
pub(crate) const ERF_A3: f64 = 1.421_413_741;
pub(crate) const ERF_A4: f64 = -1.453_152_027;
pub(crate) const ERF_A5: f64 = 1.061_405_429;
pub(crate) const ERF_P: f64 = 0.327_591_1;

// Luck estimators ----------------------------------------------------------
pub(crate) const DEFAULT_BET_PER_SPIN: f64 = 3.0;
pub(crate) const PAYOUT_FLAT_EPSILON_PP: f64 = 0.1;
pub(crate) const EXACT_EQUAL_EPSILON: f64 = 1e-9;
pub(crate) const SIGMA_FLOOR: f64 = 1e-9;
pub(crate) const EV_SPIN_WINDOW: f64 = 1_000.0;
pub(crate) const RARITY_MAX: f64 = 100.0;

// Output aggregation -------------------------------------------------------
pub(crate) const DEFAULT_PAYOUT_BASELINE_PCT: f64 = 100.0;
pub(crate) const DEFAULT_LEGACY_NUMERATOR_KEY: &str = "hitCount";
pub(crate) const DEFAULT_LEGACY_DENOMINATOR_KEY: &str = "betCount";
pub(crate) const DEFAULT_PRIOR_MEAN: f64 = 0.5;
pub(crate) const DEFAULT_PRIOR_STRENGTH: f64 = 0.0;
pub(crate) const DEFAULT_INDICATOR_N_KEY: &str = "normalSpins";

// Combined index -----------------------------------------------------------
pub(crate) const DEFAULT_RATIO_CAP: f64 = 3.0;
pub(crate) const LOG_RATIO_SCALE: f64 = 0.25;
pub(crate) const LOG_RATIO_FLOOR: f64 = 1e-9;
pub(crate) const NEUTRAL_INDEX_SCORE: u8 = 50;
pub(crate) const TIER_LEGENDARY_MIN: u8 = 90;
pub(crate) const TIER_BLESSED_MIN: u8 = 75;
pub(crate) const TIER_UPSWING_MIN: u8 = 60;
pub(crate) const TIER_TYPICAL_MIN: u8 = 40;
pub(crate) const DEFAULT_ALPHA0: f64 = 1.0;
pub(crate) const DEFAULT_BETA0: f64 = 1.0;
