//! Machine model records and their typed baseline view.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    DEFAULT_LEGACY_DENOMINATOR_KEY, DEFAULT_LEGACY_NUMERATOR_KEY, DEFAULT_PRIOR_MEAN,
    DEFAULT_PRIOR_STRENGTH,
};

/// Benchmark keys the aggregator reads baselines from.
pub const FIRST_HIT_BENCHMARK: &str = "firstHitRate";
pub const AVG_YIELD_BENCHMARK: &str = "avgCoins";
pub const PAYOUT_BENCHMARK: &str = "payoutPct";

const NORMAL_ID_OVERRIDES: &[&str] = &["arexbright"];

/// Errors raised when a machine record cannot be loaded or violates its invariants.
#[derive(Debug, Error)]
pub enum MachineError {
    #[error("machine JSON is malformed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("machine record has an empty machineId")]
    MissingId,
    #[error("{field} must be a positive finite number (got {value})")]
    NotPositive { field: &'static str, value: f64 },
    #[error("{field} must be between {min} and {max} (got {value})")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MachineName {
    #[serde(default)]
    pub jp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub en: Option<String>,
}

/// Input or output field declaration; only the key matters to scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDef {
    pub key: String,
    #[serde(default, rename = "labelJP", skip_serializing_if = "Option::is_none")]
    pub label_jp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MachineIo {
    #[serde(default)]
    pub inputs: Vec<FieldDef>,
    #[serde(default)]
    pub outputs: Vec<FieldDef>,
}

/// How a benchmark turns observations into a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BenchmarkMethod {
    Ratio,
    Diff,
    Z,
}

impl BenchmarkMethod {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ratio => "ratio",
            Self::Diff => "diff",
            Self::Z => "z",
        }
    }
}

const fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkDef {
    pub method: BenchmarkMethod,
    #[serde(default)]
    pub value_key: Option<String>,
    #[serde(default)]
    pub numerator_key: Option<String>,
    #[serde(default)]
    pub denominator_key: Option<String>,
    #[serde(default)]
    pub n_key: Option<String>,
    #[serde(default)]
    pub baseline: Option<f64>,
    #[serde(default)]
    pub stddev: Option<f64>,
    #[serde(default = "default_true")]
    pub higher_is_better: bool,
}

/// Legacy scoring method used for the `ratio` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringMethod {
    #[default]
    Ratio,
    Z,
    Shrinkage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringParams {
    #[serde(default = "ScoringParams::default_numerator_key")]
    pub numerator_key: String,
    #[serde(default = "ScoringParams::default_denominator_key")]
    pub denominator_key: String,
    #[serde(default = "ScoringParams::default_prior_mean")]
    pub prior_mean: f64,
    #[serde(default = "ScoringParams::default_prior_strength")]
    pub prior_strength: f64,
    #[serde(default)]
    pub target_key: Option<String>,
    #[serde(default)]
    pub baseline_mean: Option<f64>,
    #[serde(default)]
    pub baseline_std: Option<f64>,
}

impl ScoringParams {
    fn default_numerator_key() -> String {
        DEFAULT_LEGACY_NUMERATOR_KEY.to_string()
    }

    fn default_denominator_key() -> String {
        DEFAULT_LEGACY_DENOMINATOR_KEY.to_string()
    }

    const fn default_prior_mean() -> f64 {
        DEFAULT_PRIOR_MEAN
    }

    const fn default_prior_strength() -> f64 {
        DEFAULT_PRIOR_STRENGTH
    }
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self {
            numerator_key: Self::default_numerator_key(),
            denominator_key: Self::default_denominator_key(),
            prior_mean: Self::default_prior_mean(),
            prior_strength: Self::default_prior_strength(),
            target_key: None,
            baseline_mean: None,
            baseline_std: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub method: ScoringMethod,
    #[serde(default)]
    pub params: ScoringParams,
}

/// Broad machine family, used to pick which hit events are tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MachineKind {
    /// Classic bonus machines tracked by big/regular bonus counts.
    Normal,
    /// Feature machines (AT/ST/LT) tracked by first hits.
    Feature,
}

impl MachineKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Feature => "feature",
        }
    }
}

impl std::fmt::Display for MachineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One machine model as described by its JSON record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineRecord {
    #[serde(default)]
    pub schema_version: Option<String>,
    /// Empty when the record omits it; catalogs fill it from the file name.
    #[serde(default)]
    pub machine_id: String,
    #[serde(default)]
    pub name: MachineName,
    #[serde(default, rename = "labelsJP")]
    pub labels_jp: BTreeMap<String, String>,
    #[serde(default)]
    pub io: MachineIo,
    #[serde(default)]
    pub scoring: Option<ScoringConfig>,
    #[serde(default)]
    pub benchmarks: BTreeMap<String, BenchmarkDef>,
    #[serde(default)]
    pub coin_unit_price_yen: Option<f64>,
    #[serde(default)]
    pub rate_yen_per_coin: Option<f64>,
    #[serde(default)]
    pub sigma_spin_default: Option<f64>,
    #[serde(default, alias = "gameStyle")]
    pub kind: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Typed baseline parameters for one machine model.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MachineBaseline {
    pub first_hit_probability: Option<f64>,
    pub average_yield_baseline: Option<f64>,
    pub payout_percent_baseline: Option<f64>,
    pub coin_unit_price_yen: Option<f64>,
    pub sigma_spin_default: Option<f64>,
}

impl MachineBaseline {
    /// Check that every present field satisfies its range.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), MachineError> {
        if let Some(p) = self.first_hit_probability
            && !(p.is_finite() && p > 0.0 && p <= 1.0)
        {
            return Err(MachineError::OutOfRange {
                field: "benchmarks.firstHitRate.baseline",
                min: 0.0,
                max: 1.0,
                value: p,
            });
        }
        let magnitudes = [
            ("benchmarks.avgCoins.baseline", self.average_yield_baseline),
            ("benchmarks.payoutPct.baseline", self.payout_percent_baseline),
            ("coinUnitPriceYen", self.coin_unit_price_yen),
            ("sigmaSpinDefault", self.sigma_spin_default),
        ];
        for (field, value) in magnitudes {
            if let Some(value) = value
                && !(value.is_finite() && value > 0.0)
            {
                return Err(MachineError::NotPositive { field, value });
            }
        }
        Ok(())
    }
}

impl MachineRecord {
    /// Parse a machine record without validating it.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON does not match the record shape.
    pub fn from_json(json: &str) -> Result<Self, MachineError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse and validate a machine record.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a baseline is out of range.
    pub fn load(json: &str) -> Result<Self, MachineError> {
        let record = Self::from_json(json)?;
        record.validate()?;
        Ok(record)
    }

    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), MachineError> {
        if self.machine_id.trim().is_empty() {
            return Err(MachineError::MissingId);
        }
        self.baseline().validate()
    }

    #[must_use]
    pub fn benchmark_baseline(&self, key: &str) -> Option<f64> {
        self.benchmarks.get(key).and_then(|b| b.baseline)
    }

    /// Typed baseline view of this record.
    ///
    /// A first-hit baseline above 1 is read as a "1 in N" denominator.
    #[must_use]
    pub fn baseline(&self) -> MachineBaseline {
        let first_hit_probability = self
            .benchmark_baseline(FIRST_HIT_BENCHMARK)
            .map(|v| if v > 1.0 { 1.0 / v } else { v });
        MachineBaseline {
            first_hit_probability,
            average_yield_baseline: self.benchmark_baseline(AVG_YIELD_BENCHMARK),
            payout_percent_baseline: self.benchmark_baseline(PAYOUT_BENCHMARK),
            coin_unit_price_yen: self.coin_unit_price_yen,
            sigma_spin_default: self.sigma_spin_default,
        }
    }

    #[must_use]
    pub fn scoring(&self) -> ScoringConfig {
        self.scoring.clone().unwrap_or_default()
    }

    /// Display label: Japanese name, then English name, then id.
    #[must_use]
    pub fn label(&self) -> &str {
        let jp = self.name.jp.trim();
        if !jp.is_empty() {
            return jp;
        }
        match self.name.en.as_deref().map(str::trim) {
            Some(en) if !en.is_empty() => en,
            _ => &self.machine_id,
        }
    }

    #[must_use]
    pub fn label_for<'a>(&'a self, key: &'a str) -> &'a str {
        self.labels_jp.get(key).map_or(key, String::as_str)
    }

    /// Infer the machine family.
    ///
    /// Priority: explicit kind → tags → id override → input schema →
    /// benchmark keys. Anything undecided is a feature machine.
    #[must_use]
    pub fn kind(&self) -> MachineKind {
        if let Some(kind) = self.kind.as_deref().and_then(kind_from_label) {
            return kind;
        }
        let tags: Vec<String> = self.tags.iter().map(|t| t.to_lowercase()).collect();
        if let Some(kind) = tags.iter().find_map(|t| kind_from_label(t)) {
            return kind;
        }

        if NORMAL_ID_OVERRIDES.contains(&self.machine_id.to_lowercase().as_str()) {
            return MachineKind::Normal;
        }

        let input_keys: Vec<String> = self
            .io
            .inputs
            .iter()
            .map(|d| d.key.to_lowercase())
            .collect();
        let has_bonus_rate = input_keys.iter().any(|k| bonus_rate_pattern().is_match(k));
        let has_bonus_count = input_keys
            .iter()
            .any(|k| k == "bigcount" || k == "regcount");
        let has_first_hit = input_keys.iter().any(|k| first_hit_pattern().is_match(k));
        if (has_bonus_rate || has_bonus_count) && !has_first_hit {
            return MachineKind::Normal;
        }

        let has_bonus_benchmark = self
            .benchmarks
            .keys()
            .map(|k| k.to_lowercase())
            .any(|k| k == "bigrate" || k == "regrate");
        if has_bonus_benchmark {
            return MachineKind::Normal;
        }
        MachineKind::Feature
    }
}

fn kind_from_label(label: &str) -> Option<MachineKind> {
    match label.to_lowercase().as_str() {
        "normal" | "a" | "a-type" => Some(MachineKind::Normal),
        "at" | "st" | "lt" => Some(MachineKind::Feature),
        _ => None,
    }
}

fn bonus_rate_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(big|reg).*rate$").expect("static regex"))
}

fn first_hit_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^firsthit(rate|count|s)$").expect("static regex"))
}
