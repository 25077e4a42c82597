//! Observed session inputs.
//!
//! Sessions arrive as flat JSON objects filled in from a form, so numeric
//! fields are parsed leniently: numbers and numeric strings are accepted,
//! while `null`, blank strings and anything unparseable become `None`.
//! A malformed field never fails the whole parse.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::numbers::finite;
use crate::sigma::SigmaPreset;

/// Errors raised while reading a session document.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session JSON is malformed: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Every named numeric field of a session observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionField {
    TotalSpins,
    SpinsN,
    NormalSpins,
    FirstHitCount,
    FirstHits,
    FirstHitRate,
    DiffCoins,
    CoinIn,
    CoinOut,
    AvgCoins,
    AvgCoinsObs,
    AvgCoinsBase,
    CustomSigma,
    RtpBasePct,
    SigmaHit,
    KHit,
    BetPerSpin,
    HitCount,
    BetCount,
}

impl SessionField {
    pub const ALL: [Self; 19] = [
        Self::TotalSpins,
        Self::SpinsN,
        Self::NormalSpins,
        Self::FirstHitCount,
        Self::FirstHits,
        Self::FirstHitRate,
        Self::DiffCoins,
        Self::CoinIn,
        Self::CoinOut,
        Self::AvgCoins,
        Self::AvgCoinsObs,
        Self::AvgCoinsBase,
        Self::CustomSigma,
        Self::RtpBasePct,
        Self::SigmaHit,
        Self::KHit,
        Self::BetPerSpin,
        Self::HitCount,
        Self::BetCount,
    ];

    /// JSON key of the field.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::TotalSpins => "totalSpins",
            Self::SpinsN => "spinsN",
            Self::NormalSpins => "normalSpins",
            Self::FirstHitCount => "firstHitCount",
            Self::FirstHits => "firstHits",
            Self::FirstHitRate => "firstHitRate",
            Self::DiffCoins => "diffCoins",
            Self::CoinIn => "coinIn",
            Self::CoinOut => "coinOut",
            Self::AvgCoins => "avgCoins",
            Self::AvgCoinsObs => "avgCoinsObs",
            Self::AvgCoinsBase => "avgCoinsBase",
            Self::CustomSigma => "customSigma",
            Self::RtpBasePct => "rtpBasePct",
            Self::SigmaHit => "sigmaHit",
            Self::KHit => "kHit",
            Self::BetPerSpin => "betPerSpin",
            Self::HitCount => "hitCount",
            Self::BetCount => "betCount",
        }
    }

    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.key() == key)
    }
}

// Fallback chains, highest priority first.
pub const TOTAL_SPINS_SOURCES: &[SessionField] = &[SessionField::TotalSpins, SessionField::SpinsN];
pub const FIRST_HIT_COUNT_SOURCES: &[SessionField] =
    &[SessionField::FirstHitCount, SessionField::FirstHits];
pub const OBSERVED_AVG_YIELD_SOURCES: &[SessionField] =
    &[SessionField::AvgCoins, SessionField::AvgCoinsObs];

/// One recorded play session.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionObservation {
    #[serde(default, deserialize_with = "lenient_number")]
    pub total_spins: Option<f64>,
    #[serde(default, rename = "spinsN", deserialize_with = "lenient_number")]
    pub spins_n: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub normal_spins: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub first_hit_count: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub first_hits: Option<f64>,
    /// Either a probability in (0, 1] or a "1 in N" denominator.
    #[serde(default, deserialize_with = "lenient_number")]
    pub first_hit_rate: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub diff_coins: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub coin_in: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub coin_out: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub avg_coins: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub avg_coins_obs: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub avg_coins_base: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub custom_sigma: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub preset_sigma: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub rtp_base_pct: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub sigma_hit: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub k_hit: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub bet_per_spin: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub hit_count: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub bet_count: Option<f64>,
    /// Additional numeric fields referenced by name from machine config.
    #[serde(flatten, deserialize_with = "lenient_extra")]
    pub extra: BTreeMap<String, f64>,
}

impl SessionObservation {
    /// Parse a session document.
    ///
    /// # Errors
    ///
    /// Returns an error only when the text is not a JSON object.
    pub fn from_json(json: &str) -> Result<Self, SessionError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a typed field; non-finite values read as absent.
    #[must_use]
    pub fn get(&self, field: SessionField) -> Option<f64> {
        let raw = match field {
            SessionField::TotalSpins => self.total_spins,
            SessionField::SpinsN => self.spins_n,
            SessionField::NormalSpins => self.normal_spins,
            SessionField::FirstHitCount => self.first_hit_count,
            SessionField::FirstHits => self.first_hits,
            SessionField::FirstHitRate => self.first_hit_rate,
            SessionField::DiffCoins => self.diff_coins,
            SessionField::CoinIn => self.coin_in,
            SessionField::CoinOut => self.coin_out,
            SessionField::AvgCoins => self.avg_coins,
            SessionField::AvgCoinsObs => self.avg_coins_obs,
            SessionField::AvgCoinsBase => self.avg_coins_base,
            SessionField::CustomSigma => self.custom_sigma,
            SessionField::RtpBasePct => self.rtp_base_pct,
            SessionField::SigmaHit => self.sigma_hit,
            SessionField::KHit => self.k_hit,
            SessionField::BetPerSpin => self.bet_per_spin,
            SessionField::HitCount => self.hit_count,
            SessionField::BetCount => self.bet_count,
        };
        finite(raw)
    }

    /// First available value along an ordered fallback chain.
    #[must_use]
    pub fn first_of(&self, sources: &[SessionField]) -> Option<f64> {
        sources.iter().find_map(|field| self.get(*field))
    }

    /// Look a field up by its JSON key, typed fields first, then `extra`.
    #[must_use]
    pub fn by_key(&self, key: &str) -> Option<f64> {
        match SessionField::from_key(key) {
            Some(field) => self.get(field),
            None => finite(self.extra.get(key).copied()),
        }
    }

    #[must_use]
    pub fn preset(&self) -> Option<SigmaPreset> {
        self.preset_sigma
            .as_deref()
            .and_then(SigmaPreset::parse_lenient)
    }

    pub fn set(&mut self, field: SessionField, value: Option<f64>) {
        let slot = match field {
            SessionField::TotalSpins => &mut self.total_spins,
            SessionField::SpinsN => &mut self.spins_n,
            SessionField::NormalSpins => &mut self.normal_spins,
            SessionField::FirstHitCount => &mut self.first_hit_count,
            SessionField::FirstHits => &mut self.first_hits,
            SessionField::FirstHitRate => &mut self.first_hit_rate,
            SessionField::DiffCoins => &mut self.diff_coins,
            SessionField::CoinIn => &mut self.coin_in,
            SessionField::CoinOut => &mut self.coin_out,
            SessionField::AvgCoins => &mut self.avg_coins,
            SessionField::AvgCoinsObs => &mut self.avg_coins_obs,
            SessionField::AvgCoinsBase => &mut self.avg_coins_base,
            SessionField::CustomSigma => &mut self.custom_sigma,
            SessionField::RtpBasePct => &mut self.rtp_base_pct,
            SessionField::SigmaHit => &mut self.sigma_hit,
            SessionField::KHit => &mut self.k_hit,
            SessionField::BetPerSpin => &mut self.bet_per_spin,
            SessionField::HitCount => &mut self.hit_count,
            SessionField::BetCount => &mut self.bet_count,
        };
        *slot = value;
    }

    /// Builder-style setter used by scenarios and tests.
    #[must_use]
    pub fn with(mut self, field: SessionField, value: f64) -> Self {
        self.set(field, Some(value));
        self
    }

    #[must_use]
    pub fn with_preset(mut self, preset: &str) -> Self {
        self.preset_sigma = Some(preset.to_string());
        self
    }
}

fn number_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(number_from_value(&value))
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        _ => None,
    })
}

fn lenient_extra<'de, D>(deserializer: D) -> Result<BTreeMap<String, f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|(key, value)| number_from_value(&value).map(|n| (key, n)))
        .collect())
}
