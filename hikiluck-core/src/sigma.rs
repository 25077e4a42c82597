//! Standard-deviation resolution for the luck estimators.
//!
//! Each resolver walks a fixed priority chain of candidate sources and
//! returns the first usable one. Invalid candidates are skipped, so the
//! result is always a positive, finite sigma.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{
    HIT_SIGMA_FALLBACK, HIT_SIGMA_SCALE_FACTOR, SIGMA_PRESET_A, SIGMA_PRESET_ROUGH,
    SIGMA_PRESET_STANDARD, SPIN_SIGMA_FALLBACK, SPIN_SIGMA_SCALE_FACTOR,
};
use crate::numbers::positive;

/// Named per-spin sigma presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SigmaPreset {
    #[serde(rename = "A")]
    A,
    #[serde(rename = "standard")]
    Standard,
    #[serde(rename = "rough")]
    Rough,
}

impl SigmaPreset {
    pub const ALL: [Self; 3] = [Self::A, Self::Standard, Self::Rough];

    #[must_use]
    pub const fn sigma(self) -> f64 {
        match self {
            Self::A => SIGMA_PRESET_A,
            Self::Standard => SIGMA_PRESET_STANDARD,
            Self::Rough => SIGMA_PRESET_ROUGH,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::Standard => "standard",
            Self::Rough => "rough",
        }
    }

    /// Lenient lookup used for form-style input; unknown names yield `None`.
    #[must_use]
    pub fn parse_lenient(raw: &str) -> Option<Self> {
        raw.parse().ok()
    }
}

impl fmt::Display for SigmaPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SigmaPreset {
    type Err = UnknownPreset;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a" => Ok(Self::A),
            "standard" => Ok(Self::Standard),
            "rough" => Ok(Self::Rough),
            _ => Err(UnknownPreset(s.to_string())),
        }
    }
}

/// Raised by [`SigmaPreset::from_str`] for names outside the preset table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sigma preset `{0}` (expected A, standard or rough)")]
pub struct UnknownPreset(pub String);

/// Which rule of the priority chain produced a sigma.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SigmaSource {
    Explicit,
    Preset,
    MachineDefault,
    CoinPrice,
    Fallback,
}

impl SigmaSource {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Explicit => "explicit",
            Self::Preset => "preset",
            Self::MachineDefault => "machine_default",
            Self::CoinPrice => "coin_price",
            Self::Fallback => "fallback",
        }
    }
}

impl fmt::Display for SigmaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved sigma together with the rule that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SigmaResolution {
    pub value: f64,
    pub source: SigmaSource,
}

/// Candidate sources for the per-spin payout sigma, highest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpinSigmaInputs {
    pub explicit: Option<f64>,
    pub preset: Option<SigmaPreset>,
    pub machine_default: Option<f64>,
    pub coin_unit_price_yen: Option<f64>,
    /// Multiplier applied to the coin price; `None` means the default of 10.
    pub scale_factor: Option<f64>,
}

/// Resolve the per-spin sigma and report which source won.
#[must_use]
pub fn resolve_spin_sigma_traced(inputs: &SpinSigmaInputs) -> SigmaResolution {
    if let Some(value) = positive(inputs.explicit) {
        return SigmaResolution {
            value,
            source: SigmaSource::Explicit,
        };
    }
    if let Some(preset) = inputs.preset {
        return SigmaResolution {
            value: preset.sigma(),
            source: SigmaSource::Preset,
        };
    }
    if let Some(value) = positive(inputs.machine_default) {
        return SigmaResolution {
            value,
            source: SigmaSource::MachineDefault,
        };
    }
    let scale = inputs.scale_factor.unwrap_or(SPIN_SIGMA_SCALE_FACTOR);
    if let Some(value) =
        positive(inputs.coin_unit_price_yen).and_then(|p| positive(Some(p * scale)))
    {
        return SigmaResolution {
            value,
            source: SigmaSource::CoinPrice,
        };
    }
    SigmaResolution {
        value: SPIN_SIGMA_FALLBACK,
        source: SigmaSource::Fallback,
    }
}

/// Resolve the per-spin payout sigma.
///
/// Priority: `explicit` → `preset` → `machine_default` →
/// `coin_unit_price_yen * scale_factor` → 30.
#[must_use]
pub fn resolve_spin_sigma(
    explicit: Option<f64>,
    preset: Option<SigmaPreset>,
    machine_default: Option<f64>,
    coin_unit_price_yen: Option<f64>,
    scale_factor: Option<f64>,
) -> f64 {
    resolve_spin_sigma_traced(&SpinSigmaInputs {
        explicit,
        preset,
        machine_default,
        coin_unit_price_yen,
        scale_factor,
    })
    .value
}

/// Resolve the per-hit yield sigma and report which source won.
#[must_use]
pub fn resolve_hit_sigma_traced(
    explicit: Option<f64>,
    coin_unit_price_yen: Option<f64>,
    scale_factor: Option<f64>,
) -> SigmaResolution {
    if let Some(value) = positive(explicit) {
        return SigmaResolution {
            value,
            source: SigmaSource::Explicit,
        };
    }
    let scale = scale_factor.unwrap_or(HIT_SIGMA_SCALE_FACTOR);
    if let Some(value) = positive(coin_unit_price_yen).and_then(|p| positive(Some(p * scale))) {
        return SigmaResolution {
            value,
            source: SigmaSource::CoinPrice,
        };
    }
    SigmaResolution {
        value: HIT_SIGMA_FALLBACK,
        source: SigmaSource::Fallback,
    }
}

/// Resolve the per-hit yield sigma.
///
/// Priority: `explicit` → `coin_unit_price_yen * scale_factor` → 120.
#[must_use]
pub fn resolve_hit_sigma(
    explicit: Option<f64>,
    coin_unit_price_yen: Option<f64>,
    scale_factor: Option<f64>,
) -> f64 {
    resolve_hit_sigma_traced(explicit, coin_unit_price_yen, scale_factor).value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_beats_every_other_source() {
        let resolved = resolve_spin_sigma_traced(&SpinSigmaInputs {
            explicit: Some(12.5),
            preset: Some(SigmaPreset::Rough),
            machine_default: Some(33.0),
            coin_unit_price_yen: Some(3.2),
            scale_factor: Some(10.0),
        });
        assert!((resolved.value - 12.5).abs() < f64::EPSILON);
        assert_eq!(resolved.source, SigmaSource::Explicit);
    }

    #[test]
    fn preset_table_matches_constants() {
        let a_type = resolve_spin_sigma(None, Some(SigmaPreset::A), None, None, None);
        assert!((a_type - 20.0).abs() < f64::EPSILON);
        let standard = resolve_spin_sigma(None, Some(SigmaPreset::Standard), None, None, None);
        assert!((standard - 30.0).abs() < f64::EPSILON);
        let rough = resolve_spin_sigma(None, Some(SigmaPreset::Rough), Some(50.0), None, None);
        assert!((rough - 45.0).abs() < f64::EPSILON);
    }

    #[test]
    fn invalid_explicit_falls_through() {
        for bad in [0.0, -4.0, f64::NAN, f64::INFINITY] {
            let resolved = resolve_spin_sigma_traced(&SpinSigmaInputs {
                explicit: Some(bad),
                machine_default: Some(27.0),
                ..SpinSigmaInputs::default()
            });
            assert_eq!(resolved.source, SigmaSource::MachineDefault);
            assert!((resolved.value - 27.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn coin_price_scales_by_factor() {
        assert!((resolve_spin_sigma(None, None, None, Some(3.0), Some(10.0)) - 30.0).abs() < 1e-12);
        assert!((resolve_spin_sigma(None, None, None, Some(3.1), None) - 31.0).abs() < 1e-12);
        let traced = resolve_spin_sigma_traced(&SpinSigmaInputs {
            coin_unit_price_yen: Some(2.0),
            scale_factor: Some(-1.0),
            ..SpinSigmaInputs::default()
        });
        assert_eq!(traced.source, SigmaSource::Fallback);
    }

    #[test]
    fn spin_sigma_falls_back_to_constant() {
        let resolved = resolve_spin_sigma_traced(&SpinSigmaInputs::default());
        assert_eq!(resolved.source, SigmaSource::Fallback);
        assert!((resolved.value - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn hit_sigma_chain() {
        assert!((resolve_hit_sigma(Some(90.0), Some(3.0), None) - 90.0).abs() < f64::EPSILON);
        assert!((resolve_hit_sigma(None, Some(3.0), None) - 120.0).abs() < 1e-12);
        assert!((resolve_hit_sigma(None, Some(2.5), Some(20.0)) - 50.0).abs() < 1e-12);
        assert!((resolve_hit_sigma(Some(-1.0), None, None) - 120.0).abs() < f64::EPSILON);
        assert_eq!(
            resolve_hit_sigma_traced(None, None, None).source,
            SigmaSource::Fallback
        );
    }

    #[test]
    fn preset_names_parse_case_insensitively() {
        assert_eq!("a".parse::<SigmaPreset>(), Ok(SigmaPreset::A));
        assert_eq!(
            " Standard ".parse::<SigmaPreset>(),
            Ok(SigmaPreset::Standard)
        );
        assert_eq!(
            SigmaPreset::parse_lenient("ROUGH"),
            Some(SigmaPreset::Rough)
        );
        assert_eq!(SigmaPreset::parse_lenient("steep"), None);
        assert!("".parse::<SigmaPreset>().is_err());
    }
}
