//! User-tunable scoring settings.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{DEFAULT_ALPHA0, DEFAULT_BETA0, DEFAULT_RATIO_CAP};
use crate::index::shrink_binomial;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings JSON is malformed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{field} {reason} (got {value})")]
    Invalid {
        field: &'static str,
        reason: &'static str,
        value: f64,
    },
}

/// How benchmark indicators are folded into the combined index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    #[default]
    Ratio,
    Z,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoringSettings {
    pub scheme: Scheme,
    pub ratio_cap: f64,
    /// Beta prior successes.
    pub alpha0: f64,
    /// Beta prior failures.
    pub beta0: f64,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            scheme: Scheme::default(),
            ratio_cap: DEFAULT_RATIO_CAP,
            alpha0: DEFAULT_ALPHA0,
            beta0: DEFAULT_BETA0,
        }
    }
}

impl ScoringSettings {
    /// Parse settings, filling missing fields with defaults, and validate them.
    ///
    /// # Errors
    ///
    /// Returns an error when the JSON is malformed or a value is out of range.
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// # Errors
    ///
    /// Returns the first field outside its range.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(self.ratio_cap.is_finite() && self.ratio_cap >= 1.0) {
            return Err(SettingsError::Invalid {
                field: "ratioCap",
                reason: "must be at least 1",
                value: self.ratio_cap,
            });
        }
        for (field, value) in [("alpha0", self.alpha0), ("beta0", self.beta0)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(SettingsError::Invalid {
                    field,
                    reason: "must be positive",
                    value,
                });
            }
        }
        Ok(())
    }

    /// Beta-binomial shrunk rate using the configured prior.
    #[must_use]
    pub fn shrink(&self, successes: f64, trials: f64) -> f64 {
        shrink_binomial(successes, trials, self.alpha0, self.beta0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let settings = ScoringSettings::from_json(r#"{"scheme": "z"}"#).unwrap();
        assert_eq!(settings.scheme, Scheme::Z);
        assert!((settings.ratio_cap - 3.0).abs() < f64::EPSILON);
        assert!((settings.alpha0 - 1.0).abs() < f64::EPSILON);
        assert_eq!(
            ScoringSettings::from_json("{}").unwrap(),
            ScoringSettings::default()
        );
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let err = ScoringSettings::from_json(r#"{"ratioCap": 0.5}"#).unwrap_err();
        assert!(err.to_string().contains("ratioCap"));
        assert!(matches!(
            ScoringSettings::from_json(r#"{"beta0": 0}"#),
            Err(SettingsError::Invalid { field: "beta0", .. })
        ));
        assert!(matches!(
            ScoringSettings::from_json(r#"{"scheme": "bands"}"#),
            Err(SettingsError::Parse(_))
        ));
    }

    #[test]
    fn shrink_uses_configured_prior() {
        let settings = ScoringSettings::from_json(r#"{"alpha0": 2, "beta0": 8}"#).unwrap();
        assert!((settings.shrink(3.0, 10.0) - 0.25).abs() < 1e-12);
        assert!((ScoringSettings::default().shrink(0.0, 0.0) - 0.5).abs() < 1e-12);
    }
}
