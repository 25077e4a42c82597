//! Benchmark indicators: one scored row per machine benchmark.

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_INDICATOR_N_KEY;
use crate::machine::{BenchmarkDef, BenchmarkMethod, MachineRecord, PAYOUT_BENCHMARK};
use crate::numbers::{finite, positive, safe_div};
use crate::output::OutputMap;
use crate::scoring::payout_percent;
use crate::session::SessionObservation;

/// A scored benchmark.
///
/// `score` is a relative deviation (`value / baseline - 1`) unless the
/// benchmark produced a standardized `z`, in which case the two agree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRow {
    pub key: String,
    pub label: String,
    pub method: BenchmarkMethod,
    /// Display value; probabilities are shown as their "1 in N" denominator when known.
    pub value: Option<f64>,
    pub baseline: Option<f64>,
    pub score: Option<f64>,
    pub z: Option<f64>,
}

/// Score every benchmark of `machine`, in benchmark-key order.
#[must_use]
pub fn compute_indicators(
    machine: &MachineRecord,
    session: &SessionObservation,
    outputs: &OutputMap,
) -> Vec<IndicatorRow> {
    machine
        .benchmarks
        .iter()
        .map(|(key, def)| evaluate_benchmark(machine, key, def, session, outputs))
        .collect()
}

fn lookup(key: &str, session: &SessionObservation, outputs: &OutputMap) -> Option<f64> {
    finite(outputs.number(key)).or_else(|| session.by_key(key))
}

fn orient(score: Option<f64>, higher_is_better: bool) -> Option<f64> {
    score.map(|s| if higher_is_better { s } else { -s })
}

fn relative(value: Option<f64>, baseline: Option<f64>) -> Option<f64> {
    value
        .zip(baseline)
        .and_then(|(v, b)| safe_div(v, b))
        .map(|r| r - 1.0)
}

fn evaluate_benchmark(
    machine: &MachineRecord,
    key: &str,
    def: &BenchmarkDef,
    session: &SessionObservation,
    outputs: &OutputMap,
) -> IndicatorRow {
    let mut row = IndicatorRow {
        key: key.to_string(),
        label: machine.label_for(key).to_string(),
        method: def.method,
        value: None,
        baseline: finite(def.baseline),
        score: None,
        z: None,
    };

    match def.method {
        BenchmarkMethod::Diff => {
            let value_key = def.value_key.as_deref().unwrap_or(key);
            let value = lookup(value_key, session, outputs).or_else(|| {
                (value_key == PAYOUT_BENCHMARK || key == PAYOUT_BENCHMARK)
                    .then(|| payout_percent(session))
                    .flatten()
            });
            row.value = value;
            row.score = orient(relative(value, row.baseline), def.higher_is_better);
        }
        BenchmarkMethod::Ratio => {
            let numerator = def.numerator_key.as_deref().and_then(|k| session.by_key(k));
            let denominator = def
                .denominator_key
                .as_deref()
                .and_then(|k| positive(session.by_key(k)));
            let value = numerator.zip(denominator).map(|(n, d)| n / d);
            row.value = value;
            row.score = orient(
                relative(value, positive(row.baseline)),
                def.higher_is_better,
            );
        }
        BenchmarkMethod::Z => score_probability(&mut row, key, def, session, outputs),
    }
    row
}

struct ProbabilityReading {
    p: f64,
    denominator: Option<f64>,
}

fn read_probability(
    key: &str,
    def: &BenchmarkDef,
    session: &SessionObservation,
    outputs: &OutputMap,
) -> Option<ProbabilityReading> {
    if let (Some(num_key), Some(den_key)) = (&def.numerator_key, &def.denominator_key) {
        let hits = session.by_key(num_key)?;
        let spins = positive(session.by_key(den_key))?;
        return Some(ProbabilityReading {
            p: hits / spins,
            denominator: (hits > 0.0).then(|| spins / hits),
        });
    }
    if let Some(value_key) = &def.value_key {
        let raw = positive(lookup(value_key, session, outputs))?;
        return Some(if raw <= 1.0 {
            ProbabilityReading {
                p: raw,
                denominator: Some(1.0 / raw),
            }
        } else {
            ProbabilityReading {
                p: 1.0 / raw,
                denominator: Some(raw),
            }
        });
    }
    session.by_key(key).map(|p| ProbabilityReading {
        p,
        denominator: None,
    })
}

fn score_probability(
    row: &mut IndicatorRow,
    key: &str,
    def: &BenchmarkDef,
    session: &SessionObservation,
    outputs: &OutputMap,
) {
    // Baselines above 1 are "1 in N" denominators.
    let base = positive(row.baseline).map(|b| if b > 1.0 { 1.0 / b } else { b });
    row.baseline = base;

    let reading = read_probability(key, def, session, outputs);
    row.value = reading.as_ref().map(|r| r.denominator.unwrap_or(r.p));
    let Some(reading) = reading else {
        return;
    };
    let Some(base) = base else {
        return;
    };

    let n_key = def.n_key.as_deref().unwrap_or(DEFAULT_INDICATOR_N_KEY);
    let sigma = positive(def.stddev).or_else(|| {
        let n = positive(session.by_key(n_key))?;
        positive(Some((base * (1.0 - base) / n).sqrt()))
    });

    match sigma {
        Some(sigma) => {
            let z = orient(Some((reading.p - base) / sigma), def.higher_is_better);
            row.z = z;
            row.score = z;
        }
        None => {
            row.score = orient(relative(Some(reading.p), Some(base)), def.higher_is_better);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::compute_outputs;

    const MACHINE: &str = r#"{
        "machineId": "bench",
        "labelsJP": { "payoutPct": "機械割", "firstHitRate": "初当り確率" },
        "benchmarks": {
            "payoutPct": { "method": "diff", "valueKey": "payoutPct", "baseline": 100 },
            "firstHitRate": { "method": "z", "valueKey": "firstHitRate", "baseline": 0.005, "nKey": "normalSpins" },
            "cherryRate": { "method": "ratio", "numeratorKey": "cherryCount", "denominatorKey": "normalSpins", "baseline": 0.02, "higherIsBetter": false },
            "avgCoins": { "method": "diff", "baseline": 400 }
        }
    }"#;

    fn rows(session_json: &str) -> Vec<IndicatorRow> {
        let machine = MachineRecord::from_json(MACHINE).unwrap();
        let session = SessionObservation::from_json(session_json).unwrap();
        let outputs = compute_outputs(&machine, &session);
        compute_indicators(&machine, &session, &outputs)
    }

    fn row<'a>(rows: &'a [IndicatorRow], key: &str) -> &'a IndicatorRow {
        rows.iter().find(|r| r.key == key).unwrap()
    }

    #[test]
    fn rows_follow_benchmark_key_order_with_labels() {
        let rows = rows("{}");
        let keys: Vec<&str> = rows.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(
            keys,
            ["avgCoins", "cherryRate", "firstHitRate", "payoutPct"]
        );
        assert_eq!(row(&rows, "payoutPct").label, "機械割");
        assert_eq!(row(&rows, "avgCoins").label, "avgCoins");
        assert!(rows.iter().all(|r| r.score.is_none()));
    }

    #[test]
    fn diff_scores_relative_to_baseline() {
        let rows = rows(r#"{"totalSpins": 1000, "diffCoins": 300, "avgCoins": 500}"#);
        let payout = row(&rows, "payoutPct");
        assert!((payout.value.unwrap() - 110.0).abs() < 1e-9);
        assert!((payout.score.unwrap() - 0.1).abs() < 1e-9);
        let avg = row(&rows, "avgCoins");
        assert!((avg.score.unwrap() - 0.25).abs() < 1e-12);
        assert_eq!(avg.z, None);
    }

    #[test]
    fn ratio_respects_lower_is_better() {
        let rows = rows(r#"{"normalSpins": 1000, "cherryCount": 30}"#);
        let cherry = row(&rows, "cherryRate");
        assert!((cherry.value.unwrap() - 0.03).abs() < 1e-12);
        assert!((cherry.score.unwrap() + 0.5).abs() < 1e-9);
    }

    #[test]
    fn z_method_uses_binomial_sigma() {
        let rows = rows(r#"{"normalSpins": 10000, "firstHitCount": 80}"#);
        let first = row(&rows, "firstHitRate");
        let sigma = (0.005 * 0.995 / 10_000.0_f64).sqrt();
        let expected = (0.008 - 0.005) / sigma;
        assert!((first.z.unwrap() - expected).abs() < 1e-6);
        assert_eq!(first.score, first.z);
        assert!((first.value.unwrap() - 125.0).abs() < 1e-9);
    }

    #[test]
    fn z_method_without_spin_count_falls_back_to_relative_score() {
        let rows = rows(r#"{"firstHitRate": 250}"#);
        let first = row(&rows, "firstHitRate");
        assert_eq!(first.z, None);
        assert!((first.value.unwrap() - 250.0).abs() < 1e-9);
        assert!((first.score.unwrap() + 0.2).abs() < 1e-9);
    }
}
