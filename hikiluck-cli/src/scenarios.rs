//! Built-in acceptance scenarios.
//!
//! Each scenario is a deterministic check against the scoring core. They run
//! without any files on disk; the end-to-end smoke check uses the bundled
//! fixtures compiled into the binary.

use std::time::{Duration, Instant};

use anyhow::{Context, Result, ensure};
use colored::Colorize;
use hikiluck_core::scoring::keys;
use hikiluck_core::{
    Direction, MachineRecord, OutputValue, ScoringSettings, SessionField, SessionObservation,
    SigmaPreset, SigmaSource, SpinSigmaInputs, compute_outputs, evaluate, evaluate_hit_luck,
    resolve_spin_sigma, resolve_spin_sigma_traced,
};
use serde::{Deserialize, Serialize};

const SMOKE_MACHINE: &str = include_str!("../../data/machines/hokuto-at/hokuto-at.json");
const SMOKE_SESSION: &str = include_str!("../../data/sessions/hokuto-lucky.json");

type Check = fn() -> Result<()>;

#[derive(Debug, Clone, Copy)]
pub struct Scenario {
    pub key: &'static str,
    pub description: &'static str,
    check: Check,
}

const SCENARIOS: &[Scenario] = &[
    Scenario {
        key: "smoke",
        description: "Evaluate the bundled feature machine end to end",
        check: smoke,
    },
    Scenario {
        key: "hit-expected",
        description: "Exactly the expected hit count is flat and typical",
        check: hit_expected,
    },
    Scenario {
        key: "hit-extreme",
        description: "Thirty extra hits over 10k spins read as extremely rare",
        check: hit_extreme,
    },
    Scenario {
        key: "sigma-coin-price",
        description: "Coin price 3 yen scales to a per-spin sigma of 30",
        check: sigma_coin_price,
    },
    Scenario {
        key: "sigma-fallback",
        description: "No sigma source falls back to 30",
        check: sigma_fallback,
    },
    Scenario {
        key: "sigma-priority",
        description: "An explicit sigma beats every other source",
        check: sigma_priority,
    },
    Scenario {
        key: "break-even",
        description: "Zero coin delta reports a 100% payout",
        check: break_even,
    },
    Scenario {
        key: "first-hit-null",
        description: "Missing first-hit sources publish null, never zero",
        check: first_hit_null,
    },
    Scenario {
        key: "lenient-session",
        description: "Blank and non-numeric session fields read as absent",
        check: lenient_session,
    },
];

/// `(key, description)` for every built-in scenario, in run order.
pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    SCENARIOS
        .iter()
        .map(|scenario| (scenario.key, scenario.description))
        .collect()
}

pub fn scenario_keys() -> Vec<String> {
    SCENARIOS
        .iter()
        .map(|scenario| scenario.key.to_string())
        .collect()
}

pub fn get_scenario(name: &str) -> Option<Scenario> {
    SCENARIOS
        .iter()
        .copied()
        .find(|scenario| scenario.key == name)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub passed: bool,
    pub failures: Vec<String>,
    #[serde(with = "duration_serde")]
    pub duration: Duration,
}

impl Scenario {
    pub fn run(&self) -> ScenarioResult {
        let start = Instant::now();
        let outcome = (self.check)();
        let duration = start.elapsed();
        let failures = match outcome {
            Ok(()) => Vec::new(),
            Err(err) => vec![format!("{err:#}")],
        };
        ScenarioResult {
            scenario_name: self.key.to_string(),
            passed: failures.is_empty(),
            failures,
            duration,
        }
    }
}

/// Run the named scenarios; unknown names are reported as failures.
pub fn run_scenarios(names: &[String], verbose: bool) -> Vec<ScenarioResult> {
    let mut results = Vec::with_capacity(names.len());
    for name in names {
        let Some(scenario) = get_scenario(name) else {
            eprintln!("⚠️  Unknown scenario: {}", name.yellow());
            results.push(ScenarioResult {
                scenario_name: name.clone(),
                passed: false,
                failures: vec![format!("unknown scenario {name}")],
                duration: Duration::ZERO,
            });
            continue;
        };
        if verbose {
            println!("▶ {} - {}", scenario.key.bold(), scenario.description);
        }
        let result = scenario.run();
        log::debug!(
            "scenario {} passed={} in {:?}",
            result.scenario_name,
            result.passed,
            result.duration
        );
        results.push(result);
    }
    results
}

fn smoke() -> Result<()> {
    let machine = MachineRecord::load(SMOKE_MACHINE).context("bundled machine")?;
    let session = SessionObservation::from_json(SMOKE_SESSION).context("bundled session")?;
    let evaluation = evaluate(&machine, &session, &ScoringSettings::default());
    for key in [keys::PO_LUCK_PCT, keys::TS_LUCK_PCT, keys::TY_LUCK_PCT] {
        let pct = evaluation
            .outputs
            .number(key)
            .with_context(|| format!("{key} missing"))?;
        ensure!((0.0..=100.0).contains(&pct), "{key} out of range: {pct}");
    }
    ensure!(
        evaluation.indicators.len() == machine.benchmarks.len(),
        "expected one indicator per benchmark"
    );
    ensure!(evaluation.index.score <= 100, "index above 100");
    Ok(())
}

fn hit_expected() -> Result<()> {
    let result = evaluate_hit_luck(0.005, 10_000.0, 50.0);
    ensure!(
        result.direction == Direction::Flat,
        "direction {}",
        result.direction
    );
    ensure!(
        result.rarity_percent < 1e-3,
        "rarity {}",
        result.rarity_percent
    );
    Ok(())
}

fn hit_extreme() -> Result<()> {
    let result = evaluate_hit_luck(0.005, 10_000.0, 80.0);
    let z = result.z_score.context("z not computed")?;
    ensure!((z - 4.25).abs() < 0.01, "z {z}");
    ensure!(
        result.direction == Direction::Up,
        "direction {}",
        result.direction
    );
    ensure!(
        result.rarity_percent > 99.9,
        "rarity {}",
        result.rarity_percent
    );
    Ok(())
}

fn sigma_coin_price() -> Result<()> {
    let sigma = resolve_spin_sigma(None, None, None, Some(3.0), Some(10.0));
    ensure!((sigma - 30.0).abs() < 1e-12, "sigma {sigma}");
    Ok(())
}

fn sigma_fallback() -> Result<()> {
    let sigma = resolve_spin_sigma(None, None, None, None, None);
    ensure!((sigma - 30.0).abs() < f64::EPSILON, "sigma {sigma}");
    Ok(())
}

fn sigma_priority() -> Result<()> {
    for preset in SigmaPreset::ALL {
        let resolved = resolve_spin_sigma_traced(&SpinSigmaInputs {
            explicit: Some(12.5),
            preset: Some(preset),
            machine_default: Some(18.0),
            coin_unit_price_yen: Some(3.2),
            scale_factor: None,
        });
        ensure!(
            resolved.source == SigmaSource::Explicit,
            "{preset}: source {}",
            resolved.source
        );
        ensure!(
            (resolved.value - 12.5).abs() < f64::EPSILON,
            "{preset}: {}",
            resolved.value
        );
    }
    let resolved = resolve_spin_sigma_traced(&SpinSigmaInputs {
        explicit: Some(-4.0),
        preset: Some(SigmaPreset::Standard),
        ..SpinSigmaInputs::default()
    });
    ensure!(
        resolved.source == SigmaSource::Preset,
        "invalid explicit sigma not skipped"
    );
    Ok(())
}

fn break_even() -> Result<()> {
    let machine = MachineRecord::load(r#"{ "machineId": "break-even" }"#)?;
    let session = SessionObservation::default()
        .with(SessionField::TotalSpins, 5_000.0)
        .with(SessionField::DiffCoins, 0.0);
    let payout = compute_outputs(&machine, &session).number(keys::PAYOUT_PCT);
    ensure!(payout == Some(100.0), "payout {payout:?}");
    Ok(())
}

fn first_hit_null() -> Result<()> {
    let machine = MachineRecord::load(r#"{ "machineId": "first-hit-null" }"#)?;
    let session = SessionObservation::default().with(SessionField::DiffCoins, 120.0);
    let out = compute_outputs(&machine, &session);
    for key in [keys::FIRST_HIT_RATE, keys::FIRST_HIT_DENOM] {
        ensure!(
            out.get(key) == Some(&OutputValue::Unavailable),
            "{key} = {:?}",
            out.get(key)
        );
    }
    Ok(())
}

fn lenient_session() -> Result<()> {
    let session = SessionObservation::from_json(
        r#"{ "totalSpins": "", "customSigma": "abc", "diffCoins": "-900", "presetSigma": "huge" }"#,
    )?;
    ensure!(session.total_spins.is_none(), "blank spins parsed");
    ensure!(session.custom_sigma.is_none(), "non-numeric sigma parsed");
    ensure!(session.diff_coins == Some(-900.0), "numeric string dropped");
    ensure!(session.preset().is_none(), "unknown preset accepted");
    Ok(())
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u128::deserialize(deserializer)?;
        Ok(Duration::from_millis(u64::try_from(millis).unwrap_or(0)))
    }
}
