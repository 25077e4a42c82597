//! Hikiluck Scoring Core
//!
//! Statistical core of the hikiluck calculator: compares an observed
//! slot-machine play session against the machine model's baselines and
//! produces normalized "how lucky was this session" indicators.
//! This crate performs no I/O beyond parsing JSON text handed to it.

pub mod constants;
pub mod index;
pub mod indicator;
pub mod luck;
pub mod machine;
pub mod numbers;
pub mod output;
pub mod scoring;
pub mod session;
pub mod settings;
pub mod sigma;

use serde::Serialize;

use crate::numbers::{finite, positive};
use crate::session::FIRST_HIT_COUNT_SOURCES;

// Re-export commonly used types
pub use index::{
    LuckIndex, LuckTier, MetricScore, ZSummary, combine_z, erf, evaluate_metric, log_ratio_z,
    safe_ratio, shrink_binomial, z_to_score,
};
pub use indicator::{IndicatorRow, compute_indicators};
pub use luck::{
    Direction, LuckResult, PayoutLuckArgs, evaluate_hit_luck, evaluate_hit_value_luck,
    evaluate_payout_luck, normal_cdf, rarity_percent,
};
pub use machine::{
    BenchmarkDef, BenchmarkMethod, MachineBaseline, MachineError, MachineKind, MachineRecord,
    ScoringMethod, ScoringParams,
};
pub use output::{OutputMap, OutputValue};
pub use scoring::{compute_outputs, derive_first_hit_probability, payout_percent};
pub use session::{SessionError, SessionField, SessionObservation};
pub use settings::{Scheme, ScoringSettings, SettingsError};
pub use sigma::{
    SigmaPreset, SigmaResolution, SigmaSource, SpinSigmaInputs, resolve_hit_sigma,
    resolve_spin_sigma, resolve_spin_sigma_traced,
};

/// Trait for abstracting where machine records come from.
/// Front-ends provide this (a directory of JSON files, an embedded table, ...).
pub trait MachineLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the machine with the given id.
    ///
    /// # Errors
    ///
    /// Returns an error if the machine is unknown or its record is invalid.
    fn load_machine(&self, machine_id: &str) -> Result<MachineRecord, Self::Error>;

    /// Every known machine id, in display order.
    fn machine_ids(&self) -> Vec<String>;
}

/// Everything computed for one session against one machine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub machine_id: String,
    pub machine_label: String,
    pub machine_kind: MachineKind,
    pub outputs: OutputMap,
    pub indicators: Vec<IndicatorRow>,
    pub index: LuckIndex,
    /// First-hit rate shrunk toward the settings' Beta prior.
    /// `None` without both a spin and a hit count.
    pub first_hit_shrunk: Option<f64>,
}

/// Score a session: flat outputs, benchmark indicators and the combined index.
#[must_use]
pub fn evaluate(
    machine: &MachineRecord,
    session: &SessionObservation,
    settings: &ScoringSettings,
) -> Evaluation {
    let outputs = compute_outputs(machine, session);
    let indicators = compute_indicators(machine, session, &outputs);
    let index = LuckIndex::with_settings(&indicators, settings);
    let first_hit_shrunk = positive(session.get(SessionField::NormalSpins))
        .zip(finite(session.first_of(FIRST_HIT_COUNT_SOURCES)))
        .map(|(spins, hits)| settings.shrink(hits, spins));
    Evaluation {
        machine_id: machine.machine_id.clone(),
        machine_label: machine.label().to_string(),
        machine_kind: machine.kind(),
        outputs,
        indicators,
        index,
        first_hit_shrunk,
    }
}

/// Scoring engine bound to a machine source and fixed settings.
pub struct Evaluator<L>
where
    L: MachineLoader,
{
    loader: L,
    settings: ScoringSettings,
}

impl<L> Evaluator<L>
where
    L: MachineLoader,
{
    pub const fn new(loader: L, settings: ScoringSettings) -> Self {
        Self { loader, settings }
    }

    pub const fn settings(&self) -> &ScoringSettings {
        &self.settings
    }

    pub const fn loader(&self) -> &L {
        &self.loader
    }

    /// Evaluate a session against a machine looked up by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the machine cannot be loaded.
    pub fn evaluate(
        &self,
        machine_id: &str,
        session: &SessionObservation,
    ) -> Result<Evaluation, L::Error> {
        let machine = self.loader.load_machine(machine_id)?;
        Ok(evaluate(&machine, session, &self.settings))
    }
}
