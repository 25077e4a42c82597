//! Output aggregation: one machine record plus one session observation in,
//! one flat [`OutputMap`] out.
//!
//! Every derived quantity that cannot be computed is published as
//! [`OutputValue::Unavailable`](crate::output::OutputValue::Unavailable);
//! a numeric zero only appears when zero is the mathematically correct
//! answer (for example a break-even payout with a zero coin delta).

use log::{debug, trace};

use crate::constants::{DEFAULT_BET_PER_SPIN, DEFAULT_PAYOUT_BASELINE_PCT};
use crate::luck::{
    LuckResult, PayoutLuckArgs, evaluate_hit_luck, evaluate_hit_value_luck, evaluate_payout_luck,
};
use crate::machine::{MachineRecord, ScoringMethod, ScoringParams};
use crate::numbers::{finite, positive, safe_div};
use crate::output::OutputMap;
use crate::session::{
    FIRST_HIT_COUNT_SOURCES, OBSERVED_AVG_YIELD_SOURCES, SessionField, SessionObservation,
    TOTAL_SPINS_SOURCES,
};
use crate::sigma::{SpinSigmaInputs, resolve_hit_sigma, resolve_spin_sigma_traced};

/// Output field names. These are the contract with report consumers.
pub mod keys {
    pub const FIRST_HIT_RATE: &str = "firstHitRate";
    pub const FIRST_HIT_DENOM: &str = "firstHitDenom";
    pub const PAYOUT_PCT: &str = "payoutPct";

    pub const PO_LUCK_PCT: &str = "poLuckPct";
    pub const PO_LUCK_DIRECTION: &str = "poLuckDirection";
    pub const PO_DELTA_RTP_PP: &str = "po_deltaRtp_pp";
    pub const PO_EV_PER_1000G: &str = "po_EV_per1000G";
    pub const PO_SIGMA_SPIN: &str = "po_sigmaSpin";
    pub const PO_SIGMA_SOURCE: &str = "po_sigmaSource";
    pub const PO_RTP_OBS: &str = "po_rtpObs";
    pub const PO_LUCK_Z: &str = "poLuckZ";

    pub const LUCK_PCT: &str = "luckPct";
    pub const LUCK_DIRECTION: &str = "luckDirection";
    pub const LUCK_DELTA_RTP_PP: &str = "luck_deltaRtp_pp";
    pub const LUCK_EV_PER_1000G: &str = "luck_EV_per1000G";
    pub const LUCK_SIGMA_SPIN: &str = "luck_sigmaSpin";

    pub const TS_LUCK_PCT: &str = "tsLuckPct";
    pub const TS_LUCK_DIRECTION: &str = "tsLuckDirection";
    pub const TS_LUCK_Z: &str = "tsLuckZ";

    pub const TY_LUCK_PCT: &str = "tyLuckPct";
    pub const TY_LUCK_DIRECTION: &str = "tyLuckDirection";
    pub const TY_LUCK_Z: &str = "tyLuckZ";

    pub const RATIO: &str = "ratio";
    pub const SHRINK: &str = "shrink";
    pub const ZSCORE: &str = "zscore";
}

/// Per-spin first-hit probability derived from the session.
///
/// Counts win over a directly supplied rate: `firstHitCount` (or
/// `firstHits`) over `normalSpins` when the spin count is positive and the
/// hit count is non-negative. Otherwise `firstHitRate` is read as a
/// probability when in (0, 1] or as a "1 in N" denominator when above 1.
#[must_use]
pub fn derive_first_hit_probability(session: &SessionObservation) -> Option<f64> {
    let spins = positive(session.get(SessionField::NormalSpins));
    let hits = session
        .first_of(FIRST_HIT_COUNT_SOURCES)
        .filter(|h| *h >= 0.0);
    if let (Some(spins), Some(hits)) = (spins, hits) {
        return Some(hits / spins);
    }
    let rate = positive(session.get(SessionField::FirstHitRate))?;
    Some(if rate <= 1.0 { rate } else { 1.0 / rate })
}

/// Observed payout percentage, `None` without a positive spin count.
///
/// A missing coin delta counts as break-even.
#[must_use]
pub fn payout_percent(session: &SessionObservation) -> Option<f64> {
    let spins = positive(session.first_of(TOTAL_SPINS_SOURCES))?;
    let bet = bet_per_spin(session);
    let delta = session.get(SessionField::DiffCoins).unwrap_or(0.0);
    let coins_in = bet * spins;
    safe_div(coins_in + delta, coins_in).map(|ratio| ratio * 100.0)
}

/// Bayesian mean `(hits + k·m) / (bets + k)`; `None` for a non-positive denominator.
#[must_use]
pub fn bayes_mean(hits: f64, bets: f64, prior_mean: f64, prior_strength: f64) -> Option<f64> {
    let denominator = bets + prior_strength;
    if !denominator.is_finite() || denominator <= 0.0 {
        return None;
    }
    finite(Some((hits + prior_strength * prior_mean) / denominator))
}

fn bet_per_spin(session: &SessionObservation) -> f64 {
    positive(session.get(SessionField::BetPerSpin)).unwrap_or(DEFAULT_BET_PER_SPIN)
}

/// Baseline payout as a ratio: session override, machine baseline, then 100%.
fn baseline_payout_ratio(machine: &MachineRecord, session: &SessionObservation) -> f64 {
    let pct = positive(session.get(SessionField::RtpBasePct))
        .or_else(|| positive(machine.baseline().payout_percent_baseline))
        .unwrap_or(DEFAULT_PAYOUT_BASELINE_PCT);
    pct / 100.0
}

/// Compute every indicator for one session.
#[must_use]
pub fn compute_outputs(machine: &MachineRecord, session: &SessionObservation) -> OutputMap {
    let mut out = OutputMap::new();
    let baseline = machine.baseline();

    let derived_p = derive_first_hit_probability(session);
    debug!(
        "{}: derived first-hit probability {:?}",
        machine.machine_id, derived_p
    );
    out.insert(keys::FIRST_HIT_RATE, derived_p);
    out.insert(
        keys::FIRST_HIT_DENOM,
        derived_p.and_then(|p| safe_div(1.0, p)),
    );

    out.insert(keys::PAYOUT_PCT, payout_percent(session));

    insert_payout_luck(&mut out, machine, session);

    let normal_spins = session.get(SessionField::NormalSpins);
    let first_hits = session.first_of(FIRST_HIT_COUNT_SOURCES);

    let hit_baseline = baseline.first_hit_probability.or(derived_p);
    let hit_luck = match (hit_baseline, normal_spins, first_hits) {
        (Some(p), Some(spins), Some(hits)) => evaluate_hit_luck(p, spins, hits),
        _ => LuckResult::neutral(0.0),
    };
    trace!("hit frequency luck: {hit_luck:?}");
    out.insert(keys::TS_LUCK_PCT, hit_luck.rarity_percent);
    out.insert(keys::TS_LUCK_DIRECTION, hit_luck.direction);
    out.insert(keys::TS_LUCK_Z, hit_luck.z_score);

    let avg_base = baseline
        .average_yield_baseline
        .or_else(|| session.get(SessionField::AvgCoinsBase));
    let avg_observed = session.first_of(OBSERVED_AVG_YIELD_SOURCES);
    let value_luck = match (avg_base, avg_observed, first_hits.filter(|h| *h > 0.0)) {
        (Some(base), Some(observed), Some(hits)) => {
            let sigma_hit = resolve_hit_sigma(
                session.get(SessionField::SigmaHit),
                baseline.coin_unit_price_yen,
                positive(session.get(SessionField::KHit)),
            );
            evaluate_hit_value_luck(base, observed, hits, sigma_hit)
        }
        _ => LuckResult::neutral(0.0),
    };
    trace!("hit value luck: {value_luck:?}");
    out.insert(keys::TY_LUCK_PCT, value_luck.rarity_percent);
    out.insert(keys::TY_LUCK_DIRECTION, value_luck.direction);
    out.insert(keys::TY_LUCK_Z, value_luck.z_score);

    insert_legacy_fields(&mut out, machine, session);
    out
}

fn insert_payout_luck(out: &mut OutputMap, machine: &MachineRecord, session: &SessionObservation) {
    let baseline = machine.baseline();
    let sigma = resolve_spin_sigma_traced(&SpinSigmaInputs {
        explicit: session.get(SessionField::CustomSigma),
        preset: session.preset(),
        machine_default: baseline.sigma_spin_default,
        coin_unit_price_yen: baseline.coin_unit_price_yen,
        scale_factor: None,
    });
    debug!(
        "{}: spin sigma {} from {}",
        machine.machine_id, sigma.value, sigma.source
    );

    let args = PayoutLuckArgs {
        baseline_ratio: baseline_payout_ratio(machine, session),
        spin_count: session.first_of(TOTAL_SPINS_SOURCES),
        bet_per_spin: Some(bet_per_spin(session)),
        coin_delta: session.get(SessionField::DiffCoins),
        coin_in: session.get(SessionField::CoinIn),
        coin_out: session.get(SessionField::CoinOut),
        sigma_per_spin: sigma.value,
    };
    let payout = evaluate_payout_luck(&args);
    trace!("payout luck: {payout:?}");

    out.insert(keys::PO_LUCK_PCT, payout.rarity_percent);
    out.insert(keys::PO_LUCK_DIRECTION, payout.direction);
    out.insert(keys::PO_DELTA_RTP_PP, payout.delta_from_baseline);
    out.insert(keys::PO_EV_PER_1000G, payout.ev_per_1000_spins);
    out.insert(keys::PO_SIGMA_SPIN, payout.sigma_used);
    out.insert(keys::PO_SIGMA_SOURCE, sigma.source.as_str());
    out.insert(keys::PO_RTP_OBS, payout.observed_value.map(|r| r * 100.0));
    out.insert(keys::PO_LUCK_Z, payout.z_score);

    out.insert(keys::LUCK_PCT, payout.rarity_percent);
    out.insert(keys::LUCK_DIRECTION, payout.direction);
    out.insert(keys::LUCK_DELTA_RTP_PP, payout.delta_from_baseline);
    out.insert(keys::LUCK_EV_PER_1000G, payout.ev_per_1000_spins);
    out.insert(keys::LUCK_SIGMA_SPIN, payout.sigma_used);
}

/// Compatibility values derived from the machine's legacy scoring params.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LegacyScores {
    pub ratio: Option<f64>,
    pub shrink: Option<f64>,
    pub zscore: Option<f64>,
}

/// Raw ratio, shrunk ratio and baseline z-score.
///
/// A missing numerator or denominator makes the dependent value `None`.
#[must_use]
pub fn legacy_scores(params: &ScoringParams, session: &SessionObservation) -> LegacyScores {
    let hits = session.by_key(&params.numerator_key);
    let bets = session.by_key(&params.denominator_key);

    let ratio = hits.zip(bets).and_then(|(h, b)| safe_div(h, b));
    let shrink = hits
        .zip(bets)
        .and_then(|(h, b)| bayes_mean(h, b, params.prior_mean, params.prior_strength));

    let target = match params.target_key.as_deref() {
        Some(key) => session.by_key(key),
        None => ratio,
    };
    let zscore = match (target, finite(params.baseline_mean), positive(params.baseline_std)) {
        (Some(value), Some(mean), Some(std)) => Some((value - mean) / std),
        _ => None,
    };
    LegacyScores {
        ratio,
        shrink,
        zscore,
    }
}

fn insert_legacy_fields(
    out: &mut OutputMap,
    machine: &MachineRecord,
    session: &SessionObservation,
) {
    let scoring = machine.scoring();
    let legacy = legacy_scores(&scoring.params, session);
    for def in &machine.io.outputs {
        match def.key.as_str() {
            keys::RATIO => {
                let value = if scoring.method == ScoringMethod::Shrinkage {
                    legacy.shrink
                } else {
                    legacy.ratio
                };
                out.insert(keys::RATIO, value);
            }
            keys::SHRINK => out.insert(keys::SHRINK, legacy.shrink),
            keys::ZSCORE => out.insert(keys::ZSCORE, legacy.zscore),
            other => out.insert_missing(other, None::<f64>),
        }
    }
}
