use hikiluck_core::scoring::keys;
use hikiluck_core::{
    MachineKind, MachineRecord, ScoringSettings, SessionObservation, evaluate,
};

const HOKUTO: &str = include_str!("../../data/machines/hokuto-at/hokuto-at.json");
const JUGGLER: &str = include_str!("../../data/machines/juggler-a/juggler-a.json");
const HOKUTO_LUCKY: &str = include_str!("../../data/sessions/hokuto-lucky.json");
const HOKUTO_PARTIAL: &str = include_str!("../../data/sessions/hokuto-partial.json");
const JUGGLER_EVENING: &str = include_str!("../../data/sessions/juggler-evening.json");

fn juggler() -> MachineRecord {
    let mut record = MachineRecord::from_json(JUGGLER).expect("juggler parses");
    assert!(record.machine_id.is_empty());
    record.machine_id = "juggler-a".to_string();
    record.validate().expect("juggler validates");
    record
}

#[test]
fn fixtures_parse_and_infer_kind() {
    let hokuto = MachineRecord::load(HOKUTO).expect("hokuto parses");
    assert_eq!(hokuto.kind(), MachineKind::Feature);
    assert_eq!(hokuto.label(), "スマスロ北斗AT");
    let baseline = hokuto.baseline();
    assert_eq!(baseline.coin_unit_price_yen, Some(3.2));
    assert_eq!(baseline.payout_percent_baseline, Some(97.6));

    let juggler = juggler();
    assert_eq!(juggler.kind(), MachineKind::Normal);
    assert_eq!(juggler.baseline().sigma_spin_default, Some(18.0));
}

#[test]
fn lucky_feature_session_scores_up_everywhere() {
    let machine = MachineRecord::load(HOKUTO).expect("hokuto parses");
    let session = SessionObservation::from_json(HOKUTO_LUCKY).expect("session parses");
    let evaluation = evaluate(&machine, &session, &ScoringSettings::default());
    let out = &evaluation.outputs;

    let p = out.number(keys::FIRST_HIT_RATE).expect("derived p");
    assert!((p - 28.0 / 5_400.0).abs() < 1e-12);
    let denominator = out.number(keys::FIRST_HIT_DENOM).expect("denominator");
    assert!((denominator - 5_400.0 / 28.0).abs() < 1e-9);
    let payout = out.number(keys::PAYOUT_PCT).expect("payout");
    assert!((payout - 21_050.0 / 18_600.0 * 100.0).abs() < 1e-9);

    assert_eq!(out.tag(keys::PO_LUCK_DIRECTION), Some("up"));
    assert_eq!(out.tag(keys::PO_SIGMA_SOURCE), Some("preset"));
    assert_eq!(out.number(keys::PO_SIGMA_SPIN), Some(45.0));
    assert_eq!(out.tag(keys::TS_LUCK_DIRECTION), Some("up"));
    let ts_z = out.number(keys::TS_LUCK_Z).expect("hit z");
    assert!((ts_z - 1.85).abs() < 0.01, "ts z {ts_z}");
    assert_eq!(out.tag(keys::TY_LUCK_DIRECTION), Some("up"));
    let ty_z = out.number(keys::TY_LUCK_Z).expect("value z");
    assert!((ty_z - 90.0 / (128.0 / 28.0_f64.sqrt())).abs() < 1e-9);

    assert_eq!(evaluation.indicators.len(), 5);
    let cherry = evaluation
        .indicators
        .iter()
        .find(|row| row.key == "cherryRate")
        .expect("cherry row");
    assert!((cherry.value.expect("denominator") - 48.5).abs() < 1e-9);
    // Cherries more often than baseline on a lower-is-better benchmark.
    assert!(cherry.z.expect("z") < 0.0);
    assert_eq!(evaluation.index.contributors.len(), 5);
}

#[test]
fn partial_session_degrades_to_nulls_and_neutral_luck() {
    let machine = MachineRecord::load(HOKUTO).expect("hokuto parses");
    let session = SessionObservation::from_json(HOKUTO_PARTIAL).expect("session parses");
    assert_eq!(session.custom_sigma, None);
    let evaluation = evaluate(&machine, &session, &ScoringSettings::default());
    let out = &evaluation.outputs;

    assert!(out.is_unavailable(keys::PAYOUT_PCT));
    assert!(out.is_unavailable(keys::FIRST_HIT_RATE));
    assert_eq!(out.number(keys::PO_LUCK_PCT), Some(0.0));
    assert_eq!(out.tag(keys::PO_LUCK_DIRECTION), Some("flat"));
    assert_eq!(out.tag(keys::PO_SIGMA_SOURCE), Some("coin_price"));
    assert_eq!(out.number(keys::TY_LUCK_PCT), Some(0.0));
    assert!(out.is_unavailable(keys::TY_LUCK_Z));
    for key in ["totalSpins", "avgCoins", "cherryRate"] {
        assert!(out.contains_key(key), "declared output {key} missing");
    }

    let avg = evaluation
        .indicators
        .iter()
        .find(|row| row.key == "avgCoins")
        .expect("avg row");
    assert!((avg.score.expect("score") - (380.0 / 420.0 - 1.0)).abs() < 1e-12);
}

#[test]
fn normal_machine_uses_legacy_shrinkage_and_bonus_rates() {
    let machine = juggler();
    let session = SessionObservation::from_json(JUGGLER_EVENING).expect("session parses");
    let evaluation = evaluate(&machine, &session, &ScoringSettings::default());
    let out = &evaluation.outputs;

    let expected_shrink = (17.0 + 500.0 * 0.003_654) / 4_500.0;
    assert!((out.number(keys::RATIO).expect("ratio") - expected_shrink).abs() < 1e-12);
    assert!((out.number(keys::SHRINK).expect("shrink") - expected_shrink).abs() < 1e-12);
    assert!(out.is_unavailable("bonusTotal"));
    assert!((out.number(keys::PO_DELTA_RTP_PP).expect("delta") - 350.0 / 120.0).abs() < 1e-9);
    assert_eq!(out.tag(keys::PO_SIGMA_SOURCE), Some("machine_default"));

    let big = evaluation
        .indicators
        .iter()
        .find(|row| row.key == "bigRate")
        .expect("big row");
    let p0 = 1.0 / 273.1;
    let sigma = (p0 * (1.0 - p0) / 4_000.0_f64).sqrt();
    assert!((big.z.expect("z") - (17.0 / 4_000.0 - p0) / sigma).abs() < 1e-9);
    assert!((big.value.expect("denominator") - 4_000.0 / 17.0).abs() < 1e-9);
}
