use hikiluck_core::scoring::keys;
use hikiluck_core::{
    Direction, MachineRecord, OutputValue, SessionField, SessionObservation, compute_outputs,
    evaluate_hit_luck, resolve_spin_sigma,
};

fn bare_machine() -> MachineRecord {
    MachineRecord::load(r#"{ "machineId": "scenario" }"#).expect("valid machine")
}

#[test]
fn expected_hit_count_is_flat_and_typical() {
    let result = evaluate_hit_luck(0.005, 10_000.0, 50.0);
    assert_eq!(result.direction, Direction::Flat);
    assert!(
        result.rarity_percent < 1e-3,
        "rarity {}",
        result.rarity_percent
    );
}

#[test]
fn thirty_extra_hits_are_extremely_rare() {
    let result = evaluate_hit_luck(0.005, 10_000.0, 80.0);
    let sigma = (10_000.0_f64 * 0.005 * 0.995).sqrt();
    assert!((result.sigma_used - sigma).abs() < 1e-12);
    assert!((sigma - 7.054).abs() < 1e-3);
    let z = result.z_score.expect("z computed");
    assert!((z - 4.25).abs() < 0.01, "z {z}");
    assert_eq!(result.direction, Direction::Up);
    assert!(result.rarity_percent > 99.9);
}

#[test]
fn coin_price_sigma_scales_by_ten() {
    let sigma = resolve_spin_sigma(None, None, None, Some(3.0), Some(10.0));
    assert!((sigma - 30.0).abs() < 1e-12);
}

#[test]
fn sigma_without_any_source_is_thirty() {
    let sigma = resolve_spin_sigma(None, None, None, None, None);
    assert!((sigma - 30.0).abs() < f64::EPSILON);
}

#[test]
fn zero_delta_session_breaks_even_exactly() {
    let session = SessionObservation::from_json(r#"{"totalSpins": 5000, "diffCoins": 0}"#)
        .expect("session parses");
    let out = compute_outputs(&bare_machine(), &session);
    assert_eq!(out.number(keys::PAYOUT_PCT), Some(100.0));

    let explicit_bet = session.with(SessionField::BetPerSpin, 3.0);
    let out = compute_outputs(&bare_machine(), &explicit_bet);
    assert_eq!(out.number(keys::PAYOUT_PCT), Some(100.0));
}

#[test]
fn missing_first_hit_sources_stay_null() {
    let session = SessionObservation::from_json(r#"{"diffCoins": 120, "avgCoins": 300}"#)
        .expect("session parses");
    let out = compute_outputs(&bare_machine(), &session);
    for key in [keys::FIRST_HIT_RATE, keys::FIRST_HIT_DENOM] {
        assert_eq!(out.get(key), Some(&OutputValue::Unavailable), "{key}");
        assert_ne!(out.number(key), Some(0.0));
    }
    let json = serde_json::to_value(&out).expect("serializes");
    assert!(json["firstHitRate"].is_null());
    assert!(json["firstHitDenom"].is_null());
    assert!(json["tsLuckZ"].is_null());
    assert_eq!(json["tsLuckDirection"], "flat");
}
