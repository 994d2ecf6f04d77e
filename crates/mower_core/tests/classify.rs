use mower_core::{
    classify, Activity, CycleKind, SignalSnapshot, Signal, CHARGING_FLOOR_WATTS,
    DOCKED_FLOOR_WATTS, ERROR_CEILING_WATTS,
};

#[test]
fn test_boundary_values() {
    assert_eq!(classify(0.0, false), Activity::Error);
    assert_eq!(classify(2.0, false), Activity::Docked);
    assert_eq!(classify(1.999, false), Activity::Mowing);
    assert_eq!(classify(3.0, false), Activity::Charging);
    assert_eq!(classify(5.0, true), Activity::Error);
}

#[test]
fn test_named_thresholds_are_ordered() {
    assert!(ERROR_CEILING_WATTS < DOCKED_FLOOR_WATTS);
    assert!(DOCKED_FLOOR_WATTS < CHARGING_FLOOR_WATTS);
    assert_eq!(classify(DOCKED_FLOOR_WATTS, false), Activity::Docked);
    assert_eq!(classify(CHARGING_FLOOR_WATTS, false), Activity::Charging);
}

#[test]
fn test_activity_serializes_lowercase() {
    let json = serde_json::to_string(&[Activity::Docked, Activity::Charging]).unwrap();
    assert_eq!(json, r#"["docked","charging"]"#);
    let back: Activity = serde_json::from_str(r#""error""#).unwrap();
    assert_eq!(back, Activity::Error);
}

#[test]
fn test_cycle_kind_parses_both_spellings() {
    assert_eq!(CycleKind::parse("mowing_start"), Some(CycleKind::MowingStart));
    assert_eq!(
        CycleKind::parse("end_charging_cycle"),
        Some(CycleKind::ChargingStop)
    );
    assert_eq!(CycleKind::parse("lunch"), None);
}

#[test]
fn test_snapshot_serializes_availability() {
    let snapshot = SignalSnapshot::new(Signal::Unavailable, Signal::Available(true));
    let json = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(json["power_watts"], "unavailable");
    assert_eq!(json["switch_on"]["available"], true);
}
