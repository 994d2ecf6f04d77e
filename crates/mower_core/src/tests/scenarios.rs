use super::*;

#[test]
fn docked_mowing_docked_records_one_start_and_one_stop() {
    let mut harness = docked_harness();
    let mut events = harness.power(1.2, 10);
    events.extend(harness.power(1.4, 20));
    events.extend(harness.power(2.4, 70));

    assert_eq!(
        cycles(&events),
        vec![CycleKind::MowingStart, CycleKind::MowingStop]
    );
    let stamps = harness.timestamps();
    let start = stamps.mowing_start.unwrap();
    let stop = stamps.mowing_stop.unwrap();
    assert_eq!(start, at(10));
    assert_eq!(stop, at(70));
    assert!(start < stop);
}

#[test]
fn docked_charging_mowing_stops_charge_and_starts_mow_on_one_edge() {
    let mut harness = docked_harness();
    let charging = harness.power(4.0, 5);
    assert_eq!(cycles(&charging), vec![CycleKind::ChargingStart]);

    let mowing = harness.power(1.0, 65);
    assert_eq!(
        cycles(&mowing),
        vec![CycleKind::ChargingStop, CycleKind::MowingStart]
    );
    let stamps = harness.timestamps();
    assert_eq!(stamps.charging_start, Some(at(5)));
    assert_eq!(stamps.charging_stop, Some(at(65)));
    assert_eq!(stamps.mowing_start, Some(at(65)));
    assert_eq!(stamps.mowing_stop, None);
}

#[test]
fn mowing_error_docked_stops_once_and_clears_stuck() {
    let mut harness = docked_harness();
    harness.power(1.0, 1);

    let mut events = harness.power(0.0, 30);
    assert!(harness.stuck(), "power loss while mowing raises stuck");
    // Error persists across several readings, including power back in the mowing band.
    events.extend(harness.power(0.0, 31));
    events.extend(harness.power(1.3, 32));
    events.extend(harness.power(-1.0, 33));
    assert!(cycles(&events).is_empty());

    events.extend(harness.power(2.5, 90));
    assert_eq!(cycles(&events), vec![CycleKind::MowingStop]);
    assert!(!harness.stuck());
    assert_eq!(harness.timestamps().mowing_stop, Some(at(90)));
    assert_eq!(count(&events, &Event::StuckRaised), 1);
    assert_eq!(count(&events, &Event::StuckReleased), 1);
    assert_eq!(
        harness.last_status.map(|s| s.activity),
        Some(Some(Activity::Docked))
    );
}

#[test]
fn error_straight_to_charging_records_stop_and_charge_start() {
    let mut harness = docked_harness();
    harness.power(1.0, 1);
    harness.power(0.0, 2);
    let events = harness.power(5.0, 3);
    assert_eq!(
        cycles(&events),
        vec![CycleKind::MowingStop, CycleKind::ChargingStart]
    );
    assert!(!harness.stuck());
}

#[test]
fn charging_to_docked_only_stops_charging() {
    let mut harness = docked_harness();
    harness.power(3.2, 1);
    let events = harness.power(2.2, 2);
    assert_eq!(cycles(&events), vec![CycleKind::ChargingStop]);
}

#[test]
fn same_reading_twice_has_no_second_effect() {
    let mut harness = docked_harness();
    let first = harness.power(1.0, 1);
    let second = harness.power(1.0, 2);
    assert_eq!(cycles(&first), vec![CycleKind::MowingStart]);
    assert!(second.is_empty());
}

#[test]
fn classify_is_deterministic_over_a_sweep() {
    let mut power = -5.0_f64;
    while power < 10.0 {
        for stuck in [false, true] {
            assert_eq!(classify(power, stuck), classify(power, stuck));
        }
        power += 0.125;
    }
}
