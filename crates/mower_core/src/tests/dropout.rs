use super::*;

#[test]
fn dropout_mid_mow_writes_nothing() {
    let mut harness = docked_harness();
    harness.power(1.0, 1);

    let events = harness.feed(None, Some("on"), 2);
    assert!(cycles(&events).is_empty());
    assert!(matches!(
        harness.tracker.state(),
        TrackerState::Suspended {
            last_known: Some(Activity::Mowing)
        }
    ));
    assert_eq!(harness.last_status.map(|s| s.available), Some(false));
}

#[test]
fn first_reading_after_dropout_is_not_an_edge() {
    let mut harness = docked_harness();
    harness.power(1.0, 1);
    harness.feed(None, Some("on"), 2);

    let resumed = harness.power(2.5, 3);
    assert!(resumed.is_empty());
    assert_eq!(harness.timestamps().mowing_stop, None);

    // Tracking continues normally from the resumed activity.
    let next = harness.power(1.0, 4);
    assert_eq!(cycles(&next), vec![CycleKind::MowingStart]);
}

#[test]
fn switch_off_and_missing_switch_both_suspend() {
    let mut harness = docked_harness();
    let off = harness.feed(Some("1.0"), Some("off"), 1);
    let missing = harness.feed(Some("1.0"), None, 2);
    for events in [off, missing] {
        assert!(events
            .iter()
            .all(|e| matches!(e.event, Event::EvaluationSuspended { .. })));
    }
    assert_eq!(harness.timestamps(), CycleTimestamps::default());
}

#[test]
fn unparseable_power_classifies_as_error_instead_of_suspending() {
    let mut harness = docked_harness();
    let events = harness.feed(Some("garbage"), Some("on"), 1);
    assert_eq!(
        harness.last_status.and_then(|s| s.activity),
        Some(Activity::Error)
    );
    assert!(events.iter().any(|e| matches!(
        e.event,
        Event::EdgeIgnored {
            from: Activity::Docked,
            to: Activity::Error
        }
    )));
}
