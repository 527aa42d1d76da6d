use gw_telemetry::{
    metrics, new_cycle_id, record_cycle_duration_ms, record_event_rejected_busy, record_tick,
};

#[test]
fn cycle_ids_are_unique() {
    let first = new_cycle_id();
    let second = new_cycle_id();
    assert!(!first.is_empty());
    assert_ne!(first, second);
}

#[test]
fn counters_only_grow() {
    let before = metrics().snapshot();
    record_tick();
    record_event_rejected_busy();
    record_cycle_duration_ms(40);
    let after = metrics().snapshot();

    assert!(after.ticks >= before.ticks + 1);
    assert!(after.events_rejected_busy >= before.events_rejected_busy + 1);
    assert!(after.cycle_duration_ms_total >= before.cycle_duration_ms_total + 40);
    assert!(after.cycle_duration_ms_count >= before.cycle_duration_ms_count + 1);
}
