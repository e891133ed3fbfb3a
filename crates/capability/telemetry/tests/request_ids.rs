use greenhouse_telemetry::{
    metrics, new_request_ids, record_alarm_raised, record_evaluation_latency_ms, request_ids_from,
};

#[test]
fn request_ids_non_empty() {
    let ids = new_request_ids();
    assert!(!ids.request_id.is_empty());
    assert!(!ids.trace_id.is_empty());
    assert_ne!(ids.request_id, ids.trace_id);
}

#[test]
fn upstream_request_id_is_reused_when_valid() {
    let ids = request_ids_from(Some(" gw-7f3a "));
    assert_eq!(ids.request_id, "gw-7f3a");

    for bad in ["", "has space", "\u{4e2d}"] {
        let ids = request_ids_from(Some(bad));
        assert_ne!(ids.request_id, bad);
        assert!(!ids.request_id.is_empty());
    }
    let long = "x".repeat(129);
    assert_ne!(request_ids_from(Some(&long)).request_id, long);
}

#[test]
fn counters_accumulate() {
    let before = metrics().snapshot();
    record_alarm_raised();
    record_evaluation_latency_ms(7);
    let after = metrics().snapshot();
    assert!(after.alarms_raised >= before.alarms_raised + 1);
    assert!(after.evaluation_latency_ms_total >= before.evaluation_latency_ms_total + 7);
    assert!(after.evaluation_latency_ms_count >= before.evaluation_latency_ms_count + 1);
}
