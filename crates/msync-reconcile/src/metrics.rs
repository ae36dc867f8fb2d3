//! Counter names emitted by the engine. Recording goes through the `metrics`
//! facade; whichever recorder the binary installs receives them.

pub const EVENTS_TOTAL: &str = "msync_events_total";
pub const EVENTS_DROPPED_TOTAL: &str = "msync_events_dropped_total";
pub const SWEEPS_TOTAL: &str = "msync_sweeps_total";
pub const RECORDS_TOTAL: &str = "msync_records_total";
pub const REMOTE_CALLS_TOTAL: &str = "msync_remote_calls_total";

/// Register descriptions with the installed recorder.
pub fn describe() {
    metrics::describe_counter!(EVENTS_TOTAL, "Inbound events by notification kind");
    metrics::describe_counter!(EVENTS_DROPPED_TOTAL, "Inbound events dropped, by reason");
    metrics::describe_counter!(SWEEPS_TOTAL, "Reconciliation sweeps by outcome");
    metrics::describe_counter!(RECORDS_TOTAL, "Per-record sweep results by state");
    metrics::describe_counter!(REMOTE_CALLS_TOTAL, "Orchestration API calls by op and result");
}

pub(crate) fn event(kind: &'static str) {
    metrics::counter!(EVENTS_TOTAL, "kind" => kind).increment(1);
}

pub(crate) fn event_dropped(reason: &'static str) {
    metrics::counter!(EVENTS_DROPPED_TOTAL, "reason" => reason).increment(1);
}

pub(crate) fn sweep(outcome: &'static str) {
    metrics::counter!(SWEEPS_TOTAL, "outcome" => outcome).increment(1);
}

pub(crate) fn record(state: &'static str, result: &'static str) {
    metrics::counter!(RECORDS_TOTAL, "state" => state, "result" => result).increment(1);
}

pub(crate) fn remote_call(op: &'static str, ok: bool) {
    let result = if ok { "ok" } else { "error" };
    metrics::counter!(REMOTE_CALLS_TOTAL, "op" => op, "result" => result).increment(1);
}
