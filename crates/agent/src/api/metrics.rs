use std::fmt::Write;

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;

use super::state::PatrolState;

pub async fn metrics(State(state): State<PatrolState>) -> impl IntoResponse {
    let mut body = String::with_capacity(1024);

    let _ = writeln!(
        body,
        "# HELP labelguard_exploding_label_distinct_values Distinct value count for labels identified as exploding"
    );
    let _ = writeln!(body, "# TYPE labelguard_exploding_label_distinct_values gauge");
    for ((metric, label), distinct) in state.exploding_snapshot() {
        let _ = writeln!(
            body,
            "labelguard_exploding_label_distinct_values{{metric_name=\"{}\",label_name=\"{}\"}} {distinct}",
            escape_label(&metric),
            escape_label(&label),
        );
    }

    write_counter(&mut body, "labelguard_patrol_passes_total", state.passes());
    write_counter(
        &mut body,
        "labelguard_patrol_pass_failures_total",
        state.pass_failures(),
    );
    write_counter(
        &mut body,
        "labelguard_rules_applied_total",
        state.rules_applied(),
    );
    write_gauge(
        &mut body,
        "labelguard_consecutive_pass_failures",
        state.consecutive_failures(),
    );

    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}

fn write_counter(out: &mut String, name: &str, val: u64) {
    let _ = writeln!(out, "# TYPE {name} counter");
    let _ = writeln!(out, "{name} {val}");
}

fn write_gauge(out: &mut String, name: &str, val: u64) {
    let _ = writeln!(out, "# TYPE {name} gauge");
    let _ = writeln!(out, "{name} {val}");
}

fn escape_label(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
