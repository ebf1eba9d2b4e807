// src/graph/timing.rs

use std::time::Duration;

const ONE_SECOND_NS: u128 = 1_000_000_000;
const ONE_MINUTE_NS: u128 = 60 * ONE_SECOND_NS;
const ONE_HOUR_NS: u128 = 60 * ONE_MINUTE_NS;
const ONE_DAY_NS: u128 = 24 * ONE_HOUR_NS;

/// Render a duration the way the task lifecycle logs expect it: the largest
/// sensible unit bucket, e.g. `412ns`, `3.2us`, `1.5ms`, `2.4s`, `3m 12s`,
/// `1h 2m 3s`, `2d 4h 10m`.
pub fn format_duration(d: Duration) -> String {
    let nanos = d.as_nanos();

    if nanos > ONE_DAY_NS {
        let days = nanos / ONE_DAY_NS;
        let hours = (nanos % ONE_DAY_NS) / ONE_HOUR_NS;
        let minutes = (nanos % ONE_HOUR_NS) / ONE_MINUTE_NS;
        return format!("{days}d {hours}h {minutes}m");
    }
    if nanos > ONE_HOUR_NS {
        let hours = nanos / ONE_HOUR_NS;
        let minutes = (nanos % ONE_HOUR_NS) / ONE_MINUTE_NS;
        let seconds = (nanos % ONE_MINUTE_NS) / ONE_SECOND_NS;
        return format!("{hours}h {minutes}m {seconds}s");
    }
    if nanos > ONE_MINUTE_NS {
        let minutes = nanos / ONE_MINUTE_NS;
        let seconds = (nanos % ONE_MINUTE_NS) / ONE_SECOND_NS;
        return format!("{minutes}m {seconds}s");
    }
    if nanos > ONE_SECOND_NS {
        return format!("{:.1}s", nanos as f64 / ONE_SECOND_NS as f64);
    }
    if nanos > 1_000_000 {
        return format!("{:.1}ms", nanos as f64 / 1_000_000.0);
    }
    if nanos > 1_000 {
        return format!("{:.1}us", nanos as f64 / 1_000.0);
    }

    format!("{nanos}ns")
}
