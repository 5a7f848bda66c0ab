/// Rest clock display: `m:ss`
pub fn rest_clock(remaining_ms: u64) -> String {
    let minutes = remaining_ms / 60_000;
    let seconds = (remaining_ms % 60_000) / 1000;
    format!("{}:{:02}", minutes, seconds)
}

/// Compact workout clock: `ss`, `mm:ss`, or `h:mm:ss`
pub fn elapsed_clock(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{:02}:{:02}", minutes, seconds)
    } else {
        format!("{:02}", seconds)
    }
}

/// Duration as listed in the workout history
pub fn history_duration(total_secs: i64) -> String {
    if total_secs <= 0 {
        return "Unknown Duration".to_string();
    }

    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rest_clock_pads_seconds() {
        assert_eq!(rest_clock(120_000), "2:00");
        assert_eq!(rest_clock(90_000), "1:30");
        assert_eq!(rest_clock(9_000), "0:09");
        assert_eq!(rest_clock(0), "0:00");
    }

    #[test]
    fn elapsed_clock_grows_fields() {
        assert_eq!(elapsed_clock(5), "05");
        assert_eq!(elapsed_clock(65), "01:05");
        assert_eq!(elapsed_clock(3_665), "1:01:05");
    }

    #[test]
    fn history_duration_variants() {
        assert_eq!(history_duration(0), "Unknown Duration");
        assert_eq!(history_duration(-4), "Unknown Duration");
        assert_eq!(history_duration(42), "42s");
        assert_eq!(history_duration(125), "2m 5s");
        assert_eq!(history_duration(3_725), "1h 2m 5s");
    }
}
