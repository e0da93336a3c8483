use chrono::Duration;

/// Formats elapsed time the way the shell shows it: `DD:HH:MM:SS`. Days keep growing past two
/// digits. Negative totals, which only a clock moving backwards can produce, get a leading `-`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let sign = if elapsed < Duration::zero() { "-" } else { "" };
    let total = elapsed.num_seconds().unsigned_abs();
    let days = total / 86_400;
    let hours = total % 86_400 / 3_600;
    let minutes = total % 3_600 / 60;
    let seconds = total % 60;
    format!("{sign}{days:02}:{hours:02}:{minutes:02}:{seconds:02}")
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::format_elapsed;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::zero()), "00:00:00:00");
        assert_eq!(format_elapsed(Duration::seconds(75)), "00:00:01:15");
        assert_eq!(
            format_elapsed(Duration::days(3) + Duration::hours(4) + Duration::seconds(5)),
            "03:04:00:05"
        );
        assert_eq!(format_elapsed(Duration::days(120)), "120:00:00:00");
        assert_eq!(format_elapsed(Duration::milliseconds(1999)), "00:00:00:01");
        assert_eq!(format_elapsed(Duration::seconds(-10)), "-00:00:00:10");
    }
}
