use std::time::Duration;

use tokio::time::Instant;

/// Number of firings in a window: the immediate one plus one per grid point
/// `start + k * interval` that does not pass `start + duration`.
pub fn firings_in_window(interval: Duration, duration: Duration) -> u64 {
    if interval.is_zero() {
        return 1;
    }
    let whole = duration.as_nanos() / interval.as_nanos();
    u64::try_from(whole).unwrap_or(u64::MAX).saturating_add(1)
}

/// Move `due` forward on its grid until it is no earlier than `now`.
///
/// Returns the new due instant and how many grid points were passed over.
pub fn advance_past(mut due: Instant, now: Instant, period: Duration) -> (Instant, u64) {
    if period.is_zero() {
        return (due.max(now), 0);
    }
    let mut skipped = 0;
    while due < now {
        let Some(next) = due.checked_add(period) else {
            break;
        };
        due = next;
        skipped += 1;
    }
    (due, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    #[test]
    fn test_firings_in_window() {
        assert_eq!(firings_in_window(3 * HOUR, 24 * HOUR), 9);
        assert_eq!(firings_in_window(5 * HOUR, 24 * HOUR), 5);
        assert_eq!(firings_in_window(HOUR, Duration::ZERO), 1);
        assert_eq!(firings_in_window(Duration::ZERO, HOUR), 1);
    }

    #[test]
    fn test_advance_past() {
        let start = Instant::now();
        let due = start + 3 * HOUR;

        assert_eq!(advance_past(due, start + HOUR, 3 * HOUR), (due, 0));
        assert_eq!(advance_past(due, due, 3 * HOUR), (due, 0));
        assert_eq!(
            advance_past(due, start + 7 * HOUR, 3 * HOUR),
            (start + 9 * HOUR, 2)
        );
    }
}
