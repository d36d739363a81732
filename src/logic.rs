//! Pure irrigation decision functions.
//!
//! Every function here is stateless: explicit numeric and time inputs in,
//! a value out.  No I/O, no shared state, no clock reads — the controller
//! supplies elapsed durations measured against its own monotonic
//! timestamps.  This keeps the whole decision surface unit-testable as a
//! truth table.

use std::time::Duration;

use crate::history::ReadingHistory;

/// Number of newest samples the moisture filter averages over.
pub const FILTER_WINDOW: usize = 5;

/// Consecutive low filtered readings required before watering starts.
pub const MIN_CONSECUTIVE_LOW: u32 = 3;

/// Seconds of watering before the stagnation heuristic may fire.
pub const STAGNATION_GRACE_SECS: u64 = 10;

/// Minimum acceptable moisture rise (%/min) while watering; anything
/// slower past the grace period is treated as a probable pump fault.
pub const STAGNATION_RATE_PCT_PER_MIN: f64 = 0.5;

/// A reading is plausible if it lies within `[-5, 105]` percent.  The
/// margin beyond `[0, 100]` tolerates sensor calibration drift without
/// rejecting usable data.
pub fn is_reading_valid(moisture: f64) -> bool {
    (-5.0..=105.0).contains(&moisture)
}

/// Sliding arithmetic mean over the newest `min(5, len)` readings.
/// Returns `0.0` for an empty history.  No weighting, no exponential
/// smoothing — just enough to knock down single-sample noise.
pub fn filtered_moisture(history: &ReadingHistory) -> f64 {
    if history.is_empty() {
        return 0.0;
    }
    let skip = history.len().saturating_sub(FILTER_WINDOW);
    let mut sum = 0.0;
    let mut count = 0u32;
    for r in history.iter().skip(skip) {
        sum += r.moisture_percent;
        count += 1;
    }
    sum / f64::from(count)
}

/// Moisture change rate in percent per minute over the full history span.
///
/// `None` when fewer than two samples exist, when either endpoint is
/// invalid, or when the span truncates to zero whole minutes.  Elapsed
/// time is truncated to whole minutes, so a 90-second span counts as one.
pub fn moisture_change_rate(history: &ReadingHistory) -> Option<f64> {
    if history.len() < 2 {
        return None;
    }
    let oldest = history.oldest()?;
    let newest = history.newest()?;
    if !oldest.is_valid || !newest.is_valid {
        return None;
    }

    let elapsed_minutes = newest
        .timestamp
        .saturating_duration_since(oldest.timestamp)
        .as_secs()
        / 60;
    if elapsed_minutes == 0 {
        return None;
    }

    let diff = newest.moisture_percent - oldest.moisture_percent;
    Some(diff / elapsed_minutes as f64)
}

/// Whether an automatic watering cycle should begin.
///
/// All conditions must hold: filtered moisture strictly below the low
/// threshold, at least [`MIN_CONSECUTIVE_LOW`] back-to-back low readings,
/// and the minimum re-watering interval elapsed.
pub fn should_start_watering(
    filtered_moisture: f64,
    threshold: f64,
    consecutive_low_readings: u32,
    time_since_last_watering: Duration,
    min_interval_minutes: u64,
) -> bool {
    if filtered_moisture >= threshold {
        return false;
    }
    if consecutive_low_readings < MIN_CONSECUTIVE_LOW {
        return false;
    }
    if time_since_last_watering.as_secs() / 60 < min_interval_minutes {
        return false;
    }
    true
}

/// Whether an active watering cycle should end.
///
/// Any one condition suffices: the high (target) threshold was reached,
/// the maximum duration elapsed, or moisture is stagnating past the grace
/// period — the last of these suggests a pump failure rather than
/// success.  The caller distinguishes the cases when classifying the
/// outcome.
pub fn should_stop_watering(
    filtered_moisture: f64,
    target_moisture: f64,
    watering_duration: Duration,
    max_watering_seconds: u64,
    moisture_change_rate: Option<f64>,
) -> bool {
    // Success: target reached
    if filtered_moisture >= target_moisture {
        return true;
    }
    // Timeout: max duration exceeded
    if watering_duration.as_secs() >= max_watering_seconds {
        return true;
    }
    // Stagnation: moisture not rising after the grace period
    if let Some(rate) = moisture_change_rate {
        if watering_duration.as_secs() > STAGNATION_GRACE_SECS && rate < STAGNATION_RATE_PCT_PER_MIN
        {
            return true;
        }
    }
    false
}

/// Whether the post-watering soak period has elapsed.
pub fn should_resume_monitoring(wait_duration: Duration, configured_wait_minutes: u64) -> bool {
    wait_duration.as_secs() / 60 >= configured_wait_minutes
}

/// Whether the controller may leave the Error state.
///
/// Requires a clean failure counter, the recovery interval elapsed, and a
/// currently valid reading.  Note the counter must be exactly zero: the
/// sensor-failure path that raises it to three never clears it while in
/// Error, so recovery through this gate is only reachable when Error was
/// entered with a clean counter (e.g. an emergency stop).
pub fn can_recover_from_error(
    consecutive_failures: u32,
    error_duration: Duration,
    recovery_interval_seconds: u64,
    last_reading_valid: bool,
) -> bool {
    if consecutive_failures > 0 {
        return false;
    }
    if error_duration.as_secs() < recovery_interval_seconds {
        return false;
    }
    if !last_reading_valid {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::SensorReading;
    use std::time::Instant;

    const MIN: Duration = Duration::from_secs(60);

    fn history_of(moistures: &[f64]) -> ReadingHistory {
        let mut h = ReadingHistory::new();
        for &m in moistures {
            h.push(SensorReading::capture(m));
        }
        h
    }

    /// History with explicit per-reading ages (oldest first).
    fn history_with_ages(entries: &[(f64, u64)]) -> ReadingHistory {
        let base = Instant::now();
        let mut h = ReadingHistory::new();
        for &(m, age_secs) in entries {
            let span = entries[0].1 - age_secs;
            h.push(SensorReading {
                moisture_percent: m,
                timestamp: base + Duration::from_secs(span),
                is_valid: is_reading_valid(m),
            });
        }
        h
    }

    // ── is_reading_valid ──────────────────────────────────────

    #[test]
    fn reading_valid_within_margin() {
        assert!(is_reading_valid(0.0));
        assert!(is_reading_valid(100.0));
        assert!(is_reading_valid(-5.0));
        assert!(is_reading_valid(105.0));
    }

    #[test]
    fn reading_invalid_beyond_margin() {
        assert!(!is_reading_valid(-5.1));
        assert!(!is_reading_valid(105.1));
    }

    // ── filtered_moisture ─────────────────────────────────────

    #[test]
    fn filtered_moisture_empty_is_zero() {
        assert_eq!(filtered_moisture(&ReadingHistory::new()), 0.0);
    }

    #[test]
    fn filtered_moisture_short_history_averages_all() {
        let h = history_of(&[20.0, 30.0, 40.0]);
        assert!((filtered_moisture(&h) - 30.0).abs() < 1e-9);
    }

    #[test]
    fn filtered_moisture_uses_newest_five_only() {
        let h = history_of(&[20.0, 25.0, 30.0, 35.0, 40.0, 45.0, 50.0]);
        assert!((filtered_moisture(&h) - 40.0).abs() < 1e-9);
    }

    #[test]
    fn filtered_moisture_single_entry() {
        let h = history_of(&[42.0]);
        assert!((filtered_moisture(&h) - 42.0).abs() < 1e-9);
    }

    // ── moisture_change_rate ──────────────────────────────────

    #[test]
    fn change_rate_rising_two_percent_per_minute() {
        let h = history_with_ages(&[(30.0, 600), (50.0, 0)]);
        assert_eq!(moisture_change_rate(&h), Some(2.0));
    }

    #[test]
    fn change_rate_falling_one_percent_per_minute() {
        let h = history_with_ages(&[(60.0, 1200), (40.0, 0)]);
        assert_eq!(moisture_change_rate(&h), Some(-1.0));
    }

    #[test]
    fn change_rate_needs_two_entries() {
        assert_eq!(moisture_change_rate(&history_of(&[50.0])), None);
        assert_eq!(moisture_change_rate(&ReadingHistory::new()), None);
    }

    #[test]
    fn change_rate_rejects_invalid_endpoint() {
        let h = history_with_ages(&[(150.0, 600), (50.0, 0)]);
        assert_eq!(moisture_change_rate(&h), None);
        let h = history_with_ages(&[(30.0, 600), (-20.0, 0)]);
        assert_eq!(moisture_change_rate(&h), None);
    }

    #[test]
    fn change_rate_zero_whole_minutes_is_none() {
        let h = history_with_ages(&[(30.0, 45), (50.0, 0)]);
        assert_eq!(moisture_change_rate(&h), None);
    }

    #[test]
    fn change_rate_truncates_to_whole_minutes() {
        // 90 s span counts as 1 minute.
        let h = history_with_ages(&[(30.0, 90), (40.0, 0)]);
        assert_eq!(moisture_change_rate(&h), Some(10.0));
    }

    #[test]
    fn change_rate_spans_full_history_not_filter_window() {
        let mut entries = vec![(20.0, 600)];
        for i in 1..=6u32 {
            entries.push((20.0 + f64::from(i) * 5.0, 600 - u64::from(i) * 100));
        }
        let h = history_with_ages(&entries);
        // (50 - 20) / 10 minutes
        assert_eq!(moisture_change_rate(&h), Some(3.0));
    }

    // ── should_start_watering ─────────────────────────────────

    #[test]
    fn start_watering_all_conditions_met() {
        assert!(should_start_watering(25.0, 30.0, 3, 60 * MIN, 30));
    }

    #[test]
    fn start_watering_above_threshold_refused() {
        assert!(!should_start_watering(35.0, 30.0, 3, 60 * MIN, 30));
    }

    #[test]
    fn start_watering_exactly_at_threshold_refused() {
        assert!(!should_start_watering(30.0, 30.0, 3, 60 * MIN, 30));
    }

    #[test]
    fn start_watering_insufficient_streak_refused() {
        assert!(!should_start_watering(25.0, 30.0, 2, 60 * MIN, 30));
    }

    #[test]
    fn start_watering_interval_too_short_refused() {
        assert!(!should_start_watering(25.0, 30.0, 3, 20 * MIN, 30));
    }

    // ── should_stop_watering ──────────────────────────────────

    #[test]
    fn stop_watering_target_met() {
        assert!(should_stop_watering(
            70.0,
            70.0,
            Duration::from_secs(60),
            300,
            None
        ));
    }

    #[test]
    fn stop_watering_timeout() {
        assert!(should_stop_watering(
            50.0,
            70.0,
            Duration::from_secs(301),
            300,
            None
        ));
    }

    #[test]
    fn stop_watering_stagnation() {
        assert!(should_stop_watering(
            50.0,
            70.0,
            Duration::from_secs(20),
            300,
            Some(0.3)
        ));
    }

    #[test]
    fn stop_watering_too_early_for_stagnation() {
        assert!(!should_stop_watering(
            50.0,
            70.0,
            Duration::from_secs(5),
            300,
            Some(0.1)
        ));
    }

    #[test]
    fn stop_watering_normal_progress_continues() {
        assert!(!should_stop_watering(
            50.0,
            70.0,
            Duration::from_secs(60),
            300,
            Some(1.5)
        ));
    }

    // ── should_resume_monitoring ──────────────────────────────

    #[test]
    fn resume_monitoring_after_wait() {
        assert!(should_resume_monitoring(15 * MIN, 15));
        assert!(should_resume_monitoring(16 * MIN, 15));
        assert!(!should_resume_monitoring(14 * MIN, 15));
    }

    #[test]
    fn resume_monitoring_zero_wait_is_immediate() {
        assert!(should_resume_monitoring(Duration::ZERO, 0));
    }

    // ── can_recover_from_error ────────────────────────────────

    #[test]
    fn recover_requires_all_three_conditions() {
        let interval = Duration::from_secs(300);
        assert!(can_recover_from_error(0, interval, 300, true));
        assert!(!can_recover_from_error(1, interval, 300, true));
        assert!(!can_recover_from_error(0, Duration::from_secs(299), 300, true));
        assert!(!can_recover_from_error(0, interval, 300, false));
    }
}
