use super::*;
use std::time::Duration;

#[test]
fn fake_clock_starts_at_epoch() {
    let clock = FakeClock::new();
    assert_eq!(clock.now(), DateTime::UNIX_EPOCH);
}

#[test]
fn fake_clock_advances_monotonically() {
    let clock = FakeClock::new();
    let t0 = clock.now();
    clock.advance(Duration::from_secs(5));
    let t1 = clock.now();
    assert!(t1 > t0);
    assert_eq!((t1 - t0).num_seconds(), 5);
}

#[test]
fn fake_clock_set_overrides_value() {
    let clock = FakeClock::new();
    let target = DateTime::UNIX_EPOCH + chrono::Duration::days(1);
    clock.set(target);
    assert_eq!(clock.now(), target);
}

#[test]
fn system_clock_reports_plausible_time() {
    let clock = SystemClock;
    // Sanity check only: later than this file's epoch baseline.
    assert!(clock.now() > DateTime::UNIX_EPOCH + chrono::Duration::days(365 * 50));
}
