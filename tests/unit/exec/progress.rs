use super::*;

#[test]
fn out_of_range_reports_are_clamped() {
    assert_eq!(percent(-5, 10), Some(0));
    assert_eq!(percent(15, 10), Some(100));
    assert_eq!(percent(1, 3), Some(33));
}

#[test]
fn large_totals_do_not_overflow() {
    assert_eq!(percent(i32::MAX - 1, i32::MAX), Some(99));
    assert_eq!(percent(i32::MAX, i32::MAX), Some(100));
}

#[test]
fn non_positive_total_is_ignored_with_warning() {
    let mut w = WarningLog::new(true, 4);
    let mut t = ProgressTracker::new();
    assert_eq!(t.update(1, 0, &mut w), None);
    assert_eq!(t.update(1, -3, &mut w), None);
    assert_eq!(w.total(), 2);
    assert_eq!(t.last(), 0);
}

#[test]
fn tracker_only_reports_increases() {
    let mut w = WarningLog::disabled();
    let mut t = ProgressTracker::new();
    assert_eq!(t.update(1, 4, &mut w), Some(25));
    assert_eq!(t.update(1, 4, &mut w), None);
    assert_eq!(t.update(0, 4, &mut w), None);
    assert_eq!(t.update(3, 4, &mut w), Some(75));
    assert_eq!(t.finish(), 100);
    assert_eq!(t.last(), 100);
}

#[test]
fn completion_reports_are_held_at_99() {
    let mut w = WarningLog::disabled();
    let mut t = ProgressTracker::new();
    assert_eq!(t.update(1, 1, &mut w), Some(99));
    assert_eq!(t.update(15, 10, &mut w), None);
    assert_eq!(t.last(), 99);
    assert_eq!(t.finish(), 100);
}
