use super::*;

#[test]
fn decomposes_channels() {
    let c = 0x80_11_22_33;
    assert_eq!(alpha(c), 0x80);
    assert_eq!(red(c), 0x11);
    assert_eq!(green(c), 0x22);
    assert_eq!(blue(c), 0x33);
}

#[test]
fn make_rgb_forces_opaque_alpha() {
    let mut w = WarningLog::new(true, 8);
    assert_eq!(make_rgb(0x55, 0x55, 0x55, &mut w), 0xFF55_5555);
    assert_eq!(w.total(), 0);
}

#[test]
fn out_of_range_channels_are_clamped_and_reported() {
    let mut w = WarningLog::new(true, 8);
    assert_eq!(make_rgb(-4, 300, 10, &mut w), 0xFF00_FF0A);
    assert_eq!(w.total(), 2);
    assert!(w.entries()[0].contains("red"));
    assert!(w.entries()[1].contains("green"));
}

#[test]
fn clamping_happens_even_with_warnings_disabled() {
    let mut w = WarningLog::disabled();
    assert_eq!(make_argb(512, 1, 2, 3, &mut w), 0xFF01_0203);
    assert_eq!(w.total(), 0);
}

#[test]
fn limit_bounds_both_sides() {
    assert_eq!(limit(-5, 0, 10), 0);
    assert_eq!(limit(15, 0, 10), 10);
    assert_eq!(limit(7, 0, 10), 7);
}
