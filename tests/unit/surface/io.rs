use super::*;
use std::path::PathBuf;

#[test]
fn png_round_trip_preserves_argb() {
    let dir = PathBuf::from("target").join("unit_surface_io");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("roundtrip.png");

    let s = PixelSurface::from_argb(2, 1, vec![0x80FF_0000, 0xFF00_FF00]).unwrap();
    save_surface(&s, &path).unwrap();

    let back = load_surface(&path).unwrap();
    assert_eq!(back, s);

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(decode_surface(&bytes).unwrap(), s);
}

#[test]
fn unknown_extension_is_an_error() {
    let s = PixelSurface::new(1, 1, 0xFF00_0000).unwrap();
    let err = save_surface(&s, PathBuf::from("target").join("nope.unknownext")).unwrap_err();
    assert!(err.to_string().contains("unsupported image file type"));
}

#[test]
fn missing_file_is_an_error() {
    assert!(load_surface("target/definitely-missing-image.png").is_err());
}
