use super::*;

#[test]
fn rgb_overloads_by_arity() {
    assert_eq!(resolve("rgb", 2).unwrap().id, BuiltinId::GetPixel);
    assert_eq!(resolve("rgb", 3).unwrap().id, BuiltinId::SetPixel);
    assert!(resolve("rgb", 1).is_none());
    assert!(is_known("rgb"));
}

#[test]
fn channel_names_cover_pixel_and_value_forms() {
    assert_eq!(resolve("red", 1).unwrap().id, BuiltinId::Red);
    assert_eq!(resolve("red", 2).unwrap().id, BuiltinId::PixelRed);
    assert_eq!(resolve("getB", 2).unwrap().id, BuiltinId::PixelBlue);
}

#[test]
fn math_functions_resolve_qualified_and_bare() {
    assert_eq!(resolve("Math.max", 2).unwrap().id, BuiltinId::Max);
    assert_eq!(resolve("max", 2).unwrap().id, BuiltinId::Max);
    assert_eq!(resolve("Math.round", 1).unwrap().ret, ReturnKind::Int);
}

#[test]
fn host_functions_are_not_reachable_through_math() {
    assert!(resolve("Math.setRGB", 3).is_none());
    assert!(!is_known("Math.width"));
    assert!(!is_known("System.exit"));
}

#[test]
fn constants() {
    assert_eq!(constant("Math.PI"), Some(std::f64::consts::PI));
    assert_eq!(constant("PI"), None);
}

#[test]
fn arity_matches_table() {
    assert_eq!(BuiltinId::MakeArgb.arity(), 4);
    assert_eq!(BuiltinId::Width.arity(), 0);
    assert_eq!(BuiltinId::SetProgress.name(), "setProgress");
}
