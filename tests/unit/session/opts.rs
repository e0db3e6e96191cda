use super::*;
use crate::foundation::error::ErrorCategory;

#[test]
fn empty_object_gives_defaults() {
    let opts = SessionOpts::from_reader("{}".as_bytes()).unwrap();
    assert_eq!(opts, SessionOpts::default());
    assert!(!opts.warnings);
    assert_eq!(opts.history().memory_budget_bytes, None);
}

#[test]
fn fields_flow_into_derived_opts() {
    let opts = SessionOpts::from_reader(
        r#"{ "warnings": true, "max_warnings": 3, "history_budget_bytes": 4096, "worker_stack_bytes": 1048576 }"#
            .as_bytes(),
    )
    .unwrap();
    assert_eq!(opts.history().memory_budget_bytes, Some(4096));
    let exec = opts.executor();
    assert!(exec.warnings);
    assert_eq!(exec.max_warnings, 3);
    assert_eq!(exec.stack_bytes, Some(1 << 20));
}

#[test]
fn unknown_fields_are_rejected() {
    let err = SessionOpts::from_reader(r#"{ "warning": true }"#.as_bytes()).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::GeneralError);
    assert!(err.user_message().contains("parse session options JSON"));
}

#[test]
fn missing_file_reports_path() {
    let err = SessionOpts::from_path("target/does-not-exist/opts.json").unwrap_err();
    assert!(err.user_message().contains("does-not-exist"));
}
