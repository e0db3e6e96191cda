use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        PixError::source_error("x")
            .to_string()
            .contains("source error:")
    );
    assert!(
        PixError::general("x")
            .to_string()
            .contains("general error:")
    );
    assert!(
        PixError::out_of_memory("x")
            .to_string()
            .contains("out of memory:")
    );
    assert!(
        PixError::invalid_operation("x")
            .to_string()
            .contains("invalid operation:")
    );
}

#[test]
fn user_message_drops_the_prefix() {
    let err = PixError::source_error("line 1, column 9: illegal start of expression");
    assert_eq!(
        err.user_message(),
        "line 1, column 9: illegal start of expression"
    );
    assert_eq!(err.category(), ErrorCategory::SourceError);
    assert_eq!(err.category().title(), "Error in source");
}

#[test]
fn other_preserves_source_and_counts_as_general() {
    let base = std::io::Error::other("boom");
    let err = PixError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
    assert_eq!(err.category(), ErrorCategory::GeneralError);
}

#[test]
fn empty_input_is_its_own_category() {
    assert_eq!(PixError::EmptyInput.category(), ErrorCategory::EmptyInput);
    assert!(PixError::EmptyInput.user_message().contains("Nothing to do"));
}
