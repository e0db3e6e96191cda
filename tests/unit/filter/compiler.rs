use super::*;
use crate::foundation::error::ErrorCategory;

fn source_message(text: &str) -> String {
    match FilterCompiler::new().compile(text) {
        Err(PixError::Source(m)) => m,
        other => panic!("expected source error, got {other:?}"),
    }
}

#[test]
fn blank_input_is_empty_not_source_error() {
    let err = FilterCompiler::new().compile("  \n\t ").unwrap_err();
    assert_eq!(err.category(), ErrorCategory::EmptyInput);
}

#[test]
fn ids_strictly_increase_and_are_not_cached() {
    let c = FilterCompiler::new();
    let a = c.compile("int x = 1;").unwrap();
    let b = c.compile("int x = 1;").unwrap();
    assert!(b.id() > a.id());
    assert_eq!(a.snippet(), b.snippet());
}

#[test]
fn failed_compile_consumes_an_id() {
    let c = FilterCompiler::new();
    let a = c.compile("int x = 1;").unwrap();
    assert!(c.compile("int x = ;").is_err());
    let b = c.compile("int x = 1;").unwrap();
    assert!(b.id().get() >= a.id().get() + 2);
}

#[test]
fn diagnostics_use_snippet_coordinates() {
    assert_eq!(
        source_message("int x = ;"),
        "line 1, column 9: illegal start of expression"
    );
    assert_eq!(
        source_message("int a = 0;\n  a = b;"),
        "line 2, column 7: cannot find symbol: variable b"
    );
}

#[test]
fn snippet_is_trimmed_before_wrapping() {
    let unit = FilterCompiler::new().compile("\n\n   int x = 1;  \n").unwrap();
    assert_eq!(unit.snippet(), "int x = 1;");
    assert_eq!(
        source_message("\n\n  int x = ;"),
        "line 1, column 9: illegal start of expression"
    );
}

#[test]
fn unterminated_block_points_at_end_of_snippet() {
    assert_eq!(
        source_message("if (width() > 0) {\nint x = 1;"),
        "line 2, column 11: reached end of file while parsing"
    );
}

#[test]
fn wrapping_and_locating() {
    let id = UnitId(7);
    let wrapped = wrap_snippet(id, "x;");
    assert_eq!(wrapped, "void filter_7() {\nx;\n}\n");
    let body = wrapped.find("x;").unwrap();
    assert_eq!(locate(id, "x;", body + 1), SnippetPos { line: 1, column: 2 });
    assert_eq!(locate(id, "x;", 0), SnippetPos { line: 1, column: 1 });
    assert_eq!(locate(id, "x;", wrapped.len()), SnippetPos { line: 1, column: 3 });
}

#[test]
fn columns_count_characters() {
    assert_eq!(locate(UnitId(1), "é = 1;", "void filter_1() {\n".len() + 3).column, 3);
}

#[test]
fn only_the_builtin_table_is_reachable() {
    assert!(source_message("System.exit(0);").contains("cannot find symbol"));
}

fn compile_on_small_stack(text: String) -> PixResult<FilterUnit> {
    std::thread::Builder::new()
        .stack_size(2 << 20)
        .spawn(move || FilterCompiler::new().compile(&text))
        .unwrap()
        .join()
        .unwrap()
}

#[test]
fn deep_parentheses_fail_cleanly_on_a_small_stack() {
    let deep = format!("int x = {}1{};", "(".repeat(99), ")".repeat(99));
    let err = compile_on_small_stack(deep).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::SourceError);
    assert!(err.user_message().ends_with("code is nested too deeply"));

    let shallow = format!("int x = {}1{};", "(".repeat(50), ")".repeat(50));
    assert!(compile_on_small_stack(shallow).is_ok());
}

#[test]
fn long_generated_sums_fail_cleanly_on_a_small_stack() {
    let long = format!("int x = 1{};", " + 1".repeat(50_000));
    let err = compile_on_small_stack(long).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::SourceError);
    assert!(err.user_message().ends_with("code is nested too deeply"));

    let short = format!("int x = 1{};", " + 1".repeat(100));
    assert!(compile_on_small_stack(short).is_ok());
}
