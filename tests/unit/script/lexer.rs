use super::*;

fn kinds(src: &str) -> Vec<TokenKind> {
    lex(src).unwrap().into_iter().map(|t| t.kind).collect()
}

#[test]
fn lexes_declaration_with_spans() {
    let toks = lex("int x = 42;").unwrap();
    assert_eq!(toks[0].kind, TokenKind::KwInt);
    assert_eq!(toks[1].kind, TokenKind::Ident("x".to_owned()));
    assert_eq!(toks[1].span, Span { start: 4, end: 5 });
    assert_eq!(toks[3].kind, TokenKind::Int(42));
    assert_eq!(toks.last().unwrap().kind, TokenKind::Eof);
}

#[test]
fn longest_operator_wins() {
    assert_eq!(
        kinds("a >>>= b >>> c >> d > e"),
        vec![
            TokenKind::Ident("a".to_owned()),
            TokenKind::CompoundAssign(BinaryOp::UShr),
            TokenKind::Ident("b".to_owned()),
            TokenKind::UShr,
            TokenKind::Ident("c".to_owned()),
            TokenKind::Shr,
            TokenKind::Ident("d".to_owned()),
            TokenKind::Gt,
            TokenKind::Ident("e".to_owned()),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn hex_literals_wrap_to_signed() {
    assert_eq!(kinds("0xFF000000")[0], TokenKind::Int(0xFF00_0000_u32 as i32));
    assert_eq!(kinds("0x7f")[0], TokenKind::Int(127));
    assert!(lex("0x100000000").is_err());
}

#[test]
fn decimal_literal_must_fit_in_int() {
    assert_eq!(kinds("2147483647")[0], TokenKind::Int(i32::MAX));
    assert_eq!(kinds("2147483648")[0], TokenKind::MinIntMagnitude);
    let err = lex("2147483649").unwrap_err();
    assert_eq!(err.message, "integer number too large");
}

#[test]
fn double_literal_must_be_finite_and_nonzero() {
    assert_eq!(lex("1e400").unwrap_err().message, "floating-point number too large");
    assert_eq!(lex("1e-400").unwrap_err().message, "floating-point number too small");
    assert_eq!(kinds("0e400")[0], TokenKind::Double(0.0));
    assert_eq!(kinds("0.0")[0], TokenKind::Double(0.0));
}

#[test]
fn double_literal_forms() {
    assert_eq!(kinds("1.5")[0], TokenKind::Double(1.5));
    assert_eq!(kinds(".25")[0], TokenKind::Double(0.25));
    assert_eq!(kinds("2e3")[0], TokenKind::Double(2000.0));
    assert_eq!(kinds("3f")[0], TokenKind::Double(3.0));
    assert_eq!(kinds("float")[0], TokenKind::KwDouble);
}

#[test]
fn long_suffix_is_rejected() {
    let err = lex("int x = 5L;").unwrap_err();
    assert_eq!(err.offset, 9);
}

#[test]
fn comments_are_skipped() {
    assert_eq!(
        kinds("a // trailing\n /* block\n */ b"),
        vec![
            TokenKind::Ident("a".to_owned()),
            TokenKind::Ident("b".to_owned()),
            TokenKind::Eof
        ]
    );
    assert_eq!(lex("/* open").unwrap_err().message, "unclosed comment");
}

#[test]
fn illegal_character_reports_offset() {
    let err = lex("x = #;").unwrap_err();
    assert_eq!(err.offset, 4);
    assert_eq!(err.message, "illegal character '#'");
}

#[test]
fn describe_quotes_operators() {
    assert_eq!(TokenKind::Semi.describe(), "';'");
    assert_eq!(TokenKind::CompoundAssign(BinaryOp::Add).describe(), "'+='");
    assert_eq!(TokenKind::Eof.describe(), "end of input");
}
