use super::*;
use crate::script::parser::parse_function;

fn compile(snippet: &str) -> Result<BytecodeProgram, ScriptError> {
    let f = parse_function(&format!("void f() {{\n{snippet}\n}}\n"))?;
    lower_function(&f)
}

fn message(snippet: &str) -> String {
    compile(snippet).unwrap_err().message
}

#[test]
fn greyscale_filter_lowers_and_verifies() {
    let p = compile(
        "for (int y = 0; y < height(); y++) {
            for (int x = 0; x < width(); x++) {
                int c = getRGB(x, y);
                int v = (red(c) + green(c) + blue(c)) / 3;
                setRGB(x, y, makeRGB(v, v, v));
            }
            setProgress(y + 1, height());
        }",
    )
    .unwrap();
    p.verify().unwrap();
    assert_eq!(p.slots, 4);
    assert_eq!(p.ops.last(), Some(&Op::Return));
}

#[test]
fn lossy_assignment_is_rejected() {
    assert_eq!(
        message("int x = 1.5;"),
        "incompatible types: possible lossy conversion from double to int"
    );
    assert!(compile("double d = 1;").is_ok());
    assert!(compile("int x = (int) 1.5;").is_ok());
}

#[test]
fn compound_assignment_narrows_implicitly() {
    let p = compile("int x = 1; x += 0.5;").unwrap();
    assert!(p.ops.contains(&Op::DoubleToInt));
}

#[test]
fn undeclared_names_and_functions() {
    assert_eq!(message("y = 1;"), "cannot find symbol: variable y");
    assert_eq!(message("frob(1);"), "cannot find symbol: method frob");
    assert!(message("getRGB(1);").contains("cannot be applied"));
}

#[test]
fn redeclaration_in_nested_scope_is_rejected() {
    assert_eq!(
        message("int x = 0; { int x = 1; }"),
        "variable x is already defined"
    );
    assert!(compile("{ int x = 0; } { int x = 1; }").is_ok());
}

#[test]
fn jumps_need_a_loop() {
    assert_eq!(message("break;"), "break outside switch or loop");
    assert_eq!(message("continue;"), "continue outside of loop");
    assert!(compile("while (true) { if (width() > 0) break; continue; }").is_ok());
}

#[test]
fn return_with_value_is_rejected() {
    assert_eq!(
        message("return 1;"),
        "incompatible types: unexpected return value"
    );
    assert!(compile("if (width() == 0) return;").is_ok());
}

#[test]
fn conditions_must_be_boolean() {
    assert_eq!(
        message("if (1) { }"),
        "incompatible types: int cannot be converted to boolean"
    );
}

#[test]
fn void_call_cannot_be_used_as_value() {
    assert_eq!(
        message("int x = setRGB(0, 0, 0);"),
        "'void' type not allowed here"
    );
}

#[test]
fn math_constants_are_read_only_doubles() {
    assert!(compile("double t = Math.PI * 2;").is_ok());
    assert_eq!(
        message("Math.PI = 3;"),
        "cannot assign a value to final variable PI"
    );
}

#[test]
fn promoted_math_follows_argument_types() {
    assert!(compile("int m = Math.max(1, 2);").is_ok());
    assert_eq!(
        message("int m = Math.max(1, 2.0);"),
        "incompatible types: possible lossy conversion from double to int"
    );
    assert!(compile("int r = Math.round(2.5);").is_ok());
}

#[test]
fn make_rgb_truncates_double_arguments() {
    let p = compile("int c = makeRGB(1.9, 2, 3);").unwrap();
    assert!(p.ops.contains(&Op::DoubleToInt));
}

#[test]
fn ternary_promotes_to_double() {
    assert!(compile("double d = width() > 1 ? 1 : 2.5;").is_ok());
    assert!(message("int d = width() > 1 ? 1 : 2.5;").contains("lossy"));
    assert!(message("int d = width() > 1 ? 1 : true;").contains("conditional expression"));
}

#[test]
fn bad_operands_are_reported() {
    assert!(message("boolean b = true + 1;").contains("bad operand types"));
    assert!(message("double d = 1.0 << 2;").contains("bad operand types"));
    assert!(message("boolean b = !1;").contains("bad operand type int"));
}

#[test]
fn undeclared_name_offset_points_into_source() {
    let err = compile("int a = 0;\nb = 2;").unwrap_err();
    assert_eq!(err.offset, "void f() {\nint a = 0;\n".len());
}
