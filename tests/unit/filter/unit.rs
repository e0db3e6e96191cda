use super::*;
use crate::foundation::error::ErrorCategory;
use crate::script::bytecode::Op;

fn id() -> UnitId {
    crate::filter::compiler::FilterCompiler::new()
        .compile("int x = 0;")
        .unwrap()
        .id()
}

#[test]
fn instantiation_rejects_bad_jump_targets() {
    let mut p = BytecodeProgram::new();
    p.ops = vec![Op::Jump(99), Op::Return];
    let err = FilterUnit::instantiate(id(), "x", p).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::GeneralError);
    assert!(err.user_message().contains("jump target 99"));
}

#[test]
fn instantiation_rejects_unknown_slots_and_missing_return() {
    let mut p = BytecodeProgram::new();
    p.ops = vec![Op::Load(crate::script::bytecode::Slot(0)), Op::Return];
    assert!(FilterUnit::instantiate(id(), "x", p).is_err());

    let mut p = BytecodeProgram::new();
    p.ops = vec![Op::Dup];
    assert!(FilterUnit::instantiate(id(), "x", p).is_err());
}

#[test]
fn compiled_unit_reports_metadata() {
    let unit = crate::filter::compiler::FilterCompiler::new()
        .compile("int x = 3;")
        .unwrap();
    assert_eq!(unit.snippet(), "int x = 3;");
    assert!(unit.code_len() >= 3);
    assert!(unit.id().entry_name().starts_with("filter_"));
}
