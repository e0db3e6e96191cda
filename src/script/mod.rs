//! The snippet language: a small Java-like statement subset compiled to stack bytecode.

pub(crate) mod ast;
pub(crate) mod builtins;
pub(crate) mod bytecode;
pub(crate) mod lexer;
pub(crate) mod lower;
pub(crate) mod parser;
pub(crate) mod vm;

use crate::script::bytecode::BytecodeProgram;

/// Which pass rejected the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    /// Lexing or parsing.
    Syntax,
    /// Name resolution and type checking during lowering.
    Semantic,
}

/// A rejected unit, anchored at a byte offset of the wrapped source. The compiler maps the offset
/// back to snippet coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ScriptError {
    pub(crate) offset: usize,
    pub(crate) message: String,
    pub(crate) phase: Phase,
}

impl ScriptError {
    pub(crate) fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
            phase: Phase::Syntax,
        }
    }

    fn semantic(self) -> Self {
        Self {
            phase: Phase::Semantic,
            ..self
        }
    }
}

/// Parse, type-check and lower a complete wrapped unit.
pub(crate) fn compile_source(src: &str) -> Result<BytecodeProgram, ScriptError> {
    let f = parser::parse_function(src)?;
    let program = lower::lower_function(&f).map_err(ScriptError::semantic)?;
    tracing::debug!(
        function = %f.name,
        ops = program.ops.len(),
        consts = program.consts.len(),
        slots = program.slots,
        "lowered filter body"
    );
    Ok(program)
}

#[cfg(test)]
#[path = "../../tests/unit/script/compile.rs"]
mod tests;
