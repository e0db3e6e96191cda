use crate::filter::compiler::UnitId;
use crate::foundation::error::{PixError, PixResult};
use crate::script::bytecode::BytecodeProgram;
use crate::script::vm::{self, Host, VmError};

/// A compiled, verified filter bound to the pixel-access contract.
///
/// A unit is consumed by the one execution that runs it.
#[derive(Debug)]
pub struct FilterUnit {
    id: UnitId,
    snippet: String,
    program: BytecodeProgram,
}

impl FilterUnit {
    /// Verify `program` and bind it to `id`. Failure is a [`PixError::General`].
    pub(crate) fn instantiate(
        id: UnitId,
        snippet: &str,
        program: BytecodeProgram,
    ) -> PixResult<Self> {
        program.verify().map_err(|e| {
            PixError::general(format!("cannot instantiate {}: {e}", id.entry_name()))
        })?;
        Ok(Self {
            id,
            snippet: snippet.to_owned(),
            program,
        })
    }

    /// Sequence number allocated when this unit was compiled.
    pub fn id(&self) -> UnitId {
        self.id
    }

    /// The trimmed snippet this unit was compiled from.
    pub fn snippet(&self) -> &str {
        &self.snippet
    }

    /// Number of bytecode ops in the unit.
    pub fn code_len(&self) -> usize {
        self.program.ops.len()
    }

    pub(crate) fn run(self, host: &mut dyn Host) -> Result<(), VmError> {
        vm::run(&self.program, host)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/filter/unit.rs"]
mod tests;
