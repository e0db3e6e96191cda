use crate::filter::unit::FilterUnit;
use crate::foundation::error::{PixError, PixResult};
use crate::script;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_UNIT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique, strictly increasing identifier of one compilation attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitId(u64);

impl UnitId {
    fn next() -> Self {
        Self(NEXT_UNIT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw sequence number.
    pub fn get(self) -> u64 {
        self.0
    }

    /// Name of the generated entry point, `filter_<id>`.
    pub fn entry_name(self) -> String {
        format!("filter_{}", self.0)
    }
}

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Wrap a snippet into a complete no-argument, void entry point.
pub fn wrap_snippet(id: UnitId, snippet: &str) -> String {
    format!("{}{snippet}\n}}\n", preamble(id))
}

fn preamble(id: UnitId) -> String {
    format!("void {}() {{\n", id.entry_name())
}

/// A 1-based position inside the user's snippet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SnippetPos {
    /// Line, starting at 1.
    pub line: usize,
    /// Column in characters, starting at 1.
    pub column: usize,
}

/// Map a byte offset in the wrapped source back into `snippet` coordinates.
///
/// Offsets inside the preamble map to the first character and offsets inside the postamble map
/// to the end of the snippet.
pub fn locate(id: UnitId, snippet: &str, offset: usize) -> SnippetPos {
    let body_start = preamble(id).len();
    let rel = offset.saturating_sub(body_start).min(snippet.len());
    let prefix = &snippet.as_bytes()[..rel];
    let line_start = prefix
        .iter()
        .rposition(|b| *b == b'\n')
        .map_or(0, |i| i + 1);
    let line = prefix.iter().filter(|b| **b == b'\n').count() + 1;
    let tail = &prefix[line_start..];
    let column = std::str::from_utf8(tail).map_or(tail.len(), |s| s.chars().count()) + 1;
    SnippetPos { line, column }
}

/// Compiles snippet text into [`FilterUnit`]s.
///
/// Compilation is synchronous and never cached: compiling the same text twice yields two
/// independent units with distinct ids.
#[derive(Clone, Copy, Debug, Default)]
pub struct FilterCompiler;

impl FilterCompiler {
    /// Create a compiler.
    pub fn new() -> Self {
        Self
    }

    /// Compile `text` into a runnable unit.
    ///
    /// Blank input is [`PixError::EmptyInput`]; syntax and type errors are [`PixError::Source`]
    /// with a `line L, column C: message` diagnostic; a unit that cannot be instantiated is
    /// [`PixError::General`].
    #[tracing::instrument(skip_all, fields(len = text.len()))]
    pub fn compile(&self, text: &str) -> PixResult<FilterUnit> {
        let snippet = text.trim();
        if snippet.is_empty() {
            return Err(PixError::EmptyInput);
        }

        let id = UnitId::next();
        let wrapped = wrap_snippet(id, snippet);
        let program = script::compile_source(&wrapped).map_err(|e| {
            let pos = locate(id, snippet, e.offset);
            tracing::debug!(unit = %id, offset = e.offset, phase = ?e.phase, "compile failed: {}", e.message);
            PixError::source_error(format!(
                "line {}, column {}: {}",
                pos.line, pos.column, e.message
            ))
        })?;

        let unit = FilterUnit::instantiate(id, snippet, program)?;
        tracing::debug!(unit = %id, "compiled filter");
        Ok(unit)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/filter/compiler.rs"]
mod tests;
