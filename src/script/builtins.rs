//! The functions a snippet may call. This table is the whole host surface reachable from
//! filter code.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BuiltinId {
    Width,
    Height,
    GetPixel,
    SetPixel,
    PixelAlpha,
    PixelRed,
    PixelGreen,
    PixelBlue,
    Alpha,
    Red,
    Green,
    Blue,
    MakeArgb,
    MakeRgb,
    SetProgress,
    Limit,
    Abs,
    Min,
    Max,
    Sqrt,
    Pow,
    Exp,
    Log,
    Sin,
    Cos,
    Tan,
    Atan2,
    Floor,
    Ceil,
    Round,
}

/// How an argument is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ParamKind {
    /// `int` only; a `double` argument is a lossy conversion error.
    Int,
    /// `double`; an `int` argument is widened.
    Double,
    /// `int` or `double`; a `double` argument is truncated toward zero.
    Truncated,
    /// All promoted arguments share one numeric type: `double` if any of them is.
    Promoted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReturnKind {
    Void,
    Int,
    Double,
    /// Same type as the promoted arguments.
    Promoted,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Signature {
    pub(crate) id: BuiltinId,
    pub(crate) params: &'static [ParamKind],
    pub(crate) ret: ReturnKind,
}

struct Entry {
    names: &'static [&'static str],
    math: bool,
    sig: Signature,
}

use ParamKind as P;

const XY: &[ParamKind] = &[P::Int, P::Int];
const XYC: &[ParamKind] = &[P::Int, P::Int, P::Int];
const ONE_INT: &[ParamKind] = &[P::Int];
const ONE_DOUBLE: &[ParamKind] = &[P::Double];
const TWO_DOUBLE: &[ParamKind] = &[P::Double, P::Double];

const fn entry(
    names: &'static [&'static str],
    id: BuiltinId,
    params: &'static [ParamKind],
    ret: ReturnKind,
) -> Entry {
    Entry {
        names,
        math: false,
        sig: Signature { id, params, ret },
    }
}

const fn math(
    names: &'static [&'static str],
    id: BuiltinId,
    params: &'static [ParamKind],
    ret: ReturnKind,
) -> Entry {
    Entry {
        names,
        math: true,
        sig: Signature { id, params, ret },
    }
}

const TABLE: &[Entry] = &[
    entry(&["width", "getWidth"], BuiltinId::Width, &[], ReturnKind::Int),
    entry(&["height", "getHeight"], BuiltinId::Height, &[], ReturnKind::Int),
    entry(&["getRGB", "rgb", "getPixel"], BuiltinId::GetPixel, XY, ReturnKind::Int),
    entry(&["setRGB", "rgb", "setPixel"], BuiltinId::SetPixel, XYC, ReturnKind::Void),
    entry(&["getA", "alpha"], BuiltinId::PixelAlpha, XY, ReturnKind::Int),
    entry(&["getR", "red"], BuiltinId::PixelRed, XY, ReturnKind::Int),
    entry(&["getG", "green"], BuiltinId::PixelGreen, XY, ReturnKind::Int),
    entry(&["getB", "blue"], BuiltinId::PixelBlue, XY, ReturnKind::Int),
    entry(&["alpha"], BuiltinId::Alpha, ONE_INT, ReturnKind::Int),
    entry(&["red"], BuiltinId::Red, ONE_INT, ReturnKind::Int),
    entry(&["green"], BuiltinId::Green, ONE_INT, ReturnKind::Int),
    entry(&["blue"], BuiltinId::Blue, ONE_INT, ReturnKind::Int),
    entry(
        &["makeARGB"],
        BuiltinId::MakeArgb,
        &[P::Truncated, P::Truncated, P::Truncated, P::Truncated],
        ReturnKind::Int,
    ),
    entry(
        &["makeRGB"],
        BuiltinId::MakeRgb,
        &[P::Truncated, P::Truncated, P::Truncated],
        ReturnKind::Int,
    ),
    entry(
        &["setProgress", "progress", "reportProgress"],
        BuiltinId::SetProgress,
        XY,
        ReturnKind::Void,
    ),
    entry(&["limit"], BuiltinId::Limit, XYC, ReturnKind::Int),
    math(&["abs"], BuiltinId::Abs, &[P::Promoted], ReturnKind::Promoted),
    math(
        &["min"],
        BuiltinId::Min,
        &[P::Promoted, P::Promoted],
        ReturnKind::Promoted,
    ),
    math(
        &["max"],
        BuiltinId::Max,
        &[P::Promoted, P::Promoted],
        ReturnKind::Promoted,
    ),
    math(&["sqrt"], BuiltinId::Sqrt, ONE_DOUBLE, ReturnKind::Double),
    math(&["pow"], BuiltinId::Pow, TWO_DOUBLE, ReturnKind::Double),
    math(&["exp"], BuiltinId::Exp, ONE_DOUBLE, ReturnKind::Double),
    math(&["log"], BuiltinId::Log, ONE_DOUBLE, ReturnKind::Double),
    math(&["sin"], BuiltinId::Sin, ONE_DOUBLE, ReturnKind::Double),
    math(&["cos"], BuiltinId::Cos, ONE_DOUBLE, ReturnKind::Double),
    math(&["tan"], BuiltinId::Tan, ONE_DOUBLE, ReturnKind::Double),
    math(&["atan2"], BuiltinId::Atan2, TWO_DOUBLE, ReturnKind::Double),
    math(&["floor"], BuiltinId::Floor, ONE_DOUBLE, ReturnKind::Double),
    math(&["ceil"], BuiltinId::Ceil, ONE_DOUBLE, ReturnKind::Double),
    math(&["round"], BuiltinId::Round, ONE_DOUBLE, ReturnKind::Int),
];

fn candidates(name: &str) -> impl Iterator<Item = &'static Entry> + '_ {
    let (bare, qualified) = match name.strip_prefix("Math.") {
        Some(bare) => (bare, true),
        None => (name, false),
    };
    TABLE
        .iter()
        .filter(move |e| (!qualified || e.math) && e.names.iter().any(|n| *n == bare))
}

/// Find the builtin called `name` with `argc` arguments.
pub(crate) fn resolve(name: &str, argc: usize) -> Option<Signature> {
    candidates(name)
        .find(|e| e.sig.params.len() == argc)
        .map(|e| e.sig)
}

/// Whether any overload of `name` exists.
pub(crate) fn is_known(name: &str) -> bool {
    candidates(name).next().is_some()
}

/// Named constants (`Math.PI`, `Math.E`).
pub(crate) fn constant(name: &str) -> Option<f64> {
    match name {
        "Math.PI" => Some(std::f64::consts::PI),
        "Math.E" => Some(std::f64::consts::E),
        _ => None,
    }
}

impl BuiltinId {
    pub(crate) fn arity(self) -> usize {
        TABLE
            .iter()
            .find(|e| e.sig.id == self)
            .map_or(0, |e| e.sig.params.len())
    }

    pub(crate) fn name(self) -> &'static str {
        TABLE
            .iter()
            .find(|e| e.sig.id == self)
            .and_then(|e| e.names.first().copied())
            .unwrap_or("?")
    }
}

#[cfg(test)]
#[path = "../../tests/unit/script/builtins.rs"]
mod tests;
