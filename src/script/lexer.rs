use crate::script::ast::BinaryOp;
use crate::script::ScriptError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Span {
    pub(crate) start: usize,
    pub(crate) end: usize,
}

impl Span {
    pub(crate) fn to(self, other: Span) -> Span {
        Span {
            start: self.start,
            end: other.end,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub(crate) kind: TokenKind,
    pub(crate) span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Ident(String),
    Int(i32),
    /// `2147483648`, only valid as the operand of unary minus.
    MinIntMagnitude,
    Double(f64),

    // Keywords
    KwInt,
    KwDouble,
    KwBoolean,
    KwVoid,
    KwIf,
    KwElse,
    KwWhile,
    KwDo,
    KwFor,
    KwBreak,
    KwContinue,
    KwReturn,
    True,
    False,

    LParen,
    RParen,
    LBrace,
    RBrace,
    Semi,
    Comma,
    Dot,
    Question,
    Colon,

    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    Pipe,
    Caret,
    Tilde,
    Bang,
    Shl,
    Shr,
    UShr,

    EqEq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,

    AndAnd,
    OrOr,

    Assign,
    CompoundAssign(BinaryOp),
    PlusPlus,
    MinusMinus,

    Eof,
}

impl TokenKind {
    /// How the token reads in a diagnostic.
    pub(crate) fn describe(&self) -> String {
        let text = match self {
            Self::Ident(s) => return format!("'{s}'"),
            Self::Int(v) => return format!("'{v}'"),
            Self::MinIntMagnitude => return "'2147483648'".to_owned(),
            Self::Double(v) => return format!("'{v}'"),
            Self::Eof => return "end of input".to_owned(),
            Self::KwInt => "int",
            Self::KwDouble => "double",
            Self::KwBoolean => "boolean",
            Self::KwVoid => "void",
            Self::KwIf => "if",
            Self::KwElse => "else",
            Self::KwWhile => "while",
            Self::KwDo => "do",
            Self::KwFor => "for",
            Self::KwBreak => "break",
            Self::KwContinue => "continue",
            Self::KwReturn => "return",
            Self::True => "true",
            Self::False => "false",
            Self::CompoundAssign(op) => return format!("'{}='", op.symbol()),
            other => OPERATORS
                .iter()
                .copied()
                .find(|text| operator_token(text).as_ref() == Some(other))
                .unwrap_or("?"),
        };
        format!("'{text}'")
    }
}

// Longest first so that `>>>=` wins over `>>>`, `>>=`, `>>` and `>`.
const OPERATORS: &[&str] = &[
    ">>>=", ">>>", "<<=", ">>=", "&&", "||", "==", "!=", "<=", ">=", "++", "--", "+=", "-=", "*=",
    "/=", "%=", "&=", "|=", "^=", "<<", ">>", "(", ")", "{", "}", ";", ",", ".", "?", ":", "+",
    "-", "*", "/", "%", "&", "|", "^", "~", "!", "<", ">", "=",
];

fn operator_token(text: &str) -> Option<TokenKind> {
    let kind = match text {
        ">>>=" => TokenKind::CompoundAssign(BinaryOp::UShr),
        ">>>" => TokenKind::UShr,
        "<<=" => TokenKind::CompoundAssign(BinaryOp::Shl),
        ">>=" => TokenKind::CompoundAssign(BinaryOp::Shr),
        "&&" => TokenKind::AndAnd,
        "||" => TokenKind::OrOr,
        "==" => TokenKind::EqEq,
        "!=" => TokenKind::Ne,
        "<=" => TokenKind::Le,
        ">=" => TokenKind::Ge,
        "++" => TokenKind::PlusPlus,
        "--" => TokenKind::MinusMinus,
        "+=" => TokenKind::CompoundAssign(BinaryOp::Add),
        "-=" => TokenKind::CompoundAssign(BinaryOp::Sub),
        "*=" => TokenKind::CompoundAssign(BinaryOp::Mul),
        "/=" => TokenKind::CompoundAssign(BinaryOp::Div),
        "%=" => TokenKind::CompoundAssign(BinaryOp::Rem),
        "&=" => TokenKind::CompoundAssign(BinaryOp::BitAnd),
        "|=" => TokenKind::CompoundAssign(BinaryOp::BitOr),
        "^=" => TokenKind::CompoundAssign(BinaryOp::BitXor),
        "<<" => TokenKind::Shl,
        ">>" => TokenKind::Shr,
        "(" => TokenKind::LParen,
        ")" => TokenKind::RParen,
        "{" => TokenKind::LBrace,
        "}" => TokenKind::RBrace,
        ";" => TokenKind::Semi,
        "," => TokenKind::Comma,
        "." => TokenKind::Dot,
        "?" => TokenKind::Question,
        ":" => TokenKind::Colon,
        "+" => TokenKind::Plus,
        "-" => TokenKind::Minus,
        "*" => TokenKind::Star,
        "/" => TokenKind::Slash,
        "%" => TokenKind::Percent,
        "&" => TokenKind::Amp,
        "|" => TokenKind::Pipe,
        "^" => TokenKind::Caret,
        "~" => TokenKind::Tilde,
        "!" => TokenKind::Bang,
        "<" => TokenKind::Lt,
        ">" => TokenKind::Gt,
        "=" => TokenKind::Assign,
        _ => return None,
    };
    Some(kind)
}

pub(crate) fn lex(input: &str) -> Result<Vec<Token>, ScriptError> {
    let mut out = Vec::new();
    let bytes = input.as_bytes();
    let mut i = 0usize;

    'outer: while i < bytes.len() {
        let c = bytes[i] as char;
        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        let start = i;

        // Comments
        if c == '/' && i + 1 < bytes.len() {
            match bytes[i + 1] {
                b'/' => {
                    while i < bytes.len() && bytes[i] != b'\n' {
                        i += 1;
                    }
                    continue;
                }
                b'*' => {
                    i += 2;
                    while i + 1 < bytes.len() {
                        if bytes[i] == b'*' && bytes[i + 1] == b'/' {
                            i += 2;
                            continue 'outer;
                        }
                        i += 1;
                    }
                    return Err(ScriptError::new(start, "unclosed comment"));
                }
                _ => {}
            }
        }

        // Number
        if c.is_ascii_digit()
            || (c == '.' && i + 1 < bytes.len() && bytes[i + 1].is_ascii_digit())
        {
            let (kind, end) = lex_number(input, start)?;
            i = end;
            out.push(Token {
                kind,
                span: Span { start, end },
            });
            continue;
        }

        // Ident / keyword
        if c.is_ascii_alphabetic() || c == '_' || c == '$' {
            i += 1;
            while i < bytes.len() {
                let ch = bytes[i] as char;
                if ch.is_ascii_alphanumeric() || ch == '_' || ch == '$' {
                    i += 1;
                } else {
                    break;
                }
            }
            let s = &input[start..i];
            let kind = match s {
                "int" => TokenKind::KwInt,
                "double" | "float" => TokenKind::KwDouble,
                "boolean" => TokenKind::KwBoolean,
                "void" => TokenKind::KwVoid,
                "if" => TokenKind::KwIf,
                "else" => TokenKind::KwElse,
                "while" => TokenKind::KwWhile,
                "do" => TokenKind::KwDo,
                "for" => TokenKind::KwFor,
                "break" => TokenKind::KwBreak,
                "continue" => TokenKind::KwContinue,
                "return" => TokenKind::KwReturn,
                "true" => TokenKind::True,
                "false" => TokenKind::False,
                _ => TokenKind::Ident(s.to_owned()),
            };
            out.push(Token {
                kind,
                span: Span { start, end: i },
            });
            continue;
        }

        let rest = &input[i..];
        if let Some(text) = OPERATORS.iter().find(|text| rest.starts_with(**text))
            && let Some(kind) = operator_token(text)
        {
            i += text.len();
            out.push(Token {
                kind,
                span: Span { start, end: i },
            });
            continue;
        }

        let ch = rest.chars().next().unwrap_or(c);
        return Err(ScriptError::new(start, format!("illegal character '{ch}'")));
    }

    out.push(Token {
        kind: TokenKind::Eof,
        span: Span {
            start: input.len(),
            end: input.len(),
        },
    });

    Ok(out)
}

fn lex_number(input: &str, start: usize) -> Result<(TokenKind, usize), ScriptError> {
    let bytes = input.as_bytes();
    let mut i = start;

    // Hex: 0x[0-9a-fA-F]+, reinterpreted as a 32-bit two's complement value.
    if bytes[i] == b'0' && i + 1 < bytes.len() && matches!(bytes[i + 1], b'x' | b'X') {
        i += 2;
        let digits_start = i;
        while i < bytes.len() && bytes[i].is_ascii_hexdigit() {
            i += 1;
        }
        if digits_start == i {
            return Err(ScriptError::new(start, "hexadecimal numbers must contain at least one hexadecimal digit"));
        }
        reject_suffix(bytes, i)?;
        let v = u64::from_str_radix(&input[digits_start..i], 16)
            .ok()
            .filter(|v| *v <= u64::from(u32::MAX))
            .ok_or_else(|| ScriptError::new(start, "integer number too large"))?;
        return Ok((TokenKind::Int(v as u32 as i32), i));
    }

    let mut is_double = false;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i < bytes.len() && bytes[i] == b'.' {
        let after = bytes.get(i + 1).copied();
        let member_access = after.is_some_and(|b| b.is_ascii_alphabetic() && !matches!(b, b'e' | b'E' | b'd' | b'D' | b'f' | b'F'));
        if !member_access {
            is_double = true;
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
        }
    }

    // exponent
    if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
        let e_pos = i;
        i += 1;
        if i < bytes.len() && matches!(bytes[i], b'+' | b'-') {
            i += 1;
        }
        let exp_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if exp_start == i {
            return Err(ScriptError::new(e_pos, "malformed floating-point literal"));
        }
        is_double = true;
    }

    let text_end = i;
    if i < bytes.len() && matches!(bytes[i], b'd' | b'D' | b'f' | b'F') {
        is_double = true;
        i += 1;
    }
    reject_suffix(bytes, i)?;

    let text = &input[start..text_end];
    if is_double {
        let v: f64 = text
            .parse()
            .map_err(|_| ScriptError::new(start, "malformed floating-point literal"))?;
        if v.is_infinite() {
            return Err(ScriptError::new(start, "floating-point number too large"));
        }
        let mantissa = text.split(['e', 'E']).next().unwrap_or(text);
        if v == 0.0 && mantissa.bytes().any(|b| matches!(b, b'1'..=b'9')) {
            return Err(ScriptError::new(start, "floating-point number too small"));
        }
        Ok((TokenKind::Double(v), i))
    } else {
        match text.parse::<i32>() {
            Ok(v) => Ok((TokenKind::Int(v), i)),
            Err(_) if text == "2147483648" => {
                Ok((TokenKind::MinIntMagnitude, i))
            }
            Err(_) => Err(ScriptError::new(start, "integer number too large")),
        }
    }
}

fn reject_suffix(bytes: &[u8], i: usize) -> Result<(), ScriptError> {
    match bytes.get(i) {
        Some(b'l' | b'L') => Err(ScriptError::new(i, "long literals are not supported")),
        Some(b) if b.is_ascii_alphanumeric() || *b == b'_' => {
            Err(ScriptError::new(i, "';' expected"))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/script/lexer.rs"]
mod tests;
