use crate::script::ast::{
    BinaryOp, Expr, ExprKind, Function, LocalVar, ScalarType, Stmt, StmtKind, UnaryOp,
};
use crate::script::ScriptError;
use crate::script::lexer::{Span, Token, TokenKind, lex};

/// Deepest statement/expression nesting accepted before giving up. Each chained binary operator
/// counts as one level, since `a + b + c` nests to the left.
const MAX_NESTING: usize = 128;

/// Number of binary precedence levels, `||` (0) through `* / %` (9).
const BINARY_LEVELS: usize = 10;

/// Parse a complete unit: `void name() { ... }`.
pub(crate) fn parse_function(src: &str) -> Result<Function, ScriptError> {
    let tokens = lex(src)?;
    let mut p = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let f = p.parse_function()?;
    if p.peek().kind != TokenKind::Eof {
        return Err(ScriptError::new(
            p.span().start,
            format!(
                "unexpected {} after the end of the filter body (unbalanced '}}'?)",
                p.peek().kind.describe()
            ),
        ));
    }
    Ok(f)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn kind_at(&self, idx: usize) -> Option<&TokenKind> {
        self.tokens.get(idx).map(|t| &t.kind)
    }

    fn bump(&mut self) -> &Token {
        let t = &self.tokens[self.pos];
        // Eof is sticky.
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn span(&self) -> Span {
        self.peek().span
    }

    fn prev_span(&self) -> Span {
        if self.pos == 0 {
            self.span()
        } else {
            self.tokens[self.pos - 1].span
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Span, ScriptError> {
        if self.peek().kind == kind {
            Ok(self.bump().span)
        } else {
            Err(self.expected(what))
        }
    }

    fn expected(&self, what: &str) -> ScriptError {
        if self.peek().kind == TokenKind::Eof {
            return ScriptError::new(self.span().start, "reached end of file while parsing");
        }
        let at = if self.pos == 0 {
            self.span().start
        } else {
            self.prev_span().end
        };
        ScriptError::new(
            at,
            format!("{what} expected, found {}", self.peek().kind.describe()),
        )
    }

    fn consume(&mut self, kind: TokenKind) -> bool {
        if self.peek().kind == kind {
            self.bump();
            true
        } else {
            false
        }
    }

    fn deepen(&mut self) -> Result<(), ScriptError> {
        if self.depth >= MAX_NESTING {
            return Err(ScriptError::new(
                self.span().start,
                "code is nested too deeply",
            ));
        }
        self.depth += 1;
        Ok(())
    }

    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ScriptError>,
    ) -> Result<T, ScriptError> {
        self.deepen()?;
        let out = f(self);
        self.depth -= 1;
        out
    }

    fn parse_function(&mut self) -> Result<Function, ScriptError> {
        let start = self.expect(TokenKind::KwVoid, "'void'")?;
        let name = self.parse_ident()?;
        self.expect(TokenKind::LParen, "'('")?;
        self.expect(TokenKind::RParen, "')'")?;
        let body = self.parse_block()?;
        Ok(Function {
            name,
            body,
            span: start.to(self.prev_span()),
        })
    }

    fn parse_ident(&mut self) -> Result<String, ScriptError> {
        match &self.peek().kind {
            TokenKind::Ident(s) => {
                let s = s.clone();
                self.bump();
                Ok(s)
            }
            _ => Err(self.expected("<identifier>")),
        }
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, ScriptError> {
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut stmts = Vec::new();
        loop {
            match self.peek().kind {
                TokenKind::RBrace => {
                    self.bump();
                    return Ok(stmts);
                }
                TokenKind::Eof => {
                    return Err(ScriptError::new(
                        self.span().start,
                        "reached end of file while parsing",
                    ));
                }
                _ => stmts.push(self.parse_statement()?),
            }
        }
    }

    fn parse_statement(&mut self) -> Result<Stmt, ScriptError> {
        self.nested(|p| p.parse_statement_inner())
    }

    fn parse_statement_inner(&mut self) -> Result<Stmt, ScriptError> {
        let start = self.span();
        let kind = match self.peek().kind.clone() {
            TokenKind::LBrace => StmtKind::Block(self.parse_block()?),
            TokenKind::Semi => {
                self.bump();
                StmtKind::Empty
            }
            TokenKind::KwInt | TokenKind::KwDouble | TokenKind::KwBoolean => {
                let local = self.parse_local()?;
                self.expect(TokenKind::Semi, "';'")?;
                local
            }
            TokenKind::KwIf => {
                self.bump();
                let cond = self.parse_condition()?;
                let then = Box::new(self.parse_statement()?);
                let els = if self.consume(TokenKind::KwElse) {
                    Some(Box::new(self.parse_statement()?))
                } else {
                    None
                };
                StmtKind::If { cond, then, els }
            }
            TokenKind::KwWhile => {
                self.bump();
                let cond = self.parse_condition()?;
                let body = Box::new(self.parse_statement()?);
                StmtKind::While { cond, body }
            }
            TokenKind::KwDo => {
                self.bump();
                let body = Box::new(self.parse_statement()?);
                self.expect(TokenKind::KwWhile, "'while'")?;
                let cond = self.parse_condition()?;
                self.expect(TokenKind::Semi, "';'")?;
                StmtKind::DoWhile { body, cond }
            }
            TokenKind::KwFor => self.parse_for()?,
            TokenKind::KwBreak => {
                self.bump();
                self.expect(TokenKind::Semi, "';'")?;
                StmtKind::Break
            }
            TokenKind::KwContinue => {
                self.bump();
                self.expect(TokenKind::Semi, "';'")?;
                StmtKind::Continue
            }
            TokenKind::KwReturn => {
                self.bump();
                if self.consume(TokenKind::Semi) {
                    StmtKind::Return(None)
                } else {
                    let e = self.parse_expr()?;
                    self.expect(TokenKind::Semi, "';'")?;
                    StmtKind::Return(Some(e))
                }
            }
            TokenKind::KwElse => {
                return Err(ScriptError::new(start.start, "'else' without 'if'"));
            }
            _ => {
                let e = self.parse_statement_expr()?;
                self.expect(TokenKind::Semi, "';'")?;
                StmtKind::Expr(e)
            }
        };
        Ok(Stmt {
            kind,
            span: start.to(self.prev_span()),
        })
    }

    fn parse_condition(&mut self) -> Result<Expr, ScriptError> {
        self.expect(TokenKind::LParen, "'('")?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::RParen, "')'")?;
        Ok(cond)
    }

    fn parse_local(&mut self) -> Result<StmtKind, ScriptError> {
        let ty = match self.bump().kind {
            TokenKind::KwInt => ScalarType::Int,
            TokenKind::KwDouble => ScalarType::Double,
            _ => ScalarType::Bool,
        };
        let mut vars = Vec::new();
        loop {
            let start = self.span();
            let name = self.parse_ident()?;
            let init = if self.consume(TokenKind::Assign) {
                Some(self.parse_expr()?)
            } else {
                None
            };
            vars.push(LocalVar {
                name,
                init,
                span: start.to(self.prev_span()),
            });
            if !self.consume(TokenKind::Comma) {
                break;
            }
        }
        Ok(StmtKind::Local { ty, vars })
    }

    fn parse_for(&mut self) -> Result<StmtKind, ScriptError> {
        self.bump();
        self.expect(TokenKind::LParen, "'('")?;

        let mut init = Vec::new();
        if !matches!(self.peek().kind, TokenKind::Semi) {
            if matches!(
                self.peek().kind,
                TokenKind::KwInt | TokenKind::KwDouble | TokenKind::KwBoolean
            ) {
                let start = self.span();
                let local = self.parse_local()?;
                init.push(Stmt {
                    kind: local,
                    span: start.to(self.prev_span()),
                });
            } else {
                for e in self.parse_statement_expr_list()? {
                    let span = e.span;
                    init.push(Stmt {
                        kind: StmtKind::Expr(e),
                        span,
                    });
                }
            }
        }
        self.expect(TokenKind::Semi, "';'")?;

        let cond = if matches!(self.peek().kind, TokenKind::Semi) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(TokenKind::Semi, "';'")?;

        let update = if matches!(self.peek().kind, TokenKind::RParen) {
            Vec::new()
        } else {
            self.parse_statement_expr_list()?
        };
        self.expect(TokenKind::RParen, "')'")?;

        let body = Box::new(self.parse_statement()?);
        Ok(StmtKind::For {
            init,
            cond,
            update,
            body,
        })
    }

    fn parse_statement_expr(&mut self) -> Result<Expr, ScriptError> {
        let e = self.parse_expr()?;
        if !e.kind.is_statement_expression() {
            return Err(ScriptError::new(e.span.start, "not a statement"));
        }
        Ok(e)
    }

    fn parse_statement_expr_list(&mut self) -> Result<Vec<Expr>, ScriptError> {
        let mut out = vec![self.parse_statement_expr()?];
        while self.consume(TokenKind::Comma) {
            out.push(self.parse_statement_expr()?);
        }
        Ok(out)
    }

    fn parse_expr(&mut self) -> Result<Expr, ScriptError> {
        self.nested(|p| p.parse_assignment())
    }

    fn parse_assignment(&mut self) -> Result<Expr, ScriptError> {
        let lhs = self.parse_ternary()?;
        let op = match self.peek().kind {
            TokenKind::Assign => Some(None),
            TokenKind::CompoundAssign(op) => Some(Some(op)),
            _ => None,
        };
        let Some(op) = op else {
            return Ok(lhs);
        };
        let target = match lhs.kind {
            ExprKind::Name(name) => name,
            _ => {
                return Err(ScriptError::new(
                    lhs.span.start,
                    "unexpected type: required variable, found value",
                ));
            }
        };
        self.bump();
        // Right associative: `a = b = c`.
        let value = self.parse_expr()?;
        Ok(Expr {
            span: lhs.span.to(value.span),
            kind: ExprKind::Assign {
                target,
                op,
                value: Box::new(value),
            },
        })
    }

    fn parse_ternary(&mut self) -> Result<Expr, ScriptError> {
        let cond = self.parse_binary(0)?;
        if !self.consume(TokenKind::Question) {
            return Ok(cond);
        }
        let then = self.parse_expr()?;
        self.expect(TokenKind::Colon, "':'")?;
        let els = self.nested(|p| p.parse_ternary())?;
        Ok(Expr {
            span: cond.span.to(els.span),
            kind: ExprKind::Ternary {
                cond: Box::new(cond),
                then: Box::new(then),
                els: Box::new(els),
            },
        })
    }

    fn parse_binary(&mut self, level: usize) -> Result<Expr, ScriptError> {
        if level == BINARY_LEVELS {
            return self.parse_unary();
        }
        let mut e = self.parse_binary(level + 1)?;
        let base = self.depth;
        while let Some(op) = binary_op(level, &self.peek().kind) {
            self.deepen()?;
            self.bump();
            let r = self.parse_binary(level + 1)?;
            e = Expr {
                span: e.span.to(r.span),
                kind: ExprKind::Binary {
                    op,
                    left: Box::new(e),
                    right: Box::new(r),
                },
            };
        }
        self.depth = base;
        Ok(e)
    }

    fn parse_unary(&mut self) -> Result<Expr, ScriptError> {
        self.nested(|p| p.parse_unary_inner())
    }

    fn parse_unary_inner(&mut self) -> Result<Expr, ScriptError> {
        let start = self.span();
        let op = match self.peek().kind {
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Tilde => Some(UnaryOp::BitNot),
            _ => None,
        };
        if let Some(op) = op {
            self.bump();
            if op == UnaryOp::Neg && self.peek().kind == TokenKind::MinIntMagnitude {
                let t = self.bump().clone();
                return Ok(Expr {
                    span: start.to(t.span),
                    kind: ExprKind::Int(i32::MIN),
                });
            }
            let e = self.parse_unary()?;
            return Ok(Expr {
                span: start.to(e.span),
                kind: ExprKind::Unary {
                    op,
                    expr: Box::new(e),
                },
            });
        }

        if matches!(
            self.peek().kind,
            TokenKind::PlusPlus | TokenKind::MinusMinus
        ) {
            let increment = self.bump().kind == TokenKind::PlusPlus;
            let e = self.parse_unary()?;
            let span = start.to(e.span);
            let ExprKind::Name(target) = e.kind else {
                return Err(ScriptError::new(
                    e.span.start,
                    "unexpected type: required variable, found value",
                ));
            };
            return Ok(Expr {
                span,
                kind: ExprKind::IncDec {
                    target,
                    increment,
                    prefix: true,
                },
            });
        }

        // Cast: `(int) expr`, `(double) expr`, `(boolean) expr`.
        if self.peek().kind == TokenKind::LParen
            && let Some(ty) = self.kind_at(self.pos + 1).and_then(scalar_type)
            && self.kind_at(self.pos + 2) == Some(&TokenKind::RParen)
        {
            self.bump();
            self.bump();
            self.bump();
            let e = self.parse_unary()?;
            return Ok(Expr {
                span: start.to(e.span),
                kind: ExprKind::Cast {
                    ty,
                    expr: Box::new(e),
                },
            });
        }

        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, ScriptError> {
        let mut e = self.parse_primary()?;
        while matches!(
            self.peek().kind,
            TokenKind::PlusPlus | TokenKind::MinusMinus
        ) {
            let t = self.bump().clone();
            let span = e.span.to(t.span);
            let ExprKind::Name(target) = e.kind else {
                return Err(ScriptError::new(
                    e.span.start,
                    "unexpected type: required variable, found value",
                ));
            };
            e = Expr {
                span,
                kind: ExprKind::IncDec {
                    target,
                    increment: t.kind == TokenKind::PlusPlus,
                    prefix: false,
                },
            };
        }
        Ok(e)
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, ScriptError> {
        let mut args = Vec::new();
        if self.consume(TokenKind::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr()?);
            if self.consume(TokenKind::Comma) {
                continue;
            }
            self.expect(TokenKind::RParen, "')'")?;
            return Ok(args);
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ScriptError> {
        let t = self.bump().clone();
        let kind = match t.kind {
            TokenKind::Int(v) => ExprKind::Int(v),
            TokenKind::Double(v) => ExprKind::Double(v),
            TokenKind::True => ExprKind::Bool(true),
            TokenKind::False => ExprKind::Bool(false),
            TokenKind::LParen => {
                let e = self.parse_expr()?;
                self.expect(TokenKind::RParen, "')'")?;
                return Ok(Expr {
                    kind: e.kind,
                    span: t.span.to(self.prev_span()),
                });
            }
            TokenKind::Ident(first) => {
                let mut name = first;
                while self.consume(TokenKind::Dot) {
                    let segment = self.parse_ident()?;
                    name.push('.');
                    name.push_str(&segment);
                }
                if self.consume(TokenKind::LParen) {
                    let args = self.parse_args()?;
                    ExprKind::Call { func: name, args }
                } else {
                    ExprKind::Name(name)
                }
            }
            TokenKind::MinIntMagnitude => {
                return Err(ScriptError::new(t.span.start, "integer number too large"));
            }
            TokenKind::Eof => {
                return Err(ScriptError::new(
                    t.span.start,
                    "reached end of file while parsing",
                ));
            }
            _ => {
                return Err(ScriptError::new(
                    t.span.start,
                    "illegal start of expression",
                ));
            }
        };
        Ok(Expr {
            kind,
            span: t.span.to(self.prev_span()),
        })
    }
}

fn scalar_type(kind: &TokenKind) -> Option<ScalarType> {
    match kind {
        TokenKind::KwInt => Some(ScalarType::Int),
        TokenKind::KwDouble => Some(ScalarType::Double),
        TokenKind::KwBoolean => Some(ScalarType::Bool),
        _ => None,
    }
}

fn binary_op(level: usize, kind: &TokenKind) -> Option<BinaryOp> {
    use TokenKind as T;
    let op = match (level, kind) {
        (0, T::OrOr) => BinaryOp::Or,
        (1, T::AndAnd) => BinaryOp::And,
        (2, T::Pipe) => BinaryOp::BitOr,
        (3, T::Caret) => BinaryOp::BitXor,
        (4, T::Amp) => BinaryOp::BitAnd,
        (5, T::EqEq) => BinaryOp::Eq,
        (5, T::Ne) => BinaryOp::Ne,
        (6, T::Lt) => BinaryOp::Lt,
        (6, T::Le) => BinaryOp::Le,
        (6, T::Gt) => BinaryOp::Gt,
        (6, T::Ge) => BinaryOp::Ge,
        (7, T::Shl) => BinaryOp::Shl,
        (7, T::Shr) => BinaryOp::Shr,
        (7, T::UShr) => BinaryOp::UShr,
        (8, T::Plus) => BinaryOp::Add,
        (8, T::Minus) => BinaryOp::Sub,
        (9, T::Star) => BinaryOp::Mul,
        (9, T::Slash) => BinaryOp::Div,
        (9, T::Percent) => BinaryOp::Rem,
        _ => return None,
    };
    Some(op)
}

#[cfg(test)]
#[path = "../../tests/unit/script/parser.rs"]
mod tests;
