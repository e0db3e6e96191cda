use crate::script::ast::{
    BinaryOp, Expr, ExprKind, Function, LocalVar, ScalarType, Stmt, StmtKind, UnaryOp,
};
use crate::script::builtins::{self, ParamKind, ReturnKind, Signature};
use crate::script::bytecode::{BytecodeProgram, ConstVal, MAX_CODE_LEN, Op, Slot};
use crate::script::ScriptError;

/// Static type of an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Ty {
    Int,
    Double,
    Bool,
    Void,
}

impl Ty {
    fn name(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Double => "double",
            Self::Bool => "boolean",
            Self::Void => "void",
        }
    }

    fn is_numeric(self) -> bool {
        matches!(self, Self::Int | Self::Double)
    }
}

impl From<ScalarType> for Ty {
    fn from(t: ScalarType) -> Self {
        match t {
            ScalarType::Int => Self::Int,
            ScalarType::Double => Self::Double,
            ScalarType::Bool => Self::Bool,
        }
    }
}

/// Type-check `f` and lower it to bytecode in one pass.
pub(crate) fn lower_function(f: &Function) -> Result<BytecodeProgram, ScriptError> {
    let mut l = Lowerer {
        prog: BytecodeProgram::new(),
        scopes: vec![Vec::new()],
        loops: Vec::new(),
        next_slot: 0,
    };
    for stmt in &f.body {
        l.lower_stmt(stmt)?;
    }
    l.emit(Op::Return, f.span.end)?;
    l.prog.slots = l.next_slot;
    Ok(l.prog)
}

struct Local {
    name: String,
    ty: Ty,
    slot: Slot,
}

#[derive(Default)]
struct LoopCtx {
    breaks: Vec<usize>,
    continues: Vec<usize>,
}

struct Lowerer {
    prog: BytecodeProgram,
    scopes: Vec<Vec<Local>>,
    loops: Vec<LoopCtx>,
    next_slot: u16,
}

fn binary_result(op: BinaryOp, l: Ty, r: Ty, at: usize) -> Result<Ty, ScriptError> {
    let numeric = if l == Ty::Double || r == Ty::Double {
        Ty::Double
    } else {
        Ty::Int
    };
    let out = match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem
            if l.is_numeric() && r.is_numeric() =>
        {
            Some(numeric)
        }
        BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UShr if l == Ty::Int && r == Ty::Int => {
            Some(Ty::Int)
        }
        BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor
            if l == r && matches!(l, Ty::Int | Ty::Bool) =>
        {
            Some(l)
        }
        BinaryOp::Eq | BinaryOp::Ne
            if (l.is_numeric() && r.is_numeric()) || (l == Ty::Bool && r == Ty::Bool) =>
        {
            Some(Ty::Bool)
        }
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
            if l.is_numeric() && r.is_numeric() =>
        {
            Some(Ty::Bool)
        }
        BinaryOp::And | BinaryOp::Or if l == Ty::Bool && r == Ty::Bool => Some(Ty::Bool),
        _ => None,
    };
    out.ok_or_else(|| {
        ScriptError::new(
            at,
            format!(
                "bad operand types for binary operator '{}' ({}, {})",
                op.symbol(),
                l.name(),
                r.name()
            ),
        )
    })
}

fn unary_result(op: UnaryOp, t: Ty, at: usize) -> Result<Ty, ScriptError> {
    let ok = match op {
        UnaryOp::Neg | UnaryOp::Plus => t.is_numeric(),
        UnaryOp::Not => t == Ty::Bool,
        UnaryOp::BitNot => t == Ty::Int,
    };
    if ok {
        Ok(t)
    } else {
        Err(ScriptError::new(
            at,
            format!(
                "bad operand type {} for unary operator '{}'",
                t.name(),
                op.symbol()
            ),
        ))
    }
}

fn ternary_result(a: Ty, b: Ty, at: usize) -> Result<Ty, ScriptError> {
    if a == b && a != Ty::Void {
        return Ok(a);
    }
    if a.is_numeric() && b.is_numeric() {
        return Ok(Ty::Double);
    }
    Err(ScriptError::new(
        at,
        format!(
            "incompatible types in conditional expression: {} and {}",
            a.name(),
            b.name()
        ),
    ))
}

fn lossy(at: usize) -> ScriptError {
    ScriptError::new(
        at,
        "incompatible types: possible lossy conversion from double to int",
    )
}

fn cannot_convert(from: Ty, to: Ty, at: usize) -> ScriptError {
    ScriptError::new(
        at,
        format!(
            "incompatible types: {} cannot be converted to {}",
            from.name(),
            to.name()
        ),
    )
}

impl Lowerer {
    fn here(&self) -> usize {
        self.prog.ops.len()
    }

    fn emit(&mut self, op: Op, at: usize) -> Result<usize, ScriptError> {
        if self.prog.ops.len() >= MAX_CODE_LEN {
            return Err(ScriptError::new(at, "code too large"));
        }
        self.prog.ops.push(op);
        Ok(self.prog.ops.len() - 1)
    }

    fn emit_const(&mut self, c: ConstVal, at: usize) -> Result<(), ScriptError> {
        let idx = self.prog.push_const(c);
        self.emit(Op::PushConst(idx), at)?;
        Ok(())
    }

    fn patch(&mut self, at: usize, target: usize) {
        let target = target as u32;
        if let Some(Op::Jump(t) | Op::JumpIfFalse(t) | Op::JumpIfTrue(t)) =
            self.prog.ops.get_mut(at)
        {
            *t = target;
        }
    }

    fn lookup(&self, name: &str) -> Option<&Local> {
        self.scopes
            .iter()
            .rev()
            .flat_map(|s| s.iter().rev())
            .find(|l| l.name == name)
    }

    fn declare(&mut self, var: &LocalVar, ty: Ty) -> Result<Slot, ScriptError> {
        if self.lookup(&var.name).is_some() {
            return Err(ScriptError::new(
                var.span.start,
                format!("variable {} is already defined", var.name),
            ));
        }
        if self.next_slot == u16::MAX {
            return Err(ScriptError::new(var.span.start, "too many local variables"));
        }
        let slot = Slot(self.next_slot);
        self.next_slot += 1;
        if let Some(scope) = self.scopes.last_mut() {
            scope.push(Local {
                name: var.name.clone(),
                ty,
                slot,
            });
        }
        Ok(slot)
    }

    fn with_scope(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<(), ScriptError>,
    ) -> Result<(), ScriptError> {
        self.scopes.push(Vec::new());
        let out = f(self);
        self.scopes.pop();
        out
    }

    fn lower_stmt(&mut self, stmt: &Stmt) -> Result<(), ScriptError> {
        let at = stmt.span.start;
        match &stmt.kind {
            StmtKind::Local { ty, vars } => {
                let ty = Ty::from(*ty);
                for var in vars {
                    match &var.init {
                        Some(init) => {
                            let t = self.lower_value(init)?;
                            self.convert_assign(t, ty, init.span.start)?;
                        }
                        None => {
                            let c = match ty {
                                Ty::Double => ConstVal::Double(0.0),
                                Ty::Bool => ConstVal::Bool(false),
                                _ => ConstVal::Int(0),
                            };
                            self.emit_const(c, var.span.start)?;
                        }
                    }
                    let slot = self.declare(var, ty)?;
                    self.emit(Op::Store(slot), var.span.start)?;
                }
            }
            StmtKind::Expr(e) => {
                if self.lower_expr(e)? != Ty::Void {
                    self.emit(Op::Pop, at)?;
                }
            }
            StmtKind::If { cond, then, els } => {
                self.lower_condition(cond)?;
                let jf = self.emit(Op::JumpIfFalse(u32::MAX), at)?;
                self.with_scope(|l| l.lower_stmt(then))?;
                match els {
                    Some(els) => {
                        let jend = self.emit(Op::Jump(u32::MAX), at)?;
                        self.patch(jf, self.here());
                        self.with_scope(|l| l.lower_stmt(els))?;
                        self.patch(jend, self.here());
                    }
                    None => self.patch(jf, self.here()),
                }
            }
            StmtKind::While { cond, body } => {
                let start = self.here();
                self.lower_condition(cond)?;
                let exit = self.emit(Op::JumpIfFalse(u32::MAX), at)?;
                let ctx = self.lower_loop_body(body)?;
                self.emit(Op::Jump(start as u32), at)?;
                self.finish_loop(ctx, start, self.here());
                self.patch(exit, self.here());
            }
            StmtKind::DoWhile { body, cond } => {
                let start = self.here();
                let ctx = self.lower_loop_body(body)?;
                let check = self.here();
                self.lower_condition(cond)?;
                self.emit(Op::JumpIfTrue(start as u32), at)?;
                self.finish_loop(ctx, check, self.here());
            }
            StmtKind::For {
                init,
                cond,
                update,
                body,
            } => {
                self.with_scope(|l| {
                    for s in init {
                        l.lower_stmt(s)?;
                    }
                    let start = l.here();
                    let exit = match cond {
                        Some(cond) => {
                            l.lower_condition(cond)?;
                            Some(l.emit(Op::JumpIfFalse(u32::MAX), at)?)
                        }
                        None => None,
                    };
                    let ctx = l.lower_loop_body(body)?;
                    let step = l.here();
                    for e in update {
                        if l.lower_expr(e)? != Ty::Void {
                            l.emit(Op::Pop, e.span.start)?;
                        }
                    }
                    l.emit(Op::Jump(start as u32), at)?;
                    let end = l.here();
                    l.finish_loop(ctx, step, end);
                    if let Some(exit) = exit {
                        l.patch(exit, end);
                    }
                    Ok(())
                })?;
            }
            StmtKind::Block(stmts) => {
                self.with_scope(|l| {
                    for s in stmts {
                        l.lower_stmt(s)?;
                    }
                    Ok(())
                })?;
            }
            StmtKind::Break => {
                if self.loops.is_empty() {
                    return Err(ScriptError::new(at, "break outside switch or loop"));
                }
                let j = self.emit(Op::Jump(u32::MAX), at)?;
                if let Some(ctx) = self.loops.last_mut() {
                    ctx.breaks.push(j);
                }
            }
            StmtKind::Continue => {
                if self.loops.is_empty() {
                    return Err(ScriptError::new(at, "continue outside of loop"));
                }
                let j = self.emit(Op::Jump(u32::MAX), at)?;
                if let Some(ctx) = self.loops.last_mut() {
                    ctx.continues.push(j);
                }
            }
            StmtKind::Return(None) => {
                self.emit(Op::Return, at)?;
            }
            StmtKind::Return(Some(e)) => {
                return Err(ScriptError::new(
                    e.span.start,
                    "incompatible types: unexpected return value",
                ));
            }
            StmtKind::Empty => {}
        }
        Ok(())
    }

    fn lower_loop_body(&mut self, body: &Stmt) -> Result<LoopCtx, ScriptError> {
        self.loops.push(LoopCtx::default());
        let out = self.with_scope(|l| l.lower_stmt(body));
        let ctx = self.loops.pop().unwrap_or_default();
        out.map(|()| ctx)
    }

    fn finish_loop(&mut self, ctx: LoopCtx, continue_to: usize, break_to: usize) {
        for j in ctx.continues {
            self.patch(j, continue_to);
        }
        for j in ctx.breaks {
            self.patch(j, break_to);
        }
    }

    fn lower_condition(&mut self, cond: &Expr) -> Result<(), ScriptError> {
        let t = self.lower_value(cond)?;
        if t != Ty::Bool {
            return Err(cannot_convert(t, Ty::Bool, cond.span.start));
        }
        Ok(())
    }

    fn convert_assign(&mut self, from: Ty, to: Ty, at: usize) -> Result<(), ScriptError> {
        match (from, to) {
            _ if from == to => Ok(()),
            (Ty::Int, Ty::Double) => {
                self.emit(Op::IntToDouble, at)?;
                Ok(())
            }
            (Ty::Double, Ty::Int) => Err(lossy(at)),
            _ => Err(cannot_convert(from, to, at)),
        }
    }

    /// Explicit or implicit narrowing: `(int) x`, `i += 0.5`.
    fn convert_cast(&mut self, from: Ty, to: Ty, at: usize) -> Result<(), ScriptError> {
        match (from, to) {
            (Ty::Double, Ty::Int) => {
                self.emit(Op::DoubleToInt, at)?;
                Ok(())
            }
            _ => self.convert_assign(from, to, at),
        }
    }

    /// Lower an expression whose value is used.
    fn lower_value(&mut self, e: &Expr) -> Result<Ty, ScriptError> {
        let t = self.lower_expr(e)?;
        if t == Ty::Void {
            return Err(ScriptError::new(e.span.start, "'void' type not allowed here"));
        }
        Ok(t)
    }

    fn lower_expr(&mut self, e: &Expr) -> Result<Ty, ScriptError> {
        let at = e.span.start;
        match &e.kind {
            ExprKind::Int(v) => {
                self.emit_const(ConstVal::Int(*v), at)?;
                Ok(Ty::Int)
            }
            ExprKind::Double(v) => {
                self.emit_const(ConstVal::Double(*v), at)?;
                Ok(Ty::Double)
            }
            ExprKind::Bool(v) => {
                self.emit_const(ConstVal::Bool(*v), at)?;
                Ok(Ty::Bool)
            }
            ExprKind::Name(name) => {
                if let Some(local) = self.lookup(name) {
                    let (slot, ty) = (local.slot, local.ty);
                    self.emit(Op::Load(slot), at)?;
                    return Ok(ty);
                }
                match builtins::constant(name) {
                    Some(v) => {
                        self.emit_const(ConstVal::Double(v), at)?;
                        Ok(Ty::Double)
                    }
                    None => Err(unknown_variable(name, at)),
                }
            }
            ExprKind::Unary { op, expr } => {
                let t = self.lower_value(expr)?;
                let out = unary_result(*op, t, at)?;
                match op {
                    UnaryOp::Neg => {
                        self.emit(Op::Neg, at)?;
                    }
                    UnaryOp::Not => {
                        self.emit(Op::Not, at)?;
                    }
                    UnaryOp::BitNot => {
                        self.emit(Op::BitNot, at)?;
                    }
                    UnaryOp::Plus => {}
                }
                Ok(out)
            }
            ExprKind::Binary { op, left, right } => {
                if matches!(op, BinaryOp::And | BinaryOp::Or) {
                    return self.lower_short_circuit(*op, left, right, at);
                }
                let lt = self.lower_value(left)?;
                let rt = self.lower_value(right)?;
                let out = binary_result(*op, lt, rt, at)?;
                self.emit(binary_op(*op), at)?;
                Ok(out)
            }
            ExprKind::Ternary { cond, then, els } => {
                let out = ternary_result(self.infer(then)?, self.infer(els)?, at)?;
                self.lower_condition(cond)?;
                let jf = self.emit(Op::JumpIfFalse(u32::MAX), at)?;
                let t = self.lower_value(then)?;
                self.convert_assign(t, out, then.span.start)?;
                let jend = self.emit(Op::Jump(u32::MAX), at)?;
                self.patch(jf, self.here());
                let t = self.lower_value(els)?;
                self.convert_assign(t, out, els.span.start)?;
                self.patch(jend, self.here());
                Ok(out)
            }
            ExprKind::Cast { ty, expr } => {
                let t = self.lower_value(expr)?;
                let to = Ty::from(*ty);
                self.convert_cast(t, to, at)?;
                Ok(to)
            }
            ExprKind::Assign {
                target,
                op: None,
                value,
            } => {
                let (slot, ty) = self.assignable(target, at)?;
                let t = self.lower_value(value)?;
                self.convert_assign(t, ty, value.span.start)?;
                self.emit(Op::Dup, at)?;
                self.emit(Op::Store(slot), at)?;
                Ok(ty)
            }
            ExprKind::Assign {
                target,
                op: Some(op),
                value,
            } => {
                let (slot, ty) = self.assignable(target, at)?;
                self.emit(Op::Load(slot), at)?;
                let t = self.lower_value(value)?;
                let out = binary_result(*op, ty, t, at)?;
                self.emit(binary_op(*op), at)?;
                self.convert_cast(out, ty, at)?;
                self.emit(Op::Dup, at)?;
                self.emit(Op::Store(slot), at)?;
                Ok(ty)
            }
            ExprKind::IncDec {
                target,
                increment,
                prefix,
            } => {
                let (slot, ty) = self.assignable(target, at)?;
                if !ty.is_numeric() {
                    let sym = if *increment { "++" } else { "--" };
                    return Err(ScriptError::new(
                        at,
                        format!("bad operand type {} for unary operator '{sym}'", ty.name()),
                    ));
                }
                let step = if *increment { Op::Add } else { Op::Sub };
                self.emit(Op::Load(slot), at)?;
                if !*prefix {
                    self.emit(Op::Dup, at)?;
                }
                self.emit_const(ConstVal::Int(1), at)?;
                self.emit(step, at)?;
                if *prefix {
                    self.emit(Op::Dup, at)?;
                }
                self.emit(Op::Store(slot), at)?;
                Ok(ty)
            }
            ExprKind::Call { func, args } => self.lower_call(func, args, at),
        }
    }

    fn lower_short_circuit(
        &mut self,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
        at: usize,
    ) -> Result<Ty, ScriptError> {
        let lt = self.lower_value(left)?;
        if lt != Ty::Bool {
            return binary_result(op, lt, Ty::Bool, at);
        }
        self.emit(Op::Dup, at)?;
        let skip = if op == BinaryOp::And {
            self.emit(Op::JumpIfFalse(u32::MAX), at)?
        } else {
            self.emit(Op::JumpIfTrue(u32::MAX), at)?
        };
        self.emit(Op::Pop, at)?;
        let rt = self.lower_value(right)?;
        binary_result(op, lt, rt, at)?;
        self.patch(skip, self.here());
        Ok(Ty::Bool)
    }

    fn assignable(&self, target: &str, at: usize) -> Result<(Slot, Ty), ScriptError> {
        if let Some(local) = self.lookup(target) {
            return Ok((local.slot, local.ty));
        }
        if builtins::constant(target).is_some() {
            let short = target.rsplit('.').next().unwrap_or(target);
            return Err(ScriptError::new(
                at,
                format!("cannot assign a value to final variable {short}"),
            ));
        }
        Err(unknown_variable(target, at))
    }

    fn signature(&self, func: &str, argc: usize, at: usize) -> Result<Signature, ScriptError> {
        match builtins::resolve(func, argc) {
            Some(sig) => Ok(sig),
            None if builtins::is_known(func) => Err(ScriptError::new(
                at,
                format!("method {func} cannot be applied to {argc} argument(s)"),
            )),
            None => Err(ScriptError::new(
                at,
                format!("cannot find symbol: method {func}"),
            )),
        }
    }

    /// Common type of the promoted arguments of a call.
    fn promoted_type(&self, sig: &Signature, args: &[Expr]) -> Result<Ty, ScriptError> {
        let mut out = Ty::Int;
        for (kind, arg) in sig.params.iter().zip(args) {
            if *kind != ParamKind::Promoted {
                continue;
            }
            match self.infer(arg)? {
                Ty::Int => {}
                Ty::Double => out = Ty::Double,
                other => return Err(cannot_convert(other, Ty::Double, arg.span.start)),
            }
        }
        Ok(out)
    }

    fn lower_call(&mut self, func: &str, args: &[Expr], at: usize) -> Result<Ty, ScriptError> {
        let sig = self.signature(func, args.len(), at)?;
        let promoted = self.promoted_type(&sig, args)?;
        for (kind, arg) in sig.params.iter().zip(args) {
            let t = self.lower_value(arg)?;
            let arg_at = arg.span.start;
            match kind {
                ParamKind::Int => self.convert_assign(t, Ty::Int, arg_at)?,
                ParamKind::Double => self.convert_assign(t, Ty::Double, arg_at)?,
                ParamKind::Truncated => self.convert_cast(t, Ty::Int, arg_at)?,
                ParamKind::Promoted => self.convert_assign(t, promoted, arg_at)?,
            }
        }
        self.emit(
            Op::CallBuiltin {
                id: sig.id,
                argc: args.len() as u8,
            },
            at,
        )?;
        Ok(return_type(sig.ret, promoted))
    }

    /// Type of `e` without emitting code.
    fn infer(&self, e: &Expr) -> Result<Ty, ScriptError> {
        let at = e.span.start;
        match &e.kind {
            ExprKind::Int(_) => Ok(Ty::Int),
            ExprKind::Double(_) => Ok(Ty::Double),
            ExprKind::Bool(_) => Ok(Ty::Bool),
            ExprKind::Name(name) => match self.lookup(name) {
                Some(local) => Ok(local.ty),
                None if builtins::constant(name).is_some() => Ok(Ty::Double),
                None => Err(unknown_variable(name, at)),
            },
            ExprKind::Unary { op, expr } => unary_result(*op, self.infer(expr)?, at),
            ExprKind::Binary { op, left, right } => {
                binary_result(*op, self.infer(left)?, self.infer(right)?, at)
            }
            ExprKind::Ternary { then, els, .. } => {
                ternary_result(self.infer(then)?, self.infer(els)?, at)
            }
            ExprKind::Cast { ty, .. } => Ok(Ty::from(*ty)),
            ExprKind::Assign { target, .. } | ExprKind::IncDec { target, .. } => {
                self.assignable(target, at).map(|(_, ty)| ty)
            }
            ExprKind::Call { func, args } => {
                let sig = self.signature(func, args.len(), at)?;
                let promoted = self.promoted_type(&sig, args)?;
                Ok(return_type(sig.ret, promoted))
            }
        }
    }
}

fn unknown_variable(name: &str, at: usize) -> ScriptError {
    ScriptError::new(at, format!("cannot find symbol: variable {name}"))
}

fn return_type(ret: ReturnKind, promoted: Ty) -> Ty {
    match ret {
        ReturnKind::Void => Ty::Void,
        ReturnKind::Int => Ty::Int,
        ReturnKind::Double => Ty::Double,
        ReturnKind::Promoted => promoted,
    }
}

fn binary_op(op: BinaryOp) -> Op {
    match op {
        BinaryOp::Add => Op::Add,
        BinaryOp::Sub => Op::Sub,
        BinaryOp::Mul => Op::Mul,
        BinaryOp::Div => Op::Div,
        BinaryOp::Rem => Op::Rem,
        BinaryOp::Shl => Op::Shl,
        BinaryOp::Shr => Op::Shr,
        BinaryOp::UShr => Op::UShr,
        BinaryOp::BitAnd => Op::BitAnd,
        BinaryOp::BitOr => Op::BitOr,
        BinaryOp::BitXor => Op::BitXor,
        BinaryOp::Eq => Op::Eq,
        BinaryOp::Ne => Op::Ne,
        BinaryOp::Lt => Op::Lt,
        BinaryOp::Le => Op::Le,
        BinaryOp::Gt => Op::Gt,
        BinaryOp::Ge => Op::Ge,
        // Lowered as jumps by `lower_short_circuit`.
        BinaryOp::And => Op::BitAnd,
        BinaryOp::Or => Op::BitOr,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/script/lower.rs"]
mod tests;
