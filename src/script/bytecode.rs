use crate::script::builtins::BuiltinId;

/// Upper bound on the number of ops in one unit.
pub(crate) const MAX_CODE_LEN: usize = 1 << 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ConstIdx(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Slot(pub(crate) u16);

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum ConstVal {
    Int(i32),
    Double(f64),
    Bool(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Op {
    PushConst(ConstIdx),
    Load(Slot),
    Store(Slot),
    Dup,
    Pop,

    IntToDouble,
    DoubleToInt,

    Neg,
    Not,
    BitNot,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    UShr,
    BitAnd,
    BitOr,
    BitXor,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,

    // Absolute op indices.
    Jump(u32),
    JumpIfFalse(u32),
    JumpIfTrue(u32),

    CallBuiltin { id: BuiltinId, argc: u8 },
    Return,
}

#[derive(Debug, Clone)]
pub(crate) struct BytecodeProgram {
    pub(crate) ops: Vec<Op>,
    pub(crate) consts: Vec<ConstVal>,
    /// Number of local slots the program addresses.
    pub(crate) slots: u16,
}

impl BytecodeProgram {
    pub(crate) fn new() -> Self {
        Self {
            ops: Vec::new(),
            consts: Vec::new(),
            slots: 0,
        }
    }

    pub(crate) fn push_const(&mut self, c: ConstVal) -> ConstIdx {
        if let Some(i) = self.consts.iter().position(|existing| same_const(existing, &c)) {
            return ConstIdx(i as u32);
        }
        let idx = ConstIdx(self.consts.len() as u32);
        self.consts.push(c);
        idx
    }

    /// Check that every operand refers to something that exists and that execution cannot run
    /// off the end of the code.
    pub(crate) fn verify(&self) -> Result<(), String> {
        if self.ops.len() > MAX_CODE_LEN {
            return Err(format!(
                "code too large: {} ops (limit {MAX_CODE_LEN})",
                self.ops.len()
            ));
        }
        if self.ops.last() != Some(&Op::Return) {
            return Err("code does not end in a return".to_owned());
        }
        for (pc, op) in self.ops.iter().enumerate() {
            match *op {
                Op::PushConst(idx) if idx.0 as usize >= self.consts.len() => {
                    return Err(format!("op {pc}: constant {} out of range", idx.0));
                }
                Op::Load(slot) | Op::Store(slot) if slot.0 >= self.slots => {
                    return Err(format!("op {pc}: local slot {} out of range", slot.0));
                }
                Op::Jump(t) | Op::JumpIfFalse(t) | Op::JumpIfTrue(t)
                    if t as usize >= self.ops.len() =>
                {
                    return Err(format!("op {pc}: jump target {t} out of range"));
                }
                Op::CallBuiltin { id, argc } if id.arity() != usize::from(argc) => {
                    return Err(format!(
                        "op {pc}: {} called with {argc} arguments",
                        id.name()
                    ));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

fn same_const(a: &ConstVal, b: &ConstVal) -> bool {
    match (a, b) {
        (ConstVal::Int(a), ConstVal::Int(b)) => a == b,
        (ConstVal::Double(a), ConstVal::Double(b)) => a.to_bits() == b.to_bits(),
        (ConstVal::Bool(a), ConstVal::Bool(b)) => a == b,
        _ => false,
    }
}
