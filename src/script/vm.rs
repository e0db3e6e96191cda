use crate::script::builtins::BuiltinId;
use crate::script::bytecode::{BytecodeProgram, ConstVal, Op};
use crate::surface::channel;
use crate::surface::warnings::WarningLog;
use smallvec::SmallVec;

/// Deepest operand stack a unit may build.
pub(crate) const MAX_STACK: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Value {
    Int(i32),
    Double(f64),
    Bool(bool),
}

impl From<ConstVal> for Value {
    fn from(c: ConstVal) -> Self {
        match c {
            ConstVal::Int(v) => Self::Int(v),
            ConstVal::Double(v) => Self::Double(v),
            ConstVal::Bool(v) => Self::Bool(v),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VmErrorKind {
    /// The snippet did something illegal, e.g. divided an int by zero.
    Runtime,
    /// The unit outgrew the operand stack.
    ResourceExhausted,
    /// The host asked the unit to stop.
    Cancelled,
}

#[derive(Debug, Clone)]
pub(crate) struct VmError {
    pub(crate) kind: VmErrorKind,
    pub(crate) message: String,
}

impl VmError {
    pub(crate) fn new(msg: impl Into<String>) -> Self {
        Self {
            kind: VmErrorKind::Runtime,
            message: msg.into(),
        }
    }

    fn exhausted(msg: impl Into<String>) -> Self {
        Self {
            kind: VmErrorKind::ResourceExhausted,
            message: msg.into(),
        }
    }

    fn cancelled() -> Self {
        Self {
            kind: VmErrorKind::Cancelled,
            message: "filter cancelled".to_owned(),
        }
    }
}

impl std::fmt::Display for VmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "vm error: {}", self.message)
    }
}

impl std::error::Error for VmError {}

/// Everything a running unit can reach.
pub(crate) trait Host {
    fn width(&self) -> i32;
    fn height(&self) -> i32;
    /// Packed ARGB at `(x, y)`; out of bounds reads are warned about and yield 0.
    fn get_pixel(&mut self, x: i32, y: i32) -> i32;
    /// Out of bounds writes are warned about and dropped.
    fn set_pixel(&mut self, x: i32, y: i32, argb: i32);
    fn report_progress(&mut self, done: i32, total: i32);
    fn warnings(&mut self) -> &mut WarningLog;
    fn should_stop(&self) -> bool;
}

pub(crate) fn run(p: &BytecodeProgram, host: &mut dyn Host) -> Result<(), VmError> {
    let mut stack: Vec<Value> = Vec::with_capacity(32);
    let mut locals = vec![Value::Int(0); usize::from(p.slots)];
    let mut pc = 0usize;

    loop {
        let op = *p
            .ops
            .get(pc)
            .ok_or_else(|| VmError::new("fell off the end of the code"))?;
        pc += 1;

        match op {
            Op::PushConst(idx) => {
                let c = p
                    .consts
                    .get(idx.0 as usize)
                    .ok_or_else(|| VmError::new("const idx out of range"))?;
                push(&mut stack, Value::from(*c))?;
            }
            Op::Load(slot) => {
                let v = *locals
                    .get(usize::from(slot.0))
                    .ok_or_else(|| VmError::new("local slot out of range"))?;
                push(&mut stack, v)?;
            }
            Op::Store(slot) => {
                let v = pop(&mut stack)?;
                let dst = locals
                    .get_mut(usize::from(slot.0))
                    .ok_or_else(|| VmError::new("local slot out of range"))?;
                *dst = v;
            }
            Op::Dup => {
                let v = *stack.last().ok_or_else(|| VmError::new("stack underflow"))?;
                push(&mut stack, v)?;
            }
            Op::Pop => {
                pop(&mut stack)?;
            }

            Op::IntToDouble => {
                let v = pop_f64(&mut stack)?;
                stack.push(Value::Double(v));
            }
            Op::DoubleToInt => {
                // Saturating, NaN becomes 0.
                let v = pop_f64(&mut stack)?;
                stack.push(Value::Int(v as i32));
            }

            Op::Neg => {
                let v = match pop(&mut stack)? {
                    Value::Int(v) => Value::Int(v.wrapping_neg()),
                    Value::Double(v) => Value::Double(-v),
                    Value::Bool(_) => return Err(VmError::new("Neg expects a number")),
                };
                stack.push(v);
            }
            Op::Not => {
                let v = pop_bool(&mut stack)?;
                stack.push(Value::Bool(!v));
            }
            Op::BitNot => {
                let v = pop_int(&mut stack)?;
                stack.push(Value::Int(!v));
            }

            Op::Add
            | Op::Sub
            | Op::Mul
            | Op::Div
            | Op::Rem
            | Op::Shl
            | Op::Shr
            | Op::UShr
            | Op::BitAnd
            | Op::BitOr
            | Op::BitXor => {
                let b = pop(&mut stack)?;
                let a = pop(&mut stack)?;
                stack.push(arith(op, a, b)?);
            }

            Op::Eq | Op::Ne | Op::Lt | Op::Le | Op::Gt | Op::Ge => {
                let b = pop(&mut stack)?;
                let a = pop(&mut stack)?;
                stack.push(Value::Bool(compare(op, a, b)?));
            }

            Op::Jump(t) => pc = jump(host, pc, t)?,
            Op::JumpIfFalse(t) => {
                if !pop_bool(&mut stack)? {
                    pc = jump(host, pc, t)?;
                }
            }
            Op::JumpIfTrue(t) => {
                if pop_bool(&mut stack)? {
                    pc = jump(host, pc, t)?;
                }
            }

            Op::CallBuiltin { id, argc } => {
                if host.should_stop() {
                    return Err(VmError::cancelled());
                }
                let argc = argc as usize;
                if stack.len() < argc {
                    return Err(VmError::new("stack underflow"));
                }
                let args: SmallVec<[Value; 4]> = stack.drain(stack.len() - argc..).collect();
                if let Some(v) = call_builtin(id, &args, host)? {
                    push(&mut stack, v)?;
                }
            }

            Op::Return => return Ok(()),
        }
    }
}

fn jump(host: &dyn Host, pc: usize, target: u32) -> Result<usize, VmError> {
    let target = target as usize;
    // Every loop goes through a backward jump.
    if target < pc && host.should_stop() {
        return Err(VmError::cancelled());
    }
    Ok(target)
}

fn push(stack: &mut Vec<Value>, v: Value) -> Result<(), VmError> {
    if stack.len() >= MAX_STACK {
        return Err(VmError::exhausted("operand stack overflow"));
    }
    stack.push(v);
    Ok(())
}

fn pop(stack: &mut Vec<Value>) -> Result<Value, VmError> {
    stack.pop().ok_or_else(|| VmError::new("stack underflow"))
}

fn pop_int(stack: &mut Vec<Value>) -> Result<i32, VmError> {
    as_int(pop(stack)?)
}

fn pop_f64(stack: &mut Vec<Value>) -> Result<f64, VmError> {
    as_f64(pop(stack)?)
}

fn pop_bool(stack: &mut Vec<Value>) -> Result<bool, VmError> {
    match pop(stack)? {
        Value::Bool(v) => Ok(v),
        _ => Err(VmError::new("expected boolean")),
    }
}

fn as_int(v: Value) -> Result<i32, VmError> {
    match v {
        Value::Int(v) => Ok(v),
        Value::Double(v) => Ok(v as i32),
        Value::Bool(_) => Err(VmError::new("expected int")),
    }
}

fn as_f64(v: Value) -> Result<f64, VmError> {
    match v {
        Value::Int(v) => Ok(f64::from(v)),
        Value::Double(v) => Ok(v),
        Value::Bool(_) => Err(VmError::new("expected number")),
    }
}

fn arith(op: Op, a: Value, b: Value) -> Result<Value, VmError> {
    match (a, b) {
        (Value::Int(a), Value::Int(b)) => int_arith(op, a, b).map(Value::Int),
        (Value::Bool(a), Value::Bool(b)) => {
            let v = match op {
                Op::BitAnd => a & b,
                Op::BitOr => a | b,
                Op::BitXor => a ^ b,
                _ => return Err(VmError::new("arithmetic on booleans")),
            };
            Ok(Value::Bool(v))
        }
        (a, b) => {
            let (a, b) = (as_f64(a)?, as_f64(b)?);
            let v = match op {
                Op::Add => a + b,
                Op::Sub => a - b,
                Op::Mul => a * b,
                Op::Div => a / b,
                Op::Rem => a % b,
                _ => return Err(VmError::new("integer operator applied to double")),
            };
            Ok(Value::Double(v))
        }
    }
}

fn int_arith(op: Op, a: i32, b: i32) -> Result<i32, VmError> {
    let v = match op {
        Op::Add => a.wrapping_add(b),
        Op::Sub => a.wrapping_sub(b),
        Op::Mul => a.wrapping_mul(b),
        Op::Div | Op::Rem if b == 0 => return Err(VmError::new("/ by zero")),
        Op::Div => a.wrapping_div(b),
        Op::Rem => a.wrapping_rem(b),
        // Shift distances use the low five bits.
        Op::Shl => a.wrapping_shl(b as u32),
        Op::Shr => a.wrapping_shr(b as u32),
        Op::UShr => (a as u32).wrapping_shr(b as u32) as i32,
        Op::BitAnd => a & b,
        Op::BitOr => a | b,
        Op::BitXor => a ^ b,
        _ => return Err(VmError::new("not an arithmetic op")),
    };
    Ok(v)
}

fn compare(op: Op, a: Value, b: Value) -> Result<bool, VmError> {
    if let (Value::Bool(a), Value::Bool(b)) = (a, b) {
        return match op {
            Op::Eq => Ok(a == b),
            Op::Ne => Ok(a != b),
            _ => Err(VmError::new("ordering comparison on booleans")),
        };
    }
    if let (Value::Int(a), Value::Int(b)) = (a, b) {
        return Ok(match op {
            Op::Eq => a == b,
            Op::Ne => a != b,
            Op::Lt => a < b,
            Op::Le => a <= b,
            Op::Gt => a > b,
            _ => a >= b,
        });
    }
    let (a, b) = (as_f64(a)?, as_f64(b)?);
    Ok(match op {
        Op::Eq => a == b,
        Op::Ne => a != b,
        Op::Lt => a < b,
        Op::Le => a <= b,
        Op::Gt => a > b,
        _ => a >= b,
    })
}

fn min_f64(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() { f64::NAN } else { a.min(b) }
}

fn max_f64(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() { f64::NAN } else { a.max(b) }
}

fn call_builtin(
    id: BuiltinId,
    args: &[Value],
    host: &mut dyn Host,
) -> Result<Option<Value>, VmError> {
    let int = |i: usize| -> Result<i32, VmError> {
        args.get(i)
            .copied()
            .ok_or_else(|| VmError::new("missing argument"))
            .and_then(as_int)
    };
    let num = |i: usize| -> Result<f64, VmError> {
        args.get(i)
            .copied()
            .ok_or_else(|| VmError::new("missing argument"))
            .and_then(as_f64)
    };
    let all_int = args.iter().all(|v| matches!(v, Value::Int(_)));

    let out = match id {
        BuiltinId::Width => Value::Int(host.width()),
        BuiltinId::Height => Value::Int(host.height()),
        BuiltinId::GetPixel => Value::Int(host.get_pixel(int(0)?, int(1)?)),
        BuiltinId::SetPixel => {
            host.set_pixel(int(0)?, int(1)?, int(2)?);
            return Ok(None);
        }
        BuiltinId::PixelAlpha | BuiltinId::PixelRed | BuiltinId::PixelGreen | BuiltinId::PixelBlue => {
            let argb = host.get_pixel(int(0)?, int(1)?) as u32;
            let c = match id {
                BuiltinId::PixelAlpha => channel::alpha(argb),
                BuiltinId::PixelRed => channel::red(argb),
                BuiltinId::PixelGreen => channel::green(argb),
                _ => channel::blue(argb),
            };
            Value::Int(c as i32)
        }
        BuiltinId::Alpha => Value::Int(channel::alpha(int(0)? as u32) as i32),
        BuiltinId::Red => Value::Int(channel::red(int(0)? as u32) as i32),
        BuiltinId::Green => Value::Int(channel::green(int(0)? as u32) as i32),
        BuiltinId::Blue => Value::Int(channel::blue(int(0)? as u32) as i32),
        BuiltinId::MakeArgb => {
            let (a, r, g, b) = (int(0)?, int(1)?, int(2)?, int(3)?);
            let c = channel::make_argb(a.into(), r.into(), g.into(), b.into(), host.warnings());
            Value::Int(c as i32)
        }
        BuiltinId::MakeRgb => {
            let (r, g, b) = (int(0)?, int(1)?, int(2)?);
            let c = channel::make_rgb(r.into(), g.into(), b.into(), host.warnings());
            Value::Int(c as i32)
        }
        BuiltinId::SetProgress => {
            host.report_progress(int(0)?, int(1)?);
            return Ok(None);
        }
        BuiltinId::Limit => {
            let v = channel::limit(int(0)?.into(), int(1)?.into(), int(2)?.into());
            Value::Int(v as i32)
        }
        BuiltinId::Abs if all_int => Value::Int(int(0)?.wrapping_abs()),
        BuiltinId::Abs => Value::Double(num(0)?.abs()),
        BuiltinId::Min if all_int => Value::Int(int(0)?.min(int(1)?)),
        BuiltinId::Min => Value::Double(min_f64(num(0)?, num(1)?)),
        BuiltinId::Max if all_int => Value::Int(int(0)?.max(int(1)?)),
        BuiltinId::Max => Value::Double(max_f64(num(0)?, num(1)?)),
        BuiltinId::Sqrt => Value::Double(num(0)?.sqrt()),
        BuiltinId::Pow => Value::Double(num(0)?.powf(num(1)?)),
        BuiltinId::Exp => Value::Double(num(0)?.exp()),
        BuiltinId::Log => Value::Double(num(0)?.ln()),
        BuiltinId::Sin => Value::Double(num(0)?.sin()),
        BuiltinId::Cos => Value::Double(num(0)?.cos()),
        BuiltinId::Tan => Value::Double(num(0)?.tan()),
        BuiltinId::Atan2 => Value::Double(num(0)?.atan2(num(1)?)),
        BuiltinId::Floor => Value::Double(num(0)?.floor()),
        BuiltinId::Ceil => Value::Double(num(0)?.ceil()),
        BuiltinId::Round => Value::Int((num(0)? + 0.5).floor() as i32),
    };
    Ok(Some(out))
}

#[cfg(test)]
#[path = "../../tests/unit/script/vm.rs"]
mod tests;
