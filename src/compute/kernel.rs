use crate::compute::bytecode::{MathExpr, OpCode};
use smallvec::SmallVec;
use std::f64::consts::FRAC_PI_2;

/// Applies a single-argument operator.
#[inline(always)]
pub fn apply_unary(op: OpCode, x: f64) -> f64 {
    match op {
        OpCode::Neg => -x,
        OpCode::Cos => x.cos(),
        OpCode::Sin => x.sin(),
        OpCode::Tan => x.tan(),
        OpCode::Cot => 1.0 / x.tan(),
        OpCode::Abs => x.abs(),
        OpCode::Sgn => {
            if x < 0.0 { -1.0 } else if x > 0.0 { 1.0 } else { 0.0 }
        }
        OpCode::Sqrt => x.sqrt(),
        OpCode::Log => x.ln(),
        OpCode::Exp => x.exp(),
        OpCode::Asin => x.asin(),
        OpCode::Acos => x.acos(),
        OpCode::Atan => x.atan(),
        OpCode::Acot => FRAC_PI_2 - x.atan(),
        OpCode::Sinh => x.sinh(),
        OpCode::Cosh => x.cosh(),
        OpCode::Tanh => x.tanh(),
        OpCode::Coth => 1.0 / x.tanh(),
        OpCode::Log10 => x.log10(),
        OpCode::Step => {
            if x <= 0.0 { 0.0 } else { 1.0 }
        }
        _ => x,
    }
}

#[inline(always)]
pub fn apply_binary(op: OpCode, a: f64, b: f64) -> f64 {
    match op {
        OpCode::Add => a + b,
        OpCode::Sub => a - b,
        OpCode::Mul => a * b,
        OpCode::Div => a / b,
        OpCode::Pow => a.powf(b),
        _ => f64::NAN,
    }
}

/// Runs a postfix tape. `lookup` supplies the value for a variable code.
///
/// The result may be non-finite; callers decide whether that is an error.
pub fn evaluate(expr: &MathExpr, lookup: impl Fn(u32) -> f64) -> f64 {
    let mut stack: SmallVec<[f64; 16]> = SmallVec::new();

    for (i, &op) in expr.ops.iter().enumerate() {
        match op {
            OpCode::Num => stack.push(expr.values[expr.args[i] as usize]),
            OpCode::Var => stack.push(lookup(expr.args[i])),
            OpCode::Add | OpCode::Sub | OpCode::Mul | OpCode::Div | OpCode::Pow => {
                let b = stack.pop().unwrap_or(f64::NAN);
                let a = stack.pop().unwrap_or(f64::NAN);
                stack.push(apply_binary(op, a, b));
            }
            _ => {
                let x = stack.pop().unwrap_or(f64::NAN);
                stack.push(apply_unary(op, x));
            }
        }
    }
    stack.pop().unwrap_or(f64::NAN)
}
