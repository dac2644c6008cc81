//! Interval left-operand operations: equality only. Everything else an
//! interval can do (iteration, slicing) happens where it is consumed.

use crate::ast::InfixOp;
use crate::eval::Interp;
use crate::token::Position;
use crate::value::{EvalResult, Value};

use super::undefined;

pub fn infix(interp: &mut Interp, op: InfixOp, left: &Value, right: Value, pos: Position) -> EvalResult {
    match op {
        InfixOp::Eq => Ok(Value::Bool(interp.heap.equal(left, &right))),
        InfixOp::Ne => Ok(Value::Bool(!interp.heap.equal(left, &right))),
        _ => Err(undefined(op, left, &right, pos)),
    }
}
