//! Boolean left-operand operations. In arithmetic context a boolean
//! promotes to 0/1, so `true + 1` is `2`.

use crate::ast::InfixOp;
use crate::eval::Interp;
use crate::token::Position;
use crate::value::{EvalResult, Value};

use super::{float, integer, undefined};

pub fn infix(interp: &mut Interp, op: InfixOp, left: bool, right: Value, pos: Position) -> EvalResult {
    match (op, &right) {
        (InfixOp::Eq, Value::Bool(r)) => Ok(Value::Bool(left == *r)),
        (InfixOp::Ne, Value::Bool(r)) => Ok(Value::Bool(left != *r)),

        // Promote and let the numeric modules handle the rest.
        (_, Value::Int(_) | Value::Bool(_)) => integer::infix(interp, op, left as i64, right, pos),
        (_, Value::Float(_)) => float::infix(interp, op, left as i64 as f64, right, pos),

        (InfixOp::Eq, _) => Ok(Value::Bool(false)),
        (InfixOp::Ne, _) => Ok(Value::Bool(true)),

        _ => Err(undefined(op, &Value::Bool(left), &right, pos)),
    }
}
