//! Integer left-operand operations. The right operand may be an
//! integer, a float (promoting the whole expression to float) or a
//! boolean (promoting to 0/1).

use crate::ast::InfixOp;
use crate::eval::Interp;
use crate::token::Position;
use crate::value::{EvalResult, Flow, Value};

use super::{float, undefined};

pub fn infix(interp: &mut Interp, op: InfixOp, left: i64, right: Value, pos: Position) -> EvalResult {
    match right {
        Value::Int(r) => int_int(op, left, r, pos),
        Value::Float(_) => float::infix(interp, op, left as f64, right, pos),
        Value::Bool(b) => int_int(op, left, b as i64, pos),

        other => match op {
            InfixOp::Eq => Ok(Value::Bool(false)),
            InfixOp::Ne => Ok(Value::Bool(true)),
            _ => Err(undefined(op, &Value::Int(left), &other, pos)),
        },
    }
}

fn int_int(op: InfixOp, l: i64, r: i64, pos: Position) -> EvalResult {
    match op {
        InfixOp::Add => Ok(Value::Int(l.wrapping_add(r))),
        InfixOp::Sub => Ok(Value::Int(l.wrapping_sub(r))),
        InfixOp::Mul => Ok(Value::Int(l.wrapping_mul(r))),

        InfixOp::Div => {
            if r == 0 {
                return Err(Flow::fail(pos, "division by zero"));
            }
            Ok(Value::Int(l.wrapping_div(r)))
        }

        InfixOp::Mod => {
            if r == 0 {
                return Err(Flow::fail(pos, "modulo by zero"));
            }
            Ok(Value::Int(l.wrapping_rem(r)))
        }

        InfixOp::Eq => Ok(Value::Bool(l == r)),
        InfixOp::Ne => Ok(Value::Bool(l != r)),
        InfixOp::Lt => Ok(Value::Bool(l < r)),
        InfixOp::Le => Ok(Value::Bool(l <= r)),
        InfixOp::Gt => Ok(Value::Bool(l > r)),
        InfixOp::Ge => Ok(Value::Bool(l >= r)),

        _ => Err(undefined(op, &Value::Int(l), &Value::Int(r), pos)),
    }
}
