//! Float left-operand operations. Integers and booleans on the right
//! promote to float.

use crate::ast::InfixOp;
use crate::eval::Interp;
use crate::token::Position;
use crate::value::{EvalResult, Flow, Value};

use super::undefined;

pub fn infix(_interp: &mut Interp, op: InfixOp, left: f64, right: Value, pos: Position) -> EvalResult {
    let r = match right {
        Value::Float(r) => r,
        Value::Int(r) => r as f64,
        Value::Bool(b) => b as i64 as f64,

        other => {
            return match op {
                InfixOp::Eq => Ok(Value::Bool(false)),
                InfixOp::Ne => Ok(Value::Bool(true)),
                _ => Err(undefined(op, &Value::Float(left), &other, pos)),
            }
        }
    };

    match op {
        InfixOp::Add => Ok(Value::Float(left + r)),
        InfixOp::Sub => Ok(Value::Float(left - r)),
        InfixOp::Mul => Ok(Value::Float(left * r)),

        InfixOp::Div => {
            if r == 0.0 {
                return Err(Flow::fail(pos, "division by zero"));
            }
            Ok(Value::Float(left / r))
        }

        InfixOp::Mod => {
            if r == 0.0 {
                return Err(Flow::fail(pos, "modulo by zero"));
            }
            Ok(Value::Float(left % r))
        }

        InfixOp::Eq => Ok(Value::Bool(left == r)),
        InfixOp::Ne => Ok(Value::Bool(left != r)),
        InfixOp::Lt => Ok(Value::Bool(left < r)),
        InfixOp::Le => Ok(Value::Bool(left <= r)),
        InfixOp::Gt => Ok(Value::Bool(left > r)),
        InfixOp::Ge => Ok(Value::Bool(left >= r)),

        _ => Err(undefined(op, &Value::Float(left), &Value::Float(r), pos)),
    }
}
