//! Character left-operand operations.
//!
//! `char + int` / `char - int` shift the code point; `char - char`
//! yields the code-point distance; `char + char` and `char + string`
//! concatenate into a string.

use crate::ast::InfixOp;
use crate::eval::Interp;
use crate::token::Position;
use crate::value::{EvalResult, Flow, Value};

use super::undefined;

pub fn infix(interp: &mut Interp, op: InfixOp, left: char, right: Value, pos: Position) -> EvalResult {
    match (op, &right) {
        (InfixOp::Add, Value::Int(n)) | (InfixOp::Sub, Value::Int(n)) => {
            let delta = if op == InfixOp::Sub { -n } else { *n };
            let code = left as i64 + delta;
            u32::try_from(code)
                .ok()
                .and_then(char::from_u32)
                .map(Value::Char)
                .ok_or_else(|| Flow::fail(pos, format!("character shift out of range: {}", code)))
        }

        (InfixOp::Sub, Value::Char(r)) => Ok(Value::Int(left as i64 - *r as i64)),

        (InfixOp::Add, Value::Char(r)) => {
            let mut s = String::with_capacity(8);
            s.push(left);
            s.push(*r);
            Ok(Value::string(s))
        }

        (InfixOp::Add, Value::Str(_) | Value::Slice(_)) => {
            if let Some(text) = interp.heap.string_of(&right) {
                Ok(Value::string(format!("{}{}", left, text)))
            } else {
                Err(undefined(op, &Value::Char(left), &right, pos))
            }
        }

        (InfixOp::Eq, Value::Char(r)) => Ok(Value::Bool(left == *r)),
        (InfixOp::Ne, Value::Char(r)) => Ok(Value::Bool(left != *r)),
        (InfixOp::Lt, Value::Char(r)) => Ok(Value::Bool(left < *r)),
        (InfixOp::Le, Value::Char(r)) => Ok(Value::Bool(left <= *r)),
        (InfixOp::Gt, Value::Char(r)) => Ok(Value::Bool(left > *r)),
        (InfixOp::Ge, Value::Char(r)) => Ok(Value::Bool(left >= *r)),

        (InfixOp::Eq, _) => Ok(Value::Bool(false)),
        (InfixOp::Ne, _) => Ok(Value::Bool(true)),

        _ => Err(undefined(op, &Value::Char(left), &right, pos)),
    }
}
