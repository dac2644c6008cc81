//! String (and byte-string) left-operand operations and indexing.
//!
//! Strings are immutable, so indexing yields the character value, not a
//! reference cell, and `string[interval]` yields a view.

use std::rc::Rc;

use crate::ast::InfixOp;
use crate::eval::Interp;
use crate::token::Position;
use crate::value::{EvalResult, Flow, SliceVal, Value};

use super::{resolve_index, resolve_span, undefined};

pub fn infix(interp: &mut Interp, op: InfixOp, left: &Value, right: Value, pos: Position) -> EvalResult {
    let text = interp
        .heap
        .string_of(left)
        .ok_or_else(|| undefined(op, left, &right, pos))?;

    match (op, &right) {
        (InfixOp::Add, Value::Char(c)) => Ok(Value::string(format!("{}{}", text, c))),

        (InfixOp::Add, Value::Str(_) | Value::Slice(_)) => {
            match interp.heap.string_of(&right) {
                Some(other) => Ok(Value::string(format!("{}{}", text, other))),
                None => Err(undefined(op, left, &right, pos)),
            }
        }

        (InfixOp::Mul, Value::Int(n)) => {
            if *n < 0 {
                return Err(Flow::fail(pos, "string repetition count is negative"));
            }
            Ok(Value::string(text.repeat(*n as usize)))
        }

        (InfixOp::Eq, _) => Ok(Value::Bool(interp.heap.equal(left, &right))),
        (InfixOp::Ne, _) => Ok(Value::Bool(!interp.heap.equal(left, &right))),

        (InfixOp::Lt | InfixOp::Le | InfixOp::Gt | InfixOp::Ge, _) => {
            let other = interp
                .heap
                .string_of(&right)
                .ok_or_else(|| undefined(op, left, &right, pos))?;
            Ok(Value::Bool(match op {
                InfixOp::Lt => text < other,
                InfixOp::Le => text <= other,
                InfixOp::Gt => text > other,
                _ => text >= other,
            }))
        }

        _ => Err(undefined(op, left, &right, pos)),
    }
}

pub fn index(_interp: &mut Interp, s: &Rc<str>, index: Value, pos: Position) -> EvalResult {
    match index {
        Value::Int(raw) => {
            let chars: Vec<char> = s.chars().collect();
            let at = resolve_index(raw, chars.len(), pos)?;
            Ok(Value::Char(chars[at]))
        }

        Value::Interval(iv) => {
            let len = s.chars().count();
            let (start, span, reversed) = resolve_span(&iv, len, pos)?;
            Ok(Value::Slice(Rc::new(SliceVal {
                parent: Value::Str(s.clone()),
                start,
                len: span,
                reversed,
            })))
        }

        other => Err(Flow::fail(
            pos,
            format!("string index must be integer or interval, got {}", other.type_name()),
        )),
    }
}

pub fn bytes_infix(
    interp: &mut Interp,
    op: InfixOp,
    left: &Value,
    right: Value,
    pos: Position,
) -> EvalResult {
    match (op, &right) {
        (InfixOp::Add, Value::Bytes(r)) => {
            let Value::Bytes(l) = left else {
                return Err(undefined(op, left, &right, pos));
            };
            let mut joined = Vec::with_capacity(l.len() + r.len());
            joined.extend_from_slice(l);
            joined.extend_from_slice(r);
            Ok(Value::bytes(joined))
        }

        (InfixOp::Eq, _) => Ok(Value::Bool(interp.heap.equal(left, &right))),
        (InfixOp::Ne, _) => Ok(Value::Bool(!interp.heap.equal(left, &right))),

        _ => Err(undefined(op, left, &right, pos)),
    }
}

pub fn bytes_index(bytes: &Rc<[u8]>, index: Value, pos: Position) -> EvalResult {
    match index {
        Value::Int(raw) => {
            let at = resolve_index(raw, bytes.len(), pos)?;
            Ok(Value::Int(bytes[at] as i64))
        }

        Value::Interval(iv) => {
            let (start, span, reversed) = resolve_span(&iv, bytes.len(), pos)?;
            let mut section = bytes[start..start + span].to_vec();
            if reversed {
                section.reverse();
            }
            Ok(Value::bytes(section))
        }

        other => Err(Flow::fail(
            pos,
            format!(
                "rawstring index must be integer or interval, got {}",
                other.type_name()
            ),
        )),
    }
}
