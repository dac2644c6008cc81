//! Array left-operand operations and indexing.
//!
//! `array[int]` yields the element's reference cell, which is what makes
//! `b[0] = 9` visible through every alias of the array. `array[interval]`
//! yields a view.

use std::rc::Rc;

use crate::ast::InfixOp;
use crate::eval::Interp;
use crate::heap::ArrayId;
use crate::token::Position;
use crate::value::{EvalResult, Flow, SliceVal, Value};

use super::{resolve_index, resolve_span, undefined};

pub fn infix(interp: &mut Interp, op: InfixOp, left: ArrayId, right: Value, pos: Position) -> EvalResult {
    match (op, &right) {
        // Concatenation builds a fresh array with fresh cells; the
        // element values themselves keep their identity.
        (InfixOp::Add, Value::Array(_) | Value::Slice(_)) => {
            let mut items = interp
                .heap
                .sequence(&Value::Array(left))
                .unwrap_or_default();
            let tail = interp
                .heap
                .sequence(&right)
                .ok_or_else(|| undefined(op, &Value::Array(left), &right, pos))?;
            items.extend(tail);

            let owner = interp.root();
            let slots = items
                .into_iter()
                .map(|v| interp.heap.alloc_slot(v, owner, false))
                .collect();
            Ok(Value::Array(interp.heap.alloc_array(slots)))
        }

        (InfixOp::Eq, _) => Ok(Value::Bool(interp.heap.equal(&Value::Array(left), &right))),
        (InfixOp::Ne, _) => Ok(Value::Bool(!interp.heap.equal(&Value::Array(left), &right))),

        _ => Err(undefined(op, &Value::Array(left), &right, pos)),
    }
}

pub fn index(interp: &mut Interp, id: ArrayId, index: Value, pos: Position) -> EvalResult {
    match index {
        Value::Int(raw) => {
            let len = interp.heap.array(id).items.len();
            let at = resolve_index(raw, len, pos)?;
            Ok(Value::Ref(interp.heap.array(id).items[at]))
        }

        Value::Interval(iv) => {
            let len = interp.heap.array(id).items.len();
            let (start, span, reversed) = resolve_span(&iv, len, pos)?;
            Ok(Value::Slice(Rc::new(SliceVal {
                parent: Value::Array(id),
                start,
                len: span,
                reversed,
            })))
        }

        other => Err(Flow::fail(
            pos,
            format!("array index must be integer or interval, got {}", other.type_name()),
        )),
    }
}
