//! Slice left-operand operations and indexing.
//!
//! A string-shaped slice behaves like the string it shows; an
//! array-shaped slice behaves like a materialized array for operators,
//! while indexing stays a view operation (sub-slicing never copies).

use std::rc::Rc;

use crate::ast::InfixOp;
use crate::eval::Interp;
use crate::token::Position;
use crate::value::{EvalResult, Flow, SliceVal, Value};

use super::{resolve_index, resolve_span, string, undefined};

pub fn infix(interp: &mut Interp, op: InfixOp, left: &Value, right: Value, pos: Position) -> EvalResult {
    if interp.heap.string_of(left).is_some() {
        return string::infix(interp, op, left, right, pos);
    }

    match (op, &right) {
        (InfixOp::Add, Value::Array(_) | Value::Slice(_)) => {
            let mut items = interp
                .heap
                .sequence(left)
                .ok_or_else(|| undefined(op, left, &right, pos))?;
            let tail = interp
                .heap
                .sequence(&right)
                .ok_or_else(|| undefined(op, left, &right, pos))?;
            items.extend(tail);

            let owner = interp.root();
            let slots = items
                .into_iter()
                .map(|v| interp.heap.alloc_slot(v, owner, false))
                .collect();
            Ok(Value::Array(interp.heap.alloc_array(slots)))
        }

        (InfixOp::Eq, _) => Ok(Value::Bool(interp.heap.equal(left, &right))),
        (InfixOp::Ne, _) => Ok(Value::Bool(!interp.heap.equal(left, &right))),

        _ => Err(undefined(op, left, &right, pos)),
    }
}

pub fn index(interp: &mut Interp, slice: &Value, index: Value, pos: Position) -> EvalResult {
    let Value::Slice(view) = slice else {
        return Err(Flow::fail(pos, "slice index on a non-slice"));
    };

    match index {
        Value::Int(raw) => {
            let at = resolve_index(raw, view.len, pos)?;
            let at = if view.reversed { view.len - 1 - at } else { at };
            let parent_index = Value::Int((view.start + at) as i64);
            super::eval_index(interp, view.parent.clone(), parent_index, pos)
        }

        Value::Interval(iv) => {
            let (start, span, reversed) = resolve_span(&iv, view.len, pos)?;
            // Compose the sub-view's geometry with the parent view's.
            let (abs_start, abs_rev) = if view.reversed {
                (view.start + view.len - start - span, reversed != view.reversed)
            } else {
                (view.start + start, reversed)
            };
            Ok(Value::Slice(Rc::new(SliceVal {
                parent: view.parent.clone(),
                start: abs_start,
                len: span,
                reversed: abs_rev,
            })))
        }

        other => Err(Flow::fail(
            pos,
            format!("slice index must be integer or interval, got {}", other.type_name()),
        )),
    }
}
