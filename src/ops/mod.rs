//! Operator semantics, split per left-operand tag.
//!
//! The dispatcher here evaluates operands, reads through reference cells
//! and routes to the tag module that owns the left operand. Two operator
//! families never evaluate their right operand eagerly:
//!
//! - `&&` / `||` short-circuit, so the right side is a [`Node`] evaluated
//!   only when the left side does not decide the answer,
//! - `.` resolves the right side as a member name, not as an expression.
//!
//! `==`/`!=` apply numeric promotion (`1 == 1.0` holds) before falling
//! back to structural equality; table keys use the stricter
//! [`Heap::equal`](crate::heap::Heap) directly.

pub mod array;
pub mod boolean;
pub mod character;
pub mod float;
pub mod integer;
pub mod interval;
pub mod module;
pub mod slice;
pub mod string;
pub mod table;

use std::rc::Rc;

use crate::ast::{InfixOp, Node, NodeKind, PrefixOp};
use crate::eval::Interp;
use crate::heap::EnvId;
use crate::token::Position;
use crate::value::{EvalResult, Flow, Interval, Value};

/// Failure for an operator applied to an unsupported tag pair.
pub(crate) fn undefined(op: InfixOp, a: &Value, b: &Value, pos: Position) -> Flow {
    Flow::fail(
        pos,
        format!(
            "operator {} not defined for {} and {}",
            op.symbol(),
            a.type_name(),
            b.type_name()
        ),
    )
}

pub fn eval_prefix(interp: &mut Interp, op: PrefixOp, operand: Value, pos: Position) -> EvalResult {
    let operand = interp.heap.read(&operand);

    match op {
        PrefixOp::Not => Ok(Value::Bool(!operand.truthy())),

        PrefixOp::Neg => match operand {
            Value::Int(n) => Ok(Value::Int(-n)),
            Value::Float(f) => Ok(Value::Float(-f)),
            Value::Bool(b) => Ok(Value::Int(if b { -1 } else { 0 })),
            other => Err(Flow::fail(
                pos,
                format!("operator - not defined for {}", other.type_name()),
            )),
        },
    }
}

/// Evaluate `left <op> right` where `left` is already evaluated and
/// `right` is still syntax (lazy for `&&`/`||`/`.`).
pub fn eval_infix(
    interp: &mut Interp,
    op: InfixOp,
    left: Value,
    right: &Node,
    env: EnvId,
    pos: Position,
) -> EvalResult {
    let left = interp.heap.read(&left);

    match op {
        InfixOp::And => {
            if !left.truthy() {
                return Ok(Value::Bool(false));
            }
            let right = interp.eval(right, env)?;
            Ok(Value::Bool(interp.heap.read(&right).truthy()))
        }

        InfixOp::Or => {
            if left.truthy() {
                return Ok(Value::Bool(true));
            }
            let right = interp.eval(right, env)?;
            Ok(Value::Bool(interp.heap.read(&right).truthy()))
        }

        InfixOp::Dot => {
            let NodeKind::Ident(name) = &right.kind else {
                return Err(Flow::fail(pos, "member access expects a name"));
            };
            match left {
                Value::Module(m) => module::access(interp, &m, name, pos),
                Value::Table(id) => Ok(table::dot(interp, id, name)),
                other => Err(Flow::fail(
                    pos,
                    format!("operator . not defined for {}", other.type_name()),
                )),
            }
        }

        InfixOp::Pipe => {
            let callee = interp.with_roots(&[left.clone()], |i| i.eval(right, env))?;
            let callee = interp.heap.read(&callee);
            interp.call_value(callee, vec![left], pos)
        }

        InfixOp::Range => {
            let right = interp.with_roots(&[left.clone()], |i| i.eval(right, env))?;
            let right = interp.heap.read(&right);
            make_interval(left, right, pos)
        }

        // The left operand is pinned while the right side evaluates;
        // a collection in between must not sweep it.
        _ => {
            let right = interp.with_roots(&[left.clone()], |i| i.eval(right, env))?;
            let right = interp.heap.read(&right);
            dispatch(interp, op, left, right, pos)
        }
    }
}

fn dispatch(interp: &mut Interp, op: InfixOp, left: Value, right: Value, pos: Position) -> EvalResult {
    match &left {
        Value::Int(n) => integer::infix(interp, op, *n, right, pos),
        Value::Float(f) => float::infix(interp, op, *f, right, pos),
        Value::Bool(b) => boolean::infix(interp, op, *b, right, pos),
        Value::Char(c) => character::infix(interp, op, *c, right, pos),
        Value::Str(_) => string::infix(interp, op, &left, right, pos),
        Value::Bytes(_) => string::bytes_infix(interp, op, &left, right, pos),
        Value::Array(id) => array::infix(interp, op, *id, right, pos),
        Value::Table(id) => table::infix(interp, op, *id, right, pos),
        Value::Slice(_) => slice::infix(interp, op, &left, right, pos),
        Value::Interval(_) => interval::infix(interp, op, &left, right, pos),

        Value::Null => match op {
            InfixOp::Eq => Ok(Value::Bool(matches!(right, Value::Null))),
            InfixOp::Ne => Ok(Value::Bool(!matches!(right, Value::Null))),
            _ => Err(undefined(op, &left, &right, pos)),
        },

        Value::Function(_) | Value::Builtin(_) | Value::Module(_) | Value::Quote(_) => match op {
            InfixOp::Eq => Ok(Value::Bool(interp.heap.equal(&left, &right))),
            InfixOp::Ne => Ok(Value::Bool(!interp.heap.equal(&left, &right))),
            _ => Err(undefined(op, &left, &right, pos)),
        },

        _ => Err(undefined(op, &left, &right, pos)),
    }
}

/// Construct an interval, rejecting mixed domains.
fn make_interval(left: Value, right: Value, pos: Position) -> EvalResult {
    let ok = matches!(
        (&left, &right),
        (Value::Int(_), Value::Int(_))
            | (Value::Float(_), Value::Float(_))
            | (Value::Char(_), Value::Char(_))
            | (Value::Bool(_), Value::Bool(_))
            | (Value::Str(_), Value::Str(_))
    );

    if !ok {
        return Err(Flow::fail(
            pos,
            format!(
                "interval endpoints must share a domain, got {} .. {}",
                left.type_name(),
                right.type_name()
            ),
        ));
    }

    Ok(Value::Interval(Rc::new(Interval { left, right })))
}

/// Evaluate `target[index]`.
pub fn eval_index(interp: &mut Interp, target: Value, index: Value, pos: Position) -> EvalResult {
    let target = interp.heap.read(&target);
    let index = interp.heap.read(&index);

    match &target {
        Value::Array(id) => array::index(interp, *id, index, pos),
        Value::Str(s) => string::index(interp, s, index, pos),
        Value::Bytes(b) => string::bytes_index(b, index, pos),
        Value::Table(id) => table::index(interp, *id, &index),
        Value::Slice(_) => slice::index(interp, &target, index, pos),

        other => Err(Flow::fail(
            pos,
            format!("{} is not indexable", other.type_name()),
        )),
    }
}

/// Resolve a possibly-negative index against a length.
/// Negative counts from the end.
pub(crate) fn resolve_index(raw: i64, len: usize, pos: Position) -> Result<usize, Flow> {
    let resolved = if raw < 0 { raw + len as i64 } else { raw };

    if resolved < 0 || resolved as usize >= len {
        return Err(Flow::fail(
            pos,
            format!("index {} out of range for length {}", raw, len),
        ));
    }

    Ok(resolved as usize)
}

/// Turn an interval into slice geometry over a sequence of `len`
/// elements: `(start, span, reversed)`. Half-open on the right in the
/// direction of travel.
pub(crate) fn resolve_span(
    interval: &Interval,
    len: usize,
    pos: Position,
) -> Result<(usize, usize, bool), Flow> {
    let (Value::Int(a), Value::Int(b)) = (&interval.left, &interval.right) else {
        return Err(Flow::fail(pos, "slice bounds must be integers"));
    };

    let fix = |raw: i64| if raw < 0 { raw + len as i64 } else { raw };
    let (a, b) = (fix(*a), fix(*b));

    let (start, span, reversed) = if a <= b { (a, b - a, false) } else { (b + 1, a - b, true) };

    if start < 0 || (start + span) as usize > len {
        return Err(Flow::fail(
            pos,
            format!("slice {}..{} out of range for length {}", interval.left, interval.right, len),
        ));
    }

    Ok((start as usize, span as usize, reversed))
}
