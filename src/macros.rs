//! Pre-evaluation constant folding.
//!
//! A rewrite pass over the parsed program using the AST `mutate`
//! visitor: operator trees whose operands are all literals are evaluated
//! once in a scratch scope and replaced by their literal result. Only
//! scalar results fold — containers keep their literal form so reference
//! semantics stay per-evaluation — and anything that fails to evaluate
//! (e.g. `1 / 0`) is left alone so the failure surfaces at runtime with
//! its real source position.

use log::debug;

use crate::ast::{Node, NodeKind};
use crate::eval::Interp;
use crate::value::Value;

pub fn fold_constants(program: &mut [Node]) {
    let mut scratch = Interp::new();
    let env = scratch.root();
    let mut folded = 0usize;

    for node in program.iter_mut() {
        node.mutate(&mut |n| {
            if !matches!(n.kind, NodeKind::Prefix { .. } | NodeKind::Infix { .. }) {
                return None;
            }
            if !n.is_const() {
                return None;
            }

            let value = scratch.eval(n, env).ok()?;
            let literal = scalar_literal(&value)?;

            folded += 1;
            Some(Node::new(literal, n.pos))
        });
    }

    if folded > 0 {
        debug!("constant folding replaced {} expressions", folded);
    }
}

fn scalar_literal(value: &Value) -> Option<NodeKind> {
    match value {
        Value::Null => Some(NodeKind::Null),
        Value::Bool(b) => Some(NodeKind::Bool(*b)),
        Value::Int(n) => Some(NodeKind::Int(*n)),
        Value::Float(f) => Some(NodeKind::Float(*f)),
        Value::Char(c) => Some(NodeKind::Char(*c)),
        Value::Str(s) => Some(NodeKind::Str(s.to_string())),
        Value::Bytes(b) => Some(NodeKind::Bytes(b.to_vec())),
        _ => None,
    }
}
