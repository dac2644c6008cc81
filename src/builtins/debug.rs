//! `debug` module: introspection helpers.

use crate::eval::Interp;
use crate::token::Position;
use crate::value::{EvalResult, Flow, Value};

use super::Entry;

pub(super) const ENTRIES: &[Entry] = &[
    ("type", Some(1), type_of, None),
    ("clone", Some(1), clone, None),
    ("dump", Some(1), dump, None),
    ("env", Some(0), env, None),
    ("eval", Some(1), eval_quote, None),
];

fn type_of(_interp: &mut Interp, args: &[Value], _pos: Position) -> EvalResult {
    Ok(Value::string(args[0].type_name()))
}

/// Deep copy: containers get fresh storage, closures keep sharing
/// their captured environment.
fn clone(interp: &mut Interp, args: &[Value], _pos: Position) -> EvalResult {
    let arg = args[0].clone();
    Ok(interp.heap.deep_clone(&arg))
}

/// Render a value the way containers print nested: strings quoted,
/// structure visible.
fn dump(interp: &mut Interp, args: &[Value], _pos: Position) -> EvalResult {
    let rendered = match &args[0] {
        v if interp.heap.string_of(v).is_some() => {
            format!("\"{}\"", interp.heap.render(v))
        }
        v => interp.heap.render(v),
    };
    Ok(Value::string(rendered))
}

/// Names bound in the global scope, sorted, as an array of strings.
fn env(interp: &mut Interp, _args: &[Value], _pos: Position) -> EvalResult {
    let root = interp.root();
    let names = interp.heap.local_names(root);

    let slots = names
        .into_iter()
        .map(|n| {
            let value = Value::string(n);
            interp.heap.alloc_slot(value, root, false)
        })
        .collect();

    Ok(Value::Array(interp.heap.alloc_array(slots)))
}

/// Evaluate a quoted AST fragment in the global scope.
fn eval_quote(interp: &mut Interp, args: &[Value], pos: Position) -> EvalResult {
    match &args[0] {
        Value::Quote(node) => {
            let node = node.clone();
            let root = interp.root();
            interp.eval(&node, root)
        }
        other => Err(Flow::fail(
            pos,
            format!("eval expects a quote, got {}", other.type_name()),
        )),
    }
}
