//! Table left-operand operations, indexing and dotted access.
//!
//! Key lookup is structural and strict about tags (`1` and `1.0` are
//! distinct keys). A missing key reads as `null`; assignment through an
//! absent key inserts it (handled by the evaluator's assignment path).

use crate::ast::InfixOp;
use crate::eval::Interp;
use crate::heap::TableId;
use crate::token::Position;
use crate::value::{EvalResult, Value};

use super::undefined;

pub fn infix(interp: &mut Interp, op: InfixOp, left: TableId, right: Value, pos: Position) -> EvalResult {
    match op {
        InfixOp::Eq => Ok(Value::Bool(interp.heap.equal(&Value::Table(left), &right))),
        InfixOp::Ne => Ok(Value::Bool(!interp.heap.equal(&Value::Table(left), &right))),
        _ => Err(undefined(op, &Value::Table(left), &right, pos)),
    }
}

pub fn index(interp: &mut Interp, id: TableId, key: &Value) -> EvalResult {
    match interp.heap.table_get(id, key) {
        Some(slot) => Ok(Value::Ref(slot)),
        None => Ok(Value::Null),
    }
}

/// `table.name` sugar for string-keyed lookup.
pub fn dot(interp: &mut Interp, id: TableId, name: &str) -> Value {
    match interp.heap.table_get(id, &Value::string(name)) {
        Some(slot) => Value::Ref(slot),
        None => Value::Null,
    }
}
