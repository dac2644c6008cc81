//! Dotted member access on module values.
//!
//! Only bindings directly owned by the module's environment are visible;
//! the enclosing lexical chain stays private. Module members are
//! read-only from the outside.

use crate::eval::Interp;
use crate::token::Position;
use crate::value::{EvalResult, Flow, ModuleVal};

pub fn access(interp: &mut Interp, module: &ModuleVal, name: &str, pos: Position) -> EvalResult {
    match interp.heap.get_local_slot(module.env, name) {
        Some(slot) => Ok(interp.heap.slot(slot).value.clone()),
        None => Err(Flow::fail(
            pos,
            format!("module {} has no member {}", module.name, name),
        )),
    }
}
