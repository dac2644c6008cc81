//! Native library modules: `io`, `string`, `debug`, `gc`.
//!
//! Each module is a named environment of [`Builtin`] values bound as a
//! constant in the global scope; dotted lookup (`io.println`) only sees
//! the module's directly-owned bindings.

mod debug;
mod gc;
mod io;
mod string;

use std::rc::Rc;

use crate::eval::Interp;
use crate::value::{Builtin, BuiltinFn, BuiltinInit, ModuleVal, Value};

/// One builtin registration row: name, exact arity (`None` = variadic),
/// handler, optional per-call init hook.
type Entry = (&'static str, Option<usize>, BuiltinFn, Option<BuiltinInit>);

pub fn install(interp: &mut Interp) {
    define(interp, "io", io::ENTRIES);
    define(interp, "string", string::ENTRIES);
    define(interp, "debug", debug::ENTRIES);
    define(interp, "gc", gc::ENTRIES);
}

fn define(interp: &mut Interp, name: &'static str, entries: &[Entry]) {
    let root = interp.root();
    let env = interp.heap.alloc_env(Some(root));
    interp.heap.mark_captured(env);

    for &(fn_name, arity, func, init) in entries {
        let builtin = Value::Builtin(Rc::new(Builtin {
            name: fn_name,
            arity,
            func,
            init,
            env,
        }));
        interp.heap.set_const(env, fn_name, builtin);
    }

    let module = Value::Module(Rc::new(ModuleVal {
        name: name.to_string(),
        env,
        parent: None,
    }));
    interp.heap.set_const(root, name, module);
}
