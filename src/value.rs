//! Runtime value model for Mico.
//!
//! [`Value`] is a closed tagged union. Scalars are stored inline; strings
//! share their backing buffer via `Rc`; containers (arrays, tables,
//! reference cells, environments) are arena ids into the [`crate::heap::Heap`],
//! which is what gives assignment its reference semantics: copying a `Value`
//! copies the id, not the storage.
//!
//! Control-flow signals (`return`/`break`/`continue`/failures) travel on the
//! [`Flow`] channel — the `Err` side of [`EvalResult`] — so that every
//! evaluation site is forced by the type system to either catch or
//! re-propagate them.

use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use crate::ast::{Node, Param};
use crate::heap::{ArrayId, EnvId, SlotId, TableId};
use crate::token::Position;

/// Every runtime value.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Char(char),

    /// Immutable text. The binding may be reassigned; the content may not.
    Str(Rc<str>),

    /// Raw byte string, a distinct domain from text.
    Bytes(Rc<[u8]>),

    /// Ordered sequence of reference cells (arena id).
    Array(ArrayId),

    /// Structurally-keyed hash table of reference cells (arena id).
    Table(TableId),

    /// Closure: parameters, body, captured environment, and the offset of
    /// the first still-unbound parameter (partial application).
    Function(Rc<Function>),

    /// Native callable bound to a module environment.
    Builtin(Rc<Builtin>),

    /// Deferred invocation, consumed by the trampoline. Never a final value.
    TailCall(Rc<TailCall>),

    /// Named environment exposing its directly-owned bindings.
    Module(Rc<ModuleVal>),

    /// Mutable reference cell.
    Ref(SlotId),

    /// Range value over the Int/Float/Char/Bool/Str domains,
    /// half-open on the right in the direction of travel.
    Interval(Rc<Interval>),

    /// View over a contiguous sub-range of an Array or Str.
    Slice(Rc<SliceVal>),

    /// Quoted AST fragment.
    Quote(Rc<Node>),
}

impl Value {
    pub fn string(s: impl AsRef<str>) -> Self {
        Value::Str(Rc::from(s.as_ref()))
    }

    pub fn bytes(b: impl AsRef<[u8]>) -> Self {
        Value::Bytes(Rc::from(b.as_ref()))
    }

    /// Human-readable tag name used in operator error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Char(_) => "character",
            Value::Str(_) => "string",
            Value::Bytes(_) => "rawstring",
            Value::Array(_) => "array",
            Value::Table(_) => "table",
            Value::Function(_) => "function",
            Value::Builtin(_) => "builtin",
            Value::TailCall(_) => "tailcall",
            Value::Module(_) => "module",
            Value::Ref(_) => "reference",
            Value::Interval(_) => "interval",
            Value::Slice(_) => "slice",
            Value::Quote(_) => "quote",
        }
    }

    /// Truthiness: `null`, `false` and numeric zero are false;
    /// everything else is true.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            _ => true,
        }
    }
}

/// A user-defined closure.
#[derive(Debug)]
pub struct Function {
    /// Full declared parameter list.
    pub params: Rc<[Param]>,

    /// Body statements.
    pub body: Rc<[Node]>,

    /// Captured (owning) environment.
    pub env: EnvId,

    /// Index of the first parameter not yet bound by partial application.
    pub offset: usize,
}

impl Function {
    /// Parameters still awaiting arguments.
    pub fn remaining(&self) -> &[Param] {
        &self.params[self.offset..]
    }

    /// Does the remaining parameter list end in an ellipsis collector?
    pub fn variadic(&self) -> bool {
        self.params.last().is_some_and(|p| p.ellipsis)
    }
}

/// Signature of a native builtin. Receives the evaluator context, the
/// already-evaluated (and de-referenced) arguments, and the call position.
pub type BuiltinFn = fn(&mut crate::eval::Interp, &[Value], Position) -> EvalResult;

/// Hook run at the start of every builtin invocation.
pub type BuiltinInit = fn(&mut crate::eval::Interp);

/// A native callable registered by a builtin module.
pub struct Builtin {
    pub name: &'static str,

    /// Exact arity, or `None` for variadic builtins.
    pub arity: Option<usize>,

    pub func: BuiltinFn,

    /// Invoked once per call, before `func`.
    pub init: Option<BuiltinInit>,

    /// The module environment this builtin is bound to.
    pub env: EnvId,
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<builtin {}>", self.name)
    }
}

/// A deferred call: callee + evaluated arguments + the environment the
/// call site was evaluated in.
#[derive(Debug)]
pub struct TailCall {
    pub callee: Value,
    pub args: Vec<Value>,
    pub env: EnvId,
    pub pos: Position,
}

/// A named module: an environment whose directly-owned bindings are
/// reachable through dotted access, plus an explicit parent-module chain.
#[derive(Debug)]
pub struct ModuleVal {
    pub name: String,
    pub env: EnvId,
    pub parent: Option<Rc<ModuleVal>>,
}

/// A range value. Domain mixing (e.g. `1 .. 'a'`) is rejected at
/// construction by the Range operator handler.
#[derive(Debug, Clone)]
pub struct Interval {
    pub left: Value,
    pub right: Value,
}

/// A view into a parent Array or Str spanning `[start, start + len)`
/// of the parent's element sequence; `reversed` flips iteration order.
#[derive(Debug, Clone)]
pub struct SliceVal {
    pub parent: Value,
    pub start: usize,
    pub len: usize,
    pub reversed: bool,
}

/// A runtime failure: source position plus message. Propagates like a
/// short-circuiting result, never unwinds the native stack.
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub pos: Position,
    pub message: String,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[line {}] {}", self.pos, self.message)
    }
}

/// Control-flow signals. Mirrors the single-error-enum discipline used for
/// the front end: each variant is caught at exactly one boundary kind
/// (function call for `Return`, loop for `Break`/`Continue`) and a signal
/// escaping its boundary becomes a `Fail`.
#[derive(Debug, Error)]
pub enum Flow {
    #[error("return outside of a function")]
    Return(Value),

    #[error("break outside of a loop")]
    Break(Position),

    #[error("continue outside of a loop")]
    Continue(Position),

    #[error("{0}")]
    Fail(Failure),
}

impl Flow {
    /// Helper constructor for runtime failures.
    pub fn fail(pos: Position, msg: impl Into<String>) -> Self {
        Flow::Fail(Failure {
            pos,
            message: msg.into(),
        })
    }
}

/// Result alias used by every evaluation function.
pub type EvalResult = std::result::Result<Value, Flow>;

impl fmt::Display for Value {
    /// Heap-independent rendering. Containers print as opaque tags here;
    /// user-facing output goes through `Heap::render`, which follows ids.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => {
                let mut buf = itoa::Buffer::new();
                write!(f, "{}", buf.format(*n))
            }
            Value::Float(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    write!(f, "{:.1}", n)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::Char(c) => write!(f, "{}", c),
            Value::Str(s) => write!(f, "{}", s),
            Value::Bytes(b) => write!(f, "b\"{}\"", b.escape_ascii()),
            Value::Array(_) => write!(f, "<array>"),
            Value::Table(_) => write!(f, "<table>"),
            Value::Function(func) => {
                if func.offset > 0 {
                    write!(f, "<fn/partial:{}>", func.offset)
                } else {
                    write!(f, "<fn/{}>", func.params.len())
                }
            }
            Value::Builtin(b) => write!(f, "<builtin {}>", b.name),
            Value::TailCall(_) => write!(f, "<tailcall>"),
            Value::Module(m) => write!(f, "<module {}>", m.name),
            Value::Ref(_) => write!(f, "<reference>"),
            Value::Interval(iv) => write!(f, "{}..{}", iv.left, iv.right),
            Value::Slice(_) => write!(f, "<slice>"),
            Value::Quote(node) => write!(f, "quote({})", node),
        }
    }
}
