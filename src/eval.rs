//! Tree-walking evaluator.
//!
//! [`Interp`] owns the heap, the root scope, the quote registry and a
//! call-depth counter. Evaluation is expression-oriented: every node
//! yields a value, blocks yield their last statement's value.
//!
//! Four disciplines shape this module:
//!
//! - **Scopes are bracketed by construction.** Every scope entry goes
//!   through [`Interp::with_scope`], which locks the new scope, runs the
//!   closure, unlocks, and offers the scope to the eager pruner. There is
//!   no code path that can leave a scope locked.
//! - **Control flow rides the `Err` channel.** `return`/`break`/
//!   `continue` and runtime failures are [`Flow`] values; each is caught
//!   at exactly one boundary (calls catch `Return`, loops catch
//!   `Break`/`Continue`), and anything escaping its boundary surfaces as
//!   an error at the program edge.
//! - **Tail calls never grow the native stack.** `eval_tail` packages a
//!   call in tail position as a [`Value::TailCall`] instead of applying
//!   it; [`Interp::call_value`] runs the trampoline that unwraps deferred
//!   calls in a flat loop. Non-tail recursion is bounded by a depth
//!   counter bumped on every node evaluation, so runaway user code
//!   fails cleanly instead of overflowing the native stack.
//! - **Unattached values are pinned.** A value held only in a native
//!   local while further evaluation runs (the object of an index, the
//!   prefix of an argument list, a table under construction) is pushed
//!   on the temp-root stack via [`Interp::with_roots`]; the collector
//!   includes that stack in its root set.

use std::rc::Rc;

use log::debug;

use crate::ast::{InfixOp, Node, NodeKind, Param};
use crate::generator::Generator;
use crate::heap::{EnvId, GcStats, Heap};
use crate::ops;
use crate::token::Position;
use crate::value::{EvalResult, Flow, Function, ModuleVal, TailCall, Value};

/// Node-evaluation recursion cap. Crossing it raises a runtime failure
/// well before the native stack runs out.
pub const MAX_DEPTH: usize = 2048;

pub struct Interp {
    pub heap: Heap,

    root: EnvId,

    /// Values quoted into syntax that has no literal form; addressed by
    /// [`NodeKind::Registry`].
    pub registry: Vec<Value>,

    /// Evaluated-but-unattached values (an indexed object while its
    /// index evaluates, argument prefixes, a table under construction).
    /// They live only in native locals, so the collector treats this
    /// stack as an extra root set.
    temps: Vec<Value>,

    depth: usize,
}

impl Default for Interp {
    fn default() -> Self {
        Self::new()
    }
}

impl Interp {
    pub fn new() -> Self {
        let mut heap = Heap::new();
        let root = heap.alloc_env(None);

        Self {
            heap,
            root,
            registry: Vec::new(),
            temps: Vec::new(),
            depth: 0,
        }
    }

    /// The global scope.
    pub fn root(&self) -> EnvId {
        self.root
    }

    /// Run `f` with `roots` pinned against collection for the duration.
    /// Any value held in a native local across an evaluation that may
    /// allocate must be pinned this way.
    pub(crate) fn with_roots<T, F>(&mut self, roots: &[Value], f: F) -> T
    where
        F: FnOnce(&mut Self) -> T,
    {
        self.temps.extend_from_slice(roots);
        let result = f(self);
        self.temps.truncate(self.temps.len() - roots.len());
        result
    }

    /// Mark-sweep with the evaluator's ambient roots: the global scope,
    /// the quote registry and every pinned temporary.
    pub fn collect_garbage(&mut self) -> GcStats {
        let mut roots = self.registry.clone();
        roots.extend(self.temps.iter().cloned());
        self.heap.collect(&[self.root], &roots)
    }

    /// Run `f` inside a fresh child scope of `parent`. The scope is
    /// locked for the duration and offered to the eager pruner afterward.
    pub fn with_scope<F>(&mut self, parent: EnvId, f: F) -> EvalResult
    where
        F: FnOnce(&mut Self, EnvId) -> EvalResult,
    {
        let scope = self.heap.alloc_env(Some(parent));
        self.heap.lock(scope);

        let result = f(self, scope);

        self.heap.unlock(scope);
        self.heap.release_scope(scope);

        result
    }

    /// Evaluate a statement sequence; the last statement's value is the
    /// block's value, `null` for an empty block.
    pub fn eval_block(&mut self, body: &[Node], env: EnvId) -> EvalResult {
        let mut last = Value::Null;
        for stmt in body {
            last = self.eval(stmt, env)?;
        }
        Ok(last)
    }

    /// Like [`Interp::eval_block`], but the final statement is evaluated
    /// in tail position.
    fn eval_block_tail(&mut self, body: &[Node], env: EnvId) -> EvalResult {
        let Some((last, init)) = body.split_last() else {
            return Ok(Value::Null);
        };

        for stmt in init {
            self.eval(stmt, env)?;
        }
        self.eval_tail(last, env)
    }

    // ── expression evaluation ────────────────────────────────────────────

    /// Evaluate one node, counting the recursion against [`MAX_DEPTH`].
    /// Every nested evaluation that can recurse funnels through here, so
    /// runaway user recursion fails cleanly long before the native stack
    /// is exhausted.
    pub fn eval(&mut self, node: &Node, env: EnvId) -> EvalResult {
        if self.depth >= MAX_DEPTH {
            return Err(Flow::fail(node.pos, "Stack overflow"));
        }

        self.depth += 1;
        let result = self.eval_node(node, env);
        self.depth -= 1;

        result
    }

    fn eval_node(&mut self, node: &Node, env: EnvId) -> EvalResult {
        let pos = node.pos;

        match &node.kind {
            NodeKind::Null => Ok(Value::Null),
            NodeKind::Bool(b) => Ok(Value::Bool(*b)),
            NodeKind::Int(n) => Ok(Value::Int(*n)),
            NodeKind::Float(f) => Ok(Value::Float(*f)),
            NodeKind::Char(c) => Ok(Value::Char(*c)),
            NodeKind::Str(s) => Ok(Value::string(s)),
            NodeKind::Bytes(b) => Ok(Value::bytes(b)),

            NodeKind::Ident(name) => self
                .heap
                .get(env, name)
                .ok_or_else(|| Flow::fail(pos, format!("undefined variable {}", name))),

            NodeKind::Array(items) => {
                let values = self.eval_args(items, env)?;
                let slots = values
                    .into_iter()
                    .map(|v| self.heap.alloc_slot(v, env, false))
                    .collect();
                Ok(Value::Array(self.heap.alloc_array(slots)))
            }

            NodeKind::Table(pairs) => {
                let table = self.heap.alloc_table();
                self.with_roots(&[Value::Table(table)], |interp| {
                    for (key_node, value_node) in pairs {
                        let key = interp.eval(key_node, env)?;
                        let key = interp.heap.read(&key);
                        let value =
                            interp.with_roots(&[key.clone()], |i| i.eval(value_node, env))?;
                        interp.heap.table_insert(table, key, value, env);
                    }
                    Ok(Value::Table(table))
                })
            }

            NodeKind::Prefix { op, right } => {
                let operand = self.eval(right, env)?;
                ops::eval_prefix(self, *op, operand, pos)
            }

            NodeKind::Infix { op, left, right } => {
                let left = self.eval(left, env)?;
                ops::eval_infix(self, *op, left, right, env, pos)
            }

            NodeKind::Index { object, index } => {
                let object = self.eval(object, env)?;
                let index = self.with_roots(&[object.clone()], |i| i.eval(index, env))?;
                ops::eval_index(self, object, index, pos)
            }

            NodeKind::Call { callee, args } => {
                let callee = self.eval(callee, env)?;
                let callee = self.heap.read(&callee);
                let args = self.with_roots(&[callee.clone()], |i| i.eval_args(args, env))?;
                self.call_value(callee, args, pos)
            }

            NodeKind::Function { params, body } => Ok(self.make_function(params, body, env)),

            NodeKind::If {
                branches,
                alternative,
            } => self.eval_if(branches, alternative.as_deref(), env, false),

            NodeKind::For {
                names,
                source,
                body,
            } => self.eval_for(names, source, body, env, pos),

            NodeKind::Module { name, body } => self.eval_module(name, body, env),

            NodeKind::Let { name, value } => {
                let value = self.eval(value, env)?;
                self.heap.set(env, name, value.clone());
                Ok(value)
            }

            NodeKind::Assign { target, value } => self.eval_assign(target, value, env),

            NodeKind::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval_tail(expr, env)?,
                    None => Value::Null,
                };
                Err(Flow::Return(value))
            }

            NodeKind::Break => Err(Flow::Break(pos)),
            NodeKind::Continue => Err(Flow::Continue(pos)),

            NodeKind::Quote(inner) => self.eval_quote(inner, env),

            NodeKind::Unquote(inner) => {
                let value = self.eval(inner, env)?;
                match self.heap.read(&value) {
                    Value::Quote(quoted) => self.eval(&quoted, env),
                    other => Ok(other),
                }
            }

            NodeKind::Spread(_) => Err(Flow::fail(pos, "spread outside of an argument list")),

            NodeKind::Registry(id) => self
                .registry
                .get(*id)
                .cloned()
                .ok_or_else(|| Flow::fail(pos, "dangling registry reference")),
        }
    }

    /// Evaluate a node in tail position: calls and pipes become deferred
    /// [`Value::TailCall`]s for the trampoline, `if` forwards tailness
    /// into its branches, everything else evaluates normally.
    fn eval_tail(&mut self, node: &Node, env: EnvId) -> EvalResult {
        let pos = node.pos;

        match &node.kind {
            NodeKind::Call { callee, args } => {
                let callee = self.eval(callee, env)?;
                let callee = self.heap.read(&callee);
                let args = self.with_roots(&[callee.clone()], |i| i.eval_args(args, env))?;
                Ok(Value::TailCall(Rc::new(TailCall {
                    callee,
                    args,
                    env,
                    pos,
                })))
            }

            NodeKind::Infix {
                op: InfixOp::Pipe,
                left,
                right,
            } => {
                let arg = self.eval(left, env)?;
                let callee = self.with_roots(&[arg.clone()], |i| i.eval(right, env))?;
                let callee = self.heap.read(&callee);
                Ok(Value::TailCall(Rc::new(TailCall {
                    callee,
                    args: vec![arg],
                    env,
                    pos,
                })))
            }

            NodeKind::If {
                branches,
                alternative,
            } => self.eval_if(branches, alternative.as_deref(), env, true),

            _ => self.eval(node, env),
        }
    }

    /// Evaluate an argument/element list, flattening `...expr` spreads.
    /// Each evaluated prefix is pinned so a collection triggered by a
    /// later argument cannot sweep it.
    fn eval_args(&mut self, nodes: &[Node], env: EnvId) -> Result<Vec<Value>, Flow> {
        let mark = self.temps.len();
        let result = self.eval_args_pinned(nodes, env);
        self.temps.truncate(mark);
        result
    }

    fn eval_args_pinned(&mut self, nodes: &[Node], env: EnvId) -> Result<Vec<Value>, Flow> {
        let mut values = Vec::with_capacity(nodes.len());

        for node in nodes {
            if let NodeKind::Spread(inner) = &node.kind {
                let spread = self.eval(inner, env)?;
                let spread = self.heap.read(&spread);
                let items = self.heap.sequence(&spread).ok_or_else(|| {
                    Flow::fail(
                        node.pos,
                        format!("cannot spread {}", spread.type_name()),
                    )
                })?;
                self.temps.extend(items.iter().cloned());
                values.extend(items);
            } else {
                let value = self.eval(node, env)?;
                self.temps.push(value.clone());
                values.push(value);
            }
        }

        Ok(values)
    }

    fn make_function(&mut self, params: &[Param], body: &[Node], env: EnvId) -> Value {
        // The closure keeps its defining scope alive.
        self.heap.mark_captured(env);

        Value::Function(Rc::new(Function {
            params: params.to_vec().into(),
            body: body.to_vec().into(),
            env,
            offset: 0,
        }))
    }

    fn eval_if(
        &mut self,
        branches: &[(Node, Vec<Node>)],
        alternative: Option<&[Node]>,
        env: EnvId,
        tail: bool,
    ) -> EvalResult {
        for (condition, block) in branches {
            let value = self.eval(condition, env)?;
            if self.heap.read(&value).truthy() {
                return self.with_scope(env, |interp, scope| {
                    if tail {
                        interp.eval_block_tail(block, scope)
                    } else {
                        interp.eval_block(block, scope)
                    }
                });
            }
        }

        match alternative {
            Some(block) => self.with_scope(env, |interp, scope| {
                if tail {
                    interp.eval_block_tail(block, scope)
                } else {
                    interp.eval_block(block, scope)
                }
            }),
            None => Ok(Value::Null),
        }
    }

    /// `for [k,] v in source { ... }`. Each iteration runs in a fresh
    /// scope. The loop's value is the evaluated source, on every exit
    /// path (normal completion and `break` alike).
    fn eval_for(
        &mut self,
        names: &[String],
        source: &Node,
        body: &[Node],
        env: EnvId,
        pos: Position,
    ) -> EvalResult {
        let source_value = self.eval(source, env)?;
        let iterable = self.heap.read(&source_value);

        // The cursor's array/table ids live in a native local; pin the
        // source so a collection inside the body cannot sweep them.
        self.with_roots(&[source_value.clone()], |interp| -> Result<(), Flow> {
            let mut cursor = Generator::from_value(&interp.heap, &iterable, pos)?;

            while !cursor.end(&interp.heap) {
                let id = cursor.get_id(&interp.heap);
                let value = cursor.get_val(&interp.heap);

                let outcome = interp.with_scope(env, |interp, scope| {
                    match names {
                        [name] => {
                            interp.heap.set(scope, name, value);
                        }
                        [key, name] => {
                            interp.heap.set(scope, key, id);
                            interp.heap.set(scope, name, value);
                        }
                        _ => return Err(Flow::fail(pos, "for loop expects one or two names")),
                    }
                    interp.eval_block(body, scope)
                });

                match outcome {
                    Ok(_) | Err(Flow::Continue(_)) => {}
                    Err(Flow::Break(_)) => break,
                    Err(other) => return Err(other),
                }

                cursor.next(&interp.heap);
            }

            Ok(())
        })?;

        Ok(source_value)
    }

    /// `module name { ... }`: the body runs once in a captured child
    /// scope; the module value exposing that scope is bound as a constant
    /// in the enclosing scope.
    fn eval_module(&mut self, name: &str, body: &[Node], env: EnvId) -> EvalResult {
        let scope = self.heap.alloc_env(Some(env));
        self.heap.mark_captured(scope);
        self.heap.lock(scope);

        let result = self.eval_block(body, scope);

        self.heap.unlock(scope);
        result?;

        debug!("module {} defined with {:?}", name, self.heap.local_names(scope));

        let value = Value::Module(Rc::new(ModuleVal {
            name: name.to_string(),
            env: scope,
            parent: None,
        }));
        self.heap.set_const(env, name, value.clone());

        Ok(value)
    }

    // ── assignment ───────────────────────────────────────────────────────

    fn eval_assign(&mut self, target: &Node, value_node: &Node, env: EnvId) -> EvalResult {
        let pos = target.pos;
        let value = self.eval(value_node, env)?;

        match &target.kind {
            NodeKind::Ident(name) => {
                let Some(owner) = self.heap.find_contains(env, name) else {
                    return Err(Flow::fail(pos, format!("undefined variable {}", name)));
                };
                let slot = self
                    .heap
                    .get_local_slot(owner, name)
                    .ok_or_else(|| Flow::fail(pos, format!("undefined variable {}", name)))?;

                if self.heap.slot(slot).constant {
                    return Err(Flow::fail(pos, format!("cannot assign to constant {}", name)));
                }

                self.heap.set_slot(slot, value.clone());
                Ok(value)
            }

            NodeKind::Index { object, index } => {
                let object = self.with_roots(&[value.clone()], |i| i.eval(object, env))?;
                let object = self.heap.read(&object);
                let index = self
                    .with_roots(&[value.clone(), object.clone()], |i| i.eval(index, env))?;
                let index = self.heap.read(&index);

                // Tables auto-insert on assignment through an absent key.
                if let Value::Table(id) = object {
                    self.heap.table_insert(id, index, value.clone(), env);
                    return Ok(value);
                }

                self.assign_through_cell(object, index, value, pos)
            }

            NodeKind::Infix {
                op: InfixOp::Dot,
                left,
                right,
            } => {
                let NodeKind::Ident(name) = &right.kind else {
                    return Err(Flow::fail(pos, "member access expects a name"));
                };
                let object = self.with_roots(&[value.clone()], |i| i.eval(left, env))?;

                match self.heap.read(&object) {
                    Value::Table(id) => {
                        self.heap
                            .table_insert(id, Value::string(name), value.clone(), env);
                        Ok(value)
                    }
                    Value::Module(m) => Err(Flow::fail(
                        pos,
                        format!("module {} members are read-only", m.name),
                    )),
                    other => Err(Flow::fail(
                        pos,
                        format!("operator . not defined for {}", other.type_name()),
                    )),
                }
            }

            _ => Err(Flow::fail(pos, "invalid assignment target")),
        }
    }

    /// Assign into whatever cell `object[index]` resolves to. Arrays and
    /// slices over arrays resolve to a cell; strings do not.
    fn assign_through_cell(
        &mut self,
        object: Value,
        index: Value,
        value: Value,
        pos: Position,
    ) -> EvalResult {
        let cell = ops::eval_index(self, object.clone(), index, pos)?;

        match cell {
            Value::Ref(slot) => {
                if self.heap.slot(slot).constant {
                    return Err(Flow::fail(pos, "cannot assign to constant cell"));
                }
                self.heap.set_slot(slot, value.clone());
                Ok(value)
            }
            _ => Err(Flow::fail(
                pos,
                format!("cannot assign into {}", object.type_name()),
            )),
        }
    }

    // ── calls ────────────────────────────────────────────────────────────

    /// Apply a callee, then run the trampoline until the result is not a
    /// deferred tail call.
    pub fn call_value(&mut self, callee: Value, args: Vec<Value>, pos: Position) -> EvalResult {
        let mut current = self.apply(callee, args, pos)?;

        while let Value::TailCall(tc) = current {
            let callee = self.heap.read(&tc.callee);
            current = self.apply(callee, tc.args.clone(), tc.pos)?;
        }

        Ok(current)
    }

    fn apply(&mut self, callee: Value, args: Vec<Value>, pos: Position) -> EvalResult {
        // The in-flight callee and arguments are not reachable from any
        // scope yet; pin them for the collection.
        if self.heap.wants_collect() {
            let mark = self.temps.len();
            self.temps.push(callee.clone());
            self.temps.extend(args.iter().cloned());
            self.collect_garbage();
            self.temps.truncate(mark);
        }

        match callee {
            Value::Function(func) => {
                match self.call_function(&func, args, pos) {
                    Err(Flow::Return(value)) => Ok(value),
                    other => other,
                }
            }

            Value::Builtin(builtin) => {
                if let Some(expected) = builtin.arity {
                    if args.len() != expected {
                        return Err(Flow::fail(
                            pos,
                            format!(
                                "{} expects {} arguments, got {}",
                                builtin.name,
                                expected,
                                args.len()
                            ),
                        ));
                    }
                }

                if let Some(init) = builtin.init {
                    init(self);
                }

                let plain: Vec<Value> = args.iter().map(|a| self.heap.read(a)).collect();
                (builtin.func)(self, &plain, pos)
            }

            other => Err(Flow::fail(
                pos,
                format!("{} is not callable", other.type_name()),
            )),
        }
    }

    fn call_function(&mut self, func: &Rc<Function>, args: Vec<Value>, pos: Position) -> EvalResult {
        let remaining = func.remaining();
        let fixed = remaining.iter().filter(|p| !p.ellipsis).count();

        // Fewer arguments than open parameters: partial application.
        // A zero-argument call is a valid (identity-ish) partial.
        if args.len() < fixed {
            return Ok(self.partial_apply(func, args));
        }

        if args.len() > fixed && !func.variadic() {
            return Err(Flow::fail(
                pos,
                format!("expected {} arguments, got {}", fixed, args.len()),
            ));
        }

        let body = func.body.clone();
        let params: Vec<Param> = remaining.to_vec();

        self.with_scope(func.env, move |interp, scope| {
            let mut args = args.into_iter();

            for param in &params {
                if param.ellipsis {
                    let surplus: Vec<Value> = args.by_ref().collect();
                    let slots = surplus
                        .into_iter()
                        .map(|v| interp.heap.alloc_slot(v, scope, false))
                        .collect();
                    let array = Value::Array(interp.heap.alloc_array(slots));
                    interp.heap.set(scope, &param.name, array);
                } else {
                    // Guarded by the fixed-count check above.
                    let value = args.next().unwrap_or(Value::Null);
                    interp.heap.set(scope, &param.name, value);
                }
            }

            interp.eval_block_tail(&body, scope)
        })
    }

    /// Bind the given arguments in a fresh captured scope and return a
    /// function whose parameter offset skips them.
    fn partial_apply(&mut self, func: &Rc<Function>, args: Vec<Value>) -> Value {
        if args.is_empty() {
            return Value::Function(func.clone());
        }

        let scope = self.heap.alloc_env(Some(func.env));
        self.heap.mark_captured(scope);

        let bound = args.len();
        for (param, value) in func.remaining().iter().zip(args) {
            self.heap.set(scope, &param.name, value);
        }

        debug!("partial application binding {} of {} params", bound, func.params.len());

        Value::Function(Rc::new(Function {
            params: func.params.clone(),
            body: func.body.clone(),
            env: scope,
            offset: func.offset + bound,
        }))
    }

    // ── quoting ──────────────────────────────────────────────────────────

    /// Clone the quoted tree, replacing every `unquote(expr)` with the
    /// syntactic form of `expr`'s value. Values with no literal form go
    /// through the registry.
    fn eval_quote(&mut self, inner: &Node, env: EnvId) -> EvalResult {
        let mut tree = inner.clone();
        let mut failure: Option<Flow> = None;

        tree.mutate(&mut |node| {
            if failure.is_some() {
                return Some(Node::new(NodeKind::Null, node.pos));
            }

            if let NodeKind::Unquote(expr) = &node.kind {
                let replacement = self
                    .eval(expr, env)
                    .map(|v| self.value_to_node(&v, node.pos));

                match replacement {
                    Ok(rep) => return Some(rep),
                    Err(flow) => {
                        failure = Some(flow);
                        return Some(Node::new(NodeKind::Null, node.pos));
                    }
                }
            }

            None
        });

        match failure {
            Some(flow) => Err(flow),
            None => Ok(Value::Quote(Rc::new(tree))),
        }
    }

    /// Syntactic form of a value. Scalars become literals, a quote
    /// splices its tree, everything else becomes a registry reference.
    fn value_to_node(&mut self, value: &Value, pos: Position) -> Node {
        let kind = match value {
            Value::Null => NodeKind::Null,
            Value::Bool(b) => NodeKind::Bool(*b),
            Value::Int(n) => NodeKind::Int(*n),
            Value::Float(f) => NodeKind::Float(*f),
            Value::Char(c) => NodeKind::Char(*c),
            Value::Str(s) => NodeKind::Str(s.to_string()),
            Value::Bytes(b) => NodeKind::Bytes(b.to_vec()),
            Value::Quote(node) => (**node).clone().kind,

            other => {
                self.registry.push(other.clone());
                NodeKind::Registry(self.registry.len() - 1)
            }
        };

        Node::new(kind, pos)
    }
}
