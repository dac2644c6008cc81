//! AST node definitions for the Mico language.
//!
//! Every node carries a source [`Position`] for diagnostics. The tree is
//! fully owned (no borrows into the token buffer) so it can outlive the
//! scanner, be cloned by `quote`, and be rewritten by the macro pass.
//!
//! Three contracts matter beyond plain construction:
//!
//! - `Display` pretty-prints a node back to (canonical) source form,
//! - [`Node::mutate`] applies a node-replacing transform recursively:
//!   the visitor returns `Some(replacement)` to replace a node and stop
//!   descending, or `None` to keep the node and recurse into its children,
//! - [`Node::is_const`] is a conservative constant-foldability check used
//!   by the pre-evaluation macro pass.

use serde::Serialize;
use std::fmt;

use crate::token::Position;

/// A function parameter. The final parameter of a declaration may be an
/// ellipsis parameter, collecting surplus call arguments into an array.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Param {
    pub name: String,
    pub ellipsis: bool,
}

/// Prefix operator kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PrefixOp {
    /// Arithmetic negation `-x`
    Neg,

    /// Logical negation `!x`
    Not,
}

impl PrefixOp {
    pub fn symbol(self) -> &'static str {
        match self {
            PrefixOp::Neg => "-",
            PrefixOp::Not => "!",
        }
    }
}

/// Infix operator kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InfixOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,

    /// Short-circuiting `&&`
    And,

    /// Short-circuiting `||`
    Or,

    /// Pipe-into-callable `x | f` (builds a deferred call)
    Pipe,

    /// Interval constructor `a..b`
    Range,

    /// Dotted access `module.name` / `table.key`
    Dot,
}

impl InfixOp {
    pub fn symbol(self) -> &'static str {
        match self {
            InfixOp::Add => "+",
            InfixOp::Sub => "-",
            InfixOp::Mul => "*",
            InfixOp::Div => "/",
            InfixOp::Mod => "%",
            InfixOp::Eq => "==",
            InfixOp::Ne => "!=",
            InfixOp::Lt => "<",
            InfixOp::Le => "<=",
            InfixOp::Gt => ">",
            InfixOp::Ge => ">=",
            InfixOp::And => "&&",
            InfixOp::Or => "||",
            InfixOp::Pipe => "|",
            InfixOp::Range => "..",
            InfixOp::Dot => ".",
        }
    }
}

/// A single AST node: a kind plus the source position it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub kind: NodeKind,
    pub pos: Position,
}

/// Every expression and statement form of the language.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum NodeKind {
    // ── literals ────────────────────────────────────────────────────────
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Char(char),
    Str(String),
    Bytes(Vec<u8>),

    /// Identifier reference.
    Ident(String),

    /// Array literal `[a, b, c]`.
    Array(Vec<Node>),

    /// Table literal `{k: v, ...}`.
    Table(Vec<(Node, Node)>),

    // ── operators ───────────────────────────────────────────────────────
    Prefix {
        op: PrefixOp,
        right: Box<Node>,
    },

    Infix {
        op: InfixOp,
        left: Box<Node>,
        right: Box<Node>,
    },

    /// Subscript `object[index]`.
    Index {
        object: Box<Node>,
        index: Box<Node>,
    },

    /// Call `callee(arg, ...)`.
    Call {
        callee: Box<Node>,
        args: Vec<Node>,
    },

    /// Function literal `fn(a, b) { ... }`.
    Function {
        params: Vec<Param>,
        body: Vec<Node>,
    },

    /// `if c { .. } elif c2 { .. } else { .. }` — expression-valued.
    If {
        branches: Vec<(Node, Vec<Node>)>,
        alternative: Option<Vec<Node>>,
    },

    /// `for [k,] v in source { ... }`.
    For {
        names: Vec<String>,
        source: Box<Node>,
        body: Vec<Node>,
    },

    /// `module name { ... }`.
    Module {
        name: String,
        body: Vec<Node>,
    },

    // ── statements ──────────────────────────────────────────────────────
    Let {
        name: String,
        value: Box<Node>,
    },

    Assign {
        target: Box<Node>,
        value: Box<Node>,
    },

    Return(Option<Box<Node>>),

    Break,

    Continue,

    // ── metaprogramming ─────────────────────────────────────────────────
    Quote(Box<Node>),

    Unquote(Box<Node>),

    /// `...expr` spread in a call argument list.
    Spread(Box<Node>),

    /// Opaque reference into the per-program value registry; produced by
    /// quoting values that have no syntactic form (builtins, partials).
    Registry(usize),
}

impl Node {
    pub fn new(kind: NodeKind, pos: Position) -> Self {
        Self { kind, pos }
    }

    /// Apply a node-replacing transform recursively.
    ///
    /// `f` returning `Some(node)` replaces this node and stops descending
    /// into it; `None` keeps the node and recurses into its children.
    pub fn mutate<F>(&mut self, f: &mut F)
    where
        F: FnMut(&Node) -> Option<Node>,
    {
        if let Some(replacement) = f(self) {
            *self = replacement;
            return;
        }

        match &mut self.kind {
            NodeKind::Null
            | NodeKind::Bool(_)
            | NodeKind::Int(_)
            | NodeKind::Float(_)
            | NodeKind::Char(_)
            | NodeKind::Str(_)
            | NodeKind::Bytes(_)
            | NodeKind::Ident(_)
            | NodeKind::Break
            | NodeKind::Continue
            | NodeKind::Registry(_) => {}

            NodeKind::Array(items) => {
                for item in items {
                    item.mutate(f);
                }
            }

            NodeKind::Table(pairs) => {
                for (k, v) in pairs {
                    k.mutate(f);
                    v.mutate(f);
                }
            }

            NodeKind::Prefix { right, .. } => right.mutate(f),

            NodeKind::Infix { left, right, .. } => {
                left.mutate(f);
                right.mutate(f);
            }

            NodeKind::Index { object, index } => {
                object.mutate(f);
                index.mutate(f);
            }

            NodeKind::Call { callee, args } => {
                callee.mutate(f);
                for arg in args {
                    arg.mutate(f);
                }
            }

            NodeKind::Function { body, .. } => {
                for stmt in body {
                    stmt.mutate(f);
                }
            }

            NodeKind::If {
                branches,
                alternative,
            } => {
                for (cond, block) in branches {
                    cond.mutate(f);
                    for stmt in block {
                        stmt.mutate(f);
                    }
                }
                if let Some(block) = alternative {
                    for stmt in block {
                        stmt.mutate(f);
                    }
                }
            }

            NodeKind::For { source, body, .. } => {
                source.mutate(f);
                for stmt in body {
                    stmt.mutate(f);
                }
            }

            NodeKind::Module { body, .. } => {
                for stmt in body {
                    stmt.mutate(f);
                }
            }

            NodeKind::Let { value, .. } => value.mutate(f),

            NodeKind::Assign { target, value } => {
                target.mutate(f);
                value.mutate(f);
            }

            NodeKind::Return(value) => {
                if let Some(value) = value {
                    value.mutate(f);
                }
            }

            NodeKind::Quote(inner) | NodeKind::Unquote(inner) | NodeKind::Spread(inner) => {
                inner.mutate(f)
            }
        }
    }

    /// Conservative constant-foldability check: true only for literal
    /// forms and operator trees over them. Identifiers, calls and anything
    /// scope-dependent are never const.
    pub fn is_const(&self) -> bool {
        match &self.kind {
            NodeKind::Null
            | NodeKind::Bool(_)
            | NodeKind::Int(_)
            | NodeKind::Float(_)
            | NodeKind::Char(_)
            | NodeKind::Str(_)
            | NodeKind::Bytes(_) => true,

            NodeKind::Array(items) => items.iter().all(Node::is_const),

            NodeKind::Table(pairs) => pairs.iter().all(|(k, v)| k.is_const() && v.is_const()),

            NodeKind::Prefix { right, .. } => right.is_const(),

            // Pipe defers a call; Dot needs a scope; Range is fine.
            NodeKind::Infix { op, left, right } => {
                !matches!(op, InfixOp::Pipe | InfixOp::Dot) && left.is_const() && right.is_const()
            }

            _ => false,
        }
    }
}

fn write_block(f: &mut fmt::Formatter<'_>, body: &[Node]) -> fmt::Result {
    write!(f, "{{ ")?;
    for stmt in body {
        write!(f, "{}; ", stmt)?;
    }
    write!(f, "}}")
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            NodeKind::Null => write!(f, "null"),
            NodeKind::Bool(b) => write!(f, "{}", b),
            NodeKind::Int(n) => write!(f, "{}", n),
            NodeKind::Float(n) => {
                if n.fract() == 0.0 {
                    write!(f, "{:.1}", n)
                } else {
                    write!(f, "{}", n)
                }
            }
            NodeKind::Char(c) => write!(f, "'{}'", c.escape_default()),
            NodeKind::Str(s) => write!(f, "\"{}\"", s.escape_default()),
            NodeKind::Bytes(b) => write!(f, "b\"{}\"", b.escape_ascii()),
            NodeKind::Ident(name) => write!(f, "{}", name),

            NodeKind::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }

            NodeKind::Table(pairs) => {
                write!(f, "{{")?;
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }

            NodeKind::Prefix { op, right } => write!(f, "({}{})", op.symbol(), right),

            NodeKind::Infix { op, left, right } => {
                if *op == InfixOp::Dot {
                    write!(f, "{}.{}", left, right)
                } else {
                    write!(f, "({} {} {})", left, op.symbol(), right)
                }
            }

            NodeKind::Index { object, index } => write!(f, "{}[{}]", object, index),

            NodeKind::Call { callee, args } => {
                write!(f, "{}(", callee)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }

            NodeKind::Function { params, body } => {
                write!(f, "fn(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    if p.ellipsis {
                        write!(f, "...{}", p.name)?;
                    } else {
                        write!(f, "{}", p.name)?;
                    }
                }
                write!(f, ") ")?;
                write_block(f, body)
            }

            NodeKind::If {
                branches,
                alternative,
            } => {
                for (i, (cond, block)) in branches.iter().enumerate() {
                    if i == 0 {
                        write!(f, "if {} ", cond)?;
                    } else {
                        write!(f, " elif {} ", cond)?;
                    }
                    write_block(f, block)?;
                }
                if let Some(block) = alternative {
                    write!(f, " else ")?;
                    write_block(f, block)?;
                }
                Ok(())
            }

            NodeKind::For {
                names,
                source,
                body,
            } => {
                write!(f, "for {} in {} ", names.join(", "), source)?;
                write_block(f, body)
            }

            NodeKind::Module { name, body } => {
                write!(f, "module {} ", name)?;
                write_block(f, body)
            }

            NodeKind::Let { name, value } => write!(f, "let {} = {}", name, value),

            NodeKind::Assign { target, value } => write!(f, "{} = {}", target, value),

            NodeKind::Return(value) => match value {
                Some(v) => write!(f, "return {}", v),
                None => write!(f, "return"),
            },

            NodeKind::Break => write!(f, "break"),
            NodeKind::Continue => write!(f, "continue"),

            NodeKind::Quote(inner) => write!(f, "quote({})", inner),
            NodeKind::Unquote(inner) => write!(f, "unquote({})", inner),
            NodeKind::Spread(inner) => write!(f, "...{}", inner),
            NodeKind::Registry(id) => write!(f, "<registry:{}>", id),
        }
    }
}
