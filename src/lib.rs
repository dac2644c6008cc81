//! Mico: a tree-walking interpreter for a small, dynamically typed,
//! expression-oriented scripting language with closures, tail calls,
//! arrays and tables with reference semantics, modules and
//! quote/unquote metaprogramming.

pub mod ast;
pub mod builtins;
pub mod error;
pub mod eval;
pub mod generator;
pub mod heap;
pub mod interpreter;
pub mod macros;
pub mod object;
pub mod ops;
pub mod parser;
pub mod scanner;
pub mod token;
pub mod value;
