//! Pipeline wiring: source text → tokens → AST → constant folding →
//! evaluation, plus the interactive REPL loop.
//!
//! Runtime control-flow signals stay on the [`Flow`] channel inside the
//! evaluator; they are converted to [`MicoError`] here, at the library
//! boundary, so embedders and the CLI see one error type.

use std::io::{BufRead, Write};

use log::{debug, info};

use crate::ast::Node;
use crate::builtins;
use crate::error::{MicoError, Result};
use crate::eval::Interp;
use crate::macros;
use crate::parser::Parser;
use crate::scanner::Scanner;
use crate::token::Token;
use crate::value::{Flow, Value};

pub struct Interpreter {
    interp: Interp,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Fresh interpreter with the builtin modules installed in the
    /// global scope.
    pub fn new() -> Self {
        info!("Initializing interpreter");

        let mut interp = Interp::new();
        builtins::install(&mut interp);

        Self { interp }
    }

    /// Scan, parse and constant-fold a program.
    pub fn parse(source: &[u8]) -> Result<Vec<Node>> {
        let tokens: Vec<Token<'_>> = Scanner::new(source).collect::<Result<_>>()?;
        debug!("Scanned {} tokens", tokens.len());

        let mut program = Parser::new(&tokens).parse()?;
        debug!("Parsed {} statements", program.len());

        macros::fold_constants(&mut program);

        Ok(program)
    }

    /// Evaluate a parsed program in the global scope. The program's
    /// value is the value of its last statement.
    pub fn interpret(&mut self, program: &[Node]) -> Result<Value> {
        let root = self.interp.root();

        self.interp
            .eval_block(program, root)
            .map_err(flow_error)
    }

    /// Convenience: parse and evaluate in one step.
    pub fn run(&mut self, source: &[u8]) -> Result<Value> {
        let program = Self::parse(source)?;
        self.interpret(&program)
    }

    /// User-facing rendering of a value (follows arena ids).
    pub fn render(&self, value: &Value) -> String {
        self.interp.heap.render(value)
    }

    /// Interactive loop: one statement or expression per line, result
    /// printed unless it is `null`. Parse and runtime errors print and
    /// the loop continues.
    pub fn repl(&mut self) -> Result<()> {
        let stdin = std::io::stdin();
        let mut stdout = std::io::stdout();

        loop {
            write!(stdout, "> ")?;
            stdout.flush()?;

            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                info!("REPL reached end of input");
                return Ok(());
            }

            if line.trim().is_empty() {
                continue;
            }

            match self.run(line.as_bytes()) {
                Ok(Value::Null) => {}
                Ok(value) => println!("{}", self.render(&value)),
                Err(e) => eprintln!("{}", e),
            }
        }
    }
}

/// Map an escaped control-flow signal to the boundary error type.
/// `break`/`continue`/`return` reaching the top level are user errors
/// with the position of the offending statement.
fn flow_error(flow: Flow) -> MicoError {
    match flow {
        Flow::Fail(failure) => MicoError::runtime(
            failure.pos.line,
            failure.pos.column,
            failure.message,
        ),
        Flow::Break(pos) | Flow::Continue(pos) => {
            MicoError::runtime(pos.line, pos.column, flow_message(&flow))
        }
        Flow::Return(_) => MicoError::runtime(0, 0, flow_message(&flow)),
    }
}

fn flow_message(flow: &Flow) -> String {
    flow.to_string()
}
