//! `io` module: console input and output.

use std::io::{BufRead, Write};

use crate::eval::Interp;
use crate::token::Position;
use crate::value::{EvalResult, Flow, Value};

use super::Entry;

pub(super) const ENTRIES: &[Entry] = &[
    ("print", None, print, None),
    ("println", None, println, None),
    // Flush pending output first so prompts written with `io.print`
    // appear before the read blocks.
    ("readln", Some(0), readln, Some(flush_stdout)),
];

fn render_all(interp: &Interp, args: &[Value]) -> String {
    args.iter()
        .map(|a| interp.heap.render(a))
        .collect::<Vec<_>>()
        .join(" ")
}

fn print(interp: &mut Interp, args: &[Value], pos: Position) -> EvalResult {
    let text = render_all(interp, args);
    let mut out = std::io::stdout().lock();

    out.write_all(text.as_bytes())
        .and_then(|()| out.flush())
        .map_err(|e| Flow::fail(pos, format!("io error: {}", e)))?;

    Ok(Value::Null)
}

fn println(interp: &mut Interp, args: &[Value], pos: Position) -> EvalResult {
    let text = render_all(interp, args);
    let mut out = std::io::stdout().lock();

    writeln!(out, "{}", text).map_err(|e| Flow::fail(pos, format!("io error: {}", e)))?;

    Ok(Value::Null)
}

fn readln(_interp: &mut Interp, _args: &[Value], pos: Position) -> EvalResult {
    let mut line = String::new();

    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| Flow::fail(pos, format!("io error: {}", e)))?;

    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }

    Ok(Value::string(line))
}

fn flush_stdout(_interp: &mut Interp) {
    let _ = std::io::stdout().flush();
}
