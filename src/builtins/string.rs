//! `string` module: text utilities plus the `len`/`str`/`int`/`float`
//! conversions, which accept any value with a sensible reading.

use crate::eval::Interp;
use crate::token::Position;
use crate::value::{EvalResult, Flow, Value};

use super::Entry;

pub(super) const ENTRIES: &[Entry] = &[
    ("len", Some(1), len, None),
    ("upper", Some(1), upper, None),
    ("lower", Some(1), lower, None),
    ("trim", Some(1), trim, None),
    ("split", Some(2), split, None),
    ("str", Some(1), to_str, None),
    ("int", Some(1), to_int, None),
    ("float", Some(1), to_float, None),
];

fn text_arg(interp: &Interp, value: &Value, who: &str, pos: Position) -> Result<String, Flow> {
    interp.heap.string_of(value).ok_or_else(|| {
        Flow::fail(
            pos,
            format!("{} expects a string, got {}", who, value.type_name()),
        )
    })
}

fn len(interp: &mut Interp, args: &[Value], pos: Position) -> EvalResult {
    let value = &args[0];

    let count = match value {
        Value::Str(s) => s.chars().count(),
        Value::Bytes(b) => b.len(),
        Value::Array(id) => interp.heap.array(*id).items.len(),
        Value::Table(id) => interp.heap.table_len(*id),
        Value::Slice(view) => view.len,
        other => {
            return Err(Flow::fail(
                pos,
                format!("len is not defined for {}", other.type_name()),
            ))
        }
    };

    Ok(Value::Int(count as i64))
}

fn upper(interp: &mut Interp, args: &[Value], pos: Position) -> EvalResult {
    let text = text_arg(interp, &args[0], "upper", pos)?;
    Ok(Value::string(text.to_uppercase()))
}

fn lower(interp: &mut Interp, args: &[Value], pos: Position) -> EvalResult {
    let text = text_arg(interp, &args[0], "lower", pos)?;
    Ok(Value::string(text.to_lowercase()))
}

fn trim(interp: &mut Interp, args: &[Value], pos: Position) -> EvalResult {
    let text = text_arg(interp, &args[0], "trim", pos)?;
    Ok(Value::string(text.trim()))
}

fn split(interp: &mut Interp, args: &[Value], pos: Position) -> EvalResult {
    let text = text_arg(interp, &args[0], "split", pos)?;
    let sep = text_arg(interp, &args[1], "split", pos)?;

    let parts: Vec<Value> = if sep.is_empty() {
        text.chars().map(|c| Value::string(c.to_string())).collect()
    } else {
        text.split(&sep).map(Value::string).collect()
    };

    let owner = interp.root();
    let slots = parts
        .into_iter()
        .map(|v| interp.heap.alloc_slot(v, owner, false))
        .collect();

    Ok(Value::Array(interp.heap.alloc_array(slots)))
}

fn to_str(interp: &mut Interp, args: &[Value], _pos: Position) -> EvalResult {
    Ok(Value::string(interp.heap.render(&args[0])))
}

fn to_int(interp: &mut Interp, args: &[Value], pos: Position) -> EvalResult {
    match &args[0] {
        Value::Int(n) => Ok(Value::Int(*n)),
        Value::Float(f) => Ok(Value::Int(*f as i64)),
        Value::Bool(b) => Ok(Value::Int(*b as i64)),
        Value::Char(c) => Ok(Value::Int(*c as i64)),

        value if interp.heap.string_of(value).is_some() => {
            let text = text_arg(interp, value, "int", pos)?;
            text.trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| Flow::fail(pos, format!("cannot parse {:?} as integer", text)))
        }

        other => Err(Flow::fail(
            pos,
            format!("int is not defined for {}", other.type_name()),
        )),
    }
}

fn to_float(interp: &mut Interp, args: &[Value], pos: Position) -> EvalResult {
    match &args[0] {
        Value::Int(n) => Ok(Value::Float(*n as f64)),
        Value::Float(f) => Ok(Value::Float(*f)),
        Value::Bool(b) => Ok(Value::Float(*b as i64 as f64)),

        value if interp.heap.string_of(value).is_some() => {
            let text = text_arg(interp, value, "float", pos)?;
            text.trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| Flow::fail(pos, format!("cannot parse {:?} as float", text)))
        }

        other => Err(Flow::fail(
            pos,
            format!("float is not defined for {}", other.type_name()),
        )),
    }
}
