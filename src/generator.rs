//! Iteration cursors driving `for ... in` loops.
//!
//! One variant per source shape. The common contract:
//! - `end()` is true exactly when the current position is outside the
//!   source's valid domain,
//! - `has_next()` previews one step ahead without mutating state,
//! - `next()` advances by `step` and is a no-op past `end()`,
//! - `reset()` rewinds to the initial position.
//!
//! Interval-sourced cursors follow the canonical boundary rule: ranges
//! are half-open on the right in the direction of travel, so `0..3`
//! yields `0,1,2` and `3..0` yields `3,2,1`. Steps may be negative for
//! array/string/int/float cursors; table cursors have no direction.

use std::rc::Rc;

use crate::heap::{ArrayId, Heap, SlotId};
use crate::token::Position;
use crate::value::{Flow, Value};

pub enum Generator {
    Array {
        id: ArrayId,
        pos: i64,
        step: i64,
    },

    Str {
        chars: Rc<[char]>,
        pos: i64,
        step: i64,
    },

    /// Materialized sequence (slices, byte strings).
    Seq {
        items: Vec<Value>,
        pos: i64,
        step: i64,
    },

    /// Snapshot of a table's entries in insertion order.
    Table {
        entries: Vec<(Value, SlotId)>,
        pos: i64,
    },

    IntRange {
        start: i64,
        stop: i64,
        step: i64,
        cur: i64,
    },

    FloatRange {
        start: f64,
        stop: f64,
        step: f64,
        cur: f64,
    },

    CharRange {
        start: u32,
        stop: u32,
        step: i64,
        cur: i64,
    },
}

impl Generator {
    /// Build a cursor over an evaluated (de-referenced) source value.
    pub fn from_value(heap: &Heap, source: &Value, pos: Position) -> Result<Generator, Flow> {
        match source {
            Value::Array(id) => Ok(Generator::Array {
                id: *id,
                pos: 0,
                step: 1,
            }),

            Value::Str(s) => Ok(Generator::Str {
                chars: s.chars().collect::<Vec<_>>().into(),
                pos: 0,
                step: 1,
            }),

            Value::Bytes(b) => Ok(Generator::Seq {
                items: b.iter().map(|&x| Value::Int(x as i64)).collect(),
                pos: 0,
                step: 1,
            }),

            Value::Slice(_) => {
                let items = heap
                    .sequence(source)
                    .ok_or_else(|| Flow::fail(pos, "slice source is not iterable"))?;
                Ok(Generator::Seq {
                    items,
                    pos: 0,
                    step: 1,
                })
            }

            Value::Table(id) => Ok(Generator::Table {
                entries: heap
                    .table(*id)
                    .entries
                    .iter()
                    .map(|(k, s)| (k.clone(), *s))
                    .collect(),
                pos: 0,
            }),

            Value::Interval(iv) => Self::from_interval(heap, &iv.left, &iv.right, pos),

            other => Err(Flow::fail(
                pos,
                format!("{} is not iterable", other.type_name()),
            )),
        }
    }

    fn from_interval(
        heap: &Heap,
        left: &Value,
        right: &Value,
        pos: Position,
    ) -> Result<Generator, Flow> {
        let left = heap.read(left);
        let right = heap.read(right);

        match (&left, &right) {
            (Value::Int(l), Value::Int(r)) => {
                let step = if l <= r { 1 } else { -1 };
                Ok(Generator::IntRange {
                    start: *l,
                    stop: *r,
                    step,
                    cur: *l,
                })
            }

            (Value::Float(l), Value::Float(r)) => {
                let step = if l <= r { 1.0 } else { -1.0 };
                Ok(Generator::FloatRange {
                    start: *l,
                    stop: *r,
                    step,
                    cur: *l,
                })
            }

            (Value::Char(l), Value::Char(r)) => {
                let (l, r) = (*l as u32, *r as u32);
                let step = if l <= r { 1 } else { -1 };
                Ok(Generator::CharRange {
                    start: l,
                    stop: r,
                    step,
                    cur: l as i64,
                })
            }

            _ => Err(Flow::fail(
                pos,
                format!(
                    "interval over {} .. {} is not iterable",
                    left.type_name(),
                    right.type_name()
                ),
            )),
        }
    }

    /// Rewind to the initial position.
    pub fn reset(&mut self) {
        match self {
            Generator::Array { pos, .. }
            | Generator::Str { pos, .. }
            | Generator::Seq { pos, .. }
            | Generator::Table { pos, .. } => *pos = 0,

            Generator::IntRange { start, cur, .. } => *cur = *start,
            Generator::FloatRange { start, cur, .. } => *cur = *start,
            Generator::CharRange { start, cur, .. } => *cur = *start as i64,
        }
    }

    fn in_domain(&self, heap: &Heap, at: i64) -> bool {
        match self {
            Generator::Array { id, .. } => at >= 0 && (at as usize) < heap.array(*id).items.len(),
            Generator::Str { chars, .. } => at >= 0 && (at as usize) < chars.len(),
            Generator::Seq { items, .. } => at >= 0 && (at as usize) < items.len(),
            Generator::Table { entries, .. } => at >= 0 && (at as usize) < entries.len(),

            // Half-open toward `stop` in the direction of travel.
            Generator::IntRange { stop, step, .. } => {
                if *step >= 0 {
                    at < *stop
                } else {
                    at > *stop
                }
            }

            Generator::CharRange { stop, step, .. } => {
                if *step >= 0 {
                    at < *stop as i64
                } else {
                    at > *stop as i64
                }
            }

            Generator::FloatRange { .. } => unreachable!("float domain checked separately"),
        }
    }

    /// True exactly when the current position is outside the domain.
    pub fn end(&self, heap: &Heap) -> bool {
        match self {
            Generator::FloatRange { stop, step, cur, .. } => {
                if *step >= 0.0 {
                    *cur >= *stop
                } else {
                    *cur <= *stop
                }
            }

            Generator::Array { pos, .. }
            | Generator::Str { pos, .. }
            | Generator::Seq { pos, .. }
            | Generator::Table { pos, .. } => !self.in_domain(heap, *pos),

            Generator::IntRange { cur, .. } | Generator::CharRange { cur, .. } => {
                !self.in_domain(heap, *cur)
            }
        }
    }

    /// Lookahead one step without mutating state.
    pub fn has_next(&self, heap: &Heap) -> bool {
        if self.end(heap) {
            return false;
        }

        match self {
            Generator::FloatRange { stop, step, cur, .. } => {
                let next = *cur + *step;
                if *step >= 0.0 {
                    next < *stop
                } else {
                    next > *stop
                }
            }

            Generator::Array { pos, step, .. }
            | Generator::Str { pos, step, .. }
            | Generator::Seq { pos, step, .. } => self.in_domain(heap, *pos + *step),

            Generator::Table { pos, .. } => self.in_domain(heap, *pos + 1),

            Generator::IntRange { cur, step, .. } | Generator::CharRange { cur, step, .. } => {
                self.in_domain(heap, *cur + *step)
            }
        }
    }

    /// Advance by `step`; a no-op once past the end.
    pub fn next(&mut self, heap: &Heap) {
        if self.end(heap) {
            return;
        }

        match self {
            Generator::Array { pos, step, .. }
            | Generator::Str { pos, step, .. }
            | Generator::Seq { pos, step, .. } => *pos += *step,

            Generator::Table { pos, .. } => *pos += 1,

            Generator::IntRange { cur, step, .. } | Generator::CharRange { cur, step, .. } => {
                *cur += *step
            }

            Generator::FloatRange { cur, step, .. } => *cur += *step,
        }
    }

    /// Current element value. `Null` past the end.
    pub fn get_val(&self, heap: &Heap) -> Value {
        if self.end(heap) {
            return Value::Null;
        }

        match self {
            Generator::Array { id, pos, .. } => {
                let slot = heap.array(*id).items[*pos as usize];
                heap.slot(slot).value.clone()
            }

            Generator::Str { chars, pos, .. } => Value::Char(chars[*pos as usize]),

            Generator::Seq { items, pos, .. } => items[*pos as usize].clone(),

            Generator::Table { entries, pos } => {
                let (_, slot) = &entries[*pos as usize];
                heap.slot(*slot).value.clone()
            }

            Generator::IntRange { cur, .. } => Value::Int(*cur),

            Generator::FloatRange { cur, .. } => Value::Float(*cur),

            Generator::CharRange { cur, .. } => {
                Value::Char(char::from_u32(*cur as u32).unwrap_or('\u{fffd}'))
            }
        }
    }

    /// Current index (sequences/ranges) or key (tables). `Null` past end.
    pub fn get_id(&self, heap: &Heap) -> Value {
        if self.end(heap) {
            return Value::Null;
        }

        match self {
            Generator::Array { pos, .. }
            | Generator::Str { pos, .. }
            | Generator::Seq { pos, .. } => Value::Int(*pos),

            Generator::Table { entries, pos } => entries[*pos as usize].0.clone(),

            Generator::IntRange { start, cur, step, .. } => {
                Value::Int((*cur - *start) / if *step == 0 { 1 } else { *step })
            }

            Generator::FloatRange { start, cur, step, .. } => {
                Value::Int(((*cur - *start) / *step) as i64)
            }

            Generator::CharRange { start, cur, step, .. } => {
                Value::Int((*cur - *start as i64) / if *step == 0 { 1 } else { *step })
            }
        }
    }
}
