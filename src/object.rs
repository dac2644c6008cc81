//! Value contracts that need to follow arena ids: deep cloning,
//! structural equality, hashing consistent with equality, and rendering.
//!
//! These live as `impl Heap` methods because containers are ids — a plain
//! `PartialEq`/`Hash` on [`Value`] could not see the element storage.
//!
//! Equality rules:
//! - comparing across differing tags is always `false` (numeric promotion
//!   is an *operator* concern, handled in `ops::`, not an `equal` one),
//! - arrays/tables compare size-then-elementwise, short-circuiting,
//! - table keys compare by `equal`, so a cloned key collides with the
//!   original,
//! - reference cells are transparent: `equal`, `hash` and rendering all
//!   read through the cell,
//! - slices compare elementwise against arrays/strings of the same
//!   element domain (a view equals what it shows).

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::heap::Heap;
use crate::value::{SliceVal, Value};

impl Heap {
    /// Read through a reference cell; other values pass unchanged.
    pub fn read(&self, value: &Value) -> Value {
        match value {
            Value::Ref(slot) => self.slot(*slot).value.clone(),
            other => other.clone(),
        }
    }

    // ── deep clone ───────────────────────────────────────────────────────

    /// Deep for containers, shared for closures' captured environments.
    pub fn deep_clone(&mut self, value: &Value) -> Value {
        match value {
            Value::Array(id) => {
                let items = self.array(*id).items.clone();
                let mut cloned = Vec::with_capacity(items.len());

                for slot in items {
                    let owner = self.slot(slot).owner;
                    let copy = self.deep_clone(&self.slot(slot).value.clone());
                    cloned.push(self.alloc_slot(copy, owner, false));
                }

                Value::Array(self.alloc_array(cloned))
            }

            Value::Table(id) => {
                let entries: Vec<_> = self
                    .table(*id)
                    .entries
                    .iter()
                    .map(|(k, s)| (k.clone(), *s))
                    .collect();
                let table = self.alloc_table();

                for (key, slot) in entries {
                    let owner = self.slot(slot).owner;
                    let key_copy = self.deep_clone(&key);
                    let value_copy = self.deep_clone(&self.slot(slot).value.clone());
                    self.table_insert(table, key_copy, value_copy, owner);
                }

                Value::Table(table)
            }

            Value::Ref(slot) => {
                let owner = self.slot(*slot).owner;
                let constant = self.slot(*slot).constant;
                let copy = self.deep_clone(&self.slot(*slot).value.clone());
                Value::Ref(self.alloc_slot(copy, owner, constant))
            }

            Value::Slice(slice) => {
                let parent = self.deep_clone(&slice.parent);
                Value::Slice(Rc::new(SliceVal {
                    parent,
                    start: slice.start,
                    len: slice.len,
                    reversed: slice.reversed,
                }))
            }

            // Scalars are copied; closures/modules share their environment.
            other => other.clone(),
        }
    }

    // ── sequence views ───────────────────────────────────────────────────

    /// Materialize the element sequence of an array, array slice, string
    /// or string slice. `None` for non-sequence values.
    pub fn sequence(&self, value: &Value) -> Option<Vec<Value>> {
        match value {
            Value::Array(id) => Some(
                self.array(*id)
                    .items
                    .iter()
                    .map(|&s| self.slot(s).value.clone())
                    .collect(),
            ),

            Value::Str(s) => Some(s.chars().map(Value::Char).collect()),

            Value::Slice(slice) => {
                let parent = self.sequence(&slice.parent)?;
                let mut items: Vec<Value> = parent
                    .into_iter()
                    .skip(slice.start)
                    .take(slice.len)
                    .collect();
                if slice.reversed {
                    items.reverse();
                }
                Some(items)
            }

            _ => None,
        }
    }

    /// Is this value string-shaped (a string or a view into one)?
    fn string_like(&self, value: &Value) -> bool {
        match value {
            Value::Str(_) => true,
            Value::Slice(slice) => self.string_like(&slice.parent),
            _ => false,
        }
    }

    /// Collapse a string or string slice into owned text.
    pub fn string_of(&self, value: &Value) -> Option<String> {
        match value {
            Value::Str(s) => Some(s.to_string()),
            Value::Slice(slice) if self.string_like(&slice.parent) => {
                let chars = self.sequence(value)?;
                Some(
                    chars
                        .into_iter()
                        .map(|c| match c {
                            Value::Char(c) => c,
                            _ => '\u{fffd}',
                        })
                        .collect(),
                )
            }
            _ => None,
        }
    }

    // ── structural equality ──────────────────────────────────────────────

    pub fn equal(&self, a: &Value, b: &Value) -> bool {
        let a = self.read(a);
        let b = self.read(b);

        match (&a, &b) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(x), Value::Bool(y)) => x == y,
            (Value::Int(x), Value::Int(y)) => x == y,
            (Value::Float(x), Value::Float(y)) => x == y,
            (Value::Char(x), Value::Char(y)) => x == y,
            (Value::Bytes(x), Value::Bytes(y)) => x == y,

            // Strings and string slices compare by content.
            _ if self.string_like(&a) && self.string_like(&b) => {
                self.string_of(&a) == self.string_of(&b)
            }

            (Value::Array(x), Value::Array(y)) => {
                if x == y {
                    return true;
                }
                let xs = &self.array(*x).items;
                let ys = &self.array(*y).items;
                if xs.len() != ys.len() {
                    return false;
                }
                xs.iter().zip(ys.iter()).all(|(&xa, &ya)| {
                    self.equal(&self.slot(xa).value, &self.slot(ya).value)
                })
            }

            // A slice equals a sequence with the same elements.
            (Value::Slice(_), _) | (_, Value::Slice(_)) => {
                match (self.sequence(&a), self.sequence(&b)) {
                    (Some(xs), Some(ys)) => {
                        xs.len() == ys.len()
                            && xs.iter().zip(ys.iter()).all(|(x, y)| self.equal(x, y))
                    }
                    _ => false,
                }
            }

            (Value::Table(x), Value::Table(y)) => {
                if x == y {
                    return true;
                }
                if self.table_len(*x) != self.table_len(*y) {
                    return false;
                }
                self.table(*x).entries.iter().all(|(key, slot)| {
                    match self.table_get(*y, key) {
                        Some(other) => {
                            self.equal(&self.slot(*slot).value, &self.slot(other).value)
                        }
                        None => false,
                    }
                })
            }

            (Value::Function(x), Value::Function(y)) => Rc::ptr_eq(x, y),
            (Value::Builtin(x), Value::Builtin(y)) => Rc::ptr_eq(x, y),
            (Value::Module(x), Value::Module(y)) => x.env == y.env,

            (Value::Interval(x), Value::Interval(y)) => {
                self.equal(&x.left, &y.left) && self.equal(&x.right, &y.right)
            }

            (Value::Quote(x), Value::Quote(y)) => x == y,

            _ => false,
        }
    }

    // ── hashing (consistent with `equal`) ────────────────────────────────

    pub fn hash_value(&self, value: &Value) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash_into(value, &mut hasher);
        hasher.finish()
    }

    fn hash_into(&self, value: &Value, hasher: &mut DefaultHasher) {
        let value = self.read(value);

        // String-likes hash by content so a slice collides with its text.
        if let Some(text) = self.string_of(&value) {
            5u8.hash(hasher);
            text.hash(hasher);
            return;
        }

        match &value {
            Value::Null => 0u8.hash(hasher),
            Value::Bool(b) => {
                1u8.hash(hasher);
                b.hash(hasher);
            }
            Value::Int(n) => {
                2u8.hash(hasher);
                n.hash(hasher);
            }
            Value::Float(f) => {
                3u8.hash(hasher);
                // 0.0 == -0.0, so both must land in the same bucket.
                let f = if *f == 0.0 { 0.0f64 } else { *f };
                f.to_bits().hash(hasher);
            }
            Value::Char(c) => {
                4u8.hash(hasher);
                c.hash(hasher);
            }
            Value::Str(_) => {} // handled above
            Value::Bytes(b) => {
                6u8.hash(hasher);
                b.hash(hasher);
            }

            Value::Array(_) | Value::Slice(_) => {
                7u8.hash(hasher);
                if let Some(items) = self.sequence(&value) {
                    items.len().hash(hasher);
                    for item in items {
                        self.hash_into(&item, hasher);
                    }
                }
            }

            Value::Table(id) => {
                8u8.hash(hasher);
                self.table_len(*id).hash(hasher);
                // Order-independent combination: equal tables may have
                // different insertion orders.
                let mut combined: u64 = 0;
                for (key, slot) in &self.table(*id).entries {
                    let mut entry_hasher = DefaultHasher::new();
                    self.hash_into(key, &mut entry_hasher);
                    self.hash_into(&self.slot(*slot).value.clone(), &mut entry_hasher);
                    combined ^= entry_hasher.finish();
                }
                combined.hash(hasher);
            }

            Value::Function(func) => {
                9u8.hash(hasher);
                (Rc::as_ptr(func) as usize).hash(hasher);
            }
            Value::Builtin(b) => {
                10u8.hash(hasher);
                (Rc::as_ptr(b) as usize).hash(hasher);
            }
            Value::Module(m) => {
                11u8.hash(hasher);
                m.name.hash(hasher);
            }
            Value::Interval(iv) => {
                12u8.hash(hasher);
                self.hash_into(&iv.left, hasher);
                self.hash_into(&iv.right, hasher);
            }
            Value::Quote(node) => {
                13u8.hash(hasher);
                node.to_string().hash(hasher);
            }
            Value::TailCall(_) | Value::Ref(_) => {}
        }
    }

    // ── rendering ────────────────────────────────────────────────────────

    /// User-facing rendering: follows arena ids, prints strings bare at
    /// the top level and quoted inside containers.
    pub fn render(&self, value: &Value) -> String {
        let value = self.read(value);

        match &value {
            Value::Array(_) | Value::Slice(_) if !self.string_like(&value) => {
                let items = self.sequence(&value).unwrap_or_default();
                let rendered: Vec<String> =
                    items.iter().map(|v| self.render_nested(v)).collect();
                format!("[{}]", rendered.join(", "))
            }

            Value::Table(id) => {
                let rendered: Vec<String> = self
                    .table(*id)
                    .entries
                    .iter()
                    .map(|(k, s)| {
                        format!(
                            "{}: {}",
                            self.render_nested(k),
                            self.render_nested(&self.slot(*s).value.clone())
                        )
                    })
                    .collect();
                format!("{{{}}}", rendered.join(", "))
            }

            _ if self.string_like(&value) => self.string_of(&value).unwrap_or_default(),

            other => other.to_string(),
        }
    }

    fn render_nested(&self, value: &Value) -> String {
        let value = self.read(value);

        if self.string_like(&value) {
            format!("\"{}\"", self.string_of(&value).unwrap_or_default())
        } else if let Value::Char(c) = value {
            format!("'{}'", c)
        } else {
            self.render(&value)
        }
    }
}
