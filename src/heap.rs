//! Arena-backed storage for everything with identity: environments,
//! reference-cell slots, arrays and tables.
//!
//! The scope graph is a tree of [`EnvNode`]s addressed by stable
//! generation-checked indices instead of shared ownership, which makes
//! reference cycles between closures inert: nothing is dropped by a
//! destructor cascade, reclamation happens in two tiers.
//!
//! 1. **Eager pruning** on scope exit ([`Heap::release_scope`]): a scope
//!    that is unlocked, childless and was never captured by a closure or
//!    module is detached from its parent immediately, walking upward
//!    through dead leaves. This is the common case for block and call
//!    scopes.
//! 2. **Mark-sweep** ([`Heap::collect`]): a stop-the-world reachability
//!    pass from the root environment, every locked environment, and any
//!    extra value roots (the quote registry and the evaluator's pinned
//!    temporaries), triggered by an allocation threshold at call sites
//!    and by the `gc.collect()` builtin.
//!
//! Lock counters guard in-flight scopes: the evaluator brackets every
//! scope entry with `lock`/`unlock` (paired by construction through
//! `Interp::with_scope`), and a locked environment is a GC root.
//!
//! Stale-id access is an internal invariant violation, not a user-facing
//! condition; the accessors assert on it instead of returning `Result`.

use std::collections::HashMap;

use log::debug;

use crate::value::Value;

// ─────────────────────────────────────────────────────────────────────────────
// Generational ids
// ─────────────────────────────────────────────────────────────────────────────

macro_rules! define_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name {
            index: u32,
            gen: u32,
        }

        impl $name {
            #[inline]
            fn new(index: u32, gen: u32) -> Self {
                Self { index, gen }
            }
        }
    };
}

define_id! {
    /// Index of an environment node in the scope-graph arena.
    EnvId
}

define_id! {
    /// Index of a reference-cell slot.
    SlotId
}

define_id! {
    /// Index of an array object.
    ArrayId
}

define_id! {
    /// Index of a table object.
    TableId
}

// ─────────────────────────────────────────────────────────────────────────────
// Generic slotted store
// ─────────────────────────────────────────────────────────────────────────────

struct Entry<T> {
    gen: u32,
    item: Option<T>,
}

struct Store<T> {
    entries: Vec<Entry<T>>,
    free: Vec<u32>,
}

impl<T> Store<T> {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
            free: Vec::new(),
        }
    }

    fn alloc(&mut self, item: T) -> (u32, u32) {
        if let Some(index) = self.free.pop() {
            let entry = &mut self.entries[index as usize];
            entry.item = Some(item);
            (index, entry.gen)
        } else {
            let index = self.entries.len() as u32;
            self.entries.push(Entry { gen: 0, item: Some(item) });
            (index, 0)
        }
    }

    /// Free an entry, bumping its generation so outstanding ids go stale.
    fn release(&mut self, index: u32) {
        let entry = &mut self.entries[index as usize];
        if entry.item.take().is_some() {
            entry.gen = entry.gen.wrapping_add(1);
            self.free.push(index);
        }
    }

    fn get(&self, index: u32, gen: u32) -> &T {
        let entry = &self.entries[index as usize];
        debug_assert_eq!(entry.gen, gen, "stale arena id");
        entry.item.as_ref().expect("stale arena id")
    }

    fn get_mut(&mut self, index: u32, gen: u32) -> &mut T {
        let entry = &mut self.entries[index as usize];
        debug_assert_eq!(entry.gen, gen, "stale arena id");
        entry.item.as_mut().expect("stale arena id")
    }

    fn is_live(&self, index: u32, gen: u32) -> bool {
        let entry = &self.entries[index as usize];
        entry.gen == gen && entry.item.is_some()
    }

    fn live_count(&self) -> usize {
        self.entries.len() - self.free.len()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Stored object shapes
// ─────────────────────────────────────────────────────────────────────────────

/// One lexical scope.
pub struct EnvNode {
    pub parent: Option<EnvId>,
    children: Vec<EnvId>,
    names: HashMap<String, SlotId>,

    /// Reclaim guard: nonzero while a call/block executes inside this scope.
    locks: u32,

    /// Set once a closure, builtin or module captured this scope; disables
    /// eager pruning (the mark-sweep pass decides its fate instead).
    captured: bool,
}

/// A mutable reference cell: the only mutable storage location.
pub struct Slot {
    pub value: Value,

    /// Scope that owned the cell at creation (diagnostics, const checks).
    pub owner: EnvId,

    pub constant: bool,
}

/// Array object: an ordered sequence of reference cells.
pub struct ArrayObj {
    pub items: Vec<SlotId>,
}

/// Table object: insertion-ordered entries plus a hash index.
/// Keys are compared structurally (`Heap::equal`), so a cloned key
/// collides with the original.
pub struct TableObj {
    pub entries: Vec<(Value, SlotId)>,
    index: HashMap<u64, Vec<usize>>,
}

/// Counters reported by [`Heap::collect`] and surfaced by `gc.stats()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcStats {
    pub envs: usize,
    pub slots: usize,
    pub arrays: usize,
    pub tables: usize,
}

const DEFAULT_GC_THRESHOLD: usize = 16 * 1024;

pub struct Heap {
    envs: Store<EnvNode>,
    slots: Store<Slot>,
    arrays: Store<ArrayObj>,
    tables: Store<TableObj>,

    allocs_since_gc: usize,
    gc_threshold: usize,
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

impl Heap {
    pub fn new() -> Self {
        Self {
            envs: Store::new(),
            slots: Store::new(),
            arrays: Store::new(),
            tables: Store::new(),
            allocs_since_gc: 0,
            gc_threshold: DEFAULT_GC_THRESHOLD,
        }
    }

    // ── environments ─────────────────────────────────────────────────────

    /// Create a scope. A `parent` of `None` makes a root scope; otherwise
    /// the child is registered in the parent's child set.
    pub fn alloc_env(&mut self, parent: Option<EnvId>) -> EnvId {
        self.allocs_since_gc += 1;

        let (index, gen) = self.envs.alloc(EnvNode {
            parent,
            children: Vec::new(),
            names: HashMap::new(),
            locks: 0,
            captured: false,
        });
        let id = EnvId::new(index, gen);

        if let Some(parent) = parent {
            self.env_mut(parent).children.push(id);
        }

        id
    }

    pub fn env(&self, id: EnvId) -> &EnvNode {
        self.envs.get(id.index, id.gen)
    }

    fn env_mut(&mut self, id: EnvId) -> &mut EnvNode {
        self.envs.get_mut(id.index, id.gen)
    }

    /// Insert/overwrite a binding in *this* scope only (shadowing).
    /// Overwriting reuses the existing cell so aliases observe the
    /// change — unless the cell is constant: a re-`let` over a constant
    /// rebinds the name to a fresh variable cell, leaving the constant
    /// cell untouched for anyone still holding it.
    pub fn set(&mut self, env: EnvId, name: &str, value: Value) -> SlotId {
        if let Some(&slot) = self.env(env).names.get(name) {
            if !self.slot(slot).constant {
                self.slot_mut(slot).value = value;
                return slot;
            }
        }

        let slot = self.alloc_slot(value, env, false);
        self.env_mut(env).names.insert(name.to_string(), slot);
        slot
    }

    /// Like [`Heap::set`], but the binding rejects later assignment.
    pub fn set_const(&mut self, env: EnvId, name: &str, value: Value) -> SlotId {
        let slot = self.alloc_slot(value, env, true);
        self.env_mut(env).names.insert(name.to_string(), slot);
        slot
    }

    /// Read a binding, walking from this scope upward through parents;
    /// first match wins.
    pub fn get(&self, env: EnvId, name: &str) -> Option<Value> {
        self.get_slot(env, name).map(|s| self.slot(s).value.clone())
    }

    /// Like [`Heap::get`] but yields the cell, for assignment through it.
    pub fn get_slot(&self, env: EnvId, name: &str) -> Option<SlotId> {
        let mut current = Some(env);

        while let Some(id) = current {
            let node = self.env(id);
            if let Some(&slot) = node.names.get(name) {
                return Some(slot);
            }
            current = node.parent;
        }

        None
    }

    /// Lookup restricted to bindings directly owned by `env` (module
    /// dotted access never sees the parent chain).
    pub fn get_local_slot(&self, env: EnvId, name: &str) -> Option<SlotId> {
        self.env(env).names.get(name).copied()
    }

    /// Like `get` but returns the owning scope, so assignment rewrites the
    /// correct scope instead of creating a fresh shadow.
    pub fn find_contains(&self, env: EnvId, name: &str) -> Option<EnvId> {
        let mut current = Some(env);

        while let Some(id) = current {
            let node = self.env(id);
            if node.names.contains_key(name) {
                return Some(id);
            }
            current = node.parent;
        }

        None
    }

    /// Iterate the names directly owned by a scope (module exports,
    /// `debug.env()`).
    pub fn local_names(&self, env: EnvId) -> Vec<String> {
        let mut names: Vec<String> = self.env(env).names.keys().cloned().collect();
        names.sort();
        names
    }

    /// Increment the reclaim guard. Must be paired with [`Heap::unlock`];
    /// the evaluator guarantees pairing by construction (`with_scope`).
    pub fn lock(&mut self, env: EnvId) {
        self.env_mut(env).locks += 1;
    }

    pub fn unlock(&mut self, env: EnvId) {
        let node = self.env_mut(env);
        debug_assert!(node.locks > 0, "unbalanced scope unlock");
        node.locks = node.locks.saturating_sub(1);
    }

    /// Mark a scope as captured by a closure/module/builtin, disabling
    /// eager pruning for it and its ancestors.
    pub fn mark_captured(&mut self, env: EnvId) {
        let mut current = Some(env);
        while let Some(id) = current {
            let node = self.env_mut(id);
            if node.captured {
                break;
            }
            node.captured = true;
            current = node.parent;
        }
    }

    /// Attempt to prune this scope from its parent if unlocked, childless
    /// and never captured; recurses upward through newly-dead leaves.
    pub fn release_scope(&mut self, env: EnvId) {
        let mut current = Some(env);

        while let Some(id) = current {
            let node = self.env(id);

            if node.locks != 0 || node.captured || !node.children.is_empty() {
                break;
            }

            let parent = node.parent;
            // Root scopes are never pruned.
            let Some(parent_id) = parent else { break };

            self.env_mut(parent_id).children.retain(|&c| c != id);
            self.envs.release(id.index);

            current = parent;
        }
    }

    // ── reference cells ──────────────────────────────────────────────────

    pub fn alloc_slot(&mut self, value: Value, owner: EnvId, constant: bool) -> SlotId {
        self.allocs_since_gc += 1;

        let (index, gen) = self.slots.alloc(Slot {
            value,
            owner,
            constant,
        });
        SlotId::new(index, gen)
    }

    pub fn slot(&self, id: SlotId) -> &Slot {
        self.slots.get(id.index, id.gen)
    }

    pub fn slot_mut(&mut self, id: SlotId) -> &mut Slot {
        self.slots.get_mut(id.index, id.gen)
    }

    /// Swap the contained value in place; every alias observes the change.
    pub fn set_slot(&mut self, id: SlotId, value: Value) {
        self.slot_mut(id).value = value;
    }

    // ── arrays ───────────────────────────────────────────────────────────

    pub fn alloc_array(&mut self, items: Vec<SlotId>) -> ArrayId {
        self.allocs_since_gc += 1;

        let (index, gen) = self.arrays.alloc(ArrayObj { items });
        ArrayId::new(index, gen)
    }

    pub fn array(&self, id: ArrayId) -> &ArrayObj {
        self.arrays.get(id.index, id.gen)
    }

    pub fn array_mut(&mut self, id: ArrayId) -> &mut ArrayObj {
        self.arrays.get_mut(id.index, id.gen)
    }

    // ── tables ───────────────────────────────────────────────────────────

    pub fn alloc_table(&mut self) -> TableId {
        self.allocs_since_gc += 1;

        let (index, gen) = self.tables.alloc(TableObj {
            entries: Vec::new(),
            index: HashMap::new(),
        });
        TableId::new(index, gen)
    }

    pub fn table(&self, id: TableId) -> &TableObj {
        self.tables.get(id.index, id.gen)
    }

    /// Find the cell stored under a structurally-equal key.
    pub fn table_get(&self, id: TableId, key: &Value) -> Option<SlotId> {
        let hash = self.hash_value(key);
        let table = self.table(id);

        let bucket = table.index.get(&hash)?;
        for &i in bucket {
            let (stored, slot) = &table.entries[i];
            if self.equal(stored, key) {
                return Some(*slot);
            }
        }

        None
    }

    /// Insert a key→cell pair, or rewrite the cell in place when a
    /// structurally-equal key already exists.
    pub fn table_insert(&mut self, id: TableId, key: Value, value: Value, owner: EnvId) -> SlotId {
        if let Some(slot) = self.table_get(id, &key) {
            self.set_slot(slot, value);
            return slot;
        }

        let hash = self.hash_value(&key);
        let slot = self.alloc_slot(value, owner, false);

        let table = self.tables.get_mut(id.index, id.gen);
        let entry_index = table.entries.len();
        table.entries.push((key, slot));
        table.index.entry(hash).or_default().push(entry_index);

        slot
    }

    pub fn table_len(&self, id: TableId) -> usize {
        self.table(id).entries.len()
    }

    // ── garbage collection ───────────────────────────────────────────────

    /// True once the allocation counter crossed the threshold. Call sites
    /// assemble their root set and run [`Heap::collect`] only when asked.
    pub fn wants_collect(&self) -> bool {
        self.allocs_since_gc >= self.gc_threshold
    }

    /// Stop-the-world mark-sweep from the given roots plus every locked
    /// environment. Returns how much was reclaimed.
    pub fn collect(&mut self, env_roots: &[EnvId], value_roots: &[Value]) -> GcStats {
        self.allocs_since_gc = 0;

        let mut env_marks = vec![false; self.envs.entries.len()];
        let mut slot_marks = vec![false; self.slots.entries.len()];
        let mut array_marks = vec![false; self.arrays.entries.len()];
        let mut table_marks = vec![false; self.tables.entries.len()];

        let mut pending_envs: Vec<EnvId> = env_roots.to_vec();
        let mut pending_values: Vec<Value> = value_roots.to_vec();

        // Locked environments are in-flight call/block scopes.
        for (index, entry) in self.envs.entries.iter().enumerate() {
            if let Some(node) = &entry.item {
                if node.locks > 0 {
                    pending_envs.push(EnvId::new(index as u32, entry.gen));
                }
            }
        }

        loop {
            if let Some(env) = pending_envs.pop() {
                if !self.envs.is_live(env.index, env.gen) {
                    continue;
                }
                let mark = &mut env_marks[env.index as usize];
                if *mark {
                    continue;
                }
                *mark = true;

                let node = self.envs.get(env.index, env.gen);
                if let Some(parent) = node.parent {
                    pending_envs.push(parent);
                }
                for &slot in node.names.values() {
                    if !slot_marks[slot.index as usize] {
                        slot_marks[slot.index as usize] = true;
                        pending_values.push(self.slots.get(slot.index, slot.gen).value.clone());
                    }
                }
                continue;
            }

            let Some(value) = pending_values.pop() else { break };

            match value {
                Value::Array(id) => {
                    let mark = &mut array_marks[id.index as usize];
                    if *mark {
                        continue;
                    }
                    *mark = true;

                    for &slot in &self.arrays.get(id.index, id.gen).items {
                        if !slot_marks[slot.index as usize] {
                            slot_marks[slot.index as usize] = true;
                            pending_values
                                .push(self.slots.get(slot.index, slot.gen).value.clone());
                        }
                    }
                }

                Value::Table(id) => {
                    let mark = &mut table_marks[id.index as usize];
                    if *mark {
                        continue;
                    }
                    *mark = true;

                    for (key, slot) in &self.tables.get(id.index, id.gen).entries {
                        pending_values.push(key.clone());
                        if !slot_marks[slot.index as usize] {
                            slot_marks[slot.index as usize] = true;
                            pending_values
                                .push(self.slots.get(slot.index, slot.gen).value.clone());
                        }
                    }
                }

                Value::Ref(slot) => {
                    if !slot_marks[slot.index as usize] {
                        slot_marks[slot.index as usize] = true;
                        pending_values.push(self.slots.get(slot.index, slot.gen).value.clone());
                    }
                }

                Value::Function(func) => pending_envs.push(func.env),

                Value::Builtin(b) => pending_envs.push(b.env),

                Value::TailCall(tc) => {
                    pending_envs.push(tc.env);
                    pending_values.push(tc.callee.clone());
                    pending_values.extend(tc.args.iter().cloned());
                }

                Value::Module(module) => {
                    pending_envs.push(module.env);
                    let mut parent = module.parent.clone();
                    while let Some(m) = parent {
                        pending_envs.push(m.env);
                        parent = m.parent.clone();
                    }
                }

                Value::Interval(iv) => {
                    pending_values.push(iv.left.clone());
                    pending_values.push(iv.right.clone());
                }

                Value::Slice(slice) => pending_values.push(slice.parent.clone()),

                Value::Null
                | Value::Bool(_)
                | Value::Int(_)
                | Value::Float(_)
                | Value::Char(_)
                | Value::Str(_)
                | Value::Bytes(_)
                | Value::Quote(_) => {}
            }
        }

        // ── sweep ────────────────────────────────────────────────────────
        let mut stats = GcStats::default();

        for index in 0..self.envs.entries.len() {
            if self.envs.entries[index].item.is_some() && !env_marks[index] {
                self.envs.release(index as u32);
                stats.envs += 1;
            }
        }
        for index in 0..self.slots.entries.len() {
            if self.slots.entries[index].item.is_some() && !slot_marks[index] {
                self.slots.release(index as u32);
                stats.slots += 1;
            }
        }
        for index in 0..self.arrays.entries.len() {
            if self.arrays.entries[index].item.is_some() && !array_marks[index] {
                self.arrays.release(index as u32);
                stats.arrays += 1;
            }
        }
        for index in 0..self.tables.entries.len() {
            if self.tables.entries[index].item.is_some() && !table_marks[index] {
                self.tables.release(index as u32);
                stats.tables += 1;
            }
        }

        // Drop child links to swept scopes.
        for entry in &mut self.envs.entries {
            if let Some(node) = &mut entry.item {
                node.children
                    .retain(|c| env_marks.get(c.index as usize).copied().unwrap_or(false));
            }
        }

        debug!(
            "gc: reclaimed {} envs, {} slots, {} arrays, {} tables",
            stats.envs, stats.slots, stats.arrays, stats.tables
        );

        stats
    }

    /// Live object counts (`gc.stats()`).
    pub fn live_counts(&self) -> GcStats {
        GcStats {
            envs: self.envs.live_count(),
            slots: self.slots.live_count(),
            arrays: self.arrays.live_count(),
            tables: self.tables.live_count(),
        }
    }
}
