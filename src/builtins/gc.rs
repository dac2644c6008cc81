//! `gc` module: explicit collection and live-object statistics.
//!
//! Both report as a table `{envs, slots, arrays, tables}`; `collect`
//! reports what was reclaimed, `stats` reports what is alive.

use crate::eval::Interp;
use crate::heap::GcStats;
use crate::token::Position;
use crate::value::{EvalResult, Value};

use super::Entry;

pub(super) const ENTRIES: &[Entry] = &[
    ("collect", Some(0), collect, None),
    ("stats", Some(0), stats, None),
];

fn stats_table(interp: &mut Interp, stats: GcStats) -> EvalResult {
    let root = interp.root();
    let table = interp.heap.alloc_table();

    let rows = [
        ("envs", stats.envs),
        ("slots", stats.slots),
        ("arrays", stats.arrays),
        ("tables", stats.tables),
    ];
    for (key, count) in rows {
        interp
            .heap
            .table_insert(table, Value::string(key), Value::Int(count as i64), root);
    }

    Ok(Value::Table(table))
}

fn collect(interp: &mut Interp, _args: &[Value], _pos: Position) -> EvalResult {
    let reclaimed = interp.collect_garbage();

    stats_table(interp, reclaimed)
}

fn stats(interp: &mut Interp, _args: &[Value], _pos: Position) -> EvalResult {
    let live = interp.heap.live_counts();
    stats_table(interp, live)
}
