use std::collections::hash_map::Entry as HashEntry;
use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDateTime;
use sha2::{Digest, Sha256};

use crate::model::revision::{Field, TaskRevision, TaskTable};
use crate::util::time::parse_add_time;

// ---------------------------------------------------------------------------
// Latest revision per task
// ---------------------------------------------------------------------------

/// Collapse the revision log to the newest revision of each named task.
///
/// Rows without a task name or with an `add_time` that does not parse are
/// left out. When two revisions of a task share the newest `add_time`, the
/// one later in the log wins. Output is ordered by task name.
///
/// A table without `task_name` or `add_time` columns is returned unchanged.
pub fn reconcile_latest(table: &TaskTable) -> TaskTable {
    if !has_key_columns(table) {
        tracing::debug!("reconcile skipped: key columns missing");
        return table.clone();
    }

    let mut latest: BTreeMap<&str, (NaiveDateTime, usize)> = BTreeMap::new();
    let mut excluded = 0usize;

    for (idx, row) in table.rows.iter().enumerate() {
        let Some((name, at)) = keyed(row) else {
            excluded += 1;
            continue;
        };
        latest
            .entry(name)
            .and_modify(|slot| {
                if at >= slot.0 {
                    *slot = (at, idx);
                }
            })
            .or_insert((at, idx));
    }

    if excluded > 0 {
        tracing::debug!(excluded, "rows without name or parseable add_time dropped");
    }

    let rows = latest
        .into_values()
        .map(|(_, idx)| table.rows[idx].clone())
        .collect();
    table.with_rows(rows)
}

// ---------------------------------------------------------------------------
// Backfill
// ---------------------------------------------------------------------------

/// Fill empty deadline, link, description, report-to and assignee cells from
/// the nearest earlier revision of the same task that has a value.
///
/// Revisions are visited oldest first within each task. Nothing is collapsed:
/// the output has the same rows in the same order. Rows that cannot be placed
/// in time (no name, bad `add_time`) pass through untouched.
pub fn backfill_missing_fields(table: &TaskTable) -> TaskTable {
    if !has_key_columns(table) {
        return table.clone();
    }

    let mut groups: HashMap<&str, Vec<(NaiveDateTime, usize)>> = HashMap::new();
    for (idx, row) in table.rows.iter().enumerate() {
        if let Some((name, at)) = keyed(row) {
            groups.entry(name).or_default().push((at, idx));
        }
    }

    let mut rows = table.rows.clone();
    let mut filled = 0usize;
    for mut revisions in groups.into_values() {
        // stable: equal stamps keep log order
        revisions.sort_by_key(|(at, _)| *at);
        let mut carried: [Option<String>; Field::BACKFILLED.len()] = Default::default();
        for (_, idx) in revisions {
            let row = &mut rows[idx];
            for (slot, field) in carried.iter_mut().zip(Field::BACKFILLED) {
                match row.field(field) {
                    Some(value) => *slot = Some(value.to_string()),
                    None => {
                        if slot.is_some() {
                            row.set_field(field, slot.clone());
                            filled += 1;
                        }
                    }
                }
            }
        }
    }

    if filled > 0 {
        tracing::debug!(filled, "cells backfilled from earlier revisions");
    }
    table.with_rows(rows)
}

/// All revisions of one task, oldest first, with gaps backfilled.
pub fn task_history(table: &TaskTable, task_name: &str) -> Vec<TaskRevision> {
    let filled = backfill_missing_fields(table);
    let mut history: Vec<(Option<NaiveDateTime>, TaskRevision)> = filled
        .rows
        .into_iter()
        .filter(|row| row.name() == Some(task_name))
        .map(|row| (row.add_time.as_deref().and_then(parse_add_time), row))
        .collect();
    // unparseable stamps sort first
    history.sort_by_key(|(at, _)| *at);
    history.into_iter().map(|(_, row)| row).collect()
}

fn has_key_columns(table: &TaskTable) -> bool {
    table.has_column(Field::AddTime.name()) && table.has_column(Field::TaskName.name())
}

fn keyed(row: &TaskRevision) -> Option<(&str, NaiveDateTime)> {
    let name = row.name()?;
    let at = parse_add_time(row.add_time.as_deref()?)?;
    Some((name, at))
}

// ---------------------------------------------------------------------------
// Snapshot cache
// ---------------------------------------------------------------------------

/// Content hash of a snapshot: equal tables give equal keys.
pub fn snapshot_key(table: &TaskTable) -> String {
    let mut hasher = Sha256::new();
    hash_cells(&mut hasher, &table.headers);
    for row in &table.rows {
        hash_cells(&mut hasher, &row.to_record(&table.headers));
    }
    hex::encode(hasher.finalize())
}

fn hash_cells(hasher: &mut Sha256, cells: &[String]) {
    hasher.update((cells.len() as u64).to_le_bytes());
    for cell in cells {
        hasher.update((cell.len() as u64).to_le_bytes());
        hasher.update(cell.as_bytes());
    }
}

/// Memoizes `reconcile_latest` by snapshot content.
#[derive(Debug, Default)]
pub struct ReconcileCache {
    entries: HashMap<String, TaskTable>,
}

impl ReconcileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The reconciled view of `table`, computed at most once per distinct snapshot.
    pub fn get_or_reconcile(&mut self, table: &TaskTable) -> &TaskTable {
        let key = snapshot_key(table);
        match self.entries.entry(key) {
            HashEntry::Occupied(e) => {
                tracing::trace!(key = %e.key(), "reconcile cache hit");
                e.into_mut()
            }
            HashEntry::Vacant(e) => e.insert(reconcile_latest(table)),
        }
    }

    /// Drop every cached view, e.g. after a write.
    pub fn invalidate(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
