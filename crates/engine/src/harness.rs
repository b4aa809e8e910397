//! Test harness for grid operations with event tracking.
//!
//! This module provides `GridHarness`, a wrapper around `StaticGrid` that:
//! - Binds a rectangular block of row cells up front
//! - Records every listener callback in an `EventCollector`
//! - Provides `apply_ops` to run a script of row operations
//!
//! Use this harness to test ordering and re-entrancy without a real view.

use std::cell::RefCell;
use std::rc::Rc;

use livegrid_config::GridSettings;

use crate::error::GridError;
use crate::events::EventCollector;
use crate::grid::StaticGrid;
use crate::slot::{fields, CellDescriptor, Fields, KeyMode, SlotId};

/// Operation to apply to a grid.
#[derive(Debug, Clone)]
pub enum Op {
    /// Insert or update a row.
    Update { key: String, fields: Fields },
    /// Remove a row.
    Remove { key: String },
    /// Remove every row.
    Clear,
    /// Let the virtual clock run.
    Advance { ms: u64 },
}

impl Op {
    pub fn update(key: &str, pairs: &[(&str, &str)]) -> Self {
        Op::Update {
            key: key.to_string(),
            fields: fields(pairs.iter().copied()),
        }
    }

    pub fn remove(key: &str) -> Self {
        Op::Remove { key: key.to_string() }
    }
}

/// Result of applying operations.
#[derive(Debug)]
pub struct ApplyResult {
    /// Number of ops that completed without error.
    pub applied: usize,
    /// Errors, with the index of the op that raised them.
    pub errors: Vec<(usize, GridError)>,
}

/// Test harness wrapping a grid with event tracking.
pub struct GridHarness {
    grid: StaticGrid,
    events: Rc<RefCell<EventCollector>>,
}

impl GridHarness {
    /// Grid with `rows` bound rows showing `cols`.
    pub fn new(rows: usize, cols: &[&str]) -> Self {
        Self::with_settings(rows, cols, GridSettings::default())
    }

    pub fn with_settings(rows: usize, cols: &[&str], settings: GridSettings) -> Self {
        let mut grid = StaticGrid::with_settings("harness", settings);
        let mut descriptors = Vec::with_capacity(rows * cols.len());
        for row in 1..=rows {
            for (c, col) in cols.iter().enumerate() {
                let element = (row * cols.len() + c) as u64;
                descriptors.push(CellDescriptor::row(element, row, *col));
            }
        }
        if let Err(err) = grid.bind_cells(descriptors) {
            panic!("harness grid could not bind: {}", err);
        }

        let events = EventCollector::shared();
        grid.add_listener(events.clone());
        Self { grid, events }
    }

    /// Same block of cells, rows keyed by a progressive counter.
    pub fn counter(rows: usize, cols: &[&str]) -> Self {
        let mut harness = Self::new(rows, cols);
        if let Err(err) = harness.grid.force_interpretation(Some(KeyMode::CounterIsKey)) {
            panic!("harness grid could not switch to counter keys: {}", err);
        }
        harness
    }

    pub fn grid(&self) -> &StaticGrid {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut StaticGrid {
        &mut self.grid
    }

    /// Get collected events.
    pub fn events(&self) -> std::cell::Ref<'_, EventCollector> {
        self.events.borrow()
    }

    pub fn clear_events(&self) {
        self.events.borrow_mut().clear();
    }

    /// Keys in row order.
    pub fn order(&self) -> Vec<String> {
        self.grid.keys_in_order().into_iter().map(str::to_string).collect()
    }

    /// What row `row` shows for `field`.
    pub fn shown(&self, row: usize, field: &str) -> String {
        self.grid
            .shown(&SlotId::Row(row), field)
            .unwrap_or_default()
            .to_string()
    }

    /// Apply operations in order. A failing op does not stop the script.
    pub fn apply_ops(&mut self, ops: &[Op]) -> ApplyResult {
        let mut applied = 0;
        let mut errors = Vec::new();
        for (idx, op) in ops.iter().enumerate() {
            let result = match op {
                Op::Update { key, fields } => self.grid.apply_update(key.clone(), fields.clone()),
                Op::Remove { key } => self.grid.apply_removal(key),
                Op::Clear => self.grid.clear(),
                Op::Advance { ms } => {
                    self.grid.advance(*ms);
                    Ok(())
                }
            };
            match result {
                Ok(()) => applied += 1,
                Err(err) => errors.push((idx, err)),
            }
        }
        ApplyResult { applied, errors }
    }

    /// Check that the key <-> row map is a bijection over rows 1..=row_count.
    pub fn assert_consistent(&self) {
        let grid = &self.grid;
        assert_eq!(grid.row_count(), grid.len(), "placed rows vs model rows");
        let mut seen = std::collections::HashSet::new();
        for row in 1..=grid.row_count() {
            let key = grid
                .key_at(row)
                .unwrap_or_else(|| panic!("row {} has no key", row));
            assert!(seen.insert(key.to_string()), "key {} placed twice", key);
            assert!(grid.contains(key), "row {} shows evicted key {}", row, key);
            assert_eq!(grid.slot_of(key), Some(SlotId::Row(row)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::GridEvent;

    #[test]
    fn test_harness_basic_apply() {
        let mut harness = GridHarness::new(3, &["v"]);
        let result = harness.apply_ops(&[Op::update("a", &[("v", "1")]), Op::update("b", &[("v", "2")])]);

        assert_eq!(result.applied, 2);
        assert!(result.errors.is_empty());
        assert_eq!(harness.order(), vec!["a", "b"]);
        assert_eq!(harness.events().updated_keys(), vec!["a", "b"]);
        harness.assert_consistent();
    }

    #[test]
    fn test_harness_keeps_going_after_soft_failures() {
        let mut harness = GridHarness::new(2, &["v"]);
        let result = harness.apply_ops(&[
            Op::remove("ghost"),
            Op::update("a", &[("v", "1")]),
            Op::Advance { ms: 5000 },
            Op::Clear,
        ]);

        assert_eq!(result.applied, 4);
        assert!(harness.grid().is_empty());
        assert_eq!(harness.events().removed_keys(), vec!["a"]);
    }

    #[test]
    fn test_harness_events_carry_slots() {
        let mut harness = GridHarness::new(2, &["v"]);
        harness.grid_mut().set_add_on_top(true);
        harness.apply_ops(&[Op::update("a", &[("v", "1")]), Op::update("b", &[("v", "2")])]);

        let events = harness.events();
        assert_eq!(events.events()[1].slot(), &SlotId::Row(1));
        match &events.events()[1] {
            GridEvent::Updated { key, changed, .. } => {
                assert_eq!(key, "b");
                assert_eq!(changed.get("v"), Some(&Some("2".to_string())));
            }
            other => panic!("unexpected event {:?}", other),
        }
        drop(events);
        assert_eq!(harness.shown(2, "v"), "1");
    }

    #[test]
    fn test_counter_harness() {
        let mut harness = GridHarness::counter(3, &["v"]);
        let ops: Vec<Op> = ["a", "b", "c", "d"]
            .iter()
            .map(|k| Op::update(k, &[("v", *k)]))
            .collect();
        harness.apply_ops(&ops);

        assert_eq!(harness.order(), vec!["b", "c", "d"]);
        harness.assert_consistent();
    }
}
