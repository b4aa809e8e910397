//! The per-row handle given to listeners before a row is shown.
//!
//! Through a [`VisualUpdate`] a listener can read and override the values
//! about to be written, stage hot/cold styles for the whole row or single
//! cells, retune the transition timings, and issue further row operations.
//! Everything set here applies to this pass only.

use crate::cell::{StyleMap, ViewCell, CLASS};
use crate::cell_matrix::CellMatrix;
use crate::error::{GridError, ListenerError, Result};
use crate::model::Reentry;
use crate::slot::{Fields, Key, SlotId};

const NO_CELL: &str = "no cell defined for this field";

/// Durations of the three phases of a visual transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    pub cold_to_hot: u64,
    pub hot: u64,
    pub hot_to_cold: u64,
}

/// What the listener left behind for the transition.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct VisualPlan {
    pub timings: Timings,
    pub hot_row: Option<StyleMap>,
    pub cold_row: Option<StyleMap>,
}

pub struct VisualUpdate<'a> {
    key: &'a str,
    slot: &'a SlotId,
    cells: &'a mut CellMatrix,
    changed: &'a Fields,
    reentry: &'a mut Reentry,
    timings: Timings,
    hot_row: Option<StyleMap>,
    cold_row: Option<StyleMap>,
}

impl<'a> VisualUpdate<'a> {
    pub(crate) fn new(
        key: &'a str,
        slot: &'a SlotId,
        cells: &'a mut CellMatrix,
        changed: &'a Fields,
        reentry: &'a mut Reentry,
        timings: Timings,
    ) -> Self {
        Self {
            key,
            slot,
            cells,
            changed,
            reentry,
            timings,
            hot_row: None,
            cold_row: None,
        }
    }

    pub fn key(&self) -> &str {
        self.key
    }

    pub fn slot(&self) -> &SlotId {
        self.slot
    }

    /// Value the cell is about to show, or shows now if nothing is staged.
    /// Without a replica id the first cell of the field answers.
    pub fn cell_value(&self, field: &str, replica: Option<&str>) -> Result<String> {
        let group = self
            .cells
            .group(self.slot, field)
            .ok_or_else(|| GridError::invalid(NO_CELL))?;
        let cell = match replica {
            Some(id) => group.iter().find(|c| c.replica() == Some(id)),
            None => group.first(),
        };
        cell.map(|c| c.effective_value().to_string())
            .ok_or_else(|| GridError::invalid(NO_CELL))
    }

    /// Override the value to show. `None` keeps the value currently shown.
    pub fn set_cell_value(&mut self, field: &str, value: Option<&str>, replica: Option<&str>) -> Result<()> {
        for cell in self.cells_for(field, replica)? {
            match value {
                Some(v) => cell.set_next_value(Some(v)),
                None => cell.discard_next_value(),
            }
        }
        Ok(())
    }

    /// Every field changed by this update.
    pub fn changed_fields(&self) -> &Fields {
        self.changed
    }

    /// New value of a field changed by this update. Empty values read as `None`.
    pub fn changed_field_value(&self, field: &str) -> Option<&str> {
        self.changed
            .get(field)?
            .as_deref()
            .filter(|v| !v.is_empty())
    }

    /// Visit each changed field in name order. Failures of `visit` are
    /// logged and do not stop the iteration.
    pub fn for_each_changed_field<F>(&self, mut visit: F)
    where
        F: FnMut(&str, Option<&str>) -> std::result::Result<(), ListenerError>,
    {
        let mut names: Vec<&String> = self.changed.keys().collect();
        names.sort();
        for name in names {
            let value = self.changed.get(name).and_then(|v| v.as_deref());
            if let Err(err) = visit(name, value) {
                log::error!(target: "livegrid::grid", "changed-field visitor failed on {}: {}", name, err);
            }
        }
    }

    pub fn timings(&self) -> Timings {
        self.timings
    }

    pub fn set_hot_time(&mut self, ms: u64) {
        self.timings.hot = ms;
    }

    pub fn set_cold_to_hot_time(&mut self, ms: u64) {
        self.timings.cold_to_hot = ms;
    }

    pub fn set_hot_to_cold_time(&mut self, ms: u64) {
        self.timings.hot_to_cold = ms;
    }

    /// Stage a style for every cell of the row. Cell-level settings win.
    pub fn set_attribute(&mut self, hot: Option<&str>, cold: Option<&str>, name: &str) {
        self.hot_row
            .get_or_insert_with(StyleMap::new)
            .insert(name.to_string(), hot.unwrap_or_default().to_string());
        self.cold_row
            .get_or_insert_with(StyleMap::new)
            .insert(name.to_string(), cold.unwrap_or_default().to_string());
    }

    /// Stage a class for every cell of the row.
    pub fn set_style(&mut self, hot: Option<&str>, cold: Option<&str>) {
        self.set_attribute(hot, cold, CLASS);
    }

    pub fn set_cell_attribute(
        &mut self,
        field: &str,
        hot: Option<&str>,
        cold: Option<&str>,
        name: &str,
        replica: Option<&str>,
    ) -> Result<()> {
        for cell in self.cells_for(field, replica)? {
            cell.add_style(hot, cold, name);
        }
        Ok(())
    }

    pub fn set_cell_style(
        &mut self,
        field: &str,
        hot: Option<&str>,
        cold: Option<&str>,
        replica: Option<&str>,
    ) -> Result<()> {
        self.set_cell_attribute(field, hot, cold, CLASS, replica)
    }

    /// Update a row once the current pass allows it. Updates to this very
    /// row are folded into the current pass.
    pub fn update_row(&mut self, key: impl Into<Key>, fields: Fields) {
        self.reentry.update_row(key, fields);
    }

    /// Remove a row once the current pass is complete.
    pub fn remove_row(&mut self, key: impl Into<Key>) {
        self.reentry.remove_row(key);
    }

    pub(crate) fn finish(self) -> VisualPlan {
        VisualPlan {
            timings: self.timings,
            hot_row: self.hot_row,
            cold_row: self.cold_row,
        }
    }

    fn cells_for(&mut self, field: &str, replica: Option<&str>) -> Result<Vec<&mut ViewCell>> {
        let group = self
            .cells
            .group_mut(self.slot, field)
            .ok_or_else(|| GridError::invalid(NO_CELL))?;
        let cells: Vec<&mut ViewCell> = group
            .iter_mut()
            .filter(|c| replica.is_none() || c.replica() == replica)
            .collect();
        if cells.is_empty() {
            return Err(GridError::invalid(NO_CELL));
        }
        Ok(cells)
    }
}
