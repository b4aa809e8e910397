//! Serializable picture of a grid: what every placed row holds and shows.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::cell::CellState;
use crate::grid::StaticGrid;
use crate::slot::{Field, Key, KeyMode, SlotId, SlotLayout};
use crate::sort::SortConfig;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridSnapshot {
    pub id: String,
    pub key_mode: Option<KeyMode>,
    pub sort: Option<SortConfig>,
    pub add_on_top: bool,
    pub max_row: usize,
    pub rows: Vec<RowSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowSnapshot {
    pub slot: SlotId,
    pub key: Key,
    /// Model values.
    pub values: BTreeMap<Field, Option<String>>,
    /// What the first cell of each field shows.
    pub cells: BTreeMap<Field, CellState>,
}

impl GridSnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Every field that has a value or a cell in some row.
    pub fn columns(&self) -> Vec<Field> {
        let mut columns: Vec<Field> = self
            .rows
            .iter()
            .flat_map(|row| row.values.keys().chain(row.cells.keys()))
            .cloned()
            .collect();
        columns.sort();
        columns.dedup();
        columns
    }
}

impl StaticGrid {
    pub fn snapshot(&self) -> GridSnapshot {
        let placed: Vec<(SlotId, Key)> = match self.policy.layout() {
            SlotLayout::Rows => (1..=self.row_count())
                .filter_map(|row| self.key_at(row).map(|key| (SlotId::Row(row), key.to_string())))
                .collect(),
            SlotLayout::Items => {
                let mut keys: Vec<&Key> = self.table.keys().collect();
                keys.sort();
                keys.into_iter()
                    .map(|key| (SlotId::Item(key.clone()), key.clone()))
                    .collect()
            }
        };

        let rows = placed
            .into_iter()
            .map(|(slot, key)| {
                let values = self
                    .table
                    .row(&key)
                    .map(|row| row.iter().map(|(f, v)| (f.clone(), v.clone())).collect())
                    .unwrap_or_default();
                let cells = self
                    .cells()
                    .row(&slot)
                    .map(|row| {
                        row.iter()
                            .filter_map(|(field, group)| Some((field.clone(), group.first()?.state().clone())))
                            .collect()
                    })
                    .unwrap_or_default();
                RowSnapshot {
                    slot,
                    key,
                    values,
                    cells,
                }
            })
            .collect();

        GridSnapshot {
            id: self.id().to_string(),
            key_mode: self.key_mode(),
            sort: self.sort().cloned(),
            add_on_top: self.is_add_on_top(),
            max_row: self.max_row(),
            rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slot::{fields, CellDescriptor};
    use livegrid_config::GridSettings;

    #[test]
    fn test_snapshot_lists_rows_in_order() {
        let mut grid = StaticGrid::with_settings("snap", GridSettings::default());
        grid.bind_cells(vec![CellDescriptor::row(1, 1, "v"), CellDescriptor::row(2, 2, "v")])
            .unwrap();
        grid.set_add_on_top(true);
        grid.apply_update("a", fields([("v", "1"), ("hidden", "x")])).unwrap();
        grid.apply_update("b", fields([("v", "2")])).unwrap();

        let snap = grid.snapshot();
        assert_eq!(snap.rows.len(), 2);
        assert_eq!(snap.rows[0].key, "b");
        assert_eq!(snap.rows[1].slot, SlotId::Row(2));
        assert_eq!(snap.rows[1].cells["v"].content, "1");
        assert_eq!(snap.columns(), vec!["hidden", "v"]);

        let json = snap.to_json().unwrap();
        assert!(json.contains("\"add_on_top\": true"));
    }
}
