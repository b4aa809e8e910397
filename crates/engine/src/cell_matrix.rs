//! Physical cell grid: slot -> field -> cells.
//!
//! Several cells may show the same (slot, field); they are told apart by an
//! optional replica id. Scrolling copies what one slot shows onto another,
//! matching cells replica by replica. Cells that have nowhere to land become
//! placeholders in the destination slot.

use livegrid_core::{MatrixRow, SparseMatrix};
use rustc_hash::FxHashSet;

use crate::cell::ViewCell;
use crate::slot::{CellDescriptor, ElementId, Field, SlotId};

/// All cells of one slot.
pub type CellRow = MatrixRow<Field, Vec<ViewCell>>;

#[derive(Debug, Default)]
pub struct CellMatrix {
    cells: SparseMatrix<SlotId, Field, Vec<ViewCell>>,
    elements: FxHashSet<ElementId>,
}

impl CellMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a new element. Returns false if it was already bound.
    pub fn add_cell(&mut self, desc: &CellDescriptor) -> bool {
        if !self.elements.insert(desc.element) {
            return false;
        }
        let cell = ViewCell::bound(desc);
        match self.cells.get_mut(&desc.slot, &desc.field) {
            Some(group) => group.push(cell),
            None => {
                self.cells.insert(desc.slot.clone(), desc.field.clone(), vec![cell]);
            }
        }
        true
    }

    pub fn contains_element(&self, element: ElementId) -> bool {
        self.elements.contains(&element)
    }

    /// Mark the cell bound to `element` as gone from the view.
    pub fn detach(&mut self, element: ElementId) -> bool {
        for (_, row) in self.cells.rows_mut() {
            for cell in row.values_mut().flatten() {
                if cell.element() == Some(element) {
                    cell.detach();
                    return true;
                }
            }
        }
        false
    }

    /// Drop every cell that is not attached to the view, placeholders
    /// included. Rows left without cells go away.
    pub fn collect_garbage(&mut self) -> usize {
        let mut purged = 0;
        let elements = &mut self.elements;
        self.cells.retain_rows(|_, row| {
            row.retain(|_, group| {
                group.retain(|cell| {
                    if cell.is_attached() {
                        return true;
                    }
                    if let Some(element) = cell.element() {
                        elements.remove(&element);
                    }
                    purged += 1;
                    false
                });
                !group.is_empty()
            });
            true
        });
        purged
    }

    pub fn group(&self, slot: &SlotId, field: &str) -> Option<&Vec<ViewCell>> {
        self.cells.row(slot)?.get(field)
    }

    pub fn group_mut(&mut self, slot: &SlotId, field: &str) -> Option<&mut Vec<ViewCell>> {
        self.cells.row_mut(slot)?.get_mut(field)
    }

    /// The `ordinal`-th cell of (slot, field) carrying `replica`.
    pub fn cell_mut(
        &mut self,
        slot: &SlotId,
        field: &str,
        replica: Option<&str>,
        ordinal: usize,
    ) -> Option<&mut ViewCell> {
        self.group_mut(slot, field)?
            .iter_mut()
            .filter(|c| c.replica() == replica)
            .nth(ordinal)
    }

    pub fn cell(&self, slot: &SlotId, field: &str, replica: Option<&str>, ordinal: usize) -> Option<&ViewCell> {
        self.group(slot, field)?
            .iter()
            .filter(|c| c.replica() == replica)
            .nth(ordinal)
    }

    pub fn row(&self, slot: &SlotId) -> Option<&CellRow> {
        self.cells.row(slot)
    }

    pub fn row_mut(&mut self, slot: &SlotId) -> Option<&mut CellRow> {
        self.cells.row_mut(slot)
    }

    pub fn contains_slot(&self, slot: &SlotId) -> bool {
        self.cells.contains_row(slot)
    }

    pub fn slots(&self) -> impl Iterator<Item = &SlotId> {
        self.cells.row_keys()
    }

    /// Every cell with its slot and field.
    pub fn iter(&self) -> impl Iterator<Item = (&SlotId, &Field, &ViewCell)> {
        self.cells
            .iter()
            .flat_map(|(slot, field, group)| group.iter().map(move |c| (slot, field, c)))
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Copy what `from` shows onto `to`, creating `to` if needed.
    pub fn scroll_row(&mut self, from: &SlotId, to: &SlotId) {
        let source = self.cells.row(from).cloned();
        let target = self.ensure_row(to);
        scroll_into(source.as_ref(), target);
    }

    /// Detached placeholder copy of a slot, for holding a row in transit.
    pub fn copy_row(&self, slot: &SlotId) -> CellRow {
        let mut copy = CellRow::default();
        if let Some(row) = self.cells.row(slot) {
            scroll_into(Some(row), &mut copy);
        }
        copy
    }

    /// Copy a detached row onto `to`, creating `to` if needed.
    pub fn paste_row(&mut self, source: &CellRow, to: &SlotId) {
        let target = self.ensure_row(to);
        scroll_into(Some(source), target);
    }

    /// Clean every cell of a slot back to its bound state.
    pub fn clean_row(&mut self, slot: &SlotId) {
        if let Some(row) = self.cells.row_mut(slot) {
            row.values_mut().flatten().for_each(ViewCell::clean);
        }
    }

    /// Create an empty slot (it will be filled by scrolling).
    pub fn ensure_row(&mut self, slot: &SlotId) -> &mut CellRow {
        self.cells.row_or_insert(slot.clone())
    }
}

/// Scroll the content of `source` onto `target`.
///
/// For every field present on either side:
/// - missing in the source: the target cells are cleaned
/// - missing in the target: placeholder copies of the source cells are added
/// - otherwise cells are paired by replica id in order; leftovers in the
///   source become placeholders, leftovers in the target are cleaned
pub fn scroll_into(source: Option<&CellRow>, target: &mut CellRow) {
    let mut fields: Vec<Field> = target.keys().cloned().collect();
    if let Some(source) = source {
        fields.extend(source.keys().filter(|f| !target.contains_key(*f)).cloned());
    }

    for field in fields {
        let from = source.and_then(|row| row.get(&field));
        match (from, target.get_mut(&field)) {
            (None, Some(to)) => to.iter_mut().for_each(ViewCell::clean),
            (Some(from), None) => {
                target.insert(field, from.iter().map(ViewCell::placeholder_of).collect());
            }
            (Some(from), Some(to)) => {
                let mut unmatched: Vec<usize> = (0..to.len()).collect();
                let mut extra = Vec::new();
                for cell in from {
                    match unmatched.iter().position(|&i| to[i].replica() == cell.replica()) {
                        Some(pos) => {
                            let i = unmatched.remove(pos);
                            to[i].scroll_here(cell);
                        }
                        None => extra.push(ViewCell::placeholder_of(cell)),
                    }
                }
                for i in unmatched {
                    to[i].clean();
                }
                to.extend(extra);
            }
            (None, None) => {}
        }
    }
}
