//! Key-bound cell handles.
//!
//! A [`SlidingRef`] names a cell by row key instead of by slot, so work
//! scheduled against a row keeps hitting the right cell after the row has
//! been scrolled elsewhere. Resolution always goes through the current
//! key -> slot map; a handle whose row is gone resolves to nothing.

use livegrid_core::BiMap;

use crate::cell::ViewCell;
use crate::cell_matrix::CellMatrix;
use crate::slot::{Field, Key, SlotId, SlotLayout};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlidingRef {
    pub key: Key,
    pub field: Field,
    pub replica: Option<String>,
    /// Position among the cells of (slot, field) sharing `replica`.
    pub ordinal: usize,
}

impl SlidingRef {
    pub fn new(key: impl Into<Key>, field: impl Into<Field>) -> Self {
        Self {
            key: key.into(),
            field: field.into(),
            replica: None,
            ordinal: 0,
        }
    }

    pub fn resolve<'m>(&self, slots: &SlotResolver<'_>, cells: &'m mut CellMatrix) -> Option<&'m mut ViewCell> {
        let slot = slots.slot_of(&self.key)?;
        cells.cell_mut(&slot, &self.field, self.replica.as_deref(), self.ordinal)
    }

    pub fn peek<'m>(&self, slots: &SlotResolver<'_>, cells: &'m CellMatrix) -> Option<&'m ViewCell> {
        let slot = slots.slot_of(&self.key)?;
        cells.cell(&slot, &self.field, self.replica.as_deref(), self.ordinal)
    }
}

/// Current key -> slot view of a grid.
#[derive(Clone, Copy)]
pub struct SlotResolver<'a> {
    layout: SlotLayout,
    key_slots: &'a BiMap<Key, usize>,
}

impl<'a> SlotResolver<'a> {
    pub fn new(layout: SlotLayout, key_slots: &'a BiMap<Key, usize>) -> Self {
        Self { layout, key_slots }
    }

    pub fn slot_of(&self, key: &str) -> Option<SlotId> {
        match self.layout {
            SlotLayout::Items => Some(SlotId::Item(key.to_string())),
            SlotLayout::Rows => self.key_slots.get(&key.to_string()).map(|&n| SlotId::Row(n)),
        }
    }
}

/// Hand out [`SlidingRef`]s for the cells of one row pass, numbering
/// cells that share (field, replica) in order.
pub(crate) fn refs_for_group<'c>(
    key: &str,
    field: &str,
    group: &'c mut [ViewCell],
) -> impl Iterator<Item = (SlidingRef, &'c mut ViewCell)> + 'c {
    let key = key.to_string();
    let field = field.to_string();
    let mut seen: Vec<(Option<String>, usize)> = Vec::new();
    group.iter_mut().map(move |cell| {
        let replica = cell.replica().map(str::to_string);
        let ordinal = match seen.iter_mut().find(|(r, _)| *r == replica) {
            Some((_, n)) => {
                *n += 1;
                *n
            }
            None => {
                seen.push((replica.clone(), 0));
                0
            }
        };
        let r = SlidingRef {
            key: key.clone(),
            field: field.clone(),
            replica,
            ordinal,
        };
        (r, cell)
    })
}
