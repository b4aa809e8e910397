//! Keys, slots and cell descriptors.
//!
//! A row is addressed by its business key; a physical position in the view
//! is a [`SlotId`]. Row-based grids use 1-based row numbers, item-based
//! grids use the item name itself as the slot.

use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Business identifier of a logical row.
pub type Key = String;

/// Field (column) name.
pub type Field = String;

/// Changed field values of one update. `None` means the field was set to null.
pub type Fields = FxHashMap<Field, Option<String>>;

/// Build a [`Fields`] map from `(name, value)` pairs.
pub fn fields<I, K, V>(pairs: I) -> Fields
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), Some(v.into())))
        .collect()
}

/// Physical position in the view.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SlotId {
    /// 1-based row of a positional grid.
    Row(usize),
    /// Statically bound item slot.
    Item(String),
}

impl SlotId {
    pub fn row_number(&self) -> Option<usize> {
        match self {
            SlotId::Row(n) => Some(*n),
            SlotId::Item(_) => None,
        }
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotId::Row(n) => write!(f, "row {}", n),
            SlotId::Item(name) => write!(f, "item {}", name),
        }
    }
}

/// How the row key is derived from incoming updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyMode {
    /// The item name (or position) is the key.
    ItemIsKey,
    /// Every update gets a fresh progressive key.
    CounterIsKey,
    /// Item plus the value of the key field.
    CompositeIsKey,
}

/// Whether slots are positional rows or named items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotLayout {
    Rows,
    Items,
}

/// Identity of a view element as reported by the binding scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(pub u64);

/// Subscription level a cell belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldLevel {
    #[default]
    First,
    Second,
    /// Bound to neither subscription; only written by listeners.
    Extra,
}

/// One bindable view element: where it sits and which field it shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellDescriptor {
    pub element: ElementId,
    pub slot: SlotId,
    pub field: Field,
    pub replica: Option<String>,
    pub level: FieldLevel,
}

impl CellDescriptor {
    pub fn row(element: u64, row: usize, field: impl Into<Field>) -> Self {
        Self {
            element: ElementId(element),
            slot: SlotId::Row(row),
            field: field.into(),
            replica: None,
            level: FieldLevel::First,
        }
    }

    pub fn item(element: u64, item: impl Into<String>, field: impl Into<Field>) -> Self {
        Self {
            element: ElementId(element),
            slot: SlotId::Item(item.into()),
            field: field.into(),
            replica: None,
            level: FieldLevel::First,
        }
    }

    pub fn with_replica(mut self, replica: impl Into<String>) -> Self {
        self.replica = Some(replica.into());
        self
    }

    pub fn with_level(mut self, level: FieldLevel) -> Self {
        self.level = level;
        self
    }
}
