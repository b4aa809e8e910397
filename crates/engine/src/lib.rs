//! Live grid engine.
//!
//! A keyed row model ([`RowModel`]) feeding a view made of bound cells.
//! [`StaticGrid`] places rows by row number (sorted, add-on-top, or in
//! arrival order, optionally bounded and evicting oldest first) or by item
//! name, and runs a timed cold -> hot -> cold transition on every cell an
//! update touches.

pub mod cell;
pub mod cell_matrix;
pub mod error;
pub mod events;
pub mod fader;
pub mod feed;
pub mod fifo;
pub mod grid;
pub mod model;
pub mod scheduler;
pub mod sliding;
pub mod slot;
pub mod snapshot;
pub mod sort;
pub mod visual;

#[cfg(test)]
pub mod harness;

pub use cell::{CellState, StyleKind, StyleMap, ViewCell};
pub use error::{GridError, ListenerError, Result};
pub use events::{EventCollector, FnListener, GridEvent, GridListener};
pub use feed::{FeedInfo, ItemUpdate, SubscriptionMode};
pub use grid::{PositionEngine, StaticGrid};
pub use model::{ModelTable, PendingOp, Reentry, RowModel, RowPolicy};
pub use scheduler::{TaskScheduler, TimerQueue, VisualTask};
pub use slot::{fields, CellDescriptor, ElementId, Field, FieldLevel, Fields, Key, KeyMode, SlotId, SlotLayout};
pub use snapshot::{GridSnapshot, RowSnapshot};
pub use sort::{SortConfig, SortDirection, SortValue};
pub use visual::{Timings, VisualUpdate};
