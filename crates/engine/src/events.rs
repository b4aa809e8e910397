//! Grid listeners and event recording.
//!
//! Listeners see every row right before it is shown and right before it is
//! wiped. The [`EventCollector`] records those callbacks so tests (and the
//! CLI's verbose mode) can check what happened and in which order.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::ListenerError;
use crate::model::Reentry;
use crate::slot::{Fields, Key, SlotId};
use crate::visual::VisualUpdate;

/// Receives row notifications from a grid.
pub trait GridListener {
    /// A row is about to be shown at `slot`. The listener may override
    /// values and styles through `update` for this pass.
    fn on_visual_update(
        &mut self,
        key: &str,
        slot: &SlotId,
        update: &mut VisualUpdate<'_>,
    ) -> Result<(), ListenerError>;

    /// A row is about to be wiped from `slot`.
    fn on_row_removed(
        &mut self,
        _key: &str,
        _slot: &SlotId,
        _reentry: &mut Reentry,
    ) -> Result<(), ListenerError> {
        Ok(())
    }
}

/// Adapts a closure into a listener that only cares about updates.
pub struct FnListener<F>(pub F);

impl<F> FnListener<F>
where
    F: FnMut(&str, &SlotId, &mut VisualUpdate<'_>) -> Result<(), ListenerError>,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> GridListener for FnListener<F>
where
    F: FnMut(&str, &SlotId, &mut VisualUpdate<'_>) -> Result<(), ListenerError>,
{
    fn on_visual_update(
        &mut self,
        key: &str,
        slot: &SlotId,
        update: &mut VisualUpdate<'_>,
    ) -> Result<(), ListenerError> {
        (self.0)(key, slot, update)
    }
}

/// One recorded callback.
#[derive(Debug, Clone, PartialEq)]
pub enum GridEvent {
    /// A row was handed to listeners with these changed fields.
    Updated { key: Key, slot: SlotId, changed: Fields },
    /// A row was wiped from its slot.
    Removed { key: Key, slot: SlotId },
}

impl GridEvent {
    pub fn key(&self) -> &str {
        match self {
            GridEvent::Updated { key, .. } | GridEvent::Removed { key, .. } => key,
        }
    }

    pub fn slot(&self) -> &SlotId {
        match self {
            GridEvent::Updated { slot, .. } | GridEvent::Removed { slot, .. } => slot,
        }
    }
}

/// Simple event collector for testing.
#[derive(Debug, Default)]
pub struct EventCollector {
    events: Vec<GridEvent>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// A collector that can be registered as a listener while the caller
    /// keeps reading it.
    pub fn shared() -> Rc<RefCell<EventCollector>> {
        Rc::new(RefCell::new(EventCollector::new()))
    }

    pub fn push(&mut self, event: GridEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[GridEvent] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Keys of updated rows, in callback order.
    pub fn updated_keys(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                GridEvent::Updated { key, .. } => Some(key.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Keys of removed rows, in callback order.
    pub fn removed_keys(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                GridEvent::Removed { key, .. } => Some(key.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl GridListener for Rc<RefCell<EventCollector>> {
    fn on_visual_update(
        &mut self,
        key: &str,
        slot: &SlotId,
        update: &mut VisualUpdate<'_>,
    ) -> Result<(), ListenerError> {
        self.borrow_mut().push(GridEvent::Updated {
            key: key.to_string(),
            slot: slot.clone(),
            changed: update.changed_fields().clone(),
        });
        Ok(())
    }

    fn on_row_removed(
        &mut self,
        key: &str,
        slot: &SlotId,
        _reentry: &mut Reentry,
    ) -> Result<(), ListenerError> {
        self.borrow_mut().push(GridEvent::Removed {
            key: key.to_string(),
            slot: slot.clone(),
        });
        Ok(())
    }
}
