//! Physical view cells.
//!
//! A [`ViewCell`] is the engine's stand-in for one element of the view: it
//! holds what is currently shown (content, class, inline styles) plus the
//! pending state of an in-flight visual update (next value, hot and cold
//! style sets, phase counters).
//!
//! Cells without a backing element are placeholders. They are synthesized
//! when a row moves to a slot that has no bound element, so its state is
//! kept around until the row comes back into view.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::slot::{CellDescriptor, ElementId, FieldLevel};

/// Inline style name -> value.
pub type StyleMap = BTreeMap<String, String>;

/// Style name that carries the element class instead of an inline style.
pub const CLASS: &str = "CLASS";
/// Background colour style, animated by faders.
pub const BACKGROUND: &str = "backgroundColor";
/// Text colour style, animated by faders.
pub const COLOR: &str = "color";

/// Which of the two pending style sets to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleKind {
    Hot,
    Cold,
}

/// Visible state of a cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellState {
    pub content: String,
    pub class: String,
    pub styles: StyleMap,
}

#[derive(Debug, Clone)]
pub struct ViewCell {
    element: Option<ElementId>,
    replica: Option<String>,
    level: FieldLevel,
    attached: bool,
    initial: CellState,
    state: CellState,
    next_value: Option<String>,
    hot: Option<StyleMap>,
    cold: Option<StyleMap>,
    /// Bumped by every visual update; timed commits carry the value they saw.
    update_phase: u64,
    /// Bumped by every new fader on this cell.
    fade_phase: u64,
}

impl ViewCell {
    pub fn bound(desc: &CellDescriptor) -> Self {
        Self {
            element: Some(desc.element),
            replica: desc.replica.clone(),
            level: desc.level,
            attached: true,
            initial: CellState::default(),
            state: CellState::default(),
            next_value: None,
            hot: None,
            cold: None,
            update_phase: 0,
            fade_phase: 0,
        }
    }

    /// Detached copy of `other`, used when a row has no element to land on.
    pub fn placeholder_of(other: &ViewCell) -> Self {
        let mut cell = Self {
            element: None,
            replica: other.replica.clone(),
            level: other.level,
            attached: false,
            initial: CellState::default(),
            state: CellState::default(),
            next_value: None,
            hot: None,
            cold: None,
            update_phase: 0,
            fade_phase: 0,
        };
        cell.scroll_here(other);
        cell
    }

    pub fn element(&self) -> Option<ElementId> {
        self.element
    }

    pub fn replica(&self) -> Option<&str> {
        self.replica.as_deref()
    }

    pub fn level(&self) -> FieldLevel {
        self.level
    }

    pub fn is_placeholder(&self) -> bool {
        self.element.is_none()
    }

    /// Whether the backing element is still part of the view.
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub(crate) fn detach(&mut self) {
        self.attached = false;
    }

    pub fn state(&self) -> &CellState {
        &self.state
    }

    pub fn content(&self) -> &str {
        &self.state.content
    }

    pub fn class(&self) -> &str {
        &self.state.class
    }

    pub fn style(&self, name: &str) -> Option<&str> {
        self.state.styles.get(name).map(String::as_str)
    }

    pub(crate) fn set_style(&mut self, name: &str, value: String) {
        self.state.styles.insert(name.to_string(), value);
    }

    /// Take over everything `other` shows and everything it has pending.
    pub fn scroll_here(&mut self, other: &ViewCell) {
        self.state = other.state.clone();
        self.next_value = other.next_value.clone();
        self.hot = other.hot.clone();
        self.cold = other.cold.clone();
        self.update_phase = other.update_phase;
        self.fade_phase = other.fade_phase;
    }

    /// Back to the state the cell had when it was bound.
    pub fn clean(&mut self) {
        self.state = self.initial.clone();
        self.next_value = None;
        self.hot = None;
        self.cold = None;
    }

    pub fn next_value(&self) -> Option<&str> {
        self.next_value.as_deref()
    }

    /// Stage the value to show at the next commit. Null shows as empty.
    pub fn set_next_value(&mut self, value: Option<&str>) {
        self.next_value = Some(value.unwrap_or_default().to_string());
    }

    /// Keep showing the current value at the next commit.
    pub fn discard_next_value(&mut self) {
        self.next_value = None;
    }

    /// Value as the listener should see it: staged if any, else shown.
    pub fn effective_value(&self) -> &str {
        self.next_value.as_deref().unwrap_or(&self.state.content)
    }

    /// Start a new visual update and return its phase.
    pub fn set_updating(&mut self) -> u64 {
        self.update_phase += 1;
        self.update_phase
    }

    pub fn phase(&self) -> u64 {
        self.update_phase
    }

    pub fn fade_phase(&self) -> u64 {
        self.fade_phase
    }

    pub(crate) fn next_fade_phase(&mut self) -> u64 {
        self.fade_phase += 1;
        self.fade_phase
    }

    /// Stage a hot/cold pair for one style. Missing values clear the style.
    pub fn add_style(&mut self, hot: Option<&str>, cold: Option<&str>, name: &str) {
        self.hot
            .get_or_insert_with(StyleMap::new)
            .insert(name.to_string(), hot.unwrap_or_default().to_string());
        self.cold
            .get_or_insert_with(StyleMap::new)
            .insert(name.to_string(), cold.unwrap_or_default().to_string());
    }

    /// Pending hot styles, completed with the row-level ones the cell does
    /// not override.
    pub fn next_hot(&mut self, row: Option<&StyleMap>) -> Option<&StyleMap> {
        if let Some(row) = row {
            merge_missing(&mut self.hot, row);
        }
        self.hot.as_ref()
    }

    pub fn next_cold(&mut self, row: Option<&StyleMap>) -> Option<&StyleMap> {
        if let Some(row) = row {
            merge_missing(&mut self.cold, row);
        }
        self.cold.as_ref()
    }

    /// Show the staged value and hot styles, unless a newer update started.
    pub fn commit_value(&mut self, phase: u64) -> bool {
        if phase != self.update_phase {
            return false;
        }
        if let Some(value) = self.next_value.take() {
            self.state.content = value;
        }
        self.commit_styles(phase, StyleKind::Hot)
    }

    pub fn commit_styles(&mut self, phase: u64, kind: StyleKind) -> bool {
        if phase != self.update_phase {
            return false;
        }
        let staged = match kind {
            StyleKind::Hot => self.hot.take(),
            StyleKind::Cold => self.cold.take(),
        };
        if let Some(styles) = staged {
            self.apply_styles(&styles);
        }
        true
    }

    fn apply_styles(&mut self, styles: &StyleMap) {
        for (name, value) in styles {
            if name == CLASS {
                if self.state.class != *value {
                    self.state.class = value.clone();
                }
            } else if value.is_empty() {
                self.state.styles.remove(name);
            } else {
                self.state.styles.insert(name.clone(), value.clone());
            }
        }
    }
}

fn merge_missing(local: &mut Option<StyleMap>, row: &StyleMap) {
    let local = local.get_or_insert_with(StyleMap::new);
    for (name, value) in row {
        local.entry(name.clone()).or_insert_with(|| value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell() -> ViewCell {
        ViewCell::bound(&CellDescriptor::row(1, 1, "price"))
    }

    #[test]
    fn test_commit_applies_value_and_hot_styles() {
        let mut c = cell();
        c.set_next_value(Some("10"));
        c.add_style(Some("yellow"), Some(""), BACKGROUND);
        let phase = c.set_updating();

        assert_eq!(c.effective_value(), "10");
        assert_eq!(c.content(), "");

        assert!(c.commit_value(phase));
        assert_eq!(c.content(), "10");
        assert_eq!(c.style(BACKGROUND), Some("yellow"));
        assert!(c.next_value().is_none());

        assert!(c.commit_styles(phase, StyleKind::Cold));
        assert_eq!(c.style(BACKGROUND), None, "empty cold value clears the style");
    }

    #[test]
    fn test_stale_phase_is_noop() {
        let mut c = cell();
        c.set_next_value(Some("old"));
        let stale = c.set_updating();
        c.set_next_value(Some("new"));
        let current = c.set_updating();

        assert!(!c.commit_value(stale));
        assert_eq!(c.content(), "");
        assert!(c.commit_value(current));
        assert_eq!(c.content(), "new");
    }

    #[test]
    fn test_null_value_shows_empty() {
        let mut c = cell();
        c.set_next_value(None);
        assert_eq!(c.next_value(), Some(""));
    }

    #[test]
    fn test_row_styles_fill_gaps_only() {
        let mut c = cell();
        c.add_style(Some("red"), None, COLOR);

        let mut row = StyleMap::new();
        row.insert(COLOR.to_string(), "blue".to_string());
        row.insert(CLASS.to_string(), "hot".to_string());

        let hot = c.next_hot(Some(&row)).cloned().unwrap();
        assert_eq!(hot.get(COLOR).map(String::as_str), Some("red"));
        assert_eq!(hot.get(CLASS).map(String::as_str), Some("hot"));
    }

    #[test]
    fn test_class_style_sets_class() {
        let mut c = cell();
        c.add_style(Some("flash"), Some("calm"), CLASS);
        let phase = c.set_updating();
        c.commit_value(phase);
        assert_eq!(c.class(), "flash");
        c.commit_styles(phase, StyleKind::Cold);
        assert_eq!(c.class(), "calm");
        assert!(c.state().styles.is_empty());
    }

    #[test]
    fn test_placeholder_copies_state_and_cleans_to_empty() {
        let mut c = cell();
        c.set_next_value(Some("7"));
        let phase = c.set_updating();
        c.commit_value(phase);

        let mut p = ViewCell::placeholder_of(&c);
        assert!(p.is_placeholder());
        assert!(!p.is_attached());
        assert_eq!(p.content(), "7");
        assert_eq!(p.phase(), phase);

        p.clean();
        assert_eq!(p.content(), "");
    }
}
