//! Positional grid.
//!
//! [`PositionEngine`] decides where each row of a [`StaticGrid`] is shown and
//! runs the visual transition of every update. Row-bound grids keep a
//! key <-> row map and shift whole runs of rows to open or close gaps
//! ("scrolling"); item-bound grids show each item in its own fixed slot.
//!
//! Rows can go past the last bound row. Their cells then live on as
//! placeholders until the row scrolls back into view, except for counter
//! keyed grids where a row falling off the bound rows is evicted.

use std::collections::BTreeSet;

use livegrid_config::GridSettings;
use livegrid_core::BiMap;
use rustc_hash::FxHashMap;

use crate::cell::{StyleKind, StyleMap, BACKGROUND, COLOR};
use crate::cell_matrix::{CellMatrix, CellRow};
use crate::error::{GridError, ListenerError, Result};
use crate::events::GridListener;
use crate::fader::FaderHandler;
use crate::model::{ModelTable, Reentry, RowModel, RowPolicy};
use crate::scheduler::{TaskScheduler, TimerQueue, VisualTask};
use crate::sliding::{refs_for_group, SlotResolver};
use crate::slot::{CellDescriptor, ElementId, Field, FieldLevel, Fields, Key, SlotId, SlotLayout};
use crate::sort::{insertion_slot, quick_sort, SortConfig, SortDirection, SortValue};
use crate::visual::{Timings, VisualPlan, VisualUpdate};

const NOT_BOUND: &str = "no cells bound yet";
const MIXED_SLOTS: &str = "cannot mix row and item slots in the same grid";
const NO_CELLS: &str = "at least one cell must be bound";
const NO_ITEMS: &str = "the item list is only available on item-bound grids";

/// Grid whose cells are bound up front, by row number or by item name.
pub type StaticGrid = RowModel<PositionEngine>;

pub struct PositionEngine {
    id: String,
    layout: Option<SlotLayout>,
    bound: bool,
    cells: CellMatrix,
    key_slots: BiMap<Key, usize>,
    row_count: usize,
    max_row: usize,
    sort: Option<SortConfig>,
    add_on_top: bool,
    settings: GridSettings,
    scheduler: Box<dyn TaskScheduler>,
    fader: FaderHandler,
    listeners: Vec<Box<dyn GridListener>>,
}

impl PositionEngine {
    pub fn new(id: impl Into<String>, settings: GridSettings, scheduler: Box<dyn TaskScheduler>) -> Self {
        Self {
            id: id.into(),
            layout: None,
            bound: false,
            cells: CellMatrix::new(),
            key_slots: BiMap::new(),
            row_count: 0,
            max_row: 0,
            sort: None,
            add_on_top: false,
            fader: FaderHandler::new(settings.fade_interval_ms),
            settings,
            scheduler,
            listeners: Vec::new(),
        }
    }

    pub fn layout(&self) -> SlotLayout {
        self.layout.unwrap_or(SlotLayout::Rows)
    }

    pub fn cells(&self) -> &CellMatrix {
        &self.cells
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn max_row(&self) -> usize {
        self.max_row
    }

    pub fn key_at(&self, row: usize) -> Option<&str> {
        self.key_slots.get_reverse(&row).map(String::as_str)
    }

    pub fn row_of(&self, key: &str) -> Option<usize> {
        self.key_slots.get(&key.to_string()).copied()
    }

    pub fn scheduler(&self) -> &dyn TaskScheduler {
        self.scheduler.as_ref()
    }

    fn check_bound(&self) -> Result<()> {
        if self.bound {
            Ok(())
        } else {
            Err(GridError::illegal(NOT_BOUND))
        }
    }

    // -------------------------------------------------------------------------
    // Slot assignment
    // -------------------------------------------------------------------------

    /// Sorted position of a row among the other rows.
    fn sorted_position(&self, table: &ModelTable, sort: &SortConfig, own: Option<usize>, value: &SortValue) -> usize {
        let others = self.row_count - usize::from(own.is_some());
        insertion_slot(sort, value, others, |i| {
            let slot = match own {
                Some(own) if i + 1 >= own => i + 2,
                _ => i + 1,
            };
            let key = self.key_slots.get_reverse(&slot);
            sort.value_of(key.and_then(|k| table.value(k, &sort.field)))
        })
    }

    /// Drop the timed work still queued for a row that is going away, so a
    /// later row with the same key never picks it up.
    fn forget_row(&mut self, key: &str) {
        let faders = self.fader.forget_key(key);
        let dropped = self.scheduler.cancel(&mut |task| match task {
            VisualTask::LaunchFader { fader } => faders.contains(fader),
            other => other.key() == Some(key),
        });
        if dropped > 0 || !faders.is_empty() {
            log::debug!(
                target: "livegrid::grid",
                "{}: dropped {} tasks and {} fades of row {}",
                self.id,
                dropped,
                faders.len(),
                key
            );
        }
    }

    /// Drop a row that fell off the grid. Returns the row it occupied.
    fn scroll_out(&mut self, table: &mut ModelTable, key: &str) -> Option<usize> {
        let pos = self.key_slots.remove(&key.to_string())?;
        self.row_count = self.row_count.saturating_sub(1);
        self.forget_row(key);
        table.evict(key);
        log::debug!(target: "livegrid::grid", "{}: row {} scrolled out from row {}", self.id, key, pos);
        Some(pos)
    }

    /// Move `key` to row `end`, shifting the rows in between by one.
    ///
    /// An existing row moves from its current row; a new row comes in
    /// from the bottom (sorted or add-on-top grids) or the top (counter
    /// grids appending at the bottom). Rows pushed past the first row, or
    /// past the last bound row of a counter grid, are evicted.
    fn make_room(&mut self, table: &mut ModelTable, end: usize, key: &str) {
        let orig = self.row_of(key);
        if orig == Some(end) {
            return;
        }
        let held: Option<CellRow> = orig.map(|o| self.cells.copy_row(&SlotId::Row(o)));

        // (from, to) pairs, in the order they have to be applied.
        let moves: Vec<(usize, usize)> = match orig {
            Some(o) if o > end => (end..o).rev().map(|f| (f, f + 1)).collect(),
            Some(o) => (o + 1..=end).map(|f| (f, f - 1)).collect(),
            None if self.sort.is_some() || self.add_on_top => {
                (end..=self.row_count).rev().map(|f| (f, f + 1)).collect()
            }
            None => (1..=end).map(|f| (f, f - 1)).collect(),
        };

        let counter = table.is_counter();
        for (from, to) in moves {
            let from_key = self.key_slots.get_reverse(&from).cloned();
            if to == 0 || (counter && to > self.max_row) {
                if let Some(k) = from_key {
                    self.scroll_out(table, &k);
                }
                continue;
            }
            self.cells.scroll_row(&SlotId::Row(from), &SlotId::Row(to));
            if let Some(k) = from_key {
                self.key_slots.insert(k, to);
            }
        }

        match held {
            Some(row) => {
                self.cells.paste_row(&row, &SlotId::Row(end));
                self.key_slots.insert(key.to_string(), end);
            }
            None => self.cells.clean_row(&SlotId::Row(end)),
        }
    }

    /// Whole-table re-sort. Only rows whose position changes are touched.
    fn sort_table(&mut self, table: &ModelTable) {
        let Some(sort) = self.sort.clone() else {
            return;
        };
        if self.layout() == SlotLayout::Items {
            return;
        }

        let mut order: Vec<(Key, SortValue)> = (1..=self.row_count)
            .filter_map(|slot| self.key_slots.get_reverse(&slot))
            .map(|k| (k.clone(), sort.value_of(table.value(k, &sort.field))))
            .collect();
        quick_sort(&mut order, &|a: &(Key, SortValue), b: &(Key, SortValue)| sort.is_before(&a.1, &b.1));

        let mut stash: FxHashMap<Key, CellRow> = FxHashMap::default();
        let mut placed = BiMap::new();
        let mut moved = 0;
        for (i, (key, _)) in order.iter().enumerate() {
            let slot = i + 1;
            placed.insert(key.clone(), slot);
            let here = self.key_slots.get_reverse(&slot).cloned();
            if here.as_deref() == Some(key.as_str()) {
                continue;
            }
            if let Some(here) = here {
                stash.insert(here, self.cells.copy_row(&SlotId::Row(slot)));
            }
            match stash.get(key) {
                Some(row) => self.cells.paste_row(row, &SlotId::Row(slot)),
                None => {
                    if let Some(&from) = self.key_slots.get(key) {
                        self.cells.scroll_row(&SlotId::Row(from), &SlotId::Row(slot));
                    }
                }
            }
            moved += 1;
        }
        self.key_slots = placed;
        log::debug!(target: "livegrid::grid", "{}: re-sorted on {}, {} rows moved", self.id, sort.field, moved);
    }

    // -------------------------------------------------------------------------
    // Visual execution
    // -------------------------------------------------------------------------

    fn stage_values(&mut self, slot: &SlotId, fields: &Fields) {
        for (field, value) in fields {
            if let Some(group) = self.cells.group_mut(slot, field) {
                for cell in group.iter_mut() {
                    cell.set_next_value(value.as_deref());
                }
            }
        }
    }

    fn timings(&self) -> Timings {
        Timings {
            cold_to_hot: self.settings.cold_to_hot_time_ms,
            hot: self.settings.hot_time_ms,
            hot_to_cold: self.settings.hot_to_cold_time_ms,
        }
    }

    /// Schedule the cold -> hot -> cold transition of every staged cell of
    /// the row. Zero-length steps run once the whole row is scheduled.
    fn show(&mut self, key: &str, slot: &SlotId, plan: VisualPlan) {
        let Timings {
            cold_to_hot,
            hot,
            hot_to_cold,
        } = plan.timings;
        let cold_fade_at = cold_to_hot + hot;
        let cold_at = cold_fade_at + hot_to_cold;
        let interval = self.fader.interval();

        let mut now: Vec<VisualTask> = Vec::new();
        let Some(row) = self.cells.row_mut(slot) else {
            return;
        };
        let fader = &mut self.fader;
        let scheduler: &mut dyn TaskScheduler = &mut *self.scheduler;

        for (field, group) in row.iter_mut() {
            for (cell_ref, cell) in refs_for_group(key, field, group) {
                if cell.next_value().is_none() {
                    continue;
                }
                let phase = cell.set_updating();
                let cold_styles = cell.next_cold(plan.cold_row.as_ref()).cloned();
                let hot_styles = cell.next_hot(plan.hot_row.as_ref()).cloned();
                let commit_value = VisualTask::CommitValue {
                    cell: cell_ref.clone(),
                    phase,
                };
                let commit_cold = VisualTask::CommitStyle {
                    cell: cell_ref.clone(),
                    phase,
                    kind: StyleKind::Cold,
                };

                let Some(hot_styles) = hot_styles else {
                    later(scheduler, &mut now, cold_to_hot, commit_value);
                    if let Some(cold_styles) = cold_styles {
                        if hot_to_cold > 0 {
                            let id = fader.prepare(
                                cell_ref,
                                cell,
                                true,
                                style(&cold_styles, BACKGROUND),
                                style(&cold_styles, COLOR),
                                hot_to_cold,
                                Some(commit_cold),
                            );
                            scheduler.schedule_after(cold_fade_at, VisualTask::LaunchFader { fader: id });
                        } else {
                            later(scheduler, &mut now, cold_at, commit_cold);
                        }
                    }
                    continue;
                };

                let cold_styles = cold_styles.unwrap_or_default();
                let back_hot = style(&hot_styles, BACKGROUND).filter(|v| !v.is_empty());
                let fore_hot = style(&hot_styles, COLOR).filter(|v| !v.is_empty());
                let back_cold = back_hot.and(style(&cold_styles, BACKGROUND));
                let fore_cold = fore_hot.and(style(&cold_styles, COLOR));

                let mut faded_in = false;
                let mut faded_out = false;
                if back_hot.is_some() || fore_hot.is_some() {
                    if cold_to_hot > 0 {
                        let id = fader.prepare(
                            cell_ref.clone(),
                            cell,
                            false,
                            back_hot,
                            fore_hot,
                            cold_to_hot,
                            Some(commit_value.clone()),
                        );
                        let launch = fader.launch_on(id, cell);
                        now.extend(launch.run_now);
                        if launch.start_ticking {
                            scheduler.schedule_after(interval, VisualTask::FadeTick);
                        }
                        faded_in = true;
                    } else {
                        fader.stop(&cell_ref);
                    }
                    if hot_to_cold > 0 {
                        let id = fader.prepare(
                            cell_ref.clone(),
                            cell,
                            true,
                            back_cold,
                            fore_cold,
                            hot_to_cold,
                            Some(commit_cold.clone()),
                        );
                        scheduler.schedule_after(cold_fade_at, VisualTask::LaunchFader { fader: id });
                        faded_out = true;
                    }
                }
                if !faded_in {
                    later(scheduler, &mut now, cold_to_hot, commit_value);
                }
                if !faded_out {
                    later(scheduler, &mut now, cold_at, commit_cold);
                }
            }
        }

        for task in now {
            self.run_task(task);
        }
    }

    fn run_task(&mut self, task: VisualTask) {
        let slots = SlotResolver::new(self.layout(), &self.key_slots);
        match task {
            VisualTask::CommitValue { cell, phase } => {
                if let Some(target) = cell.resolve(&slots, &mut self.cells) {
                    target.commit_value(phase);
                }
            }
            VisualTask::CommitStyle { cell, phase, kind } => {
                if let Some(target) = cell.resolve(&slots, &mut self.cells) {
                    target.commit_styles(phase, kind);
                }
            }
            VisualTask::LaunchFader { fader } => {
                let launch = self.fader.launch(fader, &slots, &self.cells);
                if launch.start_ticking {
                    self.scheduler
                        .schedule_after(self.fader.interval(), VisualTask::FadeTick);
                }
                if let Some(task) = launch.run_now {
                    self.run_task(task);
                }
            }
            VisualTask::FadeTick => {
                let (ends, more) = self.fader.tick(&slots, &mut self.cells);
                if more {
                    self.scheduler
                        .schedule_after(self.fader.interval(), VisualTask::FadeTick);
                }
                for task in ends {
                    self.run_task(task);
                }
            }
        }
    }

    fn advance(&mut self, ms: u64) -> usize {
        let deadline = self.scheduler.now() + ms;
        let mut ran = 0;
        while let Some(task) = self.scheduler.take_due(deadline) {
            self.run_task(task);
            ran += 1;
        }
        self.scheduler.set_now(deadline);
        ran
    }

    fn flush(&mut self) -> usize {
        let mut ran = 0;
        while let Some(task) = self.scheduler.take_due(u64::MAX) {
            self.run_task(task);
            ran += 1;
        }
        ran
    }
}

fn style<'s>(styles: &'s StyleMap, name: &str) -> Option<&'s str> {
    styles.get(name).map(String::as_str)
}

/// Run `task` after `delay`, or together with the other immediate tasks of
/// the pass when there is no delay.
fn later(scheduler: &mut dyn TaskScheduler, now: &mut Vec<VisualTask>, delay: u64, task: VisualTask) {
    if delay == 0 {
        now.push(task);
    } else {
        scheduler.schedule_after(delay, task);
    }
}

fn note_failure(id: &str, key: &str, first: &mut Option<ListenerError>, err: ListenerError) {
    if first.is_none() {
        *first = Some(err);
    } else {
        log::warn!(target: "livegrid::grid", "{}: listener failed on row {}: {}", id, key, err);
    }
}

impl RowPolicy for PositionEngine {
    fn is_bound(&self) -> bool {
        self.bound
    }

    fn place(&mut self, table: &mut ModelTable, key: &str, fields: &Fields, is_new: bool) -> SlotId {
        if self.layout() == SlotLayout::Items {
            if is_new {
                self.row_count += 1;
            }
            return SlotId::Item(key.to_string());
        }

        let mut is_new = is_new;
        let counter = table.is_counter();
        let current = self.row_of(key);
        let view: &ModelTable = table;

        let sorted = self.sort.as_ref().and_then(|sort| {
            let incoming = fields.get(&sort.field).map(|v| sort.value_of(v.as_deref()));
            let value = match (is_new, incoming) {
                (true, incoming) => incoming.unwrap_or(SortValue::Null),
                (false, Some(incoming)) => {
                    let old = sort.value_of(view.value(key, &sort.field));
                    if old == incoming {
                        return None;
                    }
                    incoming
                }
                (false, None) => return None,
            };
            Some(self.sorted_position(view, sort, current, &value))
        });

        let mut target = match (sorted, current) {
            (Some(target), _) => target,
            (None, Some(current)) if !is_new => current,
            _ if self.add_on_top => 1,
            _ if counter && self.row_count >= self.max_row => self.row_count,
            _ => self.row_count + 1,
        };

        if counter && is_new && self.sort.is_some() && self.row_count >= self.max_row {
            if let Some(oldest) = table.oldest().cloned() {
                if let Some(free) = self.scroll_out(table, &oldest) {
                    if free < target {
                        target -= 1;
                    }
                    self.key_slots.insert(key.to_string(), free);
                    self.row_count += 1;
                    is_new = false;
                }
            }
        }

        let occupied = self
            .key_slots
            .get_reverse(&target)
            .is_some_and(|k| k != key);
        if occupied {
            self.make_room(table, target, key);
        }
        self.key_slots.insert(key.to_string(), target);
        if is_new {
            self.row_count += 1;
        }

        let slot = SlotId::Row(target);
        if !counter && target > self.max_row && !self.cells.contains_slot(&slot) {
            // Out of view: give the row placeholder cells shaped like the row above.
            self.cells.scroll_row(&SlotId::Row(target - 1), &slot);
            self.cells.clean_row(&slot);
        }
        slot
    }

    fn dispatch(
        &mut self,
        _table: &ModelTable,
        key: &str,
        slot: &SlotId,
        fields: &mut Fields,
        reentry: &mut Reentry,
    ) -> std::result::Result<(), ListenerError> {
        self.stage_values(slot, fields);

        let mut first = None;
        let timings = self.timings();
        let plan = {
            let mut update = VisualUpdate::new(key, slot, &mut self.cells, &*fields, reentry, timings);
            for listener in self.listeners.iter_mut() {
                if let Err(err) = listener.on_visual_update(key, slot, &mut update) {
                    note_failure(&self.id, key, &mut first, err);
                }
            }
            update.finish()
        };

        for extra in reentry.take_updates_for(key) {
            log::debug!(target: "livegrid::grid", "{}: merging re-entrant update into row {}", self.id, key);
            self.stage_values(slot, &extra);
            fields.extend(extra);
        }

        self.show(key, slot, plan);
        first.map_or(Ok(()), Err)
    }

    fn vacate(&mut self, table: &mut ModelTable, key: &str, reentry: &mut Reentry) -> std::result::Result<(), ListenerError> {
        let slot = match self.layout() {
            SlotLayout::Items => SlotId::Item(key.to_string()),
            SlotLayout::Rows => match self.row_of(key) {
                Some(row) => SlotId::Row(row),
                None => {
                    log::error!(target: "livegrid::grid", "{}: row {} has no position", self.id, key);
                    return Ok(());
                }
            },
        };

        let mut first = None;
        for listener in self.listeners.iter_mut() {
            if let Err(err) = listener.on_row_removed(key, &slot, reentry) {
                note_failure(&self.id, key, &mut first, err);
            }
        }

        self.forget_row(key);
        match slot {
            SlotId::Row(row) => {
                if row != self.row_count {
                    self.make_room(table, self.row_count, key);
                }
                let row = self.row_of(key).unwrap_or(row);
                if row != self.row_count {
                    log::error!(
                        target: "livegrid::grid",
                        "{}: row {} to wipe is at {} instead of the last row {}",
                        self.id,
                        key,
                        row,
                        self.row_count
                    );
                }
                self.cells.clean_row(&SlotId::Row(row));
                self.key_slots.remove(&key.to_string());
            }
            item => self.cells.clean_row(&item),
        }
        self.row_count = self.row_count.saturating_sub(1);

        first.map_or(Ok(()), Err)
    }
}

// =============================================================================
// Grid surface
// =============================================================================

impl RowModel<PositionEngine> {
    /// New grid with settings loaded from the user's settings file.
    pub fn new(id: impl Into<String>) -> Self {
        Self::with_settings(id, GridSettings::load())
    }

    pub fn with_settings(id: impl Into<String>, settings: GridSettings) -> Self {
        Self::with_scheduler(id, settings, Box::new(TimerQueue::new()))
    }

    pub fn with_scheduler(id: impl Into<String>, settings: GridSettings, scheduler: Box<dyn TaskScheduler>) -> Self {
        let id = id.into();
        let (first, last) = (settings.clean_on_first_subscribe, settings.clean_on_last_unsubscribe);
        let fifo_max_holes = settings.fifo_max_holes;
        let engine = PositionEngine::new(id.clone(), settings, scheduler);
        let mut grid = RowModel::with_policy(id, engine, fifo_max_holes);
        grid.set_auto_clean(first, last);
        grid
    }

    pub fn settings(&self) -> &GridSettings {
        &self.policy.settings
    }

    pub fn add_listener(&mut self, listener: impl GridListener + 'static) {
        self.policy.listeners.push(Box::new(listener));
    }

    /// Bind view cells.
    ///
    /// Cells whose element left the view are purged first, together with
    /// every placeholder. Already bound elements are skipped. Returns the
    /// number of newly bound cells.
    pub fn bind_cells<I>(&mut self, descriptors: I) -> Result<usize>
    where
        I: IntoIterator<Item = CellDescriptor>,
    {
        let engine = &mut self.policy;
        let purged = engine.cells.collect_garbage();

        let mut added = 0;
        for desc in descriptors {
            let layout = match desc.slot {
                SlotId::Row(0) => return Err(GridError::invalid("row numbers start at 1")),
                SlotId::Row(_) => SlotLayout::Rows,
                SlotId::Item(_) => SlotLayout::Items,
            };
            match engine.layout {
                Some(current) if current != layout => return Err(GridError::illegal(MIXED_SLOTS)),
                _ => engine.layout = Some(layout),
            }
            if engine.cells.add_cell(&desc) {
                added += 1;
            }
        }

        if engine.cells.is_empty() {
            return Err(GridError::illegal(NO_CELLS));
        }
        engine.max_row = engine
            .cells
            .iter()
            .filter(|(_, _, cell)| !cell.is_placeholder())
            .filter_map(|(slot, _, _)| slot.row_number())
            .max()
            .unwrap_or(0);
        engine.bound = true;

        log::debug!(
            target: "livegrid::grid",
            "{}: bound {} cells ({} purged), last row {}",
            engine.id,
            added,
            purged,
            engine.max_row
        );
        Ok(added)
    }

    /// The element left the view; its cell goes away at the next bind.
    pub fn detach_element(&mut self, element: ElementId) -> bool {
        self.policy.cells.detach(element)
    }

    /// Fields shown by first-level cells.
    pub fn field_list(&self) -> Result<Vec<Field>> {
        self.fields_at(FieldLevel::First)
    }

    /// Fields shown by second-level cells.
    pub fn second_level_field_list(&self) -> Result<Vec<Field>> {
        self.fields_at(FieldLevel::Second)
    }

    /// Items shown by an item-bound grid.
    pub fn item_list(&self) -> Result<Vec<String>> {
        self.policy.check_bound()?;
        if self.policy.layout() != SlotLayout::Items {
            return Err(GridError::illegal(NO_ITEMS));
        }
        let items: BTreeSet<&String> = self
            .policy
            .cells
            .slots()
            .filter_map(|slot| match slot {
                SlotId::Item(name) => Some(name),
                SlotId::Row(_) => None,
            })
            .collect();
        Ok(items.into_iter().cloned().collect())
    }

    fn fields_at(&self, level: FieldLevel) -> Result<Vec<Field>> {
        self.policy.check_bound()?;
        let fields: BTreeSet<&Field> = self
            .policy
            .cells
            .iter()
            .filter(|(_, _, cell)| !cell.is_placeholder() && cell.level() == level)
            .map(|(_, field, _)| field)
            .collect();
        Ok(fields.into_iter().cloned().collect())
    }

    /// Sort rows on `field`; `None` or an empty name stops sorting (rows
    /// stay where they are).
    pub fn set_sort(&mut self, field: Option<&str>, descending: bool, numeric: bool, comma_decimal: bool) {
        let sort = field.filter(|f| !f.is_empty()).map(|f| SortConfig {
            field: f.to_string(),
            direction: if descending {
                SortDirection::Descending
            } else {
                SortDirection::Ascending
            },
            numeric,
            comma_decimal,
        });
        self.set_sort_config(sort);
    }

    pub fn set_sort_config(&mut self, sort: Option<SortConfig>) {
        match &sort {
            Some(s) => log::info!(target: "livegrid::grid", "{}: sorting on {} ({:?})", self.id(), s.field, s.direction),
            None => log::info!(target: "livegrid::grid", "{}: sorting disabled", self.id()),
        }
        self.policy.sort = sort;
        self.policy.sort_table(&self.table);
    }

    pub fn sort(&self) -> Option<&SortConfig> {
        self.policy.sort.as_ref()
    }

    /// New rows go on top instead of at the bottom. Ignored while sorting.
    pub fn set_add_on_top(&mut self, on_top: bool) {
        if self.policy.sort.is_some() {
            log::warn!(
                target: "livegrid::grid",
                "{}: add-on-top has no effect while the grid is sorted",
                self.id()
            );
        }
        self.policy.add_on_top = on_top;
    }

    pub fn is_add_on_top(&self) -> bool {
        self.policy.add_on_top
    }

    /// Rows currently placed.
    pub fn row_count(&self) -> usize {
        self.policy.row_count
    }

    /// Last bound row.
    pub fn max_row(&self) -> usize {
        self.policy.max_row
    }

    pub fn slot_of(&self, key: &str) -> Option<SlotId> {
        if !self.contains(key) {
            return None;
        }
        SlotResolver::new(self.policy.layout(), &self.policy.key_slots).slot_of(key)
    }

    pub fn key_at(&self, row: usize) -> Option<&str> {
        self.policy.key_at(row)
    }

    /// Keys in row order.
    pub fn keys_in_order(&self) -> Vec<&str> {
        (1..=self.policy.row_count)
            .filter_map(|row| self.policy.key_at(row))
            .collect()
    }

    pub fn cells(&self) -> &CellMatrix {
        &self.policy.cells
    }

    /// What the first cell of (slot, field) shows.
    pub fn shown(&self, slot: &SlotId, field: &str) -> Option<&str> {
        self.policy
            .cells
            .group(slot, field)?
            .first()
            .map(|cell| cell.content())
    }

    /// Run every timed task due within the next `ms` milliseconds.
    pub fn advance(&mut self, ms: u64) -> usize {
        self.policy.advance(ms)
    }

    /// Run every timed task, however far ahead.
    pub fn flush(&mut self) -> usize {
        self.policy.flush()
    }

    pub fn pending_tasks(&self) -> usize {
        self.policy.scheduler.pending()
    }

    pub fn now(&self) -> u64 {
        self.policy.scheduler.now()
    }
}
