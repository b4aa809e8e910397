//! Keyed row model.
//!
//! [`RowModel`] owns the key -> fields table and serializes every change to
//! it. Where a row lands in the view is decided by the [`RowPolicy`] the
//! model is built with.
//!
//! One row is applied at a time. Listeners invoked while a row is being
//! applied can issue further updates and removals through [`Reentry`];
//! those are not run on the spot. Updates for the row being applied may be
//! merged into it by the policy, everything else is queued and drained in
//! issue order once the current row is done.

use std::collections::VecDeque;

use livegrid_core::{BiMatrix, MatrixRow, SparseMatrix};

use crate::error::{GridError, ListenerError, Result};
use crate::feed::FeedState;
use crate::fifo::FifoLedger;
use crate::slot::{Field, Fields, Key, KeyMode, SlotId};

// =============================================================================
// Re-entrant operations
// =============================================================================

/// A row operation issued while another one was in flight.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingOp {
    Update { key: Key, fields: Fields },
    Remove { key: Key },
}

impl PendingOp {
    pub fn key(&self) -> &str {
        match self {
            PendingOp::Update { key, .. } | PendingOp::Remove { key } => key,
        }
    }
}

/// Operations recorded by listeners during one row pass.
#[derive(Debug, Default)]
pub struct Reentry {
    ops: Vec<PendingOp>,
}

impl Reentry {
    pub fn update_row(&mut self, key: impl Into<Key>, fields: Fields) {
        self.ops.push(PendingOp::Update {
            key: key.into(),
            fields,
        });
    }

    pub fn remove_row(&mut self, key: impl Into<Key>) {
        self.ops.push(PendingOp::Remove { key: key.into() });
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[PendingOp] {
        &self.ops
    }

    /// Pull out the updates for `key` issued before any removal of `key`,
    /// in issue order. They can be folded into the pass for `key` without
    /// reordering anything.
    pub(crate) fn take_updates_for(&mut self, key: &str) -> Vec<Fields> {
        let cutoff = self
            .ops
            .iter()
            .position(|op| matches!(op, PendingOp::Remove { key: k } if k == key))
            .unwrap_or(self.ops.len());

        let mut merged = Vec::new();
        let mut kept = Vec::with_capacity(self.ops.len());
        for (i, op) in self.ops.drain(..).enumerate() {
            match op {
                PendingOp::Update { key: k, fields } if i < cutoff && k == key => merged.push(fields),
                other => kept.push(other),
            }
        }
        self.ops = kept;
        merged
    }

    pub(crate) fn into_ops(self) -> Vec<PendingOp> {
        self.ops
    }
}

// =============================================================================
// Model table
// =============================================================================

/// Row values plus the bookkeeping that has to change together with them.
#[derive(Debug)]
pub struct ModelTable {
    values: SparseMatrix<Key, Field, Option<String>>,
    fifo: FifoLedger,
    key_mode: Option<KeyMode>,
    /// item -> keys it produced; a key belongs to the first item that
    /// produced it.
    item_keys: BiMatrix<String, Key, ()>,
}

impl ModelTable {
    pub fn new(fifo_max_holes: usize) -> Self {
        Self {
            values: SparseMatrix::new(),
            fifo: FifoLedger::new(fifo_max_holes),
            key_mode: None,
            item_keys: BiMatrix::new(),
        }
    }

    pub fn key_mode(&self) -> Option<KeyMode> {
        self.key_mode
    }

    pub(crate) fn set_key_mode(&mut self, mode: Option<KeyMode>) {
        self.key_mode = mode;
    }

    /// Counter-keyed rows are evicted oldest first.
    pub fn is_counter(&self) -> bool {
        self.key_mode == Some(KeyMode::CounterIsKey)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_row(&key.to_string())
    }

    pub fn len(&self) -> usize {
        self.values.row_count()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.values.row_keys()
    }

    pub fn row(&self, key: &str) -> Option<&MatrixRow<Field, Option<String>>> {
        self.values.row(&key.to_string())
    }

    /// Current value of a field; `None` for absent rows, fields and nulls.
    pub fn value(&self, key: &str, field: &str) -> Option<&str> {
        self.row(key)?.get(field)?.as_deref()
    }

    pub fn oldest(&self) -> Option<&Key> {
        self.fifo.oldest()
    }

    pub fn fifo(&self) -> &FifoLedger {
        &self.fifo
    }

    /// Shallow-merge `fields` into the row, creating it if needed. Returns
    /// whether the row is new.
    pub(crate) fn merge(&mut self, key: &str, fields: &Fields) -> bool {
        let key = key.to_string();
        let row = self.values.row_mut(&key);
        match row {
            Some(row) => {
                row.extend(fields.iter().map(|(f, v)| (f.clone(), v.clone())));
                false
            }
            None => {
                if self.is_counter() {
                    self.fifo.push(key.clone());
                }
                self.values.insert_row(key, fields.clone());
                true
            }
        }
    }

    /// Drop a row and everything that refers to it.
    pub(crate) fn evict(&mut self, key: &str) -> bool {
        let key = key.to_string();
        let existed = self.values.remove_row(&key).is_some();
        self.item_keys.remove_reverse(&key);
        self.fifo.remove(&key);
        existed
    }

    /// Record that `item` produced `key`. Ignored if another item got there first.
    pub(crate) fn claim(&mut self, item: &str, key: &str) -> bool {
        self.item_keys.insert(item.to_string(), key.to_string(), ())
    }

    /// Forget every key `item` produced and return them.
    pub(crate) fn release_item(&mut self, item: &str) -> Vec<Key> {
        self.item_keys
            .remove_row(&item.to_string())
            .map(|row| row.into_keys().collect())
            .unwrap_or_default()
    }

    /// Keys produced by `item`.
    pub fn keys_of_item(&self, item: &str) -> Vec<Key> {
        self.item_keys
            .row(&item.to_string())
            .map(|row| row.keys().cloned().collect())
            .unwrap_or_default()
    }
}

// =============================================================================
// Position policy
// =============================================================================

/// Where rows go and how they are shown.
pub trait RowPolicy {
    /// Whether cells have been bound; no row can be applied before.
    fn is_bound(&self) -> bool;

    /// Resolve the slot of `key` before its values are merged. May evict
    /// other rows from `table` to make space.
    fn place(&mut self, table: &mut ModelTable, key: &str, fields: &Fields, is_new: bool) -> SlotId;

    /// Show the row to listeners and stage its visual update. Updates for
    /// `key` that the listeners issue may be folded into `fields`; all
    /// other operations are left in `reentry`.
    fn dispatch(
        &mut self,
        table: &ModelTable,
        key: &str,
        slot: &SlotId,
        fields: &mut Fields,
        reentry: &mut Reentry,
    ) -> std::result::Result<(), ListenerError>;

    /// Wipe the slot of a row that is about to leave the table.
    fn vacate(&mut self, table: &mut ModelTable, key: &str, reentry: &mut Reentry) -> std::result::Result<(), ListenerError>;
}

/// First listener failure of an outer call; later ones are only logged.
#[derive(Default)]
struct Failures {
    first: Option<ListenerError>,
}

impl Failures {
    fn record(&mut self, id: &str, key: &str, err: ListenerError) {
        if self.first.is_none() {
            self.first = Some(err);
        } else {
            log::warn!(target: "livegrid::model", "{}: listener failed on row {}: {}", id, key, err);
        }
    }

    fn into_result(self) -> Result<()> {
        match self.first {
            Some(err) => Err(GridError::Listener(err)),
            None => Ok(()),
        }
    }
}

// =============================================================================
// Row model
// =============================================================================

pub struct RowModel<P> {
    id: String,
    pub(crate) table: ModelTable,
    pub(crate) policy: P,
    pub(crate) feed: FeedState,
    updating: Option<Key>,
    pending: VecDeque<PendingOp>,
}

impl<P: RowPolicy> RowModel<P> {
    pub fn with_policy(id: impl Into<String>, policy: P, fifo_max_holes: usize) -> Self {
        Self {
            id: id.into(),
            table: ModelTable::new(fifo_max_holes),
            policy,
            feed: FeedState::default(),
            updating: None,
            pending: VecDeque::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn table(&self) -> &ModelTable {
        &self.table
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn policy_mut(&mut self) -> &mut P {
        &mut self.policy
    }

    /// Key of the row being applied right now, if any.
    pub fn updating(&self) -> Option<&str> {
        self.updating.as_deref()
    }

    /// Current value of a field.
    pub fn read(&self, key: &str, field: &str) -> Option<&str> {
        self.table.value(key, field)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.table.contains(key)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Insert or update a row. A listener failure is reported after every
    /// queued operation has run.
    pub fn apply_update(&mut self, key: impl Into<Key>, fields: Fields) -> Result<()> {
        self.check_bound()?;
        let mut failures = Failures::default();
        self.run_update(key.into(), fields, &mut failures);
        self.drain(&mut failures);
        failures.into_result()
    }

    /// Remove a row. Removing an absent row is logged and ignored.
    pub fn apply_removal(&mut self, key: &str) -> Result<()> {
        self.check_bound()?;
        let mut failures = Failures::default();
        self.run_removal(key.to_string(), &mut failures);
        self.drain(&mut failures);
        failures.into_result()
    }

    /// Remove every row.
    pub fn clear(&mut self) -> Result<()> {
        let keys: Vec<Key> = self.table.keys().cloned().collect();
        if keys.is_empty() {
            return Ok(());
        }
        log::info!(target: "livegrid::model", "{}: cleaning {} rows", self.id, keys.len());

        let mut failures = Failures::default();
        for key in keys {
            self.run_removal(key, &mut failures);
            self.drain(&mut failures);
        }
        failures.into_result()
    }

    fn check_bound(&self) -> Result<()> {
        if self.policy.is_bound() {
            Ok(())
        } else {
            Err(GridError::illegal(format!(
                "{}: no cells bound yet; bind the view before feeding rows",
                self.id
            )))
        }
    }

    fn run_update(&mut self, key: Key, mut fields: Fields, failures: &mut Failures) {
        self.updating = Some(key.clone());

        let is_new = !self.table.contains(&key);
        let slot = self.policy.place(&mut self.table, &key, &fields, is_new);
        self.table.merge(&key, &fields);
        log::debug!(
            target: "livegrid::model",
            "{}: {} row {} at {}",
            self.id,
            if is_new { "inserted" } else { "updated" },
            key,
            slot
        );

        let mut reentry = Reentry::default();
        let dispatched = self
            .policy
            .dispatch(&self.table, &key, &slot, &mut fields, &mut reentry);
        // Pick up values merged in by the listeners.
        self.table.merge(&key, &fields);
        if let Err(err) = dispatched {
            failures.record(&self.id, &key, err);
        }

        self.updating = None;
        self.postpone(reentry);
    }

    fn run_removal(&mut self, key: Key, failures: &mut Failures) {
        if !self.table.contains(&key) {
            log::warn!(target: "livegrid::model", "{}: cannot remove row {}: not present", self.id, key);
            return;
        }
        log::debug!(target: "livegrid::model", "{}: removing row {}", self.id, key);
        self.updating = Some(key.clone());

        let mut reentry = Reentry::default();
        let vacated = self.policy.vacate(&mut self.table, &key, &mut reentry);
        self.table.evict(&key);
        if let Err(err) = vacated {
            failures.record(&self.id, &key, err);
        }

        self.updating = None;
        self.postpone(reentry);
    }

    fn postpone(&mut self, reentry: Reentry) {
        for op in reentry.into_ops() {
            log::debug!(
                target: "livegrid::model",
                "{}: postponing {} of row {} until the current one completes",
                self.id,
                match op {
                    PendingOp::Update { .. } => "update",
                    PendingOp::Remove { .. } => "removal",
                },
                op.key()
            );
            self.pending.push_back(op);
        }
    }

    fn drain(&mut self, failures: &mut Failures) {
        while let Some(op) = self.pending.pop_front() {
            match op {
                PendingOp::Update { key, fields } => self.run_update(key, fields, failures),
                PendingOp::Remove { key } => self.run_removal(key, failures),
            }
        }
    }
}
