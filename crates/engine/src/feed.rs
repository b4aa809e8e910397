//! Feed adapter: turns subscription callbacks into row operations.
//!
//! The first feed that starts listening becomes the master. Its mode picks
//! how row keys are derived unless an interpretation was forced:
//!
//! | Mode | Key |
//! |---|---|
//! | Merge, Raw | item name (or position) |
//! | Distinct | progressive update counter |
//! | Command | `"<item> <value of the key field>"` |

use serde::{Deserialize, Serialize};

use crate::error::{GridError, Result};
use crate::model::{RowModel, RowPolicy};
use crate::slot::{Fields, Key, KeyMode};

const COMMAND_DELETE: &str = "DELETE";
const KEY_FIELD: &str = "key";
const COMMAND_FIELD: &str = "command";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionMode {
    Merge,
    Raw,
    Distinct,
    Command,
}

impl SubscriptionMode {
    /// Key interpretation a feed in this mode implies.
    pub fn key_mode(self) -> KeyMode {
        match self {
            SubscriptionMode::Merge | SubscriptionMode::Raw => KeyMode::ItemIsKey,
            SubscriptionMode::Distinct => KeyMode::CounterIsKey,
            SubscriptionMode::Command => KeyMode::CompositeIsKey,
        }
    }
}

/// What the grid needs to know about a feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedInfo {
    pub mode: SubscriptionMode,
    /// The feed is already delivering.
    pub subscribed: bool,
    /// Fields are addressed by name; otherwise by 1-based position.
    pub named_fields: bool,
    /// Key field position, for positional command feeds.
    pub key_position: Option<usize>,
    /// Command field position, for positional command feeds.
    pub command_position: Option<usize>,
}

impl FeedInfo {
    pub fn new(mode: SubscriptionMode) -> Self {
        Self {
            mode,
            subscribed: false,
            named_fields: true,
            key_position: None,
            command_position: None,
        }
    }

    pub fn subscribed(mut self) -> Self {
        self.subscribed = true;
        self
    }

    pub fn positional(mut self, key_position: usize, command_position: usize) -> Self {
        self.named_fields = false;
        self.key_position = Some(key_position);
        self.command_position = Some(command_position);
        self
    }
}

/// A field as the feed delivers it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedField {
    pub name: Option<String>,
    /// 1-based.
    pub position: usize,
    pub value: Option<String>,
    pub changed: bool,
}

/// One update of one item.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ItemUpdate {
    pub item: Option<String>,
    /// 1-based item position, used when the item has no name.
    pub position: usize,
    pub fields: Vec<FeedField>,
}

impl ItemUpdate {
    pub fn new(item: impl Into<String>) -> Self {
        Self {
            item: Some(item.into()),
            position: 1,
            fields: Vec::new(),
        }
    }

    pub fn at_position(position: usize) -> Self {
        Self {
            item: None,
            position,
            fields: Vec::new(),
        }
    }

    /// Add a changed, named field.
    pub fn field(mut self, name: impl Into<String>, value: Option<&str>) -> Self {
        let position = self.fields.len() + 1;
        self.fields.push(FeedField {
            name: Some(name.into()),
            position,
            value: value.map(str::to_string),
            changed: true,
        });
        self
    }

    /// Add a named field that did not change since the last update.
    pub fn unchanged(mut self, name: impl Into<String>, value: Option<&str>) -> Self {
        self = self.field(name, value);
        if let Some(last) = self.fields.last_mut() {
            last.changed = false;
        }
        self
    }

    /// Add a changed field known by position only.
    pub fn positional(mut self, value: Option<&str>) -> Self {
        let position = self.fields.len() + 1;
        self.fields.push(FeedField {
            name: None,
            position,
            value: value.map(str::to_string),
            changed: true,
        });
        self
    }

    /// Item name, or its position when unnamed.
    pub fn item_id(&self) -> String {
        match &self.item {
            Some(name) => name.clone(),
            None => self.position.to_string(),
        }
    }

    fn value_of(&self, field: &FieldRef) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| match field {
                FieldRef::Name(name) => f.name.as_deref() == Some(name.as_str()),
                FieldRef::Position(pos) => f.position == *pos,
            })
            .and_then(|f| f.value.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum FieldRef {
    Name(String),
    Position(usize),
}

impl FieldRef {
    fn column(&self) -> String {
        match self {
            FieldRef::Name(name) => name.clone(),
            FieldRef::Position(pos) => pos.to_string(),
        }
    }
}

/// Subscription-side state of a grid.
#[derive(Debug, Default)]
pub struct FeedState {
    master: Option<FeedInfo>,
    forced: bool,
    updates: u64,
    /// Fixed by the first field ever seen.
    positional: Option<bool>,
    key_field: Option<FieldRef>,
    command_field: Option<FieldRef>,
    active: usize,
    clean_on_first_subscribe: bool,
    clean_on_last_unsubscribe: bool,
}

impl FeedState {
    pub fn master(&self) -> Option<&FeedInfo> {
        self.master.as_ref()
    }

    pub fn is_forced(&self) -> bool {
        self.forced
    }

    pub fn active_subscriptions(&self) -> usize {
        self.active
    }

    /// Updates received so far.
    pub fn update_count(&self) -> u64 {
        self.updates
    }

    fn column(&mut self, field: &FeedField) -> String {
        let positional = *self.positional.get_or_insert(field.name.is_none());
        match (&field.name, positional) {
            (Some(name), false) => name.clone(),
            _ => field.position.to_string(),
        }
    }
}

impl<P: RowPolicy> RowModel<P> {
    pub fn feed(&self) -> &FeedState {
        &self.feed
    }

    /// Clean the grid when the first subscription starts and/or when the
    /// last one ends.
    pub fn set_auto_clean(&mut self, on_first_subscribe: bool, on_last_unsubscribe: bool) {
        self.feed.clean_on_first_subscribe = on_first_subscribe;
        self.feed.clean_on_last_unsubscribe = on_last_unsubscribe;
    }

    pub fn key_mode(&self) -> Option<KeyMode> {
        self.table.key_mode()
    }

    /// Pin the key interpretation instead of deriving it from the master
    /// feed. `None` goes back to deriving it. Only allowed while empty.
    pub fn force_interpretation(&mut self, mode: Option<KeyMode>) -> Result<()> {
        if !self.table.is_empty() {
            return Err(GridError::illegal(
                "cannot change the key interpretation while the grid holds rows",
            ));
        }
        match mode {
            Some(KeyMode::CompositeIsKey) => Err(GridError::invalid(
                "the composite interpretation can only come from a command feed",
            )),
            Some(mode) => {
                self.feed.forced = true;
                self.table.set_key_mode(Some(mode));
                Ok(())
            }
            None => {
                self.feed.forced = false;
                self.choose_interpretation();
                Ok(())
            }
        }
    }

    /// A feed starts delivering to this grid.
    pub fn on_listen_start(&mut self, info: FeedInfo) -> Result<()> {
        let subscribed = info.subscribed;
        if self.feed.master.is_none() {
            self.feed.master = Some(info);
            // Rows already keyed one way stay keyed that way.
            if !self.feed.forced && (self.table.key_mode().is_none() || self.table.is_empty()) {
                self.choose_interpretation();
            }
        }
        if subscribed {
            self.on_subscription()?;
        }
        Ok(())
    }

    /// A feed stops delivering to this grid.
    pub fn on_listen_end(&mut self, info: &FeedInfo) -> Result<()> {
        if info.subscribed {
            self.on_unsubscription()?;
        }
        Ok(())
    }

    pub fn on_subscription(&mut self) -> Result<()> {
        if self.feed.active == 0 && self.feed.clean_on_first_subscribe {
            self.clear()?;
        }
        if self.table.key_mode() == Some(KeyMode::CompositeIsKey) && self.feed.key_field.is_none() {
            if let Some(master) = &self.feed.master {
                self.feed.key_field = master.key_position.map(FieldRef::Position);
                self.feed.command_field = master.command_position.map(FieldRef::Position);
            }
        }
        self.feed.active += 1;
        log::debug!(target: "livegrid::feed", "{}: {} active subscriptions", self.id(), self.feed.active);
        Ok(())
    }

    pub fn on_unsubscription(&mut self) -> Result<()> {
        self.feed.active = self.feed.active.saturating_sub(1);
        log::debug!(target: "livegrid::feed", "{}: {} active subscriptions", self.id(), self.feed.active);
        if self.feed.active == 0 && self.feed.clean_on_last_unsubscribe {
            self.clear()?;
        }
        Ok(())
    }

    /// Apply one item update: derive the key, collect the fields and
    /// update (or, for a command `DELETE`, remove) the row.
    pub fn on_item_update(&mut self, update: &ItemUpdate) -> Result<()> {
        let mode = match self.table.key_mode() {
            Some(mode) => mode,
            None => {
                self.choose_interpretation();
                self.table.key_mode().unwrap_or(KeyMode::ItemIsKey)
            }
        };
        self.feed.updates += 1;

        let item = update.item_id();
        let key: Key = match mode {
            KeyMode::ItemIsKey => item.clone(),
            KeyMode::CounterIsKey => self.feed.updates.to_string(),
            KeyMode::CompositeIsKey => {
                let sub_key = self
                    .feed
                    .key_field
                    .as_ref()
                    .and_then(|f| update.value_of(f))
                    .unwrap_or_default();
                format!("{} {}", item, sub_key)
            }
        };

        let mut fields = Fields::default();
        for field in &update.fields {
            if mode == KeyMode::CounterIsKey || field.changed {
                let column = self.feed.column(field);
                fields.insert(column, field.value.clone());
            }
        }

        let delete = mode == KeyMode::CompositeIsKey
            && self
                .feed
                .command_field
                .as_ref()
                .and_then(|f| fields.get(&f.column()))
                .and_then(|v| v.as_deref())
                == Some(COMMAND_DELETE);
        if delete {
            log::debug!(target: "livegrid::feed", "{}: {} deleted by {}", self.id(), key, item);
            return self.apply_removal(&key);
        }

        let result = self.apply_update(key.clone(), fields);
        if self.table.contains(&key) {
            self.table.claim(&item, &key);
        }
        result
    }

    /// The feed restarted `item` from scratch: drop every row it produced.
    pub fn on_clear_snapshot(&mut self, item: &str) -> Result<()> {
        let mut keys = self.table.release_item(item);
        keys.sort();
        log::debug!(target: "livegrid::feed", "{}: clearing {} rows of {}", self.id(), keys.len(), item);

        let mut first = None;
        for key in keys {
            if let Err(err) = self.apply_removal(&key) {
                match first {
                    None => first = Some(err),
                    Some(_) => log::warn!(target: "livegrid::feed", "{}: {}", self.id(), err),
                }
            }
        }
        first.map_or(Ok(()), Err)
    }

    fn choose_interpretation(&mut self) {
        let mode = match &self.feed.master {
            None => KeyMode::ItemIsKey,
            Some(info) => {
                if info.mode == SubscriptionMode::Command && info.named_fields {
                    self.feed.key_field = Some(FieldRef::Name(KEY_FIELD.to_string()));
                    self.feed.command_field = Some(FieldRef::Name(COMMAND_FIELD.to_string()));
                }
                info.mode.key_mode()
            }
        };
        log::debug!(target: "livegrid::feed", "{}: rows keyed as {:?}", self.id(), mode);
        self.table.set_key_mode(Some(mode));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::StaticGrid;
    use crate::slot::{CellDescriptor, SlotId};
    use livegrid_config::GridSettings;

    fn grid(rows: usize) -> StaticGrid {
        let mut grid = StaticGrid::with_settings("feed", GridSettings::default());
        let cells = (1..=rows).flat_map(|row| {
            [
                CellDescriptor::row(row as u64 * 10, row, "key"),
                CellDescriptor::row(row as u64 * 10 + 1, row, "v"),
            ]
        });
        grid.bind_cells(cells).unwrap();
        grid
    }

    #[test]
    fn test_mode_picks_interpretation() {
        for (mode, expected) in [
            (SubscriptionMode::Merge, KeyMode::ItemIsKey),
            (SubscriptionMode::Raw, KeyMode::ItemIsKey),
            (SubscriptionMode::Distinct, KeyMode::CounterIsKey),
            (SubscriptionMode::Command, KeyMode::CompositeIsKey),
        ] {
            let mut g = grid(1);
            g.on_listen_start(FeedInfo::new(mode)).unwrap();
            assert_eq!(g.key_mode(), Some(expected));
        }
    }

    #[test]
    fn test_only_first_feed_is_master() {
        let mut g = grid(1);
        g.on_listen_start(FeedInfo::new(SubscriptionMode::Distinct)).unwrap();
        g.on_listen_start(FeedInfo::new(SubscriptionMode::Merge)).unwrap();
        assert_eq!(g.key_mode(), Some(KeyMode::CounterIsKey));
        assert_eq!(g.feed().master().map(|m| m.mode), Some(SubscriptionMode::Distinct));
    }

    #[test]
    fn test_late_master_keeps_mode_of_existing_rows() {
        let mut g = grid(2);
        g.on_item_update(&ItemUpdate::new("X").field("v", Some("1"))).unwrap();
        assert_eq!(g.key_mode(), Some(KeyMode::ItemIsKey));

        g.on_listen_start(FeedInfo::new(SubscriptionMode::Distinct)).unwrap();
        assert_eq!(g.key_mode(), Some(KeyMode::ItemIsKey));
        g.on_item_update(&ItemUpdate::new("X").field("v", Some("2"))).unwrap();
        assert_eq!(g.keys_in_order(), vec!["X"]);
        assert_eq!(g.read("X", "v"), Some("2"));

        g.clear().unwrap();
        g.force_interpretation(None).unwrap();
        assert_eq!(g.key_mode(), Some(KeyMode::CounterIsKey), "master applies once empty");
    }

    #[test]
    fn test_forced_interpretation_rules() {
        let mut g = grid(2);
        assert!(matches!(
            g.force_interpretation(Some(KeyMode::CompositeIsKey)),
            Err(GridError::InvalidArgument(_))
        ));
        g.force_interpretation(Some(KeyMode::CounterIsKey)).unwrap();
        g.on_listen_start(FeedInfo::new(SubscriptionMode::Merge)).unwrap();
        assert_eq!(g.key_mode(), Some(KeyMode::CounterIsKey));

        g.on_item_update(&ItemUpdate::new("X").field("v", Some("1"))).unwrap();
        assert!(matches!(
            g.force_interpretation(None),
            Err(GridError::IllegalState(_))
        ));

        g.clear().unwrap();
        g.force_interpretation(None).unwrap();
        assert_eq!(g.key_mode(), Some(KeyMode::ItemIsKey));
    }

    #[test]
    fn test_merge_feed_keys_by_item_and_sends_changes_only() {
        let mut g = grid(2);
        g.on_listen_start(FeedInfo::new(SubscriptionMode::Merge).subscribed()).unwrap();
        g.on_item_update(&ItemUpdate::new("X").field("v", Some("1")).unchanged("key", Some("k")))
            .unwrap();

        assert_eq!(g.read("X", "v"), Some("1"));
        assert!(g.table().row("X").is_some_and(|row| !row.contains_key("key")));
        assert_eq!(g.feed().active_subscriptions(), 1);
    }

    #[test]
    fn test_distinct_feed_keys_by_counter_with_all_fields() {
        let mut g = grid(2);
        g.on_listen_start(FeedInfo::new(SubscriptionMode::Distinct)).unwrap();
        for v in ["a", "b", "c"] {
            g.on_item_update(&ItemUpdate::new("X").field("v", Some(v)).unchanged("key", Some("k")))
                .unwrap();
        }

        assert!(!g.contains("1"), "oldest evicted past the last bound row");
        assert_eq!(g.keys_in_order(), vec!["2", "3"]);
        assert_eq!(g.read("3", "key"), Some("k"));
        assert_eq!(g.feed().update_count(), 3);
    }

    #[test]
    fn test_command_feed_adds_and_deletes_composite_keys() {
        let mut g = grid(3);
        g.on_listen_start(FeedInfo::new(SubscriptionMode::Command)).unwrap();
        let add = |key: &str, v: &str| {
            ItemUpdate::new("portfolio")
                .field("key", Some(key))
                .field("command", Some("ADD"))
                .field("v", Some(v))
        };
        g.on_item_update(&add("IBM", "1")).unwrap();
        g.on_item_update(&add("AAPL", "2")).unwrap();
        assert_eq!(g.keys_in_order(), vec!["portfolio IBM", "portfolio AAPL"]);

        g.on_item_update(
            &ItemUpdate::new("portfolio")
                .unchanged("key", Some("IBM"))
                .field("command", Some("DELETE")),
        )
        .unwrap();
        assert_eq!(g.keys_in_order(), vec!["portfolio AAPL"]);
        assert_eq!(g.shown(&SlotId::Row(1), "v"), Some("2"));
    }

    #[test]
    fn test_positional_command_feed_uses_positions() {
        let mut g = grid(2);
        g.on_listen_start(FeedInfo::new(SubscriptionMode::Command).positional(1, 2).subscribed())
            .unwrap();
        g.on_item_update(&ItemUpdate::at_position(4).positional(Some("k1")).positional(Some("ADD")))
            .unwrap();
        assert!(g.contains("4 k1"));
        assert_eq!(g.read("4 k1", "1"), Some("k1"));

        g.on_item_update(&ItemUpdate::at_position(4).positional(Some("k1")).positional(Some("DELETE")))
            .unwrap();
        assert!(!g.contains("4 k1"));
    }

    #[test]
    fn test_clear_snapshot_removes_rows_of_item() {
        let mut g = grid(3);
        g.on_listen_start(FeedInfo::new(SubscriptionMode::Command)).unwrap();
        for (item, key) in [("A", "1"), ("B", "1"), ("A", "2")] {
            g.on_item_update(&ItemUpdate::new(item).field("key", Some(key)).field("command", Some("ADD")))
                .unwrap();
        }
        g.on_clear_snapshot("A").unwrap();
        assert_eq!(g.keys_in_order(), vec!["B 1"]);
        assert!(g.table().keys_of_item("A").is_empty());
    }

    #[test]
    fn test_auto_clean_on_subscription_edges() {
        let mut g = grid(2);
        g.set_auto_clean(true, true);
        g.on_item_update(&ItemUpdate::new("X").field("v", Some("1"))).unwrap();

        let info = FeedInfo::new(SubscriptionMode::Merge).subscribed();
        g.on_listen_start(info.clone()).unwrap();
        assert!(g.is_empty(), "cleaned on first subscription");

        g.on_item_update(&ItemUpdate::new("X").field("v", Some("2"))).unwrap();
        g.on_subscription().unwrap();
        g.on_unsubscription().unwrap();
        assert!(!g.is_empty(), "one subscription still active");

        g.on_listen_end(&info).unwrap();
        assert!(g.is_empty(), "cleaned on last unsubscription");
    }
}
