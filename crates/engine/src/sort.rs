//! Sort configuration, sort keys and the two sorting algorithms the grid
//! uses: binary-search insertion for single rows and an in-place quicksort
//! for whole-table re-sorts.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::slot::Field;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Comparable form of a field value under a given [`SortConfig`].
///
/// Null (absent, or not a number in numeric mode) is smaller than anything.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortValue {
    Null,
    Number(OrderedFloat<f64>),
    /// Uppercased, so text sorts case-insensitively.
    Text(String),
}

/// Current sort state of a grid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortConfig {
    pub field: Field,
    pub direction: SortDirection,
    pub numeric: bool,
    /// Numeric values use `,` as decimal separator and `.` for thousands.
    pub comma_decimal: bool,
}

impl SortConfig {
    pub fn ascending(field: impl Into<Field>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
            numeric: false,
            comma_decimal: false,
        }
    }

    pub fn numeric(mut self) -> Self {
        self.numeric = true;
        self
    }

    pub fn descending(mut self) -> Self {
        self.direction = SortDirection::Descending;
        self
    }

    pub fn is_descending(&self) -> bool {
        self.direction == SortDirection::Descending
    }

    pub fn value_of(&self, raw: Option<&str>) -> SortValue {
        let Some(raw) = raw else {
            return SortValue::Null;
        };
        if self.numeric {
            match parse_number(raw, self.comma_decimal) {
                Some(n) => SortValue::Number(OrderedFloat(n)),
                None => SortValue::Null,
            }
        } else {
            SortValue::Text(raw.to_uppercase())
        }
    }

    /// Whether `a` belongs strictly before `b` in this sort.
    pub fn is_before(&self, a: &SortValue, b: &SortValue) -> bool {
        match (a, b) {
            (SortValue::Null, SortValue::Null) => false,
            (SortValue::Null, _) => !self.is_descending(),
            (_, SortValue::Null) => self.is_descending(),
            _ if self.is_descending() => a > b,
            _ => a < b,
        }
    }
}

/// Parse a formatted number, dropping the thousands separator.
pub fn parse_number(raw: &str, comma_decimal: bool) -> Option<f64> {
    let cleaned: String = if comma_decimal {
        raw.chars()
            .filter(|&c| c != '.')
            .map(|c| if c == ',' { '.' } else { c })
            .collect()
    } else {
        raw.chars().filter(|&c| c != ',').collect()
    };
    let n: f64 = cleaned.trim().parse().ok()?;
    if n.is_nan() {
        None
    } else {
        Some(n)
    }
}

/// 1-based position a row with sort value `value` takes among `count` rows
/// already in sorted order. Ties go after the equal rows.
///
/// `value_at(i)` returns the sort value of the i-th (0-based) row.
pub fn insertion_slot<F>(config: &SortConfig, value: &SortValue, count: usize, value_at: F) -> usize
where
    F: Fn(usize) -> SortValue,
{
    let (mut lo, mut hi) = (0, count);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if config.is_before(value, &value_at(mid)) {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    lo + 1
}

/// In-place quicksort, middle pivot, equal elements to the left of the pivot.
pub fn quick_sort<T, F>(items: &mut [T], before: &F)
where
    F: Fn(&T, &T) -> bool,
{
    if items.len() < 2 {
        return;
    }
    let pivot = partition(items, items.len() / 2, before);
    let (left, right) = items.split_at_mut(pivot);
    quick_sort(left, before);
    quick_sort(&mut right[1..], before);
}

fn partition<T, F>(items: &mut [T], pivot: usize, before: &F) -> usize
where
    F: Fn(&T, &T) -> bool,
{
    let last = items.len() - 1;
    items.swap(pivot, last);
    let mut store = 0;
    for i in 0..last {
        if !before(&items[last], &items[i]) {
            items.swap(i, store);
            store += 1;
        }
    }
    items.swap(store, last);
    store
}
