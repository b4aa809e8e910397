// Property-based tests for row placement.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::collections::{HashSet, VecDeque};

use livegrid_config::GridSettings;
use livegrid_engine::{fields, CellDescriptor, FnListener, KeyMode, SlotId, StaticGrid, VisualUpdate};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn rows_grid(rows: usize) -> StaticGrid {
    let mut grid = StaticGrid::with_settings("prop", GridSettings::default());
    let cells = (1..=rows).flat_map(|row| {
        [
            CellDescriptor::row(row as u64 * 2, row, "v"),
            CellDescriptor::row(row as u64 * 2 + 1, row, "name"),
        ]
    });
    grid.bind_cells(cells).unwrap();
    grid
}

/// Every placed row has exactly one key and every key exactly one row.
fn assert_bijection(grid: &StaticGrid) {
    assert_eq!(grid.row_count(), grid.len(), "placed rows vs model rows");
    let mut seen = HashSet::new();
    for row in 1..=grid.row_count() {
        let key = grid.key_at(row).unwrap_or_else(|| panic!("row {} has no key", row));
        assert!(seen.insert(key.to_string()), "key {} placed twice", key);
        assert!(grid.contains(key), "row {} shows missing key {}", row, key);
        assert_eq!(grid.slot_of(key), Some(SlotId::Row(row)));
    }
}

fn numeric(grid: &StaticGrid, key: &str) -> Option<f64> {
    grid.read(key, "v").and_then(|v| v.parse().ok())
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Step {
    Update { key: u8, value: Option<u16> },
    Remove { key: u8 },
    Clear,
    Advance { ms: u64 },
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        8 => (0u8..12, proptest::option::weighted(0.85, 0u16..200))
            .prop_map(|(key, value)| Step::Update { key, value }),
        3 => (0u8..12).prop_map(|key| Step::Remove { key }),
        1 => Just(Step::Clear),
        1 => (0u64..2000).prop_map(|ms| Step::Advance { ms }),
    ]
}

#[derive(Debug, Clone, Copy)]
struct Layout {
    rows: usize,
    sorted: bool,
    descending: bool,
    add_on_top: bool,
}

fn arb_layout() -> impl Strategy<Value = Layout> {
    (1usize..6, any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
        |(rows, sorted, descending, add_on_top)| Layout {
            rows,
            sorted,
            descending,
            add_on_top,
        },
    )
}

fn run(grid: &mut StaticGrid, step: &Step) {
    let result = match step {
        Step::Update { key, value } => {
            let key = format!("k{}", key);
            let name = key.clone();
            match value {
                Some(v) => grid.apply_update(key, fields([("v", v.to_string()), ("name", name)])),
                None => grid.apply_update(key, fields([("name", name)])),
            }
        }
        Step::Remove { key } => grid.apply_removal(&format!("k{}", key)),
        Step::Clear => grid.clear(),
        Step::Advance { ms } => {
            grid.advance(*ms);
            Ok(())
        }
    };
    result.unwrap();
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn key_slot_map_stays_a_bijection(
        layout in arb_layout(),
        steps in proptest::collection::vec(arb_step(), 0..60),
    ) {
        let mut grid = rows_grid(layout.rows);
        if layout.sorted {
            grid.set_sort(Some("v"), layout.descending, true, false);
        }
        grid.set_add_on_top(layout.add_on_top);

        for step in &steps {
            run(&mut grid, step);
            assert_bijection(&grid);
        }
        grid.flush();
        assert_bijection(&grid);
    }

    #[test]
    fn ascending_numeric_sort_reads_non_decreasing(
        steps in proptest::collection::vec(arb_step(), 0..60),
    ) {
        let mut grid = rows_grid(4);
        grid.set_sort(Some("v"), false, true, false);
        for step in &steps {
            run(&mut grid, step);
        }

        let values: Vec<Option<f64>> = grid
            .keys_in_order()
            .into_iter()
            .map(|key| numeric(&grid, key))
            .collect();
        for pair in values.windows(2) {
            prop_assert!(
                pair[0].partial_cmp(&pair[1]) != Some(std::cmp::Ordering::Greater),
                "out of order: {:?}",
                values
            );
        }
    }

    #[test]
    fn counter_grid_keeps_newest_rows_in_arrival_order(
        cap in 1usize..6,
        steps in proptest::collection::vec(
            prop_oneof![4 => Just(None), 1 => (0usize..40).prop_map(Some)],
            0..40,
        ),
    ) {
        let mut grid = rows_grid(cap);
        grid.force_interpretation(Some(KeyMode::CounterIsKey)).unwrap();

        let mut expected: VecDeque<String> = VecDeque::new();
        let mut next = 0;
        for step in steps {
            match step {
                None => {
                    next += 1;
                    let key = format!("u{}", next);
                    grid.apply_update(key.clone(), fields([("v", key.clone())])).unwrap();
                    if expected.len() == cap {
                        expected.pop_front();
                    }
                    expected.push_back(key);
                }
                Some(pick) => {
                    if expected.is_empty() {
                        continue;
                    }
                    let key = expected.remove(pick % expected.len()).unwrap();
                    grid.apply_removal(&key).unwrap();
                }
            }
            prop_assert!(grid.len() <= cap);
            let order: Vec<&str> = grid.keys_in_order();
            prop_assert_eq!(order, expected.iter().map(String::as_str).collect::<Vec<_>>());
        }
    }

    #[test]
    fn repeating_an_update_keeps_the_slot(
        descending in any::<bool>(),
        steps in proptest::collection::vec(arb_step(), 1..40),
        pick in any::<usize>(),
    ) {
        let mut grid = rows_grid(5);
        grid.set_sort(Some("v"), descending, true, false);
        for step in &steps {
            run(&mut grid, step);
        }
        let keys: Vec<String> = grid.keys_in_order().into_iter().map(str::to_string).collect();
        prop_assume!(!keys.is_empty());

        let key = keys[pick % keys.len()].clone();
        let slot = grid.slot_of(&key);
        let current = match grid.read(&key, "v") {
            Some(v) => fields([("v", v.to_string()), ("name", key.clone())]),
            None => fields([("name", key.clone())]),
        };
        grid.apply_update(key.clone(), current.clone()).unwrap();
        grid.apply_update(key.clone(), current).unwrap();
        prop_assert_eq!(grid.slot_of(&key), slot);
    }

    #[test]
    fn reentrant_updates_land_in_issue_order(
        outer in 0u8..6,
        inner in proptest::collection::vec((0u8..6, 0u16..100), 1..4),
    ) {
        let mut grid = rows_grid(8);
        let issued = inner.clone();
        let outer_key = format!("k{}", outer);
        let trigger = outer_key.clone();
        let mut fired = false;
        grid.add_listener(FnListener::new(move |key: &str, _s: &SlotId, update: &mut VisualUpdate<'_>| {
            if key == trigger && !fired {
                fired = true;
                for (k, v) in &issued {
                    update.update_row(format!("k{}", k), fields([("v", v.to_string())]));
                }
            }
            Ok(())
        }));

        grid.apply_update(outer_key.clone(), fields([("v", "outer")])).unwrap();

        // The last issued value per key wins; the outer key keeps its own
        // field unless a re-entrant update overwrote it.
        let mut expected = std::collections::HashMap::new();
        expected.insert(outer_key.clone(), "outer".to_string());
        for (k, v) in &inner {
            expected.insert(format!("k{}", k), v.to_string());
        }
        for (key, value) in &expected {
            prop_assert_eq!(grid.read(key, "v"), Some(value.as_str()));
        }
        assert_bijection(&grid);
    }
}
