//! Colour fades.
//!
//! A fader walks a cell's background and/or text colour from whatever it
//! shows now to a target colour in `millis / interval` steps, then hands
//! back its end task (usually the commit the fade was leading up to).
//!
//! Every prepared fader takes a new fade phase from its cell. Launching a
//! fader whose phase is behind the cell's is a no-op, so a fade scheduled
//! before a newer update never starts.

use rustc_hash::FxHashMap;

use crate::cell::{ViewCell, BACKGROUND, COLOR};
use crate::cell_matrix::CellMatrix;
use crate::scheduler::VisualTask;
use crate::sliding::{SlidingRef, SlotResolver};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FaderId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const WHITE: Rgb = Rgb(255, 255, 255);
    pub const BLACK: Rgb = Rgb(0, 0, 0);

    fn css(self) -> String {
        format!("rgb({},{},{})", self.0, self.1, self.2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BackTarget {
    Color(Rgb),
    Transparent,
}

#[derive(Debug, Clone)]
struct Fader {
    cell: SlidingRef,
    going_down: bool,
    end_back: Option<BackTarget>,
    end_fore: Option<Rgb>,
    start_back: Rgb,
    start_fore: Rgb,
    steps: u64,
    step: u64,
    phase: u64,
    end: Option<VisualTask>,
}

/// What the grid has to do after a launch.
#[derive(Debug, Default)]
pub struct Launch {
    /// End task of a fade-in that the new fade-out replaced; run it now.
    pub run_now: Option<VisualTask>,
    /// The tick loop was idle; schedule a tick.
    pub start_ticking: bool,
}

#[derive(Debug)]
pub struct FaderHandler {
    interval: u64,
    next_id: u64,
    faders: FxHashMap<FaderId, Fader>,
    running: FxHashMap<SlidingRef, FaderId>,
    ticking: bool,
}

impl FaderHandler {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval: interval_ms.max(1),
            next_id: 0,
            faders: FxHashMap::default(),
            running: FxHashMap::default(),
            ticking: false,
        }
    }

    pub fn interval(&self) -> u64 {
        self.interval
    }

    pub fn running(&self) -> usize {
        self.running.len()
    }

    pub fn steps_for(&self, millis: u64) -> u64 {
        (millis / self.interval).max(1)
    }

    /// Prepare a fade of `cell` toward the given colours.
    ///
    /// An empty or `transparent` background target fades the background
    /// out; colours that cannot be parsed are not faded.
    #[allow(clippy::too_many_arguments)]
    pub fn prepare(
        &mut self,
        cell_ref: SlidingRef,
        cell: &mut ViewCell,
        going_down: bool,
        end_back: Option<&str>,
        end_fore: Option<&str>,
        millis: u64,
        end: Option<VisualTask>,
    ) -> FaderId {
        let id = FaderId(self.next_id);
        self.next_id += 1;

        let end_back = end_back.and_then(|bg| {
            if bg.is_empty() || bg.eq_ignore_ascii_case("transparent") {
                Some(BackTarget::Transparent)
            } else {
                parse_color(bg).map(BackTarget::Color)
            }
        });
        let end_fore = end_fore.filter(|c| !c.is_empty()).and_then(parse_color);

        let fader = Fader {
            cell: cell_ref,
            going_down,
            end_back,
            end_fore,
            start_back: Rgb::WHITE,
            start_fore: Rgb::BLACK,
            steps: self.steps_for(millis),
            step: 0,
            phase: cell.next_fade_phase(),
            end,
        };
        self.faders.insert(id, fader);
        id
    }

    pub fn launch(&mut self, id: FaderId, slots: &SlotResolver<'_>, cells: &CellMatrix) -> Launch {
        let Some(cell_ref) = self.faders.get(&id).map(|f| f.cell.clone()) else {
            return Launch::default();
        };
        match cell_ref.peek(slots, cells) {
            Some(cell) => self.launch_on(id, cell),
            None => {
                self.faders.remove(&id);
                self.stop(&cell_ref);
                Launch::default()
            }
        }
    }

    /// Launch a fader on a cell the caller already holds.
    pub fn launch_on(&mut self, id: FaderId, cell: &ViewCell) -> Launch {
        let mut launch = Launch::default();
        let Some(mut fader) = self.faders.remove(&id) else {
            return launch;
        };
        if fader.phase < cell.fade_phase() {
            return launch;
        }

        if let Some(old) = self.running.remove(&fader.cell).and_then(|old| self.faders.remove(&old)) {
            if !old.going_down {
                if fader.going_down {
                    launch.run_now = old.end;
                } else {
                    fader.step = old.step;
                    fader.steps = fader.steps.max(old.steps);
                }
            }
        }

        fader.start_back = cell.style(BACKGROUND).and_then(parse_color).unwrap_or(Rgb::WHITE);
        fader.start_fore = cell.style(COLOR).and_then(parse_color).unwrap_or(Rgb::BLACK);

        self.running.insert(fader.cell.clone(), id);
        self.faders.insert(id, fader);

        if !self.ticking {
            self.ticking = true;
            launch.start_ticking = true;
        }
        launch
    }

    /// Forget any running fade on `cell_ref`.
    pub fn stop(&mut self, cell_ref: &SlidingRef) {
        if let Some(id) = self.running.remove(cell_ref) {
            self.faders.remove(&id);
        }
    }

    /// Forget every fade, prepared or running, on a cell of row `key`.
    /// Returns the ids that were dropped.
    pub fn forget_key(&mut self, key: &str) -> Vec<FaderId> {
        let ids: Vec<FaderId> = self
            .faders
            .iter()
            .filter(|(_, fader)| fader.cell.key == key)
            .map(|(id, _)| *id)
            .collect();
        for id in &ids {
            self.faders.remove(id);
        }
        self.running.retain(|cell, _| cell.key != key);
        ids
    }

    /// Advance every running fade by one step. Returns the end tasks of
    /// the fades that finished, and whether another tick is needed.
    pub fn tick(&mut self, slots: &SlotResolver<'_>, cells: &mut CellMatrix) -> (Vec<VisualTask>, bool) {
        let mut ids: Vec<FaderId> = self.running.values().copied().collect();
        ids.sort();

        let mut ends = Vec::new();
        let mut stepped = false;
        for id in ids {
            let Some(fader) = self.faders.get_mut(&id) else {
                continue;
            };
            if fader.step > fader.steps {
                if let Some(done) = self.faders.remove(&id) {
                    self.running.remove(&done.cell);
                    ends.extend(done.end);
                }
                continue;
            }
            let Some(cell) = fader.cell.resolve(slots, cells) else {
                let cell_ref = fader.cell.clone();
                self.stop(&cell_ref);
                continue;
            };
            paint(fader, cell);
            fader.step += 1;
            stepped = true;
        }

        self.ticking = stepped;
        (ends, stepped)
    }
}

fn paint(fader: &Fader, cell: &mut ViewCell) {
    let (steps, step) = (fader.steps, fader.step);
    match fader.end_back {
        Some(BackTarget::Transparent) => {
            let Rgb(r, g, b) = fader.start_back;
            let alpha = ease(100, 0, steps, step) / 100.0;
            cell.set_style(BACKGROUND, format!("rgba({},{},{},{})", r, g, b, alpha));
        }
        Some(BackTarget::Color(end)) => {
            cell.set_style(BACKGROUND, blend(fader.start_back, end, steps, step).css());
        }
        None => {}
    }
    if let Some(end) = fader.end_fore {
        cell.set_style(COLOR, blend(fader.start_fore, end, steps, step).css());
    }
}

fn ease(from: u8, to: u8, steps: u64, step: u64) -> f64 {
    let (from, to) = (f64::from(from), f64::from(to));
    let progress = step.min(steps) as f64 / steps as f64;
    (from + progress * (to - from)).ceil()
}

fn blend(from: Rgb, to: Rgb, steps: u64, step: u64) -> Rgb {
    let channel = |a: u8, b: u8| ease(a, b, steps, step).clamp(0.0, 255.0) as u8;
    Rgb(channel(from.0, to.0), channel(from.1, to.1), channel(from.2, to.2))
}

/// Parse a CSS colour: `#rgb`, `#rrggbb`, `rgb(..)`/`rgba(..)` (integers
/// or percentages) or one of the basic colour names.
pub fn parse_color(value: &str) -> Option<Rgb> {
    let value = value.trim();
    if let Some(hex) = value.strip_prefix('#') {
        return parse_hex(hex);
    }
    let lower = value.to_ascii_lowercase();
    if let Some(args) = lower
        .strip_prefix("rgba(")
        .or_else(|| lower.strip_prefix("rgb("))
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let parts: Vec<&str> = args.split(',').map(str::trim).collect();
        if parts.len() < 3 {
            return None;
        }
        return Some(Rgb(channel(parts[0])?, channel(parts[1])?, channel(parts[2])?));
    }
    named(&lower)
}

fn parse_hex(hex: &str) -> Option<Rgb> {
    let expanded: String = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).collect(),
        6 => hex.to_string(),
        _ => {
            log::warn!(target: "livegrid::grid", "hex colour must be 3 or 6 digits: #{}", hex);
            return None;
        }
    };
    let byte = |i: usize| u8::from_str_radix(expanded.get(i..i + 2)?, 16).ok();
    Some(Rgb(byte(0)?, byte(2)?, byte(4)?))
}

fn channel(part: &str) -> Option<u8> {
    if let Some(pct) = part.strip_suffix('%') {
        let pct: f64 = pct.trim().parse().ok()?;
        if !(0.0..=100.0).contains(&pct) {
            return None;
        }
        return Some((pct * 255.0 / 100.0).round() as u8);
    }
    part.parse::<u8>().ok()
}

fn named(name: &str) -> Option<Rgb> {
    let rgb = match name {
        "black" => Rgb(0, 0, 0),
        "white" => Rgb(255, 255, 255),
        "red" => Rgb(255, 0, 0),
        "lime" => Rgb(0, 255, 0),
        "green" => Rgb(0, 128, 0),
        "blue" => Rgb(0, 0, 255),
        "yellow" => Rgb(255, 255, 0),
        "orange" => Rgb(255, 165, 0),
        "gray" | "grey" => Rgb(128, 128, 128),
        "silver" => Rgb(192, 192, 192),
        "navy" => Rgb(0, 0, 128),
        "maroon" => Rgb(128, 0, 0),
        "purple" => Rgb(128, 0, 128),
        "teal" => Rgb(0, 128, 128),
        "aqua" | "cyan" => Rgb(0, 255, 255),
        "fuchsia" | "magenta" => Rgb(255, 0, 255),
        "olive" => Rgb(128, 128, 0),
        _ => return None,
    };
    Some(rgb)
}
