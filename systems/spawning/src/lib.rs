#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic spawning system that keeps the content window ahead of the
//! player filled.
//!
//! Whether anything spawns at a position is a pure function of the session
//! seed, the category and the position (see [`SpawnPolicy`]). The system only
//! decides *when* to ask: it tracks, per category, the next position that has
//! not been evaluated yet and evaluates every position up to the category's
//! look-ahead distance whenever the player advances.
//!
//! Dates are the one category gated by session state: positions evaluated
//! while the session hour lies outside the date window stay empty.

use dash_runner_config::{AssetCatalog, GameConfig};
use dash_runner_core::{Command, Event, SpawnCategory, TrackIndex};
use tracing::debug;

mod policy;

pub use policy::{SlotTuning, SpawnPolicy};

/// Tiles kept live behind the player so retiring content stays off screen.
const RETAIN_BEHIND: u64 = 2;
const CATEGORY_COUNT: usize = SpawnCategory::ALL.len();

/// Pure system that emits placement and retirement commands for the window.
#[derive(Debug)]
pub struct Spawning {
    config: GameConfig,
    catalog: AssetCatalog,
    policy: Option<SpawnPolicy>,
    frontier: [u64; CATEGORY_COUNT],
    retired_before: u64,
    hour: f32,
}

impl Spawning {
    /// Creates a spawning system bound to a configuration snapshot and catalog.
    #[must_use]
    pub fn new(config: GameConfig, catalog: AssetCatalog) -> Self {
        Self {
            config,
            catalog,
            policy: None,
            frontier: [0; CATEGORY_COUNT],
            retired_before: 0,
            hour: 0.0,
        }
    }

    /// Policy of the running session, if one started.
    #[must_use]
    pub fn policy(&self) -> Option<&SpawnPolicy> {
        self.policy.as_ref()
    }

    /// Consumes world events and emits the commands that keep the window full.
    pub fn handle(&mut self, events: &[Event], out: &mut Vec<Command>) {
        for event in events {
            match event {
                Event::SessionStarted { seed, start, hour } => {
                    self.policy = Some(SpawnPolicy::new(seed.clone(), &self.config, &self.catalog));
                    self.frontier = [start.get(); CATEGORY_COUNT];
                    self.retired_before = start.get();
                    self.hour = *hour;
                    self.fill(*start, out);
                }
                Event::TimeOfDayChanged { hour, .. } => self.hour = *hour,
                Event::TrackAdvanced { to, .. } => {
                    self.fill(*to, out);
                    self.retire(*to, out);
                }
                _ => {}
            }
        }
    }

    fn fill(&mut self, head: TrackIndex, out: &mut Vec<Command>) {
        let Some(policy) = self.policy.as_ref() else {
            return;
        };

        let dates_open = self.config.dates.is_open(self.hour);
        let mut placed = 0_usize;
        for (slot, category) in SpawnCategory::ALL.into_iter().enumerate() {
            let horizon = head.offset(policy.tuning(category, head).distance).get();
            let gated = category == SpawnCategory::Date && !dates_open;
            let next = &mut self.frontier[slot];
            while *next <= horizon {
                if gated {
                    *next += 1;
                    continue;
                }
                if let Some(spawn) = policy.decide(category, TrackIndex::new(*next)) {
                    out.push(Command::PlaceContent { spawn });
                    placed += 1;
                }
                *next += 1;
            }
        }

        if placed > 0 {
            debug!(head = head.get(), placed, "filled spawn window");
        }
    }

    fn retire(&mut self, head: TrackIndex, out: &mut Vec<Command>) {
        let before = head.get().saturating_sub(RETAIN_BEHIND);
        if self.policy.is_some() && before > self.retired_before {
            self.retired_before = before;
            out.push(Command::RetireContent {
                before: TrackIndex::new(before),
            });
        }
    }
}
