#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative local race state for Dash Runner.
//!
//! The world only changes through [`apply`]. Generated content enters through
//! [`Command::PlaceContent`]; the world never draws random numbers itself, so
//! two worlds fed the same commands end in the same state.
//!
//! Every `watermelon_threshold` watermelons fire the nitro. While it burns
//! the car flies: it gains `speed_boost` and clears hazards instead of
//! crashing into them.

use std::{collections::BTreeMap, time::Duration};

use dash_runner_config::{GameConfig, SpeedConfig};
use dash_runner_core::{
    CenteredLane, Command, Event, LaneIndex, LaneLayout, PeerId, Placement, SessionSeed, SkyPhase,
    Spawn, SpawnCategory, TrackIndex, VehicleVariant,
};
use dash_runner_system_zones::ZoneSequencer;
use tracing::{debug, info};

/// Player speed at `index`: ramps by `increment` every `increment_every` tiles up to `max`.
#[must_use]
pub fn speed_at(speed: &SpeedConfig, index: TrackIndex) -> f32 {
    let steps = index.get() / speed.increment_every.max(1);
    (speed.initial + speed.increment * steps as f32).min(speed.max)
}

#[derive(Debug)]
struct Session {
    seed: SessionSeed,
    zones: ZoneSequencer,
    local_peer: PeerId,
    vehicle: VehicleVariant,
}

#[derive(Debug)]
struct Run {
    distance: f64,
    index: TrackIndex,
    lane: CenteredLane,
    bonus: u64,
    crashed: bool,
    elapsed: Duration,
    watermelons: u32,
    dates: u32,
    nitro: Option<Duration>,
    nitro_trigger: u64,
}

impl Run {
    fn new(lane: CenteredLane) -> Self {
        Self {
            distance: 0.0,
            index: TrackIndex::new(0),
            lane,
            bonus: 0,
            crashed: false,
            elapsed: Duration::ZERO,
            watermelons: 0,
            dates: 0,
            nitro: None,
            nitro_trigger: 0,
        }
    }
}

/// Represents the authoritative Dash Runner race state of one client.
#[derive(Debug)]
pub struct World {
    config: GameConfig,
    layout: LaneLayout,
    session: Option<Session>,
    run: Run,
    placements: BTreeMap<(TrackIndex, SpawnCategory), Spawn>,
    hour: f32,
}

impl World {
    /// Creates an idle world bound to a validated configuration snapshot.
    #[must_use]
    pub fn new(config: GameConfig) -> Self {
        let layout = config.lane_layout();
        let lane = layout.centered(config.initial_lane());
        let hour = config.world.sky.default_time.rem_euclid(24.0);
        Self {
            config,
            layout,
            session: None,
            run: Run::new(lane),
            placements: BTreeMap::new(),
            hour,
        }
    }

    fn start(
        &mut self,
        seed: SessionSeed,
        local_peer: PeerId,
        vehicle: VehicleVariant,
        initial_lane: LaneIndex,
        out_events: &mut Vec<Event>,
    ) {
        let max_lanes = self.layout.max_lanes();
        let lane = LaneIndex::new(initial_lane.get().clamp(1, max_lanes));
        let zones = ZoneSequencer::new(seed.clone(), &self.config);
        let start = TrackIndex::new(0);
        let block = zones.block_of(start);
        let zone = zones.zone_of_block(block);

        info!(
            seed = %seed,
            peer = local_peer.get(),
            lane = lane.get(),
            zone = %zone,
            "race session started"
        );

        self.run = Run::new(self.layout.centered(lane));
        self.placements.clear();
        self.session = Some(Session {
            seed: seed.clone(),
            zones,
            local_peer,
            vehicle,
        });

        out_events.push(Event::SessionStarted {
            seed,
            start,
            hour: self.hour,
        });
        out_events.push(Event::ZoneEntered { block, zone });
    }

    fn advance(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        if self.session.is_none() || self.run.crashed {
            return;
        }

        self.run.elapsed = self.run.elapsed.saturating_add(dt);
        let boosting = self.run.nitro.is_some();
        self.run.distance += f64::from(self.speed()) * dt.as_secs_f64();

        let from = self.run.index;
        let reached = TrackIndex::from_distance(self.run.distance, self.config.world.tile_length);
        if reached > from {
            self.cross(from, reached, out_events);
        }
        if boosting {
            self.burn_nitro(dt, out_events);
        }
    }

    fn cross(&mut self, from: TrackIndex, reached: TrackIndex, out_events: &mut Vec<Event>) {
        let mut to = reached;
        for index in from.get() + 1..=reached.get() {
            let index = TrackIndex::new(index);
            if self.resolve_contacts(index, out_events) {
                to = index;
                self.run.distance =
                    index.get() as f64 * f64::from(self.config.world.tile_length);
                break;
            }
        }
        self.run.index = to;
        out_events.push(Event::TrackAdvanced { from, to });

        let Some(zones) = self.session.as_ref().map(|session| &session.zones) else {
            return;
        };
        let block = zones.block_of(to);
        if block != zones.block_of(from) {
            let zone = zones.zone_of_block(block);
            debug!(block = block.get(), zone = %zone, "entered zone block");
            out_events.push(Event::ZoneEntered { block, zone });
        }
    }

    fn burn_nitro(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        let Some(remaining) = self.run.nitro else {
            return;
        };
        let remaining = remaining.saturating_sub(dt);
        if remaining.is_zero() {
            self.run.nitro = None;
            debug!(position = self.run.index.get(), "nitro wore off");
            out_events.push(Event::NitroEnded);
        } else {
            self.run.nitro = Some(remaining);
        }
    }

    /// Handles content in the player's lane at `index`; returns whether the run ended.
    fn resolve_contacts(&mut self, index: TrackIndex, out_events: &mut Vec<Event>) -> bool {
        let lane = self.run.lane;
        let layout = self.layout;
        let in_lane = |spawn: &Spawn| match spawn.placement {
            Placement::Lane(slot) => layout.centered(slot) == lane,
            Placement::Roadside { .. } => false,
        };

        for category in [SpawnCategory::Collectible, SpawnCategory::Date] {
            let key = (index, category);
            if self.placements.get(&key).is_some_and(in_lane) {
                let _ = self.placements.remove(&key);
                self.collect(category, index, out_events);
            }
        }

        if !self.config.development.collision_enabled {
            return false;
        }

        let hazard = [SpawnCategory::Obstacle, SpawnCategory::Traffic]
            .into_iter()
            .find(|category| self.placements.get(&(index, *category)).is_some_and(in_lane));
        let Some(category) = hazard else {
            return false;
        };

        if self.run.nitro.is_some() {
            let _ = self.placements.remove(&(index, category));
            debug!(position = index.get(), category = %category, "flew over hazard");
            return false;
        }

        self.run.crashed = true;
        info!(
            position = index.get(),
            category = %category,
            score = self.score(),
            "player crashed"
        );
        out_events.push(Event::Crashed {
            category,
            position: index,
        });
        true
    }

    fn collect(
        &mut self,
        category: SpawnCategory,
        position: TrackIndex,
        out_events: &mut Vec<Event>,
    ) {
        let points = match category {
            SpawnCategory::Date => self.config.dates.points,
            _ => self.config.collectibles.points,
        };
        self.run.bonus = self.run.bonus.saturating_add(u64::from(points));
        debug!(position = position.get(), category = %category, points, "picked up");
        out_events.push(Event::ContentCollected {
            category,
            position,
            points,
        });

        if category == SpawnCategory::Date {
            self.run.dates = self.run.dates.saturating_add(1);
            if self.run.dates == self.config.dates.target {
                info!(collected = self.run.dates, "date target reached");
                out_events.push(Event::DateTargetReached {
                    collected: self.run.dates,
                });
            }
            return;
        }

        self.run.watermelons = self.run.watermelons.saturating_add(1);
        let nitro = &self.config.player.nitro;
        if self.run.watermelons >= nitro.watermelon_threshold {
            self.run.watermelons = 0;
            self.run.nitro = Some(nitro.duration());
            self.run.nitro_trigger += 1;
            info!(
                trigger = self.run.nitro_trigger,
                position = position.get(),
                "nitro fired"
            );
            out_events.push(Event::NitroStarted {
                trigger: self.run.nitro_trigger,
                duration: nitro.duration(),
            });
        }
    }

    fn speed(&self) -> f32 {
        if self.run.crashed {
            return 0.0;
        }
        let ramp = speed_at(&self.config.player.speed, self.run.index);
        match self.run.nitro {
            Some(_) => ramp + self.config.player.nitro.speed_boost,
            None => ramp,
        }
    }

    fn score(&self) -> u64 {
        let travelled = self.run.distance * f64::from(self.config.player.score_multiplier);
        (travelled.max(0.0).floor() as u64).saturating_add(self.run.bonus)
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::StartSession {
            seed,
            local_peer,
            vehicle,
            initial_lane,
        } => world.start(seed, local_peer, vehicle, initial_lane, out_events),
        Command::Tick { dt } => {
            out_events.push(Event::TimeAdvanced { dt });
            world.advance(dt, out_events);
        }
        Command::ChangeLane { direction } => {
            if world.session.is_none() || world.run.crashed {
                return;
            }
            let from = world.run.lane;
            let to = world.layout.shift(from, direction);
            if to != from {
                world.run.lane = to;
                out_events.push(Event::LaneChanged { from, to });
            }
        }
        Command::PlaceContent { spawn } => {
            if world.session.is_none() {
                return;
            }
            let key = (spawn.position, spawn.category);
            if world.placements.contains_key(&key) {
                return;
            }
            let _ = world.placements.insert(key, spawn);
            out_events.push(Event::ContentPlaced {
                category: spawn.category,
                position: spawn.position,
            });
        }
        Command::RetireContent { before } => {
            let live = world.placements.len();
            world.placements.retain(|(position, _), _| *position >= before);
            let count = live - world.placements.len();
            if count > 0 {
                out_events.push(Event::ContentRetired { count });
            }
        }
        Command::SetTimeOfDay { hour } => {
            let hour = hour.rem_euclid(24.0);
            if hour != world.hour {
                world.hour = hour;
                out_events.push(Event::TimeOfDayChanged {
                    hour,
                    phase: SkyPhase::at_hour(hour),
                });
            }
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use super::World;
    use dash_runner_config::GameConfig;
    use dash_runner_core::{
        CenteredLane, LaneLayout, PeerId, SessionSeed, SkyPhase, Spawn, TrackIndex,
        VehicleVariant, Zone,
    };

    /// Configuration snapshot the world was built with.
    #[must_use]
    pub fn config(world: &World) -> &GameConfig {
        &world.config
    }

    /// Lane layout of the road.
    #[must_use]
    pub fn lane_layout(world: &World) -> LaneLayout {
        world.layout
    }

    /// Seed of the running session, if any.
    #[must_use]
    pub fn seed(world: &World) -> Option<&SessionSeed> {
        world.session.as_ref().map(|session| &session.seed)
    }

    /// Identity of the local player in the running session.
    #[must_use]
    pub fn local_peer(world: &World) -> Option<PeerId> {
        world.session.as_ref().map(|session| session.local_peer)
    }

    /// Vehicle driven by the local player.
    #[must_use]
    pub fn vehicle(world: &World) -> Option<VehicleVariant> {
        world.session.as_ref().map(|session| session.vehicle)
    }

    /// Track tile the player currently occupies.
    #[must_use]
    pub fn track_index(world: &World) -> TrackIndex {
        world.run.index
    }

    /// Distance travelled in world units.
    #[must_use]
    pub fn distance(world: &World) -> f64 {
        world.run.distance
    }

    /// Target lane of the local player.
    #[must_use]
    pub fn lane(world: &World) -> CenteredLane {
        world.run.lane
    }

    /// Current forward speed in world units per second, boost included.
    #[must_use]
    pub fn speed(world: &World) -> f32 {
        world.speed()
    }

    /// Score of the run: scaled distance plus collectible points.
    #[must_use]
    pub fn score(world: &World) -> u64 {
        world.score()
    }

    /// Simulated time since the session started.
    #[must_use]
    pub fn elapsed(world: &World) -> Duration {
        world.run.elapsed
    }

    /// Watermelons collected towards the next nitro.
    #[must_use]
    pub fn watermelons(world: &World) -> u32 {
        world.run.watermelons
    }

    /// Dates collected in the run.
    #[must_use]
    pub fn dates_collected(world: &World) -> u32 {
        world.run.dates
    }

    /// Remaining boost, if the nitro is burning.
    #[must_use]
    pub fn nitro_remaining(world: &World) -> Option<Duration> {
        world.run.nitro
    }

    /// Whether the nitro is burning.
    #[must_use]
    pub fn is_boosting(world: &World) -> bool {
        world.run.nitro.is_some()
    }

    /// Boosts fired so far in the run.
    #[must_use]
    pub fn nitro_trigger(world: &World) -> u64 {
        world.run.nitro_trigger
    }

    /// Whether the run ended in a crash.
    #[must_use]
    pub fn is_crashed(world: &World) -> bool {
        world.run.crashed
    }

    /// Zone the player is driving through.
    #[must_use]
    pub fn zone(world: &World) -> Option<Zone> {
        world
            .session
            .as_ref()
            .map(|session| session.zones.zone_at(world.run.index))
    }

    /// Zone of an arbitrary track index in the running session.
    #[must_use]
    pub fn zone_at(world: &World, index: TrackIndex) -> Option<Zone> {
        world
            .session
            .as_ref()
            .map(|session| session.zones.zone_at(index))
    }

    /// Live placements ordered by position, then category.
    pub fn placements(world: &World) -> impl Iterator<Item = &Spawn> {
        world.placements.values()
    }

    /// Shared hour of day in `[0, 24)`.
    #[must_use]
    pub fn hour(world: &World) -> f32 {
        world.hour
    }

    /// Lighting phase for the current hour.
    #[must_use]
    pub fn sky_phase(world: &World) -> SkyPhase {
        SkyPhase::at_hour(world.hour)
    }
}
