#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Dash Runner client.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative local world, and pure systems. Adapters submit [`Command`]
//! values describing desired mutations, the world executes those commands via
//! its `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Generation systems consume only the session
//! seed and track positions, so every client derives the same race world
//! without transmitting it.

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

pub mod lane;
pub mod protocol;
pub mod rng;

pub use lane::{CenteredLane, LaneDirection, LaneIndex, LaneLayout};
pub use rng::SeededHashRng;

/// Opaque session seed shared by every participant of a race.
///
/// Numeric seeds are canonicalised to their decimal string form so that the
/// same value hashes identically regardless of how a client received it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionSeed(String);

impl SessionSeed {
    /// Wraps the provided seed text.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Canonical string form that feeds the hash.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derives a sub-context seed by appending the provided suffix.
    #[must_use]
    pub fn with_suffix(&self, suffix: impl fmt::Display) -> Self {
        Self(format!("{}{suffix}", self.0))
    }
}

impl fmt::Display for SessionSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionSeed {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SessionSeed {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<u32> for SessionSeed {
    fn from(value: u32) -> Self {
        Self(value.to_string())
    }
}

impl From<u64> for SessionSeed {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl From<i64> for SessionSeed {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

/// Longitudinal position along the track measured in whole tiles.
///
/// The track index is the only independent variable of world generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackIndex(u64);

impl TrackIndex {
    /// Creates a track index.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric index.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }

    /// Tile containing the provided distance; negative or NaN distances map to tile zero.
    #[must_use]
    pub fn from_distance(distance: f64, tile_length: f32) -> Self {
        let tiles = distance / f64::from(tile_length);
        if tiles.is_nan() || tiles <= 0.0 {
            return Self(0);
        }
        Self(tiles.floor() as u64)
    }

    /// Zone block that contains this index.
    #[must_use]
    pub const fn block(&self, segment_length: u64) -> ZoneBlock {
        ZoneBlock(self.0 / segment_length)
    }

    /// Index advanced by `tiles`, saturating at the numeric limit.
    #[must_use]
    pub const fn offset(&self, tiles: u64) -> Self {
        Self(self.0.saturating_add(tiles))
    }
}

/// Contiguous run of `segment_length` track indices that share one zone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ZoneBlock(u64);

impl ZoneBlock {
    /// Creates a block identifier.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the block number.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }

    /// First track index inside the block.
    #[must_use]
    pub const fn first_index(&self, segment_length: u64) -> TrackIndex {
        TrackIndex(self.0.saturating_mul(segment_length))
    }
}

/// Environment theme applied to a zone block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Zone {
    /// Downtown with commercial towers.
    City,
    /// Residential houses.
    Suburbs,
    /// Warehouses and factories.
    Industrial,
    /// Open water crossing.
    Bridge,
    /// Palms and forest.
    Nature,
}

impl Zone {
    /// Default ordered zone sequence.
    pub const ALL: [Zone; 5] = [
        Zone::City,
        Zone::Suburbs,
        Zone::Industrial,
        Zone::Bridge,
        Zone::Nature,
    ];

    /// Lowercase label shared with configuration and logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::City => "city",
            Self::Suburbs => "suburbs",
            Self::Industrial => "industrial",
            Self::Bridge => "bridge",
            Self::Nature => "nature",
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Identifier of a participant in a multiplayer session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(u64);

impl PeerId {
    /// Creates a peer identifier.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric identifier.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Index of the vehicle a player selected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleVariant(u32);

impl VehicleVariant {
    /// Creates a vehicle variant index.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric index.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Content categories with independent spawn tunables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpawnCategory {
    /// Road debris blocking a lane.
    Obstacle,
    /// Watermelons that award points and charge the nitro.
    Collectible,
    /// Dates handed out during the date window of the session hour.
    Date,
    /// Zone-specific vehicles occupying a lane.
    Traffic,
    /// Street lights along the roadside.
    Light,
    /// Zone props such as buildings, boats and trees.
    Decoration,
}

impl SpawnCategory {
    /// Every category in evaluation order.
    pub const ALL: [SpawnCategory; 6] = [
        SpawnCategory::Obstacle,
        SpawnCategory::Collectible,
        SpawnCategory::Date,
        SpawnCategory::Traffic,
        SpawnCategory::Light,
        SpawnCategory::Decoration,
    ];

    /// Stable label mixed into per-slot seeds.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Obstacle => "obstacle",
            Self::Collectible => "collectible",
            Self::Date => "date",
            Self::Traffic => "traffic",
            Self::Light => "light",
            Self::Decoration => "decoration",
        }
    }

    /// Whether entities of this category occupy a driving lane.
    #[must_use]
    pub const fn occupies_lane(&self) -> bool {
        matches!(
            self,
            Self::Obstacle | Self::Collectible | Self::Date | Self::Traffic
        )
    }

    /// Whether driving into an entity of this category picks it up.
    #[must_use]
    pub const fn is_pickup(&self) -> bool {
        matches!(self, Self::Collectible | Self::Date)
    }

    /// Whether driving into an entity of this category ends the run.
    #[must_use]
    pub const fn is_hazard(&self) -> bool {
        matches!(self, Self::Obstacle | Self::Traffic)
    }
}

impl fmt::Display for SpawnCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.tag())
    }
}

/// Side of the road used by roadside content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RoadSide {
    /// Negative lateral offsets.
    Left,
    /// Positive lateral offsets.
    Right,
}

impl RoadSide {
    /// Sign applied to lateral offsets on this side.
    #[must_use]
    pub const fn sign(&self) -> f32 {
        match self {
            Self::Left => -1.0,
            Self::Right => 1.0,
        }
    }
}

/// Where a spawned entity sits across the road.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Placement {
    /// Centred inside a driving lane.
    Lane(LaneIndex),
    /// Beside the road.
    Roadside {
        /// Side of the road.
        side: RoadSide,
        /// Distance from the road centre in world units.
        lateral_offset: f32,
        /// Uniform scale applied to the model.
        scale: f32,
    },
}

/// Positive spawn decision for a category at a track position.
///
/// Derived solely from the seed, position and category tunables; recomputing
/// it always yields an identical value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Spawn {
    /// Category of the entity.
    pub category: SpawnCategory,
    /// Track index the entity is anchored to.
    pub position: TrackIndex,
    /// Zone the position belongs to.
    pub zone: Zone,
    /// Index into the zone-specific asset list of the category.
    pub variant: usize,
    /// Lateral placement.
    pub placement: Placement,
}

/// Broad lighting phase derived from the hour of day.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SkyPhase {
    /// Full daylight.
    Day,
    /// Dusk and dawn.
    Sunset,
    /// Darkness.
    Night,
}

impl SkyPhase {
    /// Phase active at the provided hour in `[0, 24)`.
    #[must_use]
    pub fn at_hour(hour: f32) -> Self {
        let hour = hour.rem_euclid(24.0);
        if (7.0..17.0).contains(&hour) {
            Self::Day
        } else if (5.0..7.0).contains(&hour) || (17.0..20.0).contains(&hour) {
            Self::Sunset
        } else {
            Self::Night
        }
    }
}

/// Commands that express all permissible mutations of the local race world.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Begins a race with the shared seed distributed by the lobby.
    StartSession {
        /// Authoritative session seed.
        seed: SessionSeed,
        /// Identity of the local player.
        local_peer: PeerId,
        /// Vehicle the local player drives.
        vehicle: VehicleVariant,
        /// 1-based lane the local player starts in.
        initial_lane: LaneIndex,
    },
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Requests a lane change for the local player.
    ChangeLane {
        /// Direction of the requested move.
        direction: LaneDirection,
    },
    /// Instantiates generated content inside the active window.
    PlaceContent {
        /// Spawn decision to materialise.
        spawn: Spawn,
    },
    /// Discards generated content anchored before the provided index.
    RetireContent {
        /// First index that stays live.
        before: TrackIndex,
    },
    /// Updates the shared hour of day.
    SetTimeOfDay {
        /// Hour in `[0, 24)`.
        hour: f32,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// A race started with the provided seed.
    SessionStarted {
        /// Seed every generation system must use.
        seed: SessionSeed,
        /// Track index the player starts at.
        start: TrackIndex,
        /// Shared hour of day at the start line.
        hour: f32,
    },
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// The player crossed into new track tiles.
    TrackAdvanced {
        /// Index occupied before the tick.
        from: TrackIndex,
        /// Index occupied after the tick.
        to: TrackIndex,
    },
    /// The player entered a new zone block.
    ZoneEntered {
        /// Block that was entered.
        block: ZoneBlock,
        /// Zone assigned to the block.
        zone: Zone,
    },
    /// The local player's target lane changed.
    LaneChanged {
        /// Previous centred lane.
        from: CenteredLane,
        /// New centred lane.
        to: CenteredLane,
    },
    /// Generated content became live.
    ContentPlaced {
        /// Category of the placed entity.
        category: SpawnCategory,
        /// Anchor position.
        position: TrackIndex,
    },
    /// Content behind the player was discarded.
    ContentRetired {
        /// Number of entities removed.
        count: usize,
    },
    /// The player picked up a watermelon or a date.
    ContentCollected {
        /// Category of the pickup.
        category: SpawnCategory,
        /// Position of the pickup.
        position: TrackIndex,
        /// Points awarded.
        points: u32,
    },
    /// Enough watermelons were collected and the nitro fired.
    NitroStarted {
        /// Number of boosts fired so far in the run, this one included.
        trigger: u64,
        /// Length of the boost.
        duration: Duration,
    },
    /// The running boost wore off.
    NitroEnded,
    /// The run collected its target number of dates.
    DateTargetReached {
        /// Dates collected so far.
        collected: u32,
    },
    /// The player drove into a hazard and the run ended.
    Crashed {
        /// Category of the hazard.
        category: SpawnCategory,
        /// Position of the hazard.
        position: TrackIndex,
    },
    /// The shared hour of day changed.
    TimeOfDayChanged {
        /// New hour.
        hour: f32,
        /// Lighting phase for the hour.
        phase: SkyPhase,
    },
}

#[cfg(test)]
mod tests {
    use super::{PeerId, SessionSeed, SkyPhase, TrackIndex, VehicleVariant, Zone, ZoneBlock};
    use serde::{de::DeserializeOwned, Serialize};

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn identifiers_round_trip_through_bincode() {
        assert_round_trip(&PeerId::new(42));
        assert_round_trip(&VehicleVariant::new(3));
        assert_round_trip(&TrackIndex::new(9_999));
        assert_round_trip(&SessionSeed::from("lobby-7"));
        assert_round_trip(&Zone::Bridge);
    }

    #[test]
    fn numeric_seeds_use_decimal_form() {
        assert_eq!(SessionSeed::from(123_u32).as_str(), "123");
        assert_eq!(SessionSeed::from(-5_i64).as_str(), "-5");
        assert_eq!(
            SessionSeed::from("abc").with_suffix(2 * 9_999),
            SessionSeed::from("abc19998")
        );
    }

    #[test]
    fn track_index_from_distance_floors_and_clamps() {
        assert_eq!(TrackIndex::from_distance(89.9, 30.0), TrackIndex::new(2));
        assert_eq!(TrackIndex::from_distance(90.0, 30.0), TrackIndex::new(3));
        assert_eq!(TrackIndex::from_distance(-4.0, 30.0), TrackIndex::new(0));
        assert_eq!(TrackIndex::from_distance(f64::NAN, 30.0), TrackIndex::new(0));
    }

    #[test]
    fn blocks_partition_the_track() {
        assert_eq!(TrackIndex::new(39).block(40), ZoneBlock::new(0));
        assert_eq!(TrackIndex::new(40).block(40), ZoneBlock::new(1));
        assert_eq!(ZoneBlock::new(3).first_index(40), TrackIndex::new(120));
    }

    #[test]
    fn sky_phase_follows_hour() {
        assert_eq!(SkyPhase::at_hour(13.0), SkyPhase::Day);
        assert_eq!(SkyPhase::at_hour(18.5), SkyPhase::Sunset);
        assert_eq!(SkyPhase::at_hour(2.0), SkyPhase::Night);
        assert_eq!(SkyPhase::at_hour(30.0), SkyPhase::Sunset);
    }
}
