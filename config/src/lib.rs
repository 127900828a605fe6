#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Immutable tuning snapshot consumed by every Dash Runner system.
//!
//! A [`GameConfig`] is built once per session: defaults, optionally a TOML
//! file, then the overrides the session service ships with `game_start`.
//! Merging never mutates a snapshot in place; it produces a new one that is
//! validated before any system sees it. Systems receive the snapshot by
//! reference and may assume every tunable is sane.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use dash_runner_core::{LaneIndex, LaneLayout, Zone};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

pub mod assets;
mod server;

pub use assets::{AssetCatalog, ZoneTable};

/// Errors raised while loading, merging or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration at {path}: {source}")]
    Io {
        /// Path that failed to load.
        path: PathBuf,
        /// Underlying IO failure.
        source: std::io::Error,
    },
    /// The TOML document could not be parsed.
    #[error("failed to parse configuration toml: {0}")]
    Toml(#[from] toml::de::Error),
    /// The merged document did not describe a configuration.
    #[error("invalid configuration document: {0}")]
    Json(#[from] serde_json::Error),
    /// Overrides must be a JSON object keyed by section.
    #[error("configuration overrides must be a JSON object")]
    OverridesNotObject,
    /// A tunable violated its invariant.
    #[error("invalid configuration value for `{field}`: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// Human readable explanation.
        reason: String,
    },
}

/// Complete tuning surface of a race.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GameConfig {
    /// Track geometry, seed and sky.
    pub world: WorldConfig,
    /// Zone sequencing and zone-specific scatter.
    pub zones: ZoneConfig,
    /// Lane count and width.
    pub lanes: LaneConfig,
    /// Player speed ramp, starting lane and scoring.
    pub player: PlayerConfig,
    /// Building scatter used by built-up zones.
    pub buildings: ScatterConfig,
    /// Street light placement.
    pub lights: LightConfig,
    /// Obstacle placement and difficulty ramp.
    pub obstacles: ObstacleConfig,
    /// Zone traffic placement.
    pub traffic: TrafficConfig,
    /// Collectible placement and scoring.
    pub collectibles: CollectibleConfig,
    /// Date pickups and their hour window.
    pub dates: DateConfig,
    /// Roadside decoration slots.
    pub decorations: DecorationConfig,
    /// Multiplayer broadcast cadence and staleness.
    pub sync: SyncConfig,
    /// Developer switches.
    pub development: DevelopmentConfig,
}

/// Track geometry, seed and sky.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WorldConfig {
    /// Length of one track tile in world units.
    pub tile_length: f32,
    /// Seed used when no session seed is provided.
    pub seed: String,
    /// Number of tiles kept live ahead of the player.
    pub num_tiles: u64,
    /// Shared world bend factor read by the renderer every frame.
    pub curvature: f32,
    /// Time of day settings.
    pub sky: SkyConfig,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            tile_length: 30.0,
            seed: "default_seed".to_owned(),
            num_tiles: 12,
            curvature: -0.0003,
            sky: SkyConfig::default(),
        }
    }
}

/// Time of day settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SkyConfig {
    /// Follow the host's wall clock instead of `default_time`.
    pub dynamic: bool,
    /// Hour used at session start.
    pub default_time: f32,
}

impl Default for SkyConfig {
    fn default() -> Self {
        Self {
            dynamic: false,
            default_time: 13.0,
        }
    }
}

/// Zone sequencing and zone-specific scatter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ZoneConfig {
    /// Number of track tiles per zone block.
    pub segment_length: u64,
    /// Zones the sequencer samples from.
    pub sequence: Vec<Zone>,
    /// Tiles at the start of a changed zone kept free of roadside props.
    pub zone_transition_gap: u64,
    /// Bridge specific scatter.
    pub bridge: BridgeConfig,
    /// Tree scatter in nature zones.
    pub nature: ScatterConfig,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            segment_length: 40,
            sequence: Zone::ALL.to_vec(),
            zone_transition_gap: 5,
            bridge: BridgeConfig::default(),
            nature: ScatterConfig {
                density: 0.8,
                offset: 20.0,
                offset_variance: 15.0,
                scale: ScaleRange::new(10.0, 12.0),
            },
        }
    }
}

/// Bridge specific scatter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BridgeConfig {
    /// Boats drifting beside the bridge.
    pub boats: ScatterConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            boats: ScatterConfig {
                density: 0.05,
                offset: 15.0,
                offset_variance: 16.0,
                scale: ScaleRange::new(1.0, 2.0),
            },
        }
    }
}

/// Roadside prop scatter for one kind of prop.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScatterConfig {
    /// Probability that a candidate slot receives a prop.
    pub density: f64,
    /// Minimum distance from the road centre.
    pub offset: f32,
    /// Additional random distance beyond `offset`.
    pub offset_variance: f32,
    /// Uniform scale range.
    pub scale: ScaleRange,
}

impl Default for ScatterConfig {
    fn default() -> Self {
        Self {
            density: 1.0,
            offset: 30.0,
            offset_variance: 0.0,
            scale: ScaleRange::new(12.0, 22.0),
        }
    }
}

/// Half-open scale range `[min, max)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleRange {
    /// Smallest scale.
    pub min: f32,
    /// Upper bound of the scale.
    pub max: f32,
}

impl ScaleRange {
    /// Creates a scale range.
    #[must_use]
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }
}

impl Default for ScaleRange {
    fn default() -> Self {
        Self::new(1.0, 1.0)
    }
}

/// Lane count and width.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LaneConfig {
    /// Width of one lane in world units.
    pub width: f32,
    /// Number of lanes.
    pub max_lanes: u32,
}

impl Default for LaneConfig {
    fn default() -> Self {
        Self {
            width: 4.5,
            max_lanes: 3,
        }
    }
}

/// Player speed ramp, starting lane and scoring.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlayerConfig {
    /// Speed ramp.
    pub speed: SpeedConfig,
    /// 1-based lane used when the lobby did not assign one.
    pub initial_lane: u32,
    /// Score awarded per world unit travelled.
    pub score_multiplier: f32,
    /// Boost earned by collecting watermelons.
    pub nitro: NitroConfig,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            speed: SpeedConfig::default(),
            initial_lane: 2,
            score_multiplier: 0.2,
            nitro: NitroConfig::default(),
        }
    }
}

/// Boost earned by collecting watermelons.
///
/// While the boost lasts the car flies: hazards are cleared instead of
/// ending the run and `speed_boost` is added to the ramp speed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NitroConfig {
    /// Length of one boost in milliseconds.
    #[serde(rename = "duration")]
    pub duration_ms: u64,
    /// Speed added on top of the ramp while boosting.
    pub speed_boost: f32,
    /// Watermelons needed to trigger a boost.
    pub watermelon_threshold: u32,
}

impl NitroConfig {
    /// Boost length as a duration.
    #[must_use]
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

impl Default for NitroConfig {
    fn default() -> Self {
        Self {
            duration_ms: 5_000,
            speed_boost: 50.0,
            watermelon_threshold: 5,
        }
    }
}

/// Speed ramp driven by track position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpeedConfig {
    /// Speed at the start line in world units per second.
    pub initial: f32,
    /// Speed added every `increment_every` tiles.
    pub increment: f32,
    /// Speed ceiling.
    pub max: f32,
    /// Tiles between speed increments.
    pub increment_every: u64,
}

impl Default for SpeedConfig {
    fn default() -> Self {
        Self {
            initial: 20.0,
            increment: 0.5,
            max: 50.0,
            increment_every: 10,
        }
    }
}

/// Tunables shared by every spawn category.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpawnTuning {
    /// Tiles between candidate slots.
    #[serde(rename = "intervalTiles")]
    pub interval: u64,
    /// Probability that a candidate slot spawns.
    pub chance: f64,
    /// Tiles ahead of the player at which content is generated.
    pub distance: u64,
}

impl Default for SpawnTuning {
    fn default() -> Self {
        Self {
            interval: 4,
            chance: 0.5,
            distance: 8,
        }
    }
}

/// Street light placement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LightConfig {
    /// Slot tunables.
    pub spawn: SpawnTuning,
    /// Distance of the light pole from the road centre.
    pub offset: f32,
    /// Uniform model scale.
    pub scale: f32,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            spawn: SpawnTuning {
                interval: 3,
                chance: 0.3,
                distance: 12,
            },
            offset: 8.0,
            scale: 10.0,
        }
    }
}

/// Obstacle placement and difficulty ramp.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ObstacleConfig {
    /// Slot tunables; `interval` is the spacing at the start line.
    pub spawn: SpawnTuning,
    /// Spacing shrinks towards this floor.
    #[serde(rename = "minIntervalTiles")]
    pub min_interval: u64,
    /// Tiles removed from the spacing per ramp stage.
    #[serde(rename = "decreaseTiles")]
    pub decrease: u64,
    /// Length of a ramp stage in tiles.
    pub ramp_length: u64,
}

impl Default for ObstacleConfig {
    fn default() -> Self {
        Self {
            spawn: SpawnTuning {
                interval: 6,
                chance: 0.6,
                distance: 8,
            },
            min_interval: 2,
            decrease: 1,
            ramp_length: 120,
        }
    }
}

/// Zone traffic placement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrafficConfig {
    /// Slot tunables.
    pub spawn: SpawnTuning,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            spawn: SpawnTuning {
                interval: 5,
                chance: 0.35,
                distance: 10,
            },
        }
    }
}

/// Collectible placement and scoring.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CollectibleConfig {
    /// Slot tunables.
    pub spawn: SpawnTuning,
    /// Points awarded per pickup.
    pub points: u32,
}

impl Default for CollectibleConfig {
    fn default() -> Self {
        Self {
            spawn: SpawnTuning {
                interval: 4,
                chance: 0.25,
                distance: 8,
            },
            points: 100,
        }
    }
}

/// Date pickups, only handed out inside a window of the session hour.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DateConfig {
    /// Slot tunables.
    pub spawn: SpawnTuning,
    /// Points awarded per pickup.
    pub points: u32,
    /// Dates a player aims to collect in one run.
    pub target: u32,
    /// First hour of the window.
    pub start_hour: f32,
    /// Hour the window closes; a window with `end_hour < start_hour` spans midnight.
    pub end_hour: f32,
}

impl DateConfig {
    /// Whether dates are handed out at `hour`.
    #[must_use]
    pub fn is_open(&self, hour: f32) -> bool {
        if self.start_hour <= self.end_hour {
            (self.start_hour..self.end_hour).contains(&hour)
        } else {
            hour >= self.start_hour || hour < self.end_hour
        }
    }
}

impl Default for DateConfig {
    fn default() -> Self {
        Self {
            spawn: SpawnTuning {
                interval: 3,
                chance: 0.15,
                distance: 8,
            },
            points: 50,
            target: 10,
            start_hour: 1.0,
            end_hour: 24.0,
        }
    }
}

/// Roadside decoration slots; the per-slot chance comes from the zone scatter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DecorationConfig {
    /// Tiles between candidate slots.
    #[serde(rename = "intervalTiles")]
    pub interval: u64,
    /// Tiles ahead of the player at which props are generated.
    pub distance: u64,
}

impl Default for DecorationConfig {
    fn default() -> Self {
        Self {
            interval: 1,
            distance: 12,
        }
    }
}

/// Multiplayer broadcast cadence and staleness.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SyncConfig {
    /// Minimum time between two outgoing position samples.
    pub broadcast_interval_ms: u64,
    /// Silence after which a rival is dropped from the render set.
    pub stale_after_ms: u64,
}

impl SyncConfig {
    /// Broadcast cadence as a duration.
    #[must_use]
    pub fn broadcast_interval(&self) -> Duration {
        Duration::from_millis(self.broadcast_interval_ms)
    }

    /// Staleness threshold as a duration.
    #[must_use]
    pub fn stale_after(&self) -> Duration {
        Duration::from_millis(self.stale_after_ms)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            broadcast_interval_ms: 100,
            stale_after_ms: 3_000,
        }
    }
}

/// Developer switches.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DevelopmentConfig {
    /// Whether hazards end the run.
    pub collision_enabled: bool,
}

impl Default for DevelopmentConfig {
    fn default() -> Self {
        Self {
            collision_enabled: true,
        }
    }
}

impl GameConfig {
    /// Parses and validates a TOML document.
    ///
    /// Tables may be partial at any depth; missing entries take their
    /// defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let document: Value = toml::from_str(contents)?;
        Self::from_document(document)
    }

    /// Loads and validates the TOML file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Returns a new snapshot with the provided server overrides applied.
    ///
    /// Sections present in both documents are merged one level deep: the
    /// override's entries replace the matching entries of the section. Any
    /// other value, arrays included, replaces the base value wholesale. A
    /// nested object replaced by the override keeps the section defaults for
    /// every key it omits. The session service's own key names (millisecond
    /// spawn delays, `spawnChance`, `spawnInterval`) are translated into tile
    /// units; keys no tunable consumes are ignored.
    pub fn with_overrides(&self, overrides: &Value) -> Result<Self, ConfigError> {
        let Value::Object(overrides) = overrides else {
            return Err(ConfigError::OverridesNotObject);
        };

        let mut base = serde_json::to_value(self)?;
        let Value::Object(sections) = &mut base else {
            return Err(ConfigError::OverridesNotObject);
        };

        for (key, value) in overrides {
            match (sections.get_mut(key), value) {
                (Some(Value::Object(section)), Value::Object(entries)) => {
                    for (entry, entry_value) in entries {
                        let _ = section.insert(entry.clone(), entry_value.clone());
                    }
                }
                _ => {
                    let _ = sections.insert(key.clone(), value.clone());
                }
            }
        }

        let merged = Self::from_document(base)?;
        info!(
            sections = overrides.len(),
            max_lanes = merged.lanes.max_lanes,
            "applied configuration overrides"
        );
        Ok(merged)
    }

    fn from_document(mut document: Value) -> Result<Self, ConfigError> {
        let defaults = serde_json::to_value(Self::default())?;
        server::backfill(&mut document, &defaults);

        let translated = server::normalise(&mut document);
        if !translated.is_empty() {
            debug!(?translated, "translated session service tunables");
        }
        let ignored = server::unknown_keys(&document, &defaults);
        if !ignored.is_empty() {
            debug!(?ignored, "ignored unrecognised configuration keys");
        }

        let config: Self = serde_json::from_value(document)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every invariant the generation core relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure(self.world.tile_length > 0.0, "world.tileLength", "must be positive")?;
        ensure(self.world.num_tiles > 0, "world.numTiles", "must be at least 1")?;
        ensure(
            (0.0..24.0).contains(&self.world.sky.default_time),
            "world.sky.defaultTime",
            "must be an hour in [0, 24)",
        )?;
        ensure(
            self.zones.segment_length > 0,
            "zones.segmentLength",
            "must be at least 1",
        )?;
        ensure(
            !self.zones.sequence.is_empty(),
            "zones.sequence",
            "must name at least one zone",
        )?;
        ensure(self.lanes.max_lanes > 0, "lanes.maxLanes", "must be at least 1")?;
        ensure(self.lanes.width > 0.0, "lanes.width", "must be positive")?;
        ensure(
            (1..=self.lanes.max_lanes).contains(&self.player.initial_lane),
            "player.initialLane",
            format!("must lie within 1..={}", self.lanes.max_lanes),
        )?;
        ensure(
            self.player.speed.initial > 0.0 && self.player.speed.initial <= self.player.speed.max,
            "player.speed",
            "initial speed must be positive and not exceed max",
        )?;
        ensure(
            self.player.speed.increment >= 0.0,
            "player.speed.increment",
            "must not be negative",
        )?;
        ensure(
            self.player.speed.increment_every > 0,
            "player.speed.incrementEvery",
            "must be at least 1",
        )?;

        validate_spawn(&self.obstacles.spawn, "obstacles.spawn")?;
        validate_spawn(&self.traffic.spawn, "traffic.spawn")?;
        validate_spawn(&self.collectibles.spawn, "collectibles.spawn")?;
        validate_spawn(&self.lights.spawn, "lights.spawn")?;
        validate_spawn(&self.dates.spawn, "dates.spawn")?;
        ensure(
            (0.0..=24.0).contains(&self.dates.start_hour)
                && (0.0..=24.0).contains(&self.dates.end_hour),
            "dates",
            "window hours must lie within [0, 24]",
        )?;
        ensure(
            self.player.nitro.watermelon_threshold > 0,
            "player.nitro.watermelonThreshold",
            "must be at least 1",
        )?;
        ensure(
            self.player.nitro.speed_boost >= 0.0,
            "player.nitro.speedBoost",
            "must not be negative",
        )?;
        ensure(
            self.obstacles.min_interval > 0
                && self.obstacles.min_interval <= self.obstacles.spawn.interval,
            "obstacles.minIntervalTiles",
            "must be at least 1 and not exceed the initial interval",
        )?;
        ensure(
            self.obstacles.ramp_length > 0,
            "obstacles.rampLength",
            "must be at least 1",
        )?;
        ensure(
            self.decorations.interval > 0,
            "decorations.intervalTiles",
            "must be at least 1",
        )?;

        validate_scatter(&self.buildings, "buildings")?;
        validate_scatter(&self.zones.nature, "zones.nature")?;
        validate_scatter(&self.zones.bridge.boats, "zones.bridge.boats")?;

        ensure(
            self.sync.broadcast_interval_ms > 0,
            "sync.broadcastIntervalMs",
            "must be positive",
        )?;
        ensure(
            self.sync.stale_after_ms > 0,
            "sync.staleAfterMs",
            "must be positive",
        )?;
        Ok(())
    }

    /// Lane layout derived from the lane section.
    #[must_use]
    pub fn lane_layout(&self) -> LaneLayout {
        LaneLayout::new(self.lanes.max_lanes, self.lanes.width)
    }

    /// Starting lane used when the lobby did not assign one.
    #[must_use]
    pub fn initial_lane(&self) -> LaneIndex {
        LaneIndex::new(self.player.initial_lane)
    }
}

fn ensure(
    condition: bool,
    field: &'static str,
    reason: impl Into<String>,
) -> Result<(), ConfigError> {
    if condition {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: reason.into(),
        })
    }
}

fn validate_spawn(tuning: &SpawnTuning, field: &'static str) -> Result<(), ConfigError> {
    ensure(tuning.interval > 0, field, "interval must be at least 1")?;
    ensure(
        (0.0..=1.0).contains(&tuning.chance),
        field,
        "chance must lie within [0, 1]",
    )
}

fn validate_scatter(scatter: &ScatterConfig, field: &'static str) -> Result<(), ConfigError> {
    ensure(
        (0.0..=1.0).contains(&scatter.density),
        field,
        "density must lie within [0, 1]",
    )?;
    ensure(
        scatter.offset >= 0.0 && scatter.offset_variance >= 0.0,
        field,
        "offsets must not be negative",
    )?;
    ensure(
        scatter.scale.min > 0.0 && scatter.scale.min <= scatter.scale.max,
        field,
        "scale range must be positive and ordered",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_are_valid() {
        GameConfig::default().validate().expect("defaults validate");
    }

    #[test]
    fn overrides_merge_sections_one_level_deep() {
        let base = GameConfig::default();
        let merged = base
            .with_overrides(&json!({
                "lanes": { "maxLanes": 5 },
                "world": { "seed": "3f2a-lobby" },
            }))
            .expect("merge");

        assert_eq!(merged.lanes.max_lanes, 5);
        assert!((merged.lanes.width - base.lanes.width).abs() < f32::EPSILON);
        assert_eq!(merged.world.seed, "3f2a-lobby");
        assert_eq!(merged.world.num_tiles, base.world.num_tiles);
        assert_eq!(base.lanes.max_lanes, 3, "base snapshot must stay untouched");
    }

    #[test]
    fn partial_nested_objects_fall_back_to_section_defaults() {
        let merged = GameConfig::default()
            .with_overrides(&json!({
                "player": { "speed": { "max": 80.0 } },
                "obstacles": { "spawn": { "chance": 0.3 } },
            }))
            .expect("merge");
        assert!((merged.player.speed.max - 80.0).abs() < f32::EPSILON);
        assert!(
            (merged.player.speed.initial - SpeedConfig::default().initial).abs() < f32::EPSILON
        );

        let defaults = ObstacleConfig::default();
        assert_eq!(merged.obstacles.spawn.interval, defaults.spawn.interval);
        assert_eq!(merged.obstacles.spawn.distance, defaults.spawn.distance);
        assert_eq!(merged.obstacles.spawn.chance, 0.3);
        assert_ne!(merged.obstacles.spawn.interval, SpawnTuning::default().interval);
    }

    #[test]
    fn session_service_tunables_are_translated_into_tiles() {
        // Sections exactly as the session service ships them in `game_start`.
        let merged = GameConfig::default()
            .with_overrides(&json!({
                "player": {
                    "scale": 2.2,
                    "speed": { "initial": 20, "increment": 0.5, "max": 50 },
                    "initialLane": 2,
                    "nitro": {
                        "duration": 4000,
                        "speedBoost": 40,
                        "flyHeight": 5,
                        "watermelonThreshold": 3
                    },
                    "scoreMultiplier": 0.2
                },
                "buildings": { "offset": 30, "scale": { "min": 12, "max": 22 }, "spawnChance": 0.5 },
                "lights": { "offset": 8, "scale": 10, "spawnChance": 0.3, "spawnInterval": 100 },
                "obstacles": {
                    "scale": 2.2,
                    "spawnDistance": -250,
                    "spawn": { "initialDelay": 2500, "minDelay": 1000, "decreaseFactor": 40 }
                },
                "collectibles": {
                    "scale": 3,
                    "spawn": { "interval": 1000, "chance": 0.1 },
                    "points": 100
                },
                "dates": {
                    "spawn": { "interval": 800, "chance": 0.15 },
                    "points": 50,
                    "target": 10,
                    "startHour": 6,
                    "endHour": 22
                },
            }))
            .expect("merge");

        // 2500 ms at 20 units/s over 30 unit tiles is 1.67 tiles.
        assert_eq!(merged.obstacles.spawn.interval, 2);
        assert_eq!(merged.obstacles.min_interval, 1);
        assert_eq!(merged.obstacles.decrease, 1);
        assert_eq!(merged.obstacles.spawn.chance, ObstacleConfig::default().spawn.chance);
        assert_eq!(merged.obstacles.ramp_length, ObstacleConfig::default().ramp_length);

        assert_eq!(merged.collectibles.spawn.interval, 1);
        assert_eq!(merged.collectibles.spawn.chance, 0.1);
        assert_eq!(
            merged.collectibles.spawn.distance,
            CollectibleConfig::default().spawn.distance
        );

        assert_eq!(merged.lights.spawn.interval, 3);
        assert_eq!(merged.lights.spawn.chance, 0.3);
        assert_eq!(merged.buildings.density, 0.5);

        assert_eq!(merged.dates.spawn.interval, 1);
        assert_eq!(merged.dates.spawn.chance, 0.15);
        assert!(merged.dates.is_open(6.0) && !merged.dates.is_open(22.0));

        assert_eq!(merged.player.nitro.duration(), Duration::from_secs(4));
        assert_eq!(merged.player.nitro.watermelon_threshold, 3);
        assert!((merged.player.nitro.speed_boost - 40.0).abs() < f32::EPSILON);
    }

    #[test]
    fn date_window_may_span_midnight() {
        let window = DateConfig {
            start_hour: 22.0,
            end_hour: 4.0,
            ..DateConfig::default()
        };
        assert!(window.is_open(23.5));
        assert!(window.is_open(1.0));
        assert!(!window.is_open(4.0));
        assert!(!window.is_open(12.0));

        let defaults = DateConfig::default();
        assert!(defaults.is_open(1.0) && defaults.is_open(23.9));
        assert!(!defaults.is_open(0.5));
    }

    #[test]
    fn arrays_overwrite_wholesale() {
        let merged = GameConfig::default()
            .with_overrides(&json!({ "zones": { "sequence": ["bridge", "nature"] } }))
            .expect("merge");
        assert_eq!(merged.zones.sequence, vec![Zone::Bridge, Zone::Nature]);
        assert_eq!(merged.zones.segment_length, 40);
    }

    #[test]
    fn unknown_server_keys_are_ignored() {
        let merged = GameConfig::default()
            .with_overrides(&json!({ "is_multiplayer": true, "menus": { "start": {} } }))
            .expect("merge");
        assert_eq!(merged, GameConfig::default());
    }

    #[test]
    fn invalid_overrides_are_rejected() {
        let error = GameConfig::default()
            .with_overrides(&json!({ "lanes": { "maxLanes": 0 } }))
            .expect_err("zero lanes");
        assert!(matches!(
            error,
            ConfigError::Invalid {
                field: "lanes.maxLanes",
                ..
            }
        ));

        assert!(matches!(
            GameConfig::default().with_overrides(&json!([1, 2])),
            Err(ConfigError::OverridesNotObject)
        ));
    }

    #[test]
    fn initial_lane_must_fit_lane_count() {
        let mut config = GameConfig::default();
        config.player.initial_lane = 4;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "player.initialLane",
                ..
            })
        ));
    }

    #[test]
    fn toml_documents_override_defaults() {
        let config = GameConfig::from_toml_str(
            r#"
                [zones]
                segmentLength = 25
                sequence = ["city", "bridge"]

                [sync]
                staleAfterMs = 1500
            "#,
        )
        .expect("parse");
        assert_eq!(config.zones.segment_length, 25);
        assert_eq!(config.zones.sequence, vec![Zone::City, Zone::Bridge]);
        assert_eq!(config.sync.stale_after(), Duration::from_millis(1_500));
        assert_eq!(config.sync.broadcast_interval(), Duration::from_millis(100));
    }

    #[test]
    fn toml_with_negative_segment_length_is_rejected() {
        assert!(matches!(
            GameConfig::from_toml_str("[zones]\nsegmentLength = -4\n"),
            Err(ConfigError::Json(_))
        ));
        assert!(matches!(
            GameConfig::from_toml_str("[zones\n"),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn partial_toml_tables_keep_section_defaults() {
        let config = GameConfig::from_toml_str(
            r#"
                [traffic.spawn]
                chance = 0.1
            "#,
        )
        .expect("parse");
        assert_eq!(config.traffic.spawn.chance, 0.1);
        assert_eq!(config.traffic.spawn.interval, TrafficConfig::default().spawn.interval);
        assert_eq!(config.traffic.spawn.distance, TrafficConfig::default().spawn.distance);
    }
}
