//! Pure per-slot spawn decisions.

use dash_runner_config::{AssetCatalog, GameConfig, ScatterConfig, SpawnTuning};
use dash_runner_core::{
    LaneIndex, Placement, RoadSide, SeededHashRng, SessionSeed, Spawn, SpawnCategory, TrackIndex,
    Zone,
};
use dash_runner_system_zones::ZoneSequencer;

/// Resolved tunables for one category at one position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SlotTuning {
    /// Spacing between candidate slots around the position.
    pub interval: u64,
    /// Probability that a candidate slot spawns.
    pub chance: f64,
    /// Look-ahead distance in tiles.
    pub distance: u64,
}

/// Decides, for any category and track position, whether and what spawns.
///
/// Every decision draws from a generator seeded with the session seed, the
/// category tag and the position, so decisions are idempotent and independent
/// of evaluation order.
#[derive(Clone, Debug)]
pub struct SpawnPolicy {
    zones: ZoneSequencer,
    config: GameConfig,
    catalog: AssetCatalog,
}

impl SpawnPolicy {
    /// Creates a policy for `seed` from a validated configuration snapshot.
    #[must_use]
    pub fn new(seed: SessionSeed, config: &GameConfig, catalog: &AssetCatalog) -> Self {
        Self {
            zones: ZoneSequencer::new(seed, config),
            config: config.clone(),
            catalog: catalog.clone(),
        }
    }

    /// Zone sequencer shared with the policy.
    #[must_use]
    pub fn zones(&self) -> &ZoneSequencer {
        &self.zones
    }

    /// Obstacle spacing at `position`; never increases further down the track.
    #[must_use]
    pub fn obstacle_interval(&self, position: TrackIndex) -> u64 {
        let obstacles = &self.config.obstacles;
        let stage = position.get() / obstacles.ramp_length;
        obstacles
            .spawn
            .interval
            .saturating_sub(stage.saturating_mul(obstacles.decrease))
            .max(obstacles.min_interval)
    }

    /// Tunables of `category` at `position`.
    #[must_use]
    pub fn tuning(&self, category: SpawnCategory, position: TrackIndex) -> SlotTuning {
        let config = &self.config;
        match category {
            SpawnCategory::Obstacle => SlotTuning {
                interval: self.obstacle_interval(position),
                chance: config.obstacles.spawn.chance,
                distance: config.obstacles.spawn.distance,
            },
            SpawnCategory::Collectible => slot(&config.collectibles.spawn),
            SpawnCategory::Date => slot(&config.dates.spawn),
            SpawnCategory::Traffic => slot(&config.traffic.spawn),
            SpawnCategory::Light => slot(&config.lights.spawn),
            SpawnCategory::Decoration => SlotTuning {
                interval: config.decorations.interval,
                chance: self.scatter(self.zones.zone_at(position)).density,
                distance: config.decorations.distance,
            },
        }
    }

    /// Whether `position` is a candidate slot for `category`.
    #[must_use]
    pub fn is_candidate(&self, category: SpawnCategory, position: TrackIndex) -> bool {
        let index = position.get();
        if category.occupies_lane() && index == 0 {
            return false;
        }
        match category {
            SpawnCategory::Obstacle => {
                let ramp_length = self.config.obstacles.ramp_length;
                let stage_start = index / ramp_length * ramp_length;
                (index - stage_start) % self.obstacle_interval(position) == 0
            }
            _ => index % self.tuning(category, position).interval == 0,
        }
    }

    /// Spawn decision for `category` at `position`, or `None` when nothing spawns.
    #[must_use]
    pub fn decide(&self, category: SpawnCategory, position: TrackIndex) -> Option<Spawn> {
        if !self.is_candidate(category, position) {
            return None;
        }

        let zone = self.zones.zone_at(position);
        if category == SpawnCategory::Decoration
            && self
                .zones
                .in_transition(position, self.config.zones.zone_transition_gap)
        {
            return None;
        }

        let tuning = self.tuning(category, position);
        let mut rng = self.slot_rng(category, position);
        if !rng.chance(tuning.chance) {
            return None;
        }

        let variant = rng.pick_index(self.catalog.variants(category, zone).len())?;
        let placement = self.place(category, zone, &mut rng);
        let spawn = Spawn {
            category,
            position,
            zone,
            variant,
            placement,
        };

        if self.yields(&spawn) {
            return None;
        }
        Some(spawn)
    }

    /// Every spawn at `position`, in [`SpawnCategory::ALL`] order.
    #[must_use]
    pub fn decide_all(&self, position: TrackIndex) -> Vec<Spawn> {
        SpawnCategory::ALL
            .into_iter()
            .filter_map(|category| self.decide(category, position))
            .collect()
    }

    fn slot_rng(&self, category: SpawnCategory, position: TrackIndex) -> SeededHashRng {
        let key = self
            .zones
            .seed()
            .with_suffix(format_args!(":{}:{}", category.tag(), position.get()));
        SeededHashRng::new(&key)
    }

    fn place(&self, category: SpawnCategory, zone: Zone, rng: &mut SeededHashRng) -> Placement {
        match category {
            SpawnCategory::Obstacle
            | SpawnCategory::Collectible
            | SpawnCategory::Date
            | SpawnCategory::Traffic => {
                let max_lanes = i64::from(self.config.lanes.max_lanes);
                let lane = rng.range_int(1, max_lanes + 1).clamp(1, max_lanes);
                Placement::Lane(LaneIndex::new(lane as u32))
            }
            SpawnCategory::Light => Placement::Roadside {
                side: side(rng),
                lateral_offset: self.config.lights.offset,
                scale: self.config.lights.scale,
            },
            SpawnCategory::Decoration => {
                let scatter = self.scatter(zone);
                let side = side(rng);
                let lateral_offset = scatter.offset
                    + rng.range(0.0, f64::from(scatter.offset_variance)) as f32;
                let scale =
                    rng.range(f64::from(scatter.scale.min), f64::from(scatter.scale.max)) as f32;
                Placement::Roadside {
                    side,
                    lateral_offset,
                    scale,
                }
            }
        }
    }

    /// Lane content gives way so that a row is never fully blocked and pickups
    /// never sit on top of hazards.
    fn yields(&self, spawn: &Spawn) -> bool {
        match spawn.category {
            SpawnCategory::Traffic => self
                .decide(SpawnCategory::Obstacle, spawn.position)
                .is_some(),
            SpawnCategory::Collectible | SpawnCategory::Date => {
                [SpawnCategory::Obstacle, SpawnCategory::Traffic]
                    .into_iter()
                    .filter_map(|hazard| self.decide(hazard, spawn.position))
                    .any(|hazard| hazard.placement == spawn.placement)
            }
            _ => false,
        }
    }

    fn scatter(&self, zone: Zone) -> &ScatterConfig {
        match zone {
            Zone::Bridge => &self.config.zones.bridge.boats,
            Zone::Nature => &self.config.zones.nature,
            Zone::City | Zone::Suburbs | Zone::Industrial => &self.config.buildings,
        }
    }
}

fn slot(tuning: &SpawnTuning) -> SlotTuning {
    SlotTuning {
        interval: tuning.interval,
        chance: tuning.chance,
        distance: tuning.distance,
    }
}

fn side(rng: &mut SeededHashRng) -> RoadSide {
    if rng.chance(0.5) {
        RoadSide::Left
    } else {
        RoadSide::Right
    }
}
