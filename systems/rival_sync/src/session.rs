use dash_runner_config::{ConfigError, GameConfig};
use dash_runner_core::{protocol::GameStart, LaneIndex, PeerId, SessionSeed};
use tracing::{info, warn};

/// Everything a client needs to begin a race announced by `game_start`.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionPlan {
    /// Shared seed of the race.
    pub seed: SessionSeed,
    /// Snapshot with the server overrides applied.
    pub config: GameConfig,
    /// Lane the local player starts in.
    pub initial_lane: LaneIndex,
    /// Other participants of the race.
    pub rivals: Vec<PeerId>,
    /// Race identifier used for score submission, when the server assigned one.
    pub race_id: Option<u64>,
}

impl SessionPlan {
    /// Resolves a `game_start` message for the `local` peer against `base`.
    ///
    /// Server overrides produce a new snapshot; `base` is left untouched. The
    /// local lane assignment falls back to the configured initial lane when it
    /// is missing or outside the road.
    pub fn from_game_start(
        start: &GameStart,
        local: PeerId,
        base: &GameConfig,
    ) -> Result<Self, ConfigError> {
        let config = match &start.config {
            Some(overrides) => base.with_overrides(overrides)?,
            None => base.clone(),
        };

        let max_lanes = config.lanes.max_lanes;
        let initial_lane = match start.lane_for(local) {
            Some(lane) if (1..=max_lanes).contains(&lane.get()) => lane,
            Some(lane) => {
                warn!(
                    lane = lane.get(),
                    max_lanes, "assigned lane outside the road, using configured lane"
                );
                config.initial_lane()
            }
            None => config.initial_lane(),
        };

        let rivals: Vec<PeerId> = start.roster().filter(|peer| *peer != local).collect();
        info!(
            seed = %start.seed,
            race_id = start.race_id,
            rivals = rivals.len(),
            lane = initial_lane.get(),
            "resolved race start"
        );

        Ok(Self {
            seed: start.seed.clone(),
            config,
            initial_lane,
            rivals,
            race_id: start.race_id,
        })
    }
}
