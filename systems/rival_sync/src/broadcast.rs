use std::time::Duration;

use dash_runner_config::GameConfig;
use dash_runner_core::{
    protocol::{NitroTrigger, PeerMessage, PlayerUpdate},
    CenteredLane, VehicleVariant,
};

/// State of the local player offered for broadcast.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocalSample {
    /// Centred lane of the local player.
    pub lane: CenteredLane,
    /// Distance travelled.
    pub distance: f64,
    /// Vehicle driven.
    pub vehicle: VehicleVariant,
    /// Local clock in milliseconds.
    pub timestamp: u64,
}

/// Throttles outgoing position samples to the configured cadence.
#[derive(Debug)]
pub struct Broadcaster {
    interval: Duration,
    since_last: Option<Duration>,
}

impl Broadcaster {
    /// Creates a broadcaster using the sync cadence of `config`.
    #[must_use]
    pub fn new(config: &GameConfig) -> Self {
        Self {
            interval: config.sync.broadcast_interval(),
            since_last: None,
        }
    }

    /// Advances by `dt` and returns an update when one is due.
    ///
    /// The first poll always broadcasts. Afterwards at most one update is
    /// emitted per interval; a long frame never produces a burst.
    pub fn poll(&mut self, dt: Duration, sample: LocalSample) -> Option<PeerMessage> {
        if let Some(since) = self.since_last.map(|since| since.saturating_add(dt)) {
            if since < self.interval {
                self.since_last = Some(since);
                return None;
            }
        }

        self.since_last = Some(Duration::ZERO);
        Some(PeerMessage::PlayerUpdate(PlayerUpdate {
            user_id: None,
            lane: sample.lane,
            distance: sample.distance,
            car_index: sample.vehicle,
            timestamp: sample.timestamp,
        }))
    }

    /// Announcement of the local player's `trigger`-th nitro.
    ///
    /// Triggers go out immediately, outside the position cadence; the relay
    /// stamps the sender before fanning the message out.
    #[must_use]
    pub const fn nitro(trigger: u64) -> PeerMessage {
        PeerMessage::Nitro(NitroTrigger {
            user_id: None,
            trigger,
        })
    }
}
