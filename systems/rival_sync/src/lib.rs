#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Rival roster maintained from peer position samples.
//!
//! Network callbacks never touch the roster directly. They push raw messages
//! into an [`InboxSender`]; the simulation loop drains the matching [`Inbox`]
//! once per tick through [`RivalSync::pump`]. Deterministic generation state is
//! never reachable from here, only the rival mapping is.
//!
//! Nitro triggers are numbered per peer. A rival boosts for the configured
//! nitro duration after each trigger higher than the last one it sent.

use std::{collections::BTreeMap, time::Duration};

use crossbeam_channel::{Receiver, Sender, TryIter};
use dash_runner_config::GameConfig;
use dash_runner_core::{
    protocol::{GameStart, LobbyPlayer, NitroTrigger, PeerMessage, PlayerUpdate},
    CenteredLane, LaneLayout, PeerId, VehicleVariant,
};
use tracing::{debug, info};

mod broadcast;
mod session;

pub use broadcast::{Broadcaster, LocalSample};
pub use session::SessionPlan;

/// Creates a connected inbox pair for handing raw peer messages to the tick loop.
#[must_use]
pub fn inbox() -> (InboxSender, Inbox) {
    let (sender, receiver) = crossbeam_channel::unbounded();
    (InboxSender { sender }, Inbox { receiver })
}

/// Cloneable handle the network layer uses to deliver raw messages.
#[derive(Clone, Debug)]
pub struct InboxSender {
    sender: Sender<String>,
}

impl InboxSender {
    /// Queues a raw message; returns `false` once the tick loop has gone away.
    pub fn deliver(&self, raw: impl Into<String>) -> bool {
        self.sender.send(raw.into()).is_ok()
    }
}

/// Receiving half drained by the simulation loop.
#[derive(Debug)]
pub struct Inbox {
    receiver: Receiver<String>,
}

impl Inbox {
    fn drain(&self) -> TryIter<'_, String> {
        self.receiver.try_iter()
    }
}

/// One position sample received from a peer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    /// Centred lane reported by the peer.
    pub lane: CenteredLane,
    /// Track distance reported by the peer.
    pub distance: f64,
    /// Peer clock in milliseconds when the sample was taken.
    pub timestamp: u64,
    /// Local clock when the sample was accepted.
    pub received_at: Duration,
}

/// Interpolated rival position for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RivalPose {
    /// Peer the pose belongs to.
    pub peer: PeerId,
    /// Vehicle the peer drives.
    pub vehicle: VehicleVariant,
    /// Possibly fractional centred lane.
    pub lane: f32,
    /// Track distance.
    pub distance: f64,
    /// Whether the rival's nitro is burning.
    pub boosted: bool,
}

/// Ephemeral record of a remote player.
#[derive(Clone, Debug, PartialEq)]
pub struct Rival {
    peer: PeerId,
    vehicle: VehicleVariant,
    previous: Option<Sample>,
    latest: Sample,
    nitro_trigger: u64,
    boost_until: Option<Duration>,
}

impl Rival {
    fn new(peer: PeerId, vehicle: VehicleVariant, sample: Sample) -> Self {
        Self {
            peer,
            vehicle,
            previous: None,
            latest: sample,
            nitro_trigger: 0,
            boost_until: None,
        }
    }

    /// Peer identity.
    #[must_use]
    pub const fn peer(&self) -> PeerId {
        self.peer
    }

    /// Vehicle variant from the most recent sample.
    #[must_use]
    pub const fn vehicle(&self) -> VehicleVariant {
        self.vehicle
    }

    /// Most recent accepted sample.
    #[must_use]
    pub const fn latest(&self) -> &Sample {
        &self.latest
    }

    /// Highest nitro trigger seen from the peer.
    #[must_use]
    pub const fn nitro_trigger(&self) -> u64 {
        self.nitro_trigger
    }

    /// Whether the rival's nitro is burning at `now`.
    #[must_use]
    pub fn is_boosted(&self, now: Duration) -> bool {
        self.boost_until.is_some_and(|until| now < until)
    }

    /// Local time of the last accepted sample.
    #[must_use]
    pub const fn last_update(&self) -> Duration {
        self.latest.received_at
    }

    /// Whether the rival has been silent for longer than `stale_after` at `now`.
    #[must_use]
    pub fn is_stale(&self, now: Duration, stale_after: Duration) -> bool {
        now.saturating_sub(self.latest.received_at) > stale_after
    }

    /// Position between the previous and the latest sample.
    ///
    /// The blend factor is the local time elapsed since the latest sample
    /// divided by the peer-side spacing of the two samples, clamped to
    /// `[0, 1]`, so rivals trail their reports by one sample and never
    /// extrapolate past the newest one.
    #[must_use]
    pub fn pose(&self, now: Duration) -> RivalPose {
        let latest = self.latest;
        let (lane, distance) = match self.previous {
            Some(previous) if latest.timestamp > previous.timestamp => {
                let span = Duration::from_millis(latest.timestamp - previous.timestamp);
                let elapsed = now.saturating_sub(latest.received_at);
                let t = (elapsed.as_secs_f64() / span.as_secs_f64()).clamp(0.0, 1.0);
                (
                    previous.lane.get() + (latest.lane.get() - previous.lane.get()) * t as f32,
                    previous.distance + (latest.distance - previous.distance) * t,
                )
            }
            _ => (latest.lane.get(), latest.distance),
        };
        RivalPose {
            peer: self.peer,
            vehicle: self.vehicle,
            lane,
            distance,
            boosted: self.is_boosted(now),
        }
    }

    fn accept(&mut self, vehicle: VehicleVariant, sample: Sample) {
        self.vehicle = vehicle;
        self.previous = Some(self.latest);
        self.latest = sample;
    }
}

/// Counters of peer messages that were discarded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DropStats {
    /// Messages that failed to decode.
    pub malformed: u64,
    /// Updates without an originating peer or with out-of-range values.
    pub invalid: u64,
    /// Echoes of the local player's own updates.
    pub own: u64,
    /// Updates older than, or as old as, the sample already held, and
    /// repeated nitro triggers.
    pub out_of_order: u64,
}

/// Session level notifications surfaced to the adapter.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionNotice {
    /// The lobby started a race.
    GameStarted(GameStart),
    /// The lobby roster changed.
    LobbyChanged(Vec<LobbyPlayer>),
}

/// Maintains the rival mapping and the local clock used for interpolation.
#[derive(Debug)]
pub struct RivalSync {
    local: PeerId,
    layout: LaneLayout,
    stale_after: Duration,
    nitro_duration: Duration,
    now: Duration,
    rivals: BTreeMap<PeerId, Rival>,
    dropped: DropStats,
}

impl RivalSync {
    /// Creates an empty roster for the local peer.
    #[must_use]
    pub fn new(local: PeerId, config: &GameConfig) -> Self {
        Self {
            local,
            layout: config.lane_layout(),
            stale_after: config.sync.stale_after(),
            nitro_duration: config.player.nitro.duration(),
            now: Duration::ZERO,
            rivals: BTreeMap::new(),
            dropped: DropStats::default(),
        }
    }

    /// Local clock.
    #[must_use]
    pub const fn now(&self) -> Duration {
        self.now
    }

    /// Counters of discarded messages.
    #[must_use]
    pub const fn dropped(&self) -> DropStats {
        self.dropped
    }

    /// Rival records ordered by peer.
    pub fn rivals(&self) -> impl Iterator<Item = &Rival> {
        self.rivals.values()
    }

    /// Rival record of `peer`, if known.
    #[must_use]
    pub fn rival(&self, peer: PeerId) -> Option<&Rival> {
        self.rivals.get(&peer)
    }

    /// Drains every queued raw message into the roster.
    pub fn pump(&mut self, inbox: &Inbox) -> Vec<SessionNotice> {
        let mut notices = Vec::new();
        for raw in inbox.drain() {
            notices.extend(self.receive(&raw));
        }
        notices
    }

    /// Decodes and applies one raw message; undecodable input is dropped.
    pub fn receive(&mut self, raw: &str) -> Option<SessionNotice> {
        match PeerMessage::decode(raw) {
            Ok(message) => self.apply(message),
            Err(error) => {
                self.dropped.malformed += 1;
                debug!(%error, "dropped malformed peer message");
                None
            }
        }
    }

    /// Applies a decoded message.
    pub fn apply(&mut self, message: PeerMessage) -> Option<SessionNotice> {
        match message {
            PeerMessage::PlayerUpdate(update) => {
                self.upsert(update);
                None
            }
            PeerMessage::PlayerDisconnected { id } => {
                if self.rivals.remove(&id).is_some() {
                    info!(peer = id.get(), "rival left the race");
                }
                None
            }
            PeerMessage::GameStart(start) => {
                self.rivals.clear();
                Some(SessionNotice::GameStarted(start))
            }
            PeerMessage::LobbyUpdate { players } => Some(SessionNotice::LobbyChanged(players)),
            PeerMessage::Nitro(trigger) => {
                self.boost(trigger);
                None
            }
        }
    }

    /// Advances the local clock and prunes rivals that went silent.
    pub fn tick(&mut self, dt: Duration) -> Vec<PeerId> {
        self.now = self.now.saturating_add(dt);
        let (now, stale_after) = (self.now, self.stale_after);
        let stale: Vec<PeerId> = self
            .rivals
            .values()
            .filter(|rival| rival.is_stale(now, stale_after))
            .map(Rival::peer)
            .collect();
        for peer in &stale {
            let _ = self.rivals.remove(peer);
            info!(peer = peer.get(), "pruned stale rival");
        }
        stale
    }

    /// Interpolated poses of every rival that is not stale, ordered by peer.
    #[must_use]
    pub fn frame(&self) -> Vec<RivalPose> {
        self.rivals
            .values()
            .filter(|rival| !rival.is_stale(self.now, self.stale_after))
            .map(|rival| rival.pose(self.now))
            .collect()
    }

    fn upsert(&mut self, update: PlayerUpdate) {
        let Some(peer) = update.user_id else {
            self.dropped.invalid += 1;
            debug!("dropped player update without originating peer");
            return;
        };
        if peer == self.local {
            self.dropped.own += 1;
            return;
        }
        if !self.in_range(update.lane) || !update.distance.is_finite() || update.distance < 0.0 {
            self.dropped.invalid += 1;
            debug!(
                peer = peer.get(),
                lane = update.lane.get(),
                distance = update.distance,
                "dropped out-of-range player update"
            );
            return;
        }

        let sample = Sample {
            lane: update.lane,
            distance: update.distance,
            timestamp: update.timestamp,
            received_at: self.now,
        };
        match self.rivals.get_mut(&peer) {
            Some(rival) if update.timestamp <= rival.latest.timestamp => {
                self.dropped.out_of_order += 1;
                debug!(
                    peer = peer.get(),
                    timestamp = update.timestamp,
                    held = rival.latest.timestamp,
                    "dropped out-of-order player update"
                );
            }
            Some(rival) => rival.accept(update.car_index, sample),
            None => {
                info!(peer = peer.get(), "rival joined the race");
                let _ = self
                    .rivals
                    .insert(peer, Rival::new(peer, update.car_index, sample));
            }
        }
    }

    fn boost(&mut self, trigger: NitroTrigger) {
        let Some(peer) = trigger.user_id else {
            self.dropped.invalid += 1;
            debug!("dropped nitro trigger without originating peer");
            return;
        };
        if peer == self.local {
            self.dropped.own += 1;
            return;
        }
        let Some(rival) = self.rivals.get_mut(&peer) else {
            self.dropped.invalid += 1;
            debug!(peer = peer.get(), "dropped nitro trigger from unknown peer");
            return;
        };
        if trigger.trigger <= rival.nitro_trigger {
            self.dropped.out_of_order += 1;
            debug!(
                peer = peer.get(),
                trigger = trigger.trigger,
                held = rival.nitro_trigger,
                "dropped repeated nitro trigger"
            );
            return;
        }
        rival.nitro_trigger = trigger.trigger;
        rival.boost_until = Some(self.now.saturating_add(self.nitro_duration));
        info!(peer = peer.get(), trigger = trigger.trigger, "rival fired nitro");
    }

    fn in_range(&self, lane: CenteredLane) -> bool {
        let edge = (self.layout.max_lanes() as f32 - 1.0) / 2.0;
        lane.get().is_finite() && lane.get().abs() <= edge
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(peer: u64, lane: f32, distance: f64, timestamp: u64) -> PeerMessage {
        PeerMessage::PlayerUpdate(PlayerUpdate {
            user_id: Some(PeerId::new(peer)),
            lane: CenteredLane::new(lane),
            distance,
            car_index: VehicleVariant::new(3),
            timestamp,
        })
    }

    fn roster() -> RivalSync {
        RivalSync::new(PeerId::new(1), &GameConfig::default())
    }

    #[test]
    fn first_update_inserts_and_later_updates_overwrite() {
        let mut sync = roster();
        assert!(sync.apply(update(2, -1.0, 10.0, 100)).is_none());
        let _ = sync.apply(update(2, 0.0, 30.0, 200));
        assert_eq!(sync.rivals().count(), 1);
        let rival = sync.rival(PeerId::new(2)).expect("rival");
        assert_eq!(rival.latest().distance, 30.0);
        assert_eq!(rival.vehicle(), VehicleVariant::new(3));
    }

    #[test]
    fn out_of_order_and_duplicate_updates_are_dropped() {
        let mut sync = roster();
        let _ = sync.apply(update(2, 0.0, 50.0, 500));
        let _ = sync.apply(update(2, 1.0, 40.0, 400));
        let _ = sync.apply(update(2, 1.0, 40.0, 500));
        assert_eq!(sync.rival(PeerId::new(2)).expect("rival").latest().distance, 50.0);
        assert_eq!(sync.dropped().out_of_order, 2);
    }

    #[test]
    fn own_and_unattributed_updates_are_ignored() {
        let mut sync = roster();
        let _ = sync.apply(update(1, 0.0, 5.0, 1));
        let _ = sync.apply(PeerMessage::PlayerUpdate(PlayerUpdate {
            user_id: None,
            lane: CenteredLane::new(0.0),
            distance: 5.0,
            car_index: VehicleVariant::new(0),
            timestamp: 1,
        }));
        assert_eq!(sync.rivals().count(), 0);
        assert_eq!(sync.dropped().own, 1);
        assert_eq!(sync.dropped().invalid, 1);
    }

    #[test]
    fn out_of_range_lanes_are_rejected() {
        let mut sync = roster();
        let _ = sync.apply(update(4, 2.0, 5.0, 1));
        let _ = sync.apply(update(4, f32::NAN, 5.0, 2));
        let _ = sync.apply(update(4, 0.5, -1.0, 3));
        assert_eq!(sync.rivals().count(), 0);
        assert_eq!(sync.dropped().invalid, 3);
    }

    #[test]
    fn malformed_text_is_counted() {
        let mut sync = roster();
        assert!(sync.receive("{not json").is_none());
        assert!(sync.receive(r#"{"type":"player_update"}"#).is_none());
        assert_eq!(sync.dropped().malformed, 2);
    }

    #[test]
    fn pose_blends_between_the_last_two_samples() {
        let mut sync = roster();
        let _ = sync.apply(update(2, -1.0, 100.0, 1_000));
        let _ = sync.tick(Duration::from_millis(100));
        let _ = sync.apply(update(2, 1.0, 200.0, 1_100));

        let start = sync.frame()[0];
        assert_eq!(start.lane, -1.0);
        assert_eq!(start.distance, 100.0);

        let _ = sync.tick(Duration::from_millis(50));
        let middle = sync.frame()[0];
        assert!((middle.lane - 0.0).abs() < 1e-6);
        assert!((middle.distance - 150.0).abs() < 1e-9);

        let _ = sync.tick(Duration::from_millis(500));
        let end = sync.frame()[0];
        assert_eq!(end.lane, 1.0);
        assert_eq!(end.distance, 200.0);
    }

    fn nitro(peer: u64, trigger: u64) -> PeerMessage {
        PeerMessage::Nitro(NitroTrigger {
            user_id: Some(PeerId::new(peer)),
            trigger,
        })
    }

    #[test]
    fn nitro_boosts_the_rival_for_its_duration() {
        let mut sync = roster();
        let _ = sync.apply(update(2, 0.0, 10.0, 100));
        assert!(!sync.frame()[0].boosted);

        let _ = sync.apply(nitro(2, 1));
        let _ = sync.tick(Duration::from_millis(100));
        let _ = sync.apply(update(2, 0.0, 80.0, 200));
        assert!(sync.frame()[0].boosted);

        let _ = sync.tick(Duration::from_millis(1_000));
        let _ = sync.apply(update(2, 0.0, 150.0, 1_200));
        let _ = sync.tick(Duration::from_secs(4));
        let _ = sync.apply(update(2, 0.0, 400.0, 5_200));
        assert!(!sync.frame()[0].boosted);
        assert_eq!(sync.rival(PeerId::new(2)).expect("rival").nitro_trigger(), 1);
    }

    #[test]
    fn repeated_or_foreign_nitro_triggers_are_dropped() {
        let mut sync = roster();
        let _ = sync.apply(nitro(3, 1));
        let _ = sync.apply(nitro(1, 1));
        let _ = sync.apply(update(2, 0.0, 10.0, 100));
        let _ = sync.apply(nitro(2, 2));
        let _ = sync.tick(Duration::from_secs(2));
        let _ = sync.apply(nitro(2, 2));
        let _ = sync.apply(nitro(2, 1));

        let rival = sync.rival(PeerId::new(2)).expect("rival");
        assert_eq!(rival.nitro_trigger(), 2);
        assert!(rival.is_boosted(sync.now()));
        assert!(!rival.is_boosted(sync.now() + Duration::from_secs(3)));
        let dropped = sync.dropped();
        assert_eq!((dropped.invalid, dropped.own, dropped.out_of_order), (1, 1, 2));
    }

    #[test]
    fn disconnect_removes_the_rival() {
        let mut sync = roster();
        let _ = sync.apply(update(2, 0.0, 1.0, 1));
        let _ = sync.apply(PeerMessage::PlayerDisconnected { id: PeerId::new(2) });
        assert!(sync.rival(PeerId::new(2)).is_none());
    }

    #[test]
    fn game_start_resets_the_roster() {
        let mut sync = roster();
        let _ = sync.apply(update(2, 0.0, 1.0, 1));
        let notice = sync.receive(r#"{"type":"game_start","seed":"abc"}"#);
        assert!(matches!(notice, Some(SessionNotice::GameStarted(_))));
        assert_eq!(sync.rivals().count(), 0);
    }
}
