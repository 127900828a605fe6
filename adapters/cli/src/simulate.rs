//! Headless multi-peer race driven through the rendering contract.

use std::{cell::RefCell, rc::Rc, time::Duration};

use anyhow::{Context, Result};
use chrono::{Local, Timelike};
use dash_runner_config::{AssetCatalog, GameConfig};
use dash_runner_core::{
    protocol::{GameStart, PeerMessage},
    CenteredLane, Command, Event, LaneDirection, LaneIndex, PeerId, Placement, SessionSeed,
    TrackIndex, VehicleVariant,
};
use dash_runner_rendering::{Presentation, RenderingBackend, Scene};
use dash_runner_system_rival_sync::{
    inbox, Broadcaster, Inbox, InboxSender, LocalSample, RivalSync, SessionNotice, SessionPlan,
};
use dash_runner_system_spawning::Spawning;
use dash_runner_world::{self as world, query, World};
use tracing::{debug, info, warn};

/// Tiles ahead the autopilot inspects before committing to a lane.
const LOOKAHEAD: u64 = 2;

/// Runs a fixed number of frames without a window.
#[derive(Debug)]
pub(crate) struct HeadlessBackend {
    frames: u64,
    dt: Duration,
}

impl HeadlessBackend {
    pub(crate) fn new(frames: u64, dt: Duration) -> Self {
        Self { frames, dt }
    }
}

impl RenderingBackend for HeadlessBackend {
    fn run<F>(self, presentation: Presentation, mut update_scene: F) -> Result<()>
    where
        F: FnMut(Duration, &mut Scene) -> bool + 'static,
    {
        info!(
            title = %presentation.window_title,
            preload = presentation.preload.len(),
            frames = self.frames,
            "headless backend started"
        );
        let mut scene = presentation.scene;
        for frame in 0..self.frames {
            if !update_scene(self.dt, &mut scene) {
                debug!(frame, "scene update requested exit");
                break;
            }
        }
        info!(
            score = scene.score,
            rivals = scene.rivals.len(),
            props = scene.props.len(),
            "headless backend finished"
        );
        Ok(())
    }
}

/// Final state of one simulated client.
#[derive(Clone, Debug)]
pub(crate) struct PeerSummary {
    pub(crate) peer: PeerId,
    pub(crate) track_index: TrackIndex,
    pub(crate) distance: f64,
    pub(crate) score: u64,
    pub(crate) crashed: bool,
    pub(crate) rivals_visible: usize,
    pub(crate) dropped: u64,
}

struct Client {
    id: PeerId,
    vehicle: VehicleVariant,
    config: GameConfig,
    world: World,
    spawning: Spawning,
    sync: RivalSync,
    broadcaster: Broadcaster,
    inbox: Inbox,
    pending: Vec<Command>,
    clock_ms: u64,
}

impl Client {
    fn new(id: PeerId, vehicle: VehicleVariant, config: &GameConfig, inbox: Inbox) -> Self {
        Self {
            id,
            vehicle,
            config: config.clone(),
            world: World::new(config.clone()),
            spawning: Spawning::new(config.clone(), AssetCatalog::default()),
            sync: RivalSync::new(id, config),
            broadcaster: Broadcaster::new(config),
            inbox,
            pending: Vec::new(),
            clock_ms: 0,
        }
    }

    fn begin(
        &mut self,
        start: &GameStart,
        catalog: &AssetCatalog,
        hour: Option<f32>,
    ) -> Result<()> {
        let plan = SessionPlan::from_game_start(start, self.id, &self.config)
            .with_context(|| format!("peer {} rejected game_start", self.id.get()))?;

        self.world = World::new(plan.config.clone());
        self.spawning = Spawning::new(plan.config.clone(), catalog.clone());
        self.sync = RivalSync::new(self.id, &plan.config);
        self.broadcaster = Broadcaster::new(&plan.config);
        self.pending.push(Command::StartSession {
            seed: plan.seed,
            local_peer: self.id,
            vehicle: self.vehicle,
            initial_lane: plan.initial_lane,
        });
        if let Some(hour) = hour {
            self.pending.push(Command::SetTimeOfDay { hour });
        }
        Ok(())
    }

    fn step(
        &mut self,
        dt: Duration,
        catalog: &AssetCatalog,
        hour: Option<f32>,
    ) -> Result<Vec<PeerMessage>> {
        for notice in self.sync.pump(&self.inbox) {
            match notice {
                SessionNotice::GameStarted(start) => self.begin(&start, catalog, hour)?,
                SessionNotice::LobbyChanged(players) => {
                    debug!(peer = self.id.get(), players = players.len(), "lobby changed");
                }
            }
        }
        let _ = self.sync.tick(dt);

        if let Some(direction) = steer(&self.world) {
            self.pending.push(Command::ChangeLane { direction });
        }
        self.pending.push(Command::Tick { dt });

        let mut events = Vec::new();
        for command in self.pending.drain(..) {
            world::apply(&mut self.world, command, &mut events);
        }
        let mut commands = Vec::new();
        self.spawning.handle(&events, &mut commands);
        for command in commands {
            world::apply(&mut self.world, command, &mut events);
        }

        self.clock_ms = self
            .clock_ms
            .saturating_add(u64::try_from(dt.as_millis()).unwrap_or(u64::MAX));
        if query::seed(&self.world).is_none() {
            return Ok(Vec::new());
        }
        let mut outgoing: Vec<PeerMessage> = self
            .broadcaster
            .poll(
                dt,
                LocalSample {
                    lane: query::lane(&self.world),
                    distance: query::distance(&self.world),
                    vehicle: self.vehicle,
                    timestamp: self.clock_ms,
                },
            )
            .into_iter()
            .collect();
        outgoing.extend(events.iter().filter_map(|event| match event {
            Event::NitroStarted { trigger, .. } => Some(Broadcaster::nitro(*trigger)),
            _ => None,
        }));
        Ok(outgoing)
    }

    fn summary(&self) -> PeerSummary {
        let dropped = self.sync.dropped();
        PeerSummary {
            peer: self.id,
            track_index: query::track_index(&self.world),
            distance: query::distance(&self.world),
            score: query::score(&self.world),
            crashed: query::is_crashed(&self.world),
            rivals_visible: self.sync.frame().len(),
            dropped: dropped.malformed + dropped.invalid + dropped.own + dropped.out_of_order,
        }
    }
}

/// Picks a lane change when a hazard sits in the current lane just ahead.
fn steer(world: &World) -> Option<LaneDirection> {
    if query::seed(world).is_none() || query::is_crashed(world) {
        return None;
    }
    let layout = query::lane_layout(world);
    let head = query::track_index(world).get();
    let blocked = |lane: CenteredLane| {
        query::placements(world).any(|spawn| {
            let ahead = spawn.position.get() > head && spawn.position.get() <= head + LOOKAHEAD;
            let in_lane = matches!(
                spawn.placement,
                Placement::Lane(slot) if layout.centered(slot) == lane
            );
            ahead && in_lane && spawn.category.is_hazard()
        })
    };

    let lane = query::lane(world);
    if !blocked(lane) {
        return None;
    }
    [LaneDirection::Left, LaneDirection::Right]
        .into_iter()
        .find(|direction| {
            let next = layout.shift(lane, *direction);
            next != lane && !blocked(next)
        })
}

/// Every client of one simulated race plus the relay between them.
pub(crate) struct Race {
    clients: Vec<Client>,
    relay: Vec<(PeerId, InboxSender)>,
    catalog: AssetCatalog,
    hour: Option<f32>,
}

impl Race {
    /// Creates `peers` clients and queues the lobby's `game_start` for each.
    pub(crate) fn new(
        config: &GameConfig,
        overrides: Option<serde_json::Value>,
        seed: SessionSeed,
        peers: u64,
    ) -> Result<Self> {
        let max_lanes = u64::from(config.lanes.max_lanes.max(1));
        let start = GameStart {
            seed,
            lane_assignments: (1..=peers)
                .map(|peer| (peer.to_string(), LaneIndex::new(((peer - 1) % max_lanes + 1) as u32)))
                .collect(),
            config: overrides,
            race_id: Some(1),
        };
        let announcement = PeerMessage::GameStart(start)
            .encode()
            .context("failed to encode game_start")?;

        let hour = config.world.sky.dynamic.then(wall_clock_hour);
        let catalog = AssetCatalog::default();
        let vehicles = catalog.cars.len().max(1) as u64;
        let mut clients = Vec::new();
        let mut relay = Vec::new();
        for peer in 1..=peers {
            let id = PeerId::new(peer);
            let (sender, receiver) = inbox();
            if !sender.deliver(announcement.as_str()) {
                warn!(peer, "inbox closed before the race started");
            }
            relay.push((id, sender));
            let vehicle = VehicleVariant::new(((peer - 1) % vehicles) as u32);
            clients.push(Client::new(id, vehicle, config, receiver));
        }

        Ok(Self {
            clients,
            relay,
            catalog,
            hour,
        })
    }

    /// Steps every client once and relays their broadcasts.
    pub(crate) fn step(&mut self, dt: Duration) -> Result<()> {
        let mut outbound = Vec::new();
        for client in &mut self.clients {
            for message in client.step(dt, &self.catalog, self.hour)? {
                let stamped = match message {
                    PeerMessage::PlayerUpdate(mut update) => {
                        update.user_id = Some(client.id);
                        PeerMessage::PlayerUpdate(update)
                    }
                    PeerMessage::Nitro(mut trigger) => {
                        trigger.user_id = Some(client.id);
                        PeerMessage::Nitro(trigger)
                    }
                    other => other,
                };
                outbound.push((client.id, stamped.encode()?));
            }
        }
        for (from, text) in outbound {
            for (peer, sender) in &self.relay {
                if *peer != from {
                    let _ = sender.deliver(text.as_str());
                }
            }
        }
        Ok(())
    }

    /// Scene as seen by the first client.
    pub(crate) fn scene(&self) -> Option<Scene> {
        let client = self.clients.first()?;
        Some(Scene::compose(
            &client.world,
            &client.sync.frame(),
            &self.catalog,
        ))
    }

    /// Whether every client has crashed.
    pub(crate) fn finished(&self) -> bool {
        self.clients
            .iter()
            .all(|client| query::is_crashed(&client.world))
    }

    /// Models to preload.
    pub(crate) fn preload(&self) -> Vec<String> {
        self.catalog.flatten()
    }

    /// Final state of every client.
    pub(crate) fn summaries(&self) -> Vec<PeerSummary> {
        self.clients.iter().map(Client::summary).collect()
    }
}

/// Runs `race` for `frames` frames on the headless backend.
pub(crate) fn run(race: Race, frames: u64, dt: Duration) -> Result<Vec<PeerSummary>> {
    let initial = race.scene().context("race has no clients")?;
    let presentation = Presentation::new("Dash Runner (headless)", race.preload(), initial);
    let race = Rc::new(RefCell::new(race));
    let failure: Rc<RefCell<Option<anyhow::Error>>> = Rc::new(RefCell::new(None));

    let shared = Rc::clone(&race);
    let failed = Rc::clone(&failure);
    HeadlessBackend::new(frames, dt).run(presentation, move |dt, scene| {
        let mut race = shared.borrow_mut();
        if let Err(error) = race.step(dt) {
            *failed.borrow_mut() = Some(error);
            return false;
        }
        if let Some(next) = race.scene() {
            *scene = next;
        }
        !race.finished()
    })?;

    if let Some(error) = failure.borrow_mut().take() {
        return Err(error);
    }
    let summaries = race.borrow().summaries();
    Ok(summaries)
}

/// Whole hour of the local wall clock, as browsers report it.
fn wall_clock_hour() -> f32 {
    Local::now().hour() as f32
}
