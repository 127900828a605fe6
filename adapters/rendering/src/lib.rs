#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared rendering contracts for Dash Runner adapters.
//!
//! The engine that draws a frame lives outside this workspace. Adapters
//! compose a [`Scene`] from the world and the rival roster every frame and hand
//! it to a [`RenderingBackend`]. World space uses metres with `+x` to the
//! player's right, `+y` up and the road running towards `-z`.

use std::time::Duration;

use anyhow::Result as AnyResult;
use dash_runner_config::AssetCatalog;
use dash_runner_core::{
    CenteredLane, PeerId, Placement, SkyPhase, SpawnCategory, TrackIndex, VehicleVariant, Zone,
};
use dash_runner_system_rival_sync::RivalPose;
use dash_runner_world::{query, World};
use glam::Vec3;

/// RGBA color used when presenting frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    /// Red channel intensity in the range 0.0..=1.0.
    pub red: f32,
    /// Green channel intensity in the range 0.0..=1.0.
    pub green: f32,
    /// Blue channel intensity in the range 0.0..=1.0.
    pub blue: f32,
    /// Alpha channel intensity in the range 0.0..=1.0.
    pub alpha: f32,
}

impl Color {
    /// Creates an opaque color from a packed `0xRRGGBB` value.
    #[must_use]
    pub const fn from_hex(rgb: u32) -> Self {
        Self {
            red: ((rgb >> 16) & 0xff) as f32 / 255.0,
            green: ((rgb >> 8) & 0xff) as f32 / 255.0,
            blue: (rgb & 0xff) as f32 / 255.0,
            alpha: 1.0,
        }
    }
}

/// Fog and light colors of one sky phase.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SkyPalette {
    /// Fog and clear color.
    pub fog: Color,
    /// Ambient light color.
    pub ambient: Color,
    /// Directional light color.
    pub directional: Color,
    /// Directional light intensity.
    pub intensity: f32,
}

impl SkyPalette {
    /// Palette used for `phase`.
    #[must_use]
    pub const fn for_phase(phase: SkyPhase) -> Self {
        match phase {
            SkyPhase::Day => Self {
                fog: Color::from_hex(0x87ceeb),
                ambient: Color::from_hex(0x99ccff),
                directional: Color::from_hex(0xfff5e6),
                intensity: 2.0,
            },
            SkyPhase::Sunset => Self {
                fog: Color::from_hex(0xff7b39),
                ambient: Color::from_hex(0x4a4a8a),
                directional: Color::from_hex(0xffaa33),
                intensity: 3.0,
            },
            SkyPhase::Night => Self {
                fog: Color::from_hex(0x000816),
                ambient: Color::from_hex(0x151530),
                directional: Color::from_hex(0x88aaff),
                intensity: 0.8,
            },
        }
    }
}

/// Sky state of a frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SkyPresentation {
    /// Hour of day in `[0, 24)`.
    pub hour: f32,
    /// Phase derived from the hour.
    pub phase: SkyPhase,
    /// Colors of the phase.
    pub palette: SkyPalette,
}

/// One visible road tile.
#[derive(Clone, Debug, PartialEq)]
pub struct RoadTile {
    /// Track index of the tile.
    pub index: TrackIndex,
    /// Zone the tile belongs to.
    pub zone: Zone,
    /// Near edge of the tile on the road centre line.
    pub origin: Vec3,
    /// Road surface model.
    pub road_model: String,
    /// Ground model under the road.
    pub ground_model: String,
}

/// Generated content positioned in world space.
#[derive(Clone, Debug, PartialEq)]
pub struct PropPresentation {
    /// Category of the content.
    pub category: SpawnCategory,
    /// Model to instantiate.
    pub model: String,
    /// World-space translation.
    pub translation: Vec3,
    /// Uniform scale.
    pub scale: f32,
}

/// A vehicle on the road, local or remote.
#[derive(Clone, Debug, PartialEq)]
pub struct VehiclePresentation {
    /// Remote peer driving the vehicle, `None` for the local player.
    pub peer: Option<PeerId>,
    /// Vehicle model.
    pub model: String,
    /// World-space translation.
    pub translation: Vec3,
    /// Whether the nitro is burning.
    pub boosted: bool,
}

/// Everything the engine needs to draw one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    /// Visible road tiles from the player forwards.
    pub road: Vec<RoadTile>,
    /// Live generated content.
    pub props: Vec<PropPresentation>,
    /// Local player vehicle.
    pub player: VehiclePresentation,
    /// Interpolated rival vehicles.
    pub rivals: Vec<VehiclePresentation>,
    /// Zone the player is driving through.
    pub zone: Option<Zone>,
    /// Vertical bend per squared metre of view distance.
    pub curvature: f32,
    /// Sky state.
    pub sky: SkyPresentation,
    /// Score shown in the HUD.
    pub score: u64,
    /// Watermelons towards the next nitro, shown in the HUD.
    pub watermelons: u32,
    /// Dates collected, shown in the HUD.
    pub dates: u32,
}

impl Scene {
    /// Composes a frame from the world and the interpolated rival poses.
    #[must_use]
    pub fn compose(world: &World, rivals: &[RivalPose], catalog: &AssetCatalog) -> Self {
        let config = query::config(world);
        let layout = query::lane_layout(world);
        let tile_length = config.world.tile_length;
        let head = query::track_index(world);

        let lateral = |lane: CenteredLane| layout.world_x(lane);
        let depth = |distance: f64| -(distance as f32);
        let vehicle_model = |variant: VehicleVariant| {
            catalog
                .vehicle(variant)
                .or_else(|| catalog.cars.first().map(String::as_str))
                .unwrap_or_default()
                .to_owned()
        };

        let road = (0..config.world.num_tiles)
            .map(|offset| head.offset(offset))
            .filter_map(|index| {
                let zone = query::zone_at(world, index)?;
                let ground = if zone == Zone::Nature {
                    &catalog.road.ground_nature
                } else {
                    &catalog.road.ground
                };
                Some(RoadTile {
                    index,
                    zone,
                    origin: Vec3::new(0.0, 0.0, -(index.get() as f32) * tile_length),
                    road_model: catalog.road.straight.clone(),
                    ground_model: ground.clone(),
                })
            })
            .collect();

        let props = query::placements(world)
            .filter_map(|spawn| {
                let model = catalog.resolve(spawn.category, spawn.zone, spawn.variant)?;
                let z = -(spawn.position.get() as f32) * tile_length;
                let (x, scale) = match spawn.placement {
                    Placement::Lane(lane) => (lateral(layout.centered(lane)), 1.0),
                    Placement::Roadside {
                        side,
                        lateral_offset,
                        scale,
                    } => (side.sign() * lateral_offset, scale),
                };
                Some(PropPresentation {
                    category: spawn.category,
                    model: model.to_owned(),
                    translation: Vec3::new(x, 0.0, z),
                    scale,
                })
            })
            .collect();

        let player = VehiclePresentation {
            peer: None,
            model: vehicle_model(query::vehicle(world).unwrap_or(VehicleVariant::new(0))),
            translation: Vec3::new(
                lateral(query::lane(world)),
                0.0,
                depth(query::distance(world)),
            ),
            boosted: query::is_boosting(world),
        };

        let rivals = rivals
            .iter()
            .map(|pose| VehiclePresentation {
                peer: Some(pose.peer),
                model: vehicle_model(pose.vehicle),
                translation: Vec3::new(
                    lateral(CenteredLane::new(pose.lane)),
                    0.0,
                    depth(pose.distance),
                ),
                boosted: pose.boosted,
            })
            .collect();

        let hour = query::hour(world);
        let phase = query::sky_phase(world);
        Self {
            road,
            props,
            player,
            rivals,
            zone: query::zone(world),
            curvature: config.world.curvature,
            sky: SkyPresentation {
                hour,
                phase,
                palette: SkyPalette::for_phase(phase),
            },
            score: query::score(world),
            watermelons: query::watermelons(world),
            dates: query::dates_collected(world),
        }
    }

    /// Applies the world bend to `point` as seen from the player.
    #[must_use]
    pub fn bend(&self, point: Vec3) -> Vec3 {
        let dz = point.z - self.player.translation.z;
        Vec3::new(point.x, point.y + dz * dz * self.curvature, point.z)
    }
}

/// Presentation descriptor consumed by rendering backends.
#[derive(Clone, Debug, PartialEq)]
pub struct Presentation {
    /// Title used by the created window.
    pub window_title: String,
    /// Models the backend should preload.
    pub preload: Vec<String>,
    /// Scene content that should be displayed.
    pub scene: Scene,
}

impl Presentation {
    /// Constructs a new presentation descriptor.
    #[must_use]
    pub fn new<T>(window_title: T, preload: Vec<String>, scene: Scene) -> Self
    where
        T: Into<String>,
    {
        Self {
            window_title: window_title.into(),
            preload,
            scene,
        }
    }
}

/// Rendering backend capable of presenting Dash Runner scenes.
pub trait RenderingBackend {
    /// Runs the rendering backend until it is requested to exit.
    ///
    /// The provided `update_scene` closure receives the frame delta and
    /// replaces the scene before it is rendered. Returning `false` ends the
    /// loop.
    fn run<F>(self, presentation: Presentation, update_scene: F) -> AnyResult<()>
    where
        F: FnMut(Duration, &mut Scene) -> bool + 'static;
}
