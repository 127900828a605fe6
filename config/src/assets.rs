//! Statically typed asset catalog.
//!
//! Spawn decisions carry a variant index; the catalog resolves it against the
//! list for the decision's category and zone. Paths are relative to the asset
//! root served to the renderer.

use dash_runner_core::{SpawnCategory, VehicleVariant, Zone};

/// Per-zone table of values.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ZoneTable<T> {
    /// Value for [`Zone::City`].
    pub city: T,
    /// Value for [`Zone::Suburbs`].
    pub suburbs: T,
    /// Value for [`Zone::Industrial`].
    pub industrial: T,
    /// Value for [`Zone::Bridge`].
    pub bridge: T,
    /// Value for [`Zone::Nature`].
    pub nature: T,
}

impl<T> ZoneTable<T> {
    /// Value for the provided zone.
    #[must_use]
    pub fn get(&self, zone: Zone) -> &T {
        match zone {
            Zone::City => &self.city,
            Zone::Suburbs => &self.suburbs,
            Zone::Industrial => &self.industrial,
            Zone::Bridge => &self.bridge,
            Zone::Nature => &self.nature,
        }
    }

    /// Values in [`Zone::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (Zone, &T)> {
        Zone::ALL.into_iter().map(move |zone| (zone, self.get(zone)))
    }
}

/// Road surface models.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoadAssets {
    /// Straight road tile.
    pub straight: String,
    /// Default ground tile.
    pub ground: String,
    /// Ground tile used in nature zones.
    pub ground_nature: String,
    /// Street light model.
    pub light: String,
}

/// Every model the race world can instantiate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetCatalog {
    /// Road surface models.
    pub road: RoadAssets,
    /// Road debris used as obstacles.
    pub obstacles: Vec<String>,
    /// Watermelon models.
    pub collectibles: Vec<String>,
    /// Date models.
    pub dates: Vec<String>,
    /// Player selectable vehicles, indexed by [`VehicleVariant`].
    pub cars: Vec<String>,
    /// Player selectable drivers.
    pub characters: Vec<String>,
    /// Zone-specific traffic; a zone with an empty list has no traffic.
    pub traffic: ZoneTable<Vec<String>>,
    /// Zone-specific roadside props.
    pub props: ZoneTable<Vec<String>>,
}

impl AssetCatalog {
    /// Variant list a spawn of `category` inside `zone` picks from.
    #[must_use]
    pub fn variants(&self, category: SpawnCategory, zone: Zone) -> &[String] {
        match category {
            SpawnCategory::Obstacle => &self.obstacles,
            SpawnCategory::Collectible => &self.collectibles,
            SpawnCategory::Date => &self.dates,
            SpawnCategory::Traffic => self.traffic.get(zone),
            SpawnCategory::Light => std::slice::from_ref(&self.road.light),
            SpawnCategory::Decoration => self.props.get(zone),
        }
    }

    /// Resolves a variant index to its model path.
    #[must_use]
    pub fn resolve(&self, category: SpawnCategory, zone: Zone, variant: usize) -> Option<&str> {
        self.variants(category, zone).get(variant).map(String::as_str)
    }

    /// Model of the provided player vehicle.
    #[must_use]
    pub fn vehicle(&self, variant: VehicleVariant) -> Option<&str> {
        usize::try_from(variant.get())
            .ok()
            .and_then(|index| self.cars.get(index))
            .map(String::as_str)
    }

    /// Every distinct model URL in declaration order, for preloading.
    #[must_use]
    pub fn flatten(&self) -> Vec<String> {
        let road = [
            &self.road.straight,
            &self.road.ground,
            &self.road.ground_nature,
            &self.road.light,
        ];
        let lists = [
            &self.obstacles,
            &self.collectibles,
            &self.dates,
            &self.cars,
            &self.characters,
        ];

        let mut urls: Vec<String> = Vec::new();
        let mut push = |path: &String| {
            let url = encode_url(path);
            if !urls.contains(&url) {
                urls.push(url);
            }
        };

        road.into_iter().for_each(&mut push);
        lists.into_iter().flatten().for_each(&mut push);
        for (_, list) in self.traffic.iter() {
            list.iter().for_each(&mut push);
        }
        for (_, list) in self.props.iter() {
            list.iter().for_each(&mut push);
        }
        urls
    }
}

/// Escapes spaces so paths can be fetched as URLs.
#[must_use]
pub fn encode_url(path: &str) -> String {
    path.replace(' ', "%20")
}

fn models(kit: &str, names: &[&str]) -> Vec<String> {
    names
        .iter()
        .map(|name| format!("/{kit}/{name}.glb"))
        .collect()
}

const CAR_KIT: &str = "kenney_car-kit/Models/GLB format";
const ROAD_KIT: &str = "kenney_city-kit-roads/Models/GLB format";
const NATURE_KIT: &str = "kenney_nature-kit/Models/GLTF format";
const FOOD_KIT: &str = "kenney_food-kit/Models/GLB format";

impl Default for AssetCatalog {
    fn default() -> Self {
        Self {
            road: RoadAssets {
                straight: format!("/{ROAD_KIT}/road-straight.glb"),
                ground: format!("/{ROAD_KIT}/tile-low.glb"),
                ground_nature: format!("/{NATURE_KIT}/ground_grass.glb"),
                light: format!("/{ROAD_KIT}/light-curved.glb"),
            },
            obstacles: models(CAR_KIT, &["debris-tire", "debris-bumper", "cone"]),
            collectibles: models(FOOD_KIT, &["watermelon"]),
            dates: models(FOOD_KIT, &["grapes"]),
            cars: models(
                CAR_KIT,
                &[
                    "sedan-sports",
                    "hatchback-sports",
                    "race-future",
                    "taxi",
                    "police",
                ],
            ),
            characters: models(
                "kenney_mini-characters/Models/GLB format",
                &[
                    "character-male-a",
                    "character-female-a",
                    "character-male-b",
                    "character-female-b",
                ],
            ),
            traffic: ZoneTable {
                city: models(
                    CAR_KIT,
                    &["taxi", "police", "ambulance", "garbage-truck", "delivery", "sedan"],
                ),
                suburbs: models(
                    CAR_KIT,
                    &["sedan", "suv", "van", "delivery", "police", "ambulance"],
                ),
                industrial: models(CAR_KIT, &["truck", "delivery", "van", "garbage-truck"]),
                bridge: Vec::new(),
                nature: models(CAR_KIT, &["suv", "van", "sedan"]),
            },
            props: ZoneTable {
                city: models(
                    "kenney_city-kit-commercial_2.1/Models/GLB_format",
                    &[
                        "building-a",
                        "building-b",
                        "building-c",
                        "building-d",
                        "building-skyscraper-a",
                        "building-skyscraper-b",
                    ],
                ),
                suburbs: models(
                    "kenney_city-kit-suburban_20/Models/GLB format",
                    &[
                        "building-type-a",
                        "building-type-b",
                        "building-type-c",
                        "building-type-d",
                        "building-type-e",
                    ],
                ),
                industrial: models(
                    "kenney_city-kit-industrial_1.0/Models/GLB format",
                    &[
                        "building-a",
                        "building-b",
                        "building-c",
                        "building-d",
                        "building-e",
                    ],
                ),
                bridge: models(
                    "kenney_watercraft-pack/Models/GLB format",
                    &[
                        "boat-speed-a",
                        "boat-speed-b",
                        "boat-speed-c",
                        "boat-fishing-small",
                        "boat-fan",
                    ],
                ),
                nature: models(
                    NATURE_KIT,
                    &[
                        "tree_palm",
                        "tree_palmTall",
                        "tree_palmBend",
                        "tree_palmShort",
                        "tree_default",
                        "tree_oak",
                    ],
                ),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bridges_carry_no_traffic() {
        let catalog = AssetCatalog::default();
        assert!(catalog.variants(SpawnCategory::Traffic, Zone::Bridge).is_empty());
        assert_eq!(catalog.variants(SpawnCategory::Traffic, Zone::City).len(), 6);
        assert_eq!(catalog.variants(SpawnCategory::Date, Zone::Bridge).len(), 1);
    }

    #[test]
    fn flatten_deduplicates_and_escapes() {
        let catalog = AssetCatalog::default();
        let urls = catalog.flatten();
        let taxi = "/kenney_car-kit/Models/GLB%20format/taxi.glb";
        assert_eq!(urls.iter().filter(|url| url.as_str() == taxi).count(), 1);
        assert!(urls.iter().all(|url| !url.contains(' ')));
        assert_eq!(urls[0], "/kenney_city-kit-roads/Models/GLB%20format/road-straight.glb");
    }

    #[test]
    fn vehicle_lookup_is_bounded() {
        let catalog = AssetCatalog::default();
        assert!(catalog.vehicle(VehicleVariant::new(0)).is_some());
        assert!(catalog.vehicle(VehicleVariant::new(99)).is_none());
    }
}
