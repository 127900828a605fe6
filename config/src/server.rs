//! Normalisation of loosely shaped configuration documents.
//!
//! The session service ships the browser client's tunables with
//! `game_start`. That shape times spawns in milliseconds and names a few
//! fields differently from [`GameConfig`](crate::GameConfig). Documents pass
//! through here after the section merge and before deserialisation:
//!
//! 1. [`backfill`] completes nested objects a merge replaced wholesale with
//!    the section defaults.
//! 2. [`normalise`] rewrites service keys into the snapshot's tile units.
//! 3. [`unknown_keys`] lists whatever is left that no field consumes.
//!
//! Millisecond spacings are converted at the configured start speed: a
//! delay of `ms` covers `ms / 1000 * player.speed.initial` world units, that
//! is that many world units divided by `world.tileLength` tiles.

use serde_json::{Map, Value};

/// Fills keys missing from `target` with the matching entries of `defaults`, recursively.
pub(crate) fn backfill(target: &mut Value, defaults: &Value) {
    let (Value::Object(target), Value::Object(defaults)) = (target, defaults) else {
        return;
    };
    for (key, default) in defaults {
        match target.get_mut(key) {
            Some(value) => backfill(value, default),
            None => {
                let _ = target.insert(key.clone(), default.clone());
            }
        }
    }
}

/// Rewrites session service keys into snapshot keys; returns the keys it translated.
pub(crate) fn normalise(document: &mut Value) -> Vec<&'static str> {
    let pace = Pace::read(document);
    let mut translated = Vec::new();

    if let Some(obstacles) = section(document, "obstacles") {
        obstacle_delays(obstacles, &pace, &mut translated);
    }
    if let Some(collectibles) = section(document, "collectibles") {
        if spawn_interval(collectibles, &pace) {
            translated.push("collectibles.spawn.interval");
        }
    }
    if let Some(dates) = section(document, "dates") {
        if spawn_interval(dates, &pace) {
            translated.push("dates.spawn.interval");
        }
    }
    if let Some(lights) = section(document, "lights") {
        light_slots(lights, &pace, &mut translated);
    }
    if let Some(buildings) = section(document, "buildings") {
        if let Some(chance) = buildings.remove("spawnChance") {
            let _ = buildings.insert("density".to_owned(), chance);
            translated.push("buildings.spawnChance");
        }
    }
    translated
}

/// Dotted paths present in `document` but absent from `known`.
pub(crate) fn unknown_keys(document: &Value, known: &Value) -> Vec<String> {
    let mut unknown = Vec::new();
    collect_unknown(document, known, "", &mut unknown);
    unknown
}

fn collect_unknown(document: &Value, known: &Value, prefix: &str, out: &mut Vec<String>) {
    let (Value::Object(document), Value::Object(known)) = (document, known) else {
        return;
    };
    for (key, value) in document {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match known.get(key) {
            Some(expected) => collect_unknown(value, expected, &path, out),
            None => out.push(path),
        }
    }
}

/// Travel rate used to express time and distance spacings in tiles.
struct Pace {
    tile_length: f64,
    speed: f64,
}

impl Pace {
    fn read(document: &Value) -> Self {
        let positive = |pointer: &str| {
            document
                .pointer(pointer)
                .and_then(Value::as_f64)
                .filter(|value| *value > 0.0)
                .unwrap_or(1.0)
        };
        Self {
            tile_length: positive("/world/tileLength"),
            speed: positive("/player/speed/initial"),
        }
    }

    fn tiles_for_millis(&self, millis: f64) -> f64 {
        millis / 1_000.0 * self.speed / self.tile_length
    }

    fn tiles_for_distance(&self, distance: f64) -> f64 {
        distance / self.tile_length
    }
}

/// Nearest whole spacing, at least one tile.
fn spacing(tiles: f64) -> Value {
    Value::from((tiles.round() as u64).max(1))
}

/// Ramp step rounded up so that a configured decrease never vanishes.
fn step(tiles: f64) -> Value {
    Value::from(tiles.max(0.0).ceil() as u64)
}

fn section<'a>(document: &'a mut Value, key: &str) -> Option<&'a mut Map<String, Value>> {
    document.get_mut(key)?.as_object_mut()
}

fn take_number(map: &mut Map<String, Value>, key: &str) -> Option<f64> {
    map.remove(key).and_then(|value| value.as_f64())
}

fn obstacle_delays(
    obstacles: &mut Map<String, Value>,
    pace: &Pace,
    translated: &mut Vec<&'static str>,
) {
    let Some(Value::Object(spawn)) = obstacles.get_mut("spawn") else {
        return;
    };
    let initial = take_number(spawn, "initialDelay");
    let minimum = take_number(spawn, "minDelay");
    let decrease = take_number(spawn, "decreaseFactor");

    if let Some(millis) = initial {
        let _ = spawn.insert("intervalTiles".to_owned(), spacing(pace.tiles_for_millis(millis)));
        translated.push("obstacles.spawn.initialDelay");
    }
    if let Some(millis) = minimum {
        let _ = obstacles.insert(
            "minIntervalTiles".to_owned(),
            spacing(pace.tiles_for_millis(millis)),
        );
        translated.push("obstacles.spawn.minDelay");
    }
    if let Some(millis) = decrease {
        let _ = obstacles.insert(
            "decreaseTiles".to_owned(),
            step(pace.tiles_for_millis(millis)),
        );
        translated.push("obstacles.spawn.decreaseFactor");
    }
}

/// Converts a millisecond `spawn.interval` into `spawn.intervalTiles`.
fn spawn_interval(section: &mut Map<String, Value>, pace: &Pace) -> bool {
    let Some(Value::Object(spawn)) = section.get_mut("spawn") else {
        return false;
    };
    let Some(millis) = take_number(spawn, "interval") else {
        return false;
    };
    let _ = spawn.insert("intervalTiles".to_owned(), spacing(pace.tiles_for_millis(millis)));
    true
}

/// Moves `spawnChance` and the world-unit `spawnInterval` into `spawn`.
fn light_slots(lights: &mut Map<String, Value>, pace: &Pace, translated: &mut Vec<&'static str>) {
    let chance = lights.remove("spawnChance");
    let interval = take_number(lights, "spawnInterval");
    if chance.is_none() && interval.is_none() {
        return;
    }

    let spawn = lights
        .entry("spawn")
        .or_insert_with(|| Value::Object(Map::new()));
    let Value::Object(spawn) = spawn else {
        return;
    };
    if let Some(chance) = chance {
        let _ = spawn.insert("chance".to_owned(), chance);
        translated.push("lights.spawnChance");
    }
    if let Some(distance) = interval {
        let _ = spawn.insert(
            "intervalTiles".to_owned(),
            spacing(pace.tiles_for_distance(distance)),
        );
        translated.push("lights.spawnInterval");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn backfill_keeps_present_values_and_adds_missing_ones() {
        let mut target = json!({ "spawn": { "chance": 0.1 }, "points": 7 });
        backfill(
            &mut target,
            &json!({ "spawn": { "chance": 0.6, "intervalTiles": 6 }, "points": 100, "extra": [1] }),
        );
        assert_eq!(
            target,
            json!({ "spawn": { "chance": 0.1, "intervalTiles": 6 }, "points": 7, "extra": [1] })
        );
    }

    #[test]
    fn delays_convert_at_the_start_speed() {
        let mut document = json!({
            "world": { "tileLength": 30 },
            "player": { "speed": { "initial": 20 } },
            "obstacles": { "spawn": { "initialDelay": 4500, "minDelay": 1500, "decreaseFactor": 40 } },
            "collectibles": { "spawn": { "interval": 3000, "chance": 0.1 } },
        });
        let translated = normalise(&mut document);

        assert_eq!(document["obstacles"]["spawn"], json!({ "intervalTiles": 3 }));
        assert_eq!(document["obstacles"]["minIntervalTiles"], json!(1));
        assert_eq!(document["obstacles"]["decreaseTiles"], json!(1));
        assert_eq!(
            document["collectibles"]["spawn"],
            json!({ "chance": 0.1, "intervalTiles": 2 })
        );
        assert_eq!(translated.len(), 4);
    }

    #[test]
    fn light_and_building_chances_move_to_their_fields() {
        let mut document = json!({
            "world": { "tileLength": 30 },
            "lights": { "spawnChance": 0.4, "spawnInterval": 100, "offset": 8 },
            "buildings": { "spawnChance": 0.0 },
        });
        let _ = normalise(&mut document);
        assert_eq!(
            document["lights"],
            json!({ "offset": 8, "spawn": { "chance": 0.4, "intervalTiles": 3 } })
        );
        assert_eq!(document["buildings"], json!({ "density": 0.0 }));
    }

    #[test]
    fn unknown_keys_are_reported_with_their_path() {
        let unknown = unknown_keys(
            &json!({ "obstacles": { "scale": 2.2, "spawn": {} }, "menus": {} }),
            &json!({ "obstacles": { "spawn": {} } }),
        );
        assert_eq!(unknown, vec!["menus".to_owned(), "obstacles.scale".to_owned()]);
    }
}
