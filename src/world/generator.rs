/// Procedural park generation for the viewer and benchmarks
/// Perlin terrain with a scattering of every element and entity kind.
use super::{EntityKind, GuestState, TileElement, TileElementKind, World};
use crate::perf_scope;
use crate::sprite::DemoImages;
use glam::{IVec2, IVec3};
use noise::{NoiseFn, Perlin};

#[derive(Debug, Clone)]
pub struct WorldConfig {
    /// Map edge in tiles
    pub size: i32,
    pub seed: u32,
    /// Height steps (16 world units each) at noise amplitude 1.0
    pub relief: f64,
    /// Tiles below this z are flooded
    pub water_z: i32,
    /// One in `scenery_rarity` tiles carries scenery
    pub scenery_rarity: u32,
    pub guests: u32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            size: 64,
            seed: 12345,
            relief: 6.0,
            water_z: 16,
            scenery_rarity: 7,
            guests: 120,
        }
    }
}

/// Hash of a tile position, stable for a given seed
#[inline]
fn scatter(seed: u32, x: i32, y: i32) -> u32 {
    let mut h = seed ^ (x as u32).wrapping_mul(0x9E37_79B1) ^ (y as u32).wrapping_mul(0x85EB_CA77);
    h ^= h >> 15;
    h = h.wrapping_mul(0x2C1B_3C6D);
    h ^= h >> 12;
    h
}

impl World {
    pub fn generate(config: &WorldConfig, images: &DemoImages) -> World {
        perf_scope!("world generation");
        let mut world = World::new(config.size);
        let size = world.size();
        let perlin = Perlin::new(config.seed);

        let height_at = |x: i32, y: i32| -> i32 {
            let n = perlin.get([x as f64 * 0.07, y as f64 * 0.07]);
            let steps = ((n + 0.6) * config.relief).round().max(0.0) as i32;
            steps * 16
        };

        // --- TERRAIN ---
        for y in 0..size {
            for x in 0..size {
                let z = height_at(x, y);
                let neighbour_low = [(1, 0), (0, 1)]
                    .iter()
                    .any(|(dx, dy)| height_at(x + dx, y + dy) < z);
                let water_z = (z < config.water_z).then_some(config.water_z);
                let surface = TileElement::new(
                    TileElementKind::Surface {
                        edge: neighbour_low.then_some(images.cliff_edge),
                        water_z,
                    },
                    z,
                    z,
                    images.grass,
                );
                world.push_element(IVec2::new(x, y), surface);
            }
        }

        // --- RIDE: a straight track with a station and supports ---
        let track_y = size / 2;
        let track_z = (0..size).map(|x| height_at(x, track_y)).max().unwrap_or(0) + 32;
        for x in 4..size.saturating_sub(4) {
            let station = (8..12).contains(&x);
            let track = TileElement::new(
                TileElementKind::Track {
                    ride: 0,
                    supports: Some(images.supports),
                    station_lights: station.then_some(images.station_lights),
                },
                track_z,
                track_z + 16,
                images.track,
            );
            world.push_element(IVec2::new(x, track_y), track);
        }
        world.push_element(
            IVec2::new(7, track_y + 1),
            TileElement::new(
                TileElementKind::Entrance { ride: 0 },
                height_at(7, track_y + 1),
                height_at(7, track_y + 1) + 32,
                images.entrance,
            ),
        );
        let car = world.spawn_entity(
            EntityKind::Vehicle {
                riders: Some(images.guest),
            },
            Some(IVec3::new(10 * 32 + 16, track_y * 32 + 16, track_z + 4)),
            images.vehicle,
        );

        // --- PATHS AND SCENERY ---
        let path_y = track_y + 2;
        for x in 2..size.saturating_sub(2) {
            let z = height_at(x, path_y);
            world.push_element(
                IVec2::new(x, path_y),
                TileElement::new(TileElementKind::Path, z, z + 4, images.path),
            );
        }

        for y in 1..size - 1 {
            for x in 1..size - 1 {
                if y == track_y || y == path_y || y == track_y + 1 {
                    continue;
                }
                let z = height_at(x, y);
                if z < config.water_z {
                    continue;
                }
                let roll = scatter(config.seed, x, y);
                if roll % config.scenery_rarity.max(1) != 0 {
                    continue;
                }
                let tile = IVec2::new(x, y);
                let element = match (roll >> 8) % 10 {
                    0..=4 => TileElement::new(TileElementKind::SmallScenery { vegetation: true }, z, z + 40, images.tree),
                    5 | 6 => TileElement::new(TileElementKind::SmallScenery { vegetation: false }, z, z + 8, images.bench),
                    7 => TileElement::new(TileElementKind::Wall, z, z + 24, images.wall).with_direction((roll >> 16) as u8),
                    8 => TileElement::new(TileElementKind::LargeScenery { sequence: 0 }, z, z + 48, images.large_scenery),
                    _ => TileElement::new(TileElementKind::Banner { index: (roll >> 20) as u16 }, z, z + 24, images.banner),
                };
                world.push_element(tile, element);
            }
        }

        // --- ENTITIES ---
        for i in 0..config.guests as i32 {
            let roll = scatter(config.seed ^ 0xA5A5, i, 17);
            let x = 2 * 32 + (roll % ((size as u32).saturating_sub(4).max(1) * 32)) as i32;
            let pos = IVec2::new(x, path_y * 32 + 8 + (roll >> 12) as i32 % 16);
            let state = if i % 9 == 0 {
                GuestState::OnRide {
                    vehicle: Some(car),
                    ride_view: Some(IVec2::new(9, track_y)),
                }
            } else {
                GuestState::Walking
            };
            let location = match state {
                GuestState::Walking => Some(pos.extend(world.surface_height(pos) + 4)),
                _ => None,
            };
            let image = if roll & 1 == 0 {
                images.guest.with_remap(images.shirt_remap)
            } else {
                images.guest
            };
            world.spawn_entity(EntityKind::Guest(state), location, image);
        }

        let staff_pos = IVec2::new(6 * 32 + 16, path_y * 32 + 16);
        world.spawn_entity(
            EntityKind::Staff { picked_up: false },
            Some(staff_pos.extend(world.surface_height(staff_pos) + 4)),
            images.staff,
        );

        for i in 0..size / 4 {
            let roll = scatter(config.seed ^ 0x5A5A, i, 3);
            let pos = IVec2::new(
                (roll % (size as u32 * 32)) as i32,
                ((roll >> 11) % (size as u32 * 32)) as i32,
            );
            let z = world.surface_height(pos);
            if z < config.water_z {
                world.spawn_entity(EntityKind::Misc, Some(pos.extend(config.water_z)), images.duck);
            } else {
                world.spawn_entity(EntityKind::Litter, Some(pos.extend(z)), images.litter);
            }
        }

        let money_pos = IVec2::new(9 * 32 + 16, (track_y + 1) * 32 + 16);
        world.spawn_entity(
            EntityKind::MoneyEffect { amount: 150 },
            Some(money_pos.extend(track_z + 24)),
            images.litter,
        );

        log::info!(
            "Generated {}x{} park: {} tile elements, {} entities",
            size,
            size,
            world.element_count(),
            world.entity_count()
        );
        world
    }
}
