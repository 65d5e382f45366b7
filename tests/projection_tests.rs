/// Coordinate transform tests: known projections, randomized round trips
/// and ground resolution against a real height map.
use glam::{IVec2, IVec3};
use iso_engine::projection::{
    adjust_for_map_height, resolve_ground_xy, rotate_xy, screen_to_world, tile_floor, unrotate_xy, world_to_screen,
    TileHit, TILE_SIZE,
};
use iso_engine::world::TileElement;
use iso_engine::{ImageId, World};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

#[test]
fn origin_projects_to_origin_in_every_rotation() {
    for rotation in 0..4 {
        assert_eq!(world_to_screen(rotation, IVec3::ZERO), IVec2::ZERO);
    }
}

#[test]
fn tile_centre_moves_a_quarter_turn() {
    let centre = IVec3::new(16, 16, 0);
    assert_eq!(world_to_screen(0, centre), IVec2::new(0, 16));
    assert_eq!(world_to_screen(1, centre), IVec2::new(-32, 0));
    assert_eq!(world_to_screen(2, centre), IVec2::new(0, -16));
    assert_eq!(world_to_screen(3, centre), IVec2::new(32, 0));
}

#[test]
fn height_raises_the_point_on_screen() {
    let low = world_to_screen(0, IVec3::new(64, 32, 0));
    let high = world_to_screen(0, IVec3::new(64, 32, 48));
    assert_eq!(high, low - IVec2::new(0, 48));
}

#[test]
fn rotation_is_invertible() {
    let p = IVec2::new(37, -5);
    for rotation in 0..4 {
        assert_eq!(unrotate_xy(rotate_xy(p, rotation), rotation), p);
    }
    assert_eq!(rotate_xy(p, 4), p);
}

#[test]
fn randomized_round_trip_recovers_world_xy() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x150);
    for _ in 0..20_000 {
        let p = IVec3::new(
            rng.gen_range(-8192..8192),
            rng.gen_range(-8192..8192),
            rng.gen_range(0..2048),
        );
        let rotation = rng.gen_range(0..4u8);
        let view = world_to_screen(rotation, p);
        assert_eq!(
            screen_to_world(view, p.z, rotation),
            p.truncate(),
            "round trip failed for {p:?} at rotation {rotation}"
        );
    }
}

fn sloped_world() -> World {
    let mut world = World::new(8);
    for y in 0..8 {
        for x in 0..8 {
            world.push_element(IVec2::new(x, y), TileElement::surface(x * 16, ImageId::new(0)));
        }
    }
    world
}

#[test]
fn ground_resolution_stays_inside_the_picked_tile() {
    let world = sloped_world();
    let height = |p: IVec2| world.surface_height(p);
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    for _ in 0..500 {
        let tile = IVec2::new(rng.gen_range(1..7), rng.gen_range(1..7)) * TILE_SIZE;
        let local = IVec2::new(rng.gen_range(0..TILE_SIZE), rng.gen_range(0..TILE_SIZE));
        let rotation = rng.gen_range(0..4u8);
        let point = tile + local;
        let view = world_to_screen(rotation, point.extend(world.surface_height(point)));
        let resolved = resolve_ground_xy(view, rotation, tile, height);
        assert_eq!(tile_floor(resolved), tile);
    }
}

#[test]
fn ground_resolution_is_exact_on_flat_land() {
    let world = sloped_world();
    let point = IVec2::new(3 * TILE_SIZE + 5, 4 * TILE_SIZE + 20);
    let z = world.surface_height(point);
    for rotation in 0..4 {
        let view = world_to_screen(rotation, point.extend(z));
        let resolved = resolve_ground_xy(view, rotation, tile_floor(point), |p| world.surface_height(p));
        assert_eq!(resolved, point);
        let anchored = adjust_for_map_height(view, rotation, |_| z);
        assert_eq!(anchored, point.extend(z));
    }
}

#[test]
fn tile_hit_classifies_quadrant_and_tile() {
    let hit = TileHit::from_world(IVec2::new(70, 33));
    assert_eq!(hit.tile, IVec2::new(64, 32));
    assert_eq!(hit.position, IVec2::new(70, 33));
    assert!(hit.quadrant < 4);
    assert!(hit.side < 4);
    assert!(hit.direction <= 4);
}
