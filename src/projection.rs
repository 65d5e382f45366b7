/// Isometric coordinate transform
/// World (x, y, z) <-> view-space pixels for the four camera rotations
///
/// View space is the zoom-independent pixel space the painter works in.
/// Screen pixels are derived from it by the viewport's zoom level.
use glam::{IVec2, IVec3};

/// World units per tile edge
pub const TILE_SIZE: i32 = 32;
/// Mask that floors a world coordinate to its tile origin
pub const TILE_MASK: i32 = !(TILE_SIZE - 1);

/// Height iterations used when resolving a click on the ground
pub const GROUND_RESOLVE_ITERATIONS: usize = 5;
/// Height iterations used when anchoring a view point without a pick
pub const HEIGHT_ADJUST_ITERATIONS: usize = 6;

/// Rotate a world (x, y) into camera space for `rotation` quarter turns.
#[inline]
pub fn rotate_xy(p: IVec2, rotation: u8) -> IVec2 {
    match rotation & 3 {
        0 => p,
        1 => IVec2::new(p.y, -p.x),
        2 => -p,
        _ => IVec2::new(-p.y, p.x),
    }
}

/// Inverse of [`rotate_xy`].
#[inline]
pub fn unrotate_xy(p: IVec2, rotation: u8) -> IVec2 {
    rotate_xy(p, (4 - (rotation & 3)) & 3)
}

/// Project a world point to view space.
///
/// `sx = y' - x'`, `sy = floor((x' + y') / 2) - z` on the rotated (x', y').
#[inline]
pub fn world_to_screen(rotation: u8, p: IVec3) -> IVec2 {
    let r = rotate_xy(p.truncate(), rotation);
    IVec2::new(r.y - r.x, ((r.x + r.y) >> 1) - p.z)
}

/// Exact inverse of [`world_to_screen`] at a known height.
///
/// The floor in the projection discards one bit of `x' + y'`; that bit is
/// always the parity of `sx`, so it can be restored without loss.
#[inline]
pub fn screen_to_world(view: IVec2, z: i32, rotation: u8) -> IVec2 {
    let sum = 2 * (view.y + z) + view.x.rem_euclid(2);
    let rotated = IVec2::new((sum - view.x) / 2, (sum + view.x) / 2);
    unrotate_xy(rotated, rotation)
}

/// Floor a world position to the origin of its tile.
#[inline]
pub fn tile_floor(p: IVec2) -> IVec2 {
    IVec2::new(p.x & TILE_MASK, p.y & TILE_MASK)
}

/// Resolve the ground point under a view position, starting from the tile
/// the picker reported. Runs a fixed number of height iterations and keeps
/// the result clamped into that tile.
pub fn resolve_ground_xy<F>(view: IVec2, rotation: u8, tile: IVec2, height_at: F) -> IVec2
where
    F: Fn(IVec2) -> i32,
{
    let min = tile_floor(tile);
    let max = min + IVec2::splat(TILE_SIZE - 1);
    let mut pos = min + IVec2::splat(TILE_SIZE / 2);
    for _ in 0..GROUND_RESOLVE_ITERATIONS {
        let z = height_at(pos);
        pos = screen_to_world(view, z, rotation).clamp(min, max);
    }
    pos
}

/// Anchor a view position on the terrain without picking.
///
/// Starts at sea level and re-projects at the height found under the
/// previous guess. No clamping; used where the pick found nothing.
pub fn adjust_for_map_height<F>(view: IVec2, rotation: u8, height_at: F) -> IVec3
where
    F: Fn(IVec2) -> i32,
{
    let mut z = 0;
    let mut pos = screen_to_world(view, z, rotation);
    for _ in 0..HEIGHT_ADJUST_ITERATIONS {
        z = height_at(pos);
        pos = screen_to_world(view, z, rotation);
    }
    pos.extend(z)
}

/// Where inside a tile a world point landed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileHit {
    /// World position of the tile origin (multiple of 32)
    pub tile: IVec2,
    /// Exact world position that was resolved
    pub position: IVec2,
    /// Quarter of the tile: 0..=3
    pub quadrant: u8,
    /// Triangle side facing the point: 0..=3
    pub side: u8,
    /// Nearest edge 0..=3, or 4 for the tile centre
    pub direction: u8,
}

impl TileHit {
    pub fn from_world(position: IVec2) -> Self {
        let local = IVec2::new(
            position.x.rem_euclid(TILE_SIZE),
            position.y.rem_euclid(TILE_SIZE),
        );
        Self {
            tile: tile_floor(position),
            position,
            quadrant: tile_quadrant(local),
            side: tile_side(local),
            direction: edge_direction(local),
        }
    }
}

#[inline]
pub fn tile_quadrant(local: IVec2) -> u8 {
    if local.x > 16 {
        if local.y < 16 { 1 } else { 0 }
    } else if local.y < 16 {
        2
    } else {
        3
    }
}

#[inline]
pub fn tile_side(local: IVec2) -> u8 {
    let diagonal = local.x + local.y < TILE_SIZE;
    if local.x < local.y {
        if diagonal { 0 } else { 1 }
    } else if diagonal {
        3
    } else {
        2
    }
}

/// Edge the point is closest to, or 4 when it sits in the tile's centre square.
#[inline]
pub fn edge_direction(local: IVec2) -> u8 {
    let inside = |v: i32| v > 8 && v < 24;
    if inside(local.x) && inside(local.y) {
        return 4;
    }
    if local.x <= 16 {
        if local.y < 16 { 2 } else { 3 }
    } else if local.y < 16 {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotate_inverse() {
        let p = IVec2::new(96, -40);
        for r in 0..4 {
            assert_eq!(unrotate_xy(rotate_xy(p, r), r), p);
        }
    }

    #[test]
    fn test_known_projections() {
        assert_eq!(world_to_screen(0, IVec3::ZERO), IVec2::ZERO);
        assert_eq!(world_to_screen(0, IVec3::new(32, 0, 0)), IVec2::new(-32, 16));
        assert_eq!(world_to_screen(0, IVec3::new(0, 32, 8)), IVec2::new(32, 8));
        // Tile centre under each quarter turn
        let centre = IVec3::new(16, 16, 0);
        assert_eq!(world_to_screen(0, centre), IVec2::new(0, 16));
        assert_eq!(world_to_screen(1, centre), IVec2::new(-32, 0));
        assert_eq!(world_to_screen(2, centre), IVec2::new(0, -16));
        assert_eq!(world_to_screen(3, centre), IVec2::new(32, 0));
    }

    #[test]
    fn test_round_trip_small_grid() {
        for r in 0..4u8 {
            for x in -40..40 {
                for y in -40..40 {
                    for z in [-16, 0, 7, 112] {
                        let screen = world_to_screen(r, IVec3::new(x, y, z));
                        assert_eq!(screen_to_world(screen, z, r), IVec2::new(x, y));
                    }
                }
            }
        }
    }

    #[test]
    fn test_resolve_ground_on_flat_terrain() {
        let p = IVec3::new(70, 45, 48);
        for r in 0..4 {
            let view = world_to_screen(r, p);
            let resolved = resolve_ground_xy(view, r, IVec2::new(64, 32), |_| 48);
            assert_eq!(resolved, p.truncate());
        }
    }

    #[test]
    fn test_resolve_ground_clamps_into_tile() {
        let view = world_to_screen(0, IVec3::new(200, 200, 0));
        let resolved = resolve_ground_xy(view, 0, IVec2::new(64, 64), |_| 0);
        assert_eq!(resolved, IVec2::new(95, 95));
    }

    #[test]
    fn test_adjust_for_map_height() {
        let p = IVec3::new(300, 120, 32);
        let view = world_to_screen(2, p);
        assert_eq!(adjust_for_map_height(view, 2, |_| 32), p);
    }

    #[test]
    fn test_tile_classification() {
        let hit = TileHit::from_world(IVec2::new(64 + 16, 96 + 16));
        assert_eq!(hit.tile, IVec2::new(64, 96));
        assert_eq!(hit.direction, 4);

        assert_eq!(tile_quadrant(IVec2::new(20, 4)), 1);
        assert_eq!(tile_quadrant(IVec2::new(20, 20)), 0);
        assert_eq!(tile_quadrant(IVec2::new(4, 4)), 2);
        assert_eq!(tile_quadrant(IVec2::new(4, 20)), 3);

        assert_eq!(tile_side(IVec2::new(2, 10)), 0);
        assert_eq!(tile_side(IVec2::new(10, 30)), 1);
        assert_eq!(tile_side(IVec2::new(30, 10)), 2);
        assert_eq!(tile_side(IVec2::new(10, 2)), 3);

        assert_eq!(edge_direction(IVec2::new(2, 2)), 2);
        assert_eq!(edge_direction(IVec2::new(2, 30)), 3);
        assert_eq!(edge_direction(IVec2::new(30, 2)), 1);
        assert_eq!(edge_direction(IVec2::new(30, 30)), 0);
    }

    #[test]
    fn test_negative_tile_floor() {
        assert_eq!(tile_floor(IVec2::new(-1, 33)), IVec2::new(-32, 32));
    }
}
