/// Procedurally built sprite set for the viewer, tests and benches
/// Isometric boxes are rasterized once at startup into palette indices.
use super::{identity_remap, ImageId, Palette, Sprite, SpriteStore};

/// Named palette slots used by the procedural sprites
pub struct PaletteIndex;

impl PaletteIndex {
    pub const BLACK: u8 = 0;
    pub const WHITE: u8 = 1;
    pub const YELLOW: u8 = 2;
    pub const CYAN: u8 = 3;
    pub const RED: u8 = 4;
    /// Flat fill used when underground/clip flags pre-clear a column
    pub const CLEAR_FILL: u8 = 10;
    pub const GRASS_TOP: u8 = 16;
    pub const GRASS_LEFT: u8 = 17;
    pub const GRASS_RIGHT: u8 = 18;
    pub const ROCK_LEFT: u8 = 19;
    pub const ROCK_RIGHT: u8 = 20;
    pub const WATER: u8 = 21;
    pub const GRIDLINE: u8 = 22;
    pub const PATH_TOP: u8 = 23;
    pub const PATH_SIDE: u8 = 24;
    pub const TRACK_TOP: u8 = 25;
    pub const TRACK_SIDE: u8 = 26;
    pub const SUPPORT: u8 = 27;
    pub const LEAF_TOP: u8 = 28;
    pub const LEAF_SIDE: u8 = 29;
    pub const WOOD: u8 = 30;
    pub const STONE_TOP: u8 = 31;
    pub const STONE_SIDE: u8 = 32;
    pub const SHIRT: u8 = 33;
    pub const SHIRT_ALT: u8 = 34;
    pub const STAFF: u8 = 35;
    pub const CAR_TOP: u8 = 36;
    pub const CAR_SIDE: u8 = 37;
    pub const LITTER: u8 = 38;
    pub const BANNER: u8 = 39;
    pub const LAMP: u8 = 40;
}

const fn rgb(r: u8, g: u8, b: u8) -> u32 {
    0xFF000000 | ((r as u32) << 16) | ((g as u32) << 8) | (b as u32)
}

pub fn demo_palette() -> Palette {
    let mut colors = [0u32; 256];
    for (i, c) in colors.iter_mut().enumerate() {
        let v = i as u8;
        *c = rgb(v, v, v);
    }
    let named = [
        (PaletteIndex::BLACK, rgb(0, 0, 0)),
        (PaletteIndex::WHITE, rgb(255, 255, 255)),
        (PaletteIndex::YELLOW, rgb(255, 220, 40)),
        (PaletteIndex::CYAN, rgb(60, 220, 230)),
        (PaletteIndex::RED, rgb(220, 40, 40)),
        (PaletteIndex::CLEAR_FILL, rgb(23, 35, 35)),
        (PaletteIndex::GRASS_TOP, rgb(78, 150, 60)),
        (PaletteIndex::GRASS_LEFT, rgb(120, 90, 50)),
        (PaletteIndex::GRASS_RIGHT, rgb(95, 70, 40)),
        (PaletteIndex::ROCK_LEFT, rgb(120, 110, 100)),
        (PaletteIndex::ROCK_RIGHT, rgb(90, 82, 76)),
        (PaletteIndex::WATER, rgb(50, 100, 190)),
        (PaletteIndex::GRIDLINE, rgb(40, 70, 30)),
        (PaletteIndex::PATH_TOP, rgb(170, 150, 120)),
        (PaletteIndex::PATH_SIDE, rgb(130, 112, 90)),
        (PaletteIndex::TRACK_TOP, rgb(170, 40, 40)),
        (PaletteIndex::TRACK_SIDE, rgb(110, 25, 25)),
        (PaletteIndex::SUPPORT, rgb(150, 150, 160)),
        (PaletteIndex::LEAF_TOP, rgb(40, 120, 40)),
        (PaletteIndex::LEAF_SIDE, rgb(25, 85, 30)),
        (PaletteIndex::WOOD, rgb(130, 85, 40)),
        (PaletteIndex::STONE_TOP, rgb(190, 190, 180)),
        (PaletteIndex::STONE_SIDE, rgb(140, 140, 135)),
        (PaletteIndex::SHIRT, rgb(40, 80, 220)),
        (PaletteIndex::SHIRT_ALT, rgb(230, 120, 30)),
        (PaletteIndex::STAFF, rgb(30, 160, 80)),
        (PaletteIndex::CAR_TOP, rgb(240, 200, 30)),
        (PaletteIndex::CAR_SIDE, rgb(180, 140, 20)),
        (PaletteIndex::LITTER, rgb(230, 230, 230)),
        (PaletteIndex::BANNER, rgb(200, 30, 120)),
        (PaletteIndex::LAMP, rgb(255, 250, 180)),
    ];
    for (index, color) in named {
        colors[index as usize] = color;
    }
    Palette::new(colors)
}

/// Face colours of an isometric box
#[derive(Clone, Copy)]
struct BoxColors {
    top: u8,
    left: u8,
    right: u8,
}

/// Rasterize an isometric box: a diamond top `2*half` wide and `half` tall,
/// extruded down by `height` pixels. The anchor sits at the centre of the
/// box's base diamond.
fn iso_box(half: i32, height: i32, colors: BoxColors, outline_only: bool) -> (usize, usize, i32, i32, Vec<u8>) {
    let width = (2 * half) as usize;
    let rows = (half + height) as usize;
    let in_diamond = |x: i32, y: i32| -> bool {
        y >= 0 && y < half && (2 * x + 1 - 2 * half).abs() + (4 * y + 2 - 2 * half).abs() <= 2 * half
    };

    let mut pixels = vec![0u8; width * rows];
    for y in 0..rows as i32 {
        for x in 0..width as i32 {
            let index = if in_diamond(x, y) {
                if outline_only {
                    let edge = !in_diamond(x - 1, y)
                        || !in_diamond(x + 1, y)
                        || !in_diamond(x, y - 1)
                        || !in_diamond(x, y + 1);
                    if edge { colors.top } else { 0 }
                } else {
                    colors.top
                }
            } else if (1..=height).any(|dy| in_diamond(x, y - dy)) {
                if x < half { colors.left } else { colors.right }
            } else {
                0
            };
            pixels[y as usize * width + x as usize] = index;
        }
    }

    (width, rows, -half, -(height + half / 2), pixels)
}

fn add_box(store: &mut SpriteStore, half: i32, height: i32, colors: BoxColors) -> ImageId {
    let (w, h, ox, oy, pixels) = iso_box(half, height, colors, false);
    store.add(Sprite::bitmap(w, h, ox, oy, pixels))
}

fn add_rle_box(store: &mut SpriteStore, half: i32, height: i32, colors: BoxColors) -> ImageId {
    let (w, h, ox, oy, pixels) = iso_box(half, height, colors, false);
    store.add(Sprite::rle(w, h, ox, oy, &pixels))
}

/// Image handles for everything the procedural set contains
#[derive(Clone, Copy, Debug)]
pub struct DemoImages {
    pub grass: ImageId,
    pub cliff_edge: ImageId,
    pub path: ImageId,
    pub track: ImageId,
    pub station_lights: ImageId,
    pub supports: ImageId,
    pub tree: ImageId,
    pub bench: ImageId,
    pub entrance: ImageId,
    pub wall: ImageId,
    pub large_scenery: ImageId,
    pub banner: ImageId,
    pub guest: ImageId,
    pub staff: ImageId,
    pub vehicle: ImageId,
    pub litter: ImageId,
    pub duck: ImageId,
    /// Remap table that recolours guest shirts
    pub shirt_remap: u16,
}

impl SpriteStore {
    /// Build the demo sprite set and register the gridline and water overlays.
    pub fn procedural() -> (Self, DemoImages) {
        let mut store = SpriteStore::new(demo_palette());
        let c = |top, left, right| BoxColors { top, left, right };
        use PaletteIndex as P;

        let grass = add_box(&mut store, 32, 0, c(P::GRASS_TOP, P::GRASS_LEFT, P::GRASS_RIGHT));
        let cliff_edge = {
            let (w, h, ox, _, pixels) = iso_box(32, 16, c(P::GRASS_TOP, P::ROCK_LEFT, P::ROCK_RIGHT), false);
            store.add(Sprite::bitmap(w, h, ox, -16, pixels))
        };
        let gridline = {
            let (w, h, ox, oy, pixels) = iso_box(32, 0, c(P::GRIDLINE, 0, 0), true);
            store.add(Sprite::bitmap(w, h, ox, oy, pixels))
        };
        let water = add_rle_box(&mut store, 32, 0, c(P::WATER, P::WATER, P::WATER));
        store.overlays.gridline = Some(gridline);
        store.overlays.water = Some(water);

        let path = add_box(&mut store, 30, 2, c(P::PATH_TOP, P::PATH_SIDE, P::PATH_SIDE));
        let track = add_rle_box(&mut store, 28, 4, c(P::TRACK_TOP, P::TRACK_SIDE, P::TRACK_SIDE));
        let station_lights = add_box(&mut store, 2, 3, c(P::LAMP, P::YELLOW, P::YELLOW));
        let supports = {
            let (w, h, ox, _, pixels) = iso_box(4, 24, c(P::SUPPORT, P::SUPPORT, P::STONE_SIDE), false);
            store.add(Sprite::bitmap(w, h, ox, -2, pixels))
        };
        let tree = add_rle_box(&mut store, 10, 30, c(P::LEAF_TOP, P::LEAF_SIDE, P::WOOD));
        let bench = add_box(&mut store, 8, 5, c(P::WOOD, P::WOOD, P::GRASS_RIGHT));
        let entrance = add_box(&mut store, 22, 26, c(P::BANNER, P::STONE_SIDE, P::STONE_TOP));
        let wall = add_box(&mut store, 16, 20, c(P::STONE_TOP, P::STONE_SIDE, P::STONE_SIDE));
        let large_scenery = add_rle_box(&mut store, 32, 44, c(P::STONE_TOP, P::STONE_SIDE, P::ROCK_RIGHT));
        let banner = add_box(&mut store, 3, 18, c(P::BANNER, P::BANNER, P::RED));
        let guest = add_box(&mut store, 3, 14, c(P::WHITE, P::SHIRT, P::SHIRT));
        let staff = add_box(&mut store, 3, 14, c(P::WHITE, P::STAFF, P::STAFF));
        let vehicle = add_box(&mut store, 10, 8, c(P::CAR_TOP, P::CAR_SIDE, P::CAR_SIDE));
        let litter = add_box(&mut store, 2, 1, c(P::LITTER, P::LITTER, P::LITTER));
        let duck = add_box(&mut store, 3, 3, c(P::YELLOW, P::WOOD, P::WOOD));

        let mut shirts = identity_remap();
        shirts[P::SHIRT as usize] = P::SHIRT_ALT;
        let shirt_remap = store.add_remap(shirts);

        let images = DemoImages {
            grass,
            cliff_edge,
            path,
            track,
            station_lights,
            supports,
            tree,
            bench,
            entrance,
            wall,
            large_scenery,
            banner,
            guest,
            staff,
            vehicle,
            litter,
            duck,
            shirt_remap,
        };
        (store, images)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_tile_is_diamond() {
        let (store, images) = SpriteStore::procedural();
        let tile = store.get(images.grass).expect("grass sprite");
        assert_eq!((tile.width, tile.height), (64, 32));
        assert_eq!((tile.x_offset, tile.y_offset), (-32, -16));
        // Centre opaque, corners transparent
        assert!(tile.is_pixel_present(32, 16, None));
        assert!(!tile.is_pixel_present(0, 0, None));
        assert!(!tile.is_pixel_present(63, 31, None));
    }

    #[test]
    fn test_box_anchor_is_base_centre() {
        let (store, images) = SpriteStore::procedural();
        let guest = store.get(images.guest).expect("guest sprite");
        // Base diamond centre lands on the anchor
        let base_x = -guest.x_offset;
        let base_y = -guest.y_offset;
        assert!(guest.is_pixel_present(base_x, base_y, None));
        assert_eq!(guest.height, 3 + 14);
    }

    #[test]
    fn test_overlays_registered() {
        let (store, _) = SpriteStore::procedural();
        assert!(store.overlays.gridline.is_some());
        assert!(store.overlays.water.is_some());
    }
}
