/// Tile element: one kind-tagged layer stacked on a tile
use crate::sprite::ImageId;
use glam::{IVec2, IVec3};

/// Ride identifier carried by track and entrance elements
pub type RideId = u16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TileElementKind {
    /// Terrain top; `edge` is the cliff skirt, `water_z` the water surface when flooded
    Surface {
        edge: Option<ImageId>,
        water_z: Option<i32>,
    },
    Path,
    Track {
        ride: RideId,
        supports: Option<ImageId>,
        station_lights: Option<ImageId>,
    },
    SmallScenery {
        vegetation: bool,
    },
    Entrance {
        ride: RideId,
    },
    Wall,
    LargeScenery {
        sequence: u8,
    },
    Banner {
        index: u16,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileElement {
    pub base_z: i32,
    pub clearance_z: i32,
    /// Facing, 0..=3; walls use it to pick the tile edge
    pub direction: u8,
    pub image: ImageId,
    pub kind: TileElementKind,
}

impl TileElement {
    pub fn new(kind: TileElementKind, base_z: i32, clearance_z: i32, image: ImageId) -> Self {
        Self {
            base_z,
            clearance_z: clearance_z.max(base_z),
            direction: 0,
            image,
            kind,
        }
    }

    pub fn surface(base_z: i32, image: ImageId) -> Self {
        Self::new(
            TileElementKind::Surface {
                edge: None,
                water_z: None,
            },
            base_z,
            base_z,
            image,
        )
    }

    pub fn with_direction(mut self, direction: u8) -> Self {
        self.direction = direction & 3;
        self
    }

    #[inline]
    pub fn is_surface(&self) -> bool {
        matches!(self.kind, TileElementKind::Surface { .. })
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.clearance_z - self.base_z
    }

    /// World-space bounding box `(origin, size)` for a tile with origin `tile`
    pub fn bounds(&self, tile: IVec2) -> (IVec3, IVec3) {
        let h = self.height().max(1);
        let origin = tile.extend(self.base_z);
        match self.kind {
            // Ground slabs end at base_z so anything standing on them sorts in front
            TileElementKind::Surface { .. } => (origin - IVec3::Z, IVec3::new(32, 32, 1)),
            TileElementKind::Path => (origin, IVec3::new(32, 32, 1)),
            TileElementKind::SmallScenery { .. } | TileElementKind::Banner { .. } => {
                (origin + IVec3::new(4, 4, 0), IVec3::new(24, 24, h))
            }
            TileElementKind::Wall => match self.direction {
                0 => (origin, IVec3::new(1, 32, h)),
                1 => (origin + IVec3::new(0, 31, 0), IVec3::new(32, 1, h)),
                2 => (origin + IVec3::new(31, 0, 0), IVec3::new(1, 32, h)),
                _ => (origin, IVec3::new(32, 1, h)),
            },
            TileElementKind::Track { .. }
            | TileElementKind::Entrance { .. }
            | TileElementKind::LargeScenery { .. } => (origin, IVec3::new(32, 32, h)),
        }
    }

    /// World point the element's sprite is anchored on
    pub fn anchor(&self, tile: IVec2) -> IVec3 {
        let centre = tile + IVec2::splat(16);
        let anchor = match (self.kind, self.direction) {
            (TileElementKind::Wall, 0) => IVec2::new(tile.x, centre.y),
            (TileElementKind::Wall, 1) => IVec2::new(centre.x, tile.y + 31),
            (TileElementKind::Wall, 2) => IVec2::new(tile.x + 31, centre.y),
            (TileElementKind::Wall, _) => IVec2::new(centre.x, tile.y),
            _ => centre,
        };
        anchor.extend(self.base_z)
    }
}
