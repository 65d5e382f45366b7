/// World model queried by the renderer
/// A square grid of tiles, each holding an ordered stack of tile elements,
/// plus free-moving entities indexed by the tile they stand on.
pub mod entity;
pub mod generator;
pub mod tile_element;

pub use entity::{Entity, EntityId, EntityKind, GuestState};
pub use generator::WorldConfig;
pub use tile_element::{RideId, TileElement, TileElementKind};

use crate::projection::{tile_floor, TILE_SIZE};
use glam::{IVec2, IVec3};
use std::collections::{BTreeMap, HashMap};

/// Largest supported map edge, in tiles
pub const MAXIMUM_MAP_SIZE: i32 = 256;
/// Playable area starts one tile in from the map edge
pub const MAP_MINIMUM_XY: i32 = TILE_SIZE;

pub struct World {
    /// Map edge in tiles
    size: i32,
    tiles: Vec<Vec<TileElement>>,
    entities: BTreeMap<EntityId, Entity>,
    /// Tile origin -> entity ids standing on it, kept sorted
    entity_tiles: HashMap<IVec2, Vec<EntityId>>,
    next_entity: u32,
    /// Weather gloom level; 0 means clear
    pub weather_gloom: u8,
}

impl World {
    pub fn new(size: i32) -> Self {
        let size = size.clamp(1, MAXIMUM_MAP_SIZE);
        Self {
            size,
            tiles: vec![Vec::new(); (size * size) as usize],
            entities: BTreeMap::new(),
            entity_tiles: HashMap::new(),
            next_entity: 0,
            weather_gloom: 0,
        }
    }

    /// Map edge in tiles
    #[inline]
    pub fn size(&self) -> i32 {
        self.size
    }

    #[inline]
    pub fn in_bounds(&self, pos: IVec2) -> bool {
        let extent = self.size * TILE_SIZE;
        pos.x >= 0 && pos.y >= 0 && pos.x < extent && pos.y < extent
    }

    /// Min/max world x and y the camera centre may take
    pub fn playable_bounds(&self) -> (i32, i32) {
        (MAP_MINIMUM_XY, self.size * TILE_SIZE - TILE_SIZE - 2)
    }

    #[inline]
    fn tile_index(&self, pos: IVec2) -> Option<usize> {
        if !self.in_bounds(pos) {
            return None;
        }
        let t = pos / TILE_SIZE;
        Some((t.y * self.size + t.x) as usize)
    }

    /// Element stack of the tile containing world position `pos`
    #[inline]
    pub fn tile_elements(&self, pos: IVec2) -> Option<&[TileElement]> {
        self.tile_index(pos).map(|i| self.tiles[i].as_slice())
    }

    /// Append an element to the tile at tile coordinates `tile`
    pub fn push_element(&mut self, tile: IVec2, element: TileElement) -> bool {
        match self.tile_index(tile * TILE_SIZE) {
            Some(i) => {
                self.tiles[i].push(element);
                true
            }
            None => false,
        }
    }

    /// Element `index` of the tile at tile coordinates `tile`
    pub fn tile_element(&self, tile: IVec2, index: usize) -> Option<&TileElement> {
        self.tile_elements(tile * TILE_SIZE)?.get(index)
    }

    pub fn clear_tile(&mut self, tile: IVec2) {
        if let Some(i) = self.tile_index(tile * TILE_SIZE) {
            self.tiles[i].clear();
        }
    }

    pub fn surface(&self, pos: IVec2) -> Option<&TileElement> {
        self.tile_elements(pos)?.iter().find(|e| e.is_surface())
    }

    /// Land height under `pos`; 0 off the map or on tiles without a surface
    #[inline]
    pub fn surface_height(&self, pos: IVec2) -> i32 {
        self.surface(pos).map(|e| e.base_z).unwrap_or(0)
    }

    pub fn spawn_entity(&mut self, kind: EntityKind, location: Option<IVec3>, image: crate::sprite::ImageId) -> EntityId {
        let id = EntityId(self.next_entity);
        self.next_entity += 1;
        self.entities.insert(
            id,
            Entity {
                id,
                kind,
                location: None,
                image,
            },
        );
        self.move_entity(id, location);
        id
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn set_entity_kind(&mut self, id: EntityId, kind: EntityKind) {
        if let Some(e) = self.entities.get_mut(&id) {
            e.kind = kind;
        }
    }

    pub fn move_entity(&mut self, id: EntityId, location: Option<IVec3>) {
        let Some(entity) = self.entities.get_mut(&id) else {
            return;
        };
        let old = entity.location.map(|l| tile_floor(l.truncate()));
        entity.location = location;
        let new = location.map(|l| tile_floor(l.truncate()));
        if old == new {
            return;
        }
        if let Some(tile) = old {
            self.unindex(tile, id);
        }
        if let Some(tile) = new {
            let ids = self.entity_tiles.entry(tile).or_default();
            if let Err(at) = ids.binary_search(&id) {
                ids.insert(at, id);
            }
        }
    }

    pub fn remove_entity(&mut self, id: EntityId) -> Option<Entity> {
        let entity = self.entities.remove(&id)?;
        if let Some(loc) = entity.location {
            self.unindex(tile_floor(loc.truncate()), id);
        }
        Some(entity)
    }

    fn unindex(&mut self, tile: IVec2, id: EntityId) {
        if let Some(ids) = self.entity_tiles.get_mut(&tile) {
            ids.retain(|&e| e != id);
            if ids.is_empty() {
                self.entity_tiles.remove(&tile);
            }
        }
    }

    /// Entities standing on the tile containing `pos`, in id order
    pub fn entities_near(&self, pos: IVec2) -> impl Iterator<Item = &Entity> + '_ {
        self.entity_tiles
            .get(&tile_floor(pos))
            .into_iter()
            .flatten()
            .filter_map(move |id| self.entities.get(id))
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.entities.values()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn element_count(&self) -> usize {
        self.tiles.iter().map(Vec::len).sum()
    }
}
