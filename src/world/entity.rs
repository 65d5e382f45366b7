/// Free-moving entities: guests, staff, vehicles and small effects
use crate::sprite::ImageId;
use glam::{IVec2, IVec3};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuestState {
    Walking,
    /// Held by the cursor; no location while picked up
    PickedUp,
    /// Riding. `vehicle` is the car the guest sits in while it is on track;
    /// `ride_view` is the tile the ride is viewed from when the guest is inside.
    OnRide {
        vehicle: Option<EntityId>,
        ride_view: Option<IVec2>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityKind {
    Guest(GuestState),
    Staff { picked_up: bool },
    /// Ride car; `riders` is the seated-guest overlay drawn on top of it
    Vehicle { riders: Option<ImageId> },
    Litter,
    /// Ducks, balloons and other ambient sprites
    Misc,
    /// Floating money text left behind by a purchase
    MoneyEffect { amount: i32 },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    /// `None` while the entity is off the map (inside a ride, picked up)
    pub location: Option<IVec3>,
    pub image: ImageId,
}

impl Entity {
    /// World-space bounding box `(origin, size)` at the current location
    pub fn bounds(&self) -> Option<(IVec3, IVec3)> {
        let loc = self.location?;
        let (half, height) = match self.kind {
            EntityKind::Vehicle { .. } => (8, 12),
            EntityKind::Guest(_) | EntityKind::Staff { .. } => (2, 20),
            EntityKind::Litter | EntityKind::MoneyEffect { .. } => (2, 2),
            EntityKind::Misc => (2, 4),
        };
        Some((
            loc - IVec3::new(half, half, 0),
            IVec3::new(2 * half, 2 * half, height),
        ))
    }
}
