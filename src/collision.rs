//! Physics query result structures.
//!
//! Backends report sensor query results through [`CastHit`]. The core only
//! branches on hit/no-hit; the contact metadata is carried for listeners and
//! debugging overlays.

use bevy::prelude::*;

/// Information about a shape-cast hit.
#[derive(Debug, Clone, Copy, Default)]
pub struct CastHit {
    /// Distance travelled by the cast shape before impact.
    pub distance: f32,
    /// Normal of the surface at the hit point.
    pub normal: Vec2,
    /// World position of the hit point.
    pub point: Vec2,
    /// Entity that was hit (if any).
    pub entity: Option<Entity>,
}

impl CastHit {
    /// Create a hit result.
    pub fn new(distance: f32, normal: Vec2, point: Vec2, entity: Option<Entity>) -> Self {
        Self {
            distance,
            normal,
            point,
            entity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cast_hit_fields() {
        let hit = CastHit::new(5.0, Vec2::Y, Vec2::new(10.0, 0.0), None);

        assert_eq!(hit.distance, 5.0);
        assert_eq!(hit.normal, Vec2::Y);
        assert_eq!(hit.point, Vec2::new(10.0, 0.0));
        assert!(hit.entity.is_none());
    }

    #[test]
    fn cast_hit_with_entity() {
        let mut world = World::new();
        let entity = world.spawn_empty().id();
        let hit = CastHit::new(3.0, Vec2::X, Vec2::ZERO, Some(entity));

        assert_eq!(hit.entity, Some(entity));
    }
}
