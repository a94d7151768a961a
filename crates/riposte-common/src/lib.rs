//! # Riposte Common
//!
//! Common types, utilities, and shared abstractions for Riposte.
//!
//! This crate provides foundational types used by the combat crates:
//! - Geometry (bounding boxes, segment clipping, facing directions)
//! - ID types (EntityId, ItemTypeId)
//! - Version information for definition files
//! - Common error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod geometry;
pub mod ids;
pub mod version;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::*;
    pub use crate::geometry::*;
    pub use crate::ids::*;
    pub use crate::version::*;
}

pub use glam::Vec3;
pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_generation() {
        let id1 = EntityId::new();
        let id2 = EntityId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_version_readability() {
        let v1 = SchemaVersion::new(1, 0, 0);
        let v2 = SchemaVersion::new(1, 1, 0);
        let v3 = SchemaVersion::new(2, 0, 0);

        // Same major reads either way
        assert!(v2.can_read(&v1));
        assert!(v1.can_read(&v2));
        assert!(!v1.can_read(&v3));
    }

    #[test]
    fn test_box_distance_from_eye() {
        let eye = Vec3::new(0.0, 1.6, 0.0);
        let target = Aabb::from_feet(Vec3::new(3.0, 0.0, 0.0), 0.6, 1.8);
        assert!((target.distance_to(eye) - 2.7).abs() < 1e-5);
    }
}
