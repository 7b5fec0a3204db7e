pub mod bounds;
pub mod segment;

pub use bounds::{AABB, KINEMATIC_BOUNDS, SPAWN_BOUNDS};
pub use segment::Segment;
