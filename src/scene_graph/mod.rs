pub mod geode;
pub mod matrix_transform;
pub mod node;
pub mod scene;

pub use geode::{Geode, GeodeKind, LineSegment};
pub use matrix_transform::MatrixTransform;
pub use node::{Group, Node, NodeId};
pub use scene::Scene;
