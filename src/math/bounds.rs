use glam::Vec3;

/// The box moving props bounce inside of.
pub const KINEMATIC_BOUNDS: AABB = AABB {
    min: Vec3::new(-10.0, -10.0, -20.0),
    max: Vec3::new(10.0, 10.0, 0.0),
};

/// Where props appear at the start of a round.
pub const SPAWN_BOUNDS: AABB = AABB {
    min: Vec3::new(-9.0, -9.0, -19.0),
    max: Vec3::new(9.0, 9.0, 0.0),
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABB {
    pub min: Vec3,
    pub max: Vec3,
}

impl AABB {
    /// True when `value` lies outside the box on the given axis (0 = x, 1 = y, 2 = z).
    pub fn is_outside_on_axis(&self, value: f32, axis: usize) -> bool {
        value < self.min[axis] || value > self.max[axis]
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }
}
