use glam::{Mat4, Vec3};

/// A line segment between two points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: Vec3,
    pub end: Vec3,
}

impl Segment {
    pub fn new(start: Vec3, end: Vec3) -> Self {
        Self { start, end }
    }

    pub fn transform(&self, matrix: &Mat4) -> Segment {
        Segment {
            start: matrix.transform_point3(self.start),
            end: matrix.transform_point3(self.end),
        }
    }

    pub fn closest_point(&self, point: Vec3) -> Vec3 {
        let direction = self.end - self.start;
        let length_squared = direction.length_squared();

        if length_squared <= f32::EPSILON {
            return self.start;
        }

        let t = ((point - self.start).dot(direction) / length_squared).clamp(0.0, 1.0);
        self.start + direction * t
    }

    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        (point - self.closest_point(point)).length()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn x_axis_segment() -> Segment {
        Segment::new(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0))
    }

    #[test]
    fn distance_to_interior_point_is_perpendicular() {
        let distance = x_axis_segment().distance_to_point(Vec3::new(4.0, 3.0, 0.0));
        assert_abs_diff_eq!(distance, 3.0, epsilon = 1e-6);
    }

    #[test]
    fn distance_beyond_end_uses_endpoint() {
        let segment = x_axis_segment();
        assert_abs_diff_eq!(
            segment.distance_to_point(Vec3::new(13.0, 4.0, 0.0)),
            5.0,
            epsilon = 1e-6
        );
        assert_abs_diff_eq!(
            segment.distance_to_point(Vec3::new(-3.0, 0.0, 4.0)),
            5.0,
            epsilon = 1e-6
        );
    }

    #[test]
    fn degenerate_segment_is_a_point() {
        let segment = Segment::new(Vec3::ONE, Vec3::ONE);
        assert_eq!(segment.closest_point(Vec3::ZERO), Vec3::ONE);
        assert_abs_diff_eq!(
            segment.distance_to_point(Vec3::new(1.0, 1.0, 3.0)),
            2.0,
            epsilon = 1e-6
        );
    }

    #[test]
    fn transform_moves_both_endpoints() {
        let moved = x_axis_segment().transform(&Mat4::from_translation(Vec3::Y));
        assert_abs_diff_eq!(moved.start, Vec3::Y, epsilon = 1e-6);
        assert_abs_diff_eq!(moved.end, Vec3::new(10.0, 1.0, 0.0), epsilon = 1e-6);
    }
}
