use glam::{Mat4, Vec3};

use crate::{math::KINEMATIC_BOUNDS, scene_graph::node::Group};

/// A group with its own local matrix. Children are drawn with the parent
/// transform multiplied by this matrix.
///
/// Also carries a small kinematic state: every `update` spins the node about
/// its own position and moves it by `velocity`, bouncing off
/// [`KINEMATIC_BOUNDS`]. The cached position always equals the matrix
/// translation because every mutation goes through this type.
#[derive(Debug, Clone)]
pub struct MatrixTransform {
    group: Group,
    matrix: Mat4,
    degrees_per_tick: f32,
    axis: Vec3,
    velocity: Vec3,
    position: Vec3,
}

impl MatrixTransform {
    pub fn new(matrix: Mat4) -> Self {
        Self {
            group: Group::new(),
            matrix,
            degrees_per_tick: 0.0,
            axis: Vec3::Y,
            velocity: Vec3::ZERO,
            position: matrix.w_axis.truncate(),
        }
    }

    pub fn from_translation(translation: Vec3) -> Self {
        Self::new(Mat4::from_translation(translation))
    }

    pub fn with_spin(self, degrees_per_tick: f32, axis: Vec3) -> Self {
        Self {
            degrees_per_tick,
            axis,
            ..self
        }
    }

    pub fn with_velocity(self, velocity: Vec3) -> Self {
        Self { velocity, ..self }
    }

    pub fn group(&self) -> &Group {
        &self.group
    }

    pub fn group_mut(&mut self) -> &mut Group {
        &mut self.group
    }

    pub fn matrix(&self) -> Mat4 {
        self.matrix
    }

    pub fn set_matrix(&mut self, matrix: Mat4) {
        self.matrix = matrix;
        self.refresh_position();
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    pub fn degrees_per_tick(&self) -> f32 {
        self.degrees_per_tick
    }

    pub fn axis(&self) -> Vec3 {
        self.axis
    }

    /// Rotates about `axis` through the node's own position. Any non-zero
    /// axis is accepted; a zero axis yields a degenerate matrix.
    pub fn rotate(&mut self, degrees: f32, axis: Vec3) {
        self.apply_about_position(Mat4::from_axis_angle(
            axis.normalize(),
            degrees.to_radians(),
        ));
    }

    /// Uniformly scales about the node's own position.
    pub fn scale(&mut self, factor: f32) {
        self.apply_about_position(Mat4::from_scale(Vec3::splat(factor)));
    }

    pub fn translate(&mut self, delta: Vec3) {
        self.matrix = Mat4::from_translation(delta) * self.matrix;
        self.refresh_position();
    }

    /// One kinematic tick: spin, move, then reflect off the bounds.
    ///
    /// Axes are checked in x, y, z order. Each axis found outside flips its
    /// velocity component and moves the node once more by the whole updated
    /// velocity, so a bounce also shifts the other axes a second time.
    pub fn update(&mut self) {
        self.rotate(self.degrees_per_tick, self.axis);
        self.translate(self.velocity);

        for axis in 0..3 {
            if KINEMATIC_BOUNDS.is_outside_on_axis(self.position[axis], axis) {
                self.velocity[axis] = -self.velocity[axis];
                self.translate(self.velocity);
            }
        }
    }

    fn apply_about_position(&mut self, local: Mat4) {
        let position = self.matrix.w_axis.truncate();
        self.matrix = Mat4::from_translation(position)
            * local
            * Mat4::from_translation(-position)
            * self.matrix;
        self.refresh_position();
    }

    fn refresh_position(&mut self) {
        self.position = self.matrix.w_axis.truncate();
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use glam::{Quat, Vec4};

    use super::*;

    fn placed() -> MatrixTransform {
        MatrixTransform::new(Mat4::from_scale_rotation_translation(
            Vec3::splat(1.5),
            Quat::from_rotation_x(0.3),
            Vec3::new(2.0, -3.0, -7.0),
        ))
    }

    #[test]
    fn position_is_taken_from_the_initial_matrix() {
        assert_eq!(placed().position(), Vec3::new(2.0, -3.0, -7.0));
    }

    #[test]
    fn rotate_keeps_position() {
        let mut transform = placed();
        let before = transform.matrix().w_axis;

        transform.rotate(37.0, Vec3::new(1.0, 1.0, 0.0).normalize());

        assert_abs_diff_eq!(transform.matrix().w_axis, before, epsilon = 1e-5);
        assert_abs_diff_eq!(transform.position(), before.truncate(), epsilon = 1e-5);
    }

    #[test]
    fn rotate_normalizes_the_axis() {
        let mut transform = MatrixTransform::new(Mat4::IDENTITY);
        transform.rotate(90.0, Vec3::new(0.0, 2.0, 0.0));

        let matrix = transform.matrix();
        assert_abs_diff_eq!(matrix.y_axis.truncate().length(), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(matrix.transform_vector3(Vec3::X), Vec3::NEG_Z, epsilon = 1e-6);
    }

    #[test]
    fn rotate_turns_the_local_axes() {
        let mut transform = MatrixTransform::from_translation(Vec3::new(5.0, 0.0, 0.0));
        transform.rotate(90.0, Vec3::Z);

        let x_axis = transform.matrix().transform_vector3(Vec3::X);
        assert_abs_diff_eq!(x_axis, Vec3::Y, epsilon = 1e-6);
    }

    #[test]
    fn scale_keeps_position() {
        let mut transform = placed();
        let before = transform.matrix().w_axis;

        transform.scale(3.0);

        assert_abs_diff_eq!(transform.matrix().w_axis, before, epsilon = 1e-5);
        assert_abs_diff_eq!(
            transform.matrix().x_axis.truncate().length(),
            4.5,
            epsilon = 1e-5
        );
    }

    #[test]
    fn translate_changes_only_the_translation_column() {
        let mut transform = placed();
        let before = transform.matrix();
        let delta = Vec3::new(0.5, -1.25, 4.0);

        transform.translate(delta);
        let after = transform.matrix();

        assert_eq!(after.x_axis, before.x_axis);
        assert_eq!(after.y_axis, before.y_axis);
        assert_eq!(after.z_axis, before.z_axis);
        assert_abs_diff_eq!(
            after.w_axis,
            before.w_axis + Vec4::from((delta, 0.0)),
            epsilon = 1e-6
        );
        assert_abs_diff_eq!(transform.position(), after.w_axis.truncate());
    }

    #[test]
    fn set_matrix_refreshes_position() {
        let mut transform = placed();
        transform.set_matrix(Mat4::from_translation(Vec3::ONE));
        assert_eq!(transform.position(), Vec3::ONE);
    }

    #[test]
    fn update_spins_and_moves() {
        let mut transform = MatrixTransform::from_translation(Vec3::new(0.0, 0.0, -5.0))
            .with_spin(90.0, Vec3::Y)
            .with_velocity(Vec3::new(0.1, 0.0, 0.0));

        transform.update();

        assert_abs_diff_eq!(transform.position(), Vec3::new(0.1, 0.0, -5.0), epsilon = 1e-6);
        assert_abs_diff_eq!(
            transform.matrix().transform_vector3(Vec3::X),
            Vec3::NEG_Z,
            epsilon = 1e-6
        );
    }

    #[test]
    fn bounce_reflects_velocity_and_repositions() {
        let mut transform = MatrixTransform::from_translation(Vec3::new(9.99, 0.0, -5.0))
            .with_velocity(Vec3::new(0.05, 0.0, 0.0));

        transform.update();

        assert_eq!(transform.velocity().x, -0.05);
        assert!(transform.position().x <= 10.0 + 0.05);
        assert_abs_diff_eq!(transform.position().x, 9.99, epsilon = 1e-5);
    }

    #[test]
    fn bounce_moves_every_axis_by_the_reflected_velocity() {
        let mut transform = MatrixTransform::from_translation(Vec3::new(9.99, 0.0, -5.0))
            .with_velocity(Vec3::new(0.05, 0.03, 0.0));

        transform.update();

        assert_eq!(transform.velocity(), Vec3::new(-0.05, 0.03, 0.0));
        assert_abs_diff_eq!(transform.position(), Vec3::new(9.99, 0.06, -5.0), epsilon = 1e-5);
    }

    #[test]
    fn bounce_checks_every_axis() {
        let mut transform = MatrixTransform::from_translation(Vec3::new(9.99, -9.99, -0.01))
            .with_velocity(Vec3::new(0.05, -0.05, 0.05));

        transform.update();

        assert_eq!(transform.velocity(), Vec3::new(-0.05, 0.05, -0.05));
        // One full corrective step per bounced axis, applied x then y then z.
        assert_abs_diff_eq!(
            transform.position(),
            Vec3::new(9.89, -9.99, 0.09),
            epsilon = 1e-5
        );
    }

    #[test]
    fn bounce_on_the_far_z_bound() {
        let mut transform = MatrixTransform::from_translation(Vec3::new(0.0, 0.0, -19.98))
            .with_velocity(Vec3::new(0.0, 0.0, -0.05));

        transform.update();

        assert_eq!(transform.velocity().z, 0.05);
        assert!(transform.position().z >= -20.0 - 0.05);
    }

    #[test]
    fn drifting_up_reflects_off_the_ceiling() {
        let mut transform =
            MatrixTransform::new(Mat4::IDENTITY).with_velocity(Vec3::new(0.0, 0.02, 0.0));

        let mut flips = 0;
        let mut highest = f32::MIN;
        for _ in 0..501 {
            let before = transform.velocity().y;
            transform.update();
            if transform.velocity().y.signum() != before.signum() {
                flips += 1;
            }
            highest = highest.max(transform.position().y);
        }

        assert_eq!(flips % 2, 1);
        assert!(transform.velocity().y < 0.0);
        assert!(highest <= 10.0 + 0.02);
        assert_eq!(transform.position().x, 0.0);
    }

    #[test]
    fn zero_scale_is_not_guarded() {
        let mut transform = placed();
        transform.scale(0.0);
        assert_eq!(transform.matrix().x_axis.truncate(), Vec3::ZERO);
        assert_abs_diff_eq!(transform.position(), Vec3::new(2.0, -3.0, -7.0), epsilon = 1e-5);
    }
}
