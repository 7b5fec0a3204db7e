use anyhow::bail;
use glam::{EulerRot, Mat4, Quat, Vec2, Vec3};

use crate::config::HmdConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eye {
    Left,
    Right,
}

impl Eye {
    pub const BOTH: [Eye; 2] = [Eye::Left, Eye::Right];

    fn side(self) -> f32 {
        match self {
            Eye::Left => -1.0,
            Eye::Right => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeView {
    pub eye: Eye,
    pub position: Vec3,
    pub view: Mat4,
    pub projection: Mat4,
    pub viewport: Viewport,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl Pose {
    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.orientation, self.position)
    }

    pub fn forward(&self) -> Vec3 {
        self.orientation * Vec3::NEG_Z
    }

    pub fn up(&self) -> Vec3 {
        self.orientation * Vec3::Y
    }

    pub fn right(&self) -> Vec3 {
        self.orientation * Vec3::X
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hand {
    Left,
    Right,
}

impl Hand {
    pub const BOTH: [Hand; 2] = [Hand::Left, Hand::Right];

    fn side(self) -> f32 {
        match self {
            Hand::Left => -1.0,
            Hand::Right => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerState {
    pub pose: Pose,
    pub trigger: bool,
}

/// Input from both tracked controllers for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandStates {
    pub left: ControllerState,
    pub right: ControllerState,
    /// Any face button is held.
    pub button: bool,
}

impl HandStates {
    pub fn get(&self, hand: Hand) -> &ControllerState {
        match hand {
            Hand::Left => &self.left,
            Hand::Right => &self.right,
        }
    }
}

/// Session owner for a head-mounted display. Provides the head and hand poses,
/// the per-eye cameras for stereo rendering and controller haptics.
pub trait HeadMountedDisplay {
    fn begin_session(&mut self) -> anyhow::Result<()>;
    fn end_session(&mut self);
    fn is_session_active(&self) -> bool;
    fn head_pose(&self) -> Pose;
    fn hands(&self) -> HandStates;
    /// Cameras for both eyes, rendering side by side into a `width` x `height` target.
    fn eye_views(&self, width: u32, height: u32) -> [EyeView; 2];
    fn recenter(&mut self);
    /// Vibrates both controllers, `0.0` stops them.
    fn set_vibration(&mut self, amplitude: f32);
}

/// An HMD emulated on a desktop window. The head stays at the configured
/// position and both hands, mirrored left and right of it, aim where the
/// cursor points.
pub struct DesktopHmd {
    config: HmdConfig,
    session_active: bool,
    head: Pose,
    aim: Vec2,
    triggers: [bool; 2],
    button: bool,
    vibration: f32,
}

impl DesktopHmd {
    pub fn new(config: HmdConfig) -> Self {
        Self {
            head: Pose::new(config.head_position, Quat::IDENTITY),
            config,
            session_active: false,
            aim: Vec2::ZERO,
            triggers: [false; 2],
            button: false,
            vibration: 0.0,
        }
    }

    /// `cursor` is in normalized window coordinates, -1..1 on both axes, +y up.
    pub fn aim_at(&mut self, cursor: Vec2) {
        self.aim = cursor.clamp(Vec2::NEG_ONE, Vec2::ONE);
    }

    pub fn set_trigger(&mut self, hand: Hand, pressed: bool) {
        self.triggers[hand as usize] = pressed;
    }

    pub fn set_button(&mut self, pressed: bool) {
        self.button = pressed;
    }

    fn controller(&self, hand: Hand) -> ControllerState {
        let head = self.head_pose();
        let max_angle = self.config.max_aim_degrees.to_radians();
        let aim = Quat::from_euler(
            EulerRot::YXZ,
            -self.aim.x * max_angle,
            self.aim.y * max_angle,
            0.0,
        );

        let offset = self.config.hand_offset;
        let offset = Vec3::new(offset.x * hand.side(), offset.y, offset.z);

        ControllerState {
            pose: Pose::new(
                head.position + head.orientation * offset,
                head.orientation * aim,
            ),
            trigger: self.triggers[hand as usize],
        }
    }

    fn eye_view(&self, eye: Eye, width: u32, height: u32) -> EyeView {
        let head = self.head_pose();
        let eye_width = width as f32 / 2.0;
        let aspect = if height == 0 {
            1.0
        } else {
            eye_width / height as f32
        };

        let position = head.position + head.right() * (eye.side() * self.config.ipd / 2.0);
        let view = Mat4::look_to_rh(position, head.forward(), head.up());
        let projection = Mat4::perspective_rh(
            self.config.fov_y_degrees.to_radians(),
            aspect,
            self.config.near,
            self.config.far,
        );

        let x = match eye {
            Eye::Left => 0.0,
            Eye::Right => eye_width,
        };

        EyeView {
            eye,
            position,
            view,
            projection,
            viewport: Viewport {
                x,
                y: 0.0,
                width: eye_width,
                height: height as f32,
            },
        }
    }
}

impl HeadMountedDisplay for DesktopHmd {
    fn begin_session(&mut self) -> anyhow::Result<()> {
        if self.session_active {
            bail!("HMD session is already active");
        }

        self.session_active = true;
        log::info!(
            "Started desktop HMD session (IPD {:.1} mm, vertical FOV {}°)",
            self.config.ipd * 1000.0,
            self.config.fov_y_degrees
        );

        Ok(())
    }

    fn end_session(&mut self) {
        if self.session_active {
            log::info!("Ended desktop HMD session");
        }
        self.session_active = false;
        self.vibration = 0.0;
    }

    fn is_session_active(&self) -> bool {
        self.session_active
    }

    fn head_pose(&self) -> Pose {
        self.head
    }

    fn hands(&self) -> HandStates {
        HandStates {
            left: self.controller(Hand::Left),
            right: self.controller(Hand::Right),
            button: self.button,
        }
    }

    fn eye_views(&self, width: u32, height: u32) -> [EyeView; 2] {
        Eye::BOTH.map(|eye| self.eye_view(eye, width, height))
    }

    fn recenter(&mut self) {
        self.head = Pose::new(self.config.head_position, Quat::IDENTITY);
        self.aim = Vec2::ZERO;
    }

    fn set_vibration(&mut self, amplitude: f32) {
        if amplitude > 0.0 && self.vibration == 0.0 {
            log::debug!("Controllers buzzing at {amplitude}");
        }
        self.vibration = amplitude;
    }
}
