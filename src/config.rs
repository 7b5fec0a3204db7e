use std::{path::PathBuf, time::Duration};

use glam::Vec3;

use crate::lighting::{default_lights, PointLight, MAX_LIGHTS};

const SEED_VAR: &str = "MINIMAL_VR_SEED";
const PROP_COUNT_VAR: &str = "MINIMAL_VR_PROPS";
const MODEL_DIR_VAR: &str = "MINIMAL_VR_MODEL_DIR";

#[derive(Debug, Clone)]
pub struct HmdConfig {
    /// Interpupillary distance in meters.
    pub ipd: f32,
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub head_position: Vec3,
    /// Right hand position relative to the head, in head space. The left
    /// hand mirrors it across the head's vertical plane.
    pub hand_offset: Vec3,
    pub max_aim_degrees: f32,
}

impl Default for HmdConfig {
    fn default() -> Self {
        Self {
            ipd: 0.064,
            fov_y_degrees: 90.0,
            near: 0.05,
            far: 100.0,
            head_position: Vec3::new(0.0, 0.0, 4.0),
            hand_offset: Vec3::new(0.25, -0.3, -0.3),
            max_aim_degrees: 60.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DemoConfig {
    pub window_title: String,
    /// CO2 props spawned at random positions when a round starts.
    pub prop_count: usize,
    /// The round is lost once more CO2 props than this are alive.
    pub max_props: usize,
    /// Extra CO2 props flooding the scene when a round is lost.
    pub overflow_props: usize,
    /// A new CO2 prop leaves the factory this often while playing.
    pub spawn_interval: Duration,
    /// Directory holding `co2.gltf`, `o2.gltf` and `factory.gltf`. Missing
    /// files fall back to cubes.
    pub model_dir: Option<PathBuf>,
    /// `None` seeds from OS entropy.
    pub seed: Option<u64>,
    /// A prop is hit when its position is closer than this to a laser.
    pub collision_radius: f32,
    pub laser_length: f32,
    pub laser_color: Vec3,
    pub factory_position: Vec3,
    /// Where props spawned during play appear.
    pub factory_spawn_point: Vec3,
    pub prop_scale: f32,
    pub clear_color: wgpu::Color,
    /// Clear color once every CO2 prop has been converted.
    pub win_clear_color: wgpu::Color,
    pub lights: [PointLight; MAX_LIGHTS],
    pub hmd: HmdConfig,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            window_title: "Minimal VR".to_string(),
            prop_count: 5,
            max_props: 10,
            overflow_props: 100,
            spawn_interval: Duration::from_millis(1400),
            model_dir: None,
            seed: None,
            collision_radius: 1.0,
            laser_length: 100.0,
            laser_color: Vec3::new(1.0, 0.1, 0.1),
            factory_position: Vec3::new(0.0, -10.0, -15.0),
            factory_spawn_point: Vec3::new(0.0, -9.0, -15.0),
            prop_scale: 0.4,
            clear_color: wgpu::Color {
                r: 0.0,
                g: 0.0,
                b: 128.0 / 255.0,
                a: 1.0,
            },
            win_clear_color: wgpu::Color {
                r: 0.0,
                g: 191.0 / 255.0,
                b: 1.0,
                a: 1.0,
            },
            lights: default_lights(),
            hmd: HmdConfig::default(),
        }
    }
}

impl DemoConfig {
    /// Defaults, overridden by `MINIMAL_VR_SEED`, `MINIMAL_VR_PROPS` and
    /// `MINIMAL_VR_MODEL_DIR`.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|name| std::env::var(name).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(value) = lookup(SEED_VAR) {
            match value.trim().parse() {
                Ok(seed) => self.seed = Some(seed),
                Err(e) => log::warn!("Ignoring {SEED_VAR}={value:?}: {e}"),
            }
        }

        if let Some(value) = lookup(PROP_COUNT_VAR) {
            match value.trim().parse() {
                Ok(count) => self.prop_count = count,
                Err(e) => log::warn!("Ignoring {PROP_COUNT_VAR}={value:?}: {e}"),
            }
        }

        if let Some(value) = lookup(MODEL_DIR_VAR).filter(|v| !v.trim().is_empty()) {
            self.model_dir = Some(PathBuf::from(value.trim()));
        }

        self
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn overrides(pairs: &[(&str, &str)]) -> DemoConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DemoConfig::default().with_overrides(|name| vars.get(name).cloned())
    }

    #[test]
    fn overrides_apply() {
        let config = overrides(&[(SEED_VAR, "42"), (PROP_COUNT_VAR, " 3 ")]);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.prop_count, 3);
    }

    #[test]
    fn model_dir_override_ignores_blank_values() {
        let config = overrides(&[(MODEL_DIR_VAR, "  ")]);
        assert_eq!(config.model_dir, None);

        let config = overrides(&[(MODEL_DIR_VAR, "assets/models")]);
        assert_eq!(config.model_dir, Some(PathBuf::from("assets/models")));
    }

    #[test]
    fn invalid_overrides_keep_defaults() {
        let config = overrides(&[(SEED_VAR, "not a number"), (PROP_COUNT_VAR, "-1")]);
        assert_eq!(config.seed, None);
        assert_eq!(config.prop_count, DemoConfig::default().prop_count);
    }
}
