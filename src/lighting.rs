use bytemuck::{Pod, Zeroable};
use glam::Vec3;

pub const MAX_LIGHTS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl PointLight {
    pub fn white(position: Vec3) -> Self {
        Self {
            position,
            ambient: Vec3::splat(0.05),
            diffuse: Vec3::splat(0.8),
            specular: Vec3::splat(1.0),
            constant: 1.0,
            linear: 0.09,
            quadratic: 0.032,
        }
    }

    pub fn attenuation(&self, distance: f32) -> f32 {
        1.0 / (self.constant + self.linear * distance + self.quadratic * distance * distance)
    }
}

/// A point light in uniform buffer layout. Every member is padded to 16 bytes.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Pod, Zeroable)]
pub struct PointLightUniform {
    pub position: [f32; 4],
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    pub attenuation: [f32; 4],
}

impl From<&PointLight> for PointLightUniform {
    fn from(light: &PointLight) -> Self {
        Self {
            position: light.position.extend(1.0).to_array(),
            ambient: light.ambient.extend(1.0).to_array(),
            diffuse: light.diffuse.extend(1.0).to_array(),
            specular: light.specular.extend(1.0).to_array(),
            attenuation: [light.constant, light.linear, light.quadratic, 0.0],
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Pod, Zeroable)]
pub struct LightsUniformState {
    pub lights: [PointLightUniform; MAX_LIGHTS],
}

impl LightsUniformState {
    pub fn new(lights: &[PointLight; MAX_LIGHTS]) -> Self {
        Self {
            lights: lights.each_ref().map(PointLightUniform::from),
        }
    }
}

pub fn default_lights() -> [PointLight; MAX_LIGHTS] {
    [
        PointLight::white(Vec3::new(10.0, 10.0, 5.0)),
        PointLight::white(Vec3::new(10.0, 10.0, -20.0)),
        PointLight::white(Vec3::new(-10.0, 10.0, 5.0)),
        PointLight::white(Vec3::new(-10.0, 10.0, -20.0)),
    ]
}
