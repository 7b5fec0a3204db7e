use std::path::Path;

use anyhow::Context;
use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use gltf::buffer;
use id_arena::Id;
use itertools::izip;

pub type ModelId = Id<Model>;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
}

pub struct ModelPrimitive {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

/// CPU-side mesh data. Loaded once; the renderer uploads it and leaves refer
/// to it by `ModelId`.
pub struct Model {
    pub name: String,
    pub primitives: Vec<ModelPrimitive>,
}

pub type Buffers<'a> = &'a [buffer::Data];

impl Model {
    /// Loads the first mesh found in a glTF file.
    pub fn load_gltf(path: impl AsRef<Path>) -> anyhow::Result<Model> {
        let path = path.as_ref();
        let (document, buffers, _images) = gltf::import(path)
            .with_context(|| format!("Failed to import glTF file {}", path.display()))?;

        let mesh = document
            .meshes()
            .next()
            .with_context(|| format!("No meshes in {}", path.display()))?;

        let name = mesh
            .name()
            .map(String::from)
            .unwrap_or_else(|| path.display().to_string());

        Model::from_gltf(name, mesh, &buffers)
    }

    pub fn from_gltf(
        name: impl Into<String>,
        mesh: gltf::Mesh,
        buffers: Buffers,
    ) -> anyhow::Result<Model> {
        let mut model = Model {
            name: name.into(),
            primitives: Vec::new(),
        };

        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                return Err(anyhow::anyhow!(
                    "Unsupported primitive mode: {:?}",
                    primitive.mode()
                ));
            }

            let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

            let position_reader = reader
                .read_positions()
                .with_context(|| format!("Primitive without positions in {}", model.name))?;
            let normal_reader = reader
                .read_normals()
                .with_context(|| format!("Primitive without normals in {}", model.name))?;

            let vertices = izip!(position_reader, normal_reader)
                .map(|(position, normal)| Vertex {
                    position: Vec3::from(position),
                    normal: Vec3::from(normal),
                })
                .collect::<Vec<Vertex>>();

            let indices = match reader.read_indices() {
                Some(index_reader) => index_reader.into_u32().collect::<Vec<u32>>(),
                None => (0..vertices.len() as u32).collect(),
            };

            model.primitives.push(ModelPrimitive {
                vertices,
                indices,
            });
        }

        if model.primitives.is_empty() {
            return Err(anyhow::anyhow!("Mesh without primitives: {}", model.name));
        }

        Ok(model)
    }

    /// An axis-aligned cube centered on the origin, with per-face normals and
    /// counter-clockwise winding seen from outside.
    pub fn cube(name: impl Into<String>, half_extent: f32) -> Model {
        const FACES: [(Vec3, Vec3, Vec3); 6] = [
            (Vec3::X, Vec3::Y, Vec3::Z),
            (Vec3::NEG_X, Vec3::Y, Vec3::NEG_Z),
            (Vec3::Y, Vec3::Z, Vec3::X),
            (Vec3::NEG_Y, Vec3::Z, Vec3::NEG_X),
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
        ];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);

        for (normal, u, v) in FACES {
            // u x v == normal for every face, so (-u,-v) -> (u,-v) -> (u,v) is CCW.
            let base = vertices.len() as u32;
            for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                vertices.push(Vertex {
                    position: (normal + u * su + v * sv) * half_extent,
                    normal,
                });
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Model {
            name: name.into(),
            primitives: vec![ModelPrimitive {
                vertices,
                indices,
            }],
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.primitives
            .iter()
            .map(|primitive| primitive.vertices.len())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_has_six_quads() {
        let cube = Model::cube("Cube", 0.5);
        assert_eq!(cube.primitives.len(), 1);
        assert_eq!(cube.vertex_count(), 24);
        assert_eq!(cube.primitives[0].indices.len(), 36);
    }

    #[test]
    fn cube_vertices_lie_on_their_face() {
        let cube = Model::cube("Cube", 2.0);
        for vertex in &cube.primitives[0].vertices {
            assert_eq!(vertex.position.dot(vertex.normal), 2.0);
            assert_eq!(vertex.position.abs().max_element(), 2.0);
        }
    }

    #[test]
    fn cube_triangles_face_outwards() {
        let cube = Model::cube("Cube", 1.0);
        let primitive = &cube.primitives[0];
        for triangle in primitive.indices.chunks(3) {
            let [a, b, c] = [0, 1, 2].map(|i| primitive.vertices[triangle[i] as usize]);
            let face_normal = (b.position - a.position).cross(c.position - a.position);
            assert!(face_normal.dot(a.normal) > 0.0);
        }
    }

    #[test]
    fn missing_gltf_file_is_an_error() {
        let error = Model::load_gltf("does/not/exist.gltf")
            .err()
            .expect("loading a missing file should fail");
        assert!(error.to_string().contains("does/not/exist.gltf"));
    }
}
