//! Mesh and vertex definitions

use bytemuck::{Pod, Zeroable};

/// Vertex with position, normal, and UV coordinates
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    /// Create a new vertex
    pub const fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }

    /// Get the vertex buffer layout for wgpu
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                // Position
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // Normal
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // UV
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 6]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

/// A 3D mesh with vertices and indices
#[derive(Debug, Default)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    /// GPU vertex buffer (created when uploaded)
    pub(crate) vertex_buffer: Option<wgpu::Buffer>,
    /// GPU index buffer (created when uploaded)
    pub(crate) index_buffer: Option<wgpu::Buffer>,
}

impl Mesh {
    /// Create a mesh from vertices and indices
    pub fn from_data(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self {
            vertices,
            indices,
            vertex_buffer: None,
            index_buffer: None,
        }
    }

    /// Subdivided plane in the XY plane facing +Z, centered at the origin
    ///
    /// UVs run left to right and bottom to top.
    pub fn plane(width: f32, height: f32, segments_x: u32, segments_y: u32) -> Self {
        let segments_x = segments_x.max(1);
        let segments_y = segments_y.max(1);
        let columns = segments_x + 1;

        let segment_width = width / segments_x as f32;
        let segment_height = height / segments_y as f32;

        let mut vertices = Vec::with_capacity((columns * (segments_y + 1)) as usize);
        for iy in 0..=segments_y {
            let y = iy as f32 * segment_height - height / 2.0;
            for ix in 0..=segments_x {
                let x = ix as f32 * segment_width - width / 2.0;
                vertices.push(Vertex::new(
                    [x, -y, 0.0],
                    [0.0, 0.0, 1.0],
                    [
                        ix as f32 / segments_x as f32,
                        1.0 - iy as f32 / segments_y as f32,
                    ],
                ));
            }
        }

        let mut indices = Vec::with_capacity((segments_x * segments_y * 6) as usize);
        for iy in 0..segments_y {
            for ix in 0..segments_x {
                let a = ix + columns * iy;
                let b = ix + columns * (iy + 1);
                let c = ix + 1 + columns * (iy + 1);
                let d = ix + 1 + columns * iy;
                indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }

        Self::from_data(vertices, indices)
    }

    /// Get the number of indices
    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    /// Check if the mesh has been uploaded to GPU
    pub fn is_uploaded(&self) -> bool {
        self.vertex_buffer.is_some() && self.index_buffer.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plane_counts() {
        let plane = Mesh::plane(1.0, 1.0, 128, 128);
        assert_eq!(plane.vertices.len(), 129 * 129);
        assert_eq!(plane.index_count(), 128 * 128 * 6);
        assert!(!plane.is_uploaded());
    }

    #[test]
    fn test_plane_extent_and_winding() {
        let plane = Mesh::plane(1.0, 1.6, 2, 4);
        let max_y = plane
            .vertices
            .iter()
            .map(|v| v.position[1])
            .fold(f32::MIN, f32::max);
        assert!((max_y - 0.8).abs() < 1e-6);

        // First triangle must face +Z (counter-clockwise seen from the front)
        let p = |i: u32| glam::Vec3::from(plane.vertices[i as usize].position);
        let (a, b, c) = (p(plane.indices[0]), p(plane.indices[1]), p(plane.indices[2]));
        assert!((b - a).cross(c - a).z > 0.0);
    }
}
