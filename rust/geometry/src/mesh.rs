// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh data structures

use nalgebra::{Matrix4, Point3, Vector3};

/// Axis-aligned bounding box in f32 scene units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl Aabb {
    /// Bounds enclosing a single point
    pub fn from_point(p: Point3<f32>) -> Self {
        Self { min: p, max: p }
    }

    /// Grow to include a point
    #[inline]
    pub fn expand(&mut self, p: Point3<f32>) {
        self.min = self.min.inf(&p);
        self.max = self.max.sup(&p);
    }

    /// Smallest box enclosing both
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    pub fn center(&self) -> Point3<f32> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Length of the box diagonal
    pub fn diagonal(&self) -> f32 {
        (self.max - self.min).norm()
    }

    /// Bounds of the eight corners after transformation
    pub fn transformed(&self, matrix: &Matrix4<f32>) -> Aabb {
        let corners = [
            Point3::new(self.min.x, self.min.y, self.min.z),
            Point3::new(self.max.x, self.min.y, self.min.z),
            Point3::new(self.min.x, self.max.y, self.min.z),
            Point3::new(self.max.x, self.max.y, self.min.z),
            Point3::new(self.min.x, self.min.y, self.max.z),
            Point3::new(self.max.x, self.min.y, self.max.z),
            Point3::new(self.min.x, self.max.y, self.max.z),
            Point3::new(self.max.x, self.max.y, self.max.z),
        ];
        let mut out = Aabb::from_point(matrix.transform_point(&corners[0]));
        for corner in &corners[1..] {
            out.expand(matrix.transform_point(corner));
        }
        out
    }
}

/// Triangle mesh
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    /// Vertex positions (x, y, z)
    pub positions: Vec<f32>,
    /// Vertex normals (nx, ny, nz)
    pub normals: Vec<f32>,
    /// Triangle indices (i0, i1, i2)
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(vertex_count: usize, index_count: usize) -> Self {
        Self {
            positions: Vec::with_capacity(vertex_count * 3),
            normals: Vec::with_capacity(vertex_count * 3),
            indices: Vec::with_capacity(index_count),
        }
    }

    /// Add a vertex with normal, returning its index
    #[inline]
    pub fn add_vertex(&mut self, position: Point3<f64>, normal: Vector3<f64>) -> u32 {
        let index = self.vertex_count() as u32;
        self.positions
            .extend_from_slice(&[position.x as f32, position.y as f32, position.z as f32]);
        self.normals
            .extend_from_slice(&[normal.x as f32, normal.y as f32, normal.z as f32]);
        index
    }

    #[inline]
    pub fn add_triangle(&mut self, i0: u32, i1: u32, i2: u32) {
        self.indices.extend_from_slice(&[i0, i1, i2]);
    }

    /// Merge another mesh into this one
    pub fn merge(&mut self, other: &Mesh) {
        if other.is_empty() {
            return;
        }
        let vertex_offset = self.vertex_count() as u32;
        self.positions.extend_from_slice(&other.positions);
        if self.normals.len() + other.normals.len() == self.positions.len() {
            self.normals.extend_from_slice(&other.normals);
        } else {
            // One side lacks normals; drop them and let calculate_normals rebuild
            self.normals.clear();
        }
        self.indices
            .extend(other.indices.iter().map(|&i| i + vertex_offset));
    }

    /// Apply a transformation in f64 before narrowing to f32
    pub fn transform(&mut self, matrix: &Matrix4<f64>) {
        for chunk in self.positions.chunks_exact_mut(3) {
            let p = matrix.transform_point(&Point3::new(
                chunk[0] as f64,
                chunk[1] as f64,
                chunk[2] as f64,
            ));
            chunk[0] = p.x as f32;
            chunk[1] = p.y as f32;
            chunk[2] = p.z as f32;
        }

        // Normals use the inverse transpose of the linear part
        let linear = matrix.fixed_view::<3, 3>(0, 0).into_owned();
        let normal_matrix = linear
            .try_inverse()
            .map(|inv| inv.transpose())
            .unwrap_or(linear);
        for chunk in self.normals.chunks_exact_mut(3) {
            let n = normal_matrix * Vector3::new(chunk[0] as f64, chunk[1] as f64, chunk[2] as f64);
            let n = n.try_normalize(1e-12).unwrap_or(n);
            chunk[0] = n.x as f32;
            chunk[1] = n.y as f32;
            chunk[2] = n.z as f32;
        }
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() || self.indices.is_empty()
    }

    /// Bounding box, None for an empty mesh
    pub fn bounds(&self) -> Option<Aabb> {
        let mut chunks = self.positions.chunks_exact(3);
        let first = chunks.next()?;
        let mut aabb = Aabb::from_point(Point3::new(first[0], first[1], first[2]));
        for chunk in chunks {
            aabb.expand(Point3::new(chunk[0], chunk[1], chunk[2]));
        }
        Some(aabb)
    }

    /// Drop triangles that reference vertices outside the position buffer
    pub fn retain_valid_triangles(&mut self) -> usize {
        let count = self.vertex_count() as u32;
        let before = self.triangle_count();
        let valid: Vec<u32> = self
            .indices
            .chunks_exact(3)
            .filter(|tri| tri.iter().all(|&i| i < count))
            .flatten()
            .copied()
            .collect();
        self.indices = valid;
        before - self.triangle_count()
    }
}

/// Compute smooth vertex normals by accumulating face normals
pub fn calculate_normals(mesh: &mut Mesh) {
    let vertex_count = mesh.vertex_count();
    if vertex_count == 0 {
        return;
    }

    let point = |i: usize| {
        Point3::new(
            mesh.positions[i * 3] as f64,
            mesh.positions[i * 3 + 1] as f64,
            mesh.positions[i * 3 + 2] as f64,
        )
    };

    let mut normals = vec![Vector3::<f64>::zeros(); vertex_count];
    for tri in mesh.indices.chunks_exact(3) {
        let (i0, i1, i2) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        let normal = (point(i1) - point(i0)).cross(&(point(i2) - point(i0)));
        normals[i0] += normal;
        normals[i1] += normal;
        normals[i2] += normal;
    }

    mesh.normals = normals
        .into_iter()
        .flat_map(|n| {
            let n = n.try_normalize(1e-12).unwrap_or_else(Vector3::z);
            [n.x as f32, n.y as f32, n.z as f32]
        })
        .collect();
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn triangle() -> Mesh {
        let mut mesh = Mesh::new();
        mesh.add_vertex(Point3::new(0.0, 0.0, 0.0), Vector3::z());
        mesh.add_vertex(Point3::new(1.0, 0.0, 0.0), Vector3::z());
        mesh.add_vertex(Point3::new(0.0, 1.0, 0.0), Vector3::z());
        mesh.add_triangle(0, 1, 2);
        mesh
    }

    #[test]
    fn test_mesh_creation() {
        let mesh = Mesh::new();
        assert!(mesh.is_empty());
        assert_eq!(mesh.vertex_count(), 0);
        assert!(mesh.bounds().is_none());
    }

    #[test]
    fn test_merge_offsets_indices() {
        let mut mesh = triangle();
        mesh.merge(&triangle());
        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(&mesh.indices[3..], &[3, 4, 5]);
        assert_eq!(mesh.normals.len(), 18);
    }

    #[test]
    fn test_transform_translates_and_keeps_normals_unit() {
        let mut mesh = triangle();
        let matrix = Matrix4::new_translation(&Vector3::new(10.0, 0.0, 0.0))
            * Matrix4::new_nonuniform_scaling(&Vector3::new(2.0, 2.0, 2.0));
        mesh.transform(&matrix);
        assert_relative_eq!(mesh.positions[3], 12.0);
        assert_relative_eq!(mesh.normals[2], 1.0);
    }

    #[test]
    fn test_bounds() {
        let bounds = triangle().bounds().unwrap();
        assert_eq!(bounds.min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(bounds.max, Point3::new(1.0, 1.0, 0.0));
        assert_relative_eq!(bounds.diagonal(), 2.0f32.sqrt());
    }

    #[test]
    fn test_calculate_normals() {
        let mut mesh = triangle();
        mesh.normals.clear();
        calculate_normals(&mut mesh);
        assert_eq!(mesh.normals, vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_retain_valid_triangles() {
        let mut mesh = triangle();
        mesh.add_triangle(0, 1, 7);
        assert_eq!(mesh.retain_valid_triangles(), 1);
        assert_eq!(mesh.triangle_count(), 1);
    }
}
