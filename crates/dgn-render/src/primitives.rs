//! Procedural meshes for the demo scene: ground plane, cube, UV sphere.
//!
//! All meshes are centered on the origin with outward normals and
//! counter-clockwise winding seen from outside.

use glam::Vec3;

use crate::buffer::{MeshData, VertexPositionNormal};

fn vertex(position: Vec3, normal: Vec3) -> VertexPositionNormal {
    VertexPositionNormal {
        position: position.to_array(),
        normal: normal.to_array(),
    }
}

/// Append a quad spanning `center ± u ± v`, wound to face `normal`.
fn push_quad(mesh: &mut MeshData, center: Vec3, u: Vec3, v: Vec3, normal: Vec3) {
    let base = mesh.vertices.len() as u32;
    let corners = [center - u - v, center + u - v, center + u + v, center - u + v];
    mesh.vertices
        .extend(corners.iter().map(|&c| vertex(c, normal)));

    let facing = (corners[1] - corners[0])
        .cross(corners[2] - corners[0])
        .dot(normal);
    if facing >= 0.0 {
        mesh.indices
            .extend([base, base + 1, base + 2, base, base + 2, base + 3]);
    } else {
        mesh.indices
            .extend([base, base + 2, base + 1, base, base + 3, base + 2]);
    }
}

/// Square in the XZ plane facing +Y.
pub fn plane(half_extent: f32) -> MeshData {
    let mut mesh = MeshData::default();
    push_quad(
        &mut mesh,
        Vec3::ZERO,
        Vec3::X * half_extent,
        Vec3::Z * half_extent,
        Vec3::Y,
    );
    mesh
}

/// Axis-aligned cube, flat-shaded (four vertices per face).
pub fn cube(half_extent: f32) -> MeshData {
    let mut mesh = MeshData::default();
    for normal in [Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z] {
        let u = normal.any_orthonormal_vector();
        let v = normal.cross(u);
        push_quad(
            &mut mesh,
            normal * half_extent,
            u * half_extent,
            v * half_extent,
            normal,
        );
    }
    mesh
}

/// Latitude/longitude sphere. `sectors` and `stacks` are clamped to at least
/// 3 and 2.
pub fn uv_sphere(radius: f32, sectors: u32, stacks: u32) -> MeshData {
    let sectors = sectors.max(3);
    let stacks = stacks.max(2);
    let mut mesh = MeshData::default();

    for i in 0..=stacks {
        let phi = std::f32::consts::PI * i as f32 / stacks as f32;
        for j in 0..=sectors {
            let theta = std::f32::consts::TAU * j as f32 / sectors as f32;
            let normal = Vec3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin());
            mesh.vertices.push(vertex(normal * radius, normal));
        }
    }

    let row = sectors + 1;
    for i in 0..stacks {
        for j in 0..sectors {
            let k1 = i * row + j;
            let k2 = k1 + row;
            // Pole rows collapse to one point; skip their degenerate halves.
            if i != 0 {
                mesh.indices.extend([k1, k1 + 1, k2]);
            }
            if i != stacks - 1 {
                mesh.indices.extend([k1 + 1, k2 + 1, k2]);
            }
        }
    }
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every triangle's winding must agree with its vertex normals.
    fn assert_outward(mesh: &MeshData) {
        assert_eq!(mesh.indices.len() % 3, 0);
        for tri in mesh.indices.chunks(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| mesh.vertices[i as usize]);
            let pa = Vec3::from(a.position);
            let geometric = (Vec3::from(b.position) - pa).cross(Vec3::from(c.position) - pa);
            let shading = Vec3::from(a.normal) + Vec3::from(b.normal) + Vec3::from(c.normal);
            assert!(
                geometric.length() > 0.0,
                "degenerate triangle {tri:?}"
            );
            assert!(
                geometric.dot(shading) > 0.0,
                "triangle {tri:?} is wound inward"
            );
        }
    }

    #[test]
    fn test_plane_faces_up() {
        let mesh = plane(5.0);
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices.len(), 6);
        assert!(mesh.vertices.iter().all(|v| v.position[1] == 0.0));
        assert!(mesh.vertices.iter().all(|v| v.normal == [0.0, 1.0, 0.0]));
        assert_outward(&mesh);
    }

    #[test]
    fn test_cube_faces() {
        let mesh = cube(0.5);
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.indices.len(), 36);
        for v in &mesh.vertices {
            let p = Vec3::from(v.position);
            assert!((p.abs().max_element() - 0.5).abs() < 1e-6);
        }
        assert_outward(&mesh);
    }

    #[test]
    fn test_sphere_vertices_on_surface() {
        let mesh = uv_sphere(2.0, 16, 8);
        assert_eq!(mesh.vertices.len(), 17 * 9);
        // Two triangles per quad, minus one per quad in each pole row.
        assert_eq!(mesh.indices.len(), (16 * 8 * 2 - 2 * 16) * 3);
        for v in &mesh.vertices {
            assert!((Vec3::from(v.position).length() - 2.0).abs() < 1e-5);
            assert!((Vec3::from(v.normal).length() - 1.0).abs() < 1e-5);
        }
        assert_outward(&mesh);
    }

    #[test]
    fn test_sphere_clamps_resolution() {
        let mesh = uv_sphere(1.0, 0, 0);
        assert_eq!(mesh.vertices.len(), 4 * 3);
        assert_outward(&mesh);
    }
}
