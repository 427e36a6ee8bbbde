//! Indexed triangle meshes and the collision queries the particle engine
//! consumes.
//!
//! Meshes are immutable triangle lists with per-vertex position/normal/UV.
//! Triangles are wound counter-clockwise when viewed from outside, so face
//! normals point outward. The [`cylinder`] and [`sphere`] builders produce
//! the closed per-branch geometry (`(base_width, top_width, length)` /
//! `(radius)`) that the rest of the pipeline feeds to the relaxation engine.

use glam::{Vec2, Vec3};

/// Geometric tolerance for parallel/degenerate ray-triangle configurations.
const RAY_EPSILON: f32 = 1e-7;

#[derive(Clone, Copy, Debug)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
}

/// Collision queries over a fixed triangle mesh.
///
/// The relaxation engine is written against this trait and never owns the
/// mesh; implementations only need these three read-only queries.
pub trait CollisionMesh {
    fn triangle_count(&self) -> usize;

    /// Standard ray/triangle intersection for one triangle.
    ///
    /// `direction` need not be normalized. Returns `None` on a miss and on
    /// parallel or degenerate configurations.
    fn ray_intersects_triangle(&self, origin: Vec3, direction: Vec3, tri: usize) -> Option<Vec3>;

    /// Unit outward normal of one triangle.
    fn surface_normal(&self, tri: usize) -> Vec3;
}

/// An immutable indexed triangle list.
#[derive(Debug, Default)]
pub struct TriangleMesh {
    pub vertices: Vec<Vertex>,
    pub triangles: Vec<[u32; 3]>,
}

impl TriangleMesh {
    fn corners(&self, tri: usize) -> (Vec3, Vec3, Vec3) {
        let [i0, i1, i2] = self.triangles[tri];
        (
            self.vertices[i0 as usize].position,
            self.vertices[i1 as usize].position,
            self.vertices[i2 as usize].position,
        )
    }
}

impl CollisionMesh for TriangleMesh {
    fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Möller–Trumbore intersection.
    fn ray_intersects_triangle(&self, origin: Vec3, direction: Vec3, tri: usize) -> Option<Vec3> {
        let (v0, v1, v2) = self.corners(tri);
        let e1 = v1 - v0;
        let e2 = v2 - v0;

        let p = direction.cross(e2);
        let det = e1.dot(p);
        // Parallel ray or zero-area triangle.
        if det.abs() < RAY_EPSILON {
            return None;
        }
        let inv_det = 1.0 / det;

        let s = origin - v0;
        let u = s.dot(p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(e1);
        let v = direction.dot(q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        // t is measured in units of `direction`; reject hits behind the
        // origin.
        let t = e2.dot(q) * inv_det;
        if t < RAY_EPSILON {
            return None;
        }
        Some(origin + direction * t)
    }

    fn surface_normal(&self, tri: usize) -> Vec3 {
        let (v0, v1, v2) = self.corners(tri);
        (v1 - v0).cross(v2 - v0).normalize_or_zero()
    }
}

/// Builds a closed cylinder (tapered tube plus caps) along +Z.
///
/// The base ring (radius `base_radius`) sits at z = 0, the top ring
/// (radius `top_radius`) at z = `length`, with radii interpolated linearly
/// in between. This is the branch-segment geometry: `(base_width,
/// top_width, length)`.
pub fn cylinder(
    base_radius: f32,
    top_radius: f32,
    length: f32,
    slices: usize,
    stacks: usize,
) -> TriangleMesh {
    let slices = slices.max(3);
    let stacks = stacks.max(1);
    let mut mesh = TriangleMesh::default();

    // Outward slope of the side wall, used for the vertex normals.
    let slope = (base_radius - top_radius) / length.max(f32::EPSILON);
    let normal_scale = 1.0 / (1.0 + slope * slope).sqrt();

    for stack in 0..=stacks {
        let t = stack as f32 / stacks as f32;
        let z = length * t;
        let radius = base_radius + (top_radius - base_radius) * t;
        for slice in 0..slices {
            let phi = std::f32::consts::TAU * slice as f32 / slices as f32;
            let (sin_phi, cos_phi) = phi.sin_cos();
            mesh.vertices.push(Vertex {
                position: Vec3::new(radius * cos_phi, radius * sin_phi, z),
                normal: Vec3::new(cos_phi, sin_phi, slope) * normal_scale,
                uv: Vec2::new(slice as f32 / slices as f32, t),
            });
        }
    }

    // Side wall quads, two CCW triangles each.
    for stack in 0..stacks {
        let lower = (stack * slices) as u32;
        let upper = ((stack + 1) * slices) as u32;
        for slice in 0..slices as u32 {
            let next = (slice + 1) % slices as u32;
            mesh.triangles.push([lower + slice, lower + next, upper + next]);
            mesh.triangles.push([lower + slice, upper + next, upper + slice]);
        }
    }

    // End caps: a center vertex fanned against the boundary ring.
    let base_center = mesh.vertices.len() as u32;
    mesh.vertices.push(Vertex {
        position: Vec3::ZERO,
        normal: Vec3::NEG_Z,
        uv: Vec2::new(0.5, 0.0),
    });
    let top_center = mesh.vertices.len() as u32;
    mesh.vertices.push(Vertex {
        position: Vec3::new(0.0, 0.0, length),
        normal: Vec3::Z,
        uv: Vec2::new(0.5, 1.0),
    });

    let top_ring = (stacks * slices) as u32;
    for slice in 0..slices as u32 {
        let next = (slice + 1) % slices as u32;
        // Base cap faces -Z, top cap faces +Z.
        mesh.triangles.push([base_center, next, slice]);
        mesh.triangles.push([top_center, top_ring + slice, top_ring + next]);
    }

    mesh
}

/// Builds a closed UV sphere centered at the origin with +Z as the polar
/// axis.
pub fn sphere(radius: f32, slices: usize, stacks: usize) -> TriangleMesh {
    let slices = slices.max(3);
    let stacks = stacks.max(2);
    let mut mesh = TriangleMesh::default();

    for stack in 0..=stacks {
        let theta = std::f32::consts::PI * stack as f32 / stacks as f32;
        let (sin_theta, cos_theta) = theta.sin_cos();
        for slice in 0..slices {
            let phi = std::f32::consts::TAU * slice as f32 / slices as f32;
            let (sin_phi, cos_phi) = phi.sin_cos();
            let unit = Vec3::new(sin_theta * cos_phi, sin_theta * sin_phi, cos_theta);
            mesh.vertices.push(Vertex {
                position: unit * radius,
                normal: unit,
                uv: Vec2::new(
                    slice as f32 / slices as f32,
                    stack as f32 / stacks as f32,
                ),
            });
        }
    }

    for stack in 0..stacks {
        let upper = (stack * slices) as u32;
        let lower = ((stack + 1) * slices) as u32;
        for slice in 0..slices as u32 {
            let next = (slice + 1) % slices as u32;
            // Skip the degenerate triangle at each pole.
            if stack != 0 {
                mesh.triangles.push([upper + slice, lower + next, upper + next]);
            }
            if stack != stacks - 1 {
                mesh.triangles.push([upper + slice, lower + slice, lower + next]);
            }
        }
    }

    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One CCW triangle in the z = 1 plane.
    fn single_triangle() -> TriangleMesh {
        let corners = [
            Vec3::new(-1.0, -1.0, 1.0),
            Vec3::new(1.0, -1.0, 1.0),
            Vec3::new(0.0, 1.0, 1.0),
        ];
        TriangleMesh {
            vertices: corners
                .iter()
                .map(|&position| Vertex {
                    position,
                    normal: Vec3::NEG_Z,
                    uv: Vec2::ZERO,
                })
                .collect(),
            triangles: vec![[0, 1, 2]],
        }
    }

    #[test]
    fn ray_hits_triangle_at_expected_point() {
        let mesh = single_triangle();
        let hit = mesh
            .ray_intersects_triangle(Vec3::ZERO, Vec3::Z, 0)
            .unwrap();
        assert!((hit - Vec3::new(0.0, 0.0, 1.0)).length() < 1e-6);
    }

    #[test]
    fn ray_direction_need_not_be_normalized() {
        let mesh = single_triangle();
        let hit = mesh
            .ray_intersects_triangle(Vec3::ZERO, Vec3::new(0.0, 0.0, 17.0), 0)
            .unwrap();
        assert!((hit - Vec3::new(0.0, 0.0, 1.0)).length() < 1e-6);
    }

    #[test]
    fn ray_misses_outside_and_behind() {
        let mesh = single_triangle();
        // Outside the triangle bounds.
        assert!(
            mesh.ray_intersects_triangle(Vec3::new(5.0, 5.0, 0.0), Vec3::Z, 0)
                .is_none()
        );
        // Triangle is behind the ray.
        assert!(
            mesh.ray_intersects_triangle(Vec3::ZERO, Vec3::NEG_Z, 0)
                .is_none()
        );
    }

    #[test]
    fn parallel_ray_returns_none() {
        let mesh = single_triangle();
        assert!(
            mesh.ray_intersects_triangle(Vec3::ZERO, Vec3::X, 0)
                .is_none()
        );
    }

    #[test]
    fn sphere_normals_point_outward_and_rays_exit_at_radius() {
        let mesh = sphere(2.0, 12, 8);
        assert!(mesh.triangle_count() > 0);

        for tri in 0..mesh.triangle_count() {
            let (v0, v1, v2) = mesh.corners(tri);
            let centroid = (v0 + v1 + v2) / 3.0;
            assert!(
                mesh.surface_normal(tri).dot(centroid) > 0.0,
                "triangle {tri} normal points inward"
            );
        }

        // A ray from the center exits through the surface near the radius.
        let dir = Vec3::new(0.3, 0.5, 0.8).normalize();
        let hit = (0..mesh.triangle_count())
            .filter_map(|tri| mesh.ray_intersects_triangle(Vec3::ZERO, dir, tri))
            .min_by(|a, b| a.length().total_cmp(&b.length()))
            .expect("center ray must exit a closed sphere");
        assert!((hit.length() - 2.0).abs() < 0.2);
    }

    #[test]
    fn cylinder_is_closed_along_axis_and_sides() {
        let mesh = cylinder(0.5, 0.3, 4.0, 10, 4);
        let center = Vec3::new(0.0, 0.0, 2.0);

        // Sideways, up and down from the interior all hit the surface.
        for dir in [Vec3::X, Vec3::Z, Vec3::NEG_Z] {
            let hit = (0..mesh.triangle_count())
                .filter_map(|tri| mesh.ray_intersects_triangle(center, dir, tri))
                .min_by(|a, b| {
                    (*a - center).length().total_cmp(&(*b - center).length())
                });
            assert!(hit.is_some(), "interior ray along {dir} escaped");
        }

        // The sideways exit distance matches the interpolated radius.
        let hit = (0..mesh.triangle_count())
            .filter_map(|tri| mesh.ray_intersects_triangle(center, Vec3::X, tri))
            .min_by(|a, b| (*a - center).length().total_cmp(&(*b - center).length()))
            .unwrap();
        let mid_radius = 0.4;
        assert!(((hit - center).length() - mid_radius).abs() < 0.05);
    }
}
