//! Bounding spheres for small point sets.

use glam::Vec3;

/// A sphere enclosing a set of points.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    /// Fit a sphere around `points`.
    ///
    /// The center is the centroid. The radius is half the point set's
    /// diameter (largest pairwise distance), widened to the farthest point
    /// from the centroid when that is larger, so every point is enclosed.
    /// Both terms depend only on distances between the points and their
    /// centroid, so the radius does not change when the set is rotated or
    /// translated rigidly.
    ///
    /// The pairwise scan is O(n²); callers pass frustum corners (n = 8).
    pub fn from_points(points: &[Vec3]) -> Self {
        match points {
            [] => return Self::default(),
            [single] => {
                return Self {
                    center: *single,
                    radius: 0.0,
                };
            }
            _ => {}
        }

        let center = points.iter().copied().sum::<Vec3>() / points.len() as f32;

        let mut diameter_sq = 0.0f32;
        for (i, a) in points.iter().enumerate() {
            for b in &points[i + 1..] {
                diameter_sq = diameter_sq.max(a.distance_squared(*b));
            }
        }

        let farthest_sq = points
            .iter()
            .map(|p| p.distance_squared(center))
            .fold(0.0f32, f32::max);

        Self {
            center,
            radius: (diameter_sq.sqrt() * 0.5).max(farthest_sq.sqrt()),
        }
    }

    /// Whether `point` lies inside the sphere, allowing `tolerance` slack.
    pub fn contains(&self, point: Vec3, tolerance: f32) -> bool {
        point.distance(self.center) <= self.radius + tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Mat3, Quat};

    fn box_corners(center: Vec3, e: f32) -> Vec<Vec3> {
        let mut corners = Vec::with_capacity(8);
        for x in [-e, e] {
            for y in [-e, e] {
                for z in [-e, e] {
                    corners.push(center + Vec3::new(x, y, z));
                }
            }
        }
        corners
    }

    #[test]
    fn test_empty_set_is_zero_sphere() {
        let s = BoundingSphere::from_points(&[]);
        assert_eq!(s.center, Vec3::ZERO);
        assert_eq!(s.radius, 0.0);
    }

    #[test]
    fn test_single_point_has_zero_radius() {
        let p = Vec3::new(3.0, -2.0, 7.5);
        let s = BoundingSphere::from_points(&[p]);
        assert_eq!(s.center, p);
        assert_eq!(s.radius, 0.0);
    }

    #[test]
    fn test_box_corners_give_half_space_diagonal() {
        let e = 2.5;
        let center = Vec3::new(1.0, 2.0, -3.0);
        let s = BoundingSphere::from_points(&box_corners(center, e));
        assert!((s.center - center).length() < 1e-5);
        assert!(
            (s.radius - e * 3.0f32.sqrt()).abs() < 1e-5,
            "radius {} != e*sqrt(3)",
            s.radius
        );
    }

    #[test]
    fn test_two_points_center_between() {
        let s = BoundingSphere::from_points(&[Vec3::ZERO, Vec3::new(4.0, 0.0, 0.0)]);
        assert!((s.center - Vec3::new(2.0, 0.0, 0.0)).length() < 1e-6);
        assert!((s.radius - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_asymmetric_set_is_enclosed() {
        // Frustum-like: small near face, large far face.
        let points = [
            Vec3::new(-0.1, -0.1, 0.0),
            Vec3::new(0.1, -0.1, 0.0),
            Vec3::new(-0.1, 0.1, 0.0),
            Vec3::new(0.1, 0.1, 0.0),
            Vec3::new(-20.0, -20.0, -20.0),
            Vec3::new(20.0, -20.0, -20.0),
            Vec3::new(-20.0, 20.0, -20.0),
            Vec3::new(20.0, 20.0, -20.0),
        ];
        let s = BoundingSphere::from_points(&points);
        for p in points {
            assert!(s.contains(p, 1e-4), "{p} outside sphere {s:?}");
        }
    }

    #[test]
    fn test_equilateral_triangle_is_enclosed() {
        // Half the diameter alone would leave the vertices outside.
        let h = 3.0f32.sqrt() * 0.5;
        let points = [Vec3::ZERO, Vec3::X, Vec3::new(0.5, h, 0.0)];
        let s = BoundingSphere::from_points(&points);
        for p in points {
            assert!(s.contains(p, 1e-5));
        }
    }

    #[test]
    fn test_radius_is_rotation_invariant() {
        let points = [
            Vec3::new(-0.4, -0.3, -0.5),
            Vec3::new(0.4, -0.3, -0.5),
            Vec3::new(-0.4, 0.3, -0.5),
            Vec3::new(0.4, 0.3, -0.5),
            Vec3::new(-8.0, -6.0, -10.0),
            Vec3::new(8.0, -6.0, -10.0),
            Vec3::new(-8.0, 6.0, -10.0),
            Vec3::new(8.0, 6.0, -10.0),
        ];
        let base = BoundingSphere::from_points(&points);
        let rotation = Mat3::from_quat(Quat::from_euler(glam::EulerRot::YXZ, 0.7, -0.3, 1.1));
        let rotated: Vec<Vec3> = points.iter().map(|p| rotation * *p).collect();
        let turned = BoundingSphere::from_points(&rotated);
        assert!((base.radius - turned.radius).abs() < 1e-4);
        assert!((rotation * base.center - turned.center).length() < 1e-4);
    }

    #[test]
    fn test_frustum_slice_radius_against_half_diameter() {
        let frustum = crate::Frustum {
            fov_y: std::f32::consts::FRAC_PI_2,
            near: 0.1,
            far: 20.0,
            width: 1000.0,
            height: 680.0,
        };
        let corners = crate::frustum_slice_corners(&frustum);
        let sphere = BoundingSphere::from_points(&corners);

        let mut diameter = 0.0f32;
        for a in &corners {
            for b in &corners {
                diameter = diameter.max(a.distance(*b));
            }
        }
        let half_diameter = diameter * 0.5;

        // The slice widens with depth, so the centroid sits behind the far
        // face's center and the half-diameter sphere misses the far corners.
        let narrow = BoundingSphere {
            center: sphere.center,
            radius: half_diameter,
        };
        assert!(corners.iter().any(|c| !narrow.contains(*c, 1e-3)));
        assert!(corners.iter().all(|c| sphere.contains(*c, 1e-3)));

        // Enclosing them costs a few percent of radius on this slice.
        assert!(sphere.radius > half_diameter);
        assert!(sphere.radius < half_diameter * 1.1);
    }
}
