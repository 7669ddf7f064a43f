//! Cascade split distances along the camera's view depth.
//!
//! Uses the practical split scheme: each split is a blend of a uniform and a
//! logarithmic distribution between the camera's near and far planes. The
//! logarithmic end spends more shadow-map resolution close to the camera.

use crate::error::ShadowError;
use crate::frustum::validate_clip_range;

/// Upper bound on cascades per light.
///
/// Sizes the GPU uniform arrays and the shading pass's texture bindings; the
/// WGSL programs declare the same value.
pub const MAX_CASCADES: usize = 4;

/// Ordered split distances: `cascade_count + 1` values from near to far.
///
/// Cascade `i` covers `[distances[i], distances[i + 1]]`. Index 0 is the
/// cascade nearest to the camera.
#[derive(Clone, Debug, PartialEq)]
pub struct CascadeSplitTable {
    distances: Vec<f32>,
}

impl CascadeSplitTable {
    /// All split distances, `distances()[0] == near`, last `== far`.
    pub fn distances(&self) -> &[f32] {
        &self.distances
    }

    /// Number of cascades described by the table.
    pub fn cascade_count(&self) -> usize {
        self.distances.len() - 1
    }

    /// `(near, far)` of cascade `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= cascade_count()`.
    pub fn range(&self, index: usize) -> (f32, f32) {
        (self.distances[index], self.distances[index + 1])
    }

    /// Far distance of cascade `index`, the value the shading pass compares
    /// view depth against.
    pub fn cascade_far(&self, index: usize) -> f32 {
        self.distances[index + 1]
    }

    /// Near plane the table was computed for.
    pub fn near(&self) -> f32 {
        self.distances[0]
    }

    /// Far plane the table was computed for.
    pub fn far(&self) -> f32 {
        self.distances[self.distances.len() - 1]
    }

    /// The cascade a fragment at `view_depth` samples, if any.
    ///
    /// Mirrors the selection done in the lit shader: the first cascade whose
    /// far distance lies beyond the depth.
    pub fn cascade_for_depth(&self, view_depth: f32) -> Option<usize> {
        if view_depth < self.near() || view_depth > self.far() {
            return None;
        }
        (0..self.cascade_count()).find(|&i| view_depth <= self.cascade_far(i))
    }
}

/// Compute `cascade_count + 1` split distances between `near` and `far`.
///
/// For `t = i / N`:
/// `split[i] = lerp(near * (far / near)^t, near + (far - near) * t, blend)`,
/// so `blend = 0` is purely logarithmic and `blend = 1` purely uniform. The
/// first and last entries are exactly `near` and `far`.
///
/// A range too wide for `far / near` to stay finite, or too narrow for the
/// splits to stay distinct in `f32`, is an
/// [`InvalidClipRange`](ShadowError::InvalidClipRange).
pub fn compute_split_distances(
    cascade_count: u32,
    near: f32,
    far: f32,
    blend: f32,
) -> Result<CascadeSplitTable, ShadowError> {
    if cascade_count == 0 || cascade_count as usize > MAX_CASCADES {
        return Err(ShadowError::InvalidCascadeCount {
            count: cascade_count,
            max: MAX_CASCADES as u32,
        });
    }
    validate_clip_range(near, far)?;
    if !(0.0..=1.0).contains(&blend) {
        return Err(ShadowError::InvalidSplitBlend(blend));
    }

    let n = cascade_count as usize;
    let ratio = far / near;
    if !ratio.is_finite() {
        return Err(ShadowError::InvalidClipRange { near, far });
    }
    let mut distances = Vec::with_capacity(n + 1);
    distances.push(near);
    for i in 1..n {
        let t = i as f32 / n as f32;
        let uniform = near + (far - near) * t;
        let log = near * ratio.powf(t);
        distances.push(log + (uniform - log) * blend);
    }
    distances.push(far);

    let ordered = distances
        .windows(2)
        .all(|w| w[0].is_finite() && w[1].is_finite() && w[0] < w[1]);
    if !ordered {
        return Err(ShadowError::InvalidClipRange { near, far });
    }
    Ok(CascadeSplitTable { distances })
}
