use crate::{config::EnvelopeConfig, error::GroveError};
use glam::Vec3;
use log::debug;
use rand::Rng;

/// One horizontal slice of the envelope: a closed ring of boundary points
/// sampled at fixed angular steps.
#[derive(Debug)]
pub struct EnvelopeLayer {
    pub height: f32,
    pub ring: Vec<Vec3>,
}

/// The allowed growth region, materialized as layers × angular steps.
///
/// A profile function of `(height_above_base, angle_degrees)` defines the
/// maximum radius; the discrete grid supports two queries:
///
/// 1. [`Envelope::contains`] — inclusion testing of a candidate point via
///    bilinear interpolation across the two nearest layers and the two
///    nearest angular samples.
/// 2. [`Envelope::bounds`] — the bounding box of the generated ring points,
///    used to drive rejection sampling.
///
/// Invariants: layers are monotonically increasing in height and every ring
/// has the same point count.
#[derive(Debug)]
pub struct Envelope {
    layers: Vec<EnvelopeLayer>,
    angular_steps: usize,
    attempts_per_point: usize,
}

impl Envelope {
    /// Materializes the envelope grid from a radius profile.
    ///
    /// The profile receives the height above the envelope base and the
    /// angle in degrees. The default profile ignores the angle, but the
    /// parameter is part of the interface so non-radially-symmetric
    /// envelopes can be swapped in.
    ///
    /// ### Parameters
    /// - `cfg` - Grid resolution, placement and sampling budget.
    /// - `profile` - Maximum radius for a `(height_above_base, angle_deg)`
    ///   pair.
    pub fn materialize(cfg: &EnvelopeConfig, profile: impl Fn(f32, f32) -> f32) -> Self {
        let layers = cfg.layers.max(2);
        let steps = cfg.angular_steps.max(3);

        let layer_list = (0..layers)
            .map(|i| {
                let t = i as f32 / (layers - 1) as f32;
                let height = cfg.base_height + cfg.height * t;
                let ring = (0..steps)
                    .map(|j| {
                        let angle_deg = j as f32 * 360.0 / steps as f32;
                        let r = profile(cfg.height * t, angle_deg).max(0.0);
                        let rad = angle_deg.to_radians();
                        Vec3::new(r * rad.cos(), height, r * rad.sin())
                    })
                    .collect();
                EnvelopeLayer { height, ring }
            })
            .collect();

        Self {
            layers: layer_list,
            angular_steps: steps,
            attempts_per_point: cfg.attempts_per_point,
        }
    }

    /// The default profile: a downward parabola in normalized height,
    /// independent of angle. Radius peaks at mid-height and tapers to zero
    /// at the envelope base and top.
    pub fn parabolic(cfg: &EnvelopeConfig) -> Self {
        let height = cfg.height.max(f32::EPSILON);
        let max_radius = cfg.max_radius;
        Self::materialize(cfg, move |h, _angle_deg| {
            let t = h / height;
            4.0 * max_radius * t * (1.0 - t)
        })
    }

    pub fn layers(&self) -> &[EnvelopeLayer] {
        &self.layers
    }

    /// Boundary radius of one grid sample (radial distance of the ring
    /// point from the vertical axis).
    fn grid_radius(&self, layer: usize, step: usize) -> f32 {
        let p = self.layers[layer].ring[step];
        (p.x * p.x + p.z * p.z).sqrt()
    }

    /// Tests whether a point lies inside the envelope.
    ///
    /// The boundary radius at the point's height and angle is bilinearly
    /// interpolated from the two bracketing layers and the two bracketing
    /// angular samples, then compared against the point's radial distance.
    pub fn contains(&self, point: Vec3) -> bool {
        let bottom = self.layers[0].height;
        let top = self.layers[self.layers.len() - 1].height;
        if point.y < bottom || point.y > top {
            return false;
        }

        // Fractional layer index; layer spacing is uniform by construction.
        let spacing = (top - bottom) / (self.layers.len() - 1) as f32;
        let lf = if spacing > f32::EPSILON {
            (point.y - bottom) / spacing
        } else {
            0.0
        };
        let l0 = (lf.floor() as usize).min(self.layers.len() - 2);
        let l1 = l0 + 1;
        let lt = (lf - l0 as f32).clamp(0.0, 1.0);

        // Fractional angular index; the ring wraps around.
        let angle = point.z.atan2(point.x).to_degrees().rem_euclid(360.0);
        let step_size = 360.0 / self.angular_steps as f32;
        let sf = angle / step_size;
        let s0 = (sf.floor() as usize) % self.angular_steps;
        let s1 = (s0 + 1) % self.angular_steps;
        let st = sf - sf.floor();

        let low = self.grid_radius(l0, s0) * (1.0 - st) + self.grid_radius(l0, s1) * st;
        let high = self.grid_radius(l1, s0) * (1.0 - st) + self.grid_radius(l1, s1) * st;
        let boundary = low * (1.0 - lt) + high * lt;

        // Strict comparison so a degenerate zero-radius boundary contains
        // nothing.
        let radial = (point.x * point.x + point.z * point.z).sqrt();
        radial < boundary
    }

    /// Axis-aligned bounding box of the generated ring points.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        let mut min = Vec3::MAX;
        let mut max = Vec3::MIN;
        for layer in &self.layers {
            for &p in &layer.ring {
                min = min.min(p);
                max = max.max(p);
            }
        }
        (min, max)
    }

    /// Generates `count` attraction points by uniform rejection sampling
    /// inside the bounding box, accepting only points that pass
    /// [`Envelope::contains`].
    ///
    /// The attempt budget (`attempts_per_point * count` in total) guards
    /// against near-empty envelopes looping forever.
    ///
    /// ### Returns
    /// The sampled points, or [`GroveError::SamplingBudgetExhausted`] if the
    /// budget ran out first.
    pub fn sample_points(
        &self,
        count: usize,
        rng: &mut impl Rng,
    ) -> Result<Vec<Vec3>, GroveError> {
        let (min, max) = self.bounds();
        let budget = self.attempts_per_point.saturating_mul(count).max(1);
        let mut points = Vec::with_capacity(count);
        let mut attempts = 0;

        while points.len() < count && attempts < budget {
            attempts += 1;
            let candidate = Vec3::new(
                rng.random_range(min.x..=max.x),
                rng.random_range(min.y..=max.y),
                rng.random_range(min.z..=max.z),
            );
            if self.contains(candidate) {
                points.push(candidate);
            }
        }

        debug!(
            "envelope sampling: {}/{} points in {} attempts",
            points.len(),
            count,
            attempts
        );

        if points.len() < count {
            return Err(GroveError::SamplingBudgetExhausted {
                requested: count,
                placed: points.len(),
                attempts,
            });
        }
        Ok(points)
    }
}
