//! Threshold calibration utilities.
//!
//! Stages do not classify against absolute values: they sort the raster,
//! read the value at a target percentile, and compare cells against that.
//! This keeps classification fractions stable across seeds even though the
//! underlying noise distribution shifts.

use crate::raster::Raster;

/// Value at the given percentile of a raster (full sort).
///
/// `percentile` is a fraction in [0, 1]. Panics on an empty raster: every
/// stage calibrates over a freshly built full-size raster, so an empty input
/// is a broken invariant, not a runtime condition.
pub fn calculate_threshold(raster: &Raster<f32>, percentile: f32) -> f32 {
    sorted_threshold(raster.data(), percentile)
}

/// Like [`calculate_threshold`], but cells equal to 0.0 are excluded.
///
/// Drainage and rainfall force sea/peak cells to zero before calibration;
/// including them would drag every percentile toward the forced floor.
/// Falls back to 0.0 if every cell is zero.
pub fn calculate_threshold_ignoring_zeros(raster: &Raster<f32>, percentile: f32) -> f32 {
    let nonzero: Vec<f32> = raster.data().iter().copied().filter(|&v| v != 0.0).collect();
    if nonzero.is_empty() {
        return 0.0;
    }
    sorted_threshold(&nonzero, percentile)
}

fn sorted_threshold(values: &[f32], percentile: f32) -> f32 {
    assert!(!values.is_empty(), "percentile over an empty raster");
    debug_assert!((0.0..=1.0).contains(&percentile));

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let idx = ((sorted.len() as f32 * percentile) as usize).min(sorted.len() - 1);
    sorted[idx]
}

/// Piecewise-linear remapping of [0, 1] onto [0, 1].
///
/// Built from ordered `(source, destination)` boundary pairs. Each segment
/// maps `[source_i, source_i+1]` linearly onto `[dest_i, dest_i+1]`; the
/// final segment implicitly maps `[source_last, 1]` onto `[dest_last, 1]`.
/// Used to squeeze calibrated percentile thresholds into the fixed
/// sub-ranges the biome mapper and renderer expect.
#[derive(Clone, Debug)]
pub struct ValueMapper {
    boundaries: Vec<(f32, f32)>,
}

impl ValueMapper {
    pub fn new(boundaries: Vec<(f32, f32)>) -> Self {
        debug_assert!(
            boundaries.windows(2).all(|w| w[0].0 <= w[1].0 && w[0].1 <= w[1].1),
            "value mapper boundaries must be non-decreasing"
        );
        Self { boundaries }
    }

    /// Remap a single value through the piecewise-linear curve.
    pub fn map(&self, value: f32) -> f32 {
        let mut segment_start = (0.0f32, 0.0f32);
        for &(src, dst) in &self.boundaries {
            if value <= src {
                return remap_segment(value, segment_start, (src, dst));
            }
            segment_start = (src, dst);
        }
        remap_segment(value, segment_start, (1.0, 1.0))
    }

    /// Remap every cell of a raster in place.
    pub fn apply(&self, raster: &mut Raster<f32>) {
        for (_, _, v) in raster.iter_mut() {
            *v = self.map(*v);
        }
    }
}

fn remap_segment(value: f32, from: (f32, f32), to: (f32, f32)) -> f32 {
    let (src0, dst0) = from;
    let (src1, dst1) = to;
    if src1 <= src0 {
        return dst1;
    }
    let t = (value - src0) / (src1 - src0);
    dst0 + t * (dst1 - dst0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{Dimensions, Raster};
    use approx::assert_abs_diff_eq;

    /// Linear ramp raster 0..n-1 normalized to [0, 1].
    fn ramp(n: usize) -> Raster<f32> {
        let mut raster = Raster::new_with(Dimensions::new(n, 1), 0.0f32);
        for i in 0..n {
            raster.set(i, 0, i as f32 / (n - 1) as f32);
        }
        raster
    }

    #[test]
    fn test_percentile_on_linear_ramp() {
        let raster = ramp(100);
        let median = calculate_threshold(&raster, 0.5);
        assert_abs_diff_eq!(median, 50.0 / 99.0, epsilon = 1e-6);
        assert_eq!(calculate_threshold(&raster, 0.0), 0.0);
        assert_eq!(calculate_threshold(&raster, 1.0), 1.0);
    }

    #[test]
    fn test_threshold_monotonicity() {
        let raster = ramp(257);
        let mut last = f32::NEG_INFINITY;
        for i in 0..=20 {
            let t = calculate_threshold(&raster, i as f32 / 20.0);
            assert!(t >= last, "thresholds must be monotone in percentile");
            last = t;
        }
    }

    #[test]
    fn test_ignoring_zeros_excludes_forced_cells() {
        let mut raster = Raster::new_with(Dimensions::new(10, 1), 0.0f32);
        // Half the cells forced to zero, the rest a ramp over [0.5, 0.9].
        for i in 0..5 {
            raster.set(i + 5, 0, 0.5 + i as f32 * 0.1);
        }
        let median = calculate_threshold_ignoring_zeros(&raster, 0.5);
        assert!(median >= 0.5, "forced zeros must not drag the percentile down");

        let all_zero = Raster::new_with(Dimensions::new(4, 1), 0.0f32);
        assert_eq!(calculate_threshold_ignoring_zeros(&all_zero, 0.5), 0.0);
    }

    #[test]
    fn test_value_mapper_hits_boundaries_exactly() {
        let mapper = ValueMapper::new(vec![(0.2, 0.32), (0.5, 0.49), (0.8, 0.65)]);
        assert_abs_diff_eq!(mapper.map(0.2), 0.32, epsilon = 1e-6);
        assert_abs_diff_eq!(mapper.map(0.5), 0.49, epsilon = 1e-6);
        assert_abs_diff_eq!(mapper.map(0.8), 0.65, epsilon = 1e-6);
        // Endpoints of the implicit outer segments.
        assert_abs_diff_eq!(mapper.map(0.0), 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(mapper.map(1.0), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_value_mapper_interpolates_between_boundaries() {
        let mapper = ValueMapper::new(vec![(0.4, 0.1), (0.6, 0.9)]);
        assert_abs_diff_eq!(mapper.map(0.5), 0.5, epsilon = 1e-6);
    }
}
