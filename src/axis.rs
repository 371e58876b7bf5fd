//! Axis reordering between on-disk and canonical array layouts.
//!
//! Each binary volume format stores its voxels in a format-specific loop
//! order, usually with one or more axes running opposite to the canonical
//! orientation. An [`AxisPlan`] captures that relationship as a permutation
//! (native axis order to canonical axis order) plus per-canonical-axis flip
//! flags. Writing applies the exact inverse of reading, so a load/store
//! cycle reproduces the original buffer bit-for-bit.

use ndarray::{ArrayD, Axis, IxDyn};

/// Native-to-canonical axis mapping for one format.
#[derive(Debug, Clone, Copy)]
pub struct AxisPlan {
    /// Canonical axis `i` is native axis `perm[i]`.
    perm: &'static [usize],
    /// Canonical axes reversed after permutation.
    flip: &'static [bool],
}

/// VMR, V16 and MSK volumes: stored (Z, Y, X), all axes reversed.
pub const VOLUME_3D: AxisPlan = AxisPlan::new(&[0, 2, 1], &[true, true, true]);

/// VTC time series: stored (Z, Y, X, T), spatial axes reversed.
pub const VTC: AxisPlan = AxisPlan::new(&[0, 2, 1, 3], &[true, true, true, false]);

/// VMP and GLM stacked volumes: stored (N, Z, Y, X), spatial axes reversed,
/// map/value axis moved last.
pub const VOLUME_MAPS: AxisPlan = AxisPlan::new(&[1, 3, 2, 0], &[true, true, true, false]);

/// STC and DWI slice time courses: stored (slice, volume, row, column).
pub const SLICE_TIMECOURSE: AxisPlan = AxisPlan::new(&[3, 2, 0, 1], &[false, true, false, false]);

/// GTC grid time courses: stored (depth, Y, X, T), no reversals.
pub const GTC: AxisPlan = AxisPlan::new(&[2, 1, 0, 3], &[false, false, false, false]);

impl AxisPlan {
    pub const fn new(perm: &'static [usize], flip: &'static [bool]) -> Self {
        Self { perm, flip }
    }

    /// Number of axes the plan applies to.
    pub fn ndim(&self) -> usize {
        self.perm.len()
    }

    fn inverse_perm(&self) -> Vec<usize> {
        let mut inverse = vec![0; self.perm.len()];
        for (canonical, &native) in self.perm.iter().enumerate() {
            inverse[native] = canonical;
        }
        inverse
    }

    /// Reorder a freshly decoded native-order buffer into canonical order.
    pub fn to_canonical<T: Clone>(&self, native: ArrayD<T>) -> ArrayD<T> {
        let mut array = native.permuted_axes(IxDyn(self.perm));
        for (axis, &flipped) in self.flip.iter().enumerate() {
            if flipped {
                array.invert_axis(Axis(axis));
            }
        }
        array.as_standard_layout().to_owned()
    }

    /// Reorder a canonical buffer back into the format's native order,
    /// undoing [`AxisPlan::to_canonical`] exactly.
    pub fn to_native<T: Clone>(&self, canonical: ArrayD<T>) -> ArrayD<T> {
        let mut array = canonical;
        for (axis, &flipped) in self.flip.iter().enumerate() {
            if flipped {
                array.invert_axis(Axis(axis));
            }
        }
        array
            .permuted_axes(IxDyn(&self.inverse_perm()))
            .as_standard_layout()
            .to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn random_volume(shape: &[usize], seed: u64) -> ArrayD<f32> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let len = shape.iter().product();
        let values: Vec<f32> = (0..len).map(|_| rng.gen_range(-100.0..100.0)).collect();
        ArrayD::from_shape_vec(IxDyn(shape), values).unwrap()
    }

    #[test]
    fn volume_3d_maps_known_elements() {
        // Native (Z, Y, X) = (1, 2, 3), value = y * 3 + x.
        let native =
            ArrayD::from_shape_vec(IxDyn(&[1, 2, 3]), (0u8..6).map(f32::from).collect()).unwrap();
        let canonical = VOLUME_3D.to_canonical(native);
        assert_eq!(canonical.shape(), &[1, 3, 2]);
        // canonical[0, x', y'] = native[0, 1 - y', 2 - x'].
        assert_eq!(canonical[[0, 0, 0]], 5.0);
        assert_eq!(canonical[[0, 2, 1]], 0.0);
    }

    #[test]
    fn every_plan_roundtrips_exactly() {
        let cases: [(AxisPlan, &[usize]); 5] = [
            (VOLUME_3D, &[5, 4, 3]),
            (VTC, &[4, 5, 3, 7]),
            (VOLUME_MAPS, &[6, 4, 3, 5]),
            (SLICE_TIMECOURSE, &[4, 9, 6, 5]),
            (GTC, &[3, 5, 4, 8]),
        ];
        for (seed, (plan, shape)) in cases.into_iter().enumerate() {
            let native = random_volume(shape, seed as u64);
            let back = plan.to_native(plan.to_canonical(native.clone()));
            assert_eq!(back, native);
        }
    }

    #[test]
    fn canonical_shape_follows_permutation() {
        let native = random_volume(&[4, 9, 6, 5], 42);
        let canonical = SLICE_TIMECOURSE.to_canonical(native);
        // (slice, volume, row, column) -> (column, row, slice, volume).
        assert_eq!(canonical.shape(), &[5, 6, 4, 9]);
    }
}
