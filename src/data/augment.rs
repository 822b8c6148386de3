//! Augmentation hooks called by [`AugmentedDataTransform`].
//!
//! Two kinds of collaborators exist: a k-space augmentor that sees the
//! stacked k-space together with the target image, and a mask augmentor that
//! replaces the masking step itself. Both expose an `on` flag read once when
//! the transform is built, and a probability re-read on every sample.
//!
//! [`AugmentedDataTransform`]: super::transforms::AugmentedDataTransform

use super::error::{Result, TransformError};
use super::kspace::mask_and_stack;
use super::schedule::{AugmentationSchedule, ScheduledProbability};
use ndarray::{ArrayD, IxDyn};
use num_complex::Complex32;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

/// Augments stacked k-space and its target image together.
pub trait KspaceAugmentor: Send + Sync {
    /// Whether augmentation is switched on at all.
    fn aug_on(&self) -> bool;

    /// Current augmentation probability. Zero disables the stage for this sample.
    fn schedule_p(&self) -> f64;

    /// Returns the augmented `(kspace, target)` pair. Shapes may change.
    fn augment(
        &self,
        kspace: ArrayD<f32>,
        target: ArrayD<f32>,
        target_shape: &[usize],
    ) -> Result<(ArrayD<f32>, ArrayD<f32>)>;

    /// Informs the augmentor of training progress.
    fn set_epoch(&self, _epoch: usize) {}
}

/// Replaces the masking step with its own choice of sampling mask.
pub trait MaskAugmentor: Send + Sync {
    fn mask_aug_on(&self) -> bool;

    fn schedule_p(&self) -> f64;

    /// Masks raw complex `input` and returns `(stacked kspace, mask)`.
    ///
    /// The returned mask must keep one element per line along the k-space
    /// width, otherwise the final mask reshape fails.
    fn augment(
        &self,
        input: &ArrayD<Complex32>,
        mask: &ArrayD<f32>,
    ) -> Result<(ArrayD<f32>, ArrayD<f32>)>;

    fn set_epoch(&self, _epoch: usize) {}
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_os_rng(),
    }
}

/// Draws a Bernoulli sample with probability `p`.
fn coin(rng: &Mutex<StdRng>, p: f64) -> bool {
    if p <= 0.0 {
        return false;
    }
    let mut rng = rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    rng.random::<f64>() < p
}

/// Scales k-space and target by one random factor.
///
/// The Fourier transform is linear, so the pair stays consistent.
pub struct IntensityScaleAugmentor {
    enabled: bool,
    probability: ScheduledProbability,
    min_scale: f32,
    max_scale: f32,
    rng: Mutex<StdRng>,
}

impl IntensityScaleAugmentor {
    pub fn new(schedule: AugmentationSchedule, min_scale: f32, max_scale: f32) -> Self {
        Self {
            enabled: true,
            probability: ScheduledProbability::new(schedule),
            min_scale,
            max_scale,
            rng: Mutex::new(make_rng(None)),
        }
    }

    /// Sets the seed for reproducibility.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(make_rng(Some(seed)));
        self
    }

    pub fn enabled(mut self, on: bool) -> Self {
        self.enabled = on;
        self
    }

    fn draw_scale(&self) -> f32 {
        if self.max_scale <= self.min_scale {
            return self.min_scale;
        }
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        rng.random_range(self.min_scale..=self.max_scale)
    }
}

impl KspaceAugmentor for IntensityScaleAugmentor {
    fn aug_on(&self) -> bool {
        self.enabled
    }

    fn schedule_p(&self) -> f64 {
        self.probability.current()
    }

    fn augment(
        &self,
        mut kspace: ArrayD<f32>,
        mut target: ArrayD<f32>,
        target_shape: &[usize],
    ) -> Result<(ArrayD<f32>, ArrayD<f32>)> {
        if target.shape() != target_shape {
            return Err(TransformError::Augmentation(format!(
                "target shape {:?} does not match declared shape {:?}",
                target.shape(),
                target_shape
            )));
        }

        if !coin(&self.rng, self.schedule_p()) {
            return Ok((kspace, target));
        }

        let scale = self.draw_scale();
        log::trace!("intensity scale augmentation with factor {scale}");
        kspace.mapv_inplace(|v| v * scale);
        target.mapv_inplace(|v| v * scale);
        Ok((kspace, target))
    }

    fn set_epoch(&self, epoch: usize) {
        self.probability.set_epoch(epoch);
    }
}

/// Builds an equispaced 1-D sampling mask of length `width`.
///
/// The central `round(width * center_fraction)` lines are always sampled,
/// plus every `acceleration`-th line starting at `offset`.
pub fn equispaced_mask(
    width: usize,
    acceleration: usize,
    center_fraction: f64,
    offset: usize,
) -> ArrayD<f32> {
    let mut mask = ArrayD::<f32>::zeros(IxDyn(&[width]));

    let num_low = ((width as f64 * center_fraction).round() as usize).min(width);
    let pad = (width - num_low + 1) / 2;
    for i in pad..(pad + num_low).min(width) {
        mask[[i]] = 1.0;
    }

    if acceleration > 0 {
        for i in (offset..width).step_by(acceleration) {
            mask[[i]] = 1.0;
        }
    }

    mask
}

/// Resamples the mask with a random acceleration factor.
///
/// Lets one model see several undersampling rates during training. When the
/// coin flip fails the incoming mask is applied unchanged.
pub struct AccelerationMaskAugmentor {
    enabled: bool,
    probability: ScheduledProbability,
    accelerations: Vec<usize>,
    center_fraction: f64,
    rng: Mutex<StdRng>,
}

impl AccelerationMaskAugmentor {
    pub fn new(
        schedule: AugmentationSchedule,
        accelerations: Vec<usize>,
        center_fraction: f64,
    ) -> Self {
        Self {
            enabled: true,
            probability: ScheduledProbability::new(schedule),
            accelerations,
            center_fraction,
            rng: Mutex::new(make_rng(None)),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(make_rng(Some(seed)));
        self
    }

    pub fn enabled(mut self, on: bool) -> Self {
        self.enabled = on;
        self
    }

    fn sample_mask(&self, width: usize) -> Result<ArrayD<f32>> {
        if self.accelerations.is_empty() {
            return Err(TransformError::Augmentation(
                "no acceleration factors configured".to_string(),
            ));
        }

        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let acceleration = self.accelerations[rng.random_range(0..self.accelerations.len())];
        if acceleration == 0 {
            return Err(TransformError::Augmentation(
                "acceleration factor must be positive".to_string(),
            ));
        }
        let offset = rng.random_range(0..acceleration);
        log::trace!("resampling mask: width={width}, acceleration={acceleration}, offset={offset}");

        Ok(equispaced_mask(width, acceleration, self.center_fraction, offset))
    }
}

impl MaskAugmentor for AccelerationMaskAugmentor {
    fn mask_aug_on(&self) -> bool {
        self.enabled
    }

    fn schedule_p(&self) -> f64 {
        self.probability.current()
    }

    fn augment(
        &self,
        input: &ArrayD<Complex32>,
        mask: &ArrayD<f32>,
    ) -> Result<(ArrayD<f32>, ArrayD<f32>)> {
        let width = *input
            .shape()
            .last()
            .ok_or_else(|| TransformError::InvalidRank(input.shape().to_vec()))?;

        let mask = if coin(&self.rng, self.schedule_p()) {
            self.sample_mask(width)?
        } else {
            mask.clone()
        };

        let kspace = mask_and_stack(input, &mask)?;
        Ok((kspace, mask))
    }

    fn set_epoch(&self, epoch: usize) {
        self.probability.set_epoch(epoch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ones_input(shape: &[usize]) -> ArrayD<Complex32> {
        ArrayD::from_elem(IxDyn(shape), Complex32::new(1.0, 2.0))
    }

    #[test]
    fn test_equispaced_mask() {
        let mask = equispaced_mask(16, 4, 0.125, 1);
        let sampled: Vec<usize> = mask
            .iter()
            .enumerate()
            .filter(|(_, m)| **m == 1.0)
            .map(|(i, _)| i)
            .collect();

        // centre lines 7 and 8, plus 1, 5, 9, 13
        assert_eq!(sampled, vec![1, 5, 7, 8, 9, 13]);
    }

    #[test]
    fn test_equispaced_mask_full_center() {
        let mask = equispaced_mask(8, 4, 1.0, 0);
        assert!(mask.iter().all(|&m| m == 1.0));
    }

    #[test]
    fn test_intensity_scale_always_applies_at_p_one() {
        let aug = IntensityScaleAugmentor::new(AugmentationSchedule::constant(1.0), 2.0, 2.0)
            .with_seed(0);
        let kspace = ArrayD::from_elem(IxDyn(&[1, 2, 2, 2]), 1.5_f32);
        let target = ArrayD::from_elem(IxDyn(&[2, 2]), 0.5_f32);

        let (k, t) = aug.augment(kspace, target, &[2, 2]).unwrap();

        assert!(k.iter().all(|&v| (v - 3.0).abs() < 1e-6));
        assert!(t.iter().all(|&v| (v - 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_intensity_scale_range() {
        let aug = IntensityScaleAugmentor::new(AugmentationSchedule::constant(1.0), 0.5, 1.5)
            .with_seed(42);
        for _ in 0..20 {
            let kspace = ArrayD::from_elem(IxDyn(&[1, 2, 2]), 1.0_f32);
            let target = ArrayD::from_elem(IxDyn(&[2]), 1.0_f32);
            let (k, t) = aug.augment(kspace, target, &[2]).unwrap();
            let s = k[[0, 0, 0]];
            assert!((0.5..=1.5).contains(&s));
            assert_eq!(t[[0]], s);
        }
    }

    #[test]
    fn test_intensity_scale_zero_probability_is_identity() {
        let aug = IntensityScaleAugmentor::new(AugmentationSchedule::ramp(1.0, 5, 10), 3.0, 3.0);
        let kspace = ArrayD::from_elem(IxDyn(&[1, 2, 2]), 1.0_f32);
        let target = ArrayD::from_elem(IxDyn(&[2]), 1.0_f32);

        let (k, t) = aug.augment(kspace.clone(), target.clone(), &[2]).unwrap();
        assert_eq!(k, kspace);
        assert_eq!(t, target);
    }

    #[test]
    fn test_intensity_scale_rejects_wrong_target_shape() {
        let aug = IntensityScaleAugmentor::new(AugmentationSchedule::constant(1.0), 1.0, 1.0);
        let kspace = ArrayD::from_elem(IxDyn(&[1, 2, 2]), 1.0_f32);
        let target = ArrayD::from_elem(IxDyn(&[2]), 1.0_f32);

        assert!(matches!(
            aug.augment(kspace, target, &[3]),
            Err(TransformError::Augmentation(_))
        ));
    }

    #[test]
    fn test_mask_augmentor_resamples_to_width() {
        let aug =
            AccelerationMaskAugmentor::new(AugmentationSchedule::constant(1.0), vec![4], 0.25)
                .with_seed(3);
        let input = ones_input(&[2, 3, 8]);
        let mask = ArrayD::from_elem(IxDyn(&[8]), 0.0_f32);

        let (kspace, new_mask) = aug.augment(&input, &mask).unwrap();

        assert_eq!(new_mask.shape(), &[8]);
        assert_eq!(kspace.shape(), &[2, 3, 8, 2]);
        // centre lines 3 and 4 are always sampled
        assert_eq!(new_mask[[3]], 1.0);
        assert_eq!(new_mask[[4]], 1.0);
        assert_eq!(kspace[[1, 2, 3, 1]], 2.0);
        assert!(new_mask.iter().filter(|&&m| m == 1.0).count() >= 3);
    }

    #[test]
    fn test_mask_augmentor_keeps_mask_when_coin_fails() {
        let aug = AccelerationMaskAugmentor::new(AugmentationSchedule::constant(0.0), vec![4], 0.25);
        let input = ones_input(&[1, 2, 4]);
        let mask = ArrayD::from_shape_vec(IxDyn(&[4]), vec![1.0, 0.0, 0.0, 1.0]).unwrap();

        let (kspace, out_mask) = aug.augment(&input, &mask).unwrap();

        assert_eq!(out_mask, mask);
        assert_eq!(kspace[[0, 1, 1, 0]], 0.0);
        assert_eq!(kspace[[0, 1, 3, 0]], 1.0);
    }

    #[test]
    fn test_mask_augmentor_requires_accelerations() {
        let aug = AccelerationMaskAugmentor::new(AugmentationSchedule::constant(1.0), vec![], 0.1);
        let input = ones_input(&[1, 2, 4]);
        let mask = ArrayD::from_elem(IxDyn(&[4]), 1.0_f32);

        assert!(matches!(
            aug.augment(&input, &mask),
            Err(TransformError::Augmentation(_))
        ));
    }

    #[test]
    fn test_flags() {
        let aug = IntensityScaleAugmentor::new(AugmentationSchedule::constant(0.5), 1.0, 1.0)
            .enabled(false);
        assert!(!aug.aug_on());
        assert_eq!(aug.schedule_p(), 0.5);

        let mask_aug =
            AccelerationMaskAugmentor::new(AugmentationSchedule::ramp(1.0, 0, 4), vec![4], 0.1);
        assert!(mask_aug.mask_aug_on());
        assert_eq!(mask_aug.schedule_p(), 0.0);
        mask_aug.set_epoch(2);
        assert_eq!(mask_aug.schedule_p(), 0.5);
    }
}
