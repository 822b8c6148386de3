//! Slice transforms: raw k-space in, network-ready tensors out.

use super::augment::{KspaceAugmentor, MaskAugmentor};
use super::error::{Result, TransformError};
use super::kspace::{mask_and_stack, mask_length, reshape_mask};
use super::sample::{Attrs, SliceSample, TransformResult};
use ndarray::ArrayD;
use std::sync::Arc;

/// A per-slice transform invoked once per sample by the data pipeline.
pub trait SampleTransform: Send + Sync {
    /// Converts one slice into the tensors consumed by the model and the loss.
    fn apply(&self, sample: SliceSample) -> Result<TransformResult>;
}

/// Resolves target and normalization maximum.
///
/// Both are absent in forward mode. Otherwise the target must be present and
/// `attrs[max_key]` must be numeric.
fn reference(
    is_forward: bool,
    max_key: &str,
    target: Option<ArrayD<f32>>,
    attrs: &Attrs,
) -> Result<(Option<ArrayD<f32>>, Option<f64>)> {
    if is_forward {
        return Ok((None, None));
    }
    let target = target.ok_or(TransformError::MissingTarget)?;
    let maximum = attrs.scalar(max_key)?;
    Ok((Some(target), Some(maximum)))
}

/// Baseline transform: mask, stack real/imaginary channels, reshape the mask.
#[derive(Debug, Clone)]
pub struct DataTransform {
    is_forward: bool,
    max_key: String,
}

impl DataTransform {
    /// Creates a transform.
    ///
    /// * `is_forward` - inference mode, no ground truth available
    /// * `max_key` - attribute holding the normalization maximum
    pub fn new(is_forward: bool, max_key: &str) -> Self {
        Self {
            is_forward,
            max_key: max_key.to_string(),
        }
    }

    pub fn is_forward(&self) -> bool {
        self.is_forward
    }

    pub fn max_key(&self) -> &str {
        &self.max_key
    }
}

impl SampleTransform for DataTransform {
    fn apply(&self, sample: SliceSample) -> Result<TransformResult> {
        let SliceSample {
            mask,
            kspace: input,
            target,
            attrs,
            fname,
            slice,
        } = sample;

        let (target, maximum) = reference(self.is_forward, &self.max_key, target, &attrs)?;

        let kspace = mask_and_stack(&input, &mask)?;
        let mask = reshape_mask(&mask, mask_length(&kspace)?)?;
        log::trace!("{fname}[{slice}]: kspace {:?}, mask {:?}", kspace.shape(), mask.shape());

        Ok(TransformResult {
            mask,
            kspace,
            target,
            maximum,
            fname,
            slice,
        })
    }
}

/// Transform with optional k-space and mask augmentation stages.
///
/// A stage runs only if its collaborator was attached with its `on` flag set,
/// and the collaborator reports a positive probability for the current sample.
///
/// The mask augmentor may hand back a mask of a different size than the
/// k-space width. That is not corrected here: the final reshape fails with
/// [`TransformError::MaskReshape`].
#[derive(Clone)]
pub struct AugmentedDataTransform {
    is_forward: bool,
    max_key: String,
    augmentor: Option<Arc<dyn KspaceAugmentor>>,
    mask_augmentor: Option<Arc<dyn MaskAugmentor>>,
    use_augment: bool,
    use_mask_augment: bool,
}

impl AugmentedDataTransform {
    pub fn new(is_forward: bool, max_key: &str) -> Self {
        Self {
            is_forward,
            max_key: max_key.to_string(),
            augmentor: None,
            mask_augmentor: None,
            use_augment: false,
            use_mask_augment: false,
        }
    }

    /// Attaches a k-space augmentor. Its `aug_on` flag is read once, here.
    pub fn with_augmentor(mut self, augmentor: Arc<dyn KspaceAugmentor>) -> Self {
        self.use_augment = augmentor.aug_on();
        self.augmentor = Some(augmentor);
        self
    }

    /// Attaches a mask augmentor. Its `mask_aug_on` flag is read once, here.
    pub fn with_mask_augmentor(mut self, mask_augmentor: Arc<dyn MaskAugmentor>) -> Self {
        self.use_mask_augment = mask_augmentor.mask_aug_on();
        self.mask_augmentor = Some(mask_augmentor);
        self
    }

    pub fn is_forward(&self) -> bool {
        self.is_forward
    }

    pub fn max_key(&self) -> &str {
        &self.max_key
    }

    pub fn uses_augment(&self) -> bool {
        self.use_augment
    }

    pub fn uses_mask_augment(&self) -> bool {
        self.use_mask_augment
    }

    /// Forwards the training epoch to both collaborators.
    pub fn set_epoch(&self, epoch: usize) {
        if let Some(aug) = &self.augmentor {
            aug.set_epoch(epoch);
        }
        if let Some(mask_aug) = &self.mask_augmentor {
            mask_aug.set_epoch(epoch);
        }
    }

    fn active_mask_augmentor(&self) -> Option<&Arc<dyn MaskAugmentor>> {
        if !self.use_mask_augment {
            return None;
        }
        self.mask_augmentor
            .as_ref()
            .filter(|aug| aug.schedule_p() > 0.0)
    }

    fn active_augmentor(&self) -> Option<&Arc<dyn KspaceAugmentor>> {
        if !self.use_augment {
            return None;
        }
        self.augmentor.as_ref().filter(|aug| aug.schedule_p() > 0.0)
    }
}

impl std::fmt::Debug for AugmentedDataTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AugmentedDataTransform")
            .field("is_forward", &self.is_forward)
            .field("max_key", &self.max_key)
            .field("use_augment", &self.use_augment)
            .field("use_mask_augment", &self.use_mask_augment)
            .finish()
    }
}

impl SampleTransform for AugmentedDataTransform {
    fn apply(&self, sample: SliceSample) -> Result<TransformResult> {
        let SliceSample {
            mask,
            kspace: input,
            target,
            attrs,
            fname,
            slice,
        } = sample;

        let (mut target, maximum) = reference(self.is_forward, &self.max_key, target, &attrs)?;

        let (mut kspace, mask) = match self.active_mask_augmentor() {
            Some(mask_aug) => {
                log::debug!("{fname}[{slice}]: applying mask augmentation");
                mask_aug.augment(&input, &mask)?
            }
            None => (mask_and_stack(&input, &mask)?, mask),
        };

        if let Some(aug) = self.active_augmentor() {
            log::debug!("{fname}[{slice}]: applying k-space augmentation");
            let reference_target = target.take().ok_or(TransformError::MissingTarget)?;
            let target_shape = reference_target.shape().to_vec();
            let (aug_kspace, aug_target) = aug.augment(kspace, reference_target, &target_shape)?;
            kspace = aug_kspace;
            target = Some(aug_target);
        }

        let len = mask_length(&kspace)?;
        if mask.len() != len {
            log::warn!(
                "{fname}[{slice}]: mask has {} elements but k-space width is {len}",
                mask.len()
            );
        }
        let mask = reshape_mask(&mask, len)?;

        Ok(TransformResult {
            mask,
            kspace,
            target,
            maximum,
            fname,
            slice,
        })
    }
}
