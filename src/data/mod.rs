//! # Slice Transforms
//!
//! Turns one k-space slice from the dataset into the tensors a
//! reconstruction network trains on.
//!
//! ## Key Components
//!
//! - [`SampleTransform`]: Trait shared by all slice transforms
//! - [`DataTransform`]: Mask, stack real/imaginary channels, reshape the mask
//! - [`AugmentedDataTransform`]: Same, with optional augmentation stages
//! - [`KspaceAugmentor`] / [`MaskAugmentor`]: Augmentation collaborators
//!
//! ## Example
//!
//! ```ignore
//! use fastmri_transforms::data::{Attrs, DataTransform, SampleTransform, SliceSample};
//!
//! let transform = DataTransform::new(false, "max");
//! let sample = SliceSample::new(mask, kspace, Some(target), Attrs::new().with("max", 7.5), "file1.h5", 0);
//!
//! let out = transform.apply(sample)?;
//! assert_eq!(out.kspace.shape().last(), Some(&2));
//! ```

pub mod augment;
pub mod error;
pub mod kspace;
pub mod sample;
pub mod schedule;
pub mod transforms;

pub use augment::{AccelerationMaskAugmentor, IntensityScaleAugmentor, KspaceAugmentor, MaskAugmentor};
pub use error::TransformError;
pub use sample::{AttrValue, Attrs, SliceSample, TransformResult};
pub use schedule::{AugmentationSchedule, ScheduleKind, ScheduledProbability};
pub use transforms::{AugmentedDataTransform, DataTransform, SampleTransform};
