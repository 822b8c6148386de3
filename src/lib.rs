//! # fastmri-transforms: k-space data transforms for MRI reconstruction
//!
//! Converts undersampled k-space slices into the tensors a reconstruction
//! network and its loss consume: the masked k-space as a real-valued array
//! with a trailing real/imaginary axis, the sampling mask laid out as
//! `(1, 1, W, 1)`, the target image and its normalization maximum.
//!
//! ## Usage Example
//!
//! ```no_run
//! use fastmri_transforms::data::{Attrs, DataTransform, SampleTransform, SliceSample};
//! use ndarray::{ArrayD, IxDyn};
//! use num_complex::Complex32;
//!
//! let kspace = ArrayD::from_elem(IxDyn(&[1, 4, 4]), Complex32::new(1.0, -1.0));
//! let mask = ArrayD::from_elem(IxDyn(&[4]), 1.0_f32);
//! let target = ArrayD::from_elem(IxDyn(&[4, 4]), 0.5_f32);
//! let attrs = Attrs::new().with("max", 7.5);
//!
//! let transform = DataTransform::new(false, "max");
//! let out = transform
//!     .apply(SliceSample::new(mask, kspace, Some(target), attrs, "file1000001.h5", 0))
//!     .unwrap();
//!
//! assert_eq!(out.kspace.shape(), &[1, 4, 4, 2]);
//! assert_eq!(out.mask.shape(), &[1, 1, 4, 1]);
//! assert_eq!(out.maximum, Some(7.5));
//! ```

pub mod config;
pub mod data;

pub use config::{ConfigError, TransformConfig};
pub use data::{AugmentedDataTransform, DataTransform, SampleTransform, TransformError};
