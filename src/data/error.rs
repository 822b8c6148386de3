//! Errors raised while turning a raw slice into network-ready tensors.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    #[error("Attribute '{0}' not found in sample attrs")]
    MissingAttribute(String),

    #[error("Attribute '{0}' is not numeric and cannot be used as the normalization maximum")]
    NonNumericAttribute(String),

    #[error("Sample has no target, but a target is required outside forward mode")]
    MissingTarget,

    #[error("Cannot broadcast mask of shape {mask:?} against k-space of shape {kspace:?}")]
    ShapeMismatch {
        mask: Vec<usize>,
        kspace: Vec<usize>,
    },

    #[error("Cannot reshape mask with {actual} elements to (1, 1, {expected}, 1). \
             The mask augmentor returned a mask that does not match the k-space width.")]
    MaskReshape { expected: usize, actual: usize },

    #[error("K-space must have at least two axes after channel stacking, got shape {0:?}")]
    InvalidRank(Vec<usize>),

    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("Augmentation failed: {0}")]
    Augmentation(String),
}

pub type Result<T> = std::result::Result<T, TransformError>;
