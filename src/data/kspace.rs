//! Array primitives on k-space: masking, channel stacking, mask layout.
//!
//! Complex k-space is carried as `ArrayD<Complex32>`. Everything handed to
//! the network is real valued, with real and imaginary parts stacked on a
//! trailing axis of size 2.

use super::error::{Result, TransformError};
use ndarray::{ArrayD, Axis, IxDyn, Zip};
use num_complex::Complex32;

/// Computes the numpy-style broadcast shape of two arrays.
///
/// Shapes are aligned on the right; an axis of size 1 stretches to match
/// the other side. Returns `None` if the shapes cannot be broadcast.
pub fn broadcast_shape(a: &[usize], b: &[usize]) -> Option<Vec<usize>> {
    let ndim = a.len().max(b.len());
    let mut shape = vec![0; ndim];

    for i in 0..ndim {
        let da = if i < ndim - a.len() { 1 } else { a[i - (ndim - a.len())] };
        let db = if i < ndim - b.len() { 1 } else { b[i - (ndim - b.len())] };

        shape[i] = match (da, db) {
            (x, y) if x == y => x,
            (1, y) => y,
            (x, 1) => x,
            _ => return None,
        };
    }

    Some(shape)
}

/// Multiplies complex k-space by a real sampling mask, broadcasting the mask.
pub fn apply_mask(input: &ArrayD<Complex32>, mask: &ArrayD<f32>) -> Result<ArrayD<Complex32>> {
    let mismatch = || TransformError::ShapeMismatch {
        mask: mask.shape().to_vec(),
        kspace: input.shape().to_vec(),
    };

    let shape = broadcast_shape(input.shape(), mask.shape()).ok_or_else(mismatch)?;
    let dim = IxDyn(&shape);
    let input_view = input.broadcast(dim.clone()).ok_or_else(mismatch)?;
    let mask_view = mask.broadcast(dim).ok_or_else(mismatch)?;

    Ok(Zip::from(&input_view)
        .and(&mask_view)
        .map_collect(|&x, &m| x * m))
}

/// Stacks real and imaginary parts along a new trailing axis.
///
/// An input of shape `(..., H, W)` becomes `(..., H, W, 2)`.
pub fn complex_to_channels(kspace: &ArrayD<Complex32>) -> Result<ArrayD<f32>> {
    let re = kspace.mapv(|c| c.re);
    let im = kspace.mapv(|c| c.im);
    let axis = Axis(kspace.ndim());
    Ok(ndarray::stack(axis, &[re.view(), im.view()])?)
}

/// Inverse of [`complex_to_channels`]. The trailing axis must have size 2.
pub fn channels_to_complex(kspace: &ArrayD<f32>) -> Result<ArrayD<Complex32>> {
    let last = kspace.ndim().checked_sub(1).ok_or_else(|| TransformError::InvalidRank(vec![]))?;
    if kspace.shape()[last] != 2 {
        return Err(TransformError::InvalidRank(kspace.shape().to_vec()));
    }

    let re = kspace.index_axis(Axis(last), 0);
    let im = kspace.index_axis(Axis(last), 1);
    Ok(Zip::from(&re)
        .and(&im)
        .map_collect(|&r, &i| Complex32::new(r, i)))
}

/// Masks the input and converts it to the stacked two-channel layout.
pub fn mask_and_stack(input: &ArrayD<Complex32>, mask: &ArrayD<f32>) -> Result<ArrayD<f32>> {
    let masked = apply_mask(input, mask)?;
    complex_to_channels(&masked)
}

/// Size of the second-to-last axis of stacked k-space (the mask length).
pub fn mask_length(kspace: &ArrayD<f32>) -> Result<usize> {
    let ndim = kspace.ndim();
    if ndim < 2 {
        return Err(TransformError::InvalidRank(kspace.shape().to_vec()));
    }
    Ok(kspace.shape()[ndim - 2])
}

/// Reshapes a sampling mask to `(1, 1, len, 1)` and casts it to `u8`.
///
/// Float values are truncated toward zero, so anything in `[0, 1)` becomes 0.
/// The element count must already equal `len`.
pub fn reshape_mask(mask: &ArrayD<f32>, len: usize) -> Result<ArrayD<u8>> {
    if mask.len() != len {
        return Err(TransformError::MaskReshape {
            expected: len,
            actual: mask.len(),
        });
    }

    let values: Vec<u8> = mask.iter().map(|&m| m as u8).collect();
    Ok(ArrayD::from_shape_vec(IxDyn(&[1, 1, len, 1]), values)?)
}
