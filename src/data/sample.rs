//! Input and output records of a slice transform.

use super::error::{Result, TransformError};
use ndarray::ArrayD;
use num_complex::Complex32;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Scalar metadata stored alongside a k-space volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl AttrValue {
    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Int(v) => Some(*v as f64),
            AttrValue::Float(v) => Some(*v),
            AttrValue::Text(_) => None,
        }
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Float(v)
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Int(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::Text(v.to_string())
    }
}

/// Per-volume attributes (`max`, `norm`, `acquisition`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attrs(HashMap<String, AttrValue>);

impl Attrs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an attribute.
    pub fn with(mut self, key: &str, value: impl Into<AttrValue>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<AttrValue>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.0.get(key)
    }

    /// Looks up a numeric attribute, failing if it is absent or not a number.
    pub fn scalar(&self, key: &str) -> Result<f64> {
        self.get(key)
            .ok_or_else(|| TransformError::MissingAttribute(key.to_string()))?
            .as_f64()
            .ok_or_else(|| TransformError::NonNumericAttribute(key.to_string()))
    }
}

impl FromIterator<(String, AttrValue)> for Attrs {
    fn from_iter<I: IntoIterator<Item = (String, AttrValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One slice as produced by the dataset: `(mask, input, target, attrs, fname, slice)`.
#[derive(Debug, Clone)]
pub struct SliceSample {
    /// Sampling mask, broadcastable against `kspace`.
    pub mask: ArrayD<f32>,
    /// Complex k-space, usually `(coils, height, width)`.
    pub kspace: ArrayD<Complex32>,
    /// Ground-truth image. `None` when reconstructing without a reference.
    pub target: Option<ArrayD<f32>>,
    pub attrs: Attrs,
    pub fname: String,
    pub slice: usize,
}

impl SliceSample {
    pub fn new(
        mask: ArrayD<f32>,
        kspace: ArrayD<Complex32>,
        target: Option<ArrayD<f32>>,
        attrs: Attrs,
        fname: &str,
        slice: usize,
    ) -> Self {
        Self {
            mask,
            kspace,
            target,
            attrs,
            fname: fname.to_string(),
            slice,
        }
    }
}

/// Tensors handed to the model and the loss for one slice.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformResult {
    /// Sampling mask shaped `(1, 1, W, 1)`.
    pub mask: ArrayD<u8>,
    /// Masked k-space with a trailing real/imaginary axis of size 2.
    pub kspace: ArrayD<f32>,
    /// Ground truth; absent in forward mode.
    pub target: Option<ArrayD<f32>>,
    /// Normalization maximum; absent in forward mode.
    pub maximum: Option<f64>,
    pub fname: String,
    pub slice: usize,
}

impl TransformResult {
    /// Legacy view of the maximum, with `-1` standing in for "absent".
    pub fn maximum_or_sentinel(&self) -> f64 {
        self.maximum.unwrap_or(-1.0)
    }

    /// Legacy view of the target, a scalar `-1` array when absent.
    pub fn target_or_sentinel(&self) -> ArrayD<f32> {
        self.target
            .clone()
            .unwrap_or_else(|| ArrayD::from_elem(ndarray::IxDyn(&[]), -1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attrs_scalar() {
        let attrs = Attrs::new()
            .with("max", 7.5)
            .with("padding_left", 19_i64)
            .with("acquisition", "CORPD_FBK");

        assert_eq!(attrs.scalar("max").unwrap(), 7.5);
        assert_eq!(attrs.scalar("padding_left").unwrap(), 19.0);
        assert_eq!(
            attrs.scalar("acquisition").unwrap_err(),
            TransformError::NonNumericAttribute("acquisition".to_string())
        );
        assert_eq!(
            attrs.scalar("norm").unwrap_err(),
            TransformError::MissingAttribute("norm".to_string())
        );
    }

    #[test]
    fn test_attrs_from_json() {
        let attrs: Attrs =
            serde_json::from_str(r#"{"max": 0.0004, "acquisition": "AXT2", "encoding": 640}"#)
                .unwrap();

        assert_eq!(attrs.get("encoding"), Some(&AttrValue::Int(640)));
        assert!((attrs.scalar("max").unwrap() - 0.0004).abs() < 1e-12);
        assert_eq!(attrs.get("acquisition"), Some(&AttrValue::Text("AXT2".into())));
    }

    #[test]
    fn test_sentinel_views() {
        let result = TransformResult {
            mask: ArrayD::zeros(ndarray::IxDyn(&[1, 1, 2, 1])),
            kspace: ArrayD::zeros(ndarray::IxDyn(&[1, 2, 2, 2])),
            target: None,
            maximum: None,
            fname: "file1000001.h5".to_string(),
            slice: 3,
        };

        assert_eq!(result.maximum_or_sentinel(), -1.0);
        let target = result.target_or_sentinel();
        assert_eq!(target.ndim(), 0);
        assert_eq!(target.first(), Some(&-1.0));
    }
}
