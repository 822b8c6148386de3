//! Transform configuration, loadable from JSON.
//!
//! ```json
//! {
//!   "is_forward": false,
//!   "max_key": "max",
//!   "augmentation": {
//!     "aug_on": true,
//!     "schedule": { "kind": "exp", "strength": 0.55, "delay": 5, "max_epochs": 30 },
//!     "min_scale": 0.8,
//!     "max_scale": 1.2,
//!     "seed": 7
//!   },
//!   "mask_augmentation": {
//!     "mask_aug_on": true,
//!     "schedule": { "kind": "constant", "strength": 0.5, "max_epochs": 30 },
//!     "accelerations": [4, 8],
//!     "center_fraction": 0.08
//!   }
//! }
//! ```

use crate::data::augment::{AccelerationMaskAugmentor, IntensityScaleAugmentor};
use crate::data::schedule::AugmentationSchedule;
use crate::data::transforms::{AugmentedDataTransform, DataTransform};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

type Result<T> = std::result::Result<T, ConfigError>;

fn default_max_key() -> String {
    "max".to_string()
}

fn default_min_scale() -> f32 {
    1.0
}

fn default_max_scale() -> f32 {
    1.0
}

fn default_center_fraction() -> f64 {
    0.08
}

/// Settings of the k-space intensity augmentor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AugmentationConfig {
    pub aug_on: bool,
    pub schedule: AugmentationSchedule,
    #[serde(default = "default_min_scale")]
    pub min_scale: f32,
    #[serde(default = "default_max_scale")]
    pub max_scale: f32,
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Settings of the acceleration mask augmentor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskAugmentationConfig {
    pub mask_aug_on: bool,
    pub schedule: AugmentationSchedule,
    pub accelerations: Vec<usize>,
    #[serde(default = "default_center_fraction")]
    pub center_fraction: f64,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Inference mode: no target, no normalization maximum.
    #[serde(default)]
    pub is_forward: bool,
    /// Attribute name of the normalization maximum.
    #[serde(default = "default_max_key")]
    pub max_key: String,
    #[serde(default)]
    pub augmentation: Option<AugmentationConfig>,
    #[serde(default)]
    pub mask_augmentation: Option<MaskAugmentationConfig>,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            is_forward: false,
            max_key: default_max_key(),
            augmentation: None,
            mask_augmentation: None,
        }
    }
}

fn check_schedule(name: &str, schedule: &AugmentationSchedule) -> Result<()> {
    if !(0.0..=1.0).contains(&schedule.strength) {
        return Err(ConfigError::Invalid(format!(
            "{name}: strength must be in [0, 1], got {}",
            schedule.strength
        )));
    }
    if schedule.max_epochs < schedule.delay {
        return Err(ConfigError::Invalid(format!(
            "{name}: max_epochs ({}) is smaller than delay ({})",
            schedule.max_epochs, schedule.delay
        )));
    }
    Ok(())
}

impl TransformConfig {
    pub fn new(is_forward: bool, max_key: &str) -> Self {
        Self {
            is_forward,
            max_key: max_key.to_string(),
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks ranges that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.max_key.is_empty() {
            return Err(ConfigError::Invalid("max_key must not be empty".to_string()));
        }

        if let Some(aug) = &self.augmentation {
            check_schedule("augmentation", &aug.schedule)?;
            if !(aug.min_scale > 0.0 && aug.min_scale <= aug.max_scale) {
                return Err(ConfigError::Invalid(format!(
                    "augmentation: need 0 < min_scale <= max_scale, got [{}, {}]",
                    aug.min_scale, aug.max_scale
                )));
            }
        }

        if let Some(mask_aug) = &self.mask_augmentation {
            check_schedule("mask_augmentation", &mask_aug.schedule)?;
            if mask_aug.accelerations.is_empty() || mask_aug.accelerations.contains(&0) {
                return Err(ConfigError::Invalid(
                    "mask_augmentation: accelerations must be a non-empty list of positive factors"
                        .to_string(),
                ));
            }
            if !(mask_aug.center_fraction > 0.0 && mask_aug.center_fraction <= 1.0) {
                return Err(ConfigError::Invalid(format!(
                    "mask_augmentation: center_fraction must be in (0, 1], got {}",
                    mask_aug.center_fraction
                )));
            }
        }

        Ok(())
    }

    /// Builds the baseline transform. Augmentation settings are ignored.
    pub fn build_transform(&self) -> DataTransform {
        DataTransform::new(self.is_forward, &self.max_key)
    }

    /// Builds the augmenting transform with the built-in augmentors.
    pub fn build_augmented_transform(&self) -> Result<AugmentedDataTransform> {
        self.validate()?;
        let mut transform = AugmentedDataTransform::new(self.is_forward, &self.max_key);

        if let Some(aug) = &self.augmentation {
            let mut augmentor =
                IntensityScaleAugmentor::new(aug.schedule, aug.min_scale, aug.max_scale)
                    .enabled(aug.aug_on);
            if let Some(seed) = aug.seed {
                augmentor = augmentor.with_seed(seed);
            }
            transform = transform.with_augmentor(Arc::new(augmentor));
        }

        if let Some(mask_aug) = &self.mask_augmentation {
            let mut augmentor = AccelerationMaskAugmentor::new(
                mask_aug.schedule,
                mask_aug.accelerations.clone(),
                mask_aug.center_fraction,
            )
            .enabled(mask_aug.mask_aug_on);
            if let Some(seed) = mask_aug.seed {
                augmentor = augmentor.with_seed(seed);
            }
            transform = transform.with_mask_augmentor(Arc::new(augmentor));
        }

        log::debug!(
            "built {:?} (augment: {}, mask augment: {})",
            transform,
            transform.uses_augment(),
            transform.uses_mask_augment()
        );
        Ok(transform)
    }
}
