//! Epoch-driven augmentation probability.
//!
//! Augmentation usually starts after a warm-up delay and then grows toward a
//! maximum strength as training progresses. With delay `D`, last epoch `T`,
//! current epoch `t` and strength `p_max`:
//!
//! - `t < D`: `0`
//! - constant: `p_max`
//! - ramp: `(t - D) / (T - D) * p_max`
//! - exp: `p_max / (1 - e^(-(T-D)c)) * (1 - e^(-(t-D)c))` with `c = decay / (T - D)`

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Shape of the probability curve after the delay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScheduleKind {
    Constant,
    Ramp,
    Exp {
        #[serde(default = "default_exp_decay")]
        decay: f64,
    },
}

fn default_exp_decay() -> f64 {
    5.0
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AugmentationSchedule {
    #[serde(flatten)]
    pub kind: ScheduleKind,
    /// Maximum probability `p_max`.
    pub strength: f64,
    /// First epoch with non-zero probability.
    #[serde(default)]
    pub delay: usize,
    pub max_epochs: usize,
}

impl AugmentationSchedule {
    pub fn constant(strength: f64) -> Self {
        Self {
            kind: ScheduleKind::Constant,
            strength,
            delay: 0,
            max_epochs: 0,
        }
    }

    pub fn ramp(strength: f64, delay: usize, max_epochs: usize) -> Self {
        Self {
            kind: ScheduleKind::Ramp,
            strength,
            delay,
            max_epochs,
        }
    }

    pub fn exp(strength: f64, delay: usize, max_epochs: usize, decay: f64) -> Self {
        Self {
            kind: ScheduleKind::Exp { decay },
            strength,
            delay,
            max_epochs,
        }
    }

    /// Probability of augmenting a sample at `epoch`, in `[0, strength]`.
    pub fn probability(&self, epoch: usize) -> f64 {
        let p_max = self.strength.max(0.0);
        if epoch < self.delay {
            return 0.0;
        }
        if self.max_epochs <= self.delay {
            return p_max;
        }

        let span = (self.max_epochs - self.delay) as f64;
        let t = (epoch - self.delay) as f64;

        let p = match self.kind {
            ScheduleKind::Constant => p_max,
            ScheduleKind::Ramp => t / span * p_max,
            ScheduleKind::Exp { decay } => {
                if decay <= 0.0 {
                    t / span * p_max
                } else {
                    let c = decay / span;
                    p_max / (1.0 - (-span * c).exp()) * (1.0 - (-t * c).exp())
                }
            }
        };

        p.clamp(0.0, p_max)
    }
}

/// A schedule paired with the current training epoch.
///
/// The epoch is atomic so the training loop can advance it while loader
/// workers read the probability through a shared reference.
#[derive(Debug)]
pub struct ScheduledProbability {
    schedule: AugmentationSchedule,
    epoch: AtomicUsize,
}

impl ScheduledProbability {
    pub fn new(schedule: AugmentationSchedule) -> Self {
        Self {
            schedule,
            epoch: AtomicUsize::new(0),
        }
    }

    pub fn set_epoch(&self, epoch: usize) {
        self.epoch.store(epoch, Ordering::Relaxed);
    }

    pub fn epoch(&self) -> usize {
        self.epoch.load(Ordering::Relaxed)
    }

    pub fn schedule(&self) -> &AugmentationSchedule {
        &self.schedule
    }

    /// Probability at the current epoch.
    pub fn current(&self) -> f64 {
        self.schedule.probability(self.epoch())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_delay_gives_zero() {
        let s = AugmentationSchedule::ramp(0.5, 10, 50);
        assert_eq!(s.probability(0), 0.0);
        assert_eq!(s.probability(9), 0.0);
        assert_eq!(s.probability(10), 0.0);
    }

    #[test]
    fn test_constant() {
        let s = AugmentationSchedule::constant(0.3);
        assert!(close(s.probability(0), 0.3));
        assert!(close(s.probability(100), 0.3));
    }

    #[test]
    fn test_ramp() {
        let s = AugmentationSchedule::ramp(0.8, 10, 50);
        assert!(close(s.probability(30), 0.4));
        assert!(close(s.probability(50), 0.8));
        // Past the last epoch the probability stays at p_max.
        assert!(close(s.probability(80), 0.8));
    }

    #[test]
    fn test_exp_reaches_strength_at_last_epoch() {
        let s = AugmentationSchedule::exp(0.6, 0, 40, 5.0);
        assert_eq!(s.probability(0), 0.0);
        assert!(close(s.probability(40), 0.6));

        let mid = s.probability(20);
        let ramp_mid = AugmentationSchedule::ramp(0.6, 0, 40).probability(20);
        assert!(mid > ramp_mid);
        assert!(mid < 0.6);
    }

    #[test]
    fn test_degenerate_span() {
        let s = AugmentationSchedule::ramp(0.5, 5, 5);
        assert_eq!(s.probability(4), 0.0);
        assert!(close(s.probability(5), 0.5));
    }

    #[test]
    fn test_scheduled_probability_follows_epoch() {
        let p = ScheduledProbability::new(AugmentationSchedule::ramp(1.0, 0, 10));
        assert_eq!(p.current(), 0.0);
        p.set_epoch(5);
        assert_eq!(p.epoch(), 5);
        assert!(close(p.current(), 0.5));
    }

    #[test]
    fn test_schedule_from_json() {
        let s: AugmentationSchedule = serde_json::from_str(
            r#"{"kind": "exp", "strength": 0.55, "delay": 5, "max_epochs": 30}"#,
        )
        .unwrap();
        assert_eq!(s.kind, ScheduleKind::Exp { decay: 5.0 });
        assert_eq!(s.delay, 5);
    }
}
