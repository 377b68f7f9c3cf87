//! The family of loss functions a network can be trained against.
//!
//! Each variant fixes a pair of functions: `loss(target, result)` and its
//! derivative with respect to `result`. The forms of `LogisticLoss`,
//! `ExponentialLoss` and `CrossEntropyLoss` are kept exactly as they have
//! always been computed, even where the "derivative" is not the analytic
//! derivative of the loss. Trained networks depend on these numbers.

use crate::error::{Error, Result};

use itertools::izip;
use serde_derive::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::f64::consts::LN_2;
use std::fmt;
use std::str::FromStr;

/// Selects the loss function used by a network.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LossFunction {
    /// `0.5 (t - r)^2`
    ErrorSquared,
    /// `-t ln(r)`
    Logistical,
    /// Smoothed hinge loss on the margin `t r`
    Hinge,
    /// `(1 - r t)^2`
    SquareLossClassification,
    /// `log2(1 + e^{-t r})`
    LogisticLoss,
    /// `e^{-t r}`
    ExponentialLoss,
    /// Binary cross entropy against the soft label `(1 + r) / 2`
    CrossEntropyLoss,
}

impl Default for LossFunction {
    fn default() -> Self {
        LossFunction::ErrorSquared
    }
}

impl LossFunction {
    /// Every supported loss function, in tag order.
    pub const ALL: [LossFunction; 7] = [
        LossFunction::ErrorSquared,
        LossFunction::Logistical,
        LossFunction::Hinge,
        LossFunction::SquareLossClassification,
        LossFunction::LogisticLoss,
        LossFunction::ExponentialLoss,
        LossFunction::CrossEntropyLoss,
    ];

    /// Evaluates the loss of a single output unit.
    pub fn loss(self, target: f64, result: f64) -> f64 {
        use self::LossFunction::*;
        match self {
            ErrorSquared => 0.5 * (target - result).powi(2),
            Logistical => -target * result.ln(),
            Hinge => {
                let margin = target * result;
                if margin <= 0.0 {
                    0.5 - margin
                } else if margin > 1.0 {
                    0.0
                } else {
                    0.5 * (1.0 - margin) * (1.0 - margin)
                }
            }
            SquareLossClassification => (1.0 - result * target).powi(2),
            LogisticLoss => (1.0 / LN_2) * (1.0 + (-target * result).exp()).ln(),
            ExponentialLoss => (-target * result).exp(),
            CrossEntropyLoss => {
                let t = (1.0 + result) / 2.0;
                -t * result.ln() - (1.0 - t) * (1.0 - result).ln()
            }
        }
    }

    /// Evaluates `d loss / d result` for a single output unit.
    pub fn derivative(self, target: f64, result: f64) -> f64 {
        use self::LossFunction::*;
        match self {
            ErrorSquared => result - target,
            Logistical => -target / result,
            Hinge => {
                let margin = target * result;
                if margin <= 0.0 {
                    -result
                } else if margin > 1.0 {
                    0.0
                } else {
                    -target * (1.0 - margin)
                }
            }
            SquareLossClassification => -2.0 * target * (1.0 - target * result),
            LogisticLoss => {
                let e = (result * target).exp();
                (result * e) / (LN_2 * e + LN_2)
            }
            ExponentialLoss => -result * (-result * target).exp(),
            CrossEntropyLoss => {
                let t = (1.0 + result) / 2.0;
                -((t - result) / ((1.0 - result) * result))
            }
        }
    }

    /// Sums the loss over every output unit.
    pub fn total(self, targets: &[f64], results: &[f64]) -> f64 {
        izip!(targets, results)
            .map(|(&t, &r)| self.loss(t, r))
            .sum()
    }

    /// Writes `d loss / d result` for every output unit into `deltas`.
    pub fn gradient(self, targets: &[f64], results: &[f64], deltas: &mut [f64]) {
        for (d, &t, &r) in izip!(deltas.iter_mut(), targets, results) {
            *d = self.derivative(t, r);
        }
    }

    /// The stable tag used by the binary network format.
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        use self::LossFunction::*;
        match self {
            ErrorSquared => "ErrorSquared",
            Logistical => "Logistical",
            Hinge => "Hinge",
            SquareLossClassification => "SquareLossClassification",
            LogisticLoss => "LogisticLoss",
            ExponentialLoss => "ExponentialLoss",
            CrossEntropyLoss => "CrossEntropyLoss",
        }
    }
}

impl fmt::Display for LossFunction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LossFunction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        LossFunction::ALL
            .iter()
            .copied()
            .find(|l| l.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::UnsupportedLossFunction(s.to_string()))
    }
}

impl TryFrom<u8> for LossFunction {
    type Error = Error;

    fn try_from(tag: u8) -> Result<Self> {
        LossFunction::ALL
            .get(tag as usize)
            .copied()
            .ok_or_else(|| Error::UnsupportedLossFunction(format!("tag {}", tag)))
    }
}
