//! Activation function types for fully connected units.

use serde_derive::{Deserialize, Serialize};

/// [Activation function](https://en.wikipedia.org/wiki/Activation_function)
/// types.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Activator {
    /// Logistic sigmoid, the default for fully connected layers
    Sigmoid,
    /// Hyperbolic tan function
    TanH,
    /// Rectified Linear Unit
    ReLU,
    /// Leaky Rectified Linear Unit
    ///
    /// Takes an `alpha` value to use for negative inputs.
    LeakyReLU(f64),
    /// Passes the weighted sum through unchanged
    Identity,
}

impl Default for Activator {
    fn default() -> Self {
        Activator::Sigmoid
    }
}

impl Activator {
    /// Evaluates `f(x)` for the selected the activation function.
    pub fn f(self, x: f64) -> f64 {
        match self {
            Activator::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Activator::TanH => x.tanh(),
            Activator::ReLU => x.max(0.0),
            Activator::LeakyReLU(alpha) => if x > 0.0 { x } else { alpha * x },
            Activator::Identity => x,
        }
    }

    /// Evaluates the derivative `f'(x)`, where `x = f^{-1}(y)`.
    ///
    /// Note that this function takes in the *output* of the activation
    /// function, rather than the input, so units only need to remember their
    /// activated value between the forward and backward pass.
    pub fn fprime(self, y: f64) -> f64 {
        match self {
            Activator::Sigmoid => y * (1.0 - y),
            Activator::TanH => 1.0 - y * y,
            Activator::ReLU => if y > 0.0 { 1.0 } else { 0.0 },
            Activator::LeakyReLU(alpha) => if y > 0.0 { 1.0 } else { alpha },
            Activator::Identity => 1.0,
        }
    }
}
