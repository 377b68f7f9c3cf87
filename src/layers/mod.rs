//! The layer variants a network is built from.
//!
//! Every variant is a member of the closed `Layer` enum, so supporting a new
//! kind of layer means extending each `match` below. Layers never hold a
//! pointer to their neighbours; the network passes the upstream layer's
//! outputs in, and receives the gradient to hand back upstream.

mod convolution;
mod dense;
mod input;
mod pooling;
mod relu;
mod softmax;

pub use self::convolution::ConvolutionLayer;
pub use self::dense::DenseLayer;
pub use self::input::InputLayer;
pub use self::pooling::PoolingLayer;
pub use self::relu::ReLULayer;
pub use self::softmax::SoftMaxLayer;

use crate::activator::Activator;
use crate::genome::{Genome, ParameterProvider};
use crate::loss::LossFunction;
use crate::source::NeuronSource;

use rayon::prelude::*;
use serde_derive::{Deserialize, Serialize};
use std::fmt;

/// The width, height and depth of a spatial signal.
///
/// Spatial signals are flattened depth-major: the value at `(x, y, z)` lives
/// at `(z * height + y) * width + x`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Extent {
    pub width: usize,
    pub height: usize,
    pub depth: usize,
}

impl Extent {
    pub fn new(width: usize, height: usize, depth: usize) -> Self {
        Extent {
            width,
            height,
            depth,
        }
    }

    /// Number of values in a signal of this extent.
    pub fn volume(&self) -> usize {
        self.width * self.height * self.depth
    }

    /// Flat offset of `(x, y, z)`.
    #[inline]
    pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
        (z * self.height + y) * self.width + x
    }
}

impl From<(usize, usize, usize)> for Extent {
    fn from((width, height, depth): (usize, usize, usize)) -> Self {
        Extent::new(width, height, depth)
    }
}

impl From<(usize, usize)> for Extent {
    fn from((width, height): (usize, usize)) -> Self {
        Extent::new(width, height, 1)
    }
}

impl From<Extent> for (usize, usize, usize) {
    fn from(e: Extent) -> Self {
        (e.width, e.height, e.depth)
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}x{}x{}", self.width, self.height, self.depth)
    }
}

/// Tag naming the variant of a layer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayerType {
    Input,
    FullyConnected,
    Convolution,
    Pooling,
    ReLU,
    SoftMax,
}

impl fmt::Display for LayerType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// The hyperparameters a layer was constructed with.
///
/// Replaying a sequence of specs onto an empty network rebuilds the same
/// topology, which is how networks are copied and loaded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum LayerSpec {
    Input {
        size: usize,
    },
    FullyConnected {
        size: usize,
        activator: Activator,
        scaling: bool,
    },
    Convolution {
        filters: usize,
        filter_size: usize,
        stride: usize,
        padding: usize,
        input: Extent,
    },
    Pooling {
        tessellation: usize,
        input: Extent,
    },
    ReLU,
    SoftMax,
}

impl LayerSpec {
    pub fn layer_type(&self) -> LayerType {
        match self {
            LayerSpec::Input { .. } => LayerType::Input,
            LayerSpec::FullyConnected { .. } => LayerType::FullyConnected,
            LayerSpec::Convolution { .. } => LayerType::Convolution,
            LayerSpec::Pooling { .. } => LayerType::Pooling,
            LayerSpec::ReLU => LayerType::ReLU,
            LayerSpec::SoftMax => LayerType::SoftMax,
        }
    }
}

/// One stage of a feed-forward network.
#[derive(Debug)]
pub enum Layer {
    Input(InputLayer),
    FullyConnected(DenseLayer),
    Convolution(ConvolutionLayer),
    Pooling(PoolingLayer),
    ReLU(ReLULayer),
    SoftMax(SoftMaxLayer),
}

impl Layer {
    pub fn layer_type(&self) -> LayerType {
        match self {
            Layer::Input(_) => LayerType::Input,
            Layer::FullyConnected(_) => LayerType::FullyConnected,
            Layer::Convolution(_) => LayerType::Convolution,
            Layer::Pooling(_) => LayerType::Pooling,
            Layer::ReLU(_) => LayerType::ReLU,
            Layer::SoftMax(_) => LayerType::SoftMax,
        }
    }

    /// Returns the hyperparameters needed to rebuild this layer.
    pub fn spec(&self) -> LayerSpec {
        match self {
            Layer::Input(l) => LayerSpec::Input { size: l.len() },
            Layer::FullyConnected(l) => LayerSpec::FullyConnected {
                size: l.len(),
                activator: l.activator(),
                scaling: l.scaling(),
            },
            Layer::Convolution(l) => LayerSpec::Convolution {
                filters: l.filter_count(),
                filter_size: l.filter_size(),
                stride: l.stride(),
                padding: l.padding(),
                input: l.input_extent(),
            },
            Layer::Pooling(l) => LayerSpec::Pooling {
                tessellation: l.tessellation(),
                input: l.input_extent(),
            },
            Layer::ReLU(_) => LayerSpec::ReLU,
            Layer::SoftMax(_) => LayerSpec::SoftMax,
        }
    }

    /// Number of values this layer outputs.
    pub fn output_len(&self) -> usize {
        match self {
            Layer::Input(l) => l.len(),
            Layer::FullyConnected(l) => l.len(),
            Layer::Convolution(l) => l.output_extent().volume(),
            Layer::Pooling(l) => l.output_extent().volume(),
            Layer::ReLU(l) => l.len(),
            Layer::SoftMax(l) => l.len(),
        }
    }

    /// The spatial extent of this layer's output, if it has one.
    pub fn output_extent(&self) -> Option<Extent> {
        match self {
            Layer::Convolution(l) => Some(l.output_extent()),
            Layer::Pooling(l) => Some(l.output_extent()),
            _ => None,
        }
    }

    /// The values produced by the most recent forward pass.
    pub fn outputs(&self, source: &NeuronSource) -> Vec<f64> {
        match self {
            Layer::Input(l) => l.outputs().to_vec(),
            Layer::FullyConnected(l) => l.outputs(source),
            Layer::Convolution(l) => l.outputs().to_vec(),
            Layer::Pooling(l) => l.outputs().to_vec(),
            Layer::ReLU(l) => l.outputs().to_vec(),
            Layer::SoftMax(l) => l.outputs().to_vec(),
        }
    }

    /// Recomputes every unit of the layer from the upstream layer's
    /// `inputs`. The input layer ignores `inputs`.
    pub fn evaluate_all_units(&mut self, inputs: &[f64], source: &mut NeuronSource) {
        match self {
            Layer::Input(_) => {}
            Layer::FullyConnected(l) => l.evaluate(inputs, source),
            Layer::Convolution(l) => l.evaluate(inputs),
            Layer::Pooling(l) => l.evaluate(inputs),
            Layer::ReLU(l) => l.evaluate(inputs),
            Layer::SoftMax(l) => l.evaluate(inputs),
        }
    }

    /// Seeds this layer's deltas from the loss against `targets`, then runs
    /// its backward step. Used on the output layer only.
    pub fn backpropagate_target(
        &mut self,
        targets: &[f64],
        loss: LossFunction,
        inputs: &[f64],
        source: &mut NeuronSource,
        learning_rate: f64,
    ) -> Vec<f64> {
        let outputs = self.outputs(source);
        let mut seed = vec![0.0; outputs.len()];
        loss.gradient(targets, &outputs, &mut seed);
        self.accumulate_deltas(&seed, source);
        self.backpropagate(inputs, source, learning_rate)
    }

    /// Runs the backward step using the deltas accumulated on this layer.
    ///
    /// `inputs` are the upstream layer's outputs from the forward pass.
    /// Trainable parameters are updated in place, and the gradient with
    /// respect to each input is returned for the upstream layer to
    /// accumulate.
    pub fn backpropagate(
        &mut self,
        inputs: &[f64],
        source: &mut NeuronSource,
        learning_rate: f64,
    ) -> Vec<f64> {
        match self {
            Layer::Input(_) => Vec::new(),
            Layer::FullyConnected(l) => l.backpropagate(inputs, source, learning_rate),
            Layer::Convolution(l) => l.backpropagate(inputs, learning_rate),
            Layer::Pooling(l) => l.backpropagate(),
            Layer::ReLU(l) => l.backpropagate(inputs),
            Layer::SoftMax(l) => l.backpropagate(),
        }
    }

    /// Adds `gradient` to the per-unit deltas of this layer.
    pub fn accumulate_deltas(&mut self, gradient: &[f64], source: &mut NeuronSource) {
        let deltas = match self {
            Layer::Input(_) => return,
            Layer::FullyConnected(l) => return l.accumulate_deltas(gradient, source),
            Layer::Convolution(l) => l.deltas_mut(),
            Layer::Pooling(l) => l.deltas_mut(),
            Layer::ReLU(l) => l.deltas_mut(),
            Layer::SoftMax(l) => l.deltas_mut(),
        };
        debug_assert_eq!(deltas.len(), gradient.len());
        for (d, g) in deltas.iter_mut().zip(gradient) {
            *d += g;
        }
    }

    /// Clears every unit's delta. Units are independent, so this runs in
    /// parallel and returns only once every unit has been reset.
    pub fn reset_deltas(&mut self, source: &mut NeuronSource) {
        let deltas = match self {
            Layer::Input(_) => return,
            Layer::FullyConnected(l) => return source.reset_deltas(l.neuron_ids()),
            Layer::Convolution(l) => l.deltas_mut(),
            Layer::Pooling(l) => l.deltas_mut(),
            Layer::ReLU(l) => l.deltas_mut(),
            Layer::SoftMax(l) => l.deltas_mut(),
        };
        deltas.par_iter_mut().for_each(|d| *d = 0.0);
    }
}

/// Only convolution layers carry private parameters; fully connected
/// weights are contributed by the `NeuronSource`.
impl ParameterProvider for Layer {
    fn parameter_count(&self) -> usize {
        match self {
            Layer::Convolution(l) => l.parameter_count(),
            _ => 0,
        }
    }

    fn write_parameters(&self, genome: &mut Genome) {
        if let Layer::Convolution(l) = self {
            l.write_parameters(genome);
        }
    }

    fn read_parameters<'a>(&mut self, genome: &'a [f64]) -> &'a [f64] {
        match self {
            Layer::Convolution(l) => l.read_parameters(genome),
            _ => genome,
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.spec() {
            LayerSpec::Input { size } => write!(f, "Input({})", size),
            LayerSpec::FullyConnected {
                size,
                activator,
                scaling,
            } => write!(
                f,
                "FullyConnected({}, {:?}{})",
                size,
                activator,
                if scaling { ", scaled" } else { "" }
            ),
            LayerSpec::Convolution {
                filters,
                filter_size,
                stride,
                padding,
                input,
            } => write!(
                f,
                "Convolution({} filters {}x{}, stride {}, padding {}, {} -> {})",
                filters,
                filter_size,
                filter_size,
                stride,
                padding,
                input,
                self.output_extent().unwrap_or_default()
            ),
            LayerSpec::Pooling {
                tessellation,
                input,
            } => write!(
                f,
                "Pooling({}, {} -> {})",
                tessellation,
                input,
                self.output_extent().unwrap_or_default()
            ),
            LayerSpec::ReLU => write!(f, "ReLU({})", self.output_len()),
            LayerSpec::SoftMax => write!(f, "SoftMax({})", self.output_len()),
        }
    }
}
