//! A layered [feedforward neural network]
//! (https://en.wikipedia.org/wiki/Feedforward_neural_network) trainable by
//! backpropagation or by evolving its genome.
//!
//! # Example
//!
//! Build a small network, train it on one example and copy it:
//!
//! ```
//! # use neurogen::*;
//! let mut network = Network::new(LossFunction::ErrorSquared, 0.1);
//! network.add_input_layer(2).unwrap();
//! network.add_fully_connected_layer(3, Activator::Sigmoid, true).unwrap();
//! network.add_fully_connected_layer(1, Activator::Sigmoid, true).unwrap();
//!
//! for _ in 0..10 {
//!     network.run(&[0.0, 1.0]).unwrap();
//!     network.backpropagate(&[1.0]).unwrap();
//! }
//!
//! // A copy has the same topology and parameters, so it computes the same
//! // outputs.
//! let mut copy = network.get_copy().unwrap();
//! assert_eq!(copy.get_genome(), network.get_genome());
//! assert_eq!(copy.run(&[0.0, 1.0]).unwrap(), network.run(&[0.0, 1.0]).unwrap());
//! ```

use crate::activator::Activator;
use crate::error::{Error, Result};
use crate::genome::{Genome, ParameterProvider};
use crate::layers::*;
use crate::loss::LossFunction;
use crate::source::NeuronSource;
use crate::telemetry::{ErrorStats, StepReport, TrainingObserver};

use log::debug;
use rand::Rng;
use std::fmt;
use std::iter::Rev;
use std::ops::Range;
use std::slice;

/// The ordered layers of a network.
///
/// Layers are stored in the order they were added, so index 0 is the input
/// layer and the last index is the output layer. Forward evaluation walks
/// `forward_order` (input to output); backpropagation walks
/// `backward_order` (output to input).
#[derive(Debug, Default)]
pub struct LayerStack {
    layers: Vec<Layer>,
}

impl LayerStack {
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    fn push(&mut self, layer: Layer) {
        self.layers.push(layer);
    }

    /// The input layer, which is always the first layer added.
    pub fn input(&self) -> Option<&Layer> {
        self.layers.first()
    }

    /// The output layer, which is always the most recently added layer.
    pub fn output(&self) -> Option<&Layer> {
        self.layers.last()
    }

    fn input_mut(&mut self) -> Option<&mut Layer> {
        self.layers.first_mut()
    }

    /// Layers from the input to the output.
    pub fn forward_order(&self) -> slice::Iter<'_, Layer> {
        self.layers.iter()
    }

    /// Layers from the output to the input.
    pub fn backward_order(&self) -> Rev<slice::Iter<'_, Layer>> {
        self.layers.iter().rev()
    }

    /// Positions from the input to the output.
    fn forward_indices(&self) -> Range<usize> {
        0..self.layers.len()
    }

    /// Positions from the output to the input.
    fn backward_indices(&self) -> Rev<Range<usize>> {
        self.forward_indices().rev()
    }

    fn iter_mut(&mut self) -> slice::IterMut<'_, Layer> {
        self.layers.iter_mut()
    }

    /// The outputs of the layer feeding position `i`, empty for the input
    /// layer.
    fn upstream_outputs(&self, i: usize, source: &NeuronSource) -> Vec<f64> {
        match i.checked_sub(1) {
            Some(up) => self.layers[up].outputs(source),
            None => Vec::new(),
        }
    }
}

/// A feedforward neural network
#[derive(Debug)]
pub struct Network {
    loss: LossFunction,
    learning_rate: f64,
    source: NeuronSource,
    layers: LayerStack,
    stats: ErrorStats,
}

impl Default for Network {
    /// An empty network trained against `ErrorSquared` with a learning rate
    /// of 0.1.
    fn default() -> Self {
        Network::new(LossFunction::default(), 0.1)
    }
}

impl Network {
    /// Creates a new network with no layers.
    ///
    /// Arguments:
    ///  * `loss` - the loss function the network is trained against.
    ///  * `learning_rate` - the gradient descent rate, fixed for the life of
    ///                      the network.
    pub fn new(loss: LossFunction, learning_rate: f64) -> Self {
        Network {
            loss,
            learning_rate,
            source: NeuronSource::new(),
            layers: LayerStack::default(),
            stats: ErrorStats::default(),
        }
    }

    pub fn loss_function(&self) -> LossFunction {
        self.loss
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn layers(&self) -> &LayerStack {
        &self.layers
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Layer types from the input to the output.
    pub fn layer_types(&self) -> Vec<LayerType> {
        self.layers.forward_order().map(Layer::layer_type).collect()
    }

    /// The hyperparameters of every layer, in the order they were added.
    pub fn specs(&self) -> Vec<LayerSpec> {
        self.layers.forward_order().map(Layer::spec).collect()
    }

    pub fn source(&self) -> &NeuronSource {
        &self.source
    }

    /// Error statistics accumulated by `backpropagate`.
    pub fn stats(&self) -> &ErrorStats {
        &self.stats
    }

    /// Returns the size of the input layer, or 0 without one.
    pub fn input_len(&self) -> usize {
        self.layers.input().map_or(0, Layer::output_len)
    }

    /// Returns the size of the output layer, or 0 without one.
    pub fn output_len(&self) -> usize {
        self.layers.output().map_or(0, Layer::output_len)
    }

    /// Adds a layer on top of the network.
    ///
    /// The first layer must be an input layer; every later layer takes the
    /// current top layer as its input.
    pub fn add(&mut self, spec: LayerSpec) -> Result<()> {
        self.add_with_rng(spec, &mut rand::thread_rng())
    }

    /// Adds a layer, drawing its initial parameters from `rng`.
    pub fn add_with_rng<R: Rng + ?Sized>(&mut self, spec: LayerSpec, rng: &mut R) -> Result<()> {
        debug!("Adding {} layer", spec.layer_type());
        let upstream = match (&spec, self.layers.output()) {
            (LayerSpec::Input { .. }, None) => 0,
            (LayerSpec::Input { .. }, Some(_)) => return Err(Error::DuplicateInputLayer),
            (_, None) => return Err(Error::MissingInputLayer),
            (_, Some(top)) => top.output_len(),
        };

        let layer = match spec {
            LayerSpec::Input { size } => {
                non_empty(size, "input layer")?;
                Layer::Input(InputLayer::new(size))
            }
            LayerSpec::FullyConnected {
                size,
                activator,
                scaling,
            } => {
                non_empty(size, "fully connected layer")?;
                Layer::FullyConnected(DenseLayer::new(
                    size,
                    upstream,
                    activator,
                    scaling,
                    &mut self.source,
                    rng,
                ))
            }
            LayerSpec::Convolution {
                filters,
                filter_size,
                stride,
                padding,
                input,
            } => {
                matches_upstream(input, upstream)?;
                Layer::Convolution(ConvolutionLayer::new(
                    filters,
                    filter_size,
                    stride,
                    padding,
                    input,
                    rng,
                )?)
            }
            LayerSpec::Pooling {
                tessellation,
                input,
            } => {
                matches_upstream(input, upstream)?;
                Layer::Pooling(PoolingLayer::new(tessellation, input)?)
            }
            LayerSpec::ReLU => Layer::ReLU(ReLULayer::new(upstream)),
            LayerSpec::SoftMax => Layer::SoftMax(SoftMaxLayer::new(upstream)),
        };
        self.layers.push(layer);
        Ok(())
    }

    pub fn add_input_layer(&mut self, size: usize) -> Result<()> {
        self.add(LayerSpec::Input { size })
    }

    pub fn add_fully_connected_layer(
        &mut self,
        size: usize,
        activator: Activator,
        scaling: bool,
    ) -> Result<()> {
        self.add(LayerSpec::FullyConnected {
            size,
            activator,
            scaling,
        })
    }

    /// Adds a convolution layer over the top layer's output, interpreted as
    /// `input`. Returns the new layer's output extent.
    pub fn add_convolution_layer<E: Into<Extent>>(
        &mut self,
        filters: usize,
        filter_size: usize,
        stride: usize,
        padding: usize,
        input: E,
    ) -> Result<Extent> {
        self.add(LayerSpec::Convolution {
            filters,
            filter_size,
            stride,
            padding,
            input: input.into(),
        })?;
        Ok(self.top_extent())
    }

    /// Adds a max pooling layer over the top layer's output, interpreted as
    /// `input`. Returns the new layer's output extent.
    pub fn add_pooling_layer<E: Into<Extent>>(&mut self, tessellation: usize, input: E) -> Result<Extent> {
        self.add(LayerSpec::Pooling {
            tessellation,
            input: input.into(),
        })?;
        Ok(self.top_extent())
    }

    pub fn add_relu_layer(&mut self) -> Result<()> {
        self.add(LayerSpec::ReLU)
    }

    pub fn add_softmax_layer(&mut self) -> Result<()> {
        self.add(LayerSpec::SoftMax)
    }

    fn top_extent(&self) -> Extent {
        self.layers
            .output()
            .and_then(Layer::output_extent)
            .unwrap_or_default()
    }

    /// Injects `input` into the input layer.
    pub fn set_input(&mut self, input: &[f64]) -> Result<()> {
        match self.layers.input_mut() {
            Some(Layer::Input(layer)) => layer.set(input),
            _ => Err(Error::MissingInputLayer),
        }
    }

    /// Evaluates every layer from the input to the output, returning the
    /// output layer's values.
    pub fn forward_pass(&mut self) -> Vec<f64> {
        for i in self.layers.forward_indices() {
            let inputs = self.layers.upstream_outputs(i, &self.source);
            self.layers.layers[i].evaluate_all_units(&inputs, &mut self.source);
        }
        self.outputs()
    }

    /// Feeds the provided `input` through the network, returning the output
    /// layer.
    pub fn run(&mut self, input: &[f64]) -> Result<Vec<f64>> {
        self.set_input(input)?;
        Ok(self.forward_pass())
    }

    /// The output layer's values from the most recent forward pass.
    pub fn outputs(&self) -> Vec<f64> {
        self.layers
            .output()
            .map_or_else(Vec::new, |l| l.outputs(&self.source))
    }

    /// Runs one training step against `target` using the outputs of the last
    /// forward pass.
    pub fn backpropagate(&mut self, target: &[f64]) -> Result<StepReport> {
        self.backpropagate_with(target, &mut ())
    }

    /// Runs one training step, reporting the step's error statistics to
    /// `observer` before any parameter changes.
    pub fn backpropagate_with<O>(&mut self, target: &[f64], observer: &mut O) -> Result<StepReport>
    where
        O: TrainingObserver + ?Sized,
    {
        if self.layers.len() < 2 {
            return Err(Error::InvalidTopology {
                layers: self.layers.len(),
            });
        }
        let outputs = self.outputs();
        if target.len() != outputs.len() {
            return Err(Error::TargetSizeMismatch {
                expected: outputs.len(),
                found: target.len(),
            });
        }

        let report = self.stats.record(self.loss.total(target, &outputs));
        observer.on_step(&report);

        let mut backward = self.layers.backward_indices();
        if let Some(top) = backward.next() {
            let inputs = self.layers.upstream_outputs(top, &self.source);
            let gradient = self.layers.layers[top].backpropagate_target(
                target,
                self.loss,
                &inputs,
                &mut self.source,
                self.learning_rate,
            );
            self.layers.layers[top - 1].accumulate_deltas(&gradient, &mut self.source);
        }
        for i in backward {
            let inputs = self.layers.upstream_outputs(i, &self.source);
            let gradient =
                self.layers.layers[i].backpropagate(&inputs, &mut self.source, self.learning_rate);
            if i > 0 {
                self.layers.layers[i - 1].accumulate_deltas(&gradient, &mut self.source);
            }
        }

        let source = &mut self.source;
        for layer in self.layers.iter_mut() {
            layer.reset_deltas(source);
        }
        Ok(report)
    }

    /// Number of values in this network's genome.
    pub fn genome_len(&self) -> usize {
        self.source.parameter_count()
            + self
                .layers
                .forward_order()
                .map(|layer| layer.parameter_count())
                .sum::<usize>()
    }

    /// Flattens every trainable parameter into a single vector: all edge
    /// weights in generation order, then each convolution layer's filters
    /// and biases from the input to the output.
    pub fn get_genome(&self) -> Genome {
        let mut genome = Genome::with_capacity(self.genome_len());
        self.source.write_parameters(&mut genome);
        for layer in self.layers.forward_order() {
            layer.write_parameters(&mut genome);
        }
        genome
    }

    /// Overwrites every trainable parameter from `genome`, the inverse of
    /// `get_genome`. Nothing is written unless the length is exact.
    pub fn set_genome(&mut self, genome: &[f64]) -> Result<()> {
        let expected = self.genome_len();
        if genome.len() != expected {
            return Err(Error::GenomeLengthMismatch {
                expected,
                found: genome.len(),
            });
        }
        let mut rest = self.source.read_parameters(genome);
        for layer in self.layers.iter_mut() {
            rest = layer.read_parameters(rest);
        }
        debug_assert!(rest.is_empty());
        Ok(())
    }

    /// Builds an independent network with the same loss function, learning
    /// rate, topology and parameters.
    pub fn get_copy(&self) -> Result<Network> {
        let mut copy = Network::from_specs(self.loss, self.learning_rate, self.specs())?;
        copy.set_genome(&self.get_genome())?;
        Ok(copy)
    }

    /// Builds a network by replaying `specs` in order.
    pub fn from_specs<I>(loss: LossFunction, learning_rate: f64, specs: I) -> Result<Network>
    where
        I: IntoIterator<Item = LayerSpec>,
    {
        let mut network = Network::new(loss, learning_rate);
        for spec in specs {
            network.add(spec)?;
        }
        Ok(network)
    }
}

fn non_empty(size: usize, what: &str) -> Result<()> {
    if size == 0 {
        return Err(Error::InvalidGeometry(format!("{} needs at least one unit", what)));
    }
    Ok(())
}

fn matches_upstream(input: Extent, upstream: usize) -> Result<()> {
    if input.volume() != upstream {
        return Err(Error::ExtentMismatch {
            extent: input.volume(),
            upstream,
        });
    }
    Ok(())
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "Network ({} loss, learning rate {})",
            self.loss, self.learning_rate
        )?;
        for layer in self.layers.forward_order() {
            writeln!(f, "  {}", layer)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dense(sizes: &[usize]) -> Network {
        let mut network = Network::default();
        network.add_input_layer(sizes[0]).unwrap();
        for &size in &sizes[1..] {
            network
                .add_fully_connected_layer(size, Activator::Sigmoid, true)
                .unwrap();
        }
        network
    }

    #[test]
    fn first_layer_must_be_input() {
        let mut network = Network::default();
        assert!(matches!(
            network.add_relu_layer(),
            Err(Error::MissingInputLayer)
        ));
        network.add_input_layer(2).unwrap();
        assert!(matches!(
            network.add_input_layer(2),
            Err(Error::DuplicateInputLayer)
        ));
        assert_eq!(network.layer_count(), 1);
    }

    #[test]
    fn stack_orders() {
        let mut network = dense(&[3, 2]);
        network.add_softmax_layer().unwrap();
        let forward: Vec<LayerType> = network.layers().forward_order().map(Layer::layer_type).collect();
        let backward: Vec<LayerType> = network.layers().backward_order().map(Layer::layer_type).collect();
        assert_eq!(
            forward,
            vec![LayerType::Input, LayerType::FullyConnected, LayerType::SoftMax]
        );
        assert_eq!(
            backward,
            vec![LayerType::SoftMax, LayerType::FullyConnected, LayerType::Input]
        );
        assert_eq!(network.layers().output().map(Layer::layer_type), Some(LayerType::SoftMax));
        assert_eq!(network.output_len(), 2);
    }

    #[test]
    fn wrong_input_size() {
        let mut network = dense(&[2, 1]);
        assert!(matches!(
            network.set_input(&[1.0]),
            Err(Error::InputSizeMismatch {
                expected: 2,
                found: 1
            })
        ));
        assert!(Network::default().set_input(&[1.0]).is_err());
    }

    #[test]
    fn wrong_target_size() {
        let mut network = dense(&[2, 1]);
        network.run(&[0.0, 1.0]).unwrap();
        let before = network.get_genome();
        assert!(matches!(
            network.backpropagate(&[1.0, 0.0]),
            Err(Error::TargetSizeMismatch { .. })
        ));
        assert_eq!(network.get_genome(), before);
        assert_eq!(network.stats().examples_seen(), 0);
    }

    #[test]
    fn spatial_layers_must_match_upstream() {
        let mut network = dense(&[16]);
        assert!(matches!(
            network.add_convolution_layer(2, 3, 1, 1, (4, 3, 1)),
            Err(Error::ExtentMismatch { .. })
        ));
        let extent = network.add_convolution_layer(2, 3, 1, 1, (4, 4, 1)).unwrap();
        assert_eq!(extent, Extent::new(4, 4, 2));
        let extent = network.add_pooling_layer(2, extent).unwrap();
        assert_eq!(extent, Extent::new(2, 2, 2));
        assert_eq!(network.output_len(), 8);
    }

    #[test]
    fn genome_length_counts_every_parameter() {
        let mut network = dense(&[16]);
        let extent = network.add_convolution_layer(3, 2, 2, 0, (4, 4, 1)).unwrap();
        network.add_relu_layer().unwrap();
        network.add_pooling_layer(2, extent).unwrap();
        network
            .add_fully_connected_layer(2, Activator::TanH, false)
            .unwrap();
        // Edges: 2 units * (3 inputs + bias); convolution: 3 * (1*2*2) + 3.
        assert_eq!(network.source().edge_count(), 8);
        assert_eq!(network.genome_len(), 8 + 15);
        assert_eq!(network.get_genome().len(), network.genome_len());
    }

    #[test]
    fn rejects_wrong_genome_length() {
        let mut network = dense(&[2, 2]);
        let before = network.get_genome();
        let mut longer = before.clone();
        longer.push(1.0);
        assert!(matches!(
            network.set_genome(&longer),
            Err(Error::GenomeLengthMismatch { expected: 6, found: 7 })
        ));
        assert!(network.set_genome(&before[1..]).is_err());
        assert_eq!(network.get_genome(), before);
    }

    #[test]
    fn copy_keeps_hyperparameters() {
        let mut network = Network::new(LossFunction::Hinge, 0.25);
        network.add_input_layer(3).unwrap();
        network
            .add_fully_connected_layer(2, Activator::LeakyReLU(0.1), false)
            .unwrap();
        let copy = network.get_copy().unwrap();
        assert_eq!(copy.loss_function(), LossFunction::Hinge);
        assert_eq!(copy.learning_rate(), 0.25);
        assert_eq!(copy.specs(), network.specs());
    }

    #[test]
    fn displays_every_layer() {
        let mut network = dense(&[4, 2]);
        network.add_softmax_layer().unwrap();
        let text = network.to_string();
        assert!(text.contains("Input(4)"));
        assert!(text.contains("FullyConnected(2, Sigmoid, scaled)"));
        assert!(text.contains("SoftMax(2)"));
    }
}
