use crate::activator::Activator;
use crate::source::{NeuronId, NeuronSource, Synapse};

use rand::Rng;
use rand_distr::StandardNormal;
use std::ops::Range;

/// A fully connected layer of a neural network
///
/// The layer's units and weights live in the network's shared
/// `NeuronSource`. Every unit receives one edge from each upstream output and
/// one bias edge.
#[derive(Clone, Debug)]
pub struct DenseLayer {
    /// The activation function to be used for every neuron in the layer.
    activator: Activator,
    /// Whether initial weights are scaled down by the layer's fan-in.
    scaling: bool,
    /// Number of upstream outputs feeding each unit.
    input_len: usize,
    /// The layer's units in the source.
    neurons: Range<NeuronId>,
    /// The layer's incoming edges in the source.
    edges: Range<usize>,
}

impl DenseLayer {
    /// Initializes a new, untrained layer and registers it in `source`.
    ///
    /// Arguments:
    ///
    ///  * `size` - the number of units in this layer.
    ///  * `input_len` - the number of outputs of the upstream layer.
    ///  * `activator` - the activation function to be used for this layer's
    ///                  output.
    ///  * `scaling` - draw initial weights with a standard deviation of
    ///                `1 / sqrt(input_len)` rather than 1.
    pub fn new<R: Rng + ?Sized>(
        size: usize,
        input_len: usize,
        activator: Activator,
        scaling: bool,
        source: &mut NeuronSource,
        rng: &mut R,
    ) -> Self {
        let scale = if scaling {
            1.0 / (input_len.max(1) as f64).sqrt()
        } else {
            1.0
        };
        let neurons = source.generate_neurons(size);
        let first_edge = source.edge_count();
        for to in neurons.clone() {
            for i in 0..input_len {
                let w: f64 = rng.sample(StandardNormal);
                source.generate_edge(Synapse::Input(i), to, w * scale);
            }
            let b: f64 = rng.sample(StandardNormal);
            source.generate_edge(Synapse::Bias, to, b * scale);
        }
        DenseLayer {
            activator,
            scaling,
            input_len,
            neurons,
            edges: first_edge..source.edge_count(),
        }
    }

    /// Number of units in the layer.
    pub fn len(&self) -> usize {
        self.neurons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neurons.is_empty()
    }

    pub fn activator(&self) -> Activator {
        self.activator
    }

    pub fn scaling(&self) -> bool {
        self.scaling
    }

    pub fn input_len(&self) -> usize {
        self.input_len
    }

    pub fn neuron_ids(&self) -> Range<NeuronId> {
        self.neurons.clone()
    }

    pub fn edge_ids(&self) -> Range<usize> {
        self.edges.clone()
    }

    pub fn outputs(&self, source: &NeuronSource) -> Vec<f64> {
        source
            .neurons(self.neuron_ids())
            .iter()
            .map(|n| n.value)
            .collect()
    }

    pub fn evaluate(&self, inputs: &[f64], source: &mut NeuronSource) {
        assert_eq!(inputs.len(), self.input_len);
        let first = self.neurons.start;
        let mut sums = vec![0.0; self.len()];
        for edge in &source.edges()[self.edge_ids()] {
            sums[edge.to - first] += edge.weight * signal(edge.from, inputs);
        }
        for (neuron, sum) in source.neurons_mut(self.neuron_ids()).iter_mut().zip(sums) {
            neuron.value = self.activator.f(sum);
        }
    }

    /// Feeds the accumulated unit deltas backwards through the layer,
    /// updating every incoming weight.
    pub fn backpropagate(
        &self,
        inputs: &[f64],
        source: &mut NeuronSource,
        learning_rate: f64,
    ) -> Vec<f64> {
        assert_eq!(inputs.len(), self.input_len);
        let first = self.neurons.start;
        let (edges, neurons) = source.split_mut(self.edge_ids());
        let gradients: Vec<f64> = neurons[self.neuron_ids()]
            .iter()
            .map(|n| n.delta * self.activator.fprime(n.value))
            .collect();

        let mut input_deltas = vec![0.0; self.input_len];
        for edge in edges.iter_mut() {
            let g = gradients[edge.to - first];
            if let Synapse::Input(i) = edge.from {
                input_deltas[i] += g * edge.weight;
            }
            edge.weight -= learning_rate * g * signal(edge.from, inputs);
        }
        input_deltas
    }

    pub fn accumulate_deltas(&self, gradient: &[f64], source: &mut NeuronSource) {
        debug_assert_eq!(gradient.len(), self.len());
        for (neuron, g) in source.neurons_mut(self.neuron_ids()).iter_mut().zip(gradient) {
            neuron.delta += g;
        }
    }
}

/// The value an edge carries from `inputs`.
#[inline]
fn signal(from: Synapse, inputs: &[f64]) -> f64 {
    match from {
        Synapse::Input(i) => inputs[i],
        Synapse::Bias => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn layer(source: &mut NeuronSource) -> DenseLayer {
        let mut rng = StdRng::seed_from_u64(7);
        DenseLayer::new(2, 3, Activator::Identity, false, source, &mut rng)
    }

    #[test]
    fn registers_one_edge_per_input_plus_bias() {
        let mut source = NeuronSource::new();
        let l = layer(&mut source);
        assert_eq!(l.len(), 2);
        assert_eq!(source.neuron_count(), 2);
        assert_eq!(source.edge_count(), 2 * (3 + 1));
        assert_eq!(l.edge_ids(), 0..8);
    }

    #[test]
    fn evaluates_weighted_sums() {
        let mut source = NeuronSource::new();
        let l = layer(&mut source);
        for (i, edge) in source.edges_mut().iter_mut().enumerate() {
            edge.weight = i as f64;
        }
        l.evaluate(&[1.0, 2.0, 3.0], &mut source);
        // unit 0: 0*1 + 1*2 + 2*3 + 3 = 11, unit 1: 4*1 + 5*2 + 6*3 + 7 = 39
        assert_eq!(l.outputs(&source), vec![11.0, 39.0]);
    }

    #[test]
    fn backpropagate_moves_output_against_the_delta() {
        let mut source = NeuronSource::new();
        let l = layer(&mut source);
        let inputs = [0.5, -1.0, 2.0];
        l.evaluate(&inputs, &mut source);
        let before = l.outputs(&source);

        l.accumulate_deltas(&[1.0, -1.0], &mut source);
        let input_deltas = l.backpropagate(&inputs, &mut source, 0.01);
        assert_eq!(input_deltas.len(), 3);

        l.evaluate(&inputs, &mut source);
        let after = l.outputs(&source);
        assert!(after[0] < before[0]);
        assert!(after[1] > before[1]);
    }

    #[test]
    fn input_deltas_use_weights_before_the_update() {
        let mut source = NeuronSource::new();
        let mut rng = StdRng::seed_from_u64(1);
        let l = DenseLayer::new(1, 1, Activator::Identity, false, &mut source, &mut rng);
        source.edges_mut()[0].weight = 2.0;
        l.evaluate(&[1.0], &mut source);
        l.accumulate_deltas(&[3.0], &mut source);
        let input_deltas = l.backpropagate(&[1.0], &mut source, 0.5);
        assert_eq!(input_deltas, vec![6.0]);
        assert_eq!(source.edges()[0].weight, 2.0 - 0.5 * 3.0);
    }
}
