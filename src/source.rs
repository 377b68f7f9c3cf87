//! The shared parameter store backing fully connected layers.
//!
//! A `NeuronSource` hands out neurons with stable, sequential identifiers
//! and the weighted edges feeding them. Edges are kept in the order they
//! were generated, which is the order the genome codec reads and writes
//! them in.

use rayon::prelude::*;
use std::ops::Range;

/// Stable identifier of a neuron in a `NeuronSource`.
pub type NeuronId = usize;

/// A single computation unit.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Neuron {
    /// The activated output from the most recent forward pass.
    pub value: f64,
    /// Error signal `d loss / d value` accumulated during a backward pass.
    pub delta: f64,
}

impl Neuron {
    pub fn reset_delta(&mut self) {
        self.delta = 0.0;
    }
}

/// Where an edge takes its input from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Synapse {
    /// The given output slot of the upstream layer.
    Input(usize),
    /// A constant input of 1.0.
    Bias,
}

/// A weighted connection into a neuron.
#[derive(Clone, Debug, PartialEq)]
pub struct Edge {
    pub from: Synapse,
    pub to: NeuronId,
    pub weight: f64,
}

/// Generates and owns every neuron and edge of a network.
#[derive(Clone, Debug, Default)]
pub struct NeuronSource {
    neurons: Vec<Neuron>,
    edges: Vec<Edge>,
}

impl NeuronSource {
    pub fn new() -> Self {
        NeuronSource::default()
    }

    /// Generates `count` fresh neurons and returns their identifiers.
    pub fn generate_neurons(&mut self, count: usize) -> Range<NeuronId> {
        let start = self.neurons.len();
        self.neurons.resize_with(start + count, Neuron::default);
        start..self.neurons.len()
    }

    /// Generates an edge into neuron `to` and returns its index.
    pub fn generate_edge(&mut self, from: Synapse, to: NeuronId, weight: f64) -> usize {
        debug_assert!(to < self.neurons.len());
        self.edges.push(Edge { from, to, weight });
        self.edges.len() - 1
    }

    /// Looks up a neuron by its identifier.
    pub fn neuron(&self, id: NeuronId) -> Option<&Neuron> {
        self.neurons.get(id)
    }

    pub fn neuron_mut(&mut self, id: NeuronId) -> Option<&mut Neuron> {
        self.neurons.get_mut(id)
    }

    pub fn neurons(&self, ids: Range<NeuronId>) -> &[Neuron] {
        &self.neurons[ids]
    }

    pub fn neurons_mut(&mut self, ids: Range<NeuronId>) -> &mut [Neuron] {
        &mut self.neurons[ids]
    }

    pub fn neuron_count(&self) -> usize {
        self.neurons.len()
    }

    /// All edges, in generation order.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edges_mut(&mut self) -> &mut [Edge] {
        &mut self.edges
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Splits the store into the given edges and every neuron, so a layer can
    /// update weights while reading and writing unit state.
    pub fn split_mut(&mut self, edges: Range<usize>) -> (&mut [Edge], &mut [Neuron]) {
        (&mut self.edges[edges], &mut self.neurons)
    }

    /// Clears the delta of the given neurons in parallel.
    pub fn reset_deltas(&mut self, ids: Range<NeuronId>) {
        self.neurons[ids].par_iter_mut().for_each(Neuron::reset_delta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_sequential() {
        let mut source = NeuronSource::new();
        assert_eq!(source.generate_neurons(3), 0..3);
        assert_eq!(source.generate_neurons(2), 3..5);
        assert_eq!(source.neuron_count(), 5);
        assert!(source.neuron(4).is_some());
        assert!(source.neuron(5).is_none());
    }

    #[test]
    fn edges_keep_generation_order() {
        let mut source = NeuronSource::new();
        let ids = source.generate_neurons(2);
        source.generate_edge(Synapse::Input(0), ids.start, 0.5);
        source.generate_edge(Synapse::Bias, ids.start + 1, -1.0);
        let weights: Vec<f64> = source.edges().iter().map(|e| e.weight).collect();
        assert_eq!(weights, vec![0.5, -1.0]);
        assert_eq!(source.edges()[1].from, Synapse::Bias);
    }

    #[test]
    fn reset_only_touches_requested_neurons() {
        let mut source = NeuronSource::new();
        source.generate_neurons(4);
        for id in 0..4 {
            source.neuron_mut(id).unwrap().delta = 1.0;
        }
        source.reset_deltas(1..3);
        let deltas: Vec<f64> = source.neurons(0..4).iter().map(|n| n.delta).collect();
        assert_eq!(deltas, vec![1.0, 0.0, 0.0, 1.0]);
    }
}
