//! Flattening of trainable parameters into a single vector.

use crate::source::NeuronSource;

/// Every trainable parameter of a network, flattened into one vector.
///
/// The layout is every edge weight of the network's `NeuronSource` in
/// generation order, followed by the private parameters of each layer in
/// feed-forward order.
pub type Genome = Vec<f64>;

/// Something that owns trainable parameters and can enumerate them in a
/// fixed order.
///
/// `write_parameters` and `read_parameters` must visit values in exactly the
/// same order, and that order must not change while the topology is fixed.
pub trait ParameterProvider {
    /// Number of values this provider contributes to a genome.
    fn parameter_count(&self) -> usize;

    /// Appends every parameter to `genome`.
    fn write_parameters(&self, genome: &mut Genome);

    /// Overwrites every parameter from the front of `genome`, returning the
    /// unread remainder.
    ///
    /// Callers guarantee `genome` holds at least `parameter_count()` values.
    fn read_parameters<'a>(&mut self, genome: &'a [f64]) -> &'a [f64];
}

impl ParameterProvider for NeuronSource {
    fn parameter_count(&self) -> usize {
        self.edge_count()
    }

    fn write_parameters(&self, genome: &mut Genome) {
        genome.extend(self.edges().iter().map(|e| e.weight));
    }

    fn read_parameters<'a>(&mut self, genome: &'a [f64]) -> &'a [f64] {
        let (values, rest) = genome.split_at(self.edge_count());
        for (edge, &value) in self.edges_mut().iter_mut().zip(values) {
            edge.weight = value;
        }
        rest
    }
}
