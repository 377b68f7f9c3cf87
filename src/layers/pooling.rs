use super::Extent;
use crate::error::{Error, Result};

use itertools::iproduct;

/// Max pooling over non-overlapping square windows.
///
/// The window and the stride are both the layer's tessellation. Rows and
/// columns left over at the far edges are dropped.
#[derive(Clone, Debug)]
pub struct PoolingLayer {
    tessellation: usize,
    input: Extent,
    output: Extent,
    outputs: Vec<f64>,
    deltas: Vec<f64>,
    /// Input offset that won each output's window in the last forward pass.
    winners: Vec<usize>,
}

impl PoolingLayer {
    pub fn new(tessellation: usize, input: Extent) -> Result<Self> {
        let output = output_extent(tessellation, input)?;
        Ok(PoolingLayer {
            tessellation,
            input,
            output,
            outputs: vec![0.0; output.volume()],
            deltas: vec![0.0; output.volume()],
            winners: vec![0; output.volume()],
        })
    }

    pub fn tessellation(&self) -> usize {
        self.tessellation
    }

    pub fn input_extent(&self) -> Extent {
        self.input
    }

    pub fn output_extent(&self) -> Extent {
        self.output
    }

    pub fn outputs(&self) -> &[f64] {
        &self.outputs
    }

    pub fn deltas_mut(&mut self) -> &mut [f64] {
        &mut self.deltas
    }

    pub fn evaluate(&mut self, inputs: &[f64]) {
        assert_eq!(inputs.len(), self.input.volume());
        let (out, t) = (self.output, self.tessellation);
        for (z, oy, ox) in iproduct!(0..out.depth, 0..out.height, 0..out.width) {
            let mut best = self.input.index(ox * t, oy * t, z);
            for (dy, dx) in iproduct!(0..t, 0..t) {
                let i = self.input.index(ox * t + dx, oy * t + dy, z);
                if inputs[i] > inputs[best] {
                    best = i;
                }
            }
            let o = out.index(ox, oy, z);
            self.outputs[o] = inputs[best];
            self.winners[o] = best;
        }
    }

    /// Routes each delta to the input that won its window.
    pub fn backpropagate(&self) -> Vec<f64> {
        let mut input_deltas = vec![0.0; self.input.volume()];
        for (&winner, &delta) in self.winners.iter().zip(&self.deltas) {
            input_deltas[winner] += delta;
        }
        input_deltas
    }
}

pub(crate) fn output_extent(tessellation: usize, input: Extent) -> Result<Extent> {
    if tessellation == 0
        || input.depth == 0
        || tessellation > input.width
        || tessellation > input.height
    {
        return Err(Error::InvalidGeometry(format!(
            "pooling window {} does not fit {}",
            tessellation, input
        )));
    }
    Ok(Extent::new(
        input.width / tessellation,
        input.height / tessellation,
        input.depth,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_the_maximum_of_each_window() {
        let mut layer = PoolingLayer::new(2, Extent::new(4, 2, 1)).unwrap();
        assert_eq!(layer.output_extent(), Extent::new(2, 1, 1));
        layer.evaluate(&[1.0, 3.0, -1.0, -2.0, 2.0, 0.0, -4.0, -3.0]);
        assert_eq!(layer.outputs(), &[3.0, -1.0]);

        layer.deltas_mut().copy_from_slice(&[0.5, 2.0]);
        assert_eq!(
            layer.backpropagate(),
            vec![0.0, 0.5, 2.0, 0.0, 0.0, 0.0, 0.0, 0.0]
        );
    }

    #[test]
    fn drops_leftover_edges() {
        let layer = PoolingLayer::new(2, Extent::new(5, 5, 3)).unwrap();
        assert_eq!(layer.output_extent(), Extent::new(2, 2, 3));
        assert!(PoolingLayer::new(6, Extent::new(5, 5, 1)).is_err());
        assert!(PoolingLayer::new(0, Extent::new(5, 5, 1)).is_err());
    }
}
