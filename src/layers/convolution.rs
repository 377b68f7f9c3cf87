use super::Extent;
use crate::error::{Error, Result};
use crate::genome::{Genome, ParameterProvider};
use crate::volume::Volume;

use itertools::iproduct;
use rand::Rng;
use rand_distr::Normal;

/// A convolution layer over a spatial input.
///
/// Unlike fully connected layers, the filters and biases are owned by the
/// layer itself rather than the network's `NeuronSource`.
#[derive(Clone, Debug)]
pub struct ConvolutionLayer {
    filter_size: usize,
    stride: usize,
    padding: usize,
    input: Extent,
    output: Extent,
    /// One `(depth, filter_size, filter_size)` volume per filter.
    filters: Vec<Volume>,
    biases: Vec<f64>,
    outputs: Vec<f64>,
    deltas: Vec<f64>,
}

impl ConvolutionLayer {
    /// Initializes a new, untrained convolution layer.
    ///
    /// Arguments:
    ///
    ///  * `filters` - the number of filters, which is the output depth.
    ///  * `filter_size` - the width and height of each filter.
    ///  * `stride` - the step between filter positions.
    ///  * `padding` - zeros added on every side of the input.
    ///  * `input` - the extent of the upstream signal.
    ///
    /// Fails if the filters do not tile the padded input exactly.
    pub fn new<R: Rng + ?Sized>(
        filters: usize,
        filter_size: usize,
        stride: usize,
        padding: usize,
        input: Extent,
        rng: &mut R,
    ) -> Result<Self> {
        let output = output_extent(filters, filter_size, stride, padding, input)?;
        let fan_in = (filter_size * filter_size * input.depth) as f64;
        let distribution = Normal::new(0.0, 1.0 / fan_in.sqrt())
            .map_err(|e| Error::InvalidGeometry(e.to_string()))?;
        let filters = (0..filters)
            .map(|_| Volume::random(&distribution, rng, input.depth, filter_size, filter_size))
            .collect();
        Ok(ConvolutionLayer {
            filter_size,
            stride,
            padding,
            input,
            output,
            filters,
            biases: vec![0.0; output.depth],
            outputs: vec![0.0; output.volume()],
            deltas: vec![0.0; output.volume()],
        })
    }

    pub fn filter_count(&self) -> usize {
        self.filters.len()
    }

    pub fn filter_size(&self) -> usize {
        self.filter_size
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn padding(&self) -> usize {
        self.padding
    }

    pub fn input_extent(&self) -> Extent {
        self.input
    }

    pub fn output_extent(&self) -> Extent {
        self.output
    }

    pub fn filters(&self) -> &[Volume] {
        &self.filters
    }

    pub fn biases(&self) -> &[f64] {
        &self.biases
    }

    pub fn outputs(&self) -> &[f64] {
        &self.outputs
    }

    pub fn deltas_mut(&mut self) -> &mut [f64] {
        &mut self.deltas
    }

    /// Offset into the input of filter tap `(fx, fy, z)` at output position
    /// `(ox, oy)`, or `None` if the tap falls on padding.
    fn tap(&self, ox: usize, oy: usize, fx: usize, fy: usize, z: usize) -> Option<usize> {
        let x = (ox * self.stride + fx).checked_sub(self.padding)?;
        let y = (oy * self.stride + fy).checked_sub(self.padding)?;
        if x < self.input.width && y < self.input.height {
            Some(self.input.index(x, y, z))
        } else {
            None
        }
    }

    pub fn evaluate(&mut self, inputs: &[f64]) {
        assert_eq!(inputs.len(), self.input.volume());
        let (out, f) = (self.output, self.filter_size);
        for (k, oy, ox) in iproduct!(0..out.depth, 0..out.height, 0..out.width) {
            let filter = &self.filters[k];
            let mut sum = self.biases[k];
            for (z, fy, fx) in iproduct!(0..self.input.depth, 0..f, 0..f) {
                if let Some(i) = self.tap(ox, oy, fx, fy, z) {
                    sum += filter[(z, fy, fx)] * inputs[i];
                }
            }
            self.outputs[out.index(ox, oy, k)] = sum;
        }
    }

    /// Feeds the accumulated deltas back through the filters, updating
    /// filters and biases.
    pub fn backpropagate(&mut self, inputs: &[f64], learning_rate: f64) -> Vec<f64> {
        assert_eq!(inputs.len(), self.input.volume());
        let (out, f, depth) = (self.output, self.filter_size, self.input.depth);
        let mut input_deltas = vec![0.0; self.input.volume()];
        for k in 0..out.depth {
            let mut filter_gradient = Volume::zeros(depth, f, f);
            let mut bias_gradient = 0.0;
            for (oy, ox) in iproduct!(0..out.height, 0..out.width) {
                let g = self.deltas[out.index(ox, oy, k)];
                if g == 0.0 {
                    continue;
                }
                bias_gradient += g;
                for (z, fy, fx) in iproduct!(0..depth, 0..f, 0..f) {
                    if let Some(i) = self.tap(ox, oy, fx, fy, z) {
                        input_deltas[i] += g * self.filters[k][(z, fy, fx)];
                        filter_gradient[(z, fy, fx)] += g * inputs[i];
                    }
                }
            }
            for (w, dw) in self.filters[k]
                .as_mut_slice()
                .iter_mut()
                .zip(filter_gradient.as_slice())
            {
                *w -= learning_rate * dw;
            }
            self.biases[k] -= learning_rate * bias_gradient;
        }
        input_deltas
    }
}

/// Filters in order, each visited depth, row, column; then every bias.
impl ParameterProvider for ConvolutionLayer {
    fn parameter_count(&self) -> usize {
        self.filters.iter().map(Volume::len).sum::<usize>() + self.biases.len()
    }

    fn write_parameters(&self, genome: &mut Genome) {
        for filter in &self.filters {
            genome.extend_from_slice(filter.as_slice());
        }
        genome.extend_from_slice(&self.biases);
    }

    fn read_parameters<'a>(&mut self, mut genome: &'a [f64]) -> &'a [f64] {
        for filter in &mut self.filters {
            let (values, rest) = genome.split_at(filter.len());
            filter.as_mut_slice().copy_from_slice(values);
            genome = rest;
        }
        let (values, rest) = genome.split_at(self.biases.len());
        self.biases.copy_from_slice(values);
        rest
    }
}

/// Computes the output extent of a convolution, validating its geometry.
pub(crate) fn output_extent(
    filters: usize,
    filter_size: usize,
    stride: usize,
    padding: usize,
    input: Extent,
) -> Result<Extent> {
    if filters == 0 || filter_size == 0 || stride == 0 || input.volume() == 0 {
        return Err(Error::InvalidGeometry(format!(
            "{} filters of size {} with stride {} over {}",
            filters, filter_size, stride, input
        )));
    }
    let span = |extent: usize| -> Result<usize> {
        let padded = extent + 2 * padding;
        if padded < filter_size || (padded - filter_size) % stride != 0 {
            return Err(Error::InvalidGeometry(format!(
                "filter of size {} with stride {} does not tile {} (padding {})",
                filter_size, stride, extent, padding
            )));
        }
        Ok((padded - filter_size) / stride + 1)
    };
    Ok(Extent::new(span(input.width)?, span(input.height)?, filters))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn layer(filters: usize, size: usize, stride: usize, padding: usize, input: Extent) -> ConvolutionLayer {
        let mut rng = StdRng::seed_from_u64(11);
        ConvolutionLayer::new(filters, size, stride, padding, input, &mut rng).unwrap()
    }

    #[test]
    fn computes_output_extent() {
        let l = layer(4, 3, 1, 1, Extent::new(5, 5, 2));
        assert_eq!(l.output_extent(), Extent::new(5, 5, 4));
        let l = layer(2, 2, 2, 0, Extent::new(4, 6, 1));
        assert_eq!(l.output_extent(), Extent::new(2, 3, 2));
    }

    #[test]
    fn rejects_uneven_geometry() {
        let mut rng = StdRng::seed_from_u64(0);
        let result = ConvolutionLayer::new(1, 2, 2, 0, Extent::new(5, 5, 1), &mut rng);
        assert!(matches!(result, Err(Error::InvalidGeometry(_))));
        let result = ConvolutionLayer::new(1, 4, 1, 0, Extent::new(3, 3, 1), &mut rng);
        assert!(matches!(result, Err(Error::InvalidGeometry(_))));
    }

    #[test]
    fn convolves_with_padding() {
        let mut l = layer(1, 3, 1, 1, Extent::new(3, 3, 1));
        let ones = vec![1.0; 9 + 1];
        l.read_parameters(&ones);
        l.evaluate(&[1.0; 9]);
        // Corners see 4 taps, edges 6, the centre 9; plus the bias.
        assert_eq!(l.outputs()[0], 5.0);
        assert_eq!(l.outputs()[1], 7.0);
        assert_eq!(l.outputs()[4], 10.0);
    }

    #[test]
    fn parameters_are_filters_then_biases() {
        let mut l = layer(2, 2, 1, 0, Extent::new(2, 2, 3));
        assert_eq!(l.parameter_count(), 2 * 3 * 2 * 2 + 2);
        let values: Vec<f64> = (0..l.parameter_count()).map(|v| v as f64).collect();
        assert!(l.read_parameters(&values).is_empty());
        assert_eq!(l.filters()[0][(0, 0, 0)], 0.0);
        assert_eq!(l.filters()[0][(1, 0, 1)], 5.0);
        assert_eq!(l.filters()[1][(0, 0, 0)], 12.0);
        assert_eq!(l.biases(), &[24.0, 25.0]);

        let mut genome = Genome::new();
        l.write_parameters(&mut genome);
        assert_eq!(genome, values);
    }

    #[test]
    fn backpropagate_reduces_a_single_output() {
        let mut l = layer(1, 2, 1, 0, Extent::new(2, 2, 1));
        let inputs = [0.5, -0.25, 1.0, 0.75];
        l.evaluate(&inputs);
        let before = l.outputs()[0];
        l.deltas_mut()[0] = 1.0;
        let input_deltas = l.backpropagate(&inputs, 0.1);
        assert_eq!(input_deltas.len(), 4);
        l.evaluate(&inputs);
        assert!(l.outputs()[0] < before);
    }
}
