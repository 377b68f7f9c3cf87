use itertools::izip;

/// Normalizes the upstream layer's values into a probability distribution.
#[derive(Clone, Debug)]
pub struct SoftMaxLayer {
    outputs: Vec<f64>,
    deltas: Vec<f64>,
}

impl SoftMaxLayer {
    pub fn new(size: usize) -> Self {
        SoftMaxLayer {
            outputs: vec![0.0; size],
            deltas: vec![0.0; size],
        }
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    pub fn outputs(&self) -> &[f64] {
        &self.outputs
    }

    pub fn deltas_mut(&mut self) -> &mut [f64] {
        &mut self.deltas
    }

    pub fn evaluate(&mut self, inputs: &[f64]) {
        assert_eq!(inputs.len(), self.len());
        let max = inputs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let mut total = 0.0;
        for (y, &x) in self.outputs.iter_mut().zip(inputs) {
            *y = (x - max).exp();
            total += *y;
        }
        for y in &mut self.outputs {
            *y /= total;
        }
    }

    /// Applies the softmax Jacobian to the accumulated deltas.
    pub fn backpropagate(&self) -> Vec<f64> {
        let dot: f64 = izip!(&self.outputs, &self.deltas).map(|(y, d)| y * d).sum();
        izip!(&self.outputs, &self.deltas)
            .map(|(y, d)| y * (d - dot))
            .collect()
    }
}
