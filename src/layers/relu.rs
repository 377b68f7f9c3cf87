use itertools::izip;

/// Rectifies every value of the upstream layer.
#[derive(Clone, Debug)]
pub struct ReLULayer {
    outputs: Vec<f64>,
    deltas: Vec<f64>,
}

impl ReLULayer {
    pub fn new(size: usize) -> Self {
        ReLULayer {
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
        for (y, &x) in self.outputs.iter_mut().zip(inputs) {
            *y = x.max(0.0);
        }
    }

    pub fn backpropagate(&self, inputs: &[f64]) -> Vec<f64> {
        izip!(inputs, &self.deltas)
            .map(|(&x, &d)| if x > 0.0 { d } else { 0.0 })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_gradient_only_where_active() {
        let mut layer = ReLULayer::new(3);
        let inputs = [-1.0, 0.0, 2.0];
        layer.evaluate(&inputs);
        assert_eq!(layer.outputs(), &[0.0, 0.0, 2.0]);
        layer.deltas_mut().copy_from_slice(&[5.0, 5.0, 5.0]);
        assert_eq!(layer.backpropagate(&inputs), vec![0.0, 0.0, 5.0]);
    }
}
