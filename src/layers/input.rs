use crate::error::{Error, Result};

/// The bottom of every network: holds the most recently injected input.
#[derive(Clone, Debug)]
pub struct InputLayer {
    values: Vec<f64>,
}

impl InputLayer {
    pub fn new(size: usize) -> Self {
        InputLayer {
            values: vec![0.0; size],
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Replaces the held input. Fails without touching the layer if `input`
    /// is not exactly the layer's size.
    pub fn set(&mut self, input: &[f64]) -> Result<()> {
        if input.len() != self.values.len() {
            return Err(Error::InputSizeMismatch {
                expected: self.values.len(),
                found: input.len(),
            });
        }
        self.values.copy_from_slice(input);
        Ok(())
    }

    pub fn outputs(&self) -> &[f64] {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_sized_input() {
        let mut layer = InputLayer::new(2);
        layer.set(&[1.0, 2.0]).unwrap();
        assert!(matches!(
            layer.set(&[1.0, 2.0, 3.0]),
            Err(Error::InputSizeMismatch {
                expected: 2,
                found: 3
            })
        ));
        assert_eq!(layer.outputs(), &[1.0, 2.0]);
    }
}
