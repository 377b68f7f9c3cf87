use rand::distributions::Distribution;
use rand::Rng;
use std::ops::{Index, IndexMut};

/// A dense three dimensional block of values, indexed `(depth, row, column)`.
///
/// Values are stored depth-major, so iterating the backing slice visits
/// depth, then row, then column.
#[derive(Clone, Debug, PartialEq)]
pub struct Volume {
    depth: usize,
    height: usize,
    width: usize,
    data: Vec<f64>,
}

impl Volume {
    pub fn zeros(depth: usize, height: usize, width: usize) -> Self {
        Volume {
            depth,
            height,
            width,
            data: vec![0.0; depth * height * width],
        }
    }

    pub fn random<D, R>(distribution: &D, rng: &mut R, depth: usize, height: usize, width: usize) -> Self
    where
        D: Distribution<f64>,
        R: Rng + ?Sized,
    {
        let data = (0..depth * height * width)
            .map(|_| distribution.sample(rng))
            .collect();
        Volume {
            depth,
            height,
            width,
            data,
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Total number of values.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    fn offset(&self, (d, h, w): (usize, usize, usize)) -> usize {
        debug_assert!(d < self.depth && h < self.height && w < self.width);
        (d * self.height + h) * self.width + w
    }
}

impl Index<(usize, usize, usize)> for Volume {
    type Output = f64;

    fn index(&self, at: (usize, usize, usize)) -> &f64 {
        &self.data[self.offset(at)]
    }
}

impl IndexMut<(usize, usize, usize)> for Volume {
    fn index_mut(&mut self, at: (usize, usize, usize)) -> &mut f64 {
        let i = self.offset(at);
        &mut self.data[i]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::Uniform;

    #[test]
    fn storage_is_depth_major() {
        let mut v = Volume::zeros(2, 2, 3);
        v[(1, 0, 2)] = 7.0;
        assert_eq!(v.as_slice()[(1 * 2 + 0) * 3 + 2], 7.0);
        assert_eq!(v.len(), 12);
    }

    #[test]
    fn random_fills_every_value() {
        let mut rng = StdRng::seed_from_u64(3);
        let v = Volume::random(&Uniform::new(1.0, 2.0), &mut rng, 1, 2, 2);
        assert_eq!(v.len(), 4);
        assert!(v.as_slice().iter().all(|&x| x >= 1.0 && x < 2.0));
    }
}
