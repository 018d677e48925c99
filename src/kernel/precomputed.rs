use ndarray::ArrayView2;

use super::Kernel;
use crate::error::{Result, SvmError};

/// A kernel matrix supplied by the caller as a precomputed Gram matrix.
///
/// Only a view is kept; the caller owns the matrix and must keep it
/// unchanged while the kernel (or a model referring to the training
/// indices) is in use.
pub struct PrecomputedKernel<'a> {
    gram: ArrayView2<'a, f64>,
}

impl<'a> PrecomputedKernel<'a> {
    /// Wraps a square Gram matrix.
    pub fn new(gram: ArrayView2<'a, f64>) -> Result<Self> {
        if gram.nrows() != gram.ncols() {
            return Err(SvmError::DataMismatch(format!(
                "precomputed kernel matrix must be square, got {}x{}",
                gram.nrows(),
                gram.ncols()
            )));
        }
        Ok(PrecomputedKernel { gram })
    }
}

impl Kernel for PrecomputedKernel<'_> {
    fn compute_row(&self, i: usize, ki: &mut [f64], active_set: &[usize]) {
        let n = self.size();
        for (idx_j, &j) in active_set.iter().enumerate() {
            ki[idx_j] = self.gram[(i % n, j % n)];
        }
    }

    fn diag(&self, i: usize) -> f64 {
        let n = self.size();
        self.gram[(i % n, i % n)]
    }

    fn size(&self) -> usize {
        self.gram.nrows()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_lookup() {
        let gram = array![[1.0, 2.0], [2.0, 5.0]];
        let kernel = PrecomputedKernel::new(gram.view()).unwrap();
        let active = vec![0, 1];
        let mut row = vec![0.0; 2];
        kernel.compute_row(1, &mut row, &active);
        assert_abs_diff_eq!(row[0], 2.0);
        assert_abs_diff_eq!(row[1], 5.0);
        assert_abs_diff_eq!(kernel.diag(0), 1.0);
    }

    #[test]
    fn test_rejects_non_square() {
        let gram = ndarray::Array2::<f64>::zeros((2, 3));
        assert!(PrecomputedKernel::new(gram.view()).is_err());
    }
}
