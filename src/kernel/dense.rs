//! Kernel matrix over dense feature vectors.
use ndarray::ArrayView2;

use super::{Kernel, KernelFunction};
use crate::error::{Result, SvmError};

/// A kernel matrix defined by borrowed feature vectors and a [`KernelFunction`].
///
/// The struct holds views into caller-owned data; the referenced samples
/// must stay untouched for the lifetime of the kernel and of any model
/// borrowing the same data.
pub struct DenseKernel<'a> {
    data: Vec<&'a [f64]>,
    function: KernelFunction,
    diag: Vec<f64>,
}

impl<'a> DenseKernel<'a> {
    /// Creates a kernel matrix for the given samples.
    pub fn new(data: Vec<&'a [f64]>, function: KernelFunction) -> Self {
        let diag = data.iter().map(|xi| function.evaluate(xi, xi)).collect();
        DenseKernel {
            data,
            function,
            diag,
        }
    }
}

/// Collects the rows of a standard-layout array view into slices.
pub fn rows_of<'a>(data: &'a ArrayView2<'a, f64>) -> Result<Vec<&'a [f64]>> {
    data.outer_iter()
        .map(|row| {
            row.to_slice().ok_or_else(|| {
                SvmError::DataMismatch("sample matrix is not in standard layout".to_string())
            })
        })
        .collect()
}

impl Kernel for DenseKernel<'_> {
    fn compute_row(&self, i: usize, ki: &mut [f64], active_set: &[usize]) {
        let n = self.data.len();
        let xi = self.data[i % n];
        for (idx_j, &j) in active_set.iter().enumerate() {
            ki[idx_j] = self.function.evaluate(xi, self.data[j % n]);
        }
    }

    fn diag(&self, i: usize) -> f64 {
        self.diag[i % self.data.len()]
    }

    fn size(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_compute_row() {
        let x0 = [0.0, 0.0];
        let x1 = [1.0, 0.0];
        let x2 = [1.0, 1.0];
        let kernel = DenseKernel::new(vec![&x0, &x1, &x2], KernelFunction::linear());
        let active: Vec<usize> = (0..3).collect();
        let mut row = vec![0.0; 3];
        kernel.compute_row(2, &mut row, &active);
        assert_abs_diff_eq!(row[0], 0.0);
        assert_abs_diff_eq!(row[1], 1.0);
        assert_abs_diff_eq!(row[2], 2.0);
        assert_abs_diff_eq!(kernel.diag(2), 2.0);
    }

    #[test]
    fn test_doubled_indexing() {
        // regression problems address 2n variables over n samples
        let x0 = [1.0];
        let x1 = [2.0];
        let kernel = DenseKernel::new(vec![&x0, &x1], KernelFunction::linear());
        let active = vec![0, 1, 2, 3];
        let mut row = vec![0.0; 4];
        kernel.compute_row(3, &mut row, &active);
        assert_abs_diff_eq!(row[0], 2.0);
        assert_abs_diff_eq!(row[2], 2.0);
        assert_abs_diff_eq!(row[3], 4.0);
        assert_abs_diff_eq!(kernel.diag(3), 4.0);
    }
}
