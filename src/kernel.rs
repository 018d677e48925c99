//! Kernel matrix abstraction and implementations.
pub mod function;
pub use function::KernelFunction;
pub mod dense;
pub use dense::DenseKernel;
pub mod precomputed;
pub use precomputed::PrecomputedKernel;
pub mod cached;
pub use cached::CachedKernel;

/// Row-oriented access to a (possibly implicit) kernel matrix.
///
/// Training problems with doubled variable vectors (regression) address
/// rows modulo [`Kernel::size`], so implementations map an index `i` to
/// the sample `i % size()`.
pub trait Kernel {
    /// Computes the row `i` of the kernel matrix restricted to the columns in `active_set`.
    fn compute_row(&self, i: usize, ki: &mut [f64], active_set: &[usize]);
    /// Returns the diagonal entry `K(i, i)`.
    fn diag(&self, i: usize) -> f64;
    /// Returns the number of distinct samples behind the matrix.
    fn size(&self) -> usize;

    /// Restricts retained row data to the columns surviving in `new`.
    fn restrict_active(&mut self, _old: &[usize], _new: &[usize]) {}
    /// Replaces the set of relevant columns; retained row data is dropped.
    fn set_active(&mut self, _old: &[usize], _new: &[usize]) {}

    /// Makes the rows `idxs` (restricted to `active_set`) available to `fun`.
    fn use_rows(&mut self, idxs: &[usize], active_set: &[usize], fun: &mut dyn FnMut(Vec<&[f64]>)) {
        let mut kidxs = Vec::with_capacity(idxs.len());
        let active_size = active_set.len();
        for &idx in idxs.iter() {
            let mut kidx = vec![0.0; active_size];
            self.compute_row(idx, &mut kidx, active_set);
            kidxs.push(kidx);
        }
        fun(kidxs.iter().map(|ki| ki.as_slice()).collect());
    }
}
