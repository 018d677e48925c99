use caches::{Cache, RawLRU};

use super::Kernel;

/// Default cache budget (bytes) used when none is configured.
pub const DEFAULT_CACHE_BYTES: usize = 200 * 1024 * 1024;

/// A struct to cache rows of a kernel matrix.
///
/// Rows are stored restricted to the current active set and evicted in
/// least-recently-used order once the configured slot count is reached.
/// Row indices are normalized modulo [`Kernel::size`], so the doubled
/// variable blocks of the regression problems share cache slots.
pub struct CachedKernel<'a, K>
where
    K: Kernel,
{
    cache: RawLRU<usize, usize>,
    data: Vec<Vec<f64>>,
    base: &'a K,
}

impl<K> CachedKernel<'_, K>
where
    K: Kernel,
{
    /// Generates a cached version of the given kernel matrix with a fixed number of row slots.
    pub fn from(base: &K, capacity: usize) -> CachedKernel<'_, K> {
        CachedKernel {
            cache: RawLRU::new(capacity.max(2)).unwrap(),
            data: Vec::new(),
            base,
        }
    }

    /// Generates a cached version of the given kernel matrix honoring a byte budget.
    ///
    /// One slot holds a full row of `base.size()` values. At least two
    /// slots are kept so that a working-set pair always fits.
    pub fn with_budget(base: &K, budget_bytes: usize) -> CachedKernel<'_, K> {
        let row_bytes = std::mem::size_of::<f64>() * base.size().max(1);
        Self::from(base, budget_bytes / row_bytes)
    }
}

fn find_common<T>(a: &[T], b: &[T]) -> Vec<usize>
where
    T: PartialEq,
{
    let mut res = Vec::new();
    if b.is_empty() {
        return res;
    }
    let mut it: usize = 0;
    for (idx, i) in a.iter().enumerate() {
        if i == &b[it] {
            it += 1;
            res.push(idx);
            if it >= b.len() {
                break;
            }
        }
    }
    res
}

impl<K> super::Kernel for CachedKernel<'_, K>
where
    K: Kernel,
{
    fn compute_row(&self, i: usize, ki: &mut [f64], active_set: &[usize]) {
        self.base.compute_row(i, ki, active_set);
    }

    fn size(&self) -> usize {
        self.base.size()
    }

    fn use_rows(&mut self, idxs: &[usize], active_set: &[usize], fun: &mut dyn FnMut(Vec<&[f64]>)) {
        let poss: Vec<_> = idxs
            .iter()
            .map(|&idx| {
                let key = idx % self.base.size();
                match self.cache.get(&key) {
                    Some(&pos) => pos,
                    None => {
                        let size = self.cache.cap();
                        let pos = if self.data.len() < size {
                            let ki: Vec<f64> = vec![0.0; active_set.len()];
                            let pos = self.data.len();
                            self.data.push(ki);
                            pos
                        } else {
                            let (_key, pos) = self.cache.remove_lru().unwrap();
                            pos
                        };
                        self.data[pos].resize(active_set.len(), 0.0);
                        self.base.compute_row(key, &mut self.data[pos], active_set);
                        self.cache.put(key, pos);
                        pos
                    }
                }
            })
            .collect();
        fun(poss
            .into_iter()
            .map(|pos| self.data[pos].as_slice())
            .collect());
    }

    fn restrict_active(&mut self, old: &[usize], new: &[usize]) {
        let sub = find_common(old, new);
        for ki in self.data.iter_mut() {
            *ki = sub.iter().map(|&idx| ki[idx]).collect();
        }
    }

    fn set_active(&mut self, _old: &[usize], _new: &[usize]) {
        self.cache = RawLRU::new(self.cache.cap()).unwrap();
        self.data = Vec::new();
    }

    fn diag(&self, i: usize) -> f64 {
        self.base.diag(i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{DenseKernel, KernelFunction};
    use approx::assert_abs_diff_eq;

    fn check_rows_match(kernel: &mut dyn Kernel, n: usize, order: &[usize]) {
        let active: Vec<usize> = (0..n).collect();
        for &i in order {
            let mut direct = vec![0.0; n];
            kernel.compute_row(i, &mut direct, &active);
            kernel.use_rows(&[i], &active, &mut |rows| {
                for (a, b) in rows[0].iter().zip(direct.iter()) {
                    assert_abs_diff_eq!(a, b);
                }
            });
        }
    }

    #[test]
    fn test_cached_rows_survive_eviction() {
        let data: Vec<Vec<f64>> = (0..6).map(|i| vec![i as f64, (i * i) as f64]).collect();
        let views: Vec<&[f64]> = data.iter().map(|x| x.as_slice()).collect();
        let base = DenseKernel::new(views, KernelFunction::rbf(0.1).unwrap());
        let mut cached = CachedKernel::from(&base, 2);
        // repeated fetches under eviction pressure stay consistent
        check_rows_match(&mut cached, 6, &[0, 1, 2, 3, 0, 5, 1, 4, 0]);
    }

    #[test]
    fn test_restrict_and_reset() {
        let data: Vec<Vec<f64>> = (0..4).map(|i| vec![1.0 + i as f64]).collect();
        let views: Vec<&[f64]> = data.iter().map(|x| x.as_slice()).collect();
        let base = DenseKernel::new(views, KernelFunction::linear());
        let mut cached = CachedKernel::from(&base, 4);
        let full: Vec<usize> = (0..4).collect();
        cached.use_rows(&[1], &full, &mut |_| {});

        let shrunk = vec![0, 2];
        cached.restrict_active(&full, &shrunk);
        cached.use_rows(&[1], &shrunk, &mut |rows| {
            assert_abs_diff_eq!(rows[0][0], 2.0);
            assert_abs_diff_eq!(rows[0][1], 6.0);
        });

        cached.set_active(&shrunk, &full);
        cached.use_rows(&[1], &full, &mut |rows| {
            assert_eq!(rows[0].len(), 4);
            assert_abs_diff_eq!(rows[0][3], 8.0);
        });
    }
}
