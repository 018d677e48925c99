//! One-class problem for unsupervised novelty detection.
use super::Problem;
use crate::error::{Result, SvmError};

/// One-class support vector machine
///
/// ```text
/// min_a  a'Qa / 2   s.t.  e'a = ν n,  0 <= a_i <= w_i
/// ```
///
/// with `Q_ij = K(x_i, x_j)`; no labels are involved. A fraction of
/// roughly ν of the training samples ends up outside the estimated
/// support region.
pub struct OneClass<'a> {
    n: usize,
    nu: f64,
    w: Option<&'a [f64]>,
}

impl<'a> OneClass<'a> {
    /// Creates the problem for `n` samples and fraction parameter `nu`.
    pub fn new(n: usize, nu: f64) -> OneClass<'a> {
        OneClass { n, nu, w: None }
    }

    /// Sets per-sample weight multipliers.
    pub fn with_weights(mut self, w: &'a [f64]) -> Self {
        self.w = Some(w);
        self
    }

    fn weight(&self, i: usize) -> f64 {
        match self.w {
            Some(w) => w[i],
            None => 1.0,
        }
    }

    fn required_sum(&self) -> f64 {
        self.nu * self.n as f64
    }

    /// Checks that the required coefficient mass fits into the box.
    pub fn check_feasible(&self) -> Result<()> {
        let cap: f64 = (0..self.n).map(|i| self.bound(i)).sum();
        if self.required_sum() > cap {
            return Err(SvmError::InvalidParameter(format!(
                "nu = {} is infeasible for the given sample weights",
                self.nu
            )));
        }
        Ok(())
    }
}

impl Problem for OneClass<'_> {
    fn size(&self) -> usize {
        self.n
    }
    fn sign(&self, _i: usize) -> f64 {
        1.0
    }
    fn linear_term(&self, _i: usize) -> f64 {
        0.0
    }
    fn bound(&self, i: usize) -> f64 {
        self.weight(i)
    }

    fn initial_point(&self) -> Vec<f64> {
        let mut rem = self.required_sum();
        (0..self.n)
            .map(|i| {
                let ai = f64::min(self.bound(i), rem);
                rem -= ai;
                ai
            })
            .collect()
    }

    fn dual_coefficients(&self, a: &[f64]) -> Vec<f64> {
        a.to_vec()
    }
}
