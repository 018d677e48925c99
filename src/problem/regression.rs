//! Regression problems over a doubled variable vector.
//!
//! Both formulations optimize 2n variables: the first block carries the
//! positive part of each coefficient, the second block the negative
//! part. Kernel implementations map variable indices to samples modulo
//! n, so no data is duplicated.
use super::Problem;
use crate::error::{Result, SvmError};

/// ε-insensitive support vector regression
///
/// ```text
/// min_a  a'Qa / 2 + p'a   s.t.  y'a = 0,  0 <= a_i <= C_i
/// ```
///
/// with `p_i = ε - t_i` on the positive block and `p_i = ε + t_i` on
/// the negative block for targets `t`.
pub struct EpsSvr<'a> {
    y: &'a [f64],
    c: f64,
    epsilon: f64,
    w: Option<&'a [f64]>,
}

impl<'a> EpsSvr<'a> {
    /// Creates the problem for targets `y`, regularization `c` and tube width `epsilon`.
    pub fn new(y: &'a [f64], c: f64, epsilon: f64) -> EpsSvr<'a> {
        EpsSvr {
            y,
            c,
            epsilon,
            w: None,
        }
    }

    /// Sets per-sample weight multipliers.
    pub fn with_weights(mut self, w: &'a [f64]) -> Self {
        self.w = Some(w);
        self
    }

    fn weight(&self, i: usize) -> f64 {
        match self.w {
            Some(w) => w[i % self.y.len()],
            None => 1.0,
        }
    }
}

impl Problem for EpsSvr<'_> {
    fn size(&self) -> usize {
        2 * self.y.len()
    }
    fn sign(&self, i: usize) -> f64 {
        if i < self.y.len() {
            1.0
        } else {
            -1.0
        }
    }
    fn linear_term(&self, i: usize) -> f64 {
        let n = self.y.len();
        if i < n {
            self.epsilon - self.y[i]
        } else {
            self.epsilon + self.y[i - n]
        }
    }
    fn bound(&self, i: usize) -> f64 {
        self.c * self.weight(i)
    }

    fn dual_coefficients(&self, a: &[f64]) -> Vec<f64> {
        let n = self.y.len();
        (0..n).map(|i| a[i] - a[i + n]).collect()
    }
}

/// ν-support vector regression
///
/// The tube width is not fixed but determined by the optimization; the
/// fraction parameter ν bounds the share of samples outside the tube.
pub struct NuSvr<'a> {
    y: &'a [f64],
    c: f64,
    nu: f64,
    w: Option<&'a [f64]>,
}

impl<'a> NuSvr<'a> {
    /// Creates the problem for targets `y`, regularization `c` and fraction parameter `nu`.
    pub fn new(y: &'a [f64], c: f64, nu: f64) -> NuSvr<'a> {
        NuSvr { y, c, nu, w: None }
    }

    /// Sets per-sample weight multipliers.
    pub fn with_weights(mut self, w: &'a [f64]) -> Self {
        self.w = Some(w);
        self
    }

    fn weight(&self, i: usize) -> f64 {
        match self.w {
            Some(w) => w[i % self.y.len()],
            None => 1.0,
        }
    }

    fn required_sum(&self) -> f64 {
        0.5 * self.c * self.nu * self.y.len() as f64
    }

    /// Checks that the required coefficient mass fits into the box.
    pub fn check_feasible(&self) -> Result<()> {
        let cap: f64 = (0..self.y.len()).map(|i| self.bound(i)).sum();
        if self.required_sum() > cap {
            return Err(SvmError::InvalidParameter(format!(
                "nu = {} is infeasible for the given sample weights",
                self.nu
            )));
        }
        Ok(())
    }
}

impl Problem for NuSvr<'_> {
    fn size(&self) -> usize {
        2 * self.y.len()
    }
    fn sign(&self, i: usize) -> f64 {
        if i < self.y.len() {
            1.0
        } else {
            -1.0
        }
    }
    fn linear_term(&self, i: usize) -> f64 {
        let n = self.y.len();
        if i < n {
            -self.y[i]
        } else {
            self.y[i - n]
        }
    }
    fn bound(&self, i: usize) -> f64 {
        self.c * self.weight(i)
    }
    fn has_sum_constraint(&self) -> bool {
        true
    }

    fn initial_point(&self) -> Vec<f64> {
        let n = self.y.len();
        let mut sum = self.required_sum();
        let mut a = vec![0.0; 2 * n];
        for i in 0..n {
            let ai = f64::min(sum, self.c * self.weight(i));
            a[i] = ai;
            a[i + n] = ai;
            sum -= ai;
        }
        a
    }

    fn dual_coefficients(&self, a: &[f64]) -> Vec<f64> {
        let n = self.y.len();
        (0..n).map(|i| a[i] - a[i + n]).collect()
    }
}
