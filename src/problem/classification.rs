//! Binary classification problems.
use super::Problem;
use crate::error::{Result, SvmError};
use crate::status::Status;

/// C-support vector classification
///
/// ```text
/// min_a  a'Qa / 2 - e'a   s.t.  y'a = 0,  0 <= a_i <= C_i
/// ```
///
/// Labels are expected as ±1. The box bound of each variable is `C`
/// scaled by its class weight and optional per-sample weight.
pub struct CSvc<'a> {
    y: &'a [f64],
    cpos: f64,
    cneg: f64,
    w: Option<&'a [f64]>,
}

impl<'a> CSvc<'a> {
    /// Creates the problem for labels `y` and regularization parameter `c`.
    pub fn new(y: &'a [f64], c: f64) -> CSvc<'a> {
        CSvc {
            y,
            cpos: c,
            cneg: c,
            w: None,
        }
    }

    /// Sets distinct bounds for the positive and negative class.
    pub fn with_class_bounds(mut self, cpos: f64, cneg: f64) -> Self {
        self.cpos = cpos;
        self.cneg = cneg;
        self
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
}

impl Problem for CSvc<'_> {
    fn size(&self) -> usize {
        self.y.len()
    }
    fn sign(&self, i: usize) -> f64 {
        if self.y[i] > 0.0 {
            1.0
        } else {
            -1.0
        }
    }
    fn linear_term(&self, _i: usize) -> f64 {
        -1.0
    }
    fn bound(&self, i: usize) -> f64 {
        let c = if self.y[i] > 0.0 {
            self.cpos
        } else {
            self.cneg
        };
        c * self.weight(i)
    }

    fn dual_coefficients(&self, a: &[f64]) -> Vec<f64> {
        a.iter()
            .zip(self.y.iter())
            .map(|(&ai, &yi)| if yi > 0.0 { ai } else { -ai })
            .collect()
    }
}

/// ν-support vector classification
///
/// ```text
/// min_a  a'Qa / 2   s.t.  y'a = 0,  e'a = ν n,  0 <= a_i <= w_i
/// ```
///
/// The solver result is rescaled by the margin shift `r`, reproducing
/// the conventional C-classifier form with `C = 1/r`.
pub struct NuSvc<'a> {
    y: &'a [f64],
    nu: f64,
    w: Option<&'a [f64]>,
}

impl<'a> NuSvc<'a> {
    /// Creates the problem for labels `y` and fraction parameter `nu`.
    pub fn new(y: &'a [f64], nu: f64) -> NuSvc<'a> {
        NuSvc { y, nu, w: None }
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
        0.5 * self.nu * self.y.len() as f64
    }

    /// Checks that the required coefficient mass fits into both class boxes.
    pub fn check_feasible(&self) -> Result<()> {
        let mut cap_pos = 0.0;
        let mut cap_neg = 0.0;
        for i in 0..self.y.len() {
            if self.y[i] > 0.0 {
                cap_pos += self.bound(i);
            } else {
                cap_neg += self.bound(i);
            }
        }
        if self.required_sum() > cap_pos.min(cap_neg) {
            return Err(SvmError::InvalidParameter(format!(
                "nu = {} is infeasible for the given class sizes",
                self.nu
            )));
        }
        Ok(())
    }
}

impl Problem for NuSvc<'_> {
    fn size(&self) -> usize {
        self.y.len()
    }
    fn sign(&self, i: usize) -> f64 {
        if self.y[i] > 0.0 {
            1.0
        } else {
            -1.0
        }
    }
    fn linear_term(&self, _i: usize) -> f64 {
        0.0
    }
    fn bound(&self, i: usize) -> f64 {
        self.weight(i)
    }
    fn has_sum_constraint(&self) -> bool {
        true
    }

    fn initial_point(&self) -> Vec<f64> {
        let mut sum_pos = self.required_sum();
        let mut sum_neg = self.required_sum();
        (0..self.y.len())
            .map(|i| {
                let rem = if self.y[i] > 0.0 {
                    &mut sum_pos
                } else {
                    &mut sum_neg
                };
                let ai = f64::min(self.bound(i), *rem);
                *rem -= ai;
                ai
            })
            .collect()
    }

    fn finalize(&self, status: &mut Status) {
        let r = status.r;
        if r <= 0.0 {
            return;
        }
        for ai in status.a.iter_mut() {
            *ai /= r;
        }
        status.rho /= r;
        status.value /= r * r;
    }

    fn dual_coefficients(&self, a: &[f64]) -> Vec<f64> {
        a.iter()
            .zip(self.y.iter())
            .map(|(&ai, &yi)| if yi > 0.0 { ai } else { -ai })
            .collect()
    }
}
