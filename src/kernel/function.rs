//! Kernel functions on dense feature vectors.
use std::fmt;
use std::sync::Arc;

use crate::error::{Result, SvmError};

/// Signature of a user-supplied kernel function.
///
/// The function must be pure: repeated evaluation on the same pair of
/// vectors has to return the same value.
pub type CustomKernelFn = dyn Fn(&[f64], &[f64]) -> f64 + Send + Sync;

/// A kernel function evaluating scalar products in feature space.
///
/// Parameterized variants are constructed through the checked
/// constructors which reject inadmissible parameters up front.
#[derive(Clone)]
pub enum KernelFunction {
    /// `⟨x, x'⟩`
    Linear,
    /// `(γ⟨x, x'⟩ + r)^d`
    Polynomial {
        /// Scale γ of the scalar product
        gamma: f64,
        /// Additive term r
        coef0: f64,
        /// Degree d of the polynomial
        degree: u32,
    },
    /// `exp(−γ‖x − x'‖²)`
    Rbf {
        /// Width γ of the Gaussian
        gamma: f64,
    },
    /// `tanh(γ⟨x, x'⟩ + r)`
    Sigmoid {
        /// Scale γ of the scalar product
        gamma: f64,
        /// Additive term r
        coef0: f64,
    },
    /// A user-supplied kernel function
    Custom(Arc<CustomKernelFn>),
}

impl KernelFunction {
    /// Creates the linear kernel.
    pub fn linear() -> Self {
        KernelFunction::Linear
    }

    /// Creates a polynomial kernel, requiring `gamma > 0` and `degree >= 1`.
    pub fn polynomial(gamma: f64, coef0: f64, degree: u32) -> Result<Self> {
        if !(gamma > 0.0) {
            return Err(SvmError::InvalidParameter(format!(
                "polynomial kernel needs gamma > 0, got {gamma}"
            )));
        }
        if degree < 1 {
            return Err(SvmError::InvalidParameter(
                "polynomial kernel needs degree >= 1".to_string(),
            ));
        }
        Ok(KernelFunction::Polynomial {
            gamma,
            coef0,
            degree,
        })
    }

    /// Creates a Gaussian kernel, requiring `gamma > 0`.
    pub fn rbf(gamma: f64) -> Result<Self> {
        if !(gamma > 0.0) {
            return Err(SvmError::InvalidParameter(format!(
                "rbf kernel needs gamma > 0, got {gamma}"
            )));
        }
        Ok(KernelFunction::Rbf { gamma })
    }

    /// Creates a sigmoid kernel, requiring `gamma > 0`.
    pub fn sigmoid(gamma: f64, coef0: f64) -> Result<Self> {
        if !(gamma > 0.0) {
            return Err(SvmError::InvalidParameter(format!(
                "sigmoid kernel needs gamma > 0, got {gamma}"
            )));
        }
        Ok(KernelFunction::Sigmoid { gamma, coef0 })
    }

    /// Wraps a user-supplied kernel function.
    pub fn custom(f: impl Fn(&[f64], &[f64]) -> f64 + Send + Sync + 'static) -> Self {
        KernelFunction::Custom(Arc::new(f))
    }

    /// Evaluates the kernel on a pair of feature vectors.
    pub fn evaluate(&self, xi: &[f64], xj: &[f64]) -> f64 {
        match self {
            KernelFunction::Linear => dot(xi, xj),
            KernelFunction::Polynomial {
                gamma,
                coef0,
                degree,
            } => powi(gamma * dot(xi, xj) + coef0, *degree),
            KernelFunction::Rbf { gamma } => (-gamma * sqdist(xi, xj)).exp(),
            KernelFunction::Sigmoid { gamma, coef0 } => (gamma * dot(xi, xj) + coef0).tanh(),
            KernelFunction::Custom(f) => f(xi, xj),
        }
    }
}

impl fmt::Debug for KernelFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelFunction::Linear => write!(f, "Linear"),
            KernelFunction::Polynomial {
                gamma,
                coef0,
                degree,
            } => write!(f, "Polynomial {{ gamma: {gamma}, coef0: {coef0}, degree: {degree} }}"),
            KernelFunction::Rbf { gamma } => write!(f, "Rbf {{ gamma: {gamma} }}"),
            KernelFunction::Sigmoid { gamma, coef0 } => {
                write!(f, "Sigmoid {{ gamma: {gamma}, coef0: {coef0} }}")
            }
            KernelFunction::Custom(_) => write!(f, "Custom"),
        }
    }
}

/// Scalar product of two dense feature vectors.
pub fn dot(xi: &[f64], xj: &[f64]) -> f64 {
    xi.iter()
        .zip(xj.iter())
        .fold(0.0, |acc, (xik, xjk)| acc + xik * xjk)
}

/// Squared Euclidean distance of two dense feature vectors.
pub fn sqdist(xi: &[f64], xj: &[f64]) -> f64 {
    xi.iter()
        .zip(xj.iter())
        .fold(0.0, |acc, (xik, xjk)| acc + (xik - xjk) * (xik - xjk))
}

/// Integer power by squaring.
fn powi(base: f64, times: u32) -> f64 {
    let mut tmp = base;
    let mut ret = 1.0;
    let mut t = times;
    while t > 0 {
        if t % 2 == 1 {
            ret *= tmp;
        }
        tmp *= tmp;
        t /= 2;
    }
    ret
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_linear() {
        let k = KernelFunction::linear();
        assert_abs_diff_eq!(k.evaluate(&[1.0, 2.0], &[3.0, -1.0]), 1.0);
    }

    #[test]
    fn test_polynomial() {
        let k = KernelFunction::polynomial(0.5, 1.0, 3).unwrap();
        // (0.5 * 2 + 1)^3 = 8
        assert_abs_diff_eq!(k.evaluate(&[1.0, 1.0], &[1.0, 1.0]), 8.0);
    }

    #[test]
    fn test_rbf() {
        let k = KernelFunction::rbf(0.25).unwrap();
        assert_abs_diff_eq!(k.evaluate(&[0.0, 0.0], &[2.0, 0.0]), (-1.0f64).exp());
        assert_abs_diff_eq!(k.evaluate(&[1.0, 2.0], &[1.0, 2.0]), 1.0);
    }

    #[test]
    fn test_sigmoid() {
        let k = KernelFunction::sigmoid(1.0, 0.0).unwrap();
        assert_abs_diff_eq!(k.evaluate(&[1.0], &[1.0]), 1.0f64.tanh());
    }

    #[test]
    fn test_custom() {
        let k = KernelFunction::custom(|xi, xj| dot(xi, xj) + 1.0);
        assert_abs_diff_eq!(k.evaluate(&[2.0], &[3.0]), 7.0);
    }

    #[test]
    fn test_rejects_bad_parameters() {
        assert!(KernelFunction::rbf(0.0).is_err());
        assert!(KernelFunction::rbf(-1.5).is_err());
        assert!(KernelFunction::polynomial(-0.1, 0.0, 2).is_err());
        assert!(KernelFunction::polynomial(1.0, 0.0, 0).is_err());
        assert!(KernelFunction::sigmoid(0.0, 1.0).is_err());
    }
}
