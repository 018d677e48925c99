//! Definition of the dual training problems.
pub mod classification;
pub use classification::{CSvc, NuSvc};
pub mod regression;
pub use regression::{EpsSvr, NuSvr};
pub mod oneclass;
pub use oneclass::OneClass;

use crate::status::Status;

/// A box-constrained dual training problem
///
/// ```text
/// min_a  a'Qa / 2 + p'a   s.t.  y'a = const,  0 <= a_i <= C_i
/// ```
///
/// with `Q_ij = y_i y_j K(x_i, x_j)`. The solver obtains raw kernel rows
/// through [`crate::kernel::Kernel`] and applies the sign pattern `y`
/// provided here. The ν-formulations carry a second equality constraint
/// which the solver honors by pairing variables of equal sign.
pub trait Problem {
    /// Returns the number of variables of the problem.
    fn size(&self) -> usize;
    /// Returns the sign `y_i` of the ith variable.
    fn sign(&self, i: usize) -> f64;
    /// Returns the linear term `p_i`.
    fn linear_term(&self, i: usize) -> f64;
    /// Returns the upper bound `C_i` (the lower bound is always 0).
    fn bound(&self, i: usize) -> f64;
    /// Whether the problem carries the ν-formulation sum constraint.
    fn has_sum_constraint(&self) -> bool {
        false
    }
    /// Returns a feasible initial point.
    fn initial_point(&self) -> Vec<f64> {
        vec![0.0; self.size()]
    }
    /// Applies formulation-specific rescaling after the solve.
    fn finalize(&self, _status: &mut Status) {}

    /// Folds the raw solution into one signed coefficient per sample.
    fn dual_coefficients(&self, a: &[f64]) -> Vec<f64>;
}
