//! Sparse models extracted from a converged solver state.
//!
//! All models keep views into the caller-owned training data instead of
//! copies; the data must stay unchanged between fitting and prediction.
//! Models fitted on a precomputed kernel matrix keep no feature vectors
//! at all and evaluate from caller-supplied kernel rows indexed by the
//! stored support indices.
use crate::error::{Result, SvmError};
use crate::kernel::KernelFunction;
use crate::problem::Problem;
use crate::status::{Status, StatusCode};

/// Coefficients below this fraction of the respective box bound do not
/// qualify as support vectors.
pub const SUPPORT_THRESHOLD: f64 = 1e-8;

/// Support vectors of one solved problem: sample indices with their
/// signed dual coefficients.
pub(crate) struct SupportSet {
    pub index: Vec<usize>,
    pub coef: Vec<f64>,
}

/// Filters the samples carrying the decision function out of a solver result.
pub(crate) fn support_set(problem: &dyn Problem, status: &Status) -> SupportSet {
    let coefs = problem.dual_coefficients(&status.a);
    let mut index = Vec::new();
    let mut coef = Vec::new();
    for (i, &ci) in coefs.iter().enumerate() {
        if ci.abs() > SUPPORT_THRESHOLD * problem.bound(i) {
            index.push(i);
            coef.push(ci);
        }
    }
    SupportSet { index, coef }
}

fn kernel_row_values(
    function: &Option<KernelFunction>,
    sv: &[&[f64]],
    x: &[f64],
) -> Result<Vec<f64>> {
    let function = function.as_ref().ok_or_else(|| {
        SvmError::InvalidParameter(
            "model was fitted on a precomputed kernel matrix; evaluate from a kernel row instead"
                .to_string(),
        )
    })?;
    Ok(sv.iter().map(|xi| function.evaluate(xi, x)).collect())
}

fn gram_row_values(sv_index: &[usize], row: &[f64]) -> Result<Vec<f64>> {
    sv_index
        .iter()
        .map(|&i| {
            row.get(i).copied().ok_or_else(|| {
                SvmError::DataMismatch(format!(
                    "kernel row of length {} does not cover training index {}",
                    row.len(),
                    i
                ))
            })
        })
        .collect()
}

/// Model of an ε- or ν-regression fit.
pub struct RegressionModel<'a> {
    pub(crate) function: Option<KernelFunction>,
    pub(crate) sv: Vec<&'a [f64]>,
    pub(crate) sv_index: Vec<usize>,
    pub(crate) coef: Vec<f64>,
    pub(crate) rho: f64,
    pub(crate) code: StatusCode,
}

impl RegressionModel<'_> {
    /// Predicted target value for a feature vector.
    pub fn predict(&self, x: &[f64]) -> Result<f64> {
        let kvals = kernel_row_values(&self.function, &self.sv, x)?;
        Ok(self.accumulate(&kvals))
    }

    /// Predicted target value from a precomputed kernel row over the
    /// training samples.
    pub fn predict_from_kernel_row(&self, row: &[f64]) -> Result<f64> {
        let kvals = gram_row_values(&self.sv_index, row)?;
        Ok(self.accumulate(&kvals))
    }

    fn accumulate(&self, kvals: &[f64]) -> f64 {
        self.coef
            .iter()
            .zip(kvals.iter())
            .map(|(ci, ki)| ci * ki)
            .sum::<f64>()
            - self.rho
    }

    /// Indices of the support vectors in the training set.
    pub fn support_indices(&self) -> &[usize] {
        &self.sv_index
    }

    /// Signed dual coefficients of the support vectors.
    pub fn dual_coefficients(&self) -> &[f64] {
        &self.coef
    }

    /// Offset of the decision function.
    pub fn rho(&self) -> f64 {
        self.rho
    }

    /// Terminal state of the solver run.
    pub fn status_code(&self) -> StatusCode {
        self.code
    }
}

/// Model of a one-class fit.
pub struct OneClassModel<'a> {
    pub(crate) function: Option<KernelFunction>,
    pub(crate) sv: Vec<&'a [f64]>,
    pub(crate) sv_index: Vec<usize>,
    pub(crate) coef: Vec<f64>,
    pub(crate) rho: f64,
    pub(crate) code: StatusCode,
}

impl OneClassModel<'_> {
    /// Signed distance to the estimated support region.
    pub fn decision_value(&self, x: &[f64]) -> Result<f64> {
        let kvals = kernel_row_values(&self.function, &self.sv, x)?;
        Ok(self.accumulate(&kvals))
    }

    /// Signed distance evaluated from a precomputed kernel row.
    pub fn decision_value_from_kernel_row(&self, row: &[f64]) -> Result<f64> {
        let kvals = gram_row_values(&self.sv_index, row)?;
        Ok(self.accumulate(&kvals))
    }

    /// Label of a feature vector: +1 inside the region, −1 outside.
    pub fn predict(&self, x: &[f64]) -> Result<f64> {
        Ok(if self.decision_value(x)? > 0.0 { 1.0 } else { -1.0 })
    }

    fn accumulate(&self, kvals: &[f64]) -> f64 {
        self.coef
            .iter()
            .zip(kvals.iter())
            .map(|(ci, ki)| ci * ki)
            .sum::<f64>()
            - self.rho
    }

    /// Indices of the support vectors in the training set.
    pub fn support_indices(&self) -> &[usize] {
        &self.sv_index
    }

    /// Dual coefficients of the support vectors.
    pub fn dual_coefficients(&self) -> &[f64] {
        &self.coef
    }

    /// Offset of the decision function.
    pub fn rho(&self) -> f64 {
        self.rho
    }

    /// Terminal state of the solver run.
    pub fn status_code(&self) -> StatusCode {
        self.code
    }
}

/// Model of a (possibly multi-class) classification fit.
///
/// For k classes the model aggregates the k(k−1)/2 pairwise machines in
/// lexicographic pair order: (0,1), (0,2), …, (k−2,k−1). Support
/// vectors are stored grouped by class; the coefficient matrix holds
/// k−1 rows, where the entry of row `r` for a support vector of class
/// `c` is its coefficient in the machine pairing `c` with its r-th
/// counterpart class (skipping `c` itself).
pub struct ClassificationModel<'a> {
    pub(crate) function: Option<KernelFunction>,
    pub(crate) classes: Vec<f64>,
    pub(crate) sv: Vec<&'a [f64]>,
    pub(crate) sv_index: Vec<usize>,
    pub(crate) n_sv: Vec<usize>,
    pub(crate) coef: Vec<Vec<f64>>,
    pub(crate) rho: Vec<f64>,
    pub(crate) pair_codes: Vec<StatusCode>,
}

impl ClassificationModel<'_> {
    /// Distinct class labels in ascending order.
    pub fn classes(&self) -> &[f64] {
        &self.classes
    }

    /// Number of pairwise machines.
    pub fn n_pairs(&self) -> usize {
        let k = self.classes.len();
        k * (k - 1) / 2
    }

    /// Indices of the support vectors in the training set, grouped by class.
    pub fn support_indices(&self) -> &[usize] {
        &self.sv_index
    }

    /// Number of support vectors per class.
    pub fn support_counts(&self) -> &[usize] {
        &self.n_sv
    }

    /// Dual coefficient matrix (k−1 rows).
    pub fn dual_coefficients(&self) -> &[Vec<f64>] {
        &self.coef
    }

    /// Offsets of the pairwise decision functions.
    pub fn rho(&self) -> &[f64] {
        &self.rho
    }

    /// Terminal solver state per pairwise machine.
    pub fn pair_status_codes(&self) -> &[StatusCode] {
        &self.pair_codes
    }

    /// Whether every pairwise machine reached the requested tolerance.
    pub fn fully_converged(&self) -> bool {
        self.pair_codes
            .iter()
            .all(|code| *code == StatusCode::Optimal)
    }

    /// Raw pairwise decision values for a feature vector.
    pub fn decision_function(&self, x: &[f64]) -> Result<Vec<f64>> {
        let kvals = kernel_row_values(&self.function, &self.sv, x)?;
        Ok(self.pairwise_decisions(&kvals))
    }

    /// Raw pairwise decision values from a precomputed kernel row over
    /// the training samples.
    pub fn decision_function_from_kernel_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        let kvals = gram_row_values(&self.sv_index, row)?;
        Ok(self.pairwise_decisions(&kvals))
    }

    /// Predicted class label by pairwise voting; ties resolve to the
    /// lowest class index.
    pub fn predict(&self, x: &[f64]) -> Result<f64> {
        let decisions = self.decision_function(x)?;
        Ok(self.vote(&decisions))
    }

    /// Predicted class label from a precomputed kernel row.
    pub fn predict_from_kernel_row(&self, row: &[f64]) -> Result<f64> {
        let decisions = self.decision_function_from_kernel_row(row)?;
        Ok(self.vote(&decisions))
    }

    fn class_offsets(&self) -> Vec<usize> {
        let mut offsets = Vec::with_capacity(self.n_sv.len());
        let mut acc = 0;
        for &c in self.n_sv.iter() {
            offsets.push(acc);
            acc += c;
        }
        offsets
    }

    fn pairwise_decisions(&self, kvals: &[f64]) -> Vec<f64> {
        let k = self.classes.len();
        let offsets = self.class_offsets();
        let mut decisions = Vec::with_capacity(self.n_pairs());
        let mut p = 0;
        for ca in 0..k {
            for cb in (ca + 1)..k {
                let mut sum = -self.rho[p];
                for t in offsets[ca]..offsets[ca] + self.n_sv[ca] {
                    sum += self.coef[cb - 1][t] * kvals[t];
                }
                for t in offsets[cb]..offsets[cb] + self.n_sv[cb] {
                    sum += self.coef[ca][t] * kvals[t];
                }
                decisions.push(sum);
                p += 1;
            }
        }
        decisions
    }

    fn vote(&self, decisions: &[f64]) -> f64 {
        let k = self.classes.len();
        let mut votes = vec![0usize; k];
        let mut p = 0;
        for ca in 0..k {
            for cb in (ca + 1)..k {
                if decisions[p] > 0.0 {
                    votes[ca] += 1;
                } else {
                    votes[cb] += 1;
                }
                p += 1;
            }
        }
        let mut best = 0;
        for (c, &v) in votes.iter().enumerate() {
            if v > votes[best] {
                best = c;
            }
        }
        self.classes[best]
    }
}
