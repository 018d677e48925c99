//! Training entry points and their configuration.
use ndarray::ArrayView2;

use crate::error::{Result, SvmError};
use crate::kernel::{CachedKernel, DenseKernel, KernelFunction, PrecomputedKernel};
use crate::model::{support_set, OneClassModel, RegressionModel, SupportSet};
use crate::multiclass::{self, TrainingData};
use crate::problem::{EpsSvr, NuSvr, OneClass, Problem};
use crate::smo;
use crate::status::{Status, StatusCode};

pub use crate::model::ClassificationModel;
pub use crate::smo::CancelCheck;

/// Classification formulation.
pub enum Svc {
    /// C-classification with regularization parameter `C > 0`
    C(f64),
    /// ν-classification with fraction parameter `ν ∈ (0, 1]`
    Nu(f64),
}

/// Regression formulation.
pub enum Svr {
    /// ε-insensitive regression
    Epsilon {
        /// Regularization parameter, `C > 0`
        c: f64,
        /// Width of the insensitive tube, `ε ≥ 0`
        epsilon: f64,
    },
    /// ν-regression with automatic tube width
    Nu {
        /// Regularization parameter, `C > 0`
        c: f64,
        /// Fraction parameter, `ν ∈ (0, 1]`
        nu: f64,
    },
}

/// How to treat sub-problems that hit a step or time limit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Abort the whole fit (default): no silently degraded models
    Abort,
    /// Keep the best-effort result, flagged through its status code
    BestEffort,
}

/// Configuration shared by all training entry points.
pub struct SvmParams {
    /// Kernel function applied to the feature vectors
    pub kernel: KernelFunction,
    /// Tolerance of the optimality conditions
    pub tol: f64,
    /// Byte budget of the per-solver kernel row cache
    pub cache_bytes: usize,
    /// Step limit per sub-problem
    pub max_steps: usize,
    /// Time limit per sub-problem (in seconds)
    pub time_limit: f64,
    /// Whether to use the shrinking heuristic
    pub shrinking: bool,
    /// Logging period of the solver (0 = silent)
    pub verbose: usize,
    /// Treatment of sub-problems hitting a limit
    pub failure_policy: FailurePolicy,
    /// Per-class multipliers of the box bound, as (label, multiplier)
    pub class_weights: Vec<(f64, f64)>,
    /// Per-sample multipliers of the box bound
    pub sample_weights: Option<Vec<f64>>,
}

impl SvmParams {
    /// Creates the default configuration for the given kernel.
    pub fn new(kernel: KernelFunction) -> Self {
        SvmParams {
            kernel,
            tol: 1e-3,
            cache_bytes: crate::kernel::cached::DEFAULT_CACHE_BYTES,
            max_steps: usize::MAX,
            time_limit: f64::INFINITY,
            shrinking: true,
            verbose: 0,
            failure_policy: FailurePolicy::Abort,
            class_weights: Vec::new(),
            sample_weights: None,
        }
    }

    /// Sets the tolerance.
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Sets the cache budget in bytes.
    pub fn with_cache_bytes(mut self, cache_bytes: usize) -> Self {
        self.cache_bytes = cache_bytes;
        self
    }

    /// Sets the step limit.
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Sets the time limit in seconds.
    pub fn with_time_limit(mut self, time_limit: f64) -> Self {
        self.time_limit = time_limit;
        self
    }

    /// Enables or disables the shrinking heuristic.
    pub fn with_shrinking(mut self, shrinking: bool) -> Self {
        self.shrinking = shrinking;
        self
    }

    /// Sets the logging period.
    pub fn with_verbose(mut self, verbose: usize) -> Self {
        self.verbose = verbose;
        self
    }

    /// Sets the failure policy.
    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    /// Sets per-class bound multipliers.
    pub fn with_class_weights(mut self, class_weights: Vec<(f64, f64)>) -> Self {
        self.class_weights = class_weights;
        self
    }

    /// Sets per-sample bound multipliers.
    pub fn with_sample_weights(mut self, sample_weights: Vec<f64>) -> Self {
        self.sample_weights = Some(sample_weights);
        self
    }
}

pub(crate) fn solver_params(params: &SvmParams, n: usize) -> smo::Params {
    smo::Params::new()
        .with_tol(params.tol)
        .with_max_steps(params.max_steps)
        .with_time_limit(params.time_limit)
        .with_verbose(params.verbose)
        .with_shrinking_period(if params.shrinking { n.min(1000) } else { 0 })
}

/// Maps a terminal solver state to the configured failure behavior.
pub(crate) fn check_terminal_code(status: &Status, policy: FailurePolicy) -> Result<()> {
    match status.code {
        StatusCode::Optimal => Ok(()),
        StatusCode::Callback => Err(SvmError::Canceled),
        StatusCode::MaxSteps | StatusCode::TimeLimit => match policy {
            FailurePolicy::Abort => Err(SvmError::NonConvergence {
                steps: status.steps,
                violation: status.violation,
            }),
            FailurePolicy::BestEffort => Ok(()),
        },
        StatusCode::Initialized => Err(SvmError::NonConvergence {
            steps: status.steps,
            violation: status.violation,
        }),
    }
}

fn check_positive(name: &str, value: f64) -> Result<()> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(SvmError::InvalidParameter(format!(
            "{name} must be positive, got {value}"
        )))
    }
}

fn check_nu(nu: f64) -> Result<()> {
    if nu > 0.0 && nu <= 1.0 {
        Ok(())
    } else {
        Err(SvmError::InvalidParameter(format!(
            "nu must be in (0, 1], got {nu}"
        )))
    }
}

fn validate_params(params: &SvmParams, n: usize) -> Result<()> {
    check_positive("tolerance", params.tol)?;
    for &(label, weight) in params.class_weights.iter() {
        if !(weight > 0.0) {
            return Err(SvmError::InvalidParameter(format!(
                "class weight of label {label} must be positive, got {weight}"
            )));
        }
    }
    if let Some(w) = params.sample_weights.as_ref() {
        if w.len() != n {
            return Err(SvmError::DataMismatch(format!(
                "got {} sample weights for {} samples",
                w.len(),
                n
            )));
        }
        if w.iter().any(|wi| !(*wi > 0.0)) {
            return Err(SvmError::InvalidParameter(
                "sample weights must be positive".to_string(),
            ));
        }
    }
    Ok(())
}

fn validate_targets(n: usize, targets: &[f64]) -> Result<()> {
    if n != targets.len() {
        return Err(SvmError::DataMismatch(format!(
            "got {} targets for {} samples",
            targets.len(),
            n
        )));
    }
    Ok(())
}

fn validate_svc(svc: &Svc) -> Result<()> {
    match svc {
        Svc::C(c) => check_positive("C", *c),
        Svc::Nu(nu) => check_nu(*nu),
    }
}

fn validate_svr(svr: &Svr) -> Result<()> {
    match svr {
        Svr::Epsilon { c, epsilon } => {
            check_positive("C", *c)?;
            if *epsilon < 0.0 {
                return Err(SvmError::InvalidParameter(format!(
                    "epsilon must be nonnegative, got {epsilon}"
                )));
            }
            Ok(())
        }
        Svr::Nu { c, nu } => {
            check_positive("C", *c)?;
            check_nu(*nu)
        }
    }
}

/// Fits a binary or multi-class classifier on dense feature vectors.
pub fn fit_classification<'a>(
    data: &[&'a [f64]],
    targets: &[f64],
    svc: Svc,
    params: &SvmParams,
    cancel: Option<&CancelCheck>,
) -> Result<ClassificationModel<'a>> {
    validate_targets(data.len(), targets)?;
    validate_params(params, data.len())?;
    validate_svc(&svc)?;
    multiclass::fit(
        TrainingData::Dense {
            rows: data.to_vec(),
            function: params.kernel.clone(),
        },
        targets,
        &svc,
        params,
        cancel,
    )
}

/// Fits a classifier on a caller-supplied Gram matrix.
///
/// The resulting model stores training indices only; predictions take
/// kernel rows over the training samples.
pub fn fit_classification_precomputed(
    gram: ArrayView2<'_, f64>,
    targets: &[f64],
    svc: Svc,
    params: &SvmParams,
    cancel: Option<&CancelCheck>,
) -> Result<ClassificationModel<'static>> {
    validate_targets(gram.nrows(), targets)?;
    validate_params(params, gram.nrows())?;
    validate_svc(&svc)?;
    PrecomputedKernel::new(gram)?;
    multiclass::fit(
        TrainingData::Precomputed { gram },
        targets,
        &svc,
        params,
        cancel,
    )
}

struct SolveOutcome {
    support: SupportSet,
    rho: f64,
    code: StatusCode,
}

fn run_dense(
    problem: &dyn Problem,
    data: &[&[f64]],
    params: &SvmParams,
    cancel: Option<&CancelCheck>,
) -> Result<SolveOutcome> {
    let base = DenseKernel::new(data.to_vec(), params.kernel.clone());
    let mut kernel = CachedKernel::with_budget(&base, params.cache_bytes);
    let status = smo::solve(
        problem,
        &mut kernel,
        &solver_params(params, problem.size()),
        cancel,
    );
    check_terminal_code(&status, params.failure_policy)?;
    Ok(SolveOutcome {
        support: support_set(problem, &status),
        rho: status.rho,
        code: status.code,
    })
}

fn run_precomputed(
    problem: &dyn Problem,
    gram: ArrayView2<'_, f64>,
    params: &SvmParams,
    cancel: Option<&CancelCheck>,
) -> Result<SolveOutcome> {
    let mut kernel = PrecomputedKernel::new(gram)?;
    let status = smo::solve(
        problem,
        &mut kernel,
        &solver_params(params, problem.size()),
        cancel,
    );
    check_terminal_code(&status, params.failure_policy)?;
    Ok(SolveOutcome {
        support: support_set(problem, &status),
        rho: status.rho,
        code: status.code,
    })
}

fn regression_problem<'p>(
    targets: &'p [f64],
    svr: &Svr,
    sample_weights: Option<&'p [f64]>,
) -> Result<Box<dyn Problem + 'p>> {
    match svr {
        Svr::Epsilon { c, epsilon } => {
            let mut problem = EpsSvr::new(targets, *c, *epsilon);
            if let Some(w) = sample_weights {
                problem = problem.with_weights(w);
            }
            Ok(Box::new(problem))
        }
        Svr::Nu { c, nu } => {
            let mut problem = NuSvr::new(targets, *c, *nu);
            if let Some(w) = sample_weights {
                problem = problem.with_weights(w);
            }
            problem.check_feasible()?;
            Ok(Box::new(problem))
        }
    }
}

/// Fits an ε- or ν-regression machine on dense feature vectors.
pub fn fit_regression<'a>(
    data: &[&'a [f64]],
    targets: &[f64],
    svr: Svr,
    params: &SvmParams,
    cancel: Option<&CancelCheck>,
) -> Result<RegressionModel<'a>> {
    validate_targets(data.len(), targets)?;
    validate_params(params, data.len())?;
    validate_svr(&svr)?;
    let problem = regression_problem(targets, &svr, params.sample_weights.as_deref())?;
    let outcome = run_dense(problem.as_ref(), data, params, cancel)?;
    Ok(RegressionModel {
        function: Some(params.kernel.clone()),
        sv: outcome.support.index.iter().map(|&i| data[i]).collect(),
        sv_index: outcome.support.index,
        coef: outcome.support.coef,
        rho: outcome.rho,
        code: outcome.code,
    })
}

/// Fits a regression machine on a caller-supplied Gram matrix.
pub fn fit_regression_precomputed(
    gram: ArrayView2<'_, f64>,
    targets: &[f64],
    svr: Svr,
    params: &SvmParams,
    cancel: Option<&CancelCheck>,
) -> Result<RegressionModel<'static>> {
    validate_targets(gram.nrows(), targets)?;
    validate_params(params, gram.nrows())?;
    validate_svr(&svr)?;
    let problem = regression_problem(targets, &svr, params.sample_weights.as_deref())?;
    let outcome = run_precomputed(problem.as_ref(), gram, params, cancel)?;
    Ok(RegressionModel {
        function: None,
        sv: Vec::new(),
        sv_index: outcome.support.index,
        coef: outcome.support.coef,
        rho: outcome.rho,
        code: outcome.code,
    })
}

/// Fits a one-class machine for novelty detection on dense feature vectors.
pub fn fit_one_class<'a>(
    data: &[&'a [f64]],
    nu: f64,
    params: &SvmParams,
    cancel: Option<&CancelCheck>,
) -> Result<OneClassModel<'a>> {
    validate_params(params, data.len())?;
    check_nu(nu)?;
    let mut problem = OneClass::new(data.len(), nu);
    if let Some(w) = params.sample_weights.as_deref() {
        problem = problem.with_weights(w);
    }
    problem.check_feasible()?;
    let outcome = run_dense(&problem, data, params, cancel)?;
    Ok(OneClassModel {
        function: Some(params.kernel.clone()),
        sv: outcome.support.index.iter().map(|&i| data[i]).collect(),
        sv_index: outcome.support.index,
        coef: outcome.support.coef,
        rho: outcome.rho,
        code: outcome.code,
    })
}

/// Fits a one-class machine on a caller-supplied Gram matrix.
pub fn fit_one_class_precomputed(
    gram: ArrayView2<'_, f64>,
    nu: f64,
    params: &SvmParams,
    cancel: Option<&CancelCheck>,
) -> Result<OneClassModel<'static>> {
    validate_params(params, gram.nrows())?;
    check_nu(nu)?;
    let mut problem = OneClass::new(gram.nrows(), nu);
    if let Some(w) = params.sample_weights.as_deref() {
        problem = problem.with_weights(w);
    }
    problem.check_feasible()?;
    let outcome = run_precomputed(&problem, gram, params, cancel)?;
    Ok(OneClassModel {
        function: None,
        sv: Vec::new(),
        sv_index: outcome.support.index,
        coef: outcome.support.coef,
        rho: outcome.rho,
        code: outcome.code,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::Array2;

    fn views(data: &[Vec<f64>]) -> Vec<&[f64]> {
        data.iter().map(|x| x.as_slice()).collect()
    }

    fn two_clusters() -> (Vec<Vec<f64>>, Vec<f64>) {
        let mut data = Vec::new();
        let mut targets = Vec::new();
        for i in 0..10 {
            let (row, col) = ((i / 5) as f64, (i % 5) as f64);
            data.push(vec![0.3 * col, 0.3 * row]);
            targets.push(-1.0);
            data.push(vec![3.0 + 0.3 * col, 3.0 + 0.3 * row]);
            targets.push(1.0);
        }
        (data, targets)
    }

    fn linear_params() -> SvmParams {
        SvmParams::new(crate::kernel::KernelFunction::linear()).with_tol(1e-6)
    }

    #[test]
    fn test_separable_round_trip() {
        let (data, targets) = two_clusters();
        let data = views(&data);
        let model =
            fit_classification(&data, &targets, Svc::C(1.0), &linear_params(), None).unwrap();
        assert!(model.fully_converged());
        for (xi, &yi) in data.iter().zip(targets.iter()) {
            assert_abs_diff_eq!(model.predict(xi).unwrap(), yi);
        }
    }

    #[test]
    fn test_refit_is_idempotent() {
        let (data, targets) = two_clusters();
        let data = views(&data);
        let params = linear_params();
        let first = fit_classification(&data, &targets, Svc::C(1.0), &params, None).unwrap();
        let second = fit_classification(&data, &targets, Svc::C(1.0), &params, None).unwrap();
        assert_eq!(first.support_indices(), second.support_indices());
        assert_eq!(first.dual_coefficients(), second.dual_coefficients());
        assert_eq!(first.rho(), second.rho());
    }

    #[test]
    fn test_precomputed_matches_linear() {
        let (data, targets) = two_clusters();
        let data = views(&data);
        let n = data.len();
        let mut gram = Array2::zeros((n, n));
        for i in 0..n {
            for j in 0..n {
                gram[(i, j)] = crate::kernel::function::dot(data[i], data[j]);
            }
        }
        let params = linear_params();
        let linear = fit_classification(&data, &targets, Svc::C(1.0), &params, None).unwrap();
        let precomputed =
            fit_classification_precomputed(gram.view(), &targets, Svc::C(1.0), &params, None)
                .unwrap();
        for (i, xi) in data.iter().enumerate() {
            let row: Vec<f64> = (0..n).map(|j| gram[(i, j)]).collect();
            let dec_lin = linear.decision_function(xi).unwrap();
            let dec_pre = precomputed.decision_function_from_kernel_row(&row).unwrap();
            assert_eq!(dec_lin.len(), dec_pre.len());
            for (a, b) in dec_lin.iter().zip(dec_pre.iter()) {
                assert_abs_diff_eq!(a, b, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_four_class_voting() {
        let data = [
            vec![0.0, 0.0],
            vec![0.0, 10.0],
            vec![10.0, 0.0],
            vec![10.0, 10.0],
        ];
        let data = views(&data);
        let targets = [0.0, 1.0, 2.0, 3.0];
        let model =
            fit_classification(&data, &targets, Svc::C(10.0), &linear_params(), None).unwrap();
        assert_eq!(model.classes(), &[0.0, 1.0, 2.0, 3.0]);
        assert_eq!(model.n_pairs(), 6);
        for (xi, &yi) in data.iter().zip(targets.iter()) {
            let decisions = model.decision_function(xi).unwrap();
            assert_eq!(decisions.len(), 6);
            assert_abs_diff_eq!(model.predict(xi).unwrap(), yi);
        }
    }

    #[test]
    fn test_epsilon_svr_tube() {
        let data = [vec![0.0, 0.0], vec![2.0, 2.0]];
        let data = views(&data);
        let targets = [0.5, 2.5];
        let epsilon = 0.1;
        let model = fit_regression(
            &data,
            &targets,
            Svr::Epsilon { c: 10.0, epsilon },
            &linear_params(),
            None,
        )
        .unwrap();
        let prediction = model.predict(&[1.0, 1.0]).unwrap();
        assert!((prediction - 1.5).abs() <= epsilon + 1e-3);
    }

    #[test]
    fn test_nu_svr_interpolates() {
        let data = [vec![0.0, 0.0], vec![2.0, 2.0]];
        let data = views(&data);
        let targets = [0.5, 2.5];
        let model = fit_regression(
            &data,
            &targets,
            Svr::Nu { c: 10.0, nu: 0.5 },
            &linear_params(),
            None,
        )
        .unwrap();
        let prediction = model.predict(&[1.0, 1.0]).unwrap();
        assert!((prediction - 1.5).abs() <= 0.2);
    }

    #[test]
    fn test_one_class_rejects_far_point() {
        let data = [
            vec![0.0, 0.0],
            vec![0.1, 0.0],
            vec![0.0, 0.1],
            vec![-0.1, 0.0],
            vec![0.0, -0.1],
            vec![0.1, 0.1],
        ];
        let data = views(&data);
        let params = SvmParams::new(crate::kernel::KernelFunction::rbf(0.5).unwrap())
            .with_tol(1e-6);
        let model = fit_one_class(&data, 0.5, &params, None).unwrap();
        assert!(!model.support_indices().is_empty());
        assert!(model.decision_value(&[5.0, 5.0]).unwrap() < 0.0);
        assert_abs_diff_eq!(model.predict(&[5.0, 5.0]).unwrap(), -1.0);
    }

    #[test]
    fn test_cancellation_produces_no_model() {
        let (data, targets) = two_clusters();
        let data = views(&data);
        let result = fit_classification(
            &data,
            &targets,
            Svc::C(1.0),
            &linear_params(),
            Some(&|_: &crate::Status| true),
        );
        assert!(matches!(result, Err(SvmError::Canceled)));
    }

    #[test]
    fn test_failure_policy() {
        let (data, targets) = two_clusters();
        let data = views(&data);
        let params = linear_params().with_max_steps(0);
        let aborted = fit_classification(&data, &targets, Svc::C(1.0), &params, None);
        assert!(matches!(aborted, Err(SvmError::NonConvergence { .. })));

        let params = params.with_failure_policy(FailurePolicy::BestEffort);
        let model = fit_classification(&data, &targets, Svc::C(1.0), &params, None).unwrap();
        assert!(!model.fully_converged());
        assert_eq!(model.pair_status_codes(), &[StatusCode::MaxSteps]);
    }

    #[test]
    fn test_shrinking_matches_plain_solve() {
        let (data, targets) = two_clusters();
        let data = views(&data);
        let params = SvmParams::new(crate::kernel::KernelFunction::rbf(0.5).unwrap())
            .with_tol(1e-8)
            .with_shrinking(false);
        let plain = fit_classification(&data, &targets, Svc::C(1.0), &params, None).unwrap();
        let params = params.with_shrinking(true);
        let shrunk = fit_classification(&data, &targets, Svc::C(1.0), &params, None).unwrap();
        for xi in data.iter() {
            assert_abs_diff_eq!(
                plain.decision_function(xi).unwrap()[0],
                shrunk.decision_function(xi).unwrap()[0],
                epsilon = 1e-3
            );
        }
    }

    #[test]
    fn test_small_cache_matches_large_cache() {
        let (data, targets) = two_clusters();
        let data = views(&data);
        let params = SvmParams::new(crate::kernel::KernelFunction::rbf(0.5).unwrap())
            .with_tol(1e-6);
        let large = fit_classification(&data, &targets, Svc::C(1.0), &params, None).unwrap();
        let params = params.with_cache_bytes(1);
        let small = fit_classification(&data, &targets, Svc::C(1.0), &params, None).unwrap();
        assert_eq!(large.dual_coefficients(), small.dual_coefficients());
        assert_eq!(large.rho(), small.rho());
    }

    #[test]
    fn test_rejects_invalid_configuration() {
        let (data, targets) = two_clusters();
        let data = views(&data);
        let params = linear_params();
        assert!(fit_classification(&data, &targets, Svc::C(0.0), &params, None).is_err());
        assert!(fit_classification(&data, &targets, Svc::Nu(1.5), &params, None).is_err());
        assert!(fit_classification(&data, &targets[..3], Svc::C(1.0), &params, None).is_err());
        assert!(fit_one_class(&data, 0.0, &params, None).is_err());
        assert!(fit_regression(
            &data,
            &targets,
            Svr::Epsilon {
                c: 1.0,
                epsilon: -0.1
            },
            &params,
            None
        )
        .is_err());

        let params = linear_params().with_sample_weights(vec![1.0; 3]);
        assert!(fit_classification(&data, &targets, Svc::C(1.0), &params, None).is_err());
    }

    #[test]
    fn test_class_weights_scale_bounds() {
        let (data, targets) = two_clusters();
        let data = views(&data);
        let params = linear_params().with_class_weights(vec![(-1.0, 0.5), (1.0, 2.0)]);
        let model = fit_classification(&data, &targets, Svc::C(1.0), &params, None).unwrap();
        for (&i, coefs) in model
            .support_indices()
            .iter()
            .zip(model.dual_coefficients()[0].iter())
        {
            let cap = if targets[i] > 0.0 { 2.0 } else { 0.5 };
            assert!(coefs.abs() <= cap + 1e-9);
        }
    }
}
