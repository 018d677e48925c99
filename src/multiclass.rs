//! One-against-one orchestration of classification fits.
//!
//! For k classes, k(k−1)/2 independent binary problems are solved, one
//! per unordered class pair in lexicographic order. The sub-problems
//! share nothing but the read-only training data and are dispatched
//! over a worker pool; every task owns its problem, kernel and cache.
use ndarray::{Array2, ArrayView2};
use rayon::prelude::*;

use crate::error::{Result, SvmError};
use crate::fit::{check_terminal_code, solver_params, Svc, SvmParams};
use crate::kernel::{CachedKernel, DenseKernel, KernelFunction, PrecomputedKernel};
use crate::model::{support_set, ClassificationModel};
use crate::problem::{CSvc, NuSvc, Problem};
use crate::smo::{self, CancelCheck};
use crate::status::StatusCode;

/// Training input of a classification fit.
pub(crate) enum TrainingData<'a, 'g> {
    /// Borrowed feature vectors evaluated through a kernel function
    Dense {
        rows: Vec<&'a [f64]>,
        function: KernelFunction,
    },
    /// Caller-supplied Gram matrix
    Precomputed { gram: ArrayView2<'g, f64> },
}

struct PairOutcome {
    /// Support samples as (original index, signed coefficient)
    support: Vec<(usize, f64)>,
    rho: f64,
    code: StatusCode,
}

/// Distinct labels in ascending order, the member indices of each
/// class, and the class index of every sample.
fn group_classes(targets: &[f64]) -> (Vec<f64>, Vec<Vec<usize>>, Vec<usize>) {
    let mut classes: Vec<f64> = targets.to_vec();
    classes.sort_by(f64::total_cmp);
    classes.dedup();
    let mut members = vec![Vec::new(); classes.len()];
    let mut class_of = vec![0usize; targets.len()];
    for (i, t) in targets.iter().enumerate() {
        if let Ok(c) = classes.binary_search_by(|x| x.total_cmp(t)) {
            members[c].push(i);
            class_of[i] = c;
        }
    }
    (classes, members, class_of)
}

fn resolve_class_weight(params: &SvmParams, label: f64) -> f64 {
    params
        .class_weights
        .iter()
        .find(|(l, _)| *l == label)
        .map(|(_, w)| *w)
        .unwrap_or(1.0)
}

fn solve_pair(
    data: &TrainingData<'_, '_>,
    idx: &[usize],
    y: &[f64],
    weights: Option<&[f64]>,
    bounds: (f64, f64),
    svc: &Svc,
    params: &SvmParams,
    cancel: Option<&CancelCheck>,
) -> Result<PairOutcome> {
    let solve = |problem: &dyn Problem| match data {
        TrainingData::Dense { rows, function } => {
            let sub_rows: Vec<&[f64]> = idx.iter().map(|&i| rows[i]).collect();
            let base = DenseKernel::new(sub_rows, function.clone());
            let mut kernel = CachedKernel::with_budget(&base, params.cache_bytes);
            Ok(smo::solve(
                problem,
                &mut kernel,
                &solver_params(params, problem.size()),
                cancel,
            ))
        }
        TrainingData::Precomputed { gram } => {
            let m = idx.len();
            let mut sub = Array2::zeros((m, m));
            for (r, &i) in idx.iter().enumerate() {
                for (s, &j) in idx.iter().enumerate() {
                    sub[(r, s)] = gram[(i, j)];
                }
            }
            let mut kernel = PrecomputedKernel::new(sub.view())?;
            Ok(smo::solve(
                problem,
                &mut kernel,
                &solver_params(params, problem.size()),
                cancel,
            ))
        }
    };

    let (status, support) = match svc {
        Svc::C(c) => {
            let mut problem = CSvc::new(y, *c).with_class_bounds(*c * bounds.0, *c * bounds.1);
            if let Some(w) = weights {
                problem = problem.with_weights(w);
            }
            let status = solve(&problem)?;
            let support = support_set(&problem, &status);
            (status, support)
        }
        Svc::Nu(nu) => {
            // fold the class multipliers into the per-sample weights
            let combined: Vec<f64> = y
                .iter()
                .enumerate()
                .map(|(i, &yi)| {
                    let wi = weights.map_or(1.0, |w| w[i]);
                    wi * if yi > 0.0 { bounds.0 } else { bounds.1 }
                })
                .collect();
            let problem = NuSvc::new(y, *nu).with_weights(&combined);
            problem.check_feasible()?;
            let status = solve(&problem)?;
            let support = support_set(&problem, &status);
            (status, support)
        }
    };
    check_terminal_code(&status, params.failure_policy)?;
    Ok(PairOutcome {
        support: support
            .index
            .into_iter()
            .map(|i| idx[i])
            .zip(support.coef)
            .collect(),
        rho: status.rho,
        code: status.code,
    })
}

pub(crate) fn fit<'a>(
    data: TrainingData<'a, '_>,
    targets: &[f64],
    svc: &Svc,
    params: &SvmParams,
    cancel: Option<&CancelCheck>,
) -> Result<ClassificationModel<'a>> {
    let n = targets.len();
    let (classes, members, class_of) = group_classes(targets);
    let k = classes.len();
    if k < 2 {
        return Err(SvmError::InvalidParameter(
            "classification needs at least two distinct labels".to_string(),
        ));
    }

    let mut pairs = Vec::with_capacity(k * (k - 1) / 2);
    for ca in 0..k {
        for cb in (ca + 1)..k {
            pairs.push((ca, cb));
        }
    }

    let sample_weights = params.sample_weights.as_deref();
    let outcomes: Vec<Result<PairOutcome>> = pairs
        .par_iter()
        .map(|&(ca, cb)| {
            let idx: Vec<usize> = members[ca]
                .iter()
                .chain(members[cb].iter())
                .copied()
                .collect();
            let y: Vec<f64> = idx
                .iter()
                .map(|&i| if class_of[i] == ca { 1.0 } else { -1.0 })
                .collect();
            let w: Option<Vec<f64>> =
                sample_weights.map(|w| idx.iter().map(|&i| w[i]).collect());
            let bounds = (
                resolve_class_weight(params, classes[ca]),
                resolve_class_weight(params, classes[cb]),
            );
            solve_pair(
                &data,
                &idx,
                &y,
                w.as_deref(),
                bounds,
                svc,
                params,
                cancel,
            )
        })
        .collect();

    let mut pair_supports = Vec::with_capacity(pairs.len());
    let mut rho = Vec::with_capacity(pairs.len());
    let mut pair_codes = Vec::with_capacity(pairs.len());
    for outcome in outcomes {
        let outcome = outcome?;
        pair_supports.push(outcome.support);
        rho.push(outcome.rho);
        pair_codes.push(outcome.code);
    }

    // union of the per-machine support vectors, grouped by class
    let mut is_sv = vec![false; n];
    for support in pair_supports.iter() {
        for &(i, _) in support.iter() {
            is_sv[i] = true;
        }
    }
    let mut sv_index = Vec::new();
    let mut n_sv = vec![0usize; k];
    let mut position = vec![usize::MAX; n];
    for (c, member) in members.iter().enumerate() {
        for &i in member.iter() {
            if is_sv[i] {
                position[i] = sv_index.len();
                sv_index.push(i);
                n_sv[c] += 1;
            }
        }
    }

    let mut coef = vec![vec![0.0; sv_index.len()]; k - 1];
    for (p, &(ca, cb)) in pairs.iter().enumerate() {
        for &(i, ci) in pair_supports[p].iter() {
            let row = if class_of[i] == ca { cb - 1 } else { ca };
            coef[row][position[i]] = ci;
        }
    }

    let (function, sv) = match data {
        TrainingData::Dense { rows, function } => (
            Some(function),
            sv_index.iter().map(|&i| rows[i]).collect(),
        ),
        TrainingData::Precomputed { .. } => (None, Vec::new()),
    };

    Ok(ClassificationModel {
        function,
        classes,
        sv,
        sv_index,
        n_sv,
        coef,
        rho,
        pair_codes,
    })
}
