use std::time::Instant;

use log::{debug, info};

use super::shrink::{recompute_gradient, shrink, unshrink};
use super::update::update;
use super::ws;
use super::Params;
use crate::kernel::Kernel;
use crate::problem::Problem;
use crate::status::{Status, StatusCode};

/// Cancellation hook polled once per outer iteration; returning `true`
/// aborts the solve.
pub type CancelCheck = dyn Fn(&Status) -> bool + Sync;

/// Uses the SMO method to solve the given training problem.
pub fn solve(
    problem: &dyn Problem,
    kernel: &mut dyn Kernel,
    params: &Params,
    callback: Option<&CancelCheck>,
) -> Status {
    let n = problem.size();
    let mut status = Status::new(n);
    status.a = problem.initial_point();
    let mut active_set: Vec<usize> = (0..n).collect();
    recompute_gradient(problem, kernel, &mut status, &active_set);

    let start = Instant::now();
    let mut step: usize = 0;
    let mut stop = false;
    let mut no_shrink = false;

    loop {
        // update steps and time
        status.steps = step;
        let elapsed = start.elapsed().as_secs_f64();
        status.time = elapsed;

        // handle step limit
        if step >= params.max_steps {
            status.code = StatusCode::MaxSteps;
            stop = true;
        }

        // handle time limit
        if params.time_limit > 0.0 && elapsed >= params.time_limit {
            status.code = StatusCode::TimeLimit;
            stop = true;
        }

        // handle callback
        if let Some(callback_fn) = callback {
            if callback_fn(&status) {
                status.code = StatusCode::Callback;
                stop = true;
            }
        }

        // handle shrinking
        if !stop && params.shrinking_period > 0 && step > 0 && step % params.shrinking_period == 0 {
            shrink(
                problem,
                kernel,
                &mut status,
                &mut active_set,
                params.tol,
                params.shrinking_threshold,
                &mut no_shrink,
            );
        }

        // determine working set, checking for optimality
        let mut selection =
            ws::select_working_set(problem, kernel, &status, &active_set, params.tol);
        if selection.pair.is_none() {
            // tolerance reached on the reduced problem: restore and re-check
            if active_set.len() < n {
                unshrink(problem, kernel, &mut status, &mut active_set);
                selection =
                    ws::select_working_set(problem, kernel, &status, &active_set, params.tol);
            }
            if selection.pair.is_none() && !stop {
                status.code = StatusCode::Optimal;
                stop = true;
            }
        }
        status.violation = selection.violation;

        // handle progress output
        if params.verbose > 0 && (step % params.verbose == 0 || stop) {
            debug!(
                "step {:>10} time {:>8.2} violation {:>12.6} active {:>8} / {}",
                step,
                elapsed,
                status.violation,
                active_set.len(),
                n
            );
        }

        // terminate
        if stop {
            break;
        }

        // update selected variables
        if let Some((idx_i, idx_j)) = selection.pair {
            update(problem, kernel, idx_i, idx_j, &mut status, &active_set);
            step += 1;
        }
    }

    // the final point is reported for the full variable set
    unshrink(problem, kernel, &mut status, &mut active_set);

    let (rho, r) = if problem.has_sum_constraint() {
        calculate_rho_constrained(problem, &status)
    } else {
        calculate_rho(problem, &status)
    };
    status.rho = rho;
    status.r = r;
    status.value = 0.5
        * status
            .a
            .iter()
            .enumerate()
            .map(|(i, &ai)| ai * (status.g[i] + problem.linear_term(i)))
            .sum::<f64>();
    problem.finalize(&mut status);
    status.steps = step;
    status.time = start.elapsed().as_secs_f64();
    info!(
        "solver finished with {:?} after {} steps (violation {:.6e})",
        status.code, step, status.violation
    );
    status
}

/// Offset of the decision function: average over the gradients of free
/// variables, falling back to the midpoint of the bound-derived
/// interval when no variable is free.
fn calculate_rho(problem: &dyn Problem, status: &Status) -> (f64, f64) {
    let mut nfree = 0;
    let mut sum_free = 0.0;
    let mut ub = f64::INFINITY;
    let mut lb = f64::NEG_INFINITY;
    for k in 0..problem.size() {
        let yg = problem.sign(k) * status.g[k];
        if status.a[k] >= problem.bound(k) {
            if problem.sign(k) > 0.0 {
                lb = f64::max(lb, yg);
            } else {
                ub = f64::min(ub, yg);
            }
        } else if status.a[k] <= 0.0 {
            if problem.sign(k) > 0.0 {
                ub = f64::min(ub, yg);
            } else {
                lb = f64::max(lb, yg);
            }
        } else {
            nfree += 1;
            sum_free += yg;
        }
    }
    let rho = if nfree > 0 {
        sum_free / nfree as f64
    } else {
        0.5 * (ub + lb)
    };
    (rho, 0.0)
}

/// Offsets of the ν-formulations: one average per sign group yields
/// both the decision offset and the margin shift.
fn calculate_rho_constrained(problem: &dyn Problem, status: &Status) -> (f64, f64) {
    let mut nfree = [0usize; 2];
    let mut sum_free = [0.0f64; 2];
    let mut ub = [f64::INFINITY; 2];
    let mut lb = [f64::NEG_INFINITY; 2];
    for k in 0..problem.size() {
        let side = if problem.sign(k) > 0.0 { 0 } else { 1 };
        let g = status.g[k];
        if status.a[k] >= problem.bound(k) {
            lb[side] = f64::max(lb[side], g);
        } else if status.a[k] <= 0.0 {
            ub[side] = f64::min(ub[side], g);
        } else {
            nfree[side] += 1;
            sum_free[side] += g;
        }
    }
    let avg = |side: usize| {
        if nfree[side] > 0 {
            sum_free[side] / nfree[side] as f64
        } else {
            0.5 * (ub[side] + lb[side])
        }
    };
    let (r1, r2) = (avg(0), avg(1));
    (0.5 * (r1 - r2), 0.5 * (r1 + r2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{CachedKernel, DenseKernel, KernelFunction};
    use crate::problem::{CSvc, NuSvc};
    use approx::assert_abs_diff_eq;

    const DATA: [[f64; 2]; 4] = [[0.0, 0.0], [0.0, 1.0], [2.0, 0.0], [2.0, 1.0]];
    const Y: [f64; 4] = [-1.0, -1.0, 1.0, 1.0];

    fn views(data: &[[f64; 2]]) -> Vec<&[f64]> {
        data.iter().map(|x| x.as_slice()).collect()
    }

    fn decision(problem_y: &[f64], a: &[f64], rho: f64, data: &[&[f64]], x: &[f64]) -> f64 {
        let f = KernelFunction::linear();
        a.iter()
            .zip(problem_y.iter())
            .zip(data.iter())
            .map(|((&ai, &yi), xi)| ai * yi * f.evaluate(xi, x))
            .sum::<f64>()
            - rho
    }

    #[test]
    fn test_csvc_feasibility_and_margin() {
        let c = 1.0;
        let problem = CSvc::new(&Y, c);
        let base = DenseKernel::new(views(&DATA), KernelFunction::linear());
        let mut kernel = CachedKernel::with_budget(&base, 1 << 16);
        let params = Params::new().with_tol(1e-6);
        let status = solve(&problem, &mut kernel, &params, None);

        assert_eq!(status.code, StatusCode::Optimal);
        // box constraints and equality constraint
        let mut ya = 0.0;
        for (i, &ai) in status.a.iter().enumerate() {
            assert!(ai >= 0.0 && ai <= c);
            ya += Y[i] * ai;
        }
        assert_abs_diff_eq!(ya, 0.0, epsilon = 1e-9);

        // zero training error and unit margin on free support vectors
        let data = views(&DATA);
        for (i, (xi, &yi)) in DATA.iter().zip(Y.iter()).enumerate() {
            let dec = decision(&Y, &status.a, status.rho, &data, xi.as_slice());
            assert!(dec * yi > 0.0);
            if status.a[i] > 1e-8 && status.a[i] < c - 1e-8 {
                assert_abs_diff_eq!(dec.abs(), 1.0, epsilon = 1e-4);
            }
        }
    }

    #[test]
    fn test_gradient_consistent_after_solve() {
        let problem = CSvc::new(&Y, 10.0);
        let base = DenseKernel::new(views(&DATA), KernelFunction::rbf(0.5).unwrap());
        let mut kernel = CachedKernel::with_budget(&base, 1 << 16);
        let params = Params::new().with_tol(1e-6).with_shrinking_period(2);
        let status = solve(&problem, &mut kernel, &params, None);
        assert_eq!(status.code, StatusCode::Optimal);

        // recompute the gradient from scratch
        let f = KernelFunction::rbf(0.5).unwrap();
        for k in 0..4 {
            let mut gk = -1.0;
            for j in 0..4 {
                gk += Y[k] * Y[j] * status.a[j] * f.evaluate(&DATA[j], &DATA[k]);
            }
            assert_abs_diff_eq!(status.g[k], gk, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_nusvc_separates() {
        let problem = NuSvc::new(&Y, 0.5);
        let base = DenseKernel::new(views(&DATA), KernelFunction::linear());
        let mut kernel = CachedKernel::with_budget(&base, 1 << 16);
        let params = Params::new().with_tol(1e-6);
        let status = solve(&problem, &mut kernel, &params, None);

        assert_eq!(status.code, StatusCode::Optimal);
        let data = views(&DATA);
        for (xi, &yi) in DATA.iter().zip(Y.iter()) {
            let dec = decision(&Y, &status.a, status.rho, &data, xi.as_slice());
            assert!(dec * yi > 0.0);
        }
    }

    #[test]
    fn test_callback_stops_immediately() {
        let problem = CSvc::new(&Y, 1.0);
        let base = DenseKernel::new(views(&DATA), KernelFunction::linear());
        let mut kernel = CachedKernel::with_budget(&base, 1 << 16);
        let params = Params::new().with_tol(1e-6);
        let status = solve(&problem, &mut kernel, &params, Some(&|_: &Status| true));
        assert_eq!(status.code, StatusCode::Callback);
        assert_eq!(status.steps, 0);
    }

    #[test]
    fn test_max_steps_reported() {
        let problem = CSvc::new(&Y, 1.0);
        let base = DenseKernel::new(views(&DATA), KernelFunction::linear());
        let mut kernel = CachedKernel::with_budget(&base, 1 << 16);
        let params = Params::new().with_tol(1e-6).with_max_steps(0);
        let status = solve(&problem, &mut kernel, &params, None);
        assert_eq!(status.code, StatusCode::MaxSteps);
    }
}
