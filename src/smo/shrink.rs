use super::ws::{is_down, is_up};
use crate::kernel::Kernel;
use crate::problem::Problem;
use crate::status::Status;

/// Recomputes the gradient of all active variables from scratch.
///
/// Used for initialization and after restoring a shrunk problem; the
/// hot loop only ever updates the gradient incrementally.
pub fn recompute_gradient(
    problem: &dyn Problem,
    kernel: &mut dyn Kernel,
    status: &mut Status,
    active_set: &[usize],
) {
    let a = &status.a;
    let g = &mut status.g;
    for &k in active_set.iter() {
        g[k] = problem.linear_term(k);
    }
    for (i, &ai) in a.iter().enumerate() {
        if ai == 0.0 {
            continue;
        }
        let si = problem.sign(i);
        kernel.use_rows(&[i], active_set, &mut |rows: Vec<&[f64]>| {
            let ki = rows[0];
            for (idx, &k) in active_set.iter().enumerate() {
                g[k] += problem.sign(k) * si * ai * ki[idx];
            }
        });
    }
}

/// Restores the full variable set and brings the gradient back in sync.
pub fn unshrink(
    problem: &dyn Problem,
    kernel: &mut dyn Kernel,
    status: &mut Status,
    active_set: &mut Vec<usize>,
) {
    let n = problem.size();
    if active_set.len() == n {
        return;
    }
    let new_active_set: Vec<usize> = (0..n).collect();
    kernel.set_active(active_set, &new_active_set);
    *active_set = new_active_set;
    recompute_gradient(problem, kernel, status, active_set);
}

struct Extrema {
    up_pos: f64,
    down_pos: f64,
    up_neg: f64,
    down_neg: f64,
}

fn find_extrema(problem: &dyn Problem, status: &Status, active_set: &[usize]) -> Extrema {
    let mut ex = Extrema {
        up_pos: f64::NEG_INFINITY,
        down_pos: f64::NEG_INFINITY,
        up_neg: f64::NEG_INFINITY,
        down_neg: f64::NEG_INFINITY,
    };
    for &k in active_set.iter() {
        let g = status.g[k];
        if problem.sign(k) > 0.0 {
            if is_up(problem, status, k) {
                ex.up_pos = f64::max(ex.up_pos, -g);
            }
            if is_down(problem, status, k) {
                ex.down_pos = f64::max(ex.down_pos, g);
            }
        } else {
            if is_up(problem, status, k) {
                ex.up_neg = f64::max(ex.up_neg, g);
            }
            if is_down(problem, status, k) {
                ex.down_neg = f64::max(ex.down_neg, -g);
            }
        }
    }
    ex
}

fn is_stable(problem: &dyn Problem, status: &Status, k: usize, ex: &Extrema, nu: bool) -> bool {
    let g = status.g[k];
    let pos = problem.sign(k) > 0.0;
    if status.a[k] >= problem.bound(k) {
        if nu {
            if pos {
                -g > ex.up_pos
            } else {
                -g > ex.down_neg
            }
        } else if pos {
            -g > f64::max(ex.up_pos, ex.up_neg)
        } else {
            -g > f64::max(ex.down_pos, ex.down_neg)
        }
    } else if status.a[k] <= 0.0 {
        if nu {
            if pos {
                g > ex.down_pos
            } else {
                g > ex.up_neg
            }
        } else if pos {
            g > f64::max(ex.down_pos, ex.down_neg)
        } else {
            g > f64::max(ex.up_pos, ex.up_neg)
        }
    } else {
        false
    }
}

/// Removes variables whose bound status is provably stable from the
/// active set. Once the remaining violation falls below
/// `threshold * tol`, the full problem is restored instead and the
/// heuristic is switched off through the `no_shrink` latch.
pub fn shrink(
    problem: &dyn Problem,
    kernel: &mut dyn Kernel,
    status: &mut Status,
    active_set: &mut Vec<usize>,
    tol: f64,
    threshold: f64,
    no_shrink: &mut bool,
) {
    if *no_shrink {
        return;
    }
    let nu = problem.has_sum_constraint();
    let ex = find_extrema(problem, status, active_set);
    let violation_bound = if nu {
        f64::max(ex.up_pos + ex.down_pos, ex.up_neg + ex.down_neg)
    } else {
        f64::max(ex.up_pos, ex.up_neg) + f64::max(ex.down_pos, ex.down_neg)
    };
    if violation_bound <= threshold * tol {
        *no_shrink = true;
        unshrink(problem, kernel, status, active_set);
        return;
    }

    let new_active_set: Vec<usize> = active_set
        .iter()
        .copied()
        .filter(|&k| !is_stable(problem, status, k, &ex, nu))
        .collect();
    if new_active_set.len() < 2 || new_active_set.len() == active_set.len() {
        return;
    }
    kernel.restrict_active(active_set, &new_active_set);
    *active_set = new_active_set;
}
