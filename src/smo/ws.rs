use crate::kernel::Kernel;
use crate::problem::Problem;
use crate::status::Status;

/// Floor for the curvature term of the two-variable subproblem.
pub const TAU: f64 = 1e-12;

/// Outcome of the working set selection.
pub struct Selection {
    /// Remaining violation of the optimality conditions
    pub violation: f64,
    /// Positions of the selected pair within the active set
    pub pair: Option<(usize, usize)>,
}

/// Whether variable `k` can move in the `+y_k` direction.
pub fn is_up(problem: &dyn Problem, status: &Status, k: usize) -> bool {
    if problem.sign(k) > 0.0 {
        status.a[k] < problem.bound(k)
    } else {
        status.a[k] > 0.0
    }
}

/// Whether variable `k` can move in the `-y_k` direction.
pub fn is_down(problem: &dyn Problem, status: &Status, k: usize) -> bool {
    if problem.sign(k) > 0.0 {
        status.a[k] > 0.0
    } else {
        status.a[k] < problem.bound(k)
    }
}

/// Selects a maximal-violating pair with second-order refinement of the
/// second index. Ties resolve to the lowest index.
pub fn select_working_set(
    problem: &dyn Problem,
    kernel: &mut dyn Kernel,
    status: &Status,
    active_set: &[usize],
    tol: f64,
) -> Selection {
    if problem.has_sum_constraint() {
        select_constrained(problem, kernel, status, active_set, tol)
    } else {
        select_standard(problem, kernel, status, active_set, tol)
    }
}

fn select_standard(
    problem: &dyn Problem,
    kernel: &mut dyn Kernel,
    status: &Status,
    active_set: &[usize],
    tol: f64,
) -> Selection {
    let mut m = f64::NEG_INFINITY;
    let mut idx_i: Option<usize> = None;
    let mut m_down = f64::NEG_INFINITY;
    for (idx, &k) in active_set.iter().enumerate() {
        if is_up(problem, status, k) {
            let v = -problem.sign(k) * status.g[k];
            if v > m {
                m = v;
                idx_i = Some(idx);
            }
        }
        if is_down(problem, status, k) {
            let v = problem.sign(k) * status.g[k];
            if v > m_down {
                m_down = v;
            }
        }
    }
    let violation = m + m_down;
    let idx_i = match idx_i {
        Some(idx) if violation >= tol => idx,
        _ => {
            return Selection {
                violation,
                pair: None,
            }
        }
    };

    let i = active_set[idx_i];
    let diag_i = kernel.diag(i);
    let diags: Vec<f64> = active_set.iter().map(|&k| kernel.diag(k)).collect();
    let mut best = f64::INFINITY;
    let mut idx_j: Option<usize> = None;
    kernel.use_rows(&[i], active_set, &mut |rows: Vec<&[f64]>| {
        let ki = rows[0];
        for (idx, &k) in active_set.iter().enumerate() {
            if !is_down(problem, status, k) {
                continue;
            }
            let grad_diff = m + problem.sign(k) * status.g[k];
            if grad_diff <= 0.0 {
                continue;
            }
            let quad = f64::max(diag_i + diags[idx] - 2.0 * ki[idx], TAU);
            let obj_diff = -(grad_diff * grad_diff) / quad;
            if obj_diff < best {
                best = obj_diff;
                idx_j = Some(idx);
            }
        }
    });

    Selection {
        violation,
        pair: idx_j.map(|idx_j| (idx_i, idx_j)),
    }
}

fn select_constrained(
    problem: &dyn Problem,
    kernel: &mut dyn Kernel,
    status: &Status,
    active_set: &[usize],
    tol: f64,
) -> Selection {
    // independent extrema per sign group
    let mut m_pos = f64::NEG_INFINITY;
    let mut idx_ip: Option<usize> = None;
    let mut m_pos_down = f64::NEG_INFINITY;
    let mut m_neg = f64::NEG_INFINITY;
    let mut idx_in: Option<usize> = None;
    let mut m_neg_down = f64::NEG_INFINITY;
    for (idx, &k) in active_set.iter().enumerate() {
        if problem.sign(k) > 0.0 {
            if is_up(problem, status, k) && -status.g[k] > m_pos {
                m_pos = -status.g[k];
                idx_ip = Some(idx);
            }
            if is_down(problem, status, k) && status.g[k] > m_pos_down {
                m_pos_down = status.g[k];
            }
        } else {
            if is_up(problem, status, k) && status.g[k] > m_neg {
                m_neg = status.g[k];
                idx_in = Some(idx);
            }
            if is_down(problem, status, k) && -status.g[k] > m_neg_down {
                m_neg_down = -status.g[k];
            }
        }
    }
    let violation = f64::max(m_pos + m_pos_down, m_neg + m_neg_down);
    if violation < tol {
        return Selection {
            violation,
            pair: None,
        };
    }

    let diags: Vec<f64> = active_set.iter().map(|&k| kernel.diag(k)).collect();
    let rows_of: Vec<usize> = [idx_ip, idx_in]
        .iter()
        .flatten()
        .map(|&idx| active_set[idx])
        .collect();
    let mut best = f64::INFINITY;
    let mut selected: Option<(usize, usize)> = None;
    kernel.use_rows(&rows_of, active_set, &mut |rows: Vec<&[f64]>| {
        let mut rows_it = rows.into_iter();
        let ki_pos = idx_ip.map(|_| rows_it.next().unwrap_or(&[]));
        let ki_neg = idx_in.map(|_| rows_it.next().unwrap_or(&[]));
        for (idx, &k) in active_set.iter().enumerate() {
            if !is_down(problem, status, k) {
                continue;
            }
            let (idx_i, ki, grad_diff) = if problem.sign(k) > 0.0 {
                match (idx_ip, &ki_pos) {
                    (Some(idx_i), Some(ki)) => (idx_i, *ki, m_pos + status.g[k]),
                    _ => continue,
                }
            } else {
                match (idx_in, &ki_neg) {
                    (Some(idx_i), Some(ki)) => (idx_i, *ki, m_neg - status.g[k]),
                    _ => continue,
                }
            };
            if grad_diff <= 0.0 {
                continue;
            }
            let quad = f64::max(diags[idx_i] + diags[idx] - 2.0 * ki[idx], TAU);
            let obj_diff = -(grad_diff * grad_diff) / quad;
            if obj_diff < best {
                best = obj_diff;
                selected = Some((idx_i, idx));
            }
        }
    });

    Selection {
        violation,
        pair: selected,
    }
}
