use super::ws::TAU;
use crate::kernel::Kernel;
use crate::problem::Problem;
use crate::status::Status;

/// Solves the two-variable subproblem for the selected pair and applies
/// the step: closed-form size, clipped to the box, followed by an
/// incremental gradient update over the active set.
pub fn update(
    problem: &dyn Problem,
    kernel: &mut dyn Kernel,
    idx_i: usize,
    idx_j: usize,
    status: &mut Status,
    active_set: &[usize],
) {
    let i = active_set[idx_i];
    let j = active_set[idx_j];
    let si = problem.sign(i);
    let sj = problem.sign(j);
    let cap_i = problem.bound(i);
    let cap_j = problem.bound(j);

    let a = &mut status.a;
    let g = &mut status.g;
    kernel.use_rows(&[i, j], active_set, &mut |rows: Vec<&[f64]>| {
        let ki = rows[0];
        let kj = rows[1];
        let quad = f64::max(ki[idx_i] + kj[idx_j] - 2.0 * ki[idx_j], TAU);

        let old_ai = a[i];
        let old_aj = a[j];

        if si != sj {
            let delta = (-g[i] - g[j]) / quad;
            let diff = a[i] - a[j];
            a[i] += delta;
            a[j] += delta;

            if diff > 0.0 {
                if a[j] < 0.0 {
                    a[j] = 0.0;
                    a[i] = diff;
                }
            } else if a[i] < 0.0 {
                a[i] = 0.0;
                a[j] = -diff;
            }
            if diff > cap_i - cap_j {
                if a[i] > cap_i {
                    a[i] = cap_i;
                    a[j] = cap_i - diff;
                }
            } else if a[j] > cap_j {
                a[j] = cap_j;
                a[i] = cap_j + diff;
            }
        } else {
            let delta = (g[i] - g[j]) / quad;
            let sum = a[i] + a[j];
            a[i] -= delta;
            a[j] += delta;

            if sum > cap_i {
                if a[i] > cap_i {
                    a[i] = cap_i;
                    a[j] = sum - cap_i;
                }
            } else if a[j] < 0.0 {
                a[j] = 0.0;
                a[i] = sum;
            }
            if sum > cap_j {
                if a[j] > cap_j {
                    a[j] = cap_j;
                    a[i] = sum - cap_j;
                }
            } else if a[i] < 0.0 {
                a[i] = 0.0;
                a[j] = sum;
            }
        }

        let delta_ai = a[i] - old_ai;
        let delta_aj = a[j] - old_aj;
        for (idx, &k) in active_set.iter().enumerate() {
            g[k] += problem.sign(k) * (si * delta_ai * ki[idx] + sj * delta_aj * kj[idx]);
        }
    });
}
