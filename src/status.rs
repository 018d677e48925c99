use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
/// Possible outcomes of an optimization routine
pub enum StatusCode {
    /// Optimization not started
    Initialized,
    /// Solution found (up to defined tolerance)
    Optimal,
    /// Maximum number of steps reached
    MaxSteps,
    /// Time limit reached
    TimeLimit,
    /// Stopped by the callback function
    Callback,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
/// A struct containing information about the current point and state of the optimization routine
pub struct Status {
    /// Vector of coefficients (typically called α in the literature)
    pub a: Vec<f64>,
    /// Offset of the decision function: predictions subtract this value
    pub rho: f64,
    /// Margin shift of the ν-formulations (0 in the C-formulations)
    pub r: f64,
    /// Violation of the optimality conditions
    pub violation: f64,
    /// Dual objective function value
    pub value: f64,
    /// Gradient of the dual objective, kept consistent with `a`
    pub g: Vec<f64>,
    /// Current status
    pub code: StatusCode,
    /// Number of conducted steps
    pub steps: usize,
    /// Elapsed time (in seconds)
    pub time: f64,
}

impl Status {
    /// Create a [`Status`] struct with default initialization for `n` variables
    pub fn new(n: usize) -> Status {
        Status {
            a: vec![0.0; n],
            rho: 0.0,
            r: 0.0,
            violation: f64::INFINITY,
            value: 0.0,
            g: vec![0.0; n],
            code: StatusCode::Initialized,
            steps: 0,
            time: 0.0,
        }
    }
}
