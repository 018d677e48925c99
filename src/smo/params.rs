/// Parameters of the decomposition solver.
pub struct Params {
    /// Tolerance of the optimality conditions
    pub tol: f64,
    /// Maximum number of steps
    pub max_steps: usize,
    /// Logging period (number of steps between progress records, 0 = silent)
    pub verbose: usize,
    /// Shrinking period (number of steps between shrinking attempts, 0 = no shrinking)
    pub shrinking_period: usize,
    /// Once the violation falls below `shrinking_threshold * tol`, the
    /// full problem is restored and no further shrinking happens
    pub shrinking_threshold: f64,
    /// Time limit (in seconds)
    pub time_limit: f64,
}

impl Params {
    /// Creates default parameters.
    pub fn new() -> Self {
        Params {
            tol: 1e-3,
            max_steps: usize::MAX,
            verbose: 0,
            shrinking_period: 0,
            shrinking_threshold: 10.0,
            time_limit: f64::INFINITY,
        }
    }

    /// Sets the tolerance.
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Sets the step limit.
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Sets the logging period.
    pub fn with_verbose(mut self, verbose: usize) -> Self {
        self.verbose = verbose;
        self
    }

    /// Sets the shrinking period.
    pub fn with_shrinking_period(mut self, period: usize) -> Self {
        self.shrinking_period = period;
        self
    }

    /// Sets the time limit.
    pub fn with_time_limit(mut self, time_limit: f64) -> Self {
        self.time_limit = time_limit;
        self
    }
}

impl Default for Params {
    fn default() -> Self {
        Self::new()
    }
}
