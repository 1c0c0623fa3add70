//! Step-level process state shared by the scheme and entities.

/// Time stepping state of a model part.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProcessInfo {
    /// Current time.
    pub time: f64,
    /// Size of the current time step.
    pub delta_time: f64,
    /// Number of steps started so far (1 during the first step).
    pub time_steps: usize,
    /// Per-step override of the Newmark beta parameter.
    pub newmark_beta: Option<f64>,
    /// Per-step override of the Newmark gamma parameter.
    pub newmark_gamma: Option<f64>,
}

impl ProcessInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while the first time step is being solved.
    pub fn is_first_step(&self) -> bool {
        self.time_steps == 1
    }
}
