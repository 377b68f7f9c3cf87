//! Diagnostic error statistics gathered while training.
//!
//! Nothing here feeds back into parameter updates; observers only ever see
//! copies of the numbers.

/// Number of examples averaged by the sliding-window error.
pub const SLIDING_WINDOW_SIZE: u64 = 200;

/// What a single training step reports to an observer.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct StepReport {
    /// Training examples seen so far, including this one.
    pub examples_seen: u64,
    /// Total loss of this example.
    pub error: f64,
    /// Mean loss over every example seen.
    pub average_error: f64,
    /// Mean loss over the last `SLIDING_WINDOW_SIZE` examples, reported only
    /// when a window completes.
    pub sliding_window_error: Option<f64>,
}

/// Running error statistics of a network.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ErrorStats {
    examples_seen: u64,
    last_error: f64,
    total_error: f64,
    window_error: f64,
}

impl ErrorStats {
    /// Records the error of one example.
    pub fn record(&mut self, error: f64) -> StepReport {
        self.examples_seen += 1;
        self.last_error = error;
        self.total_error += error;
        self.window_error += error;

        let sliding_window_error = if self.examples_seen % SLIDING_WINDOW_SIZE == 0 {
            let average = self.window_error / SLIDING_WINDOW_SIZE as f64;
            self.window_error = 0.0;
            Some(average)
        } else {
            None
        };

        StepReport {
            examples_seen: self.examples_seen,
            error,
            average_error: self.average_error(),
            sliding_window_error,
        }
    }

    pub fn examples_seen(&self) -> u64 {
        self.examples_seen
    }

    pub fn last_error(&self) -> f64 {
        self.last_error
    }

    pub fn average_error(&self) -> f64 {
        if self.examples_seen == 0 {
            0.0
        } else {
            self.total_error / self.examples_seen as f64
        }
    }
}

/// Receives a report after every training step.
pub trait TrainingObserver {
    fn on_step(&mut self, report: &StepReport);
}

impl<F> TrainingObserver for F
where
    F: FnMut(&StepReport),
{
    fn on_step(&mut self, report: &StepReport) {
        self(report)
    }
}

/// The silent observer.
impl TrainingObserver for () {
    fn on_step(&mut self, _: &StepReport) {}
}
