//! Utilities for training networks by gradient descent.

use crate::error::{Error, Result};
use crate::network::Network;
use crate::telemetry::{StepReport, TrainingObserver};

use log::info;
use std::time::{Duration, Instant};

/// A builder for training a network on labelled examples.
#[derive(Debug)]
pub struct Trainer {
    network: Network,
    logging: Logging,
    stop_condition: StopCondition,
}

impl Trainer {
    /// Creates a new Trainer instance.
    ///
    /// The trainer is initialized with some default values. These defaults are:
    ///
    /// * Stops after 1000 training iterations.
    /// * Logs on training completion.
    ///
    /// The learning rate and loss function are those of `network`.
    pub fn new(network: Network) -> Self {
        Trainer {
            network,
            logging: Logging::Completion,
            stop_condition: StopCondition::Iterations(1000),
        }
    }

    /// Sets the type of logging to be emitted during training.
    pub fn logging(mut self, logging: Logging) -> Self {
        self.logging = logging;
        self
    }

    /// Sets the condition to finish training.
    pub fn stop_condition<C>(mut self, condition: C) -> Self
    where
        C: Into<StopCondition>,
    {
        self.stop_condition = condition.into();
        self
    }

    /// Trains the network using the provided labelled data.
    ///
    /// The provided `examples` should be a list of labelled data, where each
    /// element takes the form `(network input, expected output)`. Each
    /// iteration runs one forward and one backward pass per example.
    ///
    /// Returns:
    ///   The trained network, or an error if the examples do not fit it.
    pub fn train<I, O>(mut self, examples: &[(I, O)]) -> Result<Network>
    where
        I: AsRef<[f64]>,
        O: AsRef<[f64]>,
    {
        self.validate(examples)?;
        if examples.is_empty() {
            return Ok(self.network);
        }

        let start_time = Instant::now();
        let mut iteration = 0;
        let mut training_error;
        loop {
            training_error = 0.0;
            for (input, expected) in examples {
                self.network.run(input.as_ref())?;
                let report = self
                    .network
                    .backpropagate_with(expected.as_ref(), &mut self.logging)?;
                training_error += report.error;
            }
            training_error /= examples.len() as f64;
            iteration += 1;

            self.logging.iteration(iteration, training_error);
            if self
                .stop_condition
                .should_stop(iteration, training_error, start_time)
            {
                break;
            }
        }
        self.logging
            .completion(iteration, training_error, start_time);
        Ok(self.network)
    }

    /// Verifies that every example fits the network, returning an error if
    /// something is wrong.
    fn validate<I, O>(&self, examples: &[(I, O)]) -> Result<()>
    where
        I: AsRef<[f64]>,
        O: AsRef<[f64]>,
    {
        if self.network.layer_count() < 2 {
            return Err(Error::InvalidTopology {
                layers: self.network.layer_count(),
            });
        }
        for (input, output) in examples {
            if input.as_ref().len() != self.network.input_len() {
                return Err(Error::InputSizeMismatch {
                    expected: self.network.input_len(),
                    found: input.as_ref().len(),
                });
            }
            if output.as_ref().len() != self.network.output_len() {
                return Err(Error::TargetSizeMismatch {
                    expected: self.network.output_len(),
                    found: output.as_ref().len(),
                });
            }
        }
        Ok(())
    }
}

/// Logging frequency to use during training
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Logging {
    /// No logs will be emitted
    Silent,
    /// A summary will be logged at completion
    Completion,
    /// A summary will be logged after every `n` training iterations, along
    /// with every completed sliding error window
    Iterations(usize),
}

impl Logging {
    /// Performs logging at the current `iteration` of training.
    fn iteration(&self, iteration: usize, training_error: f64) {
        if let Logging::Iterations(freq) = *self {
            if freq > 0 && iteration % freq == 0 {
                info!("Iteration {}:\tmean loss={}", iteration, training_error);
            }
        }
    }

    /// Performs logging at the end of training.
    fn completion(&self, iterations: usize, training_error: f64, start_time: Instant) {
        if let Logging::Silent = *self {
            return;
        }
        info!(
            "Ran {} iterations in {:.3} seconds.",
            iterations,
            start_time.elapsed().as_secs_f64()
        );
        info!("Final mean loss: {}", training_error);
    }
}

impl TrainingObserver for Logging {
    fn on_step(&mut self, report: &StepReport) {
        if let (Logging::Iterations(_), Some(window)) = (*self, report.sliding_window_error) {
            info!(
                "Examples: {}\terror={}\taverage={}\twindow={}",
                report.examples_seen, report.error, report.average_error, window
            );
        }
    }
}

/// When to stop training
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum StopCondition {
    /// Stops after the provided number of training iterations
    Iterations(usize),
    /// Stops when the mean loss drops below the provided threshold
    ErrorThreshold(f64),
    /// Stops after the provided duration
    Duration(Duration),
}

impl From<Duration> for StopCondition {
    fn from(duration: Duration) -> StopCondition {
        StopCondition::Duration(duration)
    }
}

impl StopCondition {
    /// Returns true if training is complete.
    fn should_stop(&self, iteration: usize, training_error: f64, start_time: Instant) -> bool {
        match *self {
            StopCondition::Iterations(iterations) => iteration >= iterations,
            StopCondition::ErrorThreshold(threshold) => training_error < threshold,
            StopCondition::Duration(duration) => start_time.elapsed() > duration,
        }
    }
}
