//! Layered neural networks trainable by backpropagation and by evolving a
//! flat genome of their parameters.

pub mod activator;
pub mod error;
pub mod genetics;
pub mod genome;
pub mod io;
pub mod layers;
pub mod loss;
pub mod network;
pub mod source;
pub mod telemetry;
pub mod trainer;

mod volume;

pub use crate::activator::Activator;
pub use crate::error::{Error, Result};
pub use crate::genetics::{crossover, mutate, EvolutionConfig};
pub use crate::genome::{Genome, ParameterProvider};
pub use crate::layers::{Extent, Layer, LayerSpec, LayerType};
pub use crate::loss::LossFunction;
pub use crate::network::{LayerStack, Network};
pub use crate::telemetry::{ErrorStats, StepReport, TrainingObserver};
pub use crate::trainer::{Logging, StopCondition, Trainer};
pub use crate::volume::Volume;
