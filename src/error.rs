//! Errors raised by network construction, training and persistence.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while building, running or storing a
/// network.
///
/// None of these are transient: each one is a programming or configuration
/// error detected before any state is touched.
#[derive(Error, Debug)]
pub enum Error {
    #[error("cannot backpropagate through {layers} layer(s); need an input layer and at least one computing layer")]
    InvalidTopology { layers: usize },

    #[error("the first layer of a network must be an input layer")]
    MissingInputLayer,

    #[error("the network already has an input layer")]
    DuplicateInputLayer,

    #[error("input has {found} values, input layer expects {expected}")]
    InputSizeMismatch { expected: usize, found: usize },

    #[error("target has {found} values, output layer produces {expected}")]
    TargetSizeMismatch { expected: usize, found: usize },

    #[error("genome has {found} values, network has {expected} parameters")]
    GenomeLengthMismatch { expected: usize, found: usize },

    #[error("cannot recombine genomes of length {left} and {right}")]
    GenomeMismatch { left: usize, right: usize },

    #[error("spatial extent holds {extent} values, upstream layer produces {upstream}")]
    ExtentMismatch { extent: usize, upstream: usize },

    #[error("invalid layer geometry: {0}")]
    InvalidGeometry(String),

    #[error("unsupported loss function: {0}")]
    UnsupportedLossFunction(String),

    #[error("cannot breed a new generation from an empty population")]
    EmptyPopulation,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("invalid network file: {0}")]
    InvalidFormat(String),

    #[error("network file version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}
