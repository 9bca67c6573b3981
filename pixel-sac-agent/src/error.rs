//! Errors in the library.
use thiserror::Error;

/// Errors raised while constructing networks and wrappers.
#[derive(Error, Debug, PartialEq)]
pub enum PixelSacError {
    /// An action bound does not have one entry per action dimension.
    #[error("Length of {name} is {actual}, but action_dim is {expected}")]
    BoundLength {
        /// Name of the bound.
        name: &'static str,
        /// Action dimension.
        expected: usize,
        /// Length of the given bound.
        actual: usize,
    },

    /// The observation shape `(channels, height, width)` has no channel or is
    /// smaller than the convolution kernels.
    #[error("Invalid observation shape: {0:?}")]
    InvalidInShape([usize; 3]),

    /// The soft update coefficient is outside of `(0, 1]`.
    #[error("Soft update coefficient must be in (0, 1], got {0}")]
    InvalidTau(f64),

    /// A parameter of one network has no counterpart in the other.
    #[error("Parameter {0} is not found in the source network")]
    ParameterMismatch(String),
}
