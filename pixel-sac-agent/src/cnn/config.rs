use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`ConvNet`](super::ConvNet).
pub struct ConvNetConfig {
    /// Shape of a single observation, `[channels, height, width]`.
    pub in_shape: [usize; 3],
}

impl Default for ConvNetConfig {
    fn default() -> Self {
        Self {
            in_shape: [1, 84, 84],
        }
    }
}

impl ConvNetConfig {
    /// Creates configuration for observations of the given shape.
    pub fn new(in_shape: [usize; 3]) -> Self {
        Self { in_shape }
    }
}
