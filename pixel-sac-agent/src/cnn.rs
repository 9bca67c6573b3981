//! Convolutional feature extractor for stacked image observations.
//!
//! The architecture is the convolutional part of the network in the DQN Nature paper:
//! three strided convolutions with ReLU, followed by flattening.
//! Unlike the Atari networks of DQN, the input is not rescaled; observations are fed
//! as given.
mod base;
mod config;
pub use base::{conv_out_dim_closed_form, ConvNet};
pub use config::ConvNetConfig;
