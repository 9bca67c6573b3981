//! Soft actor-critic (SAC) networks and wrappers for image observations.
//!
//! [`Actor`], [`Critic`] and [`Entropy`] each own their networks and optimizer.
//! A training loop outside of this crate drives them: it samples actions with
//! [`Actor::choose_action`], computes losses (for example with the functions in
//! [`loss`]) and applies one optimization step with `learn`.
mod actor;
mod actor_net;
mod config;
mod critic;
mod critic_net;
mod entropy;
pub mod loss;
pub use actor::{Actor, ActorConfig, Evaluation};
pub use actor_net::{ActorNet, ActorNetConfig};
pub use config::SacConfig;
pub use critic::{Critic, CriticConfig};
pub use critic_net::{CriticNet, CriticNetConfig};
pub use entropy::{Entropy, EntropyConfig};

/// Default shape of a single observation: one grayscale 84x84 frame.
pub const DEFAULT_IN_SHAPE: [usize; 3] = [1, 84, 84];

/// Default dimension of the action vector.
pub const DEFAULT_ACTION_DIM: usize = 5;
