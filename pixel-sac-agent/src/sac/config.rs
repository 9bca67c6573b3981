//! Configuration of the SAC wrappers.
use super::{ActorConfig, CriticConfig, EntropyConfig};
use crate::{opt::OptimizerConfig, Device};
use anyhow::Result;
use log::info;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`Actor`](super::Actor), [`Critic`](super::Critic) and
/// [`Entropy`](super::Entropy) of a SAC agent.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct SacConfig {
    /// Configuration of the actor.
    pub actor_config: ActorConfig,

    /// Configuration of the critic.
    pub critic_config: CriticConfig,

    /// Configuration of the entropy coefficient.
    pub entropy_config: EntropyConfig,

    /// Discount factor.
    pub gamma: f64,

    /// Device on which the networks are placed.
    #[serde(default)]
    pub device: Device,
}

impl Default for SacConfig {
    fn default() -> Self {
        Self {
            actor_config: Default::default(),
            critic_config: Default::default(),
            entropy_config: Default::default(),
            gamma: 0.99,
            device: Device::Cpu,
        }
    }
}

impl SacConfig {
    /// Sets the shape of a single observation of the actor and the critic.
    pub fn in_shape(mut self, v: [usize; 3]) -> Self {
        self.actor_config = self.actor_config.in_shape(v);
        self.critic_config = self.critic_config.in_shape(v);
        self
    }

    /// Sets the bounds of the action.
    ///
    /// The action dimension of all of the wrappers is set to `max_action.len()`.
    pub fn action_bounds(mut self, min_action: Vec<f32>, max_action: Vec<f32>) -> Self {
        let action_dim = max_action.len();
        self.actor_config = self.actor_config.action_bounds(min_action, max_action);
        self.critic_config = self.critic_config.action_dim(action_dim);
        self.entropy_config = self.entropy_config.action_dim(action_dim);
        self
    }

    /// Sets the learning rate of the actor.
    pub fn actor_lr(mut self, lr: f64) -> Self {
        self.actor_config.opt_config = self.actor_config.opt_config.learning_rate(lr);
        self
    }

    /// Sets the learning rate of the critic.
    pub fn critic_lr(mut self, lr: f64) -> Self {
        self.critic_config.opt_config = self.critic_config.opt_config.learning_rate(lr);
        self
    }

    /// Sets the learning rate of the entropy coefficient.
    pub fn entropy_lr(mut self, lr: f64) -> Self {
        self.entropy_config.opt_config = self.entropy_config.opt_config.learning_rate(lr);
        self
    }

    /// Sets soft update parameter tau of the critic.
    pub fn tau(mut self, v: f64) -> Self {
        self.critic_config = self.critic_config.tau(v);
        self
    }

    /// Sets the optimizer of all of the wrappers.
    pub fn opt_config(mut self, v: OptimizerConfig) -> Self {
        self.actor_config = self.actor_config.opt_config(v.clone());
        self.critic_config = self.critic_config.opt_config(v.clone());
        self.entropy_config = self.entropy_config.opt_config(v);
        self
    }

    /// Discount factor.
    pub fn discount_factor(mut self, v: f64) -> Self {
        self.gamma = v;
        self
    }

    /// Device.
    pub fn device(mut self, device: &candle_core::Device) -> Self {
        self.device = device.into();
        self
    }

    /// Constructs [`SacConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path_ = path.as_ref().to_owned();
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        info!("Load config of SAC agent from {}", path_.to_str().unwrap_or("?"));
        Ok(b)
    }

    /// Saves [`SacConfig`] as YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path_ = path.as_ref().to_owned();
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        info!("Save config of SAC agent into {}", path_.to_str().unwrap_or("?"));
        Ok(())
    }
}
