//! Actor of SAC agent.
use super::{ActorNet, ActorNetConfig, DEFAULT_ACTION_DIM, DEFAULT_IN_SHAPE};
use crate::{
    error::PixelSacError,
    model::SubModel1,
    opt::{Optimizer, OptimizerConfig},
    util::{bound_tensor, normal_logp, tensor_to_array2},
};
use anyhow::Result;
use candle_core::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};
use log::{info, trace};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Added inside the log of the tanh correction term to avoid `log(0)`.
const TANH_EPSILON: f64 = 1e-6;

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`Actor`].
pub struct ActorConfig {
    /// Shape of a single observation, `[channels, height, width]`.
    pub in_shape: [usize; 3],

    /// Dimension of the action vector.
    pub action_dim: usize,

    /// Lower bound of each action dimension.
    pub min_action: Vec<f32>,

    /// Upper bound of each action dimension.
    pub max_action: Vec<f32>,

    /// Number of units of the fully-connected layer of the policy network.
    pub hidden_dim: usize,

    /// Lower limit of the log standard deviation.
    pub min_log_std: f64,

    /// Upper limit of the log standard deviation.
    pub max_log_std: f64,

    /// Configuration of the optimizer.
    pub opt_config: OptimizerConfig,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            in_shape: DEFAULT_IN_SHAPE,
            action_dim: DEFAULT_ACTION_DIM,
            min_action: vec![-1.0; DEFAULT_ACTION_DIM],
            max_action: vec![1.0; DEFAULT_ACTION_DIM],
            hidden_dim: 512,
            min_log_std: -20.0,
            max_log_std: 2.0,
            opt_config: OptimizerConfig::adam(3e-4),
        }
    }
}

impl ActorConfig {
    /// Sets the shape of a single observation.
    pub fn in_shape(mut self, v: [usize; 3]) -> Self {
        self.in_shape = v;
        self
    }

    /// Sets the action dimension and the bounds of the action.
    pub fn action_bounds(mut self, min_action: Vec<f32>, max_action: Vec<f32>) -> Self {
        self.action_dim = max_action.len();
        self.min_action = min_action;
        self.max_action = max_action;
        self
    }

    /// Sets the number of units of the fully-connected layer.
    pub fn hidden_dim(mut self, v: usize) -> Self {
        self.hidden_dim = v;
        self
    }

    /// Sets optimizer configuration.
    pub fn opt_config(mut self, v: OptimizerConfig) -> Self {
        self.opt_config = v;
        self
    }

    /// Configuration of the policy network.
    pub fn net_config(&self) -> ActorNetConfig {
        ActorNetConfig {
            in_shape: self.in_shape,
            action_dim: self.action_dim,
            hidden_dim: self.hidden_dim,
            max_action: self.max_action.clone(),
            min_log_std: self.min_log_std,
            max_log_std: self.max_log_std,
        }
    }

    fn check_bounds(&self) -> Result<(), PixelSacError> {
        let bounds = [("min_action", &self.min_action), ("max_action", &self.max_action)];
        for (name, bound) in bounds.iter() {
            if bound.len() != self.action_dim {
                return Err(PixelSacError::BoundLength {
                    name: *name,
                    expected: self.action_dim,
                    actual: bound.len(),
                });
            }
        }
        Ok(())
    }

    /// Constructs [`ActorConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`ActorConfig`] as YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// Output of [`Actor::evaluate`].
///
/// All tensors have shape `(batch_size, action_dim)`.
pub struct Evaluation {
    /// `clamp(tanh(mean + std * z), min_action, max_action)`.
    pub action: Tensor,

    /// Log density of the pre-squash sample with the tanh correction, per action dimension.
    pub log_prob: Tensor,

    /// Standard normal noise used for the sample.
    pub z: Tensor,

    /// Mean of the Gaussian distribution.
    pub mean: Tensor,

    /// Standard deviation of the Gaussian distribution.
    pub std: Tensor,
}

/// Stochastic policy for SAC agents.
///
/// It owns the policy network, its optimizer and the bounds of the action.
pub struct Actor {
    device: Device,
    varmap: VarMap,

    // Dimension of the action vector.
    action_dim: usize,

    // Bounds of the action, shape (action_dim,)
    min_action: Tensor,
    max_action: Tensor,

    // Policy network
    pi: ActorNet,

    // Optimizer
    opt: Optimizer,
}

impl Actor {
    /// Constructs [`Actor`].
    pub fn build(config: ActorConfig, device: Device) -> Result<Self> {
        config.check_bounds()?;
        let varmap = VarMap::new();
        let pi = {
            let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device).set_prefix("actor");
            ActorNet::build(vb, config.net_config())?
        };
        let opt = config.opt_config.build(varmap.all_vars())?;
        let min_action = bound_tensor(&config.min_action, &device)?;
        let max_action = bound_tensor(&config.max_action, &device)?;
        info!(
            "Built actor: in_shape = {:?}, action_dim = {}, feature_dim = {}",
            config.in_shape,
            config.action_dim,
            pi.feature_dim()
        );

        Ok(Self {
            device,
            varmap,
            action_dim: config.action_dim,
            min_action,
            max_action,
            pi,
            opt,
        })
    }

    /// Returns the parameters of Gaussian distribution given an observation.
    ///
    /// The type of return values is `(mean, std)`.
    /// The shape of the both tensors is `(batch_size, action_dimension)`.
    pub fn forward(&self, obs: &Tensor) -> Result<(Tensor, Tensor)> {
        let (mean, std) = self.pi.forward(obs)?;
        debug_assert_eq!(mean.dims()[1], self.action_dim);
        debug_assert_eq!(std.dims()[1], self.action_dim);
        Ok((mean, std))
    }

    fn clamp_to_bounds(&self, act: &Tensor) -> Result<Tensor> {
        Ok(act
            .broadcast_maximum(&self.min_action)?
            .broadcast_minimum(&self.max_action)?)
    }

    /// Samples actions for interacting with an environment.
    ///
    /// An action is sampled from the Gaussian distribution and clamped to the bounds.
    /// The result is detached from the computation graph and copied to the host.
    pub fn choose_action(&self, obs: &Tensor) -> Result<Array2<f32>> {
        let (mean, std) = self.forward(obs)?;
        let eps = mean.randn_like(0., 1.)?;
        let act = (&mean + (&std * &eps)?)?;
        let act = self.clamp_to_bounds(&act.detach())?;
        tensor_to_array2(&act)
    }

    /// Samples actions with the reparameterization trick.
    ///
    /// The returned action, log probability, mean and standard deviation are
    /// connected to the parameters of the policy network.
    pub fn evaluate(&self, obs: &Tensor) -> Result<Evaluation> {
        let (mean, std) = self.forward(obs)?;
        let z = mean.randn_like(0., 1.)?;
        let u = (&mean + (&std * &z)?)?;
        let action = self.clamp_to_bounds(&u.tanh()?)?;
        let log_prob = {
            let correction = action.sqr()?.affine(-1.0, 1.0 + TANH_EPSILON)?.log()?;
            (normal_logp(&u, &mean, &std)? - correction)?
        };
        trace!("evaluate(): batch_size = {}", mean.dims()[0]);

        Ok(Evaluation {
            action,
            log_prob,
            z,
            mean,
            std,
        })
    }

    /// Applies one optimization step given a loss computed by the caller.
    pub fn learn(&mut self, loss: &Tensor) -> Result<()> {
        self.opt.backward_step(loss)
    }

    /// Dimension of the action vector.
    pub fn action_dim(&self) -> usize {
        self.action_dim
    }

    /// Lower bound of the action.
    pub fn min_action(&self) -> &Tensor {
        &self.min_action
    }

    /// Upper bound of the action.
    pub fn max_action(&self) -> &Tensor {
        &self.max_action
    }

    /// Device on which the parameters are placed.
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Parameters of the policy network.
    pub fn varmap(&self) -> &VarMap {
        &self.varmap
    }
}
