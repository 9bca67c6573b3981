//! Critic of SAC agent.
use super::{CriticNet, CriticNetConfig, DEFAULT_ACTION_DIM, DEFAULT_IN_SHAPE};
use crate::{
    error::PixelSacError,
    model::SubModel2,
    opt::{Optimizer, OptimizerConfig},
    util::track,
};
use anyhow::Result;
use candle_core::{DType::F32, Device, Tensor};
use candle_nn::{loss::mse, VarBuilder, VarMap};
use log::{info, trace};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`Critic`].
pub struct CriticConfig {
    /// Shape of a single observation, `[channels, height, width]`.
    pub in_shape: [usize; 3],

    /// Dimension of the action vector.
    pub action_dim: usize,

    /// Hidden units of the MLP of each branch.
    pub units: Vec<usize>,

    /// Soft update coefficient.
    pub tau: f64,

    /// Configuration of the optimizer.
    pub opt_config: OptimizerConfig,
}

impl Default for CriticConfig {
    fn default() -> Self {
        Self {
            in_shape: DEFAULT_IN_SHAPE,
            action_dim: DEFAULT_ACTION_DIM,
            units: vec![256, 256],
            tau: 0.005,
            opt_config: OptimizerConfig::Adam { lr: 3e-4, eps: 1e-5 },
        }
    }
}

impl CriticConfig {
    /// Sets the shape of a single observation.
    pub fn in_shape(mut self, v: [usize; 3]) -> Self {
        self.in_shape = v;
        self
    }

    /// Sets the dimension of the action vector.
    pub fn action_dim(mut self, v: usize) -> Self {
        self.action_dim = v;
        self
    }

    /// Sets hidden units of the MLP of each branch.
    pub fn units(mut self, v: Vec<usize>) -> Self {
        self.units = v;
        self
    }

    /// Sets soft update parameter tau.
    pub fn tau(mut self, v: f64) -> Self {
        self.tau = v;
        self
    }

    /// Sets optimizer configuration.
    pub fn opt_config(mut self, v: OptimizerConfig) -> Self {
        self.opt_config = v;
        self
    }

    /// Configuration of the twin critic network.
    pub fn net_config(&self) -> CriticNetConfig {
        CriticNetConfig {
            in_shape: self.in_shape,
            action_dim: self.action_dim,
            units: self.units.clone(),
        }
    }

    /// Constructs [`CriticConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`CriticConfig`] as YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// Twin critic for SAC agents with its target network.
///
/// It takes observations and actions as inputs and outputs two action values.
/// The target network has the same structure and its own, independently
/// initialized parameters, which track the online network through [`Critic::update`].
pub struct Critic {
    tau: f64,
    device: Device,
    varmap: VarMap,
    varmap_tgt: VarMap,

    q: CriticNet,
    q_tgt: CriticNet,

    opt: Optimizer, // no optimizer for the target network
}

impl Critic {
    /// Constructs [`Critic`].
    pub fn build(config: CriticConfig, device: Device) -> Result<Self> {
        if !(config.tau > 0.0 && config.tau <= 1.0) {
            return Err(PixelSacError::InvalidTau(config.tau).into());
        }
        let (varmap, q) = Self::build_network(&config, &device)?;
        let (varmap_tgt, q_tgt) = Self::build_network(&config, &device)?;
        let opt = config.opt_config.build(varmap.all_vars())?;
        info!(
            "Built critic: in_shape = {:?}, action_dim = {}, tau = {}",
            config.in_shape, config.action_dim, config.tau
        );

        Ok(Self {
            tau: config.tau,
            device,
            varmap,
            varmap_tgt,
            q,
            q_tgt,
            opt,
        })
    }

    // The online and target networks use the same prefix, so their parameters
    // have the same names.
    fn build_network(config: &CriticConfig, device: &Device) -> Result<(VarMap, CriticNet)> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, F32, device).set_prefix("critic");
        let q = CriticNet::build(vb, config.net_config())?;
        Ok((varmap, q))
    }

    /// Returns `(q1, q2)` of the online network, both of shape `(batch_size, 1)`.
    pub fn get_q_value(&self, obs: &Tensor, act: &Tensor) -> Result<(Tensor, Tensor)> {
        self.q.forward(obs, act)
    }

    /// Returns `(q1, q2)` of the target network, both of shape `(batch_size, 1)`.
    pub fn get_target_q_value(&self, obs: &Tensor, act: &Tensor) -> Result<(Tensor, Tensor)> {
        self.q_tgt.forward(obs, act)
    }

    /// Moves the target parameters toward the online parameters.
    ///
    /// target = (1 - tau) * target + tau * online
    pub fn update(&mut self) -> Result<()> {
        track(&self.varmap_tgt, &self.varmap, self.tau)
    }

    /// Copies the online parameters into the target network.
    pub fn hard_update(&mut self) -> Result<()> {
        track(&self.varmap_tgt, &self.varmap, 1.0)
    }

    /// Regresses both online estimates on `target_q` and applies one optimization step.
    ///
    /// `target_q` is expected to be detached by the caller.
    /// Returns the sum of the two mean squared errors.
    pub fn learn(&mut self, current_q1: &Tensor, current_q2: &Tensor, target_q: &Tensor) -> Result<f32> {
        let loss = (mse(current_q1, target_q)? + mse(current_q2, target_q)?)?;
        self.opt.backward_step(&loss)?;
        let loss = loss.to_scalar::<f32>()?;
        trace!("critic loss = {}", loss);
        Ok(loss)
    }

    /// Soft update coefficient.
    pub fn tau(&self) -> f64 {
        self.tau
    }

    /// Device on which the parameters are placed.
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Parameters of the online network.
    pub fn varmap(&self) -> &VarMap {
        &self.varmap
    }

    /// Parameters of the target network.
    pub fn target_varmap(&self) -> &VarMap {
        &self.varmap_tgt
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashMap;

    fn config() -> CriticConfig {
        CriticConfig::default()
            .in_shape([1, 40, 40])
            .action_dim(2)
            .units(vec![16, 16])
    }

    fn snapshot(varmap: &VarMap) -> Result<HashMap<String, Vec<f32>>> {
        let data = varmap.data().lock().unwrap();
        let mut params = HashMap::new();
        for (k, v) in data.iter() {
            params.insert(k.clone(), v.as_tensor().flatten_all()?.to_vec1::<f32>()?);
        }
        Ok(params)
    }

    fn inputs() -> Result<(Tensor, Tensor)> {
        let obs = Tensor::rand(0f32, 1f32, (4, 1, 40, 40), &Device::Cpu)?;
        let act = Tensor::rand(-1f32, 1f32, (4, 2), &Device::Cpu)?;
        Ok((obs, act))
    }

    #[test]
    fn test_update_is_polyak_average() -> Result<()> {
        let mut critic = Critic::build(config().tau(0.1), Device::Cpu)?;
        let online = snapshot(critic.varmap())?;
        let target = snapshot(critic.target_varmap())?;
        assert_eq!(online.len(), target.len());

        critic.update()?;

        let updated = snapshot(critic.target_varmap())?;
        for (name, t_new) in updated.iter() {
            let t_old = &target[name];
            let o = &online[name];
            for ((n, t), o) in t_new.iter().zip(t_old.iter()).zip(o.iter()) {
                let expected = 0.9 * t + 0.1 * o;
                assert!((n - expected).abs() <= 1e-6 * (1.0 + expected.abs()));
            }
        }
        // The online network is not modified
        assert_eq!(snapshot(critic.varmap())?, online);
        Ok(())
    }

    #[test]
    fn test_target_is_independently_initialized() -> Result<()> {
        let critic = Critic::build(config(), Device::Cpu)?;
        let (obs, act) = inputs()?;
        let (q1, _) = critic.get_q_value(&obs, &act)?;
        let (q1_tgt, _) = critic.get_target_q_value(&obs, &act)?;
        assert_ne!(q1.to_vec2::<f32>()?, q1_tgt.to_vec2::<f32>()?);
        Ok(())
    }

    #[test]
    fn test_hard_update_copies_online() -> Result<()> {
        let mut critic = Critic::build(config(), Device::Cpu)?;
        critic.hard_update()?;
        assert_eq!(snapshot(critic.varmap())?, snapshot(critic.target_varmap())?);

        let (obs, act) = inputs()?;
        let (q1, q2) = critic.get_q_value(&obs, &act)?;
        let (q1_tgt, q2_tgt) = critic.get_target_q_value(&obs, &act)?;
        assert_eq!(q1.to_vec2::<f32>()?, q1_tgt.to_vec2::<f32>()?);
        assert_eq!(q2.to_vec2::<f32>()?, q2_tgt.to_vec2::<f32>()?);
        Ok(())
    }

    #[test]
    fn test_learn_reduces_loss() -> Result<()> {
        let mut critic = Critic::build(
            config().opt_config(OptimizerConfig::Adam { lr: 1e-3, eps: 1e-5 }),
            Device::Cpu,
        )?;
        let (obs, act) = inputs()?;
        let target_q = Tensor::ones((4, 1), F32, &Device::Cpu)?;
        let target_before = snapshot(critic.target_varmap())?;

        let mut losses = vec![];
        for _ in 0..20 {
            let (q1, q2) = critic.get_q_value(&obs, &act)?;
            losses.push(critic.learn(&q1, &q2, &target_q)?);
        }
        assert!(losses.iter().all(|l| l.is_finite()));
        assert!(losses[19] < losses[0]);
        // learn() does not touch the target network
        assert_eq!(snapshot(critic.target_varmap())?, target_before);
        Ok(())
    }

    #[test]
    fn test_invalid_tau() {
        let err = Critic::build(config().tau(0.0), Device::Cpu).err().unwrap();
        assert_eq!(
            err.downcast_ref::<PixelSacError>(),
            Some(&PixelSacError::InvalidTau(0.0))
        );
    }
}
