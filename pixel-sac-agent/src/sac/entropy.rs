//! Entropy coefficient of SAC.
use super::DEFAULT_ACTION_DIM;
use crate::opt::{Optimizer, OptimizerConfig};
use anyhow::Result;
use candle_core::{DType, Device, Tensor};
use candle_nn::{init::Init, VarBuilder, VarMap};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`Entropy`].
pub struct EntropyConfig {
    /// Dimension of the action vector.
    pub action_dim: usize,

    /// Target entropy. `-action_dim` if not given.
    #[serde(default)]
    pub target_entropy: Option<f64>,

    /// Configuration of the optimizer.
    pub opt_config: OptimizerConfig,
}

impl Default for EntropyConfig {
    fn default() -> Self {
        Self {
            action_dim: DEFAULT_ACTION_DIM,
            target_entropy: None,
            opt_config: OptimizerConfig::adam(3e-4),
        }
    }
}

impl EntropyConfig {
    /// Sets the dimension of the action vector.
    pub fn action_dim(mut self, v: usize) -> Self {
        self.action_dim = v;
        self
    }

    /// Overrides the target entropy.
    pub fn target_entropy(mut self, v: f64) -> Self {
        self.target_entropy = Some(v);
        self
    }

    /// Sets optimizer configuration.
    pub fn opt_config(mut self, v: OptimizerConfig) -> Self {
        self.opt_config = v;
        self
    }

    /// Constructs [`EntropyConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`EntropyConfig`] as YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// Learnable entropy coefficient (temperature) of SAC.
///
/// The coefficient is parametrized as `alpha = exp(log_alpha)` with `log_alpha`
/// initialized to zero. [`Entropy::alpha`] is a snapshot taken at construction;
/// [`Entropy::learn`] updates `log_alpha` only, so the snapshot stays at its
/// initial value until [`Entropy::refresh_alpha`] is called.
pub struct Entropy {
    varmap: VarMap,
    log_alpha: Tensor,
    alpha: Tensor,
    target_entropy: f64,
    opt: Optimizer,
}

impl Entropy {
    /// Constructs [`Entropy`].
    pub fn build(config: EntropyConfig, device: Device) -> Result<Self> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device).set_prefix("entropy");
        let log_alpha = vb.get_with_hints(1, "log_alpha", Init::Const(0.0))?;
        let alpha = log_alpha.detach().exp()?;
        let target_entropy = config
            .target_entropy
            .unwrap_or(-(config.action_dim as f64));
        let opt = config.opt_config.build(varmap.all_vars())?;
        info!("Built entropy coefficient: target_entropy = {}", target_entropy);

        Ok(Self {
            varmap,
            log_alpha,
            alpha,
            target_entropy,
            opt,
        })
    }

    /// Applies one optimization step on `log_alpha` given a loss.
    pub fn learn(&mut self, loss: &Tensor) -> Result<()> {
        self.opt.backward_step(loss)?;
        debug!("log_alpha updated, alpha snapshot is not refreshed");
        Ok(())
    }

    /// The entropy coefficient taken at construction or at the last
    /// [`Entropy::refresh_alpha`], of shape `(1,)`.
    pub fn alpha(&self) -> &Tensor {
        &self.alpha
    }

    /// `exp(log_alpha)` of the current parameter, detached from the graph.
    pub fn current_alpha(&self) -> Result<Tensor> {
        Ok(self.log_alpha.detach().exp()?)
    }

    /// Recomputes the snapshot returned by [`Entropy::alpha`].
    pub fn refresh_alpha(&mut self) -> Result<()> {
        self.alpha = self.current_alpha()?;
        Ok(())
    }

    /// The learnable parameter, attached to the graph.
    pub fn log_alpha(&self) -> &Tensor {
        &self.log_alpha
    }

    /// Target entropy of the temperature loss.
    pub fn target_entropy(&self) -> f64 {
        self.target_entropy
    }

    /// Parameters of the coefficient.
    pub fn varmap(&self) -> &VarMap {
        &self.varmap
    }
}
