//! Optimizers.
use anyhow::Result;
use candle_core::{Tensor, Var};
use candle_nn::{AdamW, Optimizer as _, ParamsAdamW};
use candle_optimisers::adam::{Adam, ParamsAdam};
use serde::{Deserialize, Serialize};

/// Configuration of optimizer for training the networks of the SAC wrappers.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub enum OptimizerConfig {
    /// AdamW optimizer.
    AdamW {
        lr: f64,
        #[serde(default = "default_beta1")]
        beta1: f64,
        #[serde(default = "default_beta2")]
        beta2: f64,
        #[serde(default = "default_eps")]
        eps: f64,
        #[serde(default = "default_weight_decay")]
        weight_decay: f64,
    },

    /// Adam optimizer.
    Adam {
        /// Learning rate.
        lr: f64,

        /// Term added to the denominator for numerical stability.
        #[serde(default = "default_adam_eps")]
        eps: f64,
    },
}

fn default_beta1() -> f64 {
    ParamsAdamW::default().beta1
}

fn default_beta2() -> f64 {
    ParamsAdamW::default().beta2
}

fn default_eps() -> f64 {
    ParamsAdamW::default().eps
}

fn default_weight_decay() -> f64 {
    ParamsAdamW::default().weight_decay
}

fn default_adam_eps() -> f64 {
    ParamsAdam::default().eps
}

impl OptimizerConfig {
    /// Adam optimizer with the given learning rate and the default `eps`.
    pub fn adam(lr: f64) -> Self {
        Self::Adam {
            lr,
            eps: default_adam_eps(),
        }
    }

    /// Constructs an optimizer over the given variables.
    pub fn build(&self, vars: Vec<Var>) -> Result<Optimizer> {
        match &self {
            OptimizerConfig::AdamW {
                lr,
                beta1,
                beta2,
                eps,
                weight_decay,
            } => {
                let params = ParamsAdamW {
                    lr: *lr,
                    beta1: *beta1,
                    beta2: *beta2,
                    eps: *eps,
                    weight_decay: *weight_decay,
                };
                let opt = AdamW::new(vars, params)?;
                Ok(Optimizer::AdamW(opt))
            }
            OptimizerConfig::Adam { lr, eps } => {
                let params = ParamsAdam {
                    lr: *lr,
                    eps: *eps,
                    ..ParamsAdam::default()
                };
                let opt = Adam::new(vars, params)?;
                Ok(Optimizer::Adam(opt))
            }
        }
    }

    /// Override learning rate.
    pub fn learning_rate(self, lr: f64) -> Self {
        match self {
            Self::AdamW {
                lr: _,
                beta1,
                beta2,
                eps,
                weight_decay,
            } => Self::AdamW {
                lr,
                beta1,
                beta2,
                eps,
                weight_decay,
            },
            Self::Adam { lr: _, eps } => Self::Adam { lr, eps },
        }
    }

    /// Returns the learning rate.
    pub fn get_learning_rate(&self) -> f64 {
        match self {
            Self::AdamW { lr, .. } => *lr,
            Self::Adam { lr, .. } => *lr,
        }
    }
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self::adam(3e-4)
    }
}

/// Optimizers.
///
/// This is a thin wrapper of the optimizers in `candle-nn` and `candle-optimisers`.
pub enum Optimizer {
    /// AdamW optimizer.
    AdamW(AdamW),

    /// Adam optimizer.
    Adam(Adam),
}

impl Optimizer {
    /// Computes gradients of `loss`, then updates the variables in one step.
    ///
    /// Gradients are recomputed from scratch on every call, so there is nothing
    /// to zero beforehand.
    pub fn backward_step(&mut self, loss: &Tensor) -> Result<()> {
        match self {
            Self::AdamW(opt) => Ok(opt.backward_step(loss)?),
            Self::Adam(opt) => Ok(opt.backward_step(loss)?),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_adam_eps_defaults_when_omitted() -> Result<()> {
        let config: OptimizerConfig = serde_yaml::from_str("Adam:\n  lr: 0.001\n")?;
        assert_eq!(config, OptimizerConfig::adam(0.001));

        let config: OptimizerConfig = serde_yaml::from_str("Adam:\n  lr: 0.001\n  eps: 0.00001\n")?;
        assert_eq!(config, OptimizerConfig::Adam { lr: 0.001, eps: 1e-5 });
        Ok(())
    }

    #[test]
    fn test_adamw_step() -> Result<()> {
        let var = Var::from_tensor(&Tensor::new(&[1.0f32, -2.0], &candle_core::Device::Cpu)?)?;
        let config = OptimizerConfig::AdamW {
            lr: 0.1,
            beta1: default_beta1(),
            beta2: default_beta2(),
            eps: default_eps(),
            weight_decay: 0.0,
        };
        let mut opt = config.build(vec![var.clone()])?;

        let loss = var.as_tensor().sqr()?.sum_all()?;
        opt.backward_step(&loss)?;

        // Each element moves toward zero
        let v = var.as_tensor().to_vec1::<f32>()?;
        assert!(v[0] < 1.0 && v[0] > 0.0);
        assert!(v[1] > -2.0 && v[1] < 0.0);
        Ok(())
    }

    #[test]
    fn test_learning_rate_override() {
        let config = OptimizerConfig::Adam { lr: 0.1, eps: 1e-5 }.learning_rate(0.01);
        assert_eq!(config, OptimizerConfig::Adam { lr: 0.01, eps: 1e-5 });
        assert_eq!(config.get_learning_rate(), 0.01);
    }
}
