//! Policy network of SAC.
use super::{DEFAULT_ACTION_DIM, DEFAULT_IN_SHAPE};
use crate::{
    cnn::{ConvNet, ConvNetConfig},
    error::PixelSacError,
    model::SubModel1,
    util::bound_tensor,
};
use anyhow::Result;
use candle_core::{Device, Tensor};
use candle_nn::{linear, Linear, Module, VarBuilder};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`ActorNet`].
pub struct ActorNetConfig {
    /// Shape of a single observation, `[channels, height, width]`.
    pub in_shape: [usize; 3],

    /// Dimension of the action vector.
    pub action_dim: usize,

    /// Number of units of the fully-connected layer after the convolutions.
    pub hidden_dim: usize,

    /// Upper bound of the action, which scales the mean.
    pub max_action: Vec<f32>,

    /// Lower limit of the log standard deviation.
    pub min_log_std: f64,

    /// Upper limit of the log standard deviation.
    pub max_log_std: f64,
}

impl Default for ActorNetConfig {
    fn default() -> Self {
        Self {
            in_shape: DEFAULT_IN_SHAPE,
            action_dim: DEFAULT_ACTION_DIM,
            hidden_dim: 512,
            max_action: vec![1.0; DEFAULT_ACTION_DIM],
            min_log_std: -20.0,
            max_log_std: 2.0,
        }
    }
}

/// Gaussian policy network on image observations.
///
/// Observations go through a [`ConvNet`] and a fully-connected layer with ReLU,
/// then two linear heads output the mean and the log standard deviation of a
/// diagonal Gaussian distribution. The mean is squashed into
/// `[-max_action, max_action]` with `tanh`, the log standard deviation is clamped
/// to `[min_log_std, max_log_std]` before exponentiation.
pub struct ActorNet {
    device: Device,
    conv: ConvNet,
    fc: Linear,
    mean: Linear,
    log_std: Linear,
    max_action: Tensor,
    min_log_std: f64,
    max_log_std: f64,
}

impl ActorNet {
    /// Size of the flattened convolutional features.
    pub fn feature_dim(&self) -> usize {
        self.conv.out_dim()
    }
}

impl SubModel1 for ActorNet {
    type Config = ActorNetConfig;
    type Input = Tensor;
    type Output = (Tensor, Tensor);

    /// Returns `(mean, std)`, both of shape `(batch_size, action_dim)`.
    fn forward(&self, xs: &Self::Input) -> Result<Self::Output> {
        let xs = self.conv.forward(&xs.to_device(&self.device)?)?;
        let xs = self.fc.forward(&xs)?.relu()?;
        let mean = self.mean.forward(&xs)?.tanh()?.broadcast_mul(&self.max_action)?;
        let std = self
            .log_std
            .forward(&xs)?
            .clamp(self.min_log_std, self.max_log_std)?
            .exp()?;
        Ok((mean, std))
    }

    fn build(vb: VarBuilder, config: Self::Config) -> Result<Self> {
        if config.max_action.len() != config.action_dim {
            return Err(PixelSacError::BoundLength {
                name: "max_action",
                expected: config.action_dim,
                actual: config.max_action.len(),
            }
            .into());
        }

        let device = vb.device().clone();
        let conv = ConvNet::build(vb.pp("conv"), ConvNetConfig::new(config.in_shape))?;
        let fc = linear(conv.out_dim(), config.hidden_dim, vb.pp("fc"))?;
        let mean = linear(config.hidden_dim, config.action_dim, vb.pp("mean"))?;
        let log_std = linear(config.hidden_dim, config.action_dim, vb.pp("log_std"))?;
        let max_action = bound_tensor(&config.max_action, &device)?;

        Ok(Self {
            device,
            conv,
            fc,
            mean,
            log_std,
            max_action,
            min_log_std: config.min_log_std,
            max_log_std: config.max_log_std,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use candle_core::DType;
    use candle_nn::VarMap;

    fn build(config: ActorNetConfig) -> Result<(VarMap, ActorNet)> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let net = ActorNet::build(vb, config)?;
        Ok((varmap, net))
    }

    fn config() -> ActorNetConfig {
        ActorNetConfig {
            in_shape: [2, 48, 48],
            action_dim: 3,
            hidden_dim: 32,
            max_action: vec![2.0, 0.5, 1.0],
            ..Default::default()
        }
    }

    #[test]
    fn test_feature_dim_from_probe() -> Result<()> {
        let (_, net) = build(ActorNetConfig::default())?;
        assert_eq!(net.feature_dim(), 3136);
        Ok(())
    }

    #[test]
    fn test_mean_and_std_bounds() -> Result<()> {
        let (_, net) = build(config())?;
        let max_action = [2.0f32, 0.5, 1.0];
        let std_min = (-20f32).exp() * (1.0 - 1e-6);
        let std_max = 2f32.exp() * (1.0 + 1e-6);

        // Large inputs saturate tanh and the clamp of the log std.
        for scale in [1f32, 1e3, 1e6].iter() {
            let xs = Tensor::randn(0f32, *scale, (4, 2, 48, 48), &Device::Cpu)?;
            let (mean, std) = net.forward(&xs)?;
            assert_eq!(mean.dims(), &[4, 3]);
            assert_eq!(std.dims(), &[4, 3]);

            for row in mean.to_vec2::<f32>()? {
                for (m, b) in row.iter().zip(max_action.iter()) {
                    assert!(m.abs() <= *b);
                }
            }
            for row in std.to_vec2::<f32>()? {
                for s in row {
                    assert!(s > 0.0);
                    assert!(s >= std_min && s <= std_max);
                }
            }
        }
        Ok(())
    }

    #[test]
    fn test_max_action_length_mismatch() {
        let config = ActorNetConfig {
            max_action: vec![1.0, 1.0],
            ..config()
        };
        let err = build(config).err().unwrap();
        assert_eq!(
            err.downcast_ref::<PixelSacError>(),
            Some(&PixelSacError::BoundLength {
                name: "max_action",
                expected: 3,
                actual: 2
            })
        );
    }
}
