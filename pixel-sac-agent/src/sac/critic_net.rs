//! Twin action-value network of SAC.
use super::{DEFAULT_ACTION_DIM, DEFAULT_IN_SHAPE};
use crate::{
    cnn::{ConvNet, ConvNetConfig},
    mlp::{Mlp, MlpConfig},
    model::{SubModel1, SubModel2},
};
use anyhow::Result;
use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`CriticNet`].
pub struct CriticNetConfig {
    /// Shape of a single observation, `[channels, height, width]`.
    pub in_shape: [usize; 3],

    /// Dimension of the action vector.
    pub action_dim: usize,

    /// Hidden units of the MLP on top of the convolutional features.
    pub units: Vec<usize>,
}

impl Default for CriticNetConfig {
    fn default() -> Self {
        Self {
            in_shape: DEFAULT_IN_SHAPE,
            action_dim: DEFAULT_ACTION_DIM,
            units: vec![256, 256],
        }
    }
}

/// One of the two branches of [`CriticNet`].
struct QBranch {
    conv: ConvNet,
    mlp: Mlp,
}

impl QBranch {
    fn build(vb: VarBuilder, config: &CriticNetConfig) -> Result<Self> {
        let conv = ConvNet::build(vb.pp("conv"), ConvNetConfig::new(config.in_shape))?;
        let mlp_config = MlpConfig::new(
            conv.out_dim() + config.action_dim,
            config.units.clone(),
            1,
            false,
        );
        let mlp = <Mlp as SubModel2>::build(vb.pp("mlp"), mlp_config)?;
        Ok(Self { conv, mlp })
    }

    fn forward(&self, obs: &Tensor, act: &Tensor) -> Result<Tensor> {
        let features = self.conv.forward(obs)?;
        SubModel2::forward(&self.mlp, &features, act)
    }
}

/// Twin critic on image observations.
///
/// Two branches with the same structure and independent parameters each map an
/// observation and an action to an action value. Each branch is a [`ConvNet`]
/// whose features are concatenated with the action and fed into an MLP.
pub struct CriticNet {
    device: Device,
    q1: QBranch,
    q2: QBranch,
}

impl SubModel2 for CriticNet {
    type Config = CriticNetConfig;
    type Input1 = Tensor;
    type Input2 = Tensor;
    type Output = (Tensor, Tensor);

    /// Returns `(q1, q2)`, both of shape `(batch_size, 1)`.
    fn forward(&self, obs: &Self::Input1, act: &Self::Input2) -> Result<Self::Output> {
        let obs = obs.to_device(&self.device)?;
        let act = act.to_device(&self.device)?;
        let q1 = self.q1.forward(&obs, &act)?;
        let q2 = self.q2.forward(&obs, &act)?;
        Ok((q1, q2))
    }

    fn build(vb: VarBuilder, config: Self::Config) -> Result<Self> {
        let device = vb.device().clone();
        let q1 = QBranch::build(vb.pp("q1"), &config)?;
        let q2 = QBranch::build(vb.pp("q2"), &config)?;
        Ok(Self { device, q1, q2 })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use candle_core::DType;
    use candle_nn::VarMap;

    fn config() -> CriticNetConfig {
        CriticNetConfig {
            in_shape: [1, 40, 40],
            action_dim: 2,
            units: vec![16, 16],
        }
    }

    #[test]
    fn test_forward_is_deterministic() -> Result<()> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let net = CriticNet::build(vb, config())?;

        let obs = Tensor::rand(0f32, 1f32, (3, 1, 40, 40), &Device::Cpu)?;
        let act = Tensor::rand(-1f32, 1f32, (3, 2), &Device::Cpu)?;
        let (q1, q2) = net.forward(&obs, &act)?;
        let (q1_, q2_) = net.forward(&obs, &act)?;

        assert_eq!(q1.dims(), &[3, 1]);
        assert_eq!(q2.dims(), &[3, 1]);
        assert_eq!(q1.to_vec2::<f32>()?, q1_.to_vec2::<f32>()?);
        assert_eq!(q2.to_vec2::<f32>()?, q2_.to_vec2::<f32>()?);
        Ok(())
    }

    #[test]
    fn test_branches_do_not_share_parameters() -> Result<()> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let _net = CriticNet::build(vb, config())?;

        let data = varmap.data().lock().unwrap();
        let q1: Vec<&String> = data.keys().filter(|k| k.starts_with("q1.")).collect();
        let q2: Vec<&String> = data.keys().filter(|k| k.starts_with("q2.")).collect();

        // 3 convolutions and 3 linear layers, each with weight and bias
        assert_eq!(q1.len(), 12);
        assert_eq!(q2.len(), 12);
        assert_eq!(data.len(), 24);
        for k in q1 {
            let k2 = k.replacen("q1.", "q2.", 1);
            assert!(data.contains_key(&k2));
        }
        Ok(())
    }
}
