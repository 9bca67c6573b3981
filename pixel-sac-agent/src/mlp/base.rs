use super::MlpConfig;
use crate::model::{SubModel1, SubModel2};
use anyhow::Result;
use candle_core::{Device, Tensor, D};
use candle_nn::{linear, Linear, Module, VarBuilder};

/// Returns vector of linear modules from [`MlpConfig`].
fn create_linear_layers(vb: &VarBuilder, config: &MlpConfig) -> Result<Vec<Linear>> {
    let mut dims = vec![config.in_dim];
    dims.extend(config.units.iter().copied());
    dims.push(config.out_dim);

    dims.windows(2)
        .enumerate()
        .map(|(i, w)| linear(w[0], w[1], vb.pp(format!("ln{}", i))).map_err(Into::into))
        .collect()
}

/// Multilayer perceptron with ReLU activation function.
pub struct Mlp {
    config: MlpConfig,
    device: Device,
    layers: Vec<Linear>,
}

impl Mlp {
    fn mlp_forward(&self, xs: Tensor) -> Result<Tensor> {
        let n_layers = self.layers.len();
        let mut xs = xs;

        for (i, layer) in self.layers.iter().enumerate() {
            xs = layer.forward(&xs)?;
            if i + 1 < n_layers || self.config.activation_out {
                xs = xs.relu()?;
            }
        }

        Ok(xs)
    }

    fn _build(vb: VarBuilder, config: MlpConfig) -> Result<Self> {
        let device = vb.device().clone();
        let layers = create_linear_layers(&vb, &config)?;

        Ok(Self {
            config,
            device,
            layers,
        })
    }
}

impl SubModel1 for Mlp {
    type Config = MlpConfig;
    type Input = Tensor;
    type Output = Tensor;

    fn forward(&self, xs: &Self::Input) -> Result<Tensor> {
        self.mlp_forward(xs.to_device(&self.device)?)
    }

    fn build(vb: VarBuilder, config: Self::Config) -> Result<Self> {
        Self::_build(vb, config)
    }
}

/// Concatenates the two inputs along the last axis before the first layer.
impl SubModel2 for Mlp {
    type Config = MlpConfig;
    type Input1 = Tensor;
    type Input2 = Tensor;
    type Output = Tensor;

    fn forward(&self, input1: &Self::Input1, input2: &Self::Input2) -> Result<Self::Output> {
        let input1 = input1.to_device(&self.device)?;
        let input2 = input2.to_device(&self.device)?;
        let input = Tensor::cat(&[input1, input2], D::Minus1)?;
        self.mlp_forward(input)
    }

    fn build(vb: VarBuilder, config: Self::Config) -> Result<Self> {
        Self::_build(vb, config)
    }
}
