use super::ConvNetConfig;
use crate::{error::PixelSacError, model::SubModel1};
use anyhow::Result;
use candle_core::{DType::F32, Device, Tensor};
use candle_nn::{
    conv::Conv2dConfig,
    conv2d,
    sequential::{seq, Sequential},
    Module, VarBuilder,
};
use log::trace;

/// `(out_channels, kernel_size, stride)` of the convolutional layers.
const LAYERS: [(usize, usize, usize); 3] = [(32, 8, 4), (64, 4, 2), (64, 3, 1)];

/// Returns the flattened output size of [`ConvNet`] computed from the layer geometry.
///
/// Returns `None` if the input is too small for the kernels.
pub fn conv_out_dim_closed_form(in_shape: [usize; 3]) -> Option<usize> {
    let [_, mut h, mut w] = in_shape;
    for &(_, k, s) in LAYERS.iter() {
        if h < k || w < k {
            return None;
        }
        h = (h - k) / s + 1;
        w = (w - k) / s + 1;
    }
    Some(LAYERS[LAYERS.len() - 1].0 * h * w)
}

/// Convolutional feature extractor, the convolutional part of the DQN Nature network.
///
/// Maps observations of shape `(batch, channels, height, width)` to features of
/// shape `(batch, out_dim)`.
pub struct ConvNet {
    in_shape: [usize; 3],
    out_dim: usize,
    device: Device,
    seq: Sequential,
}

impl ConvNet {
    fn stride(s: usize) -> Conv2dConfig {
        Conv2dConfig {
            stride: s,
            ..Default::default()
        }
    }

    fn create_net(vb: &VarBuilder, in_channels: usize) -> Result<Sequential> {
        let (c1, k1, s1) = LAYERS[0];
        let (c2, k2, s2) = LAYERS[1];
        let (c3, k3, s3) = LAYERS[2];
        let seq = seq()
            .add(conv2d(in_channels, c1, k1, Self::stride(s1), vb.pp("c1"))?)
            .add_fn(|xs| xs.relu())
            .add(conv2d(c1, c2, k2, Self::stride(s2), vb.pp("c2"))?)
            .add_fn(|xs| xs.relu())
            .add(conv2d(c2, c3, k3, Self::stride(s3), vb.pp("c3"))?)
            .add_fn(|xs| xs.relu()?.flatten_from(1));

        Ok(seq)
    }

    /// Feeds a zero observation through `seq` and returns the number of output elements.
    fn probe_out_dim(seq: &Sequential, in_shape: [usize; 3], device: &Device) -> Result<usize> {
        let [c, h, w] = in_shape;
        let xs = Tensor::zeros((1, c, h, w), F32, device)?;
        let ys = seq.forward(&xs)?.detach();
        Ok(ys.dims().iter().product())
    }

    /// Size of the flattened feature vector of a single observation.
    pub fn out_dim(&self) -> usize {
        self.out_dim
    }

    /// Shape of a single observation, `[channels, height, width]`.
    pub fn in_shape(&self) -> [usize; 3] {
        self.in_shape
    }
}

impl SubModel1 for ConvNet {
    type Config = ConvNetConfig;
    type Input = Tensor;
    type Output = Tensor;

    fn forward(&self, xs: &Self::Input) -> Result<Tensor> {
        Ok(self.seq.forward(&xs.to_device(&self.device)?)?)
    }

    fn build(vb: VarBuilder, config: Self::Config) -> Result<Self> {
        let in_shape = config.in_shape;
        if in_shape[0] == 0 || conv_out_dim_closed_form(in_shape).is_none() {
            return Err(PixelSacError::InvalidInShape(in_shape).into());
        }
        let device = vb.device().clone();
        let seq = Self::create_net(&vb, in_shape[0])?;
        let out_dim = Self::probe_out_dim(&seq, in_shape, &device)?;
        trace!("ConvNet: in_shape = {:?}, out_dim = {}", in_shape, out_dim);

        Ok(Self {
            in_shape,
            out_dim,
            device,
            seq,
        })
    }
}
