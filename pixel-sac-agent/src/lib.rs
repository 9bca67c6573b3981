//! Soft actor-critic (SAC) networks for image observations, implemented with
//! [candle](https://crates.io/crates/candle-core).
//!
//! The crate provides the networks ([`sac::ActorNet`], [`sac::CriticNet`]) and thin
//! training wrappers ([`sac::Actor`], [`sac::Critic`], [`sac::Entropy`]) of a SAC agent.
//! Losses are computed by the caller; [`sac::loss`] contains the usual SAC losses
//! for convenience.
pub mod cnn;
pub mod error;
pub mod mlp;
pub mod model;
pub mod opt;
pub mod sac;
pub mod util;
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;

#[derive(Clone, Debug, Copy, Deserialize, Serialize, PartialEq)]
/// Device for using candle.
///
/// This enum is added because [`candle_core::Device`] does not support serialization.
pub enum Device {
    /// The main CPU device.
    Cpu,

    /// A CUDA device with the given ordinal.
    Cuda(usize),

    /// A Metal device with the given ordinal.
    Metal(usize),
}

impl Default for Device {
    fn default() -> Self {
        Self::Cpu
    }
}

impl From<&candle_core::Device> for Device {
    fn from(device: &candle_core::Device) -> Self {
        match device.location() {
            candle_core::DeviceLocation::Cpu => Self::Cpu,
            candle_core::DeviceLocation::Cuda { gpu_id } => Self::Cuda(gpu_id),
            candle_core::DeviceLocation::Metal { gpu_id } => Self::Metal(gpu_id),
        }
    }
}

impl TryFrom<Device> for candle_core::Device {
    type Error = candle_core::Error;

    fn try_from(device: Device) -> Result<Self, Self::Error> {
        match device {
            Device::Cpu => Ok(candle_core::Device::Cpu),
            Device::Cuda(n) => candle_core::Device::new_cuda(n),
            Device::Metal(n) => candle_core::Device::new_metal(n),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_device_conversion() -> anyhow::Result<()> {
        let device = candle_core::Device::try_from(Device::Cpu)?;
        assert!(device.is_cpu());
        assert_eq!(Device::from(&device), Device::Cpu);

        let yaml = serde_yaml::to_string(&Device::Cuda(1))?;
        let device: Device = serde_yaml::from_str(&yaml)?;
        assert_eq!(device, Device::Cuda(1));
        Ok(())
    }
}
