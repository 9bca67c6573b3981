//! Utilities.
use crate::error::PixelSacError;
use anyhow::{anyhow, Result};
use candle_core::{Device, Tensor};
use candle_nn::VarMap;
use log::trace;
use ndarray::Array2;

/// Apply soft update on variables.
///
/// Variables are identified by their names. Two networks built by the same code
/// under the same prefix have the same names, so every parameter of `dest` is
/// paired with the parameter at the same structural position in `src`.
///
/// dest = tau * src + (1.0 - tau) * dest
pub fn track(dest: &VarMap, src: &VarMap, tau: f64) -> Result<()> {
    let dest = dest
        .data()
        .lock()
        .map_err(|_| anyhow!("VarMap of the destination network is poisoned"))?;
    let src = src
        .data()
        .lock()
        .map_err(|_| anyhow!("VarMap of the source network is poisoned"))?;

    for (name, v_dest) in dest.iter() {
        let v_src = src
            .get(name)
            .ok_or_else(|| PixelSacError::ParameterMismatch(name.clone()))?;
        let t_src = v_src.as_tensor().detach();
        let t_dest = v_dest.as_tensor().detach();
        let t = (t_src.affine(tau, 0.)? + t_dest.affine(1.0 - tau, 0.)?)?;
        v_dest.set(&t)?;
    }
    trace!("soft update with tau = {}", tau);

    Ok(())
}

/// Log density of `x` under the Normal distribution `N(mean, std)`, elementwise.
pub fn normal_logp(x: &Tensor, mean: &Tensor, std: &Tensor) -> Result<Tensor> {
    let log_sqrt_2pi = 0.5 * (2.0 * std::f64::consts::PI).ln();
    let var = std.sqr()?;
    let sq = (x - mean)?.sqr()?;
    let logp = ((sq / var.affine(2.0, 0.)?)?.neg()? - std.log()?)?;
    Ok(logp.affine(1.0, -log_sqrt_2pi)?)
}

/// Copies a 2-dimensional tensor to the host as [`ndarray::Array2`].
///
/// The tensor is detached from the computation graph.
pub fn tensor_to_array2(t: &Tensor) -> Result<Array2<f32>> {
    let (n_rows, n_cols) = t.dims2()?;
    let v: Vec<f32> = t.detach().to_device(&Device::Cpu)?.flatten_all()?.to_vec1()?;
    Ok(Array2::from_shape_vec((n_rows, n_cols), v)?)
}

/// Creates a 1-dimensional tensor on `device` from a bound vector.
pub fn bound_tensor(v: &[f32], device: &Device) -> Result<Tensor> {
    Ok(Tensor::from_slice(v, (v.len(),), device)?)
}

#[cfg(test)]
mod test {
    use super::*;
    use candle_core::DType;
    use candle_nn::Init;

    fn var_values(vm: &VarMap, name: &str) -> Result<Vec<f32>> {
        let data = vm.data().lock().unwrap();
        Ok(data.get(name).unwrap().as_tensor().to_vec1::<f32>()?)
    }

    #[test]
    fn test_track() -> Result<()> {
        let tau = 0.7;
        let t_src = Tensor::from_slice(&[1.0f32, 2.0, 3.0], (3,), &Device::Cpu)?;
        let t_dest = Tensor::from_slice(&[4.0f32, 5.0, 6.0], (3,), &Device::Cpu)?;

        let vm_src = {
            let vm = VarMap::new();
            vm.get((3,), "var1", Init::Const(0.), DType::F32, &Device::Cpu)?;
            vm.data().lock().unwrap().get("var1").unwrap().set(&t_src)?;
            vm
        };
        let vm_dest = {
            let vm = VarMap::new();
            vm.get((3,), "var1", Init::Const(0.), DType::F32, &Device::Cpu)?;
            vm.data().lock().unwrap().get("var1").unwrap().set(&t_dest)?;
            vm
        };
        track(&vm_dest, &vm_src, tau)?;

        let expected = [
            0.7f32 * 1.0 + 0.3 * 4.0,
            0.7 * 2.0 + 0.3 * 5.0,
            0.7 * 3.0 + 0.3 * 6.0,
        ];
        for (v, e) in var_values(&vm_dest, "var1")?.iter().zip(expected.iter()) {
            assert!((v - e).abs() < 1e-5);
        }
        // The source is left untouched
        assert_eq!(var_values(&vm_src, "var1")?, vec![1.0, 2.0, 3.0]);

        Ok(())
    }

    #[test]
    fn test_track_missing_parameter() -> Result<()> {
        let vm_src = VarMap::new();
        vm_src.get((2,), "a", Init::Const(1.), DType::F32, &Device::Cpu)?;
        let vm_dest = VarMap::new();
        vm_dest.get((2,), "b", Init::Const(0.), DType::F32, &Device::Cpu)?;

        let err = track(&vm_dest, &vm_src, 0.5).unwrap_err();
        assert_eq!(
            err.downcast_ref::<PixelSacError>(),
            Some(&PixelSacError::ParameterMismatch("b".to_string()))
        );
        Ok(())
    }

    #[test]
    fn test_normal_logp() -> Result<()> {
        let x = Tensor::new(&[[0.0f32, 1.0]], &Device::Cpu)?;
        let mean = Tensor::new(&[[0.0f32, 0.0]], &Device::Cpu)?;
        let std = Tensor::new(&[[1.0f32, 2.0]], &Device::Cpu)?;
        let logp = normal_logp(&x, &mean, &std)?.to_vec2::<f32>()?;

        let c = 0.5 * (2.0 * std::f32::consts::PI).ln();
        assert!((logp[0][0] - (-c)).abs() < 1e-5);
        assert!((logp[0][1] - (-0.125 - 2f32.ln() - c)).abs() < 1e-5);
        Ok(())
    }

    #[test]
    fn test_tensor_to_array2() -> Result<()> {
        let t = Tensor::new(&[[1.0f32, 2.0, 3.0], [4.0, 5.0, 6.0]], &Device::Cpu)?;
        let a = tensor_to_array2(&t)?;
        assert_eq!(a.shape(), &[2, 3]);
        assert_eq!(a[[1, 2]], 6.0);
        Ok(())
    }
}
