// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Parameter initializers. Each returns a shareable [`InitFn`] that draws
//! a tensor of the requested shape from the key it is handed.

use ndarray::{ArrayD, IxDyn};
use rand::Rng;
use rand_distr::StandardNormal;
use st_param::{InitFn, ParamError, ParamResult, PrngKey, Tensor};
use std::sync::Arc;

fn normal(key: PrngKey, shape: &[usize], stddev: f32) -> Tensor {
    let mut rng = key.rng();
    ArrayD::from_shape_simple_fn(IxDyn(shape), || {
        let eps: f32 = rng.sample(StandardNormal);
        eps * stddev
    })
}

/// Zero-mean normal coefficients with the given standard deviation.
pub fn randn(stddev: f32) -> Arc<InitFn> {
    Arc::new(move |key: PrngKey, shape: &[usize]| {
        if !stddev.is_finite() || stddev < 0.0 {
            return Err(ParamError::InvalidValue { label: "randn stddev" });
        }
        Ok(normal(key, shape, stddev))
    })
}

/// Normal coefficients scaled by fan-in and fan-out.
///
/// `std = scale / sqrt((fan_in + fan_out) / 2 * receptive)`, where the
/// receptive size is the product of every axis other than the two fans.
pub fn glorot(out_axis: usize, in_axis: usize, scale: f32) -> Arc<InitFn> {
    Arc::new(move |key: PrngKey, shape: &[usize]| {
        if out_axis == in_axis || out_axis >= shape.len() || in_axis >= shape.len() {
            return Err(ParamError::InvalidValue { label: "glorot axes" });
        }
        let fan_in = shape[in_axis] as f32;
        let fan_out = shape[out_axis] as f32;
        let receptive: usize = shape
            .iter()
            .enumerate()
            .filter(|(axis, _)| *axis != in_axis && *axis != out_axis)
            .map(|(_, dim)| *dim)
            .product();
        let denom = (fan_in + fan_out) / 2.0 * receptive as f32;
        let stddev = if denom > 0.0 { scale / denom.sqrt() } else { 0.0 };
        Ok(normal(key, shape, stddev))
    })
}

/// Glorot scaling for a `(in, out)` kernel with gain `sqrt(2)`.
pub fn glorot_default() -> Arc<InitFn> {
    glorot(0, 1, std::f32::consts::SQRT_2)
}

pub fn zeros() -> Arc<InitFn> {
    Arc::new(|_: PrngKey, shape: &[usize]| -> ParamResult<Tensor> { Ok(ArrayD::zeros(IxDyn(shape))) })
}

pub fn ones() -> Arc<InitFn> {
    Arc::new(|_: PrngKey, shape: &[usize]| -> ParamResult<Tensor> { Ok(ArrayD::ones(IxDyn(shape))) })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn randn_is_a_pure_function_of_the_key() {
        let init = randn(0.5);
        let a = init(PrngKey::new(3), &[4, 4]).unwrap();
        let b = init(PrngKey::new(3), &[4, 4]).unwrap();
        let c = init(PrngKey::new(4), &[4, 4]).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.shape(), &[4, 4]);
    }

    #[test]
    fn glorot_scales_down_wide_kernels() {
        let init = glorot_default();
        let narrow = init(PrngKey::new(0), &[4, 4]).unwrap();
        let wide = init(PrngKey::new(0), &[400, 400]).unwrap();
        let spread = |t: &Tensor| t.iter().map(|v| v * v).sum::<f32>() / t.len() as f32;
        assert!(spread(&wide) < spread(&narrow));
        assert!(matches!(
            glorot(0, 2, 1.0)(PrngKey::new(0), &[3, 3]),
            Err(ParamError::InvalidValue { .. })
        ));
    }

    #[test]
    fn constant_initializers_ignore_the_key() {
        assert!(zeros()(PrngKey::new(1), &[2, 3]).unwrap().iter().all(|v| *v == 0.0));
        assert!(ones()(PrngKey::new(1), &[5]).unwrap().iter().all(|v| *v == 1.0));
        assert!(randn(-1.0)(PrngKey::new(0), &[1]).is_err());
    }
}
