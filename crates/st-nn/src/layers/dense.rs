// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use crate::init::{glorot_default, randn};
use crate::input;
use ndarray::{Ix2, IxDyn};
use st_param::{InitFn, ParamError, ParamResult, Parameterized, ParameterSpec, Tensor};
use std::sync::Arc;

/// Contracts the last axis of `x` with a `(in, out)` kernel.
pub(crate) fn contract_last(x: &Tensor, kernel: &Tensor) -> ParamResult<Tensor> {
    let kernel = kernel.view().into_dimensionality::<Ix2>()?;
    let Some((&features, lead)) = x.shape().split_last() else {
        return Err(ParamError::InvalidValue {
            label: "dense input rank",
        });
    };
    let rows: usize = lead.iter().product();
    let flat = x
        .as_standard_layout()
        .into_owned()
        .into_shape((rows, features))?;
    let out = flat.dot(&kernel);
    let mut shape = lead.to_vec();
    shape.push(kernel.ncols());
    Ok(out.into_shape(IxDyn(&shape))?)
}

/// Fully-connected layer with glorot kernel and small normal bias.
pub fn dense(out_dim: usize) -> ParamResult<Arc<Parameterized>> {
    dense_with(out_dim, glorot_default(), randn(1e-2))
}

/// Fully-connected layer: `x · kernel + bias`, contracting the last input axis.
///
/// The kernel is `(in, out)` where `in` is read from the last axis of the
/// example input; the bias is `(out,)`.
pub fn dense_with(
    out_dim: usize,
    kernel_init: Arc<InitFn>,
    bias_init: Arc<InitFn>,
) -> ParamResult<Arc<Parameterized>> {
    if out_dim == 0 {
        return Err(ParamError::InvalidValue {
            label: "dense output dimension",
        });
    }
    let kernel = ParameterSpec::with_shared_init(
        move |inputs: &[Tensor]| {
            let x = input(inputs, 0)?;
            match x.shape().last() {
                Some(&features) => Ok(vec![features, out_dim]),
                None => Err(ParamError::InvalidValue {
                    label: "dense input rank",
                }),
            }
        },
        kernel_init,
    );
    let bias = ParameterSpec::with_shared_init(move |_: &[Tensor]| Ok(vec![out_dim]), bias_init);
    Parameterized::builder("dense")
        .param("kernel", kernel)
        .param("bias", bias)
        .build(|args, inputs| {
            let out = contract_last(input(inputs, 0)?, args.param("kernel")?)?;
            Ok(out + args.param("bias")?)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::init::{ones, zeros};
    use ndarray::ArrayD;
    use st_param::PrngKey;

    #[test]
    fn kernel_shape_follows_last_input_axis() {
        let layer = dense(5).unwrap();
        let x = ArrayD::<f32>::zeros(IxDyn(&[4, 3]));
        let params = layer.init(PrngKey::new(0), &[x]).unwrap();
        assert_eq!(params.tensor("kernel").unwrap().shape(), &[3, 5]);
        assert_eq!(params.tensor("bias").unwrap().shape(), &[5]);
    }

    #[test]
    fn forward_handles_extra_leading_axes() {
        let layer = dense_with(2, ones(), zeros()).unwrap();
        let x = ArrayD::from_elem(IxDyn(&[2, 3, 4]), 1.0f32);
        let params = layer.init(PrngKey::new(0), &[x.clone()]).unwrap();
        let out = layer.apply(&params, &[x]).unwrap();
        assert_eq!(out.shape(), &[2, 3, 2]);
        assert!(out.iter().all(|v| *v == 4.0));
    }

    #[test]
    fn missing_input_is_reported() {
        let layer = dense(1).unwrap();
        assert!(matches!(
            layer.init(PrngKey::new(0), &[]),
            Err(ParamError::MissingInput { index: 0 })
        ));
        assert!(dense(0).is_err());
    }
}
