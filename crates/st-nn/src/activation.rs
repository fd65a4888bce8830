// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Stateless activations. They carry no parameters and enter a layer list as
//! fixed functions, see [`crate::Layer::activation`].

use ndarray::{Axis, IxDyn};
use st_param::{ParamError, ParamResult, Tensor};

/// Signature shared by every activation in this module.
pub type Activation = fn(&Tensor) -> ParamResult<Tensor>;

pub fn relu(x: &Tensor) -> ParamResult<Tensor> {
    Ok(x.mapv(|v| v.max(0.0)))
}

/// `log(1 + exp(x))`, computed without overflow for large inputs.
pub fn softplus(x: &Tensor) -> ParamResult<Tensor> {
    Ok(x.mapv(|v| v.max(0.0) + (-v.abs()).exp().ln_1p()))
}

pub fn sigmoid(x: &Tensor) -> ParamResult<Tensor> {
    Ok(x.mapv(sigmoid_scalar))
}

pub(crate) fn sigmoid_scalar(v: f32) -> f32 {
    1.0 / (1.0 + (-v).exp())
}

pub fn elu(x: &Tensor) -> ParamResult<Tensor> {
    Ok(x.mapv(|v| if v > 0.0 { v } else { v.exp() - 1.0 }))
}

pub fn leaky_relu(x: &Tensor) -> ParamResult<Tensor> {
    Ok(x.mapv(|v| if v >= 0.0 { v } else { 0.01 * v }))
}

fn last_axis(x: &Tensor) -> ParamResult<Axis> {
    match x.ndim() {
        0 => Err(ParamError::InvalidValue {
            label: "activation input rank",
        }),
        ndim => Ok(Axis(ndim - 1)),
    }
}

/// Log-normalizes along the last axis.
pub fn logsoftmax(x: &Tensor) -> ParamResult<Tensor> {
    let axis = last_axis(x)?;
    let max = x
        .fold_axis(axis, f32::NEG_INFINITY, |acc, v| acc.max(*v))
        .insert_axis(axis);
    let shifted = x - &max;
    let logsumexp = shifted.mapv(f32::exp).sum_axis(axis).mapv(f32::ln).insert_axis(axis);
    Ok(&shifted - &logsumexp)
}

/// Exponentiates and normalizes along the last axis.
pub fn softmax(x: &Tensor) -> ParamResult<Tensor> {
    let axis = last_axis(x)?;
    let max = x
        .fold_axis(axis, f32::NEG_INFINITY, |acc, v| acc.max(*v))
        .insert_axis(axis);
    let unnormalized = (x - &max).mapv(f32::exp);
    let total = unnormalized.sum_axis(axis).insert_axis(axis);
    Ok(&unnormalized / &total)
}

/// Collapses every axis after the first: `(batch, ...) -> (batch, rest)`.
pub fn flatten(x: &Tensor) -> ParamResult<Tensor> {
    let Some((&batch, rest)) = x.shape().split_first() else {
        return Err(ParamError::InvalidValue {
            label: "flatten input rank",
        });
    };
    let rest: usize = rest.iter().product();
    Ok(x
        .as_standard_layout()
        .into_owned()
        .into_shape(IxDyn(&[batch, rest]))?)
}
