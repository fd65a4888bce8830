// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use crate::activation::sigmoid_scalar;
use crate::input;
use crate::layers::dense::contract_last;
use ndarray::{concatenate, ArrayD, Axis, IxDyn};
use st_param::{InitFn, ParamError, ParamResult, Parameterized, ParameterSpec, Tensor};
use std::sync::Arc;

/// Zero carry for a batch of `batch` sequences.
pub fn carry_init(batch: usize, carry_size: usize) -> Tensor {
    ArrayD::zeros(IxDyn(&[batch, carry_size]))
}

/// Gated recurrent cell.
///
/// Called as `cell(carry, x)` with `carry: (batch, carry_size)` and
/// `x: (batch, channels)`; returns the next carry, which is also the output.
/// All three gate matrices are `(channels + carry_size, carry_size)`.
pub fn gru_cell(carry_size: usize, param_init: Arc<InitFn>) -> ParamResult<Arc<Parameterized>> {
    if carry_size == 0 {
        return Err(ParamError::InvalidValue {
            label: "gru carry size",
        });
    }
    let gate = || {
        ParameterSpec::with_shared_init(
            move |inputs: &[Tensor]| {
                let x = input(inputs, 1)?;
                if x.ndim() != 2 {
                    return Err(ParamError::InvalidValue {
                        label: "gru input rank",
                    });
                }
                Ok(vec![x.shape()[1] + carry_size, carry_size])
            },
            param_init.clone(),
        )
    };
    Parameterized::builder("gru_cell")
        .param("update_params", gate())
        .param("reset_params", gate())
        .param("compute_params", gate())
        .build(|args, inputs| {
            let carry = input(inputs, 0)?;
            let x = input(inputs, 1)?;
            let both = concatenate(Axis(1), &[x.view(), carry.view()])?;
            let update = contract_last(&both, args.param("update_params")?)?.mapv(sigmoid_scalar);
            let reset = contract_last(&both, args.param("reset_params")?)?.mapv(sigmoid_scalar);
            let reset_carry = &reset * carry;
            let both_reset = concatenate(Axis(1), &[x.view(), reset_carry.view()])?;
            let compute = contract_last(&both_reset, args.param("compute_params")?)?.mapv(f32::tanh);
            Ok(&update * &compute + &update.mapv(|u| 1.0 - u) * carry)
        })
}
