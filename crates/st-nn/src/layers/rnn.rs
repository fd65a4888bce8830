// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use crate::input;
use crate::layers::gru::carry_init;
use ndarray::{stack, ArrayD, Axis, IxDyn};
use st_param::{ParamError, ParamResult, Parameterized};
use std::sync::Arc;

/// Scans `cell` over the time axis of a `(batch, time, channels)` input and
/// returns every step's output as `(batch, time, carry_size)`.
///
/// The carry starts at zero for each call. The cell is shared across steps,
/// so it owns one set of parameters however long the sequence is. Example
/// inputs used for `init` need at least one timestep.
pub fn rnn(cell: Arc<Parameterized>, carry_size: usize) -> ParamResult<Arc<Parameterized>> {
    Parameterized::builder("rnn")
        .module("cell", cell)
        .build(move |args, inputs| {
            let xs = input(inputs, 0)?;
            if xs.ndim() != 3 {
                return Err(ParamError::InvalidValue {
                    label: "rnn input rank",
                });
            }
            let (batch, steps) = (xs.shape()[0], xs.shape()[1]);
            if steps == 0 {
                return Ok(ArrayD::zeros(IxDyn(&[batch, 0, carry_size])));
            }
            let mut carry = carry_init(batch, carry_size);
            let mut outputs = Vec::with_capacity(steps);
            for step in xs.axis_iter(Axis(1)) {
                carry = args.call("cell", &[carry, step.to_owned()])?;
                outputs.push(carry.clone());
            }
            let views: Vec<_> = outputs.iter().map(|out| out.view()).collect();
            Ok(stack(Axis(1), &views)?)
        })
}
