// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Layers built on `st-param`.
//!
//! Every constructor here returns an `Arc<Parameterized>`: a declaration
//! with no values attached. Parameters come from `init` on example inputs
//! and are passed back explicitly on every `apply`.

pub mod activation;
pub mod init;
pub mod io;
pub mod layers;

pub use activation::{
    elu, flatten, leaky_relu, logsoftmax, relu, sigmoid, softmax, softplus, Activation,
};
pub use init::{glorot, glorot_default, ones, randn, zeros};
pub use io::{load_bincode, load_json, save_bincode, save_json};
pub use layers::{carry_init, dense, dense_with, gru_cell, rnn, sequential, Layer};

pub use st_param::{
    ParamError, ParamResult, Parameterized, Params, PrngKey, ReuseRegistry, Tensor,
};

/// Positional input `index` of a forward or shape function.
pub fn input(inputs: &[Tensor], index: usize) -> ParamResult<&Tensor> {
    inputs.get(index).ok_or(ParamError::MissingInput { index })
}
