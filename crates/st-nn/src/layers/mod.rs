// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

pub mod dense;
pub mod gru;
pub mod rnn;
pub mod sequential;

pub use dense::{dense, dense_with};
pub use gru::{carry_init, gru_cell};
pub use rnn::rnn;
pub use sequential::{sequential, Layer};
