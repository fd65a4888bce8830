// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Process-wide configuration shared by the parameter engine and its layers.

pub mod determinism;
pub mod tracing;

pub use determinism::{config, seed_for, ParamConfig, TracePolicy};
pub use tracing::{init_tracing, init_tracing_with, InitError, TracingOptions, DEFAULT_FILTER};
