// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Purely functional parameter trees.
//!
//! A [`Parameterized`] function declares what it needs (trainable tensors,
//! submodules and fixed defaults) as a [`SpecTree`]. Concrete values live in
//! a separate [`Params`] snapshot that mirrors the specification and is
//! passed explicitly to [`Parameterized::apply`]. Nothing is ever written
//! back into a module, so the same declaration can be applied to many
//! parameter snapshots and shared between several enclosing modules.
//!
//! ```ignore
//! let dense = Parameterized::builder("dense")
//!     .param("kernel", ParameterSpec::new(|x| Ok(vec![x[0].shape()[1], 4]), init))
//!     .build(|args, x| Ok(x[0].dot(args.param("kernel")?)))?;
//! let params = dense.init(PrngKey::new(0), &[example])?;
//! let out = dense.apply(&params, &[batch])?;
//! ```

pub mod error;
pub mod handle;
pub mod key;
pub mod parameterized;
pub mod params;
pub mod path;
pub mod registry;
pub mod spec;
pub mod tree;

/// Dense tensor type flowing through every parameter and forward function.
pub type Tensor = ndarray::ArrayD<f32>;

pub use error::{ParamError, ParamResult};
pub use handle::ModuleId;
pub use key::PrngKey;
pub use parameterized::{Arg, Args, Bound, ForwardFn, Parameterized, ParameterizedBuilder};
pub use params::{Params, ValueTree};
pub use path::{IndexPath, PathSegment};
pub use registry::ReuseRegistry;
pub use spec::{Fixed, FixedFn, InitFn, ParameterSpec, Shape, ShapeFn, SpecLeaf, SpecTree};
pub use spiral_config::TracePolicy;
pub use tree::Tree;
