// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use crate::path::IndexPath;
use thiserror::Error;

pub type ParamResult<T> = std::result::Result<T, ParamError>;

/// Failures raised while declaring, initializing, joining or applying
/// parameterized functions. None of them are retried.
#[derive(Debug, Error)]
pub enum ParamError {
    /// A value tree and a specification tree disagree in shape or keys.
    #[error("structure mismatch at `{path}`: {detail}")]
    StructureMismatch { path: IndexPath, detail: String },
    /// Reuse-only resolution found no value for a trainable leaf.
    #[error("no parameter value registered for `{path}` of module `{module}`")]
    MissingParameter { module: String, path: IndexPath },
    /// An index path does not resolve inside the tree being written.
    #[error("index path `{path}` does not resolve")]
    InvalidPath { path: IndexPath },
    /// Strict tracing finished without ever invoking a declared submodule.
    #[error("submodule `{module}` at `{path}` was never invoked during the dry run")]
    UnreachedSubmodule { module: String, path: IndexPath },
    #[error("module `{module}` declares entry `{name}` more than once")]
    DuplicateEntry { module: String, name: String },
    #[error("module `{module}` has no entry named `{name}`")]
    UnknownEntry { module: String, name: String },
    #[error("entry `{name}` is not a {expected}")]
    EntryKind { name: String, expected: &'static str },
    #[error("`{name}` cannot be called")]
    NotCallable { name: String },
    #[error("missing input #{index}")]
    MissingInput { index: usize },
    /// An initializer returned a tensor whose shape differs from the one requested.
    #[error("initializer produced shape {got:?}, expected {expected:?}")]
    InitializerShape { expected: Vec<usize>, got: Vec<usize> },
    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
    #[error("invalid value for {label}")]
    InvalidValue { label: &'static str },
    #[error("io error: {message}")]
    Io { message: String },
    #[error("serialization error: {message}")]
    Serialization { message: String },
}

impl ParamError {
    pub(crate) fn mismatch(path: &IndexPath, detail: impl Into<String>) -> Self {
        ParamError::StructureMismatch {
            path: path.clone(),
            detail: detail.into(),
        }
    }

    /// Re-anchors a path-carrying error raised inside a submodule so that it
    /// names the location relative to the enclosing module.
    pub(crate) fn within(self, prefix: &IndexPath) -> Self {
        match self {
            ParamError::StructureMismatch { path, detail } => ParamError::StructureMismatch {
                path: prefix.join(&path),
                detail,
            },
            ParamError::MissingParameter { module, path } => ParamError::MissingParameter {
                module,
                path: prefix.join(&path),
            },
            ParamError::UnreachedSubmodule { module, path } => ParamError::UnreachedSubmodule {
                module,
                path: prefix.join(&path),
            },
            other => other,
        }
    }
}
