// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Parameter persistence. Snapshots keep the full tree layout, so a loaded
//! [`Params`] applies to the same module declaration it was saved from.

use ndarray::{ArrayD, IxDyn};
use serde::{Deserialize, Serialize};
use st_param::{ParamError, ParamResult, Params, Tensor, Tree};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::debug;

#[derive(Clone, Debug, Serialize, Deserialize)]
struct StoredTensor {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl StoredTensor {
    fn from_tensor(tensor: &Tensor) -> StoredTensor {
        StoredTensor {
            shape: tensor.shape().to_vec(),
            data: tensor.iter().copied().collect(),
        }
    }

    fn to_tensor(&self) -> ParamResult<Tensor> {
        Ok(ArrayD::from_shape_vec(IxDyn(&self.shape), self.data.clone())?)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct ParamsSnapshot {
    module: String,
    tree: Tree<StoredTensor>,
}

fn to_snapshot(params: &Params) -> ParamsSnapshot {
    ParamsSnapshot {
        module: params.name().to_string(),
        tree: params.as_tree().map(StoredTensor::from_tensor),
    }
}

fn from_snapshot(snapshot: ParamsSnapshot) -> ParamResult<Params> {
    let tree = snapshot.tree.try_map(StoredTensor::to_tensor)?;
    Params::from_tree(snapshot.module, tree)
}

fn io_error(err: std::io::Error) -> ParamError {
    ParamError::Io {
        message: err.to_string(),
    }
}

fn serde_error(err: impl ToString) -> ParamError {
    ParamError::Serialization {
        message: err.to_string(),
    }
}

pub fn save_json<P: AsRef<Path>>(params: &Params, path: P) -> ParamResult<()> {
    let snapshot = to_snapshot(params);
    let file = File::create(path.as_ref()).map_err(io_error)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, &snapshot).map_err(serde_error)?;
    debug!(module = params.name(), path = %path.as_ref().display(), "saved parameters as json");
    Ok(())
}

pub fn load_json<P: AsRef<Path>>(path: P) -> ParamResult<Params> {
    let file = File::open(path.as_ref()).map_err(io_error)?;
    let reader = BufReader::new(file);
    let snapshot: ParamsSnapshot = serde_json::from_reader(reader).map_err(serde_error)?;
    from_snapshot(snapshot)
}

pub fn save_bincode<P: AsRef<Path>>(params: &Params, path: P) -> ParamResult<()> {
    let snapshot = to_snapshot(params);
    let file = File::create(path.as_ref()).map_err(io_error)?;
    let writer = BufWriter::new(file);
    bincode::serialize_into(writer, &snapshot).map_err(serde_error)?;
    debug!(module = params.name(), path = %path.as_ref().display(), "saved parameters as bincode");
    Ok(())
}

pub fn load_bincode<P: AsRef<Path>>(path: P) -> ParamResult<Params> {
    let file = File::open(path.as_ref()).map_err(io_error)?;
    let reader = BufReader::new(file);
    let snapshot: ParamsSnapshot = bincode::deserialize_from(reader).map_err(serde_error)?;
    from_snapshot(snapshot)
}
