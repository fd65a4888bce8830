// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use crate::error::{ParamError, ParamResult};
use crate::path::IndexPath;
use crate::tree::Tree;
use crate::Tensor;
use serde::{Deserialize, Serialize};

/// Concrete tensors mirroring a specification tree.
pub type ValueTree = Tree<Tensor>;

/// Named, ordered view over a module's top-level value tree.
///
/// Field names match the entry names declared on the module, in declaration
/// order. A `Params` is an immutable snapshot: updates produce a new value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Params {
    module: String,
    tree: ValueTree,
}

impl Params {
    pub(crate) fn from_record(module: impl Into<String>, tree: ValueTree) -> Self {
        debug_assert!(matches!(tree, Tree::Record(_)));
        Self {
            module: module.into(),
            tree,
        }
    }

    /// Wraps a record tree, e.g. one rebuilt by an optimizer step.
    pub fn from_tree(module: impl Into<String>, tree: ValueTree) -> ParamResult<Self> {
        match tree {
            Tree::Record(_) => Ok(Self::from_record(module, tree)),
            other => Err(ParamError::mismatch(
                &IndexPath::root(),
                format!("parameters must form a record, found {}", other.kind()),
            )),
        }
    }

    /// Name of the module that produced these values.
    pub fn name(&self) -> &str {
        &self.module
    }

    pub fn as_tree(&self) -> &ValueTree {
        &self.tree
    }

    pub fn into_tree(self) -> ValueTree {
        self.tree
    }

    fn entries(&self) -> &[(String, ValueTree)] {
        match &self.tree {
            Tree::Record(entries) => entries,
            _ => &[],
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries().iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ValueTree)> {
        self.entries()
            .iter()
            .map(|(name, tree)| (name.as_str(), tree))
    }

    pub fn field(&self, name: &str) -> Option<&ValueTree> {
        self.tree.field(name)
    }

    /// Shortcut for a field that holds a single tensor.
    pub fn tensor(&self, name: &str) -> Option<&Tensor> {
        self.field(name).and_then(Tree::as_leaf)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Every tensor, nested submodules included, in canonical order.
    pub fn leaves(&self) -> Vec<&Tensor> {
        self.tree.leaves()
    }

    /// Total number of scalar parameters.
    pub fn num_parameters(&self) -> usize {
        self.leaves().iter().map(|tensor| tensor.len()).sum()
    }

    /// Returns a new snapshot with every tensor transformed.
    pub fn map_tensors<F>(&self, f: F) -> Params
    where
        F: FnMut(&Tensor) -> Tensor,
    {
        Params {
            module: self.module.clone(),
            tree: self.tree.map(f),
        }
    }

    /// Returns a new snapshot with one top-level field replaced.
    pub fn with_field(&self, name: &str, value: ValueTree) -> ParamResult<Params> {
        let mut tree = self.tree.clone();
        tree.set(&IndexPath::root().child(name), value)
            .map_err(|_| ParamError::UnknownEntry {
                module: self.module.clone(),
                name: name.to_string(),
            })?;
        Ok(Params {
            module: self.module.clone(),
            tree,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{ArrayD, IxDyn};

    fn sample() -> Params {
        Params::from_tree(
            "dense",
            Tree::record([
                ("kernel", Tree::Leaf(ArrayD::from_elem(IxDyn(&[2, 3]), 1.0))),
                ("bias", Tree::Leaf(ArrayD::zeros(IxDyn(&[3])))),
            ]),
        )
        .unwrap()
    }

    #[test]
    fn fields_are_addressable_by_name_in_order() {
        let params = sample();
        assert_eq!(params.name(), "dense");
        assert_eq!(params.names().collect::<Vec<_>>(), vec!["kernel", "bias"]);
        assert_eq!(params.tensor("kernel").unwrap().shape(), &[2, 3]);
        assert!(params.tensor("missing").is_none());
        assert_eq!(params.num_parameters(), 9);
    }

    #[test]
    fn updates_produce_new_snapshots() {
        let params = sample();
        let scaled = params.map_tensors(|t| t * 2.0);
        assert!(params.tensor("kernel").unwrap().iter().all(|v| *v == 1.0));
        assert!(scaled.tensor("kernel").unwrap().iter().all(|v| *v == 2.0));

        let replaced = params
            .with_field("bias", Tree::Leaf(ArrayD::from_elem(IxDyn(&[3]), 5.0)))
            .unwrap();
        assert!(replaced.tensor("bias").unwrap().iter().all(|v| *v == 5.0));
        assert!(params.with_field("nope", Tree::empty()).is_err());
    }

    #[test]
    fn non_record_trees_are_rejected() {
        let leaf = Tree::Leaf(ArrayD::zeros(IxDyn(&[1])));
        assert!(matches!(
            Params::from_tree("x", leaf),
            Err(ParamError::StructureMismatch { .. })
        ));
    }
}
