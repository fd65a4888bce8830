// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Generic nested containers shared by specification and value trees.
//!
//! Every traversal visits record fields in declaration order and sequence
//! elements in index order. Key splitting during initialization follows this
//! order, so changing it changes every initialized parameter.

use crate::error::{ParamError, ParamResult};
use crate::path::{IndexPath, PathSegment};
use serde::{Deserialize, Serialize};

/// Ordered, arbitrarily nested container with typed leaves.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Tree<T> {
    Leaf(T),
    /// Named children kept in declaration order.
    Record(Vec<(String, Tree<T>)>),
    /// Positional children.
    Seq(Vec<Tree<T>>),
}

impl<T> Tree<T> {
    /// An empty record; the value of anything that owns no parameters.
    pub fn empty() -> Self {
        Tree::Record(Vec::new())
    }

    pub fn record<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Tree<T>)>,
        K: Into<String>,
    {
        Tree::Record(
            entries
                .into_iter()
                .map(|(key, child)| (key.into(), child))
                .collect(),
        )
    }

    pub fn seq<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Tree<T>>,
    {
        Tree::Seq(items.into_iter().collect())
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Tree::Leaf(_))
    }

    /// Returns `true` for records and sequences without children.
    pub fn is_empty_container(&self) -> bool {
        match self {
            Tree::Leaf(_) => false,
            Tree::Record(entries) => entries.is_empty(),
            Tree::Seq(items) => items.is_empty(),
        }
    }

    pub fn as_leaf(&self) -> Option<&T> {
        match self {
            Tree::Leaf(value) => Some(value),
            _ => None,
        }
    }

    /// Looks up a record field by name.
    pub fn field(&self, name: &str) -> Option<&Tree<T>> {
        match self {
            Tree::Record(entries) => entries
                .iter()
                .find(|entry| entry.0 == name)
                .map(|entry| &entry.1),
            _ => None,
        }
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Tree::Leaf(_) => "leaf",
            Tree::Record(_) => "record",
            Tree::Seq(_) => "sequence",
        }
    }

    /// Produces a tree of identical shape with every leaf replaced by `f(leaf)`.
    pub fn map<U, F>(&self, mut f: F) -> Tree<U>
    where
        F: FnMut(&T) -> U,
    {
        self.map_with(&mut f)
    }

    fn map_with<U, F>(&self, f: &mut F) -> Tree<U>
    where
        F: FnMut(&T) -> U,
    {
        match self {
            Tree::Leaf(value) => Tree::Leaf(f(value)),
            Tree::Record(entries) => Tree::Record(
                entries
                    .iter()
                    .map(|(key, child)| (key.clone(), child.map_with(f)))
                    .collect(),
            ),
            Tree::Seq(items) => Tree::Seq(items.iter().map(|child| child.map_with(f)).collect()),
        }
    }

    /// Fallible [`Tree::map`]; stops at the first error in traversal order.
    pub fn try_map<U, E, F>(&self, mut f: F) -> Result<Tree<U>, E>
    where
        F: FnMut(&T) -> Result<U, E>,
    {
        self.try_flat_map_with(&mut |value| f(value).map(Tree::Leaf))
    }

    /// Replaces every leaf by a whole subtree. Used where one kind of leaf
    /// (a submodule) expands into a nested record on the other side.
    pub fn try_flat_map<U, E, F>(&self, mut f: F) -> Result<Tree<U>, E>
    where
        F: FnMut(&T) -> Result<Tree<U>, E>,
    {
        self.try_flat_map_with(&mut f)
    }

    fn try_flat_map_with<U, E, F>(&self, f: &mut F) -> Result<Tree<U>, E>
    where
        F: FnMut(&T) -> Result<Tree<U>, E>,
    {
        match self {
            Tree::Leaf(value) => f(value),
            Tree::Record(entries) => {
                let mut out = Vec::with_capacity(entries.len());
                for (key, child) in entries {
                    out.push((key.clone(), child.try_flat_map_with(f)?));
                }
                Ok(Tree::Record(out))
            }
            Tree::Seq(items) => {
                let mut out = Vec::with_capacity(items.len());
                for child in items {
                    out.push(child.try_flat_map_with(f)?);
                }
                Ok(Tree::Seq(out))
            }
        }
    }

    /// Pairs every leaf with its index path.
    pub fn enumerate(&self) -> Tree<(IndexPath, &T)> {
        self.enumerate_from(&IndexPath::root())
    }

    fn enumerate_from(&self, path: &IndexPath) -> Tree<(IndexPath, &T)> {
        match self {
            Tree::Leaf(value) => Tree::Leaf((path.clone(), value)),
            Tree::Record(entries) => Tree::Record(
                entries
                    .iter()
                    .map(|(key, child)| {
                        (key.clone(), child.enumerate_from(&path.child(key.as_str())))
                    })
                    .collect(),
            ),
            Tree::Seq(items) => Tree::Seq(
                items
                    .iter()
                    .enumerate()
                    .map(|(index, child)| child.enumerate_from(&path.child(index)))
                    .collect(),
            ),
        }
    }

    /// Structural zip. A leaf of `self` pairs with the entire corresponding
    /// subtree of `other`; containers must agree in kind, length and keys.
    pub fn zip<'a, U>(&'a self, other: &'a Tree<U>) -> ParamResult<Tree<(&'a T, &'a Tree<U>)>> {
        self.zip_at(other, &IndexPath::root())
    }

    fn zip_at<'a, U>(
        &'a self,
        other: &'a Tree<U>,
        path: &IndexPath,
    ) -> ParamResult<Tree<(&'a T, &'a Tree<U>)>> {
        match (self, other) {
            (Tree::Leaf(value), _) => Ok(Tree::Leaf((value, other))),
            (Tree::Record(lhs), Tree::Record(rhs)) => {
                if lhs.len() != rhs.len() {
                    return Err(ParamError::mismatch(
                        path,
                        format!("expected {} fields, found {}", lhs.len(), rhs.len()),
                    ));
                }
                let mut out = Vec::with_capacity(lhs.len());
                for ((lkey, lchild), (rkey, rchild)) in lhs.iter().zip(rhs.iter()) {
                    if lkey != rkey {
                        return Err(ParamError::mismatch(
                            path,
                            format!("expected field `{lkey}`, found `{rkey}`"),
                        ));
                    }
                    let child = lchild.zip_at(rchild, &path.child(lkey.as_str()))?;
                    out.push((lkey.clone(), child));
                }
                Ok(Tree::Record(out))
            }
            (Tree::Seq(lhs), Tree::Seq(rhs)) => {
                if lhs.len() != rhs.len() {
                    return Err(ParamError::mismatch(
                        path,
                        format!("expected {} elements, found {}", lhs.len(), rhs.len()),
                    ));
                }
                let mut out = Vec::with_capacity(lhs.len());
                for (index, (lchild, rchild)) in lhs.iter().zip(rhs.iter()).enumerate() {
                    out.push(lchild.zip_at(rchild, &path.child(index))?);
                }
                Ok(Tree::Seq(out))
            }
            (lhs, rhs) => Err(ParamError::mismatch(
                path,
                format!("expected {}, found {}", lhs.kind(), rhs.kind()),
            )),
        }
    }

    /// Resolves `path` to the node it addresses.
    pub fn get(&self, path: &IndexPath) -> ParamResult<&Tree<T>> {
        let mut node = self;
        for segment in path.segments() {
            node = match (node, segment) {
                (Tree::Record(entries), PathSegment::Name(name)) => entries
                    .iter()
                    .find(|entry| entry.0 == *name)
                    .map(|entry| &entry.1),
                (Tree::Seq(items), PathSegment::Index(index)) => items.get(*index),
                _ => None,
            }
            .ok_or_else(|| ParamError::InvalidPath { path: path.clone() })?;
        }
        Ok(node)
    }

    pub fn get_mut(&mut self, path: &IndexPath) -> ParamResult<&mut Tree<T>> {
        let mut node = self;
        for segment in path.segments() {
            node = match (node, segment) {
                (Tree::Record(entries), PathSegment::Name(name)) => entries
                    .iter_mut()
                    .find(|entry| entry.0 == *name)
                    .map(|entry| &mut entry.1),
                (Tree::Seq(items), PathSegment::Index(index)) => items.get_mut(*index),
                _ => None,
            }
            .ok_or_else(|| ParamError::InvalidPath { path: path.clone() })?;
        }
        Ok(node)
    }

    /// Replaces the node at `path`. The location must already exist.
    pub fn set(&mut self, path: &IndexPath, value: Tree<T>) -> ParamResult<()> {
        let slot = self.get_mut(path)?;
        *slot = value;
        Ok(())
    }

    /// Short-circuiting existence test over the leaves.
    pub fn any<F>(&self, mut predicate: F) -> bool
    where
        F: FnMut(&T) -> bool,
    {
        self.any_with(&mut predicate)
    }

    fn any_with<F>(&self, predicate: &mut F) -> bool
    where
        F: FnMut(&T) -> bool,
    {
        match self {
            Tree::Leaf(value) => predicate(value),
            Tree::Record(entries) => entries.iter().any(|(_, child)| child.any_with(predicate)),
            Tree::Seq(items) => items.iter().any(|child| child.any_with(predicate)),
        }
    }

    /// Leaves in canonical pre-order.
    pub fn leaves(&self) -> Vec<&T> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a T>) {
        match self {
            Tree::Leaf(value) => out.push(value),
            Tree::Record(entries) => {
                for (_, child) in entries {
                    child.collect_leaves(out);
                }
            }
            Tree::Seq(items) => {
                for child in items {
                    child.collect_leaves(out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Tree<i32> {
        Tree::record([
            ("a", Tree::Leaf(1)),
            ("b", Tree::seq([Tree::Leaf(2), Tree::record([("c", Tree::Leaf(3))])])),
            ("d", Tree::empty()),
        ])
    }

    #[test]
    fn map_preserves_shape_and_empty_containers() {
        let doubled = sample().map(|v| v * 2);
        assert_eq!(
            doubled,
            Tree::record([
                ("a", Tree::Leaf(2)),
                ("b", Tree::seq([Tree::Leaf(4), Tree::record([("c", Tree::Leaf(6))])])),
                ("d", Tree::empty()),
            ])
        );
    }

    #[test]
    fn leaves_follow_declaration_then_index_order() {
        let tree = sample();
        let leaves: Vec<i32> = tree.leaves().into_iter().copied().collect();
        assert_eq!(leaves, vec![1, 2, 3]);
    }

    #[test]
    fn enumerate_reports_paths() {
        let tree = sample();
        let paths: Vec<String> = tree
            .enumerate()
            .leaves()
            .into_iter()
            .map(|(path, _)| path.to_string())
            .collect();
        assert_eq!(paths, vec!["a", "b[0]", "b[1].c"]);
    }

    #[test]
    fn zip_pairs_leaves_with_whole_subtrees() {
        let spec: Tree<&str> = Tree::record([("kernel", Tree::Leaf("param")), ("sub", Tree::Leaf("module"))]);
        let values: Tree<i32> = Tree::record([
            ("kernel", Tree::Leaf(7)),
            ("sub", Tree::record([("bias", Tree::Leaf(9))])),
        ]);
        let zipped = spec.zip(&values).unwrap();
        let pairs = zipped.leaves();
        assert_eq!(*pairs[0].0, "param");
        assert_eq!(pairs[0].1, &Tree::Leaf(7));
        assert_eq!(pairs[1].1.field("bias"), Some(&Tree::Leaf(9)));
    }

    #[test]
    fn zip_reports_key_mismatch_with_path() {
        let spec: Tree<i32> = Tree::record([("outer", Tree::record([("x", Tree::Leaf(0))]))]);
        let values: Tree<i32> = Tree::record([("outer", Tree::record([("y", Tree::Leaf(0))]))]);
        match spec.zip(&values) {
            Err(ParamError::StructureMismatch { path, detail }) => {
                assert_eq!(path.to_string(), "outer");
                assert!(detail.contains("`x`"));
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn zip_rejects_length_and_kind_differences() {
        let spec: Tree<i32> = Tree::seq([Tree::Leaf(0), Tree::Leaf(1)]);
        let shorter: Tree<i32> = Tree::seq([Tree::Leaf(0)]);
        assert!(matches!(
            spec.zip(&shorter),
            Err(ParamError::StructureMismatch { .. })
        ));
        let record: Tree<i32> = Tree::empty();
        assert!(matches!(
            spec.zip(&record),
            Err(ParamError::StructureMismatch { .. })
        ));
    }

    #[test]
    fn set_replaces_existing_node_only() {
        let mut tree = sample();
        let path = IndexPath::from_segments::<_, PathSegment>(["b".into(), 1usize.into()]);
        tree.set(&path, Tree::Leaf(10)).unwrap();
        assert_eq!(tree.get(&path).unwrap(), &Tree::Leaf(10));

        let missing = IndexPath::root().child("b").child(5usize);
        assert!(matches!(
            tree.set(&missing, Tree::Leaf(0)),
            Err(ParamError::InvalidPath { .. })
        ));
        let wrong_kind = IndexPath::root().child("a").child("x");
        assert!(matches!(
            tree.get(&wrong_kind),
            Err(ParamError::InvalidPath { .. })
        ));
    }

    #[test]
    fn any_short_circuits() {
        let tree = sample();
        let mut visited = 0;
        assert!(tree.any(|v| {
            visited += 1;
            *v == 2
        }));
        assert_eq!(visited, 2);
        assert!(!Tree::<i32>::empty().any(|_| true));
    }

    #[test]
    fn try_flat_map_expands_leaves() {
        let tree: Tree<u8> = Tree::record([("a", Tree::Leaf(0)), ("b", Tree::Leaf(1))]);
        let expanded: Result<Tree<u8>, ()> = tree.try_flat_map(|v| {
            Ok(if *v == 0 {
                Tree::Leaf(0)
            } else {
                Tree::record([("inner", Tree::Leaf(*v))])
            })
        });
        let expanded = expanded.unwrap();
        assert_eq!(expanded.field("b").unwrap().field("inner"), Some(&Tree::Leaf(1)));
    }
}
