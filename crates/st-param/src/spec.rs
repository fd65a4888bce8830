// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use crate::error::{ParamError, ParamResult};
use crate::key::PrngKey;
use crate::parameterized::Parameterized;
use crate::tree::Tree;
use crate::Tensor;
use std::fmt;
use std::sync::Arc;

pub type Shape = Vec<usize>;

/// Computes a parameter shape from the inputs of the enclosing module.
pub type ShapeFn = dyn Fn(&[Tensor]) -> ParamResult<Shape> + Send + Sync;
/// Produces a concrete tensor from a fresh key and a shape.
pub type InitFn = dyn Fn(PrngKey, &[usize]) -> ParamResult<Tensor> + Send + Sync;
/// Non-trainable callable, e.g. an activation placed inside a layer list.
pub type FixedFn = dyn Fn(&[Tensor]) -> ParamResult<Tensor> + Send + Sync;

/// Placeholder for one trainable tensor.
///
/// The shape function must be pure: it may run more than once for the same
/// inputs and has to return the same shape each time.
#[derive(Clone)]
pub struct ParameterSpec {
    shape_fn: Arc<ShapeFn>,
    init_fn: Arc<InitFn>,
}

impl fmt::Debug for ParameterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ParameterSpec")
    }
}

impl ParameterSpec {
    pub fn new<S, I>(shape_fn: S, init_fn: I) -> Self
    where
        S: Fn(&[Tensor]) -> ParamResult<Shape> + Send + Sync + 'static,
        I: Fn(PrngKey, &[usize]) -> ParamResult<Tensor> + Send + Sync + 'static,
    {
        Self {
            shape_fn: Arc::new(shape_fn),
            init_fn: Arc::new(init_fn),
        }
    }

    /// Shares an existing initializer between several specs.
    pub fn with_shared_init<S>(shape_fn: S, init_fn: Arc<InitFn>) -> Self
    where
        S: Fn(&[Tensor]) -> ParamResult<Shape> + Send + Sync + 'static,
    {
        Self {
            shape_fn: Arc::new(shape_fn),
            init_fn,
        }
    }

    pub fn shape(&self, inputs: &[Tensor]) -> ParamResult<Shape> {
        (self.shape_fn)(inputs)
    }

    /// Infers the shape from `inputs` and draws the tensor from `key`.
    pub fn initialize(&self, key: PrngKey, inputs: &[Tensor]) -> ParamResult<Tensor> {
        let shape = self.shape(inputs)?;
        let tensor = (self.init_fn)(key, &shape)?;
        if tensor.shape() != shape.as_slice() {
            return Err(ParamError::InitializerShape {
                expected: shape,
                got: tensor.shape().to_vec(),
            });
        }
        Ok(tensor)
    }
}

/// Non-trainable default carried inside a specification tree.
#[derive(Clone)]
pub enum Fixed {
    Tensor(Tensor),
    Function(Arc<FixedFn>),
}

impl Fixed {
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&[Tensor]) -> ParamResult<Tensor> + Send + Sync + 'static,
    {
        Fixed::Function(Arc::new(f))
    }

    pub fn tensor(tensor: Tensor) -> Self {
        Fixed::Tensor(tensor)
    }

    pub fn as_tensor(&self) -> Option<&Tensor> {
        match self {
            Fixed::Tensor(tensor) => Some(tensor),
            Fixed::Function(_) => None,
        }
    }
}

impl fmt::Debug for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fixed::Tensor(tensor) => write!(f, "Fixed::Tensor(shape={:?})", tensor.shape()),
            Fixed::Function(_) => f.write_str("Fixed::Function"),
        }
    }
}

/// Terminal node of a specification tree.
#[derive(Clone, Debug)]
pub enum SpecLeaf {
    Param(ParameterSpec),
    Module(Arc<Parameterized>),
    Fixed(Fixed),
}

impl SpecLeaf {
    /// Trainable leaves and submodules; fixed defaults are not.
    pub fn is_parameterized(&self) -> bool {
        matches!(self, SpecLeaf::Param(_) | SpecLeaf::Module(_))
    }
}

pub type SpecTree = Tree<SpecLeaf>;

impl From<ParameterSpec> for SpecTree {
    fn from(spec: ParameterSpec) -> Self {
        Tree::Leaf(SpecLeaf::Param(spec))
    }
}

impl From<Arc<Parameterized>> for SpecTree {
    fn from(module: Arc<Parameterized>) -> Self {
        Tree::Leaf(SpecLeaf::Module(module))
    }
}

impl From<Fixed> for SpecTree {
    fn from(fixed: Fixed) -> Self {
        Tree::Leaf(SpecLeaf::Fixed(fixed))
    }
}

impl SpecTree {
    /// Whether any leaf of the tree carries or owns parameters.
    pub fn has_parameters(&self) -> bool {
        self.any(SpecLeaf::is_parameterized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{ArrayD, IxDyn};

    fn zeros(_key: PrngKey, shape: &[usize]) -> ParamResult<Tensor> {
        Ok(ArrayD::zeros(IxDyn(shape)))
    }

    #[test]
    fn shape_follows_enclosing_inputs() {
        let spec = ParameterSpec::new(
            |inputs: &[Tensor]| Ok(vec![inputs[0].shape()[1], 5]),
            zeros,
        );
        let example = ArrayD::<f32>::zeros(IxDyn(&[4, 3]));
        let tensor = spec.initialize(PrngKey::new(0), &[example]).unwrap();
        assert_eq!(tensor.shape(), &[3, 5]);
        assert!(tensor.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn initializer_must_honour_requested_shape() {
        let spec = ParameterSpec::new(
            |_: &[Tensor]| Ok(vec![2, 2]),
            |_, _: &[usize]| Ok(ArrayD::zeros(IxDyn(&[3]))),
        );
        assert!(matches!(
            spec.initialize(PrngKey::new(0), &[]),
            Err(ParamError::InitializerShape { .. })
        ));
    }

    #[test]
    fn fixed_only_trees_carry_no_parameters() {
        let tree: SpecTree = Tree::seq([
            SpecTree::from(Fixed::function(|inputs: &[Tensor]| Ok(inputs[0].clone()))),
            SpecTree::from(Fixed::tensor(ArrayD::zeros(IxDyn(&[1])))),
        ]);
        assert!(!tree.has_parameters());
        let with_param: SpecTree = Tree::record([(
            "w",
            SpecTree::from(ParameterSpec::new(|_: &[Tensor]| Ok(vec![1]), zeros)),
        )]);
        assert!(with_param.has_parameters());
    }
}
