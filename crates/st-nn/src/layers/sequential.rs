// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use crate::activation::Activation;
use crate::input;
use st_param::{Fixed, ParamResult, Parameterized, SpecTree, Tensor};
use std::fmt;
use std::sync::Arc;

/// One element of a layer list: a parameterized module or a plain function.
#[derive(Clone)]
pub enum Layer {
    Module(Arc<Parameterized>),
    Function(Fixed),
}

impl Layer {
    /// Wraps a single-input activation as a parameter-free layer.
    pub fn activation(f: Activation) -> Self {
        Layer::Function(Fixed::function(move |inputs: &[Tensor]| f(input(inputs, 0)?)))
    }
}

impl fmt::Debug for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layer::Module(module) => write!(f, "Layer::Module({module})"),
            Layer::Function(_) => f.write_str("Layer::Function"),
        }
    }
}

impl From<Arc<Parameterized>> for Layer {
    fn from(module: Arc<Parameterized>) -> Self {
        Layer::Module(module)
    }
}

impl From<Activation> for Layer {
    fn from(f: Activation) -> Self {
        Layer::activation(f)
    }
}

impl From<Layer> for SpecTree {
    fn from(layer: Layer) -> Self {
        match layer {
            Layer::Module(module) => SpecTree::from(module),
            Layer::Function(fixed) => SpecTree::from(fixed),
        }
    }
}

/// Composes layers so that each consumes the previous output.
///
/// The value tree holds a `layers` sequence with one entry per layer; plain
/// functions keep an empty record in their slot.
pub fn sequential<I>(layers: I) -> ParamResult<Arc<Parameterized>>
where
    I: IntoIterator<Item = Layer>,
{
    let layers = SpecTree::seq(layers.into_iter().map(SpecTree::from));
    Parameterized::builder("sequential")
        .entry("layers", layers)
        .build(|args, inputs| {
            let mut activ = input(inputs, 0)?.clone();
            for layer in args.sequence("layers")? {
                activ = layer.call(&[activ])?;
            }
            Ok(activ)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::relu;
    use crate::init::{ones, zeros};
    use crate::layers::dense_with;
    use ndarray::{ArrayD, IxDyn};
    use st_param::{PrngKey, Tree};

    #[test]
    fn empty_sequence_is_identity() {
        let net = sequential(Vec::new()).unwrap();
        let x = ArrayD::from_elem(IxDyn(&[2, 2]), 3.0f32);
        let params = net.init(PrngKey::new(0), &[x.clone()]).unwrap();
        assert_eq!(params.field("layers"), Some(&Tree::seq([])));
        assert_eq!(net.apply(&params, &[x.clone()]).unwrap(), x);
    }

    #[test]
    fn functions_and_modules_interleave() {
        let net = sequential([
            Layer::from(dense_with(3, ones(), zeros()).unwrap()),
            Layer::activation(relu),
            Layer::from(dense_with(1, ones(), zeros()).unwrap()),
        ])
        .unwrap();
        let x = ArrayD::from_elem(IxDyn(&[1, 2]), -1.0f32);
        let params = net.init(PrngKey::new(0), &[x.clone()]).unwrap();
        let out = net.apply(&params, &[x]).unwrap();
        assert_eq!(out.shape(), &[1, 1]);
        assert!(out.iter().all(|v| *v == 0.0));
        assert_eq!(params.num_parameters(), 2 * 3 + 3 + 3 + 1);
    }
}
