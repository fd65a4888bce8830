// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Parameterized functions: declaration, tracing initialization, apply and join.
//!
//! A module is declared once with a builder that registers named entries of
//! its specification tree, together with the plain forward function. The
//! forward function never sees placeholders: it receives an [`Args`] record
//! where every trainable leaf has been resolved to a tensor and every
//! submodule to a callable [`Bound`].
//!
//! Initialization runs in two phases:
//!
//! 1. Direct parameter leaves are initialized in canonical pre-order, each
//!    from its own split of the running key, with shapes inferred from the
//!    example inputs.
//! 2. The forward function executes once on the example inputs. Submodules
//!    are bound to a recorder that initializes them from the live tensors
//!    they are called with, writes their values at their index path and then
//!    forwards to their ordinary apply.
//!
//! The recorded tree is the result. The module itself is never mutated.

use crate::error::{ParamError, ParamResult};
use crate::handle::ModuleId;
use crate::key::PrngKey;
use crate::params::{Params, ValueTree};
use crate::path::IndexPath;
use crate::registry::ReuseRegistry;
use crate::spec::{Fixed, ParameterSpec, SpecLeaf, SpecTree};
use crate::tree::Tree;
use crate::Tensor;
use spiral_config::TracePolicy;
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, debug_span, trace, trace_span, warn};

/// Forward computation of a parameterized function.
pub type ForwardFn = dyn Fn(&Args<'_>, &[Tensor]) -> ParamResult<Tensor> + Send + Sync;

/// A function whose parameters are described by a specification tree.
pub struct Parameterized {
    id: ModuleId,
    name: String,
    spec: SpecTree,
    fun: Box<ForwardFn>,
}

impl fmt::Debug for Parameterized {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameterized")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("entries", &self.entry_names())
            .finish()
    }
}

impl fmt::Display for Parameterized {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.id)
    }
}

/// Registers the entries of a module's specification tree.
pub struct ParameterizedBuilder {
    name: String,
    entries: Vec<(String, SpecTree)>,
}

impl ParameterizedBuilder {
    /// Declares a trainable tensor.
    pub fn param(self, name: impl Into<String>, spec: ParameterSpec) -> Self {
        self.entry(name, spec)
    }

    /// Declares a submodule whose parameters are discovered when it is called.
    pub fn module(self, name: impl Into<String>, module: Arc<Parameterized>) -> Self {
        self.entry(name, module)
    }

    /// Declares a non-trainable default.
    pub fn fixed(self, name: impl Into<String>, fixed: Fixed) -> Self {
        self.entry(name, fixed)
    }

    /// Declares an arbitrary nested entry, e.g. a list of layers.
    pub fn entry(mut self, name: impl Into<String>, tree: impl Into<SpecTree>) -> Self {
        self.entries.push((name.into(), tree.into()));
        self
    }

    /// Finishes the declaration.
    pub fn build<F>(self, fun: F) -> ParamResult<Arc<Parameterized>>
    where
        F: Fn(&Args<'_>, &[Tensor]) -> ParamResult<Tensor> + Send + Sync + 'static,
    {
        let mut seen = HashSet::new();
        for (name, _) in &self.entries {
            if !seen.insert(name.as_str()) {
                return Err(ParamError::DuplicateEntry {
                    module: self.name.clone(),
                    name: name.clone(),
                });
            }
        }
        let module = Parameterized {
            id: ModuleId::next(),
            name: self.name,
            spec: Tree::Record(self.entries),
            fun: Box::new(fun),
        };
        debug!(module = %module, entries = ?module.entry_names(), "declared parameterized function");
        Ok(Arc::new(module))
    }
}

#[derive(Clone, Copy)]
struct InitContext<'r> {
    registry: Option<&'r ReuseRegistry>,
    policy: TracePolicy,
}

impl Parameterized {
    pub fn builder(name: impl Into<String>) -> ParameterizedBuilder {
        ParameterizedBuilder {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Stable handle used as the reuse-registry key.
    pub fn id(&self) -> ModuleId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The specification tree; always a record of the declared entries.
    pub fn spec(&self) -> &SpecTree {
        &self.spec
    }

    pub fn entry_names(&self) -> Vec<&str> {
        match &self.spec {
            Tree::Record(entries) => entries.iter().map(|(name, _)| name.as_str()).collect(),
            _ => Vec::new(),
        }
    }

    /// Runs the forward function with parameters taken from `params`.
    pub fn apply(&self, params: &Params, inputs: &[Tensor]) -> ParamResult<Tensor> {
        self.apply_tree(params.as_tree(), inputs)
    }

    /// [`Parameterized::apply`] over a bare value record. The whole record is
    /// checked against the specification before the forward function runs.
    pub fn apply_tree(&self, values: &ValueTree, inputs: &[Tensor]) -> ParamResult<Tensor> {
        self.check_values(values)?;
        self.run(values, inputs)
    }

    /// Checks that `values` has the layout of this module's specification,
    /// descending into every submodule slot whether or not it gets called.
    ///
    /// Fixed entries must hold an empty record. A submodule slot holding an
    /// empty record is accepted as the placeholder left by a lenient `init`;
    /// calling that submodule still fails.
    pub fn check_values(&self, values: &ValueTree) -> ParamResult<()> {
        let zipped = self.spec.zip(values)?;
        for (path, pair) in zipped.enumerate().leaves() {
            let (leaf, value) = **pair;
            match leaf {
                SpecLeaf::Param(_) if !value.is_leaf() => {
                    return Err(ParamError::mismatch(
                        path,
                        format!("expected a tensor, found {}", value.kind()),
                    ));
                }
                SpecLeaf::Fixed(_) if !is_empty_record(value) => {
                    return Err(ParamError::mismatch(
                        path,
                        format!("fixed entries hold no values, found {}", value.kind()),
                    ));
                }
                SpecLeaf::Module(module) if !is_empty_record(value) => {
                    module.check_values(value).map_err(|err| err.within(path))?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn run(&self, values: &ValueTree, inputs: &[Tensor]) -> ParamResult<Tensor> {
        let _span = trace_span!("apply", module = %self).entered();
        let args = self.bind(values, None)?;
        (self.fun)(&args, inputs)
    }

    /// Initializes fresh parameters using the configured trace policy.
    pub fn init(&self, key: PrngKey, example_inputs: &[Tensor]) -> ParamResult<Params> {
        self.init_with_policy(key, example_inputs, spiral_config::config().trace_policy)
    }

    /// Initializes fresh parameters with an explicit policy for submodules
    /// that the dry run never reaches.
    pub fn init_with_policy(
        &self,
        key: PrngKey,
        example_inputs: &[Tensor],
        policy: TracePolicy,
    ) -> ParamResult<Params> {
        self.init_in(
            key,
            example_inputs,
            InitContext {
                registry: None,
                policy,
            },
        )
    }

    /// Initializes parameters, taking the registered values for every module
    /// (this one included) found in `registry`. Reused modules consume no key.
    pub fn init_reusing(
        &self,
        key: PrngKey,
        example_inputs: &[Tensor],
        registry: &ReuseRegistry,
    ) -> ParamResult<Params> {
        self.init_in(
            key,
            example_inputs,
            InitContext {
                registry: Some(registry),
                policy: spiral_config::config().trace_policy,
            },
        )
    }

    fn init_in(
        &self,
        key: PrngKey,
        example_inputs: &[Tensor],
        ctx: InitContext<'_>,
    ) -> ParamResult<Params> {
        if let Some(reused) = ctx.registry.and_then(|registry| registry.get(self.id)) {
            debug!(module = %self, "reusing registered parameters");
            return Ok(reused.clone());
        }
        let _span = debug_span!("init", module = %self).entered();

        let mut carry = key;
        let direct = self.spec.try_flat_map(|leaf| match leaf {
            SpecLeaf::Param(spec) => {
                let (next, sub) = carry.split();
                carry = next;
                spec.initialize(sub, example_inputs).map(Tree::Leaf)
            }
            SpecLeaf::Module(_) | SpecLeaf::Fixed(_) => Ok(Tree::empty()),
        })?;

        let tracer = Tracer {
            values: RefCell::new(direct.clone()),
            key: Cell::new(carry),
            recorded: RefCell::new(HashSet::new()),
            ctx,
        };
        {
            let args = self.bind(&direct, Some(&tracer))?;
            (self.fun)(&args, example_inputs)?;
        }
        let Tracer {
            values, recorded, ..
        } = tracer;
        let recorded = recorded.into_inner();

        for (path, leaf) in self.spec.enumerate().leaves() {
            let SpecLeaf::Module(sub) = leaf else {
                continue;
            };
            if recorded.contains(path) {
                continue;
            }
            match ctx.policy {
                TracePolicy::Strict => {
                    return Err(ParamError::UnreachedSubmodule {
                        module: sub.to_string(),
                        path: path.clone(),
                    });
                }
                TracePolicy::Lenient => {
                    warn!(module = %self, submodule = %sub, path = %path, "submodule not reached by dry run; it has no parameters");
                }
            }
        }

        Ok(Params::from_record(self.name.clone(), values.into_inner()))
    }

    /// Resolves every parameter from `registry` without initializing anything.
    pub fn join_params(&self, registry: &ReuseRegistry) -> ParamResult<Params> {
        if let Some(reused) = registry.get(self.id) {
            return Ok(reused.clone());
        }
        let _span = debug_span!("join_params", module = %self).entered();
        let tree = self
            .spec
            .enumerate()
            .try_flat_map(|(path, leaf)| match leaf {
                SpecLeaf::Param(_) => Err(ParamError::MissingParameter {
                    module: self.to_string(),
                    path: path.clone(),
                }),
                SpecLeaf::Module(sub) => sub
                    .join_params(registry)
                    .map(Params::into_tree)
                    .map_err(|err| err.within(path)),
                SpecLeaf::Fixed(_) => Ok(Tree::empty()),
            })?;
        Ok(Params::from_record(self.name.clone(), tree))
    }

    /// [`Parameterized::join_params`] followed by [`Parameterized::apply`].
    pub fn apply_joined(&self, registry: &ReuseRegistry, inputs: &[Tensor]) -> ParamResult<Tensor> {
        let params = self.join_params(registry)?;
        self.apply(&params, inputs)
    }

    fn bind<'a>(
        &'a self,
        values: &'a ValueTree,
        tracer: Option<&'a Tracer<'a>>,
    ) -> ParamResult<Args<'a>> {
        let zipped = self.spec.zip(values)?;
        let resolved = zipped.enumerate().try_map(|(path, pair)| {
            let (leaf, value) = **pair;
            let arg = match leaf {
                SpecLeaf::Param(_) => match value {
                    Tree::Leaf(tensor) => Arg::Param(tensor),
                    other => {
                        return Err(ParamError::mismatch(
                            path,
                            format!("expected a tensor, found {}", other.kind()),
                        ))
                    }
                },
                SpecLeaf::Module(module) => Arg::Module(Bound {
                    module,
                    path: path.clone(),
                    binding: match tracer {
                        Some(tracer) => Binding::Recording(tracer),
                        None => Binding::Values(value),
                    },
                }),
                SpecLeaf::Fixed(fixed) => Arg::Fixed(fixed),
            };
            Ok(arg)
        })?;
        match resolved {
            Tree::Record(entries) => Ok(Args {
                module: &self.name,
                entries,
            }),
            other => Err(ParamError::mismatch(
                &IndexPath::root(),
                format!("expected a record of entries, found {}", other.kind()),
            )),
        }
    }
}

/// Dry-run state local to one `init` call.
struct Tracer<'r> {
    values: RefCell<ValueTree>,
    key: Cell<PrngKey>,
    recorded: RefCell<HashSet<IndexPath>>,
    ctx: InitContext<'r>,
}

impl Tracer<'_> {
    fn record(
        &self,
        path: &IndexPath,
        module: &Parameterized,
        inputs: &[Tensor],
    ) -> ParamResult<Tensor> {
        if self.recorded.borrow().contains(path) {
            // A values-bound run never reaches back into this tracer.
            let values = self.values.borrow();
            trace!(submodule = %module, path = %path, "submodule already recorded");
            return module.run(values.get(path)?, inputs);
        }

        let params = match self.ctx.registry.and_then(|registry| registry.get(module.id())) {
            Some(reused) => {
                module.check_values(reused.as_tree())?;
                reused.clone()
            }
            None => {
                let (carry, sub) = self.key.get().split();
                self.key.set(carry);
                module.init_in(sub, inputs, self.ctx)?
            }
        };
        let tree = params.into_tree();
        self.values.borrow_mut().set(path, tree.clone())?;
        self.recorded.borrow_mut().insert(path.clone());
        debug!(submodule = %module, path = %path, "recorded submodule parameters");
        module.run(&tree, inputs)
    }
}

/// Resolved entries handed to a forward function.
pub struct Args<'a> {
    module: &'a str,
    entries: Vec<(String, Tree<Arg<'a>>)>,
}

impl<'a> Args<'a> {
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// The resolved subtree of a declared entry.
    pub fn entry(&self, name: &str) -> ParamResult<&Tree<Arg<'a>>> {
        self.entries
            .iter()
            .find(|entry| entry.0 == name)
            .map(|entry| &entry.1)
            .ok_or_else(|| ParamError::UnknownEntry {
                module: self.module.to_string(),
                name: name.to_string(),
            })
    }

    pub fn param(&self, name: &str) -> ParamResult<&'a Tensor> {
        match self.entry(name)? {
            Tree::Leaf(Arg::Param(tensor)) => Ok(*tensor),
            _ => Err(kind_error(name, "parameter")),
        }
    }

    pub fn module(&self, name: &str) -> ParamResult<&Bound<'a>> {
        match self.entry(name)? {
            Tree::Leaf(Arg::Module(bound)) => Ok(bound),
            _ => Err(kind_error(name, "submodule")),
        }
    }

    pub fn fixed(&self, name: &str) -> ParamResult<&'a Fixed> {
        match self.entry(name)? {
            Tree::Leaf(Arg::Fixed(fixed)) => Ok(*fixed),
            _ => Err(kind_error(name, "fixed value")),
        }
    }

    /// Invokes a submodule or fixed function entry.
    pub fn call(&self, name: &str, inputs: &[Tensor]) -> ParamResult<Tensor> {
        match self.entry(name)? {
            Tree::Leaf(arg) => arg.call(inputs),
            _ => Err(ParamError::NotCallable {
                name: name.to_string(),
            }),
        }
    }

    /// Elements of a sequence entry, in order.
    pub fn sequence(&self, name: &str) -> ParamResult<Vec<&Arg<'a>>> {
        match self.entry(name)? {
            Tree::Seq(items) => items
                .iter()
                .map(|item| {
                    item.as_leaf()
                        .ok_or_else(|| kind_error(name, "sequence of leaves"))
                })
                .collect(),
            _ => Err(kind_error(name, "sequence")),
        }
    }
}

fn kind_error(name: &str, expected: &'static str) -> ParamError {
    ParamError::EntryKind {
        name: name.to_string(),
        expected,
    }
}

fn is_empty_record(value: &ValueTree) -> bool {
    matches!(value, Tree::Record(_)) && value.is_empty_container()
}

/// One resolved leaf.
pub enum Arg<'a> {
    Param(&'a Tensor),
    Module(Bound<'a>),
    Fixed(&'a Fixed),
}

impl fmt::Debug for Arg<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Param(tensor) => write!(f, "Param(shape={:?})", tensor.shape()),
            Arg::Module(bound) => write!(f, "Module({})", bound.module),
            Arg::Fixed(fixed) => write!(f, "{fixed:?}"),
        }
    }
}

impl Arg<'_> {
    /// Calls a submodule or a fixed function.
    pub fn call(&self, inputs: &[Tensor]) -> ParamResult<Tensor> {
        match self {
            Arg::Module(bound) => bound.call(inputs),
            Arg::Fixed(Fixed::Function(fun)) => fun(inputs),
            Arg::Fixed(Fixed::Tensor(_)) => Err(ParamError::NotCallable {
                name: "fixed tensor".to_string(),
            }),
            Arg::Param(_) => Err(ParamError::NotCallable {
                name: "parameter".to_string(),
            }),
        }
    }

    pub fn as_tensor(&self) -> Option<&Tensor> {
        match self {
            Arg::Param(tensor) => Some(*tensor),
            Arg::Fixed(fixed) => fixed.as_tensor(),
            Arg::Module(_) => None,
        }
    }
}

/// A submodule bound to its slice of the value tree.
pub struct Bound<'a> {
    module: &'a Arc<Parameterized>,
    path: IndexPath,
    binding: Binding<'a>,
}

enum Binding<'a> {
    Values(&'a ValueTree),
    Recording(&'a Tracer<'a>),
}

impl Bound<'_> {
    pub fn module(&self) -> &Arc<Parameterized> {
        self.module
    }

    /// Location of the submodule inside the enclosing specification tree.
    pub fn path(&self) -> &IndexPath {
        &self.path
    }

    /// Runs the submodule on live inputs.
    pub fn call(&self, inputs: &[Tensor]) -> ParamResult<Tensor> {
        let result = match self.binding {
            Binding::Values(values) => self.module.run(values, inputs),
            Binding::Recording(tracer) => tracer.record(&self.path, self.module, inputs),
        };
        result.map_err(|err| err.within(&self.path))
    }
}
