// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use crate::handle::ModuleId;
use crate::parameterized::Parameterized;
use crate::params::Params;
use std::collections::HashMap;

/// Previously computed parameters keyed by module handle.
///
/// Built by the caller and only read by the engine. Every call site that
/// refers to a registered module receives exactly these values.
#[derive(Clone, Debug, Default)]
pub struct ReuseRegistry {
    entries: HashMap<ModuleId, Params>,
}

impl ReuseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `params` for `module`, replacing any earlier entry.
    pub fn insert(&mut self, module: &Parameterized, params: Params) -> Option<Params> {
        self.entries.insert(module.id(), params)
    }

    /// Builder form of [`ReuseRegistry::insert`].
    pub fn with(mut self, module: &Parameterized, params: Params) -> Self {
        self.insert(module, params);
        self
    }

    pub fn get(&self, id: ModuleId) -> Option<&Params> {
        self.entries.get(&id)
    }

    pub fn contains(&self, module: &Parameterized) -> bool {
        self.entries.contains_key(&module.id())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
