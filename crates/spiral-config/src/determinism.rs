// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::OnceLock;

/// How initialization treats submodules that the dry run never invoked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TracePolicy {
    /// Fail the whole initialization and name the unreached submodule.
    #[default]
    Strict,
    /// Leave an empty parameter record for the unreached submodule.
    Lenient,
}

impl FromStr for TracePolicy {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "strict" | "1" | "true" | "on" => Ok(TracePolicy::Strict),
            "lenient" | "0" | "false" | "off" => Ok(TracePolicy::Lenient),
            other => Err(format!("unknown trace policy `{other}`")),
        }
    }
}

impl fmt::Display for TracePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TracePolicy::Strict => f.write_str("strict"),
            TracePolicy::Lenient => f.write_str("lenient"),
        }
    }
}

/// Runtime configuration for parameter initialization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParamConfig {
    /// Base seed used to derive default and per-label keys.
    pub base_seed: u64,
    /// Behaviour for submodules skipped by the dry run.
    pub trace_policy: TracePolicy,
}

impl Default for ParamConfig {
    fn default() -> Self {
        Self {
            base_seed: 42,
            trace_policy: TracePolicy::Strict,
        }
    }
}

impl ParamConfig {
    /// Builds a configuration snapshot from environment variables.
    fn from_env() -> Self {
        let defaults = Self::default();

        let base_seed = std::env::var("SPIRAL_PARAM_SEED")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(defaults.base_seed);

        let trace_policy = std::env::var("SPIRAL_PARAM_TRACE")
            .ok()
            .and_then(|v| v.parse::<TracePolicy>().ok())
            .unwrap_or(defaults.trace_policy);

        Self {
            base_seed,
            trace_policy,
        }
    }

    /// Derives a deterministic seed for a given label.
    pub fn seed_for<L: Hash>(&self, label: L) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.base_seed.hash(&mut hasher);
        label.hash(&mut hasher);
        hasher.finish()
    }
}

static CONFIG: OnceLock<ParamConfig> = OnceLock::new();

/// Returns the lazily initialised configuration.
pub fn config() -> &'static ParamConfig {
    CONFIG.get_or_init(ParamConfig::from_env)
}

/// Derives a seed from the process configuration for the given label.
pub fn seed_for(label: &str) -> u64 {
    config().seed_for(label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
    use std::sync::{Mutex, OnceLock};

    fn with_env(vars: &[(&str, Option<&str>)], test: impl FnOnce()) {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        let _lock = GUARD.get_or_init(|| Mutex::new(())).lock().unwrap();

        let snapshot: Vec<(String, Option<String>)> = vars
            .iter()
            .map(|(key, value)| {
                let previous = std::env::var(key).ok();
                match value {
                    Some(val) => std::env::set_var(key, val),
                    None => std::env::remove_var(key),
                }
                ((*key).to_string(), previous)
            })
            .collect();

        let result = catch_unwind(AssertUnwindSafe(test));

        for (key, value) in snapshot {
            match value {
                Some(val) => std::env::set_var(&key, val),
                None => std::env::remove_var(&key),
            }
        }

        if let Err(err) = result {
            resume_unwind(err);
        }
    }

    #[test]
    fn defaults_are_strict_with_seed_42() {
        with_env(
            &[("SPIRAL_PARAM_SEED", None), ("SPIRAL_PARAM_TRACE", None)],
            || {
                let cfg = ParamConfig::from_env();
                assert_eq!(cfg.base_seed, 42);
                assert_eq!(cfg.trace_policy, TracePolicy::Strict);
            },
        );
    }

    #[test]
    fn explicit_values_override_defaults() {
        with_env(
            &[
                ("SPIRAL_PARAM_SEED", Some("1337")),
                ("SPIRAL_PARAM_TRACE", Some("Lenient")),
            ],
            || {
                let cfg = ParamConfig::from_env();
                assert_eq!(cfg.base_seed, 1337);
                assert_eq!(cfg.trace_policy, TracePolicy::Lenient);
            },
        );
    }

    #[test]
    fn malformed_values_fall_back() {
        with_env(
            &[
                ("SPIRAL_PARAM_SEED", Some("not-a-seed")),
                ("SPIRAL_PARAM_TRACE", Some("sometimes")),
            ],
            || {
                let cfg = ParamConfig::from_env();
                assert_eq!(cfg, ParamConfig::default());
            },
        );
    }

    #[test]
    fn derived_seeds_are_stable_per_label() {
        let cfg = ParamConfig {
            base_seed: 99,
            ..ParamConfig::default()
        };
        let alpha_first = cfg.seed_for("alpha");
        let alpha_second = cfg.seed_for("alpha");
        let beta = cfg.seed_for("beta");
        assert_eq!(alpha_first, alpha_second);
        assert_ne!(alpha_first, beta);
    }

    #[test]
    fn policy_round_trips_through_display() {
        for policy in [TracePolicy::Strict, TracePolicy::Lenient] {
            assert_eq!(policy.to_string().parse::<TracePolicy>().unwrap(), policy);
        }
    }
}
