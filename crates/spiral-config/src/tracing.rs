// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Filter used when `RUST_LOG` is unset: engine crates at `info`, the rest at `warn`.
pub const DEFAULT_FILTER: &str = "warn,st_param=info,st_nn=info";

static INITIALISED: OnceLock<()> = OnceLock::new();
static CHROME_GUARD: OnceLock<Mutex<Option<tracing_chrome::FlushGuard>>> = OnceLock::new();

/// Subscriber settings resolved before installation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TracingOptions {
    /// Directive applied when `RUST_LOG` is absent or malformed.
    pub default_filter: String,
    /// Destination of a Chrome trace of the `init`/`apply` spans.
    pub chrome_trace: Option<PathBuf>,
    pub ansi: bool,
}

impl Default for TracingOptions {
    fn default() -> Self {
        Self {
            default_filter: DEFAULT_FILTER.to_string(),
            chrome_trace: None,
            ansi: false,
        }
    }
}

impl TracingOptions {
    /// Reads `SPIRAL_TRACE_CHROME` and detects whether stdout is a terminal.
    pub fn from_env() -> Result<Self, InitError> {
        let chrome_trace = match std::env::var("SPIRAL_TRACE_CHROME") {
            Ok(raw) if !raw.trim().is_empty() => Some(PathBuf::from(raw.trim())),
            Ok(_) | Err(std::env::VarError::NotPresent) => None,
            Err(err) => return Err(InitError::Env(err)),
        };
        Ok(Self {
            chrome_trace,
            ansi: std::io::stdout().is_terminal(),
            ..Self::default()
        })
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.default_filter))
    }
}

/// Installs the global subscriber configured from the environment.
pub fn init_tracing() -> Result<(), InitError> {
    init_tracing_with(TracingOptions::from_env()?)
}

/// Installs the global subscriber. Only the first successful call in a
/// process takes effect; a failed installation can be retried.
pub fn init_tracing_with(options: TracingOptions) -> Result<(), InitError> {
    if INITIALISED.get().is_some() {
        return Err(InitError::AlreadyInitialised);
    }

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(options.ansi);
    let chrome_layer = options.chrome_trace.as_ref().map(|path| {
        let (layer, guard) = tracing_chrome::ChromeLayerBuilder::new()
            .file(path)
            .include_args(true)
            .build();
        let slot = CHROME_GUARD.get_or_init(|| Mutex::new(None));
        if let Ok(mut slot) = slot.lock() {
            *slot = Some(guard);
        }
        layer
    });

    Registry::default()
        .with(options.filter())
        .with(fmt_layer)
        .with(chrome_layer)
        .try_init()
        .map_err(|err| InitError::Subscriber(err.to_string()))?;
    INITIALISED
        .set(())
        .map_err(|_| InitError::AlreadyInitialised)
}

/// Errors emitted when configuring the tracing subscriber.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("tracing has already been initialised")]
    AlreadyInitialised,
    #[error("failed to read SPIRAL_TRACE_CHROME: {0}")]
    Env(std::env::VarError),
    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_quiet_everything_but_the_engine() {
        let options = TracingOptions::default();
        assert_eq!(options.default_filter, DEFAULT_FILTER);
        assert!(options.chrome_trace.is_none());
    }

    #[test]
    fn second_initialisation_is_rejected() {
        let _ = init_tracing_with(TracingOptions::default());
        assert!(matches!(
            init_tracing(),
            Err(InitError::AlreadyInitialised)
        ));
    }
}
