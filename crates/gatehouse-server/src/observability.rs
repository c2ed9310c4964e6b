//! Log output for the server binary.
//!
//! The subscriber starts at a bootstrap level so configuration loading is
//! logged. Once the config file is read, [`LogControl::set_level`] swaps the
//! filter in place. An explicit `RUST_LOG` pins the filter for the whole run.

use anyhow::Context;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

type FilterHandle = reload::Handle<EnvFilter, Registry>;

/// Parses a level name such as `info` or `WARN`.
pub fn parse_level(level: &str) -> anyhow::Result<LevelFilter> {
    level
        .trim()
        .parse::<LevelFilter>()
        .with_context(|| format!("unknown log level `{level}`"))
}

/// Handle on the installed filter.
#[derive(Clone)]
pub struct LogControl {
    handle: FilterHandle,
    pinned: bool,
}

impl LogControl {
    /// Installs the global subscriber.
    ///
    /// # Errors
    ///
    /// Fails if `bootstrap_level` is not a level name or `RUST_LOG` does not
    /// parse. A subscriber that is already installed is left in place.
    pub fn install(bootstrap_level: &str) -> anyhow::Result<Self> {
        let rust_log = std::env::var("RUST_LOG").ok();
        let (layer, control) = Self::layer(rust_log.as_deref(), bootstrap_level)?;

        let _ = tracing_subscriber::registry()
            .with(layer)
            .with(fmt::layer())
            .try_init();
        Ok(control)
    }

    fn layer(
        rust_log: Option<&str>,
        level: &str,
    ) -> anyhow::Result<(reload::Layer<EnvFilter, Registry>, Self)> {
        let filter = match rust_log {
            Some(directives) => EnvFilter::try_new(directives)
                .with_context(|| format!("invalid RUST_LOG `{directives}`"))?,
            None => EnvFilter::default().add_directive(parse_level(level)?.into()),
        };
        let (layer, handle) = reload::Layer::new(filter);
        let control = Self {
            handle,
            pinned: rust_log.is_some(),
        };
        Ok((layer, control))
    }

    /// Replaces the filter with `level`. Returns `false` when `RUST_LOG`
    /// pins the filter and nothing changed.
    ///
    /// # Errors
    ///
    /// Fails on an unknown level name or if the subscriber has been dropped.
    pub fn set_level(&self, level: &str) -> anyhow::Result<bool> {
        let level = parse_level(level)?;
        if self.pinned {
            tracing::debug!(%level, "RUST_LOG is set; configured level ignored");
            return Ok(false);
        }
        self.handle
            .reload(EnvFilter::default().add_directive(level.into()))
            .context("log filter is no longer installed")?;
        Ok(true)
    }

    /// The active filter directives.
    pub fn current(&self) -> Option<String> {
        self.handle.with_current(ToString::to_string).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level_accepts_any_case() {
        assert_eq!(parse_level("WARN").unwrap(), LevelFilter::WARN);
        assert_eq!(parse_level(" off ").unwrap(), LevelFilter::OFF);
    }

    #[test]
    fn test_parse_level_rejects_unknown_name() {
        let err = parse_level("loud").unwrap_err();
        assert!(err.to_string().contains("loud"));
    }

    #[test]
    fn test_set_level_swaps_filter() {
        let (_layer, control) = LogControl::layer(None, "info").unwrap();
        assert_eq!(control.current().as_deref(), Some("info"));

        assert!(control.set_level("debug").unwrap());
        assert_eq!(control.current().as_deref(), Some("debug"));

        assert!(control.set_level("chatty").is_err());
        assert_eq!(control.current().as_deref(), Some("debug"));
    }

    #[test]
    fn test_rust_log_pins_filter() {
        let (_layer, control) = LogControl::layer(Some("gatehouse=trace"), "info").unwrap();
        assert!(!control.set_level("error").unwrap());
        assert_eq!(control.current().as_deref(), Some("gatehouse=trace"));
    }
}
