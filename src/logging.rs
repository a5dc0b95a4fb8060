//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Level used when neither the command line nor the configuration sets one.
pub const DEFAULT_LEVEL: &str = "info";

/// Picks the filter directive: command line, then configuration, then `info`.
#[must_use]
pub fn resolve_level(flag: Option<&str>, config: Option<&Config>) -> String {
    flag.map(str::to_string)
        .or_else(|| config.map(|c| c.logging.level.clone()))
        .filter(|level| !level.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LEVEL.to_string())
}

/// Installs a stderr `fmt` subscriber. `RUST_LOG` takes precedence over `level`.
///
/// Installing twice is not an error; the first subscriber stays active.
///
/// # Errors
///
/// Returns an error if `level` is not a valid filter directive.
pub fn init(level: &str) -> Result<(), String> {
    let fallback =
        EnvFilter::try_new(level).map_err(|e| format!("invalid log level {level:?}: {e}"))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or(fallback);

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_beats_config_beats_default() {
        let mut config = Config::default();
        config.logging.level = "warn".into();
        assert_eq!(resolve_level(Some("debug"), Some(&config)), "debug");
        assert_eq!(resolve_level(None, Some(&config)), "warn");
        assert_eq!(resolve_level(None, None), "info");
        config.logging.level = String::new();
        assert_eq!(resolve_level(None, Some(&config)), "info");
    }

    #[test]
    fn invalid_level_is_an_error() {
        assert!(init("strata=loud").is_err());
        assert!(init("debug").is_ok());
        assert!(init("info").is_ok());
    }
}
