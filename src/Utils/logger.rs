//! Terminal logging for the solvers.
//!
//! `init_logger` installs a `simplelog` terminal logger once per process. Solvers call it
//! with their `loglevel` before a run; a second call finds the logger already installed and
//! keeps it.
use crate::symbolic::symbolic_errors::{AlgebraError, AlgebraResult};
use simplelog::{ColorChoice, CombinedLogger, Config, LevelFilter, TermLogger, TerminalMode};

/// `None`/`"off"`/`"none"` mean no logging
pub fn parse_loglevel(loglevel: Option<&str>) -> AlgebraResult<Option<LevelFilter>> {
    let Some(level) = loglevel else {
        return Ok(Some(LevelFilter::Info));
    };
    match level.to_lowercase().as_str() {
        "off" | "none" => Ok(None),
        "trace" => Ok(Some(LevelFilter::Trace)),
        "debug" => Ok(Some(LevelFilter::Debug)),
        "info" => Ok(Some(LevelFilter::Info)),
        "warn" => Ok(Some(LevelFilter::Warn)),
        "error" => Ok(Some(LevelFilter::Error)),
        other => Err(AlgebraError::InvalidArgument(format!(
            "loglevel must be trace, debug, info, warn, error or off, got {}",
            other
        ))),
    }
}

/// Installs the terminal logger. Returns `true` if this call installed it.
pub fn init_logger(loglevel: Option<&str>) -> AlgebraResult<bool> {
    let Some(filter) = parse_loglevel(loglevel)? else {
        return Ok(false);
    };
    let installed = CombinedLogger::init(vec![TermLogger::new(
        filter,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
    Ok(installed.is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_loglevel() {
        assert_eq!(parse_loglevel(None).unwrap(), Some(LevelFilter::Info));
        assert_eq!(parse_loglevel(Some("Warn")).unwrap(), Some(LevelFilter::Warn));
        assert_eq!(parse_loglevel(Some("off")).unwrap(), None);
        assert!(parse_loglevel(Some("loud")).is_err());
    }

    #[test]
    fn test_disabled_logger_is_not_installed() {
        assert!(!init_logger(Some("none")).unwrap());
    }
}
