//! Error types for configuration loading and command emission.
//!
//! Geometry never fails: degenerate inputs give empty or partial results and
//! a logged warning. Only bad configuration and a broken command sink are
//! errors.

use std::io;
use thiserror::Error;

/// Errors in machine or extruder configuration. Fatal at construction.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The machine has no extruders configured.
    #[error("No extruders configured")]
    NoExtruders,

    /// An extruder has an unusable parameter.
    #[error("Invalid extruder {index}: {reason}")]
    InvalidExtruder { index: usize, reason: String },

    /// A machine-wide parameter is unusable.
    #[error("Invalid machine configuration: {0}")]
    InvalidMachine(String),

    /// The configuration text could not be parsed.
    #[error("Configuration parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors raised while emitting machine commands.
#[derive(Error, Debug)]
pub enum EmitError {
    /// The command sink failed; output past this point is unusable.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A call arrived after the run was terminated.
    #[error("Emitter already terminated")]
    Terminated,

    /// The emitter was built from a bad configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

pub type EmitResult<T> = Result<T, EmitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_problem() {
        let e = ConfigError::InvalidExtruder { index: 2, reason: "width must be > 0".to_string() };
        assert_eq!(e.to_string(), "Invalid extruder 2: width must be > 0");

        let e: EmitError = ConfigError::NoExtruders.into();
        assert_eq!(e.to_string(), "Configuration error: No extruders configured");

        let e: EmitError = io::Error::new(io::ErrorKind::BrokenPipe, "gone").into();
        assert!(matches!(e, EmitError::Io(_)));
    }
}
