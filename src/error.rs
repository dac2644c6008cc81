//! Centralised error hierarchy for the **Mico interpreter** front end.
//!
//! The scanner, parser and CLI convert their failure modes into one of the
//! variants defined here, enabling a uniform `Result<T>` alias throughout the
//! crate and ergonomic inter-operation with `anyhow`.
//!
//! Runtime evaluation failures are deliberately *not* represented here: they
//! are values travelling on the evaluator's control-flow channel
//! (see [`crate::value::Flow`]) and only become a [`MicoError::Runtime`] at
//! the library boundary, where the caller needs one error type.

use std::io;
use thiserror::Error;

use log::info;

/// Canonical error type used by the interpreter front end.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MicoError {
    /// Lexical (scanner) error with source position information.
    #[error("[line {line}:{column}] Error: {message}")]
    Lex {
        /// Human-readable description.
        message: String,

        /// 1-based line where the error occurred.
        line: usize,

        /// 1-based column where the error occurred.
        column: usize,
    },

    /// Syntactic (parser) error.
    #[error("[line {line}:{column}] Error: {message}")]
    Parse {
        message: String,
        line: usize,
        column: usize,
    },

    /// Runtime failure that reached the library boundary.
    #[error("[line {line}:{column}] Runtime error: {message}")]
    Runtime {
        message: String,
        line: usize,
        column: usize,
    },

    /// Wrapper around `std::io::Error` (transparent). Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// UTF-8 decoding failure when ingesting external text.
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl MicoError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, column: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: {}:{} {}", line, column, message);

        MicoError::Lex {
            message,
            line,
            column,
        }
    }

    /// Helper constructor for the **parser**.
    pub fn parse<S: Into<String>>(line: usize, column: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: {}:{} {}", line, column, message);

        MicoError::Parse {
            message,
            line,
            column,
        }
    }

    /// Helper constructor for **runtime** failures crossing the library
    /// boundary.
    pub fn runtime<S: Into<String>>(line: usize, column: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Runtime error: {}:{} {}", line, column, message);

        MicoError::Runtime {
            message,
            line,
            column,
        }
    }
}

/// Crate-wide `Result` alias for front-end operations.
pub type Result<T> = std::result::Result<T, MicoError>;
