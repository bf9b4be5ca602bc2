//! Centralised error hierarchy for the **rox** interpreter.
//!
//! All subsystems (scanner, parser, resolver, runtime, CLI) must convert their
//! internal failure modes into one of the variants defined here.  This enables a
//! uniform `Result<T>` alias throughout the crate and ergonomic inter-operation
//! with `anyhow`, while still preserving rich diagnostic detail.
//!
//! Static errors (lex / parse / resolve) carry the `[line N] Error<location>:`
//! prefix expected by the driver; runtime errors print their message followed
//! by the offending line.  The module **does not** print diagnostics itself;
//! that is the job of [`Diagnostics`] and the driver.

use std::io;
use thiserror::Error;

use log::info;

use crate::token::{Token, TokenType};

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoxError {
    /// Lexical (scanner) error with source line information.
    #[error("[line {line}] Error: {message}")]
    Lex {
        /// Human-readable description.
        message: String,

        /// 1-based line where the error occurred.
        line: usize,
    },

    /// Syntactic (parser) error.  `location` is ` at end` for the EOF token
    /// or ` at '<lexeme>'` otherwise.
    #[error("[line {line}] Error{location}: {message}")]
    Parse {
        message: String,
        location: String,
        line: usize,
    },

    /// Static-analysis or resolution failure (e.g. early-binding errors).
    #[error("[line {line}] Error{location}: {message}")]
    Resolve {
        message: String,
        location: String,
        line: usize,
    },

    /// Runtime evaluation error, reported with the line it was raised on.
    #[error("{message}\n[line {line}]")]
    Runtime { message: String, line: usize },

    /// Wrapper around `std::io::Error` (transparent).  Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl LoxError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        LoxError::Lex { message, line }
    }

    /// Helper constructor for the **parser**.  The location string is derived
    /// from the token the parser choked on.
    pub fn parse<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: line={}, msg={}", token.line, message);

        LoxError::Parse {
            message,
            location: Self::location(token),
            line: token.line,
        }
    }

    /// Helper constructor for the **resolver**.
    pub fn resolve<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Resolve error: line={}, msg={}", token.line, message);

        LoxError::Resolve {
            message,
            location: Self::location(token),
            line: token.line,
        }
    }

    fn location(token: &Token) -> String {
        if matches!(token.token_type, TokenType::EOF) {
            " at end".to_string()
        } else {
            format!(" at '{}'", token.lexeme)
        }
    }
}

/// Accumulator for static errors.
///
/// The scanner, parser, and resolver all keep going after an error so that as
/// many problems as possible surface from a single run; every error lands
/// here.  The driver inspects the collector once per pass boundary: if any
/// error was recorded, interpretation must not start.
#[derive(Debug, Default)]
pub struct Diagnostics {
    errors: Vec<LoxError>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one error.  Never aborts the reporting pass.
    pub fn report(&mut self, error: LoxError) {
        info!("Diagnostic recorded: {}", error);

        self.errors.push(error);
    }

    pub fn had_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[LoxError] {
        &self.errors
    }

    /// Write every accumulated diagnostic to the error stream.
    pub fn print_all(&self) {
        for error in &self.errors {
            eprintln!("{}", error);
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, LoxError>;
