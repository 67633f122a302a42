//! Error types for stub registration and lookup.

use crate::stub::Stub;
use thiserror::Error;

/// Errors returned by the stub engine.
#[derive(Error, Debug)]
pub enum StubError {
    /// Stub registered without a service name.
    #[error("Service name can't be empty")]
    EmptyService,

    /// Stub registered without a method name.
    #[error("Method name can't be empty")]
    EmptyMethod,

    /// None of `equals`, `contains` or `matches` is populated.
    #[error("Input cannot be empty")]
    EmptyInput,

    /// None of `data`, `error` or `code` is populated.
    #[error("Output can't be empty")]
    EmptyOutput,

    /// A `matches` pattern failed to compile.
    #[error("Invalid pattern for field '{field}': {source}")]
    InvalidPattern {
        /// Field the pattern applies to.
        field: String,
        /// Compilation failure.
        #[source]
        source: regex::Error,
    },

    /// `output.code` is not a known status code.
    #[error("Invalid status code: {0}")]
    InvalidStatusCode(String),

    /// No registered stub matched a lookup.
    #[error("Can't find stub for {service}/{method}{}", closest_suffix(.closest))]
    NotFound {
        service: String,
        method: String,
        /// Candidate that came nearest to matching, for diagnostics.
        closest: Option<Box<Stub>>,
    },
}

impl StubError {
    /// Whether this error rejected a registration.
    pub fn is_validation(&self) -> bool {
        !self.is_not_found()
    }

    /// Whether this error is a lookup miss.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StubError::NotFound { .. })
    }
}

fn closest_suffix(closest: &Option<Box<Stub>>) -> String {
    match closest {
        Some(stub) => match serde_json::to_string(&stub.input) {
            Ok(rule) => format!("; closest match: {}", rule),
            Err(_) => String::new(),
        },
        None => String::new(),
    }
}
