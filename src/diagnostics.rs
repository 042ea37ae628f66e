//! Diagnostic collection for one source unit.
//!
//! Every pipeline stage reports into a [`Diagnostics`] value instead of
//! flipping process‑wide flags.  The caller inspects it between stages:
//! static errors (scan, parse, resolve) mean the program must not run, and a
//! runtime error means execution stopped early.

use log::debug;

use crate::error::LoxError;

/// Ordered list of the errors reported while processing a source unit.
#[derive(Debug, Default)]
pub struct Diagnostics {
    errors: Vec<LoxError>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error.  Reporting never aborts the reporting stage.
    pub fn report(&mut self, error: LoxError) {
        debug!("Diagnostic reported: {}", error);

        self.errors.push(error);
    }

    /// Any scan, parse or resolution error so far?
    pub fn had_error(&self) -> bool {
        self.errors.iter().any(LoxError::is_static)
    }

    /// Did execution stop on an uncaught runtime error?
    pub fn had_runtime_error(&self) -> bool {
        self.errors.iter().any(LoxError::is_runtime)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LoxError> {
        self.errors.iter()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Bare messages, in report order.
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(LoxError::message).collect()
    }
}

impl IntoIterator for Diagnostics {
    type Item = LoxError;
    type IntoIter = std::vec::IntoIter<LoxError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}
