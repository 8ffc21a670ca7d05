// Copyright (c) 2021 The mead authors

//! Diagnostics raised during elaboration.
//!
//! Diagnostics carry a stable code, a source location, and the symbol that
//! was being processed when the diagnostic was raised. The compilation
//! coalesces entries that share a `(code, location)` key; rendering beyond
//! a plain `Display` is left to the driver.

use crate::crate_prelude::*;
use crate::symbols::Symbol;
use std::fmt;
use std::ops::Deref;

/// The stable codes for diagnostics raised by the elaboration core.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum DiagCode {
    /// Raised by the parser; carried through on the syntax tree.
    SyntaxError,
    UndeclaredIdentifier,
    AmbiguousImport,
    UnknownModule,
    NotAType,
    NotAConstant,
    DivideByZero,
    GenerateLoopLimit,
}

#[derive(Clone, Debug)]
pub struct Diagnostic<'a> {
    pub code: DiagCode,
    pub severity: Severity,
    pub location: Location,
    pub message: String,
    pub symbol: Option<&'a Symbol<'a>>,
    /// When the same diagnostic was raised by several instances of one
    /// definition, the number of instances it was collapsed across.
    pub coalesce_count: Option<usize>,
    pub notes: Vec<String>,
}

impl<'a> Diagnostic<'a> {
    pub fn new<S: Into<String>>(code: DiagCode, location: Location, message: S) -> Self {
        Diagnostic {
            code,
            severity: Severity::Error,
            location,
            message: message.into(),
            symbol: None,
            coalesce_count: None,
            notes: Vec::new(),
        }
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn symbol(mut self, symbol: &'a Symbol<'a>) -> Self {
        self.symbol = Some(symbol);
        self
    }

    pub fn add_note<S: Into<String>>(mut self, note: S) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity >= Severity::Error
    }
}

impl fmt::Display for Diagnostic<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)?;
        if let Some(count) = self.coalesce_count {
            write!(f, " (in {} instances)", count)?;
        }
        for note in &self.notes {
            write!(f, "\n  note: {}", note)?;
        }
        Ok(())
    }
}

/// An ordered list of diagnostics.
#[derive(Clone, Debug, Default)]
pub struct Diagnostics<'a>(Vec<Diagnostic<'a>>);

impl<'a> Diagnostics<'a> {
    pub fn new() -> Self {
        Diagnostics(Vec::new())
    }

    pub fn push(&mut self, diag: Diagnostic<'a>) {
        self.0.push(diag);
    }

    pub fn extend_from(&mut self, other: &Diagnostics<'a>) {
        self.0.extend(other.0.iter().cloned());
    }

    /// Sort by source-manager byte position, then by code for stability.
    pub fn sort(&mut self) {
        self.0.sort_by_key(|d| (d.location, d.code));
    }
}

impl<'a> Deref for Diagnostics<'a> {
    type Target = [Diagnostic<'a>];
    fn deref(&self) -> &[Diagnostic<'a>] {
        &self.0
    }
}

impl<'a> IntoIterator for Diagnostics<'a> {
    type Item = Diagnostic<'a>;
    type IntoIter = std::vec::IntoIter<Diagnostic<'a>>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
