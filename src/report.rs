//! Error reports and how outcomes are written to the output streams.
//!
//! A report renders as the top-level message followed by one line per
//! frame, innermost call first:
//!
//! ```text
//! ReferenceError: x is not defined
//!    at f (a.js:3:1)
//!    at (<stdin:1>:1:5)
//! ```

use std::{
    fmt,
    io::{self, Write},
};

use crate::{engine::Completion, pipeline::EvaluationOutcome};

/// One call-site record in an error's call chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    /// `None` for top-level and anonymous frames.
    pub function: Option<String>,
    pub script: String,
    /// 1-based.
    pub line: u32,
    /// 0-based.
    pub column: u32,
}

impl StackFrame {
    pub fn new(function: Option<&str>, script: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            function: function.map(str::to_string),
            script: script.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "   at ")?;
        if let Some(function) = self.function.as_deref().filter(|name| !name.is_empty()) {
            write!(f, "{function} ")?;
        }
        write!(f, "({}:{}:{})", self.script, self.line, self.column)
    }
}

/// An engine-reported failure: the message plus the captured call chain,
/// innermost first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    pub message: String,
    pub frames: Vec<StackFrame>,
}

impl ErrorReport {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            frames: Vec::new(),
        }
    }

    pub fn with_frame(mut self, frame: StackFrame) -> Self {
        self.frames.push(frame);
        self
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.message)?;
        for frame in &self.frames {
            writeln!(f, "{frame}")?;
        }
        Ok(())
    }
}

pub fn format_report(report: &ErrorReport) -> String {
    report.to_string()
}

/// Writes a value as `-> value` to `out`, nothing for a completion without a
/// value, and the formatted report to `err` for a failure.
pub fn report<V, O, E>(outcome: &EvaluationOutcome<V>, out: &mut O, err: &mut E) -> io::Result<()>
where
    V: fmt::Display,
    O: Write + ?Sized,
    E: Write + ?Sized,
{
    match outcome {
        EvaluationOutcome::Value(Completion::Value(value)) => {
            writeln!(out, "-> {value}")?;
            out.flush()
        }
        EvaluationOutcome::Value(Completion::NoValue) => Ok(()),
        EvaluationOutcome::Failure(failure) => {
            write!(err, "{}", failure.report)?;
            err.flush()
        }
    }
}
