//! Interactive and batch host for an embedded script engine.
//!
//! Source text comes from files, piped stdin or a prompt with backslash
//! continuation; each fragment is compiled and run in one persistent global
//! context and either its value or a formatted error trace is reported.

pub mod ast;
pub mod bindings;
pub mod cli;
pub mod diagnostics;
pub mod engine;
pub mod environment;
pub mod lexer;
pub mod logger;
pub mod parser;
pub mod pipeline;
pub mod reader;
pub mod report;
pub mod runtime;
pub mod session;
pub mod value;

pub use bindings::{HostBindings, StdHost};
pub use diagnostics::{Diagnostic, DiagnosticKind, ShellError, SourceSpan};
pub use engine::{Completion, Engine, Platform, PlatformOptions, ScriptOrigin};
pub use pipeline::{EvaluationOutcome, EvaluationPipeline, Failure, Phase, SourceFragment};
pub use reader::{EmptyLinePolicy, LineReader, ReadOutcome};
pub use report::{ErrorReport, StackFrame, format_report};
pub use runtime::Interpreter;
pub use session::{Input, RunConfiguration, SessionDriver, SessionSummary};
pub use value::Value;
