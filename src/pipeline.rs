use std::fmt;

use tracing::{debug, debug_span};

use crate::{
    engine::{Completion, Engine},
    report::ErrorReport,
};

/// A unit of source text submitted for evaluation together with the name
/// that frames inside it report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFragment {
    pub name: String,
    pub text: String,
}

impl SourceFragment {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    /// The `counter`-th fragment read at the interactive prompt.
    pub fn interactive(counter: u64, text: impl Into<String>) -> Self {
        Self::new(format!("<stdin:{counter}>"), text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Origin,
    Compile,
    Run,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Origin => "origin",
            Phase::Compile => "compile",
            Phase::Run => "run",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub phase: Phase,
    pub report: ErrorReport,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationOutcome<V> {
    Value(Completion<V>),
    Failure(Failure),
}

impl<V> EvaluationOutcome<V> {
    pub fn is_failure(&self) -> bool {
        matches!(self, EvaluationOutcome::Failure(_))
    }
}

/// Drives fragments through the engine: name registration, compilation,
/// then execution in the shared global context. The first failing step
/// short-circuits the rest.
pub struct EvaluationPipeline<E> {
    engine: E,
}

impl<E: Engine> EvaluationPipeline<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    pub fn engine(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn evaluate(&mut self, fragment: &SourceFragment) -> EvaluationOutcome<E::Value> {
        let span = debug_span!("evaluate", fragment = %fragment.name);
        let _guard = span.enter();

        match self.submit(fragment) {
            Ok(completion) => {
                debug!("evaluated");
                EvaluationOutcome::Value(completion)
            }
            Err(failure) => {
                debug!(phase = %failure.phase, "evaluation failed");
                EvaluationOutcome::Failure(failure)
            }
        }
    }

    fn submit(&mut self, fragment: &SourceFragment) -> Result<Completion<E::Value>, Failure> {
        let origin = self
            .engine
            .origin(&fragment.name)
            .map_err(|report| failure(Phase::Origin, report))?;
        let script = self
            .engine
            .compile(&origin, &fragment.text)
            .map_err(|report| failure(Phase::Compile, report))?;
        self.engine
            .run(script)
            .map_err(|report| failure(Phase::Run, report))
    }
}

fn failure(phase: Phase, report: ErrorReport) -> Failure {
    Failure { phase, report }
}
