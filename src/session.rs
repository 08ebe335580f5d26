use std::{
    fs,
    io::{Read, Write},
    path::{Path, PathBuf},
};

use tracing::{debug, info};

use crate::{
    cli::{Args, USAGE},
    diagnostics::{Result, ShellError},
    engine::Engine,
    pipeline::{EvaluationPipeline, SourceFragment},
    reader::{EmptyLinePolicy, LineReader, ReadOutcome},
    report::report,
};

/// Name given to a script read in one piece from non-interactive stdin.
pub const PIPED_SCRIPT_NAME: &str = "<stdin>";

/// One step of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    File(PathBuf),
    /// Prompt on stdin until end of input.
    Interactive,
    /// Evaluate all of stdin as a single script.
    Piped,
}

#[derive(Debug, Clone)]
pub struct RunConfiguration {
    /// Display name used in usage messages.
    pub program: String,
    pub inputs: Vec<Input>,
    pub interactive: bool,
    pub empty_line: EmptyLinePolicy,
    pub stdin_is_terminal: bool,
}

impl RunConfiguration {
    /// Positionals equal to `-` become interactive steps at their position.
    pub fn new(
        program: impl Into<String>,
        positionals: Vec<PathBuf>,
        interactive: bool,
        empty_line: EmptyLinePolicy,
    ) -> Self {
        let inputs = positionals
            .into_iter()
            .map(|path| {
                if path.as_os_str() == "-" {
                    Input::Interactive
                } else {
                    Input::File(path)
                }
            })
            .collect();
        Self {
            program: program.into(),
            inputs,
            interactive,
            empty_line,
            stdin_is_terminal: true,
        }
    }

    pub fn from_args(program: impl Into<String>, args: &Args) -> Self {
        Self::new(
            program,
            args.inputs.clone(),
            args.interactive,
            args.empty_line,
        )
    }

    pub fn with_terminal_stdin(mut self, is_terminal: bool) -> Self {
        self.stdin_is_terminal = is_terminal;
        self
    }

    /// The steps to run, in order.
    pub fn plan(&self) -> Vec<Input> {
        let mut plan = self.inputs.clone();
        if self.interactive {
            plan.push(Input::Interactive);
        }
        if plan.is_empty() {
            plan.push(if self.stdin_is_terminal {
                Input::Interactive
            } else {
                Input::Piped
            });
        }
        plan
    }

    pub fn usage(&self) -> String {
        format!("Usage: {} {USAGE}", self.program)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSummary {
    /// Fragments handed to the pipeline, whatever their outcome.
    pub evaluated: usize,
    pub failed_files: Vec<PathBuf>,
}

impl SessionSummary {
    pub fn success(&self) -> bool {
        self.failed_files.is_empty()
    }
}

pub struct SessionDriver<E> {
    config: RunConfiguration,
    pipeline: EvaluationPipeline<E>,
    /// Number of the last fragment read at the prompt; shared by every
    /// interactive step so names are never reused.
    counter: u64,
    summary: SessionSummary,
}

impl<E: Engine> SessionDriver<E> {
    pub fn new(config: RunConfiguration, pipeline: EvaluationPipeline<E>) -> Self {
        Self {
            config,
            pipeline,
            counter: 0,
            summary: SessionSummary::default(),
        }
    }

    /// Runs every planned step. Script failures are reported and skipped;
    /// only I/O on the standard streams aborts the session.
    pub fn run<R, O, W>(mut self, input: R, out: &mut O, err: &mut W) -> Result<SessionSummary>
    where
        R: Read,
        O: Write + ?Sized,
        W: Write + ?Sized,
    {
        let mut reader = LineReader::new(input, self.config.empty_line);
        for step in self.config.plan() {
            debug!(?step, "session step");
            match step {
                Input::File(path) => self.run_file(&path, out, err)?,
                Input::Interactive => self.run_interactive(&mut reader, out, err)?,
                Input::Piped => {
                    let text = reader.read_to_end()?;
                    if !text.trim().is_empty() {
                        self.evaluate(SourceFragment::new(PIPED_SCRIPT_NAME, text), out, err)?;
                    }
                }
            }
        }
        info!(
            evaluated = self.summary.evaluated,
            failed_files = self.summary.failed_files.len(),
            "session finished"
        );
        Ok(self.summary)
    }

    fn run_file<O, W>(&mut self, path: &Path, out: &mut O, err: &mut W) -> Result<()>
    where
        O: Write + ?Sized,
        W: Write + ?Sized,
    {
        match read_script(path) {
            Ok(text) => {
                let fragment = SourceFragment::new(path.display().to_string(), text);
                self.evaluate(fragment, out, err)
            }
            Err(error) => {
                info!(%error, "skipping unreadable file");
                writeln!(err, "{}", self.config.usage())?;
                writeln!(err, "Failed to open: {}", path.display())?;
                err.flush()?;
                self.summary.failed_files.push(path.to_path_buf());
                Ok(())
            }
        }
    }

    fn run_interactive<R, O, W>(
        &mut self,
        reader: &mut LineReader<R>,
        out: &mut O,
        err: &mut W,
    ) -> Result<()>
    where
        R: Read,
        O: Write + ?Sized,
        W: Write + ?Sized,
    {
        while let ReadOutcome::Fragment(text) = reader.read(out)? {
            self.counter += 1;
            self.evaluate(SourceFragment::interactive(self.counter, text), out, err)?;
        }
        Ok(())
    }

    fn evaluate<O, W>(&mut self, fragment: SourceFragment, out: &mut O, err: &mut W) -> Result<()>
    where
        O: Write + ?Sized,
        W: Write + ?Sized,
    {
        let outcome = self.pipeline.evaluate(&fragment);
        self.summary.evaluated += 1;
        report(&outcome, out, err)?;
        Ok(())
    }
}

fn read_script(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| ShellError::FileAccess {
        path: path.to_path_buf(),
        source,
    })
}
