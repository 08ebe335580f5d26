use std::{
    env,
    io::{self, IsTerminal},
    path::Path,
    process::ExitCode,
    thread,
};

use clap::Parser;
use tracing::debug;

use vshell::{
    EvaluationPipeline, Platform, PlatformOptions, RunConfiguration, SessionDriver,
    SessionSummary, ShellError, StdHost, cli::Args, logger,
};

/// Scripts nest up to the parser and evaluator limits; unoptimized builds
/// need more than the default main-thread stack to get there.
const SESSION_STACK_SIZE: usize = 64 * 1024 * 1024;

fn main() -> ExitCode {
    let args = Args::parse();
    logger::init(args.verbose);

    let session = thread::Builder::new()
        .name("session".into())
        .stack_size(SESSION_STACK_SIZE)
        .spawn(move || run(&args));
    let outcome = match session {
        Ok(handle) => match handle.join() {
            Ok(outcome) => outcome,
            // The panic hook has already reported the failure.
            Err(_) => return ExitCode::FAILURE,
        },
        Err(err) => Err(ShellError::Io(err)),
    };

    match outcome {
        Ok(summary) if summary.success() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(err) => {
            debug!(?err, "session aborted");
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<SessionSummary, ShellError> {
    let config = RunConfiguration::from_args(program_name(), args)
        .with_terminal_stdin(io::stdin().is_terminal());
    let platform = Platform::initialize(PlatformOptions {
        stack_trace_limit: args.stack_trace_limit as usize,
    })?;

    platform.with_context(Box::new(StdHost), |interpreter| {
        let driver = SessionDriver::new(config, EvaluationPipeline::new(interpreter));
        driver.run(io::stdin().lock(), &mut io::stdout(), &mut io::stderr())
    })
}

fn program_name() -> String {
    env::args_os()
        .next()
        .as_deref()
        .map(Path::new)
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "vshell".to_string())
}
