use std::path::PathBuf;

use clap::Parser;

use crate::{engine::DEFAULT_STACK_TRACE_LIMIT, reader::EmptyLinePolicy};

pub const USAGE: &str = "[-i] [<filename> | -]*";

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Evaluate scripts from files, piped input or an interactive prompt",
    override_usage = "vshell [-i] [<filename> | -]*"
)]
pub struct Args {
    /// Script files to evaluate in order; `-` starts an interactive prompt
    #[arg(value_name = "FILE")]
    pub inputs: Vec<PathBuf>,

    /// Start an interactive prompt after all files have been evaluated
    #[arg(short, long)]
    pub interactive: bool,

    /// What an empty line at the prompt does
    #[arg(long, value_enum, default_value_t, env = "VSHELL_EMPTY_LINE")]
    pub empty_line: EmptyLinePolicy,

    /// Maximum number of frames captured for an uncaught error
    #[arg(
        long,
        env = "VSHELL_STACK_TRACE_LIMIT",
        default_value_t = DEFAULT_STACK_TRACE_LIMIT as u32,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub stack_trace_limit: u32,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
