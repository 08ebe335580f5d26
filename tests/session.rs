use std::{fs, io, path::PathBuf};

use tempfile::tempdir;
use vshell::{
    EmptyLinePolicy, EvaluationPipeline, Input, Interpreter, RunConfiguration, SessionDriver,
    SessionSummary, bindings::HostBindings,
};

/// Host whose `print` output is discarded.
struct SilentHost;

impl HostBindings for SilentHost {
    fn write_line(&mut self, _line: &str) -> io::Result<()> {
        Ok(())
    }

    fn read_file(&mut self, path: &str) -> io::Result<String> {
        fs::read_to_string(path)
    }
}

struct Run {
    summary: SessionSummary,
    out: String,
    err: String,
}

fn run(config: RunConfiguration, stdin: &str) -> Run {
    let mut interpreter = Interpreter::new(Box::new(SilentHost), 256);
    let driver = SessionDriver::new(config, EvaluationPipeline::new(&mut interpreter));
    let mut out = Vec::new();
    let mut err = Vec::new();
    let summary = driver
        .run(stdin.as_bytes(), &mut out, &mut err)
        .expect("session runs");
    Run {
        summary,
        out: String::from_utf8(out).expect("utf-8 stdout"),
        err: String::from_utf8(err).expect("utf-8 stderr"),
    }
}

fn config(positionals: &[&str], interactive: bool) -> RunConfiguration {
    RunConfiguration::new(
        "vshell",
        positionals.iter().map(PathBuf::from).collect(),
        interactive,
        EmptyLinePolicy::Stop,
    )
}

#[test]
fn plan_without_arguments_depends_on_terminal() {
    assert_eq!(config(&[], false).plan(), vec![Input::Interactive]);
    assert_eq!(
        config(&[], false).with_terminal_stdin(false).plan(),
        vec![Input::Piped]
    );
}

#[test]
fn plan_keeps_positional_order_and_appends_interactive_flag() {
    let plan = config(&["a.js", "-", "b.js"], true).plan();
    assert_eq!(
        plan,
        vec![
            Input::File(PathBuf::from("a.js")),
            Input::Interactive,
            Input::File(PathBuf::from("b.js")),
            Input::Interactive,
        ]
    );
}

#[test]
fn interactive_fragments_are_numbered_from_one() {
    let result = run(config(&["-"], false), "var x = 5;\n1+1\nx\n");
    assert_eq!(result.out, ">>> >>> -> 2\n>>> -> 5\n>>> \n");
    assert!(result.err.is_empty());
    assert_eq!(result.summary.evaluated, 3);
}

#[test]
fn failing_fragments_still_consume_a_number() {
    let result = run(config(&["-"], false), "1 +\nmissing\n");
    assert_eq!(
        result.err,
        "SyntaxError: Unexpected end of input\n   at (<stdin:1>:1:3)\n\
         ReferenceError: missing is not defined\n   at (<stdin:2>:1:0)\n"
    );
    assert!(result.summary.success());
}

#[test]
fn continuation_lines_form_one_fragment() {
    let result = run(config(&["-"], false), "[1, \\\n2]\n");
    assert_eq!(result.out, ">>> ... -> [1, 2]\n>>> \n");
    assert_eq!(result.summary.evaluated, 1);
}

#[test]
fn empty_input_evaluates_nothing() {
    let result = run(config(&["-"], false), "");
    assert_eq!(result.out, ">>> \n");
    assert_eq!(result.summary.evaluated, 0);
}

#[test]
fn counter_continues_across_interactive_loops() {
    let result = run(config(&["-", "-"], false), "1\n\nnope\n");
    assert!(result.err.contains("(<stdin:2>:1:0)"), "{}", result.err);
}

#[test]
fn file_values_and_errors_are_reported() {
    let dir = tempdir().expect("create temp dir");
    let script = dir.path().join("main.js");
    fs::write(&script, "var a = 20;\na + 22\n").expect("write script");

    let script_arg = script.to_string_lossy().into_owned();
    let result = run(config(&[script_arg.as_str()], false), "");
    assert_eq!(result.out, "-> 42\n");
    assert!(result.err.is_empty());
    assert!(result.summary.success());
}

#[test]
fn missing_file_is_reported_and_next_file_still_runs() {
    let dir = tempdir().expect("create temp dir");
    let missing = dir.path().join("missing.js");
    let present = dir.path().join("present.js");
    fs::write(&present, "'second ran'").expect("write script");

    let missing_arg = missing.to_string_lossy().into_owned();
    let present_arg = present.to_string_lossy().into_owned();
    let result = run(config(&[missing_arg.as_str(), present_arg.as_str()], false), "");

    assert_eq!(
        result.err,
        format!(
            "Usage: vshell [-i] [<filename> | -]*\nFailed to open: {}\n",
            missing.display()
        )
    );
    assert_eq!(result.out, "-> second ran\n");
    assert_eq!(result.summary.failed_files, vec![missing]);
    assert_eq!(result.summary.evaluated, 1);
    assert!(!result.summary.success());
}

#[test]
fn files_share_the_global_context_with_the_prompt() {
    let dir = tempdir().expect("create temp dir");
    let lib = dir.path().join("lib.js");
    fs::write(&lib, "function double(n) { return n * 2; }").expect("write lib");

    let lib_arg = lib.to_string_lossy().into_owned();
    let result = run(config(&[lib_arg.as_str()], true), "double(21)\n");
    assert_eq!(result.out, ">>> -> 42\n>>> \n");
}

#[test]
fn piped_stdin_is_one_script() {
    let config = config(&[], false).with_terminal_stdin(false);
    let result = run(config, "var a = 1;\nvar b = 2;\na + b\n");
    assert_eq!(result.out, "-> 3\n");
    assert_eq!(result.summary.evaluated, 1);
}

#[test]
fn piped_errors_name_the_stdin_script() {
    let config = config(&[], false).with_terminal_stdin(false);
    let result = run(config, "\n\nthrow Error('late')\n");
    assert_eq!(result.err, "Error: late\n   at (<stdin>:3:0)\n");
}

#[test]
fn blank_piped_input_is_skipped() {
    let config = config(&[], false).with_terminal_stdin(false);
    let result = run(config, "  \n");
    assert_eq!(result.summary.evaluated, 0);
    assert!(result.out.is_empty());
}

#[test]
fn reprompt_policy_skips_empty_lines() {
    let mut config = config(&["-"], false);
    config.empty_line = EmptyLinePolicy::Reprompt;
    let result = run(config, "1\n\n2\n");
    assert_eq!(result.out, ">>> -> 1\n>>> >>> -> 2\n>>> \n");
}

#[test]
fn prompt_fragments_match_the_same_lines_run_as_files() {
    let lines = [
        "var greeting = 'a\\tb';",
        "greeting",
        "greeting.length",
        "'c\\\\d'",
        "missing",
        "[1, 2]",
        "throw Error('x')",
    ];

    let dir = tempdir().expect("create temp dir");
    let paths: Vec<PathBuf> = lines
        .iter()
        .enumerate()
        .map(|(idx, line)| {
            let path = dir.path().join(format!("line{}.js", idx + 1));
            fs::write(&path, line).expect("write script");
            path
        })
        .collect();
    let positionals: Vec<String> = paths.iter().map(|path| path.display().to_string()).collect();
    let positionals: Vec<&str> = positionals.iter().map(String::as_str).collect();
    let from_files = run(config(&positionals, false), "");

    let from_prompt = run(config(&["-"], false), &format!("{}\n", lines.join("\n")));

    let prompt_out = from_prompt.out.replace(">>> ", "");
    let prompt_out = prompt_out.strip_suffix('\n').expect("final newline at end of input");
    let mut file_err = from_files.err.clone();
    for (idx, path) in paths.iter().enumerate() {
        file_err = file_err.replace(
            &format!("({}:", path.display()),
            &format!("(<stdin:{}>:", idx + 1),
        );
    }

    assert_eq!(from_files.out, "-> a\tb\n-> 3\n-> c\\d\n-> [1, 2]\n");
    assert_eq!(prompt_out, from_files.out);
    assert_eq!(
        from_prompt.err,
        "ReferenceError: missing is not defined\n   at (<stdin:5>:1:0)\n\
         Error: x\n   at (<stdin:7>:1:0)\n"
    );
    assert_eq!(file_err, from_prompt.err);
    assert_eq!(from_files.summary.evaluated, lines.len());
    assert_eq!(from_prompt.summary.evaluated, lines.len());
}
