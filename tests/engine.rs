use std::{cell::RefCell, fs, io, path::Path, rc::Rc, thread};

use tempfile::tempdir;
use vshell::{
    Completion, ErrorReport, Interpreter, StackFrame, bindings::HostBindings,
    parser::MAX_NESTING_DEPTH,
    runtime::MAX_CALL_DEPTH,
};

#[derive(Clone, Default)]
struct RecordingHost {
    lines: Rc<RefCell<Vec<String>>>,
}

impl HostBindings for RecordingHost {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.lines.borrow_mut().push(line.to_string());
        Ok(())
    }

    fn read_file(&mut self, path: &str) -> io::Result<String> {
        fs::read_to_string(path)
    }
}

fn interpreter() -> Interpreter {
    Interpreter::new(Box::new(RecordingHost::default()), 256)
}

fn eval(source: &str) -> Option<String> {
    match interpreter().eval_source("test.js", source) {
        Ok(Completion::Value(value)) => Some(value.to_string()),
        Ok(Completion::NoValue) => None,
        Err(report) => panic!("evaluation failed:\n{report}"),
    }
}

fn value(source: &str) -> String {
    eval(source).expect("expected a value")
}

fn eval_error(source: &str) -> ErrorReport {
    eval_error_named("test.js", source)
}

fn eval_error_named(name: &str, source: &str) -> ErrorReport {
    match interpreter().eval_source(name, source) {
        Ok(completion) => panic!("expected error, received {completion:?}"),
        Err(report) => report,
    }
}

/// Runs `body` on a thread with a generous stack; debug builds use large frames.
fn on_large_stack<T: Send + 'static>(body: impl FnOnce() -> T + Send + 'static) -> T {
    thread::Builder::new()
        .stack_size(64 * 1024 * 1024)
        .spawn(body)
        .expect("spawn test thread")
        .join()
        .expect("thread completes")
}

fn completion_text(completion: Completion<vshell::Value>) -> String {
    match completion {
        Completion::Value(value) => value.to_string(),
        Completion::NoValue => String::new(),
    }
}

fn path_literal(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "\\\\")
}

#[test]
fn evaluates_basic_arithmetic() {
    assert_eq!(value("2 + 3 * 4"), "14");
    assert_eq!(value("(2 + 3) * 4"), "20");
    assert_eq!(value("7 % 3"), "1");
}

#[test]
fn division_falls_back_to_floats() {
    assert_eq!(value("6 / 3"), "2");
    assert_eq!(value("7 / 2"), "3.5");
    assert_eq!(value("1 / 0"), "Infinity");
    assert_eq!(value("0.1 + 0.2"), "0.30000000000000004");
}

#[test]
fn string_concatenation_converts_operands() {
    assert_eq!(value("'a' + 1"), "a1");
    assert_eq!(value("1 + 2 + 'px'"), "3px");
}

#[test]
fn undefined_result_has_no_value() {
    assert_eq!(eval("undefined"), None);
    assert_eq!(eval("var x = 1;"), None);
    assert_eq!(eval(""), None);
}

#[test]
fn last_expression_statement_is_the_result() {
    assert_eq!(value("var x = 40;\nx + 2;\nvar y = 1;"), "42");
}

#[test]
fn recursive_functions() {
    let source = "function fact(n) { if (n <= 1) { return 1; } return n * fact(n - 1); }\nfact(10)";
    assert_eq!(value(source), "3628800");
}

#[test]
fn function_declarations_are_hoisted() {
    assert_eq!(value("f();\nfunction f() { return 3; }"), "3");
}

#[test]
fn closures_capture_their_scope() {
    let source = r#"
        function counter() {
            var n = 0;
            return function () { n = n + 1; return n; };
        }
        var c = counter();
        c();
        c()
    "#;
    assert_eq!(value(source), "2");
}

#[test]
fn functions_without_return_yield_undefined() {
    assert_eq!(eval("function f() { 1 + 1; }\nf()"), None);
}

#[test]
fn while_loop_with_break_and_continue() {
    let source = r#"
        var i = 0;
        var s = 0;
        while (true) {
            i = i + 1;
            if (i > 5) { break; }
            if (i % 2 == 0) { continue; }
            s = s + i;
        }
        s
    "#;
    assert_eq!(value(source), "9");
}

#[test]
fn logical_operators_short_circuit() {
    assert_eq!(value("false && missing()"), "false");
    assert_eq!(value("'left' || missing()"), "left");
    assert_eq!(value("0 || 'fallback'"), "fallback");
}

#[test]
fn equality_follows_loose_and_strict_rules() {
    assert_eq!(value("null == undefined"), "true");
    assert_eq!(value("null === undefined"), "false");
    assert_eq!(value("1 === 1.0"), "true");
    assert_eq!(value("'a' !== 'b'"), "true");
}

#[test]
fn typeof_reports_type_names() {
    assert_eq!(value("typeof 1"), "number");
    assert_eq!(value("typeof 'x'"), "string");
    assert_eq!(value("typeof null"), "object");
    assert_eq!(value("typeof print"), "function");
    assert_eq!(value("typeof notDeclared"), "undefined");
}

#[test]
fn arrays_and_objects_support_nested_updates() {
    let source = "var o = {a: 1, b: [1, 2]};\no.b[1] = 5;\no.c = 'x';\no";
    assert_eq!(value(source), r#"{a: 1, b: [1, 5], c: "x"}"#);
    assert_eq!(value("var a = [];\na[2] = 1;\na.length"), "3");
    assert_eq!(value("'hello'.length"), "5");
    assert_eq!(eval("({k: 1}).missing"), None);
}

#[test]
fn try_catch_exposes_thrown_error() {
    let source = r#"
        var r;
        try {
            throw Error('boom');
        } catch (e) {
            r = e.name + ': ' + e.message;
        }
        r
    "#;
    assert_eq!(value(source), "Error: boom");
}

#[test]
fn finally_overrides_return() {
    let source = "function f() { try { return 1; } finally { return 2; } }\nf()";
    assert_eq!(value(source), "2");
}

#[test]
fn catch_recovers_from_runtime_errors() {
    assert_eq!(
        value("try { nope; } catch (e) { e.message }"),
        "nope is not defined"
    );
}

#[test]
fn reference_error_points_at_identifier() {
    let report = eval_error_named("<stdin:1>", "[10, x]");
    assert_eq!(report.message, "ReferenceError: x is not defined");
    assert_eq!(report.frames, vec![StackFrame::new(None, "<stdin:1>", 1, 5)]);
    assert_eq!(
        report.to_string(),
        "ReferenceError: x is not defined\n   at (<stdin:1>:1:5)\n"
    );
}

#[test]
fn nested_calls_produce_innermost_first_trace() {
    let source = [
        "function inner() {",
        "  return missing;",
        "}",
        "function outer() {",
        "  return inner();",
        "}",
        "outer();",
    ]
    .join("\n");
    let report = eval_error_named("a.js", &source);
    assert_eq!(report.message, "ReferenceError: missing is not defined");
    assert_eq!(
        report.frames,
        vec![
            StackFrame::new(Some("inner"), "a.js", 2, 9),
            StackFrame::new(Some("outer"), "a.js", 5, 9),
            StackFrame::new(None, "a.js", 7, 0),
        ]
    );
}

#[test]
fn frames_point_into_the_defining_script() {
    let mut interpreter = interpreter();
    interpreter
        .eval_source("lib.js", "function boom() {\n  throw Error('bad');\n}")
        .expect("library loads");
    let report = interpreter
        .eval_source("<stdin:1>", "boom()")
        .expect_err("boom throws");
    assert_eq!(
        report.to_string(),
        "Error: bad\n   at boom (lib.js:2:2)\n   at (<stdin:1>:1:0)\n"
    );
}

#[test]
fn non_error_values_are_reported_as_uncaught() {
    assert_eq!(eval_error("throw 42").message, "Uncaught 42");
    assert_eq!(eval_error("throw 'oops'").message, "Uncaught oops");
}

#[test]
fn constants_cannot_be_reassigned() {
    let report = eval_error("const k = 1; k = 2");
    assert_eq!(report.message, "TypeError: Assignment to constant variable.");
    assert_eq!(report.frames, vec![StackFrame::new(None, "test.js", 1, 13)]);
}

#[test]
fn assignment_to_undeclared_name_fails() {
    assert_eq!(
        eval_error("ghost = 1").message,
        "ReferenceError: ghost is not defined"
    );
}

#[test]
fn type_errors_from_misuse() {
    assert_eq!(
        eval_error("var n = 1;\nn()").message,
        "TypeError: n is not a function"
    );
    assert_eq!(
        eval_error("var u;\nu.x").message,
        "TypeError: Cannot read properties of undefined (reading 'x')"
    );
    assert_eq!(
        eval_error("true - 1").message,
        "TypeError: Cannot apply '-' to boolean and number"
    );
}

#[test]
fn syntax_errors_carry_one_frame() {
    let report = eval_error("var = 1");
    assert_eq!(report.message, "SyntaxError: Unexpected token '='");
    assert_eq!(report.frames, vec![StackFrame::new(None, "test.js", 1, 4)]);

    assert_eq!(
        eval_error("'open").message,
        "SyntaxError: Invalid or unexpected token"
    );
    assert_eq!(
        eval_error("(1 + ").message,
        "SyntaxError: Unexpected end of input"
    );
}

#[test]
fn misplaced_control_flow_is_rejected_at_compile_time() {
    assert_eq!(
        eval_error("return 1").message,
        "SyntaxError: Illegal return statement"
    );
    assert_eq!(
        eval_error("break;").message,
        "SyntaxError: Illegal break statement"
    );
    assert_eq!(
        eval_error("while (true) { function f() { continue; } }").message,
        "SyntaxError: Illegal continue statement: no surrounding iteration statement"
    );
}

#[test]
fn failed_script_does_not_run_any_statement() {
    let mut interpreter = interpreter();
    interpreter
        .eval_source("a.js", "var side = 1;\nside = 2;\n)")
        .expect_err("syntax error");
    let result = interpreter.eval_source("b.js", "typeof side");
    assert!(matches!(result, Ok(Completion::Value(v)) if v.to_string() == "undefined"));
}

#[test]
fn bindings_persist_between_scripts() {
    let mut interpreter = interpreter();
    interpreter
        .eval_source("<stdin:1>", "var total = 10;")
        .expect("first script");
    interpreter
        .eval_source("<stdin:2>", "throw Error('midway')")
        .expect_err("second script throws");
    let result = interpreter
        .eval_source("<stdin:3>", "total + 1")
        .expect("third script");
    assert!(matches!(result, Completion::Value(v) if v.to_string() == "11"));
}

#[test]
fn print_joins_arguments_with_commas() {
    let host = RecordingHost::default();
    let lines = Rc::clone(&host.lines);
    let mut interpreter = Interpreter::new(Box::new(host), 256);
    interpreter
        .eval_source("p.js", "print('a', 1, [1, 'b']);\nprint();")
        .expect("prints");
    assert_eq!(lines.borrow().as_slice(), [r#"a,1,[1, "b"]"#, ""]);
}

#[test]
fn read_returns_file_contents() {
    let dir = tempdir().expect("create temp dir");
    let path = dir.path().join("data.txt");
    fs::write(&path, "line one\nline two").expect("write data file");

    let source = format!("read('{}')", path_literal(&path));
    assert_eq!(value(&source), "line one\nline two");
}

#[test]
fn read_errors_are_catchable() {
    assert_eq!(
        eval_error("read()").message,
        "Error: Required argument 1 'fileName' not found"
    );
    assert_eq!(
        eval_error("read(42)").message,
        "Error: Required argument 1 'fileName' not string"
    );
    assert_eq!(
        eval_error("read('/definitely/not/here.txt')").message,
        "Error: Failed to read file"
    );
    assert_eq!(
        value("try { read(); } catch (e) { 'caught ' + e.name }"),
        "caught Error"
    );
}

#[test]
fn runaway_recursion_raises_range_error() {
    // Run on a thread with a generous stack; debug builds use large frames.
    let handle = thread::Builder::new()
        .stack_size(64 * 1024 * 1024)
        .spawn(|| {
            let mut interpreter = Interpreter::new(Box::new(RecordingHost::default()), 10);
            let report = interpreter
                .eval_source("deep.js", "function r(n) { return r(n + 1); }\nr(0)")
                .expect_err("recursion overflows");
            let caught = interpreter
                .eval_source(
                    "catch.js",
                    "var depth = 0;\nfunction d() { depth = depth + 1; d(); }\ntry { d(); } catch (e) { depth }",
                )
                .expect("overflow is catchable");
            let caught = match caught {
                Completion::Value(value) => value.to_string(),
                Completion::NoValue => String::new(),
            };
            (report, caught)
        })
        .expect("spawn test thread");
    let (report, caught) = handle.join().expect("thread completes");

    assert_eq!(report.message, "RangeError: Maximum call stack size exceeded");
    assert_eq!(report.frames.len(), 10);
    assert_eq!(report.frames[0].function.as_deref(), Some("r"));
    assert_eq!(caught, MAX_CALL_DEPTH.to_string());
}

#[test]
fn deeply_nested_source_is_rejected_without_overflowing() {
    let sources = [
        format!("{}1{}", "(".repeat(100_000), ")".repeat(100_000)),
        format!("1{}", " + 1".repeat(4_999)),
        format!("{}true", "!".repeat(100_000)),
        format!("{}{}", "{".repeat(100_000), "}".repeat(100_000)),
        format!("var o = 1;\no{}", ".k".repeat(100_000)),
        format!("var a;\n{}1", "a = ".repeat(100_000)),
        format!("1{}", " || 1".repeat(10_000)),
    ];
    let (reports, after) = on_large_stack(move || {
        let mut interpreter = Interpreter::new(Box::new(RecordingHost::default()), 256);
        let reports: Vec<ErrorReport> = sources
            .iter()
            .map(|source| {
                interpreter
                    .eval_source("deep.js", source)
                    .expect_err("nesting is rejected")
            })
            .collect();
        let after = interpreter
            .eval_source("next.js", "'after'")
            .map(completion_text)
            .expect("next script runs");
        (reports, after)
    });

    for report in &reports {
        assert_eq!(report.message, "RangeError: Maximum call stack size exceeded");
        assert_eq!(report.frames.len(), 1);
        assert_eq!(report.frames[0].script, "deep.js");
    }
    assert_eq!(after, "after");
}

#[test]
fn nesting_within_the_limit_still_evaluates() {
    let depth = MAX_NESTING_DEPTH - 56;
    let (grouped, chained) = on_large_stack(move || {
        (
            eval(&format!("{}7{}", "(".repeat(depth), ")".repeat(depth))),
            eval(&format!("1{}", " + 1".repeat(depth - 1))),
        )
    });
    assert_eq!(grouped.as_deref(), Some("7"));
    assert_eq!(chained, Some(depth.to_string()));
}

#[test]
fn deep_evaluation_across_calls_raises_catchable_range_error() {
    // Each call nests a couple of hundred expressions, so the evaluation
    // limit is reached long before the call limit.
    let wrap = |stop: u32| {
        format!(
            "function f(n) {{ if (n == {stop}) {{ return n; }} return {}f(n + 1){}; }}",
            "(".repeat(200),
            ")".repeat(200)
        )
    };
    let shallow = wrap(3);
    let deep = wrap(10);
    let (shallow_value, caught, uncaught, after) = on_large_stack(move || {
        let mut interpreter = Interpreter::new(Box::new(RecordingHost::default()), 256);
        let shallow_value = interpreter
            .eval_source("shallow.js", &format!("{shallow}\nf(0)"))
            .map(completion_text)
            .expect("shallow nesting completes");
        let caught = interpreter
            .eval_source(
                "caught.js",
                &format!("{deep}\ntry {{ f(0); }} catch (e) {{ e.name + ': ' + e.message }}"),
            )
            .map(completion_text)
            .expect("overflow is catchable");
        let uncaught = interpreter
            .eval_source("uncaught.js", "f(0)")
            .expect_err("overflow propagates");
        let after = interpreter
            .eval_source("after.js", "1 + 1")
            .map(completion_text)
            .expect("depth resets between scripts");
        (shallow_value, caught, uncaught, after)
    });

    assert_eq!(shallow_value, "3");
    assert_eq!(caught, "RangeError: Maximum call stack size exceeded");
    assert_eq!(uncaught.message, "RangeError: Maximum call stack size exceeded");
    assert_eq!(uncaught.frames[0].function.as_deref(), Some("f"));
    assert_eq!(after, "2");
}
