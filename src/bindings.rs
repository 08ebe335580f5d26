use std::{
    fs,
    io::{self, Write},
};

use crate::{
    environment::EnvironmentRef,
    value::{ErrorValue, NativeCallback, NativeFunction, Value, ValueKind},
};

/// The capabilities evaluated scripts reach the outside world through.
pub trait HostBindings {
    fn write_line(&mut self, line: &str) -> io::Result<()>;

    fn read_file(&mut self, path: &str) -> io::Result<String>;
}

/// Standard output and the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdHost;

impl HostBindings for StdHost {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{line}")?;
        stdout.flush()
    }

    fn read_file(&mut self, path: &str) -> io::Result<String> {
        fs::read_to_string(path)
    }
}

/// Defines `print` and `read` in the global scope.
pub fn install(env: &EnvironmentRef) {
    let mut scope = env.borrow_mut();
    scope.define("print".into(), native("print", host_print), false);
    scope.define("read".into(), native("read", host_read), false);
}

pub(crate) fn native(name: &'static str, callback: NativeCallback) -> Value {
    Value::new(ValueKind::NativeFunction(NativeFunction { name, callback }))
}

fn host_print(host: &mut dyn HostBindings, args: &[Value]) -> Result<Value, ErrorValue> {
    let line = args
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",");
    host.write_line(&line)
        .map_err(|err| ErrorValue::new("Error", format!("Failed to write output: {err}")))?;
    Ok(Value::undefined())
}

fn host_read(host: &mut dyn HostBindings, args: &[Value]) -> Result<Value, ErrorValue> {
    let Some(argument) = args.first() else {
        return Err(ErrorValue::new(
            "Error",
            "Required argument 1 'fileName' not found",
        ));
    };
    let Some(path) = argument.as_str() else {
        return Err(ErrorValue::new(
            "Error",
            "Required argument 1 'fileName' not string",
        ));
    };
    host.read_file(path)
        .map(Value::string)
        .map_err(|_| ErrorValue::new("Error", "Failed to read file"))
}
