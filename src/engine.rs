use std::fmt;

use tracing::info;

use crate::{
    bindings::HostBindings,
    diagnostics::{Result, ShellError},
    report::ErrorReport,
    runtime::Interpreter,
};

/// Frames captured per uncaught failure unless configured otherwise.
pub const DEFAULT_STACK_TRACE_LIMIT: usize = 0x100;

/// Result of running a script that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion<V> {
    Value(V),
    /// The script produced nothing worth printing (`undefined`).
    NoValue,
}

/// A validated compilation-unit name, e.g. a file path or `<stdin:3>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScriptOrigin(String);

impl ScriptOrigin {
    pub fn new(name: &str) -> std::result::Result<Self, ErrorReport> {
        if name.is_empty() {
            return Err(ErrorReport::new("TypeError: Script name must not be empty"));
        }
        if name.contains('\0') {
            return Err(ErrorReport::new(format!(
                "TypeError: Invalid script name {name:?}"
            )));
        }
        Ok(Self(name.to_string()))
    }

    /// Origin of values created outside any script.
    pub(crate) fn host() -> Self {
        Self("<host>".to_string())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScriptOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The evaluation engine the host drives. Each step fails independently so
/// callers can tell which one went wrong.
pub trait Engine {
    type Script;
    type Value: fmt::Display;

    /// Registers `name` as the identifier of a compilation unit.
    fn origin(&mut self, name: &str) -> std::result::Result<ScriptOrigin, ErrorReport>;

    fn compile(
        &mut self,
        origin: &ScriptOrigin,
        source: &str,
    ) -> std::result::Result<Self::Script, ErrorReport>;

    /// Runs a compiled unit in the engine's persistent global context.
    fn run(
        &mut self,
        script: Self::Script,
    ) -> std::result::Result<Completion<Self::Value>, ErrorReport>;
}

impl<E: Engine + ?Sized> Engine for &mut E {
    type Script = E::Script;
    type Value = E::Value;

    fn origin(&mut self, name: &str) -> std::result::Result<ScriptOrigin, ErrorReport> {
        (**self).origin(name)
    }

    fn compile(
        &mut self,
        origin: &ScriptOrigin,
        source: &str,
    ) -> std::result::Result<Self::Script, ErrorReport> {
        (**self).compile(origin, source)
    }

    fn run(
        &mut self,
        script: Self::Script,
    ) -> std::result::Result<Completion<Self::Value>, ErrorReport> {
        (**self).run(script)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformOptions {
    pub stack_trace_limit: usize,
}

impl Default for PlatformOptions {
    fn default() -> Self {
        Self {
            stack_trace_limit: DEFAULT_STACK_TRACE_LIMIT,
        }
    }
}

/// Process-wide engine state. Created once at startup and dropped at exit;
/// the evaluation context only exists inside [`Platform::with_context`].
#[derive(Debug)]
pub struct Platform {
    options: PlatformOptions,
}

impl Platform {
    pub fn initialize(options: PlatformOptions) -> Result<Self> {
        if options.stack_trace_limit == 0 {
            return Err(ShellError::InvalidOption(
                "stack trace limit must be at least 1".into(),
            ));
        }
        info!(
            stack_trace_limit = options.stack_trace_limit,
            "engine platform initialized"
        );
        Ok(Self { options })
    }

    /// Creates the global evaluation context with `host` installed, hands it
    /// to `session`, and tears it down afterwards on every path.
    pub fn with_context<T>(
        &self,
        host: Box<dyn HostBindings>,
        session: impl FnOnce(&mut Interpreter) -> T,
    ) -> T {
        let mut context = Interpreter::new(host, self.options.stack_trace_limit);
        info!("evaluation context created");
        let result = session(&mut context);
        drop(context);
        info!("evaluation context disposed");
        result
    }
}

impl Drop for Platform {
    fn drop(&mut self) {
        info!("engine platform disposed");
    }
}
