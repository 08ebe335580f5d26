use std::{fmt, rc::Rc};

use indexmap::IndexMap;

use crate::{
    ast::FunctionDecl, bindings::HostBindings, environment::EnvironmentRef, runtime::ScriptUnit,
};

#[derive(Clone)]
pub struct Value(pub Rc<ValueKind>);

impl Value {
    pub fn new(kind: ValueKind) -> Self {
        Self(Rc::new(kind))
    }

    pub fn undefined() -> Self {
        Self::new(ValueKind::Undefined)
    }

    pub fn null() -> Self {
        Self::new(ValueKind::Null)
    }

    pub fn bool(value: bool) -> Self {
        Self::new(ValueKind::Bool(value))
    }

    pub fn int(value: i64) -> Self {
        Self::new(ValueKind::Int(value))
    }

    pub fn float(value: f64) -> Self {
        Self::new(ValueKind::Float(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::new(ValueKind::String(value.into()))
    }

    pub fn array(values: Vec<Value>) -> Self {
        Self::new(ValueKind::Array(values))
    }

    pub fn object(entries: IndexMap<String, Value>) -> Self {
        Self::new(ValueKind::Object(entries))
    }

    pub fn error(error: ErrorValue) -> Self {
        Self::new(ValueKind::Error(error))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(&*self.0, ValueKind::Undefined)
    }

    pub fn is_truthy(&self) -> bool {
        match &*self.0 {
            ValueKind::Undefined | ValueKind::Null => false,
            ValueKind::Bool(b) => *b,
            ValueKind::Int(n) => *n != 0,
            ValueKind::Float(f) => *f != 0.0 && !f.is_nan(),
            ValueKind::String(s) => !s.is_empty(),
            ValueKind::Array(_)
            | ValueKind::Object(_)
            | ValueKind::Error(_)
            | ValueKind::Function(_)
            | ValueKind::NativeFunction(_) => true,
        }
    }

    /// The result of `typeof`.
    pub fn type_name(&self) -> &'static str {
        match &*self.0 {
            ValueKind::Undefined => "undefined",
            ValueKind::Bool(_) => "boolean",
            ValueKind::Int(_) | ValueKind::Float(_) => "number",
            ValueKind::String(_) => "string",
            ValueKind::Null | ValueKind::Array(_) | ValueKind::Object(_) | ValueKind::Error(_) => {
                "object"
            }
            ValueKind::Function(_) | ValueKind::NativeFunction(_) => "function",
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match &*self.0 {
            ValueKind::Int(n) => Some(*n as f64),
            ValueKind::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &*self.0 {
            ValueKind::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.0 {
            ValueKind::String(s) => write!(f, "{s:?}"),
            ValueKind::Array(values) => f.debug_list().entries(values.iter()).finish(),
            ValueKind::Object(map) => f.debug_map().entries(map.iter()).finish(),
            _ => write!(f, "{self}"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.0 {
            ValueKind::Undefined => write!(f, "undefined"),
            ValueKind::Null => write!(f, "null"),
            ValueKind::Bool(b) => write!(f, "{b}"),
            ValueKind::Int(n) => write!(f, "{n}"),
            ValueKind::Float(n) => write_number(f, *n),
            ValueKind::String(s) => write!(f, "{s}"),
            ValueKind::Array(values) => {
                write!(f, "[")?;
                for (idx, value) in values.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value:?}")?;
                }
                write!(f, "]")
            }
            ValueKind::Object(map) => {
                write!(f, "{{")?;
                for (idx, (key, value)) in map.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value:?}")?;
                }
                write!(f, "}}")
            }
            ValueKind::Error(error) => write!(f, "{error}"),
            ValueKind::Function(fun) => write!(
                f,
                "function {}() {{ [code] }}",
                fun.decl.name.as_deref().unwrap_or_default()
            ),
            ValueKind::NativeFunction(fun) => {
                write!(f, "function {}() {{ [native code] }}", fun.name)
            }
        }
    }
}

fn write_number(f: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
    if n.is_nan() {
        write!(f, "NaN")
    } else if n.is_infinite() {
        write!(f, "{}Infinity", if n < 0.0 { "-" } else { "" })
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        write!(f, "{n:.0}")
    } else {
        write!(f, "{n}")
    }
}

#[derive(Clone)]
pub enum ValueKind {
    Undefined,
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<Value>),
    Object(IndexMap<String, Value>),
    Error(ErrorValue),
    Function(UserFunction),
    NativeFunction(NativeFunction),
}

/// An error object, as produced by `Error(...)` or raised by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorValue {
    pub name: String,
    pub message: String,
}

impl ErrorValue {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}: {}", self.name, self.message)
        }
    }
}

#[derive(Clone)]
pub struct UserFunction {
    pub decl: Rc<FunctionDecl>,
    pub env: EnvironmentRef,
    /// The script the function was defined in; frames inside it point there.
    pub script: Rc<ScriptUnit>,
}

pub type NativeCallback = fn(&mut dyn HostBindings, &[Value]) -> Result<Value, ErrorValue>;

#[derive(Clone)]
pub struct NativeFunction {
    pub name: &'static str,
    pub callback: NativeCallback,
}

impl NativeFunction {
    pub fn call(&self, host: &mut dyn HostBindings, args: &[Value]) -> Result<Value, ErrorValue> {
        (self.callback)(host, args)
    }
}
