use std::{cmp::Ordering, rc::Rc};

use indexmap::IndexMap;
use tracing::debug;

use crate::{
    ast::{
        BinaryOp, CatchClause, Expr, ExprKind, FunctionDecl, Literal, LogicalOp, Program, Stmt,
        StmtKind, UnaryOp,
    },
    bindings::{self, HostBindings},
    diagnostics::{LineIndex, SourceSpan},
    engine::{Completion, Engine, ScriptOrigin},
    environment::{BindingError, Environment, EnvironmentRef},
    parser,
    report::{ErrorReport, StackFrame},
    value::{ErrorValue, UserFunction, Value, ValueKind},
};

/// Nested script calls allowed before `RangeError` is raised.
pub const MAX_CALL_DEPTH: usize = 128;

/// Statements and expressions under evaluation at once, across calls,
/// before `RangeError` is raised.
pub const MAX_EVAL_DEPTH: usize = 1024;

/// Source text of one compilation unit, kept alive by the functions it
/// defines so their frames can still be located after it finished running.
#[derive(Debug)]
pub struct ScriptUnit {
    origin: ScriptOrigin,
    source: String,
    lines: LineIndex,
}

impl ScriptUnit {
    fn new(origin: ScriptOrigin, source: &str) -> Self {
        Self {
            origin,
            lines: LineIndex::new(source),
            source: source.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        self.origin.name()
    }

    pub fn locate(&self, span: SourceSpan) -> (u32, u32) {
        self.lines.locate(&self.source, span.start)
    }
}

/// A compiled unit, ready to run in the global context.
#[derive(Debug)]
pub struct Script {
    unit: Rc<ScriptUnit>,
    program: Program,
}

impl Script {
    pub fn name(&self) -> &str {
        self.unit.name()
    }
}

/// A value in flight after `throw`, with the frames captured where it was
/// raised.
#[derive(Clone)]
pub struct Thrown {
    pub value: Value,
    pub frames: Vec<StackFrame>,
}

impl Thrown {
    pub fn into_report(self) -> ErrorReport {
        let message = match &*self.value.0 {
            ValueKind::Error(error) => error.to_string(),
            _ => format!("Uncaught {}", self.value),
        };
        ErrorReport {
            message,
            frames: self.frames,
        }
    }
}

type Exec<T> = std::result::Result<T, Thrown>;

struct Activation {
    function: Option<String>,
    script: Rc<ScriptUnit>,
    /// Where the caller invoked this activation; `None` for the script itself.
    call_site: Option<SourceSpan>,
}

enum FlowControl {
    Next,
    NextValue(Value),
    Return(Value),
    Break,
    Continue,
}

enum PropertyKey {
    Index(usize),
    Name(String),
}

impl PropertyKey {
    fn from_value(value: &Value) -> Self {
        match &*value.0 {
            ValueKind::Int(n) if *n >= 0 => PropertyKey::Index(*n as usize),
            ValueKind::String(s) => s
                .parse()
                .map(PropertyKey::Index)
                .unwrap_or_else(|_| PropertyKey::Name(s.clone())),
            _ => PropertyKey::Name(value.to_string()),
        }
    }

    fn name(&self) -> String {
        match self {
            PropertyKey::Index(idx) => idx.to_string(),
            PropertyKey::Name(name) => name.clone(),
        }
    }
}

/// The global evaluation context. Bindings made by one script stay visible
/// to every script run afterwards.
pub struct Interpreter {
    globals: EnvironmentRef,
    env: EnvironmentRef,
    host: Box<dyn HostBindings>,
    activations: Vec<Activation>,
    depth: usize,
    stack_trace_limit: usize,
    host_unit: Rc<ScriptUnit>,
}

impl Interpreter {
    pub fn new(host: Box<dyn HostBindings>, stack_trace_limit: usize) -> Self {
        let globals = Environment::new();
        let host_unit = Rc::new(ScriptUnit::new(ScriptOrigin::host(), ""));
        let mut interpreter = Self {
            env: Rc::clone(&globals),
            globals,
            host,
            activations: Vec::new(),
            depth: 0,
            stack_trace_limit: stack_trace_limit.max(1),
            host_unit,
        };
        interpreter.install_prelude();
        interpreter
    }

    /// Compiles and runs `source` under `name` in one step.
    pub fn eval_source(
        &mut self,
        name: &str,
        source: &str,
    ) -> Result<Completion<Value>, ErrorReport> {
        let origin = ScriptOrigin::new(name)?;
        let script = self.compile_script(&origin, source)?;
        self.run_script(&script)
    }

    pub fn compile_script(
        &self,
        origin: &ScriptOrigin,
        source: &str,
    ) -> Result<Script, ErrorReport> {
        let unit = Rc::new(ScriptUnit::new(origin.clone(), source));
        let program = parser::parse_program(source).map_err(|diagnostic| {
            let report = ErrorReport::new(diagnostic.to_string());
            match diagnostic.span {
                Some(span) => {
                    let (line, column) = unit.locate(span);
                    report.with_frame(StackFrame::new(None, unit.name(), line, column))
                }
                None => report,
            }
        })?;
        debug!(script = unit.name(), statements = program.items.len(), "compiled");
        Ok(Script { unit, program })
    }

    pub fn run_script(&mut self, script: &Script) -> Result<Completion<Value>, ErrorReport> {
        self.activations.push(Activation {
            function: None,
            script: Rc::clone(&script.unit),
            call_site: None,
        });
        let result = self.execute_items(&script.program.items);
        self.activations.clear();
        self.depth = 0;
        self.env = Rc::clone(&self.globals);

        match result {
            Ok(FlowControl::NextValue(value)) | Ok(FlowControl::Return(value))
                if !value.is_undefined() =>
            {
                Ok(Completion::Value(value))
            }
            Ok(_) => Ok(Completion::NoValue),
            Err(thrown) => {
                debug!(script = script.name(), "uncaught exception");
                Err(thrown.into_report())
            }
        }
    }

    fn install_prelude(&mut self) {
        bindings::install(&self.globals);
        let mut scope = self.globals.borrow_mut();
        scope.define("Error".into(), bindings::native("Error", construct_error), false);
        scope.define(
            "TypeError".into(),
            bindings::native("TypeError", construct_type_error),
            false,
        );
        scope.define(
            "RangeError".into(),
            bindings::native("RangeError", construct_range_error),
            false,
        );
        scope.define(
            "ReferenceError".into(),
            bindings::native("ReferenceError", construct_reference_error),
            false,
        );
        scope.define(
            "SyntaxError".into(),
            bindings::native("SyntaxError", construct_syntax_error),
            false,
        );
    }

    fn current_script(&self) -> Rc<ScriptUnit> {
        self.activations
            .last()
            .map(|activation| Rc::clone(&activation.script))
            .unwrap_or_else(|| Rc::clone(&self.host_unit))
    }

    /// Frames for an error raised at `span`, innermost first.
    fn capture(&self, span: SourceSpan) -> Vec<StackFrame> {
        let mut frames = Vec::new();
        let mut position = span;
        for activation in self.activations.iter().rev().take(self.stack_trace_limit) {
            let (line, column) = activation.script.locate(position);
            frames.push(StackFrame::new(
                activation.function.as_deref(),
                activation.script.name(),
                line,
                column,
            ));
            match activation.call_site {
                Some(site) => position = site,
                None => break,
            }
        }
        frames
    }

    fn throw_value(&self, value: Value, span: SourceSpan) -> Thrown {
        Thrown {
            value,
            frames: self.capture(span),
        }
    }

    fn raise(&self, name: &str, message: impl Into<String>, span: SourceSpan) -> Thrown {
        self.throw_value(Value::error(ErrorValue::new(name, message)), span)
    }

    fn in_scope<T>(
        &mut self,
        scope: EnvironmentRef,
        body: impl FnOnce(&mut Self) -> Exec<T>,
    ) -> Exec<T> {
        let previous = std::mem::replace(&mut self.env, scope);
        let result = body(self);
        self.env = previous;
        result
    }

    fn nested<T>(
        &mut self,
        span: SourceSpan,
        body: impl FnOnce(&mut Self) -> Exec<T>,
    ) -> Exec<T> {
        if self.depth >= MAX_EVAL_DEPTH {
            return Err(self.raise("RangeError", "Maximum call stack size exceeded", span));
        }
        self.depth += 1;
        let result = body(self);
        self.depth -= 1;
        result
    }

    /// Function declarations are visible from the start of their block.
    fn hoist(&mut self, statements: &[Stmt]) {
        for stmt in statements {
            if let StmtKind::Function(decl) = &stmt.kind {
                if let Some(name) = &decl.name {
                    let function = self.make_function(decl);
                    self.env.borrow_mut().define(name.clone(), function, true);
                }
            }
        }
    }

    fn execute_items(&mut self, statements: &[Stmt]) -> Exec<FlowControl> {
        self.hoist(statements);
        let mut last_value: Option<Value> = None;
        for stmt in statements {
            match self.execute_statement(stmt)? {
                FlowControl::Next => {}
                FlowControl::NextValue(value) => last_value = Some(value),
                other => return Ok(other),
            }
        }
        Ok(last_value.map_or(FlowControl::Next, FlowControl::NextValue))
    }

    fn execute_block(&mut self, statements: &[Stmt]) -> Exec<FlowControl> {
        let scope = Environment::with_parent(Rc::clone(&self.env));
        self.in_scope(scope, |this| this.execute_items(statements))
    }

    fn execute_statement(&mut self, stmt: &Stmt) -> Exec<FlowControl> {
        self.nested(stmt.span, |this| this.execute_statement_kind(stmt))
    }

    fn execute_statement_kind(&mut self, stmt: &Stmt) -> Exec<FlowControl> {
        match &stmt.kind {
            StmtKind::VarDecl {
                name,
                mutable,
                initializer,
            } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::undefined(),
                };
                self.env.borrow_mut().define(name.clone(), value, *mutable);
                Ok(FlowControl::Next)
            }
            StmtKind::Function(_) | StmtKind::Empty => Ok(FlowControl::Next),
            StmtKind::Expr(expr) => Ok(FlowControl::NextValue(self.evaluate(expr)?)),
            StmtKind::Block(statements) => self.execute_block(statements),
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute_block(then_branch)
                } else if let Some(branch) = else_branch {
                    self.execute_block(branch)
                } else {
                    Ok(FlowControl::Next)
                }
            }
            StmtKind::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    match self.execute_block(body)? {
                        FlowControl::Next | FlowControl::NextValue(_) | FlowControl::Continue => {}
                        FlowControl::Break => break,
                        FlowControl::Return(value) => return Ok(FlowControl::Return(value)),
                    }
                }
                Ok(FlowControl::Next)
            }
            StmtKind::Try {
                block,
                handler,
                finalizer,
            } => {
                let mut result = self.execute_block(block);
                if let Some(handler) = handler {
                    result = match result {
                        Err(thrown) => self.execute_catch(handler, thrown.value),
                        completed => completed,
                    };
                }
                if let Some(finalizer) = finalizer {
                    match self.execute_block(finalizer)? {
                        FlowControl::Next | FlowControl::NextValue(_) => {}
                        abrupt => return Ok(abrupt),
                    }
                }
                result
            }
            StmtKind::Throw(expr) => {
                let value = self.evaluate(expr)?;
                Err(self.throw_value(value, stmt.span))
            }
            StmtKind::Return(expr) => {
                let value = match expr {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::undefined(),
                };
                Ok(FlowControl::Return(value))
            }
            StmtKind::Break => Ok(FlowControl::Break),
            StmtKind::Continue => Ok(FlowControl::Continue),
        }
    }

    fn execute_catch(&mut self, handler: &CatchClause, error: Value) -> Exec<FlowControl> {
        let scope = Environment::with_parent(Rc::clone(&self.env));
        if let Some(binding) = &handler.binding {
            scope.borrow_mut().define(binding.clone(), error, true);
        }
        self.in_scope(scope, |this| this.execute_items(&handler.body))
    }

    fn evaluate(&mut self, expr: &Expr) -> Exec<Value> {
        self.nested(expr.span, |this| this.evaluate_kind(expr))
    }

    fn evaluate_kind(&mut self, expr: &Expr) -> Exec<Value> {
        match &expr.kind {
            ExprKind::Literal(literal) => Ok(self.literal(literal)),
            ExprKind::Variable(name) => self.lookup(name, expr.span),
            ExprKind::Binary { op, left, right } => {
                let left_value = self.evaluate(left)?;
                let right_value = self.evaluate(right)?;
                self.binary(*op, left_value, right_value, expr.span)
            }
            ExprKind::Logical { op, left, right } => {
                let left_value = self.evaluate(left)?;
                match (op, left_value.is_truthy()) {
                    (LogicalOp::And, false) | (LogicalOp::Or, true) => Ok(left_value),
                    _ => self.evaluate(right),
                }
            }
            ExprKind::Unary { op, expr: operand } => self.unary(*op, operand, expr.span),
            ExprKind::Assign { target, value } => {
                let value = self.evaluate(value)?;
                match &target.kind {
                    ExprKind::Variable(name) => {
                        self.assign_variable(name, value.clone(), target.span)?
                    }
                    ExprKind::Field {
                        target: owner,
                        field,
                    } => self.assign_member(
                        owner,
                        PropertyKey::Name(field.clone()),
                        value.clone(),
                        target.span,
                    )?,
                    ExprKind::Index {
                        target: owner,
                        index,
                    } => {
                        let key = self.evaluate(index)?;
                        self.assign_member(
                            owner,
                            PropertyKey::from_value(&key),
                            value.clone(),
                            target.span,
                        )?
                    }
                    _ => {
                        return Err(self.raise(
                            "SyntaxError",
                            "Invalid left-hand side in assignment",
                            target.span,
                        ));
                    }
                }
                Ok(value)
            }
            ExprKind::Call { callee, args } => {
                let callee_value = self.evaluate(callee)?;
                let mut eval_args = Vec::with_capacity(args.len());
                for arg in args {
                    eval_args.push(self.evaluate(arg)?);
                }
                self.call(callee_value, eval_args, callee, expr.span)
            }
            ExprKind::ArrayLiteral(elements) => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.evaluate(element)?);
                }
                Ok(Value::array(values))
            }
            ExprKind::ObjectLiteral(entries) => {
                let mut map = IndexMap::new();
                for (key, value_expr) in entries {
                    let value = self.evaluate(value_expr)?;
                    map.insert(key.clone(), value);
                }
                Ok(Value::object(map))
            }
            ExprKind::Group(inner) => self.evaluate(inner),
            ExprKind::Index { target, index } => {
                let target_value = self.evaluate(target)?;
                let index_value = self.evaluate(index)?;
                self.property(&target_value, PropertyKey::from_value(&index_value), expr.span)
            }
            ExprKind::Field { target, field } => {
                let target_value = self.evaluate(target)?;
                self.property(&target_value, PropertyKey::Name(field.clone()), expr.span)
            }
            ExprKind::Function(decl) => Ok(self.make_function(decl)),
        }
    }

    fn literal(&self, literal: &Literal) -> Value {
        match literal {
            Literal::Int(n) => Value::int(*n),
            Literal::Float(n) => Value::float(*n),
            Literal::Bool(b) => Value::bool(*b),
            Literal::String(s) => Value::string(s.clone()),
            Literal::Null => Value::null(),
            Literal::Undefined => Value::undefined(),
        }
    }

    fn make_function(&self, decl: &Rc<FunctionDecl>) -> Value {
        Value::new(ValueKind::Function(UserFunction {
            decl: Rc::clone(decl),
            env: Rc::clone(&self.env),
            script: self.current_script(),
        }))
    }

    fn lookup(&self, name: &str, span: SourceSpan) -> Exec<Value> {
        Environment::get(&self.env, name)
            .map_err(|_| self.raise("ReferenceError", format!("{name} is not defined"), span))
    }

    fn assign_variable(&self, name: &str, value: Value, span: SourceSpan) -> Exec<()> {
        Environment::assign(&self.env, name, value).map_err(|err| match err {
            BindingError::Undefined => {
                self.raise("ReferenceError", format!("{name} is not defined"), span)
            }
            BindingError::Immutable => {
                self.raise("TypeError", "Assignment to constant variable.", span)
            }
        })
    }

    fn unary(&mut self, op: UnaryOp, operand: &Expr, span: SourceSpan) -> Exec<Value> {
        if op == UnaryOp::TypeOf {
            if let ExprKind::Variable(name) = &operand.kind {
                return Ok(Value::string(
                    Environment::get(&self.env, name)
                        .map(|value| value.type_name())
                        .unwrap_or("undefined"),
                ));
            }
        }
        let value = self.evaluate(operand)?;
        match op {
            UnaryOp::Negate => match &*value.0 {
                ValueKind::Int(n) => Ok(n
                    .checked_neg()
                    .map(Value::int)
                    .unwrap_or_else(|| Value::float(-(*n as f64)))),
                ValueKind::Float(n) => Ok(Value::float(-n)),
                _ => Err(self.raise(
                    "TypeError",
                    format!("Cannot negate {}", value.type_name()),
                    span,
                )),
            },
            UnaryOp::Not => Ok(Value::bool(!value.is_truthy())),
            UnaryOp::TypeOf => Ok(Value::string(value.type_name())),
        }
    }

    fn call(
        &mut self,
        callee: Value,
        args: Vec<Value>,
        callee_expr: &Expr,
        span: SourceSpan,
    ) -> Exec<Value> {
        match &*callee.0 {
            ValueKind::NativeFunction(native) => native
                .call(self.host.as_mut(), &args)
                .map_err(|error| self.throw_value(Value::error(error), span)),
            ValueKind::Function(function) => self.call_function(function, args, span),
            _ => Err(self.raise(
                "TypeError",
                format!("{} is not a function", describe(callee_expr)),
                span,
            )),
        }
    }

    fn call_function(
        &mut self,
        function: &UserFunction,
        args: Vec<Value>,
        span: SourceSpan,
    ) -> Exec<Value> {
        if self.activations.len() > MAX_CALL_DEPTH {
            return Err(self.raise("RangeError", "Maximum call stack size exceeded", span));
        }
        let scope = Environment::with_parent(Rc::clone(&function.env));
        {
            let mut scope_mut = scope.borrow_mut();
            let mut args = args.into_iter();
            for name in &function.decl.params {
                let value = args.next().unwrap_or_else(Value::undefined);
                scope_mut.define(name.clone(), value, true);
            }
        }

        self.activations.push(Activation {
            function: function.decl.name.clone(),
            script: Rc::clone(&function.script),
            call_site: Some(span),
        });
        let result = self.in_scope(scope, |this| this.execute_items(&function.decl.body));
        self.activations.pop();

        match result? {
            FlowControl::Return(value) => Ok(value),
            _ => Ok(Value::undefined()),
        }
    }

    fn property(&self, target: &Value, key: PropertyKey, span: SourceSpan) -> Exec<Value> {
        let found = match (&*target.0, &key) {
            (ValueKind::Undefined | ValueKind::Null, _) => {
                return Err(self.raise(
                    "TypeError",
                    format!(
                        "Cannot read properties of {target} (reading '{}')",
                        key.name()
                    ),
                    span,
                ));
            }
            (ValueKind::Object(map), _) => map.get(&key.name()).cloned(),
            (ValueKind::Array(values), PropertyKey::Index(idx)) => values.get(*idx).cloned(),
            (ValueKind::Array(values), PropertyKey::Name(name)) if name == "length" => {
                Some(Value::int(values.len() as i64))
            }
            (ValueKind::String(text), PropertyKey::Index(idx)) => text
                .chars()
                .nth(*idx)
                .map(|ch| Value::string(ch.to_string())),
            (ValueKind::String(text), PropertyKey::Name(name)) if name == "length" => {
                Some(Value::int(text.chars().count() as i64))
            }
            (ValueKind::Error(error), PropertyKey::Name(name)) => match name.as_str() {
                "name" => Some(Value::string(error.name.clone())),
                "message" => Some(Value::string(error.message.clone())),
                _ => None,
            },
            (ValueKind::Function(function), PropertyKey::Name(name)) if name == "name" => Some(
                Value::string(function.decl.name.clone().unwrap_or_default()),
            ),
            (ValueKind::NativeFunction(native), PropertyKey::Name(name)) if name == "name" => {
                Some(Value::string(native.name))
            }
            _ => None,
        };
        Ok(found.unwrap_or_else(Value::undefined))
    }

    fn assign_member(
        &mut self,
        owner: &Expr,
        key: PropertyKey,
        value: Value,
        span: SourceSpan,
    ) -> Exec<()> {
        let owner_value = self.evaluate(owner)?;
        let updated = match (&*owner_value.0, key) {
            (ValueKind::Undefined | ValueKind::Null, key) => {
                return Err(self.raise(
                    "TypeError",
                    format!(
                        "Cannot set properties of {owner_value} (setting '{}')",
                        key.name()
                    ),
                    span,
                ));
            }
            (ValueKind::Object(map), key) => {
                let mut new_map = map.clone();
                new_map.insert(key.name(), value);
                Value::object(new_map)
            }
            (ValueKind::Array(elements), PropertyKey::Index(idx)) => {
                let mut new_elements = elements.clone();
                if idx >= new_elements.len() {
                    new_elements.resize(idx + 1, Value::undefined());
                }
                new_elements[idx] = value;
                Value::array(new_elements)
            }
            // Primitives silently drop property writes.
            _ => return Ok(()),
        };
        self.write_back(owner, updated)
    }

    /// Stores an updated aggregate back into the place `target` names.
    fn write_back(&mut self, target: &Expr, value: Value) -> Exec<()> {
        match &target.kind {
            ExprKind::Variable(name) => self.assign_variable(name, value, target.span),
            ExprKind::Group(inner) => self.write_back(inner, value),
            ExprKind::Field {
                target: owner,
                field,
            } => self.assign_member(owner, PropertyKey::Name(field.clone()), value, target.span),
            ExprKind::Index {
                target: owner,
                index,
            } => {
                let key = self.evaluate(index)?;
                self.assign_member(owner, PropertyKey::from_value(&key), value, target.span)
            }
            _ => Ok(()),
        }
    }

    fn binary(&self, op: BinaryOp, left: Value, right: Value, span: SourceSpan) -> Exec<Value> {
        use BinaryOp::*;
        match op {
            Add if left.as_str().is_some() || right.as_str().is_some() => {
                Ok(Value::string(format!("{left}{right}")))
            }
            Add => self.arithmetic(op, &left, &right, span, i64::checked_add, |a, b| a + b),
            Sub => self.arithmetic(op, &left, &right, span, i64::checked_sub, |a, b| a - b),
            Mul => self.arithmetic(op, &left, &right, span, i64::checked_mul, |a, b| a * b),
            Div => self.arithmetic(
                op,
                &left,
                &right,
                span,
                |a, b| {
                    a.checked_rem(b)
                        .filter(|rem| *rem == 0)
                        .and_then(|_| a.checked_div(b))
                },
                |a, b| a / b,
            ),
            Mod => self.arithmetic(op, &left, &right, span, i64::checked_rem, |a, b| a % b),
            Equal => Ok(Value::bool(loose_equal(&left, &right))),
            NotEqual => Ok(Value::bool(!loose_equal(&left, &right))),
            StrictEqual => Ok(Value::bool(strict_equal(&left, &right))),
            StrictNotEqual => Ok(Value::bool(!strict_equal(&left, &right))),
            Less => self.compare(op, &left, &right, span, Ordering::is_lt),
            LessEqual => self.compare(op, &left, &right, span, Ordering::is_le),
            Greater => self.compare(op, &left, &right, span, Ordering::is_gt),
            GreaterEqual => self.compare(op, &left, &right, span, Ordering::is_ge),
        }
    }

    fn arithmetic(
        &self,
        op: BinaryOp,
        left: &Value,
        right: &Value,
        span: SourceSpan,
        exact: fn(i64, i64) -> Option<i64>,
        approximate: fn(f64, f64) -> f64,
    ) -> Exec<Value> {
        if let (ValueKind::Int(a), ValueKind::Int(b)) = (&*left.0, &*right.0) {
            if let Some(result) = exact(*a, *b) {
                return Ok(Value::int(result));
            }
        }
        match (left.as_number(), right.as_number()) {
            (Some(a), Some(b)) => Ok(Value::float(approximate(a, b))),
            _ => Err(self.raise(
                "TypeError",
                format!(
                    "Cannot apply '{}' to {} and {}",
                    op.symbol(),
                    left.type_name(),
                    right.type_name()
                ),
                span,
            )),
        }
    }

    fn compare(
        &self,
        op: BinaryOp,
        left: &Value,
        right: &Value,
        span: SourceSpan,
        accept: fn(Ordering) -> bool,
    ) -> Exec<Value> {
        let ordering = match (&*left.0, &*right.0) {
            (ValueKind::String(a), ValueKind::String(b)) => Some(a.cmp(b)),
            _ => match (left.as_number(), right.as_number()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => {
                    return Err(self.raise(
                        "TypeError",
                        format!(
                            "Cannot compare {} and {} with '{}'",
                            left.type_name(),
                            right.type_name(),
                            op.symbol()
                        ),
                        span,
                    ));
                }
            },
        };
        Ok(Value::bool(ordering.is_some_and(accept)))
    }
}

impl Engine for Interpreter {
    type Script = Script;
    type Value = Value;

    fn origin(&mut self, name: &str) -> Result<ScriptOrigin, ErrorReport> {
        ScriptOrigin::new(name)
    }

    fn compile(&mut self, origin: &ScriptOrigin, source: &str) -> Result<Script, ErrorReport> {
        self.compile_script(origin, source)
    }

    fn run(&mut self, script: Script) -> Result<Completion<Value>, ErrorReport> {
        self.run_script(&script)
    }
}

/// Source-like rendering of a callee for error messages.
fn describe(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Variable(name) => name.clone(),
        ExprKind::Field { target, field } => format!("{}.{field}", describe(target)),
        ExprKind::Index { target, .. } => format!("{}[...]", describe(target)),
        ExprKind::Group(inner) => describe(inner),
        ExprKind::Call { callee, .. } => format!("{}(...)", describe(callee)),
        _ => "expression".to_string(),
    }
}

fn strict_equal(left: &Value, right: &Value) -> bool {
    match (&*left.0, &*right.0) {
        (ValueKind::Undefined, ValueKind::Undefined) | (ValueKind::Null, ValueKind::Null) => true,
        (ValueKind::Bool(a), ValueKind::Bool(b)) => a == b,
        (ValueKind::String(a), ValueKind::String(b)) => a == b,
        (ValueKind::Array(a), ValueKind::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(l, r)| strict_equal(l, r))
        }
        (ValueKind::Object(a), ValueKind::Object(b)) => {
            a.len() == b.len()
                && a.iter().all(|(key, value)| {
                    b.get(key)
                        .map(|rhs| strict_equal(value, rhs))
                        .unwrap_or(false)
                })
        }
        (ValueKind::Error(a), ValueKind::Error(b)) => a == b,
        _ => match (left.as_number(), right.as_number()) {
            (Some(a), Some(b)) => a == b,
            _ => Rc::ptr_eq(&left.0, &right.0),
        },
    }
}

fn loose_equal(left: &Value, right: &Value) -> bool {
    match (&*left.0, &*right.0) {
        (
            ValueKind::Undefined | ValueKind::Null,
            ValueKind::Undefined | ValueKind::Null,
        ) => true,
        _ => strict_equal(left, right),
    }
}

fn error_from_args(name: &str, args: &[Value]) -> Value {
    let message = args
        .first()
        .filter(|value| !value.is_undefined())
        .map(ToString::to_string)
        .unwrap_or_default();
    Value::error(ErrorValue::new(name, message))
}

fn construct_error(_: &mut dyn HostBindings, args: &[Value]) -> Result<Value, ErrorValue> {
    Ok(error_from_args("Error", args))
}

fn construct_type_error(_: &mut dyn HostBindings, args: &[Value]) -> Result<Value, ErrorValue> {
    Ok(error_from_args("TypeError", args))
}

fn construct_range_error(_: &mut dyn HostBindings, args: &[Value]) -> Result<Value, ErrorValue> {
    Ok(error_from_args("RangeError", args))
}

fn construct_reference_error(
    _: &mut dyn HostBindings,
    args: &[Value],
) -> Result<Value, ErrorValue> {
    Ok(error_from_args("ReferenceError", args))
}

fn construct_syntax_error(_: &mut dyn HostBindings, args: &[Value]) -> Result<Value, ErrorValue> {
    Ok(error_from_args("SyntaxError", args))
}
