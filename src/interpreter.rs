//! Tree-walking evaluator for BeamScript
//!
//! Walks the AST against a chain of scopes. Blocks run in the scope they are
//! given; only function calls open a new scope, as a child of the callee's
//! closure.

use std::rc::Rc;

use crate::ast::{BinaryOp, Block, Expr, LogicalOp, Program, Property, Stmt, UnaryOp};
use crate::environment::Environment;
use crate::error::{BeamError, ErrorKind, Result};
use crate::gc::Collector;
use crate::token::Span;
use crate::value::{EnvRef, Function, Number, Object, Value};

/// Maximum nesting of user function calls
pub const MAX_CALL_DEPTH: usize = 256;

/// The evaluator. Holds no program state; scopes are passed in explicitly.
#[derive(Debug)]
pub struct Interpreter {
    depth: usize,
    max_depth: usize,
    collector: Collector,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_max_depth(MAX_CALL_DEPTH)
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        Self { depth: 0, max_depth, collector: Collector::new() }
    }

    /// Give up the root scope of a finished run and free every scope that
    /// only reference cycles still hold
    pub fn release_root(&mut self, root: EnvRef) {
        self.collector.release(root);
        self.collector.collect();
    }

    /// Free call scopes that have become unreachable since their call returned
    pub fn collect(&mut self) {
        self.collector.collect();
    }

    /// Run every statement in order; the result is the last statement's value
    pub fn evaluate_program(&mut self, program: &Program, env: &EnvRef) -> Result<Value> {
        self.execute_all(&program.body, env)
    }

    fn execute_all(&mut self, body: &[Stmt], env: &EnvRef) -> Result<Value> {
        let mut last = Value::Null;
        for stmt in body {
            last = self.execute(stmt, env)?;
        }
        Ok(last)
    }

    fn execute_block(&mut self, block: &Block, env: &EnvRef) -> Result<Value> {
        self.execute_all(&block.body, env)
    }

    // ==================== Statements ====================

    pub fn execute(&mut self, stmt: &Stmt, env: &EnvRef) -> Result<Value> {
        match stmt {
            Stmt::VariableDeclaration { declarations, constant, .. } => {
                for decl in declarations {
                    let value = match &decl.init {
                        Some(init) => self.evaluate(init, env)?,
                        None => Value::Null,
                    };
                    env.borrow_mut()
                        .declare(&decl.name, value, *constant)
                        .map_err(|e| e.or_span(decl.span))?;
                }
                Ok(Value::Null)
            }

            Stmt::FunctionDeclaration { name, params, body, span } => {
                let function = Function {
                    name: name.clone(),
                    params: params.clone(),
                    body: Rc::new(body.clone()),
                    closure: Rc::clone(env),
                };
                env.borrow_mut()
                    .declare(name, Value::Function(Rc::new(function)), true)
                    .map_err(|e| e.or_span(*span))?;
                Ok(Value::Null)
            }

            Stmt::If { condition, consequent, alternate, .. } => {
                if self.evaluate(condition, env)?.is_truthy() {
                    self.execute_block(consequent, env)
                } else if let Some(alternate) = alternate {
                    self.execute(alternate, env)
                } else {
                    Ok(Value::Null)
                }
            }

            Stmt::While { condition, body, .. } => {
                while self.evaluate(condition, env)?.is_truthy() {
                    self.execute_block(body, env)?;
                }
                Ok(Value::Null)
            }

            Stmt::Block(block) => self.execute_block(block, env),

            Stmt::Expression { expr } => self.evaluate(expr, env),
        }
    }

    // ==================== Expressions ====================

    pub fn evaluate(&mut self, expr: &Expr, env: &EnvRef) -> Result<Value> {
        match expr {
            Expr::Identifier { name, span } => {
                env.borrow().lookup(name).map_err(|e| e.or_span(*span))
            }

            Expr::NumericLiteral { value, is_float, .. } => Ok(Value::Number(Number {
                value: *value,
                is_float: *is_float,
            })),

            Expr::StringLiteral { value, .. } => Ok(Value::String(value.clone())),

            Expr::NullLiteral { .. } => Ok(Value::Null),

            Expr::ObjectLiteral { properties, span } => self.object_literal(properties, env, *span),

            Expr::Assignment { target, value, span } => {
                let Expr::Identifier { name, .. } = target.as_ref() else {
                    return Err(BeamError::new(ErrorKind::InvalidAssignmentTarget, Some(*span)));
                };
                let value = self.evaluate(value, env)?;
                env.borrow_mut()
                    .assign(name, value)
                    .map_err(|e| e.or_span(*span))
            }

            Expr::Binary { left, op, right, span } => {
                let left = self.evaluate(left, env)?;
                let right = self.evaluate(right, env)?;
                binary(*op, &left, &right).map_err(|e| e.or_span(*span))
            }

            Expr::Unary { op, operand, span } => {
                let operand = self.evaluate(operand, env)?;
                unary(*op, operand).map_err(|e| e.or_span(*span))
            }

            Expr::Logical { left, op, right, .. } => {
                let left = self.evaluate(left, env)?;
                let right = self.evaluate(right, env)?;
                Ok(logical(*op, left, right))
            }

            Expr::Member { object, property, computed, span } => {
                let object = self.evaluate(object, env)?;
                let key = match (*computed, property.as_ref()) {
                    (false, Expr::Identifier { name, .. }) => name.clone(),
                    _ => {
                        let key = self.evaluate(property, env)?;
                        member_key(&key).map_err(|e| e.or_span(property.span()))?
                    }
                };
                member(&object, &key).map_err(|e| e.or_span(*span))
            }

            Expr::Call { callee, args, span } => {
                let callee = self.evaluate(callee, env)?;
                let args = args
                    .iter()
                    .map(|arg| self.evaluate(arg, env))
                    .collect::<Result<Vec<_>>>()?;
                self.call(&callee, args, env).map_err(|e| e.or_span(*span))
            }
        }
    }

    fn object_literal(&mut self, properties: &[Property], env: &EnvRef, span: Span) -> Result<Value> {
        let mut object = Object::new();
        for property in properties {
            let value = match &property.value {
                Some(expr) => self.evaluate(expr, env)?,
                None => env
                    .borrow()
                    .lookup(&property.key)
                    .map_err(|e| e.or_span(span))?,
            };
            object.insert(property.key.as_str(), value);
        }
        Ok(Value::Object(Rc::new(object)))
    }

    /// Invoke a callable value with already evaluated arguments
    pub fn call(&mut self, callee: &Value, args: Vec<Value>, env: &EnvRef) -> Result<Value> {
        match callee {
            Value::NativeFunction(native) => {
                tracing::trace!(name = %native.name, args = args.len(), "native call");
                native.call(&args, env)
            }
            Value::Function(function) => self.call_function(function, args),
            other => Err(BeamError::new(
                ErrorKind::NotCallable(other.type_name().to_string()),
                None,
            )),
        }
    }

    fn call_function(&mut self, function: &Rc<Function>, args: Vec<Value>) -> Result<Value> {
        if args.len() < function.params.len() {
            return Err(BeamError::new(
                ErrorKind::ArityMismatch {
                    name: function.name.clone(),
                    expected: function.params.len(),
                    got: args.len(),
                },
                None,
            ));
        }
        if self.depth >= self.max_depth {
            return Err(BeamError::new(ErrorKind::StackOverflow(self.max_depth), None));
        }

        let scope = Environment::with_parent(Rc::clone(&function.closure)).into_ref();
        for (param, arg) in function.params.iter().zip(args) {
            scope.borrow_mut().declare(param, arg, false)?;
        }

        tracing::trace!(name = %function.name, depth = self.depth, "call");
        self.depth += 1;
        let result = self.execute_block(&function.body, &scope);
        self.depth -= 1;
        self.collector.release(scope);
        result
    }
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value> {
    // Non-number operands yield null rather than an error.
    let (Some(a), Some(b)) = (left.as_number(), right.as_number()) else {
        return Ok(Value::Null);
    };
    let is_float = a.is_float || b.is_float;
    let number = |value: f64, is_float: bool| Value::Number(Number { value, is_float });

    let result = match op {
        BinaryOp::Add => number(a.value + b.value, is_float),
        BinaryOp::Sub => number(a.value - b.value, is_float),
        BinaryOp::Mul => number(a.value * b.value, is_float),
        BinaryOp::Div => {
            if b.value == 0.0 {
                return Err(ErrorKind::DivisionByZero.into());
            }
            number(a.value / b.value, true)
        }
        BinaryOp::Mod => {
            if b.value == 0.0 {
                return Err(ErrorKind::DivisionByZero.into());
            }
            // Floored: the result takes the sign of the divisor.
            let rem = a.value % b.value;
            let rem = if rem != 0.0 && (rem < 0.0) != (b.value < 0.0) {
                rem + b.value
            } else {
                rem
            };
            number(rem, is_float)
        }
        BinaryOp::Pow => number(a.value.powf(b.value), is_float || b.value < 0.0),
        BinaryOp::Eq => Value::Boolean(a.value == b.value),
        BinaryOp::Ne => Value::Boolean(a.value != b.value),
        BinaryOp::Lt => Value::Boolean(a.value < b.value),
        BinaryOp::Le => Value::Boolean(a.value <= b.value),
        BinaryOp::Gt => Value::Boolean(a.value > b.value),
        BinaryOp::Ge => Value::Boolean(a.value >= b.value),
    };
    Ok(result)
}

fn unary(op: UnaryOp, operand: Value) -> Result<Value> {
    match (op, operand) {
        (UnaryOp::Plus, Value::Number(n)) => Ok(Value::Number(n)),
        (UnaryOp::Neg, Value::Number(n)) => Ok(Value::Number(Number { value: -n.value, ..n })),
        (UnaryOp::Not, Value::Boolean(b)) => Ok(Value::Boolean(!b)),
        (UnaryOp::Plus | UnaryOp::Neg, other) => Err(type_mismatch("number", &other)),
        (UnaryOp::Not, other) => Err(type_mismatch("boolean", &other)),
    }
}

/// Both operands are always evaluated. `and` yields the left operand when the
/// two are equal and `false` otherwise; `or` yields `true` when the left
/// operand is `true` and the right operand otherwise.
fn logical(op: LogicalOp, left: Value, right: Value) -> Value {
    match op {
        LogicalOp::And if left == right => left,
        LogicalOp::And => Value::Boolean(false),
        LogicalOp::Or if matches!(left, Value::Boolean(true)) => Value::Boolean(true),
        LogicalOp::Or => right,
    }
}

fn member_key(key: &Value) -> Result<String> {
    match key {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(type_mismatch("string or number", other)),
    }
}

fn member(object: &Value, key: &str) -> Result<Value> {
    match object {
        Value::Object(properties) => properties.get(key).cloned().ok_or_else(|| {
            BeamError::new(ErrorKind::MemberNotFound(key.to_string(), "object".into()), None)
        }),
        other => Err(BeamError::new(
            ErrorKind::MemberNotFound(key.to_string(), other.type_name().into()),
            None,
        )),
    }
}

fn type_mismatch(expected: &str, got: &Value) -> BeamError {
    BeamError::new(
        ErrorKind::TypeMismatch(expected.to_string(), got.type_name().to_string()),
        None,
    )
}
