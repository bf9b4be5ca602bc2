//! Tree-walking evaluator.
//!
//! The interpreter holds one long-lived global environment and a mutable
//! "current environment" pointer that [`Interpreter::execute_block`] swaps for
//! the duration of nested block/function execution and restores on *every*
//! exit path, error exits included - recursion is only correct because of
//! that restoration.
//!
//! Evaluation semantics:
//! - Truthiness: `nil` and `false` are falsy; everything else (zero and the
//!   empty string included) is truthy.
//! - Equality: `nil` equals only `nil`; matching kinds compare by value,
//!   callables and instances by identity; mismatched kinds are never equal.
//! - Arithmetic/comparison require numeric operands; `+` also accepts two
//!   strings.  Division by zero follows IEEE-754 and produces `inf`/`NaN`
//!   rather than an error.
//! - Variable access uses the resolver's recorded distance when present and
//!   falls back to the global environment otherwise.
//! - `return` is a control-transfer variant ([`InterpretError::ReturnSignal`])
//!   that unwinds to the nearest call boundary.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::mem;
use std::rc::Rc;
use std::time::{SystemTime, SystemTimeError, UNIX_EPOCH};

use log::{debug, info};
use thiserror::Error;

use crate::ast::{Expr, ExprId, LiteralValue, Stmt};
use crate::callable::{LoxFunction, NativeFunction};
use crate::class::LoxClass;
use crate::environment::{self, Environment};
use crate::error::LoxError;
use crate::instance::LoxInstance;
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Execution outcome used *inside* the evaluator.  `ReturnSignal` is not an
/// error at all: it is the non-local exit a `return` statement raises,
/// caught at the function-call boundary.
#[derive(Error, Debug)]
pub enum InterpretError {
    #[error("{message}\n[line {line}]")]
    RuntimeError { message: String, line: usize },

    #[error("return {0}")]
    ReturnSignal(Value),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl InterpretError {
    pub fn runtime<S: Into<String>>(line: usize, msg: S) -> Self {
        InterpretError::RuntimeError {
            message: msg.into(),
            line,
        }
    }
}

/// Convenient alias for interpreter results.
pub type IResult<T> = Result<T, InterpretError>;

pub struct Interpreter {
    globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    locals: HashMap<ExprId, usize>,
    out: Box<dyn Write>,
}

impl Interpreter {
    /// Create an interpreter printing to standard output.
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// Create an interpreter with a custom `print` sink (used by tests).
    /// Native functions such as `clock` are defined in the globals.
    pub fn with_output(out: Box<dyn Write>) -> Self {
        info!("Initializing Interpreter");

        let globals = Rc::new(RefCell::new(Environment::new()));

        debug!("Defining native function 'clock'");

        globals.borrow_mut().define(
            "clock",
            Value::Native(Rc::new(NativeFunction {
                name: "clock",
                arity: 0,
                func: |_args: &[Value]| {
                    let timestamp: f64 = SystemTime::now()
                        .duration_since(UNIX_EPOCH)
                        .map_err(|e: SystemTimeError| format!("Clock error: {}", e))?
                        .as_secs_f64();

                    Ok(Value::Number(timestamp))
                },
            })),
        );

        Self {
            environment: globals.clone(),
            globals,
            locals: HashMap::new(),
            out,
        }
    }

    /// Record the scope distance for a resolvable expression node.  Called by
    /// the resolver, exactly once per local reference, before interpretation.
    pub fn note_local(&mut self, id: ExprId, depth: usize) {
        self.locals.insert(id, depth);
    }

    /// Interprets a list of statements (a "program").  The first runtime
    /// error stops the run; output already produced stands.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<(), LoxError> {
        debug!("Interpreting {} statements", statements.len());

        for stmt in statements {
            if let Err(error) = self.execute(stmt) {
                return Err(match error {
                    InterpretError::RuntimeError { message, line } => {
                        LoxError::Runtime { message, line }
                    }

                    // Only reachable when the resolver gate was skipped.
                    InterpretError::ReturnSignal(_) => LoxError::Runtime {
                        message: "Cannot return from top-level code.".to_string(),
                        line: 0,
                    },

                    InterpretError::Io(e) => LoxError::Io(e),
                });
            }
        }

        info!("Interpretation completed successfully");
        Ok(())
    }

    // ───────────────────────── statements ─────────────────────────

    /// Executes a single statement.
    pub fn execute(&mut self, stmt: &Stmt) -> IResult<()> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(())
            }

            Stmt::Print(expr) => {
                let value: Value = self.evaluate(expr)?;
                writeln!(self.out, "{}", value)?;
                Ok(())
            }

            Stmt::Var { name, initializer } => {
                let value: Value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Defining variable '{}' = {}", name.lexeme, value);

                self.environment.borrow_mut().define(&name.lexeme, value);
                Ok(())
            }

            Stmt::Block(statements) => {
                let inner = Environment::with_enclosing(self.environment.clone());
                self.execute_block(statements, Rc::new(RefCell::new(inner)))
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if is_truthy(&self.evaluate(condition)?) {
                    self.execute(then_branch)
                } else if let Some(else_stmt) = else_branch {
                    self.execute(else_stmt)
                } else {
                    Ok(())
                }
            }

            Stmt::While { condition, body } => {
                while is_truthy(&self.evaluate(condition)?) {
                    self.execute(body)?;
                }

                Ok(())
            }

            Stmt::Function(declaration) => {
                debug!("Defining function '{}'", declaration.name.lexeme);

                // The current environment becomes the closure.
                let function =
                    LoxFunction::new(declaration.clone(), self.environment.clone(), false);

                self.environment
                    .borrow_mut()
                    .define(&declaration.name.lexeme, Value::Function(Rc::new(function)));

                Ok(())
            }

            Stmt::Return { keyword: _, value } => {
                let value: Value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                Err(InterpretError::ReturnSignal(value))
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.execute_class(name, superclass.as_ref(), methods),
        }
    }

    /// Execute `statements` with `environment` as the current scope, then
    /// restore the previous scope whether or not execution succeeded.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: Rc<RefCell<Environment>>,
    ) -> IResult<()> {
        let previous: Rc<RefCell<Environment>> =
            mem::replace(&mut self.environment, environment);

        let mut result: IResult<()> = Ok(());

        for statement in statements {
            result = self.execute(statement);

            if result.is_err() {
                break;
            }
        }

        self.environment = previous;

        result
    }

    fn execute_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<crate::ast::FunctionDecl>],
    ) -> IResult<()> {
        let superclass_value: Option<Rc<LoxClass>> = match superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(class) => Some(class),

                _ => {
                    return Err(InterpretError::runtime(
                        name.line,
                        "Superclass must be a class.",
                    ));
                }
            },

            None => None,
        };

        // Two-step definition so methods can close over the class's own slot.
        self.environment.borrow_mut().define(&name.lexeme, Value::Nil);

        // Methods of a subclass close over an extra scope carrying 'super'.
        let method_closure: Rc<RefCell<Environment>> = match &superclass_value {
            Some(class) => {
                let mut env = Environment::with_enclosing(self.environment.clone());
                env.define("super", Value::Class(class.clone()));
                Rc::new(RefCell::new(env))
            }

            None => self.environment.clone(),
        };

        let mut method_table: HashMap<String, Rc<LoxFunction>> = HashMap::new();

        for method in methods {
            let is_initializer: bool = method.name.lexeme == "init";
            let function =
                LoxFunction::new(method.clone(), method_closure.clone(), is_initializer);

            method_table.insert(method.name.lexeme.clone(), Rc::new(function));
        }

        let class = LoxClass::new(name.lexeme.clone(), superclass_value, method_table);

        self.environment
            .borrow_mut()
            .assign(&name.lexeme, Value::Class(Rc::new(class)));

        Ok(())
    }

    // ───────────────────────── expressions ────────────────────────

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr) -> IResult<Value> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right),

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),

            Expr::Logical {
                left,
                operator,
                right,
            } => self.evaluate_logical(left, operator, right),

            Expr::Variable { id, name } => self.look_up_variable(name, *id),

            Expr::Assign { id, name, value } => {
                let value: Value = self.evaluate(value)?;

                let assigned: bool = match self.locals.get(id) {
                    Some(&distance) => environment::assign_at(
                        &self.environment,
                        distance,
                        &name.lexeme,
                        value.clone(),
                    ),

                    None => self
                        .globals
                        .borrow_mut()
                        .assign(&name.lexeme, value.clone()),
                };

                if !assigned {
                    return Err(InterpretError::runtime(
                        name.line,
                        format!("Undefined variable '{}'.", name.lexeme),
                    ));
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee_value: Value = self.evaluate(callee)?;

                let mut args: Vec<Value> = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    args.push(self.evaluate(argument)?);
                }

                self.invoke_callable(callee_value, paren, args)
            }

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => LoxInstance::get(&instance, name),

                _ => Err(InterpretError::runtime(
                    name.line,
                    "Only instances have properties.",
                )),
            },

            Expr::Set {
                object,
                name,
                value,
            } => match self.evaluate(object)? {
                Value::Instance(instance) => {
                    let value: Value = self.evaluate(value)?;
                    instance.borrow_mut().set(name, value.clone());
                    Ok(value)
                }

                _ => Err(InterpretError::runtime(
                    name.line,
                    "Only instances have fields.",
                )),
            },

            Expr::This { id, keyword } => self.look_up_variable(keyword, *id),

            Expr::Super {
                id,
                keyword,
                method,
            } => self.evaluate_super(*id, keyword, method),
        }
    }

    fn evaluate_unary(&mut self, operator: &Token, right: &Expr) -> IResult<Value> {
        let right_value: Value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::MINUS => match right_value {
                Value::Number(n) => Ok(Value::Number(-n)),

                _ => Err(InterpretError::runtime(
                    operator.line,
                    "Operand must be a number.",
                )),
            },

            TokenType::BANG => Ok(Value::Bool(!is_truthy(&right_value))),

            _ => Err(InterpretError::runtime(
                operator.line,
                format!("Invalid unary operator '{}'.", operator.lexeme),
            )),
        }
    }

    /// `and` / `or` short-circuit and yield the deciding *operand* value,
    /// not a coerced boolean.
    fn evaluate_logical(&mut self, left: &Expr, operator: &Token, right: &Expr) -> IResult<Value> {
        let left_value: Value = self.evaluate(left)?;

        match operator.token_type {
            TokenType::OR => {
                if is_truthy(&left_value) {
                    return Ok(left_value);
                }
            }

            _ => {
                // AND
                if !is_truthy(&left_value) {
                    return Ok(left_value);
                }
            }
        }

        self.evaluate(right)
    }

    fn evaluate_binary(&mut self, left: &Expr, operator: &Token, right: &Expr) -> IResult<Value> {
        let left_value: Value = self.evaluate(left)?;
        let right_value: Value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::PLUS => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),

                _ => Err(InterpretError::runtime(
                    operator.line,
                    "Operands must be two numbers or two strings.",
                )),
            },

            TokenType::MINUS => {
                let (a, b) = self.number_operands(operator, left_value, right_value)?;
                Ok(Value::Number(a - b))
            }

            TokenType::STAR => {
                let (a, b) = self.number_operands(operator, left_value, right_value)?;
                Ok(Value::Number(a * b))
            }

            // Division by zero is not an error: IEEE-754 yields inf/NaN.
            TokenType::SLASH => {
                let (a, b) = self.number_operands(operator, left_value, right_value)?;
                Ok(Value::Number(a / b))
            }

            TokenType::GREATER => {
                let (a, b) = self.number_operands(operator, left_value, right_value)?;
                Ok(Value::Bool(a > b))
            }

            TokenType::GREATER_EQUAL => {
                let (a, b) = self.number_operands(operator, left_value, right_value)?;
                Ok(Value::Bool(a >= b))
            }

            TokenType::LESS => {
                let (a, b) = self.number_operands(operator, left_value, right_value)?;
                Ok(Value::Bool(a < b))
            }

            TokenType::LESS_EQUAL => {
                let (a, b) = self.number_operands(operator, left_value, right_value)?;
                Ok(Value::Bool(a <= b))
            }

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(is_equal(&left_value, &right_value))),

            TokenType::BANG_EQUAL => Ok(Value::Bool(!is_equal(&left_value, &right_value))),

            _ => Err(InterpretError::runtime(
                operator.line,
                format!("Invalid binary operator '{}'.", operator.lexeme),
            )),
        }
    }

    fn number_operands(
        &self,
        operator: &Token,
        left: Value,
        right: Value,
    ) -> IResult<(f64, f64)> {
        match (left, right) {
            (Value::Number(a), Value::Number(b)) => Ok((a, b)),

            _ => Err(InterpretError::runtime(
                operator.line,
                format!("Operands must be numbers for '{}'.", operator.lexeme),
            )),
        }
    }

    fn look_up_variable(&self, name: &Token, id: ExprId) -> IResult<Value> {
        let found: Option<Value> = match self.locals.get(&id) {
            Some(&distance) => environment::get_at(&self.environment, distance, &name.lexeme),
            None => self.globals.borrow().get(&name.lexeme),
        };

        found.ok_or_else(|| {
            InterpretError::runtime(
                name.line,
                format!("Undefined variable '{}'.", name.lexeme),
            )
        })
    }

    /// `super.method` starts the lookup one level above the class the call
    /// lexically appears in.  The resolver placed `super` in a synthetic
    /// scope between the method's closure and the `this` binding, so the
    /// instance sits exactly one hop closer than the superclass.
    fn evaluate_super(&mut self, id: ExprId, keyword: &Token, method: &Token) -> IResult<Value> {
        let distance: usize = self.locals.get(&id).copied().ok_or_else(|| {
            InterpretError::runtime(keyword.line, "Cannot use 'super' outside of a class.")
        })?;

        let superclass: Rc<LoxClass> =
            match environment::get_at(&self.environment, distance, "super") {
                Some(Value::Class(class)) => class,

                _ => {
                    return Err(InterpretError::runtime(
                        keyword.line,
                        "Cannot use 'super' outside of a class.",
                    ));
                }
            };

        let instance: Rc<RefCell<LoxInstance>> =
            match environment::get_at(&self.environment, distance - 1, "this") {
                Some(Value::Instance(instance)) => instance,

                _ => {
                    return Err(InterpretError::runtime(
                        keyword.line,
                        "Cannot use 'super' outside of a method.",
                    ));
                }
            };

        let resolved: Rc<LoxFunction> =
            superclass.find_method(&method.lexeme).ok_or_else(|| {
                InterpretError::runtime(
                    method.line,
                    format!("Undefined property '{}'.", method.lexeme),
                )
            })?;

        Ok(Value::Function(Rc::new(resolved.bind(&instance))))
    }

    /// Invokes a callable (native, user function, or class).
    fn invoke_callable(
        &mut self,
        callee: Value,
        paren: &Token,
        arguments: Vec<Value>,
    ) -> IResult<Value> {
        match callee {
            Value::Native(native) => {
                check_arity(native.arity, arguments.len(), paren)?;

                (native.func)(&arguments)
                    .map_err(|message| InterpretError::runtime(paren.line, message))
            }

            Value::Function(function) => {
                check_arity(function.arity(), arguments.len(), paren)?;

                function.call(self, arguments)
            }

            // Calling a class constructs an instance, then runs a bound
            // 'init' if the class (or an ancestor) declares one.  The
            // initializer's own result is discarded.
            Value::Class(class) => {
                check_arity(class.arity(), arguments.len(), paren)?;

                let instance = Rc::new(RefCell::new(LoxInstance::new(class.clone())));

                if let Some(init) = class.find_method("init") {
                    init.bind(&instance).call(self, arguments)?;
                }

                Ok(Value::Instance(instance))
            }

            _ => Err(InterpretError::runtime(
                paren.line,
                "Can only call functions and classes.",
            )),
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

fn check_arity(expected: usize, actual: usize, paren: &Token) -> IResult<()> {
    if expected != actual {
        return Err(InterpretError::runtime(
            paren.line,
            format!("Expected {} arguments but got {}.", expected, actual),
        ));
    }

    Ok(())
}

/// `nil` and `false` are falsy; every other value is truthy.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Nil => false,
        Value::Bool(b) => *b,
        _ => true,
    }
}

/// Value equality for primitives, identity for callables and instances.
/// Mismatched kinds are never equal.
fn is_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Nil, Value::Nil) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
        (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
        (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
        (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
        _ => false,
    }
}
