//! Callable runtime values: user functions (closures) and natives.
//!
//! A [`LoxFunction`] pairs its declaration with the environment that was
//! current when the declaration executed.  Every call builds a fresh child of
//! that closure, binds parameters positionally, and runs the body through the
//! interpreter; a `ReturnSignal` raised anywhere inside unwinds to exactly
//! this call boundary.  An initializer (`init` method) always yields the
//! instance bound as `this`, whatever its body does.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::ast::FunctionDecl;
use crate::environment::{self, Environment};
use crate::instance::LoxInstance;
use crate::interpreter::{IResult, InterpretError, Interpreter};
use crate::value::Value;

/// A host-provided function exposed to scripts (e.g. `clock`).
#[derive(Debug)]
pub struct NativeFunction {
    pub name: &'static str,
    pub arity: usize,
    pub func: fn(&[Value]) -> Result<Value, String>,
}

impl fmt::Display for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn>")
    }
}

/// A user-defined function or method value.
#[derive(Debug)]
pub struct LoxFunction {
    declaration: Rc<FunctionDecl>,
    closure: Rc<RefCell<Environment>>,
    is_initializer: bool,
}

impl LoxFunction {
    pub fn new(
        declaration: Rc<FunctionDecl>,
        closure: Rc<RefCell<Environment>>,
        is_initializer: bool,
    ) -> Self {
        Self {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    /// Produce a copy of this method whose closure has `this` bound to
    /// `instance`, one scope inside the original closure.
    pub fn bind(&self, instance: &Rc<RefCell<LoxInstance>>) -> LoxFunction {
        let mut bound: Environment = Environment::with_enclosing(self.closure.clone());
        bound.define("this", Value::Instance(instance.clone()));

        LoxFunction {
            declaration: self.declaration.clone(),
            closure: Rc::new(RefCell::new(bound)),
            is_initializer: self.is_initializer,
        }
    }

    /// Invoke the function.  The caller has already checked arity.
    pub fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>) -> IResult<Value> {
        debug!("Calling function '{}'", self.name());

        let mut environment: Environment = Environment::with_enclosing(self.closure.clone());

        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            environment.define(&param.lexeme, argument);
        }

        let result: IResult<()> = interpreter.execute_block(
            &self.declaration.body,
            Rc::new(RefCell::new(environment)),
        );

        match result {
            // A return statement unwound to this call boundary.
            Err(InterpretError::ReturnSignal(value)) => {
                if self.is_initializer {
                    self.this_binding()
                } else {
                    Ok(value)
                }
            }

            Err(other) => Err(other),

            // Body fell off the end.
            Ok(()) => {
                if self.is_initializer {
                    self.this_binding()
                } else {
                    Ok(Value::Nil)
                }
            }
        }
    }

    /// The `this` value an initializer returns.  A bound initializer's closure
    /// always holds `this` at distance zero.
    fn this_binding(&self) -> IResult<Value> {
        environment::get_at(&self.closure, 0, "this").ok_or_else(|| {
            InterpretError::runtime(
                self.declaration.name.line,
                "Initializer has no bound instance.",
            )
        })
    }
}

impl fmt::Display for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.name())
    }
}
