//! Instances: a class back-reference plus a mutable field table.
//!
//! Property reads check the instance's own fields first, then fall back to
//! the class's method table (binding the method to the instance); property
//! writes always land in the field table, creating the field on first write.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::class::LoxClass;
use crate::interpreter::{IResult, InterpretError};
use crate::token::Token;
use crate::value::Value;

#[derive(Debug)]
pub struct LoxInstance {
    class: Rc<LoxClass>,
    fields: HashMap<String, Value>,
}

impl LoxInstance {
    pub fn new(class: Rc<LoxClass>) -> Self {
        Self {
            class,
            fields: HashMap::new(),
        }
    }

    pub fn class(&self) -> &Rc<LoxClass> {
        &self.class
    }

    /// Read a property on `this`.  Takes the shared handle rather than
    /// `&self` because a method hit must bind the handle as `this`.
    pub fn get(this: &Rc<RefCell<LoxInstance>>, name: &Token) -> IResult<Value> {
        if let Some(value) = this.borrow().fields.get(&name.lexeme) {
            return Ok(value.clone());
        }

        let class: Rc<LoxClass> = this.borrow().class.clone();

        if let Some(method) = class.find_method(&name.lexeme) {
            return Ok(Value::Function(Rc::new(method.bind(this))));
        }

        Err(InterpretError::runtime(
            name.line,
            format!("Undefined property '{}'.", name.lexeme),
        ))
    }

    /// Write a field, creating it if absent.  Never touches the class.
    pub fn set(&mut self, name: &Token, value: Value) {
        self.fields.insert(name.lexeme.clone(), value);
    }
}

impl fmt::Display for LoxInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} instance", self.class)
    }
}
