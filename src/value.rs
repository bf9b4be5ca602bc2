//! The dynamically-typed runtime value.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::callable::{LoxFunction, NativeFunction};
use crate::class::LoxClass;
use crate::instance::LoxInstance;

/// One Lox value.  Callables and instances are reference-counted handles so
/// that values can be cloned freely while sharing identity.
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    String(String),
    Native(Rc<NativeFunction>),
    Function(Rc<LoxFunction>),
    Class(Rc<LoxClass>),
    Instance(Rc<RefCell<LoxInstance>>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),

            Value::Bool(b) => write!(f, "{}", b),

            Value::Number(n) => {
                // Integral values print without a trailing ".0"; everything
                // else (fractions, inf, NaN) uses f64's natural text form.
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    let mut buf: itoa::Buffer = itoa::Buffer::new();
                    f.write_str(buf.format(*n as i64))
                } else {
                    write!(f, "{}", n)
                }
            }

            Value::String(s) => write!(f, "{}", s),

            Value::Native(native) => write!(f, "{}", native),

            Value::Function(function) => write!(f, "<fn {}>", function.name()),

            Value::Class(class) => write!(f, "{}", class),

            Value::Instance(instance) => write!(f, "{}", instance.borrow()),
        }
    }
}
