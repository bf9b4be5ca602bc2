//! Class values: a name, an optional superclass, and a method table.
//!
//! Created once per `class` statement and immutable afterwards.  Method
//! lookup walks from the class itself up the superclass chain and returns the
//! first hit.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::callable::LoxFunction;

#[derive(Debug)]
pub struct LoxClass {
    name: String,
    superclass: Option<Rc<LoxClass>>,
    methods: HashMap<String, Rc<LoxFunction>>,
}

impl LoxClass {
    pub fn new(
        name: String,
        superclass: Option<Rc<LoxClass>>,
        methods: HashMap<String, Rc<LoxFunction>>,
    ) -> Self {
        Self {
            name,
            superclass,
            methods,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// First method named `name` on this class or an ancestor.
    pub fn find_method(&self, name: &str) -> Option<Rc<LoxFunction>> {
        self.methods.get(name).cloned().or_else(|| {
            self.superclass
                .as_ref()
                .and_then(|superclass| superclass.find_method(name))
        })
    }

    /// Calling a class runs its `init`, so the class's arity is `init`'s
    /// arity, or zero when no initializer exists anywhere on the chain.
    pub fn arity(&self) -> usize {
        self.find_method("init").map_or(0, |init| init.arity())
    }
}

impl fmt::Display for LoxClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
