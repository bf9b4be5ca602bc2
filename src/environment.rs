//! Nested runtime scopes.
//!
//! Environments form a tree rooted at the interpreter's global scope; each
//! block or function call adds a child.  Multiple closures may hold the same
//! `Rc<RefCell<Environment>>` and mutation through one handle is visible
//! through all of them - that aliasing is what makes shared upvalues work.
//!
//! `get`/`assign` walk outward through enclosing links (used only for
//! globals); `get_at`/`assign_at` jump directly to the scope the resolver
//! measured, so local access never depends on what is shadowed in between.

use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Bind `name` in this scope, overwriting any previous binding here.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Look `name` up in this scope, then outward through enclosing scopes.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.values.get(name) {
            Some(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            None
        }
    }

    /// Assign to an *existing* binding, searching outward.  Returns `false`
    /// when the name is not bound anywhere on the chain.
    pub fn assign(&mut self, name: &str, value: Value) -> bool {
        if self.values.contains_key(name) {
            self.values.insert(name.to_string(), value);
            true
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            false
        }
    }
}

/// Walk exactly `distance` enclosing links.  `None` if the chain is shorter,
/// which means the resolver and the runtime scope structure disagree.
fn ancestor(
    env: &Rc<RefCell<Environment>>,
    distance: usize,
) -> Option<Rc<RefCell<Environment>>> {
    let mut current: Rc<RefCell<Environment>> = Rc::clone(env);

    for _ in 0..distance {
        let next = current.borrow().enclosing.clone()?;
        current = next;
    }

    Some(current)
}

/// Read `name` from the scope exactly `distance` hops out, without searching.
pub fn get_at(env: &Rc<RefCell<Environment>>, distance: usize, name: &str) -> Option<Value> {
    let scope = ancestor(env, distance)?;
    let value = scope.borrow().values.get(name).cloned();

    value
}

/// Write `name` in the scope exactly `distance` hops out.  Returns `false`
/// when the scope does not hold the binding.
pub fn assign_at(
    env: &Rc<RefCell<Environment>>,
    distance: usize,
    name: &str,
    value: Value,
) -> bool {
    match ancestor(env, distance) {
        Some(scope) => {
            let mut scope = scope.borrow_mut();

            if scope.values.contains_key(name) {
                scope.values.insert(name.to_string(), value);
                true
            } else {
                false
            }
        }

        None => false,
    }
}
