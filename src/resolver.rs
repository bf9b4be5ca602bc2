//! Static resolver pass.
//!
//! One non-evaluating AST walk that does three things:
//! 1. Build lexical scopes (stack of `HashMap<String, bool>` tracking
//!    declared/defined) mirroring exactly the environment chain the
//!    interpreter will build at runtime.
//! 2. Report static errors (redeclaration in a block scope, reading a local
//!    in its own initializer, invalid `return`, `this`/`super` misuse, a
//!    class inheriting from itself).  Errors accumulate in [`Diagnostics`];
//!    the walk never stops early, and any error gates out interpretation.
//! 3. Record, for each local variable occurrence, the number of enclosing
//!    scopes between use and declaration - the interpreter's O(1) lookup
//!    distance.  Names found in no scope are left for dynamic global lookup.

use std::collections::HashMap;

use log::{debug, info};

use crate::ast::{Expr, FunctionDecl, Stmt};
use crate::error::{Diagnostics, LoxError};
use crate::interpreter::Interpreter;
use crate::token::Token;

/// What kind of function body are we inside?  Validates `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Initializer,
    Method,
}

/// What kind of class body are we inside?  Validates `this` and `super`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

/// Resolver: tracks scopes, enforces static rules, and *records* binding
/// distances by calling back into the interpreter.
pub struct Resolver<'i, 'd> {
    interpreter: &'i mut Interpreter,
    diagnostics: &'d mut Diagnostics,
    scopes: Vec<HashMap<String, bool>>, // false=declared, true=defined
    current_function: FunctionType,
    current_class: ClassType,
}

impl<'i, 'd> Resolver<'i, 'd> {
    /// Create a new resolver bound to the given interpreter.
    pub fn new(interpreter: &'i mut Interpreter, diagnostics: &'d mut Diagnostics) -> Self {
        info!("Resolver instantiated");

        Resolver {
            interpreter,
            diagnostics,
            scopes: Vec::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
        }
    }

    /// Walk all top-level statements.
    pub fn resolve(&mut self, statements: &[Stmt]) {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        for stmt in statements {
            self.resolve_stmt(stmt);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(statements) => {
                self.begin_scope();
                for s in statements {
                    self.resolve_stmt(s);
                }
                self.end_scope();
            }

            Stmt::Var { name, initializer } => {
                // declare → resolve initializer → define, so a read of the
                // name inside its own initializer is still "declared only".
                self.declare(name);
                if let Some(expr) = initializer {
                    self.resolve_expr(expr);
                }
                self.define(name);
            }

            Stmt::Function(declaration) => {
                // A function's name is visible inside its own body.
                self.declare(&declaration.name);
                self.define(&declaration.name);
                self.resolve_function(declaration, FunctionType::Function);
            }

            Stmt::Expression(expr) | Stmt::Print(expr) => {
                self.resolve_expr(expr);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(eb) = else_branch.as_deref() {
                    self.resolve_stmt(eb);
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.diagnostics.report(LoxError::resolve(
                        keyword,
                        "Cannot return from top-level code",
                    ));
                }

                if let Some(expr) = value {
                    if self.current_function == FunctionType::Initializer {
                        self.diagnostics.report(LoxError::resolve(
                            keyword,
                            "Cannot return a value from an initializer",
                        ));
                    }

                    self.resolve_expr(expr);
                }
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.resolve_class(name, superclass.as_ref(), methods),
        }
    }

    fn resolve_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[std::rc::Rc<FunctionDecl>],
    ) {
        let enclosing_class: ClassType = self.current_class;
        self.current_class = ClassType::Class;

        self.declare(name);
        self.define(name);

        if let Some(expr) = superclass {
            if let Expr::Variable {
                name: super_name, ..
            } = expr
            {
                if super_name.lexeme == name.lexeme {
                    self.diagnostics.report(LoxError::resolve(
                        super_name,
                        "A class cannot inherit from itself",
                    ));
                }
            }

            self.current_class = ClassType::Subclass;
            self.resolve_expr(expr);

            // Synthetic scope holding 'super', mirrored by the interpreter's
            // extra method-closure environment.
            self.begin_scope();
            self.declare_keyword("super");
        }

        // Every method body sees 'this' one scope outside its parameters.
        self.begin_scope();
        self.declare_keyword("this");

        for method in methods {
            let declaration: FunctionType = if method.name.lexeme == "init" {
                FunctionType::Initializer
            } else {
                FunctionType::Method
            };

            self.resolve_function(method, declaration);
        }

        self.end_scope();

        if superclass.is_some() {
            self.end_scope();
        }

        self.current_class = enclosing_class;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(_) => {}

            Expr::Grouping(inner) => {
                self.resolve_expr(inner);
            }

            Expr::Unary { right, .. } => {
                self.resolve_expr(right);
            }

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }

            Expr::Variable { id, name } => {
                if let Some(scope) = self.scopes.last() {
                    if scope.get(name.lexeme.as_str()) == Some(&false) {
                        self.diagnostics.report(LoxError::resolve(
                            name,
                            "Cannot read local variable in its own initializer",
                        ));
                    }
                }

                self.resolve_local(*id, name);
            }

            Expr::Assign { id, name, value } => {
                // First resolve the RHS, then bind the target.
                self.resolve_expr(value);
                self.resolve_local(*id, name);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);
                for arg in arguments {
                    self.resolve_expr(arg);
                }
            }

            Expr::Get { object, .. } => self.resolve_expr(object),

            Expr::Set { object, value, .. } => {
                self.resolve_expr(object);
                self.resolve_expr(value);
            }

            Expr::This { id, keyword } => {
                if self.current_class == ClassType::None {
                    self.diagnostics.report(LoxError::resolve(
                        keyword,
                        "Cannot use 'this' outside of a class",
                    ));
                    return;
                }

                self.resolve_local(*id, keyword);
            }

            Expr::Super { id, keyword, .. } => {
                match self.current_class {
                    ClassType::None => {
                        self.diagnostics.report(LoxError::resolve(
                            keyword,
                            "Cannot use 'super' outside of a class",
                        ));
                        return;
                    }

                    ClassType::Class => {
                        self.diagnostics.report(LoxError::resolve(
                            keyword,
                            "Cannot use 'super' in a class with no superclass",
                        ));
                        return;
                    }

                    ClassType::Subclass => {}
                }

                self.resolve_local(*id, keyword);
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Enter a fresh scope for a function's parameters + body, stacking the
    /// function-kind context around it.
    fn resolve_function(&mut self, declaration: &FunctionDecl, function_type: FunctionType) {
        let enclosing: FunctionType = self.current_function;
        self.current_function = function_type;

        self.begin_scope();
        for param in &declaration.params {
            self.declare(param);
            self.define(param);
        }
        for stmt in &declaration.body {
            self.resolve_stmt(stmt);
        }
        self.end_scope();

        self.current_function = enclosing;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    #[inline]
    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            if scope.contains_key(name.lexeme.as_str()) {
                self.diagnostics.report(LoxError::resolve(
                    name,
                    "Already a variable with this name in this scope",
                ));
            }

            scope.insert(name.lexeme.clone(), false);
        }
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), true);
        }
    }

    /// Bind a synthetic name (`this` / `super`) in the innermost scope.
    fn declare_keyword(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), true);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Binding-distance helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Record this variable occurrence as a local at the depth of the first
    /// enclosing scope that declares it; names found nowhere stay global and
    /// get no table entry at all.
    fn resolve_local(&mut self, id: crate::ast::ExprId, name: &Token) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(name.lexeme.as_str()) {
                debug!("Resolved '{}' at depth {}", name.lexeme, depth);
                self.interpreter.note_local(id, depth);
                return;
            }
        }

        debug!("Resolved '{}' as global", name.lexeme);
    }
}
