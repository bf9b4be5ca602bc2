//! Abstract-syntax-tree node definitions shared by the parser, resolver, and
//! interpreter.
//!
//! Nodes are plain sum types consumed via exhaustive pattern matching in each
//! pass.  Expression variants that name a binding (`Variable`, `Assign`,
//! `This`, `Super`) carry a process-unique [`ExprId`]; the resolver keys its
//! scope-distance table on that id, which is how the interpreter later finds
//! the binding in O(1) without re-walking the scope stack.

use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::token::Token;

/// Identity of a resolvable expression node.
pub type ExprId = usize;

static NEXT_EXPR_ID: AtomicUsize = AtomicUsize::new(0);

/// Allocate a fresh expression id.  Ids are unique for the lifetime of the
/// process so that resolution tables survive across REPL lines feeding one
/// long-lived interpreter.
pub fn next_expr_id() -> ExprId {
    NEXT_EXPR_ID.fetch_add(1, Ordering::Relaxed)
}

/// A **literal constant** that appears directly in the source code.
///
/// These variants are the *terminal leaves* of the expression tree; the
/// parser copies (or converts) the value at parse-time so the AST does not
/// retain the originating [`Token`].
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    /// Numeric literal - stored as IEEE-754 `f64`.
    /// Integral lexemes such as `"3"` are still parsed as `3.0`.
    Number(f64),

    /// String literal without surrounding quotes.
    Str(String),

    /// The boolean constant `true`.
    True,

    /// The boolean constant `false`.
    False,

    /// The `nil` literal.
    Nil,
}

/// **AST node** representing every kind of *expression* in Lox.
#[derive(Debug, Clone)]
pub enum Expr {
    /// A literal constant: number, string, `true`, `false`, or `nil`.
    Literal(LiteralValue),

    /// Parenthesised sub-expression: `"(" expression ")"`.
    Grouping(Box<Expr>),

    /// Prefix unary operator expression, e.g. `!isReady` or `-42`.
    Unary {
        /// The operator token (`!` or `-`).
        operator: Token,
        /// Operand to which the operator is applied.
        right: Box<Expr>,
    },

    /// Infix binary operator expression, e.g. `a + b`, `x <= y`.
    Binary {
        left: Box<Expr>,
        /// Operator token such as `+`, `*`, `==`, ...
        operator: Token,
        right: Box<Expr>,
    },

    /// Short-circuiting logical operators `and` / `or`.
    Logical {
        left: Box<Expr>,
        operator: Token, // `AND` or `OR`
        right: Box<Expr>,
    },

    /// Variable access - resolves to the identifier's current value at runtime.
    Variable { id: ExprId, name: Token },

    /// Assignment expression: `identifier "=" expression`.
    Assign {
        id: ExprId,
        name: Token,
        value: Box<Expr>,
    },

    /// Function- or method-call expression, e.g. `clock()` or `add(1, 2)`.
    Call {
        /// Expression that evaluates to a callable (variable, property, etc.).
        callee: Box<Expr>,
        /// The closing `)` token - retained for error reporting.
        paren: Token,
        /// Argument list (may be empty).
        arguments: Vec<Expr>,
    },

    /// `object.property`
    Get { object: Box<Expr>, name: Token },

    /// `object.property = value`
    Set {
        object: Box<Expr>,
        name: Token,
        value: Box<Expr>,
    },

    /// The `this` keyword inside a method.
    This { id: ExprId, keyword: Token },

    /// `super.method` inside a subclass method.
    Super {
        id: ExprId,
        keyword: Token,
        method: Token,
    },
}

/// One function or method declaration: `IDENT "(" params? ")" block`.
///
/// Declarations are reference-counted because a function *value* created at
/// runtime keeps its declaration alive past the statement that introduced it.
#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub name: Token,

    /// Parameter name tokens (arity ≤ 255).
    pub params: Vec<Token>,

    /// Body executed when the function is called.
    pub body: Vec<Stmt>,
}

/// **AST node** for *statements* (complete executable constructs).  A program
/// is a sequence of these nodes returned by `Parser::parse`.
#[derive(Debug, Clone)]
pub enum Stmt {
    /// Stand-alone expression terminated by a semicolon.
    Expression(Expr),

    /// `print` statement used for output.
    Print(Expr),

    /// Variable declaration: `"var" IDENT ("=" initializer)? ";"`.
    Var {
        name: Token,
        initializer: Option<Expr>,
    },

    /// Braced scope containing zero or more declarations/statements.
    Block(Vec<Stmt>),

    /// `if` / `else` conditional.
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    /// `while` loop.  `for` loops desugar to this inside enclosing blocks.
    While { condition: Expr, body: Box<Stmt> },

    /// Function declaration - becomes a first-class callable value.
    Function(Rc<FunctionDecl>),

    /// `return` statement inside a function body.
    Return {
        /// The `return` keyword token (for error locations).
        keyword: Token,

        /// Optional expression to return.  Absent ⇒ `nil` is returned.
        value: Option<Expr>,
    },

    /// Class declaration with optional `< Superclass` clause.  The superclass
    /// is an `Expr::Variable` so it is resolved and evaluated like any other
    /// name.
    Class {
        name: Token,
        superclass: Option<Expr>,
        methods: Vec<Rc<FunctionDecl>>,
    },
}
