//! **rox** - a tree-walking interpreter for the Lox language.
//!
//! The pipeline is scanner → parser → resolver → interpreter; each stage is
//! its own module, and [`run_source`] wires them together for one source
//! unit (a file's contents or one REPL line).

pub mod ast;
pub mod callable;
pub mod class;
pub mod environment;
pub mod error;
pub mod instance;
pub mod interpreter;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod token;
pub mod value;

use error::Diagnostics;
use interpreter::Interpreter;
use parser::Parser;
use resolver::Resolver;

/// Observable outcome of one run, polled by the driver to pick an exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Executed to normal completion.
    Ok,

    /// A lexical, syntax, or resolution error was reported; nothing ran.
    StaticError,

    /// Execution started and stopped at a runtime error.  Output produced
    /// before the error stands.
    RuntimeError,
}

/// Run one complete unit of source text through the pipeline.
///
/// Static errors from scanning, parsing, and resolving accumulate so that a
/// single run surfaces as many of them as possible; any static error gates
/// out interpretation entirely.  Diagnostics go to the error stream, `print`
/// output to the interpreter's sink.
pub fn run_source(source: &[u8], interpreter: &mut Interpreter) -> RunStatus {
    let mut diagnostics = Diagnostics::new();

    let tokens = scanner::scan(source, &mut diagnostics);
    let statements = Parser::new(&tokens, &mut diagnostics).parse();

    if diagnostics.had_errors() {
        diagnostics.print_all();
        return RunStatus::StaticError;
    }

    Resolver::new(interpreter, &mut diagnostics).resolve(&statements);

    if diagnostics.had_errors() {
        diagnostics.print_all();
        return RunStatus::StaticError;
    }

    match interpreter.interpret(&statements) {
        Ok(()) => RunStatus::Ok,

        Err(error) => {
            eprintln!("{}", error);
            RunStatus::RuntimeError
        }
    }
}
