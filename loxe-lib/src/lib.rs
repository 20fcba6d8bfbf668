//! This crate contains the core of `loxe`, a tree-walk interpreter for a
//! superset of Lox with static methods, arrays, and augmented assignment.

pub mod ast;
pub mod builtins;
pub mod callable;
pub mod class;
pub mod environment;
pub mod interpreter;
pub mod lox;
pub mod object;
pub mod parser;
pub mod pretty_printers;
pub mod scanner;
pub mod span;
pub mod tokens;

use color_eyre::Result;
use std::{env, process};
use tracing_subscriber::{filter::LevelFilter, prelude::*, EnvFilter};

pub use self::interpreter::Interpreter;

/// The process exit code for a usage error.
const EXIT_USAGE: i32 = 64;

/// The process exit code for a scan, parse, or resolve error.
const EXIT_COMPILE_ERROR: i32 = 65;

/// The process exit code for a runtime error.
const EXIT_RUNTIME_ERROR: i32 = 70;

/// The process exit code for failing to read the script.
const EXIT_IO_ERROR: i32 = 74;

/// Run the interpreter, taking a source file as the first CLI argument, or
/// running the REPL if no file was given.
pub fn run_interpreter<T: Interpreter>() -> Result<()> {
    color_eyre::install()?;

    tracing::subscriber::set_global_default(
        tracing_subscriber::registry().with(
            tracing_subscriber::fmt::layer().with_filter(
                EnvFilter::builder()
                    .with_default_directive(LevelFilter::WARN.into())
                    .from_env_lossy(),
            ),
        ),
    )?;

    let mut args = env::args().skip(1);
    let mut interpreter = lox::LoxeInterpreter::<T>::new();

    match (args.next(), args.next()) {
        (None, _) => interpreter.run_prompt()?,
        (Some(path), None) => match interpreter.run_file(path) {
            Ok(()) => {}
            Err(lox::RunFileError::Compile) => process::exit(EXIT_COMPILE_ERROR),
            Err(lox::RunFileError::Runtime) => process::exit(EXIT_RUNTIME_ERROR),
            Err(lox::RunFileError::Io(error)) => {
                eprintln!("Could not read script: {error}");
                process::exit(EXIT_IO_ERROR);
            }
        },
        (Some(_), Some(_)) => {
            eprintln!("Usage: loxe [script]");
            process::exit(EXIT_USAGE);
        }
    }

    Ok(())
}
