//! This module acts as a top-level entrypoint to evaluating Lox code.

use crate::{
    interpreter::Interpreter,
    parser::Parser,
    pretty_printers::ParenPrinter,
    scanner::Scanner,
    span::{LineOffsets, Span},
    tokens::{Token, TokenType},
};
use lazy_static::lazy_static;
use rustyline::{error::ReadlineError, DefaultEditor};
use std::{
    fs, io,
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        RwLock,
    },
};
use thiserror::Error;
use tracing::{debug, instrument, trace};

/// Have we encountered at least one error before runtime?
static HAD_NON_RUNTIME_ERROR: AtomicBool = AtomicBool::new(false);

/// Have we encountered at least one error at runtime?
static HAD_RUNTIME_ERROR: AtomicBool = AtomicBool::new(false);

lazy_static! {
    /// The LineOffsets of the code being worked with.
    static ref LINE_OFFSETS: RwLock<LineOffsets> = RwLock::new(LineOffsets::new(""));

    /// The source code that we're working with. The REPL accumulates lines
    /// here so that spans from earlier inputs stay meaningful.
    static ref SOURCE_CODE: RwLock<String> = RwLock::new(String::new());
}

/// Register the source code that spans will be resolved against.
pub fn register_source(code: &str) {
    *SOURCE_CODE.write().unwrap() = code.to_string();
    *LINE_OFFSETS.write().unwrap() = LineOffsets::new(code);
}

/// The Lox interpreter driver, generic over the backend.
#[derive(Clone, Debug)]
pub struct LoxeInterpreter<T: Interpreter> {
    /// The core interpreter implementation to use.
    interpreter: T,
}

/// An error that can be returned from [`LoxeInterpreter::run_file`].
#[derive(Debug, Error)]
pub enum RunFileError {
    /// The code failed to scan, parse, or resolve.
    #[error("A compile error occured in the Lox code")]
    Compile,

    /// The code failed at runtime.
    #[error("A runtime error occured in the Lox code")]
    Runtime,

    /// A standard I/O error.
    #[error("I/O error: `{0:?}`")]
    Io(#[from] io::Error),
}

/// An error that can be returned from [`LoxeInterpreter::run_prompt`].
#[derive(Debug, Error)]
pub enum PromptError {
    /// An error from `rustyline`.
    #[error("rustyline error: `{0:?}`")]
    Readline(#[from] ReadlineError),

    /// A standard I/O error.
    #[error("I/O error: `{0:?}`")]
    Io(#[from] io::Error),
}

impl<T: Interpreter> LoxeInterpreter<T> {
    /// Create a new interpreter.
    pub fn new() -> Self {
        Self {
            interpreter: T::new(),
        }
    }

    /// Read the file and run the contents.
    pub fn run_file(&mut self, path: impl AsRef<Path>) -> Result<(), RunFileError> {
        let code = fs::read_to_string(path)?;
        register_source(&code);

        self.run_code(&code);

        if HAD_NON_RUNTIME_ERROR.load(Ordering::Relaxed) {
            Err(RunFileError::Compile)
        } else if HAD_RUNTIME_ERROR.load(Ordering::Relaxed) {
            Err(RunFileError::Runtime)
        } else {
            Ok(())
        }
    }

    /// Read code from an interactive prompt and run it.
    ///
    /// Compile and runtime errors are reported but do not terminate the
    /// session; the error flags are reset after every line.
    pub fn run_prompt(&mut self) -> Result<(), PromptError> {
        let mut prompt = DefaultEditor::new()?;

        let history_file =
            home::home_dir().map(|home| home.join(".config").join("loxe").join(".history"));
        if let Some(history_file) = &history_file {
            if !history_file.exists() {
                if let Some(parent) = history_file.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::File::create(history_file)?;
            }
            prompt.load_history(&history_file)?;
        }

        loop {
            match prompt.readline("> ") {
                Ok(mut line) => {
                    prompt.add_history_entry(&line)?;
                    if let Some(history_file) = &history_file {
                        prompt.save_history(history_file)?;
                    }
                    line.push('\n');

                    // Append the line to the accumulated source and pad the
                    // scan buffer, so new spans index into the accumulated
                    // text and old spans stay valid.
                    let old_code_width = SOURCE_CODE.read().unwrap().len();
                    SOURCE_CODE.write().unwrap().push_str(&line);
                    *LINE_OFFSETS.write().unwrap() =
                        LineOffsets::new(&SOURCE_CODE.read().unwrap());

                    let line = format!("{:old_code_width$}{line}", "");

                    self.run_code(&line);
                }
                Err(ReadlineError::Eof | ReadlineError::Interrupted) => return Ok(()),
                Err(ReadlineError::Io(e)) => return Err(e)?,
                Err(error) => panic!("Unknown error: `{error:?}`"),
            }
            HAD_NON_RUNTIME_ERROR.store(false, Ordering::Relaxed);
            HAD_RUNTIME_ERROR.store(false, Ordering::Relaxed);
        }
    }

    /// Run the given Lox code.
    #[instrument(skip_all)]
    fn run_code(&mut self, code: &str) {
        debug!("Running code: ```lox\n{}```", code.trim_start());

        let tokens = Scanner::scan_tokens(code);
        trace!(?tokens);

        let stmts = Parser::parse(tokens);
        trace!(?stmts);
        debug!(parens = %ParenPrinter::print_stmts(&stmts));

        if HAD_NON_RUNTIME_ERROR.load(Ordering::Relaxed) {
            return;
        }

        self.interpreter.interpret(&stmts);
    }
}

impl<T: Interpreter> Default for LoxeInterpreter<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Get the 1-based line number for the start of the given span.
fn line_number(span: Span) -> usize {
    LINE_OFFSETS.read().unwrap().line(span.start)
}

/// Report an error at the given token with the given message.
pub fn report_token_error(token: &Token<'_>, message: &str) {
    let location = if token.token_type == TokenType::Eof {
        " at end".to_string()
    } else {
        format!(" at '{}'", token.lexeme)
    };

    print_compile_error(token.span, &location, message);
}

/// Report an error at a token that is only known by its span and lexeme.
pub fn report_error_at(span: Span, lexeme: &str, message: &str) {
    print_compile_error(span, &format!(" at '{lexeme}'"), message);
}

/// Report an error during the scanning of source code.
pub fn report_scan_error(span: Span, message: &str) {
    print_compile_error(span, "", message);
}

/// Print a compile error as `[line N] Error<where>: <message>` and set the
/// compile error flag.
fn print_compile_error(span: Span, location: &str, message: &str) {
    use crossterm::{
        execute,
        style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor},
    };

    execute!(
        io::stderr(),
        Print(format!("[line {}] ", line_number(span))),
        SetForegroundColor(Color::Red),
        SetAttribute(Attribute::Bold),
        Print("Error"),
        ResetColor,
        SetAttribute(Attribute::Reset),
        Print(format!("{location}: {message}\n")),
    )
    .expect("Should be able to print error messages with crossterm");

    HAD_NON_RUNTIME_ERROR.store(true, Ordering::Relaxed);
}

/// Print a runtime error as `<message>` followed by `[line N]` and set the
/// runtime error flag.
pub fn report_runtime_error(span: Span, message: &str) {
    use crossterm::{
        execute,
        style::{Color, Print, ResetColor, SetForegroundColor},
    };

    execute!(
        io::stderr(),
        SetForegroundColor(Color::Red),
        Print(format!("{message}\n")),
        ResetColor,
        Print(format!("[line {}]\n", line_number(span))),
    )
    .expect("Should be able to print error messages with crossterm");

    HAD_RUNTIME_ERROR.store(true, Ordering::Relaxed);
}
