use std::{
    env, fs,
    io::{self, BufRead, Write},
    sync::Once,
};

use thiserror::Error;

use crate::{
    interpreter::{Interpreter, RuntimeError},
    parser::{ParseError, Parser},
    scanner::{ScanErrors, Scanner},
};

pub const EXIT_USAGE: i32 = 64;
pub const EXIT_DATA_ERROR: i32 = 65;
pub const EXIT_NO_INPUT: i32 = 66;
pub const EXIT_SOFTWARE: i32 = 70;

#[derive(Debug, Error)]
pub enum LoxError {
    #[error(transparent)]
    Scan(#[from] ScanErrors),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl LoxError {
    pub fn exit_code(&self) -> i32 {
        match self {
            LoxError::Scan(_) | LoxError::Parse(_) => EXIT_DATA_ERROR,
            LoxError::Runtime(_) => EXIT_SOFTWARE,
        }
    }
}

/// Owns the interpreter for a whole session, so globals survive between
/// REPL lines.
pub struct Lox {
    interpreter: Interpreter,
}

impl Default for Lox {
    fn default() -> Self {
        Self::new()
    }
}

impl Lox {
    pub fn new() -> Lox {
        Lox {
            interpreter: Interpreter::new(),
        }
    }

    pub fn with_interpreter(interpreter: Interpreter) -> Lox {
        Lox { interpreter }
    }

    /// Dispatches on the command line and returns the process exit code.
    pub fn main(&mut self) -> i32 {
        init_tracing();

        let args = Vec::from_iter(env::args().skip(1));

        match args.as_slice() {
            [] => match self.run_prompt() {
                Ok(()) => 0,
                Err(error) => {
                    eprintln!("{}", error);
                    EXIT_SOFTWARE
                }
            },
            [path] => self.run_file(path),
            _ => {
                eprintln!("Usage: lox [script]");
                EXIT_USAGE
            }
        }
    }

    /// Reads lines from stdin until EOF. Errors are reported and the session
    /// carries on with its state intact.
    pub fn run_prompt(&mut self) -> io::Result<()> {
        self.repl(io::stdin().lock(), io::stdout())
    }

    fn repl(&mut self, input: impl BufRead, mut prompt: impl Write) -> io::Result<()> {
        let mut lines = input.lines();

        loop {
            write!(prompt, "> ")?;
            prompt.flush()?;

            let line = match lines.next() {
                None => return Ok(()),
                Some(Ok(line)) => line,
                // The bad line has been consumed, so reading can go on.
                Some(Err(error)) if error.kind() == io::ErrorKind::InvalidData => {
                    eprintln!("{}", error);
                    continue;
                }
                Some(Err(error)) => return Err(error),
            };

            if let Err(error) = self.run(&line) {
                eprintln!("{}", error);
            }
        }
    }

    pub fn run_file(&mut self, path: &str) -> i32 {
        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(error) => {
                eprintln!("{}: {}", path, error);
                return EXIT_NO_INPUT;
            }
        };

        match self.run(&source) {
            Ok(()) => 0,
            Err(error) => {
                for line in error.to_string().lines() {
                    eprintln!("{}: {}", path, line);
                }
                error.exit_code()
            }
        }
    }

    /// Scans, parses and runs `source`. Nothing runs unless the whole source
    /// scans and parses.
    pub fn run(&mut self, source: &str) -> Result<(), LoxError> {
        let tokens = Scanner::new(source).scan_tokens()?;
        let statements = Parser::new(tokens).parse()?;
        self.interpreter.interpret(&statements)?;
        Ok(())
    }
}

static TRACING_INIT: Once = Once::new();

/// Installs a subscriber only when `RUST_LOG` is set, so program output is
/// left alone otherwise.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if env::var("RUST_LOG").is_ok() {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr).with_target(true))
                .with(EnvFilter::from_default_env())
                .init();
        }
    });
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Clone, Default)]
    struct Captured(Rc<RefCell<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8(self.0.borrow().clone()).unwrap()
        }
    }

    fn lox() -> (Lox, Captured) {
        let output = Captured::default();
        let lox = Lox::with_interpreter(Interpreter::with_output(Box::new(output.clone())));
        (lox, output)
    }

    #[test]
    fn state_persists_between_runs() {
        let (mut lox, output) = lox();
        lox.run("var a = 1;").unwrap();
        lox.run("a = a + 1;").unwrap();
        lox.run("print a;").unwrap();
        assert_eq!(output.text(), "2\n");
    }

    #[test]
    fn session_survives_errors() {
        let (mut lox, output) = lox();
        lox.run("var a = 1;").unwrap();
        assert!(matches!(lox.run("print b;"), Err(LoxError::Runtime(_))));
        assert!(matches!(lox.run("print a"), Err(LoxError::Parse(_))));
        lox.run("print a;").unwrap();
        assert_eq!(output.text(), "1\n");
    }

    #[test]
    fn static_errors_prevent_execution() {
        let (mut lox, output) = lox();
        let error = lox.run("print 1; print 2 print 3;").unwrap_err();
        assert_eq!(error.exit_code(), EXIT_DATA_ERROR);
        assert_eq!(output.text(), "");

        let error = lox.run("print 1; $").unwrap_err();
        assert!(matches!(error, LoxError::Scan(_)));
        assert_eq!(output.text(), "");
    }

    #[test]
    fn runtime_errors_keep_earlier_output() {
        let (mut lox, output) = lox();
        let error = lox.run("print 1; print -\"x\"; print 2;").unwrap_err();
        assert_eq!(error.exit_code(), EXIT_SOFTWARE);
        assert_eq!(output.text(), "1\n");
    }

    #[test]
    fn prompt_skips_lines_that_are_not_utf8() {
        let (mut lox, output) = lox();
        let input = io::Cursor::new(b"var a = 1;\n\xff\xfe\nprint a;\n".to_vec());
        let mut prompt = Vec::new();

        lox.repl(input, &mut prompt).unwrap();

        assert_eq!(output.text(), "1\n");
        assert_eq!(String::from_utf8(prompt).unwrap(), "> > > > ");
    }

    #[test]
    fn missing_file() {
        let (mut lox, _) = lox();
        assert_eq!(lox.run_file("does/not/exist.lox"), EXIT_NO_INPUT);
    }
}
