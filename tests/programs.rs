use std::{cell::RefCell, fs, io, io::Write, path::PathBuf, rc::Rc};

use pretty_assertions::assert_eq;
use tree_lox::{interpreter::RuntimeError, Interpreter, Lox, LoxError};

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

fn run_program(name: &str) -> (String, Result<(), LoxError>) {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/programs")
        .join(format!("{}.lox", name));
    let source = fs::read_to_string(&path).unwrap();

    let output = Captured::default();
    let mut lox = Lox::with_interpreter(Interpreter::with_output(Box::new(output.clone())));
    let result = lox.run(&source);

    let text = String::from_utf8(output.0.borrow().clone()).unwrap();
    (text, result)
}

fn assert_prints(name: &str, expected: &[&str]) {
    let (text, result) = run_program(name);
    result.unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines, expected);
}

#[test]
fn hello() {
    assert_prints("hello", &["Hello, world!"]);
}

#[test]
fn fibonacci() {
    assert_prints(
        "fibonacci",
        &[
            "0", "1", "1", "2", "3", "5", "8", "13", "21", "34", "55", "89", "144", "233", "377",
            "610", "987", "1597", "2584", "4181", "6765",
        ],
    );
}

#[test]
fn recursion() {
    assert_prints(
        "recursion",
        &["0", "1", "1", "2", "3", "5", "8", "13", "21", "34"],
    );
}

#[test]
fn counter() {
    assert_prints("counter", &["1", "2"]);
}

#[test]
fn classes() {
    assert_prints(
        "classes",
        &[
            "DevonshireCream",
            "Bagel instance",
            "Egotist instance",
            "Enjoy your ham and toast, Dear Reader.",
            "Enjoy your sausage and toast, again.",
        ],
    );
}

#[test]
fn inheritance() {
    assert_prints(
        "inheritance",
        &[
            "Fry until golden brown.",
            "Pipe full of custard and coat with chocolate.",
            "Fry until golden brown.",
        ],
    );
}

#[test]
fn arithmetic() {
    assert_prints(
        "arithmetic",
        &["7", "9", "2.5", "0.30000000000000004", "-5", "Infinity", "total: 12"],
    );
}

#[test]
fn bottles() {
    assert_prints(
        "bottles",
        &[
            "3 bottles of beer on the wall, 3 bottles of beer.",
            "Take one down and pass it around, 2 bottles of beer on the wall.",
            "2 bottles of beer on the wall, 2 bottles of beer.",
            "Take one down and pass it around, 1 bottle of beer on the wall.",
            "1 bottle of beer on the wall, 1 bottle of beer.",
            "Take one down and pass it around, no more bottles of beer on the wall.",
        ],
    );
}

#[test]
fn bad_superclass() {
    let (text, result) = run_program("bad_superclass");
    assert_eq!(text, "");
    match result {
        Err(LoxError::Runtime(RuntimeError::SuperClassMustBeAClass { name, line })) => {
            assert_eq!(name, "NotAClass");
            assert_eq!(line, 3);
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn every_program_is_deterministic() {
    for name in ["fibonacci", "classes", "arithmetic"] {
        assert_eq!(run_program(name).0, run_program(name).0);
    }
}
