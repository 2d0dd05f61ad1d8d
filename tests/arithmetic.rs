use std::{cell::RefCell, io, io::Write, rc::Rc};

use proptest::prelude::*;
use tree_lox::{value::format_number, Interpreter, Lox};

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

#[derive(Clone, Debug)]
enum Arith {
    Literal(String),
    /// Index into the variables declared so far, taken modulo their count.
    Variable(usize),
    Negate(Box<Arith>),
    Binary(Box<Arith>, char, Box<Arith>),
}

#[derive(Clone, Debug)]
enum Statement {
    Declare(Arith),
    Assign(usize, Arith),
    Print(Arith),
}

fn arith() -> impl Strategy<Value = Arith> {
    let leaf = prop_oneof![
        (0u32..1000, proptest::option::of(0u32..100)).prop_map(|(whole, fraction)| {
            Arith::Literal(match fraction {
                Some(fraction) => format!("{}.{}", whole, fraction),
                None => whole.to_string(),
            })
        }),
        any::<usize>().prop_map(Arith::Variable),
    ];

    leaf.prop_recursive(4, 32, 2, |inner| {
        prop_oneof![
            inner.clone().prop_map(|operand| Arith::Negate(Box::new(operand))),
            (
                inner.clone(),
                prop::sample::select(vec!['+', '-', '*', '/']),
                inner
            )
                .prop_map(|(left, operator, right)| {
                    Arith::Binary(Box::new(left), operator, Box::new(right))
                }),
        ]
    })
}

fn statement() -> impl Strategy<Value = Statement> {
    prop_oneof![
        arith().prop_map(Statement::Declare),
        (any::<usize>(), arith()).prop_map(|(index, value)| Statement::Assign(index, value)),
        arith().prop_map(Statement::Print),
    ]
}

/// Renders `expr` as Lox source and evaluates it directly in `f64`.
fn render(expr: &Arith, variables: &[f64]) -> (String, f64) {
    match expr {
        Arith::Literal(text) => (text.clone(), text.parse().unwrap()),
        Arith::Variable(_) if variables.is_empty() => ("0".to_string(), 0.0),
        Arith::Variable(index) => {
            let index = index % variables.len();
            (format!("v{}", index), variables[index])
        }
        Arith::Negate(operand) => {
            let (source, value) = render(operand, variables);
            (format!("-({})", source), -value)
        }
        Arith::Binary(left, operator, right) => {
            let (left_source, left) = render(left, variables);
            let (right_source, right) = render(right, variables);
            let value = match operator {
                '+' => left + right,
                '-' => left - right,
                '*' => left * right,
                _ => left / right,
            };
            (
                format!("({} {} {})", left_source, operator, right_source),
                value,
            )
        }
    }
}

/// Builds the program text and the lines it is expected to print.
fn compile(statements: &[Statement]) -> (String, Vec<String>) {
    let mut variables = Vec::new();
    let mut source = String::new();
    let mut expected = Vec::new();

    for statement in statements {
        match statement {
            Statement::Declare(expr) => {
                let (text, value) = render(expr, &variables);
                source.push_str(&format!("var v{} = {};\n", variables.len(), text));
                variables.push(value);
            }
            Statement::Assign(_, _) if variables.is_empty() => {}
            Statement::Assign(index, expr) => {
                let (text, value) = render(expr, &variables);
                let index = index % variables.len();
                source.push_str(&format!("v{} = {};\n", index, text));
                variables[index] = value;
            }
            Statement::Print(expr) => {
                let (text, value) = render(expr, &variables);
                source.push_str(&format!("print {};\n", text));
                expected.push(format_number(value));
            }
        }
    }

    (source, expected)
}

proptest! {
    #[test]
    fn arithmetic_programs_print_direct_f64_results(
        statements in prop::collection::vec(statement(), 1..20)
    ) {
        let (source, expected) = compile(&statements);

        let output = Captured::default();
        let mut lox = Lox::with_interpreter(Interpreter::with_output(Box::new(output.clone())));
        prop_assert!(lox.run(&source).is_ok(), "failed to run:\n{}", source);

        let text = String::from_utf8(output.0.borrow().clone()).unwrap();
        let printed: Vec<String> = text.lines().map(str::to_string).collect();
        prop_assert_eq!(printed, expected);
    }
}
