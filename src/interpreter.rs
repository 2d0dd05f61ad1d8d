use std::{
    io::{self, Write},
    mem,
    rc::Rc,
};

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::{
    ast::{
        AssignExpr, BinaryExpr, BlockStmt, CallExpr, ClassStmt, Expr, ExprVisitor,
        ExpressionStmt, FunctionStmt, GetExpr, GroupingExpr, IfStmt, LiteralExpr, LogicalExpr,
        PrintStmt, ReturnStmt, SetExpr, Stmt, StmtVisitor, SuperExpr, ThisExpr, UnaryExpr,
        VarStmt, VariableExpr, WhileStmt,
    },
    callable::{LoxCallable, LoxClass, LoxFunction},
    environment::{Environment, SharedEnvironment},
    token::{Token, TokenType},
    value::{format_number, RuntimeValue},
};

pub struct Interpreter {
    environment: SharedEnvironment,
    output: Box<dyn Write>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// An interpreter that prints to standard output.
    pub fn new() -> Interpreter {
        Self::with_output(Box::new(io::stdout()))
    }

    pub fn with_output(output: Box<dyn Write>) -> Interpreter {
        Interpreter {
            environment: Environment::new().into_shared(),
            output,
        }
    }

    /// Runs `statements` in order against the global scope. Globals persist
    /// between calls, so a REPL can feed one line at a time.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<(), RuntimeError> {
        for statement in statements {
            match self.execute(statement) {
                Ok(()) => {}
                // A top-level return ends the program quietly.
                Err(EarlyReturn::Return(_)) => break,
                Err(EarlyReturn::Error(error)) => return Err(error),
            }
        }

        self.output.flush()?;
        Ok(())
    }

    pub fn evaluate_expression(&mut self, expr: &Expr) -> Result<RuntimeValue, RuntimeError> {
        match self.evaluate(expr) {
            Ok(value) | Err(EarlyReturn::Return(value)) => Ok(value),
            Err(EarlyReturn::Error(error)) => Err(error),
        }
    }

    fn execute(&mut self, stmt: &Stmt) -> Result<(), EarlyReturn> {
        stmt.accept(self)
    }

    /// Runs `statements` with `environment` as the current scope. The previous
    /// scope is restored on every exit path.
    pub(crate) fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: SharedEnvironment,
    ) -> Result<(), EarlyReturn> {
        let previous = mem::replace(&mut self.environment, environment);

        let result = statements
            .iter()
            .try_for_each(|statement| self.execute(statement));

        self.environment = previous;

        result
    }

    fn evaluate(&mut self, expr: &Expr) -> Result<RuntimeValue, EarlyReturn> {
        expr.accept(self)
    }

    fn evaluate_optional(&mut self, expr: &Option<Expr>) -> Result<RuntimeValue, EarlyReturn> {
        match expr {
            None => Ok(RuntimeValue::Nil),
            Some(expr) => self.evaluate(expr),
        }
    }

    fn define(&mut self, name: &Token, value: RuntimeValue) -> Result<(), EarlyReturn> {
        Ok(self.environment.borrow_mut().define(name, value)?)
    }

    fn look_up(&self, name: &Token) -> Result<RuntimeValue, EarlyReturn> {
        Ok(self.environment.borrow().get(name)?)
    }

    fn superclass(&mut self, stmt: &ClassStmt) -> Result<Option<Rc<LoxClass>>, EarlyReturn> {
        let Some(superclass) = &stmt.superclass else {
            return Ok(None);
        };

        match self.visit_variable_expr(superclass)? {
            RuntimeValue::Class(class) => Ok(Some(class)),
            _ => Err(RuntimeError::SuperClassMustBeAClass {
                name: superclass.name.lexeme.clone(),
                line: superclass.name.line,
            }
            .into()),
        }
    }
}

impl StmtVisitor<Result<(), EarlyReturn>> for Interpreter {
    fn visit_expression_stmt(&mut self, stmt: &ExpressionStmt) -> Result<(), EarlyReturn> {
        self.evaluate(&stmt.expression).map(|_| ())
    }

    fn visit_print_stmt(&mut self, stmt: &PrintStmt) -> Result<(), EarlyReturn> {
        let value = self.evaluate(&stmt.expression)?;
        writeln!(self.output, "{}", value).map_err(RuntimeError::from)?;
        Ok(())
    }

    fn visit_var_stmt(&mut self, stmt: &VarStmt) -> Result<(), EarlyReturn> {
        let value = match &stmt.initializer {
            Some(initializer) => self.evaluate(initializer)?,
            None => RuntimeValue::Uninitialized,
        };
        self.define(&stmt.name, value)
    }

    fn visit_block_stmt(&mut self, stmt: &BlockStmt) -> Result<(), EarlyReturn> {
        let environment = Environment::new_enclosed(self.environment.clone());
        self.execute_block(&stmt.statements, environment.into_shared())
    }

    fn visit_if_stmt(&mut self, stmt: &IfStmt) -> Result<(), EarlyReturn> {
        if self.evaluate(&stmt.condition)?.is_truthy() {
            self.execute(&stmt.then_statement)
        } else if let Some(else_statement) = &stmt.else_statement {
            self.execute(else_statement)
        } else {
            Ok(())
        }
    }

    fn visit_while_stmt(&mut self, stmt: &WhileStmt) -> Result<(), EarlyReturn> {
        while self.evaluate(&stmt.condition)?.is_truthy() {
            self.execute(&stmt.body)?;
        }
        Ok(())
    }

    fn visit_function_stmt(&mut self, stmt: &Rc<FunctionStmt>) -> Result<(), EarlyReturn> {
        let function = LoxFunction::new(stmt.clone(), self.environment.clone(), false);
        self.define(&stmt.name, RuntimeValue::Function(Rc::new(function)))
    }

    fn visit_return_stmt(&mut self, stmt: &ReturnStmt) -> Result<(), EarlyReturn> {
        let value = self.evaluate_optional(&stmt.value)?;
        Err(EarlyReturn::Return(value))
    }

    fn visit_class_stmt(&mut self, stmt: &ClassStmt) -> Result<(), EarlyReturn> {
        let superclass = self.superclass(stmt)?;

        // Declared before the methods exist so they can refer to the class by name.
        self.define(&stmt.name, RuntimeValue::Uninitialized)?;

        let method_environment = match &superclass {
            Some(superclass) => {
                let mut environment = Environment::new_enclosed(self.environment.clone());
                let keyword = Token::synthetic(TokenType::Super, "super", stmt.name.line);
                environment.define(&keyword, RuntimeValue::Class(superclass.clone()))?;
                environment.into_shared()
            }
            None => self.environment.clone(),
        };

        let methods: FxHashMap<String, Rc<LoxFunction>> = stmt
            .methods
            .iter()
            .map(|method| {
                let is_initializer = method.name.lexeme == "init";
                let function =
                    LoxFunction::new(method.clone(), method_environment.clone(), is_initializer);
                (method.name.lexeme.clone(), Rc::new(function))
            })
            .collect();

        tracing::debug!(
            class = %stmt.name.lexeme,
            superclass = superclass.as_ref().map(|class| class.name()),
            methods = methods.len(),
            "declared class"
        );

        let class = LoxClass::new(stmt.name.lexeme.clone(), superclass, methods);
        self.environment
            .borrow_mut()
            .assign(&stmt.name, RuntimeValue::Class(Rc::new(class)))?;

        Ok(())
    }
}

impl ExprVisitor<Result<RuntimeValue, EarlyReturn>> for Interpreter {
    fn visit_literal_expr(&mut self, expr: &LiteralExpr) -> Result<RuntimeValue, EarlyReturn> {
        Ok(RuntimeValue::from(&expr.value))
    }

    fn visit_grouping_expr(&mut self, expr: &GroupingExpr) -> Result<RuntimeValue, EarlyReturn> {
        self.evaluate(&expr.expression)
    }

    fn visit_unary_expr(&mut self, expr: &UnaryExpr) -> Result<RuntimeValue, EarlyReturn> {
        let operand = self.evaluate(&expr.expression)?;
        Ok(match expr.operator.token_type {
            TokenType::Bang => RuntimeValue::Bool(!operand.is_truthy()),
            TokenType::Minus => {
                let operand = check_numeric_operand(&expr.operator, &operand)?;
                RuntimeValue::Number(-operand)
            }
            _ => unreachable!("parser only builds unary '!' and '-'"),
        })
    }

    fn visit_binary_expr(&mut self, expr: &BinaryExpr) -> Result<RuntimeValue, EarlyReturn> {
        let left = self.evaluate(&expr.left)?;
        let right = self.evaluate(&expr.right)?;
        let operator = &expr.operator;

        Ok(match operator.token_type {
            TokenType::Plus => add(operator, left, right)?,
            TokenType::Minus => {
                let (left, right) = check_numeric_operands(operator, &left, &right)?;
                RuntimeValue::Number(left - right)
            }
            TokenType::Slash => {
                let (left, right) = check_numeric_operands(operator, &left, &right)?;
                RuntimeValue::Number(left / right)
            }
            TokenType::Star => {
                let (left, right) = check_numeric_operands(operator, &left, &right)?;
                RuntimeValue::Number(left * right)
            }
            TokenType::EqualEqual => RuntimeValue::Bool(left == right),
            TokenType::BangEqual => RuntimeValue::Bool(left != right),
            TokenType::Less => {
                let (left, right) = check_numeric_operands(operator, &left, &right)?;
                RuntimeValue::Bool(left < right)
            }
            TokenType::LessEqual => {
                let (left, right) = check_numeric_operands(operator, &left, &right)?;
                RuntimeValue::Bool(left <= right)
            }
            TokenType::Greater => {
                let (left, right) = check_numeric_operands(operator, &left, &right)?;
                RuntimeValue::Bool(left > right)
            }
            TokenType::GreaterEqual => {
                let (left, right) = check_numeric_operands(operator, &left, &right)?;
                RuntimeValue::Bool(left >= right)
            }
            _ => unreachable!("parser only builds binary arithmetic and comparison operators"),
        })
    }

    fn visit_logical_expr(&mut self, expr: &LogicalExpr) -> Result<RuntimeValue, EarlyReturn> {
        let left = self.evaluate(&expr.left)?;

        let decided = match expr.operator.token_type {
            TokenType::Or => left.is_truthy(),
            _ => !left.is_truthy(),
        };

        if decided {
            Ok(left)
        } else {
            self.evaluate(&expr.right)
        }
    }

    fn visit_variable_expr(&mut self, expr: &VariableExpr) -> Result<RuntimeValue, EarlyReturn> {
        self.look_up(&expr.name)
    }

    fn visit_assign_expr(&mut self, expr: &AssignExpr) -> Result<RuntimeValue, EarlyReturn> {
        let value = self.evaluate(&expr.value)?;
        self.environment
            .borrow_mut()
            .assign(&expr.name, value.clone())?;
        Ok(value)
    }

    fn visit_call_expr(&mut self, expr: &CallExpr) -> Result<RuntimeValue, EarlyReturn> {
        let callee = self.evaluate(&expr.callee)?;

        let mut arguments = Vec::with_capacity(expr.arguments.len());
        for argument in &expr.arguments {
            arguments.push(self.evaluate(argument)?);
        }

        let callable: &dyn LoxCallable = match &callee {
            RuntimeValue::Function(function) => function,
            RuntimeValue::Class(class) => class,
            _ => {
                return Err(RuntimeError::FunctionCallIsNotSupportedHere {
                    line: expr.paren.line,
                }
                .into());
            }
        };

        if arguments.len() != callable.arity() {
            return Err(RuntimeError::UnmatchedFunctionArguments {
                expected: callable.arity(),
                got: arguments.len(),
                line: expr.paren.line,
            }
            .into());
        }

        Ok(callable.call(self, arguments)?)
    }

    fn visit_get_expr(&mut self, expr: &GetExpr) -> Result<RuntimeValue, EarlyReturn> {
        match self.evaluate(&expr.object)? {
            RuntimeValue::Instance(instance) => Ok(instance.get(&expr.name)?),
            _ => Err(RuntimeError::OnlyInstancesCanHaveProperty {
                name: expr.name.lexeme.clone(),
                line: expr.name.line,
            }
            .into()),
        }
    }

    fn visit_set_expr(&mut self, expr: &SetExpr) -> Result<RuntimeValue, EarlyReturn> {
        let RuntimeValue::Instance(instance) = self.evaluate(&expr.object)? else {
            return Err(RuntimeError::OnlyInstancesCanHaveFields {
                name: expr.name.lexeme.clone(),
                line: expr.name.line,
            }
            .into());
        };

        let value = self.evaluate(&expr.value)?;
        instance.set(&expr.name, value.clone());
        Ok(value)
    }

    fn visit_this_expr(&mut self, expr: &ThisExpr) -> Result<RuntimeValue, EarlyReturn> {
        self.look_up(&expr.keyword)
    }

    fn visit_super_expr(&mut self, expr: &SuperExpr) -> Result<RuntimeValue, EarlyReturn> {
        let RuntimeValue::Class(superclass) = self.look_up(&expr.keyword)? else {
            return Err(RuntimeError::UndefinedVariable {
                name: expr.keyword.lexeme.clone(),
                line: expr.keyword.line,
            }
            .into());
        };

        let this = Token::synthetic(TokenType::This, "this", expr.keyword.line);
        let RuntimeValue::Instance(instance) = self.look_up(&this)? else {
            return Err(RuntimeError::UndefinedVariable {
                name: this.lexeme,
                line: this.line,
            }
            .into());
        };

        match superclass.find_method(&expr.method.lexeme) {
            Some(method) => Ok(RuntimeValue::Function(Rc::new(method.bind(instance)?))),
            None => Err(RuntimeError::UndefinedProperty {
                name: expr.method.lexeme.clone(),
                line: expr.method.line,
            }
            .into()),
        }
    }
}

/// Non-local exits out of statement execution: a `return` travelling to its
/// call boundary, or a runtime error travelling to the top.
#[derive(Debug)]
pub enum EarlyReturn {
    Return(RuntimeValue),
    Error(RuntimeError),
}

impl From<RuntimeError> for EarlyReturn {
    fn from(error: RuntimeError) -> Self {
        EarlyReturn::Error(error)
    }
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Undefined variable '{name}'. [line {line}]")]
    UndefinedVariable { name: String, line: usize },
    #[error("Variable '{name}' is already defined in this scope. [line {line}]")]
    DuplicateVariableName { name: String, line: usize },
    #[error("Operands of '{operator}' must be numbers. [line {line}]")]
    OperandMustBeANumber { operator: String, line: usize },
    #[error("Operands of '{operator}' must be numbers or strings. [line {line}]")]
    OperandMustBeANumberOrString { operator: String, line: usize },
    #[error("Expected {expected} arguments but got {got}. [line {line}]")]
    UnmatchedFunctionArguments {
        expected: usize,
        got: usize,
        line: usize,
    },
    #[error("Can only call functions and classes. [line {line}]")]
    FunctionCallIsNotSupportedHere { line: usize },
    #[error("Only instances have properties, cannot read '{name}'. [line {line}]")]
    OnlyInstancesCanHaveProperty { name: String, line: usize },
    #[error("Only instances have fields, cannot set '{name}'. [line {line}]")]
    OnlyInstancesCanHaveFields { name: String, line: usize },
    #[error("Undefined property '{name}'. [line {line}]")]
    UndefinedProperty { name: String, line: usize },
    #[error("Superclass '{name}' must be a class. [line {line}]")]
    SuperClassMustBeAClass { name: String, line: usize },
    #[error("Failed to write output: {0}")]
    Output(#[from] io::Error),
}

impl RuntimeError {
    pub fn line(&self) -> Option<usize> {
        use RuntimeError::*;
        match self {
            UndefinedVariable { line, .. }
            | DuplicateVariableName { line, .. }
            | OperandMustBeANumber { line, .. }
            | OperandMustBeANumberOrString { line, .. }
            | UnmatchedFunctionArguments { line, .. }
            | FunctionCallIsNotSupportedHere { line }
            | OnlyInstancesCanHaveProperty { line, .. }
            | OnlyInstancesCanHaveFields { line, .. }
            | UndefinedProperty { line, .. }
            | SuperClassMustBeAClass { line, .. } => Some(*line),
            Output(_) => None,
        }
    }
}

/// `+` adds numbers and concatenates strings; a number next to a string is
/// stringified and concatenated.
fn add(
    operator: &Token,
    left: RuntimeValue,
    right: RuntimeValue,
) -> Result<RuntimeValue, RuntimeError> {
    use RuntimeValue::{Number, String};
    match (left, right) {
        (Number(left), Number(right)) => Ok(Number(left + right)),
        (String(left), String(right)) => Ok(RuntimeValue::string(format!("{}{}", left, right))),
        (Number(left), String(right)) => Ok(RuntimeValue::string(format!(
            "{}{}",
            format_number(left),
            right
        ))),
        (String(left), Number(right)) => Ok(RuntimeValue::string(format!(
            "{}{}",
            left,
            format_number(right)
        ))),
        _ => Err(RuntimeError::OperandMustBeANumberOrString {
            operator: operator.lexeme.clone(),
            line: operator.line,
        }),
    }
}

fn check_numeric_operand(operator: &Token, operand: &RuntimeValue) -> Result<f64, RuntimeError> {
    if let RuntimeValue::Number(value) = *operand {
        return Ok(value);
    }

    Err(RuntimeError::OperandMustBeANumber {
        operator: operator.lexeme.clone(),
        line: operator.line,
    })
}

fn check_numeric_operands(
    operator: &Token,
    left_operand: &RuntimeValue,
    right_operand: &RuntimeValue,
) -> Result<(f64, f64), RuntimeError> {
    if let (RuntimeValue::Number(left), RuntimeValue::Number(right)) = (left_operand, right_operand)
    {
        return Ok((*left, *right));
    }

    Err(RuntimeError::OperandMustBeANumber {
        operator: operator.lexeme.clone(),
        line: operator.line,
    })
}
