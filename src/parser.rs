use std::rc::Rc;

use thiserror::Error;

use crate::{
    ast::{
        AssignExpr, BinaryExpr, BlockStmt, CallExpr, ClassStmt, Expr, ExpressionStmt,
        FunctionStmt, GetExpr, GroupingExpr, IfStmt, LiteralExpr, LogicalExpr, PrintStmt,
        ReturnStmt, SetExpr, Stmt, SuperExpr, ThisExpr, UnaryExpr, VarStmt, VariableExpr,
        WhileStmt,
    },
    token::{LiteralValue, Token, TokenType},
};

/// Upper bound on call arguments and function parameters.
pub const MAX_ARGUMENTS: usize = 255;

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Parser {
        Parser { tokens, current: 0 }
    }

    /// Parses a whole program. The first error aborts parsing.
    pub fn parse(mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut statements = Vec::new();

        while !self.is_at_end() {
            statements.push(self.declaration()?);
        }

        tracing::debug!(statements = statements.len(), "parsed program");
        Ok(statements)
    }

    /// Parses a single bare expression that must span the whole input.
    pub fn parse_expression(mut self) -> Result<Expr, ParseError> {
        let expression = self.expression()?;

        if !self.is_at_end() {
            return self.error(
                ParseErrorKind::UnknownExpression,
                self.peek().clone(),
                "Expect end of expression.",
            );
        }

        Ok(expression)
    }

    fn declaration(&mut self) -> Result<Stmt, ParseError> {
        if self.match_token(TokenType::Class) {
            self.class_declaration()
        } else if self.match_token(TokenType::Fun) {
            Ok(Stmt::Function(self.function_declaration("function")?))
        } else if self.match_token(TokenType::Var) {
            self.var_declaration()
        } else {
            self.statement()
        }
    }

    fn class_declaration(&mut self) -> Result<Stmt, ParseError> {
        let name = self.consume(TokenType::Identifier, "Expect class name.")?;

        let superclass = if self.match_token(TokenType::Less) {
            let name = self.consume(TokenType::Identifier, "Expect superclass name.")?;
            Some(VariableExpr { name })
        } else {
            None
        };

        self.consume(TokenType::LeftBrace, "Expect '{' before class body.")?;

        let mut methods = vec![];
        while !self.check(TokenType::RightBrace) && !self.is_at_end() {
            methods.push(self.function_declaration("method")?);
        }

        self.consume(TokenType::RightBrace, "Expect '}' after class body.")?;

        Ok(Stmt::Class(Box::new(ClassStmt {
            name,
            superclass,
            methods,
        })))
    }

    fn function_declaration(&mut self, kind: &str) -> Result<Rc<FunctionStmt>, ParseError> {
        let name = self.consume(TokenType::Identifier, &format!("Expect {} name.", kind))?;

        self.consume(
            TokenType::LeftParen,
            &format!("Expect '(' after {} name.", kind),
        )?;

        let mut parameters = vec![];

        if !self.check(TokenType::RightParen) {
            loop {
                if parameters.len() >= MAX_ARGUMENTS {
                    return self.error(
                        ParseErrorKind::TooManyParameters,
                        self.peek().clone(),
                        "Can't have more than 255 parameters.",
                    );
                }

                parameters.push(self.consume(TokenType::Identifier, "Expect parameter name.")?);

                if !self.match_token(TokenType::Comma) {
                    break;
                }
            }
        }

        self.consume(TokenType::RightParen, "Expect ')' after parameters.")?;

        self.consume(
            TokenType::LeftBrace,
            &format!("Expect '{{' before {} body.", kind),
        )?;

        let body = self.block()?;

        Ok(Rc::new(FunctionStmt {
            name,
            parameters,
            body,
        }))
    }

    fn var_declaration(&mut self) -> Result<Stmt, ParseError> {
        let name = self.consume(TokenType::Identifier, "Expect variable name.")?;

        let initializer = match self.match_token(TokenType::Equal) {
            true => Some(self.expression()?),
            false => None,
        };

        self.consume(
            TokenType::Semicolon,
            "Expect ';' after variable declaration.",
        )?;

        Ok(Stmt::Var(Box::new(VarStmt { name, initializer })))
    }

    fn statement(&mut self) -> Result<Stmt, ParseError> {
        if self.match_token(TokenType::For) {
            self.for_stmt()
        } else if self.match_token(TokenType::If) {
            self.if_stmt()
        } else if self.match_token(TokenType::Print) {
            self.print_stmt()
        } else if self.match_token(TokenType::Return) {
            self.return_stmt()
        } else if self.match_token(TokenType::While) {
            self.while_stmt()
        } else if self.match_token(TokenType::LeftBrace) {
            Ok(Stmt::Block(Box::new(BlockStmt {
                statements: self.block()?,
            })))
        } else {
            self.expression_stmt()
        }
    }

    fn block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut statements = Vec::new();

        while !self.check(TokenType::RightBrace) && !self.is_at_end() {
            statements.push(self.declaration()?);
        }

        self.consume(TokenType::RightBrace, "Expect '}' after block.")?;

        Ok(statements)
    }

    fn print_stmt(&mut self) -> Result<Stmt, ParseError> {
        let expression = self.expression()?;

        self.consume(TokenType::Semicolon, "Expect ';' after value.")?;

        Ok(Stmt::Print(Box::new(PrintStmt { expression })))
    }

    fn if_stmt(&mut self) -> Result<Stmt, ParseError> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'if'.")?;

        let condition = self.expression()?;

        self.consume(TokenType::RightParen, "Expect ')' after if condition.")?;

        let then_statement = self.statement()?;

        let else_statement = match self.match_token(TokenType::Else) {
            true => Some(self.statement()?),
            false => None,
        };

        Ok(Stmt::If(Box::new(IfStmt {
            condition,
            then_statement,
            else_statement,
        })))
    }

    fn while_stmt(&mut self) -> Result<Stmt, ParseError> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'while'.")?;

        let condition = self.expression()?;

        self.consume(TokenType::RightParen, "Expect ')' after while condition.")?;

        let body = self.statement()?;

        Ok(Stmt::While(Box::new(WhileStmt { condition, body })))
    }

    /// `for` has no runtime form; it becomes a `while` inside a block.
    fn for_stmt(&mut self) -> Result<Stmt, ParseError> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'for'.")?;

        let initializer = if self.match_token(TokenType::Semicolon) {
            None
        } else if self.match_token(TokenType::Var) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_stmt()?)
        };

        let condition = if self.check(TokenType::Semicolon) {
            Expr::Literal(Box::new(LiteralExpr {
                value: LiteralValue::Bool(true),
            }))
        } else {
            self.expression()?
        };
        self.consume(TokenType::Semicolon, "Expect ';' after loop condition.")?;

        let increment = if self.check(TokenType::RightParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenType::RightParen, "Expect ')' after for clauses.")?;

        let mut body = self.statement()?;

        if let Some(expression) = increment {
            body = Stmt::Block(Box::new(BlockStmt {
                statements: vec![
                    body,
                    Stmt::Expression(Box::new(ExpressionStmt { expression })),
                ],
            }))
        };

        body = Stmt::While(Box::new(WhileStmt { condition, body }));

        if let Some(statement) = initializer {
            body = Stmt::Block(Box::new(BlockStmt {
                statements: vec![statement, body],
            }))
        }

        Ok(body)
    }

    fn return_stmt(&mut self) -> Result<Stmt, ParseError> {
        let keyword = self.previous();

        let value = if self.check(TokenType::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };

        self.consume(TokenType::Semicolon, "Expect ';' after return value.")?;

        Ok(Stmt::Return(Box::new(ReturnStmt { keyword, value })))
    }

    fn expression_stmt(&mut self) -> Result<Stmt, ParseError> {
        let expression = self.expression()?;

        self.consume(TokenType::Semicolon, "Expect ';' after expression.")?;

        Ok(Stmt::Expression(Box::new(ExpressionStmt { expression })))
    }

    fn expression(&mut self) -> Result<Expr, ParseError> {
        self.assign_expr()
    }

    fn assign_expr(&mut self) -> Result<Expr, ParseError> {
        let expr = self.or_expr()?;

        if !self.match_token(TokenType::Equal) {
            return Ok(expr);
        }

        let equals = self.previous();
        let value = self.assign_expr()?;

        match expr {
            Expr::Variable(variable) => Ok(Expr::Assign(Box::new(AssignExpr {
                name: variable.name,
                value,
            }))),
            Expr::Get(get) => {
                let GetExpr { object, name } = *get;
                Ok(Expr::Set(Box::new(SetExpr {
                    object,
                    name,
                    value,
                })))
            }
            _ => self.error(
                ParseErrorKind::InvalidAssignmentTarget,
                equals,
                "Invalid assignment target.",
            ),
        }
    }

    fn or_expr(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.and_expr()?;

        while self.match_token(TokenType::Or) {
            let operator = self.previous();
            let right = self.and_expr()?;
            expr = Expr::Logical(Box::new(LogicalExpr {
                left: expr,
                operator,
                right,
            }));
        }

        Ok(expr)
    }

    fn and_expr(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.equality_expr()?;

        while self.match_token(TokenType::And) {
            let operator = self.previous();
            let right = self.equality_expr()?;
            expr = Expr::Logical(Box::new(LogicalExpr {
                left: expr,
                operator,
                right,
            }));
        }

        Ok(expr)
    }

    fn equality_expr(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.comparison_expr()?;

        while self.match_any(&[TokenType::EqualEqual, TokenType::BangEqual]) {
            let operator = self.previous();
            let right = self.comparison_expr()?;
            expr = binary(expr, operator, right);
        }

        Ok(expr)
    }

    fn comparison_expr(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.sum_expr()?;

        while self.match_any(&[
            TokenType::Less,
            TokenType::LessEqual,
            TokenType::Greater,
            TokenType::GreaterEqual,
        ]) {
            let operator = self.previous();
            let right = self.sum_expr()?;
            expr = binary(expr, operator, right);
        }

        Ok(expr)
    }

    fn sum_expr(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.factor_expr()?;

        while self.match_any(&[TokenType::Plus, TokenType::Minus]) {
            let operator = self.previous();
            let right = self.factor_expr()?;
            expr = binary(expr, operator, right);
        }

        Ok(expr)
    }

    fn factor_expr(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.unary_expr()?;

        while self.match_any(&[TokenType::Slash, TokenType::Star]) {
            let operator = self.previous();
            let right = self.unary_expr()?;
            expr = binary(expr, operator, right);
        }

        Ok(expr)
    }

    fn unary_expr(&mut self) -> Result<Expr, ParseError> {
        if self.match_any(&[TokenType::Bang, TokenType::Minus]) {
            let operator = self.previous();
            let expression = self.unary_expr()?;
            Ok(Expr::Unary(Box::new(UnaryExpr {
                operator,
                expression,
            })))
        } else {
            self.call_expr()
        }
    }

    fn call_expr(&mut self) -> Result<Expr, ParseError> {
        let mut expression = self.primary_expr()?;

        loop {
            if self.match_token(TokenType::LeftParen) {
                expression = self.finish_call_expr(expression)?;
            } else if self.match_token(TokenType::Dot) {
                let name =
                    self.consume(TokenType::Identifier, "Expect property name after '.'.")?;
                expression = Expr::Get(Box::new(GetExpr {
                    object: expression,
                    name,
                }));
            } else {
                break;
            }
        }

        Ok(expression)
    }

    fn finish_call_expr(&mut self, callee: Expr) -> Result<Expr, ParseError> {
        let mut arguments = vec![];

        if !self.check(TokenType::RightParen) {
            loop {
                if arguments.len() >= MAX_ARGUMENTS {
                    return self.error(
                        ParseErrorKind::TooManyArguments,
                        self.peek().clone(),
                        "Can't have more than 255 arguments.",
                    );
                }

                arguments.push(self.expression()?);

                if !self.match_token(TokenType::Comma) {
                    break;
                }
            }
        }

        let paren = self.consume(TokenType::RightParen, "Expect ')' after arguments.")?;

        Ok(Expr::Call(Box::new(CallExpr {
            callee,
            paren,
            arguments,
        })))
    }

    fn primary_expr(&mut self) -> Result<Expr, ParseError> {
        if self.match_token(TokenType::False) {
            Ok(literal(LiteralValue::Bool(false)))
        } else if self.match_token(TokenType::True) {
            Ok(literal(LiteralValue::Bool(true)))
        } else if self.match_token(TokenType::Nil) {
            Ok(literal(LiteralValue::Nil))
        } else if self.match_any(&[TokenType::Number, TokenType::String]) {
            let value = self.previous().literal.unwrap_or(LiteralValue::Nil);
            Ok(literal(value))
        } else if self.match_token(TokenType::This) {
            Ok(Expr::This(Box::new(ThisExpr {
                keyword: self.previous(),
            })))
        } else if self.match_token(TokenType::Super) {
            let keyword = self.previous();
            self.consume(TokenType::Dot, "Expect '.' after 'super'.")?;
            let method = self.consume(TokenType::Identifier, "Expect superclass method name.")?;
            Ok(Expr::Super(Box::new(SuperExpr { keyword, method })))
        } else if self.match_token(TokenType::Identifier) {
            Ok(Expr::Variable(Box::new(VariableExpr {
                name: self.previous(),
            })))
        } else if self.match_token(TokenType::LeftParen) {
            let expression = self.expression()?;
            self.consume(TokenType::RightParen, "Expect ')' after expression.")?;
            Ok(Expr::Grouping(Box::new(GroupingExpr { expression })))
        } else {
            self.error(
                ParseErrorKind::UnknownExpression,
                self.peek().clone(),
                "Expect expression.",
            )
        }
    }

    fn is_at_end(&self) -> bool {
        self.peek().token_type == TokenType::Eof
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> Token {
        self.tokens[self.current - 1].clone()
    }

    fn advance(&mut self) {
        if !self.is_at_end() {
            self.current += 1;
        }
    }

    fn check(&self, token_type: TokenType) -> bool {
        self.peek().token_type == token_type
    }

    fn match_token(&mut self, token_type: TokenType) -> bool {
        if self.check(token_type) && !self.is_at_end() {
            self.advance();
            return true;
        }

        false
    }

    fn match_any(&mut self, token_types: &[TokenType]) -> bool {
        token_types
            .iter()
            .any(|token_type| self.match_token(*token_type))
    }

    fn consume(&mut self, token_type: TokenType, message: &str) -> Result<Token, ParseError> {
        let token = self.peek().clone();
        if token.token_type == token_type {
            self.advance();
            return Ok(token);
        }

        self.error(ParseErrorKind::missing(token_type), token, message)
    }

    fn error<T>(
        &self,
        kind: ParseErrorKind,
        token: Token,
        message: &str,
    ) -> Result<T, ParseError> {
        Err(ParseError {
            kind,
            token,
            message: message.to_string(),
        })
    }
}

fn literal(value: LiteralValue) -> Expr {
    Expr::Literal(Box::new(LiteralExpr { value }))
}

fn binary(left: Expr, operator: Token, right: Expr) -> Expr {
    Expr::Binary(Box::new(BinaryExpr {
        left,
        operator,
        right,
    }))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    UnknownExpression,
    InvalidAssignmentTarget,
    MissingClosingParenthesis,
    MissingSemicolon,
    MissingRightBrace,
    MissingLeftBrace,
    MissingLeftParenthesis,
    MissingVariableName,
    MissingDot,
    UnexpectedToken,
    TooManyArguments,
    TooManyParameters,
}

impl ParseErrorKind {
    fn missing(expected: TokenType) -> ParseErrorKind {
        match expected {
            TokenType::RightParen => ParseErrorKind::MissingClosingParenthesis,
            TokenType::Semicolon => ParseErrorKind::MissingSemicolon,
            TokenType::RightBrace => ParseErrorKind::MissingRightBrace,
            TokenType::LeftBrace => ParseErrorKind::MissingLeftBrace,
            TokenType::LeftParen => ParseErrorKind::MissingLeftParenthesis,
            TokenType::Identifier => ParseErrorKind::MissingVariableName,
            TokenType::Dot => ParseErrorKind::MissingDot,
            _ => ParseErrorKind::UnexpectedToken,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("[line {}] Error{}: {message}", .token.line, .token.location())]
pub struct ParseError {
    pub kind: ParseErrorKind,
    /// The token the parser was looking at when it gave up.
    pub token: Token,
    pub message: String,
}

impl ParseError {
    pub fn line(&self) -> usize {
        self.token.line
    }
}
