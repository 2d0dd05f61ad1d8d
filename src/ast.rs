use std::rc::Rc;

use crate::token::{LiteralValue, Token};

pub enum Stmt {
    Expression(Box<ExpressionStmt>),
    Print(Box<PrintStmt>),
    Var(Box<VarStmt>),
    Block(Box<BlockStmt>),
    If(Box<IfStmt>),
    While(Box<WhileStmt>),
    Function(Rc<FunctionStmt>),
    Return(Box<ReturnStmt>),
    Class(Box<ClassStmt>),
}

pub trait StmtVisitor<T> {
    fn visit_expression_stmt(&mut self, stmt: &ExpressionStmt) -> T;
    fn visit_print_stmt(&mut self, stmt: &PrintStmt) -> T;
    fn visit_var_stmt(&mut self, stmt: &VarStmt) -> T;
    fn visit_block_stmt(&mut self, stmt: &BlockStmt) -> T;
    fn visit_if_stmt(&mut self, stmt: &IfStmt) -> T;
    fn visit_while_stmt(&mut self, stmt: &WhileStmt) -> T;
    fn visit_function_stmt(&mut self, stmt: &Rc<FunctionStmt>) -> T;
    fn visit_return_stmt(&mut self, stmt: &ReturnStmt) -> T;
    fn visit_class_stmt(&mut self, stmt: &ClassStmt) -> T;
}

impl Stmt {
    pub fn accept<T, V: StmtVisitor<T>>(&self, visitor: &mut V) -> T {
        use Stmt::*;
        match self {
            Expression(stmt) => visitor.visit_expression_stmt(stmt),
            Print(stmt) => visitor.visit_print_stmt(stmt),
            Var(stmt) => visitor.visit_var_stmt(stmt),
            Block(stmt) => visitor.visit_block_stmt(stmt),
            If(stmt) => visitor.visit_if_stmt(stmt),
            While(stmt) => visitor.visit_while_stmt(stmt),
            Function(stmt) => visitor.visit_function_stmt(stmt),
            Return(stmt) => visitor.visit_return_stmt(stmt),
            Class(stmt) => visitor.visit_class_stmt(stmt),
        }
    }
}

pub struct ExpressionStmt {
    pub expression: Expr,
}

pub struct PrintStmt {
    pub expression: Expr,
}

pub struct VarStmt {
    pub name: Token,
    pub initializer: Option<Expr>,
}

pub struct BlockStmt {
    pub statements: Vec<Stmt>,
}

pub struct IfStmt {
    pub condition: Expr,
    pub then_statement: Stmt,
    pub else_statement: Option<Stmt>,
}

pub struct WhileStmt {
    pub condition: Expr,
    pub body: Stmt,
}

/// Shared between the statement tree and every function value created from it.
pub struct FunctionStmt {
    pub name: Token,
    pub parameters: Vec<Token>,
    pub body: Vec<Stmt>,
}

pub struct ReturnStmt {
    pub keyword: Token,
    pub value: Option<Expr>,
}

pub struct ClassStmt {
    pub name: Token,
    pub superclass: Option<VariableExpr>,
    pub methods: Vec<Rc<FunctionStmt>>,
}

pub enum Expr {
    Literal(Box<LiteralExpr>),
    Grouping(Box<GroupingExpr>),
    Unary(Box<UnaryExpr>),
    Binary(Box<BinaryExpr>),
    Logical(Box<LogicalExpr>),
    Variable(Box<VariableExpr>),
    Assign(Box<AssignExpr>),
    Call(Box<CallExpr>),
    Get(Box<GetExpr>),
    Set(Box<SetExpr>),
    This(Box<ThisExpr>),
    Super(Box<SuperExpr>),
}

pub trait ExprVisitor<T> {
    fn visit_literal_expr(&mut self, expr: &LiteralExpr) -> T;
    fn visit_grouping_expr(&mut self, expr: &GroupingExpr) -> T;
    fn visit_unary_expr(&mut self, expr: &UnaryExpr) -> T;
    fn visit_binary_expr(&mut self, expr: &BinaryExpr) -> T;
    fn visit_logical_expr(&mut self, expr: &LogicalExpr) -> T;
    fn visit_variable_expr(&mut self, expr: &VariableExpr) -> T;
    fn visit_assign_expr(&mut self, expr: &AssignExpr) -> T;
    fn visit_call_expr(&mut self, expr: &CallExpr) -> T;
    fn visit_get_expr(&mut self, expr: &GetExpr) -> T;
    fn visit_set_expr(&mut self, expr: &SetExpr) -> T;
    fn visit_this_expr(&mut self, expr: &ThisExpr) -> T;
    fn visit_super_expr(&mut self, expr: &SuperExpr) -> T;
}

impl Expr {
    pub fn accept<T, V: ExprVisitor<T>>(&self, visitor: &mut V) -> T {
        use Expr::*;
        match self {
            Literal(expr) => visitor.visit_literal_expr(expr),
            Grouping(expr) => visitor.visit_grouping_expr(expr),
            Unary(expr) => visitor.visit_unary_expr(expr),
            Binary(expr) => visitor.visit_binary_expr(expr),
            Logical(expr) => visitor.visit_logical_expr(expr),
            Variable(expr) => visitor.visit_variable_expr(expr),
            Assign(expr) => visitor.visit_assign_expr(expr),
            Call(expr) => visitor.visit_call_expr(expr),
            Get(expr) => visitor.visit_get_expr(expr),
            Set(expr) => visitor.visit_set_expr(expr),
            This(expr) => visitor.visit_this_expr(expr),
            Super(expr) => visitor.visit_super_expr(expr),
        }
    }
}

pub struct LiteralExpr {
    pub value: LiteralValue,
}

pub struct GroupingExpr {
    pub expression: Expr,
}

pub struct UnaryExpr {
    pub operator: Token,
    pub expression: Expr,
}

pub struct BinaryExpr {
    pub left: Expr,
    pub operator: Token,
    pub right: Expr,
}

/// Short-circuiting `and` / `or`.
pub struct LogicalExpr {
    pub left: Expr,
    pub operator: Token,
    pub right: Expr,
}

pub struct VariableExpr {
    pub name: Token,
}

pub struct AssignExpr {
    pub name: Token,
    pub value: Expr,
}

pub struct CallExpr {
    pub callee: Expr,
    pub paren: Token,
    pub arguments: Vec<Expr>,
}

pub struct GetExpr {
    pub object: Expr,
    pub name: Token,
}

pub struct SetExpr {
    pub object: Expr,
    pub name: Token,
    pub value: Expr,
}

pub struct ThisExpr {
    pub keyword: Token,
}

pub struct SuperExpr {
    pub keyword: Token,
    pub method: Token,
}
