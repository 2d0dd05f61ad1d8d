use std::{cell::RefCell, fmt, rc::Rc};

use rustc_hash::FxHashMap;

use crate::{
    ast::FunctionStmt,
    environment::{Environment, SharedEnvironment},
    interpreter::{EarlyReturn, Interpreter, RuntimeError},
    token::{Token, TokenType},
    value::RuntimeValue,
};

const INITIALIZER: &str = "init";

pub trait LoxCallable {
    fn arity(&self) -> usize;

    fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<RuntimeValue>,
    ) -> Result<RuntimeValue, RuntimeError>;
}

pub struct LoxFunction {
    declaration: Rc<FunctionStmt>,
    closure: SharedEnvironment,
    is_initializer: bool,
}

impl LoxFunction {
    pub fn new(
        declaration: Rc<FunctionStmt>,
        closure: SharedEnvironment,
        is_initializer: bool,
    ) -> LoxFunction {
        LoxFunction {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    /// Returns a copy of this function whose closure has `this` bound to `instance`.
    pub fn bind(&self, instance: Rc<LoxInstance>) -> Result<LoxFunction, RuntimeError> {
        let mut environment = Environment::new_enclosed(self.closure.clone());
        let this = Token::synthetic(TokenType::This, "this", self.declaration.name.line);
        environment.define(&this, RuntimeValue::Instance(instance))?;

        Ok(LoxFunction {
            declaration: self.declaration.clone(),
            closure: environment.into_shared(),
            is_initializer: self.is_initializer,
        })
    }

    fn bound_instance(&self) -> RuntimeValue {
        self.closure
            .borrow()
            .lookup("this")
            .unwrap_or(RuntimeValue::Nil)
    }
}

impl LoxCallable for Rc<LoxFunction> {
    fn arity(&self) -> usize {
        self.declaration.parameters.len()
    }

    #[tracing::instrument(level = "trace", skip_all, fields(function = %self.name()))]
    fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<RuntimeValue>,
    ) -> Result<RuntimeValue, RuntimeError> {
        let mut environment = Environment::new_enclosed(self.closure.clone());

        for (parameter, argument) in self.declaration.parameters.iter().zip(arguments) {
            environment.define(parameter, argument)?;
        }

        match interpreter.execute_block(&self.declaration.body, environment.into_shared()) {
            Ok(()) => {}
            Err(EarlyReturn::Return(value)) => {
                if !self.is_initializer {
                    return Ok(value);
                }
            }
            Err(EarlyReturn::Error(error)) => return Err(error),
        }

        if self.is_initializer {
            return Ok(self.bound_instance());
        }

        Ok(RuntimeValue::Nil)
    }
}

impl fmt::Display for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.name())
    }
}

pub struct LoxClass {
    name: String,
    superclass: Option<Rc<LoxClass>>,
    methods: FxHashMap<String, Rc<LoxFunction>>,
}

impl LoxClass {
    pub fn new(
        name: String,
        superclass: Option<Rc<LoxClass>>,
        methods: FxHashMap<String, Rc<LoxFunction>>,
    ) -> LoxClass {
        LoxClass {
            name,
            superclass,
            methods,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Looks in this class first, then walks up the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<Rc<LoxFunction>> {
        match self.methods.get(name) {
            Some(method) => Some(method.clone()),
            None => self
                .superclass
                .as_ref()
                .and_then(|superclass| superclass.find_method(name)),
        }
    }
}

impl LoxCallable for Rc<LoxClass> {
    fn arity(&self) -> usize {
        match self.find_method(INITIALIZER) {
            Some(initializer) => initializer.arity(),
            None => 0,
        }
    }

    fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<RuntimeValue>,
    ) -> Result<RuntimeValue, RuntimeError> {
        let instance = Rc::new(LoxInstance::new(self.clone()));

        if let Some(initializer) = self.find_method(INITIALIZER) {
            Rc::new(initializer.bind(instance.clone())?).call(interpreter, arguments)?;
        }

        Ok(RuntimeValue::Instance(instance))
    }
}

impl fmt::Display for LoxClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

pub struct LoxInstance {
    class: Rc<LoxClass>,
    fields: RefCell<FxHashMap<String, RuntimeValue>>,
}

impl LoxInstance {
    pub fn new(class: Rc<LoxClass>) -> LoxInstance {
        LoxInstance {
            class,
            fields: RefCell::new(FxHashMap::default()),
        }
    }

    /// Fields shadow methods; methods come back bound to this instance.
    pub fn get(self: &Rc<Self>, name: &Token) -> Result<RuntimeValue, RuntimeError> {
        if let Some(value) = self.fields.borrow().get(&name.lexeme) {
            return Ok(value.clone());
        }

        match self.class.find_method(&name.lexeme) {
            Some(method) => Ok(RuntimeValue::Function(Rc::new(method.bind(self.clone())?))),
            None => Err(RuntimeError::UndefinedProperty {
                name: name.lexeme.clone(),
                line: name.line,
            }),
        }
    }

    pub fn set(&self, name: &Token, value: RuntimeValue) {
        self.fields.borrow_mut().insert(name.lexeme.clone(), value);
    }
}

impl fmt::Display for LoxInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} instance", self.class.name)
    }
}
