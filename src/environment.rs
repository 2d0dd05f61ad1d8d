use std::{cell::RefCell, rc::Rc};

use rustc_hash::FxHashMap;

use crate::{interpreter::RuntimeError, token::Token, value::RuntimeValue};

/// Scopes are shared: closures keep their defining scope alive after the
/// block that created it has finished.
pub type SharedEnvironment = Rc<RefCell<Environment>>;

#[derive(Default)]
pub struct Environment {
    enclosing: Option<SharedEnvironment>,
    values: FxHashMap<String, RuntimeValue>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_enclosed(enclosing: SharedEnvironment) -> Self {
        Self {
            enclosing: Some(enclosing),
            values: FxHashMap::default(),
        }
    }

    pub fn into_shared(self) -> SharedEnvironment {
        Rc::new(RefCell::new(self))
    }

    /// Binds `name` in this scope. A scope never rebinds a name it already has.
    pub fn define(&mut self, name: &Token, value: RuntimeValue) -> Result<(), RuntimeError> {
        if self.values.contains_key(&name.lexeme) {
            return Err(RuntimeError::DuplicateVariableName {
                name: name.lexeme.clone(),
                line: name.line,
            });
        }

        self.values.insert(name.lexeme.clone(), value);
        Ok(())
    }

    /// Overwrites the binding in the nearest scope that has one.
    pub fn assign(&mut self, name: &Token, value: RuntimeValue) -> Result<(), RuntimeError> {
        if let Some(slot) = self.values.get_mut(&name.lexeme) {
            *slot = value;
            return Ok(());
        }

        match &self.enclosing {
            Some(enclosing) => enclosing.borrow_mut().assign(name, value),
            None => Err(RuntimeError::UndefinedVariable {
                name: name.lexeme.clone(),
                line: name.line,
            }),
        }
    }

    pub fn get(&self, name: &Token) -> Result<RuntimeValue, RuntimeError> {
        self.lookup(&name.lexeme)
            .ok_or_else(|| RuntimeError::UndefinedVariable {
                name: name.lexeme.clone(),
                line: name.line,
            })
    }

    pub fn lookup(&self, name: &str) -> Option<RuntimeValue> {
        match self.values.get(name) {
            Some(value) => Some(value.clone()),
            None => self
                .enclosing
                .as_ref()
                .and_then(|enclosing| enclosing.borrow().lookup(name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::token::TokenType;

    fn name(lexeme: &str) -> Token {
        Token::synthetic(TokenType::Identifier, lexeme, 1)
    }

    #[test]
    fn reads_from_enclosing_scope() {
        let globals = Environment::new().into_shared();
        globals
            .borrow_mut()
            .define(&name("a"), RuntimeValue::Number(10.0))
            .unwrap();

        let local = Environment::new_enclosed(globals.clone());
        assert_eq!(local.get(&name("a")).unwrap(), RuntimeValue::Number(10.0));
    }

    #[test]
    fn assigns_to_enclosing_scope() {
        let globals = Environment::new().into_shared();
        globals
            .borrow_mut()
            .define(&name("a"), RuntimeValue::Number(10.0))
            .unwrap();

        let mut local = Environment::new_enclosed(globals.clone());
        local.assign(&name("a"), RuntimeValue::Number(5.0)).unwrap();

        assert_eq!(
            globals.borrow().get(&name("a")).unwrap(),
            RuntimeValue::Number(5.0)
        );
        assert!(local.values.is_empty());
    }

    #[test]
    fn shadowing_is_allowed_across_scopes() {
        let globals = Environment::new().into_shared();
        globals
            .borrow_mut()
            .define(&name("a"), RuntimeValue::Number(1.0))
            .unwrap();

        let mut local = Environment::new_enclosed(globals.clone());
        local.define(&name("a"), RuntimeValue::Number(2.0)).unwrap();

        assert_eq!(local.get(&name("a")).unwrap(), RuntimeValue::Number(2.0));
        assert_eq!(
            globals.borrow().get(&name("a")).unwrap(),
            RuntimeValue::Number(1.0)
        );
    }

    #[test]
    fn duplicate_definition_fails() {
        let mut environment = Environment::new();
        environment
            .define(&name("a"), RuntimeValue::Number(5.0))
            .unwrap();
        let error = environment
            .define(&name("a"), RuntimeValue::Number(6.0))
            .unwrap_err();
        assert!(matches!(
            error,
            RuntimeError::DuplicateVariableName { ref name, line: 1 } if name == "a"
        ));
    }

    #[test]
    fn undefined_variable() {
        let environment = Environment::new_enclosed(Environment::new().into_shared());
        assert!(matches!(
            environment.get(&name("missing")),
            Err(RuntimeError::UndefinedVariable { .. })
        ));
    }

    #[test]
    fn assignment_never_creates_globals() {
        let mut environment = Environment::new();
        assert!(matches!(
            environment.assign(&name("a"), RuntimeValue::Nil),
            Err(RuntimeError::UndefinedVariable { .. })
        ));
        assert!(environment.lookup("a").is_none());
    }
}
