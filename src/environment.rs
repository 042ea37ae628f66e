//! Runtime variable scopes.
//!
//! Environments form a singly linked chain through `enclosing`, rooted at the
//! global scope.  They are shared (`Rc<RefCell<_>>`) because a closure keeps
//! its defining scope alive after the block that created it has exited.

use crate::error::{LoxError, Result};
use crate::token::Token;
use crate::value::Value;
use log::debug;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Shared handle to an environment.
pub type EnvRef = Rc<RefCell<Environment>>;

#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<EnvRef>,
}

impl Environment {
    /// A root (global) environment.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enclosing(enclosing: EnvRef) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Wrap `self` into a shared handle.
    pub fn into_ref(self) -> EnvRef {
        Rc::new(RefCell::new(self))
    }

    pub fn enclosing(&self) -> Option<EnvRef> {
        self.enclosing.clone()
    }

    /// Insert or overwrite `name` in *this* scope.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Is `name` bound directly in this scope (ignoring enclosing ones)?
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Look `name` up here, then outward through the chain.
    pub fn get(&self, name: &Token) -> Result<Value> {
        if let Some(value) = self.values.get(&name.lexeme) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(undefined(name))
        }
    }

    /// Overwrite the nearest existing binding of `name`.
    pub fn assign(&mut self, name: &Token, value: Value) -> Result<()> {
        if let Some(slot) = self.values.get_mut(&name.lexeme) {
            *slot = value;
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(undefined(name))
        }
    }

    /// The environment exactly `distance` links up from `env`.
    pub fn ancestor(env: &EnvRef, distance: usize) -> EnvRef {
        let mut current: EnvRef = Rc::clone(env);

        for _ in 0..distance {
            let parent: Option<EnvRef> = current.borrow().enclosing.clone();

            match parent {
                Some(parent) => current = parent,
                None => break,
            }
        }

        current
    }

    /// Read `name` from the scope `distance` links up, without searching.
    pub fn get_at(env: &EnvRef, distance: usize, name: &Token) -> Result<Value> {
        debug!("get_at({}, '{}')", distance, name.lexeme);

        Self::ancestor(env, distance)
            .borrow()
            .values
            .get(&name.lexeme)
            .cloned()
            .ok_or_else(|| undefined(name))
    }

    /// Write `name` in the scope `distance` links up, without searching.
    pub fn assign_at(env: &EnvRef, distance: usize, name: &Token, value: Value) -> Result<()> {
        debug!("assign_at({}, '{}')", distance, name.lexeme);

        let target: EnvRef = Self::ancestor(env, distance);
        let mut target = target.borrow_mut();

        match target.values.get_mut(&name.lexeme) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }

            None => Err(undefined(name)),
        }
    }
}

fn undefined(name: &Token) -> LoxError {
    LoxError::runtime(name, format!("Undefined variable '{}'.", name.lexeme))
}
