use std::{cell::RefCell, rc::Rc};

use indexmap::IndexMap;

use crate::value::Value;

pub type EnvironmentRef = Rc<RefCell<Environment>>;

/// Why a binding lookup or assignment failed. The runtime turns these into
/// script-visible errors carrying a stack trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingError {
    Undefined,
    Immutable,
}

#[derive(Debug, Default)]
pub struct Environment {
    parent: Option<EnvironmentRef>,
    bindings: IndexMap<String, Binding>,
}

impl Environment {
    pub fn new() -> EnvironmentRef {
        Rc::new(RefCell::new(Self::default()))
    }

    pub fn with_parent(parent: EnvironmentRef) -> EnvironmentRef {
        Rc::new(RefCell::new(Self {
            parent: Some(parent),
            bindings: IndexMap::new(),
        }))
    }

    pub fn define(&mut self, name: String, value: Value, mutable: bool) {
        self.bindings.insert(name, Binding { value, mutable });
    }

    pub fn assign(env: &EnvironmentRef, name: &str, value: Value) -> Result<(), BindingError> {
        let parent = {
            let mut scope = env.borrow_mut();
            if let Some(binding) = scope.bindings.get_mut(name) {
                if !binding.mutable {
                    return Err(BindingError::Immutable);
                }
                binding.value = value;
                return Ok(());
            }
            scope.parent.clone()
        };
        match parent {
            Some(parent) => Environment::assign(&parent, name, value),
            None => Err(BindingError::Undefined),
        }
    }

    pub fn get(env: &EnvironmentRef, name: &str) -> Result<Value, BindingError> {
        let parent = {
            let scope = env.borrow();
            if let Some(binding) = scope.bindings.get(name) {
                return Ok(binding.value.clone());
            }
            scope.parent.clone()
        };
        match parent {
            Some(parent) => Environment::get(&parent, name),
            None => Err(BindingError::Undefined),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Binding {
    pub value: Value,
    pub mutable: bool,
}
