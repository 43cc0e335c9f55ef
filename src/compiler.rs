//! Boundary to the external style-sheet compiler.
//!
//! The harness never compiles style sheets itself. It hands the compiler a
//! source text, include paths, and a table of named hooks; the compiler either
//! returns compiled text or fails. While evaluating the sheet it invokes the
//! hooks in source order, which is how the test tree gets built.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::errors::HarnessError;

/// A compile-time value exchanged with the compiler through a hook call.
///
/// This mirrors the value kinds a style-sheet compiler can pass to a custom
/// function; it is not a general style-sheet value model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Value {
    String(String),
    Number(f64),
    Bool(bool),
    Null,
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Number(_) => "number",
            Value::Bool(_) => "bool",
            Value::Null => "null",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{}", s),
            Value::Number(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Null => write!(f, "null"),
        }
    }
}

/// A named callable exposed to the compiler.
///
/// Hooks are `Fn`, not `FnMut`: the builder's hooks share one interior-mutable
/// context, so the compiler may hold the whole table behind one reference.
pub type Hook = Box<dyn Fn(&[Value]) -> Result<Value, HarnessError>>;

/// The table of named hooks handed to the compiler for one run.
#[derive(Default)]
pub struct HookTable {
    hooks: HashMap<&'static str, Hook>,
}

impl HookTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &'static str, hook: Hook) {
        self.hooks.insert(name, hook);
    }

    /// Invokes a hook by name. Unknown names are a compile-boundary error:
    /// they mean the rewritten source and the hook table disagree.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, HarnessError> {
        match self.hooks.get(name) {
            Some(hook) => hook(args),
            None => Err(HarnessError::unknown_hook(name)),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.hooks.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.hooks.keys().copied()
    }
}

impl fmt::Debug for HookTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.hooks.keys().collect();
        names.sort();
        f.debug_struct("HookTable").field("hooks", &names).finish()
    }
}

/// Everything the compiler needs for one synchronous compilation pass.
pub struct CompileRequest<'a> {
    pub source: &'a str,
    pub include_paths: Vec<PathBuf>,
    pub hooks: &'a HookTable,
}

/// The external compiler, specified only at this boundary.
///
/// Implementations must call hooks synchronously, in source order, and
/// propagate any hook error as their own failure; the harness treats a
/// returned error as fatal for the whole run.
pub trait Compiler {
    fn compile(&self, request: CompileRequest<'_>) -> Result<String, HarnessError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_hook_is_a_compile_boundary_error() {
        let table = HookTable::new();
        let err = table.call("__group-push", &[]).unwrap_err();
        assert_eq!(
            err.category(),
            crate::errors::ErrorCategory::Compile,
            "{err}"
        );
    }

    #[test]
    fn hooks_receive_their_arguments() {
        let mut table = HookTable::new();
        table.register(
            "echo",
            Box::new(|args| Ok(args.first().cloned().unwrap_or(Value::Null))),
        );
        let out = table.call("echo", &[Value::string("hi")]).unwrap();
        assert_eq!(out, Value::string("hi"));
    }
}
