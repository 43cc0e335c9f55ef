//! Shared test support: compiler stand-ins driving the hook protocol the way
//! a real style-sheet compiler would, synchronously and in source order.
#![allow(dead_code)]

use stylespec::compiler::{CompileRequest, Compiler, Value};
use stylespec::errors::HarnessError;

/// A compiler whose "evaluation" is a fixed script of hook invocations,
/// followed by fixed compiled output.
pub struct ScriptedCompiler {
    pub calls: Vec<(&'static str, Vec<Value>)>,
    pub output: String,
}

impl ScriptedCompiler {
    pub fn new(calls: Vec<(&'static str, Vec<Value>)>) -> Self {
        Self {
            calls,
            output: String::new(),
        }
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = output.into();
        self
    }
}

impl Compiler for ScriptedCompiler {
    fn compile(&self, request: CompileRequest<'_>) -> Result<String, HarnessError> {
        for (hook, args) in &self.calls {
            request.hooks.call(hook, args)?;
        }
        Ok(self.output.clone())
    }
}

/// A compiler that fails with its own formatted diagnostic.
pub struct FailingCompiler {
    pub message: &'static str,
}

impl Compiler for FailingCompiler {
    fn compile(&self, _request: CompileRequest<'_>) -> Result<String, HarnessError> {
        Err(HarnessError::compile_failure(self.message))
    }
}

// Script-building helpers.

pub fn group_push(name: &str) -> (&'static str, Vec<Value>) {
    (stylespec::builder::GROUP_PUSH, vec![Value::string(name)])
}

pub fn group_pop(name: &str) -> (&'static str, Vec<Value>) {
    (stylespec::builder::GROUP_POP, vec![Value::string(name)])
}

pub fn case_push(name: &str) -> (&'static str, Vec<Value>) {
    (stylespec::builder::CASE_PUSH, vec![Value::string(name)])
}

pub fn case_pop(name: &str) -> (&'static str, Vec<Value>) {
    (stylespec::builder::CASE_POP, vec![Value::string(name)])
}

pub fn assert_eq_values(actual: Value, expected: Value) -> (&'static str, Vec<Value>) {
    (stylespec::builder::ASSERT_EQ, vec![actual, expected])
}

pub fn assert_error_raised(message: &str) -> (&'static str, Vec<Value>) {
    (
        stylespec::builder::ASSERT_ERROR_RAISED,
        vec![Value::string(message)],
    )
}

pub fn stub_error(message: &str) -> (&'static str, Vec<Value>) {
    (stylespec::builder::STUB_ERROR, vec![Value::string(message)])
}

pub fn assert_content() -> (&'static str, Vec<Value>) {
    (stylespec::builder::ASSERT_CONTENT, vec![])
}
