//! The tree executor and the single-run pipeline.
//!
//! Once a run's tree is complete and its content blocks are resolved, the
//! executor walks each root depth-first and surfaces it through the host
//! runner's [`Reporter`]. The walk is read-only: nothing mutates a node after
//! compilation completes.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use serde::Serialize;

use crate::builder::{self, BuildContext};
use crate::compiler::{CompileRequest, Compiler};
use crate::errors::HarnessError;
use crate::markers;
use crate::tree::{Assertion, CaseNode, ContentRegistry, GroupNode, TreeChild};

/// The host test-runner boundary: nested group registration plus per-case
/// reporting.
pub trait Reporter {
    fn enter_group(&mut self, name: &str);
    fn leave_group(&mut self, name: &str);
    fn report_case(&mut self, report: &CaseReport);
}

/// The outcome of one check within a case. `expected`/`actual` are rendered
/// for display; hosts wanting diffs get both halves.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckOutcome {
    pub description: String,
    pub passed: bool,
    pub expected: Option<String>,
    pub actual: Option<String>,
}

/// One executed case with every check evaluated. A case fails as soon as any
/// check fails, but all checks are evaluated and reported for diagnostic
/// completeness.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseReport {
    pub name: String,
    pub checks: Vec<CheckOutcome>,
}

impl CaseReport {
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|check| check.passed)
    }
}

/// Case counts for a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub passed: usize,
    pub failed: usize,
}

impl Summary {
    pub fn total(&self) -> usize {
        self.passed + self.failed
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    fn record(&mut self, passed: bool) {
        if passed {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
    }
}

/// Directory context for one run, handed through to the compiler's include
/// path search.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub test_dir: PathBuf,
    pub cwd: PathBuf,
}

impl RunOptions {
    pub fn new(test_dir: impl Into<PathBuf>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            test_dir: test_dir.into(),
            cwd: cwd.into(),
        }
    }

    pub fn include_paths(&self) -> Vec<PathBuf> {
        vec![self.test_dir.clone(), self.cwd.clone()]
    }
}

/// The complete compile-and-build pass for one rewritten source text.
///
/// Creates a fresh build context, compiles once with the hook table
/// installed, resolves content blocks if any were registered, checks the
/// stack balanced out, then executes the finished tree. Any error aborts the
/// whole run; the caller reports it as an infrastructure failure.
pub fn run<C: Compiler, R: Reporter>(
    source: &str,
    options: &RunOptions,
    compiler: &C,
    reporter: &mut R,
) -> Result<Summary, HarnessError> {
    let context = Rc::new(RefCell::new(BuildContext::new()));
    let table = builder::hooks(&context);

    let compiled = compiler.compile(CompileRequest {
        source,
        include_paths: options.include_paths(),
        hooks: &table,
    })?;

    drop(table);
    let mut context = Rc::try_unwrap(context)
        .map_err(|_| HarnessError::internal("compiler retained the run's hook table"))?
        .into_inner();

    if context.has_content_assertions() {
        markers::resolve_content_blocks(&compiled, context.registry_mut())?;
    }

    let (roots, registry) = context.finish()?;
    execute(&roots, &registry, reporter)
}

/// Walks every completed root into the reporter.
pub fn execute<R: Reporter>(
    roots: &[GroupNode],
    registry: &ContentRegistry,
    reporter: &mut R,
) -> Result<Summary, HarnessError> {
    let mut summary = Summary::default();
    for root in roots {
        execute_group(root, registry, reporter, &mut summary)?;
    }
    Ok(summary)
}

fn execute_group<R: Reporter>(
    group: &GroupNode,
    registry: &ContentRegistry,
    reporter: &mut R,
    summary: &mut Summary,
) -> Result<(), HarnessError> {
    reporter.enter_group(&group.name);
    for child in &group.children {
        match child {
            TreeChild::Group(nested) => execute_group(nested, registry, reporter, summary)?,
            TreeChild::Case(case) => {
                let report = execute_case(case, registry)?;
                summary.record(report.passed());
                reporter.report_case(&report);
            }
        }
    }
    reporter.leave_group(&group.name);
    Ok(())
}

fn execute_case(case: &CaseNode, registry: &ContentRegistry) -> Result<CaseReport, HarnessError> {
    let mut checks: Vec<CheckOutcome> = case
        .assertions
        .iter()
        .map(|assertion| evaluate_assertion(assertion, case))
        .collect();

    if let Some(index) = case.content_ref {
        checks.push(evaluate_content(index, registry)?);
    }

    Ok(CaseReport {
        name: case.name.clone(),
        checks,
    })
}

fn evaluate_assertion(assertion: &Assertion, case: &CaseNode) -> CheckOutcome {
    match assertion {
        Assertion::ValueEq { actual, expected } => CheckOutcome {
            description: "values are equal".to_string(),
            passed: actual == expected,
            expected: Some(expected.to_string()),
            actual: Some(actual.to_string()),
        },
        Assertion::ErrorRaised { message } => {
            let raised = case.captured_errors.iter().any(|e| e == message);
            CheckOutcome {
                description: format!("error \"{message}\" was raised"),
                passed: raised,
                expected: Some(message.clone()),
                actual: Some(if case.captured_errors.is_empty() {
                    "(no errors captured)".to_string()
                } else {
                    case.captured_errors.join("; ")
                }),
            }
        }
    }
}

fn evaluate_content(index: usize, registry: &ContentRegistry) -> Result<CheckOutcome, HarnessError> {
    let block = registry
        .get(index)
        .ok_or_else(|| HarnessError::internal(format!("case references content block {index}")))?;
    let (actual, expected) = match (&block.actual, &block.expected) {
        (Some(actual), Some(expected)) => (actual, expected),
        _ => {
            return Err(HarnessError::internal(format!(
                "content block {index} executed before resolution"
            )));
        }
    };
    Ok(CheckOutcome {
        description: format!("compiled output matches expected (block {index})"),
        passed: actual == expected,
        expected: Some(expected.clone()),
        actual: Some(actual.clone()),
    })
}
