//! Unified error handling for the harness.
//!
//! Every failure mode of a compile-and-build run is represented by
//! [`HarnessError`]. All kinds are fatal: there is no partial-tree recovery,
//! because a malformed tree cannot be meaningfully executed. Captured `@error`
//! messages are deliberately *not* represented here; after stubbing they are
//! ordinary data on a case node.

use std::fmt;

use miette::{Diagnostic, LabeledSpan};
use thiserror::Error;

/// The single error type for the harness: what went wrong, plus optional help.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct HarnessError {
    pub kind: ErrorKind,
    pub help: Option<String>,
}

/// All failure modes as a closed enum.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    // Structural misuse of the declaration protocol.
    GroupInsideCase {
        name: String,
    },
    CaseOutsideGroup {
        name: String,
    },
    DeclarationOutsideCase {
        declaration: String,
    },
    DuplicateContentAssertion {
        case: String,
    },
    UnbalancedStack {
        open: usize,
    },

    // Compiler boundary failures.
    CompileFailure {
        message: String,
    },
    UnknownHook {
        name: String,
    },
    HookArity {
        hook: String,
        expected: usize,
        actual: usize,
    },
    HookArgumentType {
        hook: String,
        expected: String,
        actual: String,
    },

    // Sentinel marker scanning.
    MarkerNotFound {
        marker: String,
        block: usize,
    },
    BlockCountMismatch {
        registered: usize,
        resolved: usize,
    },

    // Error-stubbing rewrite.
    MalformedDirective {
        detail: String,
    },

    // Engine bugs, not user errors.
    Internal {
        message: String,
    },
}

/// Error category, used by callers and tests to classify failures without
/// matching on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Structural,
    Compile,
    MarkerScan,
    Rewrite,
    Internal,
}

impl ErrorKind {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::GroupInsideCase { .. }
            | Self::CaseOutsideGroup { .. }
            | Self::DeclarationOutsideCase { .. }
            | Self::DuplicateContentAssertion { .. }
            | Self::UnbalancedStack { .. } => ErrorCategory::Structural,

            Self::CompileFailure { .. }
            | Self::UnknownHook { .. }
            | Self::HookArity { .. }
            | Self::HookArgumentType { .. } => ErrorCategory::Compile,

            Self::MarkerNotFound { .. } | Self::BlockCountMismatch { .. } => {
                ErrorCategory::MarkerScan
            }

            Self::MalformedDirective { .. } => ErrorCategory::Rewrite,

            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Error code suffix for diagnostic codes.
    pub const fn code_suffix(&self) -> &'static str {
        match self {
            Self::GroupInsideCase { .. } => "group_inside_case",
            Self::CaseOutsideGroup { .. } => "case_outside_group",
            Self::DeclarationOutsideCase { .. } => "declaration_outside_case",
            Self::DuplicateContentAssertion { .. } => "duplicate_content_assertion",
            Self::UnbalancedStack { .. } => "unbalanced_stack",
            Self::CompileFailure { .. } => "compile_failure",
            Self::UnknownHook { .. } => "unknown_hook",
            Self::HookArity { .. } => "hook_arity",
            Self::HookArgumentType { .. } => "hook_argument_type",
            Self::MarkerNotFound { .. } => "marker_not_found",
            Self::BlockCountMismatch { .. } => "block_count_mismatch",
            Self::MalformedDirective { .. } => "malformed_directive",
            Self::Internal { .. } => "internal",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Structural => "structural",
            Self::Compile => "compile",
            Self::MarkerScan => "marker_scan",
            Self::Rewrite => "rewrite",
            Self::Internal => "internal",
        };
        write!(f, "{}", name)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::GroupInsideCase { name } => {
                write!(f, "cannot nest a group inside a case: \"{}\"", name)
            }
            ErrorKind::CaseOutsideGroup { name } => {
                write!(f, "case must be declared inside a group: \"{}\"", name)
            }
            ErrorKind::DeclarationOutsideCase { declaration } => {
                write!(f, "{} must be declared inside a case", declaration)
            }
            ErrorKind::DuplicateContentAssertion { case } => {
                write!(
                    f,
                    "case \"{}\" already declares a content assertion; only one is supported per case",
                    case
                )
            }
            ErrorKind::UnbalancedStack { open } => {
                write!(
                    f,
                    "compilation finished with {} unclosed group/case declaration(s)",
                    open
                )
            }
            ErrorKind::CompileFailure { message } => {
                write!(f, "style-sheet compilation failed: {}", message)
            }
            ErrorKind::UnknownHook { name } => {
                write!(f, "compiler invoked unknown hook '{}'", name)
            }
            ErrorKind::HookArity {
                hook,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "hook '{}' expects {} argument(s), got {}",
                    hook, expected, actual
                )
            }
            ErrorKind::HookArgumentType {
                hook,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "hook '{}' expects a {} argument, got {}",
                    hook, expected, actual
                )
            }
            ErrorKind::MarkerNotFound { marker, block } => {
                write!(
                    f,
                    "required content-assertion markers not found: missing '{}' for block {}",
                    marker, block
                )
            }
            ErrorKind::BlockCountMismatch {
                registered,
                resolved,
            } => {
                write!(
                    f,
                    "content-assertion count mismatch: {} block(s) registered, {} resolved",
                    registered, resolved
                )
            }
            ErrorKind::MalformedDirective { detail } => {
                write!(f, "cannot stub @error directive: {}", detail)
            }
            ErrorKind::Internal { message } => {
                write!(f, "internal harness error: {}", message)
            }
        }
    }
}

impl Diagnostic for HarnessError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(format!(
            "stylespec::{}::{}",
            self.kind.category(),
            self.kind.code_suffix()
        )))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn fmt::Display + 'a>)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        None
    }
}

impl HarnessError {
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, help: None }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    // ------------------------------------------------------------------
    // Constructors, one per failure mode
    // ------------------------------------------------------------------

    pub fn group_inside_case(name: impl Into<String>) -> Self {
        Self::new(ErrorKind::GroupInsideCase { name: name.into() }).with_help(
            "close the enclosing case before opening another group, or move the group outside it",
        )
    }

    pub fn case_outside_group(name: impl Into<String>) -> Self {
        Self::new(ErrorKind::CaseOutsideGroup { name: name.into() })
    }

    pub fn declaration_outside_case(declaration: impl Into<String>) -> Self {
        Self::new(ErrorKind::DeclarationOutsideCase {
            declaration: declaration.into(),
        })
    }

    pub fn duplicate_content_assertion(case: impl Into<String>) -> Self {
        Self::new(ErrorKind::DuplicateContentAssertion { case: case.into() })
    }

    pub fn unbalanced_stack(open: usize) -> Self {
        Self::new(ErrorKind::UnbalancedStack { open })
    }

    pub fn compile_failure(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CompileFailure {
            message: message.into(),
        })
    }

    pub fn unknown_hook(name: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownHook { name: name.into() })
    }

    pub fn hook_arity(hook: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::new(ErrorKind::HookArity {
            hook: hook.into(),
            expected,
            actual,
        })
    }

    pub fn hook_argument_type(
        hook: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::new(ErrorKind::HookArgumentType {
            hook: hook.into(),
            expected: expected.into(),
            actual: actual.into(),
        })
    }

    pub fn marker_not_found(marker: impl Into<String>, block: usize) -> Self {
        Self::new(ErrorKind::MarkerNotFound {
            marker: marker.into(),
            block,
        })
        .with_help(
            "either marker emission in the style sheet is wrong, or a compiler transformation \
             reordered or dropped generated text",
        )
    }

    pub fn block_count_mismatch(registered: usize, resolved: usize) -> Self {
        Self::new(ErrorKind::BlockCountMismatch {
            registered,
            resolved,
        })
    }

    pub fn malformed_directive(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedDirective {
            detail: detail.into(),
        })
    }

    /// Internal errors indicate harness bugs, not user errors.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal {
            message: message.into(),
        })
        .with_help("this is an internal harness error; please report it as a bug")
    }
}

/// Prints a HarnessError with full miette diagnostics.
///
/// The host runner is expected to treat any of these as a test-infrastructure
/// failure rather than a per-case failure.
pub fn print_error(error: HarnessError) {
    use miette::Report;
    let report = Report::new(error);
    eprintln!("{report:?}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_identify_the_offending_name() {
        let err = HarnessError::group_inside_case("C");
        assert!(err.to_string().contains("\"C\""));
        assert_eq!(err.category(), ErrorCategory::Structural);

        let err = HarnessError::case_outside_group("lonely");
        assert!(err.to_string().contains("\"lonely\""));
    }

    #[test]
    fn diagnostic_codes_follow_category_and_kind() {
        let err = HarnessError::marker_not_found("/*0-end*/", 0);
        let code = format!("{}", Diagnostic::code(&err).unwrap());
        assert_eq!(code, "stylespec::marker_scan::marker_not_found");
    }

    #[test]
    fn help_is_attached_where_it_guides_the_author() {
        let err = HarnessError::marker_not_found("/*output-start*/", 2);
        assert!(err.help.is_some());
        let err = HarnessError::case_outside_group("x");
        assert!(err.help.is_none());
    }
}
