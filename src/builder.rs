//! The stack-discipline tree builder.
//!
//! During one compilation pass the compiler invokes the registered hooks in
//! source order. Each invocation becomes a [`Command`], dispatched through a
//! single handler on [`BuildContext`], which maintains a stack of open
//! groups/cases and grows the test tree. All build state is owned by one
//! context per run; nothing is process-global, so independent runs cannot
//! leak indices or half-built trees into each other.

use std::cell::RefCell;
use std::rc::Rc;

use crate::compiler::{Hook, HookTable, Value};
use crate::errors::HarnessError;
use crate::tree::{Assertion, CaseNode, ContentRegistry, GroupNode, TreeChild};

// Hook names as they appear in rewritten style-sheet source.
pub const GROUP_PUSH: &str = "__group-push";
pub const GROUP_POP: &str = "__group-pop";
pub const CASE_PUSH: &str = "__case-push";
pub const CASE_POP: &str = "__case-pop";
pub const ASSERT_EQ: &str = "__assert-eq";
pub const ASSERT_ERROR_RAISED: &str = "__assert-error-raised";
pub const STUB_ERROR: &str = "__stub-error";
pub const ASSERT_CONTENT: &str = "__assert-content";

/// The closed set of build commands the compiler can issue through hooks.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    OpenGroup { name: String },
    CloseGroup { name: String },
    OpenCase { name: String },
    CloseCase { name: String },
    DeclareValueAssertion { actual: Value, expected: Value },
    DeclareErrorAssertion { message: String },
    DeclareCapturedError { message: String },
    RegisterContentAssertion,
}

/// Acknowledgement returned to the compiler for each command.
///
/// Beyond letting evaluation continue, only two acks carry meaning: a root
/// close is distinguished from a nested close, and a content registration
/// returns the allocated block index for marker embedding.
#[derive(Debug, Clone, PartialEq)]
pub enum Ack {
    GroupOpened(String),
    GroupClosed(String),
    /// The closed group was a root; the tree under it is complete.
    RootClosed(String),
    CaseOpened(String),
    CaseClosed(String),
    Declared(&'static str),
    ContentIndex(usize),
}

impl Ack {
    /// The wire value handed back through the hook.
    pub fn into_value(self) -> Value {
        match self {
            Ack::GroupOpened(name) => Value::String(format!("push_group_{name}")),
            Ack::GroupClosed(name) | Ack::RootClosed(name) => {
                Value::String(format!("pop_group_{name}"))
            }
            Ack::CaseOpened(name) => Value::String(format!("push_case_{name}")),
            Ack::CaseClosed(name) => Value::String(format!("pop_case_{name}")),
            Ack::Declared(tag) => Value::String(tag.to_string()),
            // The index is embedded verbatim into the sheet's own output to
            // form the block markers, so it goes back as a string.
            Ack::ContentIndex(index) => Value::String(index.to_string()),
        }
    }
}

/// A node currently open on the builder stack.
#[derive(Debug)]
enum Slot {
    Group(GroupNode),
    Case(CaseNode),
}

/// Mutable build state for exactly one compilation run.
#[derive(Debug, Default)]
pub struct BuildContext {
    stack: Vec<Slot>,
    roots: Vec<GroupNode>,
    registry: ContentRegistry,
}

impl BuildContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatches one command, enforcing the stack discipline.
    pub fn apply(&mut self, command: Command) -> Result<Ack, HarnessError> {
        match command {
            Command::OpenGroup { name } => self.open_group(name),
            Command::CloseGroup { name } => self.close_group(name),
            Command::OpenCase { name } => self.open_case(name),
            Command::CloseCase { name } => self.close_case(name),
            Command::DeclareValueAssertion { actual, expected } => {
                let case = self.current_case("value assertion")?;
                case.assertions.push(Assertion::ValueEq { actual, expected });
                Ok(Ack::Declared("assert_eq"))
            }
            Command::DeclareErrorAssertion { message } => {
                let case = self.current_case("error assertion")?;
                case.assertions.push(Assertion::ErrorRaised { message });
                Ok(Ack::Declared("assert_error_raised"))
            }
            Command::DeclareCapturedError { message } => {
                let case = self.current_case("captured error").map_err(|e| {
                    e.with_help("ensure any code calling @error runs inside a case body")
                })?;
                case.captured_errors.push(message);
                Ok(Ack::Declared("stub_error"))
            }
            Command::RegisterContentAssertion => self.register_content_assertion(),
        }
    }

    fn open_group(&mut self, name: String) -> Result<Ack, HarnessError> {
        if let Some(Slot::Case(_)) = self.stack.last() {
            return Err(HarnessError::group_inside_case(name));
        }
        self.stack.push(Slot::Group(GroupNode::new(name.clone())));
        Ok(Ack::GroupOpened(name))
    }

    fn close_group(&mut self, name: String) -> Result<Ack, HarnessError> {
        let group = match self.stack.pop() {
            Some(Slot::Group(group)) => group,
            Some(Slot::Case(case)) => {
                return Err(HarnessError::internal(format!(
                    "group-pop \"{name}\" closed open case \"{}\"",
                    case.name
                )));
            }
            None => {
                return Err(HarnessError::internal(format!(
                    "group-pop \"{name}\" with no open group"
                )));
            }
        };

        match self.stack.last_mut() {
            // The root's subtree is complete; the runner executes all roots
            // once compilation returns and content blocks are resolved.
            None => {
                self.roots.push(group);
                Ok(Ack::RootClosed(name))
            }
            Some(Slot::Group(parent)) => {
                parent.children.push(TreeChild::Group(group));
                Ok(Ack::GroupClosed(name))
            }
            Some(Slot::Case(_)) => Err(HarnessError::internal(format!(
                "group \"{name}\" was opened under a case"
            ))),
        }
    }

    fn open_case(&mut self, name: String) -> Result<Ack, HarnessError> {
        match self.stack.last() {
            Some(Slot::Group(_)) => {
                self.stack.push(Slot::Case(CaseNode::new(name.clone())));
                Ok(Ack::CaseOpened(name))
            }
            _ => Err(HarnessError::case_outside_group(name)),
        }
    }

    fn close_case(&mut self, name: String) -> Result<Ack, HarnessError> {
        let case = match self.stack.pop() {
            Some(Slot::Case(case)) => case,
            _ => {
                return Err(HarnessError::internal(format!(
                    "case-pop \"{name}\" with no open case"
                )));
            }
        };
        match self.stack.last_mut() {
            Some(Slot::Group(parent)) => {
                parent.children.push(TreeChild::Case(case));
                Ok(Ack::CaseClosed(name))
            }
            // open_case guarantees a group below every case.
            _ => Err(HarnessError::internal(format!(
                "case \"{name}\" had no enclosing group"
            ))),
        }
    }

    fn register_content_assertion(&mut self) -> Result<Ack, HarnessError> {
        let case = match self.stack.last_mut() {
            Some(Slot::Case(case)) => case,
            _ => return Err(HarnessError::declaration_outside_case("content assertion")),
        };
        if case.content_ref.is_some() {
            return Err(HarnessError::duplicate_content_assertion(&case.name));
        }
        let index = self.registry.allocate();
        case.content_ref = Some(index);
        Ok(Ack::ContentIndex(index))
    }

    fn current_case(&mut self, declaration: &'static str) -> Result<&mut CaseNode, HarnessError> {
        match self.stack.last_mut() {
            Some(Slot::Case(case)) => Ok(case),
            _ => Err(HarnessError::declaration_outside_case(declaration)),
        }
    }

    pub fn has_content_assertions(&self) -> bool {
        !self.registry.is_empty()
    }

    pub fn registry_mut(&mut self) -> &mut ContentRegistry {
        &mut self.registry
    }

    /// Number of groups/cases still open.
    pub fn open_depth(&self) -> usize {
        self.stack.len()
    }

    /// Consumes the context once compilation has returned, yielding the
    /// completed roots and the block registry. Anything still open means the
    /// rewritten source's push/pop pairing was broken.
    pub fn finish(self) -> Result<(Vec<GroupNode>, ContentRegistry), HarnessError> {
        if !self.stack.is_empty() {
            return Err(HarnessError::unbalanced_stack(self.stack.len()));
        }
        Ok((self.roots, self.registry))
    }
}

// ---------------------------------------------------------------------------
// Hook table construction
// ---------------------------------------------------------------------------

/// Builds the hook table for one run. Every hook closes over the same shared
/// context; single-run execution is synchronous, so `Rc<RefCell<_>>` suffices.
pub fn hooks(context: &Rc<RefCell<BuildContext>>) -> HookTable {
    let mut table = HookTable::new();

    table.register(GROUP_PUSH, named_hook(context, GROUP_PUSH, |name| {
        Command::OpenGroup { name }
    }));
    table.register(GROUP_POP, named_hook(context, GROUP_POP, |name| {
        Command::CloseGroup { name }
    }));
    table.register(CASE_PUSH, named_hook(context, CASE_PUSH, |name| {
        Command::OpenCase { name }
    }));
    table.register(CASE_POP, named_hook(context, CASE_POP, |name| {
        Command::CloseCase { name }
    }));
    table.register(ASSERT_ERROR_RAISED, named_hook(context, ASSERT_ERROR_RAISED, |message| {
        Command::DeclareErrorAssertion { message }
    }));
    table.register(STUB_ERROR, named_hook(context, STUB_ERROR, |message| {
        Command::DeclareCapturedError { message }
    }));

    let ctx = Rc::clone(context);
    table.register(
        ASSERT_EQ,
        Box::new(move |args: &[Value]| {
            if args.len() != 2 {
                return Err(HarnessError::hook_arity(ASSERT_EQ, 2, args.len()));
            }
            let command = Command::DeclareValueAssertion {
                actual: args[0].clone(),
                expected: args[1].clone(),
            };
            Ok(ctx.borrow_mut().apply(command)?.into_value())
        }) as Hook,
    );

    let ctx = Rc::clone(context);
    table.register(
        ASSERT_CONTENT,
        Box::new(move |args: &[Value]| {
            if !args.is_empty() {
                return Err(HarnessError::hook_arity(ASSERT_CONTENT, 0, args.len()));
            }
            Ok(ctx
                .borrow_mut()
                .apply(Command::RegisterContentAssertion)?
                .into_value())
        }) as Hook,
    );

    table
}

/// A hook taking a single string argument, mapped to a command.
fn named_hook(
    context: &Rc<RefCell<BuildContext>>,
    hook: &'static str,
    to_command: impl Fn(String) -> Command + 'static,
) -> Hook {
    let ctx = Rc::clone(context);
    Box::new(move |args: &[Value]| {
        if args.len() != 1 {
            return Err(HarnessError::hook_arity(hook, 1, args.len()));
        }
        let name = args[0]
            .as_str()
            .ok_or_else(|| HarnessError::hook_argument_type(hook, "string", args[0].type_name()))?
            .to_string();
        Ok(ctx.borrow_mut().apply(to_command(name))?.into_value())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{ErrorCategory, ErrorKind};

    fn open_group(ctx: &mut BuildContext, name: &str) -> Ack {
        ctx.apply(Command::OpenGroup { name: name.into() }).unwrap()
    }

    fn close_group(ctx: &mut BuildContext, name: &str) -> Ack {
        ctx.apply(Command::CloseGroup { name: name.into() })
            .unwrap()
    }

    fn open_case(ctx: &mut BuildContext, name: &str) -> Ack {
        ctx.apply(Command::OpenCase { name: name.into() }).unwrap()
    }

    fn close_case(ctx: &mut BuildContext, name: &str) -> Ack {
        ctx.apply(Command::CloseCase { name: name.into() }).unwrap()
    }

    #[test]
    fn well_formed_nesting_preserves_declaration_order() {
        let mut ctx = BuildContext::new();
        open_group(&mut ctx, "outer");
        open_case(&mut ctx, "first");
        close_case(&mut ctx, "first");
        open_group(&mut ctx, "inner");
        open_case(&mut ctx, "second");
        close_case(&mut ctx, "second");
        close_group(&mut ctx, "inner");
        open_case(&mut ctx, "third");
        close_case(&mut ctx, "third");
        let ack = close_group(&mut ctx, "outer");
        assert_eq!(ack, Ack::RootClosed("outer".into()));

        let (roots, _) = ctx.finish().unwrap();
        assert_eq!(roots.len(), 1);
        let root = &roots[0];
        assert_eq!(root.name, "outer");
        let kinds: Vec<&str> = root
            .children
            .iter()
            .map(|c| match c {
                TreeChild::Case(case) => case.name.as_str(),
                TreeChild::Group(group) => group.name.as_str(),
            })
            .collect();
        assert_eq!(kinds, vec!["first", "inner", "third"]);
    }

    #[test]
    fn root_count_matches_top_level_pairs() {
        let mut ctx = BuildContext::new();
        for name in ["a", "b", "c"] {
            open_group(&mut ctx, name);
            close_group(&mut ctx, name);
        }
        let (roots, _) = ctx.finish().unwrap();
        assert_eq!(roots.len(), 3);
    }

    #[test]
    fn nested_group_close_is_not_a_root_close() {
        let mut ctx = BuildContext::new();
        open_group(&mut ctx, "outer");
        open_group(&mut ctx, "inner");
        assert_eq!(
            close_group(&mut ctx, "inner"),
            Ack::GroupClosed("inner".into())
        );
        assert_eq!(
            close_group(&mut ctx, "outer"),
            Ack::RootClosed("outer".into())
        );
    }

    #[test]
    fn group_inside_case_fails_naming_the_group() {
        let mut ctx = BuildContext::new();
        open_group(&mut ctx, "A");
        open_case(&mut ctx, "b");
        let err = ctx
            .apply(Command::OpenGroup { name: "C".into() })
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::GroupInsideCase { name: "C".into() });
    }

    #[test]
    fn case_outside_group_is_structural() {
        let mut ctx = BuildContext::new();
        let err = ctx
            .apply(Command::OpenCase {
                name: "orphan".into(),
            })
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Structural);

        // Also inside another case.
        let mut ctx = BuildContext::new();
        open_group(&mut ctx, "g");
        open_case(&mut ctx, "outer");
        let err = ctx
            .apply(Command::OpenCase {
                name: "inner".into(),
            })
            .unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::CaseOutsideGroup {
                name: "inner".into()
            }
        );
    }

    #[test]
    fn declarations_require_an_open_case() {
        let mut ctx = BuildContext::new();
        open_group(&mut ctx, "g");
        let err = ctx
            .apply(Command::DeclareCapturedError {
                message: "boom".into(),
            })
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Structural);

        let err = ctx.apply(Command::RegisterContentAssertion).unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::DeclarationOutsideCase {
                declaration: "content assertion".into()
            }
        );
    }

    #[test]
    fn content_registration_returns_monotonic_indices() {
        let mut ctx = BuildContext::new();
        open_group(&mut ctx, "g");
        open_case(&mut ctx, "one");
        assert_eq!(
            ctx.apply(Command::RegisterContentAssertion).unwrap(),
            Ack::ContentIndex(0)
        );
        close_case(&mut ctx, "one");
        open_case(&mut ctx, "two");
        assert_eq!(
            ctx.apply(Command::RegisterContentAssertion).unwrap(),
            Ack::ContentIndex(1)
        );
    }

    #[test]
    fn second_content_assertion_in_one_case_fails() {
        let mut ctx = BuildContext::new();
        open_group(&mut ctx, "g");
        open_case(&mut ctx, "case");
        ctx.apply(Command::RegisterContentAssertion).unwrap();
        let err = ctx.apply(Command::RegisterContentAssertion).unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::DuplicateContentAssertion {
                case: "case".into()
            }
        );
    }

    #[test]
    fn unclosed_declarations_fail_at_finish() {
        let mut ctx = BuildContext::new();
        open_group(&mut ctx, "g");
        open_case(&mut ctx, "c");
        let err = ctx.finish().unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnbalancedStack { open: 2 });
    }

    #[test]
    fn hook_table_drives_the_context() {
        let ctx = Rc::new(RefCell::new(BuildContext::new()));
        let table = hooks(&ctx);

        let ack = table
            .call(GROUP_PUSH, &[Value::string("math")])
            .unwrap();
        assert_eq!(ack, Value::string("push_group_math"));
        table.call(CASE_PUSH, &[Value::string("adds")]).unwrap();
        table
            .call(
                ASSERT_EQ,
                &[Value::Number(2.0), Value::Number(2.0)],
            )
            .unwrap();
        let index = table.call(ASSERT_CONTENT, &[]).unwrap();
        assert_eq!(index, Value::string("0"));
        table.call(CASE_POP, &[Value::string("adds")]).unwrap();
        let ack = table.call(GROUP_POP, &[Value::string("math")]).unwrap();
        assert_eq!(ack, Value::string("pop_group_math"));

        drop(table);
        let context = Rc::try_unwrap(ctx).unwrap().into_inner();
        let (roots, registry) = context.finish().unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn hooks_check_arity_and_argument_types() {
        let ctx = Rc::new(RefCell::new(BuildContext::new()));
        let table = hooks(&ctx);

        let err = table.call(GROUP_PUSH, &[]).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Compile);

        let err = table.call(GROUP_PUSH, &[Value::Number(1.0)]).unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::HookArgumentType {
                hook: GROUP_PUSH.into(),
                expected: "string".into(),
                actual: "number".into(),
            }
        );
    }
}
