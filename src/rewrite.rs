//! The error-stubbing rewriter.
//!
//! `@error` aborts compilation, which would kill a whole test run on the
//! first exercised error path. Before the single compilation pass, this
//! rewrite replaces every abort directive with `@return __stub-error(<msg>)`,
//! carrying the original message expression as data so the error becomes an
//! observable test event. The rewrite is purely structural: message
//! expressions are moved, never evaluated.

use crate::builder::STUB_ERROR;
use crate::errors::HarnessError;
use crate::stylesheet::{Node, NodeKind};

/// Replaces every abort directive in the tree with a stub call.
///
/// Returns the number of directives rewritten; zero means the tree was left
/// untouched. An `@error` keyword anywhere other than the head of a
/// directive, or a directive with no message expression, is unsupported and
/// fails rather than guessing.
pub fn stub_error_directives(root: &mut Node) -> Result<usize, HarnessError> {
    match root.children_mut() {
        Some(children) => rewrite_children(children),
        None => Ok(0),
    }
}

fn rewrite_children(children: &mut [Node]) -> Result<usize, HarnessError> {
    let mut rewritten = 0;
    for child in children.iter_mut() {
        if is_abort_directive(child) {
            replace_with_stub(child)?;
            rewritten += 1;
            continue;
        }
        if is_error_at_keyword(child) {
            return Err(HarnessError::malformed_directive(
                "@error found outside the head position of a directive; \
                 nested abort directives are unsupported",
            ));
        }
        if let Some(grandchildren) = child.children_mut() {
            rewritten += rewrite_children(grandchildren)?;
        }
    }
    Ok(rewritten)
}

/// A directive container whose head is the `@error` keyword.
fn is_abort_directive(node: &Node) -> bool {
    if node.kind == NodeKind::AtKeyword {
        return false;
    }
    node.first_meaningful_child().is_some_and(is_error_at_keyword)
}

fn is_error_at_keyword(node: &Node) -> bool {
    node.kind == NodeKind::AtKeyword
        && node
            .first_meaningful_child()
            .and_then(|c| c.text())
            .is_some_and(|text| text == "error")
}

/// Splices `@return __stub-error(<message>)` over the directive: the
/// original children are removed and the replacement children inserted in
/// order, with the message nodes moved into the stub's argument list.
fn replace_with_stub(directive: &mut Node) -> Result<(), HarnessError> {
    let children = directive
        .children_mut()
        .ok_or_else(|| HarnessError::internal("abort directive lost its children mid-rewrite"))?;

    let original: Vec<Node> = children.drain(..).collect();
    let message = message_expression(original)?;

    children.push(Node::at_keyword("return"));
    children.push(Node::space());
    children.push(Node::function(STUB_ERROR, message));
    Ok(())
}

/// Everything after the `@error` keyword, minus the leading whitespace, is
/// the message expression.
fn message_expression(original: Vec<Node>) -> Result<Vec<Node>, HarnessError> {
    let message: Vec<Node> = original
        .into_iter()
        .skip_while(|node| node.kind != NodeKind::AtKeyword)
        .skip(1)
        .skip_while(|node| node.kind == NodeKind::Space)
        .collect();
    if message.is_empty() {
        return Err(HarnessError::malformed_directive(
            "@error directive has no message expression",
        ));
    }
    Ok(message)
}
