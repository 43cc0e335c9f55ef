//! A traversable style-sheet syntax tree.
//!
//! This is the shape the external parser collaborator produces and the
//! rewriter consumes: a tree of kinded nodes where every piece of source
//! syntax, spaces included, is a node, so serializing a tree reproduces
//! source text. The harness does not parse style sheets itself; hosts plug a
//! real parser in through [`StylesheetParser`].

use std::fmt;

use serde::Serialize;

use crate::errors::HarnessError;

/// Node kinds the harness understands. Parsers may map richer grammars onto
/// these; anything without special serialization belongs in a `Raw` leaf or a
/// generic container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NodeKind {
    Stylesheet,
    Ruleset,
    Block,
    Declaration,
    AtRule,
    AtKeyword,
    Function,
    Arguments,
    Ident,
    StringLit,
    Number,
    Operator,
    Space,
    Raw,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub kind: NodeKind,
    pub content: Content,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Content {
    Children(Vec<Node>),
    Text(String),
}

impl Node {
    pub fn container(kind: NodeKind, children: Vec<Node>) -> Self {
        Self {
            kind,
            content: Content::Children(children),
        }
    }

    pub fn leaf(kind: NodeKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            content: Content::Text(text.into()),
        }
    }

    pub fn ident(name: impl Into<String>) -> Self {
        Self::leaf(NodeKind::Ident, name)
    }

    pub fn space() -> Self {
        Self::leaf(NodeKind::Space, " ")
    }

    pub fn raw(text: impl Into<String>) -> Self {
        Self::leaf(NodeKind::Raw, text)
    }

    /// `@word`, as parsers represent it: an at-keyword wrapping an ident.
    pub fn at_keyword(word: impl Into<String>) -> Self {
        Self::container(NodeKind::AtKeyword, vec![Self::ident(word)])
    }

    /// `name(args...)`.
    pub fn function(name: impl Into<String>, arguments: Vec<Node>) -> Self {
        Self::container(
            NodeKind::Function,
            vec![
                Self::ident(name),
                Self::container(NodeKind::Arguments, arguments),
            ],
        )
    }

    pub fn is_container(&self) -> bool {
        matches!(self.content, Content::Children(_))
    }

    pub fn children(&self) -> &[Node] {
        match &self.content {
            Content::Children(children) => children,
            Content::Text(_) => &[],
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        match &mut self.content {
            Content::Children(children) => Some(children),
            Content::Text(_) => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.content {
            Content::Text(text) => Some(text),
            Content::Children(_) => None,
        }
    }

    /// First child that is not whitespace.
    pub fn first_meaningful_child(&self) -> Option<&Node> {
        self.children().iter().find(|c| c.kind != NodeKind::Space)
    }
}

// Serialization back to source text. Most kinds are pure concatenation; the
// few kinds whose delimiters are not stored as child nodes add them here.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.kind, &self.content) {
            (NodeKind::AtKeyword, Content::Children(children)) => {
                write!(f, "@")?;
                for child in children {
                    write!(f, "{child}")?;
                }
                Ok(())
            }
            (NodeKind::Arguments, Content::Children(children)) => {
                write!(f, "(")?;
                for child in children {
                    write!(f, "{child}")?;
                }
                write!(f, ")")
            }
            (_, Content::Children(children)) => {
                for child in children {
                    write!(f, "{child}")?;
                }
                Ok(())
            }
            (_, Content::Text(text)) => write!(f, "{text}"),
        }
    }
}

/// The external parser/serializer collaborator: source text in, traversable
/// tree out. Serialization back to text is `Node`'s `Display`.
pub trait StylesheetParser {
    fn parse(&self, source: &str) -> Result<Node, HarnessError>;
}
