use crate::ast::{DocumentKey, Function, Relation};
use crate::cache::Position;
use crate::registry::{DefinitionKind, Target};

/// Concrete parse tree of a BEL script, as produced by [`crate::parser::Parser`].
#[derive(Debug, Clone, PartialEq)]
pub struct ParseTree {
    /// A [`NodeKind::Script`] node with one child per script line.
    pub root: Node,
}

/// Node kinds of the concrete tree. The transformer matches on these
/// exhaustively.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Script,
    /// `SET DOCUMENT Key = value`; one `Value` child.
    DocumentProperty(DocumentKey),
    /// `DEFINE ...`; a `Keyword` child, then a `Value` or a `ListValue`.
    Definition(Target, DefinitionKind),
    ListValue,
    /// `SET Citation = {...}`; `Value` children.
    Citation,
    Support,
    StatementGroup,
    /// `SET Keyword = value | {...}`; a `Keyword` child, then `Value` children.
    AnnotationSet,
    /// `UNSET Keyword | {...}`; `Keyword` children.
    Unset,
    UnsetAll,
    UnsetStatementGroup,
    /// Subject term, then optionally `Relation` and an object, then optionally `Comment`.
    Statement,
    Term(Function),
    /// `KEYWORD:entry`; a `Keyword` child and a `Value` child.
    NamespacedName,
    Relation(Relation),
    Keyword,
    Value,
    Comment,
}

impl NodeKind {
    pub fn describe(&self) -> String {
        match self {
            NodeKind::Term(function) => format!("{}()", function.short_name()),
            NodeKind::Relation(relation) => relation.long_name().to_string(),
            other => format!("{other:?}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    /// Token text for leaves (unquoted for strings); empty for inner nodes.
    pub text: String,
    pub line: usize,
    pub column: usize,
    pub pos_start: usize,
    pub pos_end: usize,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(kind: NodeKind, line: usize, column: usize, pos_start: usize) -> Self {
        Self {
            kind,
            text: String::new(),
            line,
            column,
            pos_start,
            pos_end: pos_start,
            children: Vec::new(),
        }
    }

    pub fn leaf(kind: NodeKind, text: String, token: &crate::lexer::Token) -> Self {
        Self {
            kind,
            text,
            line: token.line,
            column: token.column,
            pos_start: token.pos_start,
            pos_end: token.pos_end,
            children: Vec::new(),
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    pub fn push(&mut self, child: Node) {
        self.pos_end = self.pos_end.max(child.pos_end);
        self.children.push(child);
    }

    pub fn child(&self, index: usize) -> Option<&Node> {
        self.children.get(index)
    }
}
