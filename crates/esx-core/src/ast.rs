//! Statement-level syntax tree for JavaScript sources.
//!
//! Sources are parsed with tree-sitter, then lifted into a small owned tree
//! that only knows about statement lists: the program body and every
//! `{ ... }` statement block (function bodies, IIFE wrappers, `if` arms).
//! Everything else stays verbatim source text, so printing a tree that was
//! not edited gives back the input byte for byte, and edits only touch the
//! statements they move.
//!
//! Comments between statements are not statements. Their text is part of
//! the gap in front of the next statement, or of the list's trailing text.

use thiserror::Error;
use tree_sitter::{Node, Parser};

use esx_schema::transform::{AstStep, NodePath, Substitution};

const STATEMENT_BLOCK: &str = "statement_block";

/// Node kinds that may sit between statements without being one.
const EXTRAS: &[&str] = &["comment", "hash_bang_line"];

#[derive(Error, Debug)]
pub enum AstError {
    #[error("JavaScript grammar could not be loaded: {0}")]
    Language(#[from] tree_sitter::LanguageError),

    #[error("Parser produced no tree")]
    NoTree,

    #[error("Syntax error at line {line}, column {column}")]
    Syntax { line: usize, column: usize },

    #[error("Snippet contains no statements: {0:?}")]
    EmptySnippet(String),

    #[error("Path {0} does not address a node")]
    PathNotFound(NodePath),

    #[error("Path {0} must address a statement")]
    NotAStatement(NodePath),

    #[error("Cannot copy {right} into {left}: one is a statement, the other a list")]
    MismatchedPaths { left: NodePath, right: NodePath },
}

/// A parsed program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    body: StatementList,
}

/// A statement with its nested statement blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// Source text between the previous statement (or list start) and this one.
    gap: String,
    parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Text(String),
    Block(StatementList),
}

/// Statements of a program or block, plus the text after the last one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatementList {
    statements: Vec<Statement>,
    trailing: String,
}

enum Target<'a> {
    Statement(&'a mut Statement),
    List(&'a mut StatementList),
}

impl Program {
    /// Parse JavaScript source.
    ///
    /// # Errors
    ///
    /// Returns [`AstError::Syntax`] with the position of the first error node
    /// if the source does not parse cleanly.
    pub fn parse(source: &str) -> Result<Self, AstError> {
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_javascript::LANGUAGE.into())?;
        let tree = parser.parse(source, None).ok_or(AstError::NoTree)?;
        let root = tree.root_node();

        if root.has_error() {
            let at = first_error(root).unwrap_or(root).start_position();
            return Err(AstError::Syntax {
                line: at.row + 1,
                column: at.column + 1,
            });
        }

        Ok(Self {
            body: statement_list(root, source, 0, source.len()),
        })
    }

    /// Top-level statements.
    pub fn statements(&self) -> &[Statement] {
        &self.body.statements
    }

    /// Render the tree back to source text.
    pub fn print(&self) -> String {
        let mut out = String::new();
        self.body.write(&mut out);
        out
    }

    /// Apply one structural edit.
    ///
    /// # Errors
    ///
    /// Fails if a snippet does not parse or is empty, or a path does not
    /// address a node of the right kind.
    pub fn apply(&mut self, step: &AstStep) -> Result<(), AstError> {
        match step {
            AstStep::Unshift { key, value } => {
                let statement = parse_snippet(value)?.remove(0);
                let list = self
                    .body
                    .list_mut(key.indices())
                    .ok_or_else(|| AstError::PathNotFound(key.clone()))?;
                list.unshift(statement);
            }
            AstStep::Push { value } => {
                for mut statement in parse_snippet(value)? {
                    statement.gap = "\n".to_string();
                    self.body.statements.push(statement);
                }
            }
            AstStep::Assign {
                left,
                right,
                right_replace,
            } => {
                if !left.is_statement() {
                    return Err(AstError::NotAStatement(left.clone()));
                }
                let mut snippet = StatementList {
                    statements: parse_snippet(right)?,
                    trailing: String::new(),
                };
                for substitution in right_replace {
                    self.substitute(&mut snippet, substitution)?;
                }
                // A substitution at `[]` may have swapped in an empty list.
                if snippet.statements.is_empty() {
                    return Err(AstError::EmptySnippet(right.clone()));
                }
                let replacement = snippet.statements.remove(0);
                let slot = self
                    .body
                    .statement_mut(left.indices())
                    .ok_or_else(|| AstError::PathNotFound(left.clone()))?;
                slot.replace_with(replacement);
            }
        }
        Ok(())
    }

    /// Copy the program node at `sub.right` into `snippet` at `sub.left`.
    fn substitute(
        &mut self,
        snippet: &mut StatementList,
        sub: &Substitution,
    ) -> Result<(), AstError> {
        if sub.left.is_statement() != sub.right.is_statement() {
            return Err(AstError::MismatchedPaths {
                left: sub.left.clone(),
                right: sub.right.clone(),
            });
        }
        let not_found = |p: &NodePath| AstError::PathNotFound(p.clone());

        match self.body.target(sub.right.indices()).ok_or_else(|| not_found(&sub.right))? {
            Target::Statement(source) => {
                let copy = source.clone();
                snippet
                    .statement_mut(sub.left.indices())
                    .ok_or_else(|| not_found(&sub.left))?
                    .replace_with(copy);
            }
            Target::List(source) => {
                let copy = source.clone();
                *snippet
                    .list_mut(sub.left.indices())
                    .ok_or_else(|| not_found(&sub.left))? = copy;
            }
        }
        Ok(())
    }
}

impl Statement {
    /// Source text of this statement, without leading whitespace.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for part in &self.parts {
            part.write(&mut out);
        }
        out
    }

    fn blocks_mut(&mut self) -> impl Iterator<Item = &mut StatementList> {
        self.parts.iter_mut().filter_map(|p| match p {
            Part::Block(list) => Some(list),
            Part::Text(_) => None,
        })
    }

    /// Take `other`'s content while keeping this slot's leading whitespace.
    fn replace_with(&mut self, other: Statement) {
        self.parts = other.parts;
    }

    fn write(&self, out: &mut String) {
        out.push_str(&self.gap);
        for part in &self.parts {
            part.write(out);
        }
    }
}

impl Part {
    fn write(&self, out: &mut String) {
        match self {
            Part::Text(text) => out.push_str(text),
            Part::Block(list) => list.write(out),
        }
    }
}

impl StatementList {
    fn write(&self, out: &mut String) {
        for statement in &self.statements {
            statement.write(out);
        }
        out.push_str(&self.trailing);
    }

    /// Insert at the front, taking over the indentation of the old first
    /// statement. Comments in front of that statement stay with it.
    fn unshift(&mut self, mut statement: Statement) {
        match self.statements.first_mut() {
            None => statement.gap = "\n".to_string(),
            Some(first) if first.gap.trim().is_empty() => statement.gap = first.gap.clone(),
            Some(first) => {
                let lead_len = first.gap.len() - first.gap.trim_start().len();
                let lead = first.gap[..lead_len].to_string();
                if !lead.contains('\n') {
                    first.gap.insert(0, '\n');
                }
                statement.gap = lead;
            }
        }
        self.statements.insert(0, statement);
    }

    fn list_mut(&mut self, path: &[usize]) -> Option<&mut StatementList> {
        match path {
            [] => Some(self),
            [statement, block, rest @ ..] => self
                .statements
                .get_mut(*statement)?
                .blocks_mut()
                .nth(*block)?
                .list_mut(rest),
            [_] => None,
        }
    }

    fn statement_mut(&mut self, path: &[usize]) -> Option<&mut Statement> {
        let (last, list) = path.split_last()?;
        self.list_mut(list)?.statements.get_mut(*last)
    }

    fn target(&mut self, path: &[usize]) -> Option<Target<'_>> {
        if path.len() % 2 == 1 {
            self.statement_mut(path).map(Target::Statement)
        } else {
            self.list_mut(path).map(Target::List)
        }
    }
}

/// Parse a snippet into its top-level statements; never returns an empty list.
fn parse_snippet(snippet: &str) -> Result<Vec<Statement>, AstError> {
    let program = Program::parse(snippet)?;
    let statements = program.body.statements;
    if statements.is_empty() {
        return Err(AstError::EmptySnippet(snippet.to_string()));
    }
    Ok(statements
        .into_iter()
        .map(|mut s| {
            s.gap.clear();
            s
        })
        .collect())
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let children: Vec<Node<'_>> = node.children(&mut node.walk()).collect();
    children
        .into_iter()
        .filter(Node::has_error)
        .find_map(first_error)
}

/// Lift the named children of `node` between byte offsets `start..end`.
fn statement_list(node: Node<'_>, source: &str, start: usize, end: usize) -> StatementList {
    let mut pos = start;
    let mut statements = Vec::new();

    let children: Vec<Node<'_>> = node.named_children(&mut node.walk()).collect();
    for child in children {
        if EXTRAS.contains(&child.kind()) {
            continue;
        }
        statements.push(Statement {
            gap: source[pos..child.start_byte()].to_string(),
            parts: statement_parts(child, source),
        });
        pos = child.end_byte();
    }

    StatementList {
        statements,
        trailing: source[pos..end.max(pos)].to_string(),
    }
}

/// Split a statement's text around its outermost statement blocks.
fn statement_parts(node: Node<'_>, source: &str) -> Vec<Part> {
    let mut blocks = Vec::new();
    collect_blocks(node, &mut blocks);

    let mut parts = Vec::new();
    let mut pos = node.start_byte();
    for block in blocks {
        let braces: Vec<Node<'_>> = block.children(&mut block.walk()).collect();
        let open = braces.iter().find(|n| n.kind() == "{").map(Node::end_byte);
        let close = braces.iter().rev().find(|n| n.kind() == "}").map(Node::start_byte);
        let (Some(open), Some(close)) = (open, close) else {
            continue;
        };

        parts.push(Part::Text(source[pos..open].to_string()));
        parts.push(Part::Block(statement_list(block, source, open, close)));
        pos = close;
    }
    parts.push(Part::Text(source[pos..node.end_byte()].to_string()));
    parts
}

fn collect_blocks<'t>(node: Node<'t>, out: &mut Vec<Node<'t>>) {
    if node.kind() == STATEMENT_BLOCK {
        out.push(node);
        return;
    }
    let children: Vec<Node<'t>> = node.children(&mut node.walk()).collect();
    for child in children {
        collect_blocks(child, out);
    }
}
