//! Textual grammar encodings. The machine and human formats are both read into a [`SyntaxNode`]
//! tree which is then built into the pattern arena by [`build`], the DSL builds patterns directly.

pub mod build;
pub mod dsl;
pub mod human;
pub mod machine;

use crate::{
    error::CompileError,
    grammar::Grammar,
    pattern::{NodeType, PatternId},
    span::{Span, Spanned},
};

/// Deepest node nesting accepted by the grammar readers.
pub const MAX_NESTING: usize = 256;

pub(crate) fn nested_too_deeply(span: Span) -> CompileError {
    CompileError::syntax(span, "grammar nested too deeply")
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyntaxNode {
    pub node_type: NodeType,
    pub span: Span,
    pub fields: Vec<Field>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Field {
    /// Unescaped payload text.
    Text(Spanned<String>),
    Node(SyntaxNode),
}

impl SyntaxNode {
    pub fn new(node_type: NodeType, span: Span) -> SyntaxNode {
        SyntaxNode {
            node_type,
            span,
            fields: Vec::new(),
        }
    }
    /// Reconstructs the syntax of a compiled pattern, references are emitted by name.
    pub fn from_grammar(grammar: &Grammar, id: PatternId) -> SyntaxNode {
        let pattern = grammar.get(id);
        let mut node = SyntaxNode::new(pattern.node_type(), pattern.span());
        if let Some(text) = pattern.kind().text() {
            node.fields
                .push(Field::Text(Spanned::new(text.to_string(), pattern.span())));
        }
        for &child in pattern.children() {
            node.fields
                .push(Field::Node(SyntaxNode::from_grammar(grammar, child)));
        }
        node
    }
}

pub fn machine_to_human(text: &str) -> Result<String, CompileError> {
    let node = machine::parse(text)?;
    Ok(human::write(&node))
}

pub fn human_to_machine(text: &str) -> Result<String, CompileError> {
    let node = human::parse(text)?;
    Ok(machine::write(&node))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_conversions() {
        let machine = "[rule list,[rule,NUMBER,[multiple,[character class,0123456789]]],[rule,SPACE,[string literal,ENC(S)ENC(C)]]]";
        let human = machine_to_human(machine).unwrap();
        assert_eq!(
            human,
            "\
rule list
 rule
  NUMBER
  multiple
   character class
    0123456789
 rule
  SPACE
  string literal
    ,"
        );
        assert_eq!(human_to_machine(&human).unwrap(), machine);
    }
}
