use crate::{
    error::{CompileError, ErrorKind},
    grammar::GrammarBuilder,
    pattern::{NodeType, PatternId, PatternKind, Reference, Shape},
    span::Spanned,
};

use super::{Field, SyntaxNode};

/// Checks the fields of every node against the shape its type demands and pushes the patterns
/// bottom-up.
pub fn build(builder: &mut GrammarBuilder, node: &SyntaxNode) -> Result<PatternId, CompileError> {
    let name = node.node_type.name();
    let span = node.span;

    let (text, nodes) = match node.node_type.shape() {
        Shape::Text => match node.fields.as_slice() {
            [Field::Text(text)] => (Some(text), &[][..]),
            _ => {
                return Err(CompileError::syntax(
                    span,
                    format!("`{name}` expects exactly one text field"),
                ))
            }
        },
        Shape::Named => match node.fields.as_slice() {
            [Field::Text(text), rest @ ..] if matches!(rest, [Field::Node(_)]) => {
                (Some(text), rest)
            }
            _ => {
                return Err(CompileError::syntax(
                    span,
                    format!("`{name}` expects a name followed by one node"),
                ))
            }
        },
        Shape::Single => match node.fields.as_slice() {
            [Field::Node(_)] => (None, node.fields.as_slice()),
            _ => {
                return Err(CompileError::syntax(
                    span,
                    format!("`{name}` expects exactly one node"),
                ))
            }
        },
        Shape::List => {
            if node.fields.is_empty() && node.node_type == NodeType::RuleList {
                return Err(CompileError::new(span, ErrorKind::EmptyRuleList));
            }
            if node.fields.is_empty() || node.fields.iter().any(|f| matches!(f, Field::Text(_))) {
                return Err(CompileError::syntax(
                    span,
                    format!("`{name}` expects one or more nodes"),
                ));
            }
            (None, node.fields.as_slice())
        }
    };

    let mut children = Vec::with_capacity(nodes.len());
    for field in nodes {
        if let Field::Node(child) = field {
            children.push(build(builder, child)?);
        }
    }

    let kind = match text {
        Some(text) => text_kind(node.node_type, text)?,
        None => bare_kind(node.node_type),
    };
    Ok(builder.push(kind, span, children))
}

fn text_kind(node_type: NodeType, text: &Spanned<String>) -> Result<PatternKind, CompileError> {
    let value = text.inner.as_str();
    if matches!(
        node_type,
        NodeType::Rule | NodeType::Name | NodeType::RuleName | NodeType::Jump
    ) && value.is_empty()
    {
        return Err(CompileError::new(
            text.span,
            ErrorKind::InvalidName(value.to_owned()),
        ));
    }

    let kind = match node_type {
        NodeType::Rule => PatternKind::Rule(value.into()),
        NodeType::Name => PatternKind::Name(value.into()),
        NodeType::RuleName => PatternKind::RuleName(Reference::new(value.into())),
        NodeType::Jump => PatternKind::Jump(Reference::new(value.into())),
        NodeType::StringLiteral => PatternKind::StringLiteral(value.into()),
        NodeType::CharacterClass => PatternKind::CharacterClass(value.into()),
        _ => unreachable!("{node_type:?} carries no text"),
    };
    Ok(kind)
}

fn bare_kind(node_type: NodeType) -> PatternKind {
    match node_type {
        NodeType::RuleList => PatternKind::RuleList,
        NodeType::Sequence => PatternKind::Sequence,
        NodeType::Or => PatternKind::Or,
        NodeType::And => PatternKind::And,
        NodeType::Not => PatternKind::Not,
        NodeType::Optional => PatternKind::Optional,
        NodeType::Multiple => PatternKind::Multiple,
        NodeType::Entire => PatternKind::Entire,
        NodeType::Split => PatternKind::Split,
        NodeType::WsAllowBoth => PatternKind::WsAllowBoth,
        _ => unreachable!("{node_type:?} carries text"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Span;

    fn text(value: &str) -> Field {
        Field::Text(Spanned::new(value.to_owned(), Span::default()))
    }

    #[test]
    fn test_shapes() {
        let mut builder = GrammarBuilder::new();

        let mut literal = SyntaxNode::new(NodeType::StringLiteral, Span::default());
        literal.fields.push(text("a"));
        assert!(build(&mut builder, &literal).is_ok());

        let mut not = SyntaxNode::new(NodeType::Not, Span::default());
        not.fields.push(text("a"));
        assert!(build(&mut builder, &not).is_err());

        let mut rule = SyntaxNode::new(NodeType::Rule, Span::default());
        rule.fields.push(text(""));
        rule.fields.push(Field::Node(literal.clone()));
        let error = build(&mut builder, &rule).unwrap_err();
        assert_eq!(error.first().inner, ErrorKind::InvalidName(String::new()));

        let mut rule = SyntaxNode::new(NodeType::Rule, Span::default());
        rule.fields.push(text("A"));
        let error = build(&mut builder, &rule).unwrap_err();
        assert!(matches!(error.first().inner, ErrorKind::Syntax(_)));
        rule.fields.push(Field::Node(literal.clone()));
        let before = builder.len();
        build(&mut builder, &rule).unwrap();
        // the literal and the rule
        assert_eq!(builder.len(), before + 2);

        // shapes are checked before any child is built
        rule.fields.push(Field::Node(literal.clone()));
        assert!(build(&mut builder, &rule).is_err());
        assert_eq!(builder.len(), before + 2);

        let rule_list = SyntaxNode::new(NodeType::RuleList, Span::default());
        let error = build(&mut builder, &rule_list).unwrap_err();
        assert_eq!(error.first().inner, ErrorKind::EmptyRuleList);
    }
}
