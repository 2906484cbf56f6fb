//! The bracketed machine format: `[node type,field,field,...]`. Text fields escape the four
//! characters with structural meaning.

use crate::{
    error::{CompileError, ErrorKind},
    grammar::Grammar,
    lexer::Lexer,
    pattern::NodeType,
    span::{Span, Spanned},
};

use super::{nested_too_deeply, Field, SyntaxNode, MAX_NESTING};

const ESCAPES: [(char, &str); 4] = [
    ('[', "ENC(L)"),
    (']', "ENC(R)"),
    (',', "ENC(C)"),
    (' ', "ENC(S)"),
];

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match ESCAPES.iter().find(|(raw, _)| *raw == c) {
            Some((_, escaped)) => out.push_str(escaped),
            None => out.push(c),
        }
    }
    out
}

/// Reverses [`escape`], scanning left to right so an escape never overlaps with a previous one.
pub fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    'outer: while let Some(c) = rest.chars().next() {
        for (raw, escaped) in ESCAPES {
            if let Some(tail) = rest.strip_prefix(escaped) {
                out.push(raw);
                rest = tail;
                continue 'outer;
            }
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }
    out
}

pub fn parse(text: &str) -> Result<SyntaxNode, CompileError> {
    let mut lexer = Lexer::new(text);
    lexer.skip_whitespace();
    let node = node(&mut lexer, 0)?;
    lexer.skip_whitespace();
    if !lexer.is_empty() {
        return Err(CompileError::syntax(
            Span::new(lexer.pos(), text.len()),
            "unexpected text after the root node",
        ));
    }
    Ok(node)
}

fn is_text_char(c: char) -> bool {
    !matches!(c, '[' | ']' | ',')
}

fn node(lexer: &mut Lexer, depth: usize) -> Result<SyntaxNode, CompileError> {
    let start = lexer.pos();
    if depth > MAX_NESTING {
        return Err(nested_too_deeply(Span::at(start)));
    }
    if !lexer.consume('[') {
        return Err(CompileError::syntax(Span::at(start), "expected `[`"));
    }

    let name_start = lexer.pos();
    let name = lexer.consume_while(is_text_char);
    let name_span = lexer.span_since(name_start);
    let node_type = NodeType::from_name(name)
        .ok_or_else(|| CompileError::new(name_span, ErrorKind::UnknownNodeType(name.to_owned())))?;

    let mut node = SyntaxNode::new(node_type, name_span);
    loop {
        if lexer.consume(']') {
            break;
        }
        if !lexer.consume(',') {
            let message = match lexer.is_empty() {
                true => "unbalanced `[`",
                false => "expected `,` or `]`",
            };
            return Err(CompileError::syntax(lexer.span_since(start), message));
        }

        if lexer.peek() == Some('[') {
            node.fields.push(Field::Node(self::node(lexer, depth + 1)?));
        } else {
            let text_start = lexer.pos();
            let raw = lexer.consume_while(is_text_char);
            let span = lexer.span_since(text_start);
            node.fields
                .push(Field::Text(Spanned::new(unescape(raw), span)));
        }
    }

    node.span = lexer.span_since(start);
    Ok(node)
}

pub fn write(node: &SyntaxNode) -> String {
    let mut buf = String::new();
    write_into(&mut buf, node);
    buf
}

fn write_into(buf: &mut String, node: &SyntaxNode) {
    buf.push('[');
    buf.push_str(node.node_type.name());
    for field in &node.fields {
        buf.push(',');
        match field {
            Field::Text(text) => buf.push_str(&escape(text)),
            Field::Node(child) => write_into(buf, child),
        }
    }
    buf.push(']');
}

pub fn export(grammar: &Grammar) -> String {
    write(&SyntaxNode::from_grammar(grammar, grammar.root()))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{compile, GrammarFormat};

    #[test]
    fn test_escape() {
        let raw = "[a, b]";
        let escaped = escape(raw);
        assert_eq!(escaped, "ENC(L)aENC(C)ENC(S)bENC(R)");
        assert_eq!(unescape(&escaped), raw);
        // unknown escapes are kept verbatim
        assert_eq!(unescape("ENC(X)ENC(S"), "ENC(X)ENC(S");
    }

    #[test]
    fn test_parse() {
        let node = parse("[rule list,[rule,DIGITS,[multiple,[character class,0123456789]]]]").unwrap();
        assert_eq!(node.node_type, NodeType::RuleList);
        let [Field::Node(rule)] = node.fields.as_slice() else {
            panic!("expected a single rule");
        };
        let [Field::Text(name), Field::Node(multiple)] = rule.fields.as_slice() else {
            panic!("expected a name and a pattern");
        };
        assert_eq!(name.inner, "DIGITS");
        assert_eq!(name.span, Span::new(17, 23));
        assert_eq!(multiple.node_type, NodeType::Multiple);
    }

    #[test]
    fn test_empty_text_field() {
        let node = parse("[string literal,]").unwrap();
        assert_eq!(
            node.fields,
            vec![Field::Text(Spanned::new(String::new(), Span::new(16, 16)))]
        );
    }

    #[test]
    fn test_errors() {
        let error = parse("[rule list,[rule,A,[string literal,a]]").unwrap_err();
        assert_eq!(error.first().inner, ErrorKind::Syntax("unbalanced `[`".into()));

        let error = parse("[rule lust,[rule,A,[string literal,a]]]").unwrap_err();
        assert_eq!(
            error.first().inner,
            ErrorKind::UnknownNodeType("rule lust".to_owned())
        );
        assert_eq!(error.first().span, Span::new(1, 10));

        assert!(parse("[or,[string literal,a]] trailing").is_err());
        assert!(parse("string literal").is_err());
    }

    #[test]
    fn test_nesting_limit() {
        let nested = |depth: usize| {
            format!(
                "{}[string literal,a]{}",
                "[not,".repeat(depth),
                "]".repeat(depth)
            )
        };

        assert!(parse(&nested(MAX_NESTING)).is_ok());

        let error = parse(&nested(MAX_NESTING + 1)).unwrap_err();
        assert_eq!(
            error.first().inner,
            ErrorKind::Syntax("grammar nested too deeply".into())
        );

        // unbalanced input is rejected before it can exhaust the stack
        let error = parse(&"[not,".repeat(100_000)).unwrap_err();
        assert_eq!(
            error.first().inner,
            ErrorKind::Syntax("grammar nested too deeply".into())
        );
    }

    #[test]
    fn test_round_trip() {
        let text = "[rule list,[rule,LIST,[sequence,[rule name,ITEM],[multiple,[sequence,[string literal,ENC(C)ENC(S)],[rule name,ITEM]]]]],[rule,ITEM,[or,[character class,abc],[not,[string literal,ENC(L)]]]]]";
        let grammar = compile(text, GrammarFormat::Machine).unwrap();
        let exported = grammar.to_machine();
        assert_eq!(exported, text);

        let again = compile(&exported, GrammarFormat::Machine).unwrap();
        assert!(grammar.same_shape(&again));
    }
}
