//! The indentation based human format. Every node is a line holding its type name, its fields
//! follow one space deeper. Text payloads are kept raw, only line breaks are escaped.

use crate::{
    error::{CompileError, ErrorKind},
    grammar::Grammar,
    pattern::{NodeType, Shape},
    span::{Span, Spanned},
};

use super::{nested_too_deeply, Field, SyntaxNode, MAX_NESTING};

const LINE_ESCAPES: [(char, &str); 2] = [('\n', "ENC(N)"), ('\r', "ENC(CR)")];

fn escape_line(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match LINE_ESCAPES.iter().find(|(raw, _)| *raw == c) {
            Some((_, escaped)) => out.push_str(escaped),
            None => out.push(c),
        }
    }
    out
}

fn unescape_line(text: &str) -> String {
    let mut out = text.to_owned();
    for (raw, escaped) in LINE_ESCAPES {
        if out.contains(escaped) {
            out = out.replace(escaped, raw.encode_utf8(&mut [0; 4]));
        }
    }
    out
}

#[derive(Clone, Copy)]
struct Line<'a> {
    raw: &'a str,
    offset: usize,
}

impl Line<'_> {
    fn depth(self) -> usize {
        self.raw.len() - self.raw.trim_start_matches(' ').len()
    }
    fn span(self) -> Span {
        Span::new(self.offset, self.offset + self.raw.len())
    }
}

struct HumanParser<'a> {
    lines: Vec<Line<'a>>,
    index: usize,
    /// Indentation of the root node.
    root_depth: usize,
}

pub fn parse(text: &str) -> Result<SyntaxNode, CompileError> {
    let mut lines = Vec::new();
    let mut offset = 0;
    for raw in text.split('\n') {
        lines.push(Line {
            raw: raw.strip_suffix('\r').unwrap_or(raw),
            offset,
        });
        offset += raw.len() + 1;
    }

    let mut parser = HumanParser {
        lines,
        index: 0,
        root_depth: 0,
    };
    let Some(first) = parser.peek_structural() else {
        return Err(CompileError::syntax(Span::at(0), "empty grammar"));
    };

    parser.root_depth = first.depth();
    let node = parser.node(parser.root_depth)?;
    if let Some(line) = parser.peek_structural() {
        return Err(CompileError::syntax(
            line.span(),
            "unexpected line after the root node",
        ));
    }
    Ok(node)
}

impl<'a> HumanParser<'a> {
    /// Next line which is not empty, payload lines are read raw and never skipped.
    fn peek_structural(&mut self) -> Option<Line<'a>> {
        while let Some(line) = self.lines.get(self.index) {
            if !line.raw.trim().is_empty() {
                return Some(*line);
            }
            self.index += 1;
        }
        None
    }

    fn node(&mut self, depth: usize) -> Result<SyntaxNode, CompileError> {
        let line = self.lines[self.index];
        if line.depth() != depth {
            return Err(CompileError::syntax(
                line.span(),
                format!("expected a node indented by {depth} spaces"),
            ));
        }
        if depth - self.root_depth > MAX_NESTING {
            return Err(nested_too_deeply(line.span()));
        }
        self.index += 1;

        let name = line.raw[depth..].trim_end();
        let name_span = Span::new(line.offset + depth, line.offset + depth + name.len());
        let node_type = NodeType::from_name(name)
            .ok_or_else(|| CompileError::new(name_span, ErrorKind::UnknownNodeType(name.to_owned())))?;

        let mut node = SyntaxNode::new(node_type, name_span);
        match node_type.shape() {
            Shape::Text => {
                let text = self.payload(depth + 1, name_span)?;
                node.fields.push(Field::Text(text));
            }
            Shape::Named => {
                let text = self.payload(depth + 1, name_span)?;
                node.fields.push(Field::Text(text));
                self.children(&mut node, depth)?;
            }
            Shape::Single | Shape::List => self.children(&mut node, depth)?,
        }

        let end = self.lines[self.index - 1].span().end();
        node.span = Span::new(name_span.start(), end.max(name_span.end()));
        Ok(node)
    }

    fn children(&mut self, node: &mut SyntaxNode, depth: usize) -> Result<(), CompileError> {
        while let Some(line) = self.peek_structural() {
            let child_depth = line.depth();
            if child_depth <= depth {
                break;
            }
            if child_depth != depth + 1 {
                return Err(CompileError::syntax(
                    line.span(),
                    format!("unexpected indentation, expected {} spaces", depth + 1),
                ));
            }
            node.fields.push(Field::Node(self.node(depth + 1)?));
        }
        Ok(())
    }

    fn payload(&mut self, depth: usize, owner: Span) -> Result<Spanned<String>, CompileError> {
        let Some(&line) = self.lines.get(self.index) else {
            return Err(CompileError::syntax(owner, "missing payload line"));
        };
        let indent = line.raw.get(..depth).unwrap_or("");
        if indent.len() != depth || indent.bytes().any(|b| b != b' ') {
            return Err(CompileError::syntax(
                line.span(),
                format!("payload must be indented by {depth} spaces"),
            ));
        }
        self.index += 1;

        let text = &line.raw[depth..];
        let span = Span::new(line.offset + depth, line.offset + line.raw.len());
        Ok(Spanned::new(unescape_line(text), span))
    }
}

pub fn write(node: &SyntaxNode) -> String {
    let mut lines = Vec::new();
    write_lines(&mut lines, node, 0);
    lines.join("\n")
}

fn write_lines(lines: &mut Vec<String>, node: &SyntaxNode, depth: usize) {
    lines.push(format!("{}{}", " ".repeat(depth), node.node_type.name()));
    for field in &node.fields {
        match field {
            Field::Text(text) => {
                lines.push(format!("{}{}", " ".repeat(depth + 1), escape_line(text)))
            }
            Field::Node(child) => write_lines(lines, child, depth + 1),
        }
    }
}

pub fn export(grammar: &Grammar) -> String {
    write(&SyntaxNode::from_grammar(grammar, grammar.root()))
}
