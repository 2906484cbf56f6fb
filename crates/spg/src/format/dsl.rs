//! The keyword/bracket grammar language:
//!
//! ```text
//! NUMBER = MULTIPLE[CHARACTER_CLASS['0123456789']]
//! LIST   = SEQUENCE[NUMBER, OPTIONAL[SEQUENCE[COMMA, LIST]]]
//! ```
//!
//! Every construct is first delimited by a head match, a scan that only determines how much
//! text belongs to it, and then built from exactly that extent.

use crate::{
    error::{CompileError, ErrorKind},
    grammar::GrammarBuilder,
    pattern::{NodeType, PatternId, PatternKind, Reference, Shape},
    span::Span,
    strings::{self, head_match_while, is_identifier_char},
};

use super::{nested_too_deeply, MAX_NESTING};

/// Named single character literals for text which cannot appear between quotes or would break
/// the bracket structure in other tools.
const ESCAPES: [(&str, char); 4] = [
    ("S_QUOTE", '\''),
    ("L_SQUARE_BRACKET", '['),
    ("R_SQUARE_BRACKET", ']'),
    ("COMMA", ','),
];

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Head {
    Escape(char),
    Quoted,
    Constructor(NodeType),
    Reference,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum HeadError {
    /// Offset of the `[` which is never closed.
    Unclosed(usize),
    Unterminated,
    Nothing,
}

fn escape(ident: &str) -> Option<char> {
    ESCAPES
        .iter()
        .find(|(name, _)| *name == ident)
        .map(|&(_, c)| c)
}

/// Tries every pattern form in priority order, literal forms go first so that escape names are
/// never mistaken for rule names.
fn head_match_pattern(text: &str) -> Result<(Head, usize), HeadError> {
    let ident = head_match_while(text, is_identifier_char);

    if let Some(c) = escape(ident) {
        return Ok((Head::Escape(c), ident.len()));
    }

    if let Some(quoted) = text.strip_prefix('\'') {
        return match quoted.find('\'') {
            Some(end) => Ok((Head::Quoted, end + 2)),
            None => Err(HeadError::Unterminated),
        };
    }

    if let Some(node_type) = NodeType::from_keyword(ident) {
        let open = ident.len() + strings::skip_whitespace(&text[ident.len()..]);
        if text[open..].starts_with('[') {
            return match find_closing(&text[open..]) {
                Some(close) => Ok((Head::Constructor(node_type), open + close + 1)),
                None => Err(HeadError::Unclosed(open)),
            };
        }
    }

    if !ident.is_empty() {
        return Ok((Head::Reference, ident.len()));
    }

    Err(HeadError::Nothing)
}

/// Offset of the `]` matching the `[` that `text` starts with, brackets between quotes don't
/// count.
fn find_closing(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quoted = false;
    for (i, c) in text.char_indices() {
        match c {
            '\'' => quoted = !quoted,
            '[' if !quoted => depth += 1,
            ']' if !quoted => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

pub fn is_valid_rule_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(is_identifier_char) && escape(name).is_none()
}

pub fn parse(src: &str, builder: &mut GrammarBuilder) -> Result<PatternId, CompileError> {
    let mut parser = DslParser { src, builder };
    parser.rule_list()
}

struct DslParser<'a, 'b> {
    src: &'a str,
    builder: &'b mut GrammarBuilder,
}

impl DslParser<'_, '_> {
    fn skip_whitespace(&self, pos: usize, end: usize) -> usize {
        pos + strings::skip_whitespace(&self.src[pos..end])
    }

    fn head_error(&self, error: HeadError, pos: usize, end: usize) -> CompileError {
        match error {
            HeadError::Unclosed(open) => {
                CompileError::syntax(Span::new(pos + open, end), "unbalanced `[`")
            }
            HeadError::Unterminated => {
                CompileError::syntax(Span::new(pos, end), "unterminated string literal")
            }
            HeadError::Nothing => {
                let next = self.src[pos..end].chars().next().map_or(0, char::len_utf8);
                CompileError::syntax(Span::new(pos, pos + next), "expected a pattern")
            }
        }
    }

    fn rule_list(&mut self) -> Result<PatternId, CompileError> {
        let len = self.src.len();
        let mut pos = self.skip_whitespace(0, len);
        let start = pos;

        let mut rules = Vec::new();
        while pos < len {
            let end = self.head_match_rule(pos)?;
            rules.push(self.rule(pos, end)?);
            pos = self.skip_whitespace(end, len);
        }

        if rules.is_empty() {
            return Err(CompileError::new(Span::new(0, len), ErrorKind::EmptyRuleList));
        }
        let span = Span::new(start, len);
        Ok(self.builder.push(PatternKind::RuleList, span, rules))
    }

    /// End of the `NAME = PATTERN` declaration starting at `start`.
    fn head_match_rule(&self, start: usize) -> Result<usize, CompileError> {
        let len = self.src.len();
        let text = &self.src[start..];
        let Some(eq) = text.find('=') else {
            let line = strings::head_match_until(text, "\n");
            return Err(CompileError::syntax(
                Span::new(start, start + line.len()),
                "expected `NAME = PATTERN`",
            ));
        };

        let name = text[..eq].trim_end();
        if !is_valid_rule_name(name) {
            return Err(CompileError::new(
                Span::new(start, start + name.len()),
                ErrorKind::InvalidName(name.to_owned()),
            ));
        }

        let pattern = self.skip_whitespace(start + eq + 1, len);
        let (_, extent) =
            head_match_pattern(&self.src[pattern..]).map_err(|e| self.head_error(e, pattern, len))?;
        Ok(pattern + extent)
    }

    fn rule(&mut self, start: usize, end: usize) -> Result<PatternId, CompileError> {
        let src = self.src;
        let eq = start + src[start..end].find('=').unwrap_or(0);
        let name = src[start..eq].trim_end();
        let pattern_start = self.skip_whitespace(eq + 1, end);
        let pattern = self.pattern(pattern_start, end, 0)?;

        let kind = PatternKind::Rule(name.into());
        Ok(self.builder.push(kind, Span::new(start, end), vec![pattern]))
    }

    fn pattern(
        &mut self,
        start: usize,
        end: usize,
        depth: usize,
    ) -> Result<PatternId, CompileError> {
        if depth > MAX_NESTING {
            return Err(nested_too_deeply(Span::at(start)));
        }

        let src = self.src;
        let text = &src[start..end];
        let (head, len) = head_match_pattern(text).map_err(|e| self.head_error(e, start, end))?;
        if len != text.len() {
            return Err(CompileError::syntax(
                Span::new(start + len, end),
                "unexpected text after pattern",
            ));
        }

        let span = Span::new(start, end);
        let kind = match head {
            Head::Escape(c) => PatternKind::StringLiteral(c.to_string().into()),
            Head::Quoted => PatternKind::StringLiteral(text[1..len - 1].into()),
            Head::Reference => PatternKind::RuleName(Reference::new(text.into())),
            Head::Constructor(node_type) => {
                return self.constructor(node_type, start, end, depth)
            }
        };
        Ok(self.builder.push(kind, span, Vec::new()))
    }

    fn constructor(
        &mut self,
        node_type: NodeType,
        start: usize,
        end: usize,
        depth: usize,
    ) -> Result<PatternId, CompileError> {
        let span = Span::new(start, end);
        let keyword = node_type.keyword().unwrap_or_default();
        let open = start + self.src[start..end].find('[').unwrap_or(0);
        let arguments = self.arguments(open + 1, end - 1)?;

        if node_type == NodeType::CharacterClass {
            let charset = self.character_class(keyword, span, &arguments)?;
            let kind = PatternKind::CharacterClass(charset.into());
            return Ok(self.builder.push(kind, span, Vec::new()));
        }

        let count_ok = match node_type.shape() {
            Shape::Single => arguments.len() == 1,
            _ => !arguments.is_empty(),
        };
        if !count_ok {
            let expected = match node_type.shape() {
                Shape::Single => "exactly one pattern",
                _ => "at least one pattern",
            };
            return Err(CompileError::syntax(
                span,
                format!("`{keyword}` expects {expected}"),
            ));
        }

        let mut children = Vec::with_capacity(arguments.len());
        for &(start, end) in &arguments {
            children.push(self.pattern(start, end, depth + 1)?);
        }

        let kind = match node_type {
            NodeType::Sequence => PatternKind::Sequence,
            NodeType::Or => PatternKind::Or,
            NodeType::And => PatternKind::And,
            NodeType::Not => PatternKind::Not,
            NodeType::Optional => PatternKind::Optional,
            NodeType::Multiple => PatternKind::Multiple,
            NodeType::Entire => PatternKind::Entire,
            NodeType::WsAllowBoth => PatternKind::WsAllowBoth,
            _ => unreachable!("{node_type:?} has no keyword"),
        };
        Ok(self.builder.push(kind, span, children))
    }

    /// Concatenates the literal arguments of a `CHARACTER_CLASS`.
    fn character_class(
        &self,
        keyword: &str,
        span: Span,
        arguments: &[(usize, usize)],
    ) -> Result<String, CompileError> {
        if arguments.is_empty() {
            return Err(CompileError::syntax(
                span,
                format!("`{keyword}` expects at least one literal"),
            ));
        }

        let mut charset = String::new();
        for &(start, end) in arguments {
            let text = &self.src[start..end];
            match head_match_pattern(text) {
                Ok((Head::Escape(c), _)) => charset.push(c),
                Ok((Head::Quoted, len)) if len == text.len() => {
                    charset.push_str(&text[1..len - 1]);
                }
                _ => {
                    return Err(CompileError::syntax(
                        Span::new(start, end),
                        format!("`{keyword}` only accepts quoted characters and escapes"),
                    ))
                }
            }
        }
        Ok(charset)
    }

    /// Extents of the comma separated patterns between `start` and `end`.
    fn arguments(&self, start: usize, end: usize) -> Result<Vec<(usize, usize)>, CompileError> {
        let mut arguments = Vec::new();
        let mut pos = self.skip_whitespace(start, end);
        while pos < end {
            let (_, len) = head_match_pattern(&self.src[pos..end])
                .map_err(|e| self.head_error(e, pos, end))?;
            arguments.push((pos, pos + len));

            pos = self.skip_whitespace(pos + len, end);
            if pos == end {
                break;
            }
            if !self.src[pos..end].starts_with(',') {
                let next = self.src[pos..end].chars().next().map_or(0, char::len_utf8);
                return Err(CompileError::syntax(
                    Span::new(pos, pos + next),
                    "expected `,` between patterns",
                ));
            }
            pos = self.skip_whitespace(pos + 1, end);
        }
        Ok(arguments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{compile, grammar::Grammar, GrammarFormat};

    fn dsl(text: &str) -> Grammar {
        compile(text, GrammarFormat::Dsl).unwrap()
    }

    fn dsl_error(text: &str) -> CompileError {
        compile(text, GrammarFormat::Dsl).unwrap_err()
    }

    #[test]
    fn test_head_match() {
        assert_eq!(head_match_pattern("S_QUOTE, 'x'"), Ok((Head::Escape('\''), 7)));
        assert_eq!(head_match_pattern("S_QUOTES"), Ok((Head::Reference, 8)));
        assert_eq!(head_match_pattern("'a,b' rest"), Ok((Head::Quoted, 5)));
        assert_eq!(
            head_match_pattern("OR ['[', X] tail"),
            Ok((Head::Constructor(NodeType::Or), 11))
        );
        assert_eq!(head_match_pattern("OR"), Ok((Head::Reference, 2)));
        assert_eq!(head_match_pattern("SEQUENCE['a'"), Err(HeadError::Unclosed(8)));
        assert_eq!(head_match_pattern("'abc"), Err(HeadError::Unterminated));
        assert_eq!(head_match_pattern(", x"), Err(HeadError::Nothing));
    }

    #[test]
    fn test_rule_names() {
        assert!(is_valid_rule_name("A_OR_B_STRING"));
        assert!(is_valid_rule_name("rule2"));
        assert!(!is_valid_rule_name("COMMA"));
        assert!(!is_valid_rule_name("A B"));
        assert!(!is_valid_rule_name(""));
    }

    #[test]
    fn test_literals() {
        let grammar = dsl("A = SEQUENCE['x', S_QUOTE, L_SQUARE_BRACKET, R_SQUARE_BRACKET, COMMA, '[,]', '']");
        assert_eq!(
            grammar.to_machine(),
            "[rule list,[rule,A,[sequence,[string literal,x],[string literal,'],[string literal,ENC(L)],[string literal,ENC(R)],[string literal,ENC(C)],[string literal,ENC(L)ENC(C)ENC(R)],[string literal,]]]]"
        );
    }

    #[test]
    fn test_character_class_arguments() {
        let grammar = dsl("QUOTES = CHARACTER_CLASS['\"`', S_QUOTE]");
        assert_eq!(
            grammar.to_machine(),
            "[rule list,[rule,QUOTES,[character class,\"`']]]"
        );
        assert!(compile("A = CHARACTER_CLASS[B]", GrammarFormat::Dsl).is_err());
    }

    #[test]
    fn test_multiline_rules() {
        let grammar = dsl("\n  LIST = SEQUENCE[\n    ITEM,\n    MULTIPLE[SEQUENCE[COMMA, ITEM]],\n  ]\n  ITEM=WS_ALLOW_BOTH[CHARACTER_CLASS['abc']]\n");
        assert_eq!(grammar.rules().len(), 2);
        assert_eq!(
            grammar.to_machine(),
            "[rule list,[rule,LIST,[sequence,[rule name,ITEM],[multiple,[sequence,[string literal,ENC(C)],[rule name,ITEM]]]]],[rule,ITEM,[ws allow both,[character class,abc]]]]"
        );
    }

    #[test]
    fn test_errors() {
        let error = dsl_error("A = SEQUENCE['a','b'");
        assert_eq!(error.first().inner, ErrorKind::Syntax("unbalanced `[`".into()));
        assert_eq!(error.first().span, Span::new(12, 20));

        let error = dsl_error("SEQUENCE['a','b'");
        assert_eq!(
            error.first().inner,
            ErrorKind::Syntax("expected `NAME = PATTERN`".into())
        );

        let error = dsl_error("COMMA = 'x'");
        assert_eq!(error.first().inner, ErrorKind::InvalidName("COMMA".to_owned()));

        // the second literal starts a new declaration
        let error = dsl_error("A = 'x' 'y'");
        assert_eq!(error.first().span, Span::new(8, 11));

        let error = dsl_error("A = NOT['x', 'y']");
        assert_eq!(
            error.first().inner,
            ErrorKind::Syntax("`NOT` expects exactly one pattern".into())
        );

        let error = dsl_error("A = OR['x' 'y']");
        assert_eq!(
            error.first().inner,
            ErrorKind::Syntax("expected `,` between patterns".into())
        );

        assert_eq!(dsl_error("   \n").first().inner, ErrorKind::EmptyRuleList);
        assert!(compile("A = 'abc", GrammarFormat::Dsl).is_err());
        assert!(compile("A = OR[]", GrammarFormat::Dsl).is_err());
    }

    #[test]
    fn test_nesting_limit() {
        let nested = |depth: usize| {
            format!("A = {}'a'{}", "NOT[".repeat(depth), "]".repeat(depth))
        };

        let grammar = dsl(&nested(MAX_NESTING));
        assert_eq!(grammar.rules().len(), 1);

        let text = nested(MAX_NESTING + 1);
        let error = dsl_error(&text);
        assert_eq!(
            error.first().inner,
            ErrorKind::Syntax("grammar nested too deeply".into())
        );
        assert_eq!(error.first().span, Span::at(text.find('\'').unwrap()));

        assert!(compile(&nested(2_000), GrammarFormat::Dsl).is_err());
    }
}
