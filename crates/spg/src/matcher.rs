//! Recursive descent over the compiled pattern graph. Every match attempt becomes a node of the
//! resulting [`MatchTree`], failed attempts included.

use cranelift_entity::PrimaryMap;

use crate::{
    config::MatchConfig,
    error::ParseError,
    grammar::Grammar,
    pattern::{PatternId, PatternKind},
    strings::{head_match, WHITESPACE},
    trace::{MatchId, MatchNode, MatchTree},
};

pub struct Matcher<'a> {
    grammar: &'a Grammar,
    input: &'a str,
    serial: &'a mut u64,
    max_depth: u32,
    nodes: PrimaryMap<MatchId, MatchNode>,
}

impl<'a> Matcher<'a> {
    /// `serial` is the counter shared by every match attempt of the owning generator.
    pub fn new(
        grammar: &'a Grammar,
        input: &'a str,
        serial: &'a mut u64,
        config: &MatchConfig,
    ) -> Matcher<'a> {
        Matcher {
            grammar,
            input,
            serial,
            max_depth: config.max_depth,
            nodes: PrimaryMap::new(),
        }
    }

    pub fn run(mut self, start: PatternId) -> Result<MatchTree, ParseError> {
        let root = self.visit(start, 0, 0, None)?;
        log::debug!(
            "matched {} of {} bytes with {} attempts",
            self.nodes[root].len,
            self.input.len(),
            self.nodes.len()
        );
        Ok(MatchTree::new(self.nodes, root, self.input.into()))
    }

    fn visit(
        &mut self,
        id: PatternId,
        pos: usize,
        depth: u32,
        parent: Option<MatchId>,
    ) -> Result<MatchId, ParseError> {
        if depth > self.max_depth {
            log::warn!("match depth exceeded {} at offset {pos}", self.max_depth);
            return Err(ParseError::DepthLimit {
                limit: self.max_depth,
                offset: pos,
            });
        }

        let pattern = self.grammar.get(id);
        let name = match pattern.kind() {
            PatternKind::Rule(name) | PatternKind::Name(name) => Some(name.clone()),
            PatternKind::RuleName(r) | PatternKind::Jump(r) => Some(r.name.clone()),
            _ => None,
        };
        let node = self.nodes.push(MatchNode {
            pattern: id,
            node_type: pattern.node_type(),
            name,
            serial: 0,
            depth,
            parent,
            matched: false,
            start: pos,
            len: 0,
            children: Vec::new(),
        });
        if let Some(parent) = parent {
            self.nodes[parent].children.push(node);
        }

        let (matched, len) = self.match_pattern(id, pos, depth, node)?;

        let serial = *self.serial;
        *self.serial += 1;

        let data = &mut self.nodes[node];
        data.matched = matched;
        data.len = len;
        data.serial = serial;
        Ok(node)
    }

    fn child(
        &mut self,
        id: PatternId,
        pos: usize,
        depth: u32,
        parent: MatchId,
    ) -> Result<(bool, usize), ParseError> {
        let child = self.visit(id, pos, depth + 1, Some(parent))?;
        let data = &self.nodes[child];
        Ok((data.matched, data.len))
    }

    /// One frame per nesting level. Variants which loop over their children are matched in
    /// separate methods.
    fn match_pattern(
        &mut self,
        id: PatternId,
        pos: usize,
        depth: u32,
        node: MatchId,
    ) -> Result<(bool, usize), ParseError> {
        let grammar = self.grammar;
        let input = self.input;
        let pattern = grammar.get(id);
        let children = pattern.children();
        let rest = &input[pos..];

        let result = match pattern.kind() {
            PatternKind::StringLiteral(text) => match rest.starts_with(&**text) {
                true => (true, text.len()),
                false => (false, 0),
            },
            PatternKind::CharacterClass(set) => {
                let len = head_match(rest, set).len();
                (len > 0, len)
            }
            PatternKind::Sequence => self.sequence(children, pos, depth, node)?,
            PatternKind::Or => self.first_of(children, pos, depth, node)?.unwrap_or((false, 0)),
            PatternKind::And => self.all_of(children, pos, depth, node)?,
            PatternKind::Not => {
                let (ok, _) = self.child(children[0], pos, depth, node)?;
                (!ok, 0)
            }
            PatternKind::Optional => {
                let (ok, len) = self.child(children[0], pos, depth, node)?;
                (true, if ok { len } else { 0 })
            }
            PatternKind::Multiple => self.repeat(children[0], pos, depth, node)?,
            PatternKind::Entire => {
                let (ok, len) = self.child(children[0], pos, depth, node)?;
                match ok && len == rest.len() {
                    true => (true, len),
                    false => (false, 0),
                }
            }
            PatternKind::Rule(_) | PatternKind::Name(_) | PatternKind::Split => {
                self.child(children[0], pos, depth, node)?
            }
            PatternKind::RuleName(reference) | PatternKind::Jump(reference) => {
                match reference.target() {
                    Some(target) => self.child(target, pos, depth, node)?,
                    None => (false, 0),
                }
            }
            PatternKind::WsAllowBoth => self.whitespace(children[0], pos, depth, node)?,
            PatternKind::RuleList => self.rule_list(children, pos, depth, node)?,
        };

        Ok(result)
    }

    fn sequence(
        &mut self,
        children: &[PatternId],
        pos: usize,
        depth: u32,
        node: MatchId,
    ) -> Result<(bool, usize), ParseError> {
        let mut total = 0;
        for &child in children {
            let (ok, len) = self.child(child, pos + total, depth, node)?;
            if !ok {
                // a failed sequence still reports how far it got
                return Ok((false, total));
            }
            total += len;
        }
        Ok((true, total))
    }

    /// Length of the first child which matches.
    fn first_of(
        &mut self,
        children: &[PatternId],
        pos: usize,
        depth: u32,
        node: MatchId,
    ) -> Result<Option<(bool, usize)>, ParseError> {
        for &child in children {
            let (ok, len) = self.child(child, pos, depth, node)?;
            if ok {
                return Ok(Some((true, len)));
            }
        }
        Ok(None)
    }

    fn all_of(
        &mut self,
        children: &[PatternId],
        pos: usize,
        depth: u32,
        node: MatchId,
    ) -> Result<(bool, usize), ParseError> {
        let mut shortest: Option<usize> = None;
        for &child in children {
            let (ok, len) = self.child(child, pos, depth, node)?;
            if !ok {
                return Ok((false, 0));
            }
            shortest = Some(shortest.map_or(len, |s| s.min(len)));
        }
        Ok((true, shortest.unwrap_or(0)))
    }

    fn repeat(
        &mut self,
        child: PatternId,
        pos: usize,
        depth: u32,
        node: MatchId,
    ) -> Result<(bool, usize), ParseError> {
        let mut total = 0;
        let mut count = 0;
        loop {
            let (ok, len) = self.child(child, pos + total, depth, node)?;
            if !ok {
                break;
            }
            count += 1;
            total += len;
            if len == 0 {
                break;
            }
        }
        Ok((count > 0, total))
    }

    fn whitespace(
        &mut self,
        child: PatternId,
        pos: usize,
        depth: u32,
        node: MatchId,
    ) -> Result<(bool, usize), ParseError> {
        let input = self.input;
        let leading = head_match(&input[pos..], WHITESPACE).len();
        let (ok, len) = self.child(child, pos + leading, depth, node)?;
        if !ok {
            return Ok((false, 0));
        }
        let after = pos + leading + len;
        let trailing = head_match(&input[after..], WHITESPACE).len();
        Ok((true, leading + len + trailing))
    }

    fn rule_list(
        &mut self,
        rules: &[PatternId],
        pos: usize,
        depth: u32,
        node: MatchId,
    ) -> Result<(bool, usize), ParseError> {
        let mut total = 0;
        let mut any = false;
        while let Some((_, len)) = self.first_of(rules, pos + total, depth, node)? {
            any = true;
            total += len;
            if len == 0 || pos + total == self.input.len() {
                break;
            }
        }
        Ok((any, total))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        compile, config::DEFAULT_MAX_DEPTH, pattern::NodeType, Generator, GrammarFormat,
    };

    fn match_rule(grammar: &str, rule: &str, input: &str) -> (bool, usize) {
        let grammar = compile(grammar, GrammarFormat::Dsl).unwrap();
        let mut serial = 0;
        let tree = Matcher::new(&grammar, input, &mut serial, &MatchConfig::default())
            .run(grammar.rule(rule).unwrap())
            .unwrap();
        let root = tree.get(tree.root());
        (root.matched, root.len)
    }

    #[test]
    fn test_literals() {
        assert_eq!(match_rule("A = 'ab'", "A", "abc"), (true, 2));
        assert_eq!(match_rule("A = 'ab'", "A", "ba"), (false, 0));
        assert_eq!(match_rule("A = CHARACTER_CLASS['0123456789']", "A", "42x"), (true, 2));
        assert_eq!(match_rule("A = CHARACTER_CLASS['0123456789']", "A", "x42"), (false, 0));
    }

    #[test]
    fn test_sequence() {
        assert_eq!(match_rule("A = SEQUENCE['x', 'y']", "A", "xyz"), (true, 2));
        // partial length of a failed sequence
        assert_eq!(match_rule("A = SEQUENCE['x', 'y']", "A", "xz"), (false, 1));
    }

    #[test]
    fn test_or() {
        assert_eq!(match_rule("A = OR['a', 'b']", "A", "b"), (true, 1));
        assert_eq!(match_rule("A = OR['a', 'ab']", "A", "ab"), (true, 1));
        assert_eq!(match_rule("A = OR['a', 'b']", "A", "c"), (false, 0));
    }

    #[test]
    fn test_and() {
        assert_eq!(match_rule("A = AND['ab', 'a']", "A", "abc"), (true, 1));
        assert_eq!(match_rule("A = AND['ab', 'b']", "A", "abc"), (false, 0));
    }

    #[test]
    fn test_not() {
        assert_eq!(match_rule("A = NOT['x']", "A", "y"), (true, 0));
        assert_eq!(match_rule("A = NOT['x']", "A", "x"), (false, 0));
        assert_eq!(
            match_rule("A = SEQUENCE[NOT['-'], CHARACTER_CLASS['0123456789']]", "A", "12"),
            (true, 2)
        );
    }

    #[test]
    fn test_repetition() {
        assert_eq!(match_rule("A = OPTIONAL['x']", "A", "y"), (true, 0));
        assert_eq!(match_rule("A = OPTIONAL['x']", "A", "xx"), (true, 1));
        assert_eq!(match_rule("A = MULTIPLE['ab']", "A", "ababa"), (true, 4));
        assert_eq!(match_rule("A = MULTIPLE['ab']", "A", ""), (false, 0));
        // a zero length repetition ends the loop
        assert_eq!(match_rule("A = MULTIPLE[OPTIONAL['x']]", "A", "yy"), (true, 0));
    }

    #[test]
    fn test_entire() {
        assert_eq!(match_rule("A = ENTIRE[MULTIPLE['a']]", "A", "aaa"), (true, 3));
        assert_eq!(match_rule("A = ENTIRE[MULTIPLE['a']]", "A", "aab"), (false, 0));
    }

    #[test]
    fn test_whitespace() {
        assert_eq!(match_rule("A = WS_ALLOW_BOTH['x']", "A", " \t\nx \ny"), (true, 6));
        assert_eq!(match_rule("A = WS_ALLOW_BOTH['x']", "A", "x"), (true, 1));
        assert_eq!(match_rule("A = WS_ALLOW_BOTH['x']", "A", "  y"), (false, 0));
    }

    #[test]
    fn test_references() {
        let grammar = "LIST = SEQUENCE[ITEM, OPTIONAL[SEQUENCE[COMMA, LIST]]]\nITEM = 'i'";
        assert_eq!(match_rule(grammar, "LIST", "i,i,i"), (true, 5));
        assert_eq!(match_rule(grammar, "LIST", "i,i,"), (true, 3));
    }

    #[test]
    fn test_rule_list() {
        let grammar = compile("A = 'a'\nB = 'b'", GrammarFormat::Dsl).unwrap();
        let mut serial = 0;
        let tree = Matcher::new(&grammar, "abba!", &mut serial, &MatchConfig::default())
            .run(grammar.root())
            .unwrap();
        assert!(tree.is_match());
        assert_eq!(tree.match_len(), 4);

        let rules = tree
            .get(tree.root())
            .children
            .iter()
            .filter(|&&c| tree.get(c).matched)
            .map(|&c| tree.text(c))
            .collect::<Vec<_>>();
        assert_eq!(rules, ["a", "b", "b", "a"]);
    }

    #[test]
    fn test_tree_structure() {
        let grammar = compile("A = SEQUENCE['x', 'y']", GrammarFormat::Dsl).unwrap();
        let mut serial = 10;
        let tree = Matcher::new(&grammar, "xy", &mut serial, &MatchConfig::default())
            .run(grammar.rule("A").unwrap())
            .unwrap();
        assert_eq!(serial, 14);

        let order = tree
            .preorder()
            .into_iter()
            .map(|id| {
                let node = tree.get(id);
                (node.node_type, node.depth, node.serial, node.start)
            })
            .collect::<Vec<_>>();
        assert_eq!(
            order,
            [
                (NodeType::Rule, 0, 13, 0),
                (NodeType::Sequence, 1, 12, 0),
                (NodeType::StringLiteral, 2, 10, 0),
                (NodeType::StringLiteral, 2, 11, 1),
            ]
        );
        for id in tree.preorder().into_iter().skip(1) {
            let parent = tree.get(id).parent.unwrap();
            assert!(tree.get(parent).children.contains(&id));
        }
    }

    #[test]
    fn test_depth_limit() {
        let grammar = compile(
            "LIST = SEQUENCE['i', OPTIONAL[LIST]]",
            GrammarFormat::Dsl,
        )
        .unwrap();
        let config = MatchConfig { max_depth: 16 };
        let mut serial = 0;
        let input = "i".repeat(64);
        let error = Matcher::new(&grammar, &input, &mut serial, &config)
            .run(grammar.root())
            .unwrap_err();
        assert!(matches!(error, ParseError::DepthLimit { limit: 16, .. }));

        let mut serial = 0;
        let tree = Matcher::new(&grammar, "iii", &mut serial, &config)
            .run(grammar.root())
            .unwrap();
        assert_eq!(tree.match_len(), 3);
    }

    #[test]
    fn test_default_depth_fits_stack() {
        // every item nests four attempts deeper, the last one reaches depth 4 * items + 3
        const GRAMMAR: &str = "LIST = SEQUENCE['i', OPTIONAL[LIST]]";

        let outcome = std::thread::Builder::new()
            .stack_size(2 << 20)
            .spawn(|| {
                let mut generator = Generator::new();
                generator.generate_parser(GRAMMAR, GrammarFormat::Dsl).unwrap();

                let tree = generator.match_input(&"i".repeat(63)).unwrap();
                let deepest = tree
                    .preorder()
                    .into_iter()
                    .map(|id| tree.get(id).depth)
                    .max()
                    .unwrap();

                let error = generator.match_input(&"i".repeat(64)).unwrap_err();
                let limited = matches!(
                    error,
                    ParseError::DepthLimit {
                        limit: DEFAULT_MAX_DEPTH,
                        ..
                    }
                );
                (tree.match_len(), deepest, limited)
            })
            .unwrap()
            .join()
            .unwrap();

        assert_eq!(outcome, (63, DEFAULT_MAX_DEPTH - 1, true));
    }
}
