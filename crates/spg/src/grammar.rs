use std::collections::HashMap;

use cranelift_entity::PrimaryMap;

use crate::{
    check,
    error::{CompileError, ErrorAccumulator},
    format::{human, machine},
    pattern::{Pattern, PatternId, PatternKind, RcString},
    resolve,
    span::Span,
};

/// Allocates pattern nodes while an encoding is being imported.
#[derive(Default)]
pub struct GrammarBuilder {
    patterns: PrimaryMap<PatternId, Pattern>,
}

impl GrammarBuilder {
    pub fn new() -> GrammarBuilder {
        Self::default()
    }
    pub fn push(&mut self, kind: PatternKind, span: Span, children: Vec<PatternId>) -> PatternId {
        self.patterns.push(Pattern::new(kind, span, children))
    }
    pub fn len(&self) -> usize {
        self.patterns.len()
    }
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
    /// Binds every reference and rejects left recursive grammars, no partially resolved grammar
    /// ever leaves this function.
    pub fn finish(self, root: PatternId) -> Result<Grammar, CompileError> {
        let mut grammar = Grammar {
            patterns: self.patterns,
            root,
            rules: Vec::new(),
            rule_table: HashMap::new(),
            name_table: HashMap::new(),
        };

        let err = ErrorAccumulator::new();
        resolve::resolve(&mut grammar, &err);
        if err.is_empty() {
            check::check_left_recursion(&grammar, &err);
        }
        err.finish()?;

        log::debug!(
            "compiled grammar with {} nodes and {} rules",
            grammar.len(),
            grammar.rules.len()
        );
        Ok(grammar)
    }
}

#[derive(Clone, Debug)]
pub struct Grammar {
    pub(crate) patterns: PrimaryMap<PatternId, Pattern>,
    pub(crate) root: PatternId,
    pub(crate) rules: Vec<PatternId>,
    pub(crate) rule_table: HashMap<RcString, PatternId>,
    pub(crate) name_table: HashMap<RcString, PatternId>,
}

impl Grammar {
    pub fn root(&self) -> PatternId {
        self.root
    }
    pub fn get(&self, id: PatternId) -> &Pattern {
        &self.patterns[id]
    }
    pub fn len(&self) -> usize {
        self.patterns.len()
    }
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = (PatternId, &Pattern)> {
        self.patterns.iter()
    }
    /// Rule nodes in declaration order.
    pub fn rules(&self) -> &[PatternId] {
        &self.rules
    }
    pub fn rule(&self, name: &str) -> Option<PatternId> {
        self.rule_table.get(name).copied()
    }
    pub fn name_target(&self, name: &str) -> Option<PatternId> {
        self.name_table.get(name).copied()
    }
    pub fn to_machine(&self) -> String {
        machine::export(self)
    }
    pub fn to_human(&self) -> String {
        human::export(self)
    }
    /// Compares node types, payloads and child order starting from both roots, ignoring ids and
    /// spans. References are compared by name.
    pub fn same_shape(&self, other: &Grammar) -> bool {
        self.same_shape_at(self.root, other, other.root)
    }
    fn same_shape_at(&self, a: PatternId, other: &Grammar, b: PatternId) -> bool {
        let (a, b) = (self.get(a), other.get(b));
        if a.node_type() != b.node_type() || a.kind().text() != b.kind().text() {
            return false;
        }
        if a.children().len() != b.children().len() {
            return false;
        }
        a.children()
            .iter()
            .zip(b.children())
            .all(|(&a, &b)| self.same_shape_at(a, other, b))
    }
    pub fn display_into(&self, buf: &mut dyn std::fmt::Write) -> std::fmt::Result {
        self.display_into_indent(buf, self.root, 0)
    }
    fn display_into_indent(
        &self,
        buf: &mut dyn std::fmt::Write,
        id: PatternId,
        indent: usize,
    ) -> std::fmt::Result {
        for _ in 0..indent {
            write!(buf, "  ")?;
        }
        let pattern = self.get(id);
        pattern.kind().display_into(buf)?;
        writeln!(buf)?;
        for &child in pattern.children() {
            self.display_into_indent(buf, child, indent + 1)?;
        }
        Ok(())
    }
}
