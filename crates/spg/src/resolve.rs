//! Bind every `RuleName` to its `Rule` and every `Jump` to its `Name`. Rules and names live in
//! separate namespaces, there are no scopes nor shadowing.

use std::collections::hash_map::Entry;

use crate::{
    error::{ErrorAccumulator, ErrorKind},
    grammar::Grammar,
    pattern::{PatternId, PatternKind},
};

pub fn resolve(grammar: &mut Grammar, err: &ErrorAccumulator) {
    populate(grammar, err);
    bind_references(grammar, err);
}

fn populate(grammar: &mut Grammar, err: &ErrorAccumulator) {
    let mut stack = vec![grammar.root];
    while let Some(id) = stack.pop() {
        let pattern = &grammar.patterns[id];
        let (table, name) = match pattern.kind() {
            PatternKind::Rule(name) => (&mut grammar.rule_table, name),
            PatternKind::Name(name) => (&mut grammar.name_table, name),
            _ => {
                stack.extend(pattern.children().iter().rev());
                continue;
            }
        };

        match table.entry(name.clone()) {
            Entry::Occupied(_) => {
                err.error(pattern.span(), ErrorKind::DuplicateName(name.clone()));
            }
            Entry::Vacant(v) => {
                v.insert(id);
                if matches!(pattern.kind(), PatternKind::Rule(_)) {
                    grammar.rules.push(id);
                }
            }
        }
        stack.extend(pattern.children().iter().rev());
    }
}

fn bind_references(grammar: &mut Grammar, err: &ErrorAccumulator) {
    let ids = grammar.patterns.keys().collect::<Vec<PatternId>>();
    for id in ids {
        let span = grammar.patterns[id].span();
        let (reference, table) = match grammar.patterns[id].kind_mut() {
            PatternKind::RuleName(r) => (r, &grammar.rule_table),
            PatternKind::Jump(r) => (r, &grammar.name_table),
            _ => continue,
        };

        match table.get(&reference.name) {
            Some(&target) => {
                log::trace!("bound `{}` to {target:?}", reference.name);
                reference.target = target.into();
            }
            None => err.error(span, ErrorKind::UnresolvedReference(reference.name.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{compile, error::ErrorKind, pattern::PatternKind, GrammarFormat};

    #[test]
    fn test_bind_rule_names() {
        let grammar = compile("A = B\nB = 'b'", GrammarFormat::Dsl).unwrap();
        let a = grammar.rule("A").unwrap();
        let b = grammar.rule("B").unwrap();

        let reference = grammar.get(a).child().unwrap();
        let PatternKind::RuleName(reference) = grammar.get(reference).kind() else {
            panic!("expected a rule name");
        };
        assert_eq!(reference.target(), Some(b));
        assert_eq!(grammar.rules(), &[a, b]);
    }

    #[test]
    fn test_bind_jumps() {
        let grammar = compile(
            "[rule list,[rule,R,[name,N,[sequence,[string literal,x],[optional,[jump,N]]]]]]",
            GrammarFormat::Machine,
        )
        .unwrap();
        let name = grammar.name_target("N").unwrap();
        let jump = grammar
            .iter()
            .find_map(|(_, p)| match p.kind() {
                PatternKind::Jump(r) => Some(r.target()),
                _ => None,
            })
            .unwrap();
        assert_eq!(jump, Some(name));
    }

    #[test]
    fn test_unresolved() {
        let error = compile("A = SEQUENCE[B, C]", GrammarFormat::Dsl).unwrap_err();
        assert_eq!(error.errors().len(), 2);
        assert_eq!(
            error.first().inner,
            ErrorKind::UnresolvedReference("B".into())
        );

        // a jump never binds to a rule
        let error = compile("[rule list,[rule,A,[jump,A]]]", GrammarFormat::Machine).unwrap_err();
        assert!(error.contains(|e| matches!(e, ErrorKind::UnresolvedReference(_))));
    }

    #[test]
    fn test_duplicate() {
        let error = compile("A = 'a'\nA = 'b'", GrammarFormat::Dsl).unwrap_err();
        assert_eq!(error.first().inner, ErrorKind::DuplicateName("A".into()));
        assert_eq!(error.first().span.start(), 8);
    }
}
