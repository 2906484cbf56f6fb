use cranelift_entity::{EntitySet, SecondaryMap};

use crate::{
    error::{ErrorAccumulator, ErrorKind},
    grammar::Grammar,
    pattern::{PatternId, PatternKind},
    span::Span,
};

type PrefixReferences = SecondaryMap<PatternId, Vec<(PatternId, Span)>>;

/// Reports references which can be reached from their own target without consuming any input,
/// matching such a grammar would recurse until the depth guard trips.
pub fn check_left_recursion(grammar: &Grammar, err: &ErrorAccumulator) {
    let mut prefix_references = PrefixReferences::new();
    let mut targets = Vec::new();

    for (id, pattern) in grammar.iter() {
        if let PatternKind::Rule(_) | PatternKind::Name(_) = pattern.kind() {
            let mut references = Vec::new();
            collect_prefix_references(grammar, id, &mut references);
            prefix_references[id] = references;
            targets.push(id);
        }
    }

    let mut done = EntitySet::new();
    let mut stack = Vec::new();
    for id in targets {
        find_prefix_cycles(id, &prefix_references, &mut done, &mut stack, grammar, err);
    }
}

/// Returns whether a successful match of the pattern always consumes input. References are
/// assumed to consume, their targets get checked on their own.
fn collect_prefix_references(
    grammar: &Grammar,
    id: PatternId,
    references: &mut Vec<(PatternId, Span)>,
) -> bool {
    let pattern = grammar.get(id);
    let children = pattern.children();
    match pattern.kind() {
        PatternKind::StringLiteral(text) => !text.is_empty(),
        PatternKind::CharacterClass(_) => true,
        PatternKind::Sequence => {
            for &child in children {
                if collect_prefix_references(grammar, child, references) {
                    return true;
                }
            }
            false
        }
        PatternKind::Or | PatternKind::And => {
            let mut all_true = true;
            for &child in children {
                all_true &= collect_prefix_references(grammar, child, references);
            }
            all_true
        }
        PatternKind::RuleList => {
            for &child in children {
                collect_prefix_references(grammar, child, references);
            }
            false
        }
        PatternKind::Not | PatternKind::Optional => {
            for &child in children {
                collect_prefix_references(grammar, child, references);
            }
            false
        }
        PatternKind::Multiple
        | PatternKind::Entire
        | PatternKind::Split
        | PatternKind::WsAllowBoth
        | PatternKind::Rule(_)
        | PatternKind::Name(_) => children
            .iter()
            .all(|&child| collect_prefix_references(grammar, child, references)),
        PatternKind::RuleName(reference) | PatternKind::Jump(reference) => {
            if let Some(target) = reference.target() {
                references.push((target, pattern.span()));
            }
            true
        }
    }
}

fn find_prefix_cycles(
    id: PatternId,

    prefix_references: &PrefixReferences,
    done: &mut EntitySet<PatternId>,
    stack: &mut Vec<PatternId>,

    grammar: &Grammar,
    err: &ErrorAccumulator,
) {
    if done.contains(id) {
        return;
    }

    stack.push(id);
    for &(target, span) in &prefix_references[id] {
        if stack.contains(&target) {
            //      /span
            // A -> B -> C -> D
            //      ↑_________|
            let name = grammar.get(target).kind().text().cloned();
            let name = name.unwrap_or_else(|| "".into());
            err.error(span, ErrorKind::LeftRecursion(name));
            continue;
        }
        find_prefix_cycles(target, prefix_references, done, stack, grammar, err);
    }
    stack.pop();
    done.insert(id);
}
