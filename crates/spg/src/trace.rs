use std::fmt::Display;

use cranelift_entity::{entity_impl, EntityRef, PrimaryMap};
use serde_json::{json, Value};

use crate::pattern::{NodeType, PatternId, RcString};

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct MatchId(u32);
entity_impl!(MatchId);

/// One match attempt of a pattern node, successful or not.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct MatchNode {
    pub pattern: PatternId,
    pub node_type: NodeType,
    /// Rule or target name for named nodes and references.
    pub name: Option<RcString>,
    /// Assigned when the attempt finishes, strictly increasing over the lifetime of a generator.
    pub serial: u64,
    pub depth: u32,
    pub parent: Option<MatchId>,
    pub matched: bool,
    /// Byte offset into the input.
    pub start: usize,
    /// Consumed bytes, always 0 for failed attempts except a `sequence` which reports how far it
    /// got.
    pub len: usize,
    pub children: Vec<MatchId>,
}

impl MatchNode {
    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Retain {
    Keep,
    /// Drop the node, its children are attached to the closest kept ancestor.
    Heal,
    /// Drop the node together with its subtree.
    Drop,
}

#[derive(Clone, Debug)]
pub struct MatchTree {
    nodes: PrimaryMap<MatchId, MatchNode>,
    root: MatchId,
    input: RcString,
}

impl PartialEq for MatchTree {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root
            && self.input == other.input
            && self.nodes.values().eq(other.nodes.values())
    }
}

impl MatchTree {
    pub(crate) fn new(
        nodes: PrimaryMap<MatchId, MatchNode>,
        root: MatchId,
        input: RcString,
    ) -> MatchTree {
        MatchTree { nodes, root, input }
    }
    pub fn root(&self) -> MatchId {
        self.root
    }
    pub fn get(&self, id: MatchId) -> &MatchNode {
        &self.nodes[id]
    }
    pub fn len(&self) -> usize {
        self.nodes.len()
    }
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
    pub fn input(&self) -> &str {
        &self.input
    }
    /// Whether the root pattern matched.
    pub fn is_match(&self) -> bool {
        self.nodes[self.root].matched
    }
    /// Length of the root match, 0 if it failed.
    pub fn match_len(&self) -> usize {
        let root = &self.nodes[self.root];
        match root.matched {
            true => root.len,
            false => 0,
        }
    }
    pub fn text(&self, id: MatchId) -> &str {
        let node = &self.nodes[id];
        &self.input[node.start..node.end()]
    }
    /// All nodes in preorder.
    pub fn preorder(&self) -> Vec<MatchId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.nodes[id].children.iter().rev());
        }
        out
    }

    /// Builds a new tree from the nodes accepted by `filter`. The root is always kept, if it is
    /// dropped the result holds only the root. Ids and serials are copied, depths are recomputed.
    pub fn retain(&self, mut filter: impl FnMut(&MatchNode) -> Retain) -> MatchTree {
        let mut nodes = PrimaryMap::new();
        let old_root = &self.nodes[self.root];
        let root = nodes.push(MatchNode {
            depth: 0,
            parent: None,
            children: Vec::new(),
            ..old_root.clone()
        });

        if filter(old_root) != Retain::Drop {
            self.retain_children(self.root, root, &mut nodes, &mut filter);
        }

        MatchTree {
            nodes,
            root,
            input: self.input.clone(),
        }
    }

    fn retain_children(
        &self,
        old: MatchId,
        parent: MatchId,
        nodes: &mut PrimaryMap<MatchId, MatchNode>,
        filter: &mut dyn FnMut(&MatchNode) -> Retain,
    ) {
        for &child in &self.nodes[old].children {
            let node = &self.nodes[child];
            match filter(node) {
                Retain::Keep => {
                    let id = nodes.push(MatchNode {
                        depth: nodes[parent].depth + 1,
                        parent: Some(parent),
                        children: Vec::new(),
                        ..node.clone()
                    });
                    nodes[parent].children.push(id);
                    self.retain_children(child, id, nodes, filter);
                }
                Retain::Heal => self.retain_children(child, parent, nodes, filter),
                Retain::Drop => {}
            }
        }
    }

    /// Keeps the successful rule matches reachable through successful ancestors only.
    pub fn rule_matches_only(&self) -> MatchTree {
        self.retain(|node| {
            if !node.matched {
                Retain::Drop
            } else if node.node_type == NodeType::Rule {
                Retain::Keep
            } else {
                Retain::Heal
            }
        })
    }

    pub fn display_into(&self, buf: &mut dyn std::fmt::Write) -> std::fmt::Result {
        for id in self.preorder() {
            let node = &self.nodes[id];
            for _ in 0..node.depth {
                write!(buf, "  ")?;
            }

            write!(buf, "{}", node.node_type.name())?;
            if let Some(name) = &node.name {
                write!(buf, " {name}")?;
            }
            write!(buf, " #{} {}..{}", node.serial, node.start, node.end())?;
            match node.matched {
                true => writeln!(buf, " {:?}", self.text(id))?,
                false => writeln!(buf, " failed")?,
            }
        }
        Ok(())
    }

    pub fn display(&self) -> MatchTreeDisplay<'_> {
        MatchTreeDisplay(self)
    }

    pub fn to_json(&self) -> Value {
        self.node_to_json(self.root)
    }

    fn node_to_json(&self, id: MatchId) -> Value {
        let node = &self.nodes[id];
        let children = node
            .children
            .iter()
            .map(|&child| self.node_to_json(child))
            .collect::<Vec<_>>();

        json!({
            "type": node.node_type.name(),
            "name": node.name.as_deref(),
            "id": node.pattern.index(),
            "serial": node.serial,
            "depth": node.depth,
            "matched": node.matched,
            "start": node.start,
            "length": node.len,
            "text": self.text(id),
            "children": children,
        })
    }
}

#[derive(Clone, Copy)]
pub struct MatchTreeDisplay<'a>(&'a MatchTree);
impl Display for MatchTreeDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.display_into(f)
    }
}
