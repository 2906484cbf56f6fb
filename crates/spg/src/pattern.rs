use std::rc::Rc;

use cranelift_entity::{entity_impl, packed_option::PackedOption};

use crate::span::Span;

pub type RcString = Rc<str>;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct PatternId(u32);
entity_impl!(PatternId);

/// How a node type lays out its fields in the machine and human formats.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Shape {
    /// A single raw text field.
    Text,
    /// A raw name field followed by one node.
    Named,
    /// Exactly one node.
    Single,
    /// One or more nodes.
    List,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[rustfmt::skip]
pub enum NodeType {
    RuleList, Rule, Name,
    RuleName, Jump,
    StringLiteral, CharacterClass,
    Sequence, Or, And,
    Not, Optional, Multiple, Entire, Split, WsAllowBoth,
}

impl NodeType {
    pub const ALL: [NodeType; 16] = [
        NodeType::RuleList,
        NodeType::Rule,
        NodeType::Name,
        NodeType::RuleName,
        NodeType::Jump,
        NodeType::StringLiteral,
        NodeType::CharacterClass,
        NodeType::Sequence,
        NodeType::Or,
        NodeType::And,
        NodeType::Not,
        NodeType::Optional,
        NodeType::Multiple,
        NodeType::Entire,
        NodeType::Split,
        NodeType::WsAllowBoth,
    ];

    /// The name used by the machine and human formats.
    pub fn name(self) -> &'static str {
        match self {
            NodeType::RuleList => "rule list",
            NodeType::Rule => "rule",
            NodeType::Name => "name",
            NodeType::RuleName => "rule name",
            NodeType::Jump => "jump",
            NodeType::StringLiteral => "string literal",
            NodeType::CharacterClass => "character class",
            NodeType::Sequence => "sequence",
            NodeType::Or => "or",
            NodeType::And => "and",
            NodeType::Not => "not",
            NodeType::Optional => "optional",
            NodeType::Multiple => "multiple",
            NodeType::Entire => "entire",
            NodeType::Split => "split",
            NodeType::WsAllowBoth => "ws allow both",
        }
    }
    pub fn from_name(name: &str) -> Option<NodeType> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }
    /// The constructor keyword of the DSL format, if the node type has one.
    pub fn keyword(self) -> Option<&'static str> {
        let keyword = match self {
            NodeType::CharacterClass => "CHARACTER_CLASS",
            NodeType::Sequence => "SEQUENCE",
            NodeType::Or => "OR",
            NodeType::And => "AND",
            NodeType::Not => "NOT",
            NodeType::Optional => "OPTIONAL",
            NodeType::Multiple => "MULTIPLE",
            NodeType::Entire => "ENTIRE",
            NodeType::WsAllowBoth => "WS_ALLOW_BOTH",
            _ => return None,
        };
        Some(keyword)
    }
    pub fn from_keyword(keyword: &str) -> Option<NodeType> {
        Self::ALL
            .into_iter()
            .find(|t| t.keyword() == Some(keyword))
    }
    pub fn shape(self) -> Shape {
        match self {
            NodeType::RuleName
            | NodeType::Jump
            | NodeType::StringLiteral
            | NodeType::CharacterClass => Shape::Text,
            NodeType::Rule | NodeType::Name => Shape::Named,
            NodeType::Not
            | NodeType::Optional
            | NodeType::Multiple
            | NodeType::Entire
            | NodeType::Split
            | NodeType::WsAllowBoth => Shape::Single,
            NodeType::RuleList | NodeType::Sequence | NodeType::Or | NodeType::And => Shape::List,
        }
    }
}

/// A by-name edge in the pattern graph, bound once after the whole graph is built.
#[derive(Clone, Debug)]
pub struct Reference {
    pub name: RcString,
    pub target: PackedOption<PatternId>,
}

impl Reference {
    pub fn new(name: RcString) -> Reference {
        Reference {
            name,
            target: None.into(),
        }
    }
    pub fn target(&self) -> Option<PatternId> {
        self.target.expand()
    }
}

#[derive(Clone, Debug)]
pub enum PatternKind {
    RuleList,
    Rule(RcString),
    Name(RcString),
    RuleName(Reference),
    Jump(Reference),
    StringLiteral(RcString),
    CharacterClass(RcString),
    Sequence,
    Or,
    And,
    Not,
    Optional,
    Multiple,
    Entire,
    Split,
    WsAllowBoth,
}

impl PatternKind {
    pub fn node_type(&self) -> NodeType {
        match self {
            PatternKind::RuleList => NodeType::RuleList,
            PatternKind::Rule(_) => NodeType::Rule,
            PatternKind::Name(_) => NodeType::Name,
            PatternKind::RuleName(_) => NodeType::RuleName,
            PatternKind::Jump(_) => NodeType::Jump,
            PatternKind::StringLiteral(_) => NodeType::StringLiteral,
            PatternKind::CharacterClass(_) => NodeType::CharacterClass,
            PatternKind::Sequence => NodeType::Sequence,
            PatternKind::Or => NodeType::Or,
            PatternKind::And => NodeType::And,
            PatternKind::Not => NodeType::Not,
            PatternKind::Optional => NodeType::Optional,
            PatternKind::Multiple => NodeType::Multiple,
            PatternKind::Entire => NodeType::Entire,
            PatternKind::Split => NodeType::Split,
            PatternKind::WsAllowBoth => NodeType::WsAllowBoth,
        }
    }
    /// Rule, name or literal text carried by the node.
    pub fn text(&self) -> Option<&RcString> {
        match self {
            PatternKind::Rule(a)
            | PatternKind::Name(a)
            | PatternKind::StringLiteral(a)
            | PatternKind::CharacterClass(a) => Some(a),
            PatternKind::RuleName(r) | PatternKind::Jump(r) => Some(&r.name),
            _ => None,
        }
    }
    pub fn reference(&self) -> Option<&Reference> {
        match self {
            PatternKind::RuleName(r) | PatternKind::Jump(r) => Some(r),
            _ => None,
        }
    }
    pub fn display_into(&self, buf: &mut dyn std::fmt::Write) -> std::fmt::Result {
        match self {
            PatternKind::Rule(a) => write!(buf, "Rule({a})"),
            PatternKind::Name(a) => write!(buf, "Name({a})"),
            PatternKind::RuleName(r) => write!(buf, "RuleName({})", r.name),
            PatternKind::Jump(r) => write!(buf, "Jump({})", r.name),
            PatternKind::StringLiteral(a) => write!(buf, "StringLiteral({a:?})"),
            PatternKind::CharacterClass(a) => write!(buf, "CharacterClass({a:?})"),
            other => write!(buf, "{:?}", other.node_type()),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Pattern {
    kind: PatternKind,
    span: Span,
    children: Vec<PatternId>,
}

impl Pattern {
    pub fn new(kind: PatternKind, span: Span, children: Vec<PatternId>) -> Pattern {
        Pattern {
            kind,
            span,
            children,
        }
    }
    pub fn kind(&self) -> &PatternKind {
        &self.kind
    }
    pub(crate) fn kind_mut(&mut self) -> &mut PatternKind {
        &mut self.kind
    }
    pub fn node_type(&self) -> NodeType {
        self.kind.node_type()
    }
    pub fn span(&self) -> Span {
        self.span
    }
    pub fn children(&self) -> &[PatternId] {
        &self.children
    }
    /// The single child of `Single` and `Named` shaped nodes.
    pub fn child(&self) -> Option<PatternId> {
        match self.node_type().shape() {
            Shape::Single | Shape::Named => self.children.first().copied(),
            _ => None,
        }
    }
}

#[test]
fn test_registry() {
    for node_type in NodeType::ALL {
        assert_eq!(NodeType::from_name(node_type.name()), Some(node_type));
        if let Some(keyword) = node_type.keyword() {
            assert_eq!(NodeType::from_keyword(keyword), Some(node_type));
        }
    }
    assert_eq!(NodeType::from_name("ruleList"), None);
    assert_eq!(NodeType::from_keyword("JUMP"), None);
    assert_eq!(NodeType::WsAllowBoth.shape(), Shape::Single);
}
