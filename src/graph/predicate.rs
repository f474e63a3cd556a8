//! Composable predicates over the contacts graph.
//!
//! There are three kinds. A [NodePredicate] tests a node, a [LinkPredicate] tests a link,
//! and a [SelectionPredicate] tests a link in the context of the node it was reached from.
//! All three combine with `&`, `|` and `!`. Wherever a selection predicate is expected, a
//! node predicate stands for [is_other], and a link predicate or a [NodeType] stands for
//! [is_link].

use enumset::EnumSet;
use std::{
    fmt,
    ops::{BitAnd, BitOr, Not},
    sync::Arc,
};

use super::{store::Graph, types::NodeId, types::NodeType};
use crate::{entity::world::Place, text::text_match_key};

type NodeFn = dyn Fn(&Graph, NodeId) -> bool + Send + Sync;
type SelectionFn = dyn Fn(&Graph, NodeId, NodeId) -> bool + Send + Sync;

#[derive(Clone)]
pub struct NodePredicate(Arc<NodeFn>);

#[derive(Clone)]
pub struct LinkPredicate(Arc<NodeFn>);

#[derive(Clone)]
pub struct SelectionPredicate(Arc<SelectionFn>);

impl NodePredicate {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Graph, NodeId) -> bool + Send + Sync + 'static,
    {
        NodePredicate(Arc::new(f))
    }

    pub fn test(&self, graph: &Graph, node: NodeId) -> bool {
        (self.0)(graph, node)
    }

    pub fn always() -> Self {
        NodePredicate::new(|_, _| true)
    }
}

impl LinkPredicate {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Graph, NodeId) -> bool + Send + Sync + 'static,
    {
        LinkPredicate(Arc::new(f))
    }

    pub fn test(&self, graph: &Graph, link: NodeId) -> bool {
        (self.0)(graph, link)
    }
}

impl SelectionPredicate {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Graph, NodeId, NodeId) -> bool + Send + Sync + 'static,
    {
        SelectionPredicate(Arc::new(f))
    }

    /// Test `link`, reached from `origin`.
    pub fn test(&self, graph: &Graph, origin: NodeId, link: NodeId) -> bool {
        (self.0)(graph, origin, link)
    }

    /// Selects every link.
    pub fn all() -> Self {
        SelectionPredicate::new(|_, _, _| true)
    }
}

macro_rules! node_like_ops {
    ($ty:ident) => {
        impl BitAnd for $ty {
            type Output = $ty;
            fn bitand(self, rhs: $ty) -> $ty {
                $ty::new(move |g, n| self.test(g, n) && rhs.test(g, n))
            }
        }

        impl BitOr for $ty {
            type Output = $ty;
            fn bitor(self, rhs: $ty) -> $ty {
                $ty::new(move |g, n| self.test(g, n) || rhs.test(g, n))
            }
        }

        impl Not for $ty {
            type Output = $ty;
            fn not(self) -> $ty {
                $ty::new(move |g, n| !self.test(g, n))
            }
        }

        impl BitAnd<SelectionPredicate> for $ty {
            type Output = SelectionPredicate;
            fn bitand(self, rhs: SelectionPredicate) -> SelectionPredicate {
                SelectionPredicate::from(self) & rhs
            }
        }

        impl BitOr<SelectionPredicate> for $ty {
            type Output = SelectionPredicate;
            fn bitor(self, rhs: SelectionPredicate) -> SelectionPredicate {
                SelectionPredicate::from(self) | rhs
            }
        }

        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(stringify!($ty))
            }
        }
    };
}

node_like_ops!(NodePredicate);
node_like_ops!(LinkPredicate);

/// Node and link predicates, and node types, combine into a [NodePredicate] that tests
/// one node with both.
macro_rules! mixed_ops {
    ($lhs:ty, $rhs:ty) => {
        impl BitAnd<$rhs> for $lhs {
            type Output = NodePredicate;
            fn bitand(self, rhs: $rhs) -> NodePredicate {
                let (lhs, rhs) = (NodePredicate::from(self), NodePredicate::from(rhs));
                NodePredicate::new(move |g, n| lhs.test(g, n) && rhs.test(g, n))
            }
        }

        impl BitOr<$rhs> for $lhs {
            type Output = NodePredicate;
            fn bitor(self, rhs: $rhs) -> NodePredicate {
                let (lhs, rhs) = (NodePredicate::from(self), NodePredicate::from(rhs));
                NodePredicate::new(move |g, n| lhs.test(g, n) || rhs.test(g, n))
            }
        }
    };
}

mixed_ops!(NodePredicate, LinkPredicate);
mixed_ops!(LinkPredicate, NodePredicate);
mixed_ops!(NodePredicate, NodeType);
mixed_ops!(LinkPredicate, NodeType);
mixed_ops!(NodeType, NodePredicate);
mixed_ops!(NodeType, LinkPredicate);

impl<T: Into<SelectionPredicate>> BitAnd<T> for SelectionPredicate {
    type Output = SelectionPredicate;
    fn bitand(self, rhs: T) -> SelectionPredicate {
        let rhs = rhs.into();
        SelectionPredicate::new(move |g, n, l| self.test(g, n, l) && rhs.test(g, n, l))
    }
}

impl<T: Into<SelectionPredicate>> BitOr<T> for SelectionPredicate {
    type Output = SelectionPredicate;
    fn bitor(self, rhs: T) -> SelectionPredicate {
        let rhs = rhs.into();
        SelectionPredicate::new(move |g, n, l| self.test(g, n, l) || rhs.test(g, n, l))
    }
}

impl Not for SelectionPredicate {
    type Output = SelectionPredicate;
    fn not(self) -> SelectionPredicate {
        SelectionPredicate::new(move |g, n, l| !self.test(g, n, l))
    }
}

impl fmt::Debug for SelectionPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SelectionPredicate")
    }
}

impl From<NodePredicate> for SelectionPredicate {
    fn from(pred: NodePredicate) -> Self {
        is_other(pred)
    }
}

impl From<LinkPredicate> for SelectionPredicate {
    fn from(pred: LinkPredicate) -> Self {
        is_link(pred)
    }
}

impl From<NodeType> for SelectionPredicate {
    fn from(t: NodeType) -> Self {
        is_link(t)
    }
}

impl From<EnumSet<NodeType>> for SelectionPredicate {
    fn from(types: EnumSet<NodeType>) -> Self {
        is_link(types)
    }
}

impl From<NodePredicate> for LinkPredicate {
    fn from(pred: NodePredicate) -> Self {
        LinkPredicate(pred.0)
    }
}

impl From<LinkPredicate> for NodePredicate {
    fn from(pred: LinkPredicate) -> Self {
        NodePredicate(pred.0)
    }
}

impl From<NodeType> for LinkPredicate {
    fn from(t: NodeType) -> Self {
        instance_p(t).into()
    }
}

impl From<EnumSet<NodeType>> for LinkPredicate {
    fn from(types: EnumSet<NodeType>) -> Self {
        instance_any(types).into()
    }
}

impl From<NodeType> for NodePredicate {
    fn from(t: NodeType) -> Self {
        instance_p(t)
    }
}

/// Selects links whose `node1` is the origin.
pub fn outgoing() -> SelectionPredicate {
    SelectionPredicate::new(|g, origin, link| g.node1(link) == Some(origin))
}

/// Selects links whose `node2` is the origin.
pub fn incoming() -> SelectionPredicate {
    SelectionPredicate::new(|g, origin, link| g.node2(link) == Some(origin))
}

/// Applies a node predicate to the far end of the link.
pub fn is_other(pred: impl Into<NodePredicate>) -> SelectionPredicate {
    let pred = pred.into();
    SelectionPredicate::new(move |g, origin, link| {
        g.other(link, origin).is_some_and(|other| pred.test(g, other))
    })
}

/// Applies a link predicate to the link itself.
pub fn is_link(pred: impl Into<LinkPredicate>) -> SelectionPredicate {
    let pred = pred.into();
    SelectionPredicate::new(move |g, _, link| pred.test(g, link))
}

/// Nodes of the given type or any of its subtypes.
pub fn instance_p(t: NodeType) -> NodePredicate {
    NodePredicate::new(move |g, n| g.node_type(n).is_a(t))
}

/// Nodes that are an instance of any of the given types.
pub fn instance_any(types: EnumSet<NodeType>) -> NodePredicate {
    NodePredicate::new(move |g, n| !g.node_type(n).lineage().is_disjoint(types))
}

/// Nodes of exactly the given type.
pub fn type_p(t: NodeType) -> NodePredicate {
    NodePredicate::new(move |g, n| g.node_type(n) == t)
}

/// Either a particular node or any node satisfying a predicate, for [from_node] and
/// [to_node].
pub enum NodeMatch {
    Id(NodeId),
    Pred(NodePredicate),
}

impl NodeMatch {
    fn test(&self, graph: &Graph, node: NodeId) -> bool {
        match self {
            NodeMatch::Id(id) => *id == node,
            NodeMatch::Pred(pred) => pred.test(graph, node),
        }
    }
}

impl From<NodeId> for NodeMatch {
    fn from(id: NodeId) -> Self {
        NodeMatch::Id(id)
    }
}

impl From<NodePredicate> for NodeMatch {
    fn from(pred: NodePredicate) -> Self {
        NodeMatch::Pred(pred)
    }
}

impl From<NodeType> for NodeMatch {
    fn from(t: NodeType) -> Self {
        NodeMatch::Pred(instance_p(t))
    }
}

/// Links that originate from the given node, or from a node satisfying the predicate.
pub fn from_node(node: impl Into<NodeMatch>) -> LinkPredicate {
    let node = node.into();
    LinkPredicate::new(move |g, link| g.node1(link).is_some_and(|n| node.test(g, n)))
}

/// Links that point to the given node, or to a node satisfying the predicate.
pub fn to_node(node: impl Into<NodeMatch>) -> LinkPredicate {
    let node = node.into();
    LinkPredicate::new(move |g, link| g.node2(link).is_some_and(|n| node.test(g, n)))
}

/// Nodes pertaining to the given place. A place with an area matches on the area; a
/// country-only place matches any place in that country.
pub fn in_place(place: Place) -> NodePredicate {
    NodePredicate::new(move |g, n| {
        g.all_places(n).iter().any(|p| match place.area {
            Some(area) => p.area == Some(area),
            None => p.country == place.country,
        })
    })
}

/// Nodes or links with a true boolean attribute of the given name.
pub fn test_attr(name: &'static str) -> NodePredicate {
    NodePredicate::new(move |g, n| g.entity(n).attr(name).unwrap_or(false))
}

/// Named nodes with a name containing `text` at a word start, ignoring case and
/// diacritics.
pub fn name_imatches(text: &str) -> NodePredicate {
    let itext = text_match_key(text);
    NodePredicate::new(move |g, n| {
        g.is_a(n, NodeType::NamedNode) && g.names(n, true).iter().any(|name| name.imatches(&itext))
    })
}

/// Nodes linked to the given keyword.
pub fn keyed_with(keyword: NodeId) -> NodePredicate {
    NodePredicate::new(move |g, n| {
        !g.links(n, is_link(NodeType::KeyedWith) & is_link(to_node(keyword)))
            .is_empty()
    })
}

/// Nodes registered in the model as principal entries.
pub fn is_principal() -> NodePredicate {
    NodePredicate::new(|g, n| {
        !g.links(
            n,
            outgoing() & NodeType::InModel & is_link(test_attr("principal")),
        )
        .is_empty()
    })
}

/// `Is_in` links to exactly the given place.
pub fn is_in_place(place: Place) -> LinkPredicate {
    LinkPredicate::new(move |g, link| {
        g.node_type(link) == NodeType::IsIn && g.place(link) == Some(place)
    })
}
