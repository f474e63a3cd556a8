use chrono::NaiveDate;
use petgraph::{
    graph::{DiGraph, NodeIndex},
    visit::EdgeRef,
    Direction,
};
use std::collections::HashSet;

use super::{
    predicate::{NodePredicate, SelectionPredicate},
    types::{type_names, Element, Ends, Entity, Incidence, NodeId, NodeType},
};
use crate::{entity::world::Place, error::SixxError};

/// The contacts graph. Every node and every link is a petgraph node carrying an
/// [Element]; a link is joined to its endpoints by two [Incidence] edges.
#[derive(Debug, Clone)]
pub struct Graph(pub DiGraph<Element, Incidence>);

impl Default for Graph {
    fn default() -> Self {
        Graph(DiGraph::new())
    }
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_graph(&self) -> &DiGraph<Element, Incidence> {
        &self.0
    }

    pub fn as_graph_mut(&mut self) -> &mut DiGraph<Element, Incidence> {
        &mut self.0
    }

    /// Number of elements, links included.
    pub fn len(&self) -> usize {
        self.0.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.node_count() == 0
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.0.node_indices().map(NodeId)
    }

    /// Add an unlinked node. Link entities must go through [Graph::add_link].
    pub fn add_node(&mut self, entity: Entity) -> Result<NodeId, SixxError> {
        let node_type = entity.node_type();
        if node_type.is_link() {
            return Err(SixxError::invariant(format!(
                "{node_type} can only be created between two nodes"
            )));
        }
        Ok(self.insert(entity, None, None))
    }

    /// Like [Graph::add_node], with a directly assigned place.
    pub fn add_placed_node(
        &mut self,
        entity: Entity,
        place: Option<Place>,
    ) -> Result<NodeId, SixxError> {
        let id = self.add_node(entity)?;
        self.set_place(id, place);
        Ok(id)
    }

    /// Create a link from `node1` to `node2`. Endpoint types are checked against the link
    /// type, and a node is never linked to itself.
    pub fn add_link(
        &mut self,
        node1: NodeId,
        node2: NodeId,
        entity: Entity,
        timestamp: Option<NaiveDate>,
    ) -> Result<NodeId, SixxError> {
        let link_type = entity.node_type();
        let Some((sources, sinks)) = link_type.endpoints() else {
            return Err(SixxError::invariant(format!("{link_type} is not a link type")));
        };
        if node1 == node2 {
            return Err(SixxError::invariant(format!(
                "cannot link {} {node1} to itself",
                self.node_type(node1)
            )));
        }
        for (end, allowed) in [(node1, sources), (node2, sinks)] {
            let end_type = self.node_type(end);
            if end_type.lineage().is_disjoint(allowed) {
                return Err(SixxError::invariant(format!(
                    "{link_type} cannot join {end_type} (expected {})",
                    type_names(allowed)
                )));
            }
        }
        let ends = Ends {
            node1,
            node2,
            timestamp,
        };
        let link = self.insert(entity, None, Some(ends));
        self.0.add_edge(node1.0, link.0, Incidence::Source);
        self.0.add_edge(link.0, node2.0, Incidence::Sink);
        tracing::trace!("[Graph] {link_type} {link}: {node1} -> {node2}");
        Ok(link)
    }

    /// Like [Graph::add_link], with a directly assigned place on the link.
    pub fn add_placed_link(
        &mut self,
        node1: NodeId,
        node2: NodeId,
        entity: Entity,
        place: Option<Place>,
        timestamp: Option<NaiveDate>,
    ) -> Result<NodeId, SixxError> {
        let id = self.add_link(node1, node2, entity, timestamp)?;
        self.set_place(id, place);
        Ok(id)
    }

    fn insert(&mut self, entity: Entity, place: Option<Place>, ends: Option<Ends>) -> NodeId {
        NodeId(self.0.add_node(Element {
            entity,
            place,
            ends,
        }))
    }

    pub fn element(&self, id: NodeId) -> &Element {
        &self.0[id.0]
    }

    pub fn entity(&self, id: NodeId) -> &Entity {
        &self.0[id.0].entity
    }

    pub fn entity_mut(&mut self, id: NodeId) -> &mut Entity {
        &mut self.0[id.0].entity
    }

    pub fn node_type(&self, id: NodeId) -> NodeType {
        self.entity(id).node_type()
    }

    pub fn is_a(&self, id: NodeId, ancestor: NodeType) -> bool {
        self.node_type(id).is_a(ancestor)
    }

    pub fn is_link(&self, id: NodeId) -> bool {
        self.element(id).ends.is_some()
    }

    /// The directly assigned place.
    pub fn place(&self, id: NodeId) -> Option<Place> {
        self.element(id).place
    }

    pub fn set_place(&mut self, id: NodeId, place: Option<Place>) {
        self.0[id.0].place = place;
    }

    pub fn ends(&self, link: NodeId) -> Option<&Ends> {
        self.element(link).ends.as_ref()
    }

    pub fn node1(&self, link: NodeId) -> Option<NodeId> {
        self.ends(link).map(|e| e.node1)
    }

    pub fn node2(&self, link: NodeId) -> Option<NodeId> {
        self.ends(link).map(|e| e.node2)
    }

    pub fn timestamp(&self, link: NodeId) -> Option<NaiveDate> {
        self.ends(link).and_then(|e| e.timestamp)
    }

    /// The node at the far end of `link` from `node`.
    pub fn other(&self, link: NodeId, node: NodeId) -> Option<NodeId> {
        self.ends(link).map(|e| {
            if e.node1 == node {
                e.node2
            } else {
                e.node1
            }
        })
    }

    /// Every link incident on `id`, in creation order.
    pub fn incident(&self, id: NodeId) -> Vec<NodeId> {
        let outgoing = self
            .0
            .edges_directed(id.0, Direction::Outgoing)
            .filter(|e| *e.weight() == Incidence::Source)
            .map(|e| e.target());
        let incoming = self
            .0
            .edges_directed(id.0, Direction::Incoming)
            .filter(|e| *e.weight() == Incidence::Sink)
            .map(|e| e.source());
        let mut links: Vec<NodeIndex> = outgoing.chain(incoming).collect();
        links.sort();
        links.into_iter().map(NodeId).collect()
    }

    /// Incident links of `id` satisfying `sel`, in creation order.
    pub fn links(&self, id: NodeId, sel: impl Into<SelectionPredicate>) -> Vec<NodeId> {
        let sel = sel.into();
        self.incident(id)
            .into_iter()
            .filter(|link| sel.test(self, id, *link))
            .collect()
    }

    /// The single incident link satisfying `sel`, if any.
    pub fn link(
        &self,
        id: NodeId,
        sel: impl Into<SelectionPredicate>,
    ) -> Result<Option<NodeId>, SixxError> {
        let links = self.links(id, sel);
        match links.as_slice() {
            [] => Ok(None),
            [link] => Ok(Some(*link)),
            _ => Err(SixxError::invariant(format!(
                "{} {id} has {} links where at most one was expected",
                self.node_type(id),
                links.len()
            ))),
        }
    }

    /// The nodes at the far ends of the links of `id` satisfying `sel`.
    pub fn nodes(&self, id: NodeId, sel: impl Into<SelectionPredicate>) -> Vec<NodeId> {
        self.links(id, sel)
            .into_iter()
            .filter_map(|link| self.other(link, id))
            .collect()
    }

    pub fn node(
        &self,
        id: NodeId,
        sel: impl Into<SelectionPredicate>,
    ) -> Result<Option<NodeId>, SixxError> {
        Ok(self
            .link(id, sel)?
            .and_then(|link| self.other(link, id)))
    }

    /// Depth-first search from `start` along links satisfying `traverse`. Each followed
    /// link offers two visits, the link itself and the link plus its far node; a visit is
    /// taken unless `stop` holds for its last element or that element was already visited.
    /// Returns the path (excluding `start`) of every visit whose last element satisfies
    /// `select`.
    pub fn find_nodes(
        &self,
        start: NodeId,
        traverse: impl Into<SelectionPredicate>,
        select: Option<&NodePredicate>,
        stop: Option<&NodePredicate>,
    ) -> Vec<Vec<NodeId>> {
        let traverse = traverse.into();
        let mut found = Vec::new();
        let mut visited: HashSet<NodeId> = HashSet::from([start]);
        let mut stack: Vec<Vec<NodeId>> = vec![vec![start]];
        while let Some(path) = stack.pop() {
            let Some(&last) = path.last() else {
                continue;
            };
            for link in self.links(last, traverse.clone()) {
                let Some(other) = self.other(link, last) else {
                    continue;
                };
                for visit in [vec![link], vec![link, other]] {
                    let Some(&terminal) = visit.last() else {
                        continue;
                    };
                    if stop.is_some_and(|p| p.test(self, terminal)) || visited.contains(&terminal)
                    {
                        continue;
                    }
                    visited.insert(terminal);
                    let mut extended = path.clone();
                    extended.extend(visit);
                    if select.map_or(true, |p| p.test(self, terminal)) {
                        found.push(extended[1..].to_vec());
                    }
                    stack.push(extended);
                }
            }
        }
        found
    }

    /// For each predicate in turn, compare the places of the matching links. The first
    /// predicate whose links agree on a place decides; a link whose place differs from an
    /// earlier one makes that predicate indeterminate, and the next one is tried.
    pub fn derive_only_place(&self, id: NodeId, preds: &[SelectionPredicate]) -> Option<Place> {
        for pred in preds {
            let mut place = None;
            for link in self.links(id, pred.clone()) {
                let link_place = self.only_place(link);
                match place {
                    None => place = link_place,
                    Some(p) if Some(p) != link_place => {
                        place = None;
                        break;
                    }
                    _ => {}
                }
            }
            if place.is_some() {
                return place;
            }
        }
        None
    }
}
