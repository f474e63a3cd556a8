//! Collating entries for listing.
//!
//! One entry may be listed under several keys: a person under their first and last
//! names, a family under each head's name, a company under each of its names. Each
//! appearance is a [SortItem]. The first key of a node gives its canonical item; the
//! others are references to it.

use once_cell::unsync::OnceCell;
use std::collections::{BTreeMap, BTreeSet};

use crate::{
    error::SixxError,
    graph::{Graph, NodeId},
    named::SortMode,
    text::SortStr,
};

/// How far back [cull_references] looks for a nearby entry.
pub const DEFAULT_HORIZON: usize = 8;

/// One appearance of a node in the collating order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortItem {
    /// The node listed here, or `None` once the item is culled.
    pub node: Option<NodeId>,
    /// The key the node is listed under.
    pub key: SortStr,
    /// The collation string of `key`.
    pub sortkey: String,
    /// Whether this is the node's canonical item, as opposed to a reference.
    pub single: bool,
    /// The key of the node's canonical item.
    pub canonical: SortStr,
}

impl SortItem {
    pub fn new(node: NodeId, key: SortStr, single: bool, canonical: SortStr) -> SortItem {
        SortItem {
            node: Some(node),
            sortkey: key.sort_key(),
            key,
            single,
            canonical,
        }
    }

    /// Whether the item is a reference to an entry listed elsewhere.
    pub fn is_reference(&self) -> bool {
        !self.single
    }
}

/// A set of nodes to list, and the sort items derived from them.
pub struct Itemiser<'g> {
    graph: &'g Graph,
    mode: SortMode,
    language: String,
    nodes: BTreeSet<NodeId>,
    items: OnceCell<BTreeMap<NodeId, Vec<SortItem>>>,
}

impl<'g> Itemiser<'g> {
    pub fn new(graph: &'g Graph, mode: SortMode, language: impl Into<String>) -> Itemiser<'g> {
        Itemiser {
            graph,
            mode,
            language: language.into(),
            nodes: BTreeSet::new(),
            items: OnceCell::new(),
        }
    }

    pub fn add(&mut self, node: NodeId) {
        if self.nodes.insert(node) {
            self.items.take();
        }
    }

    pub fn update(&mut self, nodes: impl IntoIterator<Item = NodeId>) {
        for node in nodes {
            self.add(node);
        }
    }

    pub fn discard(&mut self, node: NodeId) -> bool {
        let removed = self.nodes.remove(&node);
        if removed {
            self.items.take();
        }
        removed
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().copied()
    }

    /// The keys a node is listed under, never empty.
    fn keys(&self, node: NodeId) -> Vec<SortStr> {
        let keys = self.graph.sort_keys(node, self.mode, &self.language);
        if keys.is_empty() {
            vec![SortStr::new(self.graph.display_name(node, &self.language))]
        } else {
            keys
        }
    }

    fn item_map(&self) -> &BTreeMap<NodeId, Vec<SortItem>> {
        self.items.get_or_init(|| {
            self.nodes
                .iter()
                .map(|&node| {
                    let keys = self.keys(node);
                    let canonical = keys[0].clone();
                    let items = keys
                        .into_iter()
                        .enumerate()
                        .map(|(i, key)| SortItem::new(node, key, i == 0, canonical.clone()))
                        .collect();
                    (node, items)
                })
                .collect()
        })
    }

    /// Every sort item of every node, unsorted.
    pub fn items(&self) -> Vec<SortItem> {
        self.item_map().values().flatten().cloned().collect()
    }

    /// The sort items of one node, canonical first.
    pub fn items_of(&self, node: NodeId) -> Vec<SortItem> {
        self.item_map().get(&node).cloned().unwrap_or_default()
    }

    /// References listing each `src` node's keys under the entry of its `dst` node, for
    /// entries folded into another. Every `dst` must be in the itemiser.
    pub fn alias_items(&self, aliases: &[(NodeId, NodeId)]) -> Result<Vec<SortItem>, SixxError> {
        let mut items = Vec::new();
        for &(src, dst) in aliases {
            let canonical = self
                .item_map()
                .get(&dst)
                .and_then(|items| items.first())
                .map(|item| item.key.clone())
                .ok_or_else(|| SixxError::invariant(format!("alias target {dst} not itemised")))?;
            for key in self.keys(src) {
                items.push(SortItem::new(dst, key, false, canonical.clone()));
            }
        }
        Ok(items)
    }

    /// Every item and alias item, in collating order.
    pub fn sorted(&self, aliases: &[(NodeId, NodeId)]) -> Result<Vec<SortItem>, SixxError> {
        let mut items = self.items();
        items.extend(self.alias_items(aliases)?);
        items.sort_by(|a, b| a.sortkey.cmp(&b.sortkey).then_with(|| b.single.cmp(&a.single)));
        Ok(items)
    }
}

fn prefix(sortkey: &str) -> &str {
    match sortkey.char_indices().nth(3) {
        Some((i, _)) => &sortkey[..i],
        None => sortkey,
    }
}

/// Blank out references that are not needed in a sorted list.
///
/// A reference is dropped when its entry is listed nearby: among the `horizon` live
/// items before it that share its three-letter key prefix. A reference is also dropped
/// when an earlier nearby reference already points to the same entry.
pub fn cull_references(items: &mut [SortItem], horizon: usize) {
    for i in 0..items.len() {
        if !items[i].single {
            continue;
        }
        let node = items[i].node;
        let near = prefix(&items[i].sortkey).to_string();
        let mut seen = 0;
        for j in (0..i).rev() {
            if prefix(&items[j].sortkey) != near {
                break;
            }
            if items[j].node.is_some() {
                seen += 1;
                if seen > horizon {
                    break;
                }
                if items[j].node == node {
                    items[j].node = None;
                }
            }
        }
    }
    for i in 0..items.len() {
        if items[i].single || items[i].node.is_none() {
            continue;
        }
        let near = prefix(&items[i].sortkey).to_string();
        let mut seen = 0;
        for j in (0..i).rev() {
            if prefix(&items[j].sortkey) != near {
                break;
            }
            if items[j].node.is_some() {
                seen += 1;
                if seen > horizon {
                    break;
                }
                if items[j].node == items[i].node {
                    items[i].node = None;
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        entity::Organisation,
        graph::Entity,
        multilang::Multilang,
    };
    use petgraph::graph::NodeIndex;
    use test_log::test;

    fn item(node: usize, key: &str, single: bool) -> SortItem {
        SortItem::new(NodeId(NodeIndex::new(node)), SortStr::new(key), single, SortStr::new(key))
    }

    fn live(items: &[SortItem]) -> Vec<&str> {
        items
            .iter()
            .filter(|i| i.node.is_some())
            .map(|i| i.key.as_str())
            .collect()
    }

    #[test]
    fn nearby_references_are_culled() {
        let mut items = vec![
            item(1, "Smith, Jo", false),
            item(2, "Smith, Al", true),
            item(1, "Smithers", true),
            item(3, "Zed", true),
        ];
        cull_references(&mut items, DEFAULT_HORIZON);
        assert_eq!(live(&items), vec!["Smith, Al", "Smithers", "Zed"]);
    }

    #[test]
    fn references_beyond_horizon_survive() {
        let mut items = vec![item(1, "Aab ref", false)];
        for n in 0..3 {
            items.push(item(10 + n, &format!("Aab {n}"), true));
        }
        items.push(item(1, "Aab real", true));
        let mut near = items.clone();
        cull_references(&mut near, 4);
        assert!(near[0].node.is_none());
        cull_references(&mut items, 3);
        assert!(items[0].node.is_some());
    }

    #[test]
    fn duplicate_references_collapse() {
        let mut items = vec![
            item(5, "Main Roads", false),
            item(5, "Main Roads Dept", false),
            item(6, "Zulu", true),
            item(5, "Roads", true),
        ];
        cull_references(&mut items, DEFAULT_HORIZON);
        assert_eq!(live(&items), vec!["Main Roads", "Zulu", "Roads"]);
    }

    #[test]
    fn itemiser_lists_every_name() {
        let mut graph = Graph::new();
        let aka = vec![Multilang::plain("Acme Holdings")];
        let acme = graph
            .add_node(Entity::Company(Organisation::new(Multilang::plain("Acme"), aka, None)))
            .unwrap();
        let zeta = graph
            .add_node(Entity::Company(Organisation::new(Multilang::plain("Zeta"), vec![], None)))
            .unwrap();
        let mut itemiser = Itemiser::new(&graph, SortMode::AllNames, "en");
        itemiser.update([zeta, acme, acme]);
        assert_eq!(itemiser.len(), 2);
        assert!(itemiser.contains(acme));

        let items = itemiser.sorted(&[]).unwrap();
        let keys: Vec<&str> = items.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys, vec!["Acme", "Acme Holdings", "Zeta"]);
        assert!(items[0].single && items[1].is_reference());
        assert_eq!(items[1].canonical.as_str(), "Acme");

        let aliases = itemiser.alias_items(&[(zeta, acme)]).unwrap();
        assert_eq!(aliases.len(), 1);
        assert_eq!(aliases[0].node, Some(acme));
        assert_eq!(aliases[0].key.as_str(), "Zeta");

        assert!(itemiser.discard(zeta));
        assert!(!itemiser.discard(zeta));
        assert_eq!(itemiser.items().len(), 2);
        assert!(itemiser.alias_items(&[(acme, zeta)]).is_err());
    }
}
