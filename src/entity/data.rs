use chrono::NaiveDate;

use crate::{
    entity::world::Place,
    error::SixxError,
    graph::{
        predicate::{is_in_place, outgoing},
        Entity, Graph, NodeId, NodeType,
    },
    input::Text,
};

/// A free-form `id = value` fact, scoped to the one context node it is linked to by
/// `Has_context`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Data {
    pub id: String,
    pub value: String,
}

/// How a `data` field chooses the context of its Data node. Chosen per data id by
/// `%in ... : %data id` declarations; undeclared ids use [DataFactory::Context].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFactory {
    /// The data pertains to the entry's presence in one particular place.
    Place(Place),
    /// The data pertains to the entry itself, wherever it is.
    NoContext,
    /// The data pertains to whatever the field is attached to: a link directly, or a
    /// node's presence in the part's place or the node's own place.
    Context,
}

fn find_or_add_is_in(graph: &mut Graph, who: NodeId, place: Place) -> Result<NodeId, SixxError> {
    match graph.link(who, is_in_place(place))? {
        Some(link) => Ok(link),
        None => graph.add_placed_link(who, place.node(), Entity::IsIn, Some(place), None),
    }
}

impl DataFactory {
    /// Find or create the node a Data for `who` is to be linked to. `part_place` is the
    /// place of the enclosing part, if it has one; `value` locates errors.
    pub fn context(
        &self,
        graph: &mut Graph,
        who: NodeId,
        part_place: Option<Place>,
        value: &Text,
    ) -> Result<NodeId, SixxError> {
        match self {
            DataFactory::Place(place) => {
                if graph.is_link(who) {
                    return Err(SixxError::input_line(
                        value,
                        "place-contextual data in a non-place context",
                    ));
                }
                if let Some(part_place) = part_place.filter(|p| p != place) {
                    return Err(SixxError::input_line(
                        value,
                        format!(
                            "invalid data place {} - should be {}",
                            graph.place_name(&part_place),
                            graph.place_name(place)
                        ),
                    ));
                }
                find_or_add_is_in(graph, who, *place)
            }
            DataFactory::NoContext => {
                if graph.is_link(who) {
                    return Err(SixxError::input_line(value, "non-contextual data in a context"));
                }
                if part_place.is_some() {
                    return Err(SixxError::input_line(
                        value,
                        "non-contextual data in a place context",
                    ));
                }
                Ok(who)
            }
            DataFactory::Context => {
                if graph.is_link(who) {
                    return Ok(who);
                }
                let place = part_place
                    .or_else(|| graph.only_place(who))
                    .ok_or_else(|| SixxError::input_line(value, "data context (place) unknown"))?;
                find_or_add_is_in(graph, who, place)
            }
        }
    }
}

/// Add a Data node and its `Has_context` link.
pub fn add_data(
    graph: &mut Graph,
    context: NodeId,
    data: Data,
    timestamp: Option<NaiveDate>,
) -> Result<NodeId, SixxError> {
    let id = graph.add_node(Entity::Data(data))?;
    graph.add_link(id, context, Entity::HasContext, timestamp)?;
    Ok(id)
}

impl Graph {
    /// The context of a Data node.
    pub fn data_context(&self, data: NodeId) -> Option<NodeId> {
        self.nodes(data, outgoing() & NodeType::HasContext)
            .into_iter()
            .next()
    }
}
